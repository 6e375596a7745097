//! Search state aggregate observed by presentation layers.
//!
//! A [`SearchState`] is never edited in place by the pipeline. Each
//! transition builds the next value from the previous one and the
//! orchestrator swaps it in as a whole.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use crate::category::Category;
use crate::error::{Error, ErrorKind};
use crate::image::EncodedImage;
use crate::product::Product;

/// Pipeline phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "phase", content = "error_kind", rename_all = "snake_case")]
pub enum SearchPhase {
    Idle,
    Ingesting,
    Classifying,
    Fetching,
    Succeeded,
    /// Catalog returned no products. Not an error.
    Empty,
    Failed(ErrorKind),
}

impl SearchPhase {
    /// Terminal phases have no automatic outgoing transition.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Empty | Self::Failed(_))
    }

    /// Whether a run is currently in flight.
    pub fn is_busy(&self) -> bool {
        matches!(self, Self::Ingesting | Self::Classifying | Self::Fetching)
    }
}

impl fmt::Display for SearchPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => f.write_str("idle"),
            Self::Ingesting => f.write_str("ingesting"),
            Self::Classifying => f.write_str("classifying"),
            Self::Fetching => f.write_str("fetching"),
            Self::Succeeded => f.write_str("succeeded"),
            Self::Empty => f.write_str("empty"),
            Self::Failed(kind) => write!(f, "failed({})", kind),
        }
    }
}

/// Snapshot of one search, from upload to terminal state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchState {
    /// Generation of the run this state belongs to.
    pub run: u64,
    #[serde(flatten)]
    pub phase: SearchPhase,
    /// Image being searched; kept on failure so it can be shown next to the error.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uploaded_image: Option<Arc<EncodedImage>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<Category>,
    pub products: Vec<Product>,
    /// Failure message, or the "no matches" message in the `Empty` phase.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl Default for SearchState {
    fn default() -> Self {
        Self::idle(0)
    }
}

impl SearchState {
    pub fn idle(run: u64) -> Self {
        Self {
            run,
            phase: SearchPhase::Idle,
            uploaded_image: None,
            category: None,
            products: Vec::new(),
            error_message: None,
        }
    }

    /// Start of a run; everything from the previous run is dropped.
    pub fn ingesting(run: u64) -> Self {
        Self {
            phase: SearchPhase::Ingesting,
            ..Self::idle(run)
        }
    }

    pub fn classifying(&self, image: Arc<EncodedImage>) -> Self {
        Self {
            phase: SearchPhase::Classifying,
            uploaded_image: Some(image),
            ..Self::idle(self.run)
        }
    }

    pub fn fetching(&self, category: Category) -> Self {
        Self {
            phase: SearchPhase::Fetching,
            uploaded_image: self.uploaded_image.clone(),
            category: Some(category),
            ..Self::idle(self.run)
        }
    }

    /// Terminal success: `Succeeded` with products, or `Empty` with the
    /// "no matches" message.
    pub fn finished(&self, products: Vec<Product>) -> Self {
        if products.is_empty() {
            let label = self
                .category
                .map(|c| c.to_string())
                .unwrap_or_else(|| "selected".to_string());
            return Self {
                phase: SearchPhase::Empty,
                uploaded_image: self.uploaded_image.clone(),
                category: self.category,
                error_message: Some(format!(
                    "No products found in the '{}' category. Try a different image.",
                    label
                )),
                ..Self::idle(self.run)
            };
        }

        Self {
            phase: SearchPhase::Succeeded,
            uploaded_image: self.uploaded_image.clone(),
            category: self.category,
            products,
            ..Self::idle(self.run)
        }
    }

    /// Terminal failure. Products are cleared, the uploaded image is kept.
    pub fn failed(&self, error: &Error) -> Self {
        Self {
            phase: SearchPhase::Failed(error.kind()),
            uploaded_image: self.uploaded_image.clone(),
            category: self.category,
            error_message: Some(error.user_message()),
            ..Self::idle(self.run)
        }
    }

    /// Progress text for busy phases.
    pub fn progress_message(&self) -> Option<String> {
        match self.phase {
            SearchPhase::Ingesting => Some("Reading your image...".to_string()),
            SearchPhase::Classifying => Some("Step 1: Analyzing your image...".to_string()),
            SearchPhase::Fetching => Some(format!(
                "Step 2: Searching for '{}'...",
                self.category.map(|c| c.as_str()).unwrap_or("products")
            )),
            _ => None,
        }
    }
}
