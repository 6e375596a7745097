//! Error types for vismatch.

use std::fmt;

use serde::Serialize;
use thiserror::Error;

/// Result type alias using vismatch's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for vismatch operations.
///
/// Every variant except `Config` terminates the current matching run.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Upload is larger than the configured limit
    #[error("Image size {size} bytes exceeds limit of {limit} bytes")]
    SizeExceeded { size: u64, limit: u64 },

    /// Upload could not be read or is not a supported image
    #[error("Unreadable input: {0}")]
    UnreadableInput(String),

    /// Classifier call failed at the transport level or returned non-2xx
    #[error("Classifier unavailable{}: {detail}", fmt_status(.status))]
    ClassifierUnavailable { status: Option<u16>, detail: String },

    /// Classifier answered but the body did not have the expected shape
    #[error("Malformed classifier response: {0}")]
    MalformedClassifierResponse(String),

    /// Classifier answered without a usable category
    #[error("Category undetermined: {0}")]
    CategoryUndetermined(String),

    /// Catalog call failed at the transport level or returned non-2xx
    #[error("Catalog unavailable{}: {detail}", fmt_status(.status))]
    CatalogUnavailable { status: Option<u16>, detail: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

fn fmt_status(status: &Option<u16>) -> String {
    match status {
        Some(code) => format!(" (status {})", code),
        None => String::new(),
    }
}

/// Payload-free discriminant of [`Error`], stored in the failed search phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    SizeExceeded,
    UnreadableInput,
    ClassifierUnavailable,
    MalformedClassifierResponse,
    CategoryUndetermined,
    CatalogUnavailable,
    Config,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::SizeExceeded => "size_exceeded",
            Self::UnreadableInput => "unreadable_input",
            Self::ClassifierUnavailable => "classifier_unavailable",
            Self::MalformedClassifierResponse => "malformed_classifier_response",
            Self::CategoryUndetermined => "category_undetermined",
            Self::CatalogUnavailable => "catalog_unavailable",
            Self::Config => "config",
        };
        f.write_str(name)
    }
}

impl Error {
    /// The discriminant of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::SizeExceeded { .. } => ErrorKind::SizeExceeded,
            Self::UnreadableInput(_) => ErrorKind::UnreadableInput,
            Self::ClassifierUnavailable { .. } => ErrorKind::ClassifierUnavailable,
            Self::MalformedClassifierResponse(_) => ErrorKind::MalformedClassifierResponse,
            Self::CategoryUndetermined(_) => ErrorKind::CategoryUndetermined,
            Self::CatalogUnavailable { .. } => ErrorKind::CatalogUnavailable,
            Self::Config(_) => ErrorKind::Config,
        }
    }

    /// HTTP status carried by the unavailable variants, if a response arrived.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::ClassifierUnavailable { status, .. } | Self::CatalogUnavailable { status, .. } => {
                *status
            }
            _ => None,
        }
    }

    /// Human-readable message shown to the user in `SearchState::error_message`.
    pub fn user_message(&self) -> String {
        match self {
            Self::SizeExceeded { limit, .. } => format!(
                "File is too large. Please upload an image under {}.",
                human_size(*limit)
            ),
            Self::UnreadableInput(_) => "Failed to read the file. Please try again.".to_string(),
            Self::ClassifierUnavailable { status, .. } => format!(
                "The image analysis service is unavailable{}. Please try again later.",
                fmt_status(status)
            ),
            Self::MalformedClassifierResponse(_) => {
                "Invalid response structure from the image analysis service.".to_string()
            }
            Self::CategoryUndetermined(_) => {
                "Could not determine a product category from the image.".to_string()
            }
            Self::CatalogUnavailable { status, .. } => format!(
                "Failed to fetch products from the catalog{}.",
                fmt_status(status)
            ),
            Self::Config(msg) => format!("Configuration error: {}", msg),
        }
    }
}

/// Renders a byte count as whole MB when it divides evenly, bytes otherwise.
fn human_size(bytes: u64) -> String {
    const MIB: u64 = 1024 * 1024;
    if bytes >= MIB && bytes % MIB == 0 {
        format!("{}MB", bytes / MIB)
    } else {
        format!("{} bytes", bytes)
    }
}
