//! Closed set of catalog categories an image can be classified into.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A catalog section identifier.
///
/// The set is closed: classifier output that does not name one of these
/// variants is never forwarded to the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Category {
    Smartphones,
    Laptops,
    Fragrances,
    Skincare,
    Groceries,
    HomeDecoration,
    Furniture,
    Tops,
    WomensDresses,
    WomensShoes,
    MensShirts,
    MensShoes,
    MensWatches,
    WomensWatches,
    WomensBags,
    WomensJewellery,
    Sunglasses,
    Automotive,
    Motorcycle,
    Lighting,
}

impl Category {
    /// Every category, in the order presented to the classifier.
    pub const ALL: [Category; 20] = [
        Category::Smartphones,
        Category::Laptops,
        Category::Fragrances,
        Category::Skincare,
        Category::Groceries,
        Category::HomeDecoration,
        Category::Furniture,
        Category::Tops,
        Category::WomensDresses,
        Category::WomensShoes,
        Category::MensShirts,
        Category::MensShoes,
        Category::MensWatches,
        Category::WomensWatches,
        Category::WomensBags,
        Category::WomensJewellery,
        Category::Sunglasses,
        Category::Automotive,
        Category::Motorcycle,
        Category::Lighting,
    ];

    /// Wire identifier, also used as the catalog path segment.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Smartphones => "smartphones",
            Self::Laptops => "laptops",
            Self::Fragrances => "fragrances",
            Self::Skincare => "skincare",
            Self::Groceries => "groceries",
            Self::HomeDecoration => "home-decoration",
            Self::Furniture => "furniture",
            Self::Tops => "tops",
            Self::WomensDresses => "womens-dresses",
            Self::WomensShoes => "womens-shoes",
            Self::MensShirts => "mens-shirts",
            Self::MensShoes => "mens-shoes",
            Self::MensWatches => "mens-watches",
            Self::WomensWatches => "womens-watches",
            Self::WomensBags => "womens-bags",
            Self::WomensJewellery => "womens-jewellery",
            Self::Sunglasses => "sunglasses",
            Self::Automotive => "automotive",
            Self::Motorcycle => "motorcycle",
            Self::Lighting => "lighting",
        }
    }

    /// Parse a comma-separated list, e.g. from an environment variable.
    ///
    /// Blank entries are skipped; duplicates are kept once in first-seen order.
    pub fn parse_list(list: &str) -> Result<Vec<Category>> {
        let mut out = Vec::new();
        for raw in list.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            let category = raw
                .parse::<Category>()
                .map_err(|_| Error::Config(format!("Unknown category: {}", raw)))?;
            if !out.contains(&category) {
                out.push(category);
            }
        }
        Ok(out)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Category::ALL
            .iter()
            .copied()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| s.to_string())
    }
}

/// Category value as reported by a classifier, before validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CategoryLabel {
    /// Names a member of the closed set.
    Known(Category),
    /// Anything else, kept verbatim for diagnostics.
    Unknown(String),
}

impl CategoryLabel {
    /// Classify a raw label. Matching is exact after trimming surrounding
    /// whitespace; case is not folded.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().parse::<Category>() {
            Ok(category) => Self::Known(category),
            Err(_) => Self::Unknown(raw.to_string()),
        }
    }

    /// Accept the label only if it is known and inside `allowed`.
    pub fn into_allowed(self, allowed: &[Category]) -> Result<Category> {
        match self {
            Self::Known(category) if allowed.contains(&category) => Ok(category),
            Self::Known(category) => Err(Error::CategoryUndetermined(format!(
                "category '{}' is not in the allowed set",
                category
            ))),
            Self::Unknown(raw) => Err(Error::CategoryUndetermined(format!(
                "unknown category '{}'",
                raw
            ))),
        }
    }
}
