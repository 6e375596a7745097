//! Catalog records and their canonical product form.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::defaults::CURRENCY_PREFIX;

/// Catalog identifier, passed through unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProductId {
    Int(i64),
    Text(String),
}

impl fmt::Display for ProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(id) => write!(f, "{}", id),
            Self::Text(id) => f.write_str(id),
        }
    }
}

/// Product record as returned by the catalog service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawCatalogRecord {
    pub id: ProductId,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brand: Option<String>,
    pub price: f64,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub thumbnail: String,
}

/// Normalized product shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    /// Record brand, or the record's category label when the brand is missing.
    pub brand: String,
    /// Currency-prefixed price with exactly two decimals, e.g. `$1299.99`.
    pub display_price: String,
    pub image_url: String,
}

impl From<&RawCatalogRecord> for Product {
    fn from(record: &RawCatalogRecord) -> Self {
        let brand = match record.brand.as_deref() {
            Some(brand) if !brand.trim().is_empty() => brand.to_string(),
            _ => record.category.clone(),
        };

        Self {
            id: record.id.clone(),
            name: record.title.clone(),
            brand,
            display_price: format_price(record.price),
            image_url: record.thumbnail.clone(),
        }
    }
}

impl From<RawCatalogRecord> for Product {
    fn from(record: RawCatalogRecord) -> Self {
        Product::from(&record)
    }
}

/// Format a price with the currency prefix and two decimals.
pub fn format_price(price: f64) -> String {
    format!("{}{:.2}", CURRENCY_PREFIX, price)
}
