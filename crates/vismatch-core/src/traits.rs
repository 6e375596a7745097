//! Core traits for vismatch abstractions.
//!
//! These traits define the seams between the orchestrator and the external
//! services it talks to. Concrete HTTP implementations live in
//! `vismatch-inference`.

use async_trait::async_trait;

use crate::category::Category;
use crate::error::Result;
use crate::image::EncodedImage;
use crate::product::Product;

/// Backend that maps an image to a catalog category.
#[async_trait]
pub trait CategoryClassifier: Send + Sync {
    /// Classify an image with exactly one upstream call.
    ///
    /// Errors are limited to `ClassifierUnavailable`,
    /// `MalformedClassifierResponse` and `CategoryUndetermined`.
    async fn classify(&self, image: &EncodedImage) -> Result<Category>;

    /// Model or backend name, for logging.
    fn model_name(&self) -> &str;
}

/// Backend that lists products for a category.
#[async_trait]
pub trait CatalogFetcher: Send + Sync {
    /// Fetch and normalize the product list for `category`.
    ///
    /// An empty list is a valid outcome. Errors are `CatalogUnavailable`.
    async fn fetch_by_category(&self, category: Category) -> Result<Vec<Product>>;
}
