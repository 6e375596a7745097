//! # vismatch-inference
//!
//! Remote backends for vismatch.
//!
//! This crate provides:
//! - Gemini vision classifier implementing [`CategoryClassifier`]
//! - DummyJSON-compatible catalog implementing [`CatalogFetcher`]
//! - Environment-driven configuration for both
//! - Scriptable mock backends (feature `mock`)
//!
//! # Feature Flags
//!
//! - `mock`: Expose [`mock`] to dependent crates' tests
//! - `integration`: Enable tests against the live services
//!
//! # Example
//!
//! ```rust,no_run
//! use vismatch_inference::{DummyJsonCatalog, GeminiClassifier, MatcherConfig};
//! use vismatch_core::{CatalogFetcher, Category};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = MatcherConfig::from_env().unwrap();
//!     let catalog = DummyJsonCatalog::new(config.catalog.clone()).unwrap();
//!     let products = catalog.fetch_by_category(Category::Laptops).await.unwrap();
//!     println!("{} products", products.len());
//! }
//! ```

pub mod catalog;
pub mod config;
pub mod gemini;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

pub use vismatch_core::{CatalogFetcher, CategoryClassifier};

pub use catalog::{parse_catalog, CatalogConfig, DummyJsonCatalog};
pub use config::MatcherConfig;
pub use gemini::{GeminiClassifier, GeminiConfig};
