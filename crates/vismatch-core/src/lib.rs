//! # vismatch-core
//!
//! Core types, traits, and abstractions for the vismatch visual product
//! matcher.
//!
//! This crate provides the data model shared by the inference backends and
//! the matching pipeline: the closed category set, encoded images, catalog
//! records and their normalized products, the search state aggregate, the
//! error taxonomy and the upload ingestor.

pub mod category;
pub mod defaults;
pub mod error;
pub mod image;
pub mod ingest;
pub mod logging;
pub mod product;
pub mod state;
pub mod traits;

// Re-export commonly used types at crate root
pub use category::{Category, CategoryLabel};
pub use error::{Error, ErrorKind, Result};
pub use image::{EncodedImage, MediaType};
pub use ingest::ImageIngestor;
pub use product::{format_price, Product, ProductId, RawCatalogRecord};
pub use state::{SearchPhase, SearchState};
pub use traits::{CatalogFetcher, CategoryClassifier};
