//! Gemini vision classifier.
//!
//! Sends the uploaded image to `models/{model}:generateContent` with a
//! system instruction that constrains the answer to one JSON object naming
//! a category, then validates the answer against the allowed set.
//!
//! # Example
//!
//! ```rust,no_run
//! use vismatch_inference::gemini::{GeminiClassifier, GeminiConfig};
//! use vismatch_core::{CategoryClassifier, ImageIngestor};
//!
//! #[tokio::main]
//! async fn main() {
//!     let classifier = GeminiClassifier::new(GeminiConfig {
//!         api_key: Some("...".to_string()),
//!         ..Default::default()
//!     })
//!     .unwrap();
//!
//!     let bytes = std::fs::read("phone.jpg").unwrap();
//!     let image = ImageIngestor::default().ingest(&bytes, "image/jpeg").unwrap();
//!     let category = classifier.classify(&image).await.unwrap();
//!     println!("{}", category);
//! }
//! ```

mod backend;
pub mod types;

pub use backend::{classification_instruction, parse_classification, GeminiClassifier, GeminiConfig};
