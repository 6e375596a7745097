//! # vismatch-pipeline
//!
//! Matching pipeline for vismatch: takes an uploaded image through
//! ingestion, classification and catalog lookup, and exposes the resulting
//! [`SearchState`] to observers.
//!
//! # Example
//!
//! ```rust,no_run
//! use vismatch_inference::MatcherConfig;
//! use vismatch_pipeline::{MatchOrchestrator, RunOutcome};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = MatcherConfig::from_env().unwrap();
//!     let orchestrator = MatchOrchestrator::from_matcher_config(&config).unwrap();
//!
//!     let bytes = std::fs::read("shoe.jpg").unwrap();
//!     if let RunOutcome::Completed(state) =
//!         orchestrator.handle_new_upload(&bytes, "image/jpeg").await
//!     {
//!         println!("{}: {} products", state.phase, state.products.len());
//!     }
//! }
//! ```

pub mod orchestrator;

pub use orchestrator::{MatchOrchestrator, OrchestratorConfig, RunOutcome};
pub use vismatch_core::{SearchPhase, SearchState};
