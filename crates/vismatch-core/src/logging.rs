//! Structured logging field name constants for vismatch.
//!
//! All crates use these names for structured `tracing` fields so log
//! aggregation can query the same keys across subsystems.
//!
//! ## Log Level Contract
//!
//! | Level | Usage |
//! |-------|-------|
//! | ERROR | Degraded service, requires operator attention |
//! | WARN  | Recoverable or suspicious outcome (empty catalog, slow call) |
//! | INFO  | Lifecycle events, run completions |
//! | DEBUG | Phase transitions, request details |
//! | TRACE | Per-record iteration |

// ─── Identity fields ───────────────────────────────────────────────────────

/// Subsystem originating the log event.
/// Values: "ingest", "inference", "catalog", "pipeline"
pub const SUBSYSTEM: &str = "subsystem";

/// Component within a subsystem.
/// Examples: "gemini", "dummyjson", "orchestrator"
pub const COMPONENT: &str = "component";

/// Logical operation name.
/// Examples: "classify", "fetch_by_category", "ingest"
pub const OPERATION: &str = "op";

/// Generation number of the matching run.
pub const RUN_ID: &str = "run_id";

// ─── Entity fields ─────────────────────────────────────────────────────────

/// Category identifier being classified or fetched.
pub const CATEGORY: &str = "category";

/// MIME type of the uploaded image.
pub const MEDIA_TYPE: &str = "media_type";

/// Search phase after a transition.
pub const PHASE: &str = "phase";

// ─── Measurement fields ────────────────────────────────────────────────────

/// Wall-clock duration in milliseconds.
pub const DURATION_MS: &str = "duration_ms";

/// Number of products returned.
pub const RESULT_COUNT: &str = "result_count";

/// Size of the raw upload in bytes.
pub const SIZE_BYTES: &str = "size_bytes";

/// Byte length of a model response.
pub const RESPONSE_LEN: &str = "response_len";

// ─── Inference fields ──────────────────────────────────────────────────────

/// Model name used for classification.
pub const MODEL: &str = "model";

/// HTTP status returned by an upstream service.
pub const STATUS: &str = "status";

// ─── Outcome fields ────────────────────────────────────────────────────────

/// Error kind when a run fails.
pub const ERROR_KIND: &str = "error_kind";

/// Error message when an operation fails.
pub const ERROR_MSG: &str = "error";

/// Slow operation threshold exceeded.
pub const SLOW: &str = "slow";
