//! Centralized default constants for vismatch.
//!
//! **This module is the single source of truth** for shared default values.
//! Backends, the orchestrator and the binary reference these constants
//! instead of defining their own magic numbers.

// =============================================================================
// UPLOAD
// =============================================================================

/// Maximum accepted upload size in bytes (4 MiB).
pub const MAX_UPLOAD_SIZE_BYTES: u64 = 4 * 1024 * 1024;

/// Environment variable overriding the upload size limit.
pub const ENV_MAX_UPLOAD_BYTES: &str = "VISMATCH_MAX_UPLOAD_BYTES";

/// Environment variable restricting the allowed categories (comma-separated).
pub const ENV_ALLOWED_CATEGORIES: &str = "VISMATCH_ALLOWED_CATEGORIES";

// =============================================================================
// CLASSIFIER
// =============================================================================

/// Default Gemini API base URL.
pub const GEMINI_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Default vision model used for classification.
pub const GEMINI_MODEL: &str = "gemini-2.5-flash";

/// Timeout for the classify call in milliseconds.
pub const CLASSIFIER_TIMEOUT_MS: u64 = 20_000;

pub const ENV_GEMINI_BASE_URL: &str = "GEMINI_BASE_URL";
pub const ENV_GEMINI_API_KEY: &str = "GEMINI_API_KEY";
pub const ENV_GEMINI_MODEL: &str = "GEMINI_MODEL";
pub const ENV_CLASSIFIER_TIMEOUT_MS: &str = "VISMATCH_CLASSIFIER_TIMEOUT_MS";

// =============================================================================
// CATALOG
// =============================================================================

/// Default product catalog base URL.
pub const CATALOG_URL: &str = "https://dummyjson.com";

/// Timeout for the catalog call in milliseconds.
pub const CATALOG_TIMEOUT_MS: u64 = 20_000;

/// Currency prefix for formatted prices.
pub const CURRENCY_PREFIX: &str = "$";

pub const ENV_CATALOG_BASE_URL: &str = "CATALOG_BASE_URL";
pub const ENV_CATALOG_TIMEOUT_MS: &str = "VISMATCH_CATALOG_TIMEOUT_MS";

// =============================================================================
// EVENTS
// =============================================================================

/// Capacity of the search state broadcast channel.
pub const STATE_EVENT_CAPACITY: usize = 64;

/// Calls slower than this are logged with `slow = true`.
pub const SLOW_CALL_MS: u64 = 10_000;
