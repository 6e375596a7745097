//! Combined configuration for a matcher instance.

use vismatch_core::defaults::{ENV_ALLOWED_CATEGORIES, ENV_MAX_UPLOAD_BYTES, MAX_UPLOAD_SIZE_BYTES};
use vismatch_core::{Category, Error, Result};

use crate::catalog::CatalogConfig;
use crate::gemini::GeminiConfig;

/// Everything needed to build an ingestor, classifier and catalog.
#[derive(Debug, Clone)]
pub struct MatcherConfig {
    /// Upload size limit in bytes (inclusive).
    pub max_upload_size_bytes: u64,
    /// Categories the classifier may answer with.
    pub allowed_categories: Vec<Category>,
    pub classifier: GeminiConfig,
    pub catalog: CatalogConfig,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            max_upload_size_bytes: MAX_UPLOAD_SIZE_BYTES,
            allowed_categories: Category::ALL.to_vec(),
            classifier: GeminiConfig::default(),
            catalog: CatalogConfig::default(),
        }
    }
}

impl MatcherConfig {
    /// Build from a variable lookup.
    ///
    /// | Variable | Default |
    /// |----------|---------|
    /// | `VISMATCH_MAX_UPLOAD_BYTES` | `4194304` |
    /// | `VISMATCH_ALLOWED_CATEGORIES` | all 20 categories |
    ///
    /// Classifier and catalog variables are documented on their configs.
    /// An unknown entry in the category list is an error rather than being
    /// silently dropped.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let max_upload_size_bytes = match lookup(ENV_MAX_UPLOAD_BYTES) {
            Some(raw) => raw.trim().parse().map_err(|_| {
                Error::Config(format!("{} must be a byte count, got: {}", ENV_MAX_UPLOAD_BYTES, raw))
            })?,
            None => MAX_UPLOAD_SIZE_BYTES,
        };

        let allowed_categories = match lookup(ENV_ALLOWED_CATEGORIES) {
            Some(raw) if !raw.trim().is_empty() => Category::parse_list(&raw)?,
            _ => Category::ALL.to_vec(),
        };

        Ok(Self {
            max_upload_size_bytes,
            allowed_categories,
            classifier: GeminiConfig::from_lookup(&lookup),
            catalog: CatalogConfig::from_lookup(&lookup),
        })
    }

    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Validate the configuration and both backend configs.
    pub fn validate(&self) -> Result<()> {
        if self.max_upload_size_bytes == 0 {
            return Err(Error::Config(
                "Upload size limit must be greater than zero".to_string(),
            ));
        }
        if self.allowed_categories.is_empty() {
            return Err(Error::Config(
                "At least one category must be allowed".to_string(),
            ));
        }
        self.classifier.validate()?;
        self.catalog.validate()
    }
}
