//! Product catalog backend (DummyJSON-compatible).

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, instrument, trace, warn};

use vismatch_core::defaults::{
    CATALOG_TIMEOUT_MS, CATALOG_URL, ENV_CATALOG_BASE_URL, ENV_CATALOG_TIMEOUT_MS, SLOW_CALL_MS,
};
use vismatch_core::{CatalogFetcher, Category, Error, Product, RawCatalogRecord, Result};

/// Configuration for the catalog backend.
#[derive(Debug, Clone)]
pub struct CatalogConfig {
    /// Base URL; products are read from `{base_url}/products/category/{category}`.
    pub base_url: String,
    /// Request timeout in milliseconds.
    pub timeout_ms: u64,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            base_url: CATALOG_URL.to_string(),
            timeout_ms: CATALOG_TIMEOUT_MS,
        }
    }
}

impl CatalogConfig {
    /// Build from a variable lookup (environment or a test map).
    ///
    /// | Variable | Default |
    /// |----------|---------|
    /// | `CATALOG_BASE_URL` | `https://dummyjson.com` |
    /// | `VISMATCH_CATALOG_TIMEOUT_MS` | `20000` |
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            base_url: lookup(ENV_CATALOG_BASE_URL).unwrap_or_else(|| CATALOG_URL.to_string()),
            timeout_ms: lookup(ENV_CATALOG_TIMEOUT_MS)
                .and_then(|s| s.parse().ok())
                .unwrap_or(CATALOG_TIMEOUT_MS),
        }
    }

    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(Error::Config(format!(
                "Catalog base_url must start with http:// or https://, got: {}",
                self.base_url
            )));
        }
        if self.timeout_ms == 0 {
            return Err(Error::Config(
                "Catalog timeout must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    fn endpoint(&self, category: Category) -> String {
        format!(
            "{}/products/category/{}",
            self.base_url.trim_end_matches('/'),
            category
        )
    }
}

/// Catalog response body. A missing or null list means no products.
#[derive(Debug, Default, Deserialize)]
struct CatalogResponse {
    #[serde(default)]
    products: Option<Vec<RawCatalogRecord>>,
}

/// Decode a catalog body and normalize its records, preserving order.
pub fn parse_catalog(body: &str) -> std::result::Result<Vec<Product>, serde_json::Error> {
    let response: CatalogResponse = serde_json::from_str(body)?;
    Ok(response
        .products
        .unwrap_or_default()
        .iter()
        .map(|record| {
            trace!(id = %record.id, title = %record.title, "Normalizing catalog record");
            Product::from(record)
        })
        .collect())
}

/// Catalog fetcher for DummyJSON-style `products/category` endpoints.
pub struct DummyJsonCatalog {
    client: Client,
    config: CatalogConfig,
}

impl DummyJsonCatalog {
    pub fn new(config: CatalogConfig) -> Result<Self> {
        config.validate()?;

        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))?;

        debug!(base_url = %config.base_url, "Initializing catalog backend");
        Ok(Self { client, config })
    }

    pub fn from_env() -> Result<Self> {
        Self::new(CatalogConfig::from_env())
    }

    pub fn config(&self) -> &CatalogConfig {
        &self.config
    }
}

fn unavailable(status: Option<u16>, detail: impl Into<String>) -> Error {
    Error::CatalogUnavailable {
        status,
        detail: detail.into(),
    }
}

#[async_trait]
impl CatalogFetcher for DummyJsonCatalog {
    #[instrument(skip(self, category), fields(subsystem = "catalog", component = "dummyjson", op = "fetch_by_category", category = %category))]
    async fn fetch_by_category(&self, category: Category) -> Result<Vec<Product>> {
        let start = Instant::now();

        let response = self
            .client
            .get(self.config.endpoint(category))
            .send()
            .await
            .map_err(|e| {
                let detail = if e.is_timeout() {
                    format!("Request timed out after {}ms", self.config.timeout_ms)
                } else {
                    format!("Request failed: {}", e)
                };
                unavailable(e.status().map(|s| s.as_u16()), detail)
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), "Catalog returned an error status");
            return Err(unavailable(
                Some(status.as_u16()),
                format!("Catalog returned {}: {}", status, body),
            ));
        }

        let body = response
            .text()
            .await
            .map_err(|e| unavailable(Some(status.as_u16()), format!("Failed to read body: {}", e)))?;

        let products = parse_catalog(&body).map_err(|e| {
            unavailable(
                Some(status.as_u16()),
                format!("Failed to parse catalog response: {}", e),
            )
        })?;

        let elapsed = start.elapsed().as_millis() as u64;
        debug!(
            result_count = products.len(),
            duration_ms = elapsed,
            "Catalog fetch complete"
        );
        if elapsed > SLOW_CALL_MS {
            warn!(duration_ms = elapsed, slow = true, "Slow catalog operation");
        }
        Ok(products)
    }
}
