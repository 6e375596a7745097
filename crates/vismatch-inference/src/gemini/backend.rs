//! Gemini-based category classifier.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, instrument, warn};

use vismatch_core::defaults::{
    CLASSIFIER_TIMEOUT_MS, ENV_CLASSIFIER_TIMEOUT_MS, ENV_GEMINI_API_KEY, ENV_GEMINI_BASE_URL,
    ENV_GEMINI_MODEL, GEMINI_MODEL, GEMINI_URL, SLOW_CALL_MS,
};
use vismatch_core::{Category, CategoryClassifier, CategoryLabel, EncodedImage, Error, Result};

use super::types::{GeminiErrorResponse, GenerateContentRequest, GenerateContentResponse};

/// Configuration for the Gemini classifier.
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    /// Base URL of the Generative Language API (up to and including the version).
    pub base_url: String,
    /// API key sent in the `x-goog-api-key` header.
    pub api_key: Option<String>,
    /// Vision-capable model name.
    pub model: String,
    /// Request timeout in milliseconds.
    pub timeout_ms: u64,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            base_url: GEMINI_URL.to_string(),
            api_key: None,
            model: GEMINI_MODEL.to_string(),
            timeout_ms: CLASSIFIER_TIMEOUT_MS,
        }
    }
}

impl GeminiConfig {
    /// Build from a variable lookup (environment or a test map).
    ///
    /// | Variable | Default |
    /// |----------|---------|
    /// | `GEMINI_BASE_URL` | `https://generativelanguage.googleapis.com/v1beta` |
    /// | `GEMINI_API_KEY` | (none) |
    /// | `GEMINI_MODEL` | `gemini-2.5-flash` |
    /// | `VISMATCH_CLASSIFIER_TIMEOUT_MS` | `20000` |
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            base_url: lookup(ENV_GEMINI_BASE_URL).unwrap_or_else(|| GEMINI_URL.to_string()),
            api_key: lookup(ENV_GEMINI_API_KEY).filter(|k| !k.is_empty()),
            model: lookup(ENV_GEMINI_MODEL).unwrap_or_else(|| GEMINI_MODEL.to_string()),
            timeout_ms: lookup(ENV_CLASSIFIER_TIMEOUT_MS)
                .and_then(|s| s.parse().ok())
                .unwrap_or(CLASSIFIER_TIMEOUT_MS),
        }
    }

    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(Error::Config(format!(
                "Gemini base_url must start with http:// or https://, got: {}",
                self.base_url
            )));
        }
        if self.model.is_empty() {
            return Err(Error::Config("Gemini model cannot be empty".to_string()));
        }
        if self.timeout_ms == 0 {
            return Err(Error::Config(
                "Classifier timeout must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            self.model
        )
    }
}

/// Build the constrained-output instruction for the given category set.
pub fn classification_instruction(allowed: &[Category]) -> String {
    let options = allowed
        .iter()
        .map(|c| format!("\"{}\"", c))
        .collect::<Vec<_>>()
        .join(", ");
    let example = allowed.first().copied().unwrap_or(Category::Smartphones);

    format!(
        "Analyze the product in the image. Respond with ONLY ONE of the following valid \
         categories in a JSON format: {}. Example response: {{ \"category\": \"{}\" }}",
        options, example
    )
}

/// Validate a raw `generateContent` body down to an allowed category.
///
/// Each step has its own failure:
/// 1. body not JSON, or no `candidates[0].content.parts[0].text` -> malformed
/// 2. candidate text not JSON -> malformed
/// 3. no non-empty string `category` in it -> undetermined
/// 4. category outside the closed set or `allowed` -> undetermined
pub fn parse_classification(body: &str, allowed: &[Category]) -> Result<Category> {
    let response: GenerateContentResponse = serde_json::from_str(body).map_err(|e| {
        Error::MalformedClassifierResponse(format!("body is not valid JSON: {}", e))
    })?;

    let text = response.first_text().ok_or_else(|| {
        Error::MalformedClassifierResponse(
            "missing candidates[0].content.parts[0].text".to_string(),
        )
    })?;

    let answer: serde_json::Value = serde_json::from_str(text.trim()).map_err(|e| {
        Error::MalformedClassifierResponse(format!("candidate text is not JSON: {}", e))
    })?;

    let raw = answer
        .get("category")
        .and_then(serde_json::Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| {
            Error::CategoryUndetermined("response does not name a category".to_string())
        })?;

    CategoryLabel::parse(raw).into_allowed(allowed)
}

/// Category classifier backed by Gemini `generateContent`.
pub struct GeminiClassifier {
    client: Client,
    config: GeminiConfig,
    allowed: Vec<Category>,
    instruction: String,
}

impl GeminiClassifier {
    /// Create a classifier over all categories.
    pub fn new(config: GeminiConfig) -> Result<Self> {
        config.validate()?;

        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))?;

        debug!(
            base_url = %config.base_url,
            model = %config.model,
            "Initializing Gemini classifier"
        );

        let allowed = Category::ALL.to_vec();
        let instruction = classification_instruction(&allowed);
        Ok(Self {
            client,
            config,
            allowed,
            instruction,
        })
    }

    /// Create from environment variables.
    pub fn from_env() -> Result<Self> {
        Self::new(GeminiConfig::from_env())
    }

    /// Restrict the categories offered to and accepted from the model.
    pub fn with_allowed_categories(mut self, allowed: Vec<Category>) -> Result<Self> {
        if allowed.is_empty() {
            return Err(Error::Config(
                "Allowed category list cannot be empty".to_string(),
            ));
        }
        self.instruction = classification_instruction(&allowed);
        self.allowed = allowed;
        Ok(self)
    }

    pub fn config(&self) -> &GeminiConfig {
        &self.config
    }

    pub fn allowed_categories(&self) -> &[Category] {
        &self.allowed
    }

    pub fn instruction(&self) -> &str {
        &self.instruction
    }
}

fn unavailable(status: Option<u16>, detail: impl Into<String>) -> Error {
    Error::ClassifierUnavailable {
        status,
        detail: detail.into(),
    }
}

#[async_trait]
impl CategoryClassifier for GeminiClassifier {
    #[instrument(skip(self, image), fields(subsystem = "inference", component = "gemini", op = "classify", model = %self.config.model, media_type = %image.media_type()))]
    async fn classify(&self, image: &EncodedImage) -> Result<Category> {
        let start = Instant::now();
        let request = GenerateContentRequest::image_json(
            &self.instruction,
            image.media_type().mime_type(),
            image.payload(),
        );

        let mut builder = self.client.post(self.config.endpoint()).json(&request);
        if let Some(ref key) = self.config.api_key {
            builder = builder.header("x-goog-api-key", key);
        }

        let response = builder.send().await.map_err(|e| {
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
            let message = serde_json::from_str::<GeminiErrorResponse>(&body)
                .map(|r| r.error.message)
                .unwrap_or(body);
            warn!(status = status.as_u16(), error = %message, "Gemini returned an error status");
            return Err(unavailable(
                Some(status.as_u16()),
                format!("Gemini returned {}: {}", status, message),
            ));
        }

        let body = response
            .text()
            .await
            .map_err(|e| unavailable(Some(status.as_u16()), format!("Failed to read body: {}", e)))?;

        let category = parse_classification(&body, &self.allowed)?;

        let elapsed = start.elapsed().as_millis() as u64;
        debug!(
            category = %category,
            response_len = body.len(),
            duration_ms = elapsed,
            "Classification complete"
        );
        if elapsed > SLOW_CALL_MS {
            warn!(duration_ms = elapsed, slow = true, "Slow classify operation");
        }
        Ok(category)
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}
