//! Mock classifier and catalog backends for deterministic testing.
//!
//! Both mocks record every call and can be scripted per call with a result
//! and a simulated latency, which is what the orchestrator tests need to
//! exercise timeouts and superseded runs.
//!
//! ## Usage
//!
//! ```rust
//! use vismatch_core::Category;
//! use vismatch_inference::mock::{MockCatalog, MockClassifier};
//!
//! let classifier = MockClassifier::new()
//!     .with_category(Category::Laptops)
//!     .with_latency_ms(50);
//! let catalog = MockCatalog::new();
//! assert_eq!(classifier.call_count(), 0);
//! assert_eq!(catalog.call_count(), 0);
//! ```

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use vismatch_core::{
    CatalogFetcher, Category, CategoryClassifier, EncodedImage, Error, MediaType, Product,
    RawCatalogRecord, Result,
};

/// One scripted response.
#[derive(Debug, Clone)]
struct MockStep<T> {
    result: Result<T>,
    latency_ms: u64,
}

/// A recorded call.
#[derive(Debug, Clone)]
pub struct MockCall {
    pub operation: String,
    pub input: String,
    pub timestamp: Instant,
}

#[derive(Debug)]
struct MockState<T> {
    script: VecDeque<MockStep<T>>,
    fallback: MockStep<T>,
    calls: Vec<MockCall>,
}

impl<T: Clone> MockState<T> {
    fn new(fallback: Result<T>) -> Self {
        Self {
            script: VecDeque::new(),
            fallback: MockStep {
                result: fallback,
                latency_ms: 0,
            },
            calls: Vec::new(),
        }
    }

    fn next(&mut self, operation: &str, input: String) -> MockStep<T> {
        self.calls.push(MockCall {
            operation: operation.to_string(),
            input,
            timestamp: Instant::now(),
        });
        self.script
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone())
    }
}

async fn simulate_latency(latency_ms: u64) {
    if latency_ms > 0 {
        tokio::time::sleep(Duration::from_millis(latency_ms)).await;
    }
}

// =============================================================================
// CLASSIFIER
// =============================================================================

/// Mock category classifier.
///
/// Without scripting it answers [`Category::Smartphones`] immediately.
#[derive(Clone)]
pub struct MockClassifier {
    state: Arc<Mutex<MockState<Category>>>,
}

impl MockClassifier {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(MockState::new(Ok(Category::Smartphones)))),
        }
    }

    /// Answer every unscripted call with `category`.
    pub fn with_category(self, category: Category) -> Self {
        self.state.lock().unwrap().fallback.result = Ok(category);
        self
    }

    /// Fail every unscripted call with `error`.
    pub fn with_error(self, error: Error) -> Self {
        self.state.lock().unwrap().fallback.result = Err(error);
        self
    }

    /// Latency applied to every unscripted call.
    pub fn with_latency_ms(self, latency_ms: u64) -> Self {
        self.state.lock().unwrap().fallback.latency_ms = latency_ms;
        self
    }

    /// Queue a one-shot response; queued responses are used in order before
    /// the fallback.
    pub fn then_respond(self, result: Result<Category>, latency_ms: u64) -> Self {
        self.state
            .lock()
            .unwrap()
            .script
            .push_back(MockStep { result, latency_ms });
        self
    }

    pub fn get_calls(&self) -> Vec<MockCall> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn call_count(&self) -> usize {
        self.state.lock().unwrap().calls.len()
    }
}

impl Default for MockClassifier {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CategoryClassifier for MockClassifier {
    async fn classify(&self, image: &EncodedImage) -> Result<Category> {
        let input = format!("{}:{}", image.media_type(), image.byte_len());
        let step = self.state.lock().unwrap().next("classify", input);
        simulate_latency(step.latency_ms).await;
        step.result
    }

    fn model_name(&self) -> &str {
        "mock-classifier"
    }
}

// =============================================================================
// CATALOG
// =============================================================================

/// Mock catalog.
///
/// Categories without registered products return an empty list.
#[derive(Clone)]
pub struct MockCatalog {
    state: Arc<Mutex<MockState<Vec<Product>>>>,
    listings: Arc<Mutex<HashMap<Category, Vec<Product>>>>,
}

impl MockCatalog {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(MockState::new(Ok(Vec::new())))),
            listings: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Register raw records for a category; they are normalized the same
    /// way the HTTP catalog normalizes them.
    pub fn with_records(self, category: Category, records: Vec<RawCatalogRecord>) -> Self {
        let products = records.iter().map(Product::from).collect();
        self.listings.lock().unwrap().insert(category, products);
        self
    }

    /// Fail every unscripted call with `error`.
    pub fn with_error(self, error: Error) -> Self {
        self.state.lock().unwrap().fallback.result = Err(error);
        self
    }

    /// Latency applied to every unscripted call.
    pub fn with_latency_ms(self, latency_ms: u64) -> Self {
        self.state.lock().unwrap().fallback.latency_ms = latency_ms;
        self
    }

    /// Queue a one-shot response that overrides the registered listings.
    pub fn then_respond(self, result: Result<Vec<Product>>, latency_ms: u64) -> Self {
        self.state
            .lock()
            .unwrap()
            .script
            .push_back(MockStep { result, latency_ms });
        self
    }

    pub fn get_calls(&self) -> Vec<MockCall> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn call_count(&self) -> usize {
        self.state.lock().unwrap().calls.len()
    }

    /// Categories requested so far, in call order.
    pub fn requested_categories(&self) -> Vec<String> {
        self.get_calls().into_iter().map(|c| c.input).collect()
    }
}

impl Default for MockCatalog {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CatalogFetcher for MockCatalog {
    async fn fetch_by_category(&self, category: Category) -> Result<Vec<Product>> {
        let (step, scripted) = {
            let mut state = self.state.lock().unwrap();
            let scripted = !state.script.is_empty();
            (state.next("fetch_by_category", category.to_string()), scripted)
        };
        simulate_latency(step.latency_ms).await;

        match step.result {
            Ok(_) if !scripted => Ok(self
                .listings
                .lock()
                .unwrap()
                .get(&category)
                .cloned()
                .unwrap_or_default()),
            other => other,
        }
    }
}

/// Minimal valid PNG header, enough for magic byte detection.
pub const PNG_FIXTURE: &[u8] = &[
    0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44, 0x52,
];

/// Encoded image fixture for tests that start past ingestion.
pub fn encoded_png_fixture() -> EncodedImage {
    let url = format!(
        "data:{};base64,iVBORw0KGgoAAAANSUhEUg==",
        MediaType::Png.mime_type()
    );
    // Payload is the base64 of PNG_FIXTURE.
    EncodedImage::from_data_url(&url).expect("fixture is a valid data URL")
}
