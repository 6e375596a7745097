//! Upload-to-products state machine.
//!
//! Runs `Ingesting -> Classifying -> Fetching -> {Succeeded, Empty, Failed}`
//! for each upload and publishes every committed transition.
//!
//! Every upload and every reset starts a new generation. A transition is
//! committed only if its run is still the current generation, checked inside
//! the state channel's lock, so a superseded run can never overwrite the
//! state of the run that replaced it. A superseded run stops at its next
//! commit and never invokes the following stage.

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{broadcast, watch};
use tracing::{debug, field, info, instrument, warn, Span};

use vismatch_core::defaults::{
    CATALOG_TIMEOUT_MS, CLASSIFIER_TIMEOUT_MS, MAX_UPLOAD_SIZE_BYTES, STATE_EVENT_CAPACITY,
};
use vismatch_core::logging;
use vismatch_core::{
    CatalogFetcher, Category, CategoryClassifier, EncodedImage, Error, ImageIngestor, Product,
    Result, SearchPhase, SearchState,
};
use vismatch_inference::{DummyJsonCatalog, GeminiClassifier, MatcherConfig};

/// Configuration for the orchestrator.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Upload size limit in bytes.
    pub max_upload_size_bytes: u64,
    /// Categories accepted from the classifier before fetching.
    pub allowed_categories: Vec<Category>,
    /// Deadline for the classify call in milliseconds.
    pub classifier_timeout_ms: u64,
    /// Deadline for the catalog call in milliseconds.
    pub catalog_timeout_ms: u64,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_upload_size_bytes: MAX_UPLOAD_SIZE_BYTES,
            allowed_categories: Category::ALL.to_vec(),
            classifier_timeout_ms: CLASSIFIER_TIMEOUT_MS,
            catalog_timeout_ms: CATALOG_TIMEOUT_MS,
        }
    }
}

impl From<&MatcherConfig> for OrchestratorConfig {
    fn from(config: &MatcherConfig) -> Self {
        Self {
            max_upload_size_bytes: config.max_upload_size_bytes,
            allowed_categories: config.allowed_categories.clone(),
            classifier_timeout_ms: config.classifier.timeout_ms,
            catalog_timeout_ms: config.catalog.timeout_ms,
        }
    }
}

impl OrchestratorConfig {
    pub fn with_max_upload_size(mut self, bytes: u64) -> Self {
        self.max_upload_size_bytes = bytes;
        self
    }

    pub fn with_allowed_categories(mut self, allowed: Vec<Category>) -> Self {
        self.allowed_categories = allowed;
        self
    }

    pub fn with_classifier_timeout_ms(mut self, ms: u64) -> Self {
        self.classifier_timeout_ms = ms;
        self
    }

    pub fn with_catalog_timeout_ms(mut self, ms: u64) -> Self {
        self.catalog_timeout_ms = ms;
        self
    }
}

/// Result of an upload call.
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    /// The run reached a terminal phase; this is the committed final state.
    Completed(SearchState),
    /// A newer upload or a reset took over before the run finished.
    Superseded,
}

impl RunOutcome {
    /// Final state, if the run was not superseded.
    pub fn state(&self) -> Option<&SearchState> {
        match self {
            Self::Completed(state) => Some(state),
            Self::Superseded => None,
        }
    }

    pub fn is_superseded(&self) -> bool {
        matches!(self, Self::Superseded)
    }
}

/// Drives uploads through ingestion, classification and catalog lookup.
///
/// All entry points take `&self`; share the orchestrator behind an `Arc` to
/// drive it from several tasks.
pub struct MatchOrchestrator {
    ingestor: ImageIngestor,
    classifier: Arc<dyn CategoryClassifier>,
    catalog: Arc<dyn CatalogFetcher>,
    config: OrchestratorConfig,
    generation: AtomicU64,
    state_tx: watch::Sender<SearchState>,
    event_tx: broadcast::Sender<SearchState>,
}

impl MatchOrchestrator {
    pub fn new(
        config: OrchestratorConfig,
        classifier: Arc<dyn CategoryClassifier>,
        catalog: Arc<dyn CatalogFetcher>,
    ) -> Self {
        let (state_tx, _) = watch::channel(SearchState::default());
        let (event_tx, _) = broadcast::channel(STATE_EVENT_CAPACITY);
        Self {
            ingestor: ImageIngestor::new(config.max_upload_size_bytes),
            classifier,
            catalog,
            config,
            generation: AtomicU64::new(0),
            state_tx,
            event_tx,
        }
    }

    /// Build with the Gemini classifier and the HTTP catalog.
    pub fn from_matcher_config(config: &MatcherConfig) -> Result<Self> {
        config.validate()?;
        let classifier = GeminiClassifier::new(config.classifier.clone())?
            .with_allowed_categories(config.allowed_categories.clone())?;
        let catalog = DummyJsonCatalog::new(config.catalog.clone())?;
        Ok(Self::new(
            OrchestratorConfig::from(config),
            Arc::new(classifier),
            Arc::new(catalog),
        ))
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Latest committed state.
    pub fn snapshot(&self) -> SearchState {
        self.state_tx.borrow().clone()
    }

    /// Receiver for every committed transition, in order.
    pub fn subscribe(&self) -> broadcast::Receiver<SearchState> {
        self.event_tx.subscribe()
    }

    /// Receiver that only tracks the latest state.
    pub fn watch(&self) -> watch::Receiver<SearchState> {
        self.state_tx.subscribe()
    }

    /// Return to `Idle`, abandoning any run in flight.
    pub fn reset(&self) {
        let run = self.next_generation();
        if self.commit(SearchState::idle(run)) {
            debug!(run_id = run, "Search state reset");
        }
    }

    /// Start a run from raw upload bytes.
    #[instrument(
        skip(self, bytes),
        fields(subsystem = "pipeline", component = "orchestrator", op = "handle_new_upload", run_id = field::Empty, size_bytes = bytes.len())
    )]
    pub async fn handle_new_upload(&self, bytes: &[u8], declared_media_type: &str) -> RunOutcome {
        let Some(ingesting) = self.begin() else {
            return RunOutcome::Superseded;
        };
        match self.ingestor.ingest(bytes, declared_media_type) {
            Ok(image) => self.classify_and_fetch(ingesting, Arc::new(image)).await,
            Err(e) => self.finish(ingesting.failed(&e), &e),
        }
    }

    /// Start a run from an image file.
    #[instrument(
        skip(self, path),
        fields(subsystem = "pipeline", component = "orchestrator", op = "handle_file_upload", run_id = field::Empty, path = %path.display())
    )]
    pub async fn handle_file_upload(&self, path: &Path) -> RunOutcome {
        let Some(ingesting) = self.begin() else {
            return RunOutcome::Superseded;
        };
        match self.ingestor.ingest_file(path) {
            Ok(image) => self.classify_and_fetch(ingesting, Arc::new(image)).await,
            Err(e) => self.finish(ingesting.failed(&e), &e),
        }
    }

    /// Start a run from an already encoded image.
    ///
    /// The upload size limit still applies to the decoded length.
    #[instrument(
        skip(self, image),
        fields(subsystem = "pipeline", component = "orchestrator", op = "handle_encoded_upload", run_id = field::Empty, media_type = %image.media_type(), size_bytes = image.byte_len())
    )]
    pub async fn handle_encoded_upload(&self, image: EncodedImage) -> RunOutcome {
        let Some(ingesting) = self.begin() else {
            return RunOutcome::Superseded;
        };
        match self.ingestor.check_encoded(&image) {
            Ok(()) => self.classify_and_fetch(ingesting, Arc::new(image)).await,
            Err(e) => self.finish(ingesting.failed(&e), &e),
        }
    }

    /// Start a run from a `data:` URL, e.g. from a browser upload.
    #[instrument(
        skip(self, url),
        fields(subsystem = "pipeline", component = "orchestrator", op = "handle_data_url_upload", run_id = field::Empty, size_bytes = url.len())
    )]
    pub async fn handle_data_url_upload(&self, url: &str) -> RunOutcome {
        let Some(ingesting) = self.begin() else {
            return RunOutcome::Superseded;
        };
        match self.ingestor.ingest_data_url(url) {
            Ok(image) => self.classify_and_fetch(ingesting, Arc::new(image)).await,
            Err(e) => self.finish(ingesting.failed(&e), &e),
        }
    }

    fn next_generation(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Open a new generation and commit `Ingesting` for it.
    fn begin(&self) -> Option<SearchState> {
        let run = self.next_generation();
        Span::current().record(logging::RUN_ID, run);
        let ingesting = SearchState::ingesting(run);
        self.commit(ingesting.clone()).then_some(ingesting)
    }

    async fn classify_and_fetch(&self, ingesting: SearchState, image: Arc<EncodedImage>) -> RunOutcome {
        let start = Instant::now();

        let classifying = ingesting.classifying(image.clone());
        if !self.commit(classifying.clone()) {
            return RunOutcome::Superseded;
        }
        let category = match self.classify(&image).await {
            Ok(category) => category,
            Err(e) => return self.finish(classifying.failed(&e), &e),
        };

        let fetching = classifying.fetching(category);
        if !self.commit(fetching.clone()) {
            return RunOutcome::Superseded;
        }
        let products = match self.fetch(category).await {
            Ok(products) => products,
            Err(e) => return self.finish(fetching.failed(&e), &e),
        };

        let done = fetching.finished(products);
        if done.phase == SearchPhase::Empty {
            warn!(
                run_id = done.run,
                category = %category,
                "Catalog returned no products for a classified category"
            );
        }
        let outcome = self.commit_terminal(done);
        if let RunOutcome::Completed(ref state) = outcome {
            info!(
                run_id = state.run,
                phase = %state.phase,
                category = %category,
                result_count = state.products.len(),
                duration_ms = start.elapsed().as_millis() as u64,
                "Match run complete"
            );
        }
        outcome
    }

    /// Classify under the configured deadline, then re-check the allow-list.
    async fn classify(&self, image: &EncodedImage) -> Result<Category> {
        let limit = Duration::from_millis(self.config.classifier_timeout_ms);
        let category = tokio::time::timeout(limit, self.classifier.classify(image))
            .await
            .map_err(|_| Error::ClassifierUnavailable {
                status: None,
                detail: format!("No response within {}ms", self.config.classifier_timeout_ms),
            })??;

        if !self.config.allowed_categories.contains(&category) {
            return Err(Error::CategoryUndetermined(format!(
                "'{}' is not an allowed category",
                category
            )));
        }
        Ok(category)
    }

    async fn fetch(&self, category: Category) -> Result<Vec<Product>> {
        let limit = Duration::from_millis(self.config.catalog_timeout_ms);
        tokio::time::timeout(limit, self.catalog.fetch_by_category(category))
            .await
            .map_err(|_| Error::CatalogUnavailable {
                status: None,
                detail: format!("No response within {}ms", self.config.catalog_timeout_ms),
            })?
    }

    fn finish(&self, failed: SearchState, error: &Error) -> RunOutcome {
        warn!(
            run_id = failed.run,
            error_kind = %error.kind(),
            status = ?error.status(),
            error = %error,
            "Match run failed"
        );
        self.commit_terminal(failed)
    }

    fn commit_terminal(&self, state: SearchState) -> RunOutcome {
        if self.commit(state.clone()) {
            RunOutcome::Completed(state)
        } else {
            RunOutcome::Superseded
        }
    }

    /// Swap in `next` if its run is still current. Returns whether it was
    /// committed.
    fn commit(&self, next: SearchState) -> bool {
        let run = next.run;
        let phase = next.phase;
        let generation = &self.generation;
        let event_tx = &self.event_tx;

        let committed = self.state_tx.send_if_modified(move |current| {
            if generation.load(Ordering::SeqCst) != run {
                return false;
            }
            *current = next;
            // No receivers is fine.
            let _ = event_tx.send(current.clone());
            true
        });

        if committed {
            debug!(run_id = run, phase = %phase, "State transition");
        } else {
            debug!(run_id = run, phase = %phase, "Dropping transition from superseded run");
        }
        committed
    }
}
