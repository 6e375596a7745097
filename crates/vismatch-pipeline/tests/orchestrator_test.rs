//! End-to-end orchestrator tests against scripted mock backends.

use std::sync::Arc;
use std::time::Duration;

use vismatch_core::{
    Category, Error, ErrorKind, MediaType, Product, ProductId, RawCatalogRecord, SearchPhase,
    SearchState,
};
use vismatch_inference::mock::{encoded_png_fixture, MockCatalog, MockClassifier, PNG_FIXTURE};
use vismatch_pipeline::{MatchOrchestrator, OrchestratorConfig, RunOutcome};

fn jpeg_bytes(len: usize) -> Vec<u8> {
    let mut bytes = vec![0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, b'J', b'F', b'I', b'F', 0x00];
    bytes.resize(len, 0x42);
    bytes
}

fn record(id: i64, title: &str, brand: Option<&str>, price: f64) -> RawCatalogRecord {
    RawCatalogRecord {
        id: ProductId::Int(id),
        title: title.to_string(),
        brand: brand.map(str::to_string),
        price,
        category: "smartphones".to_string(),
        thumbnail: format!("https://cdn.example/{}.png", id),
    }
}

fn smartphone_records() -> Vec<RawCatalogRecord> {
    vec![
        record(121, "iPhone 15 Pro", Some("Apple"), 1299.99),
        record(122, "Galaxy S24", Some("Samsung"), 999.0),
        record(123, "Unbranded Phone", None, 49.5),
    ]
}

fn orchestrator(
    config: OrchestratorConfig,
    classifier: &MockClassifier,
    catalog: &MockCatalog,
) -> MatchOrchestrator {
    MatchOrchestrator::new(
        config,
        Arc::new(classifier.clone()),
        Arc::new(catalog.clone()),
    )
}

fn completed(outcome: RunOutcome) -> SearchState {
    match outcome {
        RunOutcome::Completed(state) => state,
        RunOutcome::Superseded => panic!("Expected a completed run"),
    }
}

fn assert_cleared_idle(state: &SearchState) {
    assert_eq!(state.phase, SearchPhase::Idle);
    assert!(state.uploaded_image.is_none());
    assert!(state.category.is_none());
    assert!(state.products.is_empty());
    assert!(state.error_message.is_none());
}

#[tokio::test]
async fn test_jpeg_upload_matches_smartphones() {
    let classifier = MockClassifier::new().with_category(Category::Smartphones);
    let catalog = MockCatalog::new().with_records(Category::Smartphones, smartphone_records());
    let orch = orchestrator(OrchestratorConfig::default(), &classifier, &catalog);

    let bytes = jpeg_bytes(2 * 1024 * 1024);
    let state = completed(orch.handle_new_upload(&bytes, "image/jpeg").await);

    assert_eq!(state.phase, SearchPhase::Succeeded);
    assert_eq!(state.category, Some(Category::Smartphones));
    assert!(state.error_message.is_none());

    let image = state.uploaded_image.as_ref().expect("image retained");
    assert_eq!(image.media_type(), MediaType::Jpeg);
    assert_eq!(image.byte_len(), bytes.len());

    assert_eq!(state.products.len(), 3);
    assert_eq!(state.products[0].display_price, "$1299.99");
    assert_eq!(state.products[0].brand, "Apple");
    assert_eq!(state.products[1].display_price, "$999.00");
    assert_eq!(state.products[2].brand, "smartphones");
    assert_eq!(state.products[2].display_price, "$49.50");

    assert_eq!(classifier.call_count(), 1);
    assert_eq!(catalog.requested_categories(), vec!["smartphones"]);
    assert_eq!(orch.snapshot(), state);
}

#[tokio::test]
async fn test_transitions_are_published_in_order() {
    let classifier = MockClassifier::new().with_category(Category::Smartphones);
    let catalog = MockCatalog::new().with_records(Category::Smartphones, smartphone_records());
    let orch = orchestrator(OrchestratorConfig::default(), &classifier, &catalog);
    let mut events = orch.subscribe();

    completed(orch.handle_new_upload(PNG_FIXTURE, "image/png").await);

    let mut phases = Vec::new();
    while let Ok(state) = events.try_recv() {
        phases.push(state.phase);
    }
    assert_eq!(
        phases,
        vec![
            SearchPhase::Ingesting,
            SearchPhase::Classifying,
            SearchPhase::Fetching,
            SearchPhase::Succeeded,
        ]
    );
}

#[tokio::test]
async fn test_classifier_server_error_fails_run() {
    let classifier = MockClassifier::new().with_error(Error::ClassifierUnavailable {
        status: Some(500),
        detail: "Internal error".to_string(),
    });
    let catalog = MockCatalog::new();
    let orch = orchestrator(OrchestratorConfig::default(), &classifier, &catalog);

    let state = completed(orch.handle_new_upload(PNG_FIXTURE, "image/png").await);

    assert_eq!(state.phase, SearchPhase::Failed(ErrorKind::ClassifierUnavailable));
    assert!(state.products.is_empty());
    assert!(state.uploaded_image.is_some());
    let message = state.error_message.as_deref().unwrap();
    assert!(message.contains("unavailable"), "message: {}", message);
    assert!(message.contains("500"), "message: {}", message);
    assert_eq!(catalog.call_count(), 0);
}

#[tokio::test]
async fn test_undetermined_category_skips_catalog() {
    let classifier = MockClassifier::new().with_error(Error::CategoryUndetermined(
        "response does not name a category".to_string(),
    ));
    let catalog = MockCatalog::new();
    let orch = orchestrator(OrchestratorConfig::default(), &classifier, &catalog);

    let state = completed(orch.handle_encoded_upload(encoded_png_fixture()).await);

    assert_eq!(state.phase, SearchPhase::Failed(ErrorKind::CategoryUndetermined));
    assert_eq!(
        state.error_message.as_deref(),
        Some("Could not determine a product category from the image.")
    );
    assert_eq!(catalog.call_count(), 0);
}

#[tokio::test]
async fn test_category_outside_allow_list_is_rejected() {
    let classifier = MockClassifier::new().with_category(Category::Motorcycle);
    let catalog = MockCatalog::new();
    let config = OrchestratorConfig::default()
        .with_allowed_categories(vec![Category::Smartphones, Category::Laptops]);
    let orch = orchestrator(config, &classifier, &catalog);

    let state = completed(orch.handle_encoded_upload(encoded_png_fixture()).await);

    assert_eq!(state.phase, SearchPhase::Failed(ErrorKind::CategoryUndetermined));
    assert!(state.category.is_none());
    assert_eq!(catalog.call_count(), 0);
}

#[tokio::test]
async fn test_empty_catalog_is_not_an_error() {
    let classifier = MockClassifier::new().with_category(Category::Lighting);
    let catalog = MockCatalog::new();
    let orch = orchestrator(OrchestratorConfig::default(), &classifier, &catalog);

    let state = completed(orch.handle_encoded_upload(encoded_png_fixture()).await);

    assert_eq!(state.phase, SearchPhase::Empty);
    assert_eq!(state.category, Some(Category::Lighting));
    assert!(state.products.is_empty());
    assert_eq!(
        state.error_message.as_deref(),
        Some("No products found in the 'lighting' category. Try a different image.")
    );
}

#[tokio::test]
async fn test_catalog_failure_keeps_image_and_category() {
    let classifier = MockClassifier::new().with_category(Category::Tops);
    let catalog = MockCatalog::new().with_error(Error::CatalogUnavailable {
        status: Some(404),
        detail: "Not Found".to_string(),
    });
    let orch = orchestrator(OrchestratorConfig::default(), &classifier, &catalog);

    let state = completed(orch.handle_encoded_upload(encoded_png_fixture()).await);

    assert_eq!(state.phase, SearchPhase::Failed(ErrorKind::CatalogUnavailable));
    assert_eq!(state.category, Some(Category::Tops));
    assert!(state.uploaded_image.is_some());
    assert_eq!(
        state.error_message.as_deref(),
        Some("Failed to fetch products from the catalog (status 404).")
    );
}

#[tokio::test]
async fn test_oversized_upload_fails_without_network_calls() {
    let classifier = MockClassifier::new();
    let catalog = MockCatalog::new();
    let config = OrchestratorConfig::default().with_max_upload_size(1024);
    let orch = orchestrator(config, &classifier, &catalog);

    let state = completed(orch.handle_new_upload(&jpeg_bytes(1025), "image/jpeg").await);

    assert_eq!(state.phase, SearchPhase::Failed(ErrorKind::SizeExceeded));
    assert!(state.uploaded_image.is_none());
    assert_eq!(classifier.call_count(), 0);
    assert_eq!(catalog.call_count(), 0);
}

#[tokio::test]
async fn test_default_limit_message() {
    let classifier = MockClassifier::new();
    let catalog = MockCatalog::new();
    let orch = orchestrator(OrchestratorConfig::default(), &classifier, &catalog);

    let bytes = jpeg_bytes(4 * 1024 * 1024 + 1);
    let state = completed(orch.handle_new_upload(&bytes, "image/jpeg").await);

    assert_eq!(
        state.error_message.as_deref(),
        Some("File is too large. Please upload an image under 4MB.")
    );
}

#[tokio::test]
async fn test_oversized_encoded_upload_fails_without_network_calls() {
    let classifier = MockClassifier::new();
    let catalog = MockCatalog::new();
    let config = OrchestratorConfig::default().with_max_upload_size(8);
    let orch = orchestrator(config, &classifier, &catalog);

    let image = encoded_png_fixture();
    let size = image.byte_len() as u64;
    let state = completed(orch.handle_encoded_upload(image).await);

    assert_eq!(state.phase, SearchPhase::Failed(ErrorKind::SizeExceeded));
    assert!(state.uploaded_image.is_none());
    assert!(size > 8);
    assert_eq!(classifier.call_count(), 0);
    assert_eq!(catalog.call_count(), 0);
}

#[tokio::test]
async fn test_data_url_upload_is_ingested() {
    let classifier = MockClassifier::new().with_category(Category::Smartphones);
    let catalog = MockCatalog::new().with_records(Category::Smartphones, smartphone_records());
    let orch = orchestrator(OrchestratorConfig::default(), &classifier, &catalog);

    let url = encoded_png_fixture().to_data_url();
    let state = completed(orch.handle_data_url_upload(&url).await);

    assert_eq!(state.phase, SearchPhase::Succeeded);
    assert_eq!(
        state.uploaded_image.as_ref().map(|i| i.media_type()),
        Some(MediaType::Png)
    );
}

#[tokio::test]
async fn test_oversized_data_url_upload_fails_without_network_calls() {
    let classifier = MockClassifier::new();
    let catalog = MockCatalog::new();
    let config = OrchestratorConfig::default().with_max_upload_size(16);
    let orch = orchestrator(config, &classifier, &catalog);

    // Plain text labelled as PNG, larger than the limit.
    let url = "data:image/png;base64,\
               VGhpcyBpcyBub3QgYW4gaW1hZ2UsIGl0IGlzIGp1c3QgZmlmdHktZm91ciBieXRlcyBvZiB0ZXh0IQ==";
    let state = completed(orch.handle_data_url_upload(url).await);

    assert_eq!(state.phase, SearchPhase::Failed(ErrorKind::SizeExceeded));
    assert_eq!(classifier.call_count(), 0);
    assert_eq!(catalog.call_count(), 0);
}

#[tokio::test]
async fn test_non_image_data_url_upload_is_unreadable() {
    let classifier = MockClassifier::new();
    let catalog = MockCatalog::new();
    let orch = orchestrator(OrchestratorConfig::default(), &classifier, &catalog);

    let state = completed(
        orch.handle_data_url_upload("data:image/png;base64,anVzdCBzb21lIHRleHQ=")
            .await,
    );

    assert_eq!(state.phase, SearchPhase::Failed(ErrorKind::UnreadableInput));
    assert_eq!(classifier.call_count(), 0);
}

#[tokio::test]
async fn test_snapshot_json_omits_image_payload() {
    let classifier = MockClassifier::new().with_category(Category::Smartphones);
    let catalog = MockCatalog::new().with_records(Category::Smartphones, smartphone_records());
    let orch = orchestrator(OrchestratorConfig::default(), &classifier, &catalog);

    let bytes = jpeg_bytes(64 * 1024);
    let state = completed(orch.handle_new_upload(&bytes, "image/jpeg").await);
    let json = serde_json::to_value(&state).unwrap();

    assert_eq!(json["uploaded_image"]["media_type"], "image/jpeg");
    assert_eq!(json["uploaded_image"]["byte_len"], 64 * 1024);
    assert!(json["uploaded_image"].get("payload").is_none());
    assert!(json.to_string().len() < 4 * 1024);
}

#[tokio::test]
async fn test_unreadable_upload_fails() {
    let classifier = MockClassifier::new();
    let catalog = MockCatalog::new();
    let orch = orchestrator(OrchestratorConfig::default(), &classifier, &catalog);

    let state = completed(orch.handle_new_upload(b"%PDF-1.7 not an image", "image/png").await);

    assert_eq!(state.phase, SearchPhase::Failed(ErrorKind::UnreadableInput));
    assert_eq!(
        state.error_message.as_deref(),
        Some("Failed to read the file. Please try again.")
    );
    assert_eq!(classifier.call_count(), 0);
}

#[tokio::test]
async fn test_file_upload() {
    let classifier = MockClassifier::new().with_category(Category::Smartphones);
    let catalog = MockCatalog::new().with_records(Category::Smartphones, smartphone_records());
    let orch = orchestrator(OrchestratorConfig::default(), &classifier, &catalog);

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("phone.png");
    std::fs::write(&path, PNG_FIXTURE).unwrap();

    let state = completed(orch.handle_file_upload(&path).await);
    assert_eq!(state.phase, SearchPhase::Succeeded);
    assert_eq!(state.products.len(), 3);

    let missing = completed(orch.handle_file_upload(&dir.path().join("missing.png")).await);
    assert_eq!(missing.phase, SearchPhase::Failed(ErrorKind::UnreadableInput));
}

#[tokio::test]
async fn test_reset_is_idempotent() {
    let classifier = MockClassifier::new().with_category(Category::Smartphones);
    let catalog = MockCatalog::new().with_records(Category::Smartphones, smartphone_records());
    let orch = orchestrator(OrchestratorConfig::default(), &classifier, &catalog);

    completed(orch.handle_encoded_upload(encoded_png_fixture()).await);
    orch.reset();
    let once = orch.snapshot();
    orch.reset();
    let twice = orch.snapshot();

    assert_cleared_idle(&once);
    assert_cleared_idle(&twice);
    assert_eq!(
        SearchState { run: 0, ..once },
        SearchState { run: 0, ..twice }
    );
}

#[tokio::test(start_paused = true)]
async fn test_classifier_timeout_fails_run() {
    let classifier = MockClassifier::new()
        .with_category(Category::Tops)
        .with_latency_ms(60_000);
    let catalog = MockCatalog::new();
    let config = OrchestratorConfig::default().with_classifier_timeout_ms(500);
    let orch = orchestrator(config, &classifier, &catalog);

    let state = completed(orch.handle_encoded_upload(encoded_png_fixture()).await);

    assert_eq!(state.phase, SearchPhase::Failed(ErrorKind::ClassifierUnavailable));
    assert_eq!(
        state.error_message.as_deref(),
        Some("The image analysis service is unavailable. Please try again later.")
    );
    assert_eq!(catalog.call_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_catalog_timeout_fails_run() {
    let classifier = MockClassifier::new().with_category(Category::Tops);
    let catalog = MockCatalog::new().with_latency_ms(60_000);
    let config = OrchestratorConfig::default().with_catalog_timeout_ms(500);
    let orch = orchestrator(config, &classifier, &catalog);

    let state = completed(orch.handle_encoded_upload(encoded_png_fixture()).await);

    assert_eq!(state.phase, SearchPhase::Failed(ErrorKind::CatalogUnavailable));
    assert_eq!(state.category, Some(Category::Tops));
}

#[tokio::test(start_paused = true)]
async fn test_superseded_run_never_overwrites_newer_run() {
    // First classify call is slow, second is fast.
    let classifier = MockClassifier::new()
        .then_respond(Ok(Category::Laptops), 1_000)
        .then_respond(Ok(Category::Tops), 10);
    let catalog = MockCatalog::new()
        .with_records(Category::Laptops, vec![record(1, "Laptop", None, 10.0)])
        .with_records(Category::Tops, vec![record(2, "Shirt", None, 5.0)]);
    let orch = orchestrator(OrchestratorConfig::default(), &classifier, &catalog);

    let first = orch.handle_encoded_upload(encoded_png_fixture());
    let second = async {
        tokio::time::sleep(Duration::from_millis(100)).await;
        orch.handle_encoded_upload(encoded_png_fixture()).await
    };
    let (first, second) = tokio::join!(first, second);

    assert!(first.is_superseded());
    let second = completed(second);
    assert_eq!(second.category, Some(Category::Tops));

    // The slow run stopped before reaching the catalog.
    assert_eq!(catalog.requested_categories(), vec!["tops"]);

    let snapshot = orch.snapshot();
    assert_eq!(snapshot, second);
    assert_eq!(snapshot.products[0].id, ProductId::Int(2));
}

#[tokio::test(start_paused = true)]
async fn test_run_superseded_while_fetching_never_overwrites_newer_run() {
    let laptop = Product::from(&record(1, "Laptop", None, 10.0));
    let classifier = MockClassifier::new()
        .then_respond(Ok(Category::Laptops), 0)
        .then_respond(Ok(Category::Tops), 0);
    // First catalog call is slow; the second falls through to the listing.
    let catalog = MockCatalog::new()
        .then_respond(Ok(vec![laptop]), 1_000)
        .with_records(Category::Tops, vec![record(2, "Shirt", None, 5.0)]);
    let orch = orchestrator(OrchestratorConfig::default(), &classifier, &catalog);
    let mut events = orch.subscribe();

    let first = orch.handle_encoded_upload(encoded_png_fixture());
    let second = async {
        tokio::time::sleep(Duration::from_millis(100)).await;
        orch.handle_encoded_upload(encoded_png_fixture()).await
    };
    let (first, second) = tokio::join!(first, second);

    assert!(first.is_superseded());
    let second = completed(second);
    assert_eq!(second.phase, SearchPhase::Succeeded);
    assert_eq!(second.category, Some(Category::Tops));
    assert_eq!(catalog.requested_categories(), vec!["laptops", "tops"]);

    // The first run did reach Fetching before it was replaced.
    let mut first_run_phases = Vec::new();
    while let Ok(state) = events.try_recv() {
        if state.run != second.run {
            first_run_phases.push(state.phase);
        }
    }
    assert_eq!(first_run_phases.last(), Some(&SearchPhase::Fetching));

    let snapshot = orch.snapshot();
    assert_eq!(snapshot, second);
    assert_eq!(snapshot.products[0].id, ProductId::Int(2));
}

#[tokio::test(start_paused = true)]
async fn test_reset_abandons_run_in_flight() {
    let classifier = MockClassifier::new()
        .with_category(Category::Tops)
        .with_latency_ms(1_000);
    let catalog = MockCatalog::new();
    let orch = orchestrator(OrchestratorConfig::default(), &classifier, &catalog);

    let run = orch.handle_encoded_upload(encoded_png_fixture());
    let reset = async {
        tokio::time::sleep(Duration::from_millis(100)).await;
        orch.reset();
    };
    let (outcome, ()) = tokio::join!(run, reset);

    assert!(outcome.is_superseded());
    assert_cleared_idle(&orch.snapshot());
    assert_eq!(catalog.call_count(), 0);
}

#[tokio::test]
async fn test_new_upload_after_failure_starts_fresh() {
    let classifier = MockClassifier::new()
        .then_respond(
            Err(Error::MalformedClassifierResponse("not json".to_string())),
            0,
        )
        .with_category(Category::Smartphones);
    let catalog = MockCatalog::new().with_records(Category::Smartphones, smartphone_records());
    let orch = orchestrator(OrchestratorConfig::default(), &classifier, &catalog);

    let failed = completed(orch.handle_encoded_upload(encoded_png_fixture()).await);
    assert_eq!(
        failed.phase,
        SearchPhase::Failed(ErrorKind::MalformedClassifierResponse)
    );

    let retried = completed(orch.handle_encoded_upload(encoded_png_fixture()).await);
    assert_eq!(retried.phase, SearchPhase::Succeeded);
    assert!(retried.error_message.is_none());
    assert!(retried.run > failed.run);
}
