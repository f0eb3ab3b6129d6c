//! End-to-end enrichment runs against mock collaborators.

use std::sync::atomic::Ordering;
use std::time::Duration;

use cinedex_core::{
    AnnotationStatus, AppError, BoundedAnnotator, EnrichmentService, PermitPool, PipelineConfig,
    RetryPolicy, WorkItem,
};

use super::common::{MockCatalog, MockOracle, RecordingReporter, Reply, items};

fn films() -> Vec<WorkItem> {
    vec![
        WorkItem::new("Film A", "https://films.example.org/a.webm"),
        WorkItem::new("Film B", "https://films.example.org/b.webm"),
        WorkItem::new("Film C", "https://films.example.org/c.webm"),
    ]
}

/// Test 1: Two films classify as Drama, the unparseable one is absent.
#[tokio::test]
async fn test_two_dramas_and_one_unparseable() {
    // Arrange
    let oracle = MockOracle::new(Reply::garbage())
        .script(
            "Film A",
            vec![Reply::genre("Film A", "https://films.example.org/a.webm", "Drama")],
        )
        .script(
            "Film B",
            vec![Reply::genre("Film B", "https://films.example.org/b.webm", "Drama")],
        );
    let service = EnrichmentService::new(MockCatalog::new(films()), oracle.clone());

    // Act
    let report = service.run().await.unwrap();

    // Assert
    assert_eq!(report.index.len(), 1, "Only one category expected");
    let mut titles: Vec<&str> = report
        .index
        .get("Drama")
        .expect("Drama bucket missing")
        .iter()
        .map(|e| e.title.as_str())
        .collect();
    titles.sort();
    assert_eq!(titles, vec!["Film A", "Film B"]);
    assert!(
        report
            .index
            .iter()
            .all(|(_, entries)| entries.iter().all(|e| e.title != "Film C")),
        "Film C must not appear in any bucket"
    );

    assert_eq!(report.stats.classified, 2);
    assert_eq!(report.stats.unparseable, 1);
    assert_eq!(report.dropped(), 1);
    assert_eq!(report.unclassified[0].title, "Film C");
    assert_eq!(report.unclassified[0].status, AnnotationStatus::Unparseable);
    assert_eq!(oracle.call_count(), 3, "Unparseable answers are not retried");
}

/// Test 2: An empty catalog gives an empty index and no oracle calls.
#[tokio::test]
async fn test_empty_catalog_makes_no_calls() {
    // Arrange
    let oracle = MockOracle::new(Reply::garbage());
    let service = EnrichmentService::new(MockCatalog::new(vec![]), oracle.clone());
    let reporter = RecordingReporter::default();

    // Act
    let report = service.run_with_progress(&reporter).await.unwrap();

    // Assert
    assert!(report.index.is_empty());
    assert_eq!(report.stats.total(), 0);
    assert_eq!(oracle.call_count(), 0);
    assert_eq!(*reporter.enumerated.lock().unwrap(), Some(0));
    assert_eq!(reporter.completed.load(Ordering::SeqCst), 1);
}

/// Test 3: Enumeration failure aborts before any oracle call.
#[tokio::test]
async fn test_enumeration_failure_is_source_unavailable() {
    // Arrange
    let catalog = MockCatalog::unreachable();
    let oracle = MockOracle::new(Reply::garbage());
    let service = EnrichmentService::new(catalog.clone(), oracle.clone());

    // Act
    let result = service.run().await;

    // Assert
    match result {
        Err(AppError::SourceUnavailable(msg)) => {
            assert!(msg.contains("connection refused"), "Cause lost: {msg}")
        }
        other => panic!("Expected SourceUnavailable, got {:?}", other),
    }
    assert_eq!(catalog.list_calls.load(Ordering::SeqCst), 1);
    assert_eq!(oracle.call_count(), 0, "No oracle call after a failed listing");
}

/// Test 4: No more than ten calls are ever in flight with the default pool.
#[tokio::test(start_paused = true)]
async fn test_default_pool_bounds_in_flight_calls() {
    // Arrange
    let oracle = MockOracle::new(Reply::genre("x", "y", "Comedy"))
        .with_latency(Duration::from_millis(200));
    let service = EnrichmentService::new(MockCatalog::new(items(50)), oracle.clone());

    // Act
    let report = service.run().await.unwrap();

    // Assert
    assert_eq!(report.stats.classified, 50);
    assert_eq!(report.index.get("Comedy").unwrap().len(), 50);
    assert!(
        oracle.peak_in_flight() <= 10,
        "Peak in flight was {}",
        oracle.peak_in_flight()
    );
    assert!(oracle.peak_in_flight() > 1, "Calls should overlap");
    assert_eq!(service.annotator().permits().available(), 10);
}

/// Test 5: A smaller injected pool tightens the bound.
#[tokio::test(start_paused = true)]
async fn test_custom_pool_bounds_in_flight_calls() {
    // Arrange
    let oracle = MockOracle::new(Reply::genre("x", "y", "Western"))
        .with_latency(Duration::from_millis(50));
    let config = PipelineConfig::default().with_concurrency(3);
    let service =
        EnrichmentService::with_config(MockCatalog::new(items(20)), oracle.clone(), config)
            .unwrap();

    // Act
    let report = service.run().await.unwrap();

    // Assert
    assert_eq!(report.stats.classified, 20);
    assert!(oracle.peak_in_flight() <= 3);
    assert_eq!(service.annotator().permits().capacity(), 3);
}

/// Test 6: Two services sharing one pool share its bound.
#[tokio::test(start_paused = true)]
async fn test_shared_pool_across_services() {
    // Arrange
    let oracle = MockOracle::new(Reply::genre("x", "y", "Drama"))
        .with_latency(Duration::from_millis(100));
    let pool = PermitPool::new(4).unwrap();
    let first = EnrichmentService::with_annotator(
        MockCatalog::new(items(12)),
        BoundedAnnotator::new(oracle.clone(), pool.clone()),
    );
    let second = EnrichmentService::with_annotator(
        MockCatalog::new(items(12)),
        BoundedAnnotator::new(oracle.clone(), pool.clone()),
    );

    // Act
    let (a, b) = tokio::join!(first.run(), second.run());

    // Assert
    assert_eq!(a.unwrap().stats.classified, 12);
    assert_eq!(b.unwrap().stats.classified, 12);
    assert!(oracle.peak_in_flight() <= 4);
    assert_eq!(pool.available(), 4);
}

/// Test 7: A hung call times out and the item is reported, not indexed.
#[tokio::test(start_paused = true)]
async fn test_hung_call_times_out() {
    // Arrange
    let oracle = MockOracle::new(Reply::genre("x", "y", "Horror")).script("Film 1", vec![Reply::Hang]);
    let config = PipelineConfig::default()
        .with_call_timeout(Duration::from_secs(5))
        .with_retry(RetryPolicy::immediate(3));
    let service =
        EnrichmentService::with_config(MockCatalog::new(items(3)), oracle.clone(), config)
            .unwrap();

    // Act
    let report = service.run().await.unwrap();

    // Assert
    assert_eq!(report.stats.classified, 2);
    assert_eq!(report.stats.timed_out, 1);
    let timed_out = &report.unclassified[0];
    assert_eq!(timed_out.title, "Film 1");
    assert_eq!(timed_out.status, AnnotationStatus::TimedOut);
    assert_eq!(service.annotator().permits().available(), 10);
}

/// Test 8: A rejected API key fails the item without retries.
#[tokio::test]
async fn test_authentication_error_fails_fast() {
    // Arrange
    let oracle = MockOracle::new(Reply::AuthError);
    let reporter = RecordingReporter::default();
    let service = EnrichmentService::new(MockCatalog::new(items(2)), oracle.clone());

    // Act
    let report = service.run_with_progress(&reporter).await.unwrap();

    // Assert
    assert_eq!(report.stats.failed, 2);
    assert!(report.index.is_empty());
    assert_eq!(oracle.call_count(), 2, "One call per item");
    assert_eq!(reporter.retry_count(), 0);
}

/// Test 9: Every item produces exactly one progress event.
#[tokio::test]
async fn test_each_item_reported_once() {
    // Arrange
    let oracle = MockOracle::new(Reply::genre("x", "y", "Drama")).script("Film 2", vec![Reply::garbage()]);
    let reporter = RecordingReporter::default();
    let service = EnrichmentService::new(MockCatalog::new(items(7)), oracle);

    // Act
    let report = service.run_with_progress(&reporter).await.unwrap();

    // Assert
    assert_eq!(reporter.annotated.load(Ordering::SeqCst), 7);
    assert_eq!(report.stats.total(), 7);
    assert_eq!(report.index.entry_count() + report.dropped(), 7);
}

/// Test 10: Trope analysis goes through the same bounded annotator.
#[tokio::test]
async fn test_trope_analysis_through_service_annotator() {
    // Arrange
    let answer = r#"```json
{"film_title": "Nosferatu", "analysis_summary": "Gothic horror.",
 "tropes_identified": [
   {"trope_name": "Creepy Castle", "description": "Orlok's home.", "confidence_score": 0.9},
   {"trope_name": "Plague", "description": "Rats arrive.", "confidence_score": 0.4}
 ]}
```"#;
    let oracle = MockOracle::new(Reply::Text(answer.to_string()));
    let service = EnrichmentService::new(MockCatalog::new(vec![]), oracle.clone());
    let item = WorkItem::new("Nosferatu", "https://films.example.org/nosferatu.webm");

    // Act
    let analysis = service.annotator().analyze_tropes(&item).await;

    // Assert
    assert!(!analysis.is_error());
    assert_eq!(analysis.tropes_identified.len(), 2);
    let confident: Vec<&str> = analysis
        .confident_tropes(0.5)
        .iter()
        .map(|t| t.trope_name.as_str())
        .collect();
    assert_eq!(confident, vec!["Creepy Castle"]);
    assert_eq!(oracle.call_count(), 1);
}
