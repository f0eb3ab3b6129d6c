//! Retry and backoff behaviour of the annotation stage.

use std::time::Duration;

use cinedex_core::{
    AnnotationStatus, BoundedAnnotator, EnrichmentService, Jitter, PermitPool, PipelineConfig,
    RetryPolicy, WorkItem,
};

use super::common::{MockCatalog, MockOracle, RecordingReporter, Reply};

fn single_film() -> Vec<WorkItem> {
    vec![WorkItem::new("Film A", "https://films.example.org/a.webm")]
}

/// Test 1: Two transient failures, then success.
#[tokio::test(start_paused = true)]
async fn test_two_failures_then_success() {
    // Arrange
    let oracle = MockOracle::new(Reply::garbage()).script(
        "Film A",
        vec![
            Reply::TransportError,
            Reply::TransportError,
            Reply::genre("Film A", "https://films.example.org/a.webm", "Drama"),
        ],
    );
    let reporter = RecordingReporter::default();
    let service = EnrichmentService::new(MockCatalog::new(single_film()), oracle.clone());

    // Act
    let report = service.run_with_progress(&reporter).await.unwrap();

    // Assert
    assert_eq!(report.stats.classified, 1);
    assert_eq!(report.index.get("Drama").unwrap().len(), 1);
    assert!(
        reporter.retry_count() >= 2,
        "Expected at least two backoff delays, saw {}",
        reporter.retry_count()
    );
    assert_eq!(oracle.call_count(), 3);
}

/// Test 2: Backoff delays actually elapse between attempts.
#[tokio::test(start_paused = true)]
async fn test_backoff_waits_between_attempts() {
    // Arrange
    let oracle = MockOracle::new(Reply::garbage()).script(
        "Film A",
        vec![
            Reply::TransportError,
            Reply::TransportError,
            Reply::genre("Film A", "u", "Drama"),
        ],
    );
    let policy = RetryPolicy::default()
        .with_base_delay(Duration::from_secs(2))
        .with_jitter(Jitter::None);
    let annotator =
        BoundedAnnotator::new(oracle, PermitPool::default()).with_retry_policy(policy);
    let started = tokio::time::Instant::now();

    // Act
    let result = annotator
        .annotate(WorkItem::new("Film A", "u"))
        .await;

    // Assert
    assert_eq!(result.status, AnnotationStatus::Classified);
    assert_eq!(result.attempts, 3);
    assert!(
        started.elapsed() >= Duration::from_secs(6),
        "2s + 4s of backoff expected, got {:?}",
        started.elapsed()
    );
}

/// Test 3: An always-failing oracle exhausts the attempt budget.
#[tokio::test(start_paused = true)]
async fn test_exhausted_attempts_mark_item_failed() {
    // Arrange
    let oracle = MockOracle::new(Reply::TransportError);
    let reporter = RecordingReporter::default();
    let config = PipelineConfig::default().with_retry(RetryPolicy::default().with_max_attempts(4));
    let service =
        EnrichmentService::with_config(MockCatalog::new(single_film()), oracle.clone(), config)
            .unwrap();

    // Act
    let report = service.run_with_progress(&reporter).await.unwrap();

    // Assert
    assert!(report.index.is_empty());
    assert_eq!(report.stats.failed, 1);
    assert_eq!(report.unclassified[0].status, AnnotationStatus::Failed);
    assert_eq!(oracle.call_count(), 4);
    assert_eq!(reporter.retry_count(), 3, "No delay after the last attempt");
}

/// Test 4: Backoff never exceeds the cap, even deep into a retry run.
#[tokio::test(start_paused = true)]
async fn test_backoff_capped() {
    // Arrange
    let oracle = MockOracle::new(Reply::TransportError);
    let policy = RetryPolicy::default()
        .with_max_attempts(12)
        .with_max_delay(Duration::from_secs(120))
        .with_jitter(Jitter::None);
    let annotator =
        BoundedAnnotator::new(oracle, PermitPool::default()).with_retry_policy(policy);
    let started = tokio::time::Instant::now();

    // Act
    let result = annotator.annotate(WorkItem::new("Film A", "u")).await;

    // Assert: 1+2+4+8+16+32+64 then 120 * 4.
    assert_eq!(result.status, AnnotationStatus::Failed);
    assert_eq!(result.attempts, 12);
    let expected = Duration::from_secs(127 + 120 * 4);
    assert!(
        started.elapsed() >= expected && started.elapsed() < expected + Duration::from_secs(1),
        "Unexpected total backoff {:?}",
        started.elapsed()
    );
}

/// Test 5: Retries of one item do not hold a permit while sleeping.
#[tokio::test(start_paused = true)]
async fn test_backoff_releases_permit() {
    // Arrange
    let oracle = MockOracle::new(Reply::genre("x", "y", "Comedy")).script(
        "Film A",
        vec![Reply::TransportError, Reply::genre("Film A", "u", "Drama")],
    );
    let pool = PermitPool::new(1).unwrap();
    let annotator = BoundedAnnotator::new(oracle, pool.clone()).with_retry_policy(
        RetryPolicy::default()
            .with_base_delay(Duration::from_secs(60))
            .with_jitter(Jitter::None),
    );
    let retrying = annotator.clone();
    let started = tokio::time::Instant::now();

    // Act
    let slow = tokio::spawn(async move { retrying.annotate(WorkItem::new("Film A", "u")).await });
    tokio::time::sleep(Duration::from_secs(1)).await;
    let fast = annotator.annotate(WorkItem::new("Film B", "v")).await;
    let fast_elapsed = started.elapsed();
    let slow = slow.await.unwrap();

    // Assert
    assert_eq!(fast.category.as_deref(), Some("Comedy"));
    assert_eq!(slow.category.as_deref(), Some("Drama"));
    assert!(
        fast_elapsed < Duration::from_secs(60),
        "Film B waited for Film A's backoff: {:?}",
        fast_elapsed
    );
    assert_eq!(pool.available(), 1);
}
