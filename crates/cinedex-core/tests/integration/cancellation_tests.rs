//! Cancellation of enrichment runs.

use std::sync::atomic::Ordering;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use cinedex_core::EnrichmentService;

use super::common::{MockCatalog, MockOracle, RecordingReporter, Reply, items};

/// Test 1: A token cancelled before the run yields an empty, cancelled report.
#[tokio::test]
async fn test_cancel_before_start() {
    // Arrange
    let oracle = MockOracle::new(Reply::genre("x", "y", "Drama"))
        .with_latency(Duration::from_millis(10));
    let service = EnrichmentService::new(MockCatalog::new(items(5)), oracle);
    let reporter = RecordingReporter::default();
    let token = CancellationToken::new();
    token.cancel();

    // Act
    let report = service.run_cancellable(&reporter, token).await.unwrap();

    // Assert
    assert!(report.cancelled);
    assert!(report.index.is_empty());
    assert_eq!(report.stats.total(), 0);
    assert_eq!(reporter.cancelled.load(Ordering::SeqCst), 1);
    assert_eq!(reporter.completed.load(Ordering::SeqCst), 1);
}

/// Test 2: Cancelling mid-run keeps what already finished and frees every permit.
#[tokio::test(start_paused = true)]
async fn test_cancel_mid_run_keeps_partial_results() {
    // Arrange
    let oracle = MockOracle::new(Reply::genre("x", "y", "Drama"))
        .with_latency(Duration::from_secs(1));
    let service = EnrichmentService::new(MockCatalog::new(items(30)), oracle.clone());
    let reporter = RecordingReporter::default();
    let token = CancellationToken::new();

    let trigger = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(1500)).await;
        trigger.cancel();
    });

    // Act
    let report = service.run_cancellable(&reporter, token).await.unwrap();

    // Assert
    assert!(report.cancelled);
    let done = report.stats.total();
    assert!(done > 0 && done < 30, "Expected a partial run, got {} items", done);
    assert_eq!(report.index.entry_count(), done);
    assert_eq!(reporter.annotated.load(Ordering::SeqCst), done);
    assert_eq!(service.annotator().permits().available(), 10);
    assert!(oracle.call_count() < 30, "Queued items must not be called");
}

/// Test 3: A token that is never cancelled does not change the outcome.
#[tokio::test]
async fn test_uncancelled_token_runs_to_completion() {
    // Arrange
    let oracle = MockOracle::new(Reply::genre("x", "y", "Drama"));
    let service = EnrichmentService::new(MockCatalog::new(items(4)), oracle);
    let reporter = RecordingReporter::default();

    // Act
    let report = service
        .run_cancellable(&reporter, CancellationToken::new())
        .await
        .unwrap();

    // Assert
    assert!(!report.cancelled);
    assert_eq!(report.stats.classified, 4);
    assert_eq!(reporter.cancelled.load(Ordering::SeqCst), 0);
}
