//! Enrichment service: enumerate, annotate concurrently, aggregate.
//!
//! # Architecture
//!
//! [`EnrichmentService`] is generic over two traits:
//! - [`CatalogSource`] - lists the work items
//! - [`AnnotationOracle`] - classifies them, wrapped in a [`BoundedAnnotator`]
//!
//! A run goes through three stages:
//!
//! ```text
//! list_items() ──► annotate × N (permit pool) ──► fold in completion order
//! ```
//!
//! Every item is submitted at once; the annotator's permit pool is the only
//! throttle. Results are folded as they complete, so bucket order reflects
//! completion order rather than catalog order.
//!
//! # Failure Policy
//!
//! Enumeration failure aborts the run with [`AppError::SourceUnavailable`]
//! before any oracle call. Per-item failures never abort: they are counted
//! and listed in [`EnrichmentReport::unclassified`].
//!
//! # Cancellation Support
//!
//! [`run_cancellable`](EnrichmentService::run_cancellable) stops at the first
//! cancellation signal. In-flight calls are dropped (releasing their
//! permits), results already received are kept, and the report is marked
//! `cancelled`.

use chrono::Utc;
use futures::StreamExt;
use futures::stream::FuturesUnordered;
use tokio_util::sync::CancellationToken;

use crate::aggregate;
use crate::annotate::BoundedAnnotator;
use crate::config::PipelineConfig;
use crate::error::AppError;
use crate::models::{EnrichmentReport, WorkItem};
use crate::permit::PermitPool;
use crate::progress::{EnrichmentEvent, ProgressReporter, SilentReporter};
use crate::traits::{AnnotationOracle, CatalogSource};

/// Service running the enrichment pipeline over one catalog.
///
/// # Example
///
/// ```ignore
/// use cinedex_core::EnrichmentService;
///
/// let service = EnrichmentService::new(catalog_client, gemini_client);
/// let report = service.run().await?;
/// println!("{} categories, {} dropped", report.index.len(), report.dropped());
/// ```
pub struct EnrichmentService<C, O>
where
    C: CatalogSource,
    O: AnnotationOracle,
{
    catalog: C,
    annotator: BoundedAnnotator<O>,
}

impl<C, O> Clone for EnrichmentService<C, O>
where
    C: CatalogSource,
    O: AnnotationOracle,
{
    fn clone(&self) -> Self {
        Self {
            catalog: self.catalog.clone(),
            annotator: self.annotator.clone(),
        }
    }
}

impl<C, O> EnrichmentService<C, O>
where
    C: CatalogSource,
    O: AnnotationOracle,
{
    /// Creates a service with the default pipeline configuration.
    pub fn new(catalog: C, oracle: O) -> Self {
        Self {
            catalog,
            annotator: BoundedAnnotator::new(oracle, PermitPool::default()),
        }
    }

    /// Creates a service with a custom pipeline configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if `config.concurrency` is zero.
    pub fn with_config(catalog: C, oracle: O, config: PipelineConfig) -> Result<Self, AppError> {
        let permits = PermitPool::new(config.concurrency)?;
        let annotator = BoundedAnnotator::new(oracle, permits)
            .with_retry_policy(config.retry)
            .with_call_timeout(config.call_timeout);
        Ok(Self { catalog, annotator })
    }

    /// Creates a service around a preconfigured annotator.
    pub fn with_annotator(catalog: C, annotator: BoundedAnnotator<O>) -> Self {
        Self { catalog, annotator }
    }

    pub fn annotator(&self) -> &BoundedAnnotator<O> {
        &self.annotator
    }

    pub fn catalog(&self) -> &C {
        &self.catalog
    }

    /// Lists the work items, reporting any failure as `SourceUnavailable`.
    pub async fn enumerate(&self) -> Result<Vec<WorkItem>, AppError> {
        self.catalog.list_items().await.map_err(|e| match e {
            AppError::SourceUnavailable(_) => e,
            other => AppError::SourceUnavailable(other.to_string()),
        })
    }

    /// Runs the whole pipeline.
    ///
    /// # Errors
    ///
    /// Returns `SourceUnavailable` if the catalog cannot be listed. No other
    /// error escapes a run.
    pub async fn run(&self) -> Result<EnrichmentReport, AppError> {
        self.run_with_progress(&SilentReporter).await
    }

    /// Runs the whole pipeline, emitting progress events.
    pub async fn run_with_progress<R: ProgressReporter>(
        &self,
        reporter: &R,
    ) -> Result<EnrichmentReport, AppError> {
        self.run_cancellable(reporter, CancellationToken::new())
            .await
    }

    /// Runs the whole pipeline until done or cancelled.
    pub async fn run_cancellable<R: ProgressReporter>(
        &self,
        reporter: &R,
        cancel: CancellationToken,
    ) -> Result<EnrichmentReport, AppError> {
        reporter.report(EnrichmentEvent::EnumerationStarted);
        let items = match self.enumerate().await {
            Ok(items) => items,
            Err(e) => {
                tracing::error!(error = %e, "Catalog enumeration failed, aborting run");
                return Err(e);
            }
        };
        reporter.report(EnrichmentEvent::Enumerated { total: items.len() });

        Ok(self.annotate_items(items, reporter, cancel).await)
    }

    /// Annotates `items` concurrently and folds the results.
    ///
    /// Never fails: every item ends up in the index or in
    /// [`EnrichmentReport::unclassified`], unless the run is cancelled first.
    pub async fn annotate_items<R: ProgressReporter>(
        &self,
        items: Vec<WorkItem>,
        reporter: &R,
        cancel: CancellationToken,
    ) -> EnrichmentReport {
        let total = items.len();
        let report_interval = std::cmp::max(total / 20, 50);
        let mut report = EnrichmentReport {
            started_at: Some(Utc::now()),
            ..EnrichmentReport::default()
        };
        let mut processed = 0usize;
        let mut last_reported = 0usize;

        let mut pending: FuturesUnordered<_> = items
            .into_iter()
            .map(|item| self.annotator.annotate_with_progress(item, reporter))
            .collect();

        while !pending.is_empty() {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    report.cancelled = true;
                    break;
                }
                Some(result) = pending.next() => {
                    reporter.report(EnrichmentEvent::ItemAnnotated { result: &result });
                    aggregate::record(&mut report, &result);
                    processed += 1;

                    if processed >= last_reported + report_interval || processed == total {
                        last_reported = processed;
                        reporter.report(EnrichmentEvent::Progress {
                            current: processed,
                            total,
                            classified: report.stats.classified,
                            dropped: report.stats.dropped(),
                        });
                    }
                }
            }
        }
        // Dropping the unfinished futures returns their permits.
        drop(pending);
        report.finished_at = Some(Utc::now());

        if report.cancelled {
            tracing::info!(
                processed,
                total,
                permits_in_use = self.annotator.permits().in_use(),
                "Enrichment cancelled, keeping partial results"
            );
            reporter.report(EnrichmentEvent::Cancelled { processed, total });
        }

        reporter.report(EnrichmentEvent::Completed {
            stats: &report.stats,
            categories: report.index.len(),
        });
        report
    }
}
