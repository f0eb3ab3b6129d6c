//! Progress reporting for enrichment runs.
//!
//! The pipeline emits [`EnrichmentEvent`]s through a [`ProgressReporter`]
//! instead of logging directly, so the CLI, tests, and future frontends can
//! each decide what to do with them.

use std::time::Duration;

use tracing::{debug, info, warn};

use crate::models::{AnnotationResult, EnrichmentStats};

// =============================================================================
// Events
// =============================================================================

/// Events emitted during an enrichment run.
#[derive(Debug, Clone)]
pub enum EnrichmentEvent<'a> {
    /// The catalog listing is about to be requested.
    EnumerationStarted,
    /// The catalog returned `total` work items.
    Enumerated { total: usize },
    /// An oracle attempt failed and another will follow after `delay`.
    RetryScheduled {
        title: &'a str,
        attempt: u32,
        delay: Duration,
        error: &'a str,
    },
    /// One item finished annotation.
    ItemAnnotated { result: &'a AnnotationResult },
    /// Periodic progress summary.
    Progress {
        current: usize,
        total: usize,
        classified: usize,
        dropped: usize,
    },
    /// The run stopped on a cancellation request.
    Cancelled { processed: usize, total: usize },
    /// The run finished and the index was built.
    Completed {
        stats: &'a EnrichmentStats,
        categories: usize,
    },
}

// =============================================================================
// Reporter Trait
// =============================================================================

/// Receives enrichment events.
pub trait ProgressReporter: Send + Sync {
    /// Called when an event occurs.
    ///
    /// The default implementation does nothing (silent mode).
    fn report(&self, event: EnrichmentEvent<'_>) {
        let _ = event;
    }
}

/// Reporter that ignores all events.
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentReporter;

impl ProgressReporter for SilentReporter {}

/// Tracing-based reporter for CLI logging.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl ProgressReporter for TracingReporter {
    fn report(&self, event: EnrichmentEvent<'_>) {
        match event {
            EnrichmentEvent::EnumerationStarted => {
                info!("Listing catalog items...");
            }
            EnrichmentEvent::Enumerated { total } => {
                info!(total, "Catalog listed");
            }
            EnrichmentEvent::RetryScheduled {
                title,
                attempt,
                delay,
                error,
            } => {
                warn!(
                    title,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    error,
                    "Oracle call failed, retrying"
                );
            }
            EnrichmentEvent::ItemAnnotated { result } => {
                debug!(
                    title = %result.title,
                    status = %result.status,
                    category = result.category.as_deref().unwrap_or("-"),
                    attempts = result.attempts,
                    "Item annotated"
                );
            }
            EnrichmentEvent::Progress {
                current,
                total,
                classified,
                dropped,
            } => {
                info!(current, total, classified, dropped, "Enrichment progress");
            }
            EnrichmentEvent::Cancelled { processed, total } => {
                warn!(processed, total, "Enrichment cancelled");
            }
            EnrichmentEvent::Completed { stats, categories } => {
                info!(
                    classified = stats.classified,
                    unparseable = stats.unparseable,
                    timed_out = stats.timed_out,
                    failed = stats.failed,
                    categories,
                    "Enrichment complete"
                );
            }
        }
    }
}
