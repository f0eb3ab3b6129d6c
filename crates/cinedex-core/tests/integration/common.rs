//! Test utilities and mock implementations for integration tests.
//!
//! Provides mock implementations of the core traits for testing
//! `EnrichmentService` in isolation.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use cinedex_core::catalog::CatalogRecord;
use cinedex_core::traits::{AnnotationOracle, CatalogSource};
use cinedex_core::{AppError, EnrichmentEvent, ProgressReporter, WorkItem};

// =============================================================================
// MockCatalog
// =============================================================================

/// Catalog returning a fixed list of items, or failing.
#[derive(Clone)]
pub struct MockCatalog {
    items: Vec<WorkItem>,
    fail: bool,
    pub list_calls: Arc<AtomicUsize>,
}

impl MockCatalog {
    pub fn new(items: Vec<WorkItem>) -> Self {
        Self {
            items,
            fail: false,
            list_calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// A catalog whose listing always fails with a network error.
    pub fn unreachable() -> Self {
        Self {
            fail: true,
            ..Self::new(Vec::new())
        }
    }
}

impl CatalogSource for MockCatalog {
    async fn list_records(&self) -> Result<Vec<CatalogRecord>, AppError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(AppError::NetworkError("connection refused".to_string()));
        }
        Ok(self
            .items
            .iter()
            .filter_map(|item| {
                CatalogRecord::from_row(
                    serde_json::json!({"title": item.title, "url": item.source_url}),
                    "title",
                    "url",
                )
            })
            .collect())
    }
}

// =============================================================================
// MockOracle
// =============================================================================

/// One scripted oracle behaviour.
#[derive(Clone, Debug)]
pub enum Reply {
    /// Answer with this text.
    Text(String),
    /// Fail with a transient network error.
    TransportError,
    /// Fail with an authentication error (not retryable).
    AuthError,
    /// Never answer.
    Hang,
}

impl Reply {
    /// A well-formed answer classifying `title` under `genre`.
    pub fn genre(title: &str, url: &str, genre: &str) -> Self {
        Reply::Text(format!(
            "```json\n{{\"title\": \"{title}\", \"url\": \"{url}\", \"genre\": \"{genre}\"}}\n```"
        ))
    }

    pub fn garbage() -> Self {
        Reply::Text("Sorry, I could not find any information about that film.".to_string())
    }
}

/// Oracle answering per title from a script.
///
/// Each title has a queue of replies; the last reply repeats once the queue
/// is down to one. Titles without a script get `default`. The oracle tracks
/// how many calls are in flight and the highest level observed.
#[derive(Clone)]
pub struct MockOracle {
    scripts: Arc<Mutex<HashMap<String, VecDeque<Reply>>>>,
    default: Reply,
    latency: Duration,
    pub calls: Arc<AtomicUsize>,
    in_flight: Arc<AtomicUsize>,
    pub max_in_flight: Arc<AtomicUsize>,
}

impl MockOracle {
    pub fn new(default: Reply) -> Self {
        Self {
            scripts: Arc::new(Mutex::new(HashMap::new())),
            default,
            latency: Duration::ZERO,
            calls: Arc::new(AtomicUsize::new(0)),
            in_flight: Arc::new(AtomicUsize::new(0)),
            max_in_flight: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn script(self, title: &str, replies: Vec<Reply>) -> Self {
        self.scripts
            .lock()
            .unwrap()
            .insert(title.to_string(), replies.into());
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn peak_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn next_reply(&self, title: &str) -> Reply {
        let mut scripts = self.scripts.lock().unwrap();
        match scripts.get_mut(title) {
            Some(queue) if queue.len() > 1 => queue.pop_front().unwrap(),
            Some(queue) => queue.front().cloned().unwrap_or_else(|| self.default.clone()),
            None => self.default.clone(),
        }
    }

    async fn answer(&self, title: &str) -> Result<String, AppError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        let _guard = InFlightGuard(Arc::clone(&self.in_flight));

        let reply = self.next_reply(title);
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        match reply {
            Reply::Text(text) => Ok(text),
            Reply::TransportError => Err(AppError::NetworkError("connection reset".to_string())),
            Reply::AuthError => Err(AppError::OracleError(
                cinedex_core::OracleErrorDetails::new(
                    cinedex_core::OracleErrorKind::Authentication,
                    "API key not valid",
                    401,
                ),
            )),
            Reply::Hang => {
                std::future::pending::<()>().await;
                unreachable!()
            }
        }
    }
}

/// Decrements the in-flight counter even when the call future is dropped.
struct InFlightGuard(Arc<AtomicUsize>);

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl AnnotationOracle for MockOracle {
    async fn classify(&self, title: &str, _url: &str) -> Result<String, AppError> {
        self.answer(title).await
    }

    async fn analyze_tropes(&self, title: &str, _url: &str) -> Result<String, AppError> {
        self.answer(title).await
    }
}

// =============================================================================
// RecordingReporter
// =============================================================================

/// Reporter counting the events the tests care about.
#[derive(Default)]
pub struct RecordingReporter {
    pub retries: AtomicUsize,
    pub annotated: AtomicUsize,
    pub enumerated: Mutex<Option<usize>>,
    pub cancelled: AtomicUsize,
    pub completed: AtomicUsize,
    pub retry_titles: Mutex<Vec<String>>,
}

impl RecordingReporter {
    pub fn retry_count(&self) -> usize {
        self.retries.load(Ordering::SeqCst)
    }
}

impl ProgressReporter for RecordingReporter {
    fn report(&self, event: EnrichmentEvent<'_>) {
        match event {
            EnrichmentEvent::Enumerated { total } => {
                *self.enumerated.lock().unwrap() = Some(total);
            }
            EnrichmentEvent::RetryScheduled { title, .. } => {
                self.retries.fetch_add(1, Ordering::SeqCst);
                self.retry_titles.lock().unwrap().push(title.to_string());
            }
            EnrichmentEvent::ItemAnnotated { .. } => {
                self.annotated.fetch_add(1, Ordering::SeqCst);
            }
            EnrichmentEvent::Cancelled { .. } => {
                self.cancelled.fetch_add(1, Ordering::SeqCst);
            }
            EnrichmentEvent::Completed { .. } => {
                self.completed.fetch_add(1, Ordering::SeqCst);
            }
            EnrichmentEvent::EnumerationStarted | EnrichmentEvent::Progress { .. } => {}
        }
    }
}

// =============================================================================
// Fixtures
// =============================================================================

pub fn items(n: usize) -> Vec<WorkItem> {
    (0..n)
        .map(|i| WorkItem::new(format!("Film {i}"), format!("https://films.example.org/{i}.webm")))
        .collect()
}
