//! Domain models for the enrichment pipeline.
//!
//! - [`WorkItem`]: one title/URL pair awaiting annotation
//! - [`AnnotationResult`]: the outcome of annotating one item
//! - [`CategoryIndex`]: category label → ordered member entries
//! - [`EnrichmentReport`]: the index plus what was dropped on the way

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// One unit of enrichment input.
///
/// Titles are expected to be normalized already (see
/// [`normalize_title`](crate::catalog::normalize_title)).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkItem {
    pub title: String,
    #[serde(rename = "url")]
    pub source_url: String,
}

impl WorkItem {
    pub fn new(title: impl Into<String>, source_url: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            source_url: source_url.into(),
        }
    }
}

/// How an annotation ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnnotationStatus {
    /// The oracle answered with a decodable payload carrying a category.
    Classified,
    /// The oracle answered, but no payload could be decoded from it.
    Unparseable,
    /// An attempt exceeded the per-call deadline.
    TimedOut,
    /// The retry budget was exhausted or a non-transient error occurred.
    Failed,
}

impl AnnotationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnnotationStatus::Classified => "classified",
            AnnotationStatus::Unparseable => "unparseable",
            AnnotationStatus::TimedOut => "timed_out",
            AnnotationStatus::Failed => "failed",
        }
    }
}

impl std::fmt::Display for AnnotationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of annotating one [`WorkItem`].
///
/// `category` is `Some` only when `status` is [`AnnotationStatus::Classified`].
/// `raw_response` keeps the last oracle text received (empty when no
/// response ever arrived) for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnnotationResult {
    pub title: String,
    #[serde(rename = "url")]
    pub source_url: String,
    pub category: Option<String>,
    pub raw_response: String,
    pub status: AnnotationStatus,
    pub attempts: u32,
}

impl AnnotationResult {
    pub fn classified(
        item: WorkItem,
        category: impl Into<String>,
        raw_response: String,
        attempts: u32,
    ) -> Self {
        Self {
            title: item.title,
            source_url: item.source_url,
            category: Some(category.into()),
            raw_response,
            status: AnnotationStatus::Classified,
            attempts,
        }
    }

    pub fn unparseable(item: WorkItem, raw_response: String, attempts: u32) -> Self {
        Self::unclassified(item, raw_response, AnnotationStatus::Unparseable, attempts)
    }

    pub fn timed_out(item: WorkItem, attempts: u32) -> Self {
        Self::unclassified(item, String::new(), AnnotationStatus::TimedOut, attempts)
    }

    pub fn failed(item: WorkItem, raw_response: String, attempts: u32) -> Self {
        Self::unclassified(item, raw_response, AnnotationStatus::Failed, attempts)
    }

    fn unclassified(
        item: WorkItem,
        raw_response: String,
        status: AnnotationStatus,
        attempts: u32,
    ) -> Self {
        Self {
            title: item.title,
            source_url: item.source_url,
            category: None,
            raw_response,
            status,
            attempts,
        }
    }

    pub fn is_classified(&self) -> bool {
        self.category.is_some()
    }
}

/// A member of a category bucket.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CategoryEntry {
    pub title: String,
    #[serde(rename = "url")]
    pub source_url: String,
}

impl CategoryEntry {
    pub fn new(title: impl Into<String>, source_url: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            source_url: source_url.into(),
        }
    }
}

/// Mapping from category label to the entries filed under it.
///
/// Buckets keep first-insertion order, and entries within a bucket keep
/// insertion order. Duplicates are preserved. Serializes as a JSON object.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CategoryIndex {
    buckets: IndexMap<String, Vec<CategoryEntry>>,
}

impl CategoryIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an entry to `category`, creating the bucket on first use.
    pub fn insert(&mut self, category: impl Into<String>, entry: CategoryEntry) {
        self.buckets.entry(category.into()).or_default().push(entry);
    }

    pub fn get(&self, category: &str) -> Option<&[CategoryEntry]> {
        self.buckets.get(category).map(Vec::as_slice)
    }

    /// Category labels in first-insertion order.
    pub fn categories(&self) -> impl Iterator<Item = &str> {
        self.buckets.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[CategoryEntry])> {
        self.buckets
            .iter()
            .map(|(name, entries)| (name.as_str(), entries.as_slice()))
    }

    /// Number of categories.
    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Total number of entries across all buckets.
    pub fn entry_count(&self) -> usize {
        self.buckets.values().map(Vec::len).sum()
    }
}

/// An item that did not make it into the index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnclassifiedItem {
    pub title: String,
    #[serde(rename = "url")]
    pub source_url: String,
    pub status: AnnotationStatus,
}

/// Per-status counters for one enrichment run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EnrichmentStats {
    pub classified: usize,
    pub unparseable: usize,
    pub timed_out: usize,
    pub failed: usize,
}

impl EnrichmentStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an outcome, incrementing the appropriate counter.
    pub fn record(&mut self, status: AnnotationStatus) {
        match status {
            AnnotationStatus::Classified => self.classified += 1,
            AnnotationStatus::Unparseable => self.unparseable += 1,
            AnnotationStatus::TimedOut => self.timed_out += 1,
            AnnotationStatus::Failed => self.failed += 1,
        }
    }

    /// Returns the total number of annotated items.
    pub fn total(&self) -> usize {
        self.classified + self.dropped()
    }

    /// Returns the number of items left out of the index.
    pub fn dropped(&self) -> usize {
        self.unparseable + self.timed_out + self.failed
    }
}

/// Output of an enrichment run: the index plus an account of what was dropped.
#[derive(Debug, Clone, Default, Serialize)]
pub struct EnrichmentReport {
    pub index: CategoryIndex,
    pub stats: EnrichmentStats,
    pub unclassified: Vec<UnclassifiedItem>,
    /// True when the run stopped early on a cancellation request.
    pub cancelled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
}

impl EnrichmentReport {
    pub fn dropped(&self) -> usize {
        self.unclassified.len()
    }

    /// Wall-clock duration of the annotation stage, if it ran.
    pub fn elapsed(&self) -> Option<chrono::Duration> {
        Some(self.finished_at? - self.started_at?)
    }
}
