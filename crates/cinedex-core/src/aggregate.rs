//! Folding annotation results into a [`CategoryIndex`].
//!
//! Aggregation is a single pass in arrival order. Results without a
//! category are skipped. Nothing is sorted or deduplicated.

use crate::models::{
    AnnotationResult, CategoryEntry, CategoryIndex, EnrichmentReport, EnrichmentStats,
    UnclassifiedItem,
};

/// Groups classified results by category.
///
/// # Examples
///
/// ```
/// use cinedex_core::aggregate::aggregate;
/// use cinedex_core::{AnnotationResult, WorkItem};
///
/// let results = vec![
///     AnnotationResult::classified(WorkItem::new("Film A", "url1"), "Drama", String::new(), 1),
///     AnnotationResult::unparseable(WorkItem::new("Film C", "url3"), "??".to_string(), 1),
/// ];
/// let index = aggregate(&results);
/// assert_eq!(index.len(), 1);
/// assert_eq!(index.get("Drama").unwrap()[0].title, "Film A");
/// ```
pub fn aggregate<'a, I>(results: I) -> CategoryIndex
where
    I: IntoIterator<Item = &'a AnnotationResult>,
{
    let mut index = CategoryIndex::new();
    for result in results {
        fold_into(&mut index, result);
    }
    index
}

/// Aggregates results and accounts for the dropped ones.
pub fn summarize<'a, I>(results: I) -> EnrichmentReport
where
    I: IntoIterator<Item = &'a AnnotationResult>,
{
    let mut report = EnrichmentReport::default();
    for result in results {
        record(&mut report, result);
    }
    report
}

/// Folds one result into a report.
pub(crate) fn record(report: &mut EnrichmentReport, result: &AnnotationResult) {
    report.stats.record(result.status);
    if !fold_into(&mut report.index, result) {
        report.unclassified.push(UnclassifiedItem {
            title: result.title.clone(),
            source_url: result.source_url.clone(),
            status: result.status,
        });
    }
}

fn fold_into(index: &mut CategoryIndex, result: &AnnotationResult) -> bool {
    match &result.category {
        Some(category) => {
            index.insert(
                category.clone(),
                CategoryEntry::new(result.title.clone(), result.source_url.clone()),
            );
            true
        }
        None => false,
    }
}

impl EnrichmentStats {
    /// Counts statuses over a set of results.
    pub fn from_results<'a, I>(results: I) -> Self
    where
        I: IntoIterator<Item = &'a AnnotationResult>,
    {
        let mut stats = Self::new();
        for result in results {
            stats.record(result.status);
        }
        stats
    }
}
