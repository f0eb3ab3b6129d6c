//! Grouping of stored catalog rows by an existing column.
//!
//! Once a catalog has been enriched and written back, the browsing views
//! group rows by genre, language, director or year. These groupings reuse
//! [`CategoryIndex`] so they serialize the same way as enrichment output.

use crate::catalog::CatalogRecord;
use crate::models::CategoryIndex;

/// Columns the browsing views group by.
pub const STANDARD_FIELDS: &[&str] = &["genre", "language", "director", "year"];

/// Groups `records` by the value of `field`.
///
/// Rows in which the field is missing, null, or empty are skipped. Bucket
/// order follows first appearance in `records`.
///
/// # Examples
///
/// ```
/// use cinedex_core::catalog::CatalogRecord;
/// use cinedex_core::grouping::group_by_field;
/// use serde_json::json;
///
/// let rows = [
///     json!({"title": "Metropolis", "url": "u1", "year": 1927}),
///     json!({"title": "Sunrise", "url": "u2", "year": 1927}),
///     json!({"title": "The Kid", "url": "u3", "year": null}),
/// ];
/// let records: Vec<CatalogRecord> = rows
///     .into_iter()
///     .filter_map(|row| CatalogRecord::from_row(row, "title", "url"))
///     .collect();
///
/// let by_year = group_by_field(&records, "year");
/// assert_eq!(by_year.get("1927").unwrap().len(), 2);
/// assert_eq!(by_year.entry_count(), 2);
/// ```
pub fn group_by_field(records: &[CatalogRecord], field: &str) -> CategoryIndex {
    let mut index = CategoryIndex::new();
    let mut skipped = 0usize;

    for record in records {
        match record.field(field) {
            Some(key) => index.insert(key, record.to_entry()),
            None => skipped += 1,
        }
    }

    if skipped > 0 {
        tracing::debug!(field, skipped, "Rows without a value were not grouped");
    }
    index
}

/// Keeps records whose `field` contains `needle`, ignoring case.
///
/// Stored genres may be compound, so `"drama"` matches `"Drama, Romance"`.
pub fn filter_by_field<'a>(
    records: &'a [CatalogRecord],
    field: &str,
    needle: &str,
) -> Vec<&'a CatalogRecord> {
    let needle = needle.trim().to_lowercase();
    records
        .iter()
        .filter(|record| {
            record
                .field(field)
                .is_some_and(|value| value.to_lowercase().contains(&needle))
        })
        .collect()
}
