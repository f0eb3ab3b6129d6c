//! Catalog rows and title normalization.
//!
//! Catalog stores expose rows as loose JSON objects. A [`CatalogRecord`]
//! pins down the two columns the pipeline needs (title and URL) and keeps
//! the rest for field grouping.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::models::{CategoryEntry, WorkItem};

/// Media file extensions stripped from catalog titles.
const MEDIA_EXTENSIONS: &[&str] = &["webm", "ogv", "ogg", "mp4", "mkv", "mov", "avi", "mpg"];

const FILE_PREFIX: &str = "File:";

/// Turns a raw media-file name into a human-readable title.
///
/// Strips a leading `File:` namespace and a trailing media extension.
/// Unknown extensions are left alone so titles such as `Dr. Strangelove`
/// survive.
///
/// # Examples
///
/// ```
/// use cinedex_core::catalog::normalize_title;
///
/// assert_eq!(normalize_title("File:Nosferatu (1922).webm"), "Nosferatu (1922)");
/// assert_eq!(normalize_title("The General.ogv"), "The General");
/// assert_eq!(normalize_title("Dr. Strangelove"), "Dr. Strangelove");
/// ```
pub fn normalize_title(raw: &str) -> String {
    let trimmed = raw.trim();
    let without_prefix = trimmed.strip_prefix(FILE_PREFIX).unwrap_or(trimmed);

    let without_extension = match without_prefix.rsplit_once('.') {
        Some((stem, ext))
            if !stem.is_empty()
                && MEDIA_EXTENSIONS
                    .iter()
                    .any(|known| known.eq_ignore_ascii_case(ext)) =>
        {
            stem
        }
        _ => without_prefix,
    };

    without_extension.trim().to_string()
}

/// One catalog row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CatalogRecord {
    pub title: String,
    pub url: String,
    /// Every column of the row, including the title and URL columns.
    pub fields: Map<String, Value>,
}

impl CatalogRecord {
    /// Builds a record from a JSON row.
    ///
    /// Returns `None` if the row is not an object or lacks a non-empty
    /// string in either the title or the URL column. The title is
    /// normalized with [`normalize_title`].
    pub fn from_row(row: Value, title_column: &str, url_column: &str) -> Option<Self> {
        let Value::Object(fields) = row else {
            return None;
        };

        let title = fields
            .get(title_column)
            .and_then(Value::as_str)
            .map(normalize_title)
            .filter(|t| !t.is_empty())?;
        let url = fields
            .get(url_column)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|u| !u.is_empty())?
            .to_string();

        Some(Self { title, url, fields })
    }

    /// Returns the value of `name` rendered as a grouping key.
    ///
    /// Strings are trimmed, numbers and booleans are stringified. Null,
    /// missing, empty, and structured values yield `None`.
    pub fn field(&self, name: &str) -> Option<String> {
        match self.fields.get(name)? {
            Value::String(s) => {
                let s = s.trim();
                (!s.is_empty()).then(|| s.to_string())
            }
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            Value::Null | Value::Array(_) | Value::Object(_) => None,
        }
    }

    pub fn to_work_item(&self) -> WorkItem {
        WorkItem::new(self.title.clone(), self.url.clone())
    }

    pub fn to_entry(&self) -> CategoryEntry {
        CategoryEntry::new(self.title.clone(), self.url.clone())
    }
}
