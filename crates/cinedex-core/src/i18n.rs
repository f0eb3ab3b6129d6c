//! Cached UI string translations.
//!
//! Translations are generated ahead of time and stored as a JSON object
//! keyed by language code, then by the English source string:
//!
//! ```json
//! { "hi": { "Search": "खोजें", "Genre": "शैली" }, "en": { "Search": "Search" } }
//! ```
//!
//! Lookups never fail. A missing translation falls back to English and
//! then to the source text itself.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use crate::error::AppError;

/// Language codes and display names offered by the interface.
pub const SUPPORTED_LANGUAGES: &[(&str, &str)] = &[
    ("en", "English"),
    ("hi", "Hindi"),
    ("bn", "Bengali"),
    ("ta", "Tamil"),
    ("te", "Telugu"),
    ("mr", "Marathi"),
    ("gu", "Gujarati"),
    ("pa", "Punjabi"),
    ("kn", "Kannada"),
    ("ml", "Malayalam"),
    ("ur", "Urdu"),
    ("ne", "Nepali"),
];

/// Default file name of the translation cache.
pub const CACHE_FILE_NAME: &str = "translations_cache.json";

const FALLBACK_LANGUAGE: &str = "en";

/// Returns the display name of a supported language code.
pub fn language_name(code: &str) -> Option<&'static str> {
    SUPPORTED_LANGUAGES
        .iter()
        .find(|(c, _)| c.eq_ignore_ascii_case(code))
        .map(|(_, name)| *name)
}

/// In-memory translation table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TranslationCache {
    languages: BTreeMap<String, HashMap<String, String>>,
}

impl TranslationCache {
    pub fn new(languages: BTreeMap<String, HashMap<String, String>>) -> Self {
        Self { languages }
    }

    /// Parses a cache from its JSON form.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the document is not an object of objects of strings.
    pub fn from_json(json: &str) -> Result<Self, AppError> {
        let languages = serde_json::from_str(json)
            .map_err(|e| AppError::ConfigError(format!("Invalid translation cache: {}", e)))?;
        Ok(Self { languages })
    }

    /// Loads the cache from `path`.
    ///
    /// A missing file yields an empty cache and a warning, so the interface
    /// still renders in English.
    pub fn load(path: &Path) -> Result<Self, AppError> {
        if !path.exists() {
            tracing::warn!(
                path = %path.display(),
                "Translation cache not found, falling back to source strings"
            );
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| {
            AppError::ConfigError(format!(
                "Failed to read translation cache '{}': {}",
                path.display(),
                e
            ))
        })?;
        let cache = Self::from_json(&content)?;
        tracing::debug!(languages = cache.languages.len(), "Loaded translation cache");
        Ok(cache)
    }

    /// Translates `text` into `lang`.
    ///
    /// # Examples
    ///
    /// ```
    /// use cinedex_core::i18n::TranslationCache;
    ///
    /// let cache = TranslationCache::from_json(
    ///     r#"{"hi": {"Search": "खोजें"}, "en": {"Back": "Go back"}}"#,
    /// ).unwrap();
    /// assert_eq!(cache.translate("Search", "hi"), "खोजें");
    /// assert_eq!(cache.translate("Back", "hi"), "Go back");
    /// assert_eq!(cache.translate("Watch", "hi"), "Watch");
    /// ```
    pub fn translate<'a>(&'a self, text: &'a str, lang: &str) -> &'a str {
        self.lookup(text, lang)
            .or_else(|| {
                if lang != FALLBACK_LANGUAGE {
                    self.lookup(text, FALLBACK_LANGUAGE)
                } else {
                    None
                }
            })
            .unwrap_or(text)
    }

    /// Returns true if `text` has an entry for exactly `lang`.
    pub fn is_available(&self, text: &str, lang: &str) -> bool {
        self.lookup(text, lang).is_some()
    }

    /// All translations for one language, empty if unknown.
    pub fn for_language(&self, lang: &str) -> HashMap<String, String> {
        self.languages.get(lang).cloned().unwrap_or_default()
    }

    /// Language codes present in the cache, sorted.
    pub fn available_languages(&self) -> Vec<&str> {
        self.languages.keys().map(String::as_str).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.languages.is_empty()
    }

    fn lookup(&self, text: &str, lang: &str) -> Option<&str> {
        self.languages
            .get(lang)
            .and_then(|table| table.get(text))
            .map(String::as_str)
    }
}
