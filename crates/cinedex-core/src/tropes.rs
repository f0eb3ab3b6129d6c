//! Narrative trope analysis for a single film.
//!
//! The oracle is asked for a JSON document listing the tropes it recognises.
//! The call goes through the same [`BoundedAnnotator`] machinery as
//! classification (permit, deadline, retries). Failures never propagate:
//! they produce a [`TropeAnalysis`] whose summary describes the error.

use serde::{Deserialize, Serialize};

use crate::annotate::{BoundedAnnotator, OracleRequest};
use crate::error::AppError;
use crate::models::WorkItem;
use crate::payload::decode_payload;
use crate::progress::{ProgressReporter, SilentReporter};
use crate::traits::AnnotationOracle;

/// One trope recognised in a film.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trope {
    pub trope_name: String,
    #[serde(default)]
    pub description: String,
    /// Oracle's confidence in `[0, 1]`, when given.
    #[serde(default)]
    pub confidence_score: Option<f64>,
}

/// Result of analysing one film.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TropeAnalysis {
    #[serde(default)]
    pub film_title: String,
    #[serde(default)]
    pub analysis_summary: String,
    #[serde(default)]
    pub tropes_identified: Vec<Trope>,
    /// Set when the analysis could not be produced.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TropeAnalysis {
    /// Decodes an analysis from oracle text.
    ///
    /// Confidence scores are clamped into `[0, 1]`. A missing or empty
    /// `film_title` is replaced with `title`.
    pub fn parse(title: &str, text: &str) -> Result<Self, AppError> {
        let mut analysis: TropeAnalysis = decode_payload(text)?;
        if analysis.film_title.trim().is_empty() {
            analysis.film_title = title.to_string();
        }
        for trope in &mut analysis.tropes_identified {
            trope.confidence_score = trope.confidence_score.map(|s| s.clamp(0.0, 1.0));
        }
        analysis.error = None;
        Ok(analysis)
    }

    /// Fallback analysis describing why none could be produced.
    pub fn from_error(title: &str, error: &AppError) -> Self {
        Self {
            film_title: title.to_string(),
            analysis_summary: format!("Trope analysis unavailable: {}", error),
            tropes_identified: Vec::new(),
            error: Some(error.to_string()),
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    /// Tropes at or above `threshold`, highest confidence first.
    ///
    /// Tropes without a score are kept only for a threshold of zero or
    /// less, after every scored trope and in their original order.
    pub fn confident_tropes(&self, threshold: f64) -> Vec<&Trope> {
        let mut tropes: Vec<&Trope> = self
            .tropes_identified
            .iter()
            .filter(|t| match t.confidence_score {
                Some(score) => score >= threshold,
                None => threshold <= 0.0,
            })
            .collect();
        tropes.sort_by(|a, b| match (a.confidence_score, b.confidence_score) {
            (Some(a), Some(b)) => b.total_cmp(&a),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => std::cmp::Ordering::Equal,
        });
        tropes
    }
}

impl<O: AnnotationOracle> BoundedAnnotator<O> {
    /// Analyses the tropes of one film.
    pub async fn analyze_tropes(&self, item: &WorkItem) -> TropeAnalysis {
        self.analyze_tropes_with_progress(item, &SilentReporter).await
    }

    pub async fn analyze_tropes_with_progress<R: ProgressReporter>(
        &self,
        item: &WorkItem,
        reporter: &R,
    ) -> TropeAnalysis {
        let reply = match self.call(OracleRequest::Tropes, item, reporter).await {
            Ok(reply) => reply,
            Err(failure) => {
                tracing::warn!(
                    title = %item.title,
                    attempts = failure.attempts,
                    error = %failure.error,
                    "Trope analysis failed"
                );
                return TropeAnalysis::from_error(&item.title, &failure.error);
            }
        };

        match TropeAnalysis::parse(&item.title, &reply.text) {
            Ok(analysis) => analysis,
            Err(e) => {
                tracing::warn!(title = %item.title, error = %e, "Trope analysis unparseable");
                TropeAnalysis::from_error(&item.title, &e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"Here is the analysis:
```json
{
  "film_title": "Nosferatu",
  "analysis_summary": "A gothic horror built on classic vampire imagery.",
  "tropes_identified": [
    {"trope_name": "Creepy Castle", "description": "Orlok's ruin", "confidence_score": 0.9},
    {"trope_name": "Renfield", "description": "Knock", "confidence_score": 1.4},
    {"trope_name": "Plague", "description": "Rats bring death"}
  ]
}
```"#;

    #[test]
    fn test_parse_analysis() {
        let analysis = TropeAnalysis::parse("Nosferatu", SAMPLE).unwrap();
        assert_eq!(analysis.film_title, "Nosferatu");
        assert_eq!(analysis.tropes_identified.len(), 3);
        assert!(!analysis.is_error());
    }

    #[test]
    fn test_parse_clamps_confidence() {
        let analysis = TropeAnalysis::parse("Nosferatu", SAMPLE).unwrap();
        assert_eq!(analysis.tropes_identified[1].confidence_score, Some(1.0));
        assert_eq!(analysis.tropes_identified[2].confidence_score, None);
    }

    #[test]
    fn test_parse_fills_missing_title() {
        let analysis =
            TropeAnalysis::parse("The Kid", r#"{"analysis_summary": "short"}"#).unwrap();
        assert_eq!(analysis.film_title, "The Kid");
        assert!(analysis.tropes_identified.is_empty());
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(TropeAnalysis::parse("x", "no analysis available").is_err());
    }

    #[test]
    fn test_from_error() {
        let analysis = TropeAnalysis::from_error("Metropolis", &AppError::Timeout(30));
        assert!(analysis.is_error());
        assert!(analysis.analysis_summary.contains("timed out"));
        assert!(analysis.tropes_identified.is_empty());
    }

    #[test]
    fn test_confident_tropes_sorted() {
        let analysis = TropeAnalysis::parse("Nosferatu", SAMPLE).unwrap();
        let names: Vec<&str> = analysis
            .confident_tropes(0.5)
            .iter()
            .map(|t| t.trope_name.as_str())
            .collect();
        assert_eq!(names, vec!["Renfield", "Creepy Castle"]);
    }

    #[test]
    fn test_unscored_tropes_shown_without_threshold() {
        let analysis = TropeAnalysis::parse("Nosferatu", SAMPLE).unwrap();
        let names: Vec<&str> = analysis
            .confident_tropes(0.0)
            .iter()
            .map(|t| t.trope_name.as_str())
            .collect();
        assert_eq!(names, vec!["Renfield", "Creepy Castle", "Plague"]);
    }

    #[test]
    fn test_error_field_not_serialized_when_absent() {
        let analysis = TropeAnalysis::parse("Nosferatu", SAMPLE).unwrap();
        let json = serde_json::to_value(&analysis).unwrap();
        assert!(json.get("error").is_none());
    }
}
