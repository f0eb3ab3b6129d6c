//! Google Gemini client acting as the annotation oracle.
//!
//! Every question goes through the `generateContent` endpoint with the
//! Google Search tool enabled, so the model can look the film up before
//! answering. Answers are returned as free-form text; the JSON payload
//! inside them is extracted by `cinedex_core::payload`.

use cinedex_core::HttpConfig;
use cinedex_core::error::{AppError, OracleErrorDetails, OracleErrorKind};
use cinedex_core::traits::AnnotationOracle;
use reqwest::Client;
use serde::{Deserialize, Serialize};

/// Model used when none is configured.
pub const DEFAULT_MODEL: &str = "gemini-2.0-flash-lite";

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// HTTP client for Google's Gemini `generateContent` API.
///
/// # Security
///
/// The API key is sent in the `x-goog-api-key` header, never in the URL,
/// so it does not leak into logs or proxies.
///
/// # Examples
///
/// ```no_run
/// use cinedex_client::GeminiClient;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = GeminiClient::new("your-api-key")?;
/// let answer = client
///     .generate("Find the genre of the movie Nosferatu.")
///     .await?;
/// println!("{answer}");
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct GeminiClient {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
    request_timeout_secs: u64,
}

/// Request body for `generateContent`.
#[derive(Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<Tool>,
}

#[derive(Serialize, Deserialize, Default)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Serialize, Deserialize)]
struct Part {
    #[serde(default)]
    text: String,
}

#[derive(Serialize)]
struct Tool {
    #[serde(rename = "googleSearch")]
    google_search: GoogleSearch,
}

#[derive(Serialize)]
struct GoogleSearch {}

/// Response from `generateContent`.
#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Content,
}

impl GenerateResponse {
    /// Concatenated text of the first candidate, if it has any.
    fn into_text(self) -> Option<String> {
        let candidate = self.candidates.into_iter().next()?;
        let text: String = candidate
            .content
            .parts
            .into_iter()
            .map(|p| p.text)
            .collect();
        if text.trim().is_empty() {
            None
        } else {
            Some(text)
        }
    }
}

/// Error response from the Gemini API.
#[derive(Deserialize)]
struct GeminiError {
    error: GeminiErrorDetail,
}

#[derive(Deserialize)]
struct GeminiErrorDetail {
    message: String,
    #[allow(dead_code)]
    status: Option<String>,
}

/// Classify a Gemini API error based on status code and message.
fn classify_gemini_error(status_code: u16, message: &str) -> OracleErrorKind {
    match status_code {
        401 | 403 => OracleErrorKind::Authentication,
        429 => {
            if message.contains("quota") || message.contains("RESOURCE_EXHAUSTED") {
                OracleErrorKind::QuotaExceeded
            } else {
                OracleErrorKind::RateLimit
            }
        }
        500..=599 => OracleErrorKind::ServerError,
        400 if message.contains("API key") => OracleErrorKind::Authentication,
        400 | 404 => OracleErrorKind::InvalidRequest,
        _ => {
            if message.contains("API key") || message.contains("Unauthorized") {
                OracleErrorKind::Authentication
            } else if message.contains("rate") {
                OracleErrorKind::RateLimit
            } else {
                OracleErrorKind::Unknown
            }
        }
    }
}

fn genre_prompt(title: &str, url: &str) -> String {
    format!(
        r#"Find the genre of the movie with the title: {title}. The movie can be found at this URL: {url}
Format the response as a JSON object with the following fields:
{{
    "title": "{title}",
    "url": "{url}",
    "genre": "<estimated genre of the film>"
}}"#
    )
}

fn tropes_prompt(title: &str, url: &str) -> String {
    format!(
        r#"Analyze the character and narrative tropes of the movie with the title: {title}. The movie can be found at this URL: {url}
Format the response as a JSON object with the following fields:
{{
    "film_title": "{title}",
    "analysis_summary": "<two or three sentences on the film's storytelling>",
    "tropes_identified": [
        {{
            "trope_name": "<name of the trope>",
            "description": "<how the trope appears in this film>",
            "confidence_score": <number between 0 and 1>
        }}
    ]
}}"#
    )
}

impl GeminiClient {
    /// Creates a new Gemini client with the specified API key.
    pub fn new(api_key: &str) -> Result<Self, AppError> {
        let http_config = HttpConfig::default();
        let client = Client::builder()
            .timeout(http_config.timeout)
            .build()
            .map_err(|e| AppError::ClientError(e.to_string()))?;

        Ok(Self {
            client,
            api_key: api_key.to_string(),
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout_secs: http_config.timeout.as_secs(),
        })
    }

    /// Uses `model` instead of [`DEFAULT_MODEL`].
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Points the client at another API root, e.g. a proxy.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }

    /// Sends `prompt` with search grounding and returns the answer text.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Timeout` or a `NetworkError`-kind `OracleError`
    /// for transport failures, a classified `OracleError` for non-success
    /// statuses, and `AppError::EmptyResponse` if no candidate carries text.
    pub async fn generate(&self, prompt: &str) -> Result<String, AppError> {
        let request_body = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: prompt.to_string(),
                }],
            }],
            tools: vec![Tool {
                google_search: GoogleSearch {},
            }],
        };

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", self.api_key.clone())
            .json(&request_body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    AppError::Timeout(self.request_timeout_secs)
                } else if e.is_connect() {
                    AppError::OracleError(OracleErrorDetails::new(
                        OracleErrorKind::NetworkError,
                        format!("Connection failed: {}", e),
                        0,
                    ))
                } else {
                    AppError::ClientError(e.to_string())
                }
            })?;

        let status = response.status();

        if !status.is_success() {
            let status_code = status.as_u16();
            let error_text = response.text().await.unwrap_or_default();

            let message = if let Ok(gemini_error) = serde_json::from_str::<GeminiError>(&error_text)
            {
                gemini_error.error.message
            } else {
                format!("HTTP {}: {}", status_code, error_text)
            };

            let kind = classify_gemini_error(status_code, &message);
            tracing::debug!(status_code, ?kind, "Gemini request rejected");

            return Err(AppError::OracleError(OracleErrorDetails::new(
                kind,
                message,
                status_code,
            )));
        }

        let generate_response: GenerateResponse = response
            .json()
            .await
            .map_err(|e| AppError::ClientError(format!("Failed to parse response: {}", e)))?;

        generate_response.into_text().ok_or(AppError::EmptyResponse)
    }
}

// =============================================================================
// Trait Implementation: AnnotationOracle
// =============================================================================

impl AnnotationOracle for GeminiClient {
    async fn classify(&self, title: &str, url: &str) -> Result<String, AppError> {
        self.generate(&genre_prompt(title, url)).await
    }

    async fn analyze_tropes(&self, title: &str, url: &str) -> Result<String, AppError> {
        self.generate(&tropes_prompt(title, url)).await
    }
}
