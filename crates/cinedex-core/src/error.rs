use thiserror::Error;

/// Classification of failures reported by the annotation oracle.
///
/// The Gemini client maps HTTP status codes and API error payloads onto
/// these kinds so the annotator can decide whether a retry makes sense.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OracleErrorKind {
    /// Authentication failure (401/403, invalid API key)
    Authentication,
    /// Rate limit exceeded (429)
    RateLimit,
    /// Quota exhausted (RESOURCE_EXHAUSTED with a quota message)
    QuotaExceeded,
    /// Server error (5xx)
    ServerError,
    /// Network/connection error
    NetworkError,
    /// Request rejected as malformed (400)
    InvalidRequest,
    /// Unknown or unclassified error
    Unknown,
}

/// Structured error details from the annotation oracle.
#[derive(Debug, Clone)]
pub struct OracleErrorDetails {
    /// The specific error category
    pub kind: OracleErrorKind,
    /// Human-readable error message from the API
    pub message: String,
    /// HTTP status code, 0 when no response was received
    pub status_code: u16,
}

impl OracleErrorDetails {
    pub fn new(kind: OracleErrorKind, message: impl Into<String>, status_code: u16) -> Self {
        Self {
            kind,
            message: message.into(),
            status_code,
        }
    }
}

impl std::fmt::Display for OracleErrorDetails {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "oracle returned HTTP {}: {}",
            self.status_code, self.message
        )
    }
}

/// Application-wide error types.
///
/// Only [`AppError::SourceUnavailable`] escapes a pipeline run. Every
/// per-item failure (transport, parse, timeout, exhausted retries) is
/// absorbed by the annotator and turned into an unclassified result.
///
/// # Examples
///
/// ```
/// use cinedex_core::error::AppError;
///
/// fn enumerate() -> Result<(), AppError> {
///     Err(AppError::SourceUnavailable("catalog returned HTTP 503".to_string()))
/// }
///
/// assert!(enumerate().is_err());
/// ```
#[derive(Error, Debug)]
pub enum AppError {
    /// The catalog could not be enumerated.
    ///
    /// Fatal for a pipeline run: nothing is annotated or aggregated.
    #[error("Catalog unavailable: {0}")]
    SourceUnavailable(String),

    /// HTTP client request failed.
    ///
    /// Raised for unexpected statuses or client-side failures that are
    /// neither timeouts nor connection errors.
    #[error("API client error: {0}")]
    ClientError(String),

    /// The annotation oracle rejected or failed a call.
    #[error("Oracle error: {0}")]
    OracleError(OracleErrorDetails),

    /// JSON serialization or deserialization failed.
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// URL parsing failed.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// The oracle answered, but the embedded payload could not be decoded.
    #[error("Unparseable oracle response: {0}")]
    ParseError(String),

    /// The retry budget for one item was spent without a usable answer.
    #[error("Annotation of '{title}' failed after {attempts} attempt(s): {last_error}")]
    AnnotationFailed {
        title: String,
        attempts: u32,
        last_error: String,
    },

    /// API response contained no data.
    #[error("Empty response from API")]
    EmptyResponse,

    /// Network or connection error.
    #[error("Network error: {0}")]
    NetworkError(String),

    /// Request timeout.
    #[error("Request timed out after {0} seconds")]
    Timeout(u64),

    /// Rate limit exceeded.
    #[error("Rate limit exceeded. Please wait and try again.")]
    RateLimitExceeded,

    /// Configuration file or environment error.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Generic application error for cases not covered by specific variants.
    #[error("Error: {0}")]
    Generic(String),
}

impl AppError {
    /// Returns a user-friendly error message suitable for CLI output.
    pub fn user_message(&self) -> String {
        match self {
            AppError::SourceUnavailable(msg) => format!(
                "Cannot list the video catalog: {}\n   Check SUPABASE_URL and SUPABASE_KEY.",
                msg
            ),
            AppError::ClientError(msg) => {
                if msg.contains("timeout") || msg.contains("timed out") {
                    "Request timed out. The service may be slow or unreachable.".to_string()
                } else if msg.contains("connect") {
                    format!(
                        "Cannot connect: {}\n   Check your internet connection.",
                        msg
                    )
                } else {
                    format!("API error: {}", msg)
                }
            }
            AppError::OracleError(details) => match details.kind {
                OracleErrorKind::Authentication => {
                    "Invalid Gemini API key.\n   Check your GEMINI_API_KEY environment variable."
                        .to_string()
                }
                OracleErrorKind::RateLimit => {
                    "Gemini rate limit reached.\n   Wait a moment and try again, or lower --concurrency."
                        .to_string()
                }
                OracleErrorKind::QuotaExceeded => {
                    "Gemini quota exceeded.\n   Check your Google account billing.".to_string()
                }
                OracleErrorKind::ServerError => format!(
                    "Gemini server error (HTTP {}).\n   Please try again later.",
                    details.status_code
                ),
                OracleErrorKind::NetworkError => format!(
                    "Network error connecting to Gemini: {}\n   Check your internet connection.",
                    details.message
                ),
                OracleErrorKind::InvalidRequest => format!(
                    "Gemini rejected the request: {}\n   Check the configured model name.",
                    details.message
                ),
                OracleErrorKind::Unknown => format!("Gemini error: {}", details.message),
            },
            AppError::NetworkError(msg) => {
                format!("Network error: {}\n   Check your internet connection.", msg)
            }
            AppError::Timeout(secs) => format!(
                "Request timed out after {} seconds.\n   Try raising --call-timeout.",
                secs
            ),
            AppError::RateLimitExceeded => {
                "Too many requests. Please wait a moment and try again.".to_string()
            }
            AppError::ConfigError(msg) => format!(
                "Configuration error: {}\n   Check your configuration file.",
                msg
            ),
            _ => self.to_string(),
        }
    }

    /// Returns true if this error is transient and the call may be retried.
    ///
    /// # Examples
    ///
    /// ```
    /// use cinedex_core::error::{AppError, OracleErrorDetails, OracleErrorKind};
    ///
    /// assert!(AppError::NetworkError("connection reset".to_string()).is_retryable());
    /// assert!(AppError::Timeout(30).is_retryable());
    ///
    /// let auth = AppError::OracleError(OracleErrorDetails::new(
    ///     OracleErrorKind::Authentication,
    ///     "API key not valid",
    ///     401,
    /// ));
    /// assert!(!auth.is_retryable());
    /// ```
    pub fn is_retryable(&self) -> bool {
        match self {
            AppError::NetworkError(_)
            | AppError::Timeout(_)
            | AppError::RateLimitExceeded
            | AppError::ClientError(_) => true,
            AppError::OracleError(details) => matches!(
                details.kind,
                OracleErrorKind::RateLimit
                    | OracleErrorKind::NetworkError
                    | OracleErrorKind::ServerError
                    | OracleErrorKind::Unknown
            ),
            _ => false,
        }
    }
}
