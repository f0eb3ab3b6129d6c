//! PostgREST client listing the video catalog.
//!
//! The catalog is a plain table exposed by a PostgREST server (as hosted by
//! Supabase). Rows are fetched page by page with `limit`/`offset` under a
//! fixed `order` and converted to [`CatalogRecord`]s; rows without a usable
//! title or URL are skipped. Subtitles live in a separate `subtitles` table
//! keyed by video id and language code.

use std::time::Duration;

use cinedex_core::HttpConfig;
use cinedex_core::catalog::CatalogRecord;
use cinedex_core::config::CatalogEntry;
use cinedex_core::error::AppError;
use cinedex_core::traits::CatalogSource;
use reqwest::{Client, StatusCode};
use serde_json::Value;
use tokio::time::sleep;
use url::Url;

/// HTTP client for one catalog table.
///
/// # Examples
///
/// ```no_run
/// use cinedex_client::PostgrestCatalogClient;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = PostgrestCatalogClient::new("https://abc.supabase.co", "anon-key")?;
/// let records = client.fetch_all().await?;
/// println!("Found {} videos", records.len());
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct PostgrestCatalogClient {
    client: Client,
    base_url: Url,
    api_key: String,
    table: String,
    title_column: String,
    url_column: String,
    order_column: Option<String>,
}

impl PostgrestCatalogClient {
    /// Rows requested per page. PostgREST servers commonly cap responses at 1000.
    const PAGE_SIZE: usize = 1000;

    /// Table holding subtitle tracks.
    const SUBTITLES_TABLE: &'static str = "subtitles";

    /// Maximum backoff delay for rate-limited retries within `request_with_retry`.
    const MAX_RETRY_DELAY: Duration = Duration::from_secs(30);

    /// Creates a client for the default video table.
    ///
    /// # Errors
    ///
    /// Returns `AppError::InvalidUrl` if the URL is malformed.
    /// Returns `AppError::ClientError` if the HTTP client cannot be built.
    pub fn new(base_url_str: &str, api_key: &str) -> Result<Self, AppError> {
        let mut base = base_url_str.trim().to_string();
        if !base.ends_with('/') {
            base.push('/');
        }
        let base_url =
            Url::parse(&base).map_err(|_| AppError::InvalidUrl(base_url_str.to_string()))?;

        let http_config = HttpConfig::default();
        let client = Client::builder()
            .user_agent(concat!("Cinedex/", env!("CARGO_PKG_VERSION")))
            .timeout(http_config.timeout)
            .build()
            .map_err(|e| AppError::ClientError(e.to_string()))?;

        Ok(Self {
            client,
            base_url,
            api_key: api_key.to_string(),
            table: "Video_movies".to_string(),
            title_column: "canonicaltitle".to_string(),
            url_column: "url".to_string(),
            order_column: None,
        })
    }

    /// Creates a client from a `catalogs.toml` entry.
    pub fn from_entry(entry: &CatalogEntry, api_key: &str) -> Result<Self, AppError> {
        let client = Self::new(&entry.url, api_key)?
            .with_table(&entry.table)
            .with_columns(&entry.title_column, &entry.url_column);
        Ok(match &entry.order_column {
            Some(column) => client.with_order_column(column),
            None => client,
        })
    }

    pub fn with_table(mut self, table: &str) -> Self {
        self.table = table.to_string();
        self
    }

    /// Sets the columns holding the title and the playable URL.
    pub fn with_columns(mut self, title_column: &str, url_column: &str) -> Self {
        self.title_column = title_column.to_string();
        self.url_column = url_column.to_string();
        self
    }

    /// Sets the column pages are ordered by. Defaults to the URL column.
    ///
    /// Offset paging is only stable when this column is unique.
    pub fn with_order_column(mut self, column: &str) -> Self {
        self.order_column = Some(column.to_string());
        self
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    fn order_column(&self) -> &str {
        self.order_column.as_deref().unwrap_or(&self.url_column)
    }

    fn table_url(&self, table: &str) -> Result<Url, AppError> {
        self.base_url
            .join(&format!("rest/v1/{}", table))
            .map_err(|e| AppError::InvalidUrl(e.to_string()))
    }

    fn page_url(&self, offset: usize) -> Result<Url, AppError> {
        let mut url = self.table_url(&self.table)?;
        url.query_pairs_mut()
            .append_pair("select", "*")
            .append_pair("order", &format!("{}.asc", self.order_column()))
            .append_pair("limit", &Self::PAGE_SIZE.to_string())
            .append_pair("offset", &offset.to_string());
        Ok(url)
    }

    fn subtitles_url(&self, video_id: &str, language_code: &str) -> Result<Url, AppError> {
        let mut url = self.table_url(Self::SUBTITLES_TABLE)?;
        url.query_pairs_mut()
            .append_pair("select", "subtitle_content")
            .append_pair("video_id", &format!("eq.{}", video_id))
            .append_pair("language_code", &format!("eq.{}", language_code))
            .append_pair("limit", "1");
        Ok(url)
    }

    /// Fetches every row of the table.
    ///
    /// # Errors
    ///
    /// Fails on the first page that cannot be fetched or decoded. A
    /// partial listing is never returned.
    ///
    /// Paging stops at the first empty page, so a server capping responses
    /// below `PAGE_SIZE` rows is still read to the end.
    pub async fn fetch_all(&self) -> Result<Vec<CatalogRecord>, AppError> {
        let mut records = Vec::new();
        let mut skipped = 0usize;
        let mut offset = 0usize;

        loop {
            let url = self.page_url(offset)?;
            let resp = self.request_with_retry(&url).await?;
            let rows: Vec<Value> = resp
                .json()
                .await
                .map_err(|e| AppError::ClientError(format!("Failed to parse rows: {}", e)))?;

            let page_len = rows.len();
            if page_len == 0 {
                break;
            }
            for row in rows {
                match CatalogRecord::from_row(row, &self.title_column, &self.url_column) {
                    Some(record) => records.push(record),
                    None => skipped += 1,
                }
            }

            tracing::debug!(table = %self.table, offset, rows = page_len, "Fetched catalog page");
            offset += page_len;
        }

        if skipped > 0 {
            tracing::warn!(
                table = %self.table,
                skipped,
                "Catalog rows without a title or URL were skipped"
            );
        }
        Ok(records)
    }

    /// Fetches the subtitle track of one video in one language.
    ///
    /// Returns `Ok(None)` when no track is stored for that pair.
    ///
    /// # Errors
    ///
    /// Fails when the request or the response body fails.
    pub async fn fetch_subtitles(
        &self,
        video_id: &str,
        language_code: &str,
    ) -> Result<Option<String>, AppError> {
        let url = self.subtitles_url(video_id, language_code)?;
        let resp = self.request_with_retry(&url).await?;
        let rows: Vec<Value> = resp
            .json()
            .await
            .map_err(|e| AppError::ClientError(format!("Failed to parse subtitles: {}", e)))?;
        Ok(subtitle_content(rows))
    }

    async fn request_with_retry(&self, url: &Url) -> Result<reqwest::Response, AppError> {
        let http_config = HttpConfig::default();
        let max_retries = http_config.max_retries;
        let base_delay = http_config.retry_base_delay;
        let mut last_error = AppError::Generic("No attempts made".to_string());

        for attempt in 1..=max_retries {
            let request = self
                .client
                .get(url.clone())
                .header("apikey", &self.api_key)
                .bearer_auth(&self.api_key);

            match request.send().await {
                Ok(resp) => {
                    let status = resp.status();

                    if status.is_success() {
                        return Ok(resp);
                    }

                    if status == StatusCode::TOO_MANY_REQUESTS {
                        last_error = AppError::RateLimitExceeded;
                        if attempt < max_retries {
                            let delay = resp
                                .headers()
                                .get("retry-after")
                                .and_then(|v| v.to_str().ok())
                                .and_then(|v| v.parse::<u64>().ok())
                                .map(Duration::from_secs)
                                .unwrap_or_else(|| {
                                    (base_delay * 2_u32.pow(attempt)).min(Self::MAX_RETRY_DELAY)
                                });
                            sleep(delay).await;
                            continue;
                        }
                        return Err(last_error);
                    }

                    if status.is_server_error() {
                        last_error = AppError::ClientError(format!(
                            "Server error: HTTP {}",
                            status.as_u16()
                        ));
                        if attempt < max_retries {
                            sleep(base_delay * attempt).await;
                            continue;
                        }
                        return Err(last_error);
                    }

                    let body = resp.text().await.unwrap_or_default();
                    return Err(AppError::ClientError(format!(
                        "HTTP {} from {}: {}",
                        status.as_u16(),
                        self.table,
                        body.trim()
                    )));
                }
                Err(e) => {
                    if e.is_timeout() {
                        last_error = AppError::Timeout(http_config.timeout.as_secs());
                    } else if e.is_connect() {
                        last_error = AppError::NetworkError(format!("Connection failed: {}", e));
                    } else {
                        last_error = AppError::ClientError(e.to_string());
                    }

                    if attempt < max_retries && (e.is_timeout() || e.is_connect()) {
                        sleep(base_delay * attempt).await;
                        continue;
                    }
                    return Err(last_error);
                }
            }
        }

        Err(last_error)
    }
}

fn subtitle_content(rows: Vec<Value>) -> Option<String> {
    rows.into_iter()
        .next()?
        .get("subtitle_content")?
        .as_str()
        .filter(|content| !content.trim().is_empty())
        .map(str::to_string)
}

// =============================================================================
// Trait Implementation: CatalogSource
// =============================================================================

impl CatalogSource for PostgrestCatalogClient {
    async fn list_records(&self) -> Result<Vec<CatalogRecord>, AppError> {
        self.fetch_all().await.map_err(|e| match e {
            AppError::SourceUnavailable(_) => e,
            other => AppError::SourceUnavailable(format!("{}: {}", self.table, other)),
        })
    }
}
