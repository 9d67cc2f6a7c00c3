//! Optional auto-save of generated plans to Google Sheets.
//!
//! Whether a sink exists is decided once at start-up by [`resolve_sink`].
//! Append failures are reported to the caller but never abort a request.
//!
//! Service-account credentials are preferred: `gcp_auth` caches the access
//! token and refreshes it before expiry, so a long-running server keeps
//! saving. A static access token is accepted as a fallback.

use std::path::Path;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use async_trait::async_trait;
use gcp_auth::{CustomServiceAccount, TokenProvider};
use reqwest::Client;
use serde::Deserialize;
use thiserror::Error;

use crate::config::SheetsSettings;
use crate::models::HistoryRow;

pub const SHEETS_BASE_URL: &str = "https://sheets.googleapis.com";
pub const DRIVE_BASE_URL: &str = "https://www.googleapis.com";

/// Append rows, and find the spreadsheet by title when no id is configured.
pub const SHEETS_SCOPES: &[&str] = &[
    "https://www.googleapis.com/auth/spreadsheets",
    "https://www.googleapis.com/auth/drive.readonly",
];

const DEFAULT_CREDENTIALS_FILE: &str = "google-credentials.json";
const SPREADSHEET_MIME: &str = "application/vnd.google-apps.spreadsheet";

/// Replaces every newline in the flattened text.
pub const FLATTEN_SEPARATOR: &str = " | ";

/// Upper bound on the stored text, in characters.
pub const MAX_FLATTENED_CHARS: usize = 10_000;

#[async_trait]
pub trait RecordSink: Send + Sync {
    async fn append(&self, row: &HistoryRow) -> Result<(), SinkError>;

    fn name(&self) -> &str;
}

#[derive(Error, Debug)]
pub enum SinkError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error ({code}): {message}")]
    Api { code: u16, message: String },

    #[error("Sheets authentication failed: {0}")]
    Auth(String),

    #[error("Spreadsheet \"{0}\" not found or not shared with these credentials")]
    SpreadsheetNotFound(String),
}

/// Single-line form of a raw reply for storage.
pub fn flatten_response(raw: &str) -> String {
    raw.replace("\r\n", "\n")
        .replace('\n', FLATTEN_SEPARATOR)
        .chars()
        .take(MAX_FLATTENED_CHARS)
        .collect()
}

// ============================================================================
// Credentials
// ============================================================================

/// Supplies the bearer token for each Sheets call.
#[async_trait]
pub trait AccessTokenSource: Send + Sync {
    async fn access_token(&self) -> Result<String, SinkError>;

    /// Credential kind for logging.
    fn kind(&self) -> &'static str;
}

/// A fixed OAuth token. It is never refreshed.
pub struct StaticToken(String);

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

#[async_trait]
impl AccessTokenSource for StaticToken {
    async fn access_token(&self) -> Result<String, SinkError> {
        Ok(self.0.clone())
    }

    fn kind(&self) -> &'static str {
        "static-token"
    }
}

/// Service-account key. Tokens are minted, cached and refreshed by `gcp_auth`.
pub struct ServiceAccountTokens {
    account: CustomServiceAccount,
}

impl ServiceAccountTokens {
    pub fn from_file(path: &Path) -> Result<Self, SinkError> {
        let account = CustomServiceAccount::from_file(path)
            .map_err(|e| SinkError::Auth(format!("{}: {}", path.display(), e)))?;
        Ok(Self { account })
    }

    pub fn from_json(json: &str) -> Result<Self, SinkError> {
        let account =
            CustomServiceAccount::from_json(json).map_err(|e| SinkError::Auth(e.to_string()))?;
        Ok(Self { account })
    }
}

#[async_trait]
impl AccessTokenSource for ServiceAccountTokens {
    async fn access_token(&self) -> Result<String, SinkError> {
        let token = self
            .account
            .token(SHEETS_SCOPES)
            .await
            .map_err(|e| SinkError::Auth(e.to_string()))?;
        Ok(token.as_str().to_string())
    }

    fn kind(&self) -> &'static str {
        "service-account"
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Find credentials in priority order: `credentials_file`, `access_token`,
/// `GOOGLE_CREDENTIALS`, `./google-credentials.json`, `GOOGLE_SHEETS_TOKEN`.
/// `Ok(None)` means nothing is configured; a credential that is present but
/// unreadable is an error.
pub fn load_token_source(
    settings: &SheetsSettings,
) -> Result<Option<Arc<dyn AccessTokenSource>>, SinkError> {
    if let Some(path) = non_blank(settings.credentials_file.clone()) {
        return Ok(Some(Arc::new(ServiceAccountTokens::from_file(Path::new(
            &path,
        ))?)));
    }
    if let Some(token) = non_blank(settings.access_token.clone()) {
        return Ok(Some(Arc::new(StaticToken::new(token))));
    }
    if let Some(json) = non_blank(std::env::var("GOOGLE_CREDENTIALS").ok()) {
        return Ok(Some(Arc::new(ServiceAccountTokens::from_json(&json)?)));
    }
    let default_file = Path::new(DEFAULT_CREDENTIALS_FILE);
    if default_file.is_file() {
        return Ok(Some(Arc::new(ServiceAccountTokens::from_file(default_file)?)));
    }
    Ok(non_blank(std::env::var("GOOGLE_SHEETS_TOKEN").ok())
        .map(|t| Arc::new(StaticToken::new(t)) as Arc<dyn AccessTokenSource>))
}

/// Build the sink if credentials are found. Missing or unusable credentials
/// disable auto-save for the life of the process.
pub fn resolve_sink(settings: &SheetsSettings) -> Option<Arc<dyn RecordSink>> {
    let tokens = match load_token_source(settings) {
        Ok(Some(tokens)) => tokens,
        Ok(None) => {
            tracing::warn!("Sheets credentials not configured, auto-save off");
            return None;
        }
        Err(e) => {
            tracing::warn!(error = %e, "Sheets credentials unusable, auto-save off");
            return None;
        }
    };

    let target = match non_blank(settings.spreadsheet_id.clone()) {
        Some(id) => SpreadsheetTarget::Id(id),
        None => SpreadsheetTarget::Name(settings.spreadsheet_name.clone()),
    };

    match SheetsRecordSink::new(
        target,
        settings.range.clone(),
        tokens,
        Duration::from_secs(settings.timeout_seconds),
    ) {
        Ok(sink) => {
            tracing::info!(auth = sink.auth_kind(), "Google Sheets connected, auto-save on");
            Some(Arc::new(sink))
        }
        Err(e) => {
            tracing::warn!(error = %e, "Sheets not connected, auto-save off");
            None
        }
    }
}

// ============================================================================
// Google API structs (private)
// ============================================================================

#[derive(Debug, Deserialize)]
struct GoogleErrorResponse {
    error: Option<GoogleErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct GoogleErrorDetail {
    code: u16,
    message: String,
}

#[derive(Debug, Deserialize)]
struct DriveFileList {
    #[serde(default)]
    files: Vec<DriveFile>,
}

#[derive(Debug, Deserialize)]
struct DriveFile {
    id: String,
}

async fn api_error(response: reqwest::Response) -> SinkError {
    let status = response.status();
    let error_body = response.text().await.unwrap_or_default();
    let (code, message) = serde_json::from_str::<GoogleErrorResponse>(&error_body)
        .ok()
        .and_then(|e| e.error)
        .map(|e| (e.code, e.message))
        .unwrap_or((status.as_u16(), error_body));
    SinkError::Api { code, message }
}

// ============================================================================
// SheetsRecordSink
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpreadsheetTarget {
    Id(String),
    /// Looked up in Drive on first use, then cached.
    Name(String),
}

/// Appends rows through the Sheets `values:append` endpoint.
pub struct SheetsRecordSink {
    client: Client,
    target: SpreadsheetTarget,
    resolved_id: OnceLock<String>,
    range: String,
    tokens: Arc<dyn AccessTokenSource>,
    sheets_url: String,
    drive_url: String,
}

impl std::fmt::Debug for SheetsRecordSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SheetsRecordSink")
            .field("target", &self.target)
            .field("range", &self.range)
            .field("auth", &self.tokens.kind())
            .field("sheets_url", &self.sheets_url)
            .finish_non_exhaustive()
    }
}

impl SheetsRecordSink {
    pub fn new(
        target: SpreadsheetTarget,
        range: String,
        tokens: Arc<dyn AccessTokenSource>,
        timeout: Duration,
    ) -> Result<Self, SinkError> {
        Self::with_base_urls(
            target,
            range,
            tokens,
            timeout,
            SHEETS_BASE_URL.to_string(),
            DRIVE_BASE_URL.to_string(),
        )
    }

    /// Create a sink against custom Sheets and Drive base URLs (for testing)
    pub fn with_base_urls(
        target: SpreadsheetTarget,
        range: String,
        tokens: Arc<dyn AccessTokenSource>,
        timeout: Duration,
        sheets_url: String,
        drive_url: String,
    ) -> Result<Self, SinkError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            target,
            resolved_id: OnceLock::new(),
            range,
            tokens,
            sheets_url: sheets_url.trim_end_matches('/').to_string(),
            drive_url: drive_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn auth_kind(&self) -> &'static str {
        self.tokens.kind()
    }

    async fn spreadsheet_id(&self, token: &str) -> Result<String, SinkError> {
        let name = match &self.target {
            SpreadsheetTarget::Id(id) => return Ok(id.clone()),
            SpreadsheetTarget::Name(name) => name,
        };
        if let Some(id) = self.resolved_id.get() {
            return Ok(id.clone());
        }

        let id = self.find_by_name(name, token).await?;
        tracing::info!(spreadsheet = %name, "Resolved spreadsheet by name");
        Ok(self.resolved_id.get_or_init(|| id).clone())
    }

    async fn find_by_name(&self, name: &str, token: &str) -> Result<String, SinkError> {
        let escaped = name.replace('\\', "\\\\").replace('\'', "\\'");
        let query = format!(
            "name = '{}' and mimeType = '{}' and trashed = false",
            escaped, SPREADSHEET_MIME
        );

        let response = self
            .client
            .get(format!("{}/drive/v3/files", self.drive_url))
            .bearer_auth(token)
            .query(&[
                ("q", query.as_str()),
                ("fields", "files(id)"),
                ("pageSize", "1"),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(api_error(response).await);
        }

        let list: DriveFileList = response.json().await?;
        list.files
            .into_iter()
            .next()
            .map(|f| f.id)
            .ok_or_else(|| SinkError::SpreadsheetNotFound(name.to_string()))
    }
}

#[async_trait]
impl RecordSink for SheetsRecordSink {
    async fn append(&self, row: &HistoryRow) -> Result<(), SinkError> {
        let token = self.tokens.access_token().await?;
        let spreadsheet_id = self.spreadsheet_id(&token).await?;

        let url = format!(
            "{}/v4/spreadsheets/{}/values/{}:append",
            self.sheets_url, spreadsheet_id, self.range
        );

        let body = serde_json::json!({
            "values": [[row.timestamp, row.topic, row.flattened_text]],
        });

        let response = self
            .client
            .post(&url)
            .bearer_auth(&token)
            .query(&[
                ("valueInputOption", "USER_ENTERED"),
                ("insertDataOption", "INSERT_ROWS"),
            ])
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(api_error(response).await);
        }

        tracing::debug!(topic = %row.topic, "Appended plan to Google Sheets");
        Ok(())
    }

    fn name(&self) -> &str {
        "google-sheets"
    }
}
