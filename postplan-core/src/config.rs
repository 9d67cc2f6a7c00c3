use config::{Config, ConfigError, Environment, File, FileFormat};
use serde::Deserialize;

/// Prefix for environment overrides, e.g. `POSTPLAN__HTTP__PORT=9000`.
pub const ENV_PREFIX: &str = "POSTPLAN";

#[derive(Debug, Deserialize, Clone, Default)]
pub struct PostplanConfig {
    #[serde(default)]
    pub service: ServiceConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub generation: GenerationSettings,
    #[serde(default)]
    pub sheets: SheetsSettings,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServiceConfig {
    pub log_level: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct HttpConfig {
    pub host: String,
    pub port: u16,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8787,
        }
    }
}

#[derive(Deserialize, Clone)]
#[serde(default)]
pub struct GenerationSettings {
    pub model: String,
    pub temperature: f32,
    pub timeout_seconds: u64,
    /// Falls back to `GEMINI_API_KEY`, then `GOOGLE_API_KEY`.
    pub api_key: Option<String>,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            model: "gemini-2.5-flash".to_string(),
            temperature: 0.9,
            timeout_seconds: 60,
            api_key: None,
        }
    }
}

impl std::fmt::Debug for GenerationSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenerationSettings")
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("timeout_seconds", &self.timeout_seconds)
            .field("api_key", &self.api_key.as_ref().map(|_| "[redacted]"))
            .finish()
    }
}

/// Title looked up in Drive when no `spreadsheet_id` is configured.
pub const DEFAULT_SPREADSHEET_NAME: &str = "SocialMediaPlans";

/// Google Sheets auto-save. The sink is enabled whenever credentials are
/// found: a service-account key, or else a static access token.
#[derive(Deserialize, Clone)]
#[serde(default)]
pub struct SheetsSettings {
    /// Target spreadsheet. When unset the sheet is found by `spreadsheet_name`.
    pub spreadsheet_id: Option<String>,
    pub spreadsheet_name: String,
    pub range: String,
    /// Service-account key file. When unset, `GOOGLE_CREDENTIALS` (inline
    /// JSON) and then `./google-credentials.json` are tried.
    pub credentials_file: Option<String>,
    /// Static OAuth token, used when no service account is found.
    /// Falls back to `GOOGLE_SHEETS_TOKEN`.
    pub access_token: Option<String>,
    pub timeout_seconds: u64,
}

impl Default for SheetsSettings {
    fn default() -> Self {
        Self {
            spreadsheet_id: None,
            spreadsheet_name: DEFAULT_SPREADSHEET_NAME.to_string(),
            range: "Sheet1".to_string(),
            credentials_file: None,
            access_token: None,
            timeout_seconds: 30,
        }
    }
}

impl std::fmt::Debug for SheetsSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SheetsSettings")
            .field("spreadsheet_id", &self.spreadsheet_id)
            .field("spreadsheet_name", &self.spreadsheet_name)
            .field("range", &self.range)
            .field("credentials_file", &self.credentials_file)
            .field("access_token", &self.access_token.as_ref().map(|_| "[redacted]"))
            .field("timeout_seconds", &self.timeout_seconds)
            .finish()
    }
}

impl PostplanConfig {
    /// Load from an optional TOML file, then apply `POSTPLAN__*` env overrides.
    pub fn load(path: &str) -> Result<Self, ConfigError> {
        let s = Config::builder()
            .add_source(File::with_name(path).required(false))
            .add_source(Environment::with_prefix(ENV_PREFIX).separator("__"))
            .build()?;
        s.try_deserialize()
    }

    pub fn from_toml_str(toml: &str) -> Result<Self, ConfigError> {
        let s = Config::builder()
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()?;
        s.try_deserialize()
    }

    pub fn http_addr(&self) -> String {
        format!("{}:{}", self.http.host, self.http.port)
    }
}
