use crate::error::{config_error, env_error, AppResult};
use chrono_tz::Tz;
use dotenvy::dotenv;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use tracing::info;

/// Optional configuration file, read before environment overrides
pub const CONFIG_FILE: &str = "config/app.toml";

/// Summary given to every event created from an upload
pub const DEFAULT_EVENT_SUMMARY: &str = "抽出イベント";

/// Timezone attached to event timestamps
pub const DEFAULT_TIMEZONE: &str = "Asia/Tokyo";

/// Environment variable holding a JSON credential blob
pub const DEFAULT_CREDENTIALS_ENV_VAR: &str = "GOOGLE_OAUTH_CREDENTIALS";

/// Google Calendar v3 REST endpoint
pub const DEFAULT_CALENDAR_API_BASE: &str = "https://www.googleapis.com/calendar/v3";

/// Main configuration structure for the web app
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Address to bind the HTTP server to
    pub host: IpAddr,
    /// Port to bind the HTTP server to
    pub port: u16,
    /// Directory where uploaded files are stored
    pub upload_dir: PathBuf,
    /// Authorized-user token file written by get_calendar_token
    pub token_file: PathBuf,
    /// Name of the environment variable that may hold a credential blob
    pub credentials_env_var: String,
    /// Calendar that receives new events
    pub calendar_id: String,
    /// IANA timezone name for event timestamps
    pub timezone: String,
    /// Summary text for created events
    pub event_summary: String,
    /// Base URL of the Calendar API
    pub calendar_api_base: String,
    /// Request body limit for uploads
    pub max_upload_bytes: usize,
    /// OAuth client ID, only needed to mint a new token
    pub google_client_id: Option<String>,
    /// OAuth client secret, only needed to mint a new token
    pub google_client_secret: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: 3000,
            upload_dir: PathBuf::from("uploads"),
            token_file: PathBuf::from("token.json"),
            credentials_env_var: DEFAULT_CREDENTIALS_ENV_VAR.to_string(),
            calendar_id: "primary".to_string(),
            timezone: DEFAULT_TIMEZONE.to_string(),
            event_summary: DEFAULT_EVENT_SUMMARY.to_string(),
            calendar_api_base: DEFAULT_CALENDAR_API_BASE.to_string(),
            max_upload_bytes: 10 * 1024 * 1024,
            google_client_id: None,
            google_client_secret: None,
        }
    }
}

impl Config {
    /// Load configuration from the config file and environment
    pub fn load() -> AppResult<Self> {
        // Load .env file if it exists
        dotenv().ok();

        let mut config = match fs::read_to_string(CONFIG_FILE) {
            Ok(content) => {
                info!("Loading configuration from {}", CONFIG_FILE);
                Self::from_toml_str(&content)?
            }
            Err(_) => Self::default(),
        };

        config.apply_overrides(|key| env::var(key).ok())?;
        config.validate()?;

        Ok(config)
    }

    /// Parse a TOML document, filling in defaults for missing keys
    pub fn from_toml_str(content: &str) -> AppResult<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Apply overrides from a key lookup (normally the process environment)
    pub fn apply_overrides<F>(&mut self, lookup: F) -> AppResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(host) = get("HOST") {
            self.host = host.trim().parse().map_err(|_| env_error("HOST"))?;
        }
        if let Some(port) = get("PORT") {
            self.port = port.trim().parse().map_err(|_| env_error("PORT"))?;
        }
        if let Some(dir) = get("UPLOAD_DIR") {
            self.upload_dir = PathBuf::from(dir);
        }
        if let Some(path) = get("GOOGLE_TOKEN_FILE") {
            self.token_file = PathBuf::from(path);
        }
        if let Some(var) = get("GOOGLE_CREDENTIALS_ENV") {
            self.credentials_env_var = var;
        }
        if let Some(id) = get("GOOGLE_CALENDAR_ID") {
            self.calendar_id = id;
        }
        if let Some(tz) = get("TIMEZONE") {
            self.timezone = tz;
        }
        if let Some(summary) = get("EVENT_SUMMARY") {
            self.event_summary = summary;
        }
        if let Some(base) = get("GOOGLE_CALENDAR_API_BASE") {
            self.calendar_api_base = base;
        }
        if let Some(limit) = get("MAX_UPLOAD_BYTES") {
            self.max_upload_bytes = limit
                .trim()
                .parse()
                .map_err(|_| env_error("MAX_UPLOAD_BYTES"))?;
        }
        if let Some(id) = get("GOOGLE_CLIENT_ID") {
            self.google_client_id = Some(id);
        }
        if let Some(secret) = get("GOOGLE_CLIENT_SECRET") {
            self.google_client_secret = Some(secret);
        }

        Ok(())
    }

    /// Check values that cannot be validated by deserialization alone
    pub fn validate(&self) -> AppResult<()> {
        self.tz()?;
        if self.calendar_id.trim().is_empty() {
            return Err(config_error("calendar_id must not be empty"));
        }
        Ok(())
    }

    /// Parsed event timezone
    pub fn tz(&self) -> AppResult<Tz> {
        self.timezone
            .parse::<Tz>()
            .map_err(|_| config_error(&format!("Unknown timezone: {}", self.timezone)))
    }

    /// Socket address the server listens on
    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}
