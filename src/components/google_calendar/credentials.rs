use crate::config::Config;
use crate::error::{credentials_error, AppResult};
use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::env;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Google's OAuth2 token endpoint
pub const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// Scope needed to create events
pub const CALENDAR_SCOPE: &str = "https://www.googleapis.com/auth/calendar";

/// Access tokens this close to expiry are treated as expired
const EXPIRY_SKEW_SECONDS: i64 = 60;

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

/// OAuth2 "authorized user" credentials, in the JSON layout Google's
/// client libraries write to `token.json`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizedUserCredentials {
    /// Current access token, if any
    #[serde(default, alias = "access_token", skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    pub refresh_token: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
    pub client_id: String,
    pub client_secret: String,
    #[serde(default)]
    pub scopes: Vec<String>,
    /// When the access token stops working
    #[serde(
        default,
        deserialize_with = "deserialize_expiry",
        skip_serializing_if = "Option::is_none"
    )]
    pub expiry: Option<DateTime<Utc>>,
}

/// Accept both RFC 3339 and the offset-less UTC timestamps some tools write
fn deserialize_expiry<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let Some(raw) = Option::<String>::deserialize(deserializer)? else {
        return Ok(None);
    };

    if let Ok(dt) = DateTime::parse_from_rfc3339(&raw) {
        return Ok(Some(dt.with_timezone(&Utc)));
    }
    NaiveDateTime::parse_from_str(&raw, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|naive| Some(naive.and_utc()))
        .map_err(serde::de::Error::custom)
}

impl AuthorizedUserCredentials {
    /// Parse and check the fields a refresh needs
    pub fn from_json(json: &str) -> Result<Self, String> {
        let creds: Self = serde_json::from_str(json).map_err(|e| e.to_string())?;

        let missing: Vec<&str> = [
            ("refresh_token", &creds.refresh_token),
            ("client_id", &creds.client_id),
            ("client_secret", &creds.client_secret),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| name)
        .collect();

        if !missing.is_empty() {
            return Err(format!("empty fields: {}", missing.join(", ")));
        }

        Ok(creds)
    }

    /// Whether the stored access token can be used at `now` without a refresh
    pub fn has_fresh_access_token(&self, now: DateTime<Utc>) -> bool {
        match (self.token.as_deref(), self.expiry) {
            (None, _) | (Some(""), _) => false,
            (Some(_), None) => true,
            (Some(_), Some(expiry)) => expiry - Duration::seconds(EXPIRY_SKEW_SECONDS) > now,
        }
    }

    /// Write the credentials in the same layout they are read from
    pub fn save(&self, path: &Path) -> AppResult<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }
}

/// Outcome of asking one credential source
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialLookup {
    Found(AuthorizedUserCredentials),
    NotFound,
    Invalid(String),
}

/// A place credentials may come from
pub trait CredentialProvider: Send + Sync {
    /// Human-readable description for logs and errors
    fn describe(&self) -> String;

    /// Look for credentials; never panics and never fails hard
    fn lookup(&self) -> CredentialLookup;
}

/// Interpret a JSON credential blob from any source
pub fn parse_credential_blob(json: &str) -> CredentialLookup {
    if json.trim().is_empty() {
        return CredentialLookup::NotFound;
    }
    match AuthorizedUserCredentials::from_json(json) {
        Ok(creds) => CredentialLookup::Found(creds),
        Err(reason) => CredentialLookup::Invalid(reason),
    }
}

/// Token file written by `get_calendar_token`
#[derive(Debug, Clone)]
pub struct TokenFileProvider {
    path: PathBuf,
}

impl TokenFileProvider {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl CredentialProvider for TokenFileProvider {
    fn describe(&self) -> String {
        format!("token file {}", self.path.display())
    }

    fn lookup(&self) -> CredentialLookup {
        match fs::read_to_string(&self.path) {
            Ok(content) => parse_credential_blob(&content),
            Err(e) if e.kind() == ErrorKind::NotFound => CredentialLookup::NotFound,
            Err(e) => CredentialLookup::Invalid(format!("unreadable: {}", e)),
        }
    }
}

/// JSON blob stored in an environment variable
#[derive(Debug, Clone)]
pub struct EnvBlobProvider {
    var_name: String,
}

impl EnvBlobProvider {
    pub fn new(var_name: impl Into<String>) -> Self {
        Self {
            var_name: var_name.into(),
        }
    }
}

impl CredentialProvider for EnvBlobProvider {
    fn describe(&self) -> String {
        format!("environment variable {}", self.var_name)
    }

    fn lookup(&self) -> CredentialLookup {
        match env::var(&self.var_name) {
            Ok(blob) => parse_credential_blob(&blob),
            Err(env::VarError::NotPresent) => CredentialLookup::NotFound,
            Err(env::VarError::NotUnicode(_)) => {
                CredentialLookup::Invalid("value is not valid unicode".to_string())
            }
        }
    }
}

/// Credential sources tried in order; the first one that yields
/// credentials wins
#[derive(Default)]
pub struct CredentialChain {
    providers: Vec<Box<dyn CredentialProvider>>,
}

impl CredentialChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a provider to the end of the chain
    pub fn with_provider(mut self, provider: impl CredentialProvider + 'static) -> Self {
        self.providers.push(Box::new(provider));
        self
    }

    /// Token file first, then the environment blob
    pub fn from_config(config: &Config) -> Self {
        Self::new()
            .with_provider(TokenFileProvider::new(&config.token_file))
            .with_provider(EnvBlobProvider::new(&config.credentials_env_var))
    }

    /// Load credentials, failing with every provider's outcome when none succeed
    pub fn load(&self) -> AppResult<AuthorizedUserCredentials> {
        let mut outcomes = Vec::with_capacity(self.providers.len());

        for provider in &self.providers {
            match provider.lookup() {
                CredentialLookup::Found(creds) => {
                    info!("Loaded Google credentials from {}", provider.describe());
                    return Ok(creds);
                }
                CredentialLookup::NotFound => {
                    debug!("No credentials in {}", provider.describe());
                    outcomes.push(format!("{}: not found", provider.describe()));
                }
                CredentialLookup::Invalid(reason) => {
                    warn!("Ignoring invalid credentials in {}: {}", provider.describe(), reason);
                    outcomes.push(format!("{}: invalid ({})", provider.describe(), reason));
                }
            }
        }

        if outcomes.is_empty() {
            return Err(credentials_error("no credential sources configured"));
        }
        Err(credentials_error(&format!(
            "no usable Google credentials; {}",
            outcomes.join("; ")
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use chrono::TimeZone;

    const VALID: &str = r#"{
        "token": "ya29.access",
        "refresh_token": "1//refresh",
        "token_uri": "https://oauth2.googleapis.com/token",
        "client_id": "id.apps.googleusercontent.com",
        "client_secret": "secret",
        "scopes": ["https://www.googleapis.com/auth/calendar"],
        "expiry": "2025-03-14T06:00:00.123456Z"
    }"#;

    struct Fixed(CredentialLookup);

    impl CredentialProvider for Fixed {
        fn describe(&self) -> String {
            "fixed".to_string()
        }

        fn lookup(&self) -> CredentialLookup {
            self.0.clone()
        }
    }

    #[test]
    fn test_parse_authorized_user_json() {
        let CredentialLookup::Found(creds) = parse_credential_blob(VALID) else {
            panic!("expected credentials");
        };
        assert_eq!(creds.token.as_deref(), Some("ya29.access"));
        assert_eq!(creds.refresh_token, "1//refresh");
        assert_eq!(creds.scopes, vec![CALENDAR_SCOPE.to_string()]);
        assert_eq!(
            creds.expiry.map(|e| e.timestamp()),
            Some(Utc.with_ymd_and_hms(2025, 3, 14, 6, 0, 0).unwrap().timestamp())
        );
    }

    #[test]
    fn test_offsetless_expiry_and_default_token_uri() {
        let json = r#"{
            "refresh_token": "r",
            "client_id": "c",
            "client_secret": "s",
            "expiry": "2025-03-14T06:00:00"
        }"#;
        let creds = AuthorizedUserCredentials::from_json(json).unwrap();
        assert_eq!(creds.token_uri, DEFAULT_TOKEN_URI);
        assert_eq!(creds.expiry, Some(Utc.with_ymd_and_hms(2025, 3, 14, 6, 0, 0).unwrap()));
        assert_eq!(creds.token, None);
    }

    #[test]
    fn test_invalid_blobs() {
        assert_eq!(parse_credential_blob("   "), CredentialLookup::NotFound);
        assert!(matches!(parse_credential_blob("not json"), CredentialLookup::Invalid(_)));
        assert!(matches!(
            parse_credential_blob(r#"{"client_id":"c","client_secret":"s"}"#),
            CredentialLookup::Invalid(reason) if reason.contains("refresh_token")
        ));
        assert!(matches!(
            parse_credential_blob(r#"{"refresh_token":"","client_id":"c","client_secret":"s"}"#),
            CredentialLookup::Invalid(reason) if reason.contains("refresh_token")
        ));
    }

    #[test]
    fn test_access_token_freshness() {
        let now = Utc.with_ymd_and_hms(2025, 3, 14, 5, 0, 0).unwrap();
        let mut creds = AuthorizedUserCredentials::from_json(VALID).unwrap();
        assert!(creds.has_fresh_access_token(now));

        // Inside the skew window
        creds.expiry = Some(now + Duration::seconds(30));
        assert!(!creds.has_fresh_access_token(now));

        creds.expiry = None;
        assert!(creds.has_fresh_access_token(now));

        creds.token = None;
        assert!(!creds.has_fresh_access_token(now));
    }

    #[test]
    fn test_token_file_provider() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("token.json");

        let provider = TokenFileProvider::new(&path);
        assert_eq!(provider.lookup(), CredentialLookup::NotFound);

        fs::write(&path, VALID).unwrap();
        assert!(matches!(provider.lookup(), CredentialLookup::Found(_)));

        fs::write(&path, "{").unwrap();
        assert!(matches!(provider.lookup(), CredentialLookup::Invalid(_)));
    }

    #[test]
    fn test_save_round_trips_through_provider() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("token.json");
        let creds = AuthorizedUserCredentials::from_json(VALID).unwrap();

        creds.save(&path).unwrap();
        assert_eq!(TokenFileProvider::new(&path).lookup(), CredentialLookup::Found(creds));
    }

    #[test]
    fn test_env_provider_unset_variable() {
        let provider = EnvBlobProvider::new("EVENT_REGISTRAR_TEST_SURELY_UNSET_VAR");
        assert_eq!(provider.lookup(), CredentialLookup::NotFound);
    }

    #[test]
    fn test_env_provider_reads_blob() {
        let var = "EVENT_REGISTRAR_TEST_ENV_PROVIDER_VALID";
        env::set_var(var, VALID);

        let provider = EnvBlobProvider::new(var);
        assert_eq!(
            provider.lookup(),
            CredentialLookup::Found(AuthorizedUserCredentials::from_json(VALID).unwrap())
        );
        assert_eq!(provider.describe(), format!("environment variable {}", var));

        env::remove_var(var);
    }

    #[test]
    fn test_env_provider_malformed_and_empty_blobs() {
        let var = "EVENT_REGISTRAR_TEST_ENV_PROVIDER_MALFORMED";
        let provider = EnvBlobProvider::new(var);

        env::set_var(var, r#"{"refresh_token": "r""#);
        assert!(matches!(provider.lookup(), CredentialLookup::Invalid(_)));

        env::set_var(var, r#"{"refresh_token":"r","client_id":"c"}"#);
        assert!(matches!(
            provider.lookup(),
            CredentialLookup::Invalid(reason) if reason.contains("client_secret")
        ));

        env::set_var(var, "");
        assert_eq!(provider.lookup(), CredentialLookup::NotFound);

        env::remove_var(var);
    }

    #[test]
    fn test_default_chain_falls_back_to_env() {
        let var = "EVENT_REGISTRAR_TEST_DEFAULT_CHAIN_FALLBACK";
        let tmp = tempfile::tempdir().unwrap();
        let config = Config {
            token_file: tmp.path().join("missing-token.json"),
            credentials_env_var: var.to_string(),
            ..Default::default()
        };
        let chain = CredentialChain::from_config(&config);

        // Neither source has anything yet
        match chain.load() {
            Err(Error::Credentials(message)) => {
                assert!(message.contains("missing-token.json: not found"));
                assert!(message.contains(&format!("environment variable {}: not found", var)));
            }
            other => panic!("expected credential error, got {:?}", other),
        }

        env::set_var(var, VALID);
        let creds = chain.load().unwrap();
        assert_eq!(creds.refresh_token, "1//refresh");
        env::remove_var(var);

        // The token file wins once it exists
        let mut from_file = creds.clone();
        from_file.refresh_token = "1//from-file".to_string();
        from_file.save(&config.token_file).unwrap();
        env::set_var(var, VALID);
        assert_eq!(chain.load().unwrap().refresh_token, "1//from-file");
        env::remove_var(var);
    }

    #[test]
    fn test_chain_first_found_wins_and_skips_invalid() {
        let creds = AuthorizedUserCredentials::from_json(VALID).unwrap();
        let chain = CredentialChain::new()
            .with_provider(Fixed(CredentialLookup::NotFound))
            .with_provider(Fixed(CredentialLookup::Invalid("bad".to_string())))
            .with_provider(Fixed(CredentialLookup::Found(creds.clone())));

        assert_eq!(chain.load().unwrap(), creds);
    }

    #[test]
    fn test_chain_fails_explicitly() {
        let chain = CredentialChain::new()
            .with_provider(Fixed(CredentialLookup::NotFound))
            .with_provider(Fixed(CredentialLookup::Invalid("bad json".to_string())));

        match chain.load() {
            Err(Error::Credentials(message)) => {
                assert!(message.contains("not found"));
                assert!(message.contains("bad json"));
            }
            other => panic!("expected credential error, got {:?}", other),
        }

        assert!(matches!(CredentialChain::new().load(), Err(Error::Credentials(_))));
    }
}
