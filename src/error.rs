use crate::components::event_info::DateParseError;
use miette::{Diagnostic, Result};
use thiserror::Error;

/// Main error type for the application
#[derive(Debug, Error, Diagnostic)]
pub enum Error {
    #[error("Environment error: {0}")]
    #[diagnostic(code(event_registrar::environment))]
    Environment(String),

    #[error("Configuration error: {0}")]
    #[diagnostic(code(event_registrar::config))]
    Config(String),

    #[error("Upload error: {0}")]
    #[diagnostic(code(event_registrar::upload))]
    Upload(String),

    #[error("Unsupported document format: {0}")]
    #[diagnostic(
        code(event_registrar::unsupported_format),
        help("Only .pdf and .docx files can be read")
    )]
    UnsupportedFormat(String),

    #[error("Text extraction error: {0}")]
    #[diagnostic(code(event_registrar::extraction))]
    Extraction(String),

    #[error(transparent)]
    #[diagnostic(code(event_registrar::date_parse))]
    DateParse(#[from] DateParseError),

    #[error("Credential error: {0}")]
    #[diagnostic(
        code(event_registrar::credentials),
        help("Run get_calendar_token or set the credential environment variable")
    )]
    Credentials(String),

    #[error("Google Calendar API error: {0}")]
    #[diagnostic(code(event_registrar::google_calendar))]
    GoogleCalendar(String),

    #[error(transparent)]
    #[diagnostic(code(event_registrar::io))]
    Io(#[from] std::io::Error),

    #[error("HTTP client error: {0}")]
    #[diagnostic(code(event_registrar::http))]
    Http(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    #[diagnostic(code(event_registrar::serialization))]
    Serialization(String),

    #[error("Other error: {0}")]
    #[diagnostic(code(event_registrar::other))]
    Other(String),
}

// Implement From for TOML deserialization errors
impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

// Implement From for JSON errors
impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

/// Type alias for Result with our Error type
pub type AppResult<T> = Result<T, Error>;

/// Helper to create environment errors
pub fn env_error(var: &str) -> Error {
    Error::Environment(format!("Invalid environment variable: {}", var))
}

/// Helper to create configuration errors
pub fn config_error(message: &str) -> Error {
    Error::Config(message.to_string())
}

/// Helper to create upload errors
pub fn upload_error(message: &str) -> Error {
    Error::Upload(message.to_string())
}

/// Helper to create text extraction errors
pub fn extraction_error(message: &str) -> Error {
    Error::Extraction(message.to_string())
}

/// Helper to create credential errors
pub fn credentials_error(message: &str) -> Error {
    Error::Credentials(message.to_string())
}

/// Helper to create Google Calendar errors
pub fn google_calendar_error(message: &str) -> Error {
    Error::GoogleCalendar(message.to_string())
}

/// Helper to create other errors
pub fn other_error(message: &str) -> Error {
    Error::Other(message.to_string())
}
