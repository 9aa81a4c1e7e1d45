use super::AppState;
use crate::components::document::{extract_text, DocumentKind, UNSUPPORTED_FORMAT_MESSAGE};
use crate::components::event_info::{EventInfoExtractor, NO_DATE_MESSAGE};
use crate::components::google_calendar::{EventRequest, SUCCESS_MESSAGE};
use crate::components::upload::{sanitize_filename, save_upload};
use crate::error::{other_error, upload_error, AppResult, Error};
use axum::{
    body::Bytes,
    extract::{multipart::MultipartRejection, Multipart, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use std::path::Path;
use tracing::{error, info, warn};

pub const MISSING_FILE_MESSAGE: &str = "ファイルがないっぽいよ！";
pub const EMPTY_FILENAME_MESSAGE: &str = "ファイル名がないよ！";
pub const MALFORMED_UPLOAD_MESSAGE: &str = "アップロードを読み取れなかったよ！";
pub const EXTRACTION_FAILED_MESSAGE: &str = "ファイルからテキストを取り出せなかったよ！";
pub const MISSING_CREDENTIALS_MESSAGE: &str = "カレンダーの認証情報が設定されていないよ！";
pub const REMOTE_FAILED_MESSAGE: &str = "Googleカレンダーへの登録に失敗したよ！";
pub const INTERNAL_ERROR_MESSAGE: &str = "サーバーでエラーが起きたよ！";

/// Multipart field carrying the document
const FILE_FIELD: &str = "file";

/// Handler for the index page
pub async fn index_handler() -> impl IntoResponse {
    Html(include_str!("../../assets/index.html"))
}

// Handler for API health check
pub async fn health_handler() -> &'static str {
    "OK"
}

/// Receive a document, pull a date out of it and put it on the calendar
pub async fn upload_handler(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> AppResult<&'static str> {
    let mut multipart =
        multipart.map_err(|e| upload_error(&format!("Not a multipart request: {}", e)))?;

    let Some((raw_name, data)) = read_file_field(&mut multipart).await? else {
        warn!("Upload request without a '{}' field", FILE_FIELD);
        return Ok(MISSING_FILE_MESSAGE);
    };

    let Some(filename) = sanitize_filename(&raw_name) else {
        warn!("Upload with unusable filename {:?}", raw_name);
        return Ok(EMPTY_FILENAME_MESSAGE);
    };

    // Reject before anything touches the disk
    DocumentKind::from_path(Path::new(&filename)).ensure_supported()?;

    let config = &state.config;
    let path = save_upload(&config.upload_dir, &filename, &data).await?;

    let text = tokio::task::spawn_blocking(move || extract_text(&path))
        .await
        .map_err(|e| other_error(&format!("Text extraction task failed: {}", e)))??;

    let extractor = EventInfoExtractor::for_today(config.event_summary.as_str(), config.tz()?);
    let event_info = extractor.try_extract(&text)?;
    let event = EventRequest::from_event_info(&event_info, &config.timezone)?;

    state.calendar.insert_event(&config.calendar_id, &event).await?;

    info!("Registered '{}' from {}", event.summary, filename);
    Ok(SUCCESS_MESSAGE)
}

/// Find the `file` field and read it whole, skipping any other fields
async fn read_file_field(multipart: &mut Multipart) -> AppResult<Option<(String, Bytes)>> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| upload_error(&format!("Failed to read multipart field: {}", e)))?
    {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }
        // Without a filename parameter the part is a plain form value, not a file
        let Some(file_name) = field.file_name().map(str::to_string) else {
            continue;
        };
        let data = field
            .bytes()
            .await
            .map_err(|e| upload_error(&format!("Failed to read uploaded file: {}", e)))?;
        return Ok(Some((file_name, data)));
    }

    Ok(None)
}

impl Error {
    /// Status code and fixed response text for a failed upload
    fn response_parts(&self) -> (StatusCode, &'static str) {
        match self {
            Error::Upload(_) => (StatusCode::BAD_REQUEST, MALFORMED_UPLOAD_MESSAGE),
            Error::UnsupportedFormat(_) => {
                (StatusCode::UNSUPPORTED_MEDIA_TYPE, UNSUPPORTED_FORMAT_MESSAGE)
            }
            Error::Extraction(_) => (StatusCode::UNPROCESSABLE_ENTITY, EXTRACTION_FAILED_MESSAGE),
            Error::DateParse(_) => (StatusCode::UNPROCESSABLE_ENTITY, NO_DATE_MESSAGE),
            Error::Credentials(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, MISSING_CREDENTIALS_MESSAGE)
            }
            Error::GoogleCalendar(_) | Error::Http(_) => {
                (StatusCode::BAD_GATEWAY, REMOTE_FAILED_MESSAGE)
            }
            _ => (StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_ERROR_MESSAGE),
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let (status, message) = self.response_parts();

        if status.is_client_error() {
            warn!("Rejected upload ({}): {}", status, self);
        } else {
            error!("Upload failed ({}): {:?}", status, self);
        }

        (status, message).into_response()
    }
}
