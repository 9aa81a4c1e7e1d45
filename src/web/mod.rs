mod handlers;

use crate::components::google_calendar::CalendarClient;
use crate::config::Config;
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

pub use handlers::{
    health_handler, index_handler, upload_handler, EMPTY_FILENAME_MESSAGE,
    EXTRACTION_FAILED_MESSAGE, INTERNAL_ERROR_MESSAGE, MALFORMED_UPLOAD_MESSAGE,
    MISSING_CREDENTIALS_MESSAGE, MISSING_FILE_MESSAGE, REMOTE_FAILED_MESSAGE,
};

#[derive(Clone)]
pub struct AppState {
    /// Loaded once at startup
    pub config: Arc<Config>,
    /// Where extracted events are written
    pub calendar: Arc<dyn CalendarClient>,
}

impl AppState {
    pub fn new(config: Arc<Config>, calendar: Arc<dyn CalendarClient>) -> Self {
        Self { config, calendar }
    }
}

/// Build the application router
pub fn build_router(state: AppState) -> Router {
    let body_limit = state.config.max_upload_bytes;

    Router::new()
        .route("/", get(index_handler))
        .route("/upload", post(upload_handler))
        .route("/health", get(health_handler))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
