use crate::components::google_calendar::{CalendarClient, GoogleCalendarClient};
use crate::config::Config;
use crate::error::{other_error, Error};
use crate::shutdown;
use crate::web::{build_router, AppState};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Initialize logging with environment-based configuration
pub fn init_logging() -> miette::Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,tower_http=debug")),
        )
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| Error::Other(format!("Failed to set up logging: {}", e)))?;

    Ok(())
}

/// Load the application config
pub fn load_config() -> miette::Result<Arc<Config>> {
    match Config::load() {
        Ok(config) => Ok(Arc::new(config)),
        Err(e) => {
            error!("Failed to load configuration: {:?}", e);
            Err(e.into())
        }
    }
}

/// Bind the listener and serve requests until shutdown
pub async fn start_server(config: Arc<Config>) -> miette::Result<()> {
    tokio::fs::create_dir_all(&config.upload_dir)
        .await
        .map_err(Error::from)?;
    info!("Saving uploads to {}", config.upload_dir.display());

    let calendar: Arc<dyn CalendarClient> = Arc::new(GoogleCalendarClient::from_config(&config));
    info!(
        "Events go to calendar '{}' in {}",
        config.calendar_id, config.timezone
    );

    let app = build_router(AppState::new(Arc::clone(&config), calendar));

    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| other_error(&format!("Failed to bind {}: {}", addr, e)))?;
    info!("Listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown::wait_for_signal())
        .await
        .map_err(|e| other_error(&format!("Server error: {}", e)))?;

    info!("Server stopped");
    Ok(())
}
