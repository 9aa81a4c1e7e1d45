use super::credentials::CredentialChain;
use super::models::{EventRequest, InsertedEvent};
use super::token::TokenManager;
use crate::config::Config;
use crate::error::{google_calendar_error, AppResult};
use async_trait::async_trait;
use reqwest::Client;
use tracing::info;

/// Something that can create calendar events
#[async_trait]
pub trait CalendarClient: Send + Sync + 'static {
    /// Create `event` on `calendar_id`
    async fn insert_event(
        &self,
        calendar_id: &str,
        event: &EventRequest,
    ) -> AppResult<InsertedEvent>;
}

/// Calendar v3 REST client.
///
/// Credentials are loaded again on every call, so a token file written
/// while the server runs is picked up without a restart.
pub struct GoogleCalendarClient {
    client: Client,
    api_base: String,
    credentials: CredentialChain,
    token_manager: TokenManager,
}

impl GoogleCalendarClient {
    pub fn new(api_base: impl Into<String>, credentials: CredentialChain) -> Self {
        let client = Client::new();
        Self {
            token_manager: TokenManager::new(client.clone()),
            client,
            api_base: api_base.into(),
            credentials,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(&config.calendar_api_base, CredentialChain::from_config(config))
    }

    fn events_url(&self, calendar_id: &str) -> String {
        format!(
            "{}/calendars/{}/events",
            self.api_base.trim_end_matches('/'),
            urlencoding::encode(calendar_id)
        )
    }
}

#[async_trait]
impl CalendarClient for GoogleCalendarClient {
    async fn insert_event(
        &self,
        calendar_id: &str,
        event: &EventRequest,
    ) -> AppResult<InsertedEvent> {
        let creds = self.credentials.load()?;
        let access_token = self.token_manager.access_token(&creds).await?;

        let response = self
            .client
            .post(self.events_url(calendar_id))
            .bearer_auth(access_token)
            .json(event)
            .send()
            .await
            .map_err(|e| google_calendar_error(&format!("Failed to insert event: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_body = response
                .text()
                .await
                .unwrap_or_else(|_| "Could not read error response".to_string());
            return Err(google_calendar_error(&format!(
                "Failed to insert event: HTTP {} - {}",
                status, error_body
            )));
        }

        let inserted: InsertedEvent = response.json().await.map_err(|e| {
            google_calendar_error(&format!("Failed to parse insert response: {}", e))
        })?;

        info!(
            "Created event '{}' at {} on calendar {} (id: {})",
            event.summary,
            event.start.date_time,
            calendar_id,
            inserted.id.as_deref().unwrap_or("unknown")
        );
        Ok(inserted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_events_url_encodes_calendar_id() {
        let client =
            GoogleCalendarClient::new("https://example.test/calendar/v3/", CredentialChain::new());
        assert_eq!(
            client.events_url("primary"),
            "https://example.test/calendar/v3/calendars/primary/events"
        );
        assert_eq!(
            client.events_url("team@group.calendar.google.com"),
            "https://example.test/calendar/v3/calendars/team%40group.calendar.google.com/events"
        );
    }
}
