use crate::components::event_info::{DateParseError, EventInfo};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Local wall-clock format the Calendar API expects next to a `timeZone`
pub const CALENDAR_DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Start or end of an event, as sent to `events.insert`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventDateTime {
    pub date_time: String,
    pub time_zone: String,
}

impl EventDateTime {
    pub fn new(when: NaiveDateTime, time_zone: &str) -> Self {
        Self {
            date_time: when.format(CALENDAR_DATETIME_FORMAT).to_string(),
            time_zone: time_zone.to_string(),
        }
    }
}

/// Request body for `events.insert`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRequest {
    pub summary: String,
    pub start: EventDateTime,
    pub end: EventDateTime,
}

impl EventRequest {
    /// Build the request body; an undated event cannot be sent
    pub fn from_event_info(info: &EventInfo, time_zone: &str) -> Result<Self, DateParseError> {
        let start = info.start.ok_or(DateParseError::NoDateFound)?;
        let end = info.end.unwrap_or(start);

        Ok(Self {
            summary: info.summary.clone(),
            start: EventDateTime::new(start, time_zone),
            end: EventDateTime::new(end, time_zone),
        })
    }
}

/// The parts of the created event worth logging
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InsertedEvent {
    pub id: Option<String>,
    pub html_link: Option<String>,
}
