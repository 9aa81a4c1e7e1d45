mod fuzzy;

pub use fuzzy::{DateParseError, FuzzyDateParser};

use chrono::{NaiveDateTime, NaiveTime, Utc};
use chrono_tz::Tz;
use tracing::{info, warn};

/// User-facing text when a document holds no usable date
pub const NO_DATE_MESSAGE: &str = "日付が見つからなかったよ！";

/// What the pipeline knows about the event to create
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventInfo {
    pub summary: String,
    pub start: Option<NaiveDateTime>,
    /// Always equal to `start`
    pub end: Option<NaiveDateTime>,
}

impl EventInfo {
    /// Event that starts and ends at `when`
    pub fn at(summary: impl Into<String>, when: NaiveDateTime) -> Self {
        Self {
            summary: summary.into(),
            start: Some(when),
            end: Some(when),
        }
    }

    /// Event without a timestamp
    pub fn undated(summary: impl Into<String>) -> Self {
        Self {
            summary: summary.into(),
            start: None,
            end: None,
        }
    }
}

/// Turns extracted document text into an [`EventInfo`]
#[derive(Debug, Clone)]
pub struct EventInfoExtractor {
    summary: String,
    parser: FuzzyDateParser,
}

impl EventInfoExtractor {
    pub fn new(summary: impl Into<String>, reference: NaiveDateTime) -> Self {
        Self {
            summary: summary.into(),
            parser: FuzzyDateParser::new(reference),
        }
    }

    /// Extractor whose missing date fields default to today, midnight, in `tz`
    pub fn for_today(summary: impl Into<String>, tz: Tz) -> Self {
        let today = Utc::now().with_timezone(&tz).date_naive();
        Self::new(summary, today.and_time(NaiveTime::MIN))
    }

    /// Extract the event, reporting why no date could be found
    pub fn try_extract(&self, text: &str) -> Result<EventInfo, DateParseError> {
        let when = self.parser.parse(text)?;
        info!("Found event date {}", when);
        Ok(EventInfo::at(self.summary.clone(), when))
    }

    /// Extract the event, leaving start and end empty when no date is found
    pub fn extract(&self, text: &str) -> EventInfo {
        match self.try_extract(text) {
            Ok(event) => event,
            Err(e) => {
                warn!("No event date extracted: {}", e);
                EventInfo::undated(self.summary.clone())
            }
        }
    }
}
