//! Stages of the upload pipeline, in the order a request passes through them:
//! upload → document → event_info → google_calendar.

pub mod document;
pub mod event_info;
pub mod google_calendar;
pub mod upload;
