mod client;
pub mod credentials;
pub mod models;
pub mod token;

pub use client::{CalendarClient, GoogleCalendarClient};
pub use credentials::{
    AuthorizedUserCredentials, CredentialChain, CredentialLookup, CredentialProvider,
    EnvBlobProvider, TokenFileProvider,
};
pub use models::{EventDateTime, EventRequest, InsertedEvent};
pub use token::TokenManager;

/// User-facing text after the event was created
pub const SUCCESS_MESSAGE: &str = "Googleカレンダーにイベント登録完了！";
