// src/errors.rs
use thiserror::Error;

/// Everything that can go wrong between the portal and the caller.
///
/// Strategies never let these escape: each one is converted into a
/// failed [`crate::types::FetchResult`] with a displayable reason.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum Error {
    /// Token string has the wrong shape (length, facility prefix).
    #[error("bad token format: {0}")]
    Format(String),

    /// Token string has the right shape but an invalid field.
    #[error("bad token field: {0}")]
    Field(String),

    /// Portal re-showed the login form after a credentialed POST.
    #[error("login failed")]
    LoginFailed,

    /// An authenticated request was bounced back to the login page.
    /// Displayed as "not authenticated": that is what the bounce
    /// means to the caller, whatever the portal's reason.
    #[error("not authenticated")]
    SessionExpired,

    /// Dashboard loaded but the QR element was not on it.
    #[error("QR element not found")]
    ElementNotFound,

    #[error("network error: {0}")]
    Network(String),

    /// Markup or structured payload did not parse.
    #[error("parse error: {0}")]
    Parse(String),

    #[error("all methods failed")]
    AllStrategiesFailed,
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Network(e.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Parse(e.to_string())
    }
}
