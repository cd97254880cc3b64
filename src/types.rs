// src/types.rs
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Which acquisition strategy produced a result.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Source {
    Predicted,
    Cached,
    HeadlessHttp,
    ScriptedBrowser,
    LocalHelper,
    Unknown,
}

impl Source {
    pub fn label(self) -> &'static str {
        match self {
            Source::Predicted => "predicted",
            Source::Cached => "cached",
            Source::HeadlessHttp => "headless-http",
            Source::ScriptedBrowser => "scripted-browser",
            Source::LocalHelper => "local-helper",
            Source::Unknown => "unknown",
        }
    }

    /// Only network-backed successes are worth caching. Caching the
    /// free predicted result would mask the scraping strategies, and
    /// re-caching a cache hit would loop.
    pub fn cacheable(self) -> bool {
        matches!(
            self,
            Source::HeadlessHttp | Source::ScriptedBrowser | Source::LocalHelper
        )
    }
}

/// Outcome of one acquisition attempt.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FetchResult {
    pub succeeded: bool,
    /// Raw 18-char token string, when the strategy recovered one.
    pub token: Option<String>,
    /// Verbatim SVG markup of the QR element, when present.
    pub graphic: Option<String>,
    /// Short, displayable cause on failure.
    pub error_reason: Option<String>,
    pub source: Source,
    pub produced_at: DateTime<Utc>,
}

impl FetchResult {
    pub fn success(source: Source, token: Option<String>, graphic: Option<String>) -> Self {
        Self {
            succeeded: true,
            token,
            graphic,
            error_reason: None,
            source,
            produced_at: Utc::now(),
        }
    }

    pub fn failure(source: Source, reason: impl Into<String>) -> Self {
        Self {
            succeeded: false,
            token: None,
            graphic: None,
            error_reason: Some(reason.into()),
            source,
            produced_at: Utc::now(),
        }
    }

    pub fn reason(&self) -> &str {
        self.error_reason.as_deref().unwrap_or("")
    }
}

/// Portal username/password. Held in memory only; the core never
/// persists these anywhere.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self { username: username.into(), password: password.into() }
    }
}

// Keep the password out of logs and panics.
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}
