// src/portal/mod.rs
//
// Two interchangeable clients for the portal workflow: a raw
// form-submission client (fast, script-blind) and a scripted-browser
// client (slow, script-tolerant). The orchestrator treats them
// identically through `PortalClient`.

pub mod browser;
pub mod http;

pub use browser::{BrowserPortal, BrowserSurface, PageEvent};
pub use http::HttpPortal;

use crate::errors::Error;
use crate::types::{Credentials, FetchResult};

pub trait PortalClient {
    /// Runs the portal's authentication flow. `Ok(false)` means the
    /// portal re-showed the login form; `Err` is a transport-level
    /// problem. A successful login persists the session.
    fn login(&mut self, creds: &Credentials) -> Result<bool, Error>;

    /// Lightweight authenticated request; false when bounced back to
    /// the login page.
    fn is_session_valid(&mut self) -> bool;

    /// Never panics and never returns a bare error: all failure modes
    /// land in `FetchResult::failure` with a displayable reason.
    fn fetch_token(&mut self) -> FetchResult;

    /// Drops local cookie state and page artifacts.
    fn clear_session(&mut self);
}

// ASP.NET decorates redirects with query noise, so URL checks compare
// the path, case-insensitively.

pub(crate) fn is_login_url(url: &str) -> bool {
    path_of(url).ends_with("login.aspx")
}

pub(crate) fn is_dashboard_url(url: &str) -> bool {
    path_of(url).ends_with("bookingportal.aspx")
}

fn path_of(url: &str) -> String {
    let no_query = url.split(['?', '#']).next().unwrap_or(url);
    no_query.to_ascii_lowercase()
}
