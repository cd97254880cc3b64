// src/portal/browser.rs
//
// Scripted-browser client. The actual rendering surface (a webview,
// a headless browser, a test fake) lives behind `BrowserSurface` and
// reports back over an mpsc channel; this module owns the portal
// workflow: navigate, inject, wait for exactly one outcome.

use std::sync::mpsc::{Receiver, RecvTimeoutError};
use std::time::{Duration, Instant};

use serde::Deserialize;

use crate::config::consts::{
    DASHBOARD_URL, FACILITY_CODE, LOGIN_URL, PAGE_LOAD_TIMEOUT_SECS, PORTAL_HOST,
    QR_MIN_RECTS, SCRIPT_TIMEOUT_SECS,
};
use crate::errors::Error;
use crate::session::{SessionCookie, SessionStore};
use crate::types::{Credentials, FetchResult, Source};

use super::{PortalClient, is_dashboard_url, is_login_url};

/// One page-lifecycle event from the surface.
#[derive(Clone, Debug)]
pub enum PageEvent {
    /// Navigation committed; carries the landed URL.
    Navigated(String),
    /// Page load failed outright.
    LoadFailed(String),
    /// Completion value of the most recent `run_script` call.
    ScriptResult(String),
}

/// Minimal contract a rendering surface must honor.
///
/// `open` eventually produces `Navigated` or `LoadFailed`;
/// `run_script` eventually produces `ScriptResult` carrying the
/// script's completion value (a string). Events go to the channel the
/// embedder paired with the [`BrowserPortal`].
pub trait BrowserSurface {
    fn open(&mut self, url: &str);
    fn run_script(&mut self, script: &str);
    /// Cookies currently held by the surface, for session persistence.
    fn cookies(&mut self) -> Vec<SessionCookie> {
        Vec::new()
    }
}

pub struct BrowserPortal {
    surface: Box<dyn BrowserSurface>,
    events: Receiver<PageEvent>,
    sessions: SessionStore,
}

impl BrowserPortal {
    pub fn new(
        surface: Box<dyn BrowserSurface>,
        events: Receiver<PageEvent>,
        sessions: SessionStore,
    ) -> Self {
        Self { surface, events, sessions }
    }

    /// Stale events from an abandoned operation must not settle the
    /// next one; every operation starts from an empty channel.
    fn drain(&self) {
        while self.events.try_recv().is_ok() {}
    }

    /// First navigation outcome wins; duplicates and late errors are
    /// ignored. Script results from earlier injections are skipped.
    fn await_navigation(&self, timeout: Duration) -> Result<String, Error> {
        let deadline = Instant::now() + timeout;
        loop {
            let left = deadline.saturating_duration_since(Instant::now());
            match self.events.recv_timeout(left) {
                Ok(PageEvent::Navigated(url)) => return Ok(url),
                Ok(PageEvent::LoadFailed(reason)) => return Err(Error::Network(reason)),
                Ok(PageEvent::ScriptResult(_)) => continue,
                Err(RecvTimeoutError::Timeout) => {
                    return Err(Error::Network(s!("page load timed out")));
                }
                Err(RecvTimeoutError::Disconnected) => {
                    return Err(Error::Network(s!("browser surface went away")));
                }
            }
        }
    }

    /// First script completion wins. In-flight navigations (the login
    /// script triggers one) are handled by the caller afterwards, so
    /// they are skipped here, not treated as errors.
    fn await_script(&self, timeout: Duration) -> Result<String, Error> {
        let deadline = Instant::now() + timeout;
        loop {
            let left = deadline.saturating_duration_since(Instant::now());
            match self.events.recv_timeout(left) {
                Ok(PageEvent::ScriptResult(value)) => return Ok(value),
                Ok(PageEvent::Navigated(_)) => continue,
                Ok(PageEvent::LoadFailed(reason)) => return Err(Error::Network(reason)),
                Err(RecvTimeoutError::Timeout) => {
                    return Err(Error::Network(s!("script timed out")));
                }
                Err(RecvTimeoutError::Disconnected) => {
                    return Err(Error::Network(s!("browser surface went away")));
                }
            }
        }
    }

    fn page_timeout(&self) -> Duration {
        Duration::from_secs(PAGE_LOAD_TIMEOUT_SECS)
    }

    /// Snapshot the surface's cookies into the persisted session, so
    /// the headless client can reuse them.
    fn persist_cookies(&mut self) {
        let cookies = self.surface.cookies();
        if let Err(e) = self.sessions.save(PORTAL_HOST, &cookies) {
            loge!("browser portal: could not persist session: {e}");
        }
    }
}

impl PortalClient for BrowserPortal {
    fn login(&mut self, creds: &Credentials) -> Result<bool, Error> {
        self.drain();
        self.surface.open(LOGIN_URL);
        let landed = self.await_navigation(self.page_timeout())?;
        if !is_login_url(&landed) && is_dashboard_url(&landed) {
            // Surface already carries a live session.
            self.persist_cookies();
            return Ok(true);
        }

        self.surface.run_script(&login_script(creds));
        let after = self.await_navigation(self.page_timeout())?;
        if is_dashboard_url(&after) {
            self.persist_cookies();
            logf!("browser portal: login ok for {}", creds.username);
            Ok(true)
        } else {
            logd!("browser portal: login landed on {after}");
            Ok(false)
        }
    }

    fn is_session_valid(&mut self) -> bool {
        self.drain();
        self.surface.open(DASHBOARD_URL);
        match self.await_navigation(self.page_timeout()) {
            Ok(url) => is_dashboard_url(&url),
            Err(e) => {
                logd!("browser portal: session check failed: {e}");
                false
            }
        }
    }

    fn fetch_token(&mut self) -> FetchResult {
        self.drain();
        self.surface.open(DASHBOARD_URL);
        let landed = match self.await_navigation(self.page_timeout()) {
            Ok(url) => url,
            Err(e) => return FetchResult::failure(Source::ScriptedBrowser, e.to_string()),
        };
        if is_login_url(&landed) {
            return FetchResult::failure(Source::ScriptedBrowser, Error::SessionExpired.to_string());
        }

        self.surface.run_script(&extract_script());
        let raw = match self.await_script(Duration::from_secs(SCRIPT_TIMEOUT_SECS)) {
            Ok(v) => v,
            Err(e) => return FetchResult::failure(Source::ScriptedBrowser, e.to_string()),
        };

        let payload: ExtractPayload = match serde_json::from_str(&raw) {
            Ok(p) => p,
            Err(e) => {
                return FetchResult::failure(Source::ScriptedBrowser, Error::from(e).to_string());
            }
        };
        if !payload.found {
            return FetchResult::failure(Source::ScriptedBrowser, Error::ElementNotFound.to_string());
        }
        FetchResult::success(Source::ScriptedBrowser, payload.token, payload.svg)
    }

    fn clear_session(&mut self) {
        self.drain();
        if let Err(e) = self.sessions.clear_host(PORTAL_HOST) {
            loge!("browser portal: could not clear session: {e}");
        }
    }
}

/// Completion value of the extraction script.
#[derive(Debug, Deserialize)]
struct ExtractPayload {
    found: bool,
    token: Option<String>,
    svg: Option<String>,
}

// Injected scripts. Placeholders are substituted with `replace`, not
// `format!`, because the JS bodies are full of braces.

const LOGIN_SCRIPT: &str = r#"(function () {
  var tries = 0;
  var timer = setInterval(function () {
    var user = document.querySelector(
      'input[type="email"], input[name*="email" i], input[placeholder*="Email" i]');
    var pass = document.querySelector('input[type="password"]');
    if (user && pass) {
      clearInterval(timer);
      user.value = '%USER%';
      pass.value = '%PASS%';
      var btn = document.querySelector(
        '#LoginButton, button[type="submit"], input[type="submit"]');
      if (btn) { btn.click(); }
      else if (user.form) { user.form.submit(); }
      else { document.forms[0] && document.forms[0].submit(); }
    } else if (++tries > 20) {
      clearInterval(timer);
    }
  }, 250);
})();"#;

const EXTRACT_SCRIPT: &str = r#"(function () {
  var best = null, bestRects = 0;
  var svgs = document.querySelectorAll('svg');
  for (var i = 0; i < svgs.length; i++) {
    var rects = svgs[i].querySelectorAll('rect').length;
    if (rects > bestRects) { bestRects = rects; best = svgs[i]; }
  }
  var token = null;
  var re = new RegExp('%FACILITY%\\d{14}');
  var scripts = document.querySelectorAll('script');
  for (var j = 0; j < scripts.length; j++) {
    var m = re.exec(scripts[j].textContent || '');
    if (m) { token = m[0]; break; }
  }
  if (!best || bestRects < %MIN_RECTS%) {
    return JSON.stringify({ found: false, token: token, svg: null });
  }
  return JSON.stringify({ found: true, token: token, svg: best.outerHTML });
})()"#;

fn login_script(creds: &Credentials) -> String {
    LOGIN_SCRIPT
        .replace("%USER%", &js_quote(&creds.username))
        .replace("%PASS%", &js_quote(&creds.password))
}

fn extract_script() -> String {
    EXTRACT_SCRIPT
        .replace("%FACILITY%", FACILITY_CODE)
        .replace("%MIN_RECTS%", &QR_MIN_RECTS.to_string())
}

/// Escape a value for a single-quoted JS string literal.
fn js_quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            _ => out.push(ch),
        }
    }
    out
}
