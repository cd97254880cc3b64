// src/portal/http.rs
//
// Headless-HTTP client: plain form submission against the ASP.NET
// login page, then a dashboard GET and markup scan. No script engine,
// so it fails cleanly if the portal ever gates the QR behind one.

use std::sync::OnceLock;

use regex::Regex;

use crate::config::consts::{
    DASHBOARD_URL, EVENT_VALIDATION_FIELD, FACILITY_CODE, LOGIN_URL, PASSWORD_FIELD,
    PORTAL_HOST, QR_ELEMENT_ID, QR_MIN_RECTS, USERNAME_FIELD, VIEWSTATE_FIELD,
    VIEWSTATE_GENERATOR_FIELD,
};
use crate::core::{html, net::HttpSession};
use crate::errors::Error;
use crate::session::SessionStore;
use crate::types::{Credentials, FetchResult, Source};

use super::{PortalClient, is_dashboard_url, is_login_url};

fn token_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        // Facility prefix followed by exactly 14 digits (date + time).
        Regex::new(&format!(r"{FACILITY_CODE}\d{{14}}")).expect("static token regex")
    })
}

pub struct HttpPortal {
    net: HttpSession,
    sessions: SessionStore,
}

impl HttpPortal {
    pub fn new(sessions: SessionStore) -> Result<Self, Error> {
        Ok(Self { net: HttpSession::new(sessions.clone())?, sessions })
    }
}

impl PortalClient for HttpPortal {
    fn login(&mut self, creds: &Credentials) -> Result<bool, Error> {
        let page = self.net.get(LOGIN_URL)?;

        let mut form: Vec<(&str, String)> = Vec::with_capacity(5);
        for field in [VIEWSTATE_FIELD, VIEWSTATE_GENERATOR_FIELD, EVENT_VALIDATION_FIELD] {
            let value = html::input_value(&page.body, field)
                .ok_or_else(|| Error::Parse(format!("login page missing {field}")))?;
            form.push((field, value));
        }
        form.push((USERNAME_FIELD, creds.username.clone()));
        form.push((PASSWORD_FIELD, creds.password.clone()));

        let landed = self.net.post_form(LOGIN_URL, &form)?;
        let ok = is_dashboard_url(landed.final_url.as_str());
        if ok {
            logf!("http portal: login ok for {}", creds.username);
        } else {
            logd!("http portal: login landed on {}", landed.final_url);
        }
        Ok(ok)
    }

    fn is_session_valid(&mut self) -> bool {
        match self.net.get(DASHBOARD_URL) {
            Ok(page) => is_dashboard_url(page.final_url.as_str()),
            Err(e) => {
                logd!("http portal: session check failed: {e}");
                false
            }
        }
    }

    fn fetch_token(&mut self) -> FetchResult {
        let page = match self.net.get(DASHBOARD_URL) {
            Ok(p) => p,
            Err(e) => return FetchResult::failure(Source::HeadlessHttp, e.to_string()),
        };
        if is_login_url(page.final_url.as_str()) {
            return FetchResult::failure(Source::HeadlessHttp, Error::SessionExpired.to_string());
        }

        let graphic = extract_qr_svg(&page.body);
        let token = extract_token_text(&page.body);
        if graphic.is_none() && token.is_none() {
            return FetchResult::failure(Source::HeadlessHttp, Error::ElementNotFound.to_string());
        }
        FetchResult::success(Source::HeadlessHttp, token, graphic)
    }

    fn clear_session(&mut self) {
        if let Err(e) = self.sessions.clear_host(PORTAL_HOST) {
            loge!("http portal: could not clear session: {e}");
        }
    }
}

/// Verbatim SVG of the QR element: the fixed container id first, then
/// the rect-count heuristic over every SVG on the page.
pub fn extract_qr_svg(body: &str) -> Option<String> {
    if let Some(svg) = html::svg_block_near_id(body, QR_ELEMENT_ID) {
        if html::count_rects(svg) >= QR_MIN_RECTS {
            return Some(s!(svg));
        }
    }

    let mut best: Option<&str> = None;
    let mut best_rects = 0;
    let mut pos = 0;
    while let Some((start, end)) = html::next_tag_block_ci(body, "<svg", "</svg>", pos) {
        let svg = &body[start..end];
        let rects = html::count_rects(svg);
        if rects > best_rects {
            best_rects = rects;
            best = Some(svg);
        }
        pos = end;
    }
    if best_rects >= QR_MIN_RECTS { best.map(|s| s!(s)) } else { None }
}

/// Textual token from inline scripts first (where the portal embeds
/// it), then the whole document.
pub fn extract_token_text(body: &str) -> Option<String> {
    let re = token_re();
    let mut pos = 0;
    while let Some((start, end)) = html::next_tag_block_ci(body, "<script", "</script>", pos) {
        if let Some(m) = re.find(&body[start..end]) {
            return Some(s!(m.as_str()));
        }
        pos = end;
    }
    re.find(body).map(|m| s!(m.as_str()))
}
