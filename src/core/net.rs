// src/core/net.rs
//
// Blocking HTTP with manual redirect-following: the portal signals
// login success purely through where it redirects to, and ASP.NET
// hands out session cookies mid-chain, so every hop must stay
// observable.

use std::time::Duration;

use reqwest::Method;
use reqwest::blocking::Client;
use reqwest::header::{COOKIE, LOCATION, SET_COOKIE, USER_AGENT};

use crate::config::consts::{self, HTTP_TIMEOUT_SECS, MAX_REDIRECTS};
use crate::errors::Error;
use crate::session::{SessionCookie, SessionStore};

pub struct PageResponse {
    pub final_url: reqwest::Url,
    pub body: String,
}

pub struct HttpSession {
    client: Client,
    sessions: SessionStore,
}

impl HttpSession {
    pub fn new(sessions: SessionStore) -> Result<Self, Error> {
        let client = Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .timeout(Duration::from_secs(HTTP_TIMEOUT_SECS))
            .build()?;
        Ok(Self { client, sessions })
    }

    pub fn get(&self, url: &str) -> Result<PageResponse, Error> {
        self.execute(Method::GET, url, None)
    }

    pub fn post_form(&self, url: &str, form: &[(&str, String)]) -> Result<PageResponse, Error> {
        self.execute(Method::POST, url, Some(form))
    }

    fn execute(
        &self,
        method: Method,
        url: &str,
        form: Option<&[(&str, String)]>,
    ) -> Result<PageResponse, Error> {
        let mut url = reqwest::Url::parse(url).map_err(|e| Error::Network(e.to_string()))?;
        let mut method = method;
        let mut form = form;

        for _ in 0..=MAX_REDIRECTS {
            let host = s!(url.host_str().unwrap_or_default());

            let mut req = self
                .client
                .request(method.clone(), url.clone())
                .header(USER_AGENT, consts::USER_AGENT);
            if let Some(cookies) = self.sessions.cookie_header(&host, chrono::Utc::now()) {
                req = req.header(COOKIE, cookies);
            }
            if let Some(fields) = form {
                req = req.form(fields);
            }

            let resp = req.send()?;
            self.capture_cookies(&host, resp.headers());

            let status = resp.status();
            if status.is_redirection() {
                let location = resp
                    .headers()
                    .get(LOCATION)
                    .and_then(|v| v.to_str().ok())
                    .ok_or_else(|| Error::Network(s!("redirect without Location")))?;
                url = url.join(location).map_err(|e| Error::Network(e.to_string()))?;
                // Post-redirect requests are plain GETs.
                method = Method::GET;
                form = None;
                continue;
            }

            let body = resp.text()?;
            if !status.is_success() {
                return Err(Error::Network(format!("HTTP error: {status} {url}")));
            }
            return Ok(PageResponse { final_url: url, body });
        }
        Err(Error::Network(format!("too many redirects for {url}")))
    }

    fn capture_cookies(&self, host: &str, headers: &reqwest::header::HeaderMap) {
        let fresh: Vec<SessionCookie> = headers
            .get_all(SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .filter_map(|raw| SessionCookie::parse_set_cookie(raw, host))
            .collect();
        if let Err(e) = self.sessions.absorb(host, &fresh) {
            loge!("net: could not persist cookies for {host}: {e}");
        }
    }
}
