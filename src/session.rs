// src/session.rs
//
// Persisted per-host cookie state. Survives process restarts so the
// portal does not have to be logged into on every fetch.

use std::io;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::store::KvStore;

const SESSION_PREFIX: &str = "session.";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionCookie {
    pub name: String,
    pub value: String,
    pub domain: String,
    pub path: String,
    pub expires: Option<DateTime<Utc>>,
    pub secure: bool,
    pub http_only: bool,
}

impl SessionCookie {
    /// Parse one `Set-Cookie` header value. Returns None for headers
    /// without a `name=value` pair. Max-Age wins over Expires.
    pub fn parse_set_cookie(raw: &str, default_domain: &str) -> Option<Self> {
        let mut parts = raw.split(';');
        let first = parts.next()?.trim();
        let (name, value) = first.split_once('=')?;
        let name = name.trim();
        if name.is_empty() {
            return None;
        }

        let mut cookie = SessionCookie {
            name: s!(name),
            value: s!(value.trim()),
            domain: s!(default_domain),
            path: s!("/"),
            expires: None,
            secure: false,
            http_only: false,
        };

        let mut max_age: Option<i64> = None;
        for attr in parts {
            let attr = attr.trim();
            match attr.split_once('=') {
                Some((k, v)) => match k.trim().to_ascii_lowercase().as_str() {
                    "domain" => cookie.domain = s!(v.trim().trim_start_matches('.')),
                    "path" => cookie.path = s!(v.trim()),
                    "max-age" => max_age = v.trim().parse().ok(),
                    "expires" => {
                        cookie.expires = DateTime::parse_from_rfc2822(v.trim())
                            .ok()
                            .map(|t| t.with_timezone(&Utc));
                    }
                    _ => {}
                },
                None => match attr.to_ascii_lowercase().as_str() {
                    "secure" => cookie.secure = true,
                    "httponly" => cookie.http_only = true,
                    _ => {}
                },
            }
        }
        if let Some(secs) = max_age {
            cookie.expires = Some(Utc::now() + Duration::seconds(secs));
        }
        Some(cookie)
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        matches!(self.expires, Some(t) if t <= now)
    }
}

/// On-disk record: cookie blob plus issue time. Cookies are kept as
/// raw JSON values so one malformed record doesn't sink the rest.
#[derive(Serialize, Deserialize)]
struct SessionRecord {
    issued_at: DateTime<Utc>,
    cookies: Vec<serde_json::Value>,
}

/// Clonable handle; clones share the same backing directory.
#[derive(Clone, Debug)]
pub struct SessionStore {
    kv: KvStore,
}

impl SessionStore {
    pub fn new(kv: KvStore) -> Self {
        Self { kv }
    }

    fn key(host: &str) -> String {
        format!("{SESSION_PREFIX}{host}")
    }

    /// Overwrites any prior session for `host`.
    pub fn save(&self, host: &str, cookies: &[SessionCookie]) -> io::Result<()> {
        let record = SessionRecord {
            issued_at: Utc::now(),
            cookies: cookies
                .iter()
                .filter_map(|c| serde_json::to_value(c).ok())
                .collect(),
        };
        let blob = serde_json::to_string(&record)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        self.kv.put(&Self::key(host), &blob)
    }

    /// Empty set if nothing is persisted or the record is corrupt.
    /// A single bad cookie inside a valid record is skipped, not
    /// fatal.
    pub fn load(&self, host: &str) -> Vec<SessionCookie> {
        let Some(blob) = self.kv.get(&Self::key(host)) else {
            return Vec::new();
        };
        let Ok(record) = serde_json::from_str::<SessionRecord>(&blob) else {
            loge!("session: corrupt record for {host}, treating as empty");
            return Vec::new();
        };
        let mut out = Vec::with_capacity(record.cookies.len());
        for value in record.cookies {
            match serde_json::from_value::<SessionCookie>(value) {
                Ok(c) => out.push(c),
                Err(e) => logd!("session: skipping malformed cookie for {host}: {e}"),
            }
        }
        out
    }

    /// `Cookie:` header value for `host`, from unexpired cookies.
    pub fn cookie_header(&self, host: &str, now: DateTime<Utc>) -> Option<String> {
        let live: Vec<String> = self
            .load(host)
            .into_iter()
            .filter(|c| !c.is_expired(now))
            .map(|c| format!("{}={}", c.name, c.value))
            .collect();
        if live.is_empty() { None } else { Some(live.join("; ")) }
    }

    /// Merge freshly received cookies into the host's set (replace by
    /// name, keep the rest).
    pub fn absorb(&self, host: &str, fresh: &[SessionCookie]) -> io::Result<()> {
        if fresh.is_empty() {
            return Ok(());
        }
        let mut set = self.load(host);
        for cookie in fresh {
            set.retain(|c| c.name != cookie.name);
            set.push(cookie.clone());
        }
        self.save(host, &set)
    }

    pub fn clear_host(&self, host: &str) -> io::Result<()> {
        self.kv.remove(&Self::key(host))
    }

    /// Removes persisted sessions for all hosts.
    pub fn clear(&self) -> io::Result<()> {
        self.kv.clear_prefix(SESSION_PREFIX)
    }
}
