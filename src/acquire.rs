// src/acquire.rs
//
// Strategy chain: predicted → cached → headless-http →
// scripted-browser → local helper. Strictly ordered, first success
// wins, every failure logged with its reason. Callers get either the
// first success or one aggregate failure; per-strategy detail lives
// in the log only.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Receiver;

use chrono::{Local, Timelike};

use crate::cache::ResultCache;
use crate::config::consts::CACHE_KEY;
use crate::config::options::AcquireOptions;
use crate::errors::Error;
use crate::helper::LocalHelper;
use crate::portal::{BrowserPortal, BrowserSurface, HttpPortal, PageEvent, PortalClient};
use crate::session::SessionStore;
use crate::store::KvStore;
use crate::token::TokenCodec;
use crate::types::{Credentials, FetchResult, Source};

/// One acquisition method in the ordered fallback list.
pub trait Strategy {
    fn name(&self) -> &'static str;
    fn attempt(&mut self) -> FetchResult;
}

/// Cooperative cancellation: checked between strategies and before
/// any cache write, so an abandoned fetch never persists state.
#[derive(Clone, Debug, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

/// Runs strategies in order; the first `succeeded` result terminates
/// the chain. All-fail collapses into a single aggregate failure.
pub fn run_chain(strategies: &mut [Box<dyn Strategy + '_>], cancel: &CancelToken) -> FetchResult {
    for strategy in strategies.iter_mut() {
        if cancel.is_cancelled() {
            logd!("acquire: cancelled before {}", strategy.name());
            return FetchResult::failure(Source::Unknown, "fetch cancelled");
        }
        logd!("acquire: trying {}", strategy.name());
        let result = strategy.attempt();
        if result.succeeded {
            logf!("acquire: {} succeeded", strategy.name());
            return result;
        }
        loge!("acquire: {} failed: {}", strategy.name(), result.reason());
    }
    FetchResult::failure(Source::Unknown, Error::AllStrategiesFailed.to_string())
}

/* ---------------- Strategies ---------------- */

struct Predicted<'a> {
    codec: &'a TokenCodec,
}

impl Strategy for Predicted<'_> {
    fn name(&self) -> &'static str {
        "predicted"
    }

    fn attempt(&mut self) -> FetchResult {
        let now = Local::now();
        let token = self.codec.encode(now.date_naive(), now.hour());
        FetchResult::success(Source::Predicted, Some(token.render()), None)
    }
}

struct CacheLookup {
    cache: ResultCache,
}

impl Strategy for CacheLookup {
    fn name(&self) -> &'static str {
        "cached"
    }

    fn attempt(&mut self) -> FetchResult {
        self.cache
            .get(CACHE_KEY)
            .unwrap_or_else(|| FetchResult::failure(Source::Cached, "no fresh cached result"))
    }
}

/// Shared flow for both portal clients: make sure the session is
/// live, log in when it isn't, then pull the token.
struct PortalStrategy<'a> {
    client: &'a mut dyn PortalClient,
    creds: Credentials,
    source: Source,
    name: &'static str,
}

impl Strategy for PortalStrategy<'_> {
    fn name(&self) -> &'static str {
        self.name
    }

    fn attempt(&mut self) -> FetchResult {
        if !self.client.is_session_valid() {
            match self.client.login(&self.creds) {
                Ok(true) => {}
                Ok(false) => {
                    return FetchResult::failure(self.source, Error::LoginFailed.to_string());
                }
                Err(e) => return FetchResult::failure(self.source, e.to_string()),
            }
        }
        self.client.fetch_token()
    }
}

struct HelperStrategy {
    helper: LocalHelper,
}

impl Strategy for HelperStrategy {
    fn name(&self) -> &'static str {
        "local-helper"
    }

    fn attempt(&mut self) -> FetchResult {
        self.helper.fetch()
    }
}

/* ---------------- Caller-facing surface ---------------- */

pub struct Acquirer {
    codec: TokenCodec,
    cache: ResultCache,
    sessions: SessionStore,
    credentials: Option<Credentials>,
    helper_url: Option<String>,
    http: Option<HttpPortal>,
    browser: Option<BrowserPortal>,
}

impl Acquirer {
    pub fn new(options: AcquireOptions) -> Self {
        let kv = KvStore::open(options.store_root);
        Self {
            codec: TokenCodec::default(),
            cache: ResultCache::new(kv.clone()),
            sessions: SessionStore::new(kv),
            credentials: None,
            helper_url: options.helper_url,
            http: None,
            browser: None,
        }
    }

    pub fn with_codec(mut self, codec: TokenCodec) -> Self {
        self.codec = codec;
        self
    }

    /// Attach a scripted-browser surface. Without one, the
    /// scripted-browser strategy is simply skipped.
    pub fn with_browser(
        mut self,
        surface: Box<dyn BrowserSurface>,
        events: Receiver<PageEvent>,
    ) -> Self {
        self.browser = Some(BrowserPortal::new(surface, events, self.sessions.clone()));
        self
    }

    pub fn codec(&self) -> &TokenCodec {
        &self.codec
    }

    /// Held in memory only; cleared with [`Self::clear_all`].
    pub fn set_credentials(&mut self, username: impl Into<String>, password: impl Into<String>) {
        self.credentials = Some(Credentials::new(username, password));
    }

    pub fn has_credentials(&self) -> bool {
        self.credentials.is_some()
    }

    pub fn fetch_qr(&mut self) -> FetchResult {
        self.fetch_qr_with(&CancelToken::new())
    }

    pub fn fetch_qr_with(&mut self, cancel: &CancelToken) -> FetchResult {
        if self.credentials.is_some() && self.http.is_none() {
            match HttpPortal::new(self.sessions.clone()) {
                Ok(portal) => self.http = Some(portal),
                Err(e) => loge!("acquire: http portal unavailable: {e}"),
            }
        }

        let mut strategies: Vec<Box<dyn Strategy + '_>> = vec![
            Box::new(Predicted { codec: &self.codec }),
            Box::new(CacheLookup { cache: self.cache.clone() }),
        ];

        if let Some(creds) = self.credentials.clone() {
            if let Some(client) = self.http.as_mut() {
                strategies.push(Box::new(PortalStrategy {
                    client,
                    creds: creds.clone(),
                    source: Source::HeadlessHttp,
                    name: "headless-http",
                }));
            }
            if let Some(client) = self.browser.as_mut() {
                strategies.push(Box::new(PortalStrategy {
                    client,
                    creds,
                    source: Source::ScriptedBrowser,
                    name: "scripted-browser",
                }));
            }
        } else {
            logd!("acquire: no credentials, portal strategies skipped");
        }

        if let Some(url) = &self.helper_url {
            match LocalHelper::new(url.clone()) {
                Ok(helper) => strategies.push(Box::new(HelperStrategy { helper })),
                Err(e) => loge!("acquire: helper unavailable: {e}"),
            }
        }

        let result = run_chain(&mut strategies, cancel);
        drop(strategies);

        persist_success(&self.cache, &result, cancel);
        result
    }

    /// Explicit logout/reset: credentials, cache, persisted sessions,
    /// and client cookie state all go.
    pub fn clear_all(&mut self) {
        self.credentials = None;
        if let Err(e) = self.cache.clear() {
            loge!("acquire: cache clear failed: {e}");
        }
        if let Err(e) = self.sessions.clear() {
            loge!("acquire: session clear failed: {e}");
        }
        if let Some(client) = self.http.as_mut() {
            client.clear_session();
        }
        if let Some(client) = self.browser.as_mut() {
            client.clear_session();
        }
        logf!("acquire: cleared credentials, cache and sessions");
    }
}

/// Only fresh network-backed successes go to the cache, and never
/// after the caller has cancelled: a strategy that observed the
/// cancellation mid-attempt may have returned a result the caller
/// already walked away from.
fn persist_success(cache: &ResultCache, result: &FetchResult, cancel: &CancelToken) {
    if !result.succeeded || !result.source.cacheable() || cancel.is_cancelled() {
        return;
    }
    if let Err(e) = cache.put(CACHE_KEY, result) {
        loge!("acquire: cache write failed: {e}");
    }
}

#[cfg(test)]
mod tests {
    use super::{CancelToken, persist_success};
    use crate::cache::ResultCache;
    use crate::config::consts::CACHE_KEY;
    use crate::store::KvStore;
    use crate::types::{FetchResult, Source};

    fn tmp_cache(name: &str) -> ResultCache {
        let dir = std::env::temp_dir().join(format!("riseqr-acquire-{name}-{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        ResultCache::new(KvStore::open(dir))
    }

    #[test]
    fn network_success_is_persisted_while_uncancelled() {
        let cache = tmp_cache("plain");
        let result =
            FetchResult::success(Source::HeadlessHttp, Some(s!("926806182025180000")), None);
        persist_success(&cache, &result, &CancelToken::new());
        assert!(cache.get(CACHE_KEY).is_some());
    }

    #[test]
    fn cancellation_during_the_attempt_blocks_the_cache_write() {
        let cache = tmp_cache("cancelled");
        let result =
            FetchResult::success(Source::HeadlessHttp, Some(s!("926806182025180000")), None);
        let cancel = CancelToken::new();
        cancel.cancel();
        persist_success(&cache, &result, &cancel);
        assert!(cache.get(CACHE_KEY).is_none());
    }
}
