// src/cache.rs
//
// Most-recent-success cache with a fixed validity window. The window
// (30 min) is deliberately shorter than the 2-hour token rotation:
// slack against clock skew, not a bug.

use std::io;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::config::consts::CACHE_TTL_MINS;
use crate::store::KvStore;
use crate::types::{FetchResult, Source};

const CACHE_PREFIX: &str = "cache.";

#[derive(Serialize, Deserialize)]
struct CacheEntry {
    token: Option<String>,
    graphic: Option<String>,
    produced_at: DateTime<Utc>,
}

/// Clonable handle; clones share the same backing directory.
#[derive(Clone, Debug)]
pub struct ResultCache {
    kv: KvStore,
    window: Duration,
}

impl ResultCache {
    pub fn new(kv: KvStore) -> Self {
        Self { kv, window: Duration::minutes(CACHE_TTL_MINS) }
    }

    pub fn with_window(kv: KvStore, window: Duration) -> Self {
        Self { kv, window }
    }

    fn key(key: &str) -> String {
        format!("{CACHE_PREFIX}{key}")
    }

    /// A stored result, re-tagged as cached, iff it is still inside
    /// the validity window. Stale entries read as absent; purging is
    /// the caller's call.
    pub fn get(&self, key: &str) -> Option<FetchResult> {
        self.get_at(key, Utc::now())
    }

    pub fn get_at(&self, key: &str, now: DateTime<Utc>) -> Option<FetchResult> {
        let blob = self.kv.get(&Self::key(key))?;
        let entry: CacheEntry = match serde_json::from_str(&blob) {
            Ok(e) => e,
            Err(e) => {
                loge!("cache: corrupt entry {key}: {e}");
                return None;
            }
        };
        if now - entry.produced_at > self.window {
            return None;
        }
        Some(FetchResult {
            succeeded: true,
            token: entry.token,
            graphic: entry.graphic,
            error_reason: None,
            source: Source::Cached,
            produced_at: entry.produced_at,
        })
    }

    /// Unconditional overwrite. Callers only pass successful results
    /// whose source is not itself the cache.
    pub fn put(&self, key: &str, result: &FetchResult) -> io::Result<()> {
        let entry = CacheEntry {
            token: result.token.clone(),
            graphic: result.graphic.clone(),
            produced_at: result.produced_at,
        };
        let blob = serde_json::to_string(&entry)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        self.kv.put(&Self::key(key), &blob)
    }

    /// Drops all cached results (explicit logout/reset path).
    pub fn clear(&self) -> io::Result<()> {
        self.kv.clear_prefix(CACHE_PREFIX)
    }
}
