// tests/cache_ttl.rs
use std::fs;
use std::path::PathBuf;

use chrono::{Duration, Utc};

use riseqr::cache::ResultCache;
use riseqr::store::KvStore;
use riseqr::types::{FetchResult, Source};

fn tmp_store(name: &str) -> KvStore {
    let mut p = std::env::temp_dir();
    p.push(format!("riseqr_cache_{}", name));
    let _ = fs::remove_dir_all(&p);
    fs::create_dir_all(&p).unwrap();
    KvStore::open(p)
}

fn result_aged(mins: i64) -> FetchResult {
    let mut r = FetchResult::success(
        Source::HeadlessHttp,
        Some("926806182025180000".into()),
        Some("<svg></svg>".into()),
    );
    r.produced_at = Utc::now() - Duration::minutes(mins);
    r
}

#[test]
fn fresh_entry_is_returned_as_cached() {
    let cache = ResultCache::new(tmp_store("fresh"));
    cache.put("qr", &result_aged(0)).unwrap();

    let hit = cache.get("qr").expect("fresh entry");
    assert!(hit.succeeded);
    assert_eq!(hit.source, Source::Cached);
    assert_eq!(hit.token.as_deref(), Some("926806182025180000"));
    assert_eq!(hit.graphic.as_deref(), Some("<svg></svg>"));
}

#[test]
fn entry_inside_window_survives_outside_does_not() {
    let cache = ResultCache::new(tmp_store("window"));

    // Written 29 minutes ago: still valid at the 30-minute window.
    cache.put("qr", &result_aged(29)).unwrap();
    assert!(cache.get("qr").is_some());

    // Written 31 minutes ago: treated as absent.
    cache.put("qr", &result_aged(31)).unwrap();
    assert!(cache.get("qr").is_none());
}

#[test]
fn stale_read_leaves_the_entry_in_place() {
    let cache = ResultCache::new(tmp_store("purge"));
    cache.put("qr", &result_aged(31)).unwrap();
    assert!(cache.get("qr").is_none());
    // Purging is the caller's decision; a stale get must not delete.
    let fresh_read = cache.get_at("qr", Utc::now() - Duration::minutes(10));
    assert!(fresh_read.is_some());
}

#[test]
fn put_overwrites_previous_entry() {
    let cache = ResultCache::new(tmp_store("overwrite"));
    cache.put("qr", &result_aged(0)).unwrap();

    let mut newer = result_aged(0);
    newer.token = Some("926806182025200000".into());
    cache.put("qr", &newer).unwrap();

    let hit = cache.get("qr").unwrap();
    assert_eq!(hit.token.as_deref(), Some("926806182025200000"));
}

#[test]
fn clear_drops_all_entries() {
    let cache = ResultCache::new(tmp_store("clear"));
    cache.put("a", &result_aged(0)).unwrap();
    cache.put("b", &result_aged(0)).unwrap();
    cache.clear().unwrap();
    assert!(cache.get("a").is_none());
    assert!(cache.get("b").is_none());
}

#[test]
fn corrupt_blob_reads_as_absent() {
    let kv = tmp_store("corrupt");
    let cache = ResultCache::new(kv.clone());
    cache.put("qr", &result_aged(0)).unwrap();

    // Stomp the underlying file.
    let path: PathBuf = kv.root().join("cache.qr");
    fs::write(path, "{not json").unwrap();
    assert!(cache.get("qr").is_none());
}
