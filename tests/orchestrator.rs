// tests/orchestrator.rs
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use riseqr::acquire::{Acquirer, CancelToken, Strategy, run_chain};
use riseqr::s;
use riseqr::cache::ResultCache;
use riseqr::config::options::AcquireOptions;
use riseqr::errors::Error;
use riseqr::store::KvStore;
use riseqr::types::{FetchResult, Source};

fn tmp_root(name: &str) -> PathBuf {
    let mut p = std::env::temp_dir();
    p.push(format!("riseqr_acquire_{}", name));
    let _ = fs::remove_dir_all(&p);
    fs::create_dir_all(&p).unwrap();
    p
}

/// Scripted fake: fails or succeeds on demand, counts invocations.
struct Scripted {
    name: &'static str,
    succeed: bool,
    calls: Arc<AtomicUsize>,
}

impl Scripted {
    fn new(name: &'static str, succeed: bool) -> (Self, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        (Self { name, succeed, calls: calls.clone() }, calls)
    }
}

impl Strategy for Scripted {
    fn name(&self) -> &'static str {
        self.name
    }

    fn attempt(&mut self) -> FetchResult {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.succeed {
            FetchResult::success(Source::HeadlessHttp, Some(s!("926806182025180000")), None)
        } else {
            FetchResult::failure(Source::HeadlessHttp, format!("{} says no", self.name))
        }
    }
}

#[test]
fn first_success_short_circuits_the_chain() {
    let (a, a_calls) = Scripted::new("first", false);
    let (b, b_calls) = Scripted::new("second", false);
    let (c, c_calls) = Scripted::new("third", true);
    let (d, d_calls) = Scripted::new("never", true);

    let mut chain: Vec<Box<dyn Strategy>> =
        vec![Box::new(a), Box::new(b), Box::new(c), Box::new(d)];
    let result = run_chain(&mut chain, &CancelToken::new());

    assert!(result.succeeded);
    assert_eq!(result.source, Source::HeadlessHttp);
    assert_eq!(result.token.as_deref(), Some("926806182025180000"));
    assert_eq!(a_calls.load(Ordering::SeqCst), 1);
    assert_eq!(b_calls.load(Ordering::SeqCst), 1);
    assert_eq!(c_calls.load(Ordering::SeqCst), 1);
    // Fourth strategy is never invoked.
    assert_eq!(d_calls.load(Ordering::SeqCst), 0);
}

#[test]
fn all_failures_collapse_into_one_aggregate_result() {
    let (a, _) = Scripted::new("a", false);
    let (b, _) = Scripted::new("b", false);
    let (c, _) = Scripted::new("c", false);

    let mut chain: Vec<Box<dyn Strategy>> = vec![Box::new(a), Box::new(b), Box::new(c)];
    let result = run_chain(&mut chain, &CancelToken::new());

    assert!(!result.succeeded);
    assert_eq!(result.source, Source::Unknown);
    // The aggregate reason is the taxonomy's, not an ad-hoc string.
    assert_eq!(result.reason(), Error::AllStrategiesFailed.to_string());
    assert_eq!(result.reason(), "all methods failed");
}

#[test]
fn empty_chain_is_an_aggregate_failure() {
    let mut chain: Vec<Box<dyn Strategy>> = Vec::new();
    let result = run_chain(&mut chain, &CancelToken::new());
    assert!(!result.succeeded);
    assert_eq!(result.source, Source::Unknown);
}

#[test]
fn cancelled_token_stops_the_chain_before_any_strategy() {
    let (a, a_calls) = Scripted::new("a", true);
    let cancel = CancelToken::new();
    cancel.cancel();

    let mut chain: Vec<Box<dyn Strategy>> = vec![Box::new(a)];
    let result = run_chain(&mut chain, &cancel);

    assert!(!result.succeeded);
    assert_eq!(a_calls.load(Ordering::SeqCst), 0);
    assert_eq!(result.reason(), "fetch cancelled");
}

/// Cancels the shared token from inside its own attempt, the way a
/// caller teardown lands mid-fetch.
struct CancelsItself {
    cancel: CancelToken,
    calls: Arc<AtomicUsize>,
}

impl Strategy for CancelsItself {
    fn name(&self) -> &'static str {
        "cancels-itself"
    }

    fn attempt(&mut self) -> FetchResult {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.cancel.cancel();
        FetchResult::failure(Source::HeadlessHttp, "interrupted")
    }
}

#[test]
fn cancellation_during_an_attempt_stops_the_rest_of_the_chain() {
    let cancel = CancelToken::new();
    let a_calls = Arc::new(AtomicUsize::new(0));
    let a = CancelsItself { cancel: cancel.clone(), calls: a_calls.clone() };
    let (b, b_calls) = Scripted::new("after", true);

    let mut chain: Vec<Box<dyn Strategy>> = vec![Box::new(a), Box::new(b)];
    let result = run_chain(&mut chain, &cancel);

    assert!(!result.succeeded);
    assert_eq!(result.reason(), "fetch cancelled");
    assert_eq!(a_calls.load(Ordering::SeqCst), 1);
    // The would-be success after the cancellation never runs.
    assert_eq!(b_calls.load(Ordering::SeqCst), 0);
}

#[test]
fn acquirer_without_credentials_predicts_locally() {
    let mut acquirer = Acquirer::new(AcquireOptions {
        store_root: tmp_root("predict"),
        helper_url: None,
    });

    let result = acquirer.fetch_qr();
    assert!(result.succeeded);
    assert_eq!(result.source, Source::Predicted);

    // The predicted token is a valid, decodable current-block token.
    let raw = result.token.expect("predicted token");
    let tok = acquirer.codec().decode(&raw).unwrap();
    assert_eq!(tok.block_hour % 2, 0);
    // Prediction carries no graphic; rendering happens elsewhere.
    assert!(result.graphic.is_none());
}

#[test]
fn predicted_results_are_not_written_to_the_cache() {
    let root = tmp_root("nocache");
    let mut acquirer = Acquirer::new(AcquireOptions {
        store_root: root.clone(),
        helper_url: None,
    });
    let result = acquirer.fetch_qr();
    assert_eq!(result.source, Source::Predicted);

    let cache = ResultCache::new(KvStore::open(root));
    assert!(cache.get("qr_latest").is_none());
}

#[test]
fn clear_all_drops_cached_results_and_sessions() {
    let root = tmp_root("clear");
    let kv = KvStore::open(root.clone());
    let cache = ResultCache::new(kv.clone());
    cache
        .put(
            "qr_latest",
            &FetchResult::success(Source::HeadlessHttp, Some(s!("926806182025180000")), None),
        )
        .unwrap();
    kv.put("session.risegyms.ez-runner.com", r#"{"issued_at":"2025-06-18T18:00:00Z","cookies":[]}"#)
        .unwrap();

    let mut acquirer = Acquirer::new(AcquireOptions { store_root: root, helper_url: None });
    acquirer.clear_all();

    assert!(cache.get("qr_latest").is_none());
    assert!(kv.get("session.risegyms.ez-runner.com").is_none());
}

#[test]
fn clear_all_forgets_credentials() {
    let mut acquirer = Acquirer::new(AcquireOptions {
        store_root: tmp_root("creds"),
        helper_url: None,
    });
    acquirer.set_credentials("user@example.com", "hunter2");
    assert!(acquirer.has_credentials());

    acquirer.clear_all();
    assert!(!acquirer.has_credentials());
}
