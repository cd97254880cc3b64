// tests/session_store.rs
use std::fs;

use chrono::{Duration, Utc};

use riseqr::session::{SessionCookie, SessionStore};
use riseqr::store::KvStore;

fn tmp_store(name: &str) -> KvStore {
    let mut p = std::env::temp_dir();
    p.push(format!("riseqr_session_{}", name));
    let _ = fs::remove_dir_all(&p);
    fs::create_dir_all(&p).unwrap();
    KvStore::open(p)
}

fn cookie(name: &str, value: &str) -> SessionCookie {
    SessionCookie {
        name: name.into(),
        value: value.into(),
        domain: "risegyms.ez-runner.com".into(),
        path: "/".into(),
        expires: None,
        secure: true,
        http_only: true,
    }
}

#[test]
fn save_then_load_round_trips() {
    let store = SessionStore::new(tmp_store("roundtrip"));
    let cookies = vec![cookie("ASP.NET_SessionId", "abc123"), cookie("auth", "tok")];
    store.save("risegyms.ez-runner.com", &cookies).unwrap();

    let loaded = store.load("risegyms.ez-runner.com");
    assert_eq!(loaded, cookies);
    // Unknown host reads as empty, never errors.
    assert!(store.load("other.example").is_empty());
}

#[test]
fn save_overwrites_prior_entry_for_host() {
    let store = SessionStore::new(tmp_store("overwrite"));
    store.save("h", &[cookie("a", "1")]).unwrap();
    store.save("h", &[cookie("b", "2")]).unwrap();
    let loaded = store.load("h");
    assert_eq!(loaded.len(), 1);
    assert_eq!(loaded[0].name, "b");
}

#[test]
fn corrupt_record_fails_open_to_empty() {
    let kv = tmp_store("corrupt");
    let store = SessionStore::new(kv.clone());
    kv.put("session.h", "definitely not json").unwrap();
    assert!(store.load("h").is_empty());
}

#[test]
fn one_malformed_cookie_does_not_sink_the_rest() {
    let kv = tmp_store("partial");
    let store = SessionStore::new(kv.clone());
    // Hand-written record: a valid cookie, a junk entry, another
    // valid cookie.
    let blob = format!(
        r#"{{"issued_at":"{}","cookies":[
            {{"name":"good1","value":"v1","domain":"h","path":"/","expires":null,"secure":false,"http_only":false}},
            {{"bogus":42}},
            {{"name":"good2","value":"v2","domain":"h","path":"/","expires":null,"secure":true,"http_only":true}}
        ]}}"#,
        Utc::now().to_rfc3339()
    );
    kv.put("session.h", &blob).unwrap();

    let loaded = store.load("h");
    let names: Vec<&str> = loaded.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, ["good1", "good2"]);
}

#[test]
fn cookie_header_skips_expired_cookies() {
    let store = SessionStore::new(tmp_store("expiry"));
    let mut stale = cookie("old", "x");
    stale.expires = Some(Utc::now() - Duration::hours(1));
    let mut live = cookie("live", "y");
    live.expires = Some(Utc::now() + Duration::hours(1));
    store.save("h", &[stale, live, cookie("forever", "z")]).unwrap();

    let header = store.cookie_header("h", Utc::now()).unwrap();
    assert!(!header.contains("old=x"));
    assert!(header.contains("live=y"));
    assert!(header.contains("forever=z"));

    // All expired → no header at all.
    let mut gone = cookie("gone", "g");
    gone.expires = Some(Utc::now() - Duration::minutes(1));
    store.save("h2", &[gone]).unwrap();
    assert!(store.cookie_header("h2", Utc::now()).is_none());
}

#[test]
fn absorb_replaces_by_name_and_keeps_the_rest() {
    let store = SessionStore::new(tmp_store("absorb"));
    store.save("h", &[cookie("sid", "old"), cookie("keep", "k")]).unwrap();
    store.absorb("h", &[cookie("sid", "new")]).unwrap();

    let loaded = store.load("h");
    assert_eq!(loaded.len(), 2);
    let sid = loaded.iter().find(|c| c.name == "sid").unwrap();
    assert_eq!(sid.value, "new");
}

#[test]
fn clear_removes_all_hosts() {
    let store = SessionStore::new(tmp_store("clear"));
    store.save("h1", &[cookie("a", "1")]).unwrap();
    store.save("h2", &[cookie("b", "2")]).unwrap();
    store.clear().unwrap();
    assert!(store.load("h1").is_empty());
    assert!(store.load("h2").is_empty());
}

#[test]
fn set_cookie_parsing_covers_attributes() {
    let c = SessionCookie::parse_set_cookie(
        "ASP.NET_SessionId=abc123; Path=/app; Domain=.ez-runner.com; Secure; HttpOnly",
        "risegyms.ez-runner.com",
    )
    .unwrap();
    assert_eq!(c.name, "ASP.NET_SessionId");
    assert_eq!(c.value, "abc123");
    assert_eq!(c.path, "/app");
    assert_eq!(c.domain, "ez-runner.com");
    assert!(c.secure);
    assert!(c.http_only);
    assert!(c.expires.is_none());

    // Max-Age wins over Expires.
    let c = SessionCookie::parse_set_cookie(
        "a=b; Expires=Wed, 21 Oct 2015 07:28:00 GMT; Max-Age=3600",
        "h",
    )
    .unwrap();
    let expires = c.expires.unwrap();
    assert!(expires > Utc::now() + Duration::minutes(55));

    // Expires alone parses the RFC date.
    let c = SessionCookie::parse_set_cookie("a=b; Expires=Wed, 21 Oct 2015 07:28:00 GMT", "h")
        .unwrap();
    assert!(c.is_expired(Utc::now()));

    // No name=value pair → not a cookie.
    assert!(SessionCookie::parse_set_cookie("garbage", "h").is_none());
}
