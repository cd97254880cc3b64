// src/config/consts.rs

// Portal
pub const PORTAL_HOST: &str = "risegyms.ez-runner.com";
pub const LOGIN_URL: &str = "https://risegyms.ez-runner.com/Login.aspx";
pub const DASHBOARD_URL: &str = "https://risegyms.ez-runner.com/BookingPortal.aspx";

// ASP.NET anti-forgery fields, round-tripped from the login page
// into the login POST.
pub const VIEWSTATE_FIELD: &str = "__VIEWSTATE";
pub const VIEWSTATE_GENERATOR_FIELD: &str = "__VIEWSTATEGENERATOR";
pub const EVENT_VALIDATION_FIELD: &str = "__EVENTVALIDATION";
pub const USERNAME_FIELD: &str = "username";
pub const PASSWORD_FIELD: &str = "password";

// Token pattern
pub const FACILITY_CODE: &str = "9268";
pub const TOKEN_LEN: usize = 18;
pub const BLOCK_HOURS: u32 = 2;

// QR markup
pub const QR_ELEMENT_ID: &str = "qrCode";
// A real QR grid carries hundreds of <rect>s; logo SVGs far fewer.
pub const QR_MIN_RECTS: usize = 200;

// Local cache
pub const STORE_DIR: &str = ".store";
pub const CACHE_KEY: &str = "qr_latest";
pub const CACHE_TTL_MINS: i64 = 30;

// Net
pub const HTTP_TIMEOUT_SECS: u64 = 15;
pub const PAGE_LOAD_TIMEOUT_SECS: u64 = 30;
pub const SCRIPT_TIMEOUT_SECS: u64 = 10;
pub const HELPER_TIMEOUT_SECS: u64 = 2;
pub const MAX_REDIRECTS: usize = 5;
pub const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) \
AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

// Credentials from the environment (CLI convenience)
pub const ENV_USERNAME: &str = "RISE_GYM_EMAIL";
pub const ENV_PASSWORD: &str = "RISE_GYM_PASSWORD";
