// src/helper.rs
//
// Best-effort probe of a local-network companion service that mirrors
// the current QR. Strictly optional: unreachable or malformed just
// means the strategy chain moves on.

use std::time::Duration;

use reqwest::blocking::Client;
use serde::Deserialize;

use crate::config::consts::HELPER_TIMEOUT_SECS;
use crate::errors::Error;
use crate::types::{FetchResult, Source};

#[derive(Debug, Deserialize)]
struct HelperPayload {
    token: Option<String>,
    #[serde(default)]
    svg: Option<String>,
}

pub struct LocalHelper {
    base: String,
    client: Client,
}

impl LocalHelper {
    pub fn new(base: impl Into<String>) -> Result<Self, Error> {
        let client = Client::builder()
            .timeout(Duration::from_secs(HELPER_TIMEOUT_SECS))
            .build()?;
        Ok(Self { base: base.into(), client })
    }

    pub fn fetch(&self) -> FetchResult {
        let url = format!("{}/qr/current", self.base.trim_end_matches('/'));
        let resp = match self.client.get(&url).send().and_then(|r| r.error_for_status()) {
            Ok(r) => r,
            Err(e) => return FetchResult::failure(Source::LocalHelper, e.to_string()),
        };
        let payload: HelperPayload = match resp.json() {
            Ok(p) => p,
            Err(e) => {
                return FetchResult::failure(Source::LocalHelper, format!("parse error: {e}"));
            }
        };
        if payload.token.is_none() && payload.svg.is_none() {
            return FetchResult::failure(Source::LocalHelper, "helper returned no token");
        }
        FetchResult::success(Source::LocalHelper, payload.token, payload.svg)
    }
}
