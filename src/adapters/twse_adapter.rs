//! TWSE daily market snapshot over HTTP.

use crate::domain::error::StrongscanError;
use crate::ports::snapshot_port::SnapshotPort;
use reqwest::blocking::Client;
use serde_json::Value;
use std::time::Duration;

pub const DEFAULT_SNAPSHOT_URL: &str =
    "https://www.twse.com.tw/exchangeReport/MI_INDEX?response=json&type=ALLBUT0999";
const SOURCE: &str = "twse";

pub struct TwseSnapshotAdapter {
    client: Client,
    url: String,
}

impl TwseSnapshotAdapter {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, StrongscanError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| StrongscanError::fetch(SOURCE, e.to_string()))?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

impl SnapshotPort for TwseSnapshotAdapter {
    fn fetch_snapshot(&self) -> Result<Value, StrongscanError> {
        tracing::debug!(url = %self.url, "fetching market snapshot");
        let response = self
            .client
            .get(&self.url)
            .send()
            .and_then(|r| r.error_for_status())
            .map_err(|e| StrongscanError::fetch(SOURCE, e.to_string()))?;
        let body = response
            .text()
            .map_err(|e| StrongscanError::fetch(SOURCE, e.to_string()))?;
        parse_snapshot(&body)
    }
}

/// The body must be a JSON document; its shape is checked later by the
/// universe builder.
pub fn parse_snapshot(body: &str) -> Result<Value, StrongscanError> {
    serde_json::from_str(body)
        .map_err(|e| StrongscanError::fetch(SOURCE, format!("invalid JSON body: {e}")))
}
