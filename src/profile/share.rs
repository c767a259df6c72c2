//! Profile-sharing collaborators.

use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::CONTENT_TYPE;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{BenchError, Result};

pub const DEFAULT_SHARE_URL: &str = "https://flamegraph.com";
const UPLOAD_PATH: &str = "/api/upload/v1";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Named part of an uploaded profile (one per sample type).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubProfile {
    pub name: String,
    pub key: String,
}

/// Upload response: a link plus sub-profile keys.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SharedProfile {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub key: String,
    #[serde(default, alias = "sub_profiles")]
    pub sub_profiles: Vec<SubProfile>,
}

/// Turns raw profile bytes into shareable keys.
pub trait ProfileSharer: Send + Sync {
    /// Short identifier used in logs.
    fn name(&self) -> &'static str;

    /// Upload `bytes` and return the keys assigned to them.
    ///
    /// # Errors
    ///
    /// Returns `Share` when the service is unreachable or rejects the
    /// upload. Callers treat this as non-fatal.
    fn share(&self, file_name: &str, bytes: &[u8]) -> Result<SharedProfile>;
}

/// HTTP client for a flamegraph.com compatible upload endpoint.
#[derive(Debug, Clone)]
pub struct FlamegraphClient {
    base_url: String,
    client: Client,
}

impl FlamegraphClient {
    /// # Errors
    ///
    /// Returns `Http` if the HTTP client cannot be built.
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(concat!("benchdiff/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        })
    }

    #[must_use]
    pub fn upload_url(&self) -> String {
        format!("{}{UPLOAD_PATH}", self.base_url)
    }
}

impl ProfileSharer for FlamegraphClient {
    fn name(&self) -> &'static str {
        "flamegraph"
    }

    fn share(&self, file_name: &str, bytes: &[u8]) -> Result<SharedProfile> {
        let url = self.upload_url();
        debug!(url = %url, file = file_name, size = bytes.len(), "uploading profile");

        let response = self
            .client
            .post(&url)
            .header(CONTENT_TYPE, "application/octet-stream")
            .body(bytes.to_vec())
            .send()
            .and_then(reqwest::blocking::Response::error_for_status)
            .map_err(|e| BenchError::Share(format!("upload of {file_name} failed: {e}")))?;

        let shared: SharedProfile = response
            .json()
            .map_err(|e| BenchError::Share(format!("invalid upload response: {e}")))?;
        debug!(
            key = %shared.key,
            sub_profiles = shared.sub_profiles.len(),
            "profile uploaded"
        );
        Ok(shared)
    }
}

/// Sharer used with `--no-share`: never uploads, never yields keys.
#[derive(Debug, Clone, Copy, Default)]
pub struct OfflineSharer;

impl ProfileSharer for OfflineSharer {
    fn name(&self) -> &'static str {
        "offline"
    }

    fn share(&self, _file_name: &str, _bytes: &[u8]) -> Result<SharedProfile> {
        Ok(SharedProfile::default())
    }
}
