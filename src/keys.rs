//! Public SSH key retrieval.

use anyhow::{Context, Result};
use std::time::Duration;

/// Fetches the public keys published for a handle.
pub trait KeyRetriever: Send + Sync {
    /// Zero keys is `Ok(vec![])`; the caller decides whether that is acceptable.
    fn fetch(&self, handle: &str) -> Result<Vec<String>>;
}

/// Reads `https://github.com/<handle>.keys`.
#[derive(Debug, Clone)]
pub struct GithubKeys {
    base_url: String,
    timeout: Duration,
}

impl Default for GithubKeys {
    fn default() -> Self {
        Self {
            base_url: "https://github.com".to_string(),
            timeout: Duration::from_secs(15),
        }
    }
}

impl GithubKeys {
    /// Point at a different host (mirrors, tests).
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            ..Self::default()
        }
    }

    pub fn keys_url(&self, handle: &str) -> String {
        format!("{}/{}.keys", self.base_url, handle)
    }
}

impl KeyRetriever for GithubKeys {
    fn fetch(&self, handle: &str) -> Result<Vec<String>> {
        let url = self.keys_url(handle);
        tracing::info!("Fetching SSH keys from {}", url);

        let client = reqwest::blocking::Client::builder()
            .user_agent("tuinix-installer")
            .timeout(self.timeout)
            .build()
            .context("Failed to build HTTP client")?;

        let response = client
            .get(&url)
            .send()
            .with_context(|| format!("Failed to fetch keys for {}", handle))?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            anyhow::bail!("GitHub user {:?} not found", handle);
        }
        if !status.is_success() {
            anyhow::bail!("GitHub returned HTTP {} for {}", status.as_u16(), url);
        }

        let body = response.text().context("Failed to read key list")?;
        let keys = parse_key_list(&body);
        tracing::info!("Found {} key(s) for {}", keys.len(), handle);
        Ok(keys)
    }
}

/// One key per non-blank line.
pub fn parse_key_list(body: &str) -> Vec<String> {
    body.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect()
}
