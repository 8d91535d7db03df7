//! Startup configuration, resolved from the process environment.

use anyhow::{Context, Result};

const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the ExpressionEngine site, e.g. `https://example.com`.
    pub api_url: String,
    /// Reinos Webservice shortkey.
    pub shortkey: String,
    /// Per-request network timeout.
    pub timeout_secs: u64,
}

/// Read an environment variable, treating whitespace-only values as unset.
fn env_nonempty(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl Config {
    /// Missing `API_URL` or `SHORTKEY` is fatal at startup, never a runtime
    /// condition.
    pub fn from_env() -> Result<Self> {
        let api_url = env_nonempty("EE_API_URL")
            .or_else(|| env_nonempty("API_URL"))
            .context("missing required environment variable EE_API_URL (or API_URL)")?;
        url::Url::parse(&api_url).with_context(|| format!("invalid API base URL: {api_url}"))?;

        let shortkey = env_nonempty("EE_SHORTKEY")
            .or_else(|| env_nonempty("SHORTKEY"))
            .context("missing required environment variable EE_SHORTKEY (or SHORTKEY)")?;

        let timeout_secs = env_nonempty("EE_TIMEOUT_SECS")
            .map(|v| {
                v.parse::<u64>()
                    .with_context(|| format!("invalid EE_TIMEOUT_SECS: {v}"))
            })
            .transpose()?
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        Ok(Self {
            api_url,
            shortkey,
            timeout_secs,
        })
    }
}
