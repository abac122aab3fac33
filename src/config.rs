//! Client configuration drawn from the environment.
//!
//! Every knob has an environment variable; the `catalog` binary maps its flags
//! onto the same names so scripts and interactive use agree.

use crate::find_views_config;
use anyhow::{Context, Result, bail};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

pub const API_URL_VAR: &str = "CATALOG_API_URL";
pub const VIEWS_VAR: &str = "CATALOG_VIEWS";
pub const TIMEOUT_VAR: &str = "CATALOG_HTTP_TIMEOUT_SECS";
pub const TOKEN_VAR: &str = "CATALOG_SESSION_TOKEN";

pub const DEFAULT_API_URL: &str = "http://localhost:8083";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClientConfig {
    /// Backend origin, without a trailing slash.
    pub api_url: String,
    /// Views definition file.
    pub views_path: PathBuf,
    /// Per-request timeout; `None` keeps the transport default (no timeout).
    pub timeout: Option<Duration>,
    /// Bearer token used when no interactive session is signed in.
    pub session_token: Option<String>,
}

impl ClientConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build a config from an arbitrary variable lookup.
    ///
    /// Blank values are treated as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let api_url = get(API_URL_VAR).unwrap_or_else(|| DEFAULT_API_URL.to_string());
        if !(api_url.starts_with("http://") || api_url.starts_with("https://")) {
            bail!("{API_URL_VAR} must be an http(s) URL, got '{api_url}'");
        }

        let timeout = match get(TIMEOUT_VAR) {
            Some(raw) => {
                let secs: u64 = raw
                    .parse()
                    .with_context(|| format!("{TIMEOUT_VAR} must be a whole number of seconds"))?;
                if secs == 0 {
                    bail!("{TIMEOUT_VAR} must be greater than zero");
                }
                Some(Duration::from_secs(secs))
            }
            None => None,
        };

        let views_path = find_views_config(get(VIEWS_VAR).as_deref())?;

        Ok(Self {
            api_url: api_url.trim_end_matches('/').to_string(),
            views_path,
            timeout,
            session_token: get(TOKEN_VAR),
        })
    }

    /// HTTP client honoring the configured timeout.
    pub fn http_client(&self) -> Result<reqwest::Client> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }
        builder.build().context("failed to build HTTP client")
    }
}
