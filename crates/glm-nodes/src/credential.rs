//! API key resolution.
//!
//! Precedence, first non-blank value wins:
//! 1. the explicit per-call key (node input),
//! 2. the `ZHIPUAI_API_KEY` environment variable (then legacy `ZHIPU_API_KEY`),
//! 3. the `ZHIPUAI_API_KEY` field of `config.json` (then legacy `ZHIPU_API_KEY`).
//!
//! The environment is read through an injectable [`EnvLookup`] so tests
//! never touch the process environment.

use crate::config::NodeConfig;
use std::fmt;
use std::sync::Arc;
use tracing::info;

pub const API_KEY_ENV: &str = "ZHIPUAI_API_KEY";
pub const LEGACY_API_KEY_ENV: &str = "ZHIPU_API_KEY";

/// Environment variable lookup.
pub type EnvLookup = Arc<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// Lookup backed by the real process environment.
pub fn process_env() -> EnvLookup {
    Arc::new(|name| std::env::var(name).ok())
}

/// Lookup that finds nothing.
pub fn empty_env() -> EnvLookup {
    Arc::new(|_| None)
}

/// Where a resolved key came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialSource {
    Explicit,
    Environment,
    ConfigFile,
}

impl fmt::Display for CredentialSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CredentialSource::Explicit => write!(f, "node input"),
            CredentialSource::Environment => write!(f, "environment"),
            CredentialSource::ConfigFile => write!(f, "config file"),
        }
    }
}

/// A resolved, trimmed, non-empty API key. `Debug` redacts the value.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey {
    value: String,
    source: CredentialSource,
}

impl ApiKey {
    pub fn expose(&self) -> &str {
        &self.value
    }

    pub fn source(&self) -> CredentialSource {
        self.source
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiKey")
            .field("value", &"***")
            .field("source", &self.source)
            .finish()
    }
}

/// Resolve the API key for one invocation. `None` means no source had one.
pub fn resolve_api_key(explicit: &str, env: &EnvLookup, config: &NodeConfig) -> Option<ApiKey> {
    let explicit = explicit.trim();
    if !explicit.is_empty() {
        return Some(ApiKey {
            value: explicit.to_string(),
            source: CredentialSource::Explicit,
        });
    }

    for name in [API_KEY_ENV, LEGACY_API_KEY_ENV] {
        if let Some(value) = env(name) {
            let value = value.trim();
            if !value.is_empty() {
                info!("using API key from environment variable {name}");
                return Some(ApiKey {
                    value: value.to_string(),
                    source: CredentialSource::Environment,
                });
            }
        }
    }

    config.api_key().map(|value| {
        info!("using API key from config file");
        ApiKey {
            value: value.to_string(),
            source: CredentialSource::ConfigFile,
        }
    })
}
