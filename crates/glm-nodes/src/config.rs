//! `config.json` model and root-relative file locations.
//!
//! [`NodeConfig`] is re-read on every invocation and never fails to load: a
//! missing or malformed file degrades to defaults with a logged warning.
//! [`NodePaths`] maps a root directory to the config file and each node's
//! prompt catalog and default template.

use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Environment variable that overrides the root directory.
pub const HOME_ENV: &str = "GLM_NODES_HOME";

/// Config file name under the root directory.
pub const CONFIG_FILE: &str = "config.json";

/// Directory (under the root) holding per-node catalogs and templates.
pub const PROMPTS_DIR: &str = "prompts";

/// Contents of `config.json`. Unknown keys are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    #[serde(rename = "ZHIPUAI_API_KEY", skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Key name used by older installs.
    #[serde(rename = "ZHIPU_API_KEY", skip_serializing_if = "Option::is_none")]
    pub legacy_api_key: Option<String>,
    /// Default source language code for translation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_lang: Option<String>,
    /// Default target language code for translation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_lang: Option<String>,
}

impl NodeConfig {
    /// Load `path`, falling back to defaults on any failure.
    pub fn load(path: &Path) -> Self {
        let text = match fs::read_to_string(path) {
            Ok(t) => t,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                warn!("config file {} not found, using defaults", path.display());
                return Self::default();
            }
            Err(e) => {
                warn!("failed to read config file {}: {e}", path.display());
                return Self::default();
            }
        };

        match serde_json::from_str::<Self>(&text) {
            Ok(config) => {
                debug!("loaded config from {}", path.display());
                if config.api_key().is_none() {
                    warn!("no usable ZHIPUAI_API_KEY field in {}", path.display());
                }
                config
            }
            Err(e) => {
                warn!(
                    "config file {} is not valid JSON ({e}), using defaults",
                    path.display()
                );
                Self::default()
            }
        }
    }

    /// The configured API key, trimmed. The current field name wins over the
    /// legacy one; blank values count as absent.
    pub fn api_key(&self) -> Option<&str> {
        [&self.api_key, &self.legacy_api_key]
            .into_iter()
            .filter_map(|v| non_blank(v.as_deref()))
            .next()
    }

    pub fn source_lang(&self) -> Option<&str> {
        non_blank(self.source_lang.as_deref())
    }

    pub fn target_lang(&self) -> Option<&str> {
        non_blank(self.target_lang.as_deref())
    }
}

fn non_blank(v: Option<&str>) -> Option<&str> {
    v.map(str::trim).filter(|s| !s.is_empty())
}

/// File locations relative to a root directory.
///
/// ```text
/// {root}/config.json
/// {root}/prompts/{node_key}.json   preset catalog
/// {root}/prompts/{node_key}.txt    default template
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodePaths {
    pub root: PathBuf,
}

impl NodePaths {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root from `GLM_NODES_HOME`, else the current directory.
    pub fn from_env() -> Self {
        match std::env::var_os(HOME_ENV) {
            Some(root) if !root.is_empty() => Self::new(root),
            _ => Self::new("."),
        }
    }

    pub fn config(&self) -> PathBuf {
        self.root.join(CONFIG_FILE)
    }

    pub fn catalog(&self, node_key: &str) -> PathBuf {
        self.root.join(PROMPTS_DIR).join(format!("{node_key}.json"))
    }

    pub fn template(&self, node_key: &str) -> PathBuf {
        self.root.join(PROMPTS_DIR).join(format!("{node_key}.txt"))
    }
}

impl Default for NodePaths {
    fn default() -> Self {
        Self::new(".")
    }
}
