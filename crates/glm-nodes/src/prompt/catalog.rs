//! Ordered preset catalog.
//!
//! A catalog file is a JSON object mapping preset names to prompt bodies:
//!
//! ```json
//! {
//!   "video-expand": "Expand the prompt into one paragraph ...",
//!   "short": "Rewrite the prompt in one sentence."
//! }
//! ```
//!
//! Key order is preserved and the first entry is the default selection.
//! Values are made strict strings at load: non-string JSON values are
//! converted to their JSON text, and entries whose body is blank are
//! dropped, so a catalog lookup can never produce an empty prompt.

use std::fs;
use std::path::Path;
use tracing::{debug, warn};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PromptCatalog {
    entries: Vec<(String, String)>,
}

impl PromptCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// A catalog with one entry.
    pub fn single(name: impl Into<String>, body: impl Into<String>) -> Self {
        Self::new().with(name, body)
    }

    /// Insert or replace an entry (builder pattern). A replaced entry keeps
    /// its original position.
    pub fn with(mut self, name: impl Into<String>, body: impl Into<String>) -> Self {
        self.insert(name, body);
        self
    }

    /// Insert or replace an entry. A replaced entry keeps its position.
    pub fn insert(&mut self, name: impl Into<String>, body: impl Into<String>) {
        let name = name.into();
        let body = body.into();
        if let Some(slot) = self.entries.iter_mut().find(|(n, _)| *n == name) {
            slot.1 = body;
        } else {
            self.entries.push((name, body));
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, body)| body.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// The default selection: the first-inserted name.
    pub fn default_name(&self) -> Option<&str> {
        self.entries.first().map(|(n, _)| n.as_str())
    }

    /// Preset names in insertion order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(n, _)| n.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(n, b)| (n.as_str(), b.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Parse a JSON object into a catalog.
    ///
    /// Fails if the text is not JSON or not an object. An object with no
    /// usable entries parses to an empty catalog.
    pub fn from_json_str(text: &str) -> Result<Self, String> {
        let value: serde_json::Value =
            serde_json::from_str(text).map_err(|e| format!("invalid JSON: {e}"))?;
        let serde_json::Value::Object(map) = value else {
            return Err("expected a JSON object of preset name to prompt".to_string());
        };

        let mut catalog = Self::new();
        for (name, value) in map {
            let body = match value {
                serde_json::Value::String(s) => s,
                other => {
                    debug!("preset '{name}' is not a string, using its JSON text");
                    other.to_string()
                }
            };
            if body.trim().is_empty() {
                debug!("preset '{name}' has an empty body, skipping");
                continue;
            }
            catalog.insert(name, body);
        }
        Ok(catalog)
    }

    /// Read and parse a catalog file.
    pub fn load(path: &Path) -> Result<Self, String> {
        let text = fs::read_to_string(path)
            .map_err(|e| format!("failed to read preset file '{}': {e}", path.display()))?;
        Self::from_json_str(&text)
            .map_err(|e| format!("failed to parse preset file '{}': {e}", path.display()))
    }

    /// Load `path` if it holds at least one usable entry. A missing,
    /// unreadable, non-object, or empty file yields `None` and is logged.
    pub fn load_usable(path: &Path) -> Option<PromptCatalog> {
        if !path.exists() {
            debug!("preset file {} not found", path.display());
            return None;
        }
        match Self::load(path) {
            Ok(catalog) if catalog.is_empty() => {
                warn!("preset file {} has no usable entries", path.display());
                None
            }
            Ok(catalog) => {
                debug!("loaded {} preset(s) from {}", catalog.len(), path.display());
                Some(catalog)
            }
            Err(e) => {
                warn!("{e}");
                None
            }
        }
    }

    /// Load `path`, returning `builtin` unchanged if the file is missing,
    /// unreadable, not a JSON object, or has no usable entries. Never fails.
    pub fn load_or(path: &Path, builtin: PromptCatalog) -> PromptCatalog {
        Self::load_usable(path).unwrap_or_else(|| {
            debug!("using built-in presets");
            builtin
        })
    }
}
