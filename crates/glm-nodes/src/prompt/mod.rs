//! Prompt presets and resolution.
//!
//! A node's effective prompt comes from the first source that yields text:
//!
//! 1. the caller's override (trimmed, non-empty),
//! 2. a named preset in the node's [`PromptCatalog`],
//! 3. the node's default template file,
//! 4. the node's [`BuiltinPrompt`].
//!
//! [`PromptProfile`] ties a node's files and built-ins together and reloads
//! both files on every [`PromptProfile::resolve`] call.

pub mod catalog;
pub mod defaults;
pub mod resolver;
pub mod template;

pub use catalog::PromptCatalog;
pub use resolver::resolve;
pub use template::{load_template, render_placeholders};

use std::fmt;
use std::path::PathBuf;
use tracing::debug;

/// Where a resolved prompt came from, highest precedence first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum PromptSource {
    Override,
    Preset,
    TemplateFile,
    Builtin,
}

impl fmt::Display for PromptSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PromptSource::Override => write!(f, "override"),
            PromptSource::Preset => write!(f, "preset"),
            PromptSource::TemplateFile => write!(f, "template file"),
            PromptSource::Builtin => write!(f, "built-in default"),
        }
    }
}

/// A non-empty prompt constant compiled into the binary.
///
/// Declaring one as a `const` with an empty string fails to compile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuiltinPrompt(&'static str);

impl BuiltinPrompt {
    pub const fn new(text: &'static str) -> Self {
        assert!(!text.is_empty(), "built-in prompt must not be empty");
        Self(text)
    }

    pub const fn as_str(&self) -> &'static str {
        self.0
    }
}

/// The prompt text chosen for one invocation. `text` is never empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPrompt {
    pub text: String,
    pub source: PromptSource,
}

/// A node's prompt sources: its catalog and template files plus built-ins.
#[derive(Debug, Clone)]
pub struct PromptProfile {
    pub catalog_path: PathBuf,
    pub template_path: PathBuf,
    /// Returned by catalog loading when the file is unusable.
    pub builtin_catalog: PromptCatalog,
    pub builtin_default: BuiltinPrompt,
}

impl PromptProfile {
    /// Load the catalog file, or the built-in catalog if it is unusable.
    pub fn load_catalog(&self) -> PromptCatalog {
        PromptCatalog::load_or(&self.catalog_path, self.builtin_catalog.clone())
    }

    /// The preset selected when the caller names none: the first key of a
    /// usable catalog file. Without one there is no default selection and
    /// resolution goes on to the template file.
    pub fn default_preset(&self) -> Option<String> {
        PromptCatalog::load_usable(&self.catalog_path)
            .and_then(|catalog| catalog.default_name().map(str::to_string))
    }

    /// Resolve the prompt for one invocation, re-reading both files.
    ///
    /// `preset_name` of `None` selects [`PromptProfile::default_preset`].
    /// `Some("")` selects nothing.
    pub fn resolve(&self, override_text: &str, preset_name: Option<&str>) -> ResolvedPrompt {
        let file_catalog = PromptCatalog::load_usable(&self.catalog_path);
        let selected = match preset_name {
            Some(name) => name.to_string(),
            None => file_catalog
                .as_ref()
                .and_then(|catalog| catalog.default_name())
                .unwrap_or_default()
                .to_string(),
        };
        let catalog = file_catalog.unwrap_or_else(|| self.builtin_catalog.clone());
        let resolved = resolve(
            override_text,
            &selected,
            &catalog,
            || load_template(&self.template_path),
            self.builtin_default,
        );
        debug!(
            "prompt resolved from {} ({} chars)",
            resolved.source,
            resolved.text.chars().count()
        );
        resolved
    }
}
