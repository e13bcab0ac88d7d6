//! Prompt precedence chain.

use super::{BuiltinPrompt, PromptCatalog, PromptSource, ResolvedPrompt};

/// Pick the effective prompt. First match wins:
///
/// 1. `override_text`, trimmed, if non-empty.
/// 2. `catalog[preset_name]`, unchanged, if the name is present.
/// 3. `fallback_loader()`, if it returns non-empty text. The loader is only
///    called when the first two sources miss.
/// 4. `builtin_default`.
///
/// ```
/// use glm_nodes::prompt::{BuiltinPrompt, PromptCatalog, PromptSource, resolve};
///
/// const BUILTIN: BuiltinPrompt = BuiltinPrompt::new("X");
/// let catalog = PromptCatalog::new().with("p1", "Y").with("p2", "Z");
///
/// let r = resolve("", "p1", &catalog, || "W".to_string(), BUILTIN);
/// assert_eq!(r.text, "Y");
/// assert_eq!(r.source, PromptSource::Preset);
///
/// let r = resolve("  hello  ", "p1", &catalog, || "W".to_string(), BUILTIN);
/// assert_eq!(r.text, "hello");
/// ```
pub fn resolve(
    override_text: &str,
    preset_name: &str,
    catalog: &PromptCatalog,
    fallback_loader: impl FnOnce() -> String,
    builtin_default: BuiltinPrompt,
) -> ResolvedPrompt {
    let trimmed = override_text.trim();
    if !trimmed.is_empty() {
        return ResolvedPrompt {
            text: trimmed.to_string(),
            source: PromptSource::Override,
        };
    }

    if let Some(body) = catalog.get(preset_name) {
        return ResolvedPrompt {
            text: body.to_string(),
            source: PromptSource::Preset,
        };
    }

    let fallback = fallback_loader();
    if !fallback.is_empty() {
        return ResolvedPrompt {
            text: fallback,
            source: PromptSource::TemplateFile,
        };
    }

    ResolvedPrompt {
        text: builtin_default.as_str().to_string(),
        source: PromptSource::Builtin,
    }
}
