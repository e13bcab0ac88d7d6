//! `GLM_Translate`: translate text between two language codes.
//!
//! Blank language inputs fall back to `source_lang` / `target_lang` in
//! `config.json`, then to [`DEFAULT_SOURCE_LANG`] / [`DEFAULT_TARGET_LANG`].
//! The resolved system prompt may reference `{source_lang}` and
//! `{target_lang}`.

use super::{
    Node, NodeContext, NodeDef, NodeResultFuture, complete_text, inputs_schema, note_seed,
    parse_node_inputs, preview,
};
use crate::config::NodeConfig;
use crate::prompt::defaults::{TRANSLATE_PROMPT, translate_catalog};
use crate::prompt::{PromptProfile, render_placeholders};
use crate::{ChatRequest, DEFAULT_TEXT_MODEL, Message, NODE_CATEGORY, NodeError};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

pub const NAME: &str = "GLM_Translate";
pub const DISPLAY_NAME: &str = "GLM翻译";
pub const PROMPT_KEY: &str = "translate";

pub const DEFAULT_SOURCE_LANG: &str = "auto";
pub const DEFAULT_TARGET_LANG: &str = "en";

/// Inputs for [`TranslateNode`].
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct TranslateInputs {
    /// Text to translate.
    pub text: String,
    /// Source language code. Blank uses config.json, then "auto".
    #[serde(default)]
    pub source_lang: String,
    /// Target language code. Blank uses config.json, then "en".
    #[serde(default)]
    pub target_lang: String,
    /// System prompt. Leave blank to use the preset or default prompt.
    #[serde(default)]
    pub system_prompt_override: String,
    /// Name of a system prompt preset from prompts/translate.json.
    /// Omitted selects the first preset in that file.
    #[serde(default)]
    pub preset: Option<String>,
    /// Optional API key. Prefer the ZHIPUAI_API_KEY environment variable or config.json.
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_model")]
    pub model_name: String,
    #[serde(default = "default_temperature")]
    #[schemars(range(min = 0.0, max = 1.0))]
    pub temperature: f64,
    #[serde(default = "default_max_tokens")]
    #[schemars(range(min = 1, max = 4096))]
    pub max_tokens: u32,
    /// Accepted for graph compatibility. Does not affect the model output.
    #[serde(default)]
    pub seed: u64,
}

fn default_model() -> String {
    DEFAULT_TEXT_MODEL.to_string()
}
fn default_temperature() -> f64 {
    0.3
}
fn default_max_tokens() -> u32 {
    2048
}

/// Effective `(source, target)` language codes.
///
/// ```
/// use glm_nodes::config::NodeConfig;
/// use glm_nodes::nodes::translate::effective_languages;
///
/// let config = NodeConfig { target_lang: Some("ja".into()), ..Default::default() };
/// assert_eq!(effective_languages(" ", "", &config), ("auto".to_string(), "ja".to_string()));
/// assert_eq!(effective_languages("zh", "fr", &config), ("zh".to_string(), "fr".to_string()));
/// ```
pub fn effective_languages(source: &str, target: &str, config: &NodeConfig) -> (String, String) {
    let pick = |input: &str, configured: Option<&str>, fallback: &str| {
        let input = input.trim();
        if input.is_empty() {
            configured.unwrap_or(fallback).to_string()
        } else {
            input.to_string()
        }
    };
    (
        pick(source, config.source_lang(), DEFAULT_SOURCE_LANG),
        pick(target, config.target_lang(), DEFAULT_TARGET_LANG),
    )
}

pub struct TranslateNode {
    ctx: Arc<NodeContext>,
}

impl TranslateNode {
    pub fn new(ctx: Arc<NodeContext>) -> Self {
        Self { ctx }
    }

    pub fn prompt_profile(&self) -> PromptProfile {
        self.ctx
            .prompt_profile(PROMPT_KEY, translate_catalog(), TRANSLATE_PROMPT)
    }

    pub fn build_request(inputs: &TranslateInputs, system_prompt: &str) -> ChatRequest {
        ChatRequest {
            model: inputs.model_name.clone(),
            messages: vec![Message::system(system_prompt), Message::user(&inputs.text)],
            temperature: Some(inputs.temperature),
            top_p: None,
            max_tokens: Some(inputs.max_tokens),
        }
    }

    pub async fn run(&self, inputs: TranslateInputs) -> Result<String, NodeError> {
        let config = self.ctx.load_config();
        let backend = self.ctx.connect(&inputs.api_key, &config)?;

        if inputs.text.trim().is_empty() {
            return Err(NodeError::EmptyInput("text"));
        }

        let (source, target) =
            effective_languages(&inputs.source_lang, &inputs.target_lang, &config);
        let resolved = self
            .prompt_profile()
            .resolve(&inputs.system_prompt_override, inputs.preset.as_deref());
        let system = render_placeholders(
            &resolved.text,
            &[("source_lang", source.as_str()), ("target_lang", target.as_str())],
        );
        note_seed(NAME, inputs.seed);

        info!("[{NAME}] model: {}, {source} -> {target}", inputs.model_name);
        info!(
            "[{NAME}] system prompt ({}): '{}'",
            resolved.source,
            preview(&system, 100)
        );

        let request = Self::build_request(&inputs, &system);
        complete_text(NAME, backend.as_ref(), &request).await
    }
}

impl Node for TranslateNode {
    fn definition(&self) -> NodeDef {
        NodeDef {
            name: NAME.to_string(),
            display_name: DISPLAY_NAME.to_string(),
            category: NODE_CATEGORY.to_string(),
            inputs: inputs_schema::<TranslateInputs>(&self.prompt_profile()),
            return_names: vec!["translated_text".to_string()],
        }
    }

    fn invoke(&self, inputs: &str) -> NodeResultFuture<'_> {
        let inputs = inputs.to_string();
        Box::pin(async move {
            let parsed = parse_node_inputs::<TranslateInputs>(NAME, &inputs)?;
            self.run(parsed).await
        })
    }

    fn name(&self) -> String {
        NAME.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn languages_fall_back_to_defaults() {
        let (s, t) = effective_languages("", "", &NodeConfig::default());
        assert_eq!(s, DEFAULT_SOURCE_LANG);
        assert_eq!(t, DEFAULT_TARGET_LANG);
    }

    #[test]
    fn config_languages_used_when_inputs_blank() {
        let config = NodeConfig {
            source_lang: Some("zh".into()),
            target_lang: Some("de".into()),
            ..Default::default()
        };
        assert_eq!(
            effective_languages("", "  ", &config),
            ("zh".to_string(), "de".to_string())
        );
    }

    #[test]
    fn schema_defaults_are_exact() {
        let schema = crate::json_schema_for::<TranslateInputs>();
        assert_eq!(schema["properties"]["temperature"]["default"], 0.3);
        assert_eq!(schema["properties"]["max_tokens"]["default"], 2048);
    }

    #[test]
    fn request_uses_rendered_system_prompt() {
        let inputs: TranslateInputs = serde_json::from_str(r#"{"text": "你好"}"#).unwrap();
        let system = render_placeholders(
            TRANSLATE_PROMPT.as_str(),
            &[("source_lang", "zh"), ("target_lang", "en")],
        );
        let req = TranslateNode::build_request(&inputs, &system);
        let sys = req.messages[0].text().unwrap();
        assert!(sys.contains("from zh to en"));
        assert_eq!(req.messages[1].text(), Some("你好"));
        assert_eq!(req.top_p, None);
    }
}
