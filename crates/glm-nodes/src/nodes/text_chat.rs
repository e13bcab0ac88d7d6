//! `GLM_Text_Chat`: a resolved system prompt plus user text.
//!
//! The built-in system prompt expands a short text-to-video prompt into a
//! full paragraph; presets and the default template can repoint the node
//! at any other system instruction.

use super::{
    Node, NodeContext, NodeDef, NodeResultFuture, complete_text, inputs_schema, note_seed,
    parse_node_inputs, preview,
};
use crate::prompt::PromptProfile;
use crate::prompt::defaults::{TEXT_CHAT_PROMPT, text_chat_catalog};
use crate::{ChatRequest, DEFAULT_TEXT_MODEL, Message, NODE_CATEGORY, NodeError};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

pub const NAME: &str = "GLM_Text_Chat";
pub const DISPLAY_NAME: &str = "GLM文本对话";
/// File key under `prompts/`.
pub const PROMPT_KEY: &str = "text_chat";

/// Inputs for [`TextChatNode`].
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct TextChatInputs {
    /// Text sent as the user message.
    pub text_input: String,
    /// System prompt. Leave blank to use the preset or default prompt.
    #[serde(default)]
    pub system_prompt_override: String,
    /// Name of a system prompt preset from prompts/text_chat.json.
    /// Omitted selects the first preset in that file.
    #[serde(default)]
    pub preset: Option<String>,
    /// Optional API key. Prefer the ZHIPUAI_API_KEY environment variable or config.json.
    #[serde(default)]
    pub api_key: String,
    /// Model identifier.
    #[serde(default = "default_model")]
    pub model_name: String,
    #[serde(default = "default_temperature")]
    #[schemars(range(min = 0.0, max = 1.0))]
    pub temperature: f64,
    #[serde(default = "default_top_p")]
    #[schemars(range(min = 0.0, max = 1.0))]
    pub top_p: f64,
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
    0.9
}
fn default_top_p() -> f64 {
    0.7
}
fn default_max_tokens() -> u32 {
    1024
}

pub struct TextChatNode {
    ctx: Arc<NodeContext>,
}

impl TextChatNode {
    pub fn new(ctx: Arc<NodeContext>) -> Self {
        Self { ctx }
    }

    pub fn prompt_profile(&self) -> PromptProfile {
        self.ctx
            .prompt_profile(PROMPT_KEY, text_chat_catalog(), TEXT_CHAT_PROMPT)
    }

    /// Build the request for `inputs` with an already-resolved system prompt.
    pub fn build_request(inputs: &TextChatInputs, system_prompt: &str) -> ChatRequest {
        ChatRequest {
            model: inputs.model_name.clone(),
            messages: vec![
                Message::system(system_prompt),
                Message::user(&inputs.text_input),
            ],
            temperature: Some(inputs.temperature),
            top_p: Some(inputs.top_p),
            max_tokens: Some(inputs.max_tokens),
        }
    }

    /// Run with typed inputs.
    pub async fn run(&self, inputs: TextChatInputs) -> Result<String, NodeError> {
        let config = self.ctx.load_config();
        let backend = self.ctx.connect(&inputs.api_key, &config)?;

        if inputs.text_input.trim().is_empty() {
            return Err(NodeError::EmptyInput("text_input"));
        }

        let system = self
            .prompt_profile()
            .resolve(&inputs.system_prompt_override, inputs.preset.as_deref());
        note_seed(NAME, inputs.seed);

        info!("[{NAME}] model: {}", inputs.model_name);
        info!(
            "[{NAME}] system prompt ({}): '{}'",
            system.source,
            preview(&system.text, 100)
        );
        info!("[{NAME}] user input: '{}'", preview(&inputs.text_input, 100));
        info!(
            "[{NAME}] params: temperature={}, top_p={}, max_tokens={}",
            inputs.temperature, inputs.top_p, inputs.max_tokens
        );

        let request = Self::build_request(&inputs, &system.text);
        complete_text(NAME, backend.as_ref(), &request).await
    }
}

impl Node for TextChatNode {
    fn definition(&self) -> NodeDef {
        NodeDef {
            name: NAME.to_string(),
            display_name: DISPLAY_NAME.to_string(),
            category: NODE_CATEGORY.to_string(),
            inputs: inputs_schema::<TextChatInputs>(&self.prompt_profile()),
            return_names: vec!["response_text".to_string()],
        }
    }

    fn invoke(&self, inputs: &str) -> NodeResultFuture<'_> {
        let inputs = inputs.to_string();
        Box::pin(async move {
            let parsed = parse_node_inputs::<TextChatInputs>(NAME, &inputs)?;
            self.run(parsed).await
        })
    }

    fn name(&self) -> String {
        NAME.to_string()
    }
}
