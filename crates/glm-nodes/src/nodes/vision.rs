//! `GLM_Vision_ImageToPrompt`: image plus prompt in, description prompt out.

use super::{
    Node, NodeContext, NodeDef, NodeResultFuture, complete_text, inputs_schema, note_seed,
    parse_node_inputs, preview,
};
use crate::image::ImageInput;
use crate::prompt::PromptProfile;
use crate::prompt::defaults::{VISION_PROMPT, vision_catalog};
use crate::{ChatRequest, ContentPart, DEFAULT_VISION_MODEL, Message, NODE_CATEGORY, NodeError};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

pub const NAME: &str = "GLM_Vision_ImageToPrompt";
pub const DISPLAY_NAME: &str = "GLM识图生成提示词";
pub const PROMPT_KEY: &str = "vision";

/// Inputs for [`VisionNode`]. Supply `image_base64` or `image_url`; if both
/// are set the base64 data is used.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct VisionInputs {
    /// Base64 image data, ideally a full data:image/...;base64, URI.
    #[serde(default)]
    pub image_base64: String,
    /// Image URL.
    #[serde(default)]
    pub image_url: String,
    /// Prompt describing what to generate. Leave blank to use the preset or default prompt.
    #[serde(default)]
    pub prompt: String,
    /// Name of a prompt preset from prompts/vision.json.
    /// Omitted selects the first preset in that file.
    #[serde(default)]
    pub preset: Option<String>,
    #[serde(default = "default_model")]
    pub model_name: String,
    /// Optional API key. Prefer the ZHIPUAI_API_KEY environment variable or config.json.
    #[serde(default)]
    pub api_key: String,
    /// Accepted for graph compatibility. Does not affect the model output.
    #[serde(default)]
    pub seed: u64,
}

fn default_model() -> String {
    DEFAULT_VISION_MODEL.to_string()
}

pub struct VisionNode {
    ctx: Arc<NodeContext>,
}

impl VisionNode {
    pub fn new(ctx: Arc<NodeContext>) -> Self {
        Self { ctx }
    }

    pub fn prompt_profile(&self) -> PromptProfile {
        self.ctx
            .prompt_profile(PROMPT_KEY, vision_catalog(), VISION_PROMPT)
    }

    /// One user message: the prompt text, then the image.
    pub fn build_request(model: &str, prompt: &str, image: ImageInput) -> ChatRequest {
        ChatRequest {
            model: model.to_string(),
            messages: vec![Message::user_parts(vec![
                ContentPart::text(prompt),
                ContentPart::image_url(image.into_url()),
            ])],
            ..Default::default()
        }
    }

    pub async fn run(&self, inputs: VisionInputs) -> Result<String, NodeError> {
        let config = self.ctx.load_config();
        let backend = self.ctx.connect(&inputs.api_key, &config)?;

        let image = ImageInput::select(&inputs.image_base64, &inputs.image_url)?;
        let prompt = self
            .prompt_profile()
            .resolve(&inputs.prompt, inputs.preset.as_deref());
        note_seed(NAME, inputs.seed);

        info!("[{NAME}] model: {}", inputs.model_name);
        info!(
            "[{NAME}] prompt ({}): '{}'",
            prompt.source,
            preview(&prompt.text, 100)
        );

        let request = Self::build_request(&inputs.model_name, &prompt.text, image);
        complete_text(NAME, backend.as_ref(), &request).await
    }
}

impl Node for VisionNode {
    fn definition(&self) -> NodeDef {
        NodeDef {
            name: NAME.to_string(),
            display_name: DISPLAY_NAME.to_string(),
            category: NODE_CATEGORY.to_string(),
            inputs: inputs_schema::<VisionInputs>(&self.prompt_profile()),
            return_names: vec!["GETPrompt".to_string()],
        }
    }

    fn invoke(&self, inputs: &str) -> NodeResultFuture<'_> {
        let inputs = inputs.to_string();
        Box::pin(async move {
            let parsed = parse_node_inputs::<VisionInputs>(NAME, &inputs)?;
            self.run(parsed).await
        })
    }

    fn name(&self) -> String {
        NAME.to_string()
    }
}
