//! Zhipu AI GLM nodes for node-graph hosts.
//!
//! `glm-nodes` provides three ready-made nodes that forward text or an image
//! to the [Zhipu AI](https://open.bigmodel.cn/) chat completions API and
//! return the model's text:
//!
//! - [`TextChatNode`](nodes::text_chat::TextChatNode) (`GLM_Text_Chat`):
//!   a system prompt plus user text.
//! - [`VisionNode`](nodes::vision::VisionNode) (`GLM_Vision_ImageToPrompt`):
//!   an image (URL or base64 data) plus a prompt. Produces a description
//!   prompt.
//! - [`TranslateNode`](nodes::translate::TranslateNode) (`GLM_Translate`):
//!   translation between two language codes.
//!
//! Every node resolves its prompt through the same precedence chain (see
//! [`prompt::resolve`]): an explicit override, then a named preset from the
//! node's catalog file, then the node's default template file, then a
//! built-in constant. Credentials follow their own chain (see
//! [`credential::resolve_api_key`]): explicit input, environment, then
//! `config.json`.
//!
//! # Getting started
//!
//! ```ignore
//! use glm_nodes::prelude::*;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() {
//!     let ctx = Arc::new(NodeContext::new(NodePaths::from_env(), Arc::new(ZhipuConnector::new())));
//!     let nodes = NodeSet::new().with_glm_nodes(ctx);
//!
//!     let out = nodes
//!         .execute("GLM_Text_Chat", r#"{"text_input": "a puppy playing on the grass"}"#)
//!         .await;
//!     println!("{out}");
//! }
//! ```
//!
//! Node output is always a single string: the model's response, or an
//! `"Error: ..."` message. Nodes never panic or propagate errors to the host.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`nodes`] | [`Node`](nodes::Node) trait, [`NodeSet`](nodes::NodeSet) registry, the three GLM nodes |
//! | [`prompt`] | Preset catalog, default template loading, prompt resolution |
//! | [`credential`] | API key precedence (explicit > environment > config file) |
//! | [`config`] | `config.json` model and root-relative file locations |
//! | [`image`] | Image reference selection and data URI wrapping |
//! | [`api`] | [`ChatBackend`](api::ChatBackend) / [`Connector`](api::Connector) seams |

pub mod api;
pub mod config;
pub mod credential;
pub mod error;
pub mod image;
pub mod nodes;
pub mod prelude;
pub mod prompt;

pub use error::NodeError;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, trace};

// ── Constants ──────────────────────────────────────────────────────

pub const ZHIPU_CHAT_URL: &str = "https://open.bigmodel.cn/api/paas/v4/chat/completions";

/// Default model for text chat and translation.
pub const DEFAULT_TEXT_MODEL: &str = "glm-4-flash-250414";

/// Default model for image understanding.
pub const DEFAULT_VISION_MODEL: &str = "glm-4v-flash";

/// Node category shown by the host.
pub const NODE_CATEGORY: &str = "GLM";

// ── Schema generation ──────────────────────────────────────────────

/// Generate a JSON Schema `serde_json::Value` from a type that implements
/// `schemars::JsonSchema`. Node input declarations are derived this way so
/// the bounds and defaults live next to the typed fields.
///
/// ```
/// use glm_nodes::json_schema_for;
/// use schemars::JsonSchema;
/// use serde::Deserialize;
///
/// #[derive(Deserialize, JsonSchema)]
/// struct Inputs {
///     text: String,
///     #[serde(default)]
///     preset: Option<String>,
/// }
///
/// let schema = json_schema_for::<Inputs>();
/// assert_eq!(schema["type"], "object");
/// assert!(schema["required"].as_array().unwrap().contains(&"text".into()));
/// ```
pub fn json_schema_for<T: JsonSchema>() -> serde_json::Value {
    let schema = schemars::schema_for!(T);
    serde_json::to_value(schema)
        .unwrap_or_else(|_| serde_json::json!({"type": "object", "properties": {}}))
}

// ── Request types ──────────────────────────────────────────────────

/// Chat completion request body. Unset sampling parameters are omitted so
/// the service applies its own defaults.
#[derive(Serialize, Debug, Default, Clone, PartialEq)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

// ── Message types ──────────────────────────────────────────────────

/// Role of a message in the conversation.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
}

/// Message body: plain text, or a list of typed parts for multimodal input.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

/// One part of a multimodal user message.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

/// Image reference: an `http(s)` URL or a `data:image/...;base64,` URI.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ImageUrl {
    pub url: String,
}

/// A message in the conversation.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Message {
    pub role: MessageRole,
    pub content: MessageContent,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: MessageContent::Text(content.into()),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: MessageContent::Text(content.into()),
        }
    }

    pub fn user_parts(parts: Vec<ContentPart>) -> Self {
        Self {
            role: MessageRole::User,
            content: MessageContent::Parts(parts),
        }
    }

    /// The plain-text body, if this message is not multimodal.
    pub fn text(&self) -> Option<&str> {
        match &self.content {
            MessageContent::Text(t) => Some(t),
            MessageContent::Parts(_) => None,
        }
    }
}

impl ContentPart {
    pub fn text(text: impl Into<String>) -> Self {
        ContentPart::Text { text: text.into() }
    }

    pub fn image_url(url: impl Into<String>) -> Self {
        ContentPart::ImageUrl {
            image_url: ImageUrl { url: url.into() },
        }
    }
}

// ── Response types ─────────────────────────────────────────────────

/// Raw API response (internal deserialization target).
#[derive(Deserialize, Debug)]
struct RawChatResponse {
    id: Option<String>,
    choices: Option<Vec<RawChoice>>,
    error: Option<ApiErrorResponse>,
    #[serde(default)]
    usage: Option<UsageInfo>,
}

#[derive(Deserialize, Debug)]
struct RawChoice {
    message: RawResponseMessage,
    finish_reason: Option<String>,
}

#[derive(Deserialize, Debug)]
struct RawResponseMessage {
    content: Option<serde_json::Value>,
}

#[derive(Deserialize, Debug)]
struct ApiErrorResponse {
    #[serde(default)]
    code: Option<serde_json::Value>,
    message: String,
}

/// Clean return type from [`ZhipuClient::chat`].
#[derive(Debug, Clone, Default)]
pub struct ChatCompletion {
    /// Service-assigned completion ID.
    pub id: Option<String>,
    pub content: Option<String>,
    pub usage: Option<UsageInfo>,
    pub finish_reason: Option<String>,
}

/// Token usage statistics.
#[derive(Deserialize, Debug, Clone, Default)]
pub struct UsageInfo {
    pub prompt_tokens: Option<u32>,
    pub completion_tokens: Option<u32>,
    pub total_tokens: Option<u32>,
}

/// Response content as a string. Non-string content (rare, but the field is
/// loosely typed on the wire) is rendered as JSON text.
fn content_to_string(value: serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::Null => None,
        serde_json::Value::String(s) => Some(s),
        other => Some(other.to_string()),
    }
}

// ── Client ─────────────────────────────────────────────────────────

/// Async HTTP client for the Zhipu AI chat completions API.
pub struct ZhipuClient {
    pub(crate) client: reqwest::Client,
    pub(crate) auth_header: reqwest::header::HeaderValue,
    pub(crate) url: String,
}

impl std::fmt::Debug for ZhipuClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ZhipuClient")
            .field("url", &self.url)
            .finish_non_exhaustive()
    }
}

impl ZhipuClient {
    /// Create a client for the public endpoint.
    pub fn new(api_key: impl Into<String>) -> Result<Self, String> {
        Self::with_url(api_key, ZHIPU_CHAT_URL)
    }

    /// Create a client for a custom endpoint (proxies, test servers).
    pub fn with_url(api_key: impl Into<String>, url: impl Into<String>) -> Result<Self, String> {
        let api_key = api_key.into();
        let api_key = api_key.trim();
        if api_key.is_empty() {
            return Err("API key is empty".to_string());
        }
        let mut auth_header =
            reqwest::header::HeaderValue::from_str(&format!("Bearer {api_key}"))
                .map_err(|e| format!("API key is not a valid header value: {e}"))?;
        auth_header.set_sensitive(true);

        let client = reqwest::Client::builder()
            .user_agent("glm-nodes/0.1")
            .timeout(Duration::from_secs(120))
            .build()
            .map_err(|e| format!("failed to build HTTP client: {e}"))?;
        Ok(Self {
            client,
            auth_header,
            url: url.into(),
        })
    }

    /// Send a chat completion request. Attempted once; no retry.
    pub async fn chat(&self, body: &ChatRequest) -> Result<ChatCompletion, String> {
        debug!(
            "LLM request: model={}, messages={}, max_tokens={:?}, temp={:?}, top_p={:?}",
            body.model,
            body.messages.len(),
            body.max_tokens,
            body.temperature,
            body.top_p,
        );
        trace!(
            "Request payload size: {} bytes",
            serde_json::to_string(body).map_or(0, |s| s.len())
        );

        let start = Instant::now();

        let resp = self
            .client
            .post(&self.url)
            .header(reqwest::header::AUTHORIZATION, self.auth_header.clone())
            .json(body)
            .send()
            .await
            .map_err(|e| format!("request failed: {e}"))?;

        let status = resp.status();
        let text = resp
            .text()
            .await
            .map_err(|e| format!("failed to read response: {e}"))?;

        let elapsed = start.elapsed();
        debug!(
            "LLM response: HTTP {} in {:.1}s ({} bytes)",
            status,
            elapsed.as_secs_f64(),
            text.len()
        );

        if !status.is_success() {
            return Err(format!("Zhipu API HTTP {status}: {text}"));
        }

        parse_chat_response(&text)
    }
}

/// Decode a response body into a [`ChatCompletion`].
fn parse_chat_response(text: &str) -> Result<ChatCompletion, String> {
    let parsed: RawChatResponse =
        serde_json::from_str(text).map_err(|e| format!("failed to parse response: {e}"))?;

    if let Some(err) = parsed.error {
        return Err(match err.code.and_then(content_to_string) {
            Some(code) => format!("Zhipu API error {code}: {}", err.message),
            None => format!("Zhipu API error: {}", err.message),
        });
    }

    if let Some(ref usage) = parsed.usage {
        debug!(
            "Token usage: prompt={}, completion={}, total={}",
            usage.prompt_tokens.unwrap_or(0),
            usage.completion_tokens.unwrap_or(0),
            usage.total_tokens.unwrap_or(0),
        );
    }

    let choice = parsed.choices.and_then(|c| c.into_iter().next());

    match choice {
        Some(c) => Ok(ChatCompletion {
            id: parsed.id,
            content: c.message.content.and_then(content_to_string),
            usage: parsed.usage,
            finish_reason: c.finish_reason,
        }),
        None => {
            debug!("LLM output: empty (no choices)");
            Ok(ChatCompletion {
                id: parsed.id,
                content: None,
                usage: parsed.usage,
                finish_reason: None,
            })
        }
    }
}
