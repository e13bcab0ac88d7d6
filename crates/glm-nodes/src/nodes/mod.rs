//! Node abstraction for the host's graph runtime.
//!
//! The [`Node`] trait defines the interface every node implements: a
//! [`NodeDef`] describing its typed inputs (a JSON Schema with bounds and
//! defaults) and an async `invoke` method that takes the raw JSON inputs
//! and returns the node's single string output or a [`NodeError`]. Nodes are collected into a
//! [`NodeSet`] which handles lookup, definition export, and input
//! validation.
//!
//! The host sees [`Node::execute`], whose output is the model's response
//! text or an `"Error: ..."` string. Nothing is ever raised to the host.

pub mod text_chat;
pub mod translate;
pub mod vision;

pub use text_chat::TextChatNode;
pub use translate::TranslateNode;
pub use vision::VisionNode;

use crate::api::{ChatBackend, Connector};
use crate::config::{NodeConfig, NodePaths};
use crate::credential::{EnvLookup, process_env, resolve_api_key};
use crate::prompt::{BuiltinPrompt, PromptCatalog, PromptProfile};
use crate::{ChatRequest, NodeError};
use serde::Serialize;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tracing::{debug, error, info};

/// Boxed future returned by [`Node::execute`].
pub type NodeFuture<'a> = Pin<Box<dyn Future<Output = String> + Send + 'a>>;

/// Boxed future returned by [`Node::invoke`].
pub type NodeResultFuture<'a> =
    Pin<Box<dyn Future<Output = Result<String, NodeError>> + Send + 'a>>;

/// Node declaration exported to the host.
#[derive(Debug, Clone, Serialize)]
pub struct NodeDef {
    /// Stable identifier, e.g. `GLM_Text_Chat`.
    pub name: String,
    pub display_name: String,
    pub category: String,
    /// JSON Schema for the inputs object.
    pub inputs: serde_json::Value,
    /// Names of the output slots. Always one.
    pub return_names: Vec<String>,
}

/// A node the host can invoke.
pub trait Node: Send + Sync {
    fn definition(&self) -> NodeDef;

    /// Run the node with raw JSON inputs. Never panics on bad input.
    fn invoke(&self, inputs: &str) -> NodeResultFuture<'_>;

    /// Run the node for the host: the response text, or an `"Error: ..."`
    /// string.
    fn execute(&self, inputs: &str) -> NodeFuture<'_> {
        let result = self.invoke(inputs);
        Box::pin(async move { result.await.unwrap_or_else(NodeError::into_output) })
    }

    fn name(&self) -> String {
        self.definition().name
    }
}

// ── NodeContext ────────────────────────────────────────────────────

/// Everything a node needs besides its inputs: file locations, the
/// environment lookup, and the connector that builds API clients.
#[derive(Clone)]
pub struct NodeContext {
    pub paths: NodePaths,
    pub env: EnvLookup,
    pub connector: Arc<dyn Connector>,
}

impl fmt::Debug for NodeContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeContext")
            .field("paths", &self.paths)
            .finish_non_exhaustive()
    }
}

impl NodeContext {
    /// Context reading the real process environment.
    pub fn new(paths: NodePaths, connector: Arc<dyn Connector>) -> Self {
        Self {
            paths,
            env: process_env(),
            connector,
        }
    }

    /// Replace the environment lookup.
    pub fn with_env(mut self, env: EnvLookup) -> Self {
        self.env = env;
        self
    }

    /// Re-read `config.json`.
    pub fn load_config(&self) -> NodeConfig {
        NodeConfig::load(&self.paths.config())
    }

    /// Prompt sources for the node whose files are keyed `node_key`.
    pub fn prompt_profile(
        &self,
        node_key: &str,
        builtin_catalog: PromptCatalog,
        builtin_default: BuiltinPrompt,
    ) -> PromptProfile {
        PromptProfile {
            catalog_path: self.paths.catalog(node_key),
            template_path: self.paths.template(node_key),
            builtin_catalog,
            builtin_default,
        }
    }

    /// Resolve the API key and build a backend for it.
    pub fn connect(
        &self,
        explicit_key: &str,
        config: &NodeConfig,
    ) -> Result<Box<dyn ChatBackend>, NodeError> {
        let key =
            resolve_api_key(explicit_key, &self.env, config).ok_or(NodeError::MissingApiKey)?;
        debug!("API key taken from {}", key.source());
        self.connector
            .connect(key.expose())
            .map_err(NodeError::ClientInit)
    }
}

// ── NodeSet ────────────────────────────────────────────────────────

/// A collection of nodes dispatched by name, in registration order.
///
/// ```ignore
/// let nodes = NodeSet::new().with_glm_nodes(ctx);
/// let defs = nodes.definitions();
/// let out = nodes.execute("GLM_Translate", r#"{"text": "你好"}"#).await;
/// ```
pub struct NodeSet {
    nodes: Vec<Box<dyn Node>>,
    /// Whether to validate inputs against the node's schema first.
    validate_inputs: bool,
}

impl fmt::Debug for NodeSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeSet")
            .field("nodes", &self.names())
            .field("validate_inputs", &self.validate_inputs)
            .finish()
    }
}

impl Default for NodeSet {
    fn default() -> Self {
        Self::new()
    }
}

impl NodeSet {
    /// Create an empty set with input validation enabled.
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            validate_inputs: true,
        }
    }

    pub fn with_input_validation(mut self, enabled: bool) -> Self {
        self.validate_inputs = enabled;
        self
    }

    /// Register a node. Replaces any existing node with the same name.
    pub fn register(&mut self, node: impl Node + 'static) {
        let name = node.name();
        if let Some(slot) = self.nodes.iter_mut().find(|n| n.name() == name) {
            *slot = Box::new(node);
        } else {
            self.nodes.push(Box::new(node));
        }
    }

    /// Register a node (builder pattern).
    pub fn with(mut self, node: impl Node + 'static) -> Self {
        self.register(node);
        self
    }

    /// Register the text chat, vision, and translation nodes.
    pub fn with_glm_nodes(self, ctx: Arc<NodeContext>) -> Self {
        self.with(TextChatNode::new(ctx.clone()))
            .with(VisionNode::new(ctx.clone()))
            .with(TranslateNode::new(ctx))
    }

    pub fn get(&self, name: &str) -> Option<&dyn Node> {
        self.nodes
            .iter()
            .find(|n| n.name() == name)
            .map(|n| n.as_ref())
    }

    pub fn names(&self) -> Vec<String> {
        self.nodes.iter().map(|n| n.name()).collect()
    }

    pub fn definitions(&self) -> Vec<NodeDef> {
        self.nodes.iter().map(|n| n.definition()).collect()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Validate and run one node, keeping failures typed.
    pub async fn try_execute(&self, name: &str, inputs: &str) -> Result<String, NodeError> {
        let node = self.get(name).ok_or_else(|| NodeError::UnknownNode {
            name: name.to_string(),
            known: self.names().join(", "),
        })?;
        if self.validate_inputs
            && let Some(err) = validate_node_inputs(node, inputs)
        {
            return Err(err);
        }
        node.invoke(inputs).await
    }

    /// Validate and run one node. Always returns the node's output string.
    pub async fn execute(&self, name: &str, inputs: &str) -> String {
        self.try_execute(name, inputs)
            .await
            .unwrap_or_else(NodeError::into_output)
    }
}

// ── Helpers ────────────────────────────────────────────────────────

/// Validate raw inputs against the node's declared JSON Schema.
///
/// Returns `None` if valid.
pub fn validate_node_inputs(node: &dyn Node, inputs: &str) -> Option<NodeError> {
    let def = node.definition();
    let invalid = |reason: String| NodeError::InvalidInputs {
        node: def.name.clone(),
        reason,
    };

    let inputs = if inputs.trim().is_empty() { "{}" } else { inputs };
    let value: serde_json::Value = match serde_json::from_str(inputs) {
        Ok(v) => v,
        Err(e) => return Some(invalid(format!("inputs are not valid JSON: {e}"))),
    };

    let validator = match jsonschema::validator_for(&def.inputs) {
        Ok(v) => v,
        Err(_) => return None, // If schema itself is invalid, skip validation.
    };

    let errors: Vec<String> = validator
        .iter_errors(&value)
        .map(|e| format!("{}: {e}", e.instance_path()))
        .collect();

    if errors.is_empty() {
        None
    } else {
        Some(invalid(errors.join("; ")))
    }
}

/// Parse raw JSON inputs into a node's typed input struct.
pub fn parse_node_inputs<T: serde::de::DeserializeOwned>(
    node: &str,
    inputs: &str,
) -> Result<T, NodeError> {
    let inputs = if inputs.trim().is_empty() { "{}" } else { inputs };
    serde_json::from_str(inputs).map_err(|e| NodeError::InvalidInputs {
        node: node.to_string(),
        reason: e.to_string(),
    })
}

/// Schema for `T` with the effective preset names listed as `examples` on
/// the `preset` property, and the catalog file's first key as its
/// `default`. Without a usable catalog file the property has no default.
pub(crate) fn inputs_schema<T: schemars::JsonSchema>(
    profile: &PromptProfile,
) -> serde_json::Value {
    let mut schema = crate::json_schema_for::<T>();
    if let Some(preset) = schema
        .get_mut("properties")
        .and_then(|p| p.get_mut("preset"))
        .and_then(|p| p.as_object_mut())
    {
        let names: Vec<serde_json::Value> =
            profile.load_catalog().names().map(|n| n.into()).collect();
        preset.insert("examples".to_string(), names.into());
        match profile.default_preset() {
            Some(name) => preset.insert("default".to_string(), name.into()),
            None => preset.remove("default"),
        };
    }
    schema
}

/// The seed input is accepted for the host's sake and goes nowhere: it is
/// not sent to the service and nothing in the node reads it.
pub(crate) fn note_seed(node: &str, seed: u64) {
    debug!("[{node}] seed {seed} accepted, not forwarded to the model");
}

/// Send one request and return the response text.
pub(crate) async fn complete_text(
    node: &str,
    backend: &dyn ChatBackend,
    request: &ChatRequest,
) -> Result<String, NodeError> {
    info!("[{node}] calling model {}", request.model);
    match backend.complete(request).await {
        Ok(completion) => match completion.content {
            Some(text) => {
                info!(
                    "[{node}] response received ({} chars, finish_reason={})",
                    text.chars().count(),
                    completion.finish_reason.as_deref().unwrap_or("-")
                );
                Ok(text)
            }
            None => {
                error!("[{node}] response contained no content");
                Err(NodeError::Api {
                    model: request.model.clone(),
                    message: "response contained no content".to_string(),
                })
            }
        },
        Err(message) => {
            error!("[{node}] API call failed: {message}");
            Err(NodeError::Api {
                model: request.model.clone(),
                message,
            })
        }
    }
}

/// First `max` chars of `s`, with `...` if cut.
pub(crate) fn preview(s: &str, max: usize) -> String {
    let mut out: String = s.chars().take(max).collect();
    if s.chars().count() > max {
        out.push_str("...");
    }
    out
}
