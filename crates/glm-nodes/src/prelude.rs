//! Convenience re-exports for common `glm-nodes` types.
//!
//! ```ignore
//! use glm_nodes::prelude::*;
//! ```

// ── Core types ──────────────────────────────────────────────────────
pub use crate::{
    ChatCompletion, ChatRequest, ContentPart, Message, NodeError, ZhipuClient, json_schema_for,
};

// ── Backends ────────────────────────────────────────────────────────
pub use crate::api::{ChatBackend, ChatFuture, Connector, ZhipuConnector};

// ── Configuration and credentials ───────────────────────────────────
pub use crate::config::{NodeConfig, NodePaths};
pub use crate::credential::{ApiKey, CredentialSource, EnvLookup, resolve_api_key};

// ── Prompts ─────────────────────────────────────────────────────────
pub use crate::prompt::{
    BuiltinPrompt, PromptCatalog, PromptProfile, PromptSource, ResolvedPrompt, resolve,
};

// ── Nodes ───────────────────────────────────────────────────────────
pub use crate::image::ImageInput;
pub use crate::nodes::{
    Node, NodeContext, NodeDef, NodeFuture, NodeResultFuture, NodeSet, TextChatNode,
    TranslateNode, VisionNode,
};
