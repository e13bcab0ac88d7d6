//! Error type for node invocations.
//!
//! Every variant is terminal for the invocation that produced it. Nodes
//! never return it to the host directly: [`NodeError::into_output`] renders
//! the `"Error: ..."` string that goes into the node's output slot.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NodeError {
    /// No API key in the node input, the environment, or `config.json`.
    #[error(
        "Zhipu AI API key not provided. Enter it in the node input, set the \
         ZHIPUAI_API_KEY environment variable, or add it to config.json."
    )]
    MissingApiKey,

    /// The HTTP client could not be built for the resolved key.
    #[error("failed to initialize the Zhipu AI client, check that the API key is valid: {0}")]
    ClientInit(String),

    /// The vision node got neither an image URL nor image data.
    #[error("an image URL or base64 image data is required")]
    MissingImage,

    /// A required text input was blank.
    #[error("{0} cannot be empty")]
    EmptyInput(&'static str),

    /// No node is registered under the requested name.
    #[error("unknown node '{name}'. Known nodes: {known}")]
    UnknownNode { name: String, known: String },

    /// Inputs failed to parse or validate against the node's schema.
    #[error("invalid inputs for node '{node}': {reason}")]
    InvalidInputs { node: String, reason: String },

    /// The remote call failed (network, auth, quota, malformed reply).
    #[error("{model} API call failed: {message}")]
    Api { model: String, message: String },
}

impl NodeError {
    /// Render as the node's output string.
    pub fn into_output(self) -> String {
        format!("Error: {self}")
    }
}
