//! Backend abstraction for chat completion calls.
//!
//! Nodes never talk to [`ZhipuClient`] directly. They ask a [`Connector`]
//! for a [`ChatBackend`] once the API key is known, which keeps credential
//! handling, client construction, and the single remote call separately
//! testable.

use crate::{ChatCompletion, ChatRequest, ZHIPU_CHAT_URL, ZhipuClient};
use std::future::Future;
use std::pin::Pin;

/// Boxed future returned by [`ChatBackend::complete`].
pub type ChatFuture<'a> =
    Pin<Box<dyn Future<Output = Result<ChatCompletion, String>> + Send + 'a>>;

/// A service that answers one chat completion request.
///
/// Uses a boxed future so the trait is dyn-compatible.
pub trait ChatBackend: Send + Sync {
    fn complete<'a>(&'a self, request: &'a ChatRequest) -> ChatFuture<'a>;
}

impl ChatBackend for ZhipuClient {
    fn complete<'a>(&'a self, request: &'a ChatRequest) -> ChatFuture<'a> {
        Box::pin(self.chat(request))
    }
}

/// Builds a [`ChatBackend`] for a resolved API key.
///
/// Returning `Err` reports a client initialization failure; the node turns
/// it into an `"Error: ..."` output without attempting the call.
pub trait Connector: Send + Sync {
    fn connect(&self, api_key: &str) -> Result<Box<dyn ChatBackend>, String>;
}

/// [`Connector`] for the Zhipu AI chat completions endpoint.
#[derive(Debug, Clone)]
pub struct ZhipuConnector {
    url: String,
}

impl ZhipuConnector {
    pub fn new() -> Self {
        Self::with_url(ZHIPU_CHAT_URL)
    }

    pub fn with_url(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl Default for ZhipuConnector {
    fn default() -> Self {
        Self::new()
    }
}

impl Connector for ZhipuConnector {
    fn connect(&self, api_key: &str) -> Result<Box<dyn ChatBackend>, String> {
        let client = ZhipuClient::with_url(api_key, self.url.clone())?;
        Ok(Box::new(client))
    }
}
