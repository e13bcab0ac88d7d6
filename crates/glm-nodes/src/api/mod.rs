//! Seams between the nodes and the remote chat completions service.
//!
//! - [`backend`]: the [`ChatBackend`] trait (one request, one completion)
//!   and the [`Connector`] trait that turns a resolved API key into a
//!   backend. [`ZhipuConnector`] is the production implementation over
//!   [`ZhipuClient`](crate::ZhipuClient).

pub mod backend;

pub use backend::{ChatBackend, ChatFuture, Connector, ZhipuConnector};
