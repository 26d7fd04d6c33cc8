//! # Adapters Layer (Hexagonal Architecture)
//!
//! HTTP implementations of the outbound collaborator ports.

mod indexer_http;
mod json_rpc;
mod relay_http;

pub use indexer_http::HttpIndexerPoller;
pub use json_rpc::JsonRpcNodeClient;
pub use relay_http::HttpRelayClient;
