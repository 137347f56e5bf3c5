//! JSON-RPC multiplexer over a child process's stdio: request/response
//! correlation keyed by raw ID bytes, bidirectional dispatch for
//! child-initiated requests, and safe startup/shutdown (spec §4.5).

pub mod client;
pub mod config;
pub mod error;
pub mod pending;

pub use client::Client;
pub use config::{ClientConfig, ClientInfo};
pub use error::RpcError;
