//! Shared protocol types for calcbox
//!
//! Tool descriptors, tool call envelopes and JSON-RPC messages exchanged with
//! the outer RPC layer. Transport framing lives elsewhere.

pub mod jsonrpc;
pub mod tools;

pub use jsonrpc::*;
pub use tools::*;
