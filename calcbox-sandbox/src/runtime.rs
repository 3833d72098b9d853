//! Runtime trait and implementations

mod v8;

use crate::limits::ResourceLimits;
use crate::Result;
use async_trait::async_trait;
use serde_json::Value;

pub use v8::{live_interpreters, V8Runtime};

/// Isolated interpreter backend
#[async_trait]
pub trait Runtime: Send + Sync {
    /// Make sure the underlying engine is loaded
    async fn prepare(&self) -> Result<()>;

    /// Evaluate a fully rendered program in a fresh interpreter and return its
    /// completion value as JSON
    async fn evaluate(&self, program: String) -> Result<Value>;

    /// Limits every interpreter created by this runtime is bound by
    fn limits(&self) -> &ResourceLimits;

    /// Get runtime name
    fn name(&self) -> &str;
}
