//! Error taxonomy for sandboxed execution

use thiserror::Error;

/// Everything that can go wrong between receiving a snippet and returning its value.
///
/// None of these escape the [`SandboxService`](crate::SandboxService): they are
/// folded into an [`ExecutionResult`](crate::ExecutionResult) at that boundary.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SandboxError {
    /// Snippet was empty, matched the denylist, or the payload used a reserved name
    #[error("Validation failed: {}", .0.join(", "))]
    Validation(Vec<String>),

    /// Snippet ran and threw inside the interpreter
    #[error("{message}")]
    Evaluation { message: String },

    #[error("Execution timeout: exceeded {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("Memory limit exceeded: {limit_bytes} bytes")]
    MemoryLimit { limit_bytes: usize },

    #[error("Engine initialization failed: {0}")]
    EngineInit(String),

    #[error("Sandbox internal error: {0}")]
    Internal(String),
}

impl SandboxError {
    pub fn evaluation(message: impl Into<String>) -> Self {
        SandboxError::Evaluation {
            message: message.into(),
        }
    }

    /// Whether the error was raised before any interpreter existed
    pub fn is_rejection(&self) -> bool {
        matches!(self, SandboxError::Validation(_))
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, SandboxError::Timeout { .. })
    }
}
