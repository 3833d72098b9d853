//! Calcbox sandbox - isolated execution of calculation snippets
//!
//! Validates caller-supplied JavaScript against a denylist, injects the helper
//! library and caller data, and evaluates the result inside a fresh,
//! memory- and time-bounded V8 isolate. Every outcome is normalized into an
//! [`ExecutionResult`]; the [`CalculationTool`] adapts it to the tool-call
//! protocol.

mod context;
mod engine;
mod error;
mod execution;
mod helpers;
mod limits;
mod runtime;
mod service;
mod tool;
mod types;
mod validator;

pub use context::ExecutionContext;
pub use engine::EngineHandle;
pub use error::SandboxError;
pub use execution::{ExecutionId, ExecutionPhase, ExecutionTrace};
pub use helpers::{HelperFunction, HELPERS};
pub use limits::{ResourceLimits, EXECUTION_DEADLINE, MEMORY_CEILING_BYTES};
pub use runtime::{live_interpreters, Runtime, V8Runtime};
pub use service::SandboxService;
pub use tool::{
    CalculationParams, CalculationResponse, CalculationTool, ToolError, ToolHandler, ToolOutput,
    ToolRegistry,
};
pub use types::{ExecutionRequest, ExecutionResult};
pub use validator::{validate, PatternCategory, ValidationReport};

/// Re-export common error types
pub type Result<T> = std::result::Result<T, SandboxError>;
