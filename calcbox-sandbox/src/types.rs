//! Core types for sandbox execution

use crate::error::SandboxError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Request to execute a snippet against a data payload
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExecutionRequest {
    /// The snippet to execute
    pub code: String,

    /// Fields exposed to the snippet as top-level constants
    #[serde(default)]
    pub data: Map<String, Value>,
}

impl ExecutionRequest {
    /// Create a request with an empty payload
    pub fn new(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            data: Map::new(),
        }
    }

    /// Add a data field
    pub fn with_field(mut self, name: impl Into<String>, value: Value) -> Self {
        self.data.insert(name.into(), value);
        self
    }

    /// Replace the whole payload
    pub fn with_data(mut self, data: Map<String, Value>) -> Self {
        self.data = data;
        self
    }
}

/// Outcome of one execution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionResult {
    pub success: bool,

    /// Returned value, absent on failure
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,

    /// Error message, absent on success
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Evaluation time in milliseconds, absent when rejected before evaluation
    #[serde(
        rename = "executionTime",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub execution_time_ms: Option<u64>,
}

impl ExecutionResult {
    pub fn succeeded(value: Value, execution_time_ms: u64) -> Self {
        Self {
            success: true,
            value: Some(value),
            error: None,
            execution_time_ms: Some(execution_time_ms),
        }
    }

    pub fn failed(error: &SandboxError, execution_time_ms: Option<u64>) -> Self {
        Self {
            success: false,
            value: None,
            error: Some(error.to_string()),
            execution_time_ms,
        }
    }

    /// Failure that happened before an interpreter was created
    pub fn rejected(error: &SandboxError) -> Self {
        Self::failed(error, None)
    }
}
