//! Tool facade over the sandbox service
//!
//! [`CalculationTool`] exposes `execute_calculation`; [`ToolRegistry`] answers
//! `tools/list` and `tools/call` for any set of [`ToolHandler`]s.

use crate::helpers;
use crate::service::SandboxService;
use crate::types::{ExecutionRequest, ExecutionResult};
use async_trait::async_trait;
use calcbox_common::jsonrpc::{JsonRpcError, JsonRpcRequest, JsonRpcResponse};
use calcbox_common::tools::{CallToolParams, CallToolResult, Content, ListToolsResult, Tool};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;

/// Protocol-level failures, as opposed to a tool reporting an unsuccessful run
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Invalid params: {0}")]
    InvalidParams(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ToolError {
    /// JSON-RPC error object for this failure
    pub fn to_jsonrpc(&self) -> JsonRpcError {
        match self {
            ToolError::UnknownTool(_) | ToolError::InvalidParams(_) => {
                JsonRpcError::invalid_params(self.to_string())
            }
            ToolError::Serialization(_) => JsonRpcError::internal(self.to_string()),
        }
    }
}

/// What a tool produced: a JSON payload and whether it represents a failure
#[derive(Debug, Clone, PartialEq)]
pub struct ToolOutput {
    pub payload: Value,
    pub is_error: bool,
}

/// A callable tool
#[async_trait]
pub trait ToolHandler: Send + Sync {
    fn descriptor(&self) -> Tool;

    async fn call(&self, arguments: Value) -> Result<ToolOutput, ToolError>;
}

/// Arguments of `execute_calculation`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalculationParams {
    pub code: String,
    pub data: Map<String, Value>,
}

/// Response body of `execute_calculation`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalculationResponse {
    /// Computed value, `null` on failure
    pub result: Value,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(
        rename = "executionTime",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub execution_time_ms: Option<u64>,
}

impl From<ExecutionResult> for CalculationResponse {
    fn from(result: ExecutionResult) -> Self {
        if result.success {
            Self {
                result: result.value.unwrap_or(Value::Null),
                success: true,
                error: None,
                execution_time_ms: result.execution_time_ms,
            }
        } else {
            Self {
                result: Value::Null,
                success: false,
                error: result.error,
                execution_time_ms: result.execution_time_ms,
            }
        }
    }
}

/// `execute_calculation`: run a snippet against caller data in the sandbox
#[derive(Clone, Default)]
pub struct CalculationTool {
    service: SandboxService,
}

impl CalculationTool {
    pub const NAME: &'static str = "execute_calculation";

    pub fn new(service: SandboxService) -> Self {
        Self { service }
    }

    /// Forward to the sandbox and reshape the outcome. Never retries.
    pub async fn execute(&self, params: CalculationParams) -> CalculationResponse {
        let request = ExecutionRequest {
            code: params.code,
            data: params.data,
        };
        self.service.execute(request).await.into()
    }

    fn description() -> String {
        format!(
            "Execute a JavaScript snippet against the provided data inside an isolated \
             sandbox (5 second timeout, 10 MB memory). Each key of `data` is available as a \
             top-level constant. Use `return` to produce the result. Helper functions:\n{}",
            helpers::describe()
        )
    }
}

#[async_trait]
impl ToolHandler for CalculationTool {
    fn descriptor(&self) -> Tool {
        Tool::new(
            Self::NAME,
            Self::description(),
            json!({
                "type": "object",
                "properties": {
                    "code": {
                        "type": "string",
                        "description": "JavaScript code to execute; use `return` for the result"
                    },
                    "data": {
                        "type": "object",
                        "description": "Values exposed to the code as top-level constants"
                    }
                },
                "required": ["code", "data"]
            }),
        )
    }

    async fn call(&self, arguments: Value) -> Result<ToolOutput, ToolError> {
        let params: CalculationParams = serde_json::from_value(arguments)
            .map_err(|e| ToolError::InvalidParams(format!("{}: {e}", Self::NAME)))?;
        let response = self.execute(params).await;
        Ok(ToolOutput {
            is_error: !response.success,
            payload: serde_json::to_value(&response)?,
        })
    }
}

/// Name-indexed set of tools
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: BTreeMap<String, Arc<dyn ToolHandler>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the calculation tool on the default sandbox
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(CalculationTool::default());
        registry
    }

    /// Register a tool, replacing any tool with the same name
    pub fn register(&mut self, tool: impl ToolHandler + 'static) {
        let name = tool.descriptor().name;
        tracing::debug!(tool = %name, "Registering tool");
        self.tools.insert(name, Arc::new(tool));
    }

    pub fn list(&self) -> ListToolsResult {
        ListToolsResult {
            tools: self.tools.values().map(|tool| tool.descriptor()).collect(),
        }
    }

    pub async fn call(&self, params: CallToolParams) -> Result<CallToolResult, ToolError> {
        let tool = self
            .tools
            .get(&params.name)
            .ok_or_else(|| ToolError::UnknownTool(params.name.clone()))?;

        tracing::debug!(tool = %params.name, "Calling tool");
        let output = tool.call(params.arguments).await?;
        let text = serde_json::to_string_pretty(&output.payload)?;
        let content = vec![Content::text(text)];

        Ok(if output.is_error {
            CallToolResult::error(content)
        } else {
            CallToolResult::success(content)
        })
    }

    /// Dispatch a JSON-RPC request for `tools/list` or `tools/call`
    pub async fn handle(&self, request: JsonRpcRequest) -> JsonRpcResponse {
        let id = request.id.clone();
        let outcome = match request.method.as_str() {
            "tools/list" => serde_json::to_value(self.list()).map_err(ToolError::from),
            "tools/call" => match request.params {
                Some(params) => match serde_json::from_value::<CallToolParams>(params) {
                    Ok(params) => self
                        .call(params)
                        .await
                        .and_then(|result| serde_json::to_value(result).map_err(ToolError::from)),
                    Err(e) => Err(ToolError::InvalidParams(e.to_string())),
                },
                None => Err(ToolError::InvalidParams("missing params".into())),
            },
            other => {
                tracing::warn!(method = other, "Unknown method");
                return JsonRpcResponse::failure(id, JsonRpcError::method_not_found(other));
            }
        };

        match outcome {
            Ok(result) => JsonRpcResponse::success(id, result),
            Err(err) => JsonRpcResponse::failure(id, err.to_jsonrpc()),
        }
    }
}
