//! Integration tests for tool discovery and dispatch
//!
//! These tests verify that the registry:
//! - Lists the calculation tool with its schema
//! - Dispatches `tools/call` and marks failed runs with `isError`
//! - Maps protocol problems to JSON-RPC error codes
//! - Hosts tools other than the calculation tool

use assert_matches::assert_matches;
use async_trait::async_trait;
use calcbox_common::{codes, CallToolParams, JsonRpcRequest, RequestId, Tool};
use calcbox_sandbox::{ToolError, ToolHandler, ToolOutput};
use calcbox_tests::common::registry;
use serde_json::{json, Value};

/// Stand-in for the catalog fetch tool, which lives outside this workspace
struct CatalogStub;

#[async_trait]
impl ToolHandler for CatalogStub {
    fn descriptor(&self) -> Tool {
        Tool::new(
            "fetch_catalog",
            "Fetch catalog data",
            json!({"type": "object", "properties": {}, "required": []}),
        )
    }

    async fn call(&self, _arguments: Value) -> Result<ToolOutput, ToolError> {
        Ok(ToolOutput {
            payload: json!({"items": []}),
            is_error: false,
        })
    }
}

#[test]
fn test_list_exposes_calculation_tool() {
    let tools = registry().list().tools;
    assert_eq!(tools.len(), 1);
    let tool = &tools[0];
    assert_eq!(tool.name, "execute_calculation");
    assert_eq!(tool.required_params(), vec!["code", "data"]);
    assert!(tool.description.contains("groupBy"));
}

#[tokio::test]
async fn test_call_success_is_not_error() {
    let result = registry()
        .call(CallToolParams {
            name: "execute_calculation".into(),
            arguments: json!({"code": "return max(values)", "data": {"values": [3, 9, 4]}}),
        })
        .await
        .unwrap();

    assert!(!result.is_error);
    let body = result.json().unwrap();
    assert_eq!(body["result"], json!(9));
    assert_eq!(body["success"], json!(true));
}

#[tokio::test]
async fn test_call_failure_sets_is_error() {
    let result = registry()
        .call(CallToolParams {
            name: "execute_calculation".into(),
            arguments: json!({"code": "require('fs')", "data": {}}),
        })
        .await
        .unwrap();

    assert!(result.is_error);
    let body = result.json().unwrap();
    assert_eq!(body["result"], Value::Null);
    assert!(body.get("executionTime").is_none());
}

#[tokio::test]
async fn test_unknown_tool_is_invalid_params() {
    let response = registry()
        .handle(JsonRpcRequest::new(
            RequestId::Number(3),
            "tools/call",
            Some(json!({"name": "no_such_tool", "arguments": {}})),
        ))
        .await;

    assert_eq!(response.id, RequestId::Number(3));
    let error = response.error.unwrap();
    assert_eq!(error.code, codes::INVALID_PARAMS);
    assert!(error.message.contains("no_such_tool"));
}

#[tokio::test]
async fn test_missing_data_argument_is_invalid_params() {
    let err = registry()
        .call(CallToolParams {
            name: "execute_calculation".into(),
            arguments: json!({"code": "return 1"}),
        })
        .await
        .unwrap_err();
    assert_matches!(err, ToolError::InvalidParams(_));
}

#[tokio::test]
async fn test_tools_call_without_params() {
    let response = registry()
        .handle(JsonRpcRequest::new(
            RequestId::String("a".into()),
            "tools/call",
            None,
        ))
        .await;
    assert_eq!(response.error.unwrap().code, codes::INVALID_PARAMS);
}

#[tokio::test]
async fn test_registry_hosts_external_tools() {
    let mut registry = registry();
    registry.register(CatalogStub);

    let names: Vec<_> = registry.list().tools.into_iter().map(|t| t.name).collect();
    assert_eq!(names, vec!["execute_calculation", "fetch_catalog"]);

    let result = registry
        .call(CallToolParams {
            name: "fetch_catalog".into(),
            arguments: json!({}),
        })
        .await
        .unwrap();
    assert_eq!(result.json(), Some(json!({"items": []})));
}
