//! CLI command implementations
//!
//! Each command prints its JSON result to stdout and reports whether the
//! operation succeeded so `main` can pick the exit code.

use anyhow::{anyhow, bail, Context, Result};
use calcbox_common::CallToolParams;
use calcbox_sandbox::{validate, CalculationParams, CalculationTool, ToolRegistry};
use serde::Serialize;
use serde_json::{Map, Value};
use std::path::PathBuf;
use tracing::debug;

/// Where the snippet comes from
pub enum CodeSource {
    Inline(String),
    File(PathBuf),
}

/// Where the data payload comes from
pub enum DataSource {
    Inline(String),
    File(PathBuf),
    Empty,
}

pub fn print_json<T: Serialize>(value: &T, pretty: bool) -> Result<()> {
    let text = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    println!("{text}");
    Ok(())
}

fn read_code(source: CodeSource) -> Result<String> {
    match source {
        CodeSource::Inline(code) => Ok(code),
        CodeSource::File(path) => std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read code file {}", path.display())),
    }
}

fn read_data(source: DataSource) -> Result<Map<String, Value>> {
    let text = match source {
        DataSource::Inline(text) => text,
        DataSource::File(path) => std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read data file {}", path.display()))?,
        DataSource::Empty => return Ok(Map::new()),
    };
    parse_object(&text, "data")
}

fn parse_object(text: &str, what: &str) -> Result<Map<String, Value>> {
    let value: Value =
        serde_json::from_str(text).with_context(|| format!("{what} is not valid JSON"))?;
    match value {
        Value::Object(map) => Ok(map),
        other => bail!("{what} must be a JSON object, got {other}"),
    }
}

/// Run a snippet through `execute_calculation`
pub async fn execute_calculation(code: CodeSource, data: DataSource, pretty: bool) -> Result<bool> {
    let params = CalculationParams {
        code: read_code(code)?,
        data: read_data(data)?,
    };
    debug!(code_len = params.code.len(), fields = params.data.len(), "Running calculation");

    let response = CalculationTool::default().execute(params).await;
    print_json(&response, pretty)?;
    Ok(response.success)
}

/// Run only the static validator
pub fn execute_validate(code: String, pretty: bool) -> Result<bool> {
    let report = validate(&code);
    print_json(&report, pretty)?;
    Ok(report.valid)
}

/// List every registered tool
pub fn execute_list_tools(registry: &ToolRegistry, pretty: bool) -> Result<bool> {
    print_json(&registry.list(), pretty)?;
    Ok(true)
}

/// Dispatch a `tools/call` with JSON arguments
pub async fn execute_tool_call(
    registry: &ToolRegistry,
    name: String,
    arguments: Option<String>,
    pretty: bool,
) -> Result<bool> {
    let arguments = match arguments {
        Some(text) => Value::Object(parse_object(&text, "--args")?),
        None => Value::Object(Map::new()),
    };

    let result = registry
        .call(CallToolParams { name, arguments })
        .await
        .map_err(|e| anyhow!("{e} (code {})", e.to_jsonrpc().code))?;
    print_json(&result, pretty)?;
    Ok(!result.is_error)
}
