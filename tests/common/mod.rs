//! Common test utilities shared across integration and E2E tests

use calcbox_sandbox::{
    CalculationTool, ExecutionRequest, ResourceLimits, SandboxService, ToolRegistry, V8Runtime,
};
use serde_json::{json, Map, Value};
use std::time::Duration;

/// Setup logging for tests
pub fn setup_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("calcbox_sandbox=debug")
        .with_test_writer()
        .try_init();
}

/// Service on the real V8 runtime with the production limits
pub fn service() -> SandboxService {
    SandboxService::new(V8Runtime::new())
}

/// Service whose deadline is short enough for timeout tests
pub fn fast_timeout_service(deadline: Duration) -> SandboxService {
    SandboxService::new(V8Runtime::with_limits(
        ResourceLimits::strict().with_deadline(deadline),
    ))
}

/// Registry holding only the calculation tool
pub fn registry() -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(CalculationTool::new(service()));
    registry
}

/// Turn a `json!({...})` literal into a payload map
pub fn payload(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        other => panic!("payload must be an object, got {other}"),
    }
}

pub fn request(code: &str, data: Value) -> ExecutionRequest {
    ExecutionRequest::new(code).with_data(payload(data))
}

/// The game catalog sample used across suites
pub fn sample_games() -> Value {
    json!([
        {"title": "Halo", "genre": "Action", "score": 85, "platform": {"name": "Xbox"}},
        {"title": "Persona", "genre": "RPG", "score": 90, "platform": {"name": "PlayStation"}},
        {"title": "Doom", "genre": "Action", "score": 80, "platform": {"name": "PC"}},
        {"title": "Tetris", "genre": "Puzzle", "score": 75}
    ])
}
