//! Integration tests for the sandbox service on the V8 runtime
//!
//! These tests verify that the service:
//! - Runs snippets with helpers and caller data in scope
//! - Returns from inside top-level `if`, `try`, and loop blocks
//! - Hides embedding globals and encodes results with untampered builtins
//! - Surfaces evaluation errors without a value
//! - Keeps floating-point semantics for division by zero
//! - Enforces the deadline and reports timeouts
//! - Shares one engine initialization across concurrent first callers

use calcbox_sandbox::{EngineHandle, ExecutionPhase, SandboxError};
use calcbox_tests::common::{
    fast_timeout_service, request, sample_games, service, setup_test_logging,
};
use serde_json::json;
use std::time::Duration;

#[tokio::test]
async fn test_average_of_data() {
    setup_test_logging();
    let result = service()
        .execute(request(
            "return data.reduce((a, b) => a + b, 0) / data.length",
            json!({"data": [1, 2, 3, 4, 5]}),
        ))
        .await;

    assert!(result.success, "{:?}", result.error);
    assert_eq!(result.value, Some(json!(3)));
    assert!(result.error.is_none());
    assert!(result.execution_time_ms.is_some());
}

#[tokio::test]
async fn test_helpers_are_in_scope() {
    let result = service()
        .execute(request(
            "return { avg: avg(scores), top: max(scores), low: min(scores), total: sum(scores) }",
            json!({"scores": [10, 20, 30, 40, 50]}),
        ))
        .await;

    assert_eq!(
        result.value,
        Some(json!({"avg": 30, "top": 50, "low": 10, "total": 150}))
    );
}

#[tokio::test]
async fn test_group_by_and_aggregate() {
    let code = r#"
        const groups = groupBy(games, 'genre');
        const out = {};
        for (const genre of Object.keys(groups)) {
            out[genre] = avg(groups[genre].map(g => g.score));
        }
        return out;
    "#;
    let result = service()
        .execute(request(code, json!({"games": sample_games()})))
        .await;

    assert!(result.success, "{:?}", result.error);
    assert_eq!(
        result.value,
        Some(json!({"Action": 82.5, "RPG": 90, "Puzzle": 75}))
    );
}

#[tokio::test]
async fn test_returns_inside_statement_blocks() {
    let cases = [
        (
            "if (data.length > 0) { return avg(data) } else { return 0 }",
            json!({"data": [2, 4]}),
            json!(3),
        ),
        (
            "if (data.length > 0) { return avg(data) } else { return 0 }",
            json!({"data": []}),
            json!(0),
        ),
        (
            "try { return JSON.parse(text) } catch (e) { return null }",
            json!({"text": "{\"a\": 1}"}),
            json!({"a": 1}),
        ),
        (
            "try { return JSON.parse(text) } catch (e) { return null }",
            json!({"text": "not json"}),
            json!(null),
        ),
        (
            "for (const g of games) { if (g.score > 88) { return g.title } }\nreturn 'none'",
            json!({"games": sample_games()}),
            json!("Persona"),
        ),
    ];

    for (code, data, expected) in cases {
        let result = service().execute(request(code, data)).await;
        assert!(result.success, "{code}: {:?}", result.error);
        assert_eq!(result.value, Some(expected), "{code}");
    }
}

#[tokio::test]
async fn test_regex_literal_before_return() {
    let result = service()
        .execute(request(
            "const quoted = names.filter(s => /'/.test(s)).length;\nreturn quoted",
            json!({"names": ["o'neil", "smith", "d'arcy"]}),
        ))
        .await;

    assert!(result.success, "{:?}", result.error);
    assert_eq!(result.value, Some(json!(2)));
}

#[tokio::test]
async fn test_embedding_globals_are_removed() {
    let result = service()
        .execute(request(
            "return [typeof Deno, typeof __bootstrap, typeof globalThis.Deno]",
            json!({}),
        ))
        .await;

    assert!(result.success, "{:?}", result.error);
    assert_eq!(
        result.value,
        Some(json!(["undefined", "undefined", "undefined"]))
    );
}

#[tokio::test]
async fn test_result_encoding_ignores_reassigned_builtins() {
    let result = service()
        .execute(request(
            "JSON.stringify = () => 'tampered'; __calcboxEncode = null; return { n: max(data) }",
            json!({"data": [4, 8, 1]}),
        ))
        .await;

    assert!(result.success, "{:?}", result.error);
    assert_eq!(result.value, Some(json!({"n": 8})));
}

#[tokio::test]
async fn test_undefined_access_fails_without_value() {
    let result = service()
        .execute(request("return data.missing.field", json!({"data": {}})))
        .await;

    assert!(!result.success);
    assert!(result.value.is_none());
    let error = result.error.unwrap();
    assert!(error.contains("TypeError"), "{error}");
    assert!(result.execution_time_ms.is_some());
}

#[tokio::test]
async fn test_division_by_zero_yields_infinity() {
    let result = service()
        .execute(request(
            "return numerator / denominator",
            json!({"numerator": 7, "denominator": 0}),
        ))
        .await;

    assert!(result.success);
    assert_eq!(result.value, Some(json!("Infinity")));
}

#[tokio::test]
async fn test_infinite_loop_times_out() {
    setup_test_logging();
    let service = fast_timeout_service(Duration::from_millis(300));
    let (result, trace) = service
        .execute_traced(request("while (true) {}", json!({})))
        .await;

    assert!(!result.success);
    assert!(result.value.is_none());
    assert_eq!(
        result.error.as_deref(),
        Some("Execution timeout: exceeded 300ms")
    );
    assert!(trace.history().contains(&ExecutionPhase::TimedOut));
    assert_eq!(trace.phase(), ExecutionPhase::Disposed);
}

#[tokio::test]
async fn test_memory_ceiling() {
    let result = service()
        .execute(request(
            "const chunks = []; while (true) { chunks.push(new Array(100000).fill(0.5)); }",
            json!({}),
        ))
        .await;

    assert!(!result.success);
    let expected = SandboxError::MemoryLimit {
        limit_bytes: 10 * 1024 * 1024,
    }
    .to_string();
    assert_eq!(result.error.as_deref(), Some(expected.as_str()));
}

#[tokio::test]
async fn test_payload_is_observed_as_submitted() {
    let data = json!({
        "count": 12,
        "price": 19.99,
        "id": "0042",
        "tags": ["a", "b"],
        "owner": {"name": "x", "active": true, "meta": null}
    });
    let result = service()
        .execute(request(
            "return { count, price, id, tags, owner, types: [typeof count, typeof id] }",
            data.clone(),
        ))
        .await;

    let value = result.value.unwrap();
    for (key, expected) in data.as_object().unwrap() {
        assert_eq!(&value[key], expected, "field {key}");
    }
    assert_eq!(value["types"], json!(["number", "string"]));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_first_acquire_is_single_flight() {
    let tasks: Vec<_> = (0..16)
        .map(|_| tokio::spawn(EngineHandle::acquire()))
        .collect();

    let mut handles = Vec::new();
    for task in tasks {
        handles.push(task.await.unwrap().unwrap());
    }

    assert!(handles.iter().all(|h| std::ptr::eq(*h, handles[0])));
    assert_eq!(EngineHandle::initializations(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_executions_are_independent() {
    let service = service();
    let tasks: Vec<_> = (0..6)
        .map(|i| {
            let service = service.clone();
            tokio::spawn(async move {
                service
                    .execute(request("return n * n", json!({"n": i})))
                    .await
            })
        })
        .collect();

    for (i, task) in tasks.into_iter().enumerate() {
        let result = task.await.unwrap();
        assert_eq!(result.value, Some(json!(i * i)));
    }
}
