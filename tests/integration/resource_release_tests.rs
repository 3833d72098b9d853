//! Interpreter disposal across every exit path
//!
//! Lives in its own test binary so no other test creates interpreters while
//! the live count is observed.

use calcbox_sandbox::live_interpreters;
use calcbox_tests::common::{fast_timeout_service, request, setup_test_logging};
use serde_json::json;
use std::time::Duration;

#[tokio::test]
async fn test_repeated_runs_release_every_interpreter() {
    setup_test_logging();
    let service = fast_timeout_service(Duration::from_millis(250));
    let snippets = [
        ("return sum(data)", true),
        ("return data.nope.deeper", false),
        ("while (true) {}", false),
        ("eval('1')", false),
        ("throw new Error('explicit')", false),
    ];

    assert_eq!(live_interpreters(), 0);

    for round in 0..4 {
        for (code, should_succeed) in snippets {
            let result = service
                .execute(request(code, json!({"data": [1, 2, 3]})))
                .await;
            assert_eq!(result.success, should_succeed, "round {round}: {code}");
            assert_eq!(live_interpreters(), 0, "round {round}: {code} leaked");
        }
    }
}
