//! Sandbox service - main entry point

use crate::context::ExecutionContext;
use crate::error::SandboxError;
use crate::execution::{ExecutionId, ExecutionPhase, ExecutionTrace};
use crate::runtime::{Runtime, V8Runtime};
use crate::types::{ExecutionRequest, ExecutionResult};
use crate::validator;
use std::sync::Arc;
use std::time::Instant;

/// Runs validated snippets in isolated interpreters.
///
/// Every failure is folded into the returned [`ExecutionResult`]; nothing
/// escapes as an error.
#[derive(Clone)]
pub struct SandboxService {
    runtime: Arc<dyn Runtime>,
}

impl Default for SandboxService {
    fn default() -> Self {
        Self::new(V8Runtime::new())
    }
}

impl SandboxService {
    /// Create a new sandbox service with the given runtime
    pub fn new(runtime: impl Runtime + 'static) -> Self {
        Self {
            runtime: Arc::new(runtime),
        }
    }

    /// Execute a snippet against its payload
    pub async fn execute(&self, request: ExecutionRequest) -> ExecutionResult {
        self.execute_traced(request).await.0
    }

    /// Execute and also return the phase history
    pub async fn execute_traced(
        &self,
        request: ExecutionRequest,
    ) -> (ExecutionResult, ExecutionTrace) {
        let mut trace = ExecutionTrace::new(ExecutionId::new());
        let id = trace.id();

        tracing::info!(
            execution_id = %id,
            runtime = self.runtime.name(),
            code_len = request.code.len(),
            fields = request.data.len(),
            "Executing calculation"
        );

        trace.advance(ExecutionPhase::Validating);
        let program = match validator::validate(&request.code)
            .into_result()
            .and_then(|()| ExecutionContext::build(&request.data))
        {
            Ok(context) => context.render(&request.code),
            Err(err) => {
                trace.advance(ExecutionPhase::Rejected);
                tracing::warn!(execution_id = %id, error = %err, "Calculation rejected");
                return (ExecutionResult::rejected(&err), trace);
            }
        };

        trace.advance(ExecutionPhase::Initializing);
        if let Err(err) = self.runtime.prepare().await {
            trace.advance(ExecutionPhase::Failed);
            trace.advance(ExecutionPhase::Disposed);
            tracing::error!(execution_id = %id, error = %err, "Engine unavailable");
            return (ExecutionResult::failed(&err, None), trace);
        }

        trace.advance(ExecutionPhase::Evaluating);
        let started = Instant::now();
        let outcome = self.runtime.evaluate(program).await;
        let elapsed = started.elapsed();
        let elapsed_ms = elapsed.as_millis() as u64;

        let limits = self.runtime.limits();
        let outcome = match outcome {
            Ok(_) if elapsed > limits.max_duration => Err(SandboxError::Timeout {
                timeout_ms: limits.deadline_ms(),
            }),
            other => other,
        };

        let result = match outcome {
            Ok(value) => {
                trace.advance(ExecutionPhase::Succeeded);
                tracing::info!(execution_id = %id, elapsed_ms, "Calculation succeeded");
                ExecutionResult::succeeded(value, elapsed_ms)
            }
            Err(err) => {
                let phase = if err.is_timeout() {
                    ExecutionPhase::TimedOut
                } else {
                    ExecutionPhase::Failed
                };
                trace.advance(phase);
                tracing::warn!(
                    execution_id = %id,
                    elapsed_ms,
                    phase = %phase,
                    error = %err,
                    "Calculation failed"
                );
                ExecutionResult::failed(&err, Some(elapsed_ms))
            }
        };

        trace.advance(ExecutionPhase::Disposed);
        (result, trace)
    }
}
