//! V8 JavaScript runtime using deno_core
//!
//! Each evaluation gets its own isolate with a heap ceiling and a watchdog
//! thread. Isolates are `!Send`, so the whole lifetime of an [`Interpreter`]
//! is confined to one blocking thread.

use crate::context::ENCODER_NAME;
use crate::engine::EngineHandle;
use crate::error::SandboxError;
use crate::limits::ResourceLimits;
use crate::Result;
use async_trait::async_trait;
use deno_core::{v8, JsRuntime, RuntimeOptions};
use serde_json::Value;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread::JoinHandle;

/// Extra heap granted once the ceiling is hit so termination can unwind
const HEAP_GRACE_BYTES: usize = 1024 * 1024;

static LIVE: AtomicUsize = AtomicUsize::new(0);

/// Number of interpreters currently alive in this process
pub fn live_interpreters() -> usize {
    LIVE.load(Ordering::SeqCst)
}

/// V8 JavaScript runtime
#[derive(Debug, Clone, Default)]
pub struct V8Runtime {
    /// Resource limits for execution
    limits: ResourceLimits,
}

impl V8Runtime {
    /// Create a new V8 runtime with the strict limits
    pub fn new() -> Self {
        Self::default()
    }

    /// Create V8 runtime with custom resource limits
    pub fn with_limits(limits: ResourceLimits) -> Self {
        Self { limits }
    }
}

#[async_trait]
impl super::Runtime for V8Runtime {
    async fn prepare(&self) -> Result<()> {
        EngineHandle::acquire().await.map(|_| ())
    }

    async fn evaluate(&self, program: String) -> Result<Value> {
        let limits = self.limits.clone();
        tokio::task::spawn_blocking(move || {
            let mut interpreter = Interpreter::new(limits);
            interpreter.run(program)
        })
        .await
        .map_err(|e| SandboxError::Internal(format!("interpreter thread failed: {e}")))?
    }

    fn limits(&self) -> &ResourceLimits {
        &self.limits
    }

    fn name(&self) -> &str {
        "v8"
    }
}

/// State for the near-heap-limit callback.
struct HeapLimitState {
    handle: v8::IsolateHandle,
    triggered: AtomicBool,
}

/// Terminates execution and grants a little headroom so the termination
/// exception can propagate instead of aborting the process.
extern "C" fn near_heap_limit_callback(
    data: *mut std::ffi::c_void,
    current_heap_limit: usize,
    _initial_heap_limit: usize,
) -> usize {
    // SAFETY: `data` points into the `Box<HeapLimitState>` owned by the
    // `Interpreter`, which drops its isolate before the box.
    let state = unsafe { &*(data as *const HeapLimitState) };
    if !state.triggered.swap(true, Ordering::SeqCst) {
        state.handle.terminate_execution();
    }
    current_heap_limit + HEAP_GRACE_BYTES
}

/// Terminates the isolate once the deadline passes unless stopped first
struct Watchdog {
    cancel: Option<mpsc::Sender<()>>,
    thread: Option<JoinHandle<()>>,
    fired: Arc<AtomicBool>,
}

impl Watchdog {
    fn start(handle: v8::IsolateHandle, deadline: std::time::Duration) -> Self {
        let (cancel_tx, cancel_rx) = mpsc::channel::<()>();
        let fired = Arc::new(AtomicBool::new(false));
        let watchdog_fired = fired.clone();

        let thread = std::thread::spawn(move || {
            if let Err(mpsc::RecvTimeoutError::Timeout) = cancel_rx.recv_timeout(deadline) {
                watchdog_fired.store(true, Ordering::SeqCst);
                handle.terminate_execution();
            }
        });

        Self {
            cancel: Some(cancel_tx),
            thread: Some(thread),
            fired,
        }
    }

    /// Cancel and wait for the thread. Idempotent.
    fn stop(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            let _ = cancel.send(());
        }
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }

    fn fired(&self) -> bool {
        self.fired.load(Ordering::SeqCst)
    }
}

impl Drop for Watchdog {
    fn drop(&mut self) {
        self.stop();
    }
}

/// One isolate, used for exactly one program and released on drop.
///
/// Field order matters: the isolate must be gone before the heap state its
/// callback points at.
struct Interpreter {
    runtime: JsRuntime,
    watchdog: Watchdog,
    heap: Box<HeapLimitState>,
    limits: ResourceLimits,
}

impl Interpreter {
    fn new(limits: ResourceLimits) -> Self {
        let create_params = v8::CreateParams::default().heap_limits(0, limits.max_memory_bytes);
        let mut runtime = JsRuntime::new(RuntimeOptions {
            create_params: Some(create_params),
            ..Default::default()
        });

        let heap = Box::new(HeapLimitState {
            handle: runtime.v8_isolate().thread_safe_handle(),
            triggered: AtomicBool::new(false),
        });
        runtime.v8_isolate().add_near_heap_limit_callback(
            near_heap_limit_callback,
            &*heap as *const HeapLimitState as *mut std::ffi::c_void,
        );

        let watchdog = Watchdog::start(
            runtime.v8_isolate().thread_safe_handle(),
            limits.max_duration,
        );

        let live = LIVE.fetch_add(1, Ordering::SeqCst) + 1;
        tracing::trace!(live, "Interpreter created");

        Self {
            runtime,
            watchdog,
            heap,
            limits,
        }
    }

    fn run(&mut self, program: String) -> Result<Value> {
        let outcome = self.evaluate(program);
        self.watchdog.stop();

        // Termination surfaces as a generic script error, so the flags win.
        if self.heap.triggered.load(Ordering::SeqCst) {
            return Err(SandboxError::MemoryLimit {
                limit_bytes: self.limits.max_memory_bytes,
            });
        }
        if self.watchdog.fired() {
            return Err(SandboxError::Timeout {
                timeout_ms: self.limits.deadline_ms(),
            });
        }
        outcome
    }

    fn evaluate(&mut self, program: String) -> Result<Value> {
        let completion = self
            .runtime
            .execute_script("[calcbox:snippet]", program)
            .map_err(|e| evaluation_error(&e.to_string()))?;

        let text = {
            let scope = &mut self.runtime.handle_scope();
            let value = v8::Local::new(scope, completion);
            let global = scope.get_current_context().global(scope);
            let key = v8::String::new(scope, ENCODER_NAME)
                .ok_or_else(|| SandboxError::Internal("cannot allocate encoder name".into()))?;
            let encoder = global
                .get(scope, key.into())
                .and_then(|f| v8::Local::<v8::Function>::try_from(f).ok())
                .ok_or_else(|| SandboxError::Internal("result encoder is missing".into()))?;
            let receiver = v8::undefined(scope).into();

            let scope = &mut v8::TryCatch::new(scope);
            match encoder.call(scope, receiver, &[value]) {
                Some(encoded) => encoded.to_rust_string_lossy(scope),
                None => {
                    let report = scope
                        .exception()
                        .map(|e| e.to_rust_string_lossy(scope))
                        .unwrap_or_else(|| "result encoding was interrupted".into());
                    return Err(evaluation_error(&report));
                }
            }
        };

        serde_json::from_str(&text)
            .map_err(|e| SandboxError::Internal(format!("result is not valid JSON: {e}")))
    }
}

impl Drop for Interpreter {
    fn drop(&mut self) {
        self.watchdog.stop();
        let live = LIVE.fetch_sub(1, Ordering::SeqCst) - 1;
        tracing::trace!(live, "Interpreter disposed");
    }
}

/// Reduce a V8 error report to its headline, e.g. `TypeError: x is undefined`.
fn evaluation_error(report: &str) -> SandboxError {
    let headline = report.lines().next().unwrap_or_default().trim();
    let message = headline.strip_prefix("Uncaught ").unwrap_or(headline);
    if message.is_empty() {
        SandboxError::evaluation(report.trim())
    } else {
        SandboxError::evaluation(message)
    }
}
