//! Process-wide V8 engine handle
//!
//! The first caller boots a probe isolate; everyone else, including callers
//! that arrive while that boot is still in flight, awaits the same result.

use crate::error::SandboxError;
use crate::Result;
use deno_core::{v8, JsRuntime, RuntimeOptions};
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::OnceCell;

static ENGINE: OnceCell<EngineHandle> = OnceCell::const_new();
static INITIALIZATIONS: AtomicUsize = AtomicUsize::new(0);

/// Proof that the V8 platform is up; a factory token for fresh interpreters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineHandle {
    version: String,
}

impl EngineHandle {
    /// Get the shared handle, initializing the engine on first use.
    ///
    /// A failed initialization is not memoized; the next caller retries.
    pub async fn acquire() -> Result<&'static EngineHandle> {
        ENGINE.get_or_try_init(Self::initialize).await
    }

    /// V8 version reported by the probe isolate
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Number of engine initializations that have run in this process
    pub fn initializations() -> usize {
        INITIALIZATIONS.load(Ordering::SeqCst)
    }

    async fn initialize() -> Result<EngineHandle> {
        INITIALIZATIONS.fetch_add(1, Ordering::SeqCst);
        tracing::debug!("Initializing V8 engine");

        let version = tokio::task::spawn_blocking(|| -> Result<String> {
            let mut probe = JsRuntime::new(RuntimeOptions::default());
            probe
                .execute_script("[calcbox:probe]", "1 + 1")
                .map_err(|e| SandboxError::EngineInit(e.to_string()))?;
            Ok(v8::V8::get_version().to_string())
        })
        .await
        .map_err(|e| SandboxError::EngineInit(format!("probe isolate crashed: {e}")))??;

        tracing::info!(v8_version = %version, "V8 engine ready");
        Ok(EngineHandle { version })
    }
}
