//! Resource limits for sandboxed execution

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Wall-clock budget for one evaluation
pub const EXECUTION_DEADLINE: Duration = Duration::from_millis(5_000);

/// V8 heap ceiling for one interpreter
pub const MEMORY_CEILING_BYTES: usize = 10 * 1024 * 1024;

/// Resource limits applied to every interpreter instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceLimits {
    /// Maximum execution time before the isolate is terminated
    pub max_duration: Duration,

    /// Maximum V8 heap size in bytes
    pub max_memory_bytes: usize,
}

impl Default for ResourceLimits {
    fn default() -> Self {
        Self::strict()
    }
}

impl ResourceLimits {
    /// Limits for untrusted calculation code (5 seconds, 10 MB)
    pub fn strict() -> Self {
        Self {
            max_duration: EXECUTION_DEADLINE,
            max_memory_bytes: MEMORY_CEILING_BYTES,
        }
    }

    /// Same heap ceiling with a different deadline
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.max_duration = deadline;
        self
    }

    pub fn deadline_ms(&self) -> u64 {
        self.max_duration.as_millis() as u64
    }
}
