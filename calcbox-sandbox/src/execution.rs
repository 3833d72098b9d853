//! Execution identity and lifecycle tracking

use serde::{Deserialize, Serialize};

/// Unique execution identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExecutionId(pub uuid::Uuid);

impl ExecutionId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl Default for ExecutionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ExecutionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle of a single invocation
///
/// ```text
/// Received -> Validating -> Rejected
///                        -> Initializing -> Evaluating -> Succeeded | Failed | TimedOut -> Disposed
/// ```
///
/// `Initializing` may also fail directly when the engine cannot be loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionPhase {
    Received,
    Validating,
    Rejected,
    Initializing,
    Evaluating,
    Succeeded,
    Failed,
    TimedOut,
    Disposed,
}

impl ExecutionPhase {
    pub fn can_transition_to(self, next: ExecutionPhase) -> bool {
        use ExecutionPhase::*;
        matches!(
            (self, next),
            (Received, Validating)
                | (Validating, Rejected)
                | (Validating, Initializing)
                | (Initializing, Evaluating)
                | (Initializing, Failed)
                | (Evaluating, Succeeded)
                | (Evaluating, Failed)
                | (Evaluating, TimedOut)
                | (Succeeded, Disposed)
                | (Failed, Disposed)
                | (TimedOut, Disposed)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, ExecutionPhase::Rejected | ExecutionPhase::Disposed)
    }
}

impl std::fmt::Display for ExecutionPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ExecutionPhase::Received => "received",
            ExecutionPhase::Validating => "validating",
            ExecutionPhase::Rejected => "rejected",
            ExecutionPhase::Initializing => "initializing",
            ExecutionPhase::Evaluating => "evaluating",
            ExecutionPhase::Succeeded => "succeeded",
            ExecutionPhase::Failed => "failed",
            ExecutionPhase::TimedOut => "timed_out",
            ExecutionPhase::Disposed => "disposed",
        };
        f.write_str(name)
    }
}

/// Phase history of one invocation
#[derive(Debug, Clone)]
pub struct ExecutionTrace {
    id: ExecutionId,
    history: Vec<ExecutionPhase>,
}

impl ExecutionTrace {
    pub fn new(id: ExecutionId) -> Self {
        Self {
            id,
            history: vec![ExecutionPhase::Received],
        }
    }

    pub fn id(&self) -> ExecutionId {
        self.id
    }

    pub fn phase(&self) -> ExecutionPhase {
        self.history
            .last()
            .copied()
            .unwrap_or(ExecutionPhase::Received)
    }

    pub fn history(&self) -> &[ExecutionPhase] {
        &self.history
    }

    /// Whether the invocation ever reached the interpreter
    pub fn created_interpreter(&self) -> bool {
        self.history.contains(&ExecutionPhase::Evaluating)
    }

    /// Move to the next phase. Illegal transitions are logged and ignored.
    pub fn advance(&mut self, next: ExecutionPhase) {
        let current = self.phase();
        if !current.can_transition_to(next) {
            tracing::error!(
                execution_id = %self.id,
                from = %current,
                to = %next,
                "Illegal execution phase transition"
            );
            debug_assert!(false, "illegal transition {current} -> {next}");
            return;
        }
        tracing::trace!(execution_id = %self.id, from = %current, to = %next, "Phase transition");
        self.history.push(next);
    }
}
