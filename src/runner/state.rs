//! Runner lifecycle and step results

use std::fmt;
use std::time::Duration;

/// Lifecycle of a [`TaskRunner`](super::TaskRunner).
///
/// `Terminated` is final; every other state can move to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskState {
    /// Constructed, or the step asked to stop. `start` spawns a worker.
    Idle,
    Running,
    /// Worker parked before its next iteration
    Suspended,
    Terminated,
}

impl TaskState {
    pub fn is_terminal(self) -> bool {
        self == TaskState::Terminated
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TaskState::Idle => "idle",
            TaskState::Running => "running",
            TaskState::Suspended => "suspended",
            TaskState::Terminated => "terminated",
        };
        f.write_str(name)
    }
}

/// What a step wants the worker to do next
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// Sleep the current delay, then run again
    Continue,
    /// Replace the delay, sleep it, then run again
    ContinueAfter(Duration),
    /// Leave the loop; the runner returns to `Idle`
    Stop,
}

impl From<bool> for StepOutcome {
    fn from(keep_going: bool) -> Self {
        if keep_going {
            StepOutcome::Continue
        } else {
            StepOutcome::Stop
        }
    }
}
