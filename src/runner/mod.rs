//! Background task execution
//!
//! [`TaskRunner`] drives a repeating step on its own thread with start,
//! suspend and terminate control. The free functions accept an optional
//! runner so callers holding `Option<TaskRunner>` need no matching.

pub mod state;
pub mod task;

pub use state::{StepOutcome, TaskState};
pub use task::TaskRunner;

/// Start or resume `runner`; `None` does nothing
pub fn start(runner: Option<&TaskRunner>) {
    if let Some(runner) = runner {
        runner.start();
    }
}

/// Suspend `runner`; `None` does nothing
pub fn stop(runner: Option<&TaskRunner>) {
    if let Some(runner) = runner {
        runner.suspend();
    }
}
