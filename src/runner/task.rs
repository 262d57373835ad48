//! Cancellable periodic task on a dedicated worker thread

use super::state::{StepOutcome, TaskState};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, error, info, warn};

type Step = Box<dyn FnMut(Duration) -> anyhow::Result<StepOutcome> + Send>;

/// State shared between the controlling side and the worker
struct Shared {
    name: String,
    state: Mutex<TaskState>,
    signal: Condvar,
    iterations: AtomicU64,
    failures: AtomicU64,
    last_failure: Mutex<Option<String>>,
}

impl Shared {
    fn lock_state(&self) -> MutexGuard<'_, TaskState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn record_failure(&self, message: String) {
        self.failures.fetch_add(1, Ordering::SeqCst);
        warn!(task = %self.name, error = %message, "Task step failed");
        *self
            .last_failure
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(message);
    }

    /// Park while suspended. Returns `false` once the worker should exit.
    fn wait_for_run(&self) -> bool {
        let state = self.lock_state();
        let state = self
            .signal
            .wait_while(state, |s| *s == TaskState::Suspended)
            .unwrap_or_else(PoisonError::into_inner);
        *state == TaskState::Running
    }

    /// Sleep `delay`, cut short by any state change
    fn pause(&self, delay: Duration) {
        let state = self.lock_state();
        let _ = self
            .signal
            .wait_timeout_while(state, delay, |s| *s == TaskState::Running)
            .unwrap_or_else(PoisonError::into_inner);
    }
}

/// Periodic task with start, suspend and terminate control.
///
/// A single worker thread invokes the step, sleeps the current delay and
/// repeats. Control requests are observed between iterations; an iteration
/// that is already running always completes. A failing or panicking step is
/// recorded and the loop carries on.
pub struct TaskRunner {
    shared: Arc<Shared>,
    step: Arc<Mutex<Step>>,
    delay: Duration,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl TaskRunner {
    /// Runner whose step sees the current delay and may change it or stop
    pub fn paced<F>(name: impl Into<String>, delay: Duration, step: F) -> Self
    where
        F: FnMut(Duration) -> anyhow::Result<StepOutcome> + Send + 'static,
    {
        TaskRunner {
            shared: Arc::new(Shared {
                name: name.into(),
                state: Mutex::new(TaskState::Idle),
                signal: Condvar::new(),
                iterations: AtomicU64::new(0),
                failures: AtomicU64::new(0),
                last_failure: Mutex::new(None),
            }),
            step: Arc::new(Mutex::new(Box::new(step))),
            delay,
            worker: Mutex::new(None),
        }
    }

    /// Runner with a fixed delay; the step returns `false` to stop
    pub fn fixed<F>(name: impl Into<String>, delay: Duration, mut step: F) -> Self
    where
        F: FnMut() -> anyhow::Result<bool> + Send + 'static,
    {
        Self::paced(name, delay, move |_| step().map(StepOutcome::from))
    }

    pub fn name(&self) -> &str {
        &self.shared.name
    }

    pub fn state(&self) -> TaskState {
        *self.shared.lock_state()
    }

    /// Completed step invocations, failed ones included
    pub fn iterations(&self) -> u64 {
        self.shared.iterations.load(Ordering::SeqCst)
    }

    pub fn failures(&self) -> u64 {
        self.shared.failures.load(Ordering::SeqCst)
    }

    pub fn last_failure(&self) -> Option<String> {
        self.shared
            .last_failure
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Spawn the worker, or resume it when suspended.
    ///
    /// No effect while running; refused once terminated.
    pub fn start(&self) {
        {
            let mut state = self.shared.lock_state();
            match *state {
                TaskState::Running => {
                    debug!(task = %self.shared.name, "Task already running");
                    return;
                }
                TaskState::Suspended => {
                    *state = TaskState::Running;
                    self.shared.signal.notify_all();
                    info!(task = %self.shared.name, "Task resumed");
                    return;
                }
                TaskState::Terminated => {
                    warn!(task = %self.shared.name, "Cannot start a terminated task");
                    return;
                }
                TaskState::Idle => *state = TaskState::Running,
            }
        }

        let mut worker = self.lock_worker();
        // A worker that stopped on its own has already left its loop
        if let Some(previous) = worker.take() {
            let _ = previous.join();
        }

        let shared = Arc::clone(&self.shared);
        let step = Arc::clone(&self.step);
        let delay = self.delay;
        let spawned = thread::Builder::new()
            .name(self.shared.name.clone())
            .spawn(move || worker_loop(shared, step, delay));

        match spawned {
            Ok(handle) => {
                info!(task = %self.shared.name, "Task started");
                *worker = Some(handle);
            }
            Err(e) => {
                error!(task = %self.shared.name, error = %e, "Failed to spawn task worker");
                let mut state = self.shared.lock_state();
                if *state == TaskState::Running {
                    *state = TaskState::Idle;
                }
            }
        }
    }

    /// Park the worker before its next iteration
    pub fn suspend(&self) {
        let mut state = self.shared.lock_state();
        if *state == TaskState::Running {
            *state = TaskState::Suspended;
            self.shared.signal.notify_all();
            info!(task = %self.shared.name, "Task suspended");
        }
    }

    /// Stop permanently and wait for the worker to exit.
    ///
    /// Safe to call any number of times, before `start`, or from the step
    /// itself (the worker is then left to finish on its own).
    pub fn terminate(&self) {
        {
            let mut state = self.shared.lock_state();
            if *state != TaskState::Terminated {
                *state = TaskState::Terminated;
                info!(task = %self.shared.name, "Task terminated");
            }
            self.shared.signal.notify_all();
        }

        let handle = self.lock_worker().take();
        if let Some(handle) = handle {
            if handle.thread().id() == thread::current().id() {
                return;
            }
            if handle.join().is_err() {
                error!(task = %self.shared.name, "Task worker panicked outside its step");
            }
        }
    }

    fn lock_worker(&self) -> MutexGuard<'_, Option<JoinHandle<()>>> {
        self.worker.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for TaskRunner {
    fn drop(&mut self) {
        self.terminate();
    }
}

impl std::fmt::Debug for TaskRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskRunner")
            .field("name", &self.shared.name)
            .field("state", &self.state())
            .field("delay", &self.delay)
            .field("iterations", &self.iterations())
            .field("failures", &self.failures())
            .finish()
    }
}

fn worker_loop(shared: Arc<Shared>, step: Arc<Mutex<Step>>, mut delay: Duration) {
    debug!(task = %shared.name, "Worker entered loop");

    while shared.wait_for_run() {
        let outcome = {
            let mut step = step.lock().unwrap_or_else(PoisonError::into_inner);
            panic::catch_unwind(AssertUnwindSafe(|| (*step)(delay)))
        };
        shared.iterations.fetch_add(1, Ordering::SeqCst);

        match outcome {
            Ok(Ok(StepOutcome::Continue)) => {}
            Ok(Ok(StepOutcome::ContinueAfter(next))) => delay = next,
            Ok(Ok(StepOutcome::Stop)) => {
                let mut state = shared.lock_state();
                if *state != TaskState::Terminated {
                    *state = TaskState::Idle;
                }
                shared.signal.notify_all();
                debug!(task = %shared.name, "Step requested stop");
                return;
            }
            Ok(Err(e)) => shared.record_failure(format!("{:#}", e)),
            Err(payload) => shared.record_failure(panic_message(payload.as_ref())),
        }

        shared.pause(delay);
    }

    debug!(task = %shared.name, "Worker left loop");
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        format!("panic: {}", message)
    } else if let Some(message) = payload.downcast_ref::<String>() {
        format!("panic: {}", message)
    } else {
        "panic".to_string()
    }
}
