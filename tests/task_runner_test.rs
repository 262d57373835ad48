//! Lifecycle behaviour of the background task runner

use memory_macro::runner::{self, StepOutcome, TaskRunner, TaskState};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

fn eventually(mut done: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(3);
    while Instant::now() < deadline {
        if done() {
            return true;
        }
        thread::sleep(Duration::from_millis(2));
    }
    done()
}

fn counter() -> (Arc<AtomicUsize>, Arc<AtomicUsize>) {
    let calls = Arc::new(AtomicUsize::new(0));
    (Arc::clone(&calls), calls)
}

#[test]
fn test_stops_after_exactly_k_steps() {
    for k in [1usize, 2, 5] {
        let (calls, seen) = counter();
        let task = TaskRunner::fixed("k", Duration::from_millis(1), move || {
            Ok(calls.fetch_add(1, Ordering::SeqCst) + 1 < k)
        });

        task.start();
        assert!(eventually(|| task.state() == TaskState::Idle
            && task.iterations() as usize == k));
        thread::sleep(Duration::from_millis(15));
        assert_eq!(seen.load(Ordering::SeqCst), k);
    }
}

#[test]
fn test_terminate_any_number_of_times() {
    for times in [1, 2, 10] {
        let task = TaskRunner::fixed("t", Duration::from_millis(1), || Ok(true));
        task.start();
        for _ in 0..times {
            task.terminate();
        }
        assert_eq!(task.state(), TaskState::Terminated);
    }
}

#[test]
fn test_terminate_before_start_then_start_is_refused() {
    let (calls, seen) = counter();
    let task = TaskRunner::fixed("never", Duration::from_millis(1), move || {
        calls.fetch_add(1, Ordering::SeqCst);
        Ok(true)
    });

    task.terminate();
    task.start();
    thread::sleep(Duration::from_millis(20));

    assert_eq!(task.state(), TaskState::Terminated);
    assert_eq!(seen.load(Ordering::SeqCst), 0);
}

#[test]
fn test_second_step_failure_is_isolated() {
    let (calls, seen) = counter();
    let task = TaskRunner::fixed("flaky", Duration::from_millis(1), move || {
        if calls.fetch_add(1, Ordering::SeqCst) == 1 {
            Err(anyhow::anyhow!("read failed"))
        } else {
            Ok(true)
        }
    });

    task.start();
    assert!(eventually(|| seen.load(Ordering::SeqCst) >= 5));
    task.terminate();

    assert_eq!(task.failures(), 1);
    assert_eq!(task.last_failure().as_deref(), Some("read failed"));
}

#[test]
fn test_suspend_halts_and_resume_continues() {
    let (calls, seen) = counter();
    let task = TaskRunner::fixed("pause", Duration::from_millis(1), move || {
        calls.fetch_add(1, Ordering::SeqCst);
        Ok(true)
    });

    runner::start(Some(&task));
    assert!(eventually(|| seen.load(Ordering::SeqCst) >= 3));

    runner::stop(Some(&task));
    let at_stop = seen.load(Ordering::SeqCst);
    thread::sleep(Duration::from_millis(30));
    let halted = seen.load(Ordering::SeqCst);
    assert!(halted <= at_stop + 1);
    thread::sleep(Duration::from_millis(30));
    assert_eq!(seen.load(Ordering::SeqCst), halted);

    runner::start(Some(&task));
    assert!(eventually(|| seen.load(Ordering::SeqCst) > halted));
}

#[test]
fn test_start_while_running_spawns_nothing_new() {
    let (calls, seen) = counter();
    let task = TaskRunner::paced("paced", Duration::from_millis(1), move |_| {
        calls.fetch_add(1, Ordering::SeqCst);
        Ok(StepOutcome::Continue)
    });

    task.start();
    task.start();
    task.start();
    assert!(eventually(|| seen.load(Ordering::SeqCst) >= 3));
    task.terminate();

    // A single worker means every invocation was counted exactly once
    assert_eq!(task.iterations() as usize, seen.load(Ordering::SeqCst));
}

#[test]
fn test_drop_terminates_worker() {
    let (calls, seen) = counter();
    {
        let task = TaskRunner::fixed("scoped", Duration::from_millis(1), move || {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(true)
        });
        task.start();
        assert!(eventually(|| seen.load(Ordering::SeqCst) >= 1));
    }
    let after_drop = seen.load(Ordering::SeqCst);
    thread::sleep(Duration::from_millis(20));
    assert_eq!(seen.load(Ordering::SeqCst), after_drop);
}

#[test]
fn test_optional_helpers_ignore_none() {
    runner::start(None);
    runner::stop(None);
}
