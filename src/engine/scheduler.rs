//! Task scheduler - microtasks and timers on a virtual clock.
//!
//! Everything runs on one thread. Deferred work is queued here and only
//! runs when the host (or a test) drives the queue:
//!
//! - `run_microtasks` drains the microtask queue, including tasks queued
//!   while draining.
//! - `run_due_timers` runs every timer due at the current virtual time,
//!   with a microtask checkpoint after each one.
//! - `advance_time` moves the clock forward and runs what became due.
//! - `flush` runs until both queues are idle, jumping the clock to the
//!   next timer when only future timers remain.
//!
//! Host drivers (`keyboard::key_down`, `pointer::pointer_down`, ...) call
//! `run_microtasks` after dispatching, like the end of a browser task.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;

use spark_signals::untrack;

use crate::primitives::Cleanup;

/// Upper bound on tasks run by one drain before giving up.
const MAX_TASKS_PER_DRAIN: usize = 10_000;

type Task = Box<dyn FnOnce()>;

/// Handle used to cancel a timer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TimerId(usize);

struct Timer {
    id: usize,
    due: u64,
    callback: Task,
}

thread_local! {
    static MICROTASKS: RefCell<VecDeque<Task>> = RefCell::new(VecDeque::new());
    static TIMERS: RefCell<Vec<Timer>> = const { RefCell::new(Vec::new()) };
    static NEXT_TIMER_ID: Cell<usize> = const { Cell::new(0) };
    static NOW: Cell<u64> = const { Cell::new(0) };
}

// =============================================================================
// Queueing
// =============================================================================

/// Queue a microtask.
pub fn queue_microtask(task: impl FnOnce() + 'static) {
    MICROTASKS.with(|queue| queue.borrow_mut().push_back(Box::new(task)));
}

/// Schedule `callback` to run `delay_ms` after the current virtual time.
pub fn set_timeout(callback: impl FnOnce() + 'static, delay_ms: u64) -> TimerId {
    let id = NEXT_TIMER_ID.with(|next| {
        let id = next.get();
        next.set(id + 1);
        id
    });
    let due = now() + delay_ms;
    TIMERS.with(|timers| {
        timers.borrow_mut().push(Timer {
            id,
            due,
            callback: Box::new(callback),
        });
    });
    TimerId(id)
}

/// Cancel a pending timer. Cancelling a fired timer is a no-op.
pub fn clear_timeout(id: TimerId) {
    TIMERS.with(|timers| timers.borrow_mut().retain(|t| t.id != id.0));
}

/// `set_timeout` returning a cleanup that cancels it.
pub fn timeout(callback: impl FnOnce() + 'static, delay_ms: u64) -> Cleanup {
    let id = set_timeout(callback, delay_ms);
    Box::new(move || clear_timeout(id))
}

// =============================================================================
// Driving
// =============================================================================

/// Current virtual time in milliseconds.
pub fn now() -> u64 {
    NOW.with(Cell::get)
}

/// Drain the microtask queue. Returns the number of tasks run.
pub fn run_microtasks() -> usize {
    let mut ran = 0;
    loop {
        let task = MICROTASKS.with(|queue| queue.borrow_mut().pop_front());
        let Some(task) = task else { break };
        untrack(task);
        ran += 1;
        if ran >= MAX_TASKS_PER_DRAIN {
            log::warn!("microtask queue did not settle after {ran} tasks");
            break;
        }
    }
    ran
}

/// Remove and return the earliest timer due at or before `at`.
fn take_due_timer(at: u64) -> Option<Timer> {
    TIMERS.with(|timers| {
        let mut timers = timers.borrow_mut();
        let pos = timers
            .iter()
            .enumerate()
            .filter(|(_, t)| t.due <= at)
            .min_by_key(|(_, t)| (t.due, t.id))
            .map(|(pos, _)| pos)?;
        Some(timers.remove(pos))
    })
}

/// Run every timer due at the current time, including timers scheduled
/// with zero delay while running. Returns the number of timers run.
pub fn run_due_timers() -> usize {
    let mut ran = 0;
    while let Some(timer) = take_due_timer(now()) {
        untrack(timer.callback);
        run_microtasks();
        ran += 1;
        if ran >= MAX_TASKS_PER_DRAIN {
            log::warn!("timer queue did not settle after {ran} timers");
            break;
        }
    }
    ran
}

/// Move the clock forward, running timers in due order as it passes them.
pub fn advance_time(ms: u64) {
    let target = now() + ms;
    while let Some(timer) = take_due_timer(target) {
        NOW.with(|clock| clock.set(clock.get().max(timer.due)));
        untrack(timer.callback);
        run_microtasks();
    }
    NOW.with(|clock| clock.set(target));
}

/// Run microtasks and timers until both queues are empty.
pub fn flush() {
    for _ in 0..MAX_TASKS_PER_DRAIN {
        run_microtasks();
        let next_due = TIMERS.with(|timers| timers.borrow().iter().map(|t| t.due).min());
        let Some(due) = next_due else { return };
        NOW.with(|clock| clock.set(clock.get().max(due)));
        run_due_timers();
    }
    log::warn!("scheduler did not go idle during flush");
}

/// Number of queued microtasks.
pub fn pending_microtasks() -> usize {
    MICROTASKS.with(|queue| queue.borrow().len())
}

/// Number of pending timers.
pub fn pending_timers() -> usize {
    TIMERS.with(|timers| timers.borrow().len())
}

/// Reset queues and clock (for testing).
pub fn reset_scheduler() {
    MICROTASKS.with(|queue| queue.borrow_mut().clear());
    TIMERS.with(|timers| timers.borrow_mut().clear());
    NEXT_TIMER_ID.with(|next| next.set(0));
    NOW.with(|clock| clock.set(0));
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;

    fn setup() {
        reset_scheduler();
    }

    #[test]
    fn test_microtasks_run_in_order_including_nested() {
        setup();

        let log = Rc::new(RefCell::new(Vec::new()));
        let l1 = log.clone();
        queue_microtask(move || {
            l1.borrow_mut().push(1);
            let l3 = l1.clone();
            queue_microtask(move || l3.borrow_mut().push(3));
        });
        let l2 = log.clone();
        queue_microtask(move || l2.borrow_mut().push(2));

        assert_eq!(run_microtasks(), 3);
        assert_eq!(*log.borrow(), vec![1, 2, 3]);
    }

    #[test]
    fn test_zero_delay_timer_waits_for_driver() {
        setup();

        let fired = Rc::new(Cell::new(false));
        let fired_clone = fired.clone();
        set_timeout(move || fired_clone.set(true), 0);

        run_microtasks();
        assert!(!fired.get());
        assert_eq!(run_due_timers(), 1);
        assert!(fired.get());
    }

    #[test]
    fn test_clear_timeout() {
        setup();

        let fired = Rc::new(Cell::new(false));
        let fired_clone = fired.clone();
        let cancel = timeout(move || fired_clone.set(true), 0);
        cancel();
        flush();
        assert!(!fired.get());
        assert_eq!(pending_timers(), 0);
    }

    #[test]
    fn test_advance_time_runs_in_due_order() {
        setup();

        let log = Rc::new(RefCell::new(Vec::new()));
        for (delay, label) in [(200, "late"), (50, "early"), (400, "never")] {
            let log = log.clone();
            set_timeout(move || log.borrow_mut().push(label), delay);
        }

        advance_time(250);
        assert_eq!(*log.borrow(), vec!["early", "late"]);
        assert_eq!(now(), 250);
        assert_eq!(pending_timers(), 1);
    }

    #[test]
    fn test_timer_checkpoint_runs_microtasks() {
        setup();

        let log = Rc::new(RefCell::new(Vec::new()));
        let l1 = log.clone();
        set_timeout(
            move || {
                let l2 = l1.clone();
                queue_microtask(move || l2.borrow_mut().push("micro"));
                l1.borrow_mut().push("timer");
            },
            0,
        );
        let l3 = log.clone();
        set_timeout(move || l3.borrow_mut().push("second"), 0);

        flush();
        assert_eq!(*log.borrow(), vec!["timer", "micro", "second"]);
    }
}
