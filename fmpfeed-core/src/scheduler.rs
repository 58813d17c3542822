//! CooperativeFetchScheduler: caller-driven fetch tasks on one thread.
//!
//! A fetch task is an ordinary future that suspends exactly once per request,
//! right after the request is issued and before its body is read (see
//! [`suspend`]). The scheduler never runs anything on its own: the caller
//! decides when each task makes progress with [`FetchScheduler::resume`] or
//! drives it to the end with [`FetchScheduler::await_result`].
//!
//! The scheduler is `!Send`: tasks live on the thread that
//! created them and only one of them runs at any instant.
//!
//! Tasks must only await [`suspend`] points. A future waiting on anything
//! else (a timer, a channel) is never woken and `await_result` would spin.

use std::cell::Cell;
use std::fmt;
use std::future::Future;
use std::rc::Rc;
use std::task::{Context, Poll};

use futures::future::{FutureExt, LocalBoxFuture};
use futures::task::noop_waker_ref;

use crate::error::FetchError;

/// Hand control back to whoever is driving the current task.
///
/// Pending exactly once, then ready.
pub async fn suspend() {
    futures::pending!();
}

/// Where a task is after the last call into it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    Suspended,
    Completed,
}

type Work<'a, T> = LocalBoxFuture<'a, Result<T, FetchError>>;

enum Slot<'a, T> {
    Running(Work<'a, T>),
    Done(Result<T, FetchError>),
    Cancelled,
}

/// A started fetch and its continuation.
///
/// Dropping or cancelling a suspended task drops the continuation, and with
/// it any response body the task was holding.
pub struct FetchTask<'a, T> {
    id: u64,
    slot: Slot<'a, T>,
    suspensions: usize,
    in_flight: Rc<Cell<usize>>,
}

impl<'a, T> FetchTask<'a, T> {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn state(&self) -> TaskState {
        match self.slot {
            Slot::Running(_) => TaskState::Suspended,
            Slot::Done(_) | Slot::Cancelled => TaskState::Completed,
        }
    }

    /// How many times the task has suspended so far.
    pub fn suspensions(&self) -> usize {
        self.suspensions
    }

    /// Drop the continuation. Awaiting the task afterwards yields [`FetchError::Cancelled`].
    pub fn cancel(&mut self) {
        if matches!(self.slot, Slot::Running(_)) {
            tracing::debug!(task = self.id, "fetch task cancelled");
            self.leave(Slot::Cancelled);
        }
    }

    fn leave(&mut self, next: Slot<'a, T>) {
        if matches!(self.slot, Slot::Running(_)) {
            self.in_flight.set(self.in_flight.get().saturating_sub(1));
        }
        self.slot = next;
    }

    fn poll_once(&mut self) -> TaskState {
        let Slot::Running(work) = &mut self.slot else {
            return TaskState::Completed;
        };
        let mut cx = Context::from_waker(noop_waker_ref());
        match work.poll_unpin(&mut cx) {
            Poll::Ready(output) => {
                self.leave(Slot::Done(output));
                TaskState::Completed
            }
            Poll::Pending => {
                self.suspensions += 1;
                TaskState::Suspended
            }
        }
    }
}

impl<T> Drop for FetchTask<'_, T> {
    fn drop(&mut self) {
        if matches!(self.slot, Slot::Running(_)) {
            self.in_flight.set(self.in_flight.get().saturating_sub(1));
        }
    }
}

impl<T> fmt::Debug for FetchTask<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FetchTask")
            .field("id", &self.id)
            .field("state", &self.state())
            .field("suspensions", &self.suspensions)
            .finish()
    }
}

/// Starts, resumes and completes fetch tasks on the current thread.
#[derive(Debug, Default)]
pub struct FetchScheduler {
    in_flight: Rc<Cell<usize>>,
    next_id: Cell<u64>,
}

impl FetchScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of started tasks that have neither completed nor been cancelled.
    pub fn in_flight(&self) -> usize {
        self.in_flight.get()
    }

    /// Begin `work` and run it to its first suspension (or to completion).
    pub fn start<'a, T, F>(&self, work: F) -> FetchTask<'a, T>
    where
        F: Future<Output = Result<T, FetchError>> + 'a,
    {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        self.in_flight.set(self.in_flight.get() + 1);
        let mut task = FetchTask {
            id,
            slot: Slot::Running(work.boxed_local()),
            suspensions: 0,
            in_flight: Rc::clone(&self.in_flight),
        };
        let state = task.poll_once();
        tracing::trace!(task = id, ?state, "fetch task started");
        task
    }

    /// Continue `task` until its next suspension or completion.
    pub fn resume<T>(&self, task: &mut FetchTask<'_, T>) -> TaskState {
        task.poll_once()
    }

    /// Drive `task` to completion and return its result.
    pub fn await_result<T>(&self, mut task: FetchTask<'_, T>) -> Result<T, FetchError> {
        while task.poll_once() == TaskState::Suspended {}
        match std::mem::replace(&mut task.slot, Slot::Cancelled) {
            Slot::Done(output) => output,
            Slot::Running(_) | Slot::Cancelled => Err(FetchError::Cancelled),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    async fn two_requests(log: &RefCell<Vec<&'static str>>) -> Result<u32, FetchError> {
        log.borrow_mut().push("issue 1");
        suspend().await;
        log.borrow_mut().push("read 1");
        log.borrow_mut().push("issue 2");
        suspend().await;
        log.borrow_mut().push("read 2");
        Ok(2)
    }

    #[test]
    fn suspend_is_pending_exactly_once() {
        let mut cx = Context::from_waker(noop_waker_ref());
        let mut point = suspend().boxed_local();
        assert!(point.poll_unpin(&mut cx).is_pending());
        assert!(point.poll_unpin(&mut cx).is_ready());
    }

    #[test]
    fn start_runs_to_first_suspension() {
        let scheduler = FetchScheduler::new();
        let log = RefCell::new(Vec::new());
        let mut task = scheduler.start(two_requests(&log));
        assert_eq!(task.state(), TaskState::Suspended);
        assert_eq!(*log.borrow(), vec!["issue 1"]);
        assert_eq!(scheduler.in_flight(), 1);

        assert_eq!(scheduler.resume(&mut task), TaskState::Suspended);
        assert_eq!(scheduler.resume(&mut task), TaskState::Completed);
        assert_eq!(task.suspensions(), 2);
        assert_eq!(scheduler.in_flight(), 0);
        assert_eq!(scheduler.await_result(task).unwrap(), 2);
    }

    #[test]
    fn work_without_suspension_completes_at_start() {
        let scheduler = FetchScheduler::new();
        let task = scheduler.start(async { Ok::<_, FetchError>("done") });
        assert_eq!(task.state(), TaskState::Completed);
        assert_eq!(scheduler.in_flight(), 0);
        assert_eq!(scheduler.await_result(task).unwrap(), "done");
    }

    #[test]
    fn tasks_interleave_at_suspension_points() {
        let scheduler = FetchScheduler::new();
        let log = RefCell::new(Vec::new());
        let shared = &log;
        let step = move |name: &'static str| async move {
            shared.borrow_mut().push(name);
            suspend().await;
            shared.borrow_mut().push(name);
            Ok::<_, FetchError>(())
        };
        let a = scheduler.start(step("a"));
        let b = scheduler.start(step("b"));
        assert_eq!(scheduler.in_flight(), 2);
        scheduler.await_result(b).unwrap();
        scheduler.await_result(a).unwrap();
        assert_eq!(*log.borrow(), vec!["a", "b", "b", "a"]);
    }

    #[test]
    fn errors_propagate() {
        let scheduler = FetchScheduler::new();
        let task = scheduler.start(async {
            suspend().await;
            Err::<(), _>(FetchError::transport("stable/stock-list", "reset"))
        });
        assert!(scheduler.await_result(task).unwrap_err().is_transport());
    }

    #[test]
    fn cancel_drops_continuation() {
        struct Flag<'a>(&'a Cell<bool>);
        impl Drop for Flag<'_> {
            fn drop(&mut self) {
                self.0.set(true);
            }
        }

        let dropped = Cell::new(false);
        let scheduler = FetchScheduler::new();
        let mut task = scheduler.start(async {
            let _held = Flag(&dropped);
            suspend().await;
            Ok::<_, FetchError>(())
        });
        assert!(!dropped.get());
        task.cancel();
        assert!(dropped.get());
        assert_eq!(scheduler.in_flight(), 0);
        assert!(matches!(
            scheduler.await_result(task),
            Err(FetchError::Cancelled)
        ));
    }

    #[test]
    fn dropping_a_suspended_task_releases_it() {
        let scheduler = FetchScheduler::new();
        let task = scheduler.start(async {
            suspend().await;
            Ok::<_, FetchError>(())
        });
        assert_eq!(scheduler.in_flight(), 1);
        drop(task);
        assert_eq!(scheduler.in_flight(), 0);
    }
}
