//! Running enqueued calls.

use crate::{AsyncCall, Call};

mod dispatcher;

pub use dispatcher::Dispatcher;

/// Policy deciding when enqueued calls run.
///
/// The scheduler is told about every call of a [`Client`][crate::Client]:
/// synchronous calls via [`executed()`][Scheduler::executed] and
/// [`finished()`][Scheduler::finished], asynchronous calls via
/// [`enqueue()`][Scheduler::enqueue] and
/// [`finished_async()`][Scheduler::finished_async]. The finish notifications
/// fire exactly once per call, however the call ended.
pub trait Scheduler: Send + Sync + 'static {
    /// A synchronous call started executing on the caller's thread.
    fn executed(&self, call: &Call);

    /// A synchronous call finished.
    fn finished(&self, call: &Call);

    /// Run `task` at some point, on some thread, using [`AsyncCall::run()`].
    ///
    /// Dropping the task without running it fails the call.
    fn enqueue(&self, task: AsyncCall);

    /// An asynchronous call finished and its callback returned.
    fn finished_async(&self, call: &Call);
}

/// Notifies the scheduler when dropped.
pub(crate) struct Finished<'a> {
    scheduler: &'a dyn Scheduler,
    call: &'a Call,
    asynchronous: bool,
}

impl<'a> Finished<'a> {
    pub fn sync(scheduler: &'a dyn Scheduler, call: &'a Call) -> Self {
        Finished {
            scheduler,
            call,
            asynchronous: false,
        }
    }

    pub fn asynchronous(scheduler: &'a dyn Scheduler, call: &'a Call) -> Self {
        Finished {
            scheduler,
            call,
            asynchronous: true,
        }
    }
}

impl Drop for Finished<'_> {
    fn drop(&mut self) {
        if self.asynchronous {
            self.scheduler.finished_async(self.call);
        } else {
            self.scheduler.finished(self.call);
        }
    }
}
