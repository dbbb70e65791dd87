use std::fmt;
use std::io;
use std::thread;

use http::{Request, Response};

use super::Call;
use crate::scheduler::Finished;
use crate::{Body, Error};

/// Receiver of the outcome of an enqueued [`Call`].
///
/// Exactly one of the methods is invoked, exactly once, on the thread
/// running the call.
pub trait Callback: Send + 'static {
    /// The call produced a response.
    ///
    /// The response is not necessarily a success. An `Err` returned from
    /// here is logged and otherwise ignored; `on_failure` is not invoked
    /// afterwards.
    fn on_response(&mut self, call: &Call, response: Response<Body>) -> Result<(), Error>;

    /// The call failed or was canceled.
    fn on_failure(&mut self, call: &Call, error: Error);
}

impl<F> Callback for F
where
    F: FnMut(&Call, Result<Response<Body>, Error>) + Send + 'static,
{
    fn on_response(&mut self, call: &Call, response: Response<Body>) -> Result<(), Error> {
        (self)(call, Ok(response));
        Ok(())
    }

    fn on_failure(&mut self, call: &Call, error: Error) {
        (self)(call, Err(error))
    }
}

/// Holds the callback until it has been signalled.
struct Latch(Option<Box<dyn Callback>>);

impl Latch {
    fn is_pending(&self) -> bool {
        self.0.is_some()
    }

    fn response(&mut self, call: &Call, response: Response<Body>) {
        let Some(mut callback) = self.0.take() else {
            return;
        };

        if let Err(e) = callback.on_response(call, response) {
            info!("Callback failure for {}: {}", call.describe(), e);
        }
    }

    fn failure(&mut self, call: &Call, error: Error) {
        let Some(mut callback) = self.0.take() else {
            return;
        };

        callback.on_failure(call, error);
    }
}

/// An enqueued call waiting to be run by a [`Scheduler`][crate::Scheduler].
///
/// Running the task executes the call on the current thread and signals the
/// callback. A task dropped without running signals
/// [`on_failure()`][Callback::on_failure] instead.
pub struct AsyncCall {
    call: Call,
    latch: Latch,
}

impl AsyncCall {
    pub(crate) fn new(call: Call, callback: Box<dyn Callback>) -> Self {
        AsyncCall {
            call,
            latch: Latch(Some(callback)),
        }
    }

    /// The call of this task.
    pub fn call(&self) -> &Call {
        &self.call
    }

    /// The original request of the call.
    pub fn request(&self) -> &Request<Body> {
        self.call.request()
    }

    /// The host the call targets, used to limit calls per host.
    pub fn host(&self) -> &str {
        self.call.host()
    }

    /// Execute the call and signal the callback, blocking the current thread.
    ///
    /// The scheduler is told via
    /// [`finished_async()`][crate::Scheduler::finished_async] once the
    /// callback returned.
    pub fn run(mut self) {
        let call = self.call.clone();
        let scheduler = call.client().scheduler().clone();
        let _finished = Finished::asynchronous(&*scheduler, &call);

        debug!("Run {}", call.describe());

        match call.response_with_interceptor_chain() {
            Ok(_) if call.is_canceled() => self.latch.failure(&call, Error::Canceled),
            Ok(response) => self.latch.response(&call, response),
            Err(e) => self.latch.failure(&call, e),
        }
    }
}

impl Drop for AsyncCall {
    fn drop(&mut self) {
        if !self.latch.is_pending() {
            return;
        }

        let error = if thread::panicking() {
            warn!("Panic while running {}", self.call.describe());
            Error::Io(io::ErrorKind::Other, "call panicked".into())
        } else {
            warn!("Scheduler dropped {} without running it", self.call.describe());
            Error::Io(io::ErrorKind::Interrupted, "call rejected".into())
        };

        self.latch.failure(&self.call, error);
    }
}

impl fmt::Debug for AsyncCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AsyncCall")
            .field("call", &self.call)
            .finish()
    }
}
