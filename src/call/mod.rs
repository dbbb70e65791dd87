//! The one-shot call life cycle.

use std::fmt;
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::{Arc, Mutex};

use http::{Request, Response};

use crate::scheduler::Finished;
use crate::transport::Cancel;
use crate::util::{lock, redact};
use crate::{Body, Client, Error};

mod async_call;
mod chain;
mod engine;
mod prepare;

pub use async_call::{AsyncCall, Callback};
pub use chain::{Chain, Interceptor};

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

/// Process unique identifier of a [`Call`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CallId(u64);

impl fmt::Display for CallId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque tag identifying a request.
///
/// Set in the request extensions to group calls, for instance to cancel
/// them all using [`Dispatcher::cancel_tagged()`][crate::Dispatcher::cancel_tagged].
///
/// ```
/// use ureq_call::{Body, Tag};
/// use ureq_call::http::Request;
///
/// let request = Request::get("http://example.test/")
///     .extension(Tag::new("profile-page"))
///     .body(Body::empty())
///     .unwrap();
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Tag(Arc<str>);

impl Tag {
    /// Create a new tag.
    pub fn new(tag: impl Into<Arc<str>>) -> Self {
        Tag(tag.into())
    }

    /// The tag value.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// What to do with the connection once the final response is read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LeasePolicy {
    /// Release the lease. The response is complete. This is the default.
    #[default]
    ReleaseOnResponse,

    /// Keep the connection past the HTTP exchange, such as for protocol upgrades.
    ///
    /// The lease is handed to the consumer via [`Upgraded`][crate::Upgraded] in
    /// the response extensions.
    KeepForUpgrade,
}

const EXECUTED: u8 = 0b01;
const CANCELED: u8 = 0b10;

/// Atomic cell holding the executed and canceled flags.
#[derive(Default)]
struct CallState(AtomicU8);

impl CallState {
    /// Set the executed flag. Returns `false` if it was already set.
    fn try_execute(&self) -> bool {
        let prev = self.0.fetch_or(EXECUTED, Ordering::AcqRel);
        prev & EXECUTED == 0
    }

    fn cancel(&self) {
        self.0.fetch_or(CANCELED, Ordering::AcqRel);
    }

    fn is_executed(&self) -> bool {
        self.0.load(Ordering::Acquire) & EXECUTED > 0
    }

    fn is_canceled(&self) -> bool {
        self.0.load(Ordering::Acquire) & CANCELED > 0
    }
}

/// A request prepared for execution.
///
/// A call represents a single request/response pair and can be executed
/// once, either blocking using [`Call::execute()`] or on a
/// [`Scheduler`][crate::Scheduler] using [`Call::enqueue()`].
///
/// Cloning a call gives another handle to the same call, for instance to
/// cancel it from another thread.
#[derive(Clone)]
pub struct Call {
    shared: Arc<Shared>,
}

struct Shared {
    id: CallId,
    client: Client,
    original: Request<Body>,
    lease_policy: LeasePolicy,
    state: CallState,
    // Cancel handle of the exchange driving the current attempt.
    current: Mutex<Option<Arc<dyn Cancel>>>,
}

impl Call {
    pub(crate) fn new(client: Client, original: Request<Body>, lease_policy: LeasePolicy) -> Self {
        let id = CallId(NEXT_ID.fetch_add(1, Ordering::Relaxed));

        Call {
            shared: Arc::new(Shared {
                id,
                client,
                original,
                lease_policy,
                state: CallState::default(),
                current: Mutex::new(None),
            }),
        }
    }

    /// Identifier of this call.
    pub fn id(&self) -> CallId {
        self.shared.id
    }

    /// The original request that initiated this call.
    ///
    /// Interceptors, redirects and recoveries never change this request.
    pub fn request(&self) -> &Request<Body> {
        &self.shared.original
    }

    /// The [`Tag`] of the original request, if any.
    pub fn tag(&self) -> Option<&Tag> {
        self.shared.original.extensions().get::<Tag>()
    }

    /// Invoke the request immediately, blocking until the response is
    /// available or the call failed.
    ///
    /// A received response is not necessarily a success, it might have
    /// a 4xx or 5xx status. An `Err` can happen after the server received
    /// and processed the request, since networks fail in the middle of an
    /// exchange.
    ///
    /// Fails with [`Error::AlreadyExecuted`] if the call was already executed
    /// or enqueued, and with [`Error::Canceled`] if the call is canceled.
    pub fn execute(&self) -> Result<Response<Body>, Error> {
        if !self.shared.state.try_execute() {
            return Err(Error::AlreadyExecuted);
        }

        let scheduler = self.shared.client.scheduler();
        scheduler.executed(self);
        let _finished = Finished::sync(&**scheduler, self);

        self.response_with_interceptor_chain()
    }

    /// Schedule the call to be executed by the client's scheduler.
    ///
    /// The `callback` receives exactly one of
    /// [`on_response()`][Callback::on_response] or
    /// [`on_failure()`][Callback::on_failure].
    ///
    /// Fails with [`Error::AlreadyExecuted`] if the call was already executed
    /// or enqueued.
    pub fn enqueue(&self, callback: impl Callback) -> Result<(), Error> {
        if !self.shared.state.try_execute() {
            return Err(Error::AlreadyExecuted);
        }

        let task = AsyncCall::new(self.clone(), Box::new(callback));
        self.shared.client.scheduler().enqueue(task);

        Ok(())
    }

    /// Cancel the call, if possible.
    ///
    /// Cancelling aborts the ongoing exchange, if any. Cancelling a
    /// completed call does nothing. Can be called any number of times,
    /// from any thread.
    pub fn cancel(&self) {
        self.shared.state.cancel();

        // Clone to not call out to the transport while holding the lock.
        let current = lock(&self.shared.current).clone();

        if let Some(handle) = current {
            debug!("Cancel ongoing exchange of {}", self.describe());
            handle.cancel();
        }
    }

    /// Tell if the call was executed or enqueued.
    pub fn is_executed(&self) -> bool {
        self.shared.state.is_executed()
    }

    /// Tell if the call was canceled.
    pub fn is_canceled(&self) -> bool {
        self.shared.state.is_canceled()
    }

    pub(crate) fn client(&self) -> &Client {
        &self.shared.client
    }

    pub(crate) fn lease_policy(&self) -> LeasePolicy {
        self.shared.lease_policy
    }

    pub(crate) fn host(&self) -> &str {
        self.shared.original.uri().host().unwrap_or("")
    }

    pub(crate) fn ptr_eq(&self, other: &Call) -> bool {
        Arc::ptr_eq(&self.shared, &other.shared)
    }

    /// Describe the call without leaking the full URL.
    pub(crate) fn describe(&self) -> String {
        let state = if self.is_canceled() {
            "canceled call"
        } else {
            "call"
        };
        format!("{} to {}", state, redact(self.request().uri()))
    }

    /// Make `handle` the one aborted by [`Call::cancel()`].
    ///
    /// Aborts immediately if the call was canceled before the handle
    /// was installed.
    pub(crate) fn install_cancel(&self, handle: Arc<dyn Cancel>) {
        *lock(&self.shared.current) = Some(handle.clone());

        if self.is_canceled() {
            handle.cancel();
        }
    }

    pub(crate) fn clear_cancel(&self) {
        lock(&self.shared.current).take();
    }

    pub(crate) fn response_with_interceptor_chain(&self) -> Result<Response<Body>, Error> {
        let interceptors = self.shared.client.interceptors();
        let request = self.shared.original.clone();

        let chain = Chain::new(self, interceptors, 0, request.clone());
        chain.proceed(request)
    }
}

impl fmt::Debug for Call {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Call")
            .field("id", &self.id())
            .field("uri", &redact(self.request().uri()))
            .field("executed", &self.is_executed())
            .field("canceled", &self.is_canceled())
            .finish()
    }
}
