//! Boundary to the transport engine performing the actual I/O.

use std::fmt;
use std::sync::{Arc, Mutex};

use http::{Request, Response, Uri};

use crate::util::lock;
use crate::{Body, Error};

/// Factory of [`Exchange`]s, one per attempt.
///
/// A transport is shared by all calls of a [`Client`][crate::Client] and must
/// therefore be thread safe.
pub trait Transport: Send + Sync + 'static {
    /// Start a new exchange for `request`.
    ///
    /// * `lease` is the connection of a previous attempt, handed over when a
    ///   follow-up targets the same connection. The exchange owns it from here.
    /// * `prior_response` is the head of the response that caused this
    ///   follow-up, if any.
    ///
    /// Starting an exchange must not do any I/O. Connecting happens in
    /// [`Exchange::send_request()`].
    fn start(
        &self,
        request: Request<Body>,
        lease: Option<Lease>,
        prior_response: Option<Response<()>>,
    ) -> Box<dyn Exchange>;
}

/// A single attempt at sending a request and reading the response.
///
/// The methods are called in order by the call execution:
///
/// 1. [`send_request()`][Exchange::send_request] connects (or reuses a
///    connection) and writes the request.
/// 2. [`read_response()`][Exchange::read_response] reads the response head.
/// 3. [`follow_up_request()`][Exchange::follow_up_request] tells whether the
///    response needs a follow-up, such as a redirect or an auth challenge.
/// 4. [`take_response()`][Exchange::take_response] hands over the response.
///
/// On failure in 1 or 2, [`recover()`][Exchange::recover] may be asked for a
/// replacement exchange. Whenever the exchange is not replaced,
/// [`close()`][Exchange::close] is used to take back the connection lease.
pub trait Exchange: Send {
    /// Connect and send the request.
    ///
    /// Errors must be reported as [`Error::Connect`] if no bytes were exchanged
    /// with the server, [`Error::Io`] otherwise, and as
    /// [`Error::BadRequest`]/[`Error::BadHeader`] if the request can't be sent.
    fn send_request(&mut self) -> Result<(), Error>;

    /// Read the response.
    fn read_response(&mut self) -> Result<(), Error>;

    /// Attempt to recover from a failure.
    ///
    /// Returns a new exchange for the same request using an alternate route
    /// or connection. The connection lease of this exchange, if any, is either
    /// moved to the returned exchange or released by this exchange. Returns
    /// `None` if recovery is not possible, in which case this exchange is
    /// closed by the caller.
    fn recover(&mut self, failure: &Error) -> Option<Box<dyn Exchange>>;

    /// The request to send next as a consequence of the response.
    ///
    /// Only called after a successful [`read_response()`][Exchange::read_response].
    fn follow_up_request(&mut self) -> Result<Option<Request<Body>>, Error>;

    /// Tell if a follow-up to `uri` can reuse the connection of this exchange.
    fn same_connection(&self, uri: &Uri) -> bool;

    /// Stop using the connection and hand back the lease, if one is held.
    fn close(&mut self) -> Option<Lease>;

    /// Handle to abort this exchange from another thread.
    fn cancel_handle(&self) -> Arc<dyn Cancel>;

    /// Take the response read by [`read_response()`][Exchange::read_response].
    fn take_response(&mut self) -> Option<Response<Body>>;
}

/// Aborts blocking I/O of an [`Exchange`].
pub trait Cancel: Send + Sync {
    /// Abort the exchange.
    ///
    /// Blocked reads or writes should return an error promptly. Called from
    /// an arbitrary thread, possibly more than once.
    fn cancel(&self);
}

/// A connection claimed from a pool.
pub trait Connection: Send + 'static {
    /// Give the connection back to the pool, or close it.
    fn release(self: Box<Self>);
}

/// Claim on a pooled connection.
///
/// A lease must be released exactly once, which is enforced by
/// [`Lease::release()`] consuming it. A lease dropped without being
/// released is released on drop, with a warning.
pub struct Lease {
    connection: Option<Box<dyn Connection>>,
}

impl Lease {
    /// Create a lease for a connection.
    pub fn new(connection: impl Connection) -> Self {
        Lease {
            connection: Some(Box::new(connection)),
        }
    }

    /// Release the connection.
    pub fn release(mut self) {
        if let Some(c) = self.connection.take() {
            c.release();
        }
    }
}

impl Drop for Lease {
    fn drop(&mut self) {
        if let Some(c) = self.connection.take() {
            warn!("Connection lease dropped without release");
            c.release();
        }
    }
}

impl fmt::Debug for Lease {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Lease").finish()
    }
}

/// Release an optional lease.
pub(crate) fn release(lease: Option<Lease>) {
    if let Some(lease) = lease {
        lease.release();
    }
}

/// Connection kept open after the response of an upgrade call.
///
/// Found in the response extensions of calls created with
/// [`Client::new_upgrade_call()`][crate::Client::new_upgrade_call].
#[derive(Clone)]
pub struct Upgraded {
    lease: Arc<Mutex<Option<Lease>>>,
}

impl Upgraded {
    pub(crate) fn new(lease: Lease) -> Self {
        Upgraded {
            lease: Arc::new(Mutex::new(Some(lease))),
        }
    }

    /// Take ownership of the connection lease.
    ///
    /// Only the first invocation returns the lease.
    pub fn take(&self) -> Option<Lease> {
        lock(&self.lease).take()
    }
}

impl fmt::Debug for Upgraded {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Upgraded").finish()
    }
}
