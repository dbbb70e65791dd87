//! The attempt loop at the end of the interceptor pipeline.
//!
//! Each iteration drives one [`Exchange`] through sending and reading. On
//! failure the exchange may be replaced by a recovered one; on success the
//! response may ask for a follow-up, which starts a new exchange. Whatever
//! the outcome, every connection lease is either released or handed on.

use http::{Request, Response};

use super::prepare::prepare;
use super::{Call, LeasePolicy};
use crate::transport::{release, Exchange, Upgraded};
use crate::util::redact;
use crate::{Body, Error};

/// Clears the installed cancel handle when the attempt loop exits.
struct Installed<'a>(&'a Call);

impl<'a> Installed<'a> {
    fn new(call: &'a Call, exchange: &dyn Exchange) -> Self {
        call.install_cancel(exchange.cancel_handle());
        Installed(call)
    }

    fn replace(&self, exchange: &dyn Exchange) {
        self.0.install_cancel(exchange.cancel_handle());
    }
}

impl Drop for Installed<'_> {
    fn drop(&mut self) {
        self.0.clear_cancel();
    }
}

pub(crate) fn run(call: &Call, request: Request<Body>) -> Result<Response<Body>, Error> {
    let client = call.client();
    let transport = client.transport();
    let max_follow_ups = client.config().max_follow_ups;

    let request = prepare(request)?;

    if call.is_canceled() {
        return Err(Error::Canceled);
    }

    debug!("Start {}", call.describe());
    let mut exchange = transport.start(request, None, None);
    let installed = Installed::new(call, &*exchange);

    let mut follow_ups: u32 = 0;
    let mut recoveries: u32 = 0;

    loop {
        if call.is_canceled() {
            debug!("Abort {}", call.describe());
            release(exchange.close());
            return Err(Error::Canceled);
        }

        if let Err(e) = attempt(&mut *exchange) {
            // A canceled exchange fails with whatever error the abort caused.
            if call.is_canceled() {
                debug!("Canceled {}: {}", call.describe(), e);
                release(exchange.close());
                return Err(Error::Canceled);
            }

            if !e.is_recoverable() {
                debug!("Attempt of {} failed: {}", call.describe(), e);
                release(exchange.close());
                return Err(e);
            }

            match exchange.recover(&e) {
                Some(next) => {
                    recoveries += 1;
                    debug!(
                        "Recover {} after {} (recovery {})",
                        call.describe(),
                        e,
                        recoveries
                    );
                    exchange = next;
                    installed.replace(&*exchange);
                    continue;
                }
                None => {
                    debug!("Failed to recover {}: {}", call.describe(), e);
                    release(exchange.close());
                    return Err(e);
                }
            }
        }

        let follow_up = match exchange.follow_up_request() {
            Ok(v) => v,
            Err(e) => {
                release(exchange.close());
                return Err(e);
            }
        };

        let Some(mut response) = exchange.take_response() else {
            release(exchange.close());
            return Err(Error::NoResponse);
        };

        let Some(follow_up) = follow_up else {
            let lease = exchange.close();

            match call.lease_policy() {
                LeasePolicy::ReleaseOnResponse => release(lease),
                LeasePolicy::KeepForUpgrade => {
                    if let Some(lease) = lease {
                        response.extensions_mut().insert(Upgraded::new(lease));
                    }
                }
            }

            debug!(
                "Finished {} with {} after {} follow-ups",
                call.describe(),
                response.status(),
                follow_ups
            );

            return Ok(response);
        };

        let mut lease = exchange.close();

        follow_ups += 1;
        if follow_ups > max_follow_ups {
            release(lease);
            return Err(Error::TooManyFollowUps(follow_ups));
        }

        if !exchange.same_connection(follow_up.uri()) {
            release(lease.take());
        }

        debug!(
            "Follow-up {} of {} to {} (status {}, keep connection: {})",
            follow_ups,
            call.describe(),
            redact(follow_up.uri()),
            response.status(),
            lease.is_some()
        );

        let follow_up = match prepare(follow_up) {
            Ok(v) => v,
            Err(e) => {
                release(lease);
                return Err(e);
            }
        };

        let prior_response = response.map(|_| ());
        exchange = transport.start(follow_up, lease, Some(prior_response));
        installed.replace(&*exchange);
    }
}

fn attempt(exchange: &mut dyn Exchange) -> Result<(), Error> {
    exchange.send_request()?;
    exchange.read_response()
}
