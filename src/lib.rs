//! Call execution for HTTP clients.
//!
//! This crate turns an immutable [`http::Request`] into exactly one delivered
//! [`http::Response`] (or one error). It owns the life cycle of a [`Call`]:
//!
//! * **One-shot** - a call executes at most once, synchronously via
//!   [`Call::execute()`] or asynchronously via [`Call::enqueue()`].
//! * **Interceptors** - user supplied [`Interceptor`]s wrap the whole
//!   execution, rewriting requests and responses.
//! * **Recovery** - connection level failures are retried on a new
//!   [`Exchange`] when the transport offers one.
//! * **Follow-ups** - redirects, auth challenges and similar continuations
//!   are driven to completion, bounded by [`Config::max_follow_ups`].
//! * **Cancellation** - [`Call::cancel()`] can be invoked from any thread.
//!
//! The actual I/O is not done here. Socket handling, TLS, HTTP/1.1 framing and
//! connection pooling live behind the [`Transport`] and [`Exchange`] traits.
//! Asynchronous calls are run by a [`Scheduler`], of which [`Dispatcher`] is
//! a thread-per-call implementation with concurrency limits.
//!
//! ```
//! use std::sync::Arc;
//! use ureq_call::{Body, CallFactory, Client};
//! use ureq_call::http::{Request, Response};
//! # use ureq_call::{Cancel, Error, Exchange, Lease, Transport};
//! # use ureq_call::http::Uri;
//! # struct Canned;
//! # struct Once(Option<Response<Body>>);
//! # struct Noop;
//! # impl Cancel for Noop { fn cancel(&self) {} }
//! # impl Transport for Canned {
//! #     fn start(&self, _: Request<Body>, _: Option<Lease>, _: Option<Response<()>>) -> Box<dyn Exchange> {
//! #         Box::new(Once(Some(Response::new(Body::from("hi")))))
//! #     }
//! # }
//! # impl Exchange for Once {
//! #     fn send_request(&mut self) -> Result<(), Error> { Ok(()) }
//! #     fn read_response(&mut self) -> Result<(), Error> { Ok(()) }
//! #     fn recover(&mut self, _: &Error) -> Option<Box<dyn Exchange>> { None }
//! #     fn follow_up_request(&mut self) -> Result<Option<Request<Body>>, Error> { Ok(None) }
//! #     fn same_connection(&self, _: &Uri) -> bool { false }
//! #     fn close(&mut self) -> Option<Lease> { None }
//! #     fn cancel_handle(&self) -> Arc<dyn Cancel> { Arc::new(Noop) }
//! #     fn take_response(&mut self) -> Option<Response<Body>> { self.0.take() }
//! # }
//! # fn my_transport() -> Canned { Canned }
//!
//! let client = Client::new(my_transport());
//!
//! let request = Request::get("http://example.test/")
//!     .body(Body::empty())
//!     .unwrap();
//!
//! let call = client.new_call(request);
//! let response = call.execute().unwrap();
//!
//! assert_eq!(response.status(), 200);
//! assert!(call.is_executed());
//!
//! // A call can only be used once.
//! assert!(call.execute().is_err());
//! ```

#![forbid(unsafe_code)]
#![warn(clippy::all)]
#![deny(missing_docs)]

#[macro_use]
extern crate log;

mod body;
mod call;
mod client;
mod error;
mod ext;
mod scheduler;
mod transport;
mod util;

pub mod followup;

#[cfg(test)]
mod test;

pub use body::Body;
pub use call::{AsyncCall, Call, CallId, Callback, Chain, Interceptor, LeasePolicy, Tag};
pub use client::{CallFactory, Client, ClientBuilder, Config, MAX_FOLLOW_UPS};
pub use error::{Error, ErrorKind};
pub use scheduler::{Dispatcher, Scheduler};
pub use transport::{Cancel, Connection, Exchange, Lease, Transport, Upgraded};

pub use http;
