use std::sync::Arc;

use http::{Request, Response};

use super::{engine, Call};
use crate::{Body, Error};

/// Observes, modifies and potentially short-circuits requests and the
/// corresponding responses.
///
/// Interceptors run in registration order around the retry and follow-up
/// engine. Each sees the request as passed along by the previous interceptor,
/// and only the final response of the call, never intermediate redirects.
///
/// An interceptor typically calls [`Chain::proceed()`] exactly once, but may
/// return a response without proceeding, or proceed several times.
///
/// ```
/// use ureq_call::{Body, Chain, Error, Interceptor};
/// use ureq_call::http::Response;
///
/// struct UserAgent;
///
/// impl Interceptor for UserAgent {
///     fn intercept(&self, chain: Chain<'_>) -> Result<Option<Response<Body>>, Error> {
///         let mut request = chain.request().clone();
///         request
///             .headers_mut()
///             .insert("user-agent", "ureq-call".parse().unwrap());
///         chain.proceed(request).map(Some)
///     }
/// }
/// ```
pub trait Interceptor: Send + Sync + 'static {
    /// Intercept the request of `chain`.
    ///
    /// Returning `Ok(None)` is a programming error and fails the call with
    /// [`Error::InterceptorNoResponse`].
    fn intercept(&self, chain: Chain<'_>) -> Result<Option<Response<Body>>, Error>;

    /// Name used when reporting errors.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

impl<F> Interceptor for F
where
    F: Fn(Chain<'_>) -> Result<Option<Response<Body>>, Error> + Send + Sync + 'static,
{
    fn intercept(&self, chain: Chain<'_>) -> Result<Option<Response<Body>>, Error> {
        (self)(chain)
    }
}

/// Position in the interceptor pipeline.
///
/// The chain is immutable. Proceeding creates the chain of the next
/// position, which means proceeding more than once re-runs the rest of
/// the pipeline.
pub struct Chain<'a> {
    call: &'a Call,
    interceptors: &'a [Arc<dyn Interceptor>],
    index: usize,
    request: Request<Body>,
}

impl<'a> Chain<'a> {
    pub(crate) fn new(
        call: &'a Call,
        interceptors: &'a [Arc<dyn Interceptor>],
        index: usize,
        request: Request<Body>,
    ) -> Self {
        Chain {
            call,
            interceptors,
            index,
            request,
        }
    }

    /// The request at this position of the pipeline.
    pub fn request(&self) -> &Request<Body> {
        &self.request
    }

    /// The call being executed.
    pub fn call(&self) -> &Call {
        self.call
    }

    /// Pass `request` to the rest of the pipeline and return its response.
    pub fn proceed(&self, request: Request<Body>) -> Result<Response<Body>, Error> {
        let Some(interceptor) = self.interceptors.get(self.index) else {
            // End of the pipeline.
            return engine::run(self.call, request);
        };

        let next = Chain::new(self.call, self.interceptors, self.index + 1, request);

        match interceptor.intercept(next)? {
            Some(response) => Ok(response),
            None => Err(Error::InterceptorNoResponse(interceptor.name().to_string())),
        }
    }
}
