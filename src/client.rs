use std::fmt;
use std::sync::Arc;

use http::Request;

use crate::{Body, Call, Dispatcher, Interceptor, LeasePolicy, Scheduler, Transport};

/// Default limit of follow-up requests for a single call.
///
/// Chrome follows 21 redirects, Firefox, curl and wget follow 20.
pub const MAX_FOLLOW_UPS: u32 = 20;

/// Factory of [`Call`]s.
pub trait CallFactory {
    /// Prepare `request` to be executed at some point.
    fn new_call(&self, request: Request<Body>) -> Call;
}

/// Plain configuration values of a [`Client`].
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct Config {
    /// Maximum number of follow-up requests per call.
    ///
    /// Exceeding the limit fails the call with
    /// [`Error::TooManyFollowUps`][crate::Error::TooManyFollowUps].
    /// Defaults to [`MAX_FOLLOW_UPS`].
    pub max_follow_ups: u32,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            max_follow_ups: MAX_FOLLOW_UPS,
        }
    }
}

/// Creates [`Call`]s sharing transport, interceptors and scheduler.
///
/// Cloning a client is cheap, all clones share the same parts.
#[derive(Clone)]
pub struct Client {
    inner: Arc<Inner>,
}

struct Inner {
    transport: Arc<dyn Transport>,
    interceptors: Vec<Arc<dyn Interceptor>>,
    scheduler: Arc<dyn Scheduler>,
    config: Config,
}

impl Client {
    /// Client with default configuration.
    ///
    /// Enqueued calls are run by a [`Dispatcher`] with default limits.
    pub fn new(transport: impl Transport) -> Self {
        Client::builder(transport).build()
    }

    /// Start building a client.
    pub fn builder(transport: impl Transport) -> ClientBuilder {
        ClientBuilder {
            transport: Arc::new(transport),
            interceptors: vec![],
            scheduler: None,
            config: Config::default(),
        }
    }

    /// Prepare a call which keeps the connection after the response.
    ///
    /// See [`LeasePolicy::KeepForUpgrade`].
    pub fn new_upgrade_call(&self, request: Request<Body>) -> Call {
        Call::new(self.clone(), request, LeasePolicy::KeepForUpgrade)
    }

    /// The configuration values.
    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    /// The scheduler running enqueued calls.
    pub fn scheduler(&self) -> &Arc<dyn Scheduler> {
        &self.inner.scheduler
    }

    /// The interceptors, in the order they run.
    pub fn interceptors(&self) -> &[Arc<dyn Interceptor>] {
        &self.inner.interceptors
    }

    pub(crate) fn transport(&self) -> &dyn Transport {
        &*self.inner.transport
    }
}

impl CallFactory for Client {
    fn new_call(&self, request: Request<Body>) -> Call {
        Call::new(self.clone(), request, LeasePolicy::ReleaseOnResponse)
    }
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("interceptors", &self.inner.interceptors.len())
            .field("config", &self.inner.config)
            .finish()
    }
}

/// Builder of a [`Client`].
pub struct ClientBuilder {
    transport: Arc<dyn Transport>,
    interceptors: Vec<Arc<dyn Interceptor>>,
    scheduler: Option<Arc<dyn Scheduler>>,
    config: Config,
}

impl ClientBuilder {
    /// Add an interceptor after the ones already added.
    pub fn interceptor(self, interceptor: impl Interceptor) -> Self {
        self.interceptor_arc(Arc::new(interceptor))
    }

    /// Add a shared interceptor after the ones already added.
    pub fn interceptor_arc(mut self, interceptor: Arc<dyn Interceptor>) -> Self {
        self.interceptors.push(interceptor);
        self
    }

    /// Use `scheduler` to run enqueued calls.
    pub fn scheduler(self, scheduler: impl Scheduler) -> Self {
        self.scheduler_arc(Arc::new(scheduler))
    }

    /// Use a shared scheduler to run enqueued calls.
    ///
    /// Keep a clone of the `Arc` to, for instance, inspect a [`Dispatcher`].
    pub fn scheduler_arc(mut self, scheduler: Arc<dyn Scheduler>) -> Self {
        self.scheduler = Some(scheduler);
        self
    }

    /// Maximum number of follow-up requests per call.
    pub fn max_follow_ups(mut self, max_follow_ups: u32) -> Self {
        self.config.max_follow_ups = max_follow_ups;
        self
    }

    /// Build the client.
    pub fn build(self) -> Client {
        let scheduler: Arc<dyn Scheduler> = match self.scheduler {
            Some(v) => v,
            None => Arc::new(Dispatcher::new()),
        };

        Client {
            inner: Arc::new(Inner {
                transport: self.transport,
                interceptors: self.interceptors,
                scheduler,
                config: self.config,
            }),
        }
    }
}

impl fmt::Debug for ClientBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientBuilder")
            .field("interceptors", &self.interceptors.len())
            .field("config", &self.config)
            .finish()
    }
}
