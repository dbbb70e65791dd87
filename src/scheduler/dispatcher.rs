use std::collections::VecDeque;
use std::fmt;
use std::sync::Mutex;
use std::thread;

use super::Scheduler;
use crate::util::{lock, redact};
use crate::{AsyncCall, Call, Tag};

/// Default limit of concurrently running asynchronous calls.
const MAX_REQUESTS: usize = 64;

/// Default limit of concurrently running asynchronous calls per host.
const MAX_REQUESTS_PER_HOST: usize = 5;

/// Thread-per-call [`Scheduler`] with concurrency limits.
///
/// At most [`max_requests()`][Dispatcher::max_requests] enqueued calls run at
/// the same time, and at most
/// [`max_requests_per_host()`][Dispatcher::max_requests_per_host] of them
/// for the same host. Calls exceeding the limits wait in FIFO order until a
/// running call finishes or the limits are raised. Each call runs on a
/// thread of its own.
///
/// Synchronous calls are tracked but never limited.
pub struct Dispatcher {
    state: Mutex<State>,
}

struct State {
    max_requests: usize,
    max_requests_per_host: usize,
    ready: VecDeque<AsyncCall>,
    running_async: Vec<Call>,
    running_sync: Vec<Call>,
}

impl State {
    fn running_for_host(&self, host: &str) -> usize {
        self.running_async
            .iter()
            .filter(|c| c.host().eq_ignore_ascii_case(host))
            .count()
    }

    /// Move calls within the limits from the ready queue to running.
    fn promote(&mut self) -> Vec<AsyncCall> {
        let mut promoted = vec![];
        let mut i = 0;

        while i < self.ready.len() {
            if self.running_async.len() >= self.max_requests {
                break;
            }

            if self.running_for_host(self.ready[i].host()) >= self.max_requests_per_host {
                i += 1;
                continue;
            }

            if let Some(task) = self.ready.remove(i) {
                self.running_async.push(task.call().clone());
                promoted.push(task);
            }
        }

        promoted
    }

    fn all_calls(&self) -> impl Iterator<Item = &Call> {
        self.ready
            .iter()
            .map(|t| t.call())
            .chain(self.running_async.iter())
            .chain(self.running_sync.iter())
    }
}

fn remove(calls: &mut Vec<Call>, call: &Call) -> bool {
    match calls.iter().position(|c| c.ptr_eq(call)) {
        Some(i) => {
            calls.swap_remove(i);
            true
        }
        None => false,
    }
}

impl Dispatcher {
    /// Create a dispatcher with the default limits of 64 calls, 5 per host.
    pub fn new() -> Self {
        Dispatcher::with_limits(MAX_REQUESTS, MAX_REQUESTS_PER_HOST)
    }

    /// Create a dispatcher with the given limits.
    ///
    /// Limits below 1 are raised to 1.
    pub fn with_limits(max_requests: usize, max_requests_per_host: usize) -> Self {
        Dispatcher {
            state: Mutex::new(State {
                max_requests: max_requests.max(1),
                max_requests_per_host: max_requests_per_host.max(1),
                ready: VecDeque::new(),
                running_async: vec![],
                running_sync: vec![],
            }),
        }
    }

    /// Maximum number of concurrently running asynchronous calls.
    pub fn max_requests(&self) -> usize {
        lock(&self.state).max_requests
    }

    /// Change the maximum number of concurrently running asynchronous calls.
    ///
    /// Raising the limit starts waiting calls. Lowering it leaves running
    /// calls running.
    pub fn set_max_requests(&self, max_requests: usize) {
        lock(&self.state).max_requests = max_requests.max(1);
        self.promote();
    }

    /// Maximum number of concurrently running asynchronous calls per host.
    pub fn max_requests_per_host(&self) -> usize {
        lock(&self.state).max_requests_per_host
    }

    /// Change the maximum number of concurrently running asynchronous calls
    /// per host.
    pub fn set_max_requests_per_host(&self, max_requests_per_host: usize) {
        lock(&self.state).max_requests_per_host = max_requests_per_host.max(1);
        self.promote();
    }

    /// Number of enqueued calls waiting to run.
    pub fn queued_calls_count(&self) -> usize {
        lock(&self.state).ready.len()
    }

    /// Number of running calls, synchronous and asynchronous.
    pub fn running_calls_count(&self) -> usize {
        let state = lock(&self.state);
        state.running_async.len() + state.running_sync.len()
    }

    /// Enqueued calls waiting to run.
    pub fn queued_calls(&self) -> Vec<Call> {
        lock(&self.state).ready.iter().map(|t| t.call().clone()).collect()
    }

    /// Running calls, synchronous and asynchronous.
    pub fn running_calls(&self) -> Vec<Call> {
        let state = lock(&self.state);
        state
            .running_async
            .iter()
            .chain(state.running_sync.iter())
            .cloned()
            .collect()
    }

    /// Cancel all calls, waiting and running.
    pub fn cancel_all(&self) {
        let calls: Vec<Call> = lock(&self.state).all_calls().cloned().collect();

        debug!("Cancel {} calls", calls.len());

        for call in calls {
            call.cancel();
        }
    }

    /// Cancel all waiting and running calls whose request is tagged `tag`.
    pub fn cancel_tagged(&self, tag: &Tag) {
        let calls: Vec<Call> = lock(&self.state)
            .all_calls()
            .filter(|c| c.tag() == Some(tag))
            .cloned()
            .collect();

        debug!("Cancel {} calls tagged {}", calls.len(), tag.as_str());

        for call in calls {
            call.cancel();
        }
    }

    fn promote(&self) {
        // Spawn outside the lock, a failed spawn calls back into the dispatcher.
        let promoted = lock(&self.state).promote();

        for task in promoted {
            self.spawn(task);
        }
    }

    fn spawn(&self, task: AsyncCall) {
        let call = task.call().clone();
        let name = format!("ureq-call {}", redact(call.request().uri()));

        let result = thread::Builder::new()
            .name(name)
            .spawn(move || task.run());

        if let Err(e) = result {
            // The task was dropped with the closure, which failed its callback.
            warn!("Failed to spawn thread for {}: {}", call.describe(), e);
            self.finished_async(&call);
        }
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Dispatcher::new()
    }
}

impl Scheduler for Dispatcher {
    fn executed(&self, call: &Call) {
        lock(&self.state).running_sync.push(call.clone());
    }

    fn finished(&self, call: &Call) {
        if !remove(&mut lock(&self.state).running_sync, call) {
            warn!("Finished {} was not running", call.describe());
        }
    }

    fn enqueue(&self, task: AsyncCall) {
        debug!("Enqueue {}", task.call().describe());
        lock(&self.state).ready.push_back(task);
        self.promote();
    }

    fn finished_async(&self, call: &Call) {
        if !remove(&mut lock(&self.state).running_async, call) {
            warn!("Finished {} was not running", call.describe());
        }
        self.promote();
    }
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = lock(&self.state);
        f.debug_struct("Dispatcher")
            .field("max_requests", &state.max_requests)
            .field("max_requests_per_host", &state.max_requests_per_host)
            .field("queued", &state.ready.len())
            .field("running_async", &state.running_async.len())
            .field("running_sync", &state.running_sync.len())
            .finish()
    }
}
