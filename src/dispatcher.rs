//! Event dispatcher
//!
//! Bridges notifications produced on arbitrary driver threads to one
//! background worker. Producers append to a queue under a mutex and signal a
//! condition variable; they never wait on user code. The worker drains the
//! whole queue per wake-up and runs callbacks outside the lock, in enqueue
//! order.
//!
//! A callback failure, returned or panicked, is logged and discarded so the
//! worker keeps running.

use std::collections::VecDeque;
use std::fmt;
use std::mem;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, OnceLock};
use std::thread;

use parking_lot::{Condvar, Mutex};

use crate::error::Result;
use crate::subscription::{SubscrCallback, SubscrMessage};

struct Pending {
    message: SubscrMessage,
    callback: SubscrCallback,
}

#[derive(Default)]
struct Queue {
    items: VecDeque<Pending>,
    worker_started: bool,
}

struct Shared {
    queue: Mutex<Queue>,
    wake: Condvar,
}

/// Queue plus single worker delivering notifications.
///
/// Cloning shares the same queue and worker.
#[derive(Clone)]
pub struct EventDispatcher {
    shared: Arc<Shared>,
}

static GLOBAL: OnceLock<EventDispatcher> = OnceLock::new();

impl EventDispatcher {
    /// Independent dispatcher; its worker starts on first [`start`](Self::start)
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Shared {
                queue: Mutex::new(Queue::default()),
                wake: Condvar::new(),
            }),
        }
    }

    /// Process-wide dispatcher shared by all subscriptions
    pub fn global() -> &'static EventDispatcher {
        GLOBAL.get_or_init(EventDispatcher::new)
    }

    /// Start the worker if it is not running yet.
    ///
    /// The worker lives for the rest of the process.
    pub fn start(&self) -> Result<()> {
        let mut queue = self.shared.queue.lock();
        if queue.worker_started {
            return Ok(());
        }
        let shared = self.shared.clone();
        thread::Builder::new()
            .name("oracledb-events".to_string())
            .spawn(move || run_worker(&shared))?;
        queue.worker_started = true;
        tracing::debug!("event dispatcher worker started");
        Ok(())
    }

    /// Queue a message for `callback` and wake the worker
    pub fn enqueue(&self, message: SubscrMessage, callback: SubscrCallback) {
        let mut queue = self.shared.queue.lock();
        queue.items.push_back(Pending { message, callback });
        tracing::trace!(pending = queue.items.len(), "notification queued");
        drop(queue);
        self.shared.wake.notify_one();
    }

    /// Messages queued but not yet taken by the worker
    pub fn pending(&self) -> usize {
        self.shared.queue.lock().items.len()
    }
}

impl Default for EventDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for EventDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let queue = self.shared.queue.lock();
        f.debug_struct("EventDispatcher")
            .field("pending", &queue.items.len())
            .field("worker_started", &queue.worker_started)
            .finish()
    }
}

fn run_worker(shared: &Shared) {
    loop {
        let batch = {
            let mut queue = shared.queue.lock();
            while queue.items.is_empty() {
                shared.wake.wait(&mut queue);
            }
            mem::take(&mut queue.items)
        };
        tracing::trace!(count = batch.len(), "draining notifications");
        for Pending { message, callback } in batch {
            deliver(&message, &callback);
        }
    }
}

fn deliver(message: &SubscrMessage, callback: &SubscrCallback) {
    match catch_unwind(AssertUnwindSafe(|| callback(message))) {
        Ok(Ok(())) => {}
        Ok(Err(e)) => {
            tracing::warn!(event = %message.event_type, error = %e, "notification callback failed")
        }
        Err(_) => tracing::warn!(event = %message.event_type, "notification callback panicked"),
    }
}
