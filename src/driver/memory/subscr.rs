//! Reference subscription

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::{MemoryStmt, Registry};
use crate::constants::SubscrQos;
use crate::driver::{DriverResult, NotificationSink, StmtHandle, SubscrBackend, SubscrMessageRef};

/// Reference subscription; notifications arrive through [`super::MemoryContext::publish`]
pub struct MemorySubscr {
    id: u64,
    qos: SubscrQos,
    sink: Arc<dyn NotificationSink>,
    registry: Arc<Registry>,
    active: AtomicBool,
}

impl MemorySubscr {
    pub(crate) fn new(id: u64, qos: SubscrQos, sink: Arc<dyn NotificationSink>, registry: Arc<Registry>) -> Self {
        Self {
            id,
            qos,
            sink,
            registry,
            active: AtomicBool::new(true),
        }
    }

    /// Whether notifications are still delivered
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Hand `message` to the sink; a `DEREG_NFY` subscription stops after one
    pub fn deliver(&self, message: &SubscrMessageRef<'_>) {
        if !self.is_active() {
            return;
        }
        if self.qos.contains(SubscrQos::DEREG_NFY) {
            self.deactivate();
            let message = SubscrMessageRef {
                registered: false,
                ..*message
            };
            self.sink.notify(&message);
        } else {
            self.sink.notify(message);
        }
    }

    /// Stop delivering notifications
    pub fn deactivate(&self) {
        self.active.store(false, Ordering::Release);
    }
}

impl SubscrBackend for MemorySubscr {
    fn id(&self) -> u64 {
        self.id
    }

    fn prepare_stmt(&self, sql: &str) -> DriverResult<StmtHandle> {
        Ok(Arc::new(MemoryStmt::new(sql, self.registry.clone())))
    }
}

impl fmt::Debug for MemorySubscr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemorySubscr")
            .field("id", &self.id)
            .field("qos", &self.qos)
            .field("active", &self.is_active())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::EventType;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct Recorder {
        seen: Mutex<Vec<(EventType, bool)>>,
    }

    impl NotificationSink for Recorder {
        fn notify(&self, message: &SubscrMessageRef<'_>) {
            self.seen.lock().push((message.event_type, message.registered));
        }
    }

    #[test]
    fn test_dereg_after_first() {
        let recorder = Arc::new(Recorder::default());
        let subscr = MemorySubscr::new(1, SubscrQos::DEREG_NFY, recorder.clone(), Arc::new(Registry::default()));
        subscr.deliver(&SubscrMessageRef::event(EventType::ObjectChange));
        subscr.deliver(&SubscrMessageRef::event(EventType::ObjectChange));
        assert!(!subscr.is_active());
        assert_eq!(*recorder.seen.lock(), vec![(EventType::ObjectChange, false)]);
    }
}
