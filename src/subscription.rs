//! Change notification subscriptions
//!
//! The driver reports events on its own threads through a
//! [`NotificationSink`]. [`SubscriptionSink`] deep-copies each message out of
//! driver memory into a [`SubscrMessage`] and hands it to the
//! [`EventDispatcher`], whose worker invokes the user callback.

use std::fmt;
use std::sync::Arc;

use crate::constants::{EventType, OpCode};
use crate::dispatcher::EventDispatcher;
use crate::driver::{
    NotificationSink, SubscrHandle, SubscrMessageQueryRef, SubscrMessageRef, SubscrMessageRowRef,
    SubscrMessageTableRef,
};
use crate::error::{ErrorInfo, Result};
use crate::session::Session;
use crate::statement::Stmt;

/// Callback receiving notifications on the dispatcher worker.
///
/// Errors and panics are logged and discarded.
pub type SubscrCallback = Arc<dyn Fn(&SubscrMessage) -> Result<()> + Send + Sync>;

fn text(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

fn optional_text(bytes: &[u8]) -> Option<String> {
    (!bytes.is_empty()).then(|| text(bytes))
}

/// Row affected by a change
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscrMessageRow {
    /// Operation on the row
    pub operation: OpCode,
    /// Rowid
    pub rowid: String,
}

impl SubscrMessageRow {
    fn copy_from(row: &SubscrMessageRowRef<'_>) -> Self {
        Self {
            operation: row.operation,
            rowid: text(row.rowid),
        }
    }
}

/// Table affected by a change
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscrMessageTable {
    /// Operation on the table
    pub operation: OpCode,
    /// Qualified table name
    pub name: String,
    /// Affected rows; empty unless rowids were requested
    pub rows: Vec<SubscrMessageRow>,
}

impl SubscrMessageTable {
    fn copy_from(table: &SubscrMessageTableRef<'_>) -> Self {
        Self {
            operation: table.operation,
            name: text(table.name),
            rows: table.rows.iter().map(SubscrMessageRow::copy_from).collect(),
        }
    }
}

/// Registered query whose result changed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscrMessageQuery {
    /// Query id
    pub id: u64,
    /// Operation on the query
    pub operation: OpCode,
    /// Tables behind the change
    pub tables: Vec<SubscrMessageTable>,
}

impl SubscrMessageQuery {
    fn copy_from(query: &SubscrMessageQueryRef<'_>) -> Self {
        Self {
            id: query.id,
            operation: query.operation,
            tables: query.tables.iter().map(SubscrMessageTable::copy_from).collect(),
        }
    }
}

/// Self-contained notification, independent of driver memory
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SubscrMessage {
    /// Event kind
    pub event_type: EventType,
    /// Database name
    pub db_name: String,
    /// Affected tables
    pub tables: Vec<SubscrMessageTable>,
    /// Affected queries
    pub queries: Vec<SubscrMessageQuery>,
    /// Error raised while producing the notification
    pub error_info: Option<ErrorInfo>,
    /// Transaction id
    pub tx_id: Vec<u8>,
    /// Whether the registration is still active
    pub registered: bool,
    /// Queue name (AQ events)
    pub queue_name: Option<String>,
    /// Consumer name (AQ events)
    pub consumer_name: Option<String>,
}

impl SubscrMessage {
    /// Deep-copy a message borrowed from driver memory
    pub fn copy_from(message: &SubscrMessageRef<'_>) -> Self {
        Self {
            event_type: message.event_type,
            db_name: text(message.db_name),
            tables: message.tables.iter().map(SubscrMessageTable::copy_from).collect(),
            queries: message.queries.iter().map(SubscrMessageQuery::copy_from).collect(),
            error_info: message.error_info.cloned(),
            tx_id: message.tx_id.to_vec(),
            registered: message.registered,
            queue_name: optional_text(message.queue_name),
            consumer_name: optional_text(message.consumer_name),
        }
    }

    /// Transaction id as lowercase hex
    pub fn tx_id_hex(&self) -> String {
        hex::encode(&self.tx_id)
    }
}

/// Sink registered with the driver: copies each message and queues it
pub struct SubscriptionSink {
    callback: Option<SubscrCallback>,
    dispatcher: EventDispatcher,
}

impl SubscriptionSink {
    /// Sink delivering to `callback` through `dispatcher`
    pub fn new(callback: Option<SubscrCallback>, dispatcher: EventDispatcher) -> Self {
        Self {
            callback,
            dispatcher,
        }
    }
}

impl NotificationSink for SubscriptionSink {
    fn notify(&self, message: &SubscrMessageRef<'_>) {
        match &self.callback {
            Some(callback) => self
                .dispatcher
                .enqueue(SubscrMessage::copy_from(message), callback.clone()),
            None => tracing::trace!(event = %message.event_type, "notification without callback dropped"),
        }
    }
}

impl fmt::Debug for SubscriptionSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscriptionSink")
            .field("callback", &self.callback.as_ref().map(|_| ".."))
            .finish()
    }
}

/// Active registration
#[derive(Debug, Clone)]
pub struct Subscription {
    handle: SubscrHandle,
    session: Session,
}

impl Subscription {
    /// Wrap a driver subscription handle
    pub fn new(handle: SubscrHandle, session: Session) -> Self {
        Self { handle, session }
    }

    /// Driver handle
    pub fn handle(&self) -> &SubscrHandle {
        &self.handle
    }

    /// Registration id
    pub fn id(&self) -> u64 {
        self.handle.id()
    }

    /// Prepare a query to register with this subscription
    pub fn prepare_stmt(&self, sql: &str) -> Result<Stmt> {
        let handle = self.handle.prepare_stmt(sql)?;
        Ok(Stmt::new(handle, self.session.clone()))
    }

    /// Stop delivery. Messages already queued are still delivered.
    pub fn unsubscribe(&self) -> Result<()> {
        self.session.conn().unsubscribe(&self.handle)?;
        tracing::debug!(id = self.id(), "subscription unregistered");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deep_copy() {
        let rows = [SubscrMessageRowRef {
            operation: OpCode::INSERT,
            rowid: b"AAAAABAABAAAAABAAB",
        }];
        let tables = [SubscrMessageTableRef {
            operation: OpCode::INSERT,
            name: b"SCOTT.EMP",
            rows: &rows,
        }];
        let queries = [SubscrMessageQueryRef {
            id: 7,
            operation: OpCode::ALL_ROWS,
            tables: &tables,
        }];
        let info = ErrorInfo::new(1, "x");
        let message = SubscrMessageRef {
            db_name: b"ORCL",
            tables: &tables,
            queries: &queries,
            error_info: Some(&info),
            tx_id: &[0x0a, 0xff],
            queue_name: b"",
            ..SubscrMessageRef::event(EventType::QueryChange)
        };
        let copy = SubscrMessage::copy_from(&message);
        assert_eq!(copy.event_type, EventType::QueryChange);
        assert_eq!(copy.db_name, "ORCL");
        assert_eq!(copy.tables[0].rows[0].rowid, "AAAAABAABAAAAABAAB");
        assert_eq!(copy.queries[0].tables[0].name, "SCOTT.EMP");
        assert_eq!(copy.error_info, Some(info));
        assert_eq!(copy.tx_id_hex(), "0aff");
        assert!(copy.registered);
        assert_eq!(copy.queue_name, None);
    }
}
