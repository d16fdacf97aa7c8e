//! In-process reference driver
//!
//! Implements every driver trait over plain memory, so the marshalling core
//! can run without a database. A [`MemoryContext`] owns a registry shared by
//! all of its connections:
//! - object types, registered with [`MemoryContext::register_type`]
//! - canned query results, registered with [`MemoryContext::register_query`]
//! - BFILE contents, registered with [`MemoryContext::add_file`]
//! - active subscriptions, which [`MemoryContext::publish`] notifies from the
//!   calling thread, as a client library would from one of its own
//!
//! Byte payloads are copied on every write, so a caller's buffer only needs to
//! live for the duration of the call.

mod json;
mod lob;
mod object;
mod stmt;
mod subscr;
mod var;

pub use json::MemoryJson;
pub use lob::MemoryLob;
pub use object::{MemoryObject, MemoryObjectAttr, MemoryObjectType};
pub use stmt::{MemoryResultSet, MemoryStmt};
pub use subscr::MemorySubscr;
pub use var::MemoryVar;

use std::any::Any;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::config::{
    CommonCreateParams, ConnCreateParams, ContextCreateParams, PoolCreateParams, SubscrCreateParams,
};
use crate::constants::{error_code, OracleType, PoolGetMode};
use crate::driver::{
    ConnBackend, ConnHandle, ContextBackend, DriverResult, JsonHandle, LobHandle, NotificationSink,
    ObjectTypeHandle, PoolBackend, PoolHandle, RowidBackend, StmtHandle, SubscrBackend,
    SubscrHandle, SubscrMessageRef, VarHandle,
};
use crate::error::ErrorInfo;
use crate::info::VersionInfo;
use crate::types::RowidParts;
use crate::var::VarSpec;

/// Client library version reported by the reference driver
pub const CLIENT_VERSION: VersionInfo = VersionInfo {
    version: 23,
    release: 4,
    update: 0,
    port_release: 24,
    port_update: 5,
};

/// Server version reported by reference connections
pub const SERVER_VERSION: VersionInfo = VersionInfo {
    version: 23,
    release: 4,
    update: 0,
    port_release: 24,
    port_update: 5,
};

pub(crate) fn driver_error(code: i32, message: impl Into<String>, fn_name: &str) -> ErrorInfo {
    ErrorInfo::new(code, message).with_origin(fn_name, "")
}

/// State shared by a context and everything created from it
#[derive(Debug, Default)]
pub(crate) struct Registry {
    types: Mutex<Vec<Arc<MemoryObjectType>>>,
    queries: Mutex<HashMap<String, MemoryResultSet>>,
    files: Mutex<HashMap<(String, String), Vec<u8>>>,
    subscriptions: Mutex<Vec<Arc<MemorySubscr>>>,
    next_subscr_id: AtomicU64,
}

impl Registry {
    fn find_type(&self, name: &str) -> Option<Arc<MemoryObjectType>> {
        self.types
            .lock()
            .iter()
            .find(|t| t.matches(name))
            .cloned()
    }

    pub(crate) fn query(&self, sql: &str) -> Option<MemoryResultSet> {
        self.queries.lock().get(sql.trim()).cloned()
    }

    pub(crate) fn file(&self, directory: &str, file_name: &str) -> Option<Vec<u8>> {
        self.files
            .lock()
            .get(&(directory.to_string(), file_name.to_string()))
            .cloned()
    }
}

/// Reference client library
#[derive(Debug, Default)]
pub struct MemoryContext {
    registry: Arc<Registry>,
    params: Mutex<Option<ContextCreateParams>>,
}

impl MemoryContext {
    /// Fresh context with an empty registry
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Make an object type visible to [`ConnBackend::object_type`]
    pub fn register_type(&self, object_type: MemoryObjectType) -> Arc<MemoryObjectType> {
        let object_type = Arc::new(object_type);
        self.registry.types.lock().push(object_type.clone());
        object_type
    }

    /// Result set returned by statements prepared with exactly `sql`
    pub fn register_query(&self, sql: &str, result: MemoryResultSet) {
        self.registry.queries.lock().insert(sql.trim().to_string(), result);
    }

    /// Contents of the BFILE `directory`/`file_name`
    pub fn add_file(&self, directory: &str, file_name: &str, contents: &[u8]) {
        self.registry
            .files
            .lock()
            .insert((directory.to_string(), file_name.to_string()), contents.to_vec());
    }

    /// BFILE locator pointing at `directory`/`file_name`; the file need not exist
    pub fn new_bfile(&self, directory: &str, file_name: &str) -> LobHandle {
        Arc::new(MemoryLob::bfile(directory, file_name, self.registry.clone()))
    }

    /// Deliver `message` to every active subscription, on the calling thread
    pub fn publish(&self, message: &SubscrMessageRef<'_>) -> usize {
        let active: Vec<Arc<MemorySubscr>> = self
            .registry
            .subscriptions
            .lock()
            .iter()
            .filter(|s| s.is_active())
            .cloned()
            .collect();
        for subscr in &active {
            subscr.deliver(message);
        }
        active.len()
    }

    /// Parameters passed to the last [`ContextBackend::initialize`]
    pub fn params(&self) -> Option<ContextCreateParams> {
        self.params.lock().clone()
    }
}

impl ContextBackend for MemoryContext {
    fn client_version(&self) -> VersionInfo {
        CLIENT_VERSION
    }

    fn initialize(&self, params: &ContextCreateParams) -> DriverResult<()> {
        *self.params.lock() = Some(params.clone());
        Ok(())
    }

    fn connect(
        &self,
        username: &str,
        password: &str,
        _connect_string: &str,
        common: &CommonCreateParams,
        conn: &ConnCreateParams,
    ) -> DriverResult<ConnHandle> {
        if !conn.external_auth && (username.is_empty() || password.is_empty()) {
            return Err(driver_error(
                error_code::INVALID_CREDENTIALS,
                "invalid username/password; logon denied",
                "connect",
            ));
        }
        Ok(Arc::new(MemoryConnection::new(
            self.registry.clone(),
            common.stmt_cache_size,
            None,
        )))
    }

    fn create_pool(
        &self,
        username: &str,
        password: &str,
        _connect_string: &str,
        common: &CommonCreateParams,
        pool: &PoolCreateParams,
    ) -> DriverResult<PoolHandle> {
        if !pool.external_auth && (username.is_empty() || password.is_empty()) {
            return Err(driver_error(
                error_code::INVALID_CREDENTIALS,
                "invalid username/password; logon denied",
                "create_pool",
            ));
        }
        if pool.min_sessions > pool.max_sessions {
            return Err(driver_error(
                error_code::CLIENT,
                "DPI-1012: minimum sessions exceed maximum sessions",
                "create_pool",
            ));
        }
        Ok(Arc::new(MemoryPool {
            registry: self.registry.clone(),
            common: common.clone(),
            params: pool.clone(),
            state: Arc::new(Mutex::new(PoolState::default())),
        }))
    }
}

#[derive(Debug, Default)]
struct PoolState {
    busy: u32,
    closed: bool,
}

/// Reference session pool
#[derive(Debug)]
pub struct MemoryPool {
    registry: Arc<Registry>,
    common: CommonCreateParams,
    params: PoolCreateParams,
    state: Arc<Mutex<PoolState>>,
}

impl PoolBackend for MemoryPool {
    fn acquire(&self, _params: &ConnCreateParams) -> DriverResult<ConnHandle> {
        let mut state = self.state.lock();
        if state.closed {
            return Err(driver_error(error_code::CLIENT, "DPI-1010: not connected", "acquire"));
        }
        if state.busy >= self.params.max_sessions && self.params.get_mode != PoolGetMode::ForceGet {
            return Err(driver_error(
                error_code::POOL_EXHAUSTED,
                "maximum number of sessions reached, cannot open further sessions",
                "acquire",
            ));
        }
        state.busy += 1;
        Ok(Arc::new(MemoryConnection::new(
            self.registry.clone(),
            self.common.stmt_cache_size,
            Some(self.state.clone()),
        )))
    }

    fn open_count(&self) -> DriverResult<u32> {
        let state = self.state.lock();
        Ok(state.busy.max(self.params.min_sessions))
    }

    fn close(&self) -> DriverResult<()> {
        self.state.lock().closed = true;
        Ok(())
    }
}

/// Reference connection
#[derive(Debug)]
pub struct MemoryConnection {
    registry: Arc<Registry>,
    stmt_cache_size: u32,
    pool: Option<Arc<Mutex<PoolState>>>,
    transactions: Mutex<TransactionCounts>,
}

/// Commit and rollback counters
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TransactionCounts {
    /// Commits issued
    pub commits: u32,
    /// Rollbacks issued
    pub rollbacks: u32,
}

impl MemoryConnection {
    fn new(registry: Arc<Registry>, stmt_cache_size: u32, pool: Option<Arc<Mutex<PoolState>>>) -> Self {
        Self {
            registry,
            stmt_cache_size,
            pool,
            transactions: Mutex::new(TransactionCounts::default()),
        }
    }

    /// Statement cache size requested at connect
    pub fn stmt_cache_size(&self) -> u32 {
        self.stmt_cache_size
    }

    /// Commits and rollbacks issued so far
    pub fn transactions(&self) -> TransactionCounts {
        *self.transactions.lock()
    }
}

impl Drop for MemoryConnection {
    fn drop(&mut self) {
        if let Some(pool) = &self.pool {
            let mut state = pool.lock();
            state.busy = state.busy.saturating_sub(1);
        }
    }
}

impl ConnBackend for MemoryConnection {
    fn new_var(&self, spec: &VarSpec) -> DriverResult<VarHandle> {
        Ok(Arc::new(MemoryVar::new(spec)?))
    }

    fn new_temp_lob(&self, lob_type: OracleType) -> DriverResult<LobHandle> {
        Ok(Arc::new(MemoryLob::temporary(lob_type, self.registry.clone())?))
    }

    fn object_type(&self, name: &str) -> DriverResult<ObjectTypeHandle> {
        match self.registry.find_type(name) {
            Some(object_type) => Ok(object_type),
            None => Err(driver_error(
                error_code::INVALID_TYPE_NAME,
                format!("object {} does not exist", name),
                "object_type",
            )),
        }
    }

    fn new_json(&self) -> DriverResult<JsonHandle> {
        Ok(Arc::new(MemoryJson::new()))
    }

    fn prepare_stmt(&self, sql: &str, _scrollable: bool, _tag: Option<&str>) -> DriverResult<StmtHandle> {
        Ok(Arc::new(MemoryStmt::new(sql, self.registry.clone())))
    }

    fn subscribe(
        &self,
        params: &SubscrCreateParams,
        sink: Arc<dyn NotificationSink>,
    ) -> DriverResult<SubscrHandle> {
        let id = self.registry.next_subscr_id.fetch_add(1, Ordering::Relaxed) + 1;
        let subscr = Arc::new(MemorySubscr::new(id, params.qos, sink, self.registry.clone()));
        self.registry.subscriptions.lock().push(subscr.clone());
        Ok(subscr)
    }

    fn unsubscribe(&self, subscr: &SubscrHandle) -> DriverResult<()> {
        let id = subscr.id();
        let mut subscriptions = self.registry.subscriptions.lock();
        match subscriptions.iter().position(|s| s.id() == id) {
            Some(index) => {
                subscriptions.remove(index).deactivate();
                Ok(())
            }
            None => Err(driver_error(
                error_code::CLIENT,
                format!("DPI-1002: subscription {} is not registered", id),
                "unsubscribe",
            )),
        }
    }

    fn commit(&self) -> DriverResult<()> {
        self.transactions.lock().commits += 1;
        Ok(())
    }

    fn rollback(&self) -> DriverResult<()> {
        self.transactions.lock().rollbacks += 1;
        Ok(())
    }

    fn ping(&self) -> DriverResult<()> {
        Ok(())
    }

    fn server_version(&self) -> DriverResult<VersionInfo> {
        Ok(SERVER_VERSION)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Reference rowid holding its text form
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryRowid {
    text: String,
}

impl MemoryRowid {
    /// Rowid for the given physical location
    pub fn new(parts: RowidParts) -> Arc<Self> {
        Arc::new(Self {
            text: parts.to_string(),
        })
    }
}

impl RowidBackend for MemoryRowid {
    fn string_value(&self) -> DriverResult<String> {
        Ok(self.text.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connect_rejects_empty_credentials() {
        let context = MemoryContext::new();
        let err = context
            .connect("", "", "db", &CommonCreateParams::default(), &ConnCreateParams::default())
            .unwrap_err();
        assert_eq!(err.code, error_code::INVALID_CREDENTIALS);
        assert_eq!(err.fn_name, "connect");
    }

    #[test]
    fn test_pool_limits() {
        let context = MemoryContext::new();
        let pool = context
            .create_pool(
                "u",
                "p",
                "db",
                &CommonCreateParams::default(),
                &PoolCreateParams::default().with_sessions(1, 2, 1),
            )
            .unwrap();
        let a = pool.acquire(&ConnCreateParams::default()).unwrap();
        let _b = pool.acquire(&ConnCreateParams::default()).unwrap();
        assert_eq!(pool.open_count().unwrap(), 2);
        assert_eq!(
            pool.acquire(&ConnCreateParams::default()).unwrap_err().code,
            error_code::POOL_EXHAUSTED
        );
        drop(a);
        assert!(pool.acquire(&ConnCreateParams::default()).is_ok());
    }

    #[test]
    fn test_unknown_object_type() {
        let context = MemoryContext::new();
        let conn = context
            .connect("u", "p", "db", &CommonCreateParams::default(), &ConnCreateParams::default())
            .unwrap();
        assert_eq!(conn.object_type("NOPE").unwrap_err().code, error_code::INVALID_TYPE_NAME);
    }

    #[test]
    fn test_rowid_text() {
        let rowid = MemoryRowid::new(RowidParts::new(1, 1, 1, 1));
        assert_eq!(rowid.string_value().unwrap(), "AAAAABAABAAAAABAAB");
    }
}
