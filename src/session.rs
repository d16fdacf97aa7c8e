//! Context, sessions and pools
//!
//! A [`Context`] owns the initialized client library. Every [`Session`] keeps
//! its connection handle and a clone of the context, and every value wrapper
//! keeps its own handle and a clone of the session. Fields are declared
//! handle first, so dropping a wrapper releases the driver resource before
//! the session, and the last session before the context.
//!
//! ```rust
//! use oracledb::driver::memory::MemoryContext;
//! use oracledb::params::{options, OptionMap};
//! use oracledb::Context;
//!
//! let context = Context::new(MemoryContext::new(), &OptionMap::new()).unwrap();
//! let session = context
//!     .connect("scott", "tiger", "localhost/FREEPDB1", &options([("stmt_cache_size", 10.into())]))
//!     .unwrap();
//! session.ping().unwrap();
//! ```

use std::fmt;
use std::sync::Arc;

use crate::config::{
    CommonCreateParams, ConnCreateParams, ContextCreateParams, PoolCreateParams, SubscrCreateParams,
};
use crate::constants::OracleType;
use crate::dbobject::ObjectType;
use crate::dispatcher::EventDispatcher;
use crate::driver::{ConnHandle, ContextBackend, PoolHandle};
use crate::error::Result;
use crate::info::VersionInfo;
use crate::params::OptionMap;
use crate::statement::Stmt;
use crate::subscription::{Subscription, SubscriptionSink};
use crate::types::{Json, Lob};
use crate::var::{Var, VarSpec};

struct ContextInner {
    backend: Arc<dyn ContextBackend>,
    params: ContextCreateParams,
}

/// Initialized client library
#[derive(Clone)]
pub struct Context {
    inner: Arc<ContextInner>,
}

impl Context {
    /// Initialize `backend` with options from the context table
    pub fn new(backend: Arc<dyn ContextBackend>, options: &OptionMap) -> Result<Self> {
        let params = ContextCreateParams::from_options(options)?;
        Self::with_params(backend, params)
    }

    /// Initialize `backend` with typed parameters
    pub fn with_params(backend: Arc<dyn ContextBackend>, params: ContextCreateParams) -> Result<Self> {
        backend.initialize(&params)?;
        tracing::trace!(version = %backend.client_version(), "client library initialized");
        Ok(Self {
            inner: Arc::new(ContextInner { backend, params }),
        })
    }

    /// Parameters the context was created with
    pub fn params(&self) -> &ContextCreateParams {
        &self.inner.params
    }

    /// Client library version
    pub fn client_version(&self) -> VersionInfo {
        self.inner.backend.client_version()
    }

    /// Open a standalone session; options come from the common and conn tables
    pub fn connect(
        &self,
        username: &str,
        password: &str,
        connect_string: &str,
        options: &OptionMap,
    ) -> Result<Session> {
        let (common, conn) = ConnCreateParams::with_common_from_options(options)?;
        self.connect_with(username, password, connect_string, &common, &conn)
    }

    /// Open a standalone session with typed parameters
    pub fn connect_with(
        &self,
        username: &str,
        password: &str,
        connect_string: &str,
        common: &CommonCreateParams,
        conn: &ConnCreateParams,
    ) -> Result<Session> {
        let handle = self
            .inner
            .backend
            .connect(username, password, connect_string, common, conn)?;
        tracing::trace!(username, connect_string, "session opened");
        Ok(Session::new(handle, self.clone()))
    }

    /// Create a pool; options come from the common and pool tables
    pub fn create_pool(
        &self,
        username: &str,
        password: &str,
        connect_string: &str,
        options: &OptionMap,
    ) -> Result<Pool> {
        let (common, pool) = PoolCreateParams::with_common_from_options(options)?;
        self.create_pool_with(username, password, connect_string, &common, &pool)
    }

    /// Create a pool with typed parameters
    pub fn create_pool_with(
        &self,
        username: &str,
        password: &str,
        connect_string: &str,
        common: &CommonCreateParams,
        pool: &PoolCreateParams,
    ) -> Result<Pool> {
        let handle = self
            .inner
            .backend
            .create_pool(username, password, connect_string, common, pool)?;
        tracing::trace!(
            username,
            min_sessions = pool.min_sessions,
            max_sessions = pool.max_sessions,
            "pool created"
        );
        Ok(Pool {
            handle,
            context: self.clone(),
        })
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("backend", &self.inner.backend)
            .field("params", &self.inner.params)
            .finish()
    }
}

/// Database session
#[derive(Debug, Clone)]
pub struct Session {
    conn: ConnHandle,
    context: Context,
}

impl Session {
    /// Wrap a driver connection handle
    pub fn new(conn: ConnHandle, context: Context) -> Self {
        Self { conn, context }
    }

    /// Driver connection handle
    pub fn conn(&self) -> &ConnHandle {
        &self.conn
    }

    /// Owning context
    pub fn context(&self) -> &Context {
        &self.context
    }

    /// Create a variable array
    pub fn new_var(&self, spec: VarSpec) -> Result<Var> {
        Var::new(self, spec)
    }

    /// Look up an object type by name
    pub fn object_type(&self, name: &str) -> Result<ObjectType> {
        let handle = self.conn.object_type(name)?;
        ObjectType::new(handle, self.clone())
    }

    /// Create a temporary LOB
    pub fn new_temp_lob(&self, lob_type: OracleType) -> Result<Lob> {
        let handle = self.conn.new_temp_lob(lob_type)?;
        tracing::trace!(lob_type = %lob_type, "temporary LOB created");
        Ok(Lob::new(handle, self.clone()))
    }

    /// Create an empty JSON document
    pub fn new_json(&self) -> Result<Json> {
        let handle = self.conn.new_json()?;
        Ok(Json::new(handle, self.clone()))
    }

    /// Prepare a statement
    pub fn prepare_stmt(&self, sql: &str) -> Result<Stmt> {
        self.prepare_stmt_with(sql, false, None)
    }

    /// Prepare a statement, optionally scrollable or tagged for the cache
    pub fn prepare_stmt_with(&self, sql: &str, scrollable: bool, tag: Option<&str>) -> Result<Stmt> {
        let handle = self.conn.prepare_stmt(sql, scrollable, tag)?;
        Ok(Stmt::new(handle, self.clone()))
    }

    /// Register a subscription delivered through the process-wide dispatcher
    pub fn subscribe(&self, options: &OptionMap) -> Result<Subscription> {
        let params = SubscrCreateParams::from_options(options)?;
        self.subscribe_with(&params, EventDispatcher::global())
    }

    /// Register a subscription delivered through `dispatcher`
    pub fn subscribe_with(
        &self,
        params: &SubscrCreateParams,
        dispatcher: &EventDispatcher,
    ) -> Result<Subscription> {
        if params.callback.is_some() {
            dispatcher.start()?;
        }
        let sink = Arc::new(SubscriptionSink::new(params.callback.clone(), dispatcher.clone()));
        let handle = self.conn.subscribe(params, sink)?;
        tracing::debug!(id = handle.id(), namespace = %params.subscr_namespace, "subscription registered");
        Ok(Subscription::new(handle, self.clone()))
    }

    /// Commit the current transaction
    pub fn commit(&self) -> Result<()> {
        Ok(self.conn.commit()?)
    }

    /// Roll back the current transaction
    pub fn rollback(&self) -> Result<()> {
        Ok(self.conn.rollback()?)
    }

    /// Round trip to the server
    pub fn ping(&self) -> Result<()> {
        Ok(self.conn.ping()?)
    }

    /// Server version
    pub fn server_version(&self) -> Result<VersionInfo> {
        Ok(self.conn.server_version()?)
    }
}

/// Session pool
#[derive(Debug, Clone)]
pub struct Pool {
    handle: PoolHandle,
    context: Context,
}

impl Pool {
    /// Acquire a session; options come from the conn table
    pub fn acquire(&self, options: &OptionMap) -> Result<Session> {
        let params = ConnCreateParams::from_options(options)?;
        self.acquire_with(&params)
    }

    /// Acquire a session with typed parameters
    pub fn acquire_with(&self, params: &ConnCreateParams) -> Result<Session> {
        let conn = self.handle.acquire(params)?;
        Ok(Session::new(conn, self.context.clone()))
    }

    /// Sessions currently open
    pub fn open_count(&self) -> Result<u32> {
        Ok(self.handle.open_count()?)
    }

    /// Close the pool
    pub fn close(&self) -> Result<()> {
        Ok(self.handle.close()?)
    }
}
