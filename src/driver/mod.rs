//! Driver layer: the client library behind the marshalling core
//!
//! Each client library object (context, connection, variable, LOB, object,
//! JSON document, statement, rowid, subscription) is reached through one
//! trait. Handles are shared with `Arc`, so adding a reference is a clone and
//! the last drop releases the underlying resource.
//!
//! Every call returns its [`ErrorInfo`] directly on failure, so the
//! diagnostic bundle is captured at the point of failure.
//!
//! [`memory`] is an in-process implementation of every trait.

pub mod memory;

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use bumpalo::Bump;

use crate::config::{
    CommonCreateParams, ConnCreateParams, ContextCreateParams, PoolCreateParams,
    SubscrCreateParams,
};
use crate::constants::{EventType, ExecMode, NativeType, OpCode, OracleType};
use crate::data::Data;
use crate::error::ErrorInfo;
use crate::info::{ObjectAttrInfo, ObjectTypeInfo, QueryInfo, VersionInfo};
use crate::types::JsonNode;
use crate::var::VarSpec;

/// Result of a driver call
pub type DriverResult<T> = std::result::Result<T, ErrorInfo>;

/// Shared connection handle
pub type ConnHandle = Arc<dyn ConnBackend>;
/// Shared pool handle
pub type PoolHandle = Arc<dyn PoolBackend>;
/// Shared variable handle
pub type VarHandle = Arc<dyn VarBackend>;
/// Shared LOB handle
pub type LobHandle = Arc<dyn LobBackend>;
/// Shared object handle
pub type ObjectHandle = Arc<dyn ObjectBackend>;
/// Shared object type handle
pub type ObjectTypeHandle = Arc<dyn ObjectTypeBackend>;
/// Shared object attribute handle
pub type ObjectAttrHandle = Arc<dyn ObjectAttrBackend>;
/// Shared JSON document handle
pub type JsonHandle = Arc<dyn JsonBackend>;
/// Shared statement handle
pub type StmtHandle = Arc<dyn StmtBackend>;
/// Shared rowid handle
pub type RowidHandle = Arc<dyn RowidBackend>;
/// Shared subscription handle
pub type SubscrHandle = Arc<dyn SubscrBackend>;

/// Check whether two handles refer to the same driver object
pub fn same_handle<T: ?Sized>(a: &Arc<T>, b: &Arc<T>) -> bool {
    std::ptr::eq(Arc::as_ptr(a) as *const (), Arc::as_ptr(b) as *const ())
}

/// Top-level driver context
pub trait ContextBackend: Send + Sync + fmt::Debug {
    /// Version of the client library
    fn client_version(&self) -> VersionInfo;

    /// Apply context creation parameters
    fn initialize(&self, params: &ContextCreateParams) -> DriverResult<()>;

    /// Open a standalone connection
    fn connect(
        &self,
        username: &str,
        password: &str,
        connect_string: &str,
        common: &CommonCreateParams,
        conn: &ConnCreateParams,
    ) -> DriverResult<ConnHandle>;

    /// Create a session pool
    fn create_pool(
        &self,
        username: &str,
        password: &str,
        connect_string: &str,
        common: &CommonCreateParams,
        pool: &PoolCreateParams,
    ) -> DriverResult<PoolHandle>;
}

/// Session pool
pub trait PoolBackend: Send + Sync + fmt::Debug {
    /// Acquire a session from the pool
    fn acquire(&self, params: &ConnCreateParams) -> DriverResult<ConnHandle>;

    /// Number of sessions currently open
    fn open_count(&self) -> DriverResult<u32>;

    /// Close the pool
    fn close(&self) -> DriverResult<()>;
}

/// Connection (session) handle
pub trait ConnBackend: Send + Sync + fmt::Debug {
    /// Create a variable array
    fn new_var(&self, spec: &VarSpec) -> DriverResult<VarHandle>;

    /// Create a temporary LOB
    fn new_temp_lob(&self, lob_type: OracleType) -> DriverResult<LobHandle>;

    /// Look up an object type by name
    fn object_type(&self, name: &str) -> DriverResult<ObjectTypeHandle>;

    /// Create an empty JSON document
    fn new_json(&self) -> DriverResult<JsonHandle>;

    /// Prepare a statement
    fn prepare_stmt(&self, sql: &str, scrollable: bool, tag: Option<&str>) -> DriverResult<StmtHandle>;

    /// Register a subscription; `sink` is invoked from driver threads
    fn subscribe(
        &self,
        params: &SubscrCreateParams,
        sink: Arc<dyn NotificationSink>,
    ) -> DriverResult<SubscrHandle>;

    /// Unregister a subscription
    fn unsubscribe(&self, subscr: &SubscrHandle) -> DriverResult<()>;

    /// Commit the current transaction
    fn commit(&self) -> DriverResult<()>;

    /// Roll back the current transaction
    fn rollback(&self) -> DriverResult<()>;

    /// Round-trip to the server
    fn ping(&self) -> DriverResult<()>;

    /// Version of the connected server
    fn server_version(&self) -> DriverResult<VersionInfo>;

    /// Access to the concrete driver type
    fn as_any(&self) -> &dyn Any;
}

/// Variable array: `array_size` wire slots owned by the driver
pub trait VarBackend: Send + Sync + fmt::Debug {
    /// Number of slots
    fn array_size(&self) -> u32;

    /// Read a slot; byte payloads are views into driver memory
    fn read_slot(&self, pos: u32) -> DriverResult<Data>;

    /// Write a fixed-size payload (or null) into a slot
    fn write_slot(&self, pos: u32, data: Data) -> DriverResult<()>;

    /// Copy a byte span into driver memory for a slot
    fn set_from_bytes(&self, pos: u32, value: &[u8]) -> DriverResult<()>;

    /// Store a LOB reference in a slot
    fn set_from_lob(&self, pos: u32, lob: &LobHandle) -> DriverResult<()>;

    /// Store an object reference in a slot
    fn set_from_object(&self, pos: u32, obj: &ObjectHandle) -> DriverResult<()>;

    /// Store a statement reference in a slot
    fn set_from_stmt(&self, pos: u32, stmt: &StmtHandle) -> DriverResult<()>;

    /// Store a rowid reference in a slot
    fn set_from_rowid(&self, pos: u32, rowid: &RowidHandle) -> DriverResult<()>;

    /// Copy one slot of `source` into `pos` without conversion
    fn copy_data(&self, pos: u32, source: &VarHandle, source_pos: u32) -> DriverResult<()>;

    /// Number of elements in use (PL/SQL arrays)
    fn num_elements_in_array(&self) -> DriverResult<u32>;

    /// Set the number of elements in use
    fn set_num_elements_in_array(&self, num_elements: u32) -> DriverResult<()>;

    /// Size of one slot's buffer in bytes
    fn size_in_bytes(&self) -> DriverResult<u32>;

    /// Rows a DML returning statement produced for `pos`
    fn returned_data(&self, pos: u32) -> DriverResult<Vec<Data>>;

    /// Access to the concrete driver type
    fn as_any(&self) -> &dyn Any;
}

/// Large object
pub trait LobBackend: Send + Sync + fmt::Debug {
    /// LOB type (CLOB, NCLOB, BLOB, BFILE)
    fn lob_type(&self) -> OracleType;

    /// Size in characters (CLOB) or bytes
    fn size(&self) -> DriverResult<u64>;

    /// Chunk size for efficient I/O
    fn chunk_size(&self) -> DriverResult<u32>;

    /// Bytes needed to read `amount` characters or bytes
    fn buffer_size(&self, amount: u64) -> DriverResult<u64>;

    /// Read `amount` units from 1-based `offset` into `buffer`, returning bytes written
    fn read_bytes(&self, offset: u64, amount: u64, buffer: &mut [u8]) -> DriverResult<usize>;

    /// Write bytes at 1-based `offset`
    fn write_bytes(&self, offset: u64, value: &[u8]) -> DriverResult<()>;

    /// Replace the whole contents
    fn set_from_bytes(&self, value: &[u8]) -> DriverResult<()>;

    /// Truncate to `new_size`
    fn trim(&self, new_size: u64) -> DriverResult<()>;

    /// Open for a series of writes
    fn open_resource(&self) -> DriverResult<()>;

    /// Close after a series of writes
    fn close_resource(&self) -> DriverResult<()>;

    /// Whether the resource is open
    fn is_resource_open(&self) -> DriverResult<bool>;

    /// Release the locator; later calls fail
    fn close(&self) -> DriverResult<()>;

    /// Directory alias and file name (BFILE)
    fn directory_and_file_name(&self) -> DriverResult<(String, String)>;

    /// Point a BFILE at another file
    fn set_directory_and_file_name(&self, directory: &str, file_name: &str) -> DriverResult<()>;

    /// Whether the BFILE's file exists
    fn file_exists(&self) -> DriverResult<bool>;

    /// Independent copy
    fn copy(&self) -> DriverResult<LobHandle>;
}

/// Object type metadata
pub trait ObjectTypeBackend: Send + Sync + fmt::Debug {
    /// Type description
    fn info(&self) -> DriverResult<ObjectTypeInfo>;

    /// Attributes in declaration order
    fn attributes(&self) -> DriverResult<Vec<ObjectAttrHandle>>;

    /// Create an empty instance
    fn create_object(&self) -> DriverResult<ObjectHandle>;
}

/// Object attribute metadata
pub trait ObjectAttrBackend: Send + Sync + fmt::Debug {
    /// Attribute description
    fn info(&self) -> DriverResult<ObjectAttrInfo>;
}

/// Index lookup result; `exists` is false when there is no such index
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexLookup {
    /// Index found
    pub index: i32,
    /// Whether an index was found
    pub exists: bool,
}

impl IndexLookup {
    /// A found index
    pub fn found(index: i32) -> Self {
        Self { index, exists: true }
    }

    /// No index in that direction
    pub fn missing() -> Self {
        Self {
            index: 0,
            exists: false,
        }
    }
}

/// Object instance or collection
pub trait ObjectBackend: Send + Sync + fmt::Debug {
    /// Read an attribute as `native_type`
    fn attribute_value(&self, attr: &ObjectAttrHandle, native_type: NativeType) -> DriverResult<Data>;

    /// Write an attribute
    fn set_attribute_value(&self, attr: &ObjectAttrHandle, native_type: NativeType, data: &Data) -> DriverResult<()>;

    /// Append a collection element
    fn append_element(&self, native_type: NativeType, data: &Data) -> DriverResult<()>;

    /// Read a collection element
    fn element_value_by_index(&self, index: i32, native_type: NativeType) -> DriverResult<Data>;

    /// Write a collection element
    fn set_element_value_by_index(&self, index: i32, native_type: NativeType, data: &Data) -> DriverResult<()>;

    /// Delete a collection element, leaving a gap
    fn delete_element_by_index(&self, index: i32) -> DriverResult<()>;

    /// Whether an element exists at `index`
    fn element_exists_by_index(&self, index: i32) -> DriverResult<bool>;

    /// First index of the collection
    fn first_index(&self) -> DriverResult<IndexLookup>;

    /// Last index of the collection
    fn last_index(&self) -> DriverResult<IndexLookup>;

    /// Next index after `index`
    fn next_index(&self, index: i32) -> DriverResult<IndexLookup>;

    /// Previous index before `index`
    fn prev_index(&self, index: i32) -> DriverResult<IndexLookup>;

    /// Number of elements
    fn size(&self) -> DriverResult<i32>;

    /// Remove `num_to_trim` elements from the end
    fn trim(&self, num_to_trim: u32) -> DriverResult<()>;

    /// Independent copy
    fn copy(&self) -> DriverResult<ObjectHandle>;
}

/// JSON document
pub trait JsonBackend: Send + Sync + fmt::Debug {
    /// Build the document's node tree in `arena`
    fn value<'a>(&self, number_as_string: bool, arena: &'a Bump) -> DriverResult<JsonNode<'a>>;

    /// Replace the document with a node tree
    fn set_value(&self, node: &JsonNode<'_>) -> DriverResult<()>;
}

/// Prepared statement
pub trait StmtBackend: Send + Sync + fmt::Debug {
    /// Execute, returning the number of query columns
    fn execute(&self, mode: ExecMode) -> DriverResult<u32>;

    /// Fetch one row; `None` at end of data, otherwise the buffer row index
    fn fetch(&self) -> DriverResult<Option<u32>>;

    /// Bind a variable by 1-based position
    fn bind_by_pos(&self, pos: u32, var: &VarHandle) -> DriverResult<()>;

    /// Bind a variable by name
    fn bind_by_name(&self, name: &str, var: &VarHandle) -> DriverResult<()>;

    /// Define the fetch variable for a 1-based column
    fn define(&self, pos: u32, var: &VarHandle) -> DriverResult<()>;

    /// Describe a 1-based column
    fn query_info(&self, pos: u32) -> DriverResult<QueryInfo>;

    /// Number of query columns
    fn num_query_columns(&self) -> DriverResult<u32>;

    /// Rows fetched per round trip
    fn fetch_array_size(&self) -> DriverResult<u32>;

    /// Set rows fetched per round trip
    fn set_fetch_array_size(&self, size: u32) -> DriverResult<()>;

    /// Close the statement
    fn close(&self) -> DriverResult<()>;

    /// Access to the concrete driver type
    fn as_any(&self) -> &dyn Any;
}

/// Rowid
pub trait RowidBackend: Send + Sync + fmt::Debug {
    /// Text form of the rowid
    fn string_value(&self) -> DriverResult<String>;
}

/// Registered subscription
pub trait SubscrBackend: Send + Sync + fmt::Debug {
    /// Registration id
    fn id(&self) -> u64;

    /// Prepare a statement whose results are registered with this subscription
    fn prepare_stmt(&self, sql: &str) -> DriverResult<StmtHandle>;
}

/// Receiver for notifications produced on driver threads
pub trait NotificationSink: Send + Sync {
    /// Called on an arbitrary driver thread; `message` is valid only for this call
    fn notify(&self, message: &SubscrMessageRef<'_>);
}

/// Row in a notification, borrowed from driver memory
#[derive(Debug, Clone, Copy)]
pub struct SubscrMessageRowRef<'a> {
    /// Operation on the row
    pub operation: OpCode,
    /// Rowid text
    pub rowid: &'a [u8],
}

/// Table in a notification, borrowed from driver memory
#[derive(Debug, Clone, Copy)]
pub struct SubscrMessageTableRef<'a> {
    /// Operation on the table
    pub operation: OpCode,
    /// Table name
    pub name: &'a [u8],
    /// Affected rows
    pub rows: &'a [SubscrMessageRowRef<'a>],
}

/// Query in a notification, borrowed from driver memory
#[derive(Debug, Clone, Copy)]
pub struct SubscrMessageQueryRef<'a> {
    /// Registered query id
    pub id: u64,
    /// Operation on the query
    pub operation: OpCode,
    /// Affected tables
    pub tables: &'a [SubscrMessageTableRef<'a>],
}

/// Notification payload, borrowed from driver memory for one callback
#[derive(Debug, Clone, Copy)]
pub struct SubscrMessageRef<'a> {
    /// Event kind
    pub event_type: EventType,
    /// Database name
    pub db_name: &'a [u8],
    /// Affected tables
    pub tables: &'a [SubscrMessageTableRef<'a>],
    /// Affected queries
    pub queries: &'a [SubscrMessageQueryRef<'a>],
    /// Error raised while producing the notification
    pub error_info: Option<&'a ErrorInfo>,
    /// Transaction id
    pub tx_id: &'a [u8],
    /// Whether the registration is still active
    pub registered: bool,
    /// Queue name (AQ events)
    pub queue_name: &'a [u8],
    /// Consumer name (AQ events)
    pub consumer_name: &'a [u8],
}

impl<'a> SubscrMessageRef<'a> {
    /// Message with only an event type; everything else empty
    pub fn event(event_type: EventType) -> Self {
        Self {
            event_type,
            db_name: &[],
            tables: &[],
            queries: &[],
            error_info: None,
            tx_id: &[],
            registered: true,
            queue_name: &[],
            consumer_name: &[],
        }
    }
}
