#![warn(missing_docs)]

//! # oracledb
//!
//! Typed value marshalling between Rust values and the wire values of an
//! Oracle client library.
//!
//! The crate sits between application code and a client library reached
//! through the traits in [`driver`]. It converts [`NativeValue`]s to and from
//! the tagged wire slots the library reads and writes, and wraps each library
//! object in a session-bound handle:
//!
//! - [`Var`]: bulk variable arrays for array binds and fetches
//! - [`Object`] and [`ObjectType`]: user-defined types and sparse collections
//! - [`Lob`]: CLOB, NCLOB, BLOB and BFILE streams with character counting
//! - [`Json`]: JSON documents converted through arena-allocated node trees
//! - [`Subscription`]: change notifications delivered in order on a dispatcher
//!   thread
//!
//! Options for contexts, connections, pools and subscriptions are given as
//! keyword maps and validated in full before any is applied.
//!
//! ## Quick Start
//!
//! ```rust
//! use oracledb::driver::memory::MemoryContext;
//! use oracledb::params::{options, OptionMap};
//! use oracledb::{Context, NativeType, NativeValue, OracleType, VarSpec};
//!
//! # fn main() -> oracledb::Result<()> {
//! let context = Context::new(MemoryContext::new(), &OptionMap::new())?;
//! let session = context.connect("scott", "tiger", "db", &options([("stmt_cache_size", 40.into())]))?;
//!
//! let ids = session.new_var(VarSpec::new(OracleType::Number, NativeType::Int64).with_array_size(2))?;
//! ids.set(0, &NativeValue::Integer(7))?;
//! assert_eq!(ids.get(0)?, NativeValue::Integer(7));
//! assert_eq!(ids.get(1)?, NativeValue::Null);
//! # Ok(())
//! # }
//! ```
//!
//! ## Driver
//!
//! [`driver::memory`] implements every driver trait in process. It backs the
//! tests and the examples in this documentation; a binding to a real client
//! library implements the same traits.

pub mod config;
pub mod constants;
pub mod data;
pub mod dbobject;
pub mod dispatcher;
pub mod driver;
pub mod error;
pub mod info;
pub mod params;
pub mod session;
pub mod statement;
pub mod subscription;
pub mod types;
pub mod value;
pub mod var;

// Re-export commonly used types
pub use config::{
    CommonCreateParams, ConnCreateParams, ContextCreateParams, PoolCreateParams, SodaOperOptions,
    SubscrCreateParams,
};
pub use constants::{
    AuthMode, CreateMode, EventType, ExecMode, NativeType, OpCode, OracleType, PoolGetMode, Purity,
    SubscrNamespace, SubscrProtocol, SubscrQos,
};
pub use data::{Data, DataBuffer, OutFilter};
pub use dbobject::{Object, ObjectAttr, ObjectType};
pub use dispatcher::EventDispatcher;
pub use error::{Error, ErrorInfo, Result};
pub use info::{DataTypeInfo, ObjectAttrInfo, ObjectTypeInfo, QueryInfo, VersionInfo};
pub use params::{OptionMap, ParamValue};
pub use session::{Context, Pool, Session};
pub use statement::Stmt;
pub use subscription::{SubscrCallback, SubscrMessage, Subscription};
pub use types::{IntervalDS, IntervalYM, Json, JsonCapabilities, Lob, OracleNumber, Rowid, Timestamp};
pub use value::NativeValue;
pub use var::{Var, VarSpec};

// Re-export serde_json for users converting documents
pub use serde_json;
