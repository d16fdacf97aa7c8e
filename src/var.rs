//! Bulk variable arrays
//!
//! A [`Var`] is a fixed number of wire slots used for array binds and
//! fetches. Positions are checked against the array size before any driver
//! call, so an out-of-range index never reaches the driver.
//!
//! Two hooks shape the values flowing through a variable:
//! - the out filter runs on every [`Var::get`]. `ToInteger` and `ToFloat` on a
//!   `Bytes` variable parse the raw text in place of the usual rules; every
//!   other filter runs on the decoded value.
//! - the in filter runs on every non-NULL value passed to [`Var::set`] before
//!   it is encoded.
//!
//! ```rust
//! use oracledb::driver::memory::MemoryContext;
//! use oracledb::params::OptionMap;
//! use oracledb::{Context, NativeType, NativeValue, OracleType, VarSpec};
//!
//! let context = Context::new(MemoryContext::new(), &OptionMap::new()).unwrap();
//! let session = context.connect("scott", "tiger", "db", &OptionMap::new()).unwrap();
//! let var = session
//!     .new_var(VarSpec::new(OracleType::Varchar, NativeType::Bytes).with_array_size(3).with_size(100))
//!     .unwrap();
//! var.set(0, &"hello".into()).unwrap();
//! assert_eq!(var.get(0).unwrap(), NativeValue::from("hello"));
//! assert_eq!(var.get(1).unwrap(), NativeValue::Null);
//! assert!(var.get(3).unwrap_err().is_range_error());
//! ```

use std::fmt;

use crate::constants::{NativeType, OracleType};
use crate::data::{decode, encode, Data, InFilter, OutFilter, SlotTarget};
use crate::dbobject::{native_type_for, ObjectType};
use crate::driver::VarHandle;
use crate::error::{Error, Result};
use crate::info::DataTypeInfo;
use crate::session::Session;
use crate::value::NativeValue;

/// Everything needed to create a [`Var`]
#[derive(Clone)]
pub struct VarSpec {
    /// Oracle logical type
    pub oracle_type: OracleType,
    /// Native kind of each slot
    pub native_type: NativeType,
    /// Number of slots
    pub array_size: u32,
    /// Maximum size of a variable-length value
    pub size: u32,
    /// Whether `size` counts bytes rather than characters
    pub size_is_bytes: bool,
    /// PL/SQL index-by table bind
    pub is_array: bool,
    /// Object type, required for the `Object` native kind
    pub object_type: Option<ObjectType>,
    /// Filter run on values read
    pub out_filter: Option<OutFilter>,
    /// Filter run on values written
    pub in_filter: Option<InFilter>,
}

impl VarSpec {
    /// One-slot spec
    pub fn new(oracle_type: OracleType, native_type: NativeType) -> Self {
        Self {
            oracle_type,
            native_type,
            array_size: 1,
            size: 0,
            size_is_bytes: false,
            is_array: false,
            object_type: None,
            out_filter: None,
            in_filter: None,
        }
    }

    /// Spec matching a column or attribute description.
    ///
    /// NUMBER gets the `Bytes` native kind so values travel as decimal text.
    pub fn from_type_info(type_info: &DataTypeInfo, session: &Session) -> Result<Self> {
        let mut spec = Self::new(type_info.oracle_type, native_type_for(type_info));
        spec.size = type_info.client_size_in_bytes;
        spec.size_is_bytes = true;
        if let Some(handle) = &type_info.object_type {
            spec.object_type = Some(ObjectType::new(handle.clone(), session.clone())?);
        }
        Ok(spec)
    }

    /// Set the number of slots
    pub fn with_array_size(mut self, array_size: u32) -> Self {
        self.array_size = array_size;
        self
    }

    /// Set the maximum value size
    pub fn with_size(mut self, size: u32) -> Self {
        self.size = size;
        self
    }

    /// Count the size in bytes
    pub fn with_size_is_bytes(mut self, size_is_bytes: bool) -> Self {
        self.size_is_bytes = size_is_bytes;
        self
    }

    /// Bind as a PL/SQL index-by table
    pub fn with_is_array(mut self, is_array: bool) -> Self {
        self.is_array = is_array;
        self
    }

    /// Set the object type
    pub fn with_object_type(mut self, object_type: ObjectType) -> Self {
        self.object_type = Some(object_type);
        self
    }

    /// Set the out filter
    pub fn with_out_filter(mut self, filter: OutFilter) -> Self {
        self.out_filter = Some(filter);
        self
    }

    /// Set the in filter
    pub fn with_in_filter<F>(mut self, filter: F) -> Self
    where
        F: Fn(NativeValue) -> Result<NativeValue> + Send + Sync + 'static,
    {
        self.in_filter = Some(std::sync::Arc::new(filter));
        self
    }
}

impl fmt::Debug for VarSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VarSpec")
            .field("oracle_type", &self.oracle_type)
            .field("native_type", &self.native_type)
            .field("array_size", &self.array_size)
            .field("size", &self.size)
            .field("size_is_bytes", &self.size_is_bytes)
            .field("is_array", &self.is_array)
            .field("object_type", &self.object_type.as_ref().map(|t| t.info().full_name()))
            .field("out_filter", &self.out_filter)
            .field("in_filter", &self.in_filter.as_ref().map(|_| ".."))
            .finish()
    }
}

/// Array of wire slots bound to a session
#[derive(Clone)]
pub struct Var {
    handle: VarHandle,
    object_type: Option<ObjectType>,
    session: Session,
    native_type: NativeType,
    oracle_type: OracleType,
    array_size: u32,
    out_filter: Option<OutFilter>,
    in_filter: Option<InFilter>,
}

impl Var {
    /// Create a variable on `session`
    pub fn new(session: &Session, spec: VarSpec) -> Result<Self> {
        if spec.native_type == NativeType::Object && spec.object_type.is_none() {
            return Err(Error::invalid_argument("object variables require an object type"));
        }
        let handle = session.conn().new_var(&spec)?;
        let array_size = handle.array_size();
        tracing::trace!(
            array_size,
            native_type = %spec.native_type,
            oracle_type = %spec.oracle_type,
            size = spec.size,
            "var created"
        );
        Ok(Self {
            handle,
            object_type: spec.object_type,
            session: session.clone(),
            native_type: spec.native_type,
            oracle_type: spec.oracle_type,
            array_size,
            out_filter: spec.out_filter,
            in_filter: spec.in_filter,
        })
    }

    /// Driver handle
    pub fn handle(&self) -> &VarHandle {
        &self.handle
    }

    /// Owning session
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Number of slots
    pub fn array_size(&self) -> u32 {
        self.array_size
    }

    /// Native kind of each slot
    pub fn native_type(&self) -> NativeType {
        self.native_type
    }

    /// Oracle logical type
    pub fn oracle_type(&self) -> OracleType {
        self.oracle_type
    }

    /// Object type of an object variable
    pub fn object_type(&self) -> Option<&ObjectType> {
        self.object_type.as_ref()
    }

    fn check_pos(&self, pos: u32) -> Result<()> {
        if pos >= self.array_size {
            return Err(Error::Range {
                index: pos as u64,
                size: self.array_size,
            });
        }
        Ok(())
    }

    fn decode_slot(&self, data: &Data) -> Result<NativeValue> {
        decode(
            data,
            self.native_type,
            self.oracle_type,
            self.object_type.as_ref(),
            self.out_filter.as_ref(),
            &self.session,
        )
    }

    /// Value at `pos`
    pub fn get(&self, pos: u32) -> Result<NativeValue> {
        self.check_pos(pos)?;
        let data = self.handle.read_slot(pos)?;
        self.decode_slot(&data)
    }

    /// Store `value` at `pos`; `Null` marks the slot NULL
    pub fn set(&self, pos: u32, value: &NativeValue) -> Result<()> {
        self.check_pos(pos)?;
        if value.is_null() {
            return Ok(self.handle.write_slot(pos, Data::null())?);
        }
        let filtered;
        let value = match &self.in_filter {
            Some(filter) => {
                filtered = filter(value.clone())?;
                &filtered
            }
            None => value,
        };
        encode(
            value,
            SlotTarget::Var {
                handle: &self.handle,
                pos,
            },
            self.native_type,
            self.oracle_type,
            &self.session,
        )?;
        Ok(())
    }

    /// Copy slot `source_pos` of `source` into `pos` without conversion
    pub fn copy_data(&self, pos: u32, source: &Var, source_pos: u32) -> Result<()> {
        self.check_pos(pos)?;
        source.check_pos(source_pos)?;
        Ok(self.handle.copy_data(pos, &source.handle, source_pos)?)
    }

    /// Every row returned into `pos` by a DML returning clause
    pub fn returned_data(&self, pos: u32) -> Result<Vec<NativeValue>> {
        self.check_pos(pos)?;
        self.handle
            .returned_data(pos)?
            .iter()
            .map(|data| self.decode_slot(data))
            .collect()
    }

    /// Elements in use for an index-by table bind
    pub fn num_elements_in_array(&self) -> Result<u32> {
        Ok(self.handle.num_elements_in_array()?)
    }

    /// Set the elements in use, at most the array size
    pub fn set_num_elements_in_array(&self, num_elements: u32) -> Result<()> {
        if num_elements > self.array_size {
            return Err(Error::invalid_argument(format!(
                "{} elements exceed the array size {}",
                num_elements, self.array_size
            )));
        }
        Ok(self.handle.set_num_elements_in_array(num_elements)?)
    }

    /// Buffer size of one slot
    pub fn size_in_bytes(&self) -> Result<u32> {
        Ok(self.handle.size_in_bytes()?)
    }
}

impl fmt::Debug for Var {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Var")
            .field("native_type", &self.native_type)
            .field("oracle_type", &self.oracle_type)
            .field("array_size", &self.array_size)
            .field("out_filter", &self.out_filter)
            .finish_non_exhaustive()
    }
}
