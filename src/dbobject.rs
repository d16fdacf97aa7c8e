//! Oracle database object type support
//!
//! This module provides the session-bound wrappers for user-defined types:
//! - [`ObjectType`]: type metadata, shared by every object of the type
//! - [`ObjectAttr`]: one attribute of a non-collection type
//! - [`Object`]: an instance, either a plain object with attributes or a
//!   collection (VARRAY, nested table, index-by table)
//!
//! Collections are sparse: valid indices need not be contiguous, and the
//! navigation methods return `None` when there is no index in that
//! direction.
//!
//! # Example
//!
//! ```rust
//! use oracledb::driver::memory::{MemoryContext, MemoryObjectType};
//! use oracledb::info::DataTypeInfo;
//! use oracledb::params::OptionMap;
//! use oracledb::{Context, NativeValue, OracleType};
//!
//! let backend = MemoryContext::new();
//! backend.register_type(MemoryObjectType::collection(
//!     "HR",
//!     "NUM_LIST",
//!     DataTypeInfo::new(OracleType::Number),
//! ));
//! let context = Context::new(backend, &OptionMap::new()).unwrap();
//! let session = context.connect("hr", "hr", "db", &OptionMap::new()).unwrap();
//!
//! let list = session.object_type("HR.NUM_LIST").unwrap().new_object().unwrap();
//! list.append_element(&NativeValue::Integer(10)).unwrap();
//! list.append_element(&NativeValue::Float(2.5)).unwrap();
//! assert_eq!(
//!     list.element_values().unwrap(),
//!     vec![NativeValue::Integer(10), NativeValue::Float(2.5)]
//! );
//! ```

use std::sync::Arc;

use crate::constants::{NativeType, OracleType};
use crate::data::{decode, encode, Data, SlotTarget};
use crate::driver::{ObjectAttrHandle, ObjectHandle, ObjectTypeHandle};
use crate::error::{Error, Result};
use crate::info::{DataTypeInfo, ObjectAttrInfo, ObjectTypeInfo};
use crate::session::Session;
use crate::value::NativeValue;

/// Native kind requested for a value of `type_info`.
///
/// NUMBER travels as decimal text so no precision is lost.
pub(crate) fn native_type_for(type_info: &DataTypeInfo) -> NativeType {
    if type_info.oracle_type == OracleType::Number {
        NativeType::Bytes
    } else {
        type_info.default_native_type
    }
}

/// Attribute of an object type
#[derive(Debug, Clone)]
pub struct ObjectAttr {
    handle: ObjectAttrHandle,
    info: ObjectAttrInfo,
}

impl ObjectAttr {
    /// Wrap a driver attribute handle, reading its metadata
    pub fn new(handle: ObjectAttrHandle) -> Result<Self> {
        let info = handle.info()?;
        Ok(Self { handle, info })
    }

    /// Driver handle
    pub fn handle(&self) -> &ObjectAttrHandle {
        &self.handle
    }

    /// Attribute name
    pub fn name(&self) -> &str {
        &self.info.name
    }

    /// Attribute type
    pub fn type_info(&self) -> &DataTypeInfo {
        &self.info.type_info
    }

    /// Full metadata
    pub fn info(&self) -> &ObjectAttrInfo {
        &self.info
    }
}

/// Object type metadata bound to a session
#[derive(Debug, Clone)]
pub struct ObjectType {
    handle: ObjectTypeHandle,
    session: Session,
    info: Arc<ObjectTypeInfo>,
    attributes: Arc<[ObjectAttr]>,
}

impl ObjectType {
    /// Wrap a driver object type handle, reading its metadata and attributes
    pub fn new(handle: ObjectTypeHandle, session: Session) -> Result<Self> {
        let info = handle.info()?;
        let attributes = handle
            .attributes()?
            .into_iter()
            .map(ObjectAttr::new)
            .collect::<Result<Vec<_>>>()?;
        tracing::trace!(
            name = %info.full_name(),
            is_collection = info.is_collection,
            num_attributes = attributes.len(),
            "object type loaded"
        );
        Ok(Self {
            handle,
            session,
            info: Arc::new(info),
            attributes: attributes.into(),
        })
    }

    /// Driver handle
    pub fn handle(&self) -> &ObjectTypeHandle {
        &self.handle
    }

    /// Owning session
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Full metadata
    pub fn info(&self) -> &ObjectTypeInfo {
        &self.info
    }

    /// Schema name
    pub fn schema(&self) -> &str {
        &self.info.schema
    }

    /// Type name
    pub fn name(&self) -> &str {
        &self.info.name
    }

    /// Whether this is a collection type
    pub fn is_collection(&self) -> bool {
        self.info.is_collection
    }

    /// Element type of a collection
    pub fn element_type_info(&self) -> Option<&DataTypeInfo> {
        self.info.element_type_info.as_ref()
    }

    /// Number of attributes
    pub fn num_attributes(&self) -> u16 {
        self.info.num_attributes
    }

    /// Attributes in declaration order
    pub fn attributes(&self) -> &[ObjectAttr] {
        &self.attributes
    }

    /// Attribute by name, ignoring case
    pub fn attribute(&self, name: &str) -> Result<&ObjectAttr> {
        self.attributes
            .iter()
            .find(|attr| attr.name().eq_ignore_ascii_case(name))
            .ok_or_else(|| {
                Error::invalid_argument(format!("{} has no attribute {}", self.info.full_name(), name))
            })
    }

    /// Create an empty instance
    pub fn new_object(&self) -> Result<Object> {
        let handle = self.handle.create_object()?;
        Ok(Object::new(handle, self.clone(), self.session.clone()))
    }

    fn expect_collection(&self, expected: bool) -> Result<()> {
        match (expected, self.info.is_collection) {
            (true, false) => Err(Error::invalid_argument(format!(
                "{} isn't a collection",
                self.info.full_name()
            ))),
            (false, true) => Err(Error::invalid_argument(format!(
                "{} is a collection",
                self.info.full_name()
            ))),
            _ => Ok(()),
        }
    }

    fn element_type(&self) -> Result<&DataTypeInfo> {
        self.expect_collection(true)?;
        self.info.element_type_info.as_ref().ok_or_else(|| {
            Error::Internal(format!("collection {} has no element type", self.info.full_name()))
        })
    }
}

/// Instance of an object type
#[derive(Debug, Clone)]
pub struct Object {
    handle: ObjectHandle,
    object_type: ObjectType,
    session: Session,
}

impl Object {
    /// Wrap a driver object handle
    pub fn new(handle: ObjectHandle, object_type: ObjectType, session: Session) -> Self {
        Self {
            handle,
            object_type,
            session,
        }
    }

    /// Driver handle
    pub fn handle(&self) -> &ObjectHandle {
        &self.handle
    }

    /// Type of this object
    pub fn object_type(&self) -> &ObjectType {
        &self.object_type
    }

    /// Owning session
    pub fn session(&self) -> &Session {
        &self.session
    }

    fn decode_value(&self, data: &Data, native_type: NativeType, type_info: &DataTypeInfo) -> Result<NativeValue> {
        let nested = match (&type_info.object_type, data.is_null) {
            (Some(handle), false) => Some(ObjectType::new(handle.clone(), self.session.clone())?),
            _ => None,
        };
        decode(data, native_type, type_info.oracle_type, nested.as_ref(), None, &self.session)
    }

    fn encode_value(&self, value: &NativeValue, native_type: NativeType, type_info: &DataTypeInfo) -> Result<Data> {
        let mut data = Data::null();
        encode(value, SlotTarget::Data(&mut data), native_type, type_info.oracle_type, &self.session)?;
        Ok(data)
    }

    // =========================================================================
    // Attributes
    // =========================================================================

    /// Value of `attr`
    pub fn attribute_value(&self, attr: &ObjectAttr) -> Result<NativeValue> {
        self.object_type.expect_collection(false)?;
        let type_info = attr.type_info();
        let native_type = native_type_for(type_info);
        let data = self.handle.attribute_value(attr.handle(), native_type)?;
        self.decode_value(&data, native_type, type_info)
    }

    /// Value of the attribute called `name`
    pub fn attribute_value_by_name(&self, name: &str) -> Result<NativeValue> {
        let attr = self.object_type.attribute(name)?.clone();
        self.attribute_value(&attr)
    }

    /// Set `attr`; `Null` stores NULL
    pub fn set_attribute_value(&self, attr: &ObjectAttr, value: &NativeValue) -> Result<()> {
        self.object_type.expect_collection(false)?;
        let type_info = attr.type_info();
        let native_type = native_type_for(type_info);
        let data = self.encode_value(value, native_type, type_info)?;
        Ok(self.handle.set_attribute_value(attr.handle(), native_type, &data)?)
    }

    /// Set the attribute called `name`
    pub fn set_attribute_value_by_name(&self, name: &str, value: &NativeValue) -> Result<()> {
        let attr = self.object_type.attribute(name)?.clone();
        self.set_attribute_value(&attr, value)
    }

    // =========================================================================
    // Collection elements
    // =========================================================================

    /// Append to a collection
    pub fn append_element(&self, value: &NativeValue) -> Result<()> {
        let type_info = self.object_type.element_type()?;
        let native_type = native_type_for(type_info);
        let data = self.encode_value(value, native_type, type_info)?;
        Ok(self.handle.append_element(native_type, &data)?)
    }

    /// Element at `index`
    pub fn element_value_by_index(&self, index: i32) -> Result<NativeValue> {
        let type_info = self.object_type.element_type()?;
        let native_type = native_type_for(type_info);
        let data = self.handle.element_value_by_index(index, native_type)?;
        self.decode_value(&data, native_type, type_info)
    }

    /// Replace or create the element at `index`
    pub fn set_element_value_by_index(&self, index: i32, value: &NativeValue) -> Result<()> {
        let type_info = self.object_type.element_type()?;
        let native_type = native_type_for(type_info);
        let data = self.encode_value(value, native_type, type_info)?;
        Ok(self.handle.set_element_value_by_index(index, native_type, &data)?)
    }

    /// Remove the element at `index`, leaving a gap
    pub fn delete_element_by_index(&self, index: i32) -> Result<()> {
        self.object_type.expect_collection(true)?;
        Ok(self.handle.delete_element_by_index(index)?)
    }

    /// Whether an element exists at `index`
    pub fn element_exists_by_index(&self, index: i32) -> Result<bool> {
        self.object_type.expect_collection(true)?;
        Ok(self.handle.element_exists_by_index(index)?)
    }

    /// First valid index
    pub fn first_index(&self) -> Result<Option<i32>> {
        let lookup = self.handle.first_index()?;
        Ok(lookup.exists.then_some(lookup.index))
    }

    /// Last valid index
    pub fn last_index(&self) -> Result<Option<i32>> {
        let lookup = self.handle.last_index()?;
        Ok(lookup.exists.then_some(lookup.index))
    }

    /// Next valid index after `index`
    pub fn next_index(&self, index: i32) -> Result<Option<i32>> {
        let lookup = self.handle.next_index(index)?;
        Ok(lookup.exists.then_some(lookup.index))
    }

    /// Previous valid index before `index`
    pub fn prev_index(&self, index: i32) -> Result<Option<i32>> {
        let lookup = self.handle.prev_index(index)?;
        Ok(lookup.exists.then_some(lookup.index))
    }

    /// Number of elements, gaps excluded
    pub fn size(&self) -> Result<i32> {
        Ok(self.handle.size()?)
    }

    /// Remove `num_to_trim` elements from the end
    pub fn trim(&self, num_to_trim: u32) -> Result<()> {
        Ok(self.handle.trim(num_to_trim)?)
    }

    /// Every element, walking the sparse sequence from the first index
    pub fn element_values(&self) -> Result<Vec<NativeValue>> {
        let mut values = Vec::new();
        let mut index = self.first_index()?;
        while let Some(i) = index {
            values.push(self.element_value_by_index(i)?);
            index = self.next_index(i)?;
        }
        Ok(values)
    }

    /// Independent copy of the object
    pub fn copy(&self) -> Result<Object> {
        let handle = self.handle.copy()?;
        Ok(Object::new(handle, self.object_type.clone(), self.session.clone()))
    }
}
