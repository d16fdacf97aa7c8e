//! Reference object types and instances

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::Mutex;

use super::driver_error;
use crate::constants::{error_code, NativeType};
use crate::data::{Data, DataBuffer};
use crate::driver::{
    same_handle, DriverResult, IndexLookup, ObjectAttrBackend, ObjectAttrHandle, ObjectBackend, ObjectHandle,
    ObjectTypeBackend,
};
use crate::info::{DataTypeInfo, ObjectAttrInfo, ObjectTypeInfo};

/// Reference attribute
#[derive(Debug)]
pub struct MemoryObjectAttr {
    info: ObjectAttrInfo,
}

impl ObjectAttrBackend for MemoryObjectAttr {
    fn info(&self) -> DriverResult<ObjectAttrInfo> {
        Ok(self.info.clone())
    }
}

#[derive(Debug)]
struct Shape {
    info: ObjectTypeInfo,
    attributes: Vec<Arc<MemoryObjectAttr>>,
}

/// Reference object type, either a record of attributes or a collection
#[derive(Debug)]
pub struct MemoryObjectType {
    shape: Arc<Shape>,
}

impl MemoryObjectType {
    /// Record type with `attributes` in declaration order
    pub fn new(schema: &str, name: &str, attributes: Vec<(&str, DataTypeInfo)>) -> Self {
        let attributes: Vec<_> = attributes
            .into_iter()
            .map(|(attr_name, type_info)| {
                Arc::new(MemoryObjectAttr {
                    info: ObjectAttrInfo::new(attr_name, type_info),
                })
            })
            .collect();
        let info = ObjectTypeInfo {
            schema: schema.to_string(),
            name: name.to_string(),
            package_name: None,
            is_collection: false,
            element_type_info: None,
            num_attributes: attributes.len() as u16,
        };
        Self {
            shape: Arc::new(Shape { info, attributes }),
        }
    }

    /// Collection type whose elements are `element`
    pub fn collection(schema: &str, name: &str, element: DataTypeInfo) -> Self {
        let info = ObjectTypeInfo {
            schema: schema.to_string(),
            name: name.to_string(),
            package_name: None,
            is_collection: true,
            element_type_info: Some(element),
            num_attributes: 0,
        };
        Self {
            shape: Arc::new(Shape {
                info,
                attributes: Vec::new(),
            }),
        }
    }

    /// Whether `name` refers to this type, as `SCHEMA.NAME` or `NAME`, ignoring case
    pub fn matches(&self, name: &str) -> bool {
        let info = &self.shape.info;
        match name.split_once('.') {
            Some((schema, type_name)) => {
                schema.eq_ignore_ascii_case(&info.schema) && type_name.eq_ignore_ascii_case(&info.name)
            }
            None => name.eq_ignore_ascii_case(&info.name),
        }
    }
}

impl ObjectTypeBackend for MemoryObjectType {
    fn info(&self) -> DriverResult<ObjectTypeInfo> {
        Ok(self.shape.info.clone())
    }

    fn attributes(&self) -> DriverResult<Vec<ObjectAttrHandle>> {
        Ok(self
            .shape
            .attributes
            .iter()
            .map(|attr| attr.clone() as ObjectAttrHandle)
            .collect())
    }

    fn create_object(&self) -> DriverResult<ObjectHandle> {
        Ok(Arc::new(MemoryObject::new(self.shape.clone())))
    }
}

#[derive(Debug, Default)]
struct ObjectState {
    attributes: Vec<Data>,
    elements: BTreeMap<i32, Data>,
}

/// Reference object instance
#[derive(Debug)]
pub struct MemoryObject {
    shape: Arc<Shape>,
    state: Mutex<ObjectState>,
}

impl MemoryObject {
    fn new(shape: Arc<Shape>) -> Self {
        let attributes = shape.attributes.iter().map(|_| Data::null()).collect();
        Self {
            shape,
            state: Mutex::new(ObjectState {
                attributes,
                elements: BTreeMap::new(),
            }),
        }
    }

    fn attribute_index(&self, attr: &ObjectAttrHandle, fn_name: &str) -> DriverResult<usize> {
        if self.shape.info.is_collection {
            return Err(driver_error(
                error_code::CLIENT,
                format!("DPI-1023: {} is a collection", self.shape.info.full_name()),
                fn_name,
            ));
        }
        self.shape
            .attributes
            .iter()
            .position(|mine| {
                let mine: ObjectAttrHandle = mine.clone();
                same_handle(&mine, attr)
            })
            .ok_or_else(|| {
                driver_error(
                    error_code::CLIENT,
                    format!("DPI-1022: attribute does not belong to {}", self.shape.info.full_name()),
                    fn_name,
                )
            })
    }

    fn expect_collection(&self, fn_name: &str) -> DriverResult<()> {
        if !self.shape.info.is_collection {
            return Err(driver_error(
                error_code::CLIENT,
                format!("DPI-1023: {} is not a collection", self.shape.info.full_name()),
                fn_name,
            ));
        }
        Ok(())
    }

    fn missing_element(index: i32, fn_name: &str) -> crate::error::ErrorInfo {
        driver_error(
            error_code::ELEMENT_NOT_FOUND,
            format!("element at index {} does not exist", index),
            fn_name,
        )
    }
}

fn check_kind(data: &Data, native_type: NativeType, fn_name: &str) -> DriverResult<()> {
    match data.value.native_type() {
        Some(kind) if !data.is_null && kind != native_type => Err(driver_error(
            error_code::INCONSISTENT_DATATYPES,
            format!("inconsistent datatypes: expected {} got {}", native_type, kind),
            fn_name,
        )),
        _ => Ok(()),
    }
}

fn deep_copy(data: &Data) -> DriverResult<Data> {
    match &data.value {
        DataBuffer::Object(obj) if !data.is_null => Ok(Data::new(DataBuffer::Object(obj.copy()?))),
        _ => Ok(data.clone()),
    }
}

impl ObjectBackend for MemoryObject {
    fn attribute_value(&self, attr: &ObjectAttrHandle, native_type: NativeType) -> DriverResult<Data> {
        let index = self.attribute_index(attr, "attribute_value")?;
        let data = self.state.lock().attributes[index].clone();
        check_kind(&data, native_type, "attribute_value")?;
        Ok(data)
    }

    fn set_attribute_value(&self, attr: &ObjectAttrHandle, native_type: NativeType, data: &Data) -> DriverResult<()> {
        let index = self.attribute_index(attr, "set_attribute_value")?;
        check_kind(data, native_type, "set_attribute_value")?;
        self.state.lock().attributes[index] = data.clone();
        Ok(())
    }

    fn append_element(&self, native_type: NativeType, data: &Data) -> DriverResult<()> {
        self.expect_collection("append_element")?;
        check_kind(data, native_type, "append_element")?;
        let mut state = self.state.lock();
        let next = state.elements.keys().next_back().map_or(0, |last| last + 1);
        state.elements.insert(next, data.clone());
        Ok(())
    }

    fn element_value_by_index(&self, index: i32, native_type: NativeType) -> DriverResult<Data> {
        self.expect_collection("element_value_by_index")?;
        let data = self
            .state
            .lock()
            .elements
            .get(&index)
            .cloned()
            .ok_or_else(|| Self::missing_element(index, "element_value_by_index"))?;
        check_kind(&data, native_type, "element_value_by_index")?;
        Ok(data)
    }

    fn set_element_value_by_index(&self, index: i32, native_type: NativeType, data: &Data) -> DriverResult<()> {
        self.expect_collection("set_element_value_by_index")?;
        check_kind(data, native_type, "set_element_value_by_index")?;
        self.state.lock().elements.insert(index, data.clone());
        Ok(())
    }

    fn delete_element_by_index(&self, index: i32) -> DriverResult<()> {
        self.expect_collection("delete_element_by_index")?;
        self.state
            .lock()
            .elements
            .remove(&index)
            .map(|_| ())
            .ok_or_else(|| Self::missing_element(index, "delete_element_by_index"))
    }

    fn element_exists_by_index(&self, index: i32) -> DriverResult<bool> {
        self.expect_collection("element_exists_by_index")?;
        Ok(self.state.lock().elements.contains_key(&index))
    }

    fn first_index(&self) -> DriverResult<IndexLookup> {
        self.expect_collection("first_index")?;
        Ok(lookup(self.state.lock().elements.keys().next()))
    }

    fn last_index(&self) -> DriverResult<IndexLookup> {
        self.expect_collection("last_index")?;
        Ok(lookup(self.state.lock().elements.keys().next_back()))
    }

    fn next_index(&self, index: i32) -> DriverResult<IndexLookup> {
        self.expect_collection("next_index")?;
        let state = self.state.lock();
        let next = match index.checked_add(1) {
            Some(start) => state.elements.range(start..).next().map(|(k, _)| k),
            None => None,
        };
        Ok(lookup(next))
    }

    fn prev_index(&self, index: i32) -> DriverResult<IndexLookup> {
        self.expect_collection("prev_index")?;
        Ok(lookup(self.state.lock().elements.range(..index).next_back().map(|(k, _)| k)))
    }

    fn size(&self) -> DriverResult<i32> {
        self.expect_collection("size")?;
        Ok(self.state.lock().elements.len() as i32)
    }

    fn trim(&self, num_to_trim: u32) -> DriverResult<()> {
        self.expect_collection("trim")?;
        let mut state = self.state.lock();
        if num_to_trim as usize > state.elements.len() {
            return Err(driver_error(
                error_code::TRIM_SIZE_EXCEEDED,
                format!(
                    "cannot trim {} elements from a collection of {}",
                    num_to_trim,
                    state.elements.len()
                ),
                "trim",
            ));
        }
        for _ in 0..num_to_trim {
            state.elements.pop_last();
        }
        Ok(())
    }

    fn copy(&self) -> DriverResult<ObjectHandle> {
        let state = self.state.lock();
        let attributes = state.attributes.iter().map(deep_copy).collect::<DriverResult<Vec<_>>>()?;
        let elements = state
            .elements
            .iter()
            .map(|(k, v)| deep_copy(v).map(|data| (*k, data)))
            .collect::<DriverResult<BTreeMap<_, _>>>()?;
        Ok(Arc::new(MemoryObject {
            shape: self.shape.clone(),
            state: Mutex::new(ObjectState { attributes, elements }),
        }))
    }
}

fn lookup(index: Option<&i32>) -> IndexLookup {
    index.map_or_else(IndexLookup::missing, |i| IndexLookup::found(*i))
}
