//! JSON document trees
//!
//! A document crosses the driver seam as a tree of [`JsonNode`]s. Every array
//! in one tree (field names, field nodes, elements) is allocated from a single
//! [`bumpalo::Bump`] arena owned by the caller of one conversion, and the whole
//! tree is released when that arena is dropped. Nodes are never owned
//! individually.
//!
//! Values without a direct node form are encoded through [`JsonCapabilities`],
//! whose methods are probed in a fixed order.

use std::fmt;
use std::sync::Arc;

use bumpalo::collections::Vec as BumpVec;
use bumpalo::Bump;
use chrono::{DateTime, Duration, FixedOffset, NaiveDateTime};

use crate::constants::{NativeType, OracleType};
use crate::data::number_from_text;
use crate::driver::JsonHandle;
use crate::error::{Error, Result};
use crate::session::Session;
use crate::types::{IntervalDS, IntervalYM, Timestamp};
use crate::value::NativeValue;

/// One node of a JSON tree, borrowed from a conversion arena
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JsonNode<'a> {
    /// Oracle type refining the payload
    pub oracle_type: OracleType,
    /// Storage kind of the payload
    pub native_type: NativeType,
    /// Payload
    pub value: JsonNodeValue<'a>,
}

/// Payload of a [`JsonNode`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum JsonNodeValue<'a> {
    /// JSON null
    Null,
    /// Boolean
    Boolean(bool),
    /// Signed integer
    Int64(i64),
    /// Unsigned integer
    UInt64(u64),
    /// Single precision float
    Float(f32),
    /// Double precision float
    Double(f64),
    /// Text, raw bytes or decimal number text (see `oracle_type`)
    Bytes(&'a [u8]),
    /// Timestamp
    Timestamp(Timestamp),
    /// Day-second interval
    IntervalDs(IntervalDS),
    /// Year-month interval
    IntervalYm(IntervalYM),
    /// Object with ordered fields
    Object(JsonObject<'a>),
    /// Array
    Array(JsonArray<'a>),
}

/// JSON object: parallel name and field arrays in insertion order
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JsonObject<'a> {
    /// Field names
    pub field_names: &'a [&'a str],
    /// Field values, parallel to `field_names`
    pub fields: &'a [JsonNode<'a>],
}

/// JSON array
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JsonArray<'a> {
    /// Elements in order
    pub elements: &'a [JsonNode<'a>],
}

impl<'a> JsonNode<'a> {
    /// Create a node
    pub fn new(oracle_type: OracleType, native_type: NativeType, value: JsonNodeValue<'a>) -> Self {
        Self {
            oracle_type,
            native_type,
            value,
        }
    }

    /// The JSON null node
    pub fn null() -> Self {
        Self::new(OracleType::Unspecified, NativeType::Null, JsonNodeValue::Null)
    }

    fn number_text(text: &'a [u8]) -> Self {
        Self::new(OracleType::Number, NativeType::Bytes, JsonNodeValue::Bytes(text))
    }

    fn integer(value: i64) -> Self {
        Self::new(OracleType::Number, NativeType::Int64, JsonNodeValue::Int64(value))
    }
}

/// Stringified fallback for values with no structured JSON form
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JsonText {
    /// Character data, stored as VARCHAR
    Text(String),
    /// Opaque binary data, stored as RAW
    Binary(Vec<u8>),
}

/// Conversions a custom value offers for JSON encoding.
///
/// When a value has no direct node form, the encoder tries these methods in
/// declaration order and uses the first one that yields a value:
/// integer, array, map, timestamp, day-second interval, year-month interval.
/// [`to_json_text`](JsonCapabilities::to_json_text) is the final fallback.
pub trait JsonCapabilities: fmt::Debug + Send + Sync {
    /// Integer form; only `Integer`, `UInteger` or integral `Number` results are used
    fn to_json_integer(&self) -> Option<NativeValue> {
        None
    }

    /// Array form
    fn to_json_array(&self) -> Option<Vec<NativeValue>> {
        None
    }

    /// Map form
    fn to_json_map(&self) -> Option<indexmap::IndexMap<String, NativeValue>> {
        None
    }

    /// Timestamp form
    fn to_oracle_timestamp(&self) -> Option<Timestamp> {
        None
    }

    /// Day-second interval form
    fn to_oracle_interval_ds(&self) -> Option<IntervalDS> {
        None
    }

    /// Year-month interval form
    fn to_oracle_interval_ym(&self) -> Option<IntervalYM> {
        None
    }

    /// Final fallback
    fn to_json_text(&self) -> JsonText;
}

impl JsonCapabilities for DateTime<FixedOffset> {
    fn to_oracle_timestamp(&self) -> Option<Timestamp> {
        Timestamp::try_from(*self).ok()
    }

    fn to_json_text(&self) -> JsonText {
        JsonText::Text(self.to_rfc3339())
    }
}

impl JsonCapabilities for NaiveDateTime {
    fn to_oracle_timestamp(&self) -> Option<Timestamp> {
        Timestamp::try_from(*self).ok()
    }

    fn to_json_text(&self) -> JsonText {
        JsonText::Text(self.to_string())
    }
}

impl JsonCapabilities for Duration {
    fn to_oracle_interval_ds(&self) -> Option<IntervalDS> {
        IntervalDS::try_from(*self).ok()
    }

    fn to_json_text(&self) -> JsonText {
        JsonText::Text(self.to_string())
    }
}

/// Convert a JSON tree to a native value
pub fn to_native(node: &JsonNode<'_>) -> Result<NativeValue> {
    match (node.native_type, &node.value) {
        (NativeType::Null, JsonNodeValue::Null) => Ok(NativeValue::Null),
        (NativeType::Boolean, JsonNodeValue::Boolean(b)) => Ok(NativeValue::Boolean(*b)),
        (NativeType::Int64, JsonNodeValue::Int64(v)) => Ok(NativeValue::Integer(*v)),
        (NativeType::UInt64, JsonNodeValue::UInt64(v)) => Ok(NativeValue::UInteger(*v)),
        (NativeType::Float, JsonNodeValue::Float(v)) => Ok(NativeValue::Float(*v as f64)),
        (NativeType::Double, JsonNodeValue::Double(v)) => Ok(NativeValue::Float(*v)),
        (NativeType::Bytes, JsonNodeValue::Bytes(bytes)) => bytes_to_native(node.oracle_type, bytes),
        (NativeType::Timestamp, JsonNodeValue::Timestamp(ts)) => Ok(NativeValue::Timestamp(*ts)),
        (NativeType::IntervalDs, JsonNodeValue::IntervalDs(iv)) => Ok(NativeValue::IntervalDS(*iv)),
        (NativeType::IntervalYm, JsonNodeValue::IntervalYm(iv)) => Ok(NativeValue::IntervalYM(*iv)),
        (NativeType::JsonObject, JsonNodeValue::Object(obj)) => {
            let mut map = indexmap::IndexMap::with_capacity(obj.fields.len());
            for (name, field) in obj.field_names.iter().zip(obj.fields) {
                map.insert((*name).to_string(), to_native(field)?);
            }
            Ok(NativeValue::Map(map))
        }
        (NativeType::JsonArray, JsonNodeValue::Array(arr)) => arr
            .elements
            .iter()
            .map(to_native)
            .collect::<Result<Vec<_>>>()
            .map(NativeValue::Array),
        (native_type, value) => Err(Error::Internal(format!(
            "unsupported JSON node: native type {} with payload {:?}",
            native_type, value
        ))),
    }
}

fn bytes_to_native(oracle_type: OracleType, bytes: &[u8]) -> Result<NativeValue> {
    match oracle_type {
        OracleType::Number => {
            let text = std::str::from_utf8(bytes)
                .map_err(|_| Error::conversion("JSON number text is not ASCII"))?;
            number_from_text(text)
        }
        OracleType::Raw | OracleType::LongRaw => Ok(NativeValue::Bytes(bytes.to_vec())),
        ty if ty.is_character() => String::from_utf8(bytes.to_vec())
            .map(NativeValue::String)
            .map_err(|e| Error::conversion(format!("invalid UTF-8 in JSON string: {}", e))),
        ty => Err(Error::Internal(format!(
            "unsupported JSON byte node with oracle type {}",
            ty
        ))),
    }
}

/// Convert a native value to a JSON tree allocated in `arena`
pub fn from_native<'a>(value: &NativeValue, arena: &'a Bump) -> Result<JsonNode<'a>> {
    let node = match value {
        NativeValue::Null => JsonNode::null(),
        NativeValue::Boolean(b) => {
            JsonNode::new(OracleType::Boolean, NativeType::Boolean, JsonNodeValue::Boolean(*b))
        }
        NativeValue::Float(v) => {
            JsonNode::new(OracleType::Number, NativeType::Double, JsonNodeValue::Double(*v))
        }
        NativeValue::Integer(_) | NativeValue::UInteger(_) | NativeValue::Number(_) => {
            integer_node(value, arena)?
        }
        NativeValue::String(s) => text_node(OracleType::Varchar, s.as_bytes(), arena),
        NativeValue::Bytes(b) => text_node(OracleType::Raw, b, arena),
        NativeValue::Timestamp(ts) => timestamp_node(*ts),
        NativeValue::IntervalDS(iv) => interval_ds_node(*iv),
        NativeValue::IntervalYM(iv) => interval_ym_node(*iv),
        NativeValue::Array(items) => array_node(items, arena)?,
        NativeValue::Map(map) => object_node(map, arena)?,
        NativeValue::Custom(custom) => custom_node(custom, arena)?,
        NativeValue::Lob(_) | NativeValue::Object(_) | NativeValue::Stmt(_) | NativeValue::Rowid(_) => {
            return Err(Error::conversion(format!(
                "{} cannot be stored in a JSON document",
                value.type_name()
            )))
        }
    };
    Ok(node)
}

fn integer_node<'a>(value: &NativeValue, arena: &'a Bump) -> Result<JsonNode<'a>> {
    match value {
        NativeValue::Integer(v) => Ok(JsonNode::integer(*v)),
        NativeValue::UInteger(v) => match i64::try_from(*v) {
            Ok(small) => Ok(JsonNode::integer(small)),
            Err(_) => Ok(JsonNode::number_text(arena.alloc_str(&v.to_string()).as_bytes())),
        },
        NativeValue::Number(n) => Ok(JsonNode::number_text(arena.alloc_str(n.as_str()).as_bytes())),
        other => Err(Error::Internal(format!("not an integer: {}", other.type_name()))),
    }
}

fn text_node<'a>(oracle_type: OracleType, bytes: &[u8], arena: &'a Bump) -> JsonNode<'a> {
    JsonNode::new(
        oracle_type,
        NativeType::Bytes,
        JsonNodeValue::Bytes(arena.alloc_slice_copy(bytes)),
    )
}

fn timestamp_node<'a>(ts: Timestamp) -> JsonNode<'a> {
    JsonNode::new(OracleType::Timestamp, NativeType::Timestamp, JsonNodeValue::Timestamp(ts))
}

fn interval_ds_node<'a>(iv: IntervalDS) -> JsonNode<'a> {
    JsonNode::new(OracleType::IntervalDs, NativeType::IntervalDs, JsonNodeValue::IntervalDs(iv))
}

fn interval_ym_node<'a>(iv: IntervalYM) -> JsonNode<'a> {
    JsonNode::new(OracleType::IntervalYm, NativeType::IntervalYm, JsonNodeValue::IntervalYm(iv))
}

fn array_node<'a>(items: &[NativeValue], arena: &'a Bump) -> Result<JsonNode<'a>> {
    let mut elements = BumpVec::with_capacity_in(items.len(), arena);
    for item in items {
        elements.push(from_native(item, arena)?);
    }
    Ok(JsonNode::new(
        OracleType::JsonArray,
        NativeType::JsonArray,
        JsonNodeValue::Array(JsonArray {
            elements: elements.into_bump_slice(),
        }),
    ))
}

fn object_node<'a>(map: &indexmap::IndexMap<String, NativeValue>, arena: &'a Bump) -> Result<JsonNode<'a>> {
    let mut names = BumpVec::with_capacity_in(map.len(), arena);
    let mut fields = BumpVec::with_capacity_in(map.len(), arena);
    for (name, value) in map {
        let name: &'a str = arena.alloc_str(name);
        names.push(name);
        fields.push(from_native(value, arena)?);
    }
    Ok(JsonNode::new(
        OracleType::JsonObject,
        NativeType::JsonObject,
        JsonNodeValue::Object(JsonObject {
            field_names: names.into_bump_slice(),
            fields: fields.into_bump_slice(),
        }),
    ))
}

fn custom_node<'a>(custom: &Arc<dyn JsonCapabilities>, arena: &'a Bump) -> Result<JsonNode<'a>> {
    if let Some(v) = custom.to_json_integer() {
        let integral = match &v {
            NativeValue::Integer(_) | NativeValue::UInteger(_) => true,
            NativeValue::Number(n) => n.is_integer,
            _ => false,
        };
        if integral {
            return integer_node(&v, arena);
        }
    }
    if let Some(items) = custom.to_json_array() {
        return array_node(&items, arena);
    }
    if let Some(map) = custom.to_json_map() {
        return object_node(&map, arena);
    }
    if let Some(ts) = custom.to_oracle_timestamp() {
        return Ok(timestamp_node(ts));
    }
    if let Some(iv) = custom.to_oracle_interval_ds() {
        return Ok(interval_ds_node(iv));
    }
    if let Some(iv) = custom.to_oracle_interval_ym() {
        return Ok(interval_ym_node(iv));
    }
    Ok(match custom.to_json_text() {
        JsonText::Text(s) => text_node(OracleType::Varchar, s.as_bytes(), arena),
        JsonText::Binary(b) => text_node(OracleType::Raw, &b, arena),
    })
}

/// JSON document bound to a session
#[derive(Debug, Clone)]
pub struct Json {
    handle: JsonHandle,
    session: Session,
}

impl Json {
    /// Wrap a driver JSON handle
    pub fn new(handle: JsonHandle, session: Session) -> Self {
        Self { handle, session }
    }

    /// Driver handle
    pub fn handle(&self) -> &JsonHandle {
        &self.handle
    }

    /// Owning session
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Read the document, with numbers requested as text
    pub fn value(&self) -> Result<NativeValue> {
        let arena = Bump::new();
        let node = self.handle.value(true, &arena)?;
        to_native(&node)
    }

    /// Replace the document
    pub fn set_value(&self, value: &NativeValue) -> Result<()> {
        let arena = Bump::new();
        let node = from_native(value, &arena)?;
        self.handle.set_value(&node)?;
        tracing::trace!(arena_bytes = arena.allocated_bytes(), "JSON document written");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::OracleNumber;
    use indexmap::IndexMap;

    #[derive(Debug)]
    struct Probe {
        integer: Option<NativeValue>,
        array: bool,
    }

    impl JsonCapabilities for Probe {
        fn to_json_integer(&self) -> Option<NativeValue> {
            self.integer.clone()
        }

        fn to_json_array(&self) -> Option<Vec<NativeValue>> {
            self.array.then(|| vec![NativeValue::Integer(1)])
        }

        fn to_json_map(&self) -> Option<IndexMap<String, NativeValue>> {
            let mut map = IndexMap::new();
            map.insert("probe".to_string(), NativeValue::Boolean(true));
            Some(map)
        }

        fn to_json_text(&self) -> JsonText {
            JsonText::Text("probe".to_string())
        }
    }

    #[derive(Debug)]
    struct Blob;

    impl JsonCapabilities for Blob {
        fn to_json_text(&self) -> JsonText {
            JsonText::Binary(vec![0xde, 0xad])
        }
    }

    #[test]
    fn test_scalar_nodes() {
        let arena = Bump::new();
        let node = from_native(&NativeValue::Null, &arena).unwrap();
        assert_eq!(node.native_type, NativeType::Null);

        let node = from_native(&NativeValue::Float(1.5), &arena).unwrap();
        assert_eq!(node.oracle_type, OracleType::Number);
        assert_eq!(node.value, JsonNodeValue::Double(1.5));

        let node = from_native(&NativeValue::Integer(-3), &arena).unwrap();
        assert_eq!(node.native_type, NativeType::Int64);

        let node = from_native(&NativeValue::UInteger(u64::MAX), &arena).unwrap();
        assert_eq!(node.native_type, NativeType::Bytes);
        assert_eq!(node.value, JsonNodeValue::Bytes(b"18446744073709551615"));
        assert_eq!(to_native(&node).unwrap(), NativeValue::Number(OracleNumber::from(u64::MAX)));
    }

    #[test]
    fn test_nested_round_trip() {
        let mut inner = IndexMap::new();
        inner.insert("z".to_string(), NativeValue::String("last".into()));
        inner.insert("a".to_string(), NativeValue::Array(vec![
            NativeValue::Integer(1),
            NativeValue::Float(2.5),
            NativeValue::Null,
        ]));
        let value = NativeValue::Map(inner);

        let arena = Bump::new();
        let node = from_native(&value, &arena).unwrap();
        match node.value {
            JsonNodeValue::Object(obj) => assert_eq!(obj.field_names, &["z", "a"]),
            other => panic!("expected object, got {:?}", other),
        }
        assert_eq!(to_native(&node).unwrap(), value);
    }

    #[test]
    fn test_number_text_decoding() {
        let int = JsonNode::number_text(b"123");
        assert_eq!(to_native(&int).unwrap(), NativeValue::Integer(123));

        let float = JsonNode::number_text(b"123.0");
        assert_eq!(to_native(&float).unwrap(), NativeValue::Float(123.0));
    }

    #[test]
    fn test_capability_order() {
        let arena = Bump::new();

        // integer wins when it yields an integral value
        let probe = NativeValue::Custom(Arc::new(Probe {
            integer: Some(NativeValue::Integer(7)),
            array: true,
        }));
        assert_eq!(from_native(&probe, &arena).unwrap().value, JsonNodeValue::Int64(7));

        // a non-integral integer form is skipped; array comes next
        let probe = NativeValue::Custom(Arc::new(Probe {
            integer: Some(NativeValue::Float(7.5)),
            array: true,
        }));
        assert_eq!(from_native(&probe, &arena).unwrap().native_type, NativeType::JsonArray);

        // map is used as a map, not as an array
        let probe = NativeValue::Custom(Arc::new(Probe {
            integer: None,
            array: false,
        }));
        let node = from_native(&probe, &arena).unwrap();
        assert_eq!(node.native_type, NativeType::JsonObject);
    }

    #[test]
    fn test_temporal_capabilities() {
        let arena = Bump::new();
        let dur = NativeValue::Custom(Arc::new(Duration::seconds(90)));
        let node = from_native(&dur, &arena).unwrap();
        assert_eq!(node.value, JsonNodeValue::IntervalDs(IntervalDS::new(0, 0, 1, 30, 0)));

        let dt = chrono::NaiveDate::from_ymd_opt(2020, 2, 29)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap();
        let node = from_native(&NativeValue::Custom(Arc::new(dt)), &arena).unwrap();
        assert_eq!(node.oracle_type, OracleType::Timestamp);
    }

    #[test]
    fn test_text_fallback() {
        let arena = Bump::new();
        let node = from_native(&NativeValue::Custom(Arc::new(Blob)), &arena).unwrap();
        assert_eq!(node.oracle_type, OracleType::Raw);
        assert_eq!(to_native(&node).unwrap(), NativeValue::Bytes(vec![0xde, 0xad]));
    }

    #[test]
    fn test_unknown_node_is_internal_error() {
        let bad = JsonNode::new(OracleType::Varchar, NativeType::Lob, JsonNodeValue::Null);
        assert!(matches!(to_native(&bad), Err(Error::Internal(_))));

        let mismatched = JsonNode::new(OracleType::Number, NativeType::Int64, JsonNodeValue::Boolean(true));
        assert!(matches!(to_native(&mismatched), Err(Error::Internal(_))));
    }
}
