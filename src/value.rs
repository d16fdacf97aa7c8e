//! Native values exchanged with the codecs
//!
//! [`NativeValue`] is the in-process side of every conversion: what `get`
//! returns and what `set` accepts. Handle-backed values (LOBs, objects,
//! statements, rowids) keep their session alive for as long as they exist.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;

use crate::dbobject::Object;
use crate::driver::same_handle;
use crate::error::{Error, Result};
use crate::statement::Stmt;
use crate::types::number::is_decimal_text;
use crate::types::{IntervalDS, IntervalYM, JsonCapabilities, Lob, OracleNumber, Rowid, Timestamp};

/// A value on the native side of the codec.
///
/// Values can be inspected with the `as_*` methods or built with `From`:
///
/// ```rust
/// use oracledb::NativeValue;
///
/// let v: NativeValue = "hello".into();
/// assert_eq!(v.as_str(), Some("hello"));
/// assert!(NativeValue::from(None::<i64>).is_null());
/// ```
#[derive(Debug, Clone)]
pub enum NativeValue {
    /// NULL
    Null,
    /// Boolean
    Boolean(bool),
    /// Signed integer
    Integer(i64),
    /// Unsigned integer
    UInteger(u64),
    /// Floating point
    Float(f64),
    /// Integer too large for 64 bits, as decimal text
    Number(OracleNumber),
    /// Character data
    String(String),
    /// Binary data
    Bytes(Vec<u8>),
    /// Timestamp
    Timestamp(Timestamp),
    /// Day-second interval
    IntervalDS(IntervalDS),
    /// Year-month interval
    IntervalYM(IntervalYM),
    /// Large object
    Lob(Lob),
    /// Object or collection
    Object(Object),
    /// Statement (REF CURSOR)
    Stmt(Stmt),
    /// Rowid
    Rowid(Rowid),
    /// Sequence (JSON array)
    Array(Vec<NativeValue>),
    /// Ordered map (JSON object)
    Map(IndexMap<String, NativeValue>),
    /// Value encoded through its JSON capabilities
    Custom(Arc<dyn JsonCapabilities>),
}

impl NativeValue {
    /// Wrap a value that encodes through [`JsonCapabilities`]
    pub fn custom(value: impl JsonCapabilities + 'static) -> Self {
        NativeValue::Custom(Arc::new(value))
    }

    /// Check if this value is NULL
    pub fn is_null(&self) -> bool {
        matches!(self, NativeValue::Null)
    }

    /// Short name of the variant, used in error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            NativeValue::Null => "null",
            NativeValue::Boolean(_) => "boolean",
            NativeValue::Integer(_) => "integer",
            NativeValue::UInteger(_) => "unsigned integer",
            NativeValue::Float(_) => "float",
            NativeValue::Number(_) => "number",
            NativeValue::String(_) => "string",
            NativeValue::Bytes(_) => "bytes",
            NativeValue::Timestamp(_) => "timestamp",
            NativeValue::IntervalDS(_) => "interval_ds",
            NativeValue::IntervalYM(_) => "interval_ym",
            NativeValue::Lob(_) => "lob",
            NativeValue::Object(_) => "object",
            NativeValue::Stmt(_) => "stmt",
            NativeValue::Rowid(_) => "rowid",
            NativeValue::Array(_) => "array",
            NativeValue::Map(_) => "map",
            NativeValue::Custom(_) => "custom",
        }
    }

    /// Try to get as a string reference
    pub fn as_str(&self) -> Option<&str> {
        match self {
            NativeValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Try to get as an integer
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            NativeValue::Integer(i) => Some(*i),
            NativeValue::UInteger(u) => i64::try_from(*u).ok(),
            NativeValue::Number(n) => n.to_i64().ok(),
            _ => None,
        }
    }

    /// Try to get as an unsigned integer
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            NativeValue::UInteger(u) => Some(*u),
            NativeValue::Integer(i) => u64::try_from(*i).ok(),
            NativeValue::Number(n) => n.as_str().parse().ok(),
            _ => None,
        }
    }

    /// Try to get as a float
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            NativeValue::Float(f) => Some(*f),
            NativeValue::Integer(i) => Some(*i as f64),
            NativeValue::UInteger(u) => Some(*u as f64),
            NativeValue::Number(n) => n.to_f64().ok(),
            _ => None,
        }
    }

    /// Try to get as bytes
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            NativeValue::Bytes(b) => Some(b),
            NativeValue::String(s) => Some(s.as_bytes()),
            _ => None,
        }
    }

    /// Try to get as a boolean
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            NativeValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Try to get as a timestamp
    pub fn as_timestamp(&self) -> Option<&Timestamp> {
        match self {
            NativeValue::Timestamp(ts) => Some(ts),
            _ => None,
        }
    }

    /// Try to get as a day-second interval
    pub fn as_interval_ds(&self) -> Option<&IntervalDS> {
        match self {
            NativeValue::IntervalDS(iv) => Some(iv),
            _ => None,
        }
    }

    /// Try to get as a year-month interval
    pub fn as_interval_ym(&self) -> Option<&IntervalYM> {
        match self {
            NativeValue::IntervalYM(iv) => Some(iv),
            _ => None,
        }
    }

    /// Try to get as a LOB
    pub fn as_lob(&self) -> Option<&Lob> {
        match self {
            NativeValue::Lob(lob) => Some(lob),
            _ => None,
        }
    }

    /// Try to get as an object
    pub fn as_object(&self) -> Option<&Object> {
        match self {
            NativeValue::Object(obj) => Some(obj),
            _ => None,
        }
    }

    /// Try to get as a statement
    pub fn as_stmt(&self) -> Option<&Stmt> {
        match self {
            NativeValue::Stmt(stmt) => Some(stmt),
            _ => None,
        }
    }

    /// Try to get as a rowid
    pub fn as_rowid(&self) -> Option<&Rowid> {
        match self {
            NativeValue::Rowid(rowid) => Some(rowid),
            _ => None,
        }
    }

    /// Try to get as a sequence
    pub fn as_array(&self) -> Option<&[NativeValue]> {
        match self {
            NativeValue::Array(items) => Some(items),
            _ => None,
        }
    }

    /// Try to get as a map
    pub fn as_map(&self) -> Option<&IndexMap<String, NativeValue>> {
        match self {
            NativeValue::Map(map) => Some(map),
            _ => None,
        }
    }

    /// Coerce to an integer value, truncating any fraction
    pub fn to_integer(&self) -> Result<NativeValue> {
        match self {
            NativeValue::Null | NativeValue::Integer(_) | NativeValue::UInteger(_) => Ok(self.clone()),
            NativeValue::Float(f) => {
                let t = f.trunc();
                if t.is_finite() && t >= i64::MIN as f64 && t < i64::MAX as f64 {
                    Ok(NativeValue::Integer(t as i64))
                } else {
                    Err(Error::conversion(format!("float {} out of integer range", f)))
                }
            }
            NativeValue::Number(n) => integer_prefix(n.as_str()),
            NativeValue::String(s) => integer_prefix(s.trim()),
            other => Err(Error::conversion(format!(
                "cannot convert {} to integer",
                other.type_name()
            ))),
        }
    }

    /// Coerce to a float value
    pub fn to_float(&self) -> Result<NativeValue> {
        match self {
            NativeValue::Null | NativeValue::Float(_) => Ok(self.clone()),
            NativeValue::Integer(i) => Ok(NativeValue::Float(*i as f64)),
            NativeValue::UInteger(u) => Ok(NativeValue::Float(*u as f64)),
            NativeValue::Number(n) => n.to_f64().map(NativeValue::Float),
            NativeValue::String(s) => parse_float(s.trim()),
            other => Err(Error::conversion(format!(
                "cannot convert {} to float",
                other.type_name()
            ))),
        }
    }
}

/// Parse decimal text as an exact integer, dropping anything after the `.`
pub(crate) fn integer_prefix(text: &str) -> Result<NativeValue> {
    if !is_decimal_text(text) {
        return Err(Error::conversion(format!("invalid integer text: {:?}", text)));
    }
    let int_part = text.split('.').next().unwrap_or("");
    let digits = int_part.trim_start_matches(['-', '+']);
    if digits.is_empty() {
        return Ok(NativeValue::Integer(0));
    }
    match int_part.parse::<i64>() {
        Ok(v) => Ok(NativeValue::Integer(v)),
        Err(_) => Ok(NativeValue::Number(OracleNumber::new(int_part))),
    }
}

/// Parse decimal text as a float
pub(crate) fn parse_float(text: &str) -> Result<NativeValue> {
    if !is_decimal_text(text) {
        return Err(Error::conversion(format!("invalid float text: {:?}", text)));
    }
    text.parse::<f64>()
        .map(NativeValue::Float)
        .map_err(|e| Error::conversion(format!("invalid float text {:?}: {}", text, e)))
}

impl PartialEq for NativeValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (NativeValue::Null, NativeValue::Null) => true,
            (NativeValue::Boolean(a), NativeValue::Boolean(b)) => a == b,
            (NativeValue::Integer(a), NativeValue::Integer(b)) => a == b,
            (NativeValue::UInteger(a), NativeValue::UInteger(b)) => a == b,
            (NativeValue::Float(a), NativeValue::Float(b)) => a == b,
            (NativeValue::Number(a), NativeValue::Number(b)) => a == b,
            (NativeValue::String(a), NativeValue::String(b)) => a == b,
            (NativeValue::Bytes(a), NativeValue::Bytes(b)) => a == b,
            (NativeValue::Timestamp(a), NativeValue::Timestamp(b)) => a == b,
            (NativeValue::IntervalDS(a), NativeValue::IntervalDS(b)) => a == b,
            (NativeValue::IntervalYM(a), NativeValue::IntervalYM(b)) => a == b,
            (NativeValue::Lob(a), NativeValue::Lob(b)) => same_handle(a.handle(), b.handle()),
            (NativeValue::Object(a), NativeValue::Object(b)) => same_handle(a.handle(), b.handle()),
            (NativeValue::Stmt(a), NativeValue::Stmt(b)) => same_handle(a.handle(), b.handle()),
            (NativeValue::Rowid(a), NativeValue::Rowid(b)) => same_handle(a.handle(), b.handle()),
            (NativeValue::Array(a), NativeValue::Array(b)) => a == b,
            (NativeValue::Map(a), NativeValue::Map(b)) => a == b,
            (NativeValue::Custom(a), NativeValue::Custom(b)) => same_handle(a, b),
            _ => false,
        }
    }
}

macro_rules! from_signed {
    ($($t:ty),*) => {
        $(impl From<$t> for NativeValue {
            fn from(v: $t) -> Self {
                NativeValue::Integer(v as i64)
            }
        })*
    };
}

macro_rules! from_unsigned {
    ($($t:ty),*) => {
        $(impl From<$t> for NativeValue {
            fn from(v: $t) -> Self {
                NativeValue::UInteger(v as u64)
            }
        })*
    };
}

from_signed!(i8, i16, i32, i64);
from_unsigned!(u8, u16, u32, u64);

impl From<bool> for NativeValue {
    fn from(v: bool) -> Self {
        NativeValue::Boolean(v)
    }
}

impl From<f32> for NativeValue {
    fn from(v: f32) -> Self {
        NativeValue::Float(v as f64)
    }
}

impl From<f64> for NativeValue {
    fn from(v: f64) -> Self {
        NativeValue::Float(v)
    }
}

impl From<&str> for NativeValue {
    fn from(v: &str) -> Self {
        NativeValue::String(v.to_string())
    }
}

impl From<String> for NativeValue {
    fn from(v: String) -> Self {
        NativeValue::String(v)
    }
}

impl From<&[u8]> for NativeValue {
    fn from(v: &[u8]) -> Self {
        NativeValue::Bytes(v.to_vec())
    }
}

impl From<Vec<u8>> for NativeValue {
    fn from(v: Vec<u8>) -> Self {
        NativeValue::Bytes(v)
    }
}

impl From<OracleNumber> for NativeValue {
    fn from(v: OracleNumber) -> Self {
        NativeValue::Number(v)
    }
}

impl From<Timestamp> for NativeValue {
    fn from(v: Timestamp) -> Self {
        NativeValue::Timestamp(v)
    }
}

impl From<IntervalDS> for NativeValue {
    fn from(v: IntervalDS) -> Self {
        NativeValue::IntervalDS(v)
    }
}

impl From<IntervalYM> for NativeValue {
    fn from(v: IntervalYM) -> Self {
        NativeValue::IntervalYM(v)
    }
}

impl From<Lob> for NativeValue {
    fn from(v: Lob) -> Self {
        NativeValue::Lob(v)
    }
}

impl From<Object> for NativeValue {
    fn from(v: Object) -> Self {
        NativeValue::Object(v)
    }
}

impl From<Stmt> for NativeValue {
    fn from(v: Stmt) -> Self {
        NativeValue::Stmt(v)
    }
}

impl From<Rowid> for NativeValue {
    fn from(v: Rowid) -> Self {
        NativeValue::Rowid(v)
    }
}

impl From<Vec<NativeValue>> for NativeValue {
    fn from(v: Vec<NativeValue>) -> Self {
        NativeValue::Array(v)
    }
}

impl From<IndexMap<String, NativeValue>> for NativeValue {
    fn from(v: IndexMap<String, NativeValue>) -> Self {
        NativeValue::Map(v)
    }
}

impl<T: Into<NativeValue>> From<Option<T>> for NativeValue {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(inner) => inner.into(),
            None => NativeValue::Null,
        }
    }
}

impl From<serde_json::Value> for NativeValue {
    fn from(v: serde_json::Value) -> Self {
        match v {
            serde_json::Value::Null => NativeValue::Null,
            serde_json::Value::Bool(b) => NativeValue::Boolean(b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    NativeValue::Integer(i)
                } else if let Some(u) = n.as_u64() {
                    NativeValue::UInteger(u)
                } else {
                    NativeValue::Float(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            serde_json::Value::String(s) => NativeValue::String(s),
            serde_json::Value::Array(items) => {
                NativeValue::Array(items.into_iter().map(NativeValue::from).collect())
            }
            serde_json::Value::Object(map) => NativeValue::Map(
                map.into_iter()
                    .map(|(k, v)| (k, NativeValue::from(v)))
                    .collect(),
            ),
        }
    }
}

impl TryFrom<NativeValue> for serde_json::Value {
    type Error = Error;

    fn try_from(v: NativeValue) -> Result<Self> {
        use serde_json::Value as J;

        Ok(match v {
            NativeValue::Null => J::Null,
            NativeValue::Boolean(b) => J::Bool(b),
            NativeValue::Integer(i) => J::from(i),
            NativeValue::UInteger(u) => J::from(u),
            NativeValue::Float(f) => serde_json::Number::from_f64(f)
                .map(J::Number)
                .ok_or_else(|| Error::conversion(format!("{} has no JSON form", f)))?,
            NativeValue::Number(n) => J::Number(n.as_str().parse().map_err(|e| {
                Error::conversion(format!("invalid JSON number {}: {}", n, e))
            })?),
            NativeValue::String(s) => J::String(s),
            NativeValue::Bytes(b) => J::String(hex::encode(b)),
            NativeValue::Timestamp(ts) => J::String(ts.to_string()),
            NativeValue::IntervalDS(iv) => J::String(iv.to_string()),
            NativeValue::IntervalYM(iv) => J::String(iv.to_string()),
            NativeValue::Array(items) => J::Array(
                items
                    .into_iter()
                    .map(J::try_from)
                    .collect::<Result<Vec<_>>>()?,
            ),
            NativeValue::Map(map) => J::Object(
                map.into_iter()
                    .map(|(k, v)| J::try_from(v).map(|v| (k, v)))
                    .collect::<Result<serde_json::Map<_, _>>>()?,
            ),
            other => {
                return Err(Error::conversion(format!(
                    "{} has no JSON form",
                    other.type_name()
                )))
            }
        })
    }
}

impl fmt::Display for NativeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NativeValue::Null => write!(f, "NULL"),
            NativeValue::Boolean(b) => write!(f, "{}", b),
            NativeValue::Integer(i) => write!(f, "{}", i),
            NativeValue::UInteger(u) => write!(f, "{}", u),
            NativeValue::Float(fl) => write!(f, "{}", fl),
            NativeValue::Number(n) => write!(f, "{}", n),
            NativeValue::String(s) => write!(f, "{}", s),
            NativeValue::Bytes(b) => write!(f, "<{} bytes>", b.len()),
            NativeValue::Timestamp(ts) => write!(f, "{}", ts),
            NativeValue::IntervalDS(iv) => write!(f, "{}", iv),
            NativeValue::IntervalYM(iv) => write!(f, "{}", iv),
            NativeValue::Lob(lob) => write!(f, "<LOB: {}>", lob.lob_type()),
            NativeValue::Object(_) => write!(f, "<OBJECT>"),
            NativeValue::Stmt(_) => write!(f, "<STMT>"),
            NativeValue::Rowid(_) => write!(f, "<ROWID>"),
            NativeValue::Array(items) => write!(f, "<ARRAY: {} elements>", items.len()),
            NativeValue::Map(map) => write!(f, "<MAP: {} entries>", map.len()),
            NativeValue::Custom(c) => write!(f, "{:?}", c),
        }
    }
}
