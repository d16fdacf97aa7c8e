//! Wire values and the scalar codec
//!
//! A [`Data`] is one slot of the driver's tagged union. Its tag is not stored
//! in the slot: every conversion is told the slot's [`NativeType`] and
//! [`OracleType`], and a payload that disagrees with the declared kind is an
//! internal error.
//!
//! [`decode`] turns a slot into a [`NativeValue`]; [`encode`] writes a native
//! value into a slot, either a free-standing [`Data`] or a position inside a
//! driver variable.

use std::fmt;
use std::sync::Arc;

use bytes::Bytes;

use crate::constants::{NativeType, OracleType};
use crate::dbobject::{Object, ObjectType};
use crate::driver::{JsonHandle, LobHandle, ObjectHandle, RowidHandle, StmtHandle, VarHandle};
use crate::error::{Error, Result};
use crate::session::Session;
use crate::statement::Stmt;
use crate::types::number::is_decimal_text;
use crate::types::{IntervalDS, IntervalYM, Json, JsonCapabilities, Lob, OracleNumber, Rowid, Timestamp};
use crate::value::{integer_prefix, parse_float, NativeValue};

/// Payload of a wire slot
#[derive(Debug, Clone)]
pub enum DataBuffer {
    /// 64-bit signed integer
    Int64(i64),
    /// 64-bit unsigned integer
    UInt64(u64),
    /// 32-bit float
    Float(f32),
    /// 64-bit float
    Double(f64),
    /// Byte span; never NUL terminated
    Bytes(Bytes),
    /// Timestamp
    Timestamp(Timestamp),
    /// Day-second interval
    IntervalDs(IntervalDS),
    /// Year-month interval
    IntervalYm(IntervalYM),
    /// LOB reference
    Lob(LobHandle),
    /// Object reference
    Object(ObjectHandle),
    /// Statement reference
    Stmt(StmtHandle),
    /// Boolean
    Boolean(bool),
    /// Rowid reference
    Rowid(RowidHandle),
    /// JSON document reference
    Json(JsonHandle),
    /// Unset payload
    Empty,
}

impl DataBuffer {
    /// Native kind this payload belongs to, if any
    pub fn native_type(&self) -> Option<NativeType> {
        Some(match self {
            DataBuffer::Int64(_) => NativeType::Int64,
            DataBuffer::UInt64(_) => NativeType::UInt64,
            DataBuffer::Float(_) => NativeType::Float,
            DataBuffer::Double(_) => NativeType::Double,
            DataBuffer::Bytes(_) => NativeType::Bytes,
            DataBuffer::Timestamp(_) => NativeType::Timestamp,
            DataBuffer::IntervalDs(_) => NativeType::IntervalDs,
            DataBuffer::IntervalYm(_) => NativeType::IntervalYm,
            DataBuffer::Lob(_) => NativeType::Lob,
            DataBuffer::Object(_) => NativeType::Object,
            DataBuffer::Stmt(_) => NativeType::Stmt,
            DataBuffer::Boolean(_) => NativeType::Boolean,
            DataBuffer::Rowid(_) => NativeType::Rowid,
            DataBuffer::Json(_) => NativeType::Json,
            DataBuffer::Empty => return None,
        })
    }
}

/// One wire slot: a payload and a null flag.
///
/// When `is_null` is set the payload is unspecified and is never read.
#[derive(Debug, Clone)]
pub struct Data {
    /// Whether the slot holds NULL
    pub is_null: bool,
    /// Payload
    pub value: DataBuffer,
}

impl Data {
    /// A NULL slot
    pub fn null() -> Self {
        Self {
            is_null: true,
            value: DataBuffer::Empty,
        }
    }

    /// A non-NULL slot
    pub fn new(value: DataBuffer) -> Self {
        Self {
            is_null: false,
            value,
        }
    }

    /// Byte payload of a non-NULL slot
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match (&self.value, self.is_null) {
            (DataBuffer::Bytes(b), false) => Some(b),
            _ => None,
        }
    }
}

impl Default for Data {
    fn default() -> Self {
        Self::null()
    }
}

/// Transform applied to a value read from a slot.
///
/// `ToInteger` and `ToFloat` on a `Bytes` slot intercept the raw text before
/// the normal `Bytes` rules run and are consumed by that read. On any other
/// kind they act on the decoded value, as `Map` does.
#[derive(Clone)]
pub enum OutFilter {
    /// Parse the text as an exact integer, ignoring the `.` rule
    ToInteger,
    /// Parse the text as a float
    ToFloat,
    /// Transform the decoded value
    Map(Arc<dyn Fn(NativeValue) -> Result<NativeValue> + Send + Sync>),
}

impl OutFilter {
    /// Filter from a closure
    pub fn map<F>(f: F) -> Self
    where
        F: Fn(NativeValue) -> Result<NativeValue> + Send + Sync + 'static,
    {
        OutFilter::Map(Arc::new(f))
    }

    /// Apply to a decoded value
    pub fn apply(&self, value: NativeValue) -> Result<NativeValue> {
        match self {
            OutFilter::ToInteger => value.to_integer(),
            OutFilter::ToFloat => value.to_float(),
            OutFilter::Map(f) => f(value),
        }
    }

    fn is_raw_hook(&self) -> bool {
        matches!(self, OutFilter::ToInteger | OutFilter::ToFloat)
    }
}

impl fmt::Debug for OutFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutFilter::ToInteger => f.write_str("ToInteger"),
            OutFilter::ToFloat => f.write_str("ToFloat"),
            OutFilter::Map(_) => f.write_str("Map(..)"),
        }
    }
}

/// Transform applied to a value before it is written to a slot
pub type InFilter = Arc<dyn Fn(NativeValue) -> Result<NativeValue> + Send + Sync>;

/// Parse NUMBER text: exact integer when there is no `.`, float otherwise
pub(crate) fn number_from_text(text: &str) -> Result<NativeValue> {
    if !is_decimal_text(text) {
        return Err(Error::conversion(format!("invalid number text: {:?}", text)));
    }
    if text.contains('.') {
        return parse_float(text);
    }
    match text.parse::<i64>() {
        Ok(v) => Ok(NativeValue::Integer(v)),
        Err(_) => Ok(NativeValue::Number(OracleNumber::new(text))),
    }
}

fn ascii_text(bytes: &[u8]) -> Result<&str> {
    std::str::from_utf8(bytes).map_err(|_| Error::conversion("number text is not ASCII"))
}

/// Decode a slot into a native value.
///
/// NULL decodes to [`NativeValue::Null`] without running `filter`. A
/// `ToInteger`/`ToFloat` filter on a `Bytes` slot fires on the raw text and is
/// not applied again; any other filter runs on the decoded value.
pub fn decode(
    data: &Data,
    native_type: NativeType,
    oracle_type: OracleType,
    object_type: Option<&ObjectType>,
    filter: Option<&OutFilter>,
    session: &Session,
) -> Result<NativeValue> {
    if data.is_null {
        return Ok(NativeValue::Null);
    }
    let mut pending = filter.cloned();
    let value = decode_buffer(&data.value, native_type, oracle_type, object_type, &mut pending, session)?;
    match pending {
        Some(filter) => filter.apply(value),
        None => Ok(value),
    }
}

fn decode_buffer(
    buffer: &DataBuffer,
    native_type: NativeType,
    oracle_type: OracleType,
    object_type: Option<&ObjectType>,
    pending: &mut Option<OutFilter>,
    session: &Session,
) -> Result<NativeValue> {
    let value = match (native_type, buffer) {
        (NativeType::Int64, DataBuffer::Int64(v)) => NativeValue::Integer(*v),
        (NativeType::UInt64, DataBuffer::UInt64(v)) => NativeValue::UInteger(*v),
        (NativeType::Float, DataBuffer::Float(v)) => NativeValue::Float(*v as f64),
        (NativeType::Double, DataBuffer::Double(v)) => NativeValue::Float(*v),
        (NativeType::Bytes, DataBuffer::Bytes(b)) => decode_bytes(b, oracle_type, pending)?,
        (NativeType::Timestamp, DataBuffer::Timestamp(ts)) => NativeValue::Timestamp(*ts),
        (NativeType::IntervalDs, DataBuffer::IntervalDs(iv)) => NativeValue::IntervalDS(*iv),
        (NativeType::IntervalYm, DataBuffer::IntervalYm(iv)) => NativeValue::IntervalYM(*iv),
        (NativeType::Boolean, DataBuffer::Boolean(b)) => NativeValue::Boolean(*b),
        (NativeType::Lob, DataBuffer::Lob(h)) => NativeValue::Lob(Lob::new(h.clone(), session.clone())),
        (NativeType::Object, DataBuffer::Object(h)) => {
            let object_type = object_type.ok_or_else(|| {
                Error::invalid_argument("object type is required to decode an object value")
            })?;
            NativeValue::Object(Object::new(h.clone(), object_type.clone(), session.clone()))
        }
        (NativeType::Stmt, DataBuffer::Stmt(h)) => NativeValue::Stmt(Stmt::new(h.clone(), session.clone())),
        (NativeType::Rowid, DataBuffer::Rowid(h)) => NativeValue::Rowid(Rowid::new(h.clone(), session.clone())),
        (NativeType::Json, DataBuffer::Json(h)) => Json::new(h.clone(), session.clone()).value()?,
        (NativeType::JsonObject | NativeType::JsonArray | NativeType::Null, _) => {
            return Err(Error::Internal(format!("unsupported native type {}", native_type)))
        }
        (native_type, buffer) => {
            return Err(Error::Internal(format!(
                "{} slot holds a {} payload",
                native_type,
                buffer.native_type().map(|t| t.name()).unwrap_or("empty")
            )))
        }
    };
    Ok(value)
}

fn decode_bytes(bytes: &[u8], oracle_type: OracleType, pending: &mut Option<OutFilter>) -> Result<NativeValue> {
    if pending.as_ref().is_some_and(OutFilter::is_raw_hook) {
        let text = ascii_text(bytes)?;
        return match pending.take() {
            Some(OutFilter::ToInteger) => integer_prefix(text),
            _ => parse_float(text),
        };
    }
    if oracle_type == OracleType::Number {
        return number_from_text(ascii_text(bytes)?);
    }
    if oracle_type.is_character() {
        return String::from_utf8(bytes.to_vec())
            .map(NativeValue::String)
            .map_err(|e| Error::conversion(format!("invalid UTF-8 in {} value: {}", oracle_type, e)));
    }
    Ok(NativeValue::Bytes(bytes.to_vec()))
}

/// Where [`encode`] writes its result
pub enum SlotTarget<'a> {
    /// A free-standing slot
    Data(&'a mut Data),
    /// Position `pos` of a driver variable; byte payloads are copied by the driver
    Var {
        /// Variable handle
        handle: &'a VarHandle,
        /// Slot position
        pos: u32,
    },
}

impl SlotTarget<'_> {
    fn store(self, buffer: DataBuffer) -> Result<()> {
        match self {
            SlotTarget::Data(d) => *d = Data::new(buffer),
            SlotTarget::Var { handle, pos } => handle.write_slot(pos, Data::new(buffer))?,
        }
        Ok(())
    }
}

/// Encode a native value into a slot.
///
/// Returns the exported byte buffer for `Bytes` kinds. The driver reads it
/// during the call; for a `Data` target the slot keeps its own reference.
pub fn encode(
    value: &NativeValue,
    target: SlotTarget<'_>,
    native_type: NativeType,
    oracle_type: OracleType,
    session: &Session,
) -> Result<Option<Bytes>> {
    if value.is_null() {
        match target {
            SlotTarget::Data(d) => *d = Data::null(),
            SlotTarget::Var { handle, pos } => handle.write_slot(pos, Data::null())?,
        }
        return Ok(None);
    }

    let buffer = match native_type {
        NativeType::Int64 => DataBuffer::Int64(to_i64(value)?),
        NativeType::UInt64 => DataBuffer::UInt64(to_u64(value)?),
        NativeType::Float => DataBuffer::Float(to_f64(value)? as f32),
        NativeType::Double => DataBuffer::Double(to_f64(value)?),
        NativeType::Boolean => DataBuffer::Boolean(
            value
                .as_bool()
                .ok_or_else(|| mismatch(value, native_type))?,
        ),
        NativeType::Timestamp => DataBuffer::Timestamp(to_timestamp(value)?),
        NativeType::IntervalDs => DataBuffer::IntervalDs(to_interval_ds(value)?),
        NativeType::IntervalYm => DataBuffer::IntervalYm(to_interval_ym(value)?),
        NativeType::Bytes => {
            let exported = export_bytes(value, oracle_type)?;
            match target {
                SlotTarget::Data(d) => *d = Data::new(DataBuffer::Bytes(exported.clone())),
                SlotTarget::Var { handle, pos } => handle.set_from_bytes(pos, &exported)?,
            }
            return Ok(Some(exported));
        }
        NativeType::Lob => {
            let lob = value.as_lob().ok_or_else(|| mismatch(value, native_type))?;
            match target {
                SlotTarget::Var { handle, pos } => handle.set_from_lob(pos, lob.handle())?,
                target => target.store(DataBuffer::Lob(lob.handle().clone()))?,
            }
            return Ok(None);
        }
        NativeType::Object => {
            let obj = value.as_object().ok_or_else(|| mismatch(value, native_type))?;
            match target {
                SlotTarget::Var { handle, pos } => handle.set_from_object(pos, obj.handle())?,
                target => target.store(DataBuffer::Object(obj.handle().clone()))?,
            }
            return Ok(None);
        }
        NativeType::Stmt => {
            let stmt = value.as_stmt().ok_or_else(|| mismatch(value, native_type))?;
            match target {
                SlotTarget::Var { handle, pos } => handle.set_from_stmt(pos, stmt.handle())?,
                target => target.store(DataBuffer::Stmt(stmt.handle().clone()))?,
            }
            return Ok(None);
        }
        NativeType::Rowid => {
            let rowid = value.as_rowid().ok_or_else(|| mismatch(value, native_type))?;
            match target {
                SlotTarget::Var { handle, pos } => handle.set_from_rowid(pos, rowid.handle())?,
                target => target.store(DataBuffer::Rowid(rowid.handle().clone()))?,
            }
            return Ok(None);
        }
        NativeType::Json => {
            let handle = match &target {
                SlotTarget::Data(d) => match &d.value {
                    DataBuffer::Json(h) => h.clone(),
                    _ => session.conn().new_json()?,
                },
                SlotTarget::Var { handle, pos } => match handle.read_slot(*pos)?.value {
                    DataBuffer::Json(h) => h,
                    _ => session.conn().new_json()?,
                },
            };
            Json::new(handle.clone(), session.clone()).set_value(value)?;
            DataBuffer::Json(handle)
        }
        NativeType::JsonObject | NativeType::JsonArray | NativeType::Null => {
            return Err(Error::Internal(format!("unsupported native type {}", native_type)))
        }
    };
    target.store(buffer)?;
    Ok(None)
}

fn mismatch(value: &NativeValue, native_type: NativeType) -> Error {
    Error::conversion(format!("cannot convert {} to {}", value.type_name(), native_type))
}

fn to_i64(value: &NativeValue) -> Result<i64> {
    match value {
        NativeValue::Integer(v) => Ok(*v),
        NativeValue::UInteger(v) => {
            i64::try_from(*v).map_err(|_| Error::conversion(format!("{} out of int64 range", v)))
        }
        NativeValue::Float(_) | NativeValue::Number(_) => match value.to_integer()? {
            NativeValue::Integer(v) => Ok(v),
            other => Err(Error::conversion(format!("{} out of int64 range", other))),
        },
        other => Err(mismatch(other, NativeType::Int64)),
    }
}

fn to_u64(value: &NativeValue) -> Result<u64> {
    match value {
        NativeValue::UInteger(v) => Ok(*v),
        NativeValue::Integer(v) => {
            u64::try_from(*v).map_err(|_| Error::conversion(format!("{} out of uint64 range", v)))
        }
        NativeValue::Float(f) => {
            let t = f.trunc();
            if t.is_finite() && t >= 0.0 && t < u64::MAX as f64 {
                Ok(t as u64)
            } else {
                Err(Error::conversion(format!("{} out of uint64 range", f)))
            }
        }
        NativeValue::Number(n) => {
            let int_part = n.as_str().split('.').next().unwrap_or("");
            int_part
                .parse()
                .map_err(|_| Error::conversion(format!("{} out of uint64 range", n)))
        }
        other => Err(mismatch(other, NativeType::UInt64)),
    }
}

fn to_f64(value: &NativeValue) -> Result<f64> {
    match value {
        NativeValue::Float(_)
        | NativeValue::Integer(_)
        | NativeValue::UInteger(_)
        | NativeValue::Number(_) => value
            .as_f64()
            .ok_or_else(|| Error::conversion(format!("cannot convert {} to double", value))),
        other => Err(mismatch(other, NativeType::Double)),
    }
}

fn custom(value: &NativeValue) -> Option<&Arc<dyn JsonCapabilities>> {
    match value {
        NativeValue::Custom(c) => Some(c),
        _ => None,
    }
}

fn to_timestamp(value: &NativeValue) -> Result<Timestamp> {
    value
        .as_timestamp()
        .copied()
        .or_else(|| custom(value).and_then(|c| c.to_oracle_timestamp()))
        .ok_or_else(|| mismatch(value, NativeType::Timestamp))
}

fn to_interval_ds(value: &NativeValue) -> Result<IntervalDS> {
    value
        .as_interval_ds()
        .copied()
        .or_else(|| custom(value).and_then(|c| c.to_oracle_interval_ds()))
        .ok_or_else(|| mismatch(value, NativeType::IntervalDs))
}

fn to_interval_ym(value: &NativeValue) -> Result<IntervalYM> {
    value
        .as_interval_ym()
        .copied()
        .or_else(|| custom(value).and_then(|c| c.to_oracle_interval_ym()))
        .ok_or_else(|| mismatch(value, NativeType::IntervalYm))
}

/// Positional decimal text that still reads back as a float
fn float_text(value: f64) -> String {
    let mut text = value.to_string();
    if !text.contains('.') {
        text.push_str(".0");
    }
    text
}

/// Render a value as the byte span the driver expects for `oracle_type`
pub(crate) fn export_bytes(value: &NativeValue, oracle_type: OracleType) -> Result<Bytes> {
    if oracle_type == OracleType::Number {
        let text = match value {
            NativeValue::String(s) => OracleNumber::parse(s.trim())?.value,
            NativeValue::Bytes(b) => OracleNumber::parse(ascii_text(b)?)?.value,
            NativeValue::Number(n) => n.value.clone(),
            NativeValue::Integer(v) => v.to_string(),
            NativeValue::UInteger(v) => v.to_string(),
            NativeValue::Float(f) if f.is_finite() => float_text(*f),
            NativeValue::Float(f) => {
                return Err(Error::conversion(format!("{} cannot be stored as a number", f)))
            }
            other => return Err(mismatch(other, NativeType::Bytes)),
        };
        return Ok(Bytes::from(text));
    }
    if oracle_type.is_character() {
        return match value {
            NativeValue::String(s) => Ok(Bytes::copy_from_slice(s.as_bytes())),
            NativeValue::Bytes(b) => std::str::from_utf8(b)
                .map(|s| Bytes::copy_from_slice(s.as_bytes()))
                .map_err(|e| Error::Encoding(format!("cannot export bytes as UTF-8: {}", e))),
            other => Err(mismatch(other, NativeType::Bytes)),
        };
    }
    match value {
        NativeValue::String(s) => Ok(Bytes::copy_from_slice(s.as_bytes())),
        NativeValue::Bytes(b) => Ok(Bytes::copy_from_slice(b)),
        other => Err(mismatch(other, NativeType::Bytes)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_number_text_branching() {
        assert_eq!(number_from_text("123").unwrap(), NativeValue::Integer(123));
        assert_eq!(number_from_text("123.0").unwrap(), NativeValue::Float(123.0));
        assert_eq!(number_from_text("-0.5").unwrap(), NativeValue::Float(-0.5));
        assert_eq!(
            number_from_text("99999999999999999999").unwrap(),
            NativeValue::Number(OracleNumber::new("99999999999999999999"))
        );
        assert!(number_from_text("12a").is_err());
        assert!(number_from_text(".").is_err());
    }

    #[test]
    fn test_raw_hooks_consume_filter() {
        let mut pending = Some(OutFilter::ToInteger);
        let v = decode_bytes(b"123.9", OracleType::Number, &mut pending).unwrap();
        assert_eq!(v, NativeValue::Integer(123));
        assert!(pending.is_none());

        let mut pending = Some(OutFilter::ToFloat);
        let v = decode_bytes(b"7", OracleType::Number, &mut pending).unwrap();
        assert_eq!(v, NativeValue::Float(7.0));
        assert!(pending.is_none());
    }

    #[test]
    fn test_map_filter_is_not_a_raw_hook() {
        let mut pending = Some(OutFilter::map(Ok));
        let v = decode_bytes(b"5", OracleType::Number, &mut pending).unwrap();
        assert_eq!(v, NativeValue::Integer(5));
        assert!(pending.is_some());
    }

    #[test]
    fn test_bytes_by_oracle_type() {
        let mut none = None;
        assert_eq!(
            decode_bytes("世界".as_bytes(), OracleType::NVarchar, &mut none).unwrap(),
            NativeValue::String("世界".into())
        );
        assert_eq!(
            decode_bytes(&[0xff, 0x00], OracleType::Raw, &mut none).unwrap(),
            NativeValue::Bytes(vec![0xff, 0x00])
        );
        assert!(decode_bytes(&[0xff], OracleType::Varchar, &mut none).is_err());
    }

    #[test]
    fn test_export_bytes() {
        assert_eq!(
            export_bytes(&NativeValue::Integer(-42), OracleType::Number).unwrap(),
            Bytes::from_static(b"-42")
        );
        assert_eq!(
            export_bytes(&NativeValue::Float(0.5), OracleType::Number).unwrap(),
            Bytes::from_static(b"0.5")
        );
        assert_eq!(
            export_bytes(&NativeValue::Float(3.0), OracleType::Number).unwrap(),
            Bytes::from_static(b"3.0")
        );
        assert!(export_bytes(&NativeValue::String("abc".into()), OracleType::Number).is_err());
        assert!(export_bytes(&NativeValue::Float(f64::NAN), OracleType::Number).is_err());
        assert!(matches!(
            export_bytes(&NativeValue::Bytes(vec![0xc3]), OracleType::Varchar),
            Err(Error::Encoding(_))
        ));
        assert_eq!(
            export_bytes(&NativeValue::String(".".into()), OracleType::Char).unwrap(),
            Bytes::from_static(b".")
        );
        assert!(export_bytes(&NativeValue::Integer(1), OracleType::Varchar).is_err());
    }

    #[test]
    fn test_integral_floats_stay_floats() {
        for value in [3.0, -2.0, 0.0, 1e300, 1e-300, f64::MAX] {
            let text = export_bytes(&NativeValue::Float(value), OracleType::Number).unwrap();
            let text = std::str::from_utf8(&text).unwrap();
            assert!(is_decimal_text(text), "{}", text);
            assert_eq!(number_from_text(text).unwrap(), NativeValue::Float(value));
        }
    }

    #[test]
    fn test_numeric_conversions() {
        assert_eq!(to_i64(&NativeValue::Float(3.99)).unwrap(), 3);
        assert!(to_i64(&NativeValue::UInteger(u64::MAX)).is_err());
        assert!(to_u64(&NativeValue::Integer(-1)).is_err());
        assert_eq!(to_u64(&NativeValue::Number(OracleNumber::new("18446744073709551615"))).unwrap(), u64::MAX);
        assert!(to_f64(&NativeValue::String("1".into())).is_err());
    }
}
