//! Reference variable: a vector of slots behind a mutex

use std::any::Any;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use parking_lot::Mutex;

use super::{driver_error, MemoryJson};
use crate::constants::{error_code, NativeType, OracleType};
use crate::data::{Data, DataBuffer};
use crate::driver::{DriverResult, LobHandle, ObjectHandle, RowidHandle, StmtHandle, VarBackend, VarHandle};
use crate::var::VarSpec;

/// Maximum UTF-8 bytes per character
const MAX_BYTES_PER_CHAR: u32 = 4;

#[derive(Debug)]
struct VarState {
    slots: Vec<Data>,
    num_elements: u32,
    returned: HashMap<u32, Vec<Data>>,
}

/// Reference variable
#[derive(Debug)]
pub struct MemoryVar {
    native_type: NativeType,
    oracle_type: OracleType,
    array_size: u32,
    size: u32,
    size_is_bytes: bool,
    state: Mutex<VarState>,
    calls: AtomicUsize,
}

impl MemoryVar {
    /// Variable shaped by `spec`; JSON slots start with an empty document each
    pub fn new(spec: &VarSpec) -> DriverResult<Self> {
        if spec.array_size == 0 {
            return Err(driver_error(
                error_code::CLIENT,
                "DPI-1031: array size cannot be zero",
                "new_var",
            ));
        }
        let slots = (0..spec.array_size)
            .map(|_| match spec.native_type {
                NativeType::Json => Data {
                    is_null: true,
                    value: DataBuffer::Json(Arc::new(MemoryJson::new())),
                },
                _ => Data::null(),
            })
            .collect();
        Ok(Self {
            native_type: spec.native_type,
            oracle_type: spec.oracle_type,
            array_size: spec.array_size,
            size: spec.size,
            size_is_bytes: spec.size_is_bytes,
            state: Mutex::new(VarState {
                slots,
                num_elements: if spec.is_array { 0 } else { spec.array_size },
                returned: HashMap::new(),
            }),
            calls: AtomicUsize::new(0),
        })
    }

    /// Number of trait calls made against this variable
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::Relaxed)
    }

    /// Rows a DML returning clause produced for `pos`
    pub fn set_returned_data(&self, pos: u32, rows: Vec<Data>) {
        self.state.lock().returned.insert(pos, rows);
    }

    fn called(&self) {
        self.calls.fetch_add(1, Ordering::Relaxed);
    }

    fn check_pos(&self, pos: u32, fn_name: &str) -> DriverResult<()> {
        if pos >= self.array_size {
            return Err(driver_error(
                error_code::ARRAY_SIZE_EXCEEDED,
                format!("array position {} exceeds array size {}", pos, self.array_size),
                fn_name,
            ));
        }
        Ok(())
    }

    fn check_kind(&self, data: &Data, fn_name: &str) -> DriverResult<()> {
        match data.value.native_type() {
            Some(kind) if !data.is_null && kind != self.native_type => Err(driver_error(
                error_code::INCONSISTENT_DATATYPES,
                format!("inconsistent datatypes: expected {} got {}", self.native_type, kind),
                fn_name,
            )),
            _ => Ok(()),
        }
    }

    fn check_size(&self, value: &[u8]) -> DriverResult<()> {
        let sized = self.oracle_type.is_character() || self.oracle_type == OracleType::Raw;
        if self.size == 0 || !sized {
            return Ok(());
        }
        let actual = if self.size_is_bytes || self.oracle_type == OracleType::Raw {
            value.len()
        } else {
            String::from_utf8_lossy(value).chars().count()
        };
        if actual > self.size as usize {
            return Err(driver_error(
                error_code::VALUE_TOO_LARGE,
                format!("value too large (actual: {}, maximum: {})", actual, self.size),
                "set_from_bytes",
            ));
        }
        Ok(())
    }

    fn store(&self, pos: u32, data: Data, fn_name: &str) -> DriverResult<()> {
        self.called();
        self.check_pos(pos, fn_name)?;
        self.check_kind(&data, fn_name)?;
        let data = match data.value {
            DataBuffer::Bytes(b) if !data.is_null => {
                self.check_size(&b)?;
                Data::new(DataBuffer::Bytes(Bytes::copy_from_slice(&b)))
            }
            _ => data,
        };
        self.state.lock().slots[pos as usize] = data;
        Ok(())
    }
}

impl VarBackend for MemoryVar {
    fn array_size(&self) -> u32 {
        self.array_size
    }

    fn read_slot(&self, pos: u32) -> DriverResult<Data> {
        self.called();
        self.check_pos(pos, "read_slot")?;
        Ok(self.state.lock().slots[pos as usize].clone())
    }

    fn write_slot(&self, pos: u32, data: Data) -> DriverResult<()> {
        if data.is_null {
            self.called();
            self.check_pos(pos, "write_slot")?;
            // null JSON slots keep their document
            self.state.lock().slots[pos as usize].is_null = true;
            return Ok(());
        }
        self.store(pos, data, "write_slot")
    }

    fn set_from_bytes(&self, pos: u32, value: &[u8]) -> DriverResult<()> {
        if self.native_type != NativeType::Bytes {
            return Err(driver_error(
                error_code::CLIENT,
                format!("DPI-1014: native type {} cannot take bytes", self.native_type),
                "set_from_bytes",
            ));
        }
        self.store(pos, Data::new(DataBuffer::Bytes(Bytes::copy_from_slice(value))), "set_from_bytes")
    }

    fn set_from_lob(&self, pos: u32, lob: &LobHandle) -> DriverResult<()> {
        self.store(pos, Data::new(DataBuffer::Lob(lob.clone())), "set_from_lob")
    }

    fn set_from_object(&self, pos: u32, obj: &ObjectHandle) -> DriverResult<()> {
        self.store(pos, Data::new(DataBuffer::Object(obj.clone())), "set_from_object")
    }

    fn set_from_stmt(&self, pos: u32, stmt: &StmtHandle) -> DriverResult<()> {
        self.store(pos, Data::new(DataBuffer::Stmt(stmt.clone())), "set_from_stmt")
    }

    fn set_from_rowid(&self, pos: u32, rowid: &RowidHandle) -> DriverResult<()> {
        self.store(pos, Data::new(DataBuffer::Rowid(rowid.clone())), "set_from_rowid")
    }

    fn copy_data(&self, pos: u32, source: &VarHandle, source_pos: u32) -> DriverResult<()> {
        let source = source.as_any().downcast_ref::<MemoryVar>().ok_or_else(|| {
            driver_error(error_code::CLIENT, "DPI-1002: source is not a memory variable", "copy_data")
        })?;
        if source.native_type != self.native_type {
            return Err(driver_error(
                error_code::INCONSISTENT_DATATYPES,
                format!("cannot copy {} data into {} variable", source.native_type, self.native_type),
                "copy_data",
            ));
        }
        let data = source.read_slot(source_pos)?;
        self.store(pos, data, "copy_data")
    }

    fn num_elements_in_array(&self) -> DriverResult<u32> {
        self.called();
        Ok(self.state.lock().num_elements)
    }

    fn set_num_elements_in_array(&self, num_elements: u32) -> DriverResult<()> {
        self.called();
        if num_elements > self.array_size {
            return Err(driver_error(
                error_code::ARRAY_SIZE_EXCEEDED,
                format!("{} elements exceed array size {}", num_elements, self.array_size),
                "set_num_elements_in_array",
            ));
        }
        self.state.lock().num_elements = num_elements;
        Ok(())
    }

    fn size_in_bytes(&self) -> DriverResult<u32> {
        self.called();
        Ok(match self.native_type {
            NativeType::Bytes if self.size_is_bytes || !self.oracle_type.is_character() => self.size,
            NativeType::Bytes => self.size.saturating_mul(MAX_BYTES_PER_CHAR),
            NativeType::Int64 | NativeType::UInt64 | NativeType::Double => 8,
            NativeType::Float | NativeType::Boolean => 4,
            NativeType::Timestamp | NativeType::IntervalDs => 11,
            NativeType::IntervalYm => 5,
            _ => std::mem::size_of::<usize>() as u32,
        })
    }

    fn returned_data(&self, pos: u32) -> DriverResult<Vec<Data>> {
        self.called();
        self.check_pos(pos, "returned_data")?;
        Ok(self.state.lock().returned.get(&pos).cloned().unwrap_or_default())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn varchar(size: u32) -> MemoryVar {
        MemoryVar::new(&VarSpec::new(OracleType::Varchar, NativeType::Bytes).with_array_size(2).with_size(size))
            .unwrap()
    }

    #[test]
    fn test_bytes_are_copied() {
        let var = varchar(10);
        let mut buffer = b"abc".to_vec();
        var.set_from_bytes(0, &buffer).unwrap();
        buffer[0] = b'x';
        assert_eq!(var.read_slot(0).unwrap().as_bytes(), Some(&b"abc"[..]));
    }

    #[test]
    fn test_size_limit_counts_characters() {
        let var = varchar(2);
        assert!(var.set_from_bytes(0, "世界".as_bytes()).is_ok());
        assert_eq!(var.set_from_bytes(0, b"abc").unwrap_err().code, error_code::VALUE_TOO_LARGE);
    }

    #[test]
    fn test_kind_mismatch() {
        let var = varchar(0);
        let err = var.write_slot(0, Data::new(DataBuffer::Int64(1))).unwrap_err();
        assert_eq!(err.code, error_code::INCONSISTENT_DATATYPES);
    }

    #[test]
    fn test_zero_array_size() {
        assert!(MemoryVar::new(&VarSpec::new(OracleType::Number, NativeType::Int64).with_array_size(0)).is_err());
    }
}
