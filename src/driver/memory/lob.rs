//! Reference LOB.
//!
//! Character LOBs store UTF-16 code units so sizes and offsets count the way
//! the server counts them; BLOB contents are raw bytes. A BFILE holds only its
//! location and reads the registry file on each access.

use std::sync::Arc;

use parking_lot::Mutex;

use super::{driver_error, Registry};
use crate::constants::{error_code, OracleType};
use crate::driver::{DriverResult, LobBackend, LobHandle};

/// Chunk size reported for every LOB
const CHUNK_SIZE: u32 = 8132;

/// Worst-case UTF-8 bytes per UTF-16 code unit read
const MAX_BYTES_PER_UNIT: u64 = 4;

#[derive(Debug, Clone)]
enum Content {
    Binary(Vec<u8>),
    Text(Vec<u16>),
    File { directory: String, file_name: String },
}

#[derive(Debug, Clone)]
struct LobState {
    content: Content,
    is_open: bool,
    is_closed: bool,
}

/// Reference LOB
#[derive(Debug)]
pub struct MemoryLob {
    lob_type: OracleType,
    registry: Arc<Registry>,
    state: Mutex<LobState>,
}

impl MemoryLob {
    fn with_content(lob_type: OracleType, content: Content, registry: Arc<Registry>) -> Self {
        Self {
            lob_type,
            registry,
            state: Mutex::new(LobState {
                content,
                is_open: false,
                is_closed: false,
            }),
        }
    }

    /// Empty temporary CLOB, NCLOB or BLOB
    pub(crate) fn temporary(lob_type: OracleType, registry: Arc<Registry>) -> DriverResult<Self> {
        let content = match lob_type {
            OracleType::Clob | OracleType::NClob => Content::Text(Vec::new()),
            OracleType::Blob => Content::Binary(Vec::new()),
            other => {
                return Err(driver_error(
                    error_code::CLIENT,
                    format!("DPI-1021: cannot create a temporary LOB of type {}", other),
                    "new_temp_lob",
                ))
            }
        };
        Ok(Self::with_content(lob_type, content, registry))
    }

    /// BFILE locator for `directory`/`file_name`
    pub(crate) fn bfile(directory: &str, file_name: &str, registry: Arc<Registry>) -> Self {
        let content = Content::File {
            directory: directory.to_string(),
            file_name: file_name.to_string(),
        };
        Self::with_content(OracleType::Bfile, content, registry)
    }

    fn locked(&self, fn_name: &str) -> DriverResult<parking_lot::MutexGuard<'_, LobState>> {
        let state = self.state.lock();
        if state.is_closed {
            return Err(driver_error(
                error_code::INVALID_LOB_LOCATOR,
                "invalid LOB locator specified",
                fn_name,
            ));
        }
        Ok(state)
    }

    fn file_contents(&self, directory: &str, file_name: &str, fn_name: &str) -> DriverResult<Vec<u8>> {
        self.registry.file(directory, file_name).ok_or_else(|| {
            driver_error(
                error_code::FILE_NOT_FOUND,
                format!("file {} does not exist in directory {}", file_name, directory),
                fn_name,
            )
        })
    }

    fn start_index(offset: u64, fn_name: &str) -> DriverResult<usize> {
        offset
            .checked_sub(1)
            .map(|i| i as usize)
            .ok_or_else(|| driver_error(error_code::INVALID_LOB_OFFSET, "invalid offset: 0", fn_name))
    }
}

fn read_only(fn_name: &str) -> crate::error::ErrorInfo {
    driver_error(error_code::CLIENT, "DPI-1065: BFILE is read-only", fn_name)
}

fn overwrite<T: Copy>(target: &mut Vec<T>, start: usize, value: &[T], pad: T) {
    if target.len() < start {
        target.resize(start, pad);
    }
    let end = start + value.len();
    if target.len() < end {
        target.resize(end, pad);
    }
    target[start..end].copy_from_slice(value);
}

fn utf16_units(value: &[u8], fn_name: &str) -> DriverResult<Vec<u16>> {
    let text = std::str::from_utf8(value).map_err(|e| {
        driver_error(error_code::CLIENT, format!("DPI-1063: invalid UTF-8 data: {}", e), fn_name)
    })?;
    Ok(text.encode_utf16().collect())
}

impl LobBackend for MemoryLob {
    fn lob_type(&self) -> OracleType {
        self.lob_type
    }

    fn size(&self) -> DriverResult<u64> {
        let state = self.locked("size")?;
        Ok(match &state.content {
            Content::Binary(b) => b.len() as u64,
            Content::Text(t) => t.len() as u64,
            Content::File { directory, file_name } => {
                self.file_contents(directory, file_name, "size")?.len() as u64
            }
        })
    }

    fn chunk_size(&self) -> DriverResult<u32> {
        self.locked("chunk_size")?;
        Ok(CHUNK_SIZE)
    }

    fn buffer_size(&self, amount: u64) -> DriverResult<u64> {
        if self.lob_type.is_char_lob() {
            Ok(amount.saturating_mul(MAX_BYTES_PER_UNIT))
        } else {
            Ok(amount)
        }
    }

    fn read_bytes(&self, offset: u64, amount: u64, buffer: &mut [u8]) -> DriverResult<usize> {
        let start = Self::start_index(offset, "read_bytes")?;
        let state = self.locked("read_bytes")?;
        let bytes = match &state.content {
            Content::Binary(b) => slice_from(b, start, amount).to_vec(),
            Content::File { directory, file_name } => {
                let contents = self.file_contents(directory, file_name, "read_bytes")?;
                slice_from(&contents, start, amount).to_vec()
            }
            Content::Text(units) => {
                let mut units = slice_from(units, start, amount);
                // never split a surrogate pair
                if let Some(&last) = units.last() {
                    let end = start + units.len();
                    if (0xD800..0xDC00).contains(&last) && end < state_len(&state.content) {
                        units = slice_from(units_of(&state.content), start, units.len() as u64 + 1);
                    }
                }
                String::from_utf16_lossy(units).into_bytes()
            }
        };
        if bytes.len() > buffer.len() {
            return Err(driver_error(
                error_code::CLIENT,
                format!("DPI-1019: buffer of {} bytes too small for {} bytes", buffer.len(), bytes.len()),
                "read_bytes",
            ));
        }
        buffer[..bytes.len()].copy_from_slice(&bytes);
        Ok(bytes.len())
    }

    fn write_bytes(&self, offset: u64, value: &[u8]) -> DriverResult<()> {
        let start = Self::start_index(offset, "write_bytes")?;
        let mut state = self.locked("write_bytes")?;
        match &mut state.content {
            Content::Binary(b) => overwrite(b, start, value, 0),
            Content::Text(t) => overwrite(t, start, &utf16_units(value, "write_bytes")?, u16::from(b' ')),
            Content::File { .. } => return Err(read_only("write_bytes")),
        }
        Ok(())
    }

    fn set_from_bytes(&self, value: &[u8]) -> DriverResult<()> {
        let mut state = self.locked("set_from_bytes")?;
        state.content = match &state.content {
            Content::Binary(_) => Content::Binary(value.to_vec()),
            Content::Text(_) => Content::Text(utf16_units(value, "set_from_bytes")?),
            Content::File { .. } => return Err(read_only("set_from_bytes")),
        };
        Ok(())
    }

    fn trim(&self, new_size: u64) -> DriverResult<()> {
        let mut state = self.locked("trim")?;
        let len = state_len(&state.content) as u64;
        if new_size > len {
            return Err(driver_error(
                error_code::TRIM_LENGTH_EXCEEDED,
                format!("trim length {} is greater than current LOB size {}", new_size, len),
                "trim",
            ));
        }
        match &mut state.content {
            Content::Binary(b) => b.truncate(new_size as usize),
            Content::Text(t) => t.truncate(new_size as usize),
            Content::File { .. } => return Err(read_only("trim")),
        }
        Ok(())
    }

    fn open_resource(&self) -> DriverResult<()> {
        let mut state = self.locked("open_resource")?;
        if state.is_open {
            return Err(driver_error(
                error_code::LOB_ALREADY_OPEN,
                "cannot perform operation on an open LOB",
                "open_resource",
            ));
        }
        state.is_open = true;
        Ok(())
    }

    fn close_resource(&self) -> DriverResult<()> {
        let mut state = self.locked("close_resource")?;
        if !state.is_open {
            return Err(driver_error(
                error_code::LOB_NOT_OPEN,
                "cannot perform operation on an unopened LOB",
                "close_resource",
            ));
        }
        state.is_open = false;
        Ok(())
    }

    fn is_resource_open(&self) -> DriverResult<bool> {
        Ok(self.locked("is_resource_open")?.is_open)
    }

    fn close(&self) -> DriverResult<()> {
        let mut state = self.state.lock();
        state.is_open = false;
        state.is_closed = true;
        Ok(())
    }

    fn directory_and_file_name(&self) -> DriverResult<(String, String)> {
        let state = self.locked("directory_and_file_name")?;
        match &state.content {
            Content::File { directory, file_name } => Ok((directory.clone(), file_name.clone())),
            _ => Err(not_a_bfile(self.lob_type, "directory_and_file_name")),
        }
    }

    fn set_directory_and_file_name(&self, directory: &str, file_name: &str) -> DriverResult<()> {
        let mut state = self.locked("set_directory_and_file_name")?;
        match &mut state.content {
            Content::File {
                directory: d,
                file_name: f,
            } => {
                *d = directory.to_string();
                *f = file_name.to_string();
                Ok(())
            }
            _ => Err(not_a_bfile(self.lob_type, "set_directory_and_file_name")),
        }
    }

    fn file_exists(&self) -> DriverResult<bool> {
        let state = self.locked("file_exists")?;
        match &state.content {
            Content::File { directory, file_name } => Ok(self.registry.file(directory, file_name).is_some()),
            _ => Err(not_a_bfile(self.lob_type, "file_exists")),
        }
    }

    fn copy(&self) -> DriverResult<LobHandle> {
        let state = self.locked("copy")?;
        Ok(Arc::new(Self::with_content(
            self.lob_type,
            state.content.clone(),
            self.registry.clone(),
        )))
    }
}

fn not_a_bfile(lob_type: OracleType, fn_name: &str) -> crate::error::ErrorInfo {
    driver_error(
        error_code::CLIENT,
        format!("DPI-1068: {} is not a BFILE", lob_type),
        fn_name,
    )
}

fn slice_from<T>(items: &[T], start: usize, amount: u64) -> &[T] {
    if start >= items.len() {
        return &[];
    }
    let end = start.saturating_add(usize::try_from(amount).unwrap_or(usize::MAX)).min(items.len());
    &items[start..end]
}

fn units_of(content: &Content) -> &[u16] {
    match content {
        Content::Text(t) => t,
        _ => &[],
    }
}

fn state_len(content: &Content) -> usize {
    match content {
        Content::Binary(b) => b.len(),
        Content::Text(t) => t.len(),
        Content::File { .. } => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clob() -> MemoryLob {
        MemoryLob::temporary(OracleType::Clob, Arc::new(Registry::default())).unwrap()
    }

    fn read_all(lob: &MemoryLob, offset: u64, amount: u64) -> Vec<u8> {
        let mut buffer = vec![0u8; lob.buffer_size(amount).unwrap() as usize];
        let n = lob.read_bytes(offset, amount, &mut buffer).unwrap();
        buffer.truncate(n);
        buffer
    }

    #[test]
    fn test_clob_counts_utf16_units() {
        let lob = clob();
        lob.set_from_bytes("a😀b".as_bytes()).unwrap();
        assert_eq!(lob.size().unwrap(), 4);
        assert_eq!(read_all(&lob, 2, 2), "😀".as_bytes());
        // a read ending inside the pair still returns the whole character
        assert_eq!(read_all(&lob, 1, 2), "a😀".as_bytes());
    }

    #[test]
    fn test_write_past_end_pads() {
        let lob = MemoryLob::temporary(OracleType::Blob, Arc::new(Registry::default())).unwrap();
        lob.write_bytes(3, b"xy").unwrap();
        assert_eq!(read_all(&lob, 1, 10), vec![0, 0, b'x', b'y']);
    }

    #[test]
    fn test_offset_zero() {
        let lob = clob();
        let err = lob.write_bytes(0, b"a").unwrap_err();
        assert_eq!(err.code, error_code::INVALID_LOB_OFFSET);
    }

    #[test]
    fn test_resource_state() {
        let lob = clob();
        assert_eq!(lob.close_resource().unwrap_err().code, error_code::LOB_NOT_OPEN);
        lob.open_resource().unwrap();
        assert_eq!(lob.open_resource().unwrap_err().code, error_code::LOB_ALREADY_OPEN);
        assert!(lob.is_resource_open().unwrap());
        lob.close().unwrap();
        assert_eq!(lob.size().unwrap_err().code, error_code::INVALID_LOB_LOCATOR);
    }

    #[test]
    fn test_trim_beyond_size() {
        let lob = clob();
        lob.set_from_bytes(b"abc").unwrap();
        assert_eq!(lob.trim(5).unwrap_err().code, error_code::TRIM_LENGTH_EXCEEDED);
        lob.trim(1).unwrap();
        assert_eq!(lob.size().unwrap(), 1);
    }

    #[test]
    fn test_bfile_reads_registry() {
        let registry = Arc::new(Registry::default());
        registry
            .files
            .lock()
            .insert(("DATA_DIR".to_string(), "a.bin".to_string()), vec![1, 2, 3]);
        let lob = MemoryLob::bfile("DATA_DIR", "a.bin", registry);
        assert!(lob.file_exists().unwrap());
        assert_eq!(read_all(&lob, 2, 5), vec![2, 3]);
        lob.set_directory_and_file_name("DATA_DIR", "missing.bin").unwrap();
        assert!(!lob.file_exists().unwrap());
        assert_eq!(lob.size().unwrap_err().code, error_code::FILE_NOT_FOUND);
    }
}
