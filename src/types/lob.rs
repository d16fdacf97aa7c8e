//! LOB (Large Object) streaming
//!
//! CLOB and NCLOB sizes and offsets are counted in UTF-16 code units while
//! the data crosses the seam as UTF-8. Every character LOB read and write
//! therefore reports a character count computed by [`size_in_chars`]. BLOB
//! and BFILE report raw byte lengths.

use std::io::SeekFrom;

use bytes::Bytes;

use crate::constants::OracleType;
use crate::driver::LobHandle;
use crate::error::{Error, Result};
use crate::session::Session;

/// Count UTF-16 code units in a UTF-8 byte span.
///
/// One unit per code point, except four-byte sequences which count as two.
/// Lead bytes outside `00-7F`, `C2-DF`, `E0-EF`, `F0-F4` are an encoding error,
/// as is a sequence cut short by the end of the span.
pub fn size_in_chars(bytes: &[u8]) -> Result<u64> {
    let mut size = 0u64;
    let mut pos = 0usize;
    while pos < bytes.len() {
        let lead = bytes[pos];
        let (units, width) = match lead {
            0x00..=0x7F => (1, 1),
            0xC2..=0xDF => (1, 2),
            0xE0..=0xEF => (1, 3),
            0xF0..=0xF4 => (2, 4),
            _ => {
                return Err(Error::Encoding(format!(
                    "invalid UTF-8 lead byte 0x{:02X} at offset {}",
                    lead, pos
                )))
            }
        };
        if pos + width > bytes.len() {
            return Err(Error::Encoding(format!(
                "truncated UTF-8 sequence at offset {}",
                pos
            )));
        }
        size += units;
        pos += width;
    }
    Ok(size)
}

/// Large object bound to a session, with a stream position.
///
/// The position counts characters for CLOB/NCLOB and bytes otherwise, starting
/// at zero; the driver's offsets start at one.
#[derive(Debug, Clone)]
pub struct Lob {
    handle: LobHandle,
    session: Session,
    pos: u64,
}

impl Lob {
    /// Wrap a driver LOB handle, positioned at the start
    pub fn new(handle: LobHandle, session: Session) -> Self {
        Self {
            handle,
            session,
            pos: 0,
        }
    }

    /// Driver handle
    pub fn handle(&self) -> &LobHandle {
        &self.handle
    }

    /// Owning session
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// LOB type (CLOB, NCLOB, BLOB or BFILE)
    pub fn lob_type(&self) -> OracleType {
        self.handle.lob_type()
    }

    /// Whether sizes are counted in characters
    pub fn is_char(&self) -> bool {
        self.lob_type().is_char_lob()
    }

    /// Current stream position
    pub fn position(&self) -> u64 {
        self.pos
    }

    fn reported_size(&self, bytes: &[u8]) -> Result<u64> {
        if self.is_char() {
            size_in_chars(bytes)
        } else {
            Ok(bytes.len() as u64)
        }
    }

    /// Read `amount` units starting at 1-based `offset`.
    ///
    /// Returns the bytes read and their size in the LOB's own units.
    pub fn read_bytes(&self, offset: u64, amount: u64) -> Result<(Bytes, u64)> {
        let capacity = self.handle.buffer_size(amount)?;
        let capacity = usize::try_from(capacity)
            .map_err(|_| Error::invalid_argument(format!("read of {} units is too large", amount)))?;
        let mut buffer = vec![0u8; capacity];
        let read = self.handle.read_bytes(offset, amount, &mut buffer)?;
        buffer.truncate(read);
        let size = self.reported_size(&buffer)?;
        tracing::trace!(offset, amount, bytes = read, size, "LOB read");
        Ok((Bytes::from(buffer), size))
    }

    /// Write at 1-based `offset`, returning the size written in the LOB's units
    pub fn write_bytes(&self, offset: u64, value: &[u8]) -> Result<u64> {
        let size = self.reported_size(value)?;
        self.handle.write_bytes(offset, value)?;
        Ok(size)
    }

    /// Replace the contents, returning the new size in the LOB's units
    pub fn set_from_bytes(&self, value: &[u8]) -> Result<u64> {
        let size = self.reported_size(value)?;
        self.handle.set_from_bytes(value)?;
        Ok(size)
    }

    /// Replace the contents and move the position to the end
    pub fn set(&mut self, value: &[u8]) -> Result<()> {
        self.pos = self.set_from_bytes(value)?;
        Ok(())
    }

    /// Read from the current position and advance.
    ///
    /// `None` reads to the end and yields empty bytes when nothing is left.
    /// `Some(n)` yields `None` once the end has been passed.
    pub fn read(&mut self, length: Option<u64>) -> Result<Option<Bytes>> {
        let amount = match length {
            Some(0) => return Ok(Some(Bytes::new())),
            Some(n) => n,
            None => {
                let remaining = self.size()?.saturating_sub(self.pos);
                if remaining == 0 {
                    return Ok(Some(Bytes::new()));
                }
                remaining
            }
        };
        let (value, size) = self.read_bytes(self.pos + 1, amount)?;
        if size > 0 {
            self.pos += size;
            Ok(Some(value))
        } else if length.is_none() {
            Ok(Some(Bytes::new()))
        } else {
            Ok(None)
        }
    }

    /// Write at the current position and advance
    pub fn write(&mut self, value: &[u8]) -> Result<u64> {
        let size = self.write_bytes(self.pos + 1, value)?;
        self.pos += size;
        Ok(size)
    }

    /// Move the stream position, returning the new position
    pub fn seek(&mut self, whence: SeekFrom) -> Result<u64> {
        let (base, delta) = match whence {
            SeekFrom::Start(offset) => {
                self.pos = offset;
                return Ok(self.pos);
            }
            SeekFrom::Current(delta) => (self.pos, delta),
            SeekFrom::End(delta) => (self.size()?, delta),
        };
        self.pos = base
            .checked_add_signed(delta)
            .ok_or_else(|| Error::invalid_argument(format!("seek to {} + {} is out of range", base, delta)))?;
        Ok(self.pos)
    }

    /// Size in characters (CLOB/NCLOB) or bytes
    pub fn size(&self) -> Result<u64> {
        Ok(self.handle.size()?)
    }

    /// Chunk size for efficient I/O
    pub fn chunk_size(&self) -> Result<u32> {
        Ok(self.handle.chunk_size()?)
    }

    /// Truncate to `new_size`
    pub fn trim(&self, new_size: u64) -> Result<()> {
        Ok(self.handle.trim(new_size)?)
    }

    /// Open for a series of writes
    pub fn open_resource(&self) -> Result<()> {
        Ok(self.handle.open_resource()?)
    }

    /// Close after a series of writes
    pub fn close_resource(&self) -> Result<()> {
        Ok(self.handle.close_resource()?)
    }

    /// Whether the resource is open
    pub fn is_resource_open(&self) -> Result<bool> {
        Ok(self.handle.is_resource_open()?)
    }

    /// Release the locator; later operations fail
    pub fn close(&self) -> Result<()> {
        Ok(self.handle.close()?)
    }

    /// Directory alias and file name of a BFILE
    pub fn directory_and_file_name(&self) -> Result<(String, String)> {
        Ok(self.handle.directory_and_file_name()?)
    }

    /// Point a BFILE at another file
    pub fn set_directory_and_file_name(&self, directory: &str, file_name: &str) -> Result<()> {
        Ok(self.handle.set_directory_and_file_name(directory, file_name)?)
    }

    /// Whether the BFILE's file exists
    pub fn file_exists(&self) -> Result<bool> {
        Ok(self.handle.file_exists()?)
    }

    /// Independent copy with the same stream position
    pub fn copy(&self) -> Result<Lob> {
        Ok(Lob {
            handle: self.handle.copy()?,
            session: self.session.clone(),
            pos: self.pos,
        })
    }
}
