//! Oracle ROWID values
//!
//! A physical ROWID renders as 18 characters in Oracle's base64 alphabet:
//! - 6 characters for the data object number
//! - 3 characters for the relative file number
//! - 6 characters for the block number
//! - 3 characters for the row slot

use std::fmt;
use std::str::FromStr;

use crate::driver::RowidHandle;
use crate::error::{Error, Result};
use crate::session::Session;

/// Base64 alphabet used for ROWID encoding
const BASE64_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";

/// Length of an encoded physical ROWID
pub const ROWID_LENGTH: usize = 18;

/// Components of a physical ROWID
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct RowidParts {
    /// Data object number
    pub object_num: u32,
    /// Relative file number
    pub file_num: u16,
    /// Block number within the file
    pub block_num: u32,
    /// Row slot within the block
    pub slot_num: u16,
}

impl RowidParts {
    /// Create ROWID components
    pub fn new(object_num: u32, file_num: u16, block_num: u32, slot_num: u16) -> Self {
        Self {
            object_num,
            file_num,
            block_num,
            slot_num,
        }
    }
}

impl fmt::Display for RowidParts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut buf = [0u8; ROWID_LENGTH];
        let mut offset = 0;
        offset = encode_base64(&mut buf, self.object_num as u64, 6, offset);
        offset = encode_base64(&mut buf, self.file_num as u64, 3, offset);
        offset = encode_base64(&mut buf, self.block_num as u64, 6, offset);
        encode_base64(&mut buf, self.slot_num as u64, 3, offset);
        // every byte comes from BASE64_ALPHABET
        f.write_str(std::str::from_utf8(&buf).map_err(|_| fmt::Error)?)
    }
}

impl FromStr for RowidParts {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        if s.len() != ROWID_LENGTH {
            return Err(Error::conversion(format!(
                "invalid ROWID length: {}, expected {}",
                s.len(),
                ROWID_LENGTH
            )));
        }
        let bytes = s.as_bytes();
        Ok(Self {
            object_num: decode_base64(&bytes[0..6])? as u32,
            file_num: decode_base64(&bytes[6..9])? as u16,
            block_num: decode_base64(&bytes[9..15])? as u32,
            slot_num: decode_base64(&bytes[15..18])? as u16,
        })
    }
}

fn encode_base64(buf: &mut [u8], value: u64, num_chars: usize, offset: usize) -> usize {
    let mut val = value;
    for i in (0..num_chars).rev() {
        buf[offset + i] = BASE64_ALPHABET[(val & 0x3f) as usize];
        val >>= 6;
    }
    offset + num_chars
}

fn decode_base64(chars: &[u8]) -> Result<u64> {
    chars.iter().try_fold(0u64, |acc, &c| {
        let idx = match c {
            b'A'..=b'Z' => c - b'A',
            b'a'..=b'z' => c - b'a' + 26,
            b'0'..=b'9' => c - b'0' + 52,
            b'+' => 62,
            b'/' => 63,
            _ => {
                return Err(Error::conversion(format!(
                    "invalid base64 character in ROWID: {}",
                    char::from(c)
                )))
            }
        };
        Ok((acc << 6) | idx as u64)
    })
}

/// Rowid bound to a session
#[derive(Debug, Clone)]
pub struct Rowid {
    handle: RowidHandle,
    session: Session,
}

impl Rowid {
    /// Wrap a driver rowid handle
    pub fn new(handle: RowidHandle, session: Session) -> Self {
        Self { handle, session }
    }

    /// Driver handle
    pub fn handle(&self) -> &RowidHandle {
        &self.handle
    }

    /// Owning session
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Text form of the rowid
    pub fn string_value(&self) -> Result<String> {
        Ok(self.handle.string_value()?)
    }
}
