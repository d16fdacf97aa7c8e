//! Oracle NUMBER as decimal text
//!
//! The client library hands NUMBER values over as ASCII decimal text when the
//! `Bytes` native kind is requested, so no precision is lost. Whether the text
//! is an integer is decided lexically: no `.` means integer.

use std::fmt;

use crate::error::{Error, Result};

/// Oracle NUMBER held as its decimal text
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OracleNumber {
    /// String representation of the number
    pub value: String,
    /// Whether the number is an integer (no decimal point)
    pub is_integer: bool,
}

impl OracleNumber {
    /// Create a new Oracle number from string representation
    pub fn new(value: impl Into<String>) -> Self {
        let value = value.into();
        let is_integer = !value.contains('.');
        Self { value, is_integer }
    }

    /// Parse and validate decimal text: optional sign, digits, at most one `.`
    pub fn parse(text: &str) -> Result<Self> {
        if !is_decimal_text(text) {
            return Err(Error::conversion(format!("invalid number text: {:?}", text)));
        }
        Ok(Self::new(text))
    }

    /// Get the string value
    pub fn as_str(&self) -> &str {
        &self.value
    }

    /// Try to convert to i64
    pub fn to_i64(&self) -> Result<i64> {
        self.value
            .parse()
            .map_err(|e| Error::conversion(format!("cannot parse {:?} as i64: {}", self.value, e)))
    }

    /// Try to convert to f64
    pub fn to_f64(&self) -> Result<f64> {
        self.value
            .parse()
            .map_err(|e| Error::conversion(format!("cannot parse {:?} as f64: {}", self.value, e)))
    }
}

impl fmt::Display for OracleNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value)
    }
}

impl From<i64> for OracleNumber {
    fn from(v: i64) -> Self {
        Self::new(v.to_string())
    }
}

impl From<u64> for OracleNumber {
    fn from(v: u64) -> Self {
        Self::new(v.to_string())
    }
}

/// Check for an optionally signed run of digits
pub(crate) fn is_integer_text(text: &str) -> bool {
    let digits = text.strip_prefix(['-', '+']).unwrap_or(text);
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}

/// Check for an optionally signed decimal with at most one `.` and at least one digit
pub(crate) fn is_decimal_text(text: &str) -> bool {
    let body = text.strip_prefix(['-', '+']).unwrap_or(text);
    let mut parts = body.splitn(2, '.');
    let int_part = parts.next().unwrap_or("");
    let frac_part = parts.next().unwrap_or("");
    (!int_part.is_empty() || !frac_part.is_empty())
        && int_part.bytes().all(|b| b.is_ascii_digit())
        && frac_part.bytes().all(|b| b.is_ascii_digit())
}
