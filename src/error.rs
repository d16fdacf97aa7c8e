//! Error types for the Oracle driver
//!
//! This module defines every error the marshalling core can raise: conversion
//! and encoding failures detected while translating values, local bounds
//! violations, and driver errors reported by the underlying client library.

use std::fmt;
use std::io;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the Oracle driver
#[derive(Error, Debug)]
#[allow(missing_docs)]
pub enum Error {
    // =========================================================================
    // Conversion Errors
    // =========================================================================
    /// A value could not be converted to or from its wire representation
    #[error("conversion error: {0}")]
    Conversion(String),

    /// Malformed UTF-8 handed to the character LOB length calculator
    #[error("encoding error: {0}")]
    Encoding(String),

    /// NULL value encountered where not expected
    #[error("unexpected NULL value")]
    UnexpectedNull,

    // =========================================================================
    // Range Errors
    // =========================================================================
    /// Slot index outside `[0, size)`, raised before any driver call
    #[error("wrong row index (given {index}, expected between 0 and {})", .size.saturating_sub(1))]
    Range { index: u64, size: u32 },

    // =========================================================================
    // Driver Errors
    // =========================================================================
    /// Failure reported by the underlying client library
    #[error("{0}")]
    Driver(ErrorInfo),

    // =========================================================================
    // Option Errors
    // =========================================================================
    /// Option keys that no parameter table recognises
    #[error("unknown keyword{}: {}", if .0.len() == 1 { "" } else { "s" }, .0.join(", "))]
    UnknownOptions(Vec<String>),

    /// A recognised option carried a value of the wrong shape
    #[error("invalid value for option {name}: {reason}")]
    InvalidOption { name: String, reason: String },

    /// Caller misuse, e.g. a collection operation against a plain object
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    // =========================================================================
    // I/O Errors
    // =========================================================================
    /// Underlying I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    // =========================================================================
    // Internal Errors
    // =========================================================================
    /// Internal error: unrecognised native kind or node kind (version mismatch)
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a conversion error
    pub fn conversion(message: impl Into<String>) -> Self {
        Error::Conversion(message.into())
    }

    /// Create an invalid argument error
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Error::InvalidArgument(message.into())
    }

    /// Create an invalid option error
    pub fn invalid_option(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::InvalidOption {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Get the driver diagnostic bundle if this is a driver error
    pub fn driver_info(&self) -> Option<&ErrorInfo> {
        match self {
            Error::Driver(info) => Some(info),
            _ => None,
        }
    }

    /// Check if this is a local bounds violation
    pub fn is_range_error(&self) -> bool {
        matches!(self, Error::Range { .. })
    }

    /// Check if this error is recoverable (can retry)
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Error::Driver(info) if info.is_recoverable)
    }

    /// Check if the driver flagged this error as a warning
    pub fn is_warning(&self) -> bool {
        matches!(self, Error::Driver(info) if info.is_warning)
    }
}

impl From<ErrorInfo> for Error {
    fn from(info: ErrorInfo) -> Self {
        Error::Driver(info)
    }
}

/// Diagnostic bundle captured from the client library when a call fails.
///
/// The driver layer returns this by value from the failing call itself, so the
/// bundle never depends on last-error state that a later call could overwrite.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ErrorInfo {
    /// Oracle error number (e.g. 942 for ORA-00942)
    pub code: i32,
    /// Parse error offset into the SQL text
    pub offset: u32,
    /// Error message text
    pub message: String,
    /// Name of the client library function that failed
    pub fn_name: String,
    /// Action being performed when the error occurred
    pub action: String,
    /// Five-character SQLSTATE
    pub sql_state: String,
    /// Whether the call may succeed if retried
    pub is_recoverable: bool,
    /// Whether this is a warning rather than a hard failure
    pub is_warning: bool,
}

impl ErrorInfo {
    /// Create an error bundle with a code and message
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            sql_state: "HY000".to_string(),
            ..Default::default()
        }
    }

    /// Set the failing function and action names
    pub fn with_origin(mut self, fn_name: impl Into<String>, action: impl Into<String>) -> Self {
        self.fn_name = fn_name.into();
        self.action = action.into();
        self
    }

    /// Set the parse offset
    pub fn with_offset(mut self, offset: u32) -> Self {
        self.offset = offset;
        self
    }

    /// Set the SQLSTATE
    pub fn with_sql_state(mut self, sql_state: impl Into<String>) -> Self {
        self.sql_state = sql_state.into();
        self
    }

    /// Mark as recoverable
    pub fn recoverable(mut self) -> Self {
        self.is_recoverable = true;
        self
    }

    /// Mark as a warning
    pub fn warning(mut self) -> Self {
        self.is_warning = true;
        self
    }
}

impl fmt::Display for ErrorInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.code == 0 {
            f.write_str(&self.message)
        } else {
            write!(f, "ORA-{:05}: {}", self.code, self.message)
        }
    }
}
