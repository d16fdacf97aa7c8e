//! Type tags and enumerations shared with the client library
//!
//! The numeric values follow the client library's public enumerations so
//! that they can be passed through the driver seam unchanged. Every enum also
//! has a lowercase name, which is how option maps spell them.

use std::fmt;
use std::ops::BitOr;
use std::str::FromStr;

use crate::error::{Error, Result};

macro_rules! named_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident : $what:literal {
            $( $(#[$vmeta:meta])* $variant:ident = $value:literal => $text:literal, )+
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        #[repr(u32)]
        pub enum $name {
            $( $(#[$vmeta])* $variant = $value, )+
        }

        impl $name {
            /// Lowercase name used in option maps
            pub fn name(self) -> &'static str {
                match self {
                    $( $name::$variant => $text, )+
                }
            }
        }

        impl TryFrom<u32> for $name {
            type Error = Error;

            fn try_from(value: u32) -> Result<Self> {
                match value {
                    $( $value => Ok($name::$variant), )+
                    _ => Err(Error::conversion(format!("invalid {} value: {}", $what, value))),
                }
            }
        }

        impl FromStr for $name {
            type Err = Error;

            fn from_str(s: &str) -> Result<Self> {
                match s {
                    $( $text => Ok($name::$variant), )+
                    _ => Err(Error::conversion(format!("unknown {}: {}", $what, s))),
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.name())
            }
        }
    };
}

macro_rules! flag_set {
    (
        $(#[$meta:meta])*
        pub struct $name:ident : $what:literal {
            $( $(#[$cmeta:meta])* const $flag:ident = $value:literal => $text:literal; )+
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
        pub struct $name(pub u32);

        impl $name {
            $( $(#[$cmeta])* pub const $flag: $name = $name($value); )+

            /// Raw bit pattern
            pub fn bits(self) -> u32 {
                self.0
            }

            /// Check whether every bit of `other` is set
            pub fn contains(self, other: Self) -> bool {
                self.0 & other.0 == other.0
            }
        }

        impl BitOr for $name {
            type Output = Self;

            fn bitor(self, rhs: Self) -> Self {
                $name(self.0 | rhs.0)
            }
        }

        impl From<u32> for $name {
            fn from(bits: u32) -> Self {
                $name(bits)
            }
        }

        impl FromStr for $name {
            type Err = Error;

            fn from_str(s: &str) -> Result<Self> {
                match s {
                    $( $text => Ok($name::$flag), )+
                    _ => Err(Error::conversion(format!("unknown {}: {}", $what, s))),
                }
            }
        }
    };
}

// =============================================================================
// Data Types
// =============================================================================

named_enum! {
    /// Oracle logical type of a column, attribute or bind position.
    ///
    /// Refines how a [`NativeType`] payload is interpreted: `Bytes` tagged
    /// `Varchar` is character data, while `Bytes` tagged `Number` is decimal text.
    pub enum OracleType: "oracle type" {
        /// Type not yet known
        Unspecified = 2000 => "none",
        /// VARCHAR2 string type
        Varchar = 2001 => "varchar",
        /// NVARCHAR2 national character string
        NVarchar = 2002 => "nvarchar",
        /// CHAR fixed-length string
        Char = 2003 => "char",
        /// NCHAR fixed-length national character string
        NChar = 2004 => "nchar",
        /// ROWID
        Rowid = 2005 => "rowid",
        /// RAW binary type
        Raw = 2006 => "raw",
        /// BINARY_FLOAT
        BinaryFloat = 2007 => "native_float",
        /// BINARY_DOUBLE
        BinaryDouble = 2008 => "native_double",
        /// BINARY_INTEGER (PL/SQL)
        BinaryInteger = 2009 => "native_int",
        /// NUMBER type
        Number = 2010 => "number",
        /// DATE type
        Date = 2011 => "date",
        /// TIMESTAMP
        Timestamp = 2012 => "timestamp",
        /// TIMESTAMP WITH TIME ZONE
        TimestampTz = 2013 => "timestamp_tz",
        /// TIMESTAMP WITH LOCAL TIME ZONE
        TimestampLtz = 2014 => "timestamp_ltz",
        /// INTERVAL DAY TO SECOND
        IntervalDs = 2015 => "interval_ds",
        /// INTERVAL YEAR TO MONTH
        IntervalYm = 2016 => "interval_ym",
        /// CLOB
        Clob = 2017 => "clob",
        /// NCLOB
        NClob = 2018 => "nclob",
        /// BLOB
        Blob = 2019 => "blob",
        /// BFILE
        Bfile = 2020 => "bfile",
        /// REF CURSOR
        Cursor = 2021 => "stmt",
        /// BOOLEAN
        Boolean = 2022 => "boolean",
        /// User-defined object type
        Object = 2023 => "object",
        /// LONG string type
        Long = 2024 => "long_varchar",
        /// LONG RAW binary type
        LongRaw = 2025 => "long_raw",
        /// Unsigned native integer
        NativeUint = 2026 => "native_uint",
        /// JSON (21c+)
        Json = 2027 => "json",
        /// JSON object node
        JsonObject = 2028 => "json_object",
        /// JSON array node
        JsonArray = 2029 => "json_array",
        /// UROWID
        Urowid = 2030 => "urowid",
        /// LONG NVARCHAR
        LongNVarchar = 2031 => "long_nvarchar",
    }
}

impl OracleType {
    /// Check if `Bytes` payloads of this type hold character data
    pub fn is_character(&self) -> bool {
        matches!(
            self,
            OracleType::Varchar | OracleType::NVarchar | OracleType::Char | OracleType::NChar
        )
    }

    /// Check if this is a LOB type
    pub fn is_lob(&self) -> bool {
        matches!(
            self,
            OracleType::Clob | OracleType::NClob | OracleType::Blob | OracleType::Bfile
        )
    }

    /// Check if this is a character LOB, whose sizes are counted in UTF-16 code units
    pub fn is_char_lob(&self) -> bool {
        matches!(self, OracleType::Clob | OracleType::NClob)
    }

    /// Native kind the client library uses for this type when none is requested
    pub fn default_native_type(&self) -> NativeType {
        match self {
            OracleType::BinaryFloat => NativeType::Float,
            OracleType::BinaryDouble | OracleType::Number => NativeType::Double,
            OracleType::BinaryInteger => NativeType::Int64,
            OracleType::NativeUint => NativeType::UInt64,
            OracleType::Date
            | OracleType::Timestamp
            | OracleType::TimestampTz
            | OracleType::TimestampLtz => NativeType::Timestamp,
            OracleType::IntervalDs => NativeType::IntervalDs,
            OracleType::IntervalYm => NativeType::IntervalYm,
            OracleType::Clob | OracleType::NClob | OracleType::Blob | OracleType::Bfile => {
                NativeType::Lob
            }
            OracleType::Cursor => NativeType::Stmt,
            OracleType::Boolean => NativeType::Boolean,
            OracleType::Object => NativeType::Object,
            OracleType::Json => NativeType::Json,
            OracleType::JsonObject => NativeType::JsonObject,
            OracleType::JsonArray => NativeType::JsonArray,
            OracleType::Rowid | OracleType::Urowid => NativeType::Rowid,
            OracleType::Unspecified => NativeType::Null,
            OracleType::Varchar
            | OracleType::NVarchar
            | OracleType::Char
            | OracleType::NChar
            | OracleType::Raw
            | OracleType::Long
            | OracleType::LongRaw
            | OracleType::LongNVarchar => NativeType::Bytes,
        }
    }
}

named_enum! {
    /// Storage kind of a wire value (the tag of the tagged union).
    pub enum NativeType: "native type" {
        /// 64-bit signed integer
        Int64 = 3000 => "int64",
        /// 64-bit unsigned integer
        UInt64 = 3001 => "uint64",
        /// 32-bit float
        Float = 3002 => "float",
        /// 64-bit float
        Double = 3003 => "double",
        /// Byte span
        Bytes = 3004 => "bytes",
        /// Timestamp struct
        Timestamp = 3005 => "timestamp",
        /// Day-second interval struct
        IntervalDs = 3006 => "interval_ds",
        /// Year-month interval struct
        IntervalYm = 3007 => "interval_ym",
        /// LOB handle
        Lob = 3008 => "lob",
        /// Object handle
        Object = 3009 => "object",
        /// Statement handle
        Stmt = 3010 => "stmt",
        /// Boolean
        Boolean = 3011 => "boolean",
        /// Rowid handle
        Rowid = 3012 => "rowid",
        /// JSON document handle
        Json = 3013 => "json",
        /// JSON object node
        JsonObject = 3014 => "json_object",
        /// JSON array node
        JsonArray = 3015 => "json_array",
        /// JSON null node
        Null = 3016 => "null",
    }
}

// =============================================================================
// Subscription Enumerations
// =============================================================================

named_enum! {
    /// Kind of event carried by a notification
    #[derive(Default)]
    pub enum EventType: "event type" {
        /// No event
        #[default]
        None = 0 => "none",
        /// Database startup
        Startup = 1 => "startup",
        /// Database shutdown
        Shutdown = 2 => "shutdown",
        /// Any instance shutdown
        ShutdownAny = 3 => "shutdown_any",
        /// Registration removed
        Deregister = 5 => "dereg",
        /// Object change
        ObjectChange = 6 => "objchange",
        /// Query change
        QueryChange = 7 => "querychange",
        /// Advanced queuing message
        Aq = 100 => "aq",
    }
}

flag_set! {
    /// Operation codes on tables, rows and queries in a notification
    pub struct OpCode: "operation code" {
        /// All operations
        const ALL_OPS = 0 => "all_ops";
        /// All rows changed
        const ALL_ROWS = 0x01 => "all_rows";
        /// Insert
        const INSERT = 0x02 => "insert";
        /// Update
        const UPDATE = 0x04 => "update";
        /// Delete
        const DELETE = 0x08 => "delete";
        /// Alter
        const ALTER = 0x10 => "alter";
        /// Drop
        const DROP = 0x20 => "drop";
        /// Unknown operation
        const UNKNOWN = 0x40 => "unknown";
    }
}

named_enum! {
    /// Subscription namespace
    #[derive(Default)]
    pub enum SubscrNamespace: "subscription namespace" {
        /// Advanced queuing
        Aq = 1 => "aq",
        /// Database change notification
        #[default]
        DbChange = 2 => "dbchange",
    }
}

named_enum! {
    /// Notification delivery protocol
    #[derive(Default)]
    pub enum SubscrProtocol: "subscription protocol" {
        /// Client callback
        #[default]
        Callback = 0 => "callback",
        /// E-mail
        Mail = 1 => "mail",
        /// PL/SQL procedure
        Plsql = 2 => "plsql",
        /// HTTP post
        Http = 3 => "http",
    }
}

flag_set! {
    /// Subscription quality-of-service flags
    pub struct SubscrQos: "subscription qos" {
        /// Persist notifications
        const RELIABLE = 0x01 => "reliable";
        /// Deregister after the first notification
        const DEREG_NFY = 0x02 => "dereg_nfy";
        /// Include rowids
        const ROWIDS = 0x04 => "rowids";
        /// Query change notification
        const QUERY = 0x08 => "query";
        /// Best-effort query filtering
        const BEST_EFFORT = 0x10 => "best_effort";
    }
}

named_enum! {
    /// Notification grouping class
    #[derive(Default)]
    pub enum GroupingClass: "grouping class" {
        /// No grouping
        #[default]
        None = 0 => "none",
        /// Group by time
        Time = 2 => "time",
    }
}

named_enum! {
    /// Notification grouping type
    #[derive(Default)]
    pub enum GroupingType: "grouping type" {
        /// Summary of grouped notifications
        #[default]
        Summary = 1 => "summary",
        /// Last notification only
        Last = 2 => "last",
    }
}

// =============================================================================
// Connection Enumerations
// =============================================================================

flag_set! {
    /// Context/connection creation mode
    pub struct CreateMode: "create mode" {
        /// Default mode
        const DEFAULT = 0 => "default";
        /// Threaded mode
        const THREADED = 0x01 => "threaded";
        /// Events mode (required for subscriptions)
        const EVENTS = 0x04 => "events";
    }
}

flag_set! {
    /// Authorization mode
    pub struct AuthMode: "auth mode" {
        /// Default privileges
        const DEFAULT = 0 => "default";
        /// SYSDBA
        const SYSDBA = 0x0002 => "sysdba";
        /// SYSOPER
        const SYSOPER = 0x0004 => "sysoper";
        /// Preliminary authentication
        const PRELIM = 0x0008 => "prelim";
        /// SYSASM
        const SYSASM = 0x8000 => "sysasm";
        /// SYSBACKUP
        const SYSBKP = 0x20000 => "sysbkp";
        /// SYSDG
        const SYSDGD = 0x40000 => "sysdgd";
        /// SYSKM
        const SYSKMT = 0x80000 => "syskmt";
        /// SYSRAC
        const SYSRAC = 0x100000 => "sysrac";
    }
}

named_enum! {
    /// Session purity
    #[derive(Default)]
    pub enum Purity: "purity" {
        /// Default purity
        #[default]
        Default = 0 => "default",
        /// Always a new session
        New = 1 => "new",
        /// Reuse a pooled session
        SelfPurity = 2 => "self",
    }
}

named_enum! {
    /// Pool acquire behaviour when no session is free
    #[derive(Default)]
    pub enum PoolGetMode: "pool get mode" {
        /// Block until a session is free
        #[default]
        Wait = 0 => "wait",
        /// Fail immediately
        NoWait = 1 => "nowait",
        /// Create a session beyond the maximum
        ForceGet = 2 => "forceget",
        /// Block up to the wait timeout
        TimedWait = 3 => "timedwait",
    }
}

flag_set! {
    /// Statement execution mode
    pub struct ExecMode: "exec mode" {
        /// Default
        const DEFAULT = 0 => "default";
        /// Describe only
        const DESCRIBE_ONLY = 0x10 => "describe_only";
        /// Commit on success
        const COMMIT_ON_SUCCESS = 0x20 => "commit_on_success";
        /// Collect batch errors
        const BATCH_ERRORS = 0x80 => "batch_errors";
        /// Parse only
        const PARSE_ONLY = 0x100 => "parse_only";
        /// Array DML row counts
        const ARRAY_DML_ROWCOUNTS = 0x100000 => "array_dml_rowcounts";
    }
}

// =============================================================================
// Error Codes
// =============================================================================

/// Oracle error codes raised by the reference driver
pub mod error_code {
    /// Table or view does not exist
    pub const TABLE_NOT_FOUND: i32 = 942;
    /// Invalid LOB locator
    pub const INVALID_LOB_LOCATOR: i32 = 22275;
    /// Element at index does not exist
    pub const ELEMENT_NOT_FOUND: i32 = 22160;
    /// Invalid or unknown object type name
    pub const INVALID_TYPE_NAME: i32 = 4043;
    /// BFILE operation on a file that does not exist
    pub const FILE_NOT_FOUND: i32 = 22288;
    /// Array size exceeded
    pub const ARRAY_SIZE_EXCEEDED: i32 = 22165;
    /// Value of the wrong native kind for the slot
    pub const INCONSISTENT_DATATYPES: i32 = 932;
    /// Fetch out of sequence
    pub const FETCH_OUT_OF_SEQUENCE: i32 = 1002;
    /// Invalid username/password
    pub const INVALID_CREDENTIALS: i32 = 1017;
    /// Value too large for the variable
    pub const VALUE_TOO_LARGE: i32 = 12899;
    /// Pool cannot open more sessions
    pub const POOL_EXHAUSTED: i32 = 24418;
    /// Invalid LOB offset or amount
    pub const INVALID_LOB_OFFSET: i32 = 24801;
    /// Trim size larger than the LOB
    pub const TRIM_LENGTH_EXCEEDED: i32 = 22926;
    /// Trim size larger than the collection
    pub const TRIM_SIZE_EXCEEDED: i32 = 22167;
    /// LOB opened twice
    pub const LOB_ALREADY_OPEN: i32 = 22293;
    /// LOB closed while not open
    pub const LOB_NOT_OPEN: i32 = 22289;
    /// Client-side error with no Oracle number
    pub const CLIENT: i32 = 0;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_oracle_type_names_round_trip() {
        for ty in [OracleType::Varchar, OracleType::Number, OracleType::NClob, OracleType::Cursor] {
            assert_eq!(ty.name().parse::<OracleType>().unwrap(), ty);
            assert_eq!(OracleType::try_from(ty as u32).unwrap(), ty);
        }
        assert!("varchar2".parse::<OracleType>().is_err());
        assert!(OracleType::try_from(1999).is_err());
    }

    #[test]
    fn test_oracle_type_classification() {
        assert!(OracleType::NChar.is_character());
        assert!(!OracleType::Number.is_character());
        assert!(OracleType::NClob.is_char_lob());
        assert!(OracleType::Blob.is_lob());
        assert!(!OracleType::Blob.is_char_lob());
        assert_eq!(OracleType::Number.default_native_type(), NativeType::Double);
        assert_eq!(OracleType::Varchar.default_native_type(), NativeType::Bytes);
        assert_eq!(OracleType::TimestampTz.default_native_type(), NativeType::Timestamp);
    }

    #[test]
    fn test_flag_sets() {
        let qos = SubscrQos::ROWIDS | SubscrQos::QUERY;
        assert!(qos.contains(SubscrQos::ROWIDS));
        assert!(!qos.contains(SubscrQos::RELIABLE));
        assert_eq!(qos.bits(), 0x0c);
        assert_eq!("sysdba".parse::<AuthMode>().unwrap(), AuthMode::SYSDBA);
        assert_eq!(CreateMode::default(), CreateMode::DEFAULT);
    }

    #[test]
    fn test_enum_defaults() {
        assert_eq!(SubscrNamespace::default(), SubscrNamespace::DbChange);
        assert_eq!(PoolGetMode::default(), PoolGetMode::Wait);
        assert_eq!(Purity::SelfPurity.to_string(), "self");
    }
}
