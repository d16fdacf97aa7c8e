//! Oracle value types
//!
//! Fixed-size values (numbers as text, timestamps, intervals, rowid parts) and
//! the session-bound wrappers for LOBs, rowids and JSON documents.

pub mod number;
mod datetime;
mod json;
mod lob;
mod rowid;

pub use number::OracleNumber;
pub use datetime::{IntervalDS, IntervalYM, Timestamp};
pub use json::{
    from_native, to_native, Json, JsonArray, JsonCapabilities, JsonNode, JsonNodeValue, JsonObject,
    JsonText,
};
pub use lob::{size_in_chars, Lob};
pub use rowid::{Rowid, RowidParts, ROWID_LENGTH};
