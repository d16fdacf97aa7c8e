//! Metadata returned by the client library
//!
//! Type, attribute, query and version descriptions. These are plain data
//! copied out of the driver; the only shared piece is the optional object
//! type handle for object-typed columns and attributes.

use std::cmp::Ordering;
use std::fmt;

use crate::constants::{NativeType, OracleType};
use crate::driver::ObjectTypeHandle;

/// Description of a column, attribute or collection element type
#[derive(Debug, Clone)]
pub struct DataTypeInfo {
    /// Oracle logical type
    pub oracle_type: OracleType,
    /// Native kind used when none is requested
    pub default_native_type: NativeType,
    /// OCI type code
    pub oci_type_code: u16,
    /// Size in the database, in bytes
    pub db_size_in_bytes: u32,
    /// Size on the client, in bytes
    pub client_size_in_bytes: u32,
    /// Size in characters (character types only)
    pub size_in_chars: u32,
    /// Precision (numbers)
    pub precision: i16,
    /// Scale (numbers)
    pub scale: i8,
    /// Fractional seconds precision (timestamps and intervals)
    pub fs_precision: u8,
    /// Object type for object-typed values
    pub object_type: Option<ObjectTypeHandle>,
}

impl DataTypeInfo {
    /// Create type info with the client library's default native kind
    pub fn new(oracle_type: OracleType) -> Self {
        Self {
            oracle_type,
            default_native_type: oracle_type.default_native_type(),
            oci_type_code: 0,
            db_size_in_bytes: 0,
            client_size_in_bytes: 0,
            size_in_chars: 0,
            precision: 0,
            scale: 0,
            fs_precision: 0,
            object_type: None,
        }
    }

    /// Set the byte size (database and client)
    pub fn with_size(mut self, size_in_bytes: u32) -> Self {
        self.db_size_in_bytes = size_in_bytes;
        self.client_size_in_bytes = size_in_bytes;
        if self.oracle_type.is_character() {
            self.size_in_chars = size_in_bytes;
        }
        self
    }

    /// Set precision and scale
    pub fn with_precision(mut self, precision: i16, scale: i8) -> Self {
        self.precision = precision;
        self.scale = scale;
        self
    }

    /// Set the object type for object-typed values
    pub fn with_object_type(mut self, object_type: ObjectTypeHandle) -> Self {
        self.object_type = Some(object_type);
        self
    }
}

impl fmt::Display for DataTypeInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.oracle_type {
            OracleType::Varchar
            | OracleType::NVarchar
            | OracleType::Char
            | OracleType::NChar
            | OracleType::Raw => write!(f, "{}({})", self.oracle_type, self.db_size_in_bytes),
            OracleType::Number if self.precision != 0 => {
                write!(f, "number({}, {})", self.precision, self.scale)
            }
            _ => write!(f, "{}", self.oracle_type),
        }
    }
}

/// Attribute of an object type
#[derive(Debug, Clone)]
pub struct ObjectAttrInfo {
    /// Attribute name
    pub name: String,
    /// Attribute type
    pub type_info: DataTypeInfo,
}

impl ObjectAttrInfo {
    /// Create attribute info
    pub fn new(name: impl Into<String>, type_info: DataTypeInfo) -> Self {
        Self {
            name: name.into(),
            type_info,
        }
    }
}

/// Object type description
#[derive(Debug, Clone)]
pub struct ObjectTypeInfo {
    /// Schema name
    pub schema: String,
    /// Type name
    pub name: String,
    /// Package name (for PL/SQL types)
    pub package_name: Option<String>,
    /// Whether this is a collection type
    pub is_collection: bool,
    /// Element type for collections
    pub element_type_info: Option<DataTypeInfo>,
    /// Number of attributes (zero for collections)
    pub num_attributes: u16,
}

impl ObjectTypeInfo {
    /// Get the fully qualified name
    pub fn full_name(&self) -> String {
        match self.package_name {
            Some(ref pkg) => format!("{}.{}.{}", self.schema, pkg, self.name),
            None => format!("{}.{}", self.schema, self.name),
        }
    }
}

/// Select-list column description
#[derive(Debug, Clone)]
pub struct QueryInfo {
    /// Column name
    pub name: String,
    /// Column type
    pub type_info: DataTypeInfo,
    /// Whether NULL is allowed
    pub null_ok: bool,
}

impl QueryInfo {
    /// Create a nullable column description
    pub fn new(name: impl Into<String>, type_info: DataTypeInfo) -> Self {
        Self {
            name: name.into(),
            type_info,
            null_ok: true,
        }
    }
}

/// Client or server version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct VersionInfo {
    /// Major version
    pub version: u32,
    /// Release
    pub release: u32,
    /// Release update
    pub update: u32,
    /// Port release
    pub port_release: u32,
    /// Port update
    pub port_update: u32,
}

impl VersionInfo {
    /// Create version info
    pub fn new(version: u32, release: u32, update: u32, port_release: u32, port_update: u32) -> Self {
        Self {
            version,
            release,
            update,
            port_release,
            port_update,
        }
    }

    fn as_tuple(&self) -> (u32, u32, u32, u32, u32) {
        (
            self.version,
            self.release,
            self.update,
            self.port_release,
            self.port_update,
        )
    }
}

impl PartialOrd for VersionInfo {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for VersionInfo {
    fn cmp(&self, other: &Self) -> Ordering {
        self.as_tuple().cmp(&other.as_tuple())
    }
}

impl fmt::Display for VersionInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{}.{}.{}.{}",
            self.version, self.release, self.update, self.port_release, self.port_update
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_ordering() {
        let v19 = VersionInfo::new(19, 3, 0, 0, 0);
        let v23 = VersionInfo::new(23, 4, 0, 24, 5);
        assert!(v19 < v23);
        assert_eq!(v23.to_string(), "23.4.0.24.5");
    }

    #[test]
    fn test_type_info_display() {
        assert_eq!(DataTypeInfo::new(OracleType::Varchar).with_size(30).to_string(), "varchar(30)");
        assert_eq!(DataTypeInfo::new(OracleType::Number).with_precision(10, 2).to_string(), "number(10, 2)");
        assert_eq!(DataTypeInfo::new(OracleType::Clob).to_string(), "clob");
    }
}
