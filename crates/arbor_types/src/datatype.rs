use std::fmt;

use serde::{Deserialize, Serialize};

/// Max number of bytes a single character may take in any supported charset.
const MAX_BYTES_PER_CHAR: u64 = 4;

/// Storage size reported for unbounded types (BLOB).
const BLOB_MAX_STORAGE_SIZE: u64 = u32::MAX as u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataType {
    Null,
    Boolean,
    Int8,
    Int16,
    Int32,
    Int64,
    UInt8,
    UInt16,
    UInt32,
    UInt64,
    Float64,
    Utf8,
    Blob,
    /// Days since epoch.
    Date32,
    /// Microseconds since midnight.
    Time64,
    /// Microseconds since epoch.
    Timestamp,
}

impl DataType {
    /// Resolve a SQL type name, e.g. `INT` or `TINYINT UNSIGNED`.
    ///
    /// Case-insensitive. Returns None for unknown names.
    pub fn from_type_name(name: &str) -> Option<DataType> {
        let normalized = name
            .split_whitespace()
            .map(|part| part.to_ascii_uppercase())
            .collect::<Vec<_>>()
            .join(" ");

        Some(match normalized.as_str() {
            "BOOLEAN" | "BOOL" => DataType::Boolean,
            "TINYINT" => DataType::Int8,
            "SMALLINT" => DataType::Int16,
            "INT" | "INTEGER" | "MEDIUMINT" => DataType::Int32,
            "BIGINT" => DataType::Int64,
            "TINYINT UNSIGNED" => DataType::UInt8,
            "SMALLINT UNSIGNED" => DataType::UInt16,
            "INT UNSIGNED" | "INTEGER UNSIGNED" | "MEDIUMINT UNSIGNED" => DataType::UInt32,
            "BIGINT UNSIGNED" => DataType::UInt64,
            "DOUBLE" | "FLOAT" | "REAL" => DataType::Float64,
            "VARCHAR" | "CHAR" | "TEXT" => DataType::Utf8,
            "BLOB" | "VARBINARY" => DataType::Blob,
            "DATE" => DataType::Date32,
            "TIME" => DataType::Time64,
            "DATETIME" | "TIMESTAMP" => DataType::Timestamp,
            _ => return None,
        })
    }

    /// Canonical SQL name for this type.
    pub const fn type_name(&self) -> &'static str {
        match self {
            DataType::Null => "NULL",
            DataType::Boolean => "BOOLEAN",
            DataType::Int8 => "TINYINT",
            DataType::Int16 => "SMALLINT",
            DataType::Int32 => "INT",
            DataType::Int64 => "BIGINT",
            DataType::UInt8 => "TINYINT UNSIGNED",
            DataType::UInt16 => "SMALLINT UNSIGNED",
            DataType::UInt32 => "INT UNSIGNED",
            DataType::UInt64 => "BIGINT UNSIGNED",
            DataType::Float64 => "DOUBLE",
            DataType::Utf8 => "VARCHAR",
            DataType::Blob => "BLOB",
            DataType::Date32 => "DATE",
            DataType::Time64 => "TIME",
            DataType::Timestamp => "DATETIME",
        }
    }

    pub const fn is_integer(&self) -> bool {
        matches!(
            self,
            DataType::Int8
                | DataType::Int16
                | DataType::Int32
                | DataType::Int64
                | DataType::UInt8
                | DataType::UInt16
                | DataType::UInt32
                | DataType::UInt64
        )
    }

    pub const fn is_unsigned(&self) -> bool {
        matches!(
            self,
            DataType::UInt8 | DataType::UInt16 | DataType::UInt32 | DataType::UInt64
        )
    }

    pub const fn is_numeric(&self) -> bool {
        self.is_integer() || matches!(self, DataType::Float64)
    }

    pub const fn is_string(&self) -> bool {
        matches!(self, DataType::Utf8)
    }

    /// Inclusive (min, max) for integer types.
    pub const fn integer_bounds(&self) -> Option<(i128, i128)> {
        Some(match self {
            DataType::Int8 => (i8::MIN as i128, i8::MAX as i128),
            DataType::Int16 => (i16::MIN as i128, i16::MAX as i128),
            DataType::Int32 => (i32::MIN as i128, i32::MAX as i128),
            DataType::Int64 => (i64::MIN as i128, i64::MAX as i128),
            DataType::UInt8 => (0, u8::MAX as i128),
            DataType::UInt16 => (0, u16::MAX as i128),
            DataType::UInt32 => (0, u32::MAX as i128),
            DataType::UInt64 => (0, u64::MAX as i128),
            _ => return None,
        })
    }

    /// Fixed on-disk width in bytes, None for variable length types.
    pub const fn fixed_size(&self) -> Option<u64> {
        Some(match self {
            DataType::Null => 0,
            DataType::Boolean | DataType::Int8 | DataType::UInt8 => 1,
            DataType::Int16 | DataType::UInt16 => 2,
            DataType::Int32 | DataType::UInt32 | DataType::Date32 => 4,
            DataType::Int64
            | DataType::UInt64
            | DataType::Float64
            | DataType::Time64
            | DataType::Timestamp => 8,
            DataType::Utf8 | DataType::Blob => return None,
        })
    }

    /// Number of bytes used to store the length of a variable length value.
    pub fn prefix_size(&self, max_length: Option<u64>) -> u64 {
        match self {
            DataType::Utf8 => {
                if max_length.unwrap_or(255) * MAX_BYTES_PER_CHAR < 256 {
                    1
                } else {
                    2
                }
            }
            DataType::Blob => 4,
            _ => 0,
        }
    }

    /// Largest number of bytes a value of this type may occupy, including
    /// its length prefix.
    pub fn max_storage_size(&self, max_length: Option<u64>) -> u64 {
        match self.fixed_size() {
            Some(size) => size,
            None => match self {
                DataType::Utf8 => {
                    let data = max_length.unwrap_or(255) * MAX_BYTES_PER_CHAR;
                    data + if data < 256 { 1 } else { 2 }
                }
                _ => BLOB_MAX_STORAGE_SIZE,
            },
        }
    }

    /// If this type can be part of an index key.
    pub const fn is_indexable(&self) -> bool {
        !matches!(self, DataType::Blob | DataType::Null)
    }

    /// If values of the two types can be compared for equality without loss,
    /// e.g. across a join.
    pub fn is_compatible_with(&self, other: &DataType) -> bool {
        if self == other {
            return true;
        }
        (self.is_integer() && other.is_integer()) || (self.is_string() && other.is_string())
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.type_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_names_round_trip() {
        for dt in [
            DataType::Boolean,
            DataType::Int8,
            DataType::Int32,
            DataType::UInt8,
            DataType::UInt64,
            DataType::Float64,
            DataType::Utf8,
            DataType::Date32,
            DataType::Timestamp,
        ] {
            assert_eq!(Some(dt), DataType::from_type_name(dt.type_name()));
        }
    }

    #[test]
    fn type_name_case_and_spacing() {
        assert_eq!(
            Some(DataType::UInt8),
            DataType::from_type_name("tinyint   unsigned")
        );
        assert_eq!(None, DataType::from_type_name("geometry"));
    }

    #[test]
    fn varchar_sizes() {
        // 10 chars * 4 bytes + 1 byte prefix.
        assert_eq!(41, DataType::Utf8.max_storage_size(Some(10)));
        assert_eq!(1, DataType::Utf8.prefix_size(Some(10)));
        assert_eq!(2, DataType::Utf8.prefix_size(Some(1000)));
        assert_eq!(4, DataType::Int32.max_storage_size(None));
        assert_eq!(0, DataType::Int32.prefix_size(None));
    }

    #[test]
    fn compatibility() {
        assert!(DataType::Int32.is_compatible_with(&DataType::Int64));
        assert!(!DataType::Int32.is_compatible_with(&DataType::Utf8));
        assert!(DataType::Date32.is_compatible_with(&DataType::Date32));
    }
}
