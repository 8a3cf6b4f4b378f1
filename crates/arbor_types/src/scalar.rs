use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

use chrono::{DateTime, NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::datatype::DataType;

/// A single owned value.
///
/// Values have a total order so they can be used inside hkeys. Values of
/// different variants order by variant, which only matters for hkeys built
/// from mixed types (should not happen for a well formed row).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ScalarValue {
    Null,
    Boolean(bool),
    Int8(i8),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    UInt8(u8),
    UInt16(u16),
    UInt32(u32),
    UInt64(u64),
    Float64(f64),
    Utf8(String),
    Binary(Vec<u8>),
    Date32(i32),
    Time64(i64),
    Timestamp(i64),
}

impl ScalarValue {
    pub fn datatype(&self) -> DataType {
        match self {
            Self::Null => DataType::Null,
            Self::Boolean(_) => DataType::Boolean,
            Self::Int8(_) => DataType::Int8,
            Self::Int16(_) => DataType::Int16,
            Self::Int32(_) => DataType::Int32,
            Self::Int64(_) => DataType::Int64,
            Self::UInt8(_) => DataType::UInt8,
            Self::UInt16(_) => DataType::UInt16,
            Self::UInt32(_) => DataType::UInt32,
            Self::UInt64(_) => DataType::UInt64,
            Self::Float64(_) => DataType::Float64,
            Self::Utf8(_) => DataType::Utf8,
            Self::Binary(_) => DataType::Blob,
            Self::Date32(_) => DataType::Date32,
            Self::Time64(_) => DataType::Time64,
            Self::Timestamp(_) => DataType::Timestamp,
        }
    }

    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn try_as_bool(&self) -> Option<bool> {
        match self {
            Self::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Get any integer value widened to i128.
    pub fn try_as_i128(&self) -> Option<i128> {
        Some(match self {
            Self::Int8(v) => *v as i128,
            Self::Int16(v) => *v as i128,
            Self::Int32(v) => *v as i128,
            Self::Int64(v) => *v as i128,
            Self::UInt8(v) => *v as i128,
            Self::UInt16(v) => *v as i128,
            Self::UInt32(v) => *v as i128,
            Self::UInt64(v) => *v as i128,
            _ => return None,
        })
    }

    pub fn try_as_i64(&self) -> Option<i64> {
        self.try_as_i128().and_then(|v| i64::try_from(v).ok())
    }

    /// Get a numeric value as a float.
    pub fn try_as_f64(&self) -> Option<f64> {
        match self {
            Self::Float64(v) => Some(*v),
            other => other.try_as_i128().map(|v| v as f64),
        }
    }

    pub fn try_as_str(&self) -> Option<&str> {
        match self {
            Self::Utf8(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Create an integer value of the given type, None if the value doesn't
    /// fit or the type isn't an integer type.
    pub fn try_integer_of_type(datatype: DataType, v: i128) -> Option<ScalarValue> {
        Some(match datatype {
            DataType::Int8 => Self::Int8(i8::try_from(v).ok()?),
            DataType::Int16 => Self::Int16(i16::try_from(v).ok()?),
            DataType::Int32 => Self::Int32(i32::try_from(v).ok()?),
            DataType::Int64 => Self::Int64(i64::try_from(v).ok()?),
            DataType::UInt8 => Self::UInt8(u8::try_from(v).ok()?),
            DataType::UInt16 => Self::UInt16(u16::try_from(v).ok()?),
            DataType::UInt32 => Self::UInt32(u32::try_from(v).ok()?),
            DataType::UInt64 => Self::UInt64(u64::try_from(v).ok()?),
            _ => return None,
        })
    }

    /// Compare two values as SQL would, coercing between numeric types.
    ///
    /// Returns None if either side is NULL or the values aren't comparable.
    pub fn sql_cmp(&self, other: &ScalarValue) -> Option<Ordering> {
        if self.is_null() || other.is_null() {
            return None;
        }
        if let (Some(a), Some(b)) = (self.try_as_i128(), other.try_as_i128()) {
            return Some(a.cmp(&b));
        }
        if let (Some(a), Some(b)) = (self.try_as_f64(), other.try_as_f64()) {
            return a.partial_cmp(&b);
        }
        if self.datatype() == other.datatype() {
            return Some(self.cmp(other));
        }
        None
    }

    fn variant_rank(&self) -> u8 {
        match self {
            Self::Null => 0,
            Self::Boolean(_) => 1,
            Self::Int8(_) => 2,
            Self::Int16(_) => 3,
            Self::Int32(_) => 4,
            Self::Int64(_) => 5,
            Self::UInt8(_) => 6,
            Self::UInt16(_) => 7,
            Self::UInt32(_) => 8,
            Self::UInt64(_) => 9,
            Self::Float64(_) => 10,
            Self::Utf8(_) => 11,
            Self::Binary(_) => 12,
            Self::Date32(_) => 13,
            Self::Time64(_) => 14,
            Self::Timestamp(_) => 15,
        }
    }
}

impl PartialEq for ScalarValue {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for ScalarValue {}

impl PartialOrd for ScalarValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ScalarValue {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Null, Self::Null) => Ordering::Equal,
            (Self::Boolean(a), Self::Boolean(b)) => a.cmp(b),
            (Self::Int8(a), Self::Int8(b)) => a.cmp(b),
            (Self::Int16(a), Self::Int16(b)) => a.cmp(b),
            (Self::Int32(a), Self::Int32(b)) => a.cmp(b),
            (Self::Int64(a), Self::Int64(b)) => a.cmp(b),
            (Self::UInt8(a), Self::UInt8(b)) => a.cmp(b),
            (Self::UInt16(a), Self::UInt16(b)) => a.cmp(b),
            (Self::UInt32(a), Self::UInt32(b)) => a.cmp(b),
            (Self::UInt64(a), Self::UInt64(b)) => a.cmp(b),
            (Self::Float64(a), Self::Float64(b)) => a.total_cmp(b),
            (Self::Utf8(a), Self::Utf8(b)) => a.cmp(b),
            (Self::Binary(a), Self::Binary(b)) => a.cmp(b),
            (Self::Date32(a), Self::Date32(b)) => a.cmp(b),
            (Self::Time64(a), Self::Time64(b)) => a.cmp(b),
            (Self::Timestamp(a), Self::Timestamp(b)) => a.cmp(b),
            (a, b) => a.variant_rank().cmp(&b.variant_rank()),
        }
    }
}

impl Hash for ScalarValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.variant_rank().hash(state);
        match self {
            Self::Null => (),
            Self::Boolean(v) => v.hash(state),
            Self::Int8(v) => v.hash(state),
            Self::Int16(v) => v.hash(state),
            Self::Int32(v) => v.hash(state),
            Self::Int64(v) => v.hash(state),
            Self::UInt8(v) => v.hash(state),
            Self::UInt16(v) => v.hash(state),
            Self::UInt32(v) => v.hash(state),
            Self::UInt64(v) => v.hash(state),
            Self::Float64(v) => v.to_bits().hash(state),
            Self::Utf8(v) => v.hash(state),
            Self::Binary(v) => v.hash(state),
            Self::Date32(v) => v.hash(state),
            Self::Time64(v) => v.hash(state),
            Self::Timestamp(v) => v.hash(state),
        }
    }
}

impl fmt::Display for ScalarValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "NULL"),
            Self::Boolean(v) => write!(f, "{v}"),
            Self::Int8(v) => write!(f, "{v}"),
            Self::Int16(v) => write!(f, "{v}"),
            Self::Int32(v) => write!(f, "{v}"),
            Self::Int64(v) => write!(f, "{v}"),
            Self::UInt8(v) => write!(f, "{v}"),
            Self::UInt16(v) => write!(f, "{v}"),
            Self::UInt32(v) => write!(f, "{v}"),
            Self::UInt64(v) => write!(f, "{v}"),
            Self::Float64(v) => write!(f, "{v}"),
            Self::Utf8(v) => write!(f, "{v}"),
            Self::Binary(v) => {
                write!(f, "X'")?;
                for b in v {
                    write!(f, "{b:02X}")?;
                }
                write!(f, "'")
            }
            Self::Date32(days) => match NaiveDate::from_num_days_from_ce_opt(
                days + EPOCH_DAYS_FROM_CE,
            ) {
                Some(date) => write!(f, "{date}"),
                None => write!(f, "{days}"),
            },
            Self::Time64(micros) => {
                let secs = micros.div_euclid(1_000_000);
                let nanos = micros.rem_euclid(1_000_000) * 1000;
                match NaiveTime::from_num_seconds_from_midnight_opt(secs as u32, nanos as u32) {
                    Some(time) => write!(f, "{time}"),
                    None => write!(f, "{micros}"),
                }
            }
            Self::Timestamp(micros) => match DateTime::from_timestamp_micros(*micros) {
                Some(ts) => write!(f, "{}", ts.naive_utc()),
                None => write!(f, "{micros}"),
            },
        }
    }
}

/// Number of days between 0001-01-01 and 1970-01-01.
pub const EPOCH_DAYS_FROM_CE: i32 = 719_163;

macro_rules! impl_from_primitive {
    ($prim:ty, $variant:ident) => {
        impl From<$prim> for ScalarValue {
            fn from(value: $prim) -> Self {
                ScalarValue::$variant(value)
            }
        }
    };
}

impl_from_primitive!(bool, Boolean);
impl_from_primitive!(i8, Int8);
impl_from_primitive!(i16, Int16);
impl_from_primitive!(i32, Int32);
impl_from_primitive!(i64, Int64);
impl_from_primitive!(u8, UInt8);
impl_from_primitive!(u16, UInt16);
impl_from_primitive!(u32, UInt32);
impl_from_primitive!(u64, UInt64);
impl_from_primitive!(f64, Float64);
impl_from_primitive!(String, Utf8);

impl From<&str> for ScalarValue {
    fn from(value: &str) -> Self {
        ScalarValue::Utf8(value.to_string())
    }
}

impl<T: Into<ScalarValue>> From<Option<T>> for ScalarValue {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(v) => v.into(),
            None => ScalarValue::Null,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sql_cmp_coerces_integers() {
        let a = ScalarValue::Int8(4);
        let b = ScalarValue::Int64(9);
        assert_eq!(Some(Ordering::Less), a.sql_cmp(&b));
        assert_eq!(
            Some(Ordering::Equal),
            ScalarValue::Int32(3).sql_cmp(&ScalarValue::Float64(3.0))
        );
        assert_eq!(None, ScalarValue::Null.sql_cmp(&b));
        assert_eq!(None, ScalarValue::from("a").sql_cmp(&b));
    }

    #[test]
    fn total_order_within_variant() {
        let mut vals = vec![
            ScalarValue::from("b"),
            ScalarValue::from("a"),
            ScalarValue::from("c"),
        ];
        vals.sort();
        assert_eq!(
            vec![
                ScalarValue::from("a"),
                ScalarValue::from("b"),
                ScalarValue::from("c")
            ],
            vals
        );
    }

    #[test]
    fn integer_of_type() {
        assert_eq!(
            Some(ScalarValue::UInt8(200)),
            ScalarValue::try_integer_of_type(DataType::UInt8, 200)
        );
        assert_eq!(None, ScalarValue::try_integer_of_type(DataType::Int8, 200));
        assert_eq!(None, ScalarValue::try_integer_of_type(DataType::Utf8, 1));
    }

    #[test]
    fn display_dates() {
        assert_eq!("1970-01-02", ScalarValue::Date32(1).to_string());
        assert_eq!("00:00:01", ScalarValue::Time64(1_000_000).to_string());
        assert_eq!("NULL", ScalarValue::Null.to_string());
    }

    #[test]
    fn serde_round_trip() {
        let v = ScalarValue::from("hello");
        let s = serde_json::to_string(&v).unwrap();
        let got: ScalarValue = serde_json::from_str(&s).unwrap();
        assert_eq!(v, got);
    }
}
