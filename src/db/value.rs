//! Column values and typed conversion.
//!
//! Cursors hand out column data as [`Value`]; record fields receive it through
//! [`FromValue`]. Conversions follow the usual SQL-to-host rules: integers
//! widen or narrow with range checks, text parses into numbers, every scalar
//! renders into a `String`, and NULL only fits an `Option`.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde_json::Value as JsonValue;
use std::fmt;
use thiserror::Error;

/// A single decoded column value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    /// Exact DECIMAL/NUMERIC text as sent by the server.
    Decimal(String),
    Text(String),
    Bytes(Vec<u8>),
    Json(JsonValue),
    Date(NaiveDate),
    Time(NaiveTime),
    DateTime(NaiveDateTime),
}

impl Value {
    /// Check if this value is NULL.
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Get the type name of this value for error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::UInt(_) => "unsigned int",
            Self::Float(_) => "float",
            Self::Decimal(_) => "decimal",
            Self::Text(_) => "text",
            Self::Bytes(_) => "bytes",
            Self::Json(_) => "json",
            Self::Date(_) => "date",
            Self::Time(_) => "time",
            Self::DateTime(_) => "datetime",
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "NULL"),
            Self::Bool(v) => write!(f, "{}", v),
            Self::Int(v) => write!(f, "{}", v),
            Self::UInt(v) => write!(f, "{}", v),
            Self::Float(v) => write!(f, "{}", v),
            Self::Decimal(v) | Self::Text(v) => write!(f, "{}", v),
            Self::Bytes(v) => write!(f, "{}", String::from_utf8_lossy(v)),
            Self::Json(v) => write!(f, "{}", v),
            Self::Date(v) => write!(f, "{}", v),
            Self::Time(v) => write!(f, "{}", v),
            Self::DateTime(v) => write!(f, "{}", v),
        }
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Self::Int(v.into())
    }
}

impl From<u64> for Value {
    fn from(v: u64) -> Self {
        Self::UInt(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Self::Null)
    }
}

/// A value that does not fit the destination type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot convert {from} to {to}{detail}")]
pub struct ConversionError {
    from: &'static str,
    to: &'static str,
    detail: String,
}

impl ConversionError {
    pub fn new(value: &Value, to: &'static str) -> Self {
        Self {
            from: value.type_name(),
            to,
            detail: String::new(),
        }
    }

    /// Attach extra context (e.g. the offending text).
    pub fn with_detail(mut self, detail: impl fmt::Display) -> Self {
        self.detail = format!(" ({})", detail);
        self
    }
}

/// Conversion from a column [`Value`] into a record field type.
pub trait FromValue: Sized {
    fn from_value(value: Value) -> Result<Self, ConversionError>;
}

impl FromValue for Value {
    fn from_value(value: Value) -> Result<Self, ConversionError> {
        Ok(value)
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: Value) -> Result<Self, ConversionError> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }
}

impl FromValue for bool {
    fn from_value(value: Value) -> Result<Self, ConversionError> {
        match value {
            Value::Bool(v) => Ok(v),
            // TINYINT(1) is how MySQL stores booleans
            Value::Int(v) => Ok(v != 0),
            Value::UInt(v) => Ok(v != 0),
            Value::Text(ref s) => match s.as_str() {
                "1" | "true" | "TRUE" => Ok(true),
                "0" | "false" | "FALSE" => Ok(false),
                _ => Err(ConversionError::new(&value, "bool").with_detail(s)),
            },
            other => Err(ConversionError::new(&other, "bool")),
        }
    }
}

macro_rules! impl_from_value_int {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl FromValue for $ty {
                fn from_value(value: Value) -> Result<Self, ConversionError> {
                    let target = stringify!($ty);
                    match value {
                        Value::Int(v) => <$ty>::try_from(v)
                            .map_err(|_| ConversionError::new(&value, target).with_detail("out of range")),
                        Value::UInt(v) => <$ty>::try_from(v)
                            .map_err(|_| ConversionError::new(&value, target).with_detail("out of range")),
                        Value::Bool(v) => Ok(<$ty>::from(v)),
                        Value::Text(ref s) | Value::Decimal(ref s) => s
                            .trim()
                            .parse::<$ty>()
                            .map_err(|e| ConversionError::new(&value, target).with_detail(e)),
                        other => Err(ConversionError::new(&other, target)),
                    }
                }
            }
        )+
    };
}

impl_from_value_int!(i8, i16, i32, i64, u8, u16, u32, u64);

macro_rules! impl_from_value_float {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl FromValue for $ty {
                fn from_value(value: Value) -> Result<Self, ConversionError> {
                    let target = stringify!($ty);
                    match value {
                        Value::Float(v) => Ok(v as $ty),
                        Value::Int(v) => Ok(v as $ty),
                        Value::UInt(v) => Ok(v as $ty),
                        Value::Text(ref s) | Value::Decimal(ref s) => s
                            .trim()
                            .parse::<$ty>()
                            .map_err(|e| ConversionError::new(&value, target).with_detail(e)),
                        other => Err(ConversionError::new(&other, target)),
                    }
                }
            }
        )+
    };
}

impl_from_value_float!(f32, f64);

impl FromValue for String {
    fn from_value(value: Value) -> Result<Self, ConversionError> {
        match value {
            Value::Text(v) | Value::Decimal(v) => Ok(v),
            Value::Bytes(v) => String::from_utf8(v).map_err(|e| {
                ConversionError::new(&Value::Bytes(Vec::new()), "String").with_detail(e)
            }),
            Value::Null => Err(ConversionError::new(&value, "String")),
            other => Ok(other.to_string()),
        }
    }
}

impl FromValue for Vec<u8> {
    fn from_value(value: Value) -> Result<Self, ConversionError> {
        match value {
            Value::Bytes(v) => Ok(v),
            Value::Text(v) | Value::Decimal(v) => Ok(v.into_bytes()),
            other => Err(ConversionError::new(&other, "Vec<u8>")),
        }
    }
}

impl FromValue for JsonValue {
    fn from_value(value: Value) -> Result<Self, ConversionError> {
        match value {
            Value::Json(v) => Ok(v),
            Value::Text(ref s) => serde_json::from_str(s)
                .map_err(|e| ConversionError::new(&value, "JSON").with_detail(e)),
            Value::Bytes(ref b) => serde_json::from_slice(b)
                .map_err(|e| ConversionError::new(&value, "JSON").with_detail(e)),
            other => Err(ConversionError::new(&other, "JSON")),
        }
    }
}

impl FromValue for NaiveDateTime {
    fn from_value(value: Value) -> Result<Self, ConversionError> {
        match value {
            Value::DateTime(v) => Ok(v),
            Value::Date(v) => Ok(v.and_time(NaiveTime::MIN)),
            Value::Text(ref s) => NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f")
                .map_err(|e| ConversionError::new(&value, "NaiveDateTime").with_detail(e)),
            other => Err(ConversionError::new(&other, "NaiveDateTime")),
        }
    }
}

impl FromValue for DateTime<Utc> {
    fn from_value(value: Value) -> Result<Self, ConversionError> {
        NaiveDateTime::from_value(value).map(|v| v.and_utc())
    }
}

impl FromValue for NaiveDate {
    fn from_value(value: Value) -> Result<Self, ConversionError> {
        match value {
            Value::Date(v) => Ok(v),
            Value::DateTime(v) => Ok(v.date()),
            Value::Text(ref s) => NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .map_err(|e| ConversionError::new(&value, "NaiveDate").with_detail(e)),
            other => Err(ConversionError::new(&other, "NaiveDate")),
        }
    }
}

impl FromValue for NaiveTime {
    fn from_value(value: Value) -> Result<Self, ConversionError> {
        match value {
            Value::Time(v) => Ok(v),
            Value::DateTime(v) => Ok(v.time()),
            Value::Text(ref s) => NaiveTime::parse_from_str(s, "%H:%M:%S%.f")
                .map_err(|e| ConversionError::new(&value, "NaiveTime").with_detail(e)),
            other => Err(ConversionError::new(&other, "NaiveTime")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integer_conversions() {
        assert_eq!(i64::from_value(Value::Int(-5)).unwrap(), -5);
        assert_eq!(u8::from_value(Value::UInt(200)).unwrap(), 200);
        assert_eq!(i32::from_value(Value::Text(" 42 ".into())).unwrap(), 42);
        assert_eq!(u32::from_value(Value::Bool(true)).unwrap(), 1);
    }

    #[test]
    fn test_integer_out_of_range() {
        let err = u8::from_value(Value::Int(300)).unwrap_err();
        assert!(err.to_string().contains("out of range"));
        assert!(u64::from_value(Value::Int(-1)).is_err());
    }

    #[test]
    fn test_null_requires_option() {
        assert!(i64::from_value(Value::Null).is_err());
        assert!(String::from_value(Value::Null).is_err());
        assert_eq!(Option::<i64>::from_value(Value::Null).unwrap(), None);
        assert_eq!(Option::<i64>::from_value(Value::Int(3)).unwrap(), Some(3));
    }

    #[test]
    fn test_string_conversions() {
        assert_eq!(String::from_value(Value::Int(7)).unwrap(), "7");
        assert_eq!(
            String::from_value(Value::Decimal("12.50".into())).unwrap(),
            "12.50"
        );
        assert_eq!(
            String::from_value(Value::Bytes(b"abc".to_vec())).unwrap(),
            "abc"
        );
        assert!(String::from_value(Value::Bytes(vec![0xff, 0xfe])).is_err());
    }

    #[test]
    fn test_text_into_int_fails_with_detail() {
        let err = i64::from_value(Value::Text("abc".into())).unwrap_err();
        assert!(err.to_string().contains("cannot convert text to i64"));
    }

    #[test]
    fn test_float_conversions() {
        assert_eq!(f64::from_value(Value::Float(1.5)).unwrap(), 1.5);
        assert_eq!(f64::from_value(Value::Decimal("9.75".into())).unwrap(), 9.75);
        assert_eq!(f32::from_value(Value::Int(2)).unwrap(), 2.0);
    }

    #[test]
    fn test_bool_conversions() {
        assert!(bool::from_value(Value::Int(1)).unwrap());
        assert!(!bool::from_value(Value::UInt(0)).unwrap());
        assert!(bool::from_value(Value::Text("maybe".into())).is_err());
    }

    #[test]
    fn test_datetime_conversions() {
        let dt = NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_opt(10, 30, 0)
            .unwrap();
        assert_eq!(NaiveDateTime::from_value(Value::DateTime(dt)).unwrap(), dt);
        assert_eq!(
            NaiveDateTime::from_value(Value::Text("2024-03-01 10:30:00".into())).unwrap(),
            dt
        );
        assert_eq!(
            NaiveDate::from_value(Value::DateTime(dt)).unwrap(),
            dt.date()
        );
        assert_eq!(
            DateTime::<Utc>::from_value(Value::DateTime(dt)).unwrap(),
            dt.and_utc()
        );
    }

    #[test]
    fn test_json_conversion() {
        let json = JsonValue::from_value(Value::Text(r#"{"a":1}"#.into())).unwrap();
        assert_eq!(json["a"], 1);
    }

    #[test]
    fn test_value_from_option() {
        assert_eq!(Value::from(None::<i64>), Value::Null);
        assert_eq!(Value::from(Some("x")), Value::Text("x".into()));
    }
}
