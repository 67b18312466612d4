// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Application-level values and conversions.

use crate::error::{Error, Result};
use crate::object::{CollectionInstance, ObjectInstance};
use chrono::{NaiveDateTime, TimeDelta};

/// A decoded attribute or element value.
///
/// NUMBER values are carried as decimal text to keep full precision; use
/// [`Datum::as_i64`] or [`Datum::as_f64`] (or [`FromDatum`]) to convert.
#[derive(Debug)]
pub enum Datum {
    Null,
    Bool(bool),
    Int64(i64),
    Uint64(u64),
    Float(f32),
    Double(f64),
    Text(String),
    Bytes(Vec<u8>),
    /// Decimal text of an arbitrary precision NUMBER.
    Number(String),
    Timestamp(NaiveDateTime),
    Interval(TimeDelta),
    Object(ObjectInstance),
    Collection(CollectionInstance),
}

impl Datum {
    pub fn is_null(&self) -> bool {
        matches!(self, Datum::Null)
    }

    /// Variant name, for error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Datum::Null => "null",
            Datum::Bool(_) => "bool",
            Datum::Int64(_) => "int64",
            Datum::Uint64(_) => "uint64",
            Datum::Float(_) => "float",
            Datum::Double(_) => "double",
            Datum::Text(_) => "text",
            Datum::Bytes(_) => "bytes",
            Datum::Number(_) => "number",
            Datum::Timestamp(_) => "timestamp",
            Datum::Interval(_) => "interval",
            Datum::Object(_) => "object",
            Datum::Collection(_) => "collection",
        }
    }

    /// Text or decimal text.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Datum::Text(s) | Datum::Number(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Datum::Bool(v) => Some(*v),
            _ => None,
        }
    }

    /// Integer value of an integer or an integral NUMBER.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Datum::Int64(v) => Some(*v),
            Datum::Uint64(v) => i64::try_from(*v).ok(),
            Datum::Number(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Datum::Double(v) => Some(*v),
            Datum::Float(v) => Some(f64::from(*v)),
            Datum::Int64(v) => Some(*v as f64),
            Datum::Uint64(v) => Some(*v as f64),
            Datum::Number(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&ObjectInstance> {
        match self {
            Datum::Object(object) => Some(object),
            Datum::Collection(collection) => Some(&**collection),
            _ => None,
        }
    }

    pub fn as_collection_mut(&mut self) -> Option<&mut CollectionInstance> {
        match self {
            Datum::Collection(collection) => Some(collection),
            _ => None,
        }
    }
}

/// Scalars compare by value, objects by engine handle.
impl PartialEq for Datum {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Datum::Null, Datum::Null) => true,
            (Datum::Bool(a), Datum::Bool(b)) => a == b,
            (Datum::Int64(a), Datum::Int64(b)) => a == b,
            (Datum::Uint64(a), Datum::Uint64(b)) => a == b,
            (Datum::Float(a), Datum::Float(b)) => a == b,
            (Datum::Double(a), Datum::Double(b)) => a == b,
            (Datum::Text(a), Datum::Text(b)) => a == b,
            (Datum::Bytes(a), Datum::Bytes(b)) => a == b,
            (Datum::Number(a), Datum::Number(b)) => a == b,
            (Datum::Timestamp(a), Datum::Timestamp(b)) => a == b,
            (Datum::Interval(a), Datum::Interval(b)) => a == b,
            (Datum::Object(a), Datum::Object(b)) => a.raw_handle().ok() == b.raw_handle().ok(),
            (Datum::Collection(a), Datum::Collection(b)) => {
                a.raw_handle().ok() == b.raw_handle().ok()
            }
            _ => false,
        }
    }
}

// ============================================================================
// Into Datum
// ============================================================================

macro_rules! impl_into_datum {
    ($($ty:ty => $variant:ident as $conv:ty),* $(,)?) => {
        $(
            impl From<$ty> for Datum {
                fn from(v: $ty) -> Self {
                    Datum::$variant(<$conv>::from(v))
                }
            }
        )*
    };
}

impl_into_datum! {
    bool => Bool as bool,
    i8 => Int64 as i64,
    i16 => Int64 as i64,
    i32 => Int64 as i64,
    i64 => Int64 as i64,
    u8 => Uint64 as u64,
    u16 => Uint64 as u64,
    u32 => Uint64 as u64,
    u64 => Uint64 as u64,
    f32 => Float as f32,
    f64 => Double as f64,
    String => Text as String,
    &str => Text as String,
    Vec<u8> => Bytes as Vec<u8>,
    &[u8] => Bytes as Vec<u8>,
    NaiveDateTime => Timestamp as NaiveDateTime,
    TimeDelta => Interval as TimeDelta,
}

impl From<ObjectInstance> for Datum {
    fn from(v: ObjectInstance) -> Self {
        Datum::Object(v)
    }
}

impl From<CollectionInstance> for Datum {
    fn from(v: CollectionInstance) -> Self {
        Datum::Collection(v)
    }
}

impl<T: Into<Datum>> From<Option<T>> for Datum {
    fn from(v: Option<T>) -> Self {
        v.map_or(Datum::Null, Into::into)
    }
}

// ============================================================================
// From Datum
// ============================================================================

/// Conversion from a decoded [`Datum`] into an application type.
///
/// Used by [`CollectionInstance::to_vec`] and friends.
pub trait FromDatum: Sized {
    fn from_datum(datum: Datum) -> Result<Self>;
}

fn mismatch<T>(expected: &str, datum: &Datum) -> Result<T> {
    Err(Error::Decode(format!(
        "expected {}, got {}",
        expected,
        datum.kind()
    )))
}

macro_rules! impl_from_datum {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl FromDatum for $ty {
                fn from_datum(datum: Datum) -> Result<Self> {
                    match datum {
                        Datum::$variant(v) => Ok(v),
                        other => mismatch(stringify!($ty), &other),
                    }
                }
            }
        )*
    };
}

impl_from_datum! {
    bool => Bool,
    f32 => Float,
    Vec<u8> => Bytes,
    NaiveDateTime => Timestamp,
    TimeDelta => Interval,
    CollectionInstance => Collection,
}

impl FromDatum for Datum {
    fn from_datum(datum: Datum) -> Result<Self> {
        Ok(datum)
    }
}

impl FromDatum for i64 {
    fn from_datum(datum: Datum) -> Result<Self> {
        match datum.as_i64() {
            Some(v) => Ok(v),
            None => mismatch("i64", &datum),
        }
    }
}

impl FromDatum for u64 {
    fn from_datum(datum: Datum) -> Result<Self> {
        match &datum {
            Datum::Uint64(v) => Ok(*v),
            Datum::Int64(v) => u64::try_from(*v).or_else(|_| mismatch("u64", &datum)),
            Datum::Number(s) => s.trim().parse().or_else(|_| mismatch("u64", &datum)),
            _ => mismatch("u64", &datum),
        }
    }
}

impl FromDatum for f64 {
    fn from_datum(datum: Datum) -> Result<Self> {
        match datum.as_f64() {
            Some(v) => Ok(v),
            None => mismatch("f64", &datum),
        }
    }
}

impl FromDatum for String {
    fn from_datum(datum: Datum) -> Result<Self> {
        match datum {
            Datum::Text(s) | Datum::Number(s) => Ok(s),
            other => mismatch("String", &other),
        }
    }
}

impl FromDatum for ObjectInstance {
    fn from_datum(datum: Datum) -> Result<Self> {
        match datum {
            Datum::Object(object) => Ok(object),
            Datum::Collection(collection) => Ok(collection.into_object()),
            other => mismatch("ObjectInstance", &other),
        }
    }
}

impl<T: FromDatum> FromDatum for Option<T> {
    fn from_datum(datum: Datum) -> Result<Self> {
        match datum {
            Datum::Null => Ok(None),
            other => T::from_datum(other).map(Some),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_into_datum() {
        assert_eq!(Datum::from(42i32), Datum::Int64(42));
        assert_eq!(Datum::from(7u8), Datum::Uint64(7));
        assert_eq!(Datum::from("x"), Datum::Text("x".into()));
        assert_eq!(Datum::from(None::<i64>), Datum::Null);
        assert_eq!(Datum::from(Some(1.5f64)), Datum::Double(1.5));
        assert_eq!(Datum::from(&b"\x01\x02"[..]), Datum::Bytes(vec![1, 2]));
    }

    #[test]
    fn test_number_conversions() {
        let n = Datum::Number("12345".into());
        assert_eq!(n.as_i64(), Some(12345));
        assert_eq!(i64::from_datum(Datum::Number("-3".into())).expect("i64"), -3);
        assert_eq!(f64::from_datum(Datum::Number("2.5".into())).expect("f64"), 2.5);
        assert_eq!(
            String::from_datum(Datum::Number("2.50".into())).expect("string"),
            "2.50"
        );
        assert!(i64::from_datum(Datum::Number("2.5".into())).is_err());
        assert!(u64::from_datum(Datum::Int64(-1)).is_err());
    }

    #[test]
    fn test_option_from_datum() {
        assert_eq!(Option::<i64>::from_datum(Datum::Null).expect("null"), None);
        assert_eq!(
            Option::<String>::from_datum(Datum::Text("a".into())).expect("text"),
            Some("a".to_string())
        );
    }

    #[test]
    fn test_mismatch_message() {
        let err = bool::from_datum(Datum::Int64(1)).expect_err("mismatch");
        assert_eq!(err.to_string(), "Decode error: expected bool, got int64");
    }
}
