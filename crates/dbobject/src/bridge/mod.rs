// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Engine bridge: the narrow boundary between the object type system and the
//! database engine client.
//!
//! The bridge exposes primitive create/get/set/release operations over raw,
//! reference-counted handles. Every call returns a bare success/failure
//! signal ([`Status`]); on failure the caller fetches the structured error
//! with [`Bridge::last_error`] immediately, before issuing any other call on
//! the same thread.
//!
//! # Handle ownership
//!
//! | Handle | Obtained from | Released by |
//! |--------|---------------|-------------|
//! | [`RawTypeHandle`] | `get_object_type`, `type_add_ref` | `type_release` |
//! | [`RawAttrHandle`] | `type_attributes` | `attr_release` |
//! | [`RawObjectHandle`] | `create_object`, `object_add_ref` | `object_release` |
//!
//! A type handle found inside a [`DataTypeInfo`] is borrowed from the
//! attribute (or collection type) it was read from. Callers that keep it
//! beyond the lifetime of that owner must call `type_add_ref`.
//!
//! [`memory::MemoryBridge`] is a complete in-process engine implementing
//! this trait.

pub mod memory;

use chrono::{NaiveDateTime, TimeDelta};
use std::fmt;
use std::num::NonZeroU64;

// ---------------------------------------------------------------------------
// Raw handles
// ---------------------------------------------------------------------------

macro_rules! raw_handle {
    ($(#[$meta:meta])* $name:ident, $label:expr) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(NonZeroU64);

        impl $name {
            /// Wrap a raw engine identifier.
            pub const fn new(id: NonZeroU64) -> Self {
                Self(id)
            }

            /// Wrap a raw identifier, `None` for the null handle (0).
            pub fn from_raw(id: u64) -> Option<Self> {
                NonZeroU64::new(id).map(Self)
            }

            /// Raw identifier.
            pub const fn get(self) -> u64 {
                self.0.get()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}#{}", $label, self.0)
            }
        }
    };
}

raw_handle!(
    /// Reference-counted engine handle to an object type.
    RawTypeHandle,
    "type"
);
raw_handle!(
    /// Reference-counted engine handle to one attribute of an object type.
    RawAttrHandle,
    "attr"
);
raw_handle!(
    /// Reference-counted engine handle to an object or collection value.
    RawObjectHandle,
    "object"
);

// ---------------------------------------------------------------------------
// Tags
// ---------------------------------------------------------------------------

/// How the payload of a [`NativeData`] is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NativeTag {
    Int64,
    Uint64,
    Float,
    Double,
    /// Byte buffer (character data, raw data, or decimal text of a NUMBER).
    Bytes,
    Timestamp,
    IntervalDs,
    Boolean,
    Object,
}

impl fmt::Display for NativeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Int64 => "INT64",
            Self::Uint64 => "UINT64",
            Self::Float => "FLOAT",
            Self::Double => "DOUBLE",
            Self::Bytes => "BYTES",
            Self::Timestamp => "TIMESTAMP",
            Self::IntervalDs => "INTERVAL_DS",
            Self::Boolean => "BOOLEAN",
            Self::Object => "OBJECT",
        };
        f.write_str(name)
    }
}

/// Data type declared by the engine for an attribute or collection element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EngineType {
    Varchar,
    NVarchar,
    Char,
    NChar,
    /// Arbitrary precision decimal.
    Number,
    NativeInt,
    NativeFloat,
    NativeDouble,
    Date,
    Timestamp,
    TimestampTz,
    IntervalDs,
    Raw,
    Boolean,
    Object,
}

impl EngineType {
    /// Tag the engine uses for this type when the caller does not pick one.
    pub fn default_native_tag(self) -> NativeTag {
        match self {
            Self::Varchar | Self::NVarchar | Self::Char | Self::NChar | Self::Raw => {
                NativeTag::Bytes
            }
            Self::Number => NativeTag::Bytes,
            Self::NativeInt => NativeTag::Int64,
            Self::NativeFloat => NativeTag::Float,
            Self::NativeDouble => NativeTag::Double,
            Self::Date | Self::Timestamp | Self::TimestampTz => NativeTag::Timestamp,
            Self::IntervalDs => NativeTag::IntervalDs,
            Self::Boolean => NativeTag::Boolean,
            Self::Object => NativeTag::Object,
        }
    }

    /// Character data (decoded as text).
    pub fn is_character(self) -> bool {
        matches!(self, Self::Varchar | Self::NVarchar | Self::Char | Self::NChar)
    }

    /// SQL spelling of the type.
    pub fn sql_name(self) -> &'static str {
        match self {
            Self::Varchar => "VARCHAR2",
            Self::NVarchar => "NVARCHAR2",
            Self::Char => "CHAR",
            Self::NChar => "NCHAR",
            Self::Number => "NUMBER",
            Self::NativeInt => "PLS_INTEGER",
            Self::NativeFloat => "BINARY_FLOAT",
            Self::NativeDouble => "BINARY_DOUBLE",
            Self::Date => "DATE",
            Self::Timestamp => "TIMESTAMP",
            Self::TimestampTz => "TIMESTAMP WITH TIME ZONE",
            Self::IntervalDs => "INTERVAL DAY TO SECOND",
            Self::Raw => "RAW",
            Self::Boolean => "BOOLEAN",
            Self::Object => "OBJECT",
        }
    }

    /// Parse the SQL spelling (case-insensitive, common aliases accepted).
    pub fn from_sql_name(name: &str) -> Option<Self> {
        let upper = name.trim().to_ascii_uppercase();
        let ty = match upper.as_str() {
            "VARCHAR2" | "VARCHAR" => Self::Varchar,
            "NVARCHAR2" | "NVARCHAR" => Self::NVarchar,
            "CHAR" => Self::Char,
            "NCHAR" => Self::NChar,
            "NUMBER" | "DECIMAL" | "NUMERIC" | "INTEGER" => Self::Number,
            "PLS_INTEGER" | "BINARY_INTEGER" => Self::NativeInt,
            "BINARY_FLOAT" => Self::NativeFloat,
            "BINARY_DOUBLE" => Self::NativeDouble,
            "DATE" => Self::Date,
            "TIMESTAMP" => Self::Timestamp,
            "TIMESTAMP WITH TIME ZONE" | "TIMESTAMP_TZ" => Self::TimestampTz,
            "INTERVAL DAY TO SECOND" | "INTERVAL_DS" => Self::IntervalDs,
            "RAW" => Self::Raw,
            "BOOLEAN" => Self::Boolean,
            "OBJECT" => Self::Object,
            _ => return None,
        };
        Some(ty)
    }
}

impl fmt::Display for EngineType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.sql_name())
    }
}

// ---------------------------------------------------------------------------
// Metadata records
// ---------------------------------------------------------------------------

/// Data type of an attribute or collection element.
#[derive(Debug, Clone, PartialEq)]
pub struct DataTypeInfo {
    pub engine_type: EngineType,
    pub native_tag: NativeTag,
    /// Borrowed handle of the nested object type, for `EngineType::Object`.
    pub object_type: Option<RawTypeHandle>,
    pub db_size: u32,
    pub client_size: u32,
    pub char_size: u32,
    pub precision: i16,
    pub scale: i8,
    pub fs_precision: u8,
}

impl DataTypeInfo {
    /// Scalar type info with the engine's default tag and zeroed sizes.
    pub fn scalar(engine_type: EngineType) -> Self {
        Self {
            engine_type,
            native_tag: engine_type.default_native_tag(),
            object_type: None,
            db_size: 0,
            client_size: 0,
            char_size: 0,
            precision: 0,
            scale: 0,
            fs_precision: 0,
        }
    }
}

/// Type-info record of a named object type.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeInfo {
    pub schema: String,
    pub name: String,
    pub is_collection: bool,
    /// Element type, present iff `is_collection`.
    pub element: Option<DataTypeInfo>,
    pub num_attributes: u16,
}

/// Type-info record of one attribute.
#[derive(Debug, Clone, PartialEq)]
pub struct AttrInfo {
    pub name: String,
    pub type_info: DataTypeInfo,
}

// ---------------------------------------------------------------------------
// Native data
// ---------------------------------------------------------------------------

/// Payload of a [`NativeData`].
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Payload {
    #[default]
    Empty,
    Int64(i64),
    Uint64(u64),
    Float(f32),
    Double(f64),
    Boolean(bool),
    /// Byte buffer. When reading a NUMBER as bytes, `len()` is the maximum
    /// number of bytes the bridge may write.
    Bytes(Vec<u8>),
    Timestamp(NaiveDateTime),
    IntervalDs(TimeDelta),
    /// Borrowed object handle.
    Object(RawObjectHandle),
}

/// A value in the engine's native representation.
#[derive(Debug, Clone, PartialEq)]
pub struct NativeData {
    pub is_null: bool,
    pub payload: Payload,
}

impl Default for NativeData {
    fn default() -> Self {
        Self::null()
    }
}

impl NativeData {
    /// Null value without payload.
    pub fn null() -> Self {
        Self {
            is_null: true,
            payload: Payload::Empty,
        }
    }

    /// Non-null value with the given payload.
    pub fn with(payload: Payload) -> Self {
        Self {
            is_null: false,
            payload,
        }
    }

    /// Clear to null, keeping the byte buffer allocation.
    pub fn reset(&mut self) {
        self.is_null = true;
        match &mut self.payload {
            Payload::Bytes(buf) => buf.clear(),
            other => *other = Payload::Empty,
        }
    }

    /// Supply a zero-filled byte buffer of exactly `len` bytes, reusing the
    /// existing allocation.
    pub fn presize_bytes(&mut self, len: usize) {
        match &mut self.payload {
            Payload::Bytes(buf) => {
                buf.clear();
                buf.resize(len, 0);
            }
            other => *other = Payload::Bytes(vec![0; len]),
        }
    }

    /// Replace the byte payload with `src`, reusing the existing allocation.
    pub fn set_bytes(&mut self, src: &[u8]) {
        self.is_null = false;
        match &mut self.payload {
            Payload::Bytes(buf) => {
                buf.clear();
                buf.extend_from_slice(src);
            }
            other => *other = Payload::Bytes(src.to_vec()),
        }
    }

    /// Byte payload, if any.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match &self.payload {
            Payload::Bytes(buf) => Some(buf),
            _ => None,
        }
    }

    /// Allocated capacity of the byte buffer (0 without one).
    pub fn bytes_capacity(&self) -> usize {
        match &self.payload {
            Payload::Bytes(buf) => buf.capacity(),
            _ => 0,
        }
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Bare failure signal returned by every bridge call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Failure;

/// Result of a bridge call. The structured error is fetched separately with
/// [`Bridge::last_error`].
pub type Status<T = ()> = std::result::Result<T, Failure>;

/// Structured error reported by the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeError {
    pub code: i32,
    pub message: String,
}

impl BridgeError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for BridgeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DBO-{:05}: {}", self.code, self.message)
    }
}

impl std::error::Error for BridgeError {}

// ---------------------------------------------------------------------------
// Bridge trait
// ---------------------------------------------------------------------------

/// Primitive operations of the engine client consumed by the object type
/// system. All calls are synchronous.
pub trait Bridge: Send + Sync {
    /// Structured error of the last failed call on the current thread.
    fn last_error(&self) -> BridgeError;

    // -- types ---------------------------------------------------------------

    /// Look up a type by (already normalized) name, `SCHEMA.NAME` or `NAME`.
    fn get_object_type(&self, name: &str) -> Status<RawTypeHandle>;
    fn type_add_ref(&self, handle: RawTypeHandle) -> Status;
    fn type_release(&self, handle: RawTypeHandle) -> Status;
    fn type_info(&self, handle: RawTypeHandle) -> Status<TypeInfo>;
    /// Fresh attribute handles, `count` must equal `TypeInfo::num_attributes`.
    fn type_attributes(&self, handle: RawTypeHandle, count: u16) -> Status<Vec<RawAttrHandle>>;
    fn attr_info(&self, attr: RawAttrHandle) -> Status<AttrInfo>;
    fn attr_release(&self, attr: RawAttrHandle) -> Status;

    // -- objects -------------------------------------------------------------

    fn create_object(&self, handle: RawTypeHandle) -> Status<RawObjectHandle>;
    fn object_add_ref(&self, obj: RawObjectHandle) -> Status;
    fn object_release(&self, obj: RawObjectHandle) -> Status;
    fn get_attribute_value(
        &self,
        obj: RawObjectHandle,
        attr: RawAttrHandle,
        tag: NativeTag,
        data: &mut NativeData,
    ) -> Status;
    fn set_attribute_value(
        &self,
        obj: RawObjectHandle,
        attr: RawAttrHandle,
        tag: NativeTag,
        data: &NativeData,
    ) -> Status;

    // -- collections ---------------------------------------------------------

    fn append_element(&self, obj: RawObjectHandle, tag: NativeTag, data: &NativeData) -> Status;
    fn delete_element(&self, obj: RawObjectHandle, index: i32) -> Status;
    fn get_element(
        &self,
        obj: RawObjectHandle,
        index: i32,
        tag: NativeTag,
        data: &mut NativeData,
    ) -> Status;
    fn set_element(
        &self,
        obj: RawObjectHandle,
        index: i32,
        tag: NativeTag,
        data: &NativeData,
    ) -> Status;
    fn element_exists(&self, obj: RawObjectHandle, index: i32) -> Status<bool>;
    fn first_index(&self, obj: RawObjectHandle) -> Status<Option<i32>>;
    fn last_index(&self, obj: RawObjectHandle) -> Status<Option<i32>>;
    fn next_index(&self, obj: RawObjectHandle, index: i32) -> Status<Option<i32>>;
    fn size(&self, obj: RawObjectHandle) -> Status<i32>;
    fn trim(&self, obj: RawObjectHandle, count: u32) -> Status;
}
