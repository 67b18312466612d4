// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Tagged native value exchanged with the bridge.

use crate::bridge::{EngineType, NativeData, NativeTag, Payload};
use crate::error::{Error, Result};
use crate::object::{CollectionInstance, Datum, ObjectInstance, ObjectType};

/// A native payload together with its tag and (when known) its type.
///
/// `Value` is the unit of transfer for attribute and element reads and
/// writes. Reads bind the tag and type of the attribute or element; writes
/// of an untagged value take the attribute's or element's tag.
///
/// An object payload only borrows the engine handle: the value does not
/// keep the object alive. [`Value::get`] returns an owned instance.
#[derive(Debug, Default)]
pub struct Value {
    pub(crate) tag: Option<NativeTag>,
    pub(crate) object_type: Option<ObjectType>,
    pub(crate) data: NativeData,
}

impl Value {
    /// Null, untagged value.
    pub fn new() -> Self {
        Self::default()
    }

    /// Null value with an explicit tag.
    pub fn with_tag(tag: NativeTag) -> Self {
        Self {
            tag: Some(tag),
            ..Self::default()
        }
    }

    pub fn tag(&self) -> Option<NativeTag> {
        self.tag
    }

    /// Type bound by the last read, or by [`Value::set_object`].
    pub fn object_type(&self) -> Option<&ObjectType> {
        self.object_type.as_ref()
    }

    pub fn is_null(&self) -> bool {
        self.data.is_null
    }

    pub fn data(&self) -> &NativeData {
        &self.data
    }

    /// Raw access for callers doing their own marshaling.
    pub fn data_mut(&mut self) -> &mut NativeData {
        &mut self.data
    }

    /// Clear to null and untagged. The byte buffer allocation is kept.
    pub fn reset(&mut self) {
        self.tag = None;
        self.object_type = None;
        self.data.reset();
    }

    pub(crate) fn bind(&mut self, tag: NativeTag, object_type: ObjectType) {
        self.tag = Some(tag);
        self.object_type = Some(object_type);
    }

    fn put(&mut self, tag: NativeTag, payload: Payload) {
        self.tag = Some(tag);
        self.data.is_null = false;
        self.data.payload = payload;
    }

    /// Encode an application value.
    ///
    /// Text, byte strings and decimal text are carried as bytes. `Null`
    /// leaves the value untagged so the target's tag applies.
    pub fn set(&mut self, datum: &Datum) -> Result<()> {
        self.reset();
        match datum {
            Datum::Null => {}
            Datum::Bool(v) => self.put(NativeTag::Boolean, Payload::Boolean(*v)),
            Datum::Int64(v) => self.put(NativeTag::Int64, Payload::Int64(*v)),
            Datum::Uint64(v) => self.put(NativeTag::Uint64, Payload::Uint64(*v)),
            Datum::Float(v) => self.put(NativeTag::Float, Payload::Float(*v)),
            Datum::Double(v) => self.put(NativeTag::Double, Payload::Double(*v)),
            Datum::Text(s) | Datum::Number(s) => {
                self.tag = Some(NativeTag::Bytes);
                self.data.set_bytes(s.as_bytes());
            }
            Datum::Bytes(b) => {
                self.tag = Some(NativeTag::Bytes);
                self.data.set_bytes(b);
            }
            Datum::Timestamp(t) => self.put(NativeTag::Timestamp, Payload::Timestamp(*t)),
            Datum::Interval(d) => self.put(NativeTag::IntervalDs, Payload::IntervalDs(*d)),
            Datum::Object(object) => self.set_object(object)?,
            Datum::Collection(collection) => self.set_object(collection)?,
        }
        Ok(())
    }

    /// Reference `object` (borrowed; the engine adds its own reference when
    /// the value is stored).
    pub fn set_object(&mut self, object: &ObjectInstance) -> Result<()> {
        let handle = object.raw_handle()?;
        self.reset();
        self.put(NativeTag::Object, Payload::Object(handle));
        self.object_type = Some(object.object_type().clone());
        Ok(())
    }

    /// Decode into an application value.
    ///
    /// Bytes decode by engine type: NUMBER as decimal text, character types
    /// as UTF-8 text, anything else as raw bytes. Object payloads become an
    /// owned [`ObjectInstance`] (or [`CollectionInstance`]).
    pub fn get(&self) -> Result<Datum> {
        if self.data.is_null {
            return Ok(Datum::Null);
        }
        let tag = self
            .tag
            .ok_or_else(|| Error::Decode("value has no native tag".into()))?;

        let datum = match (tag, &self.data.payload) {
            (NativeTag::Boolean, Payload::Boolean(v)) => Datum::Bool(*v),
            (NativeTag::Int64, Payload::Int64(v)) => Datum::Int64(*v),
            (NativeTag::Uint64, Payload::Uint64(v)) => Datum::Uint64(*v),
            (NativeTag::Float, Payload::Float(v)) => Datum::Float(*v),
            (NativeTag::Double, Payload::Double(v)) => Datum::Double(*v),
            (NativeTag::Timestamp, Payload::Timestamp(t)) => Datum::Timestamp(*t),
            (NativeTag::IntervalDs, Payload::IntervalDs(d)) => Datum::Interval(*d),
            (NativeTag::Bytes, Payload::Bytes(buf)) => self.decode_bytes(buf)?,
            (NativeTag::Object, Payload::Object(handle)) => {
                let object_type = self.object_type.as_ref().ok_or_else(|| {
                    Error::Decode(format!("{} without object type", handle))
                })?;
                let object = ObjectInstance::from_raw(object_type, *handle)?;
                if object_type.is_collection() {
                    Datum::Collection(CollectionInstance::from_instance(object))
                } else {
                    Datum::Object(object)
                }
            }
            (tag, payload) => {
                return Err(Error::Decode(format!(
                    "payload {:?} does not match tag {}",
                    payload, tag
                )))
            }
        };
        Ok(datum)
    }

    fn decode_bytes(&self, buf: &[u8]) -> Result<Datum> {
        let engine_type = self.object_type.as_ref().map(ObjectType::engine_type);
        let text = |kind: &str| {
            String::from_utf8(buf.to_vec())
                .map_err(|e| Error::Decode(format!("{} is not valid UTF-8: {}", kind, e)))
        };
        Ok(match engine_type {
            Some(EngineType::Number) => Datum::Number(text("NUMBER")?),
            Some(ty) if ty.is_character() => Datum::Text(text(ty.sql_name())?),
            _ => Datum::Bytes(buf.to_vec()),
        })
    }

    /// Copy with an exact-size byte buffer, detached from this value's
    /// allocation.
    pub fn materialize(&self) -> Value {
        let payload = match &self.data.payload {
            Payload::Bytes(buf) => Payload::Bytes(buf.as_slice().to_vec()),
            other => other.clone(),
        };
        Value {
            tag: self.tag,
            object_type: self.object_type.clone(),
            data: NativeData {
                is_null: self.data.is_null,
                payload,
            },
        }
    }

    /// Value referencing `object`.
    pub fn from_object(object: &ObjectInstance) -> Result<Value> {
        let mut value = Value::default();
        value.set_object(object)?;
        Ok(value)
    }
}

impl TryFrom<&Datum> for Value {
    type Error = Error;

    fn try_from(datum: &Datum) -> Result<Self> {
        let mut value = Value::default();
        value.set(datum)?;
        Ok(value)
    }
}
