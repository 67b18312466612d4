// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Instances of structured object types.

use crate::bridge::{Bridge, RawObjectHandle};
use crate::config::DECIMAL_BUFFER_WIDTH;
use crate::error::{Error, Result, StatusExt};
use crate::object::{CollectionInstance, Datum, Lifecycle, ObjectType, Value};
use std::fmt;

/// A live object value owned by the caller.
///
/// The instance holds one reference to the engine object and releases it on
/// [`close`](Self::close) or drop. It also owns a scratch [`Value`] reused by
/// [`get_attribute`](Self::get_attribute) and the typed setters, so repeated
/// reads do not reallocate.
///
/// Instances are not internally synchronized; mutating calls take `&mut self`.
pub struct ObjectInstance {
    object_type: ObjectType,
    handle: Option<RawObjectHandle>,
    scratch: Value,
}

impl ObjectInstance {
    /// Take over a handle that already carries a reference for us.
    pub(crate) fn adopt(object_type: ObjectType, handle: RawObjectHandle) -> Self {
        Self {
            object_type,
            handle: Some(handle),
            scratch: Value::default(),
        }
    }

    /// Wrap a borrowed engine handle of the given type, adding a reference.
    pub fn from_raw(object_type: &ObjectType, handle: RawObjectHandle) -> Result<Self> {
        object_type.ensure_bound("wrap object")?;
        let bridge = object_type.bridge();
        bridge
            .object_add_ref(handle)
            .at(bridge, || format!("{}.add_ref({})", object_type, handle))?;
        Ok(Self::adopt(object_type.clone(), handle))
    }

    pub fn object_type(&self) -> &ObjectType {
        &self.object_type
    }

    pub fn is_collection(&self) -> bool {
        self.object_type.is_collection()
    }

    pub fn lifecycle(&self) -> Lifecycle {
        if self.handle.is_some() {
            Lifecycle::Bound
        } else {
            Lifecycle::Closed
        }
    }

    /// Engine handle; `InvalidState` once closed.
    pub fn raw_handle(&self) -> Result<RawObjectHandle> {
        self.handle.ok_or_else(|| {
            Error::invalid_state(format!("{} instance is closed", self.object_type))
        })
    }

    pub(crate) fn bridge(&self) -> &dyn Bridge {
        self.object_type.bridge()
    }

    /// Value filled by the last [`get_attribute`](Self::get_attribute).
    pub fn scratch(&self) -> &Value {
        &self.scratch
    }

    pub(crate) fn scratch_mut(&mut self) -> &mut Value {
        &mut self.scratch
    }

    pub(crate) fn split_scratch(&mut self) -> (&ObjectType, Option<RawObjectHandle>, &mut Value) {
        (&self.object_type, self.handle, &mut self.scratch)
    }

    // -- attributes ----------------------------------------------------------

    /// Read attribute `name` into the internal scratch value.
    ///
    /// The returned value is overwritten by the next read on this instance.
    pub fn get_attribute(&mut self, name: &str) -> Result<&Value> {
        let handle = self.raw_handle()?;
        read_attribute(&self.object_type, handle, &mut self.scratch, name)?;
        Ok(&self.scratch)
    }

    /// Read attribute `name` into a caller-provided value.
    pub fn get_attribute_into(&self, value: &mut Value, name: &str) -> Result<()> {
        let handle = self.raw_handle()?;
        read_attribute(&self.object_type, handle, value, name)
    }

    /// Read attribute `name` and convert it to a [`Datum`].
    pub fn get(&mut self, name: &str) -> Result<Datum> {
        self.get_attribute(name)?;
        self.scratch.get()
    }

    /// Write `value` into attribute `name`. An untagged value takes the
    /// attribute's native tag.
    pub fn set_attribute(&mut self, name: &str, value: &mut Value) -> Result<()> {
        let handle = self.raw_handle()?;
        write_attribute(&self.object_type, handle, value, name)
    }

    /// Set attribute `name` from any application value.
    ///
    /// ```rust,ignore
    /// address.set("STREET", "Main St")?;
    /// address.set("ZIP", "12345")?;
    /// address.set("NOTE", Datum::Null)?;
    /// ```
    pub fn set(&mut self, name: &str, value: impl Into<Datum>) -> Result<()> {
        let handle = self.raw_handle()?;
        let datum = value.into();
        self.scratch.set(&datum)?;
        write_attribute(&self.object_type, handle, &mut self.scratch, name)
    }

    /// Store a reference to `object` in attribute `name`.
    pub fn set_object(&mut self, name: &str, object: &ObjectInstance) -> Result<()> {
        let handle = self.raw_handle()?;
        self.scratch.set_object(object)?;
        write_attribute(&self.object_type, handle, &mut self.scratch, name)
    }

    /// Set every attribute to null with its native tag.
    ///
    /// NUMBER attributes read as bytes get a buffer pre-sized to the
    /// declared precision, so later reads have room for the decimal text.
    pub fn reset_attributes(&mut self) -> Result<()> {
        let handle = self.raw_handle()?;
        self.object_type.ensure_bound("reset_attributes")?;
        let Some(attributes) = self.object_type.attributes() else {
            return Ok(());
        };

        let bridge = self.object_type.bridge();
        let mut value = Value::default();
        for attr in attributes.values() {
            value.reset();
            value.bind(attr.native_tag(), attr.object_type().clone());
            if attr.needs_decimal_buffer() {
                let width = match attr.precision() {
                    p if p > 0 => p as usize,
                    _ => DECIMAL_BUFFER_WIDTH,
                };
                value.data.presize_bytes(width);
            }
            bridge
                .set_attribute_value(handle, attr.raw_handle(), attr.native_tag(), &value.data)
                .at(bridge, || {
                    format!("reset_attributes({}.{})", self.object_type, attr.name())
                })?;
        }
        Ok(())
    }

    // -- lifecycle -----------------------------------------------------------

    /// Another owned reference to the same engine object.
    pub fn try_clone(&self) -> Result<Self> {
        let handle = self.raw_handle()?;
        Self::from_raw(&self.object_type, handle)
    }

    /// View this instance as a collection. Fails with `NotCollection` (and
    /// releases the instance) unless its type is a collection type.
    pub fn into_collection(self) -> Result<CollectionInstance> {
        if !self.object_type.is_collection() {
            return Err(Error::NotCollection(self.object_type.full_name()));
        }
        Ok(CollectionInstance::from_instance(self))
    }

    /// Release the engine reference. Idempotent: the second call is a no-op,
    /// and a failed release is not retried.
    pub fn close(&mut self) -> Result<()> {
        let Some(handle) = self.handle.take() else {
            return Ok(());
        };
        let bridge = self.object_type.bridge();
        bridge
            .object_release(handle)
            .at(bridge, || format!("{}.release({})", self.object_type, handle))
    }
}

impl Drop for ObjectInstance {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            let bridge = self.object_type.bridge();
            if bridge.object_release(handle).is_err() {
                log::warn!(
                    "[ObjectInstance] release of {} ({}) failed on drop: {}",
                    handle,
                    self.object_type,
                    bridge.last_error()
                );
            }
        }
    }
}

impl fmt::Debug for ObjectInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectInstance")
            .field("type", &self.object_type.full_name())
            .field("handle", &self.handle)
            .finish()
    }
}

pub(crate) fn read_attribute(
    object_type: &ObjectType,
    handle: RawObjectHandle,
    value: &mut Value,
    name: &str,
) -> Result<()> {
    let attr = object_type.attribute(name)?;
    value.reset();
    value.bind(attr.native_tag(), attr.object_type().clone());
    if attr.needs_decimal_buffer() {
        value.data.presize_bytes(DECIMAL_BUFFER_WIDTH);
    }
    let bridge = object_type.bridge();
    bridge
        .get_attribute_value(handle, attr.raw_handle(), attr.native_tag(), &mut value.data)
        .at(bridge, || format!("get_attribute({}.{})", object_type, attr.name()))
}

pub(crate) fn write_attribute(
    object_type: &ObjectType,
    handle: RawObjectHandle,
    value: &mut Value,
    name: &str,
) -> Result<()> {
    let attr = object_type.attribute(name)?;
    let tag = *value.tag.get_or_insert(attr.native_tag());
    if value.object_type.is_none() {
        value.object_type = Some(attr.object_type().clone());
    }
    let bridge = object_type.bridge();
    bridge
        .set_attribute_value(handle, attr.raw_handle(), tag, &value.data)
        .at(bridge, || {
            format!("set_attribute({}.{}, {})", object_type, attr.name(), tag)
        })
}
