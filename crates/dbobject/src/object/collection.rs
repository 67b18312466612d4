// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Collection instances: ordered, possibly sparse, integer-indexed elements.
//!
//! Indices are engine-assigned. After deletions the index set may have gaps,
//! so iteration goes through [`first`](CollectionInstance::first) and
//! [`next`](CollectionInstance::next) (or [`indices`](CollectionInstance::indices))
//! rather than counting from zero.

use crate::bridge::{NativeTag, RawObjectHandle};
use crate::config::DECIMAL_BUFFER_WIDTH;
use crate::error::{Error, Partial, Result, StatusExt};
use crate::object::{Datum, FromDatum, ObjectInstance, ObjectType, Value};
use std::fmt;
use std::ops::{Deref, DerefMut};

/// An [`ObjectInstance`] of a collection type.
///
/// Dereferences to the underlying instance for lifecycle operations
/// (`close`, `raw_handle`, `object_type`).
pub struct CollectionInstance {
    object: ObjectInstance,
}

impl CollectionInstance {
    /// Caller guarantees the instance's type is a collection type.
    pub(crate) fn from_instance(object: ObjectInstance) -> Self {
        Self { object }
    }

    pub fn into_object(self) -> ObjectInstance {
        self.object
    }

    /// Element type of the collection.
    pub fn element_type(&self) -> Result<ObjectType> {
        self.object.object_type().collection_of().ok_or_else(|| {
            Error::invalid_state(format!(
                "{} has no element type",
                self.object.object_type()
            ))
        })
    }

    fn element_tag(&self) -> Result<NativeTag> {
        Ok(self.element_type()?.native_tag())
    }

    /// Another owned reference to the same collection.
    pub fn try_clone(&self) -> Result<Self> {
        Ok(Self::from_instance(self.object.try_clone()?))
    }

    // -- writes --------------------------------------------------------------

    /// Append at index `last + 1` (0 when empty).
    pub fn append(&mut self, value: impl Into<Datum>) -> Result<()> {
        let datum = value.into();
        let tag = self.element_tag()?;
        let (object_type, handle, scratch) = self.object.split_scratch();
        scratch.set(&datum)?;
        append_raw(object_type, handle, scratch, tag)
    }

    /// Append a prepared value. An untagged value takes the element tag.
    pub fn append_value(&mut self, value: &mut Value) -> Result<()> {
        let tag = self.element_tag()?;
        let (object_type, handle, _) = self.object.split_scratch();
        append_raw(object_type, handle, value, tag)
    }

    /// Append a reference to `object`.
    pub fn append_object(&mut self, object: &ObjectInstance) -> Result<()> {
        let tag = self.element_tag()?;
        let (object_type, handle, scratch) = self.object.split_scratch();
        scratch.set_object(object)?;
        append_raw(object_type, handle, scratch, tag)
    }

    /// Delete the element at `index`, leaving a gap.
    pub fn delete(&mut self, index: i32) -> Result<()> {
        let handle = self.object.raw_handle()?;
        let bridge = self.object.bridge();
        bridge
            .delete_element(handle, index)
            .at(bridge, || format!("{}.delete({})", self.object.object_type(), index))
    }

    /// Overwrite the existing element at `index`; `NotExist` if absent.
    pub fn set_item(&mut self, index: i32, value: &mut Value) -> Result<()> {
        let tag = self.element_tag()?;
        let (object_type, handle, _) = self.object.split_scratch();
        write_element(object_type, handle, index, value, tag)
    }

    /// Overwrite the element at `index` from an application value.
    pub fn set(&mut self, index: i32, value: impl Into<Datum>) -> Result<()> {
        let datum = value.into();
        let tag = self.element_tag()?;
        let (object_type, handle, scratch) = self.object.split_scratch();
        scratch.set(&datum)?;
        write_element(object_type, handle, index, scratch, tag)
    }

    /// Remove `count` elements from the end.
    pub fn trim(&mut self, count: u32) -> Result<()> {
        let handle = self.object.raw_handle()?;
        let bridge = self.object.bridge();
        bridge
            .trim(handle, count)
            .at(bridge, || format!("{}.trim({})", self.object.object_type(), count))
    }

    // -- reads ---------------------------------------------------------------

    /// Read the element at `index` into a caller-provided value.
    pub fn get_item_into(&self, value: &mut Value, index: i32) -> Result<()> {
        let element = self.element_type()?;
        let handle = self.object.raw_handle()?;
        if !self.exists(index)? {
            return Err(Error::NotExist(Some(index)));
        }
        value.reset();
        value.bind(element.native_tag(), element.clone());
        if element.needs_decimal_buffer() {
            value.data.presize_bytes(DECIMAL_BUFFER_WIDTH);
        }
        let bridge = self.object.bridge();
        bridge
            .get_element(handle, index, element.native_tag(), &mut value.data)
            .at(bridge, || format!("{}.get({})", self.object.object_type(), index))
    }

    /// Read the element at `index` into the internal scratch value.
    pub fn get_item(&mut self, index: i32) -> Result<&Value> {
        let mut scratch = std::mem::take(self.object.scratch_mut());
        let result = self.get_item_into(&mut scratch, index);
        *self.object.scratch_mut() = scratch;
        result?;
        Ok(&*self.object.scratch_mut())
    }

    /// Read and decode the element at `index`.
    pub fn get(&mut self, index: i32) -> Result<Datum> {
        self.get_item(index)?.get()
    }

    pub fn exists(&self, index: i32) -> Result<bool> {
        let handle = self.object.raw_handle()?;
        let bridge = self.object.bridge();
        bridge
            .element_exists(handle, index)
            .at(bridge, || format!("{}.exists({})", self.object.object_type(), index))
    }

    /// Lowest index; `NotExist` when empty.
    pub fn first(&self) -> Result<i32> {
        let handle = self.object.raw_handle()?;
        let bridge = self.object.bridge();
        bridge
            .first_index(handle)
            .at(bridge, || format!("{}.first", self.object.object_type()))?
            .ok_or(Error::NotExist(None))
    }

    /// Highest index; `NotExist` when empty.
    pub fn last(&self) -> Result<i32> {
        let handle = self.object.raw_handle()?;
        let bridge = self.object.bridge();
        bridge
            .last_index(handle)
            .at(bridge, || format!("{}.last", self.object.object_type()))?
            .ok_or(Error::NotExist(None))
    }

    /// Next index after `index`; `NotExist` at the end.
    pub fn next(&self, index: i32) -> Result<i32> {
        let handle = self.object.raw_handle()?;
        let bridge = self.object.bridge();
        bridge
            .next_index(handle, index)
            .at(bridge, || format!("{}.next({})", self.object.object_type(), index))?
            .ok_or(Error::NotExist(Some(index)))
    }

    /// Number of elements currently present (gaps not counted).
    pub fn len(&self) -> Result<usize> {
        let handle = self.object.raw_handle()?;
        let bridge = self.object.bridge();
        let size = bridge
            .size(handle)
            .at(bridge, || format!("{}.len", self.object.object_type()))?;
        Ok(usize::try_from(size).unwrap_or(0))
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Iterator over present indices in ascending order.
    pub fn indices(&self) -> Indices<'_> {
        Indices {
            collection: self,
            cursor: Cursor::Start,
        }
    }

    /// Decode every element, in index order, appending to `dest`.
    ///
    /// On failure `dest` keeps the elements decoded so far.
    pub fn extend_into<T: FromDatum>(&mut self, dest: &mut Vec<T>) -> Result<()> {
        let mut index = match self.first() {
            Ok(index) => index,
            Err(e) if e.is_not_exist() => return Ok(()),
            Err(e) => return Err(e),
        };
        dest.reserve(self.len()?);
        loop {
            let datum = self.get(index)?;
            dest.push(T::from_datum(datum)?);
            index = match self.next(index) {
                Ok(next) => next,
                Err(e) if e.is_not_exist() => return Ok(()),
                Err(e) => return Err(e),
            };
        }
    }

    /// Decode every element into a fresh vector.
    ///
    /// ```rust,ignore
    /// let zips: Vec<i64> = list.to_vec()?;
    /// let addresses: Vec<ObjectInstance> = list.to_vec()?;
    /// ```
    pub fn to_vec<T: FromDatum>(&mut self) -> std::result::Result<Vec<T>, Partial<Vec<T>>> {
        let mut out = Vec::new();
        match self.extend_into(&mut out) {
            Ok(()) => Ok(out),
            Err(source) => Err(Partial {
                partial: out,
                source,
            }),
        }
    }
}

impl Deref for CollectionInstance {
    type Target = ObjectInstance;

    fn deref(&self) -> &ObjectInstance {
        &self.object
    }
}

impl DerefMut for CollectionInstance {
    fn deref_mut(&mut self) -> &mut ObjectInstance {
        &mut self.object
    }
}

impl fmt::Debug for CollectionInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CollectionInstance")
            .field("type", &self.object.object_type().full_name())
            .field("handle", &self.object.raw_handle().ok())
            .finish()
    }
}

enum Cursor {
    Start,
    At(i32),
    Done,
}

/// Present indices of a collection, see [`CollectionInstance::indices`].
pub struct Indices<'a> {
    collection: &'a CollectionInstance,
    cursor: Cursor,
}

impl Iterator for Indices<'_> {
    type Item = Result<i32>;

    fn next(&mut self) -> Option<Self::Item> {
        let step = match self.cursor {
            Cursor::Start => self.collection.first(),
            Cursor::At(index) => self.collection.next(index),
            Cursor::Done => return None,
        };
        match step {
            Ok(index) => {
                self.cursor = Cursor::At(index);
                Some(Ok(index))
            }
            Err(e) if e.is_not_exist() => {
                self.cursor = Cursor::Done;
                None
            }
            Err(e) => {
                self.cursor = Cursor::Done;
                Some(Err(e))
            }
        }
    }
}

fn open_handle(object_type: &ObjectType, handle: Option<RawObjectHandle>) -> Result<RawObjectHandle> {
    handle.ok_or_else(|| Error::invalid_state(format!("{} instance is closed", object_type)))
}

fn append_raw(
    object_type: &ObjectType,
    handle: Option<RawObjectHandle>,
    value: &mut Value,
    element_tag: NativeTag,
) -> Result<()> {
    let handle = open_handle(object_type, handle)?;
    let tag = *value.tag.get_or_insert(element_tag);
    let bridge = object_type.bridge();
    bridge
        .append_element(handle, tag, &value.data)
        .at(bridge, || format!("{}.append({})", object_type, tag))
}

fn write_element(
    object_type: &ObjectType,
    handle: Option<RawObjectHandle>,
    index: i32,
    value: &mut Value,
    element_tag: NativeTag,
) -> Result<()> {
    let handle = open_handle(object_type, handle)?;
    let bridge = object_type.bridge();
    let exists = bridge
        .element_exists(handle, index)
        .at(bridge, || format!("{}.exists({})", object_type, index))?;
    if !exists {
        return Err(Error::NotExist(Some(index)));
    }
    let tag = *value.tag.get_or_insert(element_tag);
    bridge
        .set_element(handle, index, tag, &value.data)
        .at(bridge, || format!("{}.set({}, {})", object_type, index, tag))
}
