// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Handle tables and object storage of the in-memory engine.

use super::catalog::{Catalog, DataTypeDef, TypeDef};
use super::convert::{self, Outcome};
use super::{codes, FailPoint, HandleCounts};
use crate::bridge::{
    AttrInfo, BridgeError, NativeData, NativeTag, Payload, RawAttrHandle, RawObjectHandle,
    RawTypeHandle, TypeInfo,
};
use std::collections::{BTreeMap, HashMap};
use std::num::NonZeroU64;

struct TypeEntry {
    def: usize,
    refs: u32,
    /// Element type handle, handed out (borrowed) by `type_info`.
    element: Option<RawTypeHandle>,
}

struct AttrEntry {
    def: usize,
    position: usize,
    refs: u32,
    /// Nested type handle, handed out (borrowed) by `attr_info`.
    nested: Option<RawTypeHandle>,
}

#[derive(Clone)]
enum Body {
    /// `None` until the attribute is first written.
    Struct(Vec<Option<NativeData>>),
    Collection(BTreeMap<i32, NativeData>),
}

impl Body {
    /// Embedded objects owned by this body.
    fn embedded(&self) -> Vec<RawObjectHandle> {
        match self {
            Body::Struct(slots) => slots.iter().flatten().filter_map(embedded_object).collect(),
            Body::Collection(elements) => elements.values().filter_map(embedded_object).collect(),
        }
    }
}

struct ObjectEntry {
    def: usize,
    refs: u32,
    body: Body,
}

fn embedded_object(data: &NativeData) -> Option<RawObjectHandle> {
    match data.payload {
        Payload::Object(handle) if !data.is_null => Some(handle),
        _ => None,
    }
}

fn invalid_handle(kind: &str, handle: impl std::fmt::Display) -> BridgeError {
    BridgeError::new(
        codes::INVALID_HANDLE,
        format!("invalid {} handle {}", kind, handle),
    )
}

fn no_such_element(index: i32) -> BridgeError {
    BridgeError::new(
        codes::NO_SUCH_ELEMENT,
        format!("element at index {} does not exist", index),
    )
}

fn definition(catalog: &Catalog, def: usize) -> Outcome<&TypeDef> {
    catalog.by_index(def).ok_or_else(|| {
        BridgeError::new(codes::TYPE_NOT_FOUND, format!("type #{} does not exist", def))
    })
}

#[derive(Default)]
pub(super) struct State {
    next_id: u64,
    types: HashMap<RawTypeHandle, TypeEntry>,
    attrs: HashMap<RawAttrHandle, AttrEntry>,
    objects: HashMap<RawObjectHandle, ObjectEntry>,
    armed: Vec<(FailPoint, usize)>,
}

impl State {
    fn alloc(&mut self) -> NonZeroU64 {
        let id = NonZeroU64::MIN.saturating_add(self.next_id);
        self.next_id += 1;
        id
    }

    pub(super) fn counts(&self) -> HandleCounts {
        HandleCounts {
            types: self.types.len(),
            attrs: self.attrs.len(),
            objects: self.objects.len(),
        }
    }

    // -- failure injection ---------------------------------------------------

    pub(super) fn arm(&mut self, point: FailPoint, skip: usize) {
        self.armed.push((point, skip));
    }

    pub(super) fn disarm(&mut self) {
        self.armed.clear();
    }

    /// True if this call of `point` must fail.
    pub(super) fn trip(&mut self, point: FailPoint) -> bool {
        let Some(pos) = self.armed.iter().position(|(p, _)| *p == point) else {
            return false;
        };
        if self.armed[pos].1 == 0 {
            self.armed.remove(pos);
            true
        } else {
            self.armed[pos].1 -= 1;
            false
        }
    }

    // -- types ---------------------------------------------------------------

    fn new_type_handle(&mut self, def: usize) -> RawTypeHandle {
        let handle = RawTypeHandle::new(self.alloc());
        self.types.insert(
            handle,
            TypeEntry {
                def,
                refs: 1,
                element: None,
            },
        );
        handle
    }

    fn type_handle_for(&mut self, catalog: &Catalog, target: &str) -> Outcome<RawTypeHandle> {
        let def = catalog.index_of(target).ok_or_else(|| {
            BridgeError::new(
                codes::TYPE_NOT_FOUND,
                format!("type {} does not exist", target),
            )
        })?;
        Ok(self.new_type_handle(def))
    }

    pub(super) fn get_object_type(
        &mut self,
        catalog: &Catalog,
        name: &str,
    ) -> Outcome<RawTypeHandle> {
        let handle = self.type_handle_for(catalog, name)?;
        log::trace!("[MemoryBridge] get_object_type({}) -> {}", name, handle);
        Ok(handle)
    }

    pub(super) fn type_add_ref(&mut self, handle: RawTypeHandle) -> Outcome<()> {
        let entry = self
            .types
            .get_mut(&handle)
            .ok_or_else(|| invalid_handle("type", handle))?;
        entry.refs += 1;
        Ok(())
    }

    pub(super) fn type_release(&mut self, handle: RawTypeHandle) -> Outcome<()> {
        if !self.types.contains_key(&handle) {
            return Err(invalid_handle("type", handle));
        }
        let mut pending = Some(handle);
        while let Some(next) = pending.take() {
            let Some(entry) = self.types.get_mut(&next) else {
                break;
            };
            entry.refs -= 1;
            if entry.refs == 0 {
                pending = self.types.remove(&next).and_then(|e| e.element);
            }
        }
        Ok(())
    }

    pub(super) fn type_info(&mut self, catalog: &Catalog, handle: RawTypeHandle) -> Outcome<TypeInfo> {
        let (def_index, element_handle) = {
            let entry = self
                .types
                .get(&handle)
                .ok_or_else(|| invalid_handle("type", handle))?;
            (entry.def, entry.element)
        };
        let def = definition(catalog, def_index)?;

        let element = match def.element() {
            None => None,
            Some(data_type) => {
                let mut info = data_type.to_info();
                if let DataTypeDef::Object(target) = data_type {
                    let nested = match element_handle {
                        Some(existing) => existing,
                        None => {
                            let created = self.type_handle_for(catalog, target)?;
                            if let Some(entry) = self.types.get_mut(&handle) {
                                entry.element = Some(created);
                            }
                            created
                        }
                    };
                    info.object_type = Some(nested);
                }
                Some(info)
            }
        };

        Ok(TypeInfo {
            schema: def.schema.clone(),
            name: def.name.clone(),
            is_collection: def.is_collection(),
            element,
            num_attributes: u16::try_from(def.attributes().len()).unwrap_or(u16::MAX),
        })
    }

    pub(super) fn type_attributes(
        &mut self,
        catalog: &Catalog,
        handle: RawTypeHandle,
        count: u16,
    ) -> Outcome<Vec<RawAttrHandle>> {
        let def_index = self
            .types
            .get(&handle)
            .ok_or_else(|| invalid_handle("type", handle))?
            .def;
        let def = definition(catalog, def_index)?;
        let attributes = def.attributes();
        if attributes.len() != usize::from(count) {
            return Err(BridgeError::new(
                codes::ATTRIBUTE_COUNT,
                format!(
                    "{} has {} attributes, {} requested",
                    def.full_name(),
                    attributes.len(),
                    count
                ),
            ));
        }

        let mut handles = Vec::with_capacity(attributes.len());
        for (position, attr) in attributes.iter().enumerate() {
            let nested = match &attr.data_type {
                DataTypeDef::Object(target) => Some(self.type_handle_for(catalog, target)?),
                DataTypeDef::Scalar { .. } => None,
            };
            let attr_handle = RawAttrHandle::new(self.alloc());
            self.attrs.insert(
                attr_handle,
                AttrEntry {
                    def: def_index,
                    position,
                    refs: 1,
                    nested,
                },
            );
            handles.push(attr_handle);
        }
        Ok(handles)
    }

    pub(super) fn attr_info(&self, catalog: &Catalog, attr: RawAttrHandle) -> Outcome<AttrInfo> {
        let entry = self
            .attrs
            .get(&attr)
            .ok_or_else(|| invalid_handle("attribute", attr))?;
        let def = definition(catalog, entry.def)?;
        let attr_def = def
            .attributes()
            .get(entry.position)
            .ok_or_else(|| invalid_handle("attribute", attr))?;
        let mut type_info = attr_def.data_type.to_info();
        type_info.object_type = entry.nested;
        Ok(AttrInfo {
            name: attr_def.name.clone(),
            type_info,
        })
    }

    pub(super) fn attr_release(&mut self, attr: RawAttrHandle) -> Outcome<()> {
        let entry = self
            .attrs
            .get_mut(&attr)
            .ok_or_else(|| invalid_handle("attribute", attr))?;
        entry.refs -= 1;
        if entry.refs == 0 {
            let nested = self.attrs.remove(&attr).and_then(|e| e.nested);
            if let Some(nested) = nested {
                self.type_release(nested)?;
            }
        }
        Ok(())
    }

    // -- objects -------------------------------------------------------------

    fn insert_object(&mut self, def: usize, body: Body) -> RawObjectHandle {
        let handle = RawObjectHandle::new(self.alloc());
        self.objects.insert(
            handle,
            ObjectEntry {
                def,
                refs: 1,
                body,
            },
        );
        handle
    }

    pub(super) fn create_object(
        &mut self,
        catalog: &Catalog,
        handle: RawTypeHandle,
    ) -> Outcome<RawObjectHandle> {
        let def_index = self
            .types
            .get(&handle)
            .ok_or_else(|| invalid_handle("type", handle))?
            .def;
        let def = definition(catalog, def_index)?;
        let body = if def.is_collection() {
            Body::Collection(BTreeMap::new())
        } else {
            Body::Struct(vec![None; def.attributes().len()])
        };
        let obj = self.insert_object(def_index, body);
        log::trace!("[MemoryBridge] created {} of {}", obj, def.full_name());
        Ok(obj)
    }

    pub(super) fn object_add_ref(&mut self, obj: RawObjectHandle) -> Outcome<()> {
        let entry = self
            .objects
            .get_mut(&obj)
            .ok_or_else(|| invalid_handle("object", obj))?;
        entry.refs += 1;
        Ok(())
    }

    pub(super) fn object_release(&mut self, obj: RawObjectHandle) -> Outcome<()> {
        if !self.objects.contains_key(&obj) {
            return Err(invalid_handle("object", obj));
        }
        self.release_objects(vec![obj]);
        Ok(())
    }

    /// Drop one reference of each; freed objects release what they embed.
    fn release_objects(&mut self, mut pending: Vec<RawObjectHandle>) {
        while let Some(next) = pending.pop() {
            let Some(entry) = self.objects.get_mut(&next) else {
                continue;
            };
            entry.refs -= 1;
            if entry.refs == 0 {
                if let Some(freed) = self.objects.remove(&next) {
                    pending.extend(freed.body.embedded());
                }
            }
        }
    }

    fn release_data(&mut self, data: Option<NativeData>) {
        if let Some(handle) = data.as_ref().and_then(embedded_object) {
            self.release_objects(vec![handle]);
        }
    }

    /// Deep copy of `src`, owned by the caller.
    fn copy_object(&mut self, src: RawObjectHandle) -> Outcome<RawObjectHandle> {
        let (def, body) = {
            let entry = self
                .objects
                .get(&src)
                .ok_or_else(|| invalid_handle("object", src))?;
            (entry.def, entry.body.clone())
        };
        let body = match body {
            Body::Struct(slots) => {
                let mut copied = Vec::with_capacity(slots.len());
                for slot in slots {
                    copied.push(match slot {
                        Some(data) => Some(self.copy_data(data)?),
                        None => None,
                    });
                }
                Body::Struct(copied)
            }
            Body::Collection(elements) => {
                let mut copied = BTreeMap::new();
                for (index, data) in elements {
                    copied.insert(index, self.copy_data(data)?);
                }
                Body::Collection(copied)
            }
        };
        Ok(self.insert_object(def, body))
    }

    fn copy_data(&mut self, data: NativeData) -> Outcome<NativeData> {
        match embedded_object(&data) {
            Some(handle) => Ok(NativeData::with(Payload::Object(self.copy_object(handle)?))),
            None => Ok(data),
        }
    }

    /// Convert an incoming value to its stored form.
    fn encode(
        &mut self,
        catalog: &Catalog,
        data_type: &DataTypeDef,
        tag: NativeTag,
        data: &NativeData,
    ) -> Outcome<NativeData> {
        if data.is_null {
            return Ok(NativeData::null());
        }
        match data_type {
            DataTypeDef::Scalar {
                engine_type, size, ..
            } => convert::store(*engine_type, *size, tag, data).map(NativeData::with),
            DataTypeDef::Object(target) => {
                if tag != NativeTag::Object {
                    return Err(BridgeError::new(
                        codes::CONVERSION,
                        format!("object type {} cannot be set from native type {}", target, tag),
                    ));
                }
                let Payload::Object(src) = data.payload else {
                    return Err(BridgeError::new(
                        codes::PAYLOAD_MISMATCH,
                        format!("payload {:?} does not match native type {}", data.payload, tag),
                    ));
                };
                let src_def = self
                    .objects
                    .get(&src)
                    .ok_or_else(|| invalid_handle("object", src))?
                    .def;
                if catalog.index_of(target) != Some(src_def) {
                    let actual = definition(catalog, src_def)?.full_name();
                    return Err(BridgeError::new(
                        codes::WRONG_OBJECT_TYPE,
                        format!("expected an object of type {}, got {}", target, actual),
                    ));
                }
                let copy = self.copy_object(src)?;
                Ok(NativeData::with(Payload::Object(copy)))
            }
        }
    }

    /// Convert a stored value to `tag` into `out`.
    fn decode(
        data_type: &DataTypeDef,
        tag: NativeTag,
        stored: &NativeData,
        out: &mut NativeData,
    ) -> Outcome<()> {
        if stored.is_null {
            out.reset();
            return Ok(());
        }
        match data_type {
            DataTypeDef::Scalar { engine_type, .. } => {
                convert::load(*engine_type, tag, &stored.payload, out)
            }
            DataTypeDef::Object(target) => {
                if tag != NativeTag::Object {
                    return Err(BridgeError::new(
                        codes::CONVERSION,
                        format!("object type {} cannot be read as native type {}", target, tag),
                    ));
                }
                out.is_null = false;
                out.payload = stored.payload.clone();
                Ok(())
            }
        }
    }

    // -- attributes ----------------------------------------------------------

    /// Declaring type and position of `attr`, checked against `obj`'s type.
    fn locate<'c>(
        &self,
        catalog: &'c Catalog,
        obj: RawObjectHandle,
        attr: RawAttrHandle,
    ) -> Outcome<(usize, &'c DataTypeDef)> {
        let attr_entry = self
            .attrs
            .get(&attr)
            .ok_or_else(|| invalid_handle("attribute", attr))?;
        let obj_entry = self
            .objects
            .get(&obj)
            .ok_or_else(|| invalid_handle("object", obj))?;
        let def = definition(catalog, attr_entry.def)?;
        if obj_entry.def != attr_entry.def {
            let actual = definition(catalog, obj_entry.def)?.full_name();
            return Err(BridgeError::new(
                codes::WRONG_OBJECT_TYPE,
                format!(
                    "attribute of {} used on an object of type {}",
                    def.full_name(),
                    actual
                ),
            ));
        }
        let attr_def = def
            .attributes()
            .get(attr_entry.position)
            .ok_or_else(|| invalid_handle("attribute", attr))?;
        Ok((attr_entry.position, &attr_def.data_type))
    }

    pub(super) fn get_attribute(
        &mut self,
        catalog: &Catalog,
        obj: RawObjectHandle,
        attr: RawAttrHandle,
        tag: NativeTag,
        out: &mut NativeData,
    ) -> Outcome<()> {
        let (position, data_type) = self.locate(catalog, obj, attr)?;
        let slot = match self.objects.get(&obj).map(|e| &e.body) {
            Some(Body::Struct(slots)) => slots.get(position).and_then(Option::as_ref),
            _ => None,
        };
        let stored = slot.ok_or_else(|| {
            BridgeError::new(
                codes::NOT_INITIALIZED,
                format!("attribute at position {} is not initialized", position),
            )
        })?;
        Self::decode(data_type, tag, stored, out)
    }

    pub(super) fn set_attribute(
        &mut self,
        catalog: &Catalog,
        obj: RawObjectHandle,
        attr: RawAttrHandle,
        tag: NativeTag,
        data: &NativeData,
    ) -> Outcome<()> {
        let (position, data_type) = self.locate(catalog, obj, attr)?;
        let stored = self.encode(catalog, data_type, tag, data)?;
        let previous = match self.objects.get_mut(&obj).map(|e| &mut e.body) {
            Some(Body::Struct(slots)) if position < slots.len() => {
                slots[position].replace(stored)
            }
            _ => {
                self.release_data(Some(stored));
                return Err(invalid_handle("attribute", attr));
            }
        };
        self.release_data(previous);
        Ok(())
    }

    // -- collections ---------------------------------------------------------

    fn collection_type<'c>(
        &self,
        catalog: &'c Catalog,
        obj: RawObjectHandle,
    ) -> Outcome<&'c DataTypeDef> {
        let entry = self
            .objects
            .get(&obj)
            .ok_or_else(|| invalid_handle("object", obj))?;
        let def = definition(catalog, entry.def)?;
        def.element().ok_or_else(|| {
            BridgeError::new(
                codes::NOT_A_COLLECTION,
                format!("{} is not a collection", def.full_name()),
            )
        })
    }

    pub(super) fn elements(&self, obj: RawObjectHandle) -> Outcome<&BTreeMap<i32, NativeData>> {
        match self.objects.get(&obj).map(|e| &e.body) {
            Some(Body::Collection(elements)) => Ok(elements),
            Some(Body::Struct(_)) => Err(BridgeError::new(
                codes::NOT_A_COLLECTION,
                format!("{} is not a collection", obj),
            )),
            None => Err(invalid_handle("object", obj)),
        }
    }

    fn elements_mut(&mut self, obj: RawObjectHandle) -> Outcome<&mut BTreeMap<i32, NativeData>> {
        match self.objects.get_mut(&obj).map(|e| &mut e.body) {
            Some(Body::Collection(elements)) => Ok(elements),
            Some(Body::Struct(_)) => Err(BridgeError::new(
                codes::NOT_A_COLLECTION,
                format!("{} is not a collection", obj),
            )),
            None => Err(invalid_handle("object", obj)),
        }
    }

    pub(super) fn append_element(
        &mut self,
        catalog: &Catalog,
        obj: RawObjectHandle,
        tag: NativeTag,
        data: &NativeData,
    ) -> Outcome<()> {
        let data_type = self.collection_type(catalog, obj)?;
        let stored = self.encode(catalog, data_type, tag, data)?;
        let elements = self.elements_mut(obj)?;
        let index = match elements.keys().next_back() {
            Some(&last) => last.checked_add(1).ok_or_else(|| {
                BridgeError::new(codes::OUT_OF_RANGE, "collection index overflow")
            }),
            None => Ok(0),
        };
        match index {
            Ok(index) => {
                elements.insert(index, stored);
                Ok(())
            }
            Err(e) => {
                self.release_data(Some(stored));
                Err(e)
            }
        }
    }

    pub(super) fn delete_element(&mut self, obj: RawObjectHandle, index: i32) -> Outcome<()> {
        let removed = self
            .elements_mut(obj)?
            .remove(&index)
            .ok_or_else(|| no_such_element(index))?;
        self.release_data(Some(removed));
        Ok(())
    }

    pub(super) fn get_element(
        &self,
        catalog: &Catalog,
        obj: RawObjectHandle,
        index: i32,
        tag: NativeTag,
        out: &mut NativeData,
    ) -> Outcome<()> {
        let data_type = self.collection_type(catalog, obj)?;
        let stored = self
            .elements(obj)?
            .get(&index)
            .ok_or_else(|| no_such_element(index))?;
        Self::decode(data_type, tag, stored, out)
    }

    pub(super) fn set_element(
        &mut self,
        catalog: &Catalog,
        obj: RawObjectHandle,
        index: i32,
        tag: NativeTag,
        data: &NativeData,
    ) -> Outcome<()> {
        let data_type = self.collection_type(catalog, obj)?;
        if !self.elements(obj)?.contains_key(&index) {
            return Err(no_such_element(index));
        }
        let stored = self.encode(catalog, data_type, tag, data)?;
        let previous = self.elements_mut(obj)?.insert(index, stored);
        self.release_data(previous);
        Ok(())
    }

    pub(super) fn trim(&mut self, obj: RawObjectHandle, count: u32) -> Outcome<()> {
        let elements = self.elements_mut(obj)?;
        let count = count as usize;
        if count > elements.len() {
            return Err(BridgeError::new(
                codes::TRIM_TOO_LARGE,
                format!(
                    "cannot trim {} elements from a collection of {}",
                    count,
                    elements.len()
                ),
            ));
        }
        let mut removed = Vec::with_capacity(count);
        for _ in 0..count {
            if let Some((_, data)) = elements.pop_last() {
                removed.push(data);
            }
        }
        for data in removed {
            self.release_data(Some(data));
        }
        Ok(())
    }
}
