// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! In-process engine implementing [`Bridge`].
//!
//! `MemoryBridge` serves the types of a [`Catalog`] and keeps objects and
//! collections in memory with the same handle discipline as a client
//! library: every handle is reference counted and must be released by its
//! owner. [`MemoryBridge::live_handles`] reports what is still outstanding,
//! which makes leaks visible in tests.
//!
//! Object values are stored by copy: assigning an object to an attribute
//! or appending it to a collection stores a copy owned by the container.
//! Reading it back yields a borrowed handle to that embedded copy.
//!
//! # Example
//!
//! ```rust,ignore
//! let mut catalog = Catalog::with_default_schema("HR");
//! catalog.add(
//!     TypeDefBuilder::structure("ADDRESS")
//!         .attribute("STREET", DataTypeDef::varchar(100))
//!         .build(),
//! )?;
//! let bridge = Arc::new(MemoryBridge::new(catalog)?);
//! let registry = TypeRegistry::new(bridge.clone());
//! ```

mod catalog;
mod convert;
mod state;
#[cfg(feature = "catalog-loaders")]
mod yaml;

#[cfg(test)]
mod tests;

pub use catalog::{AttrDef, Catalog, DataTypeDef, TypeDef, TypeDefBuilder, TypeDefKind};
#[cfg(feature = "catalog-loaders")]
pub use yaml::{YamlAttribute, YamlCatalog, YamlDataType, YamlType};

use crate::bridge::{
    AttrInfo, Bridge, BridgeError, Failure, NativeData, NativeTag, RawAttrHandle,
    RawObjectHandle, RawTypeHandle, Status, TypeInfo,
};
use crate::error::Result;
use convert::Outcome;
use parking_lot::Mutex;
use state::State;
use std::collections::HashMap;
use std::thread::{self, ThreadId};

/// Error codes reported by [`MemoryBridge`].
pub mod codes {
    pub const INVALID_HANDLE: i32 = 1002;
    pub const CONVERSION: i32 = 1014;
    pub const BUFFER_TOO_SMALL: i32 = 1019;
    pub const PAYLOAD_MISMATCH: i32 = 1020;
    pub const ATTRIBUTE_COUNT: i32 = 1021;
    pub const OUT_OF_RANGE: i32 = 1455;
    pub const INVALID_NUMBER: i32 = 1722;
    pub const TYPE_NOT_FOUND: i32 = 4043;
    pub const VALUE_TOO_LARGE: i32 = 12899;
    pub const NOT_INITIALIZED: i32 = 21560;
    pub const WRONG_OBJECT_TYPE: i32 = 21602;
    pub const NOT_A_COLLECTION: i32 = 22002;
    pub const NO_SUCH_ELEMENT: i32 = 22160;
    pub const TRIM_TOO_LARGE: i32 = 22167;
    pub const INJECTED: i32 = 9999;
    /// Reported by `last_error` when no call failed on this thread.
    pub const NO_ERROR: i32 = 0;
}

/// Bridge operation, used to inject failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailPoint {
    GetObjectType,
    TypeAddRef,
    TypeRelease,
    TypeInfo,
    TypeAttributes,
    AttrInfo,
    AttrRelease,
    CreateObject,
    ObjectAddRef,
    ObjectRelease,
    GetAttribute,
    SetAttribute,
    AppendElement,
    DeleteElement,
    GetElement,
    SetElement,
    ElementExists,
    FirstIndex,
    LastIndex,
    NextIndex,
    Size,
    Trim,
}

/// Outstanding handles of each kind, including the ones the engine hands
/// out inside type-info records and those owned by containers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HandleCounts {
    pub types: usize,
    pub attrs: usize,
    pub objects: usize,
}

impl HandleCounts {
    pub fn is_zero(&self) -> bool {
        self.types == 0 && self.attrs == 0 && self.objects == 0
    }
}

/// In-memory engine over a [`Catalog`].
pub struct MemoryBridge {
    catalog: Catalog,
    state: Mutex<State>,
    errors: Mutex<HashMap<ThreadId, BridgeError>>,
}

impl MemoryBridge {
    /// Engine serving `catalog`. Fails if a type refers to an unknown type.
    pub fn new(catalog: Catalog) -> Result<Self> {
        catalog.validate()?;
        log::debug!(
            "[MemoryBridge] serving {} types (default schema {})",
            catalog.len(),
            catalog.default_schema()
        );
        Ok(Self {
            catalog,
            state: Mutex::new(State::default()),
            errors: Mutex::new(HashMap::new()),
        })
    }

    /// Engine serving the catalog in a YAML file.
    #[cfg(feature = "catalog-loaders")]
    pub fn from_yaml_file<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        Self::new(YamlCatalog::load_from_file(path)?.into_catalog()?)
    }

    /// Engine serving the catalog in a YAML document.
    #[cfg(feature = "catalog-loaders")]
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        Self::new(YamlCatalog::parse_yaml(yaml)?.into_catalog()?)
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Handles not yet released.
    pub fn live_handles(&self) -> HandleCounts {
        self.state.lock().counts()
    }

    /// Make the next call of `point` fail.
    pub fn inject_failure(&self, point: FailPoint) {
        self.inject_failure_after(point, 0);
    }

    /// Let `skip` calls of `point` succeed, then fail the next one.
    pub fn inject_failure_after(&self, point: FailPoint, skip: usize) {
        log::debug!("[MemoryBridge] arming {:?} after {} calls", point, skip);
        self.state.lock().arm(point, skip);
    }

    /// Disarm every pending failure.
    pub fn clear_failures(&self) {
        self.state.lock().disarm();
    }

    fn run<T, F>(&self, point: FailPoint, op: F) -> Status<T>
    where
        F: FnOnce(&mut State, &Catalog) -> Outcome<T>,
    {
        let outcome = {
            let mut state = self.state.lock();
            if state.trip(point) {
                Err(BridgeError::new(
                    codes::INJECTED,
                    format!("injected failure in {:?}", point),
                ))
            } else {
                op(&mut state, &self.catalog)
            }
        };
        outcome.map_err(|e| {
            log::debug!("[MemoryBridge] {:?} failed: {}", point, e);
            self.errors.lock().insert(thread::current().id(), e);
            Failure
        })
    }
}

impl std::fmt::Debug for MemoryBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryBridge")
            .field("types", &self.catalog.len())
            .field("live", &self.live_handles())
            .finish()
    }
}

impl Bridge for MemoryBridge {
    fn last_error(&self) -> BridgeError {
        self.errors
            .lock()
            .get(&thread::current().id())
            .cloned()
            .unwrap_or_else(|| BridgeError::new(codes::NO_ERROR, "no error recorded"))
    }

    fn get_object_type(&self, name: &str) -> Status<RawTypeHandle> {
        self.run(FailPoint::GetObjectType, |state, catalog| {
            state.get_object_type(catalog, name)
        })
    }

    fn type_add_ref(&self, handle: RawTypeHandle) -> Status {
        self.run(FailPoint::TypeAddRef, |state, _| state.type_add_ref(handle))
    }

    fn type_release(&self, handle: RawTypeHandle) -> Status {
        self.run(FailPoint::TypeRelease, |state, _| state.type_release(handle))
    }

    fn type_info(&self, handle: RawTypeHandle) -> Status<TypeInfo> {
        self.run(FailPoint::TypeInfo, |state, catalog| {
            state.type_info(catalog, handle)
        })
    }

    fn type_attributes(&self, handle: RawTypeHandle, count: u16) -> Status<Vec<RawAttrHandle>> {
        self.run(FailPoint::TypeAttributes, |state, catalog| {
            state.type_attributes(catalog, handle, count)
        })
    }

    fn attr_info(&self, attr: RawAttrHandle) -> Status<AttrInfo> {
        self.run(FailPoint::AttrInfo, |state, catalog| {
            state.attr_info(catalog, attr)
        })
    }

    fn attr_release(&self, attr: RawAttrHandle) -> Status {
        self.run(FailPoint::AttrRelease, |state, _| state.attr_release(attr))
    }

    fn create_object(&self, handle: RawTypeHandle) -> Status<RawObjectHandle> {
        self.run(FailPoint::CreateObject, |state, catalog| {
            state.create_object(catalog, handle)
        })
    }

    fn object_add_ref(&self, obj: RawObjectHandle) -> Status {
        self.run(FailPoint::ObjectAddRef, |state, _| state.object_add_ref(obj))
    }

    fn object_release(&self, obj: RawObjectHandle) -> Status {
        self.run(FailPoint::ObjectRelease, |state, _| state.object_release(obj))
    }

    fn get_attribute_value(
        &self,
        obj: RawObjectHandle,
        attr: RawAttrHandle,
        tag: NativeTag,
        data: &mut NativeData,
    ) -> Status {
        self.run(FailPoint::GetAttribute, |state, catalog| {
            state.get_attribute(catalog, obj, attr, tag, data)
        })
    }

    fn set_attribute_value(
        &self,
        obj: RawObjectHandle,
        attr: RawAttrHandle,
        tag: NativeTag,
        data: &NativeData,
    ) -> Status {
        self.run(FailPoint::SetAttribute, |state, catalog| {
            state.set_attribute(catalog, obj, attr, tag, data)
        })
    }

    fn append_element(&self, obj: RawObjectHandle, tag: NativeTag, data: &NativeData) -> Status {
        self.run(FailPoint::AppendElement, |state, catalog| {
            state.append_element(catalog, obj, tag, data)
        })
    }

    fn delete_element(&self, obj: RawObjectHandle, index: i32) -> Status {
        self.run(FailPoint::DeleteElement, |state, _| {
            state.delete_element(obj, index)
        })
    }

    fn get_element(
        &self,
        obj: RawObjectHandle,
        index: i32,
        tag: NativeTag,
        data: &mut NativeData,
    ) -> Status {
        self.run(FailPoint::GetElement, |state, catalog| {
            state.get_element(catalog, obj, index, tag, data)
        })
    }

    fn set_element(
        &self,
        obj: RawObjectHandle,
        index: i32,
        tag: NativeTag,
        data: &NativeData,
    ) -> Status {
        self.run(FailPoint::SetElement, |state, catalog| {
            state.set_element(catalog, obj, index, tag, data)
        })
    }

    fn element_exists(&self, obj: RawObjectHandle, index: i32) -> Status<bool> {
        self.run(FailPoint::ElementExists, |state, _| {
            Ok(state.elements(obj)?.contains_key(&index))
        })
    }

    fn first_index(&self, obj: RawObjectHandle) -> Status<Option<i32>> {
        self.run(FailPoint::FirstIndex, |state, _| {
            Ok(state.elements(obj)?.keys().next().copied())
        })
    }

    fn last_index(&self, obj: RawObjectHandle) -> Status<Option<i32>> {
        self.run(FailPoint::LastIndex, |state, _| {
            Ok(state.elements(obj)?.keys().next_back().copied())
        })
    }

    fn next_index(&self, obj: RawObjectHandle, index: i32) -> Status<Option<i32>> {
        use std::ops::Bound::{Excluded, Unbounded};
        self.run(FailPoint::NextIndex, |state, _| {
            Ok(state
                .elements(obj)?
                .range((Excluded(index), Unbounded))
                .next()
                .map(|(i, _)| *i))
        })
    }

    fn size(&self, obj: RawObjectHandle) -> Status<i32> {
        self.run(FailPoint::Size, |state, _| {
            Ok(i32::try_from(state.elements(obj)?.len()).unwrap_or(i32::MAX))
        })
    }

    fn trim(&self, obj: RawObjectHandle, count: u32) -> Status {
        self.run(FailPoint::Trim, |state, _| state.trim(obj, count))
    }
}
