// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Object type metadata: structured types, collection types and the scalar
//! leaf types of their attributes and elements.

use crate::bridge::{
    Bridge, DataTypeInfo, EngineType, NativeTag, RawAttrHandle, RawTypeHandle, TypeInfo,
};
use crate::error::{Error, Result, StatusExt};
use crate::object::name;
use crate::object::registry::Resolver;
use crate::object::{CollectionInstance, ObjectInstance};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Lifecycle of types and instances: `Unbound -> Bound -> Closed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    /// Created but metadata (or handle) not yet populated.
    Unbound,
    /// Usable.
    Bound,
    /// Released. Terminal.
    Closed,
}

/// Attributes of a structured type keyed by engine name.
pub type AttributeMap = BTreeMap<String, AttributeDescriptor>;

/// One field of a structured object type.
///
/// The attribute handle is owned by the declaring [`ObjectType`] and
/// released when that type closes; clones of the descriptor only borrow it.
///
/// Sizes, precision and scale are those of this attribute. A named object
/// type shared by several attributes reports none of them itself.
#[derive(Debug, Clone)]
pub struct AttributeDescriptor {
    name: String,
    object_type: ObjectType,
    data_type: DataTypeInfo,
    handle: RawAttrHandle,
}

impl AttributeDescriptor {
    /// Engine name: uppercase, or case-sensitive as declared when quoted.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Type of the attribute (a scalar leaf type or a named object type).
    pub fn object_type(&self) -> &ObjectType {
        &self.object_type
    }

    /// Declared data type of this attribute. The nested type handle is
    /// cleared; use [`object_type`](Self::object_type) instead.
    pub fn data_type(&self) -> &DataTypeInfo {
        &self.data_type
    }

    pub fn native_tag(&self) -> NativeTag {
        self.data_type.native_tag
    }

    pub fn engine_type(&self) -> EngineType {
        self.data_type.engine_type
    }

    pub fn precision(&self) -> i16 {
        self.data_type.precision
    }

    pub fn scale(&self) -> i8 {
        self.data_type.scale
    }

    pub fn db_size(&self) -> u32 {
        self.data_type.db_size
    }

    pub fn raw_handle(&self) -> RawAttrHandle {
        self.handle
    }

    /// NUMBER read as bytes: the caller must supply the buffer.
    pub(crate) fn needs_decimal_buffer(&self) -> bool {
        self.native_tag() == NativeTag::Bytes && self.engine_type() == EngineType::Number
    }
}

/// Shape of a type. Attributes and element type are mutually exclusive.
#[derive(Debug)]
pub(crate) enum Shape {
    /// Placeholder inserted before recursing into children.
    Pending,
    /// Leaf type of a non-object attribute or element.
    Scalar,
    Struct(Arc<AttributeMap>),
    Collection(ObjectType),
}

#[derive(Debug)]
struct TypeState {
    lifecycle: Lifecycle,
    handle: Option<RawTypeHandle>,
    shape: Shape,
}

struct TypeInner {
    bridge: Arc<dyn Bridge>,
    schema: String,
    name: String,
    data_type: DataTypeInfo,
    state: RwLock<TypeState>,
}

/// Metadata for a structured type, a collection type, or a scalar leaf.
///
/// Cheap to clone: clones share the same metadata and handle. The handle is
/// released by [`ObjectType::close`] (usually called by the owning
/// [`TypeRegistry`](crate::TypeRegistry)) or when the last clone drops.
#[derive(Clone)]
pub struct ObjectType {
    inner: Arc<TypeInner>,
}

impl ObjectType {
    /// Leaf type for a non-object attribute or element.
    pub(crate) fn scalar(bridge: Arc<dyn Bridge>, data_type: &DataTypeInfo) -> Self {
        Self::with_state(
            bridge,
            String::new(),
            data_type.engine_type.sql_name().to_string(),
            data_type,
            TypeState {
                lifecycle: Lifecycle::Bound,
                handle: None,
                shape: Shape::Scalar,
            },
        )
    }

    /// Named type owning `handle`, shape not yet populated.
    ///
    /// Named types carry plain OBJECT metadata whichever reference resolved
    /// them; per-reference sizes stay on the attribute descriptors.
    pub(crate) fn placeholder(
        bridge: Arc<dyn Bridge>,
        handle: RawTypeHandle,
        info: &TypeInfo,
    ) -> Self {
        Self::with_state(
            bridge,
            info.schema.clone(),
            info.name.clone(),
            &DataTypeInfo::scalar(EngineType::Object),
            TypeState {
                lifecycle: Lifecycle::Unbound,
                handle: Some(handle),
                shape: Shape::Pending,
            },
        )
    }

    fn with_state(
        bridge: Arc<dyn Bridge>,
        schema: String,
        name: String,
        data_type: &DataTypeInfo,
        state: TypeState,
    ) -> Self {
        let mut data_type = data_type.clone();
        // Borrowed from the referencing attribute, never kept.
        data_type.object_type = None;
        Self {
            inner: Arc::new(TypeInner {
                bridge,
                schema,
                name,
                data_type,
                state: RwLock::new(state),
            }),
        }
    }

    /// Populate attributes or element type from the type-info record,
    /// resolving nested types through `resolver`.
    pub(crate) fn init(&self, info: &TypeInfo, resolver: &mut Resolver<'_>) -> Result<()> {
        let handle = self.state_handle()?;
        let shape = if info.is_collection {
            let element = info.element.as_ref().ok_or_else(|| {
                Error::invalid_state(format!("{}: collection without element type", self))
            })?;
            Shape::Collection(resolver.resolve_data_type(element)?)
        } else {
            Shape::Struct(Arc::new(self.init_attributes(handle, info, resolver)?))
        };

        let mut state = self.inner.state.write();
        if state.lifecycle == Lifecycle::Closed {
            return Err(Error::invalid_state(format!("{} closed during init", self)));
        }
        state.shape = shape;
        state.lifecycle = Lifecycle::Bound;
        Ok(())
    }

    fn init_attributes(
        &self,
        handle: RawTypeHandle,
        info: &TypeInfo,
        resolver: &mut Resolver<'_>,
    ) -> Result<AttributeMap> {
        let mut attributes = AttributeMap::new();
        if info.num_attributes == 0 {
            return Ok(attributes);
        }

        let bridge = self.bridge();
        let handles = bridge
            .type_attributes(handle, info.num_attributes)
            .at(bridge, || format!("{}.get_attributes", self))?;
        let mut guard = AttrGuard {
            bridge,
            handles: handles.clone(),
        };

        for attr in handles {
            let attr_info = bridge
                .attr_info(attr)
                .at(bridge, || format!("{}.attr_info({})", self, attr))?;
            let object_type = resolver.resolve_data_type(&attr_info.type_info)?;
            let mut data_type = attr_info.type_info;
            data_type.object_type = None;
            log::trace!(
                "[ObjectType] {}.{}: {} ({})",
                self,
                attr_info.name,
                data_type.engine_type,
                data_type.native_tag
            );
            attributes.insert(
                attr_info.name.clone(),
                AttributeDescriptor {
                    name: attr_info.name,
                    object_type,
                    data_type,
                    handle: attr,
                },
            );
        }

        guard.disarm();
        Ok(attributes)
    }

    pub(crate) fn bridge(&self) -> &dyn Bridge {
        &*self.inner.bridge
    }

    fn state_handle(&self) -> Result<RawTypeHandle> {
        self.inner
            .state
            .read()
            .handle
            .ok_or_else(|| Error::invalid_state(format!("{} has no type handle", self)))
    }

    /// Fail with `InvalidState` unless the type is bound.
    pub(crate) fn ensure_bound(&self, op: &str) -> Result<()> {
        match self.lifecycle() {
            Lifecycle::Bound => Ok(()),
            Lifecycle::Unbound => Err(Error::invalid_state(format!(
                "{}: {} on a type that is still being resolved",
                self, op
            ))),
            Lifecycle::Closed => Err(Error::invalid_state(format!(
                "{}: {} on a closed type",
                self, op
            ))),
        }
    }

    // -- metadata ------------------------------------------------------------

    pub fn schema(&self) -> &str {
        &self.inner.schema
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// `SCHEMA.NAME`, or `NAME` without schema.
    pub fn full_name(&self) -> String {
        name::full_name(&self.inner.schema, &self.inner.name)
    }

    pub fn engine_type(&self) -> EngineType {
        self.inner.data_type.engine_type
    }

    pub fn native_tag(&self) -> NativeTag {
        self.inner.data_type.native_tag
    }

    pub fn precision(&self) -> i16 {
        self.inner.data_type.precision
    }

    pub fn scale(&self) -> i8 {
        self.inner.data_type.scale
    }

    pub fn fs_precision(&self) -> u8 {
        self.inner.data_type.fs_precision
    }

    pub fn db_size(&self) -> u32 {
        self.inner.data_type.db_size
    }

    pub fn client_size(&self) -> u32 {
        self.inner.data_type.client_size
    }

    pub fn char_size(&self) -> u32 {
        self.inner.data_type.char_size
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.inner.state.read().lifecycle
    }

    /// True for the leaf types of scalar attributes and elements.
    pub fn is_scalar(&self) -> bool {
        matches!(self.inner.state.read().shape, Shape::Scalar)
    }

    pub fn is_collection(&self) -> bool {
        matches!(self.inner.state.read().shape, Shape::Collection(_))
    }

    /// Element type of a collection type.
    pub fn collection_of(&self) -> Option<ObjectType> {
        match &self.inner.state.read().shape {
            Shape::Collection(element) => Some(element.clone()),
            _ => None,
        }
    }

    /// Attributes of a structured type (possibly empty). `None` for
    /// collections, scalars, and unbound or closed types.
    pub fn attributes(&self) -> Option<Arc<AttributeMap>> {
        match &self.inner.state.read().shape {
            Shape::Struct(attributes) => Some(Arc::clone(attributes)),
            _ => None,
        }
    }

    /// Attribute by name, folded to uppercase unless quoted.
    pub fn attribute(&self, name: &str) -> Result<AttributeDescriptor> {
        self.ensure_bound("attribute lookup")?;
        let folded = name::normalize(name);
        let key = name::unquote(&folded);
        self.attributes()
            .and_then(|attributes| attributes.get(key).cloned())
            .ok_or_else(|| Error::NoSuchAttribute {
                type_name: self.full_name(),
                attribute: name.to_string(),
            })
    }

    /// Engine handle of a bound named type.
    pub fn raw_handle(&self) -> Result<RawTypeHandle> {
        self.ensure_bound("raw_handle")?;
        self.state_handle()
    }

    /// Same underlying type (not merely equal metadata).
    pub fn same_as(&self, other: &ObjectType) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    pub(crate) fn needs_decimal_buffer(&self) -> bool {
        self.native_tag() == NativeTag::Bytes && self.engine_type() == EngineType::Number
    }

    /// True if an attribute or the element type is one of `types`.
    pub(crate) fn refers_to_any(&self, types: &[ObjectType]) -> bool {
        let listed = |child: &ObjectType| types.iter().any(|ty| ty.same_as(child));
        match &self.inner.state.read().shape {
            Shape::Struct(attributes) => attributes.values().any(|attr| listed(&attr.object_type)),
            Shape::Collection(element) => listed(element),
            Shape::Pending | Shape::Scalar => false,
        }
    }

    // -- instances -----------------------------------------------------------

    /// Create a new instance of this type with every attribute reset to null.
    ///
    /// As with all instances, close it (or let it drop) when done.
    pub fn new_instance(&self) -> Result<ObjectInstance> {
        self.ensure_bound("new_instance")?;
        let handle = self.state_handle()?;
        let bridge = self.bridge();
        let raw = bridge
            .create_object(handle)
            .at(bridge, || format!("{}.create_object", self))?;
        // Owned from here: dropped (and released) if the reset fails.
        let mut instance = ObjectInstance::adopt(self.clone(), raw);
        instance.reset_attributes()?;
        Ok(instance)
    }

    /// Create a new, empty collection. Fails with `NotCollection` unless this
    /// is a collection type.
    pub fn new_collection(&self) -> Result<CollectionInstance> {
        self.ensure_bound("new_collection")?;
        if !self.is_collection() {
            return Err(Error::NotCollection(self.full_name()));
        }
        let instance = self.new_instance()?;
        Ok(CollectionInstance::from_instance(instance))
    }

    // -- release -------------------------------------------------------------

    /// Release every attribute descriptor, then the type handle.
    ///
    /// Idempotent. Every release is attempted; the first failure is returned.
    pub fn close(&self) -> Result<()> {
        let (handle, shape) = {
            let mut state = self.inner.state.write();
            if state.lifecycle == Lifecycle::Closed {
                return Ok(());
            }
            state.lifecycle = Lifecycle::Closed;
            (
                state.handle.take(),
                std::mem::replace(&mut state.shape, Shape::Pending),
            )
        };

        let bridge = self.bridge();
        let mut first_error = None;
        if let Shape::Struct(attributes) = &shape {
            for attr in attributes.values() {
                if let Err(e) = bridge
                    .attr_release(attr.handle)
                    .at(bridge, || format!("{}.{}.release", self, attr.name))
                {
                    first_error.get_or_insert(e);
                }
            }
        }
        if let Some(handle) = handle {
            if let Err(e) = bridge
                .type_release(handle)
                .at(bridge, || format!("{}.release", self))
            {
                first_error.get_or_insert(e);
            }
            log::debug!("[ObjectType] closed {}", self);
        }
        // Children dropped outside the lock; this also breaks reference cycles.
        drop(shape);

        first_error.map_or(Ok(()), Err)
    }
}

impl Drop for TypeInner {
    fn drop(&mut self) {
        let bridge = &*self.bridge;
        let state = self.state.get_mut();
        if state.lifecycle == Lifecycle::Closed {
            return;
        }
        if let Shape::Struct(attributes) = &state.shape {
            for attr in attributes.values() {
                if bridge.attr_release(attr.handle).is_err() {
                    log::warn!(
                        "[ObjectType] release of {}.{} failed on drop: {}",
                        self.name,
                        attr.name,
                        bridge.last_error()
                    );
                }
            }
        }
        if let Some(handle) = state.handle.take() {
            if bridge.type_release(handle).is_err() {
                log::warn!(
                    "[ObjectType] release of {} failed on drop: {}",
                    self.name,
                    bridge.last_error()
                );
            }
        }
    }
}

impl fmt::Display for ObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.inner.schema.is_empty() {
            f.write_str(&self.inner.name)
        } else {
            write!(f, "{}.{}", self.inner.schema, self.inner.name)
        }
    }
}

impl fmt::Debug for ObjectType {
    // Shape is not printed: attribute types may refer back to this type.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectType")
            .field("name", &self.full_name())
            .field("engine_type", &self.engine_type())
            .field("native_tag", &self.native_tag())
            .field("lifecycle", &self.lifecycle())
            .finish()
    }
}

/// Releases attribute handles not yet adopted by a type.
struct AttrGuard<'a> {
    bridge: &'a dyn Bridge,
    handles: Vec<RawAttrHandle>,
}

impl AttrGuard<'_> {
    fn disarm(&mut self) {
        self.handles.clear();
    }
}

impl Drop for AttrGuard<'_> {
    fn drop(&mut self) {
        for attr in self.handles.drain(..) {
            if self.bridge.attr_release(attr).is_err() {
                log::warn!(
                    "[ObjectType] release of {} failed: {}",
                    attr,
                    self.bridge.last_error()
                );
            }
        }
    }
}
