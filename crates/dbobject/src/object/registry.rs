// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Per-connection type registry.
//!
//! Resolves type names through the [`Bridge`] and caches the resulting
//! [`ObjectType`]s under both the normalized requested name and the
//! fully-qualified `SCHEMA.NAME`. Nested attribute and element types are
//! resolved recursively through the same cache, so every named type exists
//! at most once per registry.
//!
//! A type is inserted into the cache as an unbound placeholder *before* its
//! attributes are resolved. A type that refers to itself (directly or through
//! a collection) finds its own placeholder instead of recursing forever.
//!
//! Closing a cached type retires it and every cached type built on it: the
//! next lookup closes those dependents and resolves them again.

use crate::bridge::{Bridge, DataTypeInfo, RawTypeHandle};
use crate::error::{Error, Result, StatusExt};
use crate::object::name;
use crate::object::{Lifecycle, ObjectType};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Default)]
struct Cache {
    types: HashMap<String, ObjectType>,
    closed: bool,
}

/// Name-keyed cache of object types for one connection.
///
/// # Example
///
/// ```rust,ignore
/// let registry = TypeRegistry::new(bridge);
/// let address = registry.lookup("hr.address")?;
/// assert!(address.same_as(&registry.lookup("HR.ADDRESS")?));
/// ```
pub struct TypeRegistry {
    bridge: Arc<dyn Bridge>,
    cache: Mutex<Cache>,
}

impl TypeRegistry {
    pub fn new(bridge: Arc<dyn Bridge>) -> Self {
        Self {
            bridge,
            cache: Mutex::new(Cache::default()),
        }
    }

    /// Bridge this registry resolves types through.
    pub fn bridge(&self) -> &Arc<dyn Bridge> {
        &self.bridge
    }

    /// Return the cached type for `name`, resolving it on first use.
    ///
    /// The name is folded to uppercase unless it contains a quote. Repeated
    /// lookups of equivalent names return the same [`ObjectType`].
    pub fn lookup(&self, name: &str) -> Result<ObjectType> {
        let key = name::normalize(name).into_owned();
        let mut cache = self.cache.lock();
        if cache.closed {
            return Err(Error::invalid_state(format!(
                "lookup({}) on a closed registry",
                key
            )));
        }

        evict_closed(&mut cache.types);
        if let Some(found) = cache.types.get(&key) {
            log::trace!("[TypeRegistry] cache hit {}", key);
            return Ok(found.clone());
        }

        let bridge = &*self.bridge;
        let raw = bridge
            .get_object_type(&key)
            .at(bridge, || format!("get_object_type({})", key))?;

        let mut resolver = Resolver::new(&self.bridge, &mut cache.types);
        let resolved = resolver.resolve_handle(raw, Ownership::Owned);
        let inserted = resolver.into_inserted();

        match resolved {
            Ok(ty) => {
                log::debug!(
                    "[TypeRegistry] resolved {} as {} ({} new types)",
                    key,
                    ty,
                    inserted.len()
                );
                cache.types.insert(key, ty.clone());
                Ok(ty)
            }
            Err(e) => {
                log::debug!("[TypeRegistry] lookup of {} failed: {}", key, e);
                for full_name in inserted {
                    if let Some(ty) = cache.types.remove(&full_name) {
                        if let Err(release) = ty.close() {
                            log::warn!(
                                "[TypeRegistry] cleanup of {} failed: {}",
                                full_name,
                                release
                            );
                        }
                    }
                }
                Err(e)
            }
        }
    }

    /// True if `name` (after folding) is cached and bound.
    pub fn contains(&self, name: &str) -> bool {
        let key = name::normalize(name);
        let mut cache = self.cache.lock();
        evict_closed(&mut cache.types);
        cache
            .types
            .get(key.as_ref())
            .is_some_and(|ty| ty.lifecycle() == Lifecycle::Bound)
    }

    /// Number of cache entries (a type cached under two names counts twice).
    pub fn len(&self) -> usize {
        self.cache.lock().types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.lock().types.is_empty()
    }

    /// Sorted cache keys.
    pub fn cached_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.cache.lock().types.keys().cloned().collect();
        names.sort();
        names
    }

    /// Close every cached type and empty the cache.
    ///
    /// Idempotent. Every type is closed even if some fail; the first failure
    /// is returned. Later lookups fail with `InvalidState`.
    pub fn close(&self) -> Result<()> {
        let types: Vec<ObjectType> = {
            let mut cache = self.cache.lock();
            cache.closed = true;
            cache.types.drain().map(|(_, ty)| ty).collect()
        };

        let mut distinct: Vec<ObjectType> = Vec::with_capacity(types.len());
        for ty in types {
            if !distinct.iter().any(|seen| seen.same_as(&ty)) {
                distinct.push(ty);
            }
        }
        if !distinct.is_empty() {
            log::debug!("[TypeRegistry] closing {} types", distinct.len());
        }

        let mut first_error = None;
        for ty in &distinct {
            if let Err(e) = ty.close() {
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}

impl Drop for TypeRegistry {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            log::warn!("[TypeRegistry] close on drop failed: {}", e);
        }
    }
}

impl std::fmt::Debug for TypeRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypeRegistry")
            .field("cached", &self.cached_names())
            .finish()
    }
}

/// Remove closed types from the cache, with every cached type that refers to
/// one of them directly or through another removed type. Dependents are
/// closed so their handles and reference cycles are released.
fn evict_closed(types: &mut HashMap<String, ObjectType>) {
    let mut stale: Vec<ObjectType> = Vec::new();
    for ty in types.values() {
        if ty.lifecycle() == Lifecycle::Closed && !stale.iter().any(|s| s.same_as(ty)) {
            stale.push(ty.clone());
        }
    }
    if stale.is_empty() {
        return;
    }

    let closed_by_caller = stale.len();
    loop {
        let before = stale.len();
        for ty in types.values() {
            if !stale.iter().any(|s| s.same_as(ty)) && ty.refers_to_any(&stale) {
                stale.push(ty.clone());
            }
        }
        if stale.len() == before {
            break;
        }
    }

    types.retain(|_, ty| !stale.iter().any(|s| s.same_as(ty)));
    for ty in &stale[closed_by_caller..] {
        log::debug!("[TypeRegistry] retiring {}: refers to a closed type", ty);
        if let Err(e) = ty.close() {
            log::warn!("[TypeRegistry] close of {} failed: {}", ty, e);
        }
    }
}

/// Whether a raw type handle already carries a reference for the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Ownership {
    /// Returned by `get_object_type`: the resolver takes it over.
    Owned,
    /// Found inside a `DataTypeInfo`: must be add-ref'd before keeping.
    Borrowed,
}

/// One recursive resolution pass over the registry cache.
pub(crate) struct Resolver<'a> {
    bridge: &'a Arc<dyn Bridge>,
    types: &'a mut HashMap<String, ObjectType>,
    inserted: Vec<String>,
}

impl<'a> Resolver<'a> {
    fn new(bridge: &'a Arc<dyn Bridge>, types: &'a mut HashMap<String, ObjectType>) -> Self {
        Self {
            bridge,
            types,
            inserted: Vec::new(),
        }
    }

    /// Cache keys inserted by this pass, to roll back on failure.
    fn into_inserted(self) -> Vec<String> {
        self.inserted
    }

    /// Type of an attribute or collection element: a scalar leaf type, or the
    /// cached named type for object data.
    pub(crate) fn resolve_data_type(&mut self, info: &DataTypeInfo) -> Result<ObjectType> {
        match info.object_type {
            Some(handle) => self.resolve_handle(handle, Ownership::Borrowed),
            None => Ok(ObjectType::scalar(Arc::clone(self.bridge), info)),
        }
    }

    pub(crate) fn resolve_handle(
        &mut self,
        handle: RawTypeHandle,
        ownership: Ownership,
    ) -> Result<ObjectType> {
        let bridge = &**self.bridge;
        let info = match bridge.type_info(handle).at(bridge, || format!("type_info({})", handle)) {
            Ok(info) => info,
            Err(e) => {
                if ownership == Ownership::Owned {
                    release_unadopted(bridge, handle);
                }
                return Err(e);
            }
        };
        let full_name = name::full_name(&info.schema, &info.name);

        if let Some(cached) = self.types.get(&full_name) {
            if cached.lifecycle() != Lifecycle::Closed {
                log::trace!("[TypeRegistry] reusing {}", full_name);
                if ownership == Ownership::Owned {
                    release_unadopted(bridge, handle);
                }
                return Ok(cached.clone());
            }
        }

        if ownership == Ownership::Borrowed {
            bridge
                .type_add_ref(handle)
                .at(bridge, || format!("{}.add_ref", full_name))?;
        }

        // The placeholder owns the handle from here on.
        let ty = ObjectType::placeholder(Arc::clone(self.bridge), handle, &info);
        self.types.insert(full_name.clone(), ty.clone());
        self.inserted.push(full_name);
        ty.init(&info, self)?;
        log::trace!(
            "[TypeRegistry] bound {} (collection={}, attributes={})",
            ty,
            info.is_collection,
            info.num_attributes
        );
        Ok(ty)
    }
}

fn release_unadopted(bridge: &dyn Bridge, handle: RawTypeHandle) {
    if bridge.type_release(handle).is_err() {
        log::warn!(
            "[TypeRegistry] release of {} failed: {}",
            handle,
            bridge.last_error()
        );
    }
}
