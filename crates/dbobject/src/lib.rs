// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! # dbobject - engine object types, instances and collections
//!
//! Work with the user-defined object types of an object-relational database
//! engine (structured types and collections) without per-type marshaling
//! code. Types are discovered at runtime from the engine catalog, cached per
//! connection, and used to create, read and write instances generically.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use dbobject::bridge::memory::{Catalog, DataTypeDef, MemoryBridge, TypeDefBuilder};
//! use dbobject::{Datum, Result, TypeRegistry};
//! use std::sync::Arc;
//!
//! fn main() -> Result<()> {
//!     let mut catalog = Catalog::with_default_schema("HR");
//!     catalog.add(
//!         TypeDefBuilder::structure("ADDRESS")
//!             .attribute("STREET", DataTypeDef::varchar(100))
//!             .attribute("ZIP", DataTypeDef::varchar(10))
//!             .build(),
//!     )?;
//!     let registry = TypeRegistry::new(Arc::new(MemoryBridge::new(catalog)?));
//!
//!     let mut address = registry.lookup("hr.address")?.new_instance()?;
//!     address.set("street", "Main St")?;
//!     assert_eq!(address.get("STREET")?, Datum::Text("Main St".into()));
//!     assert!(address.get("ZIP")?.is_null());
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! +--------------------------------------------------------------+
//! |  TypeRegistry  -> ObjectType -> ObjectInstance / Collection  |
//! |                      (object: metadata, values, Datum)        |
//! +--------------------------------------------------------------+
//! |  Bridge trait: raw handles, Status + last_error               |
//! +--------------------------------------------------------------+
//! |  engine client (or bridge::memory::MemoryBridge)              |
//! +--------------------------------------------------------------+
//! ```
//!
//! ## Key Types
//!
//! | Type | Description |
//! |------|-------------|
//! | [`TypeRegistry`] | Per-connection cache of resolved types |
//! | [`ObjectType`] | Metadata of a structured or collection type |
//! | [`ObjectInstance`] | Live object value, released on close or drop |
//! | [`CollectionInstance`] | Sparse, integer-indexed collection value |
//! | [`Value`] | Native payload with tag, exchanged with the bridge |
//! | [`Datum`] | Decoded application value |
//!
//! ## Features
//!
//! - `catalog-loaders` (default): YAML catalogs for the in-memory engine

/// Engine bridge trait, raw handles and the in-memory engine.
pub mod bridge;
/// Compile-time constants.
pub mod config;
/// Error types.
pub mod error;
/// Object type system (registry, types, instances, collections, values).
pub mod object;

pub use bridge::{Bridge, BridgeError, EngineType, NativeTag};
pub use error::{Error, Partial, Result};
pub use object::{
    AttributeDescriptor, AttributeMap, CollectionInstance, Datum, FromDatum, Indices, Lifecycle,
    ObjectInstance, ObjectType, TypeRegistry, Value,
};
