// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Object type system.
//!
//! - [`TypeRegistry`]: per-connection cache of resolved types
//! - [`ObjectType`] / [`AttributeDescriptor`]: type metadata
//! - [`ObjectInstance`] / [`CollectionInstance`]: live values
//! - [`Value`] / [`Datum`]: native and application-level payloads
//!
//! # Example
//!
//! ```rust,ignore
//! use dbobject::{Datum, TypeRegistry};
//!
//! let registry = TypeRegistry::new(bridge);
//! let address_type = registry.lookup("hr.address")?;
//!
//! let mut address = address_type.new_instance()?;
//! address.set("STREET", "Main St")?;
//! address.set("ZIP", "12345")?;
//! assert_eq!(address.get("street")?, Datum::Text("Main St".into()));
//! ```

mod collection;
mod datum;
mod instance;
pub mod name;
mod object_type;
mod registry;
mod value;

pub use collection::{CollectionInstance, Indices};
pub use datum::{Datum, FromDatum};
pub use instance::ObjectInstance;
pub use object_type::{AttributeDescriptor, AttributeMap, Lifecycle, ObjectType};
pub use registry::TypeRegistry;
pub use value::Value;
