// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Type definitions served by the in-memory engine.
//!
//! Names are folded like DDL identifiers: uppercase unless quoted, in which
//! case the quotes are stripped and the case is kept.

use crate::bridge::{DataTypeInfo, EngineType};
use crate::config::{DEFAULT_SCHEMA, MAX_ATTRIBUTES, QUOTE, SCHEMA_SEPARATOR};
use crate::error::{Error, Result};
use crate::object::name;
use std::collections::{HashMap, HashSet};

/// Declared type of an attribute or collection element.
#[derive(Debug, Clone, PartialEq)]
pub enum DataTypeDef {
    Scalar {
        engine_type: EngineType,
        /// Maximum length for character and raw types (0 = unbounded).
        size: u32,
        precision: i16,
        scale: i8,
        fs_precision: u8,
    },
    /// Reference to a named type, resolved relative to the default schema.
    Object(String),
}

impl DataTypeDef {
    /// Scalar with zeroed sizes.
    pub fn scalar(engine_type: EngineType) -> Self {
        DataTypeDef::Scalar {
            engine_type,
            size: 0,
            precision: 0,
            scale: 0,
            fs_precision: 0,
        }
    }

    pub fn varchar(size: u32) -> Self {
        DataTypeDef::Scalar {
            engine_type: EngineType::Varchar,
            size,
            precision: 0,
            scale: 0,
            fs_precision: 0,
        }
    }

    pub fn number(precision: i16, scale: i8) -> Self {
        DataTypeDef::Scalar {
            engine_type: EngineType::Number,
            size: 0,
            precision,
            scale,
            fs_precision: 0,
        }
    }

    pub fn object(type_name: impl AsRef<str>) -> Self {
        DataTypeDef::Object(fold(type_name.as_ref()))
    }

    /// Set the maximum length of a scalar type.
    pub fn with_size(mut self, new_size: u32) -> Self {
        if let DataTypeDef::Scalar { size, .. } = &mut self {
            *size = new_size;
        }
        self
    }

    pub fn engine_type(&self) -> EngineType {
        match self {
            DataTypeDef::Scalar { engine_type, .. } => *engine_type,
            DataTypeDef::Object(_) => EngineType::Object,
        }
    }

    /// Type-info record; the nested handle is filled in by the engine.
    pub(crate) fn to_info(&self) -> DataTypeInfo {
        match self {
            DataTypeDef::Scalar {
                engine_type,
                size,
                precision,
                scale,
                fs_precision,
            } => {
                let mut info = DataTypeInfo::scalar(*engine_type);
                info.db_size = *size;
                info.client_size = *size;
                if engine_type.is_character() {
                    info.char_size = *size;
                }
                info.precision = *precision;
                info.scale = *scale;
                info.fs_precision = *fs_precision;
                info
            }
            DataTypeDef::Object(_) => DataTypeInfo::scalar(EngineType::Object),
        }
    }
}

/// One attribute of a structured type.
#[derive(Debug, Clone, PartialEq)]
pub struct AttrDef {
    pub name: String,
    pub data_type: DataTypeDef,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TypeDefKind {
    Struct(Vec<AttrDef>),
    Collection(DataTypeDef),
}

/// A named object type.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeDef {
    /// Empty until added to a catalog, which fills in its default schema.
    pub schema: String,
    pub name: String,
    pub kind: TypeDefKind,
}

impl TypeDef {
    pub fn full_name(&self) -> String {
        name::full_name(&self.schema, &self.name)
    }

    pub fn is_collection(&self) -> bool {
        matches!(self.kind, TypeDefKind::Collection(_))
    }

    pub fn attributes(&self) -> &[AttrDef] {
        match &self.kind {
            TypeDefKind::Struct(attributes) => attributes,
            TypeDefKind::Collection(_) => &[],
        }
    }

    pub fn element(&self) -> Option<&DataTypeDef> {
        match &self.kind {
            TypeDefKind::Collection(element) => Some(element),
            TypeDefKind::Struct(_) => None,
        }
    }
}

/// Fluent builder for [`TypeDef`].
///
/// ```rust,ignore
/// let address = TypeDefBuilder::structure("address")
///     .attribute("street", DataTypeDef::varchar(100))
///     .attribute("zip", DataTypeDef::varchar(10))
///     .build();
/// let list = TypeDefBuilder::collection("address_list", DataTypeDef::object("address")).build();
/// ```
#[derive(Debug)]
pub struct TypeDefBuilder {
    schema: String,
    name: String,
    kind: TypeDefKind,
}

impl TypeDefBuilder {
    /// Start a structured type.
    pub fn structure(type_name: impl AsRef<str>) -> Self {
        Self {
            schema: String::new(),
            name: fold(type_name.as_ref()),
            kind: TypeDefKind::Struct(Vec::new()),
        }
    }

    /// Start a collection type.
    pub fn collection(type_name: impl AsRef<str>, element: DataTypeDef) -> Self {
        Self {
            schema: String::new(),
            name: fold(type_name.as_ref()),
            kind: TypeDefKind::Collection(element),
        }
    }

    /// Explicit schema (defaults to the catalog's).
    pub fn schema(mut self, schema: impl AsRef<str>) -> Self {
        self.schema = fold(schema.as_ref());
        self
    }

    /// Add an attribute. Ignored on collection types.
    pub fn attribute(mut self, attr_name: impl AsRef<str>, data_type: DataTypeDef) -> Self {
        if let TypeDefKind::Struct(attributes) = &mut self.kind {
            attributes.push(AttrDef {
                name: fold(attr_name.as_ref()),
                data_type,
            });
        }
        self
    }

    pub fn build(self) -> TypeDef {
        TypeDef {
            schema: self.schema,
            name: self.name,
            kind: self.kind,
        }
    }
}

/// Set of type definitions known to a [`MemoryBridge`](super::MemoryBridge).
#[derive(Debug, Clone)]
pub struct Catalog {
    default_schema: String,
    types: Vec<TypeDef>,
    by_name: HashMap<String, usize>,
}

impl Default for Catalog {
    fn default() -> Self {
        Self::new()
    }
}

impl Catalog {
    pub fn new() -> Self {
        Self::with_default_schema(DEFAULT_SCHEMA)
    }

    pub fn with_default_schema(schema: impl AsRef<str>) -> Self {
        Self {
            default_schema: fold(schema.as_ref()),
            types: Vec::new(),
            by_name: HashMap::new(),
        }
    }

    pub fn default_schema(&self) -> &str {
        &self.default_schema
    }

    /// Add a definition. Fails on a duplicate type or attribute name.
    ///
    /// References to other types are checked by [`Catalog::validate`], so
    /// definitions may be added in any order.
    pub fn add(&mut self, mut def: TypeDef) -> Result<&mut Self> {
        if def.schema.is_empty() {
            def.schema = self.default_schema.clone();
        }
        if def.name.is_empty() {
            return Err(Error::Catalog("type without a name".into()));
        }
        let full_name = def.full_name();
        if self.by_name.contains_key(&full_name) {
            return Err(Error::Catalog(format!("duplicate type {}", full_name)));
        }

        let attributes = def.attributes();
        if attributes.len() > MAX_ATTRIBUTES {
            return Err(Error::Catalog(format!(
                "{} declares {} attributes (max {})",
                full_name,
                attributes.len(),
                MAX_ATTRIBUTES
            )));
        }
        let mut seen = HashSet::new();
        for attr in attributes {
            if !seen.insert(attr.name.as_str()) {
                return Err(Error::Catalog(format!(
                    "duplicate attribute {}.{}",
                    full_name, attr.name
                )));
            }
        }

        self.by_name.insert(full_name, self.types.len());
        self.types.push(def);
        Ok(self)
    }

    /// Check that every object reference names a known type.
    pub fn validate(&self) -> Result<()> {
        for def in &self.types {
            let references = def
                .attributes()
                .iter()
                .map(|attr| &attr.data_type)
                .chain(def.element());
            for data_type in references {
                if let DataTypeDef::Object(target) = data_type {
                    if self.index_of(target).is_none() {
                        return Err(Error::Catalog(format!(
                            "{} refers to unknown type {}",
                            def.full_name(),
                            target
                        )));
                    }
                }
            }
        }
        Ok(())
    }

    pub fn types(&self) -> impl Iterator<Item = &TypeDef> {
        self.types.iter()
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Definition by engine name (`NAME`, `SCHEMA.NAME`, quoted parts).
    pub fn get(&self, type_name: &str) -> Option<&TypeDef> {
        self.index_of(type_name).map(|index| &self.types[index])
    }

    pub(crate) fn by_index(&self, index: usize) -> Option<&TypeDef> {
        self.types.get(index)
    }

    pub(crate) fn index_of(&self, type_name: &str) -> Option<usize> {
        let (schema, base) = split_qualified(type_name);
        let schema = schema.map_or_else(|| self.default_schema.clone(), fold);
        let key = name::full_name(&schema, &fold(base));
        self.by_name.get(&key).copied()
    }
}

/// Fold one identifier: strip quotes (keeping case), else uppercase.
fn fold(ident: &str) -> String {
    let ident = ident.trim();
    if ident.contains(QUOTE) {
        name::unquote(ident).to_string()
    } else {
        ident.to_uppercase()
    }
}

/// Split on the first separator outside quotes.
fn split_qualified(qualified: &str) -> (Option<&str>, &str) {
    let mut quoted = false;
    for (pos, c) in qualified.char_indices() {
        if c == QUOTE {
            quoted = !quoted;
        } else if c == SCHEMA_SEPARATOR && !quoted {
            return (Some(&qualified[..pos]), &qualified[pos + 1..]);
        }
    }
    (None, qualified)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hr_catalog() -> Catalog {
        let mut catalog = Catalog::with_default_schema("hr");
        catalog
            .add(
                TypeDefBuilder::structure("address")
                    .attribute("street", DataTypeDef::varchar(100))
                    .attribute("zip", DataTypeDef::varchar(10))
                    .build(),
            )
            .expect("add ADDRESS");
        catalog
            .add(TypeDefBuilder::collection("address_list", DataTypeDef::object("address")).build())
            .expect("add ADDRESS_LIST");
        catalog
    }

    #[test]
    fn test_lookup_forms() {
        let catalog = hr_catalog();
        assert_eq!(catalog.default_schema(), "HR");
        assert!(catalog.get("ADDRESS").is_some());
        assert!(catalog.get("HR.ADDRESS").is_some());
        assert!(catalog.get("hr.address").is_some());
        assert!(catalog.get("\"HR\".\"ADDRESS\"").is_some());
        assert!(catalog.get("\"address\"").is_none());
        assert!(catalog.get("SCOTT.ADDRESS").is_none());
    }

    #[test]
    fn test_quoted_names_keep_case() {
        let mut catalog = Catalog::new();
        catalog
            .add(
                TypeDefBuilder::structure("\"Point\"")
                    .attribute("\"x\"", DataTypeDef::scalar(EngineType::NativeDouble))
                    .build(),
            )
            .expect("add Point");
        let def = catalog.get("\"Point\"").expect("quoted lookup");
        assert_eq!(def.name, "Point");
        assert_eq!(def.attributes()[0].name, "x");
        assert!(catalog.get("POINT").is_none());
        assert!(catalog.get("PUBLIC.\"Point\"").is_some());
    }

    #[test]
    fn test_duplicates_rejected() {
        let mut catalog = hr_catalog();
        let err = catalog
            .add(TypeDefBuilder::structure("ADDRESS").build())
            .expect_err("duplicate type");
        assert!(err.to_string().contains("duplicate type HR.ADDRESS"));

        let err = Catalog::new()
            .add(
                TypeDefBuilder::structure("T")
                    .attribute("a", DataTypeDef::varchar(1))
                    .attribute("A", DataTypeDef::varchar(1))
                    .build(),
            )
            .map(|_| ())
            .expect_err("duplicate attribute");
        assert!(matches!(err, Error::Catalog(_)));
    }

    #[test]
    fn test_validate_unknown_reference() {
        let mut catalog = hr_catalog();
        assert!(catalog.validate().is_ok());
        catalog
            .add(TypeDefBuilder::collection("PHONES", DataTypeDef::object("PHONE")).build())
            .expect("add PHONES");
        let err = catalog.validate().expect_err("PHONE is unknown");
        assert!(err.to_string().contains("unknown type PHONE"));
    }

    #[test]
    fn test_character_info_sizes() {
        let info = DataTypeDef::varchar(30).to_info();
        assert_eq!(info.engine_type, EngineType::Varchar);
        assert_eq!(info.char_size, 30);
        let info = DataTypeDef::number(5, 2).to_info();
        assert_eq!((info.precision, info.scale, info.char_size), (5, 2, 0));
    }
}
