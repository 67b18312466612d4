// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! YAML catalog loader.
//!
//! # Example YAML
//!
//! ```yaml
//! default_schema: HR
//! types:
//!   - name: ADDRESS
//!     attributes:
//!       - { name: STREET, type: VARCHAR2, size: 100 }
//!       - { name: ZIP, type: VARCHAR2, size: 10 }
//!       - { name: UNITS, type: NUMBER, precision: 5 }
//!   - name: ADDRESS_LIST
//!     collection_of: { type: OBJECT, object: ADDRESS }
//! ```

use super::catalog::{Catalog, DataTypeDef, TypeDefBuilder};
use crate::bridge::EngineType;
use crate::error::{Error, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;

/// Root YAML document.
#[derive(Debug, Deserialize)]
pub struct YamlCatalog {
    /// Schema for types without an explicit one (engine default otherwise).
    #[serde(default)]
    pub default_schema: Option<String>,

    #[serde(default)]
    pub types: Vec<YamlType>,
}

/// One type: either `attributes` or `collection_of`.
#[derive(Debug, Deserialize)]
pub struct YamlType {
    pub name: String,

    #[serde(default)]
    pub schema: Option<String>,

    #[serde(default)]
    pub attributes: Option<Vec<YamlAttribute>>,

    #[serde(default)]
    pub collection_of: Option<YamlDataType>,
}

#[derive(Debug, Deserialize)]
pub struct YamlAttribute {
    pub name: String,

    #[serde(flatten)]
    pub data_type: YamlDataType,
}

/// Engine type spelled as in SQL (`VARCHAR2`, `NUMBER`, `OBJECT`, ...).
#[derive(Debug, Deserialize)]
pub struct YamlDataType {
    #[serde(rename = "type")]
    pub type_name: String,

    #[serde(default)]
    pub size: u32,

    #[serde(default)]
    pub precision: i16,

    #[serde(default)]
    pub scale: i8,

    #[serde(default)]
    pub fs_precision: u8,

    /// Referenced type for `OBJECT`.
    #[serde(default)]
    pub object: Option<String>,
}

impl YamlDataType {
    fn to_def(&self, context: &str) -> Result<DataTypeDef> {
        let engine_type = EngineType::from_sql_name(&self.type_name).ok_or_else(|| {
            Error::Catalog(format!("{}: unknown type {}", context, self.type_name))
        })?;
        if engine_type == EngineType::Object {
            let target = self.object.as_deref().ok_or_else(|| {
                Error::Catalog(format!("{}: OBJECT without `object` reference", context))
            })?;
            return Ok(DataTypeDef::object(target));
        }
        Ok(DataTypeDef::Scalar {
            engine_type,
            size: self.size,
            precision: self.precision,
            scale: self.scale,
            fs_precision: self.fs_precision,
        })
    }
}

impl YamlCatalog {
    /// Load a catalog document from a YAML file.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let yaml_content = fs::read_to_string(path)?;
        Self::parse_yaml(&yaml_content)
    }

    /// Parse YAML content.
    pub fn parse_yaml(yaml_content: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml_content)?)
    }

    /// Build and validate the catalog.
    pub fn into_catalog(self) -> Result<Catalog> {
        let mut catalog = match &self.default_schema {
            Some(schema) => Catalog::with_default_schema(schema),
            None => Catalog::new(),
        };

        for ty in &self.types {
            let mut builder = match (&ty.attributes, &ty.collection_of) {
                (Some(_), Some(_)) => {
                    return Err(Error::Catalog(format!(
                        "{}: both attributes and collection_of given",
                        ty.name
                    )))
                }
                (_, Some(element)) => {
                    TypeDefBuilder::collection(&ty.name, element.to_def(&ty.name)?)
                }
                (_, None) => TypeDefBuilder::structure(&ty.name),
            };
            if let Some(schema) = &ty.schema {
                builder = builder.schema(schema);
            }
            for attr in ty.attributes.iter().flatten() {
                let context = format!("{}.{}", ty.name, attr.name);
                builder = builder.attribute(&attr.name, attr.data_type.to_def(&context)?);
            }
            catalog.add(builder.build())?;
        }

        catalog.validate()?;
        Ok(catalog)
    }
}
