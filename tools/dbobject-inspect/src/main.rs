// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

use anyhow::Context;
use clap::{Parser, Subcommand};
use dbobject::bridge::memory::{DataTypeDef, MemoryBridge, TypeDef};
use dbobject::{AttributeDescriptor, ObjectType, TypeRegistry};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "dbobject-inspect")]
#[command(about = "Inspect object types served from a YAML engine catalog")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the types defined in a catalog
    List {
        /// Catalog YAML file
        #[arg(value_name = "CATALOG")]
        catalog: PathBuf,
    },

    /// Resolve a type and show its attributes or element type
    Describe {
        /// Catalog YAML file
        #[arg(value_name = "CATALOG")]
        catalog: PathBuf,

        /// Type name, optionally schema-qualified
        #[arg(value_name = "TYPE")]
        type_name: String,

        /// Emit JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Create an instance and show its initial attribute values
    Sample {
        /// Catalog YAML file
        #[arg(value_name = "CATALOG")]
        catalog: PathBuf,

        /// Type name, optionally schema-qualified
        #[arg(value_name = "TYPE")]
        type_name: String,
    },
}

#[derive(Debug, Serialize)]
struct TypeReport {
    name: String,
    kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    element: Option<DataTypeReport>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    attributes: Vec<AttributeReport>,
}

#[derive(Debug, Serialize)]
struct AttributeReport {
    name: String,
    #[serde(flatten)]
    data_type: DataTypeReport,
}

#[derive(Debug, Serialize)]
struct DataTypeReport {
    type_name: String,
    engine_type: String,
    native_tag: String,
    #[serde(skip_serializing_if = "is_zero")]
    size: u32,
    #[serde(skip_serializing_if = "is_zero")]
    precision: i64,
    #[serde(skip_serializing_if = "is_zero")]
    scale: i64,
    #[serde(skip_serializing_if = "is_zero")]
    fs_precision: i64,
}

fn is_zero<T: Default + PartialEq>(v: &T) -> bool {
    *v == T::default()
}

impl DataTypeReport {
    fn from_type(ty: &ObjectType) -> Self {
        Self {
            type_name: ty.full_name(),
            engine_type: ty.engine_type().to_string(),
            native_tag: ty.native_tag().to_string(),
            size: ty.db_size(),
            precision: i64::from(ty.precision()),
            scale: i64::from(ty.scale()),
            fs_precision: i64::from(ty.fs_precision()),
        }
    }

    fn from_attribute(attr: &AttributeDescriptor) -> Self {
        let info = attr.data_type();
        Self {
            type_name: attr.object_type().full_name(),
            engine_type: info.engine_type.to_string(),
            native_tag: info.native_tag.to_string(),
            size: info.db_size,
            precision: i64::from(info.precision),
            scale: i64::from(info.scale),
            fs_precision: i64::from(info.fs_precision),
        }
    }

    fn render(&self) -> String {
        let mut out = format!("{} ({}, {})", self.type_name, self.engine_type, self.native_tag);
        if self.size > 0 {
            out.push_str(&format!(" size={}", self.size));
        }
        if self.precision != 0 || self.scale != 0 {
            out.push_str(&format!(" precision={} scale={}", self.precision, self.scale));
        }
        if self.fs_precision > 0 {
            out.push_str(&format!(" fs_precision={}", self.fs_precision));
        }
        out
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::List { catalog } => cmd_list(&catalog)?,
        Commands::Describe {
            catalog,
            type_name,
            json,
        } => cmd_describe(&catalog, &type_name, json)?,
        Commands::Sample { catalog, type_name } => cmd_sample(&catalog, &type_name)?,
    }

    Ok(())
}

fn load(path: &Path) -> anyhow::Result<Arc<MemoryBridge>> {
    let bridge = MemoryBridge::from_yaml_file(path)
        .with_context(|| format!("loading catalog {}", path.display()))?;
    log::info!(
        "[inspect] {} types in {}",
        bridge.catalog().len(),
        path.display()
    );
    Ok(Arc::new(bridge))
}

fn describe_def(def: &DataTypeDef) -> String {
    match def {
        DataTypeDef::Object(target) => format!("OBJECT {}", target),
        DataTypeDef::Scalar { engine_type, .. } => engine_type.to_string(),
    }
}

fn cmd_list(path: &Path) -> anyhow::Result<()> {
    let bridge = load(path)?;
    let catalog = bridge.catalog();
    if catalog.is_empty() {
        println!("[OK] {}: no types", path.display());
        return Ok(());
    }

    println!("[OK] {}: {} types\n", path.display(), catalog.len());
    for def in catalog.types() {
        println!("  {}", summary(def));
    }
    Ok(())
}

fn summary(def: &TypeDef) -> String {
    match def.element() {
        Some(element) => format!("{:<32} collection of {}", def.full_name(), describe_def(element)),
        None => format!(
            "{:<32} {} attributes",
            def.full_name(),
            def.attributes().len()
        ),
    }
}

fn report(ty: &ObjectType) -> TypeReport {
    let element = ty.collection_of().map(|e| DataTypeReport::from_type(&e));
    let attributes = ty
        .attributes()
        .map(|attributes| {
            attributes
                .values()
                .map(|attr| AttributeReport {
                    name: attr.name().to_string(),
                    data_type: DataTypeReport::from_attribute(attr),
                })
                .collect()
        })
        .unwrap_or_default();
    TypeReport {
        name: ty.full_name(),
        kind: if ty.is_collection() { "collection" } else { "object" },
        element,
        attributes,
    }
}

fn cmd_describe(path: &Path, type_name: &str, json: bool) -> anyhow::Result<()> {
    let registry = TypeRegistry::new(load(path)?);
    let ty = registry.lookup(type_name)?;
    let report = report(&ty);

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{} ({})", report.name, report.kind);
        if let Some(element) = &report.element {
            println!("  element: {}", element.render());
        }
        for attr in &report.attributes {
            println!("  {:<24} {}", attr.name, attr.data_type.render());
        }
    }

    log::debug!("[inspect] cached: {}", registry.cached_names().join(", "));
    drop(ty);
    registry.close()?;
    Ok(())
}

fn cmd_sample(path: &Path, type_name: &str) -> anyhow::Result<()> {
    let bridge = load(path)?;
    let registry = TypeRegistry::new(bridge.clone());
    let ty = registry.lookup(type_name)?;

    if ty.is_collection() {
        let collection = ty.new_collection()?;
        println!(
            "{}: collection with {} elements",
            ty,
            collection.len()?
        );
        return Ok(());
    }

    let mut instance = ty.new_instance()?;
    println!("{}:", ty);
    if let Some(attributes) = ty.attributes() {
        for name in attributes.keys() {
            let datum = instance
                .get(&format!("\"{}\"", name))
                .with_context(|| format!("reading {}", name))?;
            println!("  {:<24} {:?}", name, datum);
        }
    }
    instance.close()?;
    drop(ty);
    registry.close()?;

    let live = bridge.live_handles();
    if !live.is_zero() {
        anyhow::bail!("engine handles still open: {:?}", live);
    }
    Ok(())
}
