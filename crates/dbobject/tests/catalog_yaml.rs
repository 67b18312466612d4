// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

#![allow(clippy::uninlined_format_args)] // Test/bench code readability over pedantic
#![allow(clippy::missing_panics_doc)] // Tests/examples panic on failure

//! YAML catalog files loaded into the in-memory engine.

use dbobject::bridge::memory::{MemoryBridge, YamlCatalog};
use dbobject::bridge::EngineType;
use dbobject::{Datum, Error, TypeRegistry};
use std::io::Write;
use std::sync::Arc;
use tempfile::NamedTempFile;

const HR_CATALOG: &str = r#"
default_schema: HR
types:
  - name: ADDRESS
    attributes:
      - { name: STREET, type: VARCHAR2, size: 100 }
      - { name: ZIP, type: VARCHAR2, size: 10 }
      - { name: UNITS, type: NUMBER, precision: 5 }
  - name: ADDRESS_LIST
    collection_of: { type: OBJECT, object: ADDRESS }
  - name: EMPLOYEE
    schema: PAYROLL
    attributes:
      - { name: NAME, type: VARCHAR2, size: 50 }
      - { name: HIRED, type: TIMESTAMP, fs_precision: 6 }
      - { name: ADDRESSES, type: OBJECT, object: HR.ADDRESS_LIST }
"#;

fn write_catalog(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("temp file");
    file.write_all(content.as_bytes()).expect("write catalog");
    file
}

#[test]
fn test_load_catalog_file() {
    let file = write_catalog(HR_CATALOG);
    let bridge = Arc::new(MemoryBridge::from_yaml_file(file.path()).expect("load"));
    assert_eq!(bridge.catalog().len(), 3);

    let registry = TypeRegistry::new(bridge.clone());
    let employee = registry.lookup("payroll.employee").expect("EMPLOYEE");
    assert_eq!(employee.schema(), "PAYROLL");

    let hired = employee.attribute("HIRED").expect("HIRED");
    assert_eq!(hired.engine_type(), EngineType::Timestamp);
    assert_eq!(hired.object_type().fs_precision(), 6);

    let addresses = employee.attribute("ADDRESSES").expect("ADDRESSES");
    let list = addresses.object_type();
    assert_eq!(list.full_name(), "HR.ADDRESS_LIST");
    let element = list.collection_of().expect("element");
    assert!(element.same_as(&registry.lookup("hr.address").expect("ADDRESS")));

    let mut address = element.new_instance().expect("instance");
    address.set("UNITS", 7).expect("units");
    assert_eq!(address.get("UNITS").expect("units"), Datum::Number("7".into()));

    drop((employee, addresses, element, address));
    registry.close().expect("close");
    assert!(bridge.live_handles().is_zero());
}

#[test]
fn test_load_document_then_build() {
    let file = write_catalog(HR_CATALOG);
    let document = YamlCatalog::load_from_file(file.path()).expect("parse");
    assert_eq!(document.default_schema.as_deref(), Some("HR"));
    assert_eq!(document.types.len(), 3);

    let catalog = document.into_catalog().expect("catalog");
    let address = catalog.get("ADDRESS").expect("ADDRESS");
    assert_eq!(address.attributes().len(), 3);
    assert!(!address.is_collection());
}

#[test]
fn test_missing_file() {
    let dir = tempfile::tempdir().expect("temp dir");
    let err = MemoryBridge::from_yaml_file(dir.path().join("missing.yaml")).expect_err("no file");
    assert!(matches!(err, Error::Io(_)));
}

#[test]
fn test_dangling_reference_is_rejected() {
    let file = write_catalog(
        r#"
types:
  - name: PERSON
    attributes:
      - { name: HOME, type: OBJECT, object: ADDRESS }
"#,
    );
    let err = MemoryBridge::from_yaml_file(file.path()).expect_err("unknown ADDRESS");
    assert!(matches!(err, Error::Catalog(ref msg) if msg.contains("ADDRESS")), "{}", err);
}

#[test]
fn test_duplicate_type_is_rejected() {
    let err = MemoryBridge::from_yaml_str(
        r#"
types:
  - name: T
    attributes: [{ name: A, type: NUMBER }]
  - name: t
    attributes: [{ name: B, type: NUMBER }]
"#,
    )
    .expect_err("duplicate");
    assert!(matches!(err, Error::Catalog(_)));
}
