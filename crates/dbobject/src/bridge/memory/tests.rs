// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

use super::*;
use crate::bridge::{EngineType, Payload};

fn hr_bridge() -> MemoryBridge {
    let mut catalog = Catalog::with_default_schema("HR");
    catalog
        .add(
            TypeDefBuilder::structure("ADDRESS")
                .attribute("STREET", DataTypeDef::varchar(100))
                .attribute("ZIP", DataTypeDef::varchar(10))
                .build(),
        )
        .expect("add ADDRESS");
    catalog
        .add(TypeDefBuilder::collection("ADDRESS_LIST", DataTypeDef::object("ADDRESS")).build())
        .expect("add ADDRESS_LIST");
    catalog
        .add(TypeDefBuilder::collection("NUMBERS", DataTypeDef::number(0, 0)).build())
        .expect("add NUMBERS");
    MemoryBridge::new(catalog).expect("valid catalog")
}

fn text(s: &str) -> NativeData {
    NativeData::with(Payload::Bytes(s.as_bytes().to_vec()))
}

#[test]
fn test_type_handles_are_counted() {
    let bridge = hr_bridge();
    let address = bridge.get_object_type("HR.ADDRESS").expect("lookup");
    bridge.type_add_ref(address).expect("add ref");
    assert_eq!(bridge.live_handles().types, 1);

    bridge.type_release(address).expect("release");
    assert_eq!(bridge.live_handles().types, 1);
    bridge.type_release(address).expect("last release");
    assert!(bridge.live_handles().is_zero());

    assert!(bridge.type_release(address).is_err());
    assert_eq!(bridge.last_error().code, codes::INVALID_HANDLE);
}

#[test]
fn test_unknown_type() {
    let bridge = hr_bridge();
    assert!(bridge.get_object_type("HR.PHONE").is_err());
    let err = bridge.last_error();
    assert_eq!(err.code, codes::TYPE_NOT_FOUND);
    assert!(err.message.contains("HR.PHONE"));
}

#[test]
fn test_type_info_and_attributes() {
    let bridge = hr_bridge();
    let list = bridge.get_object_type("ADDRESS_LIST").expect("lookup");
    let info = bridge.type_info(list).expect("type info");
    assert_eq!((info.schema.as_str(), info.name.as_str()), ("HR", "ADDRESS_LIST"));
    assert!(info.is_collection);
    let element = info.element.expect("element type");
    assert_eq!(element.engine_type, EngineType::Object);
    let nested = element.object_type.expect("nested handle");
    // The element handle belongs to the collection type.
    assert_eq!(bridge.live_handles().types, 2);

    let address_info = bridge.type_info(nested).expect("nested info");
    assert_eq!(address_info.num_attributes, 2);
    let attrs = bridge
        .type_attributes(nested, address_info.num_attributes)
        .expect("attributes");
    let street = bridge.attr_info(attrs[0]).expect("attr info");
    assert_eq!(street.name, "STREET");
    assert_eq!(street.type_info.char_size, 100);

    assert!(bridge.type_attributes(nested, 3).is_err());
    assert_eq!(bridge.last_error().code, codes::ATTRIBUTE_COUNT);

    for attr in attrs {
        bridge.attr_release(attr).expect("release attr");
    }
    bridge.type_release(list).expect("release list");
    assert!(bridge.live_handles().is_zero());
}

#[test]
fn test_attributes_start_uninitialized() {
    let bridge = hr_bridge();
    let address = bridge.get_object_type("ADDRESS").expect("lookup");
    let attrs = bridge.type_attributes(address, 2).expect("attributes");
    let obj = bridge.create_object(address).expect("create");

    let mut out = NativeData::null();
    assert!(bridge
        .get_attribute_value(obj, attrs[0], NativeTag::Bytes, &mut out)
        .is_err());
    assert_eq!(bridge.last_error().code, codes::NOT_INITIALIZED);

    bridge
        .set_attribute_value(obj, attrs[0], NativeTag::Bytes, &text("Main St"))
        .expect("set");
    bridge
        .get_attribute_value(obj, attrs[0], NativeTag::Bytes, &mut out)
        .expect("get");
    assert_eq!(out.as_bytes(), Some(&b"Main St"[..]));

    bridge
        .set_attribute_value(obj, attrs[1], NativeTag::Bytes, &NativeData::null())
        .expect("set null");
    bridge
        .get_attribute_value(obj, attrs[1], NativeTag::Bytes, &mut out)
        .expect("get null");
    assert!(out.is_null);

    assert!(bridge
        .set_attribute_value(obj, attrs[1], NativeTag::Bytes, &text("12345678901"))
        .is_err());
    assert_eq!(bridge.last_error().code, codes::VALUE_TOO_LARGE);

    bridge.object_release(obj).expect("release");
    for attr in attrs {
        bridge.attr_release(attr).expect("release attr");
    }
    bridge.type_release(address).expect("release type");
    assert!(bridge.live_handles().is_zero());
}

#[test]
fn test_sparse_collection() {
    let bridge = hr_bridge();
    let numbers = bridge.get_object_type("NUMBERS").expect("lookup");
    let obj = bridge.create_object(numbers).expect("create");

    for v in 0..4i64 {
        bridge
            .append_element(obj, NativeTag::Int64, &NativeData::with(Payload::Int64(v * 10)))
            .expect("append");
    }
    assert_eq!(bridge.size(obj).ok(), Some(4));

    bridge.delete_element(obj, 1).expect("delete");
    assert_eq!(bridge.size(obj).ok(), Some(3));
    assert_eq!(bridge.element_exists(obj, 1).ok(), Some(false));
    assert_eq!(bridge.first_index(obj).ok(), Some(Some(0)));
    assert_eq!(bridge.next_index(obj, 0).ok(), Some(Some(2)));
    assert_eq!(bridge.last_index(obj).ok(), Some(Some(3)));
    assert_eq!(bridge.next_index(obj, 3).ok(), Some(None));

    assert!(bridge.delete_element(obj, 1).is_err());
    assert_eq!(bridge.last_error().code, codes::NO_SUCH_ELEMENT);

    // Deleting the last element makes the next append reuse its index.
    bridge.delete_element(obj, 3).expect("delete last");
    bridge
        .append_element(obj, NativeTag::Bytes, &text("7.25"))
        .expect("append text");
    assert_eq!(bridge.last_index(obj).ok(), Some(Some(3)));

    let mut out = NativeData::null();
    out.presize_bytes(39);
    bridge
        .get_element(obj, 2, NativeTag::Bytes, &mut out)
        .expect("read as text");
    assert_eq!(out.as_bytes(), Some(&b"20"[..]));
    bridge
        .get_element(obj, 3, NativeTag::Double, &mut out)
        .expect("read as double");
    assert_eq!(out.payload, Payload::Double(7.25));

    assert!(bridge.trim(obj, 5).is_err());
    assert_eq!(bridge.last_error().code, codes::TRIM_TOO_LARGE);
    bridge.trim(obj, 2).expect("trim");
    assert_eq!(bridge.first_index(obj).ok(), Some(Some(0)));
    assert_eq!(bridge.last_index(obj).ok(), Some(Some(0)));

    bridge.object_release(obj).expect("release");
    bridge.type_release(numbers).expect("release type");
    assert!(bridge.live_handles().is_zero());
}

#[test]
fn test_objects_stored_by_copy() {
    let bridge = hr_bridge();
    let address = bridge.get_object_type("ADDRESS").expect("lookup");
    let list_type = bridge.get_object_type("ADDRESS_LIST").expect("lookup");
    let attrs = bridge.type_attributes(address, 2).expect("attributes");

    let a1 = bridge.create_object(address).expect("create");
    bridge
        .set_attribute_value(a1, attrs[0], NativeTag::Bytes, &text("Main St"))
        .expect("set");
    let list = bridge.create_object(list_type).expect("create list");
    bridge
        .append_element(list, NativeTag::Object, &NativeData::with(Payload::Object(a1)))
        .expect("append");
    assert_eq!(bridge.live_handles().objects, 3);

    // Changing the source does not change the stored copy.
    bridge
        .set_attribute_value(a1, attrs[0], NativeTag::Bytes, &text("Side St"))
        .expect("set");
    let mut element = NativeData::null();
    bridge
        .get_element(list, 0, NativeTag::Object, &mut element)
        .expect("get element");
    let Payload::Object(embedded) = element.payload else {
        panic!("expected an object payload");
    };
    assert_ne!(embedded, a1);
    let mut street = NativeData::null();
    bridge
        .get_attribute_value(embedded, attrs[0], NativeTag::Bytes, &mut street)
        .expect("get street");
    assert_eq!(street.as_bytes(), Some(&b"Main St"[..]));

    // Wrong element type.
    assert!(bridge
        .append_element(list, NativeTag::Object, &NativeData::with(Payload::Object(list)))
        .is_err());
    assert_eq!(bridge.last_error().code, codes::WRONG_OBJECT_TYPE);

    // Freeing the container frees the embedded copy.
    bridge.object_release(list).expect("release list");
    assert_eq!(bridge.live_handles().objects, 1);
    bridge.object_release(a1).expect("release a1");

    for attr in attrs {
        bridge.attr_release(attr).expect("release attr");
    }
    bridge.type_release(address).expect("release");
    bridge.type_release(list_type).expect("release");
    assert!(bridge.live_handles().is_zero());
}

#[test]
fn test_injected_failure_fires_once() {
    let bridge = hr_bridge();
    bridge.inject_failure_after(FailPoint::GetObjectType, 1);
    let first = bridge.get_object_type("ADDRESS").expect("first call passes");
    assert!(bridge.get_object_type("ADDRESS").is_err());
    assert_eq!(bridge.last_error().code, codes::INJECTED);
    let third = bridge.get_object_type("ADDRESS").expect("disarmed");

    bridge.inject_failure(FailPoint::TypeRelease);
    bridge.clear_failures();
    bridge.type_release(first).expect("release");
    bridge.type_release(third).expect("release");
    assert!(bridge.live_handles().is_zero());
}

#[test]
fn test_last_error_is_per_thread() {
    let bridge = std::sync::Arc::new(hr_bridge());
    assert!(bridge.get_object_type("NOPE").is_err());

    let other = std::sync::Arc::clone(&bridge);
    let code = std::thread::spawn(move || other.last_error().code)
        .join()
        .expect("thread");
    assert_eq!(code, codes::NO_ERROR);
    assert_eq!(bridge.last_error().code, codes::TYPE_NOT_FOUND);
}
