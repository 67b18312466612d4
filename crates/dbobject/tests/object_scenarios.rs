// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

#![allow(clippy::uninlined_format_args)] // Test/bench code readability over pedantic
#![allow(clippy::float_cmp)] // Test assertions with constants
#![allow(clippy::missing_panics_doc)] // Tests/examples panic on failure
#![allow(clippy::too_many_lines)] // Example/test code

//! End-to-end object scenarios through the public API.
//!
//! Types are resolved from an in-memory engine catalog; every test checks
//! that all engine handles are released at the end.

use chrono::{NaiveDate, TimeDelta};
use dbobject::bridge::memory::{Catalog, DataTypeDef, MemoryBridge, TypeDefBuilder};
use dbobject::bridge::EngineType;
use dbobject::{CollectionInstance, Datum, Error, FromDatum, ObjectInstance, TypeRegistry, Value};
use std::sync::Arc;

fn order_catalog() -> Catalog {
    let mut catalog = Catalog::with_default_schema("SALES");
    catalog
        .add(
            TypeDefBuilder::structure("LINE_ITEM")
                .attribute("SKU", DataTypeDef::varchar(20))
                .attribute("QTY", DataTypeDef::scalar(EngineType::NativeInt))
                .attribute("PRICE", DataTypeDef::number(10, 2))
                .build(),
        )
        .expect("LINE_ITEM");
    catalog
        .add(TypeDefBuilder::collection("LINE_ITEMS", DataTypeDef::object("LINE_ITEM")).build())
        .expect("LINE_ITEMS");
    catalog
        .add(
            TypeDefBuilder::structure("ORDER_T")
                .attribute("ID", DataTypeDef::number(0, 0))
                .attribute("PLACED", DataTypeDef::scalar(EngineType::Timestamp))
                .attribute("TTL", DataTypeDef::scalar(EngineType::IntervalDs))
                .attribute("PAID", DataTypeDef::scalar(EngineType::Boolean))
                .attribute("BLOB", DataTypeDef::scalar(EngineType::Raw).with_size(16))
                .attribute("ITEMS", DataTypeDef::object("LINE_ITEMS"))
                .build(),
        )
        .expect("ORDER_T");
    catalog
        .add(TypeDefBuilder::collection("SCORES", DataTypeDef::scalar(EngineType::NativeDouble)).build())
        .expect("SCORES");
    catalog
}

fn setup() -> (Arc<MemoryBridge>, TypeRegistry) {
    let bridge = Arc::new(MemoryBridge::new(order_catalog()).expect("valid catalog"));
    let registry = TypeRegistry::new(bridge.clone());
    (bridge, registry)
}

fn line_item(registry: &TypeRegistry, sku: &str, qty: i64, price: &str) -> ObjectInstance {
    let mut item = registry
        .lookup("line_item")
        .and_then(|t| t.new_instance())
        .expect("LINE_ITEM instance");
    item.set("SKU", sku).expect("sku");
    item.set("QTY", qty).expect("qty");
    item.set("PRICE", Datum::Number(price.into())).expect("price");
    item
}

#[test]
fn test_order_roundtrip() {
    let (bridge, registry) = setup();
    let placed = NaiveDate::from_ymd_opt(2025, 3, 14)
        .and_then(|d| d.and_hms_opt(9, 26, 53))
        .expect("valid timestamp");

    {
        let mut order = registry
            .lookup("ORDER_T")
            .and_then(|t| t.new_instance())
            .expect("ORDER_T instance");
        let mut items = registry
            .lookup("LINE_ITEMS")
            .and_then(|t| t.new_collection())
            .expect("LINE_ITEMS");

        items.append(line_item(&registry, "A-1", 2, "9.99")).expect("append");
        items.append(line_item(&registry, "B-7", 1, "120.5")).expect("append");

        order.set("ID", 1001).expect("id");
        order.set("PLACED", placed).expect("placed");
        order.set("TTL", TimeDelta::hours(48)).expect("ttl");
        order.set("PAID", true).expect("paid");
        order.set("BLOB", vec![0xde_u8, 0xad, 0xbe, 0xef]).expect("blob");
        order.set("ITEMS", items).expect("items");

        assert_eq!(order.get("ID").expect("id"), Datum::Number("1001".into()));
        assert_eq!(order.get("PLACED").expect("placed"), Datum::Timestamp(placed));
        assert_eq!(order.get("TTL").expect("ttl"), Datum::Interval(TimeDelta::hours(48)));
        assert_eq!(order.get("PAID").expect("paid"), Datum::Bool(true));
        assert_eq!(
            order.get("BLOB").expect("blob"),
            Datum::Bytes(vec![0xde, 0xad, 0xbe, 0xef])
        );

        let Datum::Collection(mut stored) = order.get("ITEMS").expect("items") else {
            panic!("ITEMS should decode as a collection");
        };
        assert_eq!(stored.len().expect("len"), 2);
        let mut lines: Vec<ObjectInstance> = stored.to_vec().expect("lines");
        let skus: Vec<String> = lines
            .iter_mut()
            .map(|line| line.get("SKU").and_then(String::from_datum))
            .collect::<Result<_, _>>()
            .expect("skus");
        assert_eq!(skus, vec!["A-1", "B-7"]);
        assert_eq!(lines[1].get("PRICE").expect("price").as_f64(), Some(120.5));
        assert_eq!(lines[0].get("QTY").expect("qty").as_i64(), Some(2));
    }

    registry.close().expect("close");
    assert!(bridge.live_handles().is_zero(), "{:?}", bridge.live_handles());
}

#[test]
fn test_collection_walkthrough() {
    let (bridge, registry) = setup();
    {
        let mut items = registry
            .lookup("LINE_ITEMS")
            .and_then(|t| t.new_collection())
            .expect("LINE_ITEMS");
        let a1 = line_item(&registry, "A-1", 1, "1");
        let a2 = line_item(&registry, "A-2", 2, "2");
        items.append_object(&a1).expect("a1");
        items.append_object(&a2).expect("a2");
        assert_eq!(items.len().expect("len"), 2);

        items.delete(0).expect("delete");
        assert_eq!(items.first().expect("first"), 1);
        assert_eq!(items.last().expect("last"), 1);
        assert!(!items.exists(0).expect("exists"));
        assert!(matches!(items.get(0), Err(Error::NotExist(Some(0)))));

        let Datum::Object(mut second) = items.get(1).expect("get") else {
            panic!("expected an object element");
        };
        assert_eq!(second.get("SKU").expect("sku"), Datum::Text("A-2".into()));

        // Elements are stored by value.
        let mut a2 = a2;
        a2.set("SKU", "changed").expect("set");
        assert_eq!(second.get("SKU").expect("sku"), Datum::Text("A-2".into()));
    }
    registry.close().expect("close");
    assert!(bridge.live_handles().is_zero());
}

#[test]
fn test_scalar_collection_with_caller_value() {
    let (_bridge, registry) = setup();
    let mut scores = registry
        .lookup("SCORES")
        .and_then(|t| t.new_collection())
        .expect("SCORES");
    let element = scores.element_type().expect("element");
    assert_eq!(element.engine_type(), EngineType::NativeDouble);
    assert!(element.is_scalar());

    let mut value = Value::new();
    for score in [1.5_f64, 2.25, 4.0] {
        value.set(&Datum::Double(score)).expect("encode");
        scores.append_value(&mut value).expect("append");
    }
    scores.set_item(1, &mut value).expect("overwrite");

    let mut total = 0.0;
    let mut out = Value::new();
    for index in scores.indices() {
        let index = index.expect("index");
        scores.get_item_into(&mut out, index).expect("read");
        total += out.get().expect("decode").as_f64().expect("double");
    }
    assert_eq!(total, 1.5 + 4.0 + 4.0);

    let back: Vec<f64> = scores.to_vec().expect("doubles");
    assert_eq!(back, vec![1.5, 4.0, 4.0]);
}

#[test]
fn test_wrong_element_type_is_rejected() {
    let (_bridge, registry) = setup();
    let mut items = registry
        .lookup("LINE_ITEMS")
        .and_then(|t| t.new_collection())
        .expect("LINE_ITEMS");
    let scores = registry
        .lookup("SCORES")
        .and_then(|t| t.new_collection())
        .expect("SCORES");
    let err = items.append_object(&scores).expect_err("wrong element type");
    assert!(matches!(err, Error::Bridge { .. }));
    assert_eq!(items.len().expect("len"), 0);
}

#[test]
fn test_instances_outlive_their_lookup() {
    let (bridge, registry) = setup();
    let collection: CollectionInstance = registry
        .lookup("SCORES")
        .and_then(|t| t.new_collection())
        .expect("SCORES");
    drop(registry);
    // The registry closed the type; the instance still owns its object.
    assert_eq!(bridge.live_handles().objects, 1);
    drop(collection);
    assert!(bridge.live_handles().is_zero());
}

#[test]
fn test_registry_shared_across_threads() {
    let (bridge, registry) = setup();
    let registry = Arc::new(registry);

    let workers: Vec<_> = (0..4)
        .map(|i| {
            let registry = Arc::clone(&registry);
            std::thread::spawn(move || {
                let order = registry.lookup("sales.order_t").expect("lookup");
                let mut instance = order.new_instance().expect("instance");
                instance.set("ID", i).expect("id");
                instance.get("ID").expect("id")
            })
        })
        .collect();
    for (i, worker) in workers.into_iter().enumerate() {
        let id = worker.join().expect("worker");
        assert_eq!(id.as_i64(), Some(i as i64));
    }

    let order = registry.lookup("ORDER_T").expect("lookup");
    assert!(order.same_as(&registry.lookup("SALES.ORDER_T").expect("lookup")));
    drop(order);
    registry.close().expect("close");
    assert!(bridge.live_handles().is_zero());
}
