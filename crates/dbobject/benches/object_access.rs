// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com
//!
//! Benchmark: attribute and element access through the in-memory engine
//!
//! Measures the per-call overhead of the object layer (name folding,
//! attribute lookup, scratch value reuse) on top of the bridge.

#![allow(clippy::uninlined_format_args)]

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use dbobject::bridge::memory::{Catalog, DataTypeDef, MemoryBridge, TypeDefBuilder};
use dbobject::bridge::EngineType;
use dbobject::{Datum, TypeRegistry, Value};
use std::sync::Arc;

fn registry() -> TypeRegistry {
    let mut catalog = Catalog::with_default_schema("BENCH");
    catalog
        .add(
            TypeDefBuilder::structure("POINT")
                .attribute("LABEL", DataTypeDef::varchar(32))
                .attribute("X", DataTypeDef::scalar(EngineType::NativeDouble))
                .attribute("Y", DataTypeDef::scalar(EngineType::NativeDouble))
                .attribute("WEIGHT", DataTypeDef::number(12, 4))
                .build(),
        )
        .expect("POINT");
    catalog
        .add(TypeDefBuilder::collection("SAMPLES", DataTypeDef::scalar(EngineType::NativeInt)).build())
        .expect("SAMPLES");
    let bridge = MemoryBridge::new(catalog).expect("valid catalog");
    TypeRegistry::new(Arc::new(bridge))
}

fn bench_lookup(c: &mut Criterion) {
    let registry = registry();
    registry.lookup("POINT").expect("warm cache");

    let mut group = c.benchmark_group("registry_lookup");
    for name in ["POINT", "point", "bench.point"] {
        group.bench_with_input(BenchmarkId::from_parameter(name), &name, |b, name| {
            b.iter(|| black_box(registry.lookup(name).expect("lookup")));
        });
    }
    group.finish();
}

fn bench_attributes(c: &mut Criterion) {
    let registry = registry();
    let mut point = registry
        .lookup("POINT")
        .and_then(|t| t.new_instance())
        .expect("instance");
    point.set("LABEL", "origin").expect("label");
    point.set("X", 1.5).expect("x");
    point.set("WEIGHT", Datum::Number("1234.5678".into())).expect("weight");

    let mut group = c.benchmark_group("attribute_access");
    group.bench_function("set_double", |b| {
        b.iter(|| point.set("X", black_box(2.5)).expect("set"));
    });
    group.bench_function("get_scratch", |b| {
        b.iter(|| {
            black_box(point.get_attribute("LABEL").expect("get"));
        });
    });
    group.bench_function("get_into_caller_value", |b| {
        let mut value = Value::new();
        b.iter(|| {
            point.get_attribute_into(&mut value, "WEIGHT").expect("get");
            black_box(&value);
        });
    });
    group.bench_function("get_datum", |b| {
        b.iter(|| black_box(point.get("WEIGHT").expect("get")));
    });
    group.finish();
}

fn bench_collection(c: &mut Criterion) {
    let registry = registry();
    let mut group = c.benchmark_group("collection");
    for size in [16_i64, 256, 4096] {
        let mut samples = registry
            .lookup("SAMPLES")
            .and_then(|t| t.new_collection())
            .expect("collection");
        for v in 0..size {
            samples.append(v).expect("append");
        }
        group.bench_with_input(BenchmarkId::new("to_vec", size), &size, |b, _| {
            b.iter(|| black_box(samples.to_vec::<i64>().expect("decode")));
        });
        group.bench_with_input(BenchmarkId::new("indices", size), &size, |b, _| {
            b.iter(|| black_box(samples.indices().count()));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_lookup, bench_attributes, bench_collection);
criterion_main!(benches);
