//! Binding benchmarks.
//!
//! Run with: `cargo bench -p pinax-bind`

use std::collections::HashMap;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use pinax_bind::{bind, bind_in, ValueMap};
use pinax_core::{BindConfig, TypeRegistry};
use pinax_macros::Bind;

#[derive(Bind, Default)]
#[bind(crate = "pinax_core")]
struct Item {
    #[bind(query = "sku")]
    sku: String,
    #[bind(query = "qty")]
    qty: u32,
}

#[derive(Bind, Default)]
#[bind(crate = "pinax_core")]
struct Search {
    #[bind(query = "q")]
    q: String,
    #[bind(query = "page,p", default = "1")]
    page: u32,
    #[bind(query = "size", default = "20")]
    size: u32,
    #[bind(query = "sort", enum = "asc,desc")]
    sort: String,
    #[bind(query = "tags")]
    tags: Vec<String>,
    #[bind(query = "since")]
    since: Option<i64>,
    #[bind(query = "meta")]
    meta: HashMap<String, String>,
    #[bind(query = "items")]
    items: Vec<Item>,
}

fn flat_values() -> ValueMap {
    ValueMap::from_pairs([
        ("q", "rust"),
        ("p", "3"),
        ("sort", "desc"),
        ("tags", "a"),
        ("tags", "b"),
        ("since", "1700000000"),
    ])
}

fn nested_values(items: usize) -> ValueMap {
    let mut values = flat_values();
    values.append("meta.region", "eu");
    values.append("meta[\"team.id\"]", "7");
    for i in 0..items {
        values.append(format!("items[{i}].sku"), format!("sku-{i}"));
        values.append(format!("items[{i}].qty"), i.to_string());
    }
    values
}

fn bench_flat_bind(c: &mut Criterion) {
    let values = flat_values();
    let config = BindConfig::default();

    c.bench_function("flat_bind", |b| {
        b.iter(|| {
            let mut search = Search::default();
            black_box(bind(&mut search, &values, "query", &config).is_ok());
            black_box(search);
        });
    });
}

fn bench_cold_registry(c: &mut Criterion) {
    let values = flat_values();
    let config = BindConfig::default();

    c.bench_function("cold_registry", |b| {
        b.iter(|| {
            let registry = TypeRegistry::new();
            let mut search = Search::default();
            black_box(bind_in(&registry, &mut search, &values, "query", &config).is_ok());
        });
    });
}

fn bench_struct_slices(c: &mut Criterion) {
    let mut group = c.benchmark_group("struct_slices");
    let config = BindConfig::default();

    for items in [1, 10, 50, 100] {
        let values = nested_values(items);
        group.bench_with_input(BenchmarkId::new("bind", items), &items, |b, _| {
            b.iter(|| {
                let mut search = Search::default();
                black_box(bind(&mut search, &values, "query", &config).is_ok());
                black_box(search.items.len());
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_flat_bind, bench_cold_registry, bench_struct_slices);
criterion_main!(benches);
