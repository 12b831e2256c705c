use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use std::sync::Arc;
use strata_oracle::{ClassDef, ClassTable, HeapIdentity, TypeOracle, TypeRef};

/// A linear chain `depth` classes deep, plus an interface on the leaf
fn chain(depth: usize) -> (TypeOracle, Vec<TypeRef>, TypeRef) {
    let table = Arc::new(ClassTable::new("Object"));
    let marker = table.define(ClassDef::interface("Marker")).unwrap();
    let mut ids: Vec<HeapIdentity> = vec![table.root()];
    for i in 0..depth {
        let mut def = ClassDef::class(format!("K{i}")).extends(*ids.last().unwrap());
        if i + 1 == depth {
            def = def.implements([marker]);
        }
        ids.push(table.define(def).unwrap());
    }

    let mut oracle = TypeOracle::new(table);
    let refs = ids.iter().map(|&id| oracle.resolve(id).unwrap()).collect();
    let marker = oracle.resolve(marker).unwrap();
    (oracle, refs, marker)
}

fn bench_primary_hit(c: &mut Criterion) {
    let (oracle, refs, _) = chain(6);
    let leaf = *refs.last().unwrap();

    c.bench_function("subtype_primary_hit", |b| {
        b.iter(|| oracle.is_subtype_of(black_box(leaf), black_box(refs[3])).unwrap());
    });
    c.bench_function("subtype_primary_miss", |b| {
        b.iter(|| oracle.is_subtype_of(black_box(refs[3]), black_box(leaf)).unwrap());
    });
}

fn bench_secondary_scan(c: &mut Criterion) {
    let mut group = c.benchmark_group("subtype_secondary");

    for depth in [10, 20, 40] {
        let (oracle, refs, marker) = chain(depth);
        let leaf = *refs.last().unwrap();
        let deep = refs[depth - 1];

        group.bench_with_input(BenchmarkId::new("deep_class", depth), &depth, |b, _| {
            b.iter(|| oracle.is_subtype_of(black_box(leaf), black_box(deep)).unwrap());
        });
        group.bench_with_input(BenchmarkId::new("interface", depth), &depth, |b, _| {
            b.iter(|| oracle.is_subtype_of(black_box(leaf), black_box(marker)).unwrap());
        });
    }

    group.finish();
}

fn bench_lca(c: &mut Criterion) {
    let (mut oracle, refs, _) = chain(20);
    let leaf = *refs.last().unwrap();

    c.bench_function("lca_ancestor_fast_path", |b| {
        b.iter(|| oracle.least_common_ancestor(black_box(leaf), black_box(refs[5])).unwrap());
    });
}

fn bench_cached_resolve(c: &mut Criterion) {
    let table = Arc::new(ClassTable::new("Object"));
    let id = table.define(ClassDef::class("Hot")).unwrap();
    let mut oracle = TypeOracle::new(table);
    oracle.resolve(id).unwrap();

    c.bench_function("resolve_cached", |b| {
        b.iter(|| oracle.resolve(black_box(id)).unwrap());
    });
}

criterion_group!(
    benches,
    bench_primary_hit,
    bench_secondary_scan,
    bench_lca,
    bench_cached_resolve
);
criterion_main!(benches);
