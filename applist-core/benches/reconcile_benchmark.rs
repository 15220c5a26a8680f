use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use std::hint::black_box;
use std::sync::Arc;
use tokio::runtime::Runtime;

use applist_core::inventory::{InventoryEntry, MemoryInventory};
use applist_core::registry::reconcile;
use applist_core::{AppRecord, AppRegistry, RegistryConfig};

const SIZES: [usize; 3] = [100, 1_000, 5_000];

const NAMES: [&str; 8] = [
    "Calendar", "Camera", "Clock", "Contacts", "Files", "Maps", "Messages", "Settings",
];

fn sample_entries(count: usize) -> Vec<InventoryEntry> {
    (0..count)
        .map(|i| {
            // Scatter names so sorting has real work to do.
            let name = format!("{} {}", NAMES[(i * 7) % NAMES.len()], (i * 7919) % count);
            MemoryInventory::entry(&name, &format!("pkg.app{i:05}"))
        })
        .collect()
}

fn sample_records(count: usize) -> Vec<AppRecord> {
    reconcile::build_sorted(sample_entries(count)).records
}

fn bench_build_sorted(c: &mut Criterion) {
    let mut group = c.benchmark_group("build_sorted");

    for size in SIZES {
        group.throughput(Throughput::Elements(size as u64));
        let entries = sample_entries(size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &entries, |b, entries| {
            b.iter(|| reconcile::build_sorted(black_box(entries.clone())));
        });
    }

    group.finish();
}

fn bench_upsert_and_remove(c: &mut Criterion) {
    let mut group = c.benchmark_group("upsert_remove");

    for size in SIZES {
        let records = sample_records(size);
        let fresh = AppRecord::try_from(MemoryInventory::entry("Mail", "pkg.mail"))
            .expect("complete entry");

        group.bench_with_input(BenchmarkId::new("upsert", size), &records, |b, records| {
            b.iter(|| reconcile::upsert(black_box(records), fresh.clone()));
        });

        group.bench_with_input(BenchmarkId::new("remove", size), &records, |b, records| {
            b.iter(|| reconcile::remove(black_box(records), "pkg.app00042"));
        });
    }

    group.finish();
}

fn bench_filter_by_name(c: &mut Criterion) {
    let mut group = c.benchmark_group("filter_by_name");
    let records = sample_records(5_000);

    for query in ["c", "cam", "settings 4", "nothing matches"] {
        group.bench_with_input(BenchmarkId::from_parameter(query), &query, |b, query| {
            b.iter(|| reconcile::filter_by_name(black_box(&records), query));
        });
    }

    group.finish();
}

fn bench_registry_round_trip(c: &mut Criterion) {
    let rt = Runtime::new().expect("tokio runtime");
    let source = Arc::new(MemoryInventory::with_entries(sample_entries(1_000)));

    let registry = rt.block_on(async {
        let registry = AppRegistry::builder_arc(source.clone())
            .config(RegistryConfig::default())
            .spawn();
        registry.settled().await.expect("worker running");
        registry
    });

    c.bench_function("registry_change_round_trip", |b| {
        b.to_async(&rt).iter(|| async {
            registry
                .on_inventory_changed("pkg.app00500", false)
                .expect("worker running");
            registry.settled().await.expect("worker running");
        });
    });

    rt.block_on(async {
        let _ = registry.shutdown().await;
    });
}

criterion_group!(
    benches,
    bench_build_sorted,
    bench_upsert_and_remove,
    bench_filter_by_name,
    bench_registry_round_trip
);
criterion_main!(benches);
