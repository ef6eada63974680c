use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use plate_scan::plate::{match_plate, normalize};
use plate_scan::registry::{NewVehicle, RegistryRecord};

const SIZES: [usize; 3] = [100, 1_000, 10_000];

fn registry(size: usize) -> Vec<RegistryRecord> {
    (0..size)
        .map(|i| {
            let plate = format!("{:02}가 {:04}", i % 100, i);
            NewVehicle::unidentified(plate, "").with_id(i.to_string())
        })
        .collect()
}

fn bench(c: &mut Criterion) {
    let mut group = c.benchmark_group("match_plate");

    for size in SIZES {
        let records = registry(size);
        group.throughput(Throughput::Elements(size as u64));

        // Worst case: no record matches, every plate is compared
        group.bench_function(BenchmarkId::new("miss", size), |b| {
            b.iter(|| match_plate(black_box("99허9999"), &records))
        });
        group.bench_function(BenchmarkId::new("suffix", size), |b| {
            b.iter(|| match_plate(black_box("서울12가3456"), &records))
        });
    }

    group.finish();

    c.bench_function("normalize", |b| {
        b.iter(|| normalize(black_box(" 서울 12가-3456 (auto) ")))
    });
}

criterion_group!(
    name = benches;
    config = Criterion::default();
    targets = bench
);

criterion_main!(benches);
