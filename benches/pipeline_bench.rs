//! Benchmarks for backup-sizer
//!
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};

fn benchmark_split_blocks(c: &mut Criterion) {
    use backup_sizer::pipeline::split_blocks;

    let mut group = c.benchmark_group("split_blocks");
    let data: Vec<u8> = (0..256 * 1024u32).map(|i| (i.wrapping_mul(2654435761)) as u8).collect();
    group.throughput(Throughput::Bytes(data.len() as u64));

    for block_size in [16 * 1024usize, 64 * 1024] {
        group.bench_function(format!("block_size_{}", block_size), |b| {
            b.iter(|| {
                let records = split_blocks(black_box(&data), block_size).unwrap();
                black_box(records);
            })
        });
    }
    group.finish();
}

fn benchmark_bloom_filter(c: &mut Criterion) {
    use backup_sizer::{bloom_params, BloomFilter};

    let keys: Vec<String> = (0..10_000).map(|i| format!("{:064x}", i)).collect();
    let (m, k) = bloom_params(keys.len() as u64, 0.01);

    c.bench_function("bloom_insert_10k", |b| {
        b.iter(|| {
            let mut filter = BloomFilter::new(m, k);
            for key in &keys {
                filter.insert(key.as_bytes());
            }
            black_box(filter);
        })
    });

    let mut filter = BloomFilter::new(m, k);
    for key in &keys {
        filter.insert(key.as_bytes());
    }
    c.bench_function("bloom_contains", |b| {
        b.iter(|| {
            for key in &keys {
                black_box(filter.contains(key.as_bytes()));
            }
        })
    });
}

criterion_group!(benches, benchmark_split_blocks, benchmark_bloom_filter);
criterion_main!(benches);
