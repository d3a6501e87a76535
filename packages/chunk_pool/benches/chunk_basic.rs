//! Basic benchmarks for the `chunk_pool` package.

#![allow(
    missing_docs,
    reason = "No need for API documentation in benchmark code"
)]

use std::hint::black_box;

use chunk_pool::{ChunkOptions, ChunkResource};
use criterion::{Criterion, criterion_group, criterion_main};

criterion_group!(benches, entrypoint);
criterion_main!(benches);

const OPTIONS: ChunkOptions = ChunkOptions {
    block_size: 64,
    block_align: 8,
    block_count: 1024,
};

fn entrypoint(c: &mut Criterion) {
    let mut group = c.benchmark_group("cp_cycle");

    group.bench_function("allocate_release_lifo", |b| {
        let mut resource: ChunkResource = ChunkResource::new(OPTIONS);
        b.iter(|| {
            let block = resource
                .allocate_bytes(64)
                .expect("pool cannot be exhausted by one block");
            resource.deallocate_bytes(black_box(block).as_ptr(), 64);
        });
    });

    group.bench_function("drain_and_refill", |b| {
        let mut resource: ChunkResource = ChunkResource::new(OPTIONS);
        let mut blocks = Vec::with_capacity(1024);
        b.iter(|| {
            for _ in 0..1024 {
                blocks.push(
                    resource
                        .allocate_bytes(64)
                        .expect("pool holds exactly this many blocks"),
                );
            }
            for block in blocks.drain(..) {
                resource.deallocate_bytes(block.as_ptr(), 64);
            }
        });
    });

    group.bench_function("zero_size", |b| {
        let mut resource: ChunkResource = ChunkResource::new(OPTIONS);
        b.iter(|| {
            let sentinel = resource
                .allocate_bytes(0)
                .expect("zero-size always succeeds");
            black_box(sentinel);
        });
    });

    group.finish();

    let mut defrag_group = c.benchmark_group("cp_defrag");

    defrag_group.bench_function("defrag_scrambled", |b| {
        let mut resource: ChunkResource = ChunkResource::new(OPTIONS);
        let mut blocks = Vec::with_capacity(1024);
        b.iter(|| {
            for _ in 0..1024 {
                blocks.push(
                    resource
                        .allocate_bytes(64)
                        .expect("pool holds exactly this many blocks"),
                );
            }

            // Release even indexes before odd ones to scramble the stack.
            for parity in [0, 1] {
                for block in blocks.iter().skip(parity).step_by(2) {
                    resource.deallocate_bytes(block.as_ptr(), 64);
                }
            }
            blocks.clear();

            resource.defrag();
        });
    });

    defrag_group.bench_function("defrag_optimistic_sorted", |b| {
        let mut resource: ChunkResource = ChunkResource::new(OPTIONS);
        b.iter(|| {
            // The free stack is already ordered; this is the happy path.
            resource.defrag_optimistic();
        });
    });

    defrag_group.finish();
}
