//! Criterion micro-benchmarks for write-back and teardown.

use std::hint::black_box;
use std::sync::Arc;

use criterion::{criterion_group, criterion_main, Criterion};
use hostbuf_bench::{reference_count, reference_input, REFERENCE_SHAPE};
use hostbuf_buffer::{shared_host_data, Buffer};
use hostbuf_test_utils::MockTaskHandler;

fn bench_write_back_shared_64k(c: &mut Criterion) {
    let input = reference_input();
    let destination = shared_host_data(vec![0.0f32; reference_count()]);
    c.bench_function("write_back_shared_64k", |b| {
        b.iter(|| {
            let buf = Buffer::<f32, 2>::from_read_only(&input, REFERENCE_SHAPE).unwrap();
            buf.set_final_data(Arc::clone(&destination));
            buf.mark_as_written();
            drop(buf);
        });
    });
}

fn bench_write_back_slice_64k(c: &mut Criterion) {
    let input = reference_input();
    let mut destination = vec![0.0f32; reference_count()];
    c.bench_function("write_back_slice_64k", |b| {
        b.iter(|| {
            let buf = Buffer::<f32, 2>::from_read_only(&input, REFERENCE_SHAPE).unwrap();
            buf.set_final_data(&mut destination[..]);
            buf.mark_as_written();
            drop(buf);
        });
    });
    black_box(&destination);
}

fn bench_add_to_task(c: &mut Criterion) {
    let buf = Buffer::<f32, 1>::new(1024).unwrap();
    c.bench_function("add_to_task", |b| {
        b.iter(|| {
            let mut handler = MockTaskHandler::new(1);
            black_box(buf.add_to_task(&mut handler, true));
            handler.complete();
        });
    });
}

criterion_group!(
    benches,
    bench_write_back_shared_64k,
    bench_write_back_slice_64k,
    bench_add_to_task
);
criterion_main!(benches);
