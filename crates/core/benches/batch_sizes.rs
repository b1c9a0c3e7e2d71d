//! Criterion benchmarks for batch-size enumeration.
//!
//! Run with:
//!   cargo bench --bench batch_sizes
//!
//! Results are saved to target/criterion/

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use gymdash::batch::{self, choice_for, divisors};
use gymdash::form::{Field, FieldName, Form};

/// Divisor enumeration over rollout sizes seen in practice, up to very large
/// ones typed by accident.
fn bench_divisors(c: &mut Criterion) {
    let mut group = c.benchmark_group("divisors");
    for total in [512u64, 8_192, 65_536, 1_048_576, 1_000_000_007] {
        group.bench_with_input(BenchmarkId::from_parameter(total), &total, |b, &total| {
            b.iter(|| divisors(black_box(total)));
        });
    }
    group.finish();
}

fn bench_choice(c: &mut Criterion) {
    c.bench_function("choice_for_2048x8", |b| {
        b.iter(|| choice_for(black_box(2048), black_box(8)));
    });
}

/// Full refresh of the batch-size select, as run on every rollout edit.
fn bench_refresh(c: &mut Criterion) {
    let mut form = Form::new()
        .with_field(Field::number(batch::n_steps_field(), "2048"))
        .with_field(Field::number(batch::num_envs_field(), "16"))
        .with_field(
            Field::select(FieldName::hyper("batch_size"), Vec::new()).with_id(batch::BATCH_SIZE_ID),
        );
    c.bench_function("refresh_form", |b| {
        b.iter(|| batch::refresh(black_box(&mut form)));
    });
}

criterion_group!(benches, bench_divisors, bench_choice, bench_refresh);
criterion_main!(benches);
