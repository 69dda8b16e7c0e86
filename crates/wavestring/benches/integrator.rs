//! Integrator and registry stepping benchmarks.
//!
//! Measures the cost of one physical step for a single field at several
//! resolutions, of a full registry step with superposed drives, and of
//! boundary expression evaluation.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use wavestring::prelude::*;

fn bench_single_step(c: &mut Criterion) {
    let mut group = c.benchmark_group("integrator_step");

    for &nodes in &[101usize, 1_001, 10_001] {
        let params = ParameterInputs::default()
            .with_node_count(nodes)
            .with_damping(0.1)
            .derive()
            .unwrap();
        group.throughput(Throughput::Elements(nodes as u64));

        for right in [RightBoundary::Fixed, RightBoundary::Absorbing] {
            group.bench_with_input(
                BenchmarkId::new(right.to_string(), nodes),
                &params,
                |b, params| {
                    let mut field = WaveIntegrator::reset(params, 0.0);
                    let mut k = 0u64;
                    b.iter(|| {
                        k += 1;
                        let left = (k as f64 * 0.01).sin();
                        WaveIntegrator::step(&mut field, params, black_box(left), right).unwrap();
                    });
                    black_box(field.current());
                },
            );
        }
    }

    group.finish();
}

fn bench_registry_step(c: &mut Criterion) {
    let mut group = c.benchmark_group("registry_step_all");

    for &rows in &[1usize, 4, 16] {
        let mut registry = SimulationRegistry::from_inputs(ParameterInputs::default()).unwrap();
        for i in 0..rows {
            let row = registry.add_row();
            registry
                .apply_expression(row, &format!("0.01 * sin(2 * pi * {} * t)", i + 1))
                .unwrap();
            registry.set_simulated(row, true).unwrap();
        }

        group.bench_function(BenchmarkId::from_parameter(rows), |b| {
            b.iter(|| black_box(registry.step_all().unwrap()));
        });
    }

    group.finish();
}

fn bench_expression_eval(c: &mut Criterion) {
    let mut group = c.benchmark_group("expression");

    let expr = BoundaryExpression::parse("0.1 * exp(-(((t - 0.5) / 0.1) ** 2)) * sin(2 * pi * 3 * t)")
        .unwrap();
    group.bench_function("evaluate_gaussian_burst", |b| {
        let mut t = 0.0;
        b.iter(|| {
            t += 0.005;
            black_box(expr.evaluate(black_box(t)).unwrap_or(0.0))
        });
    });

    group.bench_function("parse_gaussian_burst", |b| {
        b.iter(|| {
            BoundaryExpression::parse(black_box(
                "0.1 * exp(-(((t - 0.5) / 0.1) ** 2)) * sin(2 * pi * 3 * t)",
            ))
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_single_step,
    bench_registry_step,
    bench_expression_eval
);
criterion_main!(benches);
