use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use qtty::Minutes;
use std::hint::black_box;
use visit_planner::algorithms::{slew_time, NearestNeighbourSequencer};
use visit_planner::ephemeris::FixedBodyOracle;
use visit_planner::parsing::sexagesimal::{parse_dec, parse_ra};
use visit_planner::time::parse_block_instant;
use visit_planner::{
    plan, Catalogue, HorizontalPosition, ObservingBlock, PlannerConfig, PlanningParameters, Source,
};

fn bench_slew_time(c: &mut Criterion) {
    let mut group = c.benchmark_group("slew_model");

    let positions: Vec<HorizontalPosition> = (0..100)
        .map(|i| HorizontalPosition::new(i as f64 * 3.6, 15.0 + (i % 60) as f64))
        .collect();
    group.bench_function("slew_time_100x100", |b| {
        b.iter(|| {
            for from in &positions {
                for to in &positions {
                    black_box(slew_time(black_box(from), black_box(to)));
                }
            }
        });
    });

    group.finish();
}

fn bench_angle_parsing(c: &mut Criterion) {
    let mut group = c.benchmark_group("angle_parsing");

    group.bench_function("parse_ra", |b| {
        b.iter(|| parse_ra(black_box("19:39:25.026")));
    });
    group.bench_function("parse_dec", |b| {
        b.iter(|| parse_dec(black_box("-63:42:45.63")));
    });

    group.finish();
}

/// Sources spread around the south celestial pole, all circumpolar at ATCA.
fn southern_catalogue(n: usize) -> Catalogue {
    Catalogue::from_sources((0..n).map(|i| {
        Source::new(
            format!("src_{:03}", i),
            (i as f64 * 137.5) % 360.0,
            -65.0 - (i % 20) as f64,
        )
    }))
}

fn bench_plan(c: &mut Criterion) {
    let mut group = c.benchmark_group("planning");
    group.sample_size(10);

    let config = PlannerConfig::default();
    let block = ObservingBlock::new(
        parse_block_instant("2024-01-01:00:00:00").unwrap(),
        parse_block_instant("2024-01-01:06:20:00").unwrap(),
    )
    .unwrap();
    let params =
        PlanningParameters::from_config(block, 2, Minutes::new(2.0), Minutes::new(60.0), &config);
    let oracle = FixedBodyOracle::default();
    let sequencer = NearestNeighbourSequencer::new(config.kinematics);

    for n in [10usize, 40] {
        let catalogue = southern_catalogue(n);
        group.bench_with_input(BenchmarkId::new("plan", n), &catalogue, |b, catalogue| {
            b.iter(|| plan(black_box(catalogue), &params, &config, &oracle, &sequencer));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_slew_time, bench_angle_parsing, bench_plan);
criterion_main!(benches);
