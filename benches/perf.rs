use std::hint::black_box;

use criterion::{Criterion, criterion_group, criterion_main};

use gridpace::gbrt::{Gbrt, GbrtConfig};
use gridpace::predict::{self, PredictOptions};
use gridpace::grid;
use gridpace::sector_profile::build_profiles;
use gridpace::session_fetch::LapRecord;

fn synthetic_laps() -> Vec<LapRecord> {
    let mut laps = Vec::new();
    for entry in grid::QUALIFYING {
        let Some(code) = grid::driver_code(entry.driver) else {
            continue;
        };
        let base = entry.qualifying_seconds + 2.5;
        for k in 0..50 {
            let jitter = (k as f64) * 0.01;
            laps.push(LapRecord {
                driver_code: code.to_string(),
                lap_seconds: Some(base + jitter),
                sector1_seconds: Some(base * 0.33 + jitter),
                sector2_seconds: Some(base * 0.37),
                sector3_seconds: Some(base * 0.30),
            });
        }
    }
    laps
}

fn training_matrix() -> (Vec<Vec<f64>>, Vec<f64>) {
    let features: Vec<Vec<f64>> = (0..20)
        .map(|i| {
            let x = i as f64;
            vec![90.0 + x * 0.1, 30.0 + x * 0.03, 35.0 - x * 0.02, 28.0 + x * 0.01]
        })
        .collect();
    let targets: Vec<f64> = features
        .iter()
        .map(|r| r[0] + r[1] * 0.5 + r[2] * 0.2)
        .collect();
    (features, targets)
}

fn bench_profile_aggregation(c: &mut Criterion) {
    let laps = synthetic_laps();
    c.bench_function("profile_aggregation", |b| {
        b.iter(|| {
            let profiles = build_profiles(black_box(&laps));
            black_box(profiles.len());
        })
    });
}

fn bench_gbrt_fit(c: &mut Criterion) {
    let (features, targets) = training_matrix();
    c.bench_function("gbrt_fit", |b| {
        b.iter(|| {
            let model = Gbrt::fit(black_box(&features), black_box(&targets), GbrtConfig::default())
                .expect("fit");
            black_box(model.n_features());
        })
    });
}

fn bench_gbrt_predict(c: &mut Criterion) {
    let (features, targets) = training_matrix();
    let model = Gbrt::fit(&features, &targets, GbrtConfig::default()).expect("fit");
    c.bench_function("gbrt_predict", |b| {
        b.iter(|| {
            let preds = model.predict(black_box(&features)).expect("predict");
            black_box(preds.len());
        })
    });
}

fn bench_full_pipeline(c: &mut Criterion) {
    let laps = synthetic_laps();
    c.bench_function("predict_race", |b| {
        b.iter(|| {
            let report =
                predict::predict_race(black_box(&laps), grid::QUALIFYING, PredictOptions::default())
                    .expect("pipeline");
            black_box(report.rankings.len());
        })
    });
}

criterion_group!(
    benches,
    bench_profile_aggregation,
    bench_gbrt_fit,
    bench_gbrt_predict,
    bench_full_pipeline
);
criterion_main!(benches);
