use chrono::{DateTime, Duration, TimeZone, Utc};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use readyrs::{
    pmc, CheckIn, DecayParameters, Forecaster, Impulse, InMemoryStore, ReadinessService,
    SubjectiveRatings, TrainingBlock, WellnessAggregator,
};

/// Performance benchmarks for the readiness model
///
/// These benchmarks cover aggregation, forecasting and the load tracker
/// with growing history lengths to check scalability.

fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2023, 1, 1, 7, 0, 0).unwrap()
}

fn create_impulse_history(days: usize) -> Vec<Impulse> {
    let lifestyle = DecayParameters {
        k_positive: 0.0,
        tau_positive: 0.0,
        k_negative: 4.0,
        tau_negative: 1.0,
    };

    (0..days)
        .flat_map(|i| {
            let at = start() + Duration::days(i as i64);
            let training = Impulse::new(at, 300.0 + (i % 5) as f64 * 60.0, "training", DecayParameters::TRAINING);
            let factor = Impulse::new(at, 1.0, format!("factor_{}", i % 6), lifestyle);
            [training, factor]
        })
        .filter_map(Result::ok)
        .collect()
}

fn create_check_ins(days: usize) -> Vec<CheckIn> {
    (0..days)
        .map(|i| CheckIn {
            timestamp: start() + Duration::days(i as i64),
            subjective: Some(SubjectiveRatings {
                sleep_quality: 3,
                fatigue: 3,
                soreness: 2,
                stress: 3,
                mood: 2,
            }),
            training: Some(TrainingBlock {
                had_training: i % 7 != 0,
                duration_minutes: Some(60.0),
                rpe: Some(5.0 + (i % 4) as f64),
            }),
            factors: Vec::new(),
        })
        .collect()
}

fn bench_wellness_aggregation(c: &mut Criterion) {
    let mut group = c.benchmark_group("Wellness Aggregation");
    let aggregator = WellnessAggregator::new();

    for &days in &[30, 90, 365, 1825] {
        let impulses = create_impulse_history(days);
        let at = start() + Duration::days(days as i64);

        group.throughput(Throughput::Elements(impulses.len() as u64));
        group.bench_with_input(BenchmarkId::new("compute", days), &impulses, |b, impulses| {
            b.iter(|| aggregator.compute(black_box(impulses), black_box(at)));
        });
    }

    group.finish();
}

fn bench_forecast(c: &mut Criterion) {
    let mut group = c.benchmark_group("Forecast");
    let forecaster = Forecaster::default();
    let impulses = create_impulse_history(365);
    let from = start() + Duration::days(365);

    for &horizon in &[1u32, 7, 30] {
        group.throughput(Throughput::Elements(horizon as u64));
        group.bench_with_input(BenchmarkId::new("project", horizon), &horizon, |b, &horizon| {
            b.iter(|| forecaster.project(black_box(&impulses), from, horizon));
        });
    }

    group.finish();
}

fn bench_load_tracker(c: &mut Criterion) {
    let mut group = c.benchmark_group("Load Tracker");
    let calculator = pmc::PmcCalculator::new();

    for &days in &[30, 365, 1825] {
        let check_ins = create_check_ins(days);
        let daily = calculator.aggregate_daily_load(&check_ins);
        let first = start().date_naive();
        let last = first + Duration::days(days as i64 - 1);

        group.throughput(Throughput::Elements(days as u64));
        group.bench_with_input(BenchmarkId::new("calculate_pmc_series", days), &daily, |b, daily| {
            b.iter(|| calculator.calculate_pmc_series(black_box(daily), first, last));
        });
    }

    group.finish();
}

fn bench_batch_breakdowns(c: &mut Criterion) {
    let mut group = c.benchmark_group("Batch Breakdowns");

    for &subjects in &[10usize, 100] {
        let mut store = InMemoryStore::new();
        let ids: Vec<String> = (0..subjects).map(|i| format!("athlete_{}", i)).collect();
        for id in &ids {
            store.add_check_ins(id, create_check_ins(180));
        }
        let service = ReadinessService::from_store(&store);
        let at = start() + Duration::days(180);

        group.throughput(Throughput::Elements(subjects as u64));
        group.bench_with_input(BenchmarkId::new("batch_breakdowns", subjects), &ids, |b, ids| {
            b.iter(|| service.batch_breakdowns(black_box(ids), at));
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_wellness_aggregation,
    bench_forecast,
    bench_load_tracker,
    bench_batch_breakdowns
);
criterion_main!(benches);
