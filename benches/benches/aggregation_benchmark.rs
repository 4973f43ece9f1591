//! Bucketing and ingestion benchmarks.
//!
//! Run with: `cargo bench --package candela-bench`

use candela_bench::{sample_instants, synthetic_trades, whole_day_calendar};
use candela_lib::{CandleChart, ChartConfig, Period, TimeSeries, TokioClock};
use chrono::{NaiveDate, TimeDelta, TimeZone, Utc};
use chrono_tz::Tz;
use criterion::{BatchSize, BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use std::hint::black_box;
use std::sync::Arc;

const TRADES: usize = 10_000;

fn start_day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 1).expect("valid date")
}

fn bucketing_benchmark(c: &mut Criterion) {
    let instants = sample_instants(
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        TimeDelta::days(360),
        1_000,
    );

    let mut group = c.benchmark_group("next_bucket_start");
    group.throughput(Throughput::Elements(instants.len() as u64));

    for tz in [Tz::UTC, chrono_tz::America::New_York] {
        let calendar = whole_day_calendar(&tz, start_day(), 400);
        for period in [Period::Minute, Period::Hour, Period::Day, Period::Week, Period::Month] {
            let series = TimeSeries::new(period, calendar.clone(), tz);
            let id = BenchmarkId::new(tz.name(), period);
            group.bench_with_input(id, &instants, |b, instants| {
                b.iter(|| {
                    for t in instants {
                        let _ = black_box(series.next_bucket_start(black_box(*t)));
                    }
                });
            });
        }
    }

    group.finish();
}

fn ingestion_benchmark(c: &mut Criterion) {
    let runtime = tokio::runtime::Runtime::new().expect("tokio runtime");
    let _guard = runtime.enter();

    let origin = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    let mut group = c.benchmark_group("record_trade");
    group.throughput(Throughput::Elements(TRADES as u64));

    for (name, spacing) in [("dense", TimeDelta::milliseconds(100)), ("sparse", TimeDelta::seconds(30))] {
        let trades = synthetic_trades(origin, TRADES, spacing);
        group.bench_with_input(BenchmarkId::new("m1", name), &trades, |b, trades| {
            b.iter_batched(
                || {
                    let clock = Arc::new(TokioClock::starting_at(origin));
                    let calendar = whole_day_calendar(&Tz::UTC, start_day(), 7);
                    CandleChart::with_clock(ChartConfig::default(), calendar, clock)
                        .expect("chart")
                },
                |chart| {
                    for trade in trades {
                        let _ = black_box(chart.record_trade(trade.timestamp, trade.price, trade.volume));
                    }
                    chart
                },
                BatchSize::LargeInput,
            );
        });
    }

    group.finish();
}

criterion_group!(benches, bucketing_benchmark, ingestion_benchmark);
criterion_main!(benches);
