use std::sync::Arc;
use std::thread;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use kuba_congestion::aggregation::select_top_n;
use kuba_congestion::config::PipelineConfig;
use kuba_congestion::ingestion::{RecordParser, VecSource, WhitespaceParser};
use kuba_congestion::types::{Record, WindowResult};
use kuba_congestion::{BoundedQueue, Pipeline, WindowAggregator};

const RECORDS: u64 = 10_000;

fn sample_lines(count: u64) -> Vec<String> {
    (0..count)
        .map(|i| {
            let secs = i % 86_400;
            format!(
                "{:02}:{:02}:{:02} TL-{} {}",
                secs / 3600,
                secs / 60 % 60,
                secs % 60,
                i % 48,
                (i * 7919) % 500
            )
        })
        .collect()
}

fn bench_queue_handoff(c: &mut Criterion) {
    let mut group = c.benchmark_group("queue_handoff");
    group.throughput(Throughput::Elements(RECORDS));

    for capacity in [1usize, 50, 1_000] {
        group.bench_with_input(BenchmarkId::from_parameter(capacity), &capacity, |b, &cap| {
            b.iter(|| {
                let queue = Arc::new(BoundedQueue::new(cap).unwrap());
                let producer = {
                    let queue = Arc::clone(&queue);
                    thread::spawn(move || {
                        for i in 0..RECORDS {
                            queue.push(i).unwrap();
                        }
                        queue.close();
                    })
                };
                let mut sum = 0u64;
                while let Ok(v) = queue.pop() {
                    sum += v;
                }
                producer.join().unwrap();
                black_box(sum)
            })
        });
    }
    group.finish();
}

fn bench_parse(c: &mut Criterion) {
    let lines = sample_lines(RECORDS);
    let parser = WhitespaceParser::new();

    let mut group = c.benchmark_group("parse");
    group.throughput(Throughput::Elements(RECORDS));
    group.bench_function("whitespace", |b| {
        b.iter(|| {
            for line in &lines {
                black_box(parser.parse(line).unwrap());
            }
        })
    });
    group.finish();
}

fn bench_aggregation(c: &mut Criterion) {
    let parser = WhitespaceParser::new();
    let records: Vec<Record> = sample_lines(RECORDS)
        .iter()
        .map(|l| parser.parse(l).unwrap())
        .collect();

    let mut group = c.benchmark_group("aggregation");
    group.throughput(Throughput::Elements(RECORDS));

    for window_ms in [60_000i64, 3_600_000] {
        group.bench_with_input(BenchmarkId::new("window_ms", window_ms), &window_ms, |b, &w| {
            b.iter(|| {
                let mut agg = WindowAggregator::new(w, 3).unwrap();
                let mut emitted = 0usize;
                for record in records.iter().cloned() {
                    if agg.accept(record).is_some() {
                        emitted += 1;
                    }
                }
                emitted += agg.flush().map_or(0, |_| 1);
                black_box(emitted)
            })
        });
    }

    group.bench_function("select_top_3_of_10k", |b| {
        b.iter(|| black_box(select_top_n(records.clone(), 3)))
    });
    group.finish();
}

fn bench_end_to_end(c: &mut Criterion) {
    let lines = sample_lines(RECORDS);
    let config = PipelineConfig::default();

    let mut group = c.benchmark_group("pipeline");
    group.throughput(Throughput::Elements(RECORDS));
    group.sample_size(20);
    group.bench_function("hourly_top3", |b| {
        b.iter(|| {
            let mut windows = 0usize;
            Pipeline::new(config.clone())
                .unwrap()
                .run(VecSource::new(lines.clone()), WhitespaceParser::new(), |_: &WindowResult| {
                    windows += 1
                })
                .unwrap();
            black_box(windows)
        })
    });
    group.bench_function("hourly_top3_sequential", |b| {
        b.iter(|| {
            let mut windows = 0usize;
            Pipeline::new(config.clone())
                .unwrap()
                .run_sequential(VecSource::new(lines.clone()), WhitespaceParser::new(), |_: &WindowResult| {
                    windows += 1
                })
                .unwrap();
            black_box(windows)
        })
    });
    group.finish();
}

criterion_group!(
    benches,
    bench_queue_handoff,
    bench_parse,
    bench_aggregation,
    bench_end_to_end
);
criterion_main!(benches);
