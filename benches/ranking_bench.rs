use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use scholar_aggregator::ranking::{dedupe, rank, relevance_score};
use scholar_aggregator::{Record, Source};

const WORDS: [&str; 12] = [
    "graph", "neural", "networks", "learning", "deep", "attention", "survey", "methods",
    "applications", "transformer", "representation", "models",
];

/// Deterministic titles with roughly one case-only duplicate in five
fn sample_records(count: usize) -> Vec<Record> {
    (0..count)
        .map(|i| {
            let title: Vec<&str> = (0..6).map(|j| WORDS[(i * 7 + j * 3) % WORDS.len()]).collect();
            let mut title = title.join(" ");
            if i % 5 == 0 {
                title = title.to_uppercase();
            }
            Record::new(Source::ALL[i % Source::ALL.len()]).with_title(Some(title.as_str()))
        })
        .collect()
}

fn benchmark_relevance_score(c: &mut Criterion) {
    c.bench_function("relevance_score", |b| {
        b.iter(|| {
            relevance_score(
                black_box("Graph neural networks: A review of methods and applications"),
                black_box("graph neural networks"),
            )
        });
    });
}

fn benchmark_pipeline(c: &mut Criterion) {
    let mut group = c.benchmark_group("dedupe_and_rank");
    for size in [50usize, 500, 5000] {
        let records = sample_records(size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &records, |b, records| {
            b.iter(|| rank(dedupe(records.clone()), black_box("graph neural networks"), 100));
        });
    }
    group.finish();
}

criterion_group!(benches, benchmark_relevance_score, benchmark_pipeline);
criterion_main!(benches);
