//! Benchmarks for token estimation, page cleanup, and budgeted chunking.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use pageslab::{clean_text, estimate_tokens, HeuristicSegmenter, PageSegmenter, TextChunker, TokenBudget};

/// Paragraphed text alternating English and Japanese sentences.
fn sample_text(size: usize) -> String {
    let sentences = [
        "The quick brown fox jumps over the lazy dog. ",
        "本日は晴天なり、テストを続けます。 ",
        "Pack my box with five dozen liquor jugs. ",
        "吾輩は猫である。名前はまだ無い。 ",
        "Sphinx of black quartz, judge my vow.\n\n",
    ];
    let mut text = String::with_capacity(size + 64);
    let mut i = 0;
    while text.len() < size {
        text.push_str(sentences[i % sentences.len()]);
        i += 1;
    }
    text
}

fn bench_estimate(c: &mut Criterion) {
    let mut group = c.benchmark_group("estimate_tokens");

    for size in [1_000, 10_000, 100_000] {
        let text = sample_text(size);

        group.throughput(Throughput::Bytes(text.len() as u64));
        group.bench_with_input(BenchmarkId::new("mixed", size), &text, |b, text| {
            b.iter(|| estimate_tokens(black_box(text)))
        });
    }

    group.finish();
}

fn bench_chunk_text(c: &mut Criterion) {
    let mut group = c.benchmark_group("chunk_text");

    for max_tokens in [100, 800] {
        let chunker = TextChunker::new(TokenBudget::new(max_tokens).unwrap());

        for size in [10_000, 100_000] {
            let text = sample_text(size);

            group.throughput(Throughput::Bytes(text.len() as u64));
            group.bench_with_input(
                BenchmarkId::new(format!("budget_{max_tokens}"), size),
                &text,
                |b, text| b.iter(|| chunker.chunk_text(black_box(text), "bench")),
            );
        }
    }

    group.finish();
}

fn bench_forced_slices(c: &mut Criterion) {
    // One unbroken CJK run: every chunk comes from the slicing path.
    let text = "漢字".repeat(20_000);
    let chunker = TextChunker::new(TokenBudget::new(800).unwrap());

    c.bench_function("chunk_text/forced_slices", |b| {
        b.iter(|| chunker.chunk_text(black_box(&text), "bench"))
    });
}

fn bench_extract(c: &mut Criterion) {
    let mut group = c.benchmark_group("extract");
    let raw = (1..=50)
        .map(|n| format!("Page {n}\n{}\x0c\u{fffd}", sample_text(2_000)))
        .collect::<String>();
    let segmenter = HeuristicSegmenter::default();

    group.throughput(Throughput::Bytes(raw.len() as u64));
    group.bench_function("clean_text", |b| b.iter(|| clean_text(black_box(&raw))));

    let cleaned = clean_text(&raw);
    group.bench_function("segment_markers", |b| {
        b.iter(|| segmenter.segment(black_box(&cleaned)))
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_estimate,
    bench_chunk_text,
    bench_forced_slices,
    bench_extract
);
criterion_main!(benches);
