use criterion::{criterion_group, criterion_main, Criterion};
use fulltext_core::tokenizer::tokenize;
use fulltext_core::{Index, InvertedIndex};

const TEXT: &str = "New home sales rose 4.2% to $1,250,000 in July, e.g. at 10:30 a.m. \
    according to https://example.com/report.pdf and press@example.com. \
    State-of-the-art forecasts don't call 'em wrong; call +46-70-1234 24/7.\n";

fn bench_tokenize(c: &mut Criterion) {
    let text = TEXT.repeat(200);
    c.bench_function("tokenize_paragraphs", |b| b.iter(|| tokenize(&text)));
}

fn bench_index(c: &mut Criterion) {
    let text = TEXT.repeat(20);
    c.bench_function("index_document", |b| {
        b.iter(|| {
            let mut idx = InvertedIndex::new();
            idx.index_document(&mut text.as_bytes()).unwrap()
        })
    });
}

criterion_group!(benches, bench_tokenize, bench_index);
criterion_main!(benches);
