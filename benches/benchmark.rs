use std::sync::Arc;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use linelex::{
    config::TokenizerConfig,
    highlight::LineCache,
    languages::Language,
    tokenizer::{MatchStrategy, Tokenizer},
};
use strum::IntoEnumIterator;

const SAMPLE: &str = r#"// copy the configured items
loc/items = $tree.copy(cfg/source, true)
/* iterate over
   every item */
for (forkey in loc/items) {
    if (forval == null) { continue; }
    out/result = """abc""" + 1.5e3 - tmp/count
}
'''raw
text'''
return empty
"#;

fn buffer(repeat: usize) -> Vec<String> {
    SAMPLE
        .lines()
        .cycle()
        .take(SAMPLE.lines().count() * repeat)
        .map(str::to_string)
        .collect()
}

fn bench_strategies(c: &mut Criterion) {
    let ruleset = Arc::new(Language::Bxl.ruleset().expect("bxl ruleset"));
    let lines = buffer(100);

    let mut group = c.benchmark_group("tokenize_buffer");
    for strategy in MatchStrategy::iter() {
        let config = TokenizerConfig {
            strategy,
            ..TokenizerConfig::default()
        };
        let tokenizer = Tokenizer::with_config(ruleset.clone(), &config);
        group.bench_with_input(BenchmarkId::from_parameter(strategy), &lines, |b, lines| {
            b.iter(|| LineCache::from_lines(&tokenizer, lines))
        });
    }
    group.finish();
}

fn bench_incremental_update(c: &mut Criterion) {
    let tokenizer = Tokenizer::new(Arc::new(Language::Bxl.ruleset().expect("bxl ruleset")));
    let mut lines = buffer(100);
    let cache = LineCache::from_lines(&tokenizer, &lines);
    lines[500] = "x = 2 // edited".to_string();

    c.bench_function("update_from single edit", |b| {
        b.iter_batched(
            || cache.clone(),
            |mut cache| cache.update_from(&tokenizer, &lines, 500),
            criterion::BatchSize::SmallInput,
        )
    });
}

criterion_group!(benches, bench_strategies, bench_incremental_update);
criterion_main!(benches);
