use criterion::{Criterion, black_box, criterion_group, criterion_main};
use grammar_sampler::{Grammar, GrammarConfig, Granularity, Sampler};

fn grammar(granularity: Granularity) -> Grammar {
    let mut config = GrammarConfig::default();
    config.granularity = granularity;
    Grammar::from_text("E->E+T|T, T->T*F|F, F->(E)|x|y", "E", config)
        .expect("benchmark grammar parses")
}

fn bench_sampling(c: &mut Criterion) {
    for (name, granularity) in [("char", Granularity::Char), ("token", Granularity::Token)] {
        let grammar = grammar(granularity);
        let sampler = Sampler::new(&grammar);
        c.bench_function(&format!("sample_100_{}", name), |b| {
            b.iter(|| sampler.generate_seeded(black_box(100), black_box(10), 42))
        });
    }
}

criterion_group!(benches, bench_sampling);
criterion_main!(benches);
