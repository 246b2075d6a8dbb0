use grammar_sampler::{GrammarBuilder, GrammarConfig, Granularity, Sampler, Tokenization};
use std::error::Error;

/// Sample sentences from a context-free grammar over word tokens
fn main() -> Result<(), Box<dyn Error>> {
    let mut config = GrammarConfig::default();
    config.granularity = Granularity::Token;
    config.tokenization = Tokenization::Whitespace;
    config.separator = " ".to_string();

    let grammar = GrammarBuilder::new("S")
        .config(config)
        .add_rule("S", &["NP VP"])
        .add_rule("NP", &["the N", "a ADJ N"])
        .add_rule("ADJ", &["quick", "lazy", "very ADJ"])
        .add_rule("N", &["fox", "dog", "programmer"])
        .add_rule("VP", &["V NP", "V"])
        .add_rule("V", &["sees", "chases", "sleeps"])
        .build();

    println!("Generated sentences:");
    let batch = Sampler::new(&grammar).generate(5, 6);
    for (i, derivation) in batch.derivations().enumerate() {
        println!(
            "{}. {} ({} rounds, {:?})",
            i + 1,
            derivation.text,
            derivation.rounds,
            derivation.outcome
        );
    }

    // Balanced brackets, one character per symbol
    let brackets = GrammarBuilder::new("B")
        .add_rule("B", &["(B)B", ""])
        .build();

    println!("\nBalanced brackets:");
    for (i, text) in Sampler::new(&brackets).generate(5, 8).strings().iter().enumerate() {
        println!("{}. {}", i + 1, text);
    }

    Ok(())
}
