use grammar_sampler::{Grammar, GrammarConfig, Outcome, ProductionTable, Sampler, Tokenization};
use std::error::Error;

/// Sample strings from a regular grammar written in production text
fn main() -> Result<(), Box<dyn Error>> {
    let parsed = ProductionTable::parse("S->aS|bA, A->bA|c, oops", Tokenization::Chars);
    for err in &parsed.errors {
        println!("skipped: {}", err);
    }

    let grammar = Grammar::new("S").with_table(parsed.table);
    println!("Grammar: {}", grammar.table());

    let sampler = Sampler::new(&grammar);
    for max_steps in [2, 5, 10] {
        let batch = sampler.generate(5, max_steps);
        println!(
            "\nmax_steps = {} ({} truncated):",
            max_steps,
            batch.count_outcome(Outcome::Truncated)
        );
        for (i, text) in batch.strings().iter().enumerate() {
            println!("{}. {}", i + 1, text);
        }
    }

    // The same seed always gives the same batch
    let mut config = GrammarConfig::default();
    config.seed = Some(7);
    let grammar = Grammar::from_text("S->aS|b", "S", config)?;
    println!("\nSeeded: {:?}", Sampler::new(&grammar).run().into_strings());

    Ok(())
}
