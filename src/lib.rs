//! Grammar-Sampler draws random strings from regular and context-free grammars.
//!
//! A derivation starts from the start symbol and rewrites every nonterminal in
//! the current string with a randomly chosen alternative, round after round,
//! until only terminals remain or the step limit is reached. By default a
//! symbol is a nonterminal when it is uppercase.
//!
//! # Example
//!
//! ```rust
//! use grammar_sampler::{Grammar, GrammarConfig, Sampler};
//!
//! let grammar = Grammar::from_text("S->aS|b", "S", GrammarConfig::default()).unwrap();
//!
//! let batch = Sampler::new(&grammar).generate_seeded(3, 10, 42);
//! for text in batch.strings() {
//!     assert!(text.trim_start_matches('a') == "b" || text.contains('S'));
//! }
//! ```

pub mod engine;
pub mod grammar;
pub mod sampler;
pub mod utils;

pub use engine::{Derivation, DerivationState, Outcome};
pub use grammar::{
    Grammar, GrammarBuilder, GrammarConfig, Granularity, ParsedTable, Production,
    ProductionTable, Tokenization, UndefinedPolicy,
};
pub use sampler::{SampleBatch, Sampler};
pub use utils::{GrammarError, Result, SymbolClassifier, UppercaseClassifier};
