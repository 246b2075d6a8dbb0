//! The bounded leftmost-parallel rewrite loop.
//!
//! Every round scans the current state from left to right and replaces each
//! nonterminal with one randomly chosen alternative, so all nonterminals
//! present at the start of a round are expanded in that round. The loop stops
//! when the state holds no nonterminal or when `max_steps` rounds have run,
//! whichever comes first. A state cut off by the step limit is returned as-is.

use rand::Rng;
use serde::Serialize;

use crate::grammar::{Grammar, Production, UndefinedPolicy};
use crate::utils::{GrammarError, Result};

/// Why a derivation stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    /// No nonterminal symbols remain
    Complete,
    /// The step limit was reached with nonterminals still present
    Truncated,
}

/// The result of one derivation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Derivation {
    pub text: String,
    /// Rewrite rounds that ran
    pub rounds: usize,
    pub outcome: Outcome,
}

impl Derivation {
    pub fn is_complete(&self) -> bool {
        self.outcome == Outcome::Complete
    }
}

/// How a derivation state is sliced into symbols and put back together
pub trait DerivationState: Default {
    /// The state before any rewriting
    fn start(symbol: &str) -> Self;

    /// Symbols of the state, left to right
    fn symbols(&self) -> impl Iterator<Item = &str>;

    /// Append one symbol unchanged
    fn push(&mut self, symbol: &str);

    /// Append the body of a chosen alternative
    fn splice(&mut self, production: &Production);

    /// Concatenate the state into output text
    fn render(self, separator: &str) -> String;
}

/// A state held as one string, one symbol per character
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CharState(String);

impl DerivationState for CharState {
    fn start(symbol: &str) -> Self {
        CharState(symbol.to_string())
    }

    fn symbols(&self) -> impl Iterator<Item = &str> {
        let s = self.0.as_str();
        s.char_indices().map(move |(i, c)| &s[i..i + c.len_utf8()])
    }

    fn push(&mut self, symbol: &str) {
        self.0.push_str(symbol);
    }

    fn splice(&mut self, production: &Production) {
        for symbol in production.symbols() {
            self.0.push_str(symbol);
        }
    }

    // Characters are never separated.
    fn render(self, _separator: &str) -> String {
        self.0
    }
}

/// A state held as a sequence of symbols
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenState(Vec<String>);

impl DerivationState for TokenState {
    fn start(symbol: &str) -> Self {
        TokenState(vec![symbol.to_string()])
    }

    fn symbols(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    fn push(&mut self, symbol: &str) {
        self.0.push(symbol.to_string());
    }

    fn splice(&mut self, production: &Production) {
        self.0.extend(production.symbols().iter().cloned());
    }

    fn render(self, separator: &str) -> String {
        self.0.join(separator)
    }
}

fn has_nonterminal<S: DerivationState>(state: &S, grammar: &Grammar) -> bool {
    state.symbols().any(|symbol| grammar.is_nonterminal(symbol))
}

/// Run one derivation of `grammar` from its start symbol.
///
/// Fails only under [`UndefinedPolicy::Fail`], when a nonterminal without a
/// table entry (or with an empty one) is reached. Under
/// [`UndefinedPolicy::EmitUnchanged`] such a symbol acts as its own single
/// alternative: its text is cut into symbols again and spliced back in.
pub fn derive<S, R>(grammar: &Grammar, max_steps: usize, rng: &mut R) -> Result<Derivation>
where
    S: DerivationState,
    R: Rng + ?Sized,
{
    let table = grammar.table();
    let config = grammar.config();

    let mut state = S::start(grammar.start_symbol());
    let mut rounds = 0;

    while has_nonterminal(&state, grammar) && rounds < max_steps {
        let mut next = S::default();

        for symbol in state.symbols() {
            // Terminals pass through untouched
            if !grammar.is_nonterminal(symbol) {
                next.push(symbol);
                continue;
            }

            // Randomly select one of the alternatives
            match table.choose(symbol, rng) {
                Some(production) => next.splice(production),
                None => match config.undefined_policy {
                    UndefinedPolicy::EmitUnchanged => {
                        next.splice(&Production::parse(symbol, config.tokenization));
                    }
                    UndefinedPolicy::Fail => {
                        return Err(GrammarError::UndefinedSymbol {
                            symbol: symbol.to_string(),
                            round: rounds + 1,
                        });
                    }
                },
            }
        }

        state = next;
        rounds += 1;
    }

    // Nonterminals left over mean the step limit cut the derivation short
    let outcome = if has_nonterminal(&state, grammar) {
        Outcome::Truncated
    } else {
        Outcome::Complete
    };

    Ok(Derivation {
        text: state.render(&config.separator),
        rounds,
        outcome,
    })
}
