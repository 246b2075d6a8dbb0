use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;

use crate::engine::{Derivation, Outcome};
use crate::grammar::Grammar;
use crate::utils::{GrammarError, Result};

/// Runs independent derivations of one grammar
#[derive(Debug, Clone, Copy)]
pub struct Sampler<'g> {
    grammar: &'g Grammar,
}

impl<'g> Sampler<'g> {
    pub fn new(grammar: &'g Grammar) -> Self {
        Sampler { grammar }
    }

    /// Generate `count` derivations using the thread RNG
    pub fn generate(&self, count: usize, max_steps: usize) -> SampleBatch {
        let mut rng = rand::thread_rng();
        self.generate_with_rng(count, max_steps, &mut rng)
    }

    /// Generate a batch that is reproducible for a given `seed`
    pub fn generate_seeded(&self, count: usize, max_steps: usize, seed: u64) -> SampleBatch {
        let mut rng = StdRng::seed_from_u64(seed);
        self.generate_with_rng(count, max_steps, &mut rng)
    }

    /// Generate `count` derivations drawing from `rng`. A derivation that
    /// fails takes its slot in the batch as an error; the rest still run.
    pub fn generate_with_rng<R: Rng + ?Sized>(
        &self,
        count: usize,
        max_steps: usize,
        rng: &mut R,
    ) -> SampleBatch {
        let entries = (0..count)
            .map(|_| self.grammar.derive_with(max_steps, &mut *rng))
            .collect();
        SampleBatch { entries }
    }

    /// Generate a batch with the count, step limit and seed of the grammar's
    /// config
    pub fn run(&self) -> SampleBatch {
        let config = self.grammar.config();
        match config.seed {
            Some(seed) => self.generate_seeded(config.count, config.max_steps, seed),
            None => self.generate(config.count, config.max_steps),
        }
    }
}

/// Results of one sampling run, in generation order
#[derive(Debug, Default)]
pub struct SampleBatch {
    entries: Vec<Result<Derivation>>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum EntryReport<'a> {
    Derived(&'a Derivation),
    Failed { error: String },
}

impl SampleBatch {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[Result<Derivation>] {
        &self.entries
    }

    /// Successful derivations
    pub fn derivations(&self) -> impl Iterator<Item = &Derivation> {
        self.entries.iter().filter_map(|entry| entry.as_ref().ok())
    }

    /// Errors of the derivations that were aborted
    pub fn failures(&self) -> impl Iterator<Item = &GrammarError> {
        self.entries.iter().filter_map(|entry| entry.as_ref().err())
    }

    /// Text of every successful derivation
    pub fn strings(&self) -> Vec<&str> {
        self.derivations().map(|d| d.text.as_str()).collect()
    }

    pub fn into_strings(self) -> Vec<String> {
        self.entries
            .into_iter()
            .filter_map(|entry| entry.ok())
            .map(|d| d.text)
            .collect()
    }

    pub fn count_outcome(&self, outcome: Outcome) -> usize {
        self.derivations().filter(|d| d.outcome == outcome).count()
    }

    /// Serialize the batch as a JSON array of derivations and `{"error": ..}`
    /// objects
    pub fn to_json(&self) -> Result<String> {
        let report: Vec<EntryReport<'_>> = self
            .entries
            .iter()
            .map(|entry| match entry {
                Ok(derivation) => EntryReport::Derived(derivation),
                Err(err) => EntryReport::Failed {
                    error: err.to_string(),
                },
            })
            .collect();
        Ok(serde_json::to_string_pretty(&report)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::{GrammarBuilder, UndefinedPolicy};

    #[test]
    fn test_zero_count_is_empty() {
        let grammar = GrammarBuilder::new("S").add_rule("S", &["a"]).build();
        let batch = Sampler::new(&grammar).generate(0, 10);
        assert!(batch.is_empty());
        assert_eq!(batch.to_json().unwrap(), "[]");
    }

    #[test]
    fn test_failed_derivation_keeps_its_slot() {
        let grammar = GrammarBuilder::new("S")
            .add_rule("S", &["a", "X"])
            .undefined_policy(UndefinedPolicy::Fail)
            .build();

        let batch = Sampler::new(&grammar).generate_seeded(40, 10, 3);

        assert_eq!(batch.len(), 40);
        let failed = batch.failures().count();
        assert!(failed > 0);
        assert_eq!(batch.strings().len() + failed, 40);
        assert!(batch.strings().iter().all(|s| *s == "a"));
    }

    #[test]
    fn test_run_uses_config() {
        let mut grammar = GrammarBuilder::new("S").add_rule("S", &["aS", "b"]).build();
        let mut config = grammar.config().clone();
        config.count = 7;
        config.seed = Some(11);
        grammar.set_config(config);

        let sampler = Sampler::new(&grammar);
        let first = sampler.run();
        let second = sampler.run();

        assert_eq!(first.len(), 7);
        assert_eq!(first.strings(), second.strings());
    }

    #[test]
    fn test_json_report() {
        let grammar = GrammarBuilder::new("S")
            .add_rule("S", &["S"])
            .build();

        let json = Sampler::new(&grammar).generate(1, 3).to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value[0]["text"], "S");
        assert_eq!(value[0]["rounds"], 3);
        assert_eq!(value[0]["outcome"], "truncated");
    }
}
