use std::collections::HashSet;
use std::fmt;
use std::io;
use std::sync::Arc;
use thiserror::Error;

/// Custom error types for the grammar sampler
#[derive(Error, Debug)]
pub enum GrammarError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Malformed production #{entry} `{text}`: {reason}")]
    MalformedProduction {
        /// 1-based position of the entry in the input
        entry: usize,
        text: String,
        reason: String,
    },

    #[error("Undefined nonterminal `{symbol}` reached in round {round}")]
    UndefinedSymbol { symbol: String, round: usize },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Unknown classifier: {0}")]
    UnknownClassifier(String),
}

/// Result type for grammar operations
pub type Result<T> = std::result::Result<T, GrammarError>;

/// Decides which symbols still need rewriting.
pub trait SymbolClassifier: Send + Sync + fmt::Debug {
    /// True if `symbol` must be rewritten further
    fn is_nonterminal(&self, symbol: &str) -> bool;

    /// Get the name of this classifier
    fn name(&self) -> &str;

    /// Clone this classifier as a box
    fn clone_box(&self) -> Box<dyn SymbolClassifier>;
}

impl Clone for Box<dyn SymbolClassifier> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

/// The casing convention: a symbol is a nonterminal when it has at least one
/// cased character and none of its cased characters are lowercase.
#[derive(Debug, Clone, Default)]
pub struct UppercaseClassifier;

impl SymbolClassifier for UppercaseClassifier {
    fn is_nonterminal(&self, symbol: &str) -> bool {
        let mut cased = false;
        for c in symbol.chars() {
            if c.is_lowercase() {
                return false;
            }
            cased |= c.is_uppercase();
        }
        cased
    }

    fn name(&self) -> &str {
        "uppercase"
    }

    fn clone_box(&self) -> Box<dyn SymbolClassifier> {
        Box::new(self.clone())
    }
}

/// Like [`UppercaseClassifier`] but only `A-Z` count as cased.
#[derive(Debug, Clone, Default)]
pub struct AsciiUppercaseClassifier;

impl SymbolClassifier for AsciiUppercaseClassifier {
    fn is_nonterminal(&self, symbol: &str) -> bool {
        symbol.bytes().any(|b| b.is_ascii_uppercase())
            && !symbol.bytes().any(|b| b.is_ascii_lowercase())
    }

    fn name(&self) -> &str {
        "ascii-uppercase"
    }

    fn clone_box(&self) -> Box<dyn SymbolClassifier> {
        Box::new(self.clone())
    }
}

/// Treats exactly the listed symbols as nonterminals
#[derive(Debug, Clone)]
pub struct SymbolSetClassifier {
    symbols: HashSet<String>,
}

impl SymbolSetClassifier {
    pub fn new<I, S>(symbols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        SymbolSetClassifier {
            symbols: symbols.into_iter().map(Into::into).collect(),
        }
    }
}

impl SymbolClassifier for SymbolSetClassifier {
    fn is_nonterminal(&self, symbol: &str) -> bool {
        self.symbols.contains(symbol)
    }

    fn name(&self) -> &str {
        "symbol-set"
    }

    fn clone_box(&self) -> Box<dyn SymbolClassifier> {
        Box::new(self.clone())
    }
}

/// Create the default casing classifier
pub fn uppercase_classifier() -> Box<dyn SymbolClassifier> {
    Box::new(UppercaseClassifier)
}

/// Registry for looking up classifiers by name
#[derive(Debug, Clone, Default)]
pub struct ClassifierRegistry {
    classifiers: Vec<(String, Arc<Box<dyn SymbolClassifier>>)>,
}

impl ClassifierRegistry {
    /// Create a new empty classifier registry
    pub fn new() -> Self {
        ClassifierRegistry {
            classifiers: Vec::new(),
        }
    }

    /// Register a classifier with a name
    pub fn register<C: SymbolClassifier + 'static>(&mut self, name: &str, classifier: C) -> &mut Self {
        self.classifiers
            .push((name.to_string(), Arc::new(Box::new(classifier))));
        self
    }

    /// Get a classifier by name
    pub fn get(&self, name: &str) -> Option<Arc<Box<dyn SymbolClassifier>>> {
        self.classifiers
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, c)| Arc::clone(c))
    }

    /// Get a boxed copy of a classifier, or an error naming the known ones
    pub fn resolve(&self, name: &str) -> Result<Box<dyn SymbolClassifier>> {
        self.get(name)
            .map(|c| c.clone_box())
            .ok_or_else(|| {
                GrammarError::UnknownClassifier(format!(
                    "{} (known: {})",
                    name,
                    self.list_classifiers().join(", ")
                ))
            })
    }

    /// Get a list of all registered classifier names
    pub fn list_classifiers(&self) -> Vec<String> {
        self.classifiers
            .iter()
            .map(|(name, _)| name.clone())
            .collect()
    }

    /// Register the built-in classifiers
    pub fn register_defaults(&mut self) -> &mut Self {
        self.register("uppercase", UppercaseClassifier)
            .register("ascii-uppercase", AsciiUppercaseClassifier)
    }
}

/// Create a default classifier registry with the built-in classifiers
pub fn default_classifier_registry() -> ClassifierRegistry {
    let mut registry = ClassifierRegistry::new();
    registry.register_defaults();
    registry
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uppercase_classifier() {
        let classifier = UppercaseClassifier;

        assert!(classifier.is_nonterminal("S"));
        assert!(classifier.is_nonterminal("AB"));
        assert!(classifier.is_nonterminal("A1"));
        assert!(classifier.is_nonterminal("Ñ"));

        assert!(!classifier.is_nonterminal("a"));
        assert!(!classifier.is_nonterminal("aB"));
        assert!(!classifier.is_nonterminal("1"));
        assert!(!classifier.is_nonterminal("+"));
        assert!(!classifier.is_nonterminal(""));
    }

    #[test]
    fn test_ascii_uppercase_classifier() {
        let classifier = AsciiUppercaseClassifier;

        assert!(classifier.is_nonterminal("S"));
        assert!(classifier.is_nonterminal("S'"));
        assert!(!classifier.is_nonterminal("Ñ"));
        assert!(!classifier.is_nonterminal("Sa"));
    }

    #[test]
    fn test_symbol_set_classifier() {
        let classifier = SymbolSetClassifier::new(["expr", "term"]);

        assert!(classifier.is_nonterminal("expr"));
        assert!(!classifier.is_nonterminal("E"));
        assert_eq!(classifier.name(), "symbol-set");
    }

    #[test]
    fn test_classifier_registry() {
        let registry = default_classifier_registry();

        assert_eq!(
            registry.list_classifiers(),
            vec!["uppercase", "ascii-uppercase"]
        );

        let classifier = registry.resolve("ascii-uppercase").unwrap();
        assert_eq!(classifier.name(), "ascii-uppercase");

        let err = registry.resolve("lowercase").unwrap_err();
        assert!(matches!(err, GrammarError::UnknownClassifier(_)));
        assert!(err.to_string().contains("known: uppercase, ascii-uppercase"));
    }

    #[test]
    fn test_error_display() {
        let err = GrammarError::MalformedProduction {
            entry: 2,
            text: "Ab".to_string(),
            reason: "missing `->`".to_string(),
        };
        assert_eq!(err.to_string(), "Malformed production #2 `Ab`: missing `->`");

        let err = GrammarError::UndefinedSymbol {
            symbol: "B".to_string(),
            round: 1,
        };
        assert_eq!(err.to_string(), "Undefined nonterminal `B` reached in round 1");
    }
}
