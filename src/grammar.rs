use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;
use std::sync::LazyLock;

use rand::Rng;
use rand::seq::SliceRandom;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::engine::{self, CharState, Derivation, TokenState};
use crate::utils::{GrammarError, Result, SymbolClassifier, uppercase_classifier};

/// `Head -> Body`, split at the first arrow
static ENTRY_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)^\s*(.*?)\s*->(.*)$").expect("entry pattern is valid"));

/// How the text of an alternative is cut into symbols
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Tokenization {
    /// Every character is one symbol (`aB` is `a`, `B`)
    #[default]
    Chars,
    /// Whitespace separates symbols (`NP VP` is `NP`, `VP`)
    Whitespace,
}

/// Which representation the derivation state uses
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Granularity {
    /// The state is one string and every character is a symbol
    #[default]
    Char,
    /// The state is a sequence of symbols
    Token,
}

/// What to do when a nonterminal with no table entry is reached
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UndefinedPolicy {
    /// Treat the symbol as its own only alternative and splice it back in
    #[default]
    EmitUnchanged,
    /// Abort the derivation with [`GrammarError::UndefinedSymbol`]
    Fail,
}

macro_rules! impl_from_str {
    ($ty:ty, $what:literal, { $($name:literal => $variant:expr),+ $(,)? }) => {
        impl FromStr for $ty {
            type Err = GrammarError;

            fn from_str(s: &str) -> Result<Self> {
                match s {
                    $($name => Ok($variant),)+
                    other => Err(GrammarError::InvalidConfig(format!(
                        concat!("unknown ", $what, " `{}` (expected one of: {})"),
                        other,
                        [$($name),+].join(", ")
                    ))),
                }
            }
        }
    };
}

impl_from_str!(Tokenization, "tokenization", {
    "chars" => Tokenization::Chars,
    "whitespace" => Tokenization::Whitespace,
});

impl_from_str!(Granularity, "granularity", {
    "char" => Granularity::Char,
    "token" => Granularity::Token,
});

impl_from_str!(UndefinedPolicy, "undefined policy", {
    "emit-unchanged" => UndefinedPolicy::EmitUnchanged,
    "fail" => UndefinedPolicy::Fail,
});

/// One alternative right-hand side of a production
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Production {
    symbols: Vec<String>,
}

impl Production {
    pub fn new<I, S>(symbols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Production {
            symbols: symbols.into_iter().map(Into::into).collect(),
        }
    }

    /// Cut the text of an alternative into symbols. Blank text is the empty
    /// alternative.
    pub fn parse(text: &str, tokenization: Tokenization) -> Self {
        let text = text.trim();
        match tokenization {
            Tokenization::Chars => Production::new(text.chars().map(String::from)),
            Tokenization::Whitespace => Production::new(text.split_whitespace()),
        }
    }

    pub fn symbols(&self) -> &[String] {
        &self.symbols
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }
}

impl fmt::Display for Production {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for symbol in &self.symbols {
            f.write_str(symbol)?;
        }
        Ok(())
    }
}

/// Mapping from nonterminal to its ordered alternatives
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProductionTable {
    rules: HashMap<String, Vec<Production>>,
}

/// A table parsed from text plus every entry that could not be parsed
#[derive(Debug, Default)]
pub struct ParsedTable {
    pub table: ProductionTable,
    pub errors: Vec<GrammarError>,
}

impl ParsedTable {
    /// The table, or the first parse error if there was one
    pub fn into_result(self) -> Result<ProductionTable> {
        match self.errors.into_iter().next() {
            Some(err) => Err(err),
            None => Ok(self.table),
        }
    }
}

impl ProductionTable {
    pub fn new() -> Self {
        ProductionTable {
            rules: HashMap::new(),
        }
    }

    /// Build a table from `(head, alternatives)` pairs. Later heads replace
    /// earlier ones.
    pub fn from_alternatives<I, H, A, S>(entries: I, tokenization: Tokenization) -> Self
    where
        I: IntoIterator<Item = (H, A)>,
        H: Into<String>,
        A: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut table = ProductionTable::new();
        for (head, alternatives) in entries {
            let productions = alternatives
                .into_iter()
                .map(|alt| Production::parse(alt.as_ref(), tokenization))
                .collect();
            table.insert(head, productions);
        }
        table
    }

    /// Parse a JSON object such as `{"S": ["aS", "b"]}`
    pub fn from_json(json: &str, tokenization: Tokenization) -> Result<Self> {
        let raw: HashMap<String, Vec<String>> = serde_json::from_str(json)?;
        Ok(Self::from_alternatives(raw, tokenization))
    }

    /// Parse productions written as `Head->Alt1|Alt2`.
    ///
    /// Entries are separated by commas or newlines; blank entries and lines
    /// starting with `#` are skipped. A malformed entry is recorded in
    /// [`ParsedTable::errors`] and parsing carries on with the next one.
    pub fn parse(text: &str, tokenization: Tokenization) -> ParsedTable {
        let mut parsed = ParsedTable::default();

        // Commas and newlines both end an entry
        let entries = text
            .split(['\n', ','])
            .map(str::trim)
            .filter(|entry| !entry.is_empty() && !entry.starts_with('#'));

        for (index, entry) in entries.enumerate() {
            // Record the bad entry and move on to the next one
            match Self::parse_entry(entry, tokenization) {
                Ok((head, productions)) => parsed.table.insert(head, productions),
                Err(reason) => parsed.errors.push(GrammarError::MalformedProduction {
                    entry: index + 1,
                    text: entry.to_string(),
                    reason: reason.to_string(),
                }),
            }
        }

        parsed
    }

    /// Like [`parse`](Self::parse) but rejects the whole text on the first
    /// malformed entry
    pub fn parse_strict(text: &str, tokenization: Tokenization) -> Result<Self> {
        Self::parse(text, tokenization).into_result()
    }

    fn parse_entry(
        entry: &str,
        tokenization: Tokenization,
    ) -> std::result::Result<(&str, Vec<Production>), &'static str> {
        let captures = ENTRY_REGEX.captures(entry).ok_or("missing `->`")?;
        let head = captures.get(1).map_or("", |m| m.as_str());
        let body = captures.get(2).map_or("", |m| m.as_str());

        // No validation beyond the shape of the entry itself
        if head.is_empty() {
            return Err("empty head");
        }
        if body.contains("->") {
            return Err("more than one `->`");
        }

        // Each `|`-separated alternative becomes one production
        let productions = body
            .split('|')
            .map(|alt| Production::parse(alt, tokenization))
            .collect();
        Ok((head, productions))
    }

    /// Read a table from disk. `.json` files hold a dictionary, anything else
    /// is production text.
    pub fn from_file<P: AsRef<Path>>(path: P, tokenization: Tokenization) -> Result<ParsedTable> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)?;

        // Dictionary files are recognised by extension only
        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        if is_json {
            Ok(ParsedTable {
                table: Self::from_json(&contents, tokenization)?,
                errors: Vec::new(),
            })
        } else {
            Ok(Self::parse(&contents, tokenization))
        }
    }

    /// Set the alternatives of `head`, replacing any previous entry
    pub fn insert<H: Into<String>>(&mut self, head: H, productions: Vec<Production>) {
        self.rules.insert(head.into(), productions);
    }

    /// Append one alternative to `head`
    pub fn add_alternative<H: Into<String>>(&mut self, head: H, production: Production) {
        self.rules.entry(head.into()).or_default().push(production);
    }

    pub fn get(&self, head: &str) -> Option<&[Production]> {
        self.rules.get(head).map(Vec::as_slice)
    }

    /// Pick one alternative of `head` uniformly at random. `None` when the head
    /// is missing or has no alternatives.
    pub fn choose<R: Rng + ?Sized>(&self, head: &str, rng: &mut R) -> Option<&Production> {
        self.rules.get(head)?.choose(rng)
    }

    pub fn contains(&self, head: &str) -> bool {
        self.rules.contains_key(head)
    }

    /// Heads in sorted order
    pub fn heads(&self) -> Vec<&str> {
        let mut heads: Vec<&str> = self.rules.keys().map(String::as_str).collect();
        heads.sort_unstable();
        heads
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl fmt::Display for ProductionTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, head) in self.heads().into_iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}->", head)?;
            for (j, production) in self.rules[head].iter().enumerate() {
                if j > 0 {
                    f.write_str("|")?;
                }
                write!(f, "{}", production)?;
            }
        }
        Ok(())
    }
}

/// Configuration options for sampling
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GrammarConfig {
    /// Number of strings a batch holds
    pub count: usize,
    /// Ceiling on rewrite rounds per derivation
    pub max_steps: usize,
    pub granularity: Granularity,
    pub tokenization: Tokenization,
    pub undefined_policy: UndefinedPolicy,
    /// Placed between symbols when a token-granularity state is rendered
    pub separator: String,
    /// Seed for reproducible batches; `None` draws from the thread RNG
    pub seed: Option<u64>,
}

impl Default for GrammarConfig {
    fn default() -> Self {
        GrammarConfig {
            count: 5,
            max_steps: 10,
            granularity: Granularity::Char,
            tokenization: Tokenization::Chars,
            undefined_policy: UndefinedPolicy::EmitUnchanged,
            separator: String::new(),
            seed: None,
        }
    }
}

impl GrammarConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_json(&fs::read_to_string(path)?)
    }

    /// Set the batch size from a signed value; a negative count generates
    /// nothing
    pub fn set_count(&mut self, count: i64) {
        self.count = usize::try_from(count).unwrap_or(0);
    }

    /// Set the step limit from a signed value; a negative limit runs no
    /// rounds
    pub fn set_max_steps(&mut self, max_steps: i64) {
        self.max_steps = usize::try_from(max_steps).unwrap_or(0);
    }
}

/// A production table together with everything needed to derive from it
#[derive(Debug, Clone)]
pub struct Grammar {
    table: ProductionTable,
    start_symbol: String,
    config: GrammarConfig,
    classifier: Box<dyn SymbolClassifier>,
}

impl Grammar {
    /// Create a grammar with an empty table
    pub fn new(start_symbol: &str) -> Self {
        Self::with_config(start_symbol, GrammarConfig::default())
    }

    pub fn with_config(start_symbol: &str, config: GrammarConfig) -> Self {
        Grammar {
            table: ProductionTable::new(),
            start_symbol: start_symbol.to_string(),
            config,
            classifier: uppercase_classifier(),
        }
    }

    pub fn with_table(mut self, table: ProductionTable) -> Self {
        self.table = table;
        self
    }

    /// Replace the terminal/nonterminal predicate
    pub fn with_classifier(mut self, classifier: Box<dyn SymbolClassifier>) -> Self {
        self.classifier = classifier;
        self
    }

    /// Parse production text with the tokenization from `config`, rejecting
    /// the grammar if any entry is malformed
    pub fn from_text(text: &str, start_symbol: &str, config: GrammarConfig) -> Result<Self> {
        let table = ProductionTable::parse_strict(text, config.tokenization)?;
        Ok(Self::with_config(start_symbol, config).with_table(table))
    }

    /// Run one derivation with the thread RNG and the configured step limit
    pub fn generate(&self) -> Result<String> {
        let mut rng = rand::thread_rng();
        self.derive_with(self.config.max_steps, &mut rng)
            .map(|derivation| derivation.text)
    }

    /// Run one derivation, dispatching on the configured granularity
    pub fn derive_with<R: Rng + ?Sized>(&self, max_steps: usize, rng: &mut R) -> Result<Derivation> {
        match self.config.granularity {
            Granularity::Char => engine::derive::<CharState, R>(self, max_steps, rng),
            Granularity::Token => engine::derive::<TokenState, R>(self, max_steps, rng),
        }
    }

    pub fn is_nonterminal(&self, symbol: &str) -> bool {
        self.classifier.is_nonterminal(symbol)
    }

    /// Check if the table has an entry for `name`
    pub fn has_non_terminal(&self, name: &str) -> bool {
        self.table.contains(name)
    }

    pub fn table(&self) -> &ProductionTable {
        &self.table
    }

    pub fn start_symbol(&self) -> &str {
        &self.start_symbol
    }

    pub fn classifier(&self) -> &dyn SymbolClassifier {
        self.classifier.as_ref()
    }

    pub fn config(&self) -> &GrammarConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: GrammarConfig) {
        self.config = config;
    }
}

/// Builder for constructing Grammar instances
pub struct GrammarBuilder {
    grammar: Grammar,
}

impl GrammarBuilder {
    /// Create a new grammar builder with default config
    pub fn new(start_symbol: &str) -> Self {
        GrammarBuilder {
            grammar: Grammar::new(start_symbol),
        }
    }

    /// Set the configuration. Alternatives added afterwards use its
    /// tokenization.
    pub fn config(mut self, config: GrammarConfig) -> Self {
        self.grammar.config = config;
        self
    }

    pub fn granularity(mut self, granularity: Granularity) -> Self {
        self.grammar.config.granularity = granularity;
        self
    }

    pub fn undefined_policy(mut self, policy: UndefinedPolicy) -> Self {
        self.grammar.config.undefined_policy = policy;
        self
    }

    /// Append alternatives to `head`
    pub fn add_rule(mut self, head: &str, alternatives: &[&str]) -> Self {
        let tokenization = self.grammar.config.tokenization;
        for alt in alternatives {
            self.grammar
                .table
                .add_alternative(head, Production::parse(alt, tokenization));
        }
        self
    }

    /// Append one alternative given as explicit symbols
    pub fn add_symbols(mut self, head: &str, symbols: &[&str]) -> Self {
        self.grammar
            .table
            .add_alternative(head, Production::new(symbols.iter().copied()));
        self
    }

    pub fn classifier(mut self, classifier: Box<dyn SymbolClassifier>) -> Self {
        self.grammar.classifier = classifier;
        self
    }

    /// Build the grammar
    pub fn build(self) -> Grammar {
        self.grammar
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alternatives(table: &ProductionTable, head: &str) -> Vec<String> {
        table
            .get(head)
            .unwrap()
            .iter()
            .map(ToString::to_string)
            .collect()
    }

    #[test]
    fn test_parse_productions() {
        let parsed = ProductionTable::parse("S -> aS | b, A->a", Tokenization::Chars);
        assert!(parsed.errors.is_empty());

        let table = parsed.table;
        assert_eq!(table.len(), 2);
        assert_eq!(alternatives(&table, "S"), vec!["aS", "b"]);
        assert_eq!(alternatives(&table, "A"), vec!["a"]);

        let s = table.get("S").unwrap();
        assert_eq!(s[0].symbols(), &["a".to_string(), "S".to_string()]);
    }

    #[test]
    fn test_parse_keeps_going_after_malformed_entry() {
        let parsed = ProductionTable::parse("S->aB, Bb, ->x, B->b, C->c->d", Tokenization::Chars);

        assert_eq!(parsed.table.heads(), vec!["B", "S"]);
        assert_eq!(parsed.errors.len(), 3);

        match &parsed.errors[0] {
            GrammarError::MalformedProduction { entry, text, reason } => {
                assert_eq!(*entry, 2);
                assert_eq!(text, "Bb");
                assert_eq!(reason, "missing `->`");
            }
            other => panic!("Expected MalformedProduction, got {:?}", other),
        }
        assert!(parsed.errors[1].to_string().contains("empty head"));
        assert!(parsed.errors[2].to_string().contains("more than one `->`"));

        assert!(ProductionTable::parse_strict("S->a, oops", Tokenization::Chars).is_err());
    }

    #[test]
    fn test_parse_newlines_and_comments() {
        let text = "# a tiny grammar\nS->aA\n\nA->b|\n";
        let table = ProductionTable::parse_strict(text, Tokenization::Chars).unwrap();

        assert_eq!(alternatives(&table, "A"), vec!["b", ""]);
        assert!(table.get("A").unwrap()[1].is_empty());
    }

    #[test]
    fn test_duplicate_head_overwrites() {
        let table = ProductionTable::parse_strict("S->a, S->b|c", Tokenization::Chars).unwrap();
        assert_eq!(alternatives(&table, "S"), vec!["b", "c"]);
    }

    #[test]
    fn test_whitespace_tokenization() {
        let table = ProductionTable::parse_strict("S->NP VP, NP->the N", Tokenization::Whitespace)
            .unwrap();
        let s = &table.get("S").unwrap()[0];
        assert_eq!(s.symbols(), &["NP".to_string(), "VP".to_string()]);
    }

    #[test]
    fn test_from_json() {
        let table = ProductionTable::from_json(r#"{"S": ["aS", "b"]}"#, Tokenization::Chars).unwrap();
        assert_eq!(alternatives(&table, "S"), vec!["aS", "b"]);

        let err = ProductionTable::from_json("[1, 2]", Tokenization::Chars).unwrap_err();
        assert!(matches!(err, GrammarError::Json(_)));
    }

    #[test]
    fn test_display_table() {
        let table = ProductionTable::parse_strict("S->aS|b, A->a", Tokenization::Chars).unwrap();
        assert_eq!(table.to_string(), "A->a, S->aS|b");
    }

    #[test]
    fn test_choose_missing_or_empty() {
        let mut rng = rand::thread_rng();
        let mut table = ProductionTable::new();
        table.insert("E", Vec::new());

        assert!(table.choose("E", &mut rng).is_none());
        assert!(table.choose("M", &mut rng).is_none());
    }

    #[test]
    fn test_enum_from_str() {
        assert_eq!("token".parse::<Granularity>().unwrap(), Granularity::Token);
        assert_eq!("fail".parse::<UndefinedPolicy>().unwrap(), UndefinedPolicy::Fail);
        assert_eq!(
            "whitespace".parse::<Tokenization>().unwrap(),
            Tokenization::Whitespace
        );

        let err = "word".parse::<Granularity>().unwrap_err();
        assert!(err.to_string().contains("expected one of: char, token"));
    }

    #[test]
    fn test_config_json() {
        let config = GrammarConfig::from_json(r#"{"max_steps": 3, "granularity": "token"}"#).unwrap();

        assert_eq!(config.max_steps, 3);
        assert_eq!(config.granularity, Granularity::Token);
        assert_eq!(config.count, 5);
        assert_eq!(config.undefined_policy, UndefinedPolicy::EmitUnchanged);

        let err = GrammarConfig::from_json(r#"{"max_steps": "ten"}"#).unwrap_err();
        assert!(matches!(err, GrammarError::Json(_)));
    }

    #[test]
    fn test_negative_count_and_steps() {
        let mut config = GrammarConfig::default();
        config.set_count(-3);
        config.set_max_steps(-1);
        assert_eq!(config.count, 0);
        assert_eq!(config.max_steps, 0);

        config.set_count(4);
        config.set_max_steps(12);
        assert_eq!(config.count, 4);
        assert_eq!(config.max_steps, 12);
    }

    #[test]
    fn test_grammar_builder() {
        let grammar = GrammarBuilder::new("S")
            .add_rule("S", &["aS"])
            .add_rule("S", &["b"])
            .granularity(Granularity::Token)
            .build();

        assert!(grammar.has_non_terminal("S"));
        assert!(!grammar.has_non_terminal("A"));
        assert_eq!(grammar.table().get("S").unwrap().len(), 2);
        assert_eq!(grammar.config().granularity, Granularity::Token);
    }
}
