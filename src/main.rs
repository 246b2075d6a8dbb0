use clap::{Parser, Subcommand};
use grammar_sampler::utils::{SymbolClassifier, SymbolSetClassifier, default_classifier_registry};
use grammar_sampler::{
    Grammar, GrammarConfig, Granularity, Outcome, ProductionTable, Sampler, Tokenization,
    UndefinedPolicy,
};
use std::fs;
use std::path::PathBuf;

/// Random string generator for regular and context-free grammars
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Productions such as "S->aS|b, A->a"
    #[arg(help = "Productions in Head->Alt1|Alt2 form, comma separated")]
    productions: Option<String>,

    /// Grammar file (.json dictionary or production text)
    #[arg(short, long, value_name = "PATH")]
    file: Option<PathBuf>,

    /// The start symbol
    #[arg(short, long, default_value = "S")]
    start: String,

    /// Number of strings to generate
    #[arg(short = 'n', long, allow_negative_numbers = true)]
    count: Option<i64>,

    /// Maximum rewrite rounds per string
    #[arg(short, long, allow_negative_numbers = true)]
    max_steps: Option<i64>,

    /// Rewrite characters (char) or symbol sequences (token)
    #[arg(short, long)]
    granularity: Option<Granularity>,

    /// How alternatives are split into symbols (chars, whitespace)
    #[arg(long)]
    tokenize: Option<Tokenization>,

    /// Terminal/nonterminal classifier
    #[arg(long, default_value = "uppercase")]
    classifier: String,

    /// Explicit nonterminal symbols; overrides --classifier
    #[arg(long, value_delimiter = ',', value_name = "SYMBOLS")]
    nonterminals: Vec<String>,

    /// Abort a derivation when it reaches an undefined nonterminal
    #[arg(long)]
    strict: bool,

    /// Text placed between symbols of a token-granularity result
    #[arg(long)]
    separator: Option<String>,

    /// Seed for reproducible output
    #[arg(long)]
    seed: Option<u64>,

    /// JSON file with sampling options; flags take precedence
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Print the batch as JSON
    #[arg(long)]
    json: bool,

    /// Suppress status messages
    #[arg(short, long)]
    quiet: bool,

    /// Subcommands
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate example grammar files
    Example {
        /// Type of grammar to generate
        #[arg(help = "Type of grammar (regular, context-free)", default_value = "regular")]
        grammar_type: String,

        /// Output file path
        #[arg(help = "Output file path")]
        output: Option<PathBuf>,
    },
}

const REGULAR_EXAMPLE: &str = "\
# Strings of the form a*b+c
S->aS|bA
A->bA|c
";

const CONTEXT_FREE_EXAMPLE: &str = "\
# Sums of x with balanced parentheses
E->E+T|T
T->(E)|x
";

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let quiet = cli.quiet;
    let status = |message: String| {
        if !quiet {
            eprintln!("{}", message);
        }
    };

    if let Some(command) = cli.command {
        match command {
            Commands::Example {
                grammar_type,
                output,
            } => {
                let output_path = output.unwrap_or_else(|| {
                    let filename = format!("example_{}_grammar.txt", grammar_type);
                    PathBuf::from(&filename)
                });

                let contents = match grammar_type.as_str() {
                    "regular" => REGULAR_EXAMPLE,
                    "context-free" => CONTEXT_FREE_EXAMPLE,
                    _ => {
                        return Err(format!("Unknown grammar type: {}", grammar_type).into());
                    }
                };
                fs::write(&output_path, contents)?;

                println!(
                    "Created example {} grammar at: {}",
                    grammar_type,
                    output_path.display()
                );
                return Ok(());
            }
        }
    }

    // Every option is settled before any grammar is read
    let mut config = match &cli.config {
        Some(path) => GrammarConfig::from_file(path)?,
        None => GrammarConfig::default(),
    };
    if let Some(count) = cli.count {
        config.set_count(count);
    }
    if let Some(max_steps) = cli.max_steps {
        config.set_max_steps(max_steps);
    }
    if let Some(granularity) = cli.granularity {
        config.granularity = granularity;
    }
    if let Some(tokenization) = cli.tokenize {
        config.tokenization = tokenization;
    }
    if cli.strict {
        config.undefined_policy = UndefinedPolicy::Fail;
    }
    if let Some(separator) = cli.separator {
        config.separator = separator;
    }
    if cli.seed.is_some() {
        config.seed = cli.seed;
    }

    let classifier: Box<dyn SymbolClassifier> = if cli.nonterminals.is_empty() {
        default_classifier_registry().resolve(&cli.classifier)?
    } else {
        Box::new(SymbolSetClassifier::new(cli.nonterminals))
    };

    let parsed = match (cli.file, cli.productions) {
        (Some(path), _) => {
            status(format!("Loading grammar from {}...", path.display()));
            ProductionTable::from_file(&path, config.tokenization)?
        }
        (None, Some(text)) => ProductionTable::parse(&text, config.tokenization),
        (None, None) => return Err("Productions or --file required".into()),
    };
    for err in &parsed.errors {
        eprintln!("warning: {}", err);
    }

    let grammar = Grammar::with_config(&cli.start, config)
        .with_table(parsed.table)
        .with_classifier(classifier);

    status(format!("Loaded {} rules.", grammar.table().len()));
    status(format!(
        "Generating {} strings from {} (at most {} rounds each):\n",
        grammar.config().count,
        grammar.start_symbol(),
        grammar.config().max_steps
    ));

    let batch = Sampler::new(&grammar).run();

    if cli.json {
        println!("{}", batch.to_json()?);
    } else {
        for (i, entry) in batch.entries().iter().enumerate() {
            match entry {
                Ok(derivation) => println!("{}. {}", i + 1, derivation.text),
                Err(err) => println!("{}. <{}>", i + 1, err),
            }
        }
    }

    status(format!(
        "\n{} complete, {} truncated, {} failed",
        batch.count_outcome(Outcome::Complete),
        batch.count_outcome(Outcome::Truncated),
        batch.failures().count()
    ));

    Ok(())
}
