use clap::{Parser, ValueEnum};
use linelex::{
    config::TokenizerConfig,
    languages::Language,
    tokenizer::{Ruleset, Tokenizer},
    Error, InternalResult,
};
use serde_json::json;
use std::{path::PathBuf, sync::Arc};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Format {
    /// One `line:column class "value"` row per token
    Text,
    /// One JSON object per line
    Json,
}

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// File to tokenize
    file: PathBuf,

    /// Built-in language, guessed from the file extension when omitted
    #[arg(short, long)]
    language: Option<Language>,

    /// JSON ruleset definition, used instead of a built-in language
    #[arg(short, long, conflicts_with = "language")]
    rules: Option<PathBuf>,

    /// Path to tokenizer config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[arg(short, long, value_enum, default_value_t = Format::Text)]
    format: Format,

    /// Enable debug mode
    #[arg(short, long)]
    verbose: bool,
}

fn load_ruleset(cli: &Cli) -> InternalResult<Ruleset> {
    if let Some(path) = &cli.rules {
        let json = std::fs::read_to_string(path)?;
        return Ok(Ruleset::from_json(&json)?);
    }

    let language = cli.language.unwrap_or_else(|| {
        cli.file
            .extension()
            .and_then(|ext| ext.to_str())
            .and_then(|ext| ext.parse().ok())
            .unwrap_or(Language::Text)
    });
    debug!("using built-in language '{}'", language);
    Ok(language.ruleset()?)
}

fn run(cli: &Cli) -> InternalResult<()> {
    let config = match &cli.config {
        Some(path) => TokenizerConfig::from_file(path)?,
        None => TokenizerConfig::default(),
    };
    debug!("config: {:?}", config);

    let ruleset = Arc::new(load_ruleset(cli)?);
    info!("ruleset '{}' loaded.", ruleset.name());

    let source = std::fs::read_to_string(&cli.file)
        .map_err(|e| Error::internal(format!("Failed to read {}: {}", cli.file.display(), e)))?;

    let tokenizer = Tokenizer::with_config(ruleset, &config);
    let mut state = tokenizer.initial_state();
    for (index, line) in source.lines().enumerate() {
        let result = tokenizer.tokenize_line(line, &state);
        match cli.format {
            Format::Text => {
                for token in &result.tokens {
                    println!(
                        "{}:{} {} {:?}",
                        index + 1,
                        token.column + 1,
                        token.class,
                        token.value
                    );
                }
            }
            Format::Json => {
                let row = json!({
                    "line": index + 1,
                    "tokens": result.tokens,
                    "state": result.state.to_string(),
                });
                println!("{}", row);
            }
        }
        state = result.state;
    }

    debug!("finished in state {}", state);
    Ok(())
}

fn main() {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(&cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
