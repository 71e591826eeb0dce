//! # linelex: Line-Oriented Syntax Highlighting Tokenizer
//!
//! linelex splits source text into classified tokens one line at a time, the
//! way code editors highlight syntax. Languages are declared as rulesets of
//! regex rules grouped into lexing states; the state a line ends in is handed
//! to the next line, so constructs such as block comments and multi-line
//! strings carry across lines without re-reading the buffer.
//!
//! ## Components
//!
//! * Rulesets, rules and the line tokenizer ([`tokenizer`])
//! * Per-buffer incremental re-highlighting ([`highlight`])
//! * Ready-made rulesets ([`languages`])
//! * Tokenizer settings ([`config`])
//! * Error handling ([`error`])
//!
//! ## Pipeline
//!
//! ```text
//! Ruleset (builder / JSON) → validation → lazy per-state compile → tokenize_line → LineCache
//! ```
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use linelex::{highlight::LineCache, languages::Language, tokenizer::Tokenizer};
//!
//! let tokenizer = Tokenizer::new(Arc::new(Language::Bxl.ruleset().unwrap()));
//! let lines = ["x = 1 /* a", "b */ return"];
//! let cache = LineCache::from_lines(&tokenizer, &lines);
//! assert_eq!(cache.state_before(1).unwrap().current, "multilineComment");
//! ```

pub mod config;
pub mod error;
pub mod highlight;
pub mod languages;
pub mod tokenizer;

pub use error::*;

#[cfg(test)]
mod tests {
    use tracing_subscriber::{EnvFilter, FmtSubscriber};

    #[ctor::ctor]
    fn init_tests() {
        let subscriber = FmtSubscriber::builder()
            .with_env_filter(EnvFilter::from_default_env())
            .finish();
        tracing::subscriber::set_global_default(subscriber)
            .expect("Failed to set tracing subscriber");
    }
}
