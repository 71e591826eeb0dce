//! # Tokenizer Component
//!
//! A line-oriented, regex-driven tokenizer of the kind editors use for syntax
//! highlighting. Languages are described as *rulesets*: named lexing states,
//! each an ordered list of rules. A rule pairs a regular expression with the
//! token class to emit and an optional transition to another state.
//!
//! ## Design Principles
//!
//! * **Line at a time**: [`Tokenizer::tokenize_line`](runtime::Tokenizer::tokenize_line)
//!   takes one line plus the [`ResumeState`](state::ResumeState) the previous
//!   line ended in, and returns the tokens and the state for the next line.
//!   Re-highlighting after an edit only needs the lines whose state changed.
//! * **Never fails at runtime**: all checking happens when a ruleset is
//!   built. Unmatched text becomes default tokens.
//! * **Composition over copying**: rulesets derive from one another and
//!   import other languages under a prefix ([`compose`]).
//!
//! ## Component Structure
//!
//! * [`token`]: Token classes and the tokens of a line
//! * [`state`]: State names, transitions and the resume state
//! * [`keyword`]: Keyword classifiers for identifier-like lexemes
//! * [`rule`]: Rules and state definitions
//! * [`ruleset`]: Validated, shareable rulesets
//! * [`compose`]: Deriving and importing rulesets
//! * [`definition`]: JSON authored rulesets
//! * [`compiler`]: Turning states into matchers
//! * [`runtime`]: The line tokenizer
//! * [`error`]: Build time errors
//!
//! ## Usage Example
//!
//! ```
//! use std::sync::Arc;
//! use linelex::tokenizer::{KeywordClassifier, Rule, Ruleset, StateDefinition, Tokenizer};
//!
//! let words = KeywordClassifier::build([("keyword", "if|else")], "identifier").unwrap();
//! let ruleset = Ruleset::builder("mini")
//!     .classifier("words", words)
//!     .state(
//!         "start",
//!         StateDefinition::new()
//!             .rule(Rule::new("comment.line", "//.*$"))
//!             .rule(Rule::classify("words", r"[a-z]+"))
//!             .default_token("text"),
//!     )
//!     .build()
//!     .unwrap();
//!
//! let tokenizer = Tokenizer::new(Arc::new(ruleset));
//! let line = tokenizer.tokenize_line("if x // why", &tokenizer.initial_state());
//! assert_eq!(
//!     line.pairs(),
//!     vec![
//!         ("keyword", "if"),
//!         ("text", " "),
//!         ("identifier", "x"),
//!         ("text", " "),
//!         ("comment.line", "// why"),
//!     ]
//! );
//! ```

pub mod compiler;
pub mod compose;
pub mod definition;
pub mod error;
pub mod keyword;
pub mod rule;
pub mod ruleset;
pub mod runtime;
pub mod state;
pub mod token;

pub use compiler::{CompileOptions, MatchStrategy};
pub use compose::{extend, Derivation, Import};
pub use error::{RulesetError, RulesetResult};
pub use keyword::KeywordClassifier;
pub use rule::{Rule, StateDefinition, TokenSpec};
pub use ruleset::{Ruleset, RulesetBuilder, RulesetId};
pub use runtime::Tokenizer;
pub use state::{ResumeState, StateName, Transition, START_STATE};
pub use token::{LineTokens, Token, TokenClass, TokenSpan};
