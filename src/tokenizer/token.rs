//! # Token Types
//!
//! Tokens are the output of [`Tokenizer::tokenize_line`](super::runtime::Tokenizer::tokenize_line).
//! A [`Token`] borrows its text from the tokenized line, which keeps a
//! keystroke-driven re-tokenization free of per-token string allocations.
//! Callers that need to keep results around convert them into
//! [`TokenSpan`]s.

use std::{borrow::Borrow, fmt, ops::Range, sync::Arc};

use serde::{Serialize, Serializer};

use super::state::ResumeState;

/// Class assigned to text no rule matched when the state declares no default token.
pub const ERROR_CLASS: &str = "error";
/// Class used by the plain text ruleset.
pub const TEXT_CLASS: &str = "text";
/// Class of the remainder of a line that exceeded the token limit.
pub const OVERFLOW_CLASS: &str = "overflow";

/// Semantic category of a span, such as `keyword.control` or `string`.
///
/// Class names are free-form dotted strings chosen by the ruleset author.
/// Cloning is a reference count bump.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TokenClass(Arc<str>);

impl TokenClass {
    pub fn new(name: impl AsRef<str>) -> Self {
        Self(Arc::from(name.as_ref()))
    }

    pub fn error() -> Self {
        Self::new(ERROR_CLASS)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this class is `base` or a dotted refinement of it
    /// (`comment.line` is a `comment`).
    pub fn is_a(&self, base: &str) -> bool {
        self.0
            .strip_prefix(base)
            .is_some_and(|rest| rest.is_empty() || rest.starts_with('.'))
    }
}

impl Serialize for TokenClass {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl fmt::Display for TokenClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TokenClass {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for TokenClass {
    fn from(name: String) -> Self {
        Self(Arc::from(name))
    }
}

impl Borrow<str> for TokenClass {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for TokenClass {
    fn eq(&self, other: &str) -> bool {
        &*self.0 == other
    }
}

impl PartialEq<&str> for TokenClass {
    fn eq(&self, other: &&str) -> bool {
        &*self.0 == *other
    }
}

/// A classified span of one line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Token<'a> {
    pub class: TokenClass,
    pub value: &'a str,
    /// Byte offset of the first character within the line.
    pub start: usize,
    /// Character offset of the first character within the line.
    pub column: usize,
}

impl<'a> Token<'a> {
    pub fn end(&self) -> usize {
        self.start + self.value.len()
    }

    pub fn range(&self) -> Range<usize> {
        self.start..self.end()
    }

    pub fn to_span(&self) -> TokenSpan {
        TokenSpan {
            class: self.class.clone(),
            range: self.range(),
        }
    }
}

/// Owned form of a [`Token`], detached from the line it came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TokenSpan {
    pub class: TokenClass,
    pub range: Range<usize>,
}

impl TokenSpan {
    /// Extract the span's text from the line it was produced for.
    pub fn text<'a>(&self, line: &'a str) -> &'a str {
        &line[self.range.clone()]
    }
}

/// Result of tokenizing one line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineTokens<'a> {
    pub tokens: Vec<Token<'a>>,
    /// State to pass in when tokenizing the next line.
    pub state: ResumeState,
}

impl<'a> LineTokens<'a> {
    pub fn spans(&self) -> Vec<TokenSpan> {
        self.tokens.iter().map(Token::to_span).collect()
    }

    /// `(class, value)` pairs, convenient for assertions and debugging output.
    pub fn pairs(&self) -> Vec<(&str, &'a str)> {
        self.tokens
            .iter()
            .map(|t| (t.class.as_str(), t.value))
            .collect()
    }
}
