//! # Keyword Classification
//!
//! Most languages lex every identifier-like word with one generic pattern and
//! decide afterwards whether the word is a keyword, a type or a plain
//! identifier. A [`KeywordClassifier`] makes that decision.
//!
//! ## Building
//!
//! A classifier is built from groups of `|`-delimited words, one group per
//! token class:
//!
//! ```
//! # use linelex::tokenizer::keyword::KeywordClassifier;
//! let classifier = KeywordClassifier::build(
//!     [("keyword", "if|else"), ("type", "int")],
//!     "identifier",
//! )
//! .unwrap();
//! assert_eq!(classifier.classify("if"), "keyword");
//! assert_eq!(classifier.classify("int"), "type");
//! assert_eq!(classifier.classify("foo"), "identifier");
//! ```
//!
//! Every word must be a bare identifier; anything else is rejected when the
//! classifier is built, never when a lexeme is classified. When a word appears
//! in more than one group, the group listed last wins.

use std::collections::HashMap;

use nom::{
    bytes::complete::{take_while, take_while1},
    combinator::{all_consuming, recognize},
    sequence::pair,
    IResult,
};

use super::{
    error::{RulesetError, RulesetResult},
    token::TokenClass,
};

const DEFAULT_SPLIT_CHAR: char = '|';

/// Maps identifier-like lexemes to token classes.
#[derive(Debug, Clone)]
pub struct KeywordClassifier {
    words: HashMap<String, TokenClass>,
    keywords: Vec<String>,
    default_class: TokenClass,
    ignore_case: bool,
}

impl KeywordClassifier {
    /// Builds a case-sensitive classifier splitting word lists on `|`.
    pub fn build<I, C, W>(groups: I, default_class: impl Into<TokenClass>) -> RulesetResult<Self>
    where
        I: IntoIterator<Item = (C, W)>,
        C: AsRef<str>,
        W: AsRef<str>,
    {
        Self::builder().groups(groups).build(default_class)
    }

    pub fn builder() -> KeywordClassifierBuilder {
        KeywordClassifierBuilder::default()
    }

    /// Class of `lexeme`, or the default class when it is not a known word.
    pub fn classify(&self, lexeme: &str) -> TokenClass {
        let found = if self.ignore_case {
            self.words.get(&lexeme.to_lowercase())
        } else {
            self.words.get(lexeme)
        };
        found.unwrap_or(&self.default_class).clone()
    }

    /// Consumes the classifier into a plain lookup function.
    pub fn into_fn(self) -> impl Fn(&str) -> TokenClass + Send + Sync {
        move |lexeme| self.classify(lexeme)
    }

    /// Every word in authoring order, as written.
    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }

    pub fn default_class(&self) -> &TokenClass {
        &self.default_class
    }

    pub fn ignore_case(&self) -> bool {
        self.ignore_case
    }
}

#[derive(Debug, Clone)]
pub struct KeywordClassifierBuilder {
    groups: Vec<(String, String)>,
    ignore_case: bool,
    split_char: char,
}

impl Default for KeywordClassifierBuilder {
    fn default() -> Self {
        Self {
            groups: Vec::new(),
            ignore_case: false,
            split_char: DEFAULT_SPLIT_CHAR,
        }
    }
}

impl KeywordClassifierBuilder {
    pub fn group(mut self, class: impl AsRef<str>, words: impl AsRef<str>) -> Self {
        self.groups
            .push((class.as_ref().to_string(), words.as_ref().to_string()));
        self
    }

    pub fn groups<I, C, W>(mut self, groups: I) -> Self
    where
        I: IntoIterator<Item = (C, W)>,
        C: AsRef<str>,
        W: AsRef<str>,
    {
        for (class, words) in groups {
            self = self.group(class, words);
        }
        self
    }

    pub fn ignore_case(mut self, ignore_case: bool) -> Self {
        self.ignore_case = ignore_case;
        self
    }

    pub fn split_char(mut self, split_char: char) -> Self {
        self.split_char = split_char;
        self
    }

    #[tracing::instrument(level = "debug", skip(self, default_class))]
    pub fn build(self, default_class: impl Into<TokenClass>) -> RulesetResult<KeywordClassifier> {
        let mut words = HashMap::new();
        let mut keywords = Vec::new();

        for (class, list) in &self.groups {
            let token_class = TokenClass::new(class);
            for word in list.split(self.split_char) {
                if !is_bare_identifier(word) {
                    return Err(RulesetError::InvalidKeyword {
                        class: class.clone(),
                        word: word.to_string(),
                    });
                }
                keywords.push(word.to_string());
                let key = if self.ignore_case {
                    word.to_lowercase()
                } else {
                    word.to_string()
                };
                // Later groups overwrite earlier ones.
                words.insert(key, token_class.clone());
            }
        }

        tracing::debug!(
            "keyword classifier built with {} words in {} groups",
            keywords.len(),
            self.groups.len()
        );

        Ok(KeywordClassifier {
            words,
            keywords,
            default_class: default_class.into(),
            ignore_case: self.ignore_case,
        })
    }
}

fn identifier(input: &str) -> IResult<&str, &str> {
    recognize(pair(
        take_while1(|c: char| c.is_alphabetic() || c == '_' || c == '$'),
        take_while(|c: char| c.is_alphanumeric() || c == '_' || c == '$'),
    ))(input)
}

fn is_bare_identifier(word: &str) -> bool {
    all_consuming(identifier)(word).is_ok()
}
