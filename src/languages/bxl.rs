//! BXL, the scripting language of the Blueprint tree editor.
//!
//! Derived from [`text`](super::text): the `start` state adds its own rules
//! in front of the inherited ones and keeps the `text` default token.

use super::text;
use crate::tokenizer::{KeywordClassifier, Rule, Ruleset, RulesetResult, StateDefinition};

const KEYWORDS: &str = "this|super|root|forkey|forval";
const CONTROL_KEYWORDS: &str = "if|else|while|for|break|continue|return";
const TREES: &str = "loc|in|out|cfg|data|env|tmp|throw|try|catch|finally";
const TYPES: &str = "bool|int|float";

const WORDS: &str = "words";

const OPERATORS: &str = concat!(
    r"!==|===|!=|==|<<=|>>>=|>>=|<=|>=|<>|&&|\|\||\?:",
    r"|\*=|%=|\+=|-=|&=|\^=|\+\+|--",
    r"|[!$%&/*\-+.~=<>]",
);

pub fn ruleset() -> RulesetResult<Ruleset> {
    let words = KeywordClassifier::builder()
        .group("keyword", KEYWORDS)
        .group("keyword.control", CONTROL_KEYWORDS)
        .group("variable.language", TREES)
        .group("support.function", TYPES)
        .build("identifier")?;

    text::ruleset()?
        .derive("bxl")
        .classifier(WORDS, words)
        .state(
            "start",
            StateDefinition::new()
                .rule(Rule::new("comment.line", "//.*$"))
                .rule(Rule::new("comment.block", r"/\*").push("multilineComment"))
                .rule(Rule::new("string", "'{3}").push("multilineString"))
                .rule(Rule::new("string.double", r#""(?:\\.|[^"\\])*?""#))
                .rule(Rule::new(
                    "constant.numeric",
                    r"[+-]?\d+(?:(?:\.\d*)?(?:[eE][+-]?\d+)?)?(L|l|F|f|D|d)?\b",
                ))
                .rule(Rule::new("constant.language.boolean", r"(?:true|false)\b"))
                .rule(Rule::new("constant.language", r"(?:null|empty)\b"))
                .rule(Rule::new("identifier.tree", r"/\w+"))
                .rule(Rule::new("support.function.module", r"\$\w+\.\w+"))
                .rule(Rule::classify(WORDS, r"[a-zA-Z_$][a-zA-Z0-9_$]*\b"))
                .rule(Rule::new("keyword.operator", OPERATORS))
                .rule(Rule::new("lparen", r"[\[({]"))
                .rule(Rule::new("rparen", r"[\])}]"))
                .splice_base(),
        )
        .state(
            "multilineComment",
            StateDefinition::new()
                .rule(Rule::new("comment", r"\*/").pop())
                .default_token("comment"),
        )
        .state(
            "multilineString",
            StateDefinition::new()
                .rule(Rule::new("string", "'{3}").pop())
                .default_token("string"),
        )
        .build()
}
