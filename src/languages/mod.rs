//! # Built-in Languages
//!
//! Rulesets shipped with the crate. Every ruleset here is built from scratch on
//! each call; wrap it in an [`Arc`](std::sync::Arc) and share it rather than
//! rebuilding it per buffer.

pub mod bxl;
pub mod text;

use crate::tokenizer::{Ruleset, RulesetResult};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, strum::EnumString, strum::Display, strum::EnumIter,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Language {
    /// Plain text, a single state.
    Text,
    Bxl,
}

impl Language {
    pub fn ruleset(self) -> RulesetResult<Ruleset> {
        match self {
            Language::Text => text::ruleset(),
            Language::Bxl => bxl::ruleset(),
        }
    }
}
