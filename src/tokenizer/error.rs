use thiserror::Error;

use super::state::StateName;

/// Errors raised while building, composing or compiling a ruleset.
///
/// All of these are authoring errors. Tokenizing a line never fails.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RulesetError {
    #[error("rules {first} and {second} of state '{state}' share the zero-width pattern `{pattern}`")]
    RuleConflict {
        state: StateName,
        first: usize,
        second: usize,
        pattern: String,
    },
    #[error("state '{from}' references undefined state '{target}'")]
    DanglingState { from: StateName, target: StateName },
    #[error("start state '{0}' is not defined")]
    MissingStartState(StateName),
    #[error("invalid pattern `{pattern}` in rule {index} of state '{state}': {message}")]
    InvalidPattern {
        state: StateName,
        index: usize,
        pattern: String,
        message: String,
    },
    #[error("invalid keyword `{word}` in class '{class}'")]
    InvalidKeyword { class: String, word: String },
    #[error("state '{state}' uses unknown classifier '{id}'")]
    UnknownClassifier { state: StateName, id: String },
    #[error("invalid transition `{0}`")]
    InvalidTransition(String),
    #[error("invalid ruleset definition: {0}")]
    Definition(String),
}

pub type RulesetResult<T> = Result<T, RulesetError>;
