use thiserror::Error;

use crate::tokenizer::RulesetError;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Ruleset error: {0}")]
    Ruleset(#[from] RulesetError),
    #[error("Config error: {0}")]
    Config(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type InternalResult<T> = Result<T, Error>;

impl Error {
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Error::Internal(message.into())
    }

    pub fn config<S: Into<String>>(message: S) -> Self {
        Error::Config(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokenizer::Ruleset;

    fn load(json: &str) -> InternalResult<Ruleset> {
        Ok(Ruleset::from_json(json)?)
    }

    #[test]
    fn test_ruleset_errors_convert() {
        let err = load(r#"{ "name": "x", "start": "main", "states": { "start": [] } }"#).unwrap_err();
        assert!(matches!(
            err,
            Error::Ruleset(RulesetError::MissingStartState(ref name)) if name == "main"
        ));
        assert_eq!(err.to_string(), "Ruleset error: start state 'main' is not defined");
    }
}
