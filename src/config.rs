use serde::{Deserialize, Serialize};
use std::{fs::File, io::BufReader, path::Path};

use crate::{
    tokenizer::{
        compiler::{CompileOptions, DEFAULT_REGEX_SIZE_LIMIT},
        token::OVERFLOW_CLASS,
        MatchStrategy,
    },
    Error, InternalResult,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenizerConfig {
    #[serde(default)]
    pub strategy: MatchStrategy,

    /// Tokens emitted for one line before the rest of it is given up on.
    #[serde(default = "default_max_tokens_per_line")]
    pub max_tokens_per_line: usize,

    #[serde(default = "default_overflow_class")]
    pub overflow_class: String,

    /// Compiled size limit of a single state's regex, in bytes.
    #[serde(default = "default_regex_size_limit")]
    pub regex_size_limit: usize,
}

impl Default for TokenizerConfig {
    fn default() -> Self {
        Self {
            strategy: MatchStrategy::default(),
            max_tokens_per_line: default_max_tokens_per_line(),
            overflow_class: default_overflow_class(),
            regex_size_limit: default_regex_size_limit(),
        }
    }
}

impl TokenizerConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> InternalResult<Self> {
        from_file(path)
    }

    pub fn compile_options(&self) -> CompileOptions {
        CompileOptions {
            strategy: self.strategy,
            size_limit: self.regex_size_limit,
        }
    }
}

pub fn from_file<T: for<'de> Deserialize<'de>, P: AsRef<Path>>(path: P) -> InternalResult<T> {
    let file = File::open(path.as_ref()).map_err(|e| {
        Error::config(format!(
            "Failed to open config file {}: {}",
            path.as_ref().display(),
            e
        ))
    })?;
    let reader = BufReader::new(file);
    let config = serde_json::from_reader(reader)
        .map_err(|e| Error::config(format!("Failed to parse config file: {}", e)))?;
    Ok(config)
}

pub fn from_str<T: for<'de> Deserialize<'de>>(s: &str) -> InternalResult<T> {
    let config = serde_json::from_str(s)
        .map_err(|e| Error::config(format!("Failed to parse config: {}", e)))?;
    Ok(config)
}

fn default_max_tokens_per_line() -> usize {
    2000
}

fn default_overflow_class() -> String {
    OVERFLOW_CLASS.to_string()
}

fn default_regex_size_limit() -> usize {
    DEFAULT_REGEX_SIZE_LIMIT
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config: TokenizerConfig = from_str("{}").unwrap();
        assert_eq!(config, TokenizerConfig::default());
        assert_eq!(config.strategy, MatchStrategy::Composite);
        assert_eq!(config.max_tokens_per_line, 2000);
        assert_eq!(config.overflow_class, "overflow");
    }

    #[test]
    fn test_camel_case_fields() {
        let config: TokenizerConfig = from_str(
            r#"{ "strategy": "sequential", "maxTokensPerLine": 10, "regexSizeLimit": 1024 }"#,
        )
        .unwrap();
        assert_eq!(config.strategy, MatchStrategy::Sequential);
        assert_eq!(config.max_tokens_per_line, 10);
        assert_eq!(config.compile_options().size_limit, 1024);
    }

    #[test]
    fn test_invalid_config() {
        let result: InternalResult<TokenizerConfig> = from_str(r#"{ "strategy": "fastest" }"#);
        assert!(matches!(result, Err(Error::Config(_))));

        let result: InternalResult<TokenizerConfig> = from_file("/nonexistent/linelex.json");
        assert!(matches!(result, Err(Error::Config(_))));
    }
}
