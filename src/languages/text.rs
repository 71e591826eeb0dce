use crate::tokenizer::{
    token::TEXT_CLASS, Ruleset, RulesetResult, StateDefinition, START_STATE,
};

/// Plain text: every line is a single `text` token.
pub fn ruleset() -> RulesetResult<Ruleset> {
    Ruleset::builder("text")
        .state(START_STATE, StateDefinition::new().default_token(TEXT_CLASS))
        .build()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::tokenizer::Tokenizer;

    #[test]
    fn test_single_token_per_line() {
        let tokenizer = Tokenizer::new(Arc::new(ruleset().unwrap()));
        let line = tokenizer.tokenize_line("if (x) { return; }", &tokenizer.initial_state());
        assert_eq!(line.pairs(), vec![("text", "if (x) { return; }")]);
        assert_eq!(line.state, tokenizer.initial_state());
    }
}
