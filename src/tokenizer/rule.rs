//! # Rules and State Definitions
//!
//! A [`Rule`] pairs a regular expression with the class of the text it
//! matches and an optional [`Transition`]. A [`StateDefinition`] is the
//! ordered list of rules active in one state: at any offset the first rule in
//! list order that matches wins, even when a later rule would match more text.

use super::{
    state::{StateName, Transition},
    token::TokenClass,
};

/// Identifier of a [`KeywordClassifier`](super::keyword::KeywordClassifier)
/// registered on a ruleset.
pub type ClassifierId = String;

/// How a rule decides the class of the text it matched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenSpec {
    Fixed(TokenClass),
    /// Look the matched text up in the named classifier.
    Classify(ClassifierId),
}

impl TokenSpec {
    pub(crate) fn prefixed(&self, prefix: &str) -> Self {
        match self {
            TokenSpec::Fixed(class) => TokenSpec::Fixed(class.clone()),
            TokenSpec::Classify(id) => TokenSpec::Classify(format!("{}{}", prefix, id)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    pub token: TokenSpec,
    pub pattern: String,
    pub next: Option<Transition>,
    pub case_insensitive: bool,
    /// Append the matched text to the preceding token when it has the same class.
    pub merge: bool,
    /// Apply the transition without consuming the match; the text is
    /// tokenized again in the new state.
    pub no_consume: bool,
}

impl Rule {
    pub fn new(class: impl Into<TokenClass>, pattern: impl Into<String>) -> Self {
        Self::with_spec(TokenSpec::Fixed(class.into()), pattern)
    }

    /// A rule whose class comes from the classifier registered as `id`.
    pub fn classify(id: impl Into<ClassifierId>, pattern: impl Into<String>) -> Self {
        Self::with_spec(TokenSpec::Classify(id.into()), pattern)
    }

    pub fn with_spec(token: TokenSpec, pattern: impl Into<String>) -> Self {
        Self {
            token,
            pattern: pattern.into(),
            next: None,
            case_insensitive: false,
            merge: false,
            no_consume: false,
        }
    }

    /// Replace the current state with `state` after matching.
    pub fn next(mut self, state: impl Into<StateName>) -> Self {
        self.next = Some(Transition::Goto(state.into()));
        self
    }

    /// Enter `state`, remembering the current state for a later [`Rule::pop`].
    pub fn push(mut self, state: impl Into<StateName>) -> Self {
        self.next = Some(Transition::Push(state.into()));
        self
    }

    /// Return to the state remembered by the last push.
    pub fn pop(mut self) -> Self {
        self.next = Some(Transition::Pop);
        self
    }

    pub fn transition(mut self, transition: Option<Transition>) -> Self {
        self.next = transition;
        self
    }

    pub fn case_insensitive(mut self) -> Self {
        self.case_insensitive = true;
        self
    }

    pub fn merge(mut self) -> Self {
        self.merge = true;
        self
    }

    pub fn no_consume(mut self) -> Self {
        self.no_consume = true;
        self
    }

    /// Copy of this rule with state and classifier references moved under `prefix`.
    pub(crate) fn prefixed(&self, prefix: &str) -> Self {
        Self {
            token: self.token.prefixed(prefix),
            next: self.next.as_ref().map(|next| next.prefixed(prefix)),
            ..self.clone()
        }
    }
}

/// Ordered rules of one state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateDefinition {
    pub rules: Vec<Rule>,
    /// Class of text no rule matches. Falls back to `error` when unset.
    pub default_token: Option<TokenClass>,
    /// Whether the state may be carried over to the next line.
    pub spans_lines: bool,
    /// Position at which a derived ruleset inlines the base state's rules.
    pub(crate) splice_at: Option<usize>,
}

impl Default for StateDefinition {
    fn default() -> Self {
        Self {
            rules: Vec::new(),
            default_token: None,
            spans_lines: true,
            splice_at: None,
        }
    }
}

impl StateDefinition {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rule(mut self, rule: Rule) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn rules(mut self, rules: impl IntoIterator<Item = Rule>) -> Self {
        self.rules.extend(rules);
        self
    }

    pub fn default_token(mut self, class: impl Into<TokenClass>) -> Self {
        self.default_token = Some(class.into());
        self
    }

    /// Mark the state as ending with its line.
    pub fn single_line(mut self) -> Self {
        self.spans_lines = false;
        self
    }

    /// Inline the base ruleset's rules for this state at the current position.
    pub fn splice_base(mut self) -> Self {
        self.splice_at = Some(self.rules.len());
        self
    }

    pub fn has_splice_marker(&self) -> bool {
        self.splice_at.is_some()
    }

    /// Resolves the splice marker against the base definition of the same state.
    pub(crate) fn spliced_with(mut self, base: Option<&StateDefinition>) -> Self {
        let Some(at) = self.splice_at.take() else {
            return self;
        };
        if let Some(base) = base {
            let tail = self.rules.split_off(at.min(self.rules.len()));
            self.rules.extend(base.rules.iter().cloned());
            self.rules.extend(tail);
            if self.default_token.is_none() {
                self.default_token = base.default_token.clone();
            }
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rule_builder() {
        let rule = Rule::new("comment.block", r"/\*").push("comment").merge();
        assert_eq!(rule.token, TokenSpec::Fixed("comment.block".into()));
        assert_eq!(rule.next, Some(Transition::Push("comment".into())));
        assert!(rule.merge);
        assert!(!rule.case_insensitive);
    }

    #[test]
    fn test_prefixed_rule() {
        let rule = Rule::classify("keywords", r"\w+").next("start");
        let prefixed = rule.prefixed("js-");
        assert_eq!(prefixed.token, TokenSpec::Classify("js-keywords".to_string()));
        assert_eq!(prefixed.next, Some(Transition::Goto("js-start".into())));
        assert_eq!(prefixed.pattern, rule.pattern);

        let popping = Rule::new("string", "\"").pop().prefixed("js-");
        assert_eq!(popping.next, Some(Transition::Pop));
    }

    #[test]
    fn test_splice_inlines_base_rules() {
        let base = StateDefinition::new()
            .rule(Rule::new("number", r"\d+"))
            .default_token("text");
        let derived = StateDefinition::new()
            .rule(Rule::new("keyword", "if"))
            .splice_base()
            .rule(Rule::new("operator", r"\+"));

        let spliced = derived.spliced_with(Some(&base));
        let classes: Vec<_> = spliced
            .rules
            .iter()
            .map(|rule| match &rule.token {
                TokenSpec::Fixed(class) => class.to_string(),
                TokenSpec::Classify(id) => id.clone(),
            })
            .collect();
        assert_eq!(classes, ["keyword", "number", "operator"]);
        assert_eq!(spliced.default_token, Some("text".into()));
        assert!(!spliced.has_splice_marker());
    }

    #[test]
    fn test_splice_without_base_drops_marker() {
        let derived = StateDefinition::new().rule(Rule::new("a", "a")).splice_base();
        let spliced = derived.spliced_with(None);
        assert_eq!(spliced.rules.len(), 1);
        assert!(!spliced.has_splice_marker());
    }
}
