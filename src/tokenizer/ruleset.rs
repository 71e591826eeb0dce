//! # Rulesets
//!
//! A [`Ruleset`] is the complete set of lexing states for one language: named
//! [`StateDefinition`]s, the state to start in, and the keyword classifiers its
//! rules refer to. Rulesets are validated when built and immutable afterwards;
//! share them between tokenizers and threads through an [`Arc`].
//!
//! Every ruleset owns a cache of compiled states. A state is compiled the
//! first time a line is tokenized in it, and the result is kept for the
//! lifetime of the ruleset.

use std::{collections::HashMap, fmt, sync::Arc};

use uuid::Uuid;

use super::{
    compiler::{
        compile, validate_state, CompileCache, CompileOptions, CompiledState,
        DEFAULT_REGEX_SIZE_LIMIT,
    },
    error::{RulesetError, RulesetResult},
    keyword::KeywordClassifier,
    rule::{ClassifierId, StateDefinition},
    state::{ResumeState, StateName, START_STATE},
    token::TokenClass,
};

/// Identity of a built ruleset. Rebuilding a ruleset assigns a new one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RulesetId(Uuid);

impl RulesetId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for RulesetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug)]
pub struct Ruleset {
    id: RulesetId,
    name: String,
    start: StateName,
    states: HashMap<StateName, StateDefinition>,
    classifiers: HashMap<ClassifierId, Arc<KeywordClassifier>>,
    cache: CompileCache,
}

impl Ruleset {
    pub fn builder(name: impl Into<String>) -> RulesetBuilder {
        RulesetBuilder::new(name)
    }

    /// Validates the parts and assembles a ruleset.
    ///
    /// Splice markers have no base to splice at this point and are dropped.
    #[tracing::instrument(level = "debug", skip(states, classifiers))]
    pub(crate) fn from_parts(
        name: String,
        start: StateName,
        states: HashMap<StateName, StateDefinition>,
        classifiers: HashMap<ClassifierId, Arc<KeywordClassifier>>,
    ) -> RulesetResult<Self> {
        let states: HashMap<_, _> = states
            .into_iter()
            .map(|(state_name, definition)| {
                if definition.has_splice_marker() {
                    tracing::debug!(
                        "dropping splice marker of state '{}': no base state",
                        state_name
                    );
                }
                (state_name, definition.spliced_with(None))
            })
            .collect();

        if !states.contains_key(&start) {
            return Err(RulesetError::MissingStartState(start));
        }

        let mut names: Vec<&StateName> = states.keys().collect();
        names.sort();
        for state_name in names {
            let definition = &states[state_name];
            validate_state(state_name, definition, &classifiers, DEFAULT_REGEX_SIZE_LIMIT)?;
            for rule in &definition.rules {
                if let Some(target) = rule.next.as_ref().and_then(|next| next.target()) {
                    if !states.contains_key(target) {
                        return Err(RulesetError::DanglingState {
                            from: state_name.clone(),
                            target: target.clone(),
                        });
                    }
                }
            }
        }

        let ruleset = Self {
            id: RulesetId::new(),
            name,
            start,
            states,
            classifiers,
            cache: CompileCache::default(),
        };
        tracing::debug!(
            "ruleset '{}' ({}) built with {} states",
            ruleset.name,
            ruleset.id,
            ruleset.states.len()
        );
        Ok(ruleset)
    }

    pub fn id(&self) -> RulesetId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn start_state(&self) -> &StateName {
        &self.start
    }

    /// Resume state for the first line of a buffer.
    pub fn initial_state(&self) -> ResumeState {
        ResumeState::new(self.start.clone())
    }

    pub fn state(&self, name: &str) -> Option<&StateDefinition> {
        self.states.get(name)
    }

    pub fn contains_state(&self, name: &str) -> bool {
        self.states.contains_key(name)
    }

    /// State names in sorted order.
    pub fn state_names(&self) -> Vec<&StateName> {
        let mut names: Vec<_> = self.states.keys().collect();
        names.sort();
        names
    }

    pub fn states(&self) -> impl Iterator<Item = (&StateName, &StateDefinition)> {
        self.states.iter()
    }

    pub fn classifier(&self, id: &str) -> Option<&Arc<KeywordClassifier>> {
        self.classifiers.get(id)
    }

    /// Compiled form of `state`, compiling and caching it on first use.
    ///
    /// Returns `None` for unknown states. A state that fails to compile is
    /// logged and replaced by one that classifies everything with its
    /// default token, so tokenization can always proceed.
    pub fn compiled(&self, state: &StateName, options: &CompileOptions) -> Option<Arc<CompiledState>> {
        let definition = self.states.get(state)?;
        Some(
            self.cache
                .get_or_compile((state.clone(), options.strategy), || {
                    compile(state, definition, &self.classifiers, options).unwrap_or_else(|e| {
                        tracing::error!(
                            "failed to compile state '{}' of ruleset '{}': {}",
                            state,
                            self.name,
                            e
                        );
                        CompiledState::empty(
                            state.clone(),
                            definition
                                .default_token
                                .clone()
                                .unwrap_or_else(TokenClass::error),
                            definition.spans_lines,
                        )
                    })
                }),
        )
    }

    /// Number of compiled states currently cached.
    pub fn compiled_count(&self) -> usize {
        self.cache.len()
    }

    /// Drops every cached compiled state.
    pub fn clear_compiled(&self) {
        self.cache.clear();
    }

    /// Copy of this ruleset with a new identity and an empty compile cache.
    pub fn rebuild(&self) -> Self {
        Self {
            id: RulesetId::new(),
            name: self.name.clone(),
            start: self.start.clone(),
            states: self.states.clone(),
            classifiers: self.classifiers.clone(),
            cache: CompileCache::default(),
        }
    }

    pub(crate) fn parts(
        &self,
    ) -> (
        &StateName,
        &HashMap<StateName, StateDefinition>,
        &HashMap<ClassifierId, Arc<KeywordClassifier>>,
    ) {
        (&self.start, &self.states, &self.classifiers)
    }
}

#[derive(Debug, Clone)]
pub struct RulesetBuilder {
    name: String,
    start: StateName,
    states: HashMap<StateName, StateDefinition>,
    classifiers: HashMap<ClassifierId, Arc<KeywordClassifier>>,
}

impl RulesetBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            start: StateName::from(START_STATE),
            states: HashMap::new(),
            classifiers: HashMap::new(),
        }
    }

    pub fn start(mut self, state: impl Into<StateName>) -> Self {
        self.start = state.into();
        self
    }

    /// Adds a state, replacing any previous state of the same name.
    pub fn state(mut self, name: impl Into<StateName>, definition: StateDefinition) -> Self {
        self.states.insert(name.into(), definition);
        self
    }

    pub fn classifier(mut self, id: impl Into<ClassifierId>, classifier: KeywordClassifier) -> Self {
        self.classifiers.insert(id.into(), Arc::new(classifier));
        self
    }

    pub fn build(self) -> RulesetResult<Ruleset> {
        Ruleset::from_parts(self.name, self.start, self.states, self.classifiers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokenizer::rule::Rule;

    fn sample() -> RulesetBuilder {
        Ruleset::builder("sample")
            .classifier(
                "words",
                KeywordClassifier::build([("keyword", "if")], "identifier").unwrap(),
            )
            .state(
                "start",
                StateDefinition::new()
                    .rule(Rule::classify("words", r"\w+"))
                    .rule(Rule::new("comment", r"/\*").push("comment")),
            )
            .state(
                "comment",
                StateDefinition::new()
                    .rule(Rule::new("comment", r"\*/").pop())
                    .default_token("comment"),
            )
    }

    #[test]
    fn test_build_valid_ruleset() {
        let ruleset = sample().build().unwrap();
        assert_eq!(ruleset.name(), "sample");
        assert_eq!(ruleset.start_state(), &StateName::from("start"));
        assert_eq!(ruleset.state_names(), [&StateName::from("comment"), &StateName::from("start")]);
        assert_eq!(ruleset.initial_state(), ResumeState::new("start"));
        assert!(ruleset.classifier("words").is_some());
    }

    #[test]
    fn test_dangling_state() {
        let result = sample()
            .state("start", StateDefinition::new().rule(Rule::new("x", "x").next("nowhere")))
            .build();
        assert_eq!(
            result.unwrap_err(),
            RulesetError::DanglingState {
                from: "start".into(),
                target: "nowhere".into(),
            }
        );
    }

    #[test]
    fn test_missing_start_state() {
        let result = sample().start("main").build();
        assert_eq!(result.unwrap_err(), RulesetError::MissingStartState("main".into()));
    }

    #[test]
    fn test_compiled_states_are_cached() {
        let ruleset = sample().build().unwrap();
        let options = CompileOptions::default();
        assert_eq!(ruleset.compiled_count(), 0);

        let first = ruleset.compiled(&"start".into(), &options).unwrap();
        let again = ruleset.compiled(&"start".into(), &options).unwrap();
        assert!(Arc::ptr_eq(&first, &again));
        assert_eq!(ruleset.compiled_count(), 1);
        assert!(ruleset.compiled(&"unknown".into(), &options).is_none());

        ruleset.clear_compiled();
        assert_eq!(ruleset.compiled_count(), 0);
    }

    #[test]
    fn test_rebuild_assigns_new_identity() {
        let ruleset = sample().build().unwrap();
        ruleset.compiled(&"start".into(), &CompileOptions::default());
        let rebuilt = ruleset.rebuild();
        assert_ne!(ruleset.id(), rebuilt.id());
        assert_eq!(rebuilt.compiled_count(), 0);
        assert_eq!(rebuilt.state("comment"), ruleset.state("comment"));
    }
}
