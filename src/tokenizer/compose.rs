//! # Ruleset Composition
//!
//! Languages share rules by deriving one ruleset from another rather than by
//! copying tables around. A derived ruleset starts from its base and then:
//!
//! * **overrides** states by name. An override replaces the base state's
//!   rules entirely, unless it carries a splice marker
//!   ([`StateDefinition::splice_base`]), in which case the base rules are
//!   inlined at the marker.
//! * **imports** other rulesets. Every imported state is added under a
//!   prefix (`"css-start"`, `"css-comment"`, ...) with its transitions
//!   rewritten to match. With a target state, the imported start rules are
//!   also appended to that state of the importing ruleset, which is how an
//!   embedded language becomes reachable.
//!
//! The result is validated like any other ruleset, so a reference that does
//! not resolve after composition fails with [`RulesetError::DanglingState`].

use std::{collections::HashMap, sync::Arc};

use super::{
    error::{RulesetError, RulesetResult},
    keyword::KeywordClassifier,
    rule::{ClassifierId, Rule, StateDefinition},
    ruleset::Ruleset,
    state::StateName,
};

/// Another ruleset merged into a derived one.
#[derive(Debug, Clone)]
pub struct Import {
    pub ruleset: Arc<Ruleset>,
    /// Prepended to every imported state and classifier name.
    pub prefix: String,
    /// State of the importing ruleset that receives the imported start rules.
    pub target: Option<StateName>,
    /// Rules prepended to every imported state, typically to leave the
    /// embedded language again.
    pub escape_rules: Vec<Rule>,
}

impl Import {
    /// Imports `ruleset` under the prefix `"{name}-"`.
    pub fn new(ruleset: Arc<Ruleset>) -> Self {
        let prefix = format!("{}-", ruleset.name());
        Self {
            ruleset,
            prefix,
            target: None,
            escape_rules: Vec::new(),
        }
    }

    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    pub fn into_state(mut self, target: impl Into<StateName>) -> Self {
        self.target = Some(target.into());
        self
    }

    pub fn escape_rule(mut self, rule: Rule) -> Self {
        self.escape_rules.push(rule);
        self
    }

    /// Name the imported start state receives in the importing ruleset.
    pub fn start_state(&self) -> StateName {
        self.ruleset.start_state().prefixed(&self.prefix)
    }
}

/// Derives a ruleset from `base`, applying `overrides` and then `imports`.
pub fn extend<I>(base: &Ruleset, overrides: I, imports: Vec<Import>) -> RulesetResult<Ruleset>
where
    I: IntoIterator<Item = (StateName, StateDefinition)>,
{
    let mut derivation = base.derive(base.name());
    for (name, definition) in overrides {
        derivation = derivation.state(name, definition);
    }
    for import in imports {
        derivation = derivation.import(import);
    }
    derivation.build()
}

/// Fluent form of [`extend`], started with [`Ruleset::derive`].
#[derive(Debug, Clone)]
pub struct Derivation<'a> {
    base: &'a Ruleset,
    name: String,
    start: Option<StateName>,
    overrides: Vec<(StateName, StateDefinition)>,
    classifiers: Vec<(ClassifierId, KeywordClassifier)>,
    imports: Vec<Import>,
}

impl Ruleset {
    pub fn derive(&self, name: impl Into<String>) -> Derivation<'_> {
        Derivation {
            base: self,
            name: name.into(),
            start: None,
            overrides: Vec::new(),
            classifiers: Vec::new(),
            imports: Vec::new(),
        }
    }
}

impl<'a> Derivation<'a> {
    pub fn start(mut self, state: impl Into<StateName>) -> Self {
        self.start = Some(state.into());
        self
    }

    pub fn state(mut self, name: impl Into<StateName>, definition: StateDefinition) -> Self {
        self.overrides.push((name.into(), definition));
        self
    }

    pub fn classifier(mut self, id: impl Into<ClassifierId>, classifier: KeywordClassifier) -> Self {
        self.classifiers.push((id.into(), classifier));
        self
    }

    pub fn import(mut self, import: Import) -> Self {
        self.imports.push(import);
        self
    }

    #[tracing::instrument(level = "debug", skip(self), fields(base = self.base.name(), name = %self.name))]
    pub fn build(self) -> RulesetResult<Ruleset> {
        let (base_start, base_states, base_classifiers) = self.base.parts();
        let mut states = base_states.clone();
        let mut classifiers = base_classifiers.clone();

        for (id, classifier) in self.classifiers {
            classifiers.insert(id, Arc::new(classifier));
        }

        for (name, definition) in self.overrides {
            let resolved = definition.spliced_with(base_states.get(&name));
            states.insert(name, resolved);
        }

        for import in self.imports {
            import_into(&mut states, &mut classifiers, import)?;
        }

        let start = self.start.unwrap_or_else(|| base_start.clone());
        Ruleset::from_parts(self.name, start, states, classifiers)
    }
}

fn import_into(
    states: &mut HashMap<StateName, StateDefinition>,
    classifiers: &mut HashMap<ClassifierId, Arc<KeywordClassifier>>,
    import: Import,
) -> RulesetResult<()> {
    let (imported_start, imported_states, imported_classifiers) = import.ruleset.parts();
    let prefix = import.prefix.as_str();

    for (id, classifier) in imported_classifiers {
        classifiers.insert(format!("{}{}", prefix, id), classifier.clone());
    }

    for (name, definition) in imported_states {
        let mut rules = import.escape_rules.clone();
        rules.extend(definition.rules.iter().map(|rule| rule.prefixed(prefix)));
        let renamed = name.prefixed(prefix);
        if states.contains_key(&renamed) {
            tracing::warn!("imported state '{}' replaces an existing state", renamed);
        }
        states.insert(
            renamed,
            StateDefinition {
                rules,
                ..definition.clone()
            },
        );
    }

    if let Some(target) = import.target {
        let spliced: Vec<Rule> = imported_states
            .get(imported_start)
            .map(|start| start.rules.iter().map(|rule| rule.prefixed(prefix)).collect())
            .unwrap_or_default();
        let Some(state) = states.get_mut(&target) else {
            return Err(RulesetError::DanglingState {
                from: import.ruleset.start_state().prefixed(prefix),
                target,
            });
        };
        state.rules.extend(spliced);
    }

    tracing::debug!(
        "imported ruleset '{}' with prefix '{}'",
        import.ruleset.name(),
        prefix
    );
    Ok(())
}
