//! # Rule Compiler
//!
//! Trying every rule of a state one after another at each offset is simple
//! but slow. The compiler merges a state's rules into one composite regular
//! expression instead:
//!
//! ```text
//! rules:      //.*$        /\*          [a-z]+(\d)?
//! composite:  (//.*$)|(/\*)|([a-z]+(\d)?)
//! groups:     1            2            3     4
//! ```
//!
//! Each rule is wrapped in its own capturing group. Group numbers are
//! assigned from the capture count of every rule's standalone pattern, so
//! capturing groups inside a rule never shift the numbering of the rules that
//! follow it. Named groups are turned into plain groups first because the
//! same name may appear in several rules. Rule order is preserved, and with
//! leftmost-first alternation the earlier rule wins at any given offset.
//!
//! Compiled states are immutable and shared through [`Arc`]; the owning
//! [`Ruleset`](super::ruleset::Ruleset) caches them per state and strategy.

use std::{collections::HashMap, sync::Arc};

use dashmap::DashMap;
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

use super::{
    error::{RulesetError, RulesetResult},
    keyword::KeywordClassifier,
    rule::{ClassifierId, Rule, StateDefinition, TokenSpec},
    state::{StateName, Transition},
    token::TokenClass,
};

/// Default compiled-program size limit for a single regex, in bytes.
pub const DEFAULT_REGEX_SIZE_LIMIT: usize = 10 * (1 << 20);

/// How a compiled state searches for the next rule match.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Serialize,
    Deserialize,
    strum::EnumString,
    strum::Display,
    strum::EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum MatchStrategy {
    /// One regex per state with a capturing group per rule.
    #[default]
    Composite,
    /// One regex per rule, tried in order.
    Sequential,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompileOptions {
    pub strategy: MatchStrategy,
    pub size_limit: usize,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            strategy: MatchStrategy::default(),
            size_limit: DEFAULT_REGEX_SIZE_LIMIT,
        }
    }
}

/// Resolved token class source of a compiled rule.
#[derive(Debug, Clone)]
pub enum Producer {
    Fixed(TokenClass),
    Classify(Arc<KeywordClassifier>),
}

impl Producer {
    pub fn produce(&self, text: &str) -> TokenClass {
        match self {
            Producer::Fixed(class) => class.clone(),
            Producer::Classify(classifier) => classifier.classify(text),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CompiledRule {
    pub producer: Producer,
    pub transition: Option<Transition>,
    pub merge: bool,
    pub no_consume: bool,
    /// Capture group of this rule within the composite pattern.
    pub group: usize,
}

#[derive(Debug)]
enum Matcher {
    Empty,
    Composite(Regex),
    Sequential(Vec<Regex>),
}

/// A successful search: which rule matched, and where.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuleMatch {
    pub rule: usize,
    pub start: usize,
    pub end: usize,
}

impl RuleMatch {
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

#[derive(Debug)]
pub struct CompiledState {
    name: StateName,
    matcher: Matcher,
    rules: Vec<CompiledRule>,
    default_token: TokenClass,
    spans_lines: bool,
}

impl CompiledState {
    /// A state that matches nothing; all text becomes its default token.
    pub(crate) fn empty(name: StateName, default_token: TokenClass, spans_lines: bool) -> Self {
        Self {
            name,
            matcher: Matcher::Empty,
            rules: Vec::new(),
            default_token,
            spans_lines,
        }
    }

    /// Finds the leftmost rule match starting at or after `offset`.
    ///
    /// When several rules match at the leftmost position the earliest rule
    /// wins. A result starting after `offset` means no rule matches anywhere
    /// in between.
    pub fn find_at(&self, line: &str, offset: usize) -> Option<RuleMatch> {
        match &self.matcher {
            Matcher::Empty => None,
            Matcher::Composite(regex) => {
                let mut locations = regex.capture_locations();
                regex.captures_read_at(&mut locations, line, offset)?;
                self.rules.iter().enumerate().find_map(|(index, rule)| {
                    locations.get(rule.group).map(|(start, end)| RuleMatch {
                        rule: index,
                        start,
                        end,
                    })
                })
            }
            Matcher::Sequential(regexes) => {
                let mut best: Option<RuleMatch> = None;
                for (index, regex) in regexes.iter().enumerate() {
                    let Some(found) = regex.find_at(line, offset) else {
                        continue;
                    };
                    if best.map_or(true, |b| found.start() < b.start) {
                        best = Some(RuleMatch {
                            rule: index,
                            start: found.start(),
                            end: found.end(),
                        });
                    }
                    if found.start() == offset {
                        break;
                    }
                }
                best
            }
        }
    }

    pub fn name(&self) -> &StateName {
        &self.name
    }

    pub fn rule(&self, index: usize) -> &CompiledRule {
        &self.rules[index]
    }

    pub fn rules(&self) -> &[CompiledRule] {
        &self.rules
    }

    pub fn default_token(&self) -> &TokenClass {
        &self.default_token
    }

    pub fn spans_lines(&self) -> bool {
        self.spans_lines
    }

    /// Strategy actually in use, which may differ from the requested one
    /// after a fallback.
    pub fn strategy(&self) -> Option<MatchStrategy> {
        match self.matcher {
            Matcher::Empty => None,
            Matcher::Composite(_) => Some(MatchStrategy::Composite),
            Matcher::Sequential(_) => Some(MatchStrategy::Sequential),
        }
    }
}

/// Compiles one state.
///
/// Rules are expected to have passed [`validate_state`]; errors here are
/// limited to regex size limits and missing classifiers.
#[tracing::instrument(level = "debug", skip(state, classifiers, options), fields(rules = state.rules.len()))]
pub fn compile(
    name: &StateName,
    state: &StateDefinition,
    classifiers: &HashMap<ClassifierId, Arc<KeywordClassifier>>,
    options: &CompileOptions,
) -> RulesetResult<CompiledState> {
    let default_token = state
        .default_token
        .clone()
        .unwrap_or_else(TokenClass::error);

    if state.rules.is_empty() {
        return Ok(CompiledState::empty(
            name.clone(),
            default_token,
            state.spans_lines,
        ));
    }

    let mut rules = Vec::with_capacity(state.rules.len());
    let mut regexes = Vec::with_capacity(state.rules.len());
    let mut alternatives = Vec::with_capacity(state.rules.len());
    let mut group = 1;

    for (index, rule) in state.rules.iter().enumerate() {
        let source = rule_source(rule);
        let regex = build_regex(&source, options.size_limit)
            .map_err(|e| invalid_pattern(name, index, rule, e))?;

        rules.push(CompiledRule {
            producer: resolve_producer(name, &rule.token, classifiers)?,
            transition: rule.next.clone(),
            merge: rule.merge,
            no_consume: rule.no_consume,
            group,
        });
        // The wrapping group takes the place of the standalone group 0.
        group += regex.captures_len();
        alternatives.push(format!("({})", source));
        regexes.push(regex);
    }

    let matcher = match options.strategy {
        MatchStrategy::Sequential => Matcher::Sequential(regexes),
        MatchStrategy::Composite => {
            let composite = alternatives.join("|");
            match build_regex(&composite, options.size_limit) {
                Ok(regex) => Matcher::Composite(regex),
                Err(e) => {
                    tracing::warn!(
                        "composite pattern for state '{}' failed to compile ({}), matching rules one by one",
                        name,
                        e
                    );
                    Matcher::Sequential(regexes)
                }
            }
        }
    };

    tracing::debug!("compiled state '{}' with {} rules", name, rules.len());

    Ok(CompiledState {
        name: name.clone(),
        matcher,
        rules,
        default_token,
        spans_lines: state.spans_lines,
    })
}

/// Checks every rule of a state: patterns compile, classifiers exist, and no
/// two rules share a pattern that can match the empty string.
pub fn validate_state(
    name: &StateName,
    state: &StateDefinition,
    classifiers: &HashMap<ClassifierId, Arc<KeywordClassifier>>,
    size_limit: usize,
) -> RulesetResult<()> {
    let mut zero_width: Vec<(usize, &Rule)> = Vec::new();

    for (index, rule) in state.rules.iter().enumerate() {
        resolve_producer(name, &rule.token, classifiers)?;
        let source = rule_source(rule);
        build_regex(&source, size_limit).map_err(|e| invalid_pattern(name, index, rule, e))?;

        if !can_match_empty(&source) {
            continue;
        }
        if let Some((first, _)) = zero_width.iter().find(|(_, other)| {
            other.pattern.trim() == rule.pattern.trim()
                && other.case_insensitive == rule.case_insensitive
        }) {
            return Err(RulesetError::RuleConflict {
                state: name.clone(),
                first: *first,
                second: index,
                pattern: rule.pattern.clone(),
            });
        }
        if rule.next.is_none() {
            tracing::warn!(
                "rule {} of state '{}' can match the empty string without changing state",
                index,
                name
            );
        }
        zero_width.push((index, rule));
    }

    Ok(())
}

fn resolve_producer(
    state: &StateName,
    spec: &TokenSpec,
    classifiers: &HashMap<ClassifierId, Arc<KeywordClassifier>>,
) -> RulesetResult<Producer> {
    match spec {
        TokenSpec::Fixed(class) => Ok(Producer::Fixed(class.clone())),
        TokenSpec::Classify(id) => classifiers
            .get(id)
            .cloned()
            .map(Producer::Classify)
            .ok_or_else(|| RulesetError::UnknownClassifier {
                state: state.clone(),
                id: id.clone(),
            }),
    }
}

fn rule_source(rule: &Rule) -> String {
    let pattern = strip_group_names(&rule.pattern);
    if rule.case_insensitive {
        format!("(?i:{})", pattern)
    } else {
        pattern
    }
}

/// Whether the pattern has a zero-width match anywhere, including
/// assertions such as `\b` that never match an empty input.
fn can_match_empty(source: &str) -> bool {
    matches!(
        regex_syntax::Parser::new().parse(source),
        Ok(hir) if hir.properties().minimum_len() == Some(0)
    )
}

fn build_regex(source: &str, size_limit: usize) -> Result<Regex, regex::Error> {
    RegexBuilder::new(source).size_limit(size_limit).build()
}

fn invalid_pattern(state: &StateName, index: usize, rule: &Rule, e: regex::Error) -> RulesetError {
    RulesetError::InvalidPattern {
        state: state.clone(),
        index,
        pattern: rule.pattern.clone(),
        message: e.to_string(),
    }
}

/// Rewrites `(?P<name>..)` and `(?<name>..)` to plain capturing groups.
///
/// Escaped parentheses and parentheses inside character classes are left
/// alone.
pub(crate) fn strip_group_names(pattern: &str) -> String {
    let mut out = String::with_capacity(pattern.len());
    let mut chars = pattern.char_indices().peekable();
    let mut class_depth = 0usize;

    while let Some((index, c)) = chars.next() {
        match c {
            '\\' => {
                out.push(c);
                if let Some((_, escaped)) = chars.next() {
                    out.push(escaped);
                }
            }
            '[' => {
                class_depth += 1;
                out.push(c);
                if class_depth == 1 {
                    // A `]` right after `[` or `[^` is a literal.
                    if let Some(&(_, '^')) = chars.peek() {
                        out.push('^');
                        chars.next();
                    }
                    if let Some(&(_, ']')) = chars.peek() {
                        out.push(']');
                        chars.next();
                    }
                }
            }
            ']' if class_depth > 0 => {
                class_depth -= 1;
                out.push(c);
            }
            '(' if class_depth == 0 => {
                let rest = &pattern[index + 1..];
                // `(?<=` and `(?<!` are lookbehinds, not names.
                let named = rest.starts_with("?P<")
                    || rest
                        .strip_prefix("?<")
                        .and_then(|name| name.chars().next())
                        .is_some_and(|c| c.is_alphabetic() || c == '_');
                out.push('(');
                if named {
                    if let Some(close) = rest.find('>') {
                        // Skip `?P<name>` / `?<name>`.
                        let skipped = rest[..=close].chars().count();
                        for _ in 0..skipped {
                            chars.next();
                        }
                    }
                }
            }
            _ => out.push(c),
        }
    }

    out
}

/// Lazily filled cache of compiled states, keyed by state name and strategy.
#[derive(Debug, Default)]
pub(crate) struct CompileCache {
    entries: DashMap<(StateName, MatchStrategy), Arc<CompiledState>>,
}

impl CompileCache {
    pub fn get_or_compile(
        &self,
        key: (StateName, MatchStrategy),
        compile: impl FnOnce() -> CompiledState,
    ) -> Arc<CompiledState> {
        if let Some(entry) = self.entries.get(&key) {
            return entry.value().clone();
        }
        // Compile outside the shard lock; a concurrent winner is kept.
        let compiled = Arc::new(compile());
        self.entries.entry(key).or_insert(compiled).value().clone()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn clear(&self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compile_rules(rules: Vec<Rule>, strategy: MatchStrategy) -> CompiledState {
        let state = StateDefinition::new().rules(rules);
        let options = CompileOptions {
            strategy,
            ..CompileOptions::default()
        };
        compile(&"start".into(), &state, &HashMap::new(), &options).unwrap()
    }

    #[test]
    fn test_strip_group_names() {
        assert_eq!(strip_group_names(r"(?P<word>\w+)"), r"(\w+)");
        assert_eq!(strip_group_names(r"(?<n>a)(?:b)(c)"), r"(a)(?:b)(c)");
        assert_eq!(strip_group_names(r"\(?P<x>"), r"\(?P<x>");
        assert_eq!(strip_group_names(r"[(?P<x>]"), r"[(?P<x>]");
        assert_eq!(strip_group_names(r"[]](?P<y>z)"), r"[]](z)");
        assert_eq!(strip_group_names(r"[[:alpha:]](?<a>1)"), r"[[:alpha:]](1)");
        assert_eq!(strip_group_names(r"(?<_b>1)"), r"(1)");
    }

    #[test]
    fn test_lookbehind_is_not_a_group_name() {
        assert_eq!(strip_group_names(r"(?<=x>y)"), r"(?<=x>y)");
        assert_eq!(strip_group_names(r"(?<!x>y)"), r"(?<!x>y)");

        let state = StateDefinition::new().rule(Rule::new("a", r"(?<=x>y)"));
        assert!(matches!(
            validate_state(&"start".into(), &state, &HashMap::new(), DEFAULT_REGEX_SIZE_LIMIT),
            Err(RulesetError::InvalidPattern { index: 0, .. })
        ));
    }

    #[test]
    fn test_group_offsets_with_inner_groups() {
        for strategy in [MatchStrategy::Composite, MatchStrategy::Sequential] {
            let compiled = compile_rules(
                vec![
                    Rule::new("tree", r"(/[\w]+)"),
                    Rule::new("pair", r"(\w)(\w)=(?P<v>\d)"),
                    Rule::new("word", r"\w+"),
                ],
                strategy,
            );
            let found = compiled.find_at("ab=1", 0).unwrap();
            assert_eq!(found, RuleMatch { rule: 1, start: 0, end: 4 });
            let found = compiled.find_at("abc", 0).unwrap();
            assert_eq!(found, RuleMatch { rule: 2, start: 0, end: 3 });
            let found = compiled.find_at("  /root", 0).unwrap();
            assert_eq!(found, RuleMatch { rule: 0, start: 2, end: 7 });
        }
    }

    #[test]
    fn test_earlier_rule_wins_over_longer_match() {
        for strategy in [MatchStrategy::Composite, MatchStrategy::Sequential] {
            let compiled = compile_rules(
                vec![Rule::new("short", "a"), Rule::new("long", "ab+")],
                strategy,
            );
            let found = compiled.find_at("abbb", 0).unwrap();
            assert_eq!(found, RuleMatch { rule: 0, start: 0, end: 1 });
        }
    }

    #[test]
    fn test_case_insensitive_rule() {
        let compiled = compile_rules(
            vec![Rule::new("keyword", "select").case_insensitive()],
            MatchStrategy::Composite,
        );
        assert_eq!(compiled.find_at("SeLeCt", 0).map(|m| m.end), Some(6));
    }

    #[test]
    fn test_offset_keeps_word_boundary_context() {
        let compiled = compile_rules(vec![Rule::new("word", r"\bfoo")], MatchStrategy::Composite);
        // `foo` inside `xfoo` is not at a word boundary even when searching from 1.
        assert_eq!(compiled.find_at("xfoo foo", 1).map(|m| m.start), Some(5));
    }

    #[test]
    fn test_empty_state() {
        let compiled = compile_rules(vec![], MatchStrategy::Composite);
        assert!(compiled.find_at("anything", 0).is_none());
        assert_eq!(compiled.default_token(), &TokenClass::error());
        assert_eq!(compiled.strategy(), None);
    }

    #[test]
    fn test_zero_width_conflict() {
        let state = StateDefinition::new()
            .rule(Rule::new("eol", "$").next("start"))
            .rule(Rule::new("word", r"\w+"))
            .rule(Rule::new("eol2", "$").pop());
        let result = validate_state(&"start".into(), &state, &HashMap::new(), DEFAULT_REGEX_SIZE_LIMIT);
        assert_eq!(
            result,
            Err(RulesetError::RuleConflict {
                state: "start".into(),
                first: 0,
                second: 2,
                pattern: "$".to_string(),
            })
        );
    }

    #[test]
    fn test_word_boundary_conflict() {
        let state = StateDefinition::new()
            .rule(Rule::new("a", r"\b").next("start"))
            .rule(Rule::new("b", r"\b").next("start"));
        assert_eq!(
            validate_state(&"start".into(), &state, &HashMap::new(), DEFAULT_REGEX_SIZE_LIMIT),
            Err(RulesetError::RuleConflict {
                state: "start".into(),
                first: 0,
                second: 1,
                pattern: r"\b".to_string(),
            })
        );
    }

    #[test]
    fn test_duplicate_consuming_rules_are_not_conflicts() {
        let state = StateDefinition::new()
            .rule(Rule::new("a", r"\w+"))
            .rule(Rule::new("b", r"\w+"));
        assert!(validate_state(&"start".into(), &state, &HashMap::new(), DEFAULT_REGEX_SIZE_LIMIT).is_ok());
    }

    #[test]
    fn test_unknown_classifier() {
        let state = StateDefinition::new().rule(Rule::classify("missing", r"\w+"));
        assert_eq!(
            validate_state(&"start".into(), &state, &HashMap::new(), DEFAULT_REGEX_SIZE_LIMIT),
            Err(RulesetError::UnknownClassifier {
                state: "start".into(),
                id: "missing".to_string(),
            })
        );
    }

    #[test]
    fn test_invalid_pattern() {
        let state = StateDefinition::new().rule(Rule::new("bad", "(unclosed"));
        assert!(matches!(
            validate_state(&"start".into(), &state, &HashMap::new(), DEFAULT_REGEX_SIZE_LIMIT),
            Err(RulesetError::InvalidPattern { index: 0, .. })
        ));
    }

    #[test]
    fn test_cache_reuses_compiled_state() {
        let cache = CompileCache::default();
        let key = (StateName::from("start"), MatchStrategy::Composite);
        let first = cache.get_or_compile(key.clone(), || {
            compile_rules(vec![Rule::new("a", "a")], MatchStrategy::Composite)
        });
        let second = cache.get_or_compile(key, || unreachable!("already cached"));
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.len(), 1);
        cache.clear();
        assert_eq!(cache.len(), 0);
    }
}
