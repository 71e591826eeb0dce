//! # Declarative Ruleset Definitions
//!
//! Rulesets can be authored as JSON data instead of Rust code:
//!
//! ```json
//! {
//!   "name": "mini",
//!   "classifiers": {
//!     "words": { "groups": { "keyword": "if|else" }, "default": "identifier" }
//!   },
//!   "states": {
//!     "start": [
//!       { "token": "comment.block", "regex": "/\\*", "push": "comment" },
//!       { "token": { "classify": "words" }, "regex": "[a-z]+" },
//!       { "include": "$base" },
//!       { "defaultToken": "text" }
//!     ],
//!     "comment": [
//!       { "token": "comment.block", "regex": "\\*/", "next": "pop" },
//!       { "defaultToken": "comment.block" }
//!     ]
//!   },
//!   "singleLineStates": []
//! }
//! ```
//!
//! Classifier groups are read in document order, so the last group listed
//! wins for duplicated words.

use std::{collections::HashMap, fmt};

use serde::{
    de::{MapAccess, Visitor},
    Deserialize, Deserializer,
};

use super::{
    error::{RulesetError, RulesetResult},
    keyword::KeywordClassifier,
    rule::{Rule, StateDefinition, TokenSpec},
    ruleset::{Ruleset, RulesetBuilder},
    state::{Transition, START_STATE},
};

/// The only include target understood: the base ruleset's rules for the same state.
pub const BASE_INCLUDE: &str = "$base";

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RulesetDef {
    pub name: String,
    #[serde(default = "default_start")]
    pub start: String,
    #[serde(default)]
    pub classifiers: HashMap<String, ClassifierDef>,
    pub states: HashMap<String, Vec<EntryDef>>,
    #[serde(default)]
    pub single_line_states: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassifierDef {
    #[serde(deserialize_with = "ordered_groups")]
    pub groups: Vec<(String, String)>,
    pub default: String,
    #[serde(default)]
    pub ignore_case: bool,
    #[serde(default = "default_split_char")]
    pub split_char: char,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum EntryDef {
    Rule(RuleDef),
    DefaultToken {
        #[serde(rename = "defaultToken")]
        default_token: String,
    },
    Include {
        include: String,
    },
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleDef {
    pub token: TokenDef,
    pub regex: String,
    #[serde(default)]
    pub next: Option<String>,
    #[serde(default)]
    pub push: Option<String>,
    #[serde(default)]
    pub case_insensitive: bool,
    #[serde(default)]
    pub merge: bool,
    #[serde(default)]
    pub no_consume: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum TokenDef {
    Fixed(String),
    Classify { classify: String },
}

impl RulesetDef {
    pub fn from_json(json: &str) -> RulesetResult<Self> {
        serde_json::from_str(json).map_err(|e| RulesetError::Definition(e.to_string()))
    }

    /// Converts the definition into builder form without validating it.
    pub fn into_builder(self) -> RulesetResult<RulesetBuilder> {
        let mut builder = Ruleset::builder(self.name).start(self.start);

        for (id, def) in self.classifiers {
            let classifier = KeywordClassifier::builder()
                .groups(def.groups)
                .ignore_case(def.ignore_case)
                .split_char(def.split_char)
                .build(def.default)?;
            builder = builder.classifier(id, classifier);
        }

        for (name, entries) in self.states {
            let mut definition = StateDefinition::new();
            for entry in entries {
                definition = match entry {
                    EntryDef::Rule(rule) => definition.rule(rule.into_rule()?),
                    EntryDef::DefaultToken { default_token } => definition.default_token(default_token),
                    EntryDef::Include { include } if include == BASE_INCLUDE => definition.splice_base(),
                    EntryDef::Include { include } => {
                        return Err(RulesetError::Definition(format!(
                            "state '{}' includes unsupported target `{}`",
                            name, include
                        )))
                    }
                };
            }
            if self.single_line_states.contains(&name) {
                definition = definition.single_line();
            }
            builder = builder.state(name, definition);
        }

        Ok(builder)
    }

    pub fn into_ruleset(self) -> RulesetResult<Ruleset> {
        self.into_builder()?.build()
    }
}

impl RuleDef {
    pub fn into_rule(self) -> RulesetResult<Rule> {
        let transition = match (self.next.as_deref(), self.push.as_deref()) {
            (Some(_), Some(_)) => {
                return Err(RulesetError::Definition(format!(
                    "rule `{}` sets both `next` and `push`",
                    self.regex
                )))
            }
            (Some(next), None) => Some(Transition::parse_next(next)?),
            (None, Some(push)) => Some(Transition::parse_push(push)?),
            (None, None) => None,
        };
        let token = match self.token {
            TokenDef::Fixed(class) => TokenSpec::Fixed(class.into()),
            TokenDef::Classify { classify } => TokenSpec::Classify(classify),
        };

        let mut rule = Rule::with_spec(token, self.regex).transition(transition);
        rule.case_insensitive = self.case_insensitive;
        rule.merge = self.merge;
        rule.no_consume = self.no_consume;
        Ok(rule)
    }
}

impl Ruleset {
    /// Builds and validates a ruleset from its JSON definition.
    pub fn from_json(json: &str) -> RulesetResult<Self> {
        RulesetDef::from_json(json)?.into_ruleset()
    }
}

fn default_start() -> String {
    START_STATE.to_string()
}

fn default_split_char() -> char {
    '|'
}

fn ordered_groups<'de, D>(deserializer: D) -> Result<Vec<(String, String)>, D::Error>
where
    D: Deserializer<'de>,
{
    struct GroupsVisitor;

    impl<'de> Visitor<'de> for GroupsVisitor {
        type Value = Vec<(String, String)>;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("a map from token class to delimited words")
        }

        fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
        where
            A: MapAccess<'de>,
        {
            let mut groups = Vec::with_capacity(map.size_hint().unwrap_or(0));
            while let Some((class, words)) = map.next_entry::<String, String>()? {
                groups.push((class, words));
            }
            Ok(groups)
        }
    }

    deserializer.deserialize_map(GroupsVisitor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokenizer::state::StateName;

    const MINI: &str = r#"{
        "name": "mini",
        "classifiers": {
            "words": {
                "groups": { "type": "int|if", "keyword": "if|else" },
                "default": "identifier"
            }
        },
        "states": {
            "start": [
                { "token": "comment.block", "regex": "/\\*", "push": "comment" },
                { "token": { "classify": "words" }, "regex": "[a-z]+" },
                { "token": "string", "regex": "'", "next": "+quote", "merge": true },
                { "defaultToken": "text" }
            ],
            "comment": [
                { "token": "comment.block", "regex": "\\*/", "next": "pop" },
                { "defaultToken": "comment.block" }
            ],
            "quote": [
                { "token": "string", "regex": "'", "next": "start" },
                { "defaultToken": "string" }
            ]
        },
        "singleLineStates": ["quote"]
    }"#;

    #[test]
    fn test_parse_definition() {
        let ruleset = Ruleset::from_json(MINI).unwrap();
        assert_eq!(ruleset.name(), "mini");

        let start = ruleset.state("start").unwrap();
        assert_eq!(start.rules.len(), 3);
        assert_eq!(start.rules[0].next, Some(Transition::Push("comment".into())));
        assert_eq!(start.rules[2].next, Some(Transition::Goto("quote".into())));
        assert!(start.rules[2].merge);
        assert_eq!(start.default_token, Some("text".into()));

        assert!(!ruleset.state("quote").unwrap().spans_lines);
        assert!(ruleset.state("comment").unwrap().spans_lines);
        assert_eq!(
            ruleset.state("comment").unwrap().rules[0].next,
            Some(Transition::Pop)
        );
    }

    #[test]
    fn test_groups_keep_document_order() {
        let ruleset = Ruleset::from_json(MINI).unwrap();
        let words = ruleset.classifier("words").unwrap();
        // `if` appears in both groups; `keyword` is listed last.
        assert_eq!(words.classify("if"), "keyword");
        assert_eq!(words.classify("int"), "type");
    }

    #[test]
    fn test_rejects_next_and_push() {
        let json = r#"{
            "name": "bad",
            "states": {
                "start": [ { "token": "x", "regex": "x", "next": "start", "push": "start" } ]
            }
        }"#;
        assert!(matches!(Ruleset::from_json(json), Err(RulesetError::Definition(_))));
    }

    #[test]
    fn test_rejects_unknown_include() {
        let json = r#"{ "name": "bad", "states": { "start": [ { "include": "other" } ] } }"#;
        assert!(matches!(Ruleset::from_json(json), Err(RulesetError::Definition(_))));
    }

    #[test]
    fn test_dangling_reference_in_definition() {
        let json = r#"{
            "name": "bad",
            "states": { "start": [ { "token": "x", "regex": "x", "push": "missing" } ] }
        }"#;
        assert_eq!(
            Ruleset::from_json(json).unwrap_err(),
            RulesetError::DanglingState {
                from: StateName::from("start"),
                target: StateName::from("missing"),
            }
        );
    }

    #[test]
    fn test_malformed_json() {
        assert!(matches!(
            RulesetDef::from_json("{ not json"),
            Err(RulesetError::Definition(_))
        ));
    }
}
