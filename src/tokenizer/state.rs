//! # Tokenizer States
//!
//! A ruleset is a state machine over named states. The state reached at the
//! end of a line is packaged as a [`ResumeState`] and handed back to the
//! caller, who passes it in again for the following line.
//!
//! ## Transitions
//!
//! | Authoring form       | [`Transition`]  | Effect                                  |
//! |----------------------|-----------------|-----------------------------------------|
//! | `next: "name"`       | `Goto(name)`    | replace the current state               |
//! | `next: "+name"`      | `Goto(name)`    | same, explicit spelling                 |
//! | `push: "name"`       | `Push(name)`    | remember the current state, enter name  |
//! | `next: "pop"`        | `Pop`           | return to the remembered state          |

use std::{borrow::Borrow, fmt, sync::Arc};

use nom::{
    branch::alt,
    bytes::complete::{tag, take_while1},
    character::complete::char,
    combinator::{all_consuming, eof, map, opt, value},
    sequence::{preceded, terminated},
    IResult,
};
use serde::{Serialize, Serializer};

use super::error::RulesetError;

/// Name of the state a ruleset starts in unless configured otherwise.
pub const START_STATE: &str = "start";

/// Name of a tokenizer state.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StateName(Arc<str>);

impl StateName {
    pub fn new(name: impl AsRef<str>) -> Self {
        Self(Arc::from(name.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub(crate) fn prefixed(&self, prefix: &str) -> Self {
        Self::new(format!("{}{}", prefix, self.0))
    }
}

impl Serialize for StateName {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl fmt::Display for StateName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for StateName {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for StateName {
    fn from(name: String) -> Self {
        Self(Arc::from(name))
    }
}

impl From<&StateName> for StateName {
    fn from(name: &StateName) -> Self {
        name.clone()
    }
}

impl Borrow<str> for StateName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for StateName {
    fn eq(&self, other: &str) -> bool {
        &*self.0 == other
    }
}

impl PartialEq<&str> for StateName {
    fn eq(&self, other: &&str) -> bool {
        &*self.0 == *other
    }
}

/// State change requested by a rule after it matched.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Transition {
    Goto(StateName),
    Push(StateName),
    Pop,
}

impl Transition {
    /// The state this transition names, if any.
    pub fn target(&self) -> Option<&StateName> {
        match self {
            Transition::Goto(target) | Transition::Push(target) => Some(target),
            Transition::Pop => None,
        }
    }

    pub(crate) fn prefixed(&self, prefix: &str) -> Self {
        match self {
            Transition::Goto(target) => Transition::Goto(target.prefixed(prefix)),
            Transition::Push(target) => Transition::Push(target.prefixed(prefix)),
            Transition::Pop => Transition::Pop,
        }
    }

    /// Parses the `next` field of a rule definition.
    pub fn parse_next(input: &str) -> Result<Self, RulesetError> {
        parse_next(input.trim())
            .map(|(_, transition)| transition)
            .map_err(|_| RulesetError::InvalidTransition(input.to_string()))
    }

    /// Parses the `push` field of a rule definition.
    pub fn parse_push(input: &str) -> Result<Self, RulesetError> {
        all_consuming(state_identifier)(input.trim())
            .map(|(_, name)| Transition::Push(StateName::from(name)))
            .map_err(|_| RulesetError::InvalidTransition(input.to_string()))
    }
}

impl fmt::Display for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Transition::Goto(target) => write!(f, "goto {}", target),
            Transition::Push(target) => write!(f, "push {}", target),
            Transition::Pop => f.write_str("pop"),
        }
    }
}

fn state_identifier(input: &str) -> IResult<&str, &str> {
    take_while1(|c: char| c.is_alphanumeric() || matches!(c, '_' | '-' | '.' | '$'))(input)
}

fn parse_next(input: &str) -> IResult<&str, Transition> {
    all_consuming(alt((
        value(Transition::Pop, terminated(tag("pop"), eof)),
        map(preceded(opt(char('+')), state_identifier), |name: &str| {
            Transition::Goto(StateName::from(name))
        }),
    )))(input)
}

/// Where to continue tokenizing on the next line.
///
/// `current` is the active state; `stack` holds the states to return to on
/// `pop`, innermost last.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResumeState {
    pub current: StateName,
    pub stack: Vec<StateName>,
}

impl ResumeState {
    pub fn new(current: impl Into<StateName>) -> Self {
        Self {
            current: current.into(),
            stack: Vec::new(),
        }
    }

    /// Nesting depth: 0 when no state has been pushed.
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    pub(crate) fn apply(&mut self, transition: &Transition, start: &StateName) {
        match transition {
            Transition::Goto(target) => self.current = target.clone(),
            Transition::Push(target) => {
                let previous = std::mem::replace(&mut self.current, target.clone());
                self.stack.push(previous);
            }
            Transition::Pop => {
                self.current = self.stack.pop().unwrap_or_else(|| start.clone());
            }
        }
    }
}

impl fmt::Display for ResumeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for state in &self.stack {
            write!(f, "{} > ", state)?;
        }
        write!(f, "{}", self.current)
    }
}
