//! # Tokenizer Runtime
//!
//! Tokenizes one line at a time. The caller passes in the [`ResumeState`] the
//! previous line ended in and gets back the tokens of this line together with
//! the state to use for the next one:
//!
//! ```
//! # use std::sync::Arc;
//! # use linelex::languages::Language;
//! # use linelex::tokenizer::runtime::Tokenizer;
//! let tokenizer = Tokenizer::new(Arc::new(Language::Bxl.ruleset().unwrap()));
//!
//! let first = tokenizer.tokenize_line("x = 1 /* open", &tokenizer.initial_state());
//! assert_eq!(first.state.current, "multilineComment");
//!
//! let second = tokenizer.tokenize_line("still comment */ y", &first.state);
//! assert_eq!(second.tokens[0].value, "still comment ");
//! assert_eq!(second.tokens[1].value, "*/");
//! assert_eq!(second.state.current, "start");
//! ```
//!
//! ## Guarantees
//!
//! * The tokens of a line are contiguous and cover it completely.
//! * Tokenization never fails. Text no rule matches becomes a token of the
//!   state's default class, or `error` when the state declares none.
//! * Every step either consumes input or changes state, and state changes
//!   without progress are bounded, so each line terminates.

use std::sync::Arc;

use super::{
    compiler::{CompileOptions, CompiledState},
    ruleset::Ruleset,
    state::{ResumeState, StateName},
    token::{LineTokens, Token, TokenClass},
};
use crate::config::TokenizerConfig;

/// Tokenizes lines with a shared [`Ruleset`].
///
/// Cheap to clone, and safe to use from several threads at once.
#[derive(Debug, Clone)]
pub struct Tokenizer {
    ruleset: Arc<Ruleset>,
    options: CompileOptions,
    max_tokens_per_line: usize,
    overflow_class: TokenClass,
}

impl Tokenizer {
    pub fn new(ruleset: Arc<Ruleset>) -> Self {
        Self::with_config(ruleset, &TokenizerConfig::default())
    }

    pub fn with_config(ruleset: Arc<Ruleset>, config: &TokenizerConfig) -> Self {
        Self {
            ruleset,
            options: config.compile_options(),
            max_tokens_per_line: config.max_tokens_per_line.max(1),
            overflow_class: TokenClass::new(&config.overflow_class),
        }
    }

    pub fn ruleset(&self) -> &Arc<Ruleset> {
        &self.ruleset
    }

    /// Resume state for the first line of a buffer.
    pub fn initial_state(&self) -> ResumeState {
        self.ruleset.initial_state()
    }

    /// Tokenizes `line` starting in `resume`.
    ///
    /// `line` should not contain a line terminator.
    #[tracing::instrument(level = "trace", skip(self, line), fields(ruleset = self.ruleset.name(), len = line.len()))]
    pub fn tokenize_line<'l>(&self, line: &'l str, resume: &ResumeState) -> LineTokens<'l> {
        let start = self.ruleset.start_state();
        let known = std::iter::once(&resume.current)
            .chain(&resume.stack)
            .all(|name| self.ruleset.contains_state(name.as_str()));
        let mut state = if known {
            resume.clone()
        } else {
            tracing::warn!(
                "unknown resume state '{}' for ruleset '{}', restarting from '{}'",
                resume,
                self.ruleset.name(),
                start
            );
            self.initial_state()
        };

        let mut scan = LineScan::new(line);
        // Consecutive state changes at one offset without consuming anything.
        let mut stalled = 0usize;
        let stall_limit = self.ruleset.states().count() + 1;

        loop {
            if scan.tokens.len() >= self.max_tokens_per_line && scan.offset < line.len() {
                tracing::warn!(
                    "line exceeds {} tokens, classifying the rest as '{}'",
                    self.max_tokens_per_line,
                    self.overflow_class
                );
                scan.emit_rule(self.overflow_class.clone(), line.len(), false);
                state = self.initial_state();
                break;
            }

            let Some(compiled) = self.compiled(&state.current) else {
                tracing::warn!("no state '{}' in ruleset '{}'", state.current, self.ruleset.name());
                scan.emit_default(TokenClass::error(), line.len());
                state = self.initial_state();
                break;
            };

            let Some(found) = compiled.find_at(line, scan.offset) else {
                if scan.offset < line.len() {
                    scan.emit_default(compiled.default_token().clone(), line.len());
                }
                break;
            };

            if found.start > scan.offset {
                // Nothing matches anywhere before the leftmost match.
                scan.emit_default(compiled.default_token().clone(), found.start);
                stalled = 0;
                if scan.tokens.len() >= self.max_tokens_per_line {
                    continue;
                }
            }

            let rule = compiled.rule(found.rule);
            if found.is_empty() || rule.no_consume {
                match &rule.transition {
                    Some(transition) if stalled < stall_limit => {
                        state.apply(transition, start);
                        stalled += 1;
                    }
                    _ => {
                        if scan.offset >= line.len() {
                            break;
                        }
                        scan.emit_default_char(compiled.default_token().clone());
                        stalled = 0;
                    }
                }
                continue;
            }

            let class = rule.producer.produce(&line[found.start..found.end]);
            scan.emit_rule(class, found.end, rule.merge);
            stalled = 0;
            if let Some(transition) = &rule.transition {
                state.apply(transition, start);
            }
        }

        self.leave_line(&mut state);
        LineTokens {
            tokens: scan.tokens,
            state,
        }
    }

    /// Unwinds states that do not continue past the end of a line.
    fn leave_line(&self, state: &mut ResumeState) {
        let start = self.ruleset.start_state();
        while let Some(definition) = self.ruleset.state(state.current.as_str()) {
            if definition.spans_lines || (state.current == *start && state.stack.is_empty()) {
                break;
            }
            state.current = state.stack.pop().unwrap_or_else(|| start.clone());
        }
    }

    fn compiled(&self, state: &StateName) -> Option<Arc<CompiledState>> {
        self.ruleset.compiled(state, &self.options)
    }
}

/// Accumulates the tokens of one line.
struct LineScan<'l> {
    line: &'l str,
    offset: usize,
    column: usize,
    tokens: Vec<Token<'l>>,
    // The last token was produced by default classification.
    after_default: bool,
}

impl<'l> LineScan<'l> {
    fn new(line: &'l str) -> Self {
        Self {
            line,
            offset: 0,
            column: 0,
            tokens: Vec::new(),
            after_default: false,
        }
    }

    /// Emits `[offset, end)` as text no rule matched. Runs of such text form
    /// a single token.
    fn emit_default(&mut self, class: TokenClass, end: usize) {
        let merge = self.after_default;
        self.push(class, end, merge);
        self.after_default = true;
    }

    /// Emits `[offset, end)` as matched by a rule, extending the previous
    /// token instead when `merge` is set and the classes agree.
    fn emit_rule(&mut self, class: TokenClass, end: usize, merge: bool) {
        self.push(class, end, merge);
        self.after_default = false;
    }

    /// Emits the single character at the current offset as default text.
    fn emit_default_char(&mut self, class: TokenClass) {
        let width = self.line[self.offset..]
            .chars()
            .next()
            .map_or(0, char::len_utf8);
        self.emit_default(class, self.offset + width);
    }

    fn push(&mut self, class: TokenClass, end: usize, merge: bool) {
        if end <= self.offset {
            return;
        }
        let text = &self.line[self.offset..end];
        let width = text.chars().count();

        match self.tokens.last_mut() {
            Some(last) if merge && last.class == class && last.end() == self.offset => {
                last.value = &self.line[last.start..end];
            }
            _ => self.tokens.push(Token {
                class,
                value: text,
                start: self.offset,
                column: self.column,
            }),
        }

        self.offset = end;
        self.column += width;
    }
}
