//! # Incremental Highlighting
//!
//! [`LineCache`] keeps the tokens and end-of-line resume state of every line
//! of a buffer. After an edit only the lines from the edit onward are
//! re-tokenized, and only until a line ends in the same state it ended in
//! before: from there on the cached results are still valid.
//!
//! Full passes can be cancelled from another thread through a
//! [`CancellationFlag`]. Cancellation is checked between lines.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use thiserror::Error;

use crate::tokenizer::{ResumeState, TokenSpan, Tokenizer};

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("cancelled before line {line}")]
pub struct Cancelled {
    /// First line that was not tokenized.
    pub line: usize,
}

/// Shared flag used to abandon a running pass.
#[derive(Debug, Clone, Default)]
pub struct CancellationFlag(Arc<AtomicBool>);

impl CancellationFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    pub fn reset(&self) {
        self.0.store(false, Ordering::Release);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HighlightedLine {
    pub tokens: Vec<TokenSpan>,
    pub state_after: ResumeState,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineCache {
    initial: ResumeState,
    lines: Vec<HighlightedLine>,
}

impl LineCache {
    /// Empty cache for a buffer tokenized with `tokenizer`.
    pub fn new(tokenizer: &Tokenizer) -> Self {
        Self {
            initial: tokenizer.initial_state(),
            lines: Vec::new(),
        }
    }

    /// Tokenizes every line of a buffer.
    pub fn from_lines<S: AsRef<str>>(tokenizer: &Tokenizer, lines: &[S]) -> Self {
        let mut cache = Self::new(tokenizer);
        cache.lines = tokenize_all(tokenizer, &cache.initial, lines);
        cache
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn lines(&self) -> &[HighlightedLine] {
        &self.lines
    }

    pub fn line(&self, index: usize) -> Option<&HighlightedLine> {
        self.lines.get(index)
    }

    pub fn tokens(&self, index: usize) -> Option<&[TokenSpan]> {
        self.lines.get(index).map(|line| line.tokens.as_slice())
    }

    /// Resume state line `index` starts in. `index == len()` gives the state
    /// after the last line.
    pub fn state_before(&self, index: usize) -> Option<&ResumeState> {
        match index {
            0 => Some(&self.initial),
            _ => self.lines.get(index - 1).map(|line| &line.state_after),
        }
    }

    /// Re-tokenizes after line `index` was edited.
    ///
    /// Lines are re-tokenized from `index` until one ends in the same state as
    /// before. When the number of lines changed, the whole buffer is
    /// re-tokenized. Returns the number of lines tokenized.
    #[tracing::instrument(level = "debug", skip(self, tokenizer, lines), fields(lines = lines.len()))]
    pub fn update_from<S: AsRef<str>>(
        &mut self,
        tokenizer: &Tokenizer,
        lines: &[S],
        index: usize,
    ) -> usize {
        if lines.len() != self.lines.len() {
            tracing::debug!(
                "line count changed from {} to {}, rebuilding",
                self.lines.len(),
                lines.len()
            );
            self.initial = tokenizer.initial_state();
            self.lines = tokenize_all(tokenizer, &self.initial, lines);
            return lines.len();
        }

        let mut tokenized = 0;
        for current in index..lines.len() {
            let state = self
                .state_before(current)
                .cloned()
                .unwrap_or_else(|| tokenizer.initial_state());
            let result = tokenizer.tokenize_line(lines[current].as_ref(), &state);
            let highlighted = HighlightedLine {
                tokens: result.spans(),
                state_after: result.state,
            };
            let unchanged = self.lines[current].state_after == highlighted.state_after;
            self.lines[current] = highlighted;
            tokenized += 1;
            if unchanged {
                break;
            }
        }
        tracing::debug!("re-tokenized {} lines from line {}", tokenized, index);
        tokenized
    }

    /// Re-tokenizes the whole buffer, giving up as soon as `flag` is set.
    ///
    /// A cancelled pass leaves the cache as it was.
    #[tracing::instrument(level = "debug", skip(self, tokenizer, lines, flag), fields(lines = lines.len()))]
    pub fn rebuild_cancellable<S: AsRef<str>>(
        &mut self,
        tokenizer: &Tokenizer,
        lines: &[S],
        flag: &CancellationFlag,
    ) -> Result<(), Cancelled> {
        let initial = tokenizer.initial_state();
        let mut rebuilt = Vec::with_capacity(lines.len());
        let mut state = initial.clone();
        for (index, line) in lines.iter().enumerate() {
            if flag.is_cancelled() {
                tracing::debug!("highlighting cancelled at line {}", index);
                return Err(Cancelled { line: index });
            }
            let result = tokenizer.tokenize_line(line.as_ref(), &state);
            state = result.state.clone();
            rebuilt.push(HighlightedLine {
                tokens: result.spans(),
                state_after: result.state,
            });
        }
        self.initial = initial;
        self.lines = rebuilt;
        Ok(())
    }
}

fn tokenize_all<S: AsRef<str>>(
    tokenizer: &Tokenizer,
    initial: &ResumeState,
    lines: &[S],
) -> Vec<HighlightedLine> {
    let mut state = initial.clone();
    lines
        .iter()
        .map(|line| {
            let result = tokenizer.tokenize_line(line.as_ref(), &state);
            state = result.state.clone();
            HighlightedLine {
                tokens: result.spans(),
                state_after: result.state,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokenizer::{Rule, Ruleset, StateDefinition};

    fn tokenizer() -> Tokenizer {
        let ruleset = Ruleset::builder("comments")
            .state(
                "start",
                StateDefinition::new()
                    .rule(Rule::new("comment", r"/\*").push("comment"))
                    .default_token("text"),
            )
            .state(
                "comment",
                StateDefinition::new()
                    .rule(Rule::new("comment", r"\*/").pop())
                    .default_token("comment"),
            )
            .build()
            .unwrap();
        Tokenizer::new(Arc::new(ruleset))
    }

    #[test]
    fn test_state_before() {
        let tokenizer = tokenizer();
        let cache = LineCache::from_lines(&tokenizer, &["a /* b", "c */ d"]);
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.state_before(0), Some(&ResumeState::new("start")));
        assert_eq!(cache.state_before(1).map(|s| s.current.as_str()), Some("comment"));
        assert_eq!(cache.state_before(2), Some(&ResumeState::new("start")));
        assert_eq!(cache.state_before(3), None);
        assert_eq!(cache.tokens(1).map(|t| t.len()), Some(3));
    }

    #[test]
    fn test_update_stops_when_state_settles() {
        let tokenizer = tokenizer();
        let mut lines = vec!["a", "b", "c", "d"];
        let mut cache = LineCache::from_lines(&tokenizer, &lines);

        lines[1] = "b b";
        assert_eq!(cache.update_from(&tokenizer, &lines, 1), 1);

        lines[1] = "b /*";
        assert_eq!(cache.update_from(&tokenizer, &lines, 1), 3);
        assert_eq!(cache, LineCache::from_lines(&tokenizer, &lines));
    }

    #[test]
    fn test_cancelled_rebuild_keeps_cache() {
        let tokenizer = tokenizer();
        let mut cache = LineCache::from_lines(&tokenizer, &["x"]);
        let before = cache.clone();

        let flag = CancellationFlag::new();
        flag.cancel();
        let result = cache.rebuild_cancellable(&tokenizer, &["/*", "y"], &flag);
        assert_eq!(result, Err(Cancelled { line: 0 }));
        assert_eq!(cache, before);

        flag.reset();
        cache.rebuild_cancellable(&tokenizer, &["/*", "y"], &flag).unwrap();
        assert_eq!(cache.len(), 2);
    }
}
