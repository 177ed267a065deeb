//! Parsing context
//!
//!     [`ParsingContext`] is the cursor a parse advances over its source. It is a plain value: the
//!     source text is shared behind an `Rc<str>`, everything else (offsets, mode state, labels,
//!     the token under construction) is owned. Cloning therefore yields an independent snapshot,
//!     and backtracking is "clone, attempt, keep or discard".
//!
//!     The offset only ever moves forward on a live context. Going back means dropping the live
//!     context and resuming from a snapshot taken earlier; [`ParsingContext::advance_to`] panics on
//!     any attempt to move backwards.
//!
//! Labels
//!
//!     A stop label bounds a nested sub-parse. It is set at most once on a context and consumed by
//!     whoever handles it next: either [`Engine::parse`](crate::tex::engine::Engine::parse), which
//!     keeps it as the active terminator for the duration of the sub-parse, or a dispatcher step
//!     that reads raw source up to it.

use crate::tex::modes::{Directive, ModeMachine, ModeState, Requirements, UnbalancedGroup};
use crate::tex::range::Position;
use crate::tex::tree::NodeId;
use regex::{Captures, Regex};
use std::fmt;
use std::rc::Rc;

/// Literal text or a regular expression matched against the source
#[derive(Debug, Clone)]
pub enum Label {
    Literal(String),
    Regex { anchored: Regex, search: Regex },
}

impl Label {
    pub fn literal(text: impl Into<String>) -> Self {
        Label::Literal(text.into())
    }

    /// Compile a regex label. The same expression is used anchored (to test at the cursor) and
    /// unanchored (to search ahead).
    pub fn regex(source: &str) -> Result<Self, regex::Error> {
        Ok(Label::Regex {
            anchored: Regex::new(&format!(r"\A(?:{source})"))?,
            search: Regex::new(source)?,
        })
    }

    /// Length of the match at the very start of `text`
    pub fn match_len(&self, text: &str) -> Option<usize> {
        match self {
            Label::Literal(literal) => text.starts_with(literal.as_str()).then_some(literal.len()),
            Label::Regex { anchored, .. } => anchored.find(text).map(|m| m.end()),
        }
    }

    /// Byte index of the first match in `text`
    pub fn find(&self, text: &str) -> Option<usize> {
        match self {
            Label::Literal(literal) => text.find(literal.as_str()),
            Label::Regex { search, .. } => search.find(text).map(|m| m.start()),
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Label::Literal(literal) => write!(f, "{literal:?}"),
            Label::Regex { search, .. } => write!(f, "/{}/", search.as_str()),
        }
    }
}

impl From<&str> for Label {
    fn from(text: &str) -> Self {
        Label::literal(text)
    }
}

/// Cursor over an immutable source; `P` is dispatcher-specific scratch state
#[derive(Debug, Clone)]
pub struct ParsingContext<P = ()> {
    source: Rc<str>,
    offset: usize,
    cutting_offset: usize,
    modes: ModeMachine,
    stop_label: Option<Label>,
    terminator: Option<Label>,
    current_token: Option<NodeId>,
    depth: usize,
    pub pending: P,
}

impl<P: Default> ParsingContext<P> {
    pub fn new(source: impl Into<Rc<str>>) -> Self {
        Self {
            source: source.into(),
            offset: 0,
            cutting_offset: 0,
            modes: ModeMachine::default(),
            stop_label: None,
            terminator: None,
            current_token: None,
            depth: 0,
            pending: P::default(),
        }
    }
}

impl<P: Clone> ParsingContext<P> {
    /// Independent snapshot sharing the source text
    pub fn copy(&self) -> Self {
        self.clone()
    }

    /// Overwrite `target` with a snapshot of this context
    pub fn copy_into(&self, target: &mut Self) {
        target.clone_from(self);
    }
}

impl<P> ParsingContext<P> {
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn shared_source(&self) -> Rc<str> {
        Rc::clone(&self.source)
    }

    /// Unconsumed input
    pub fn rest(&self) -> &str {
        &self.source[self.offset..]
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn cutting_offset(&self) -> usize {
        self.cutting_offset
    }

    pub fn is_at_end(&self) -> bool {
        self.offset >= self.source.len()
    }

    pub fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    pub fn advance(&mut self, bytes: usize) {
        self.advance_to(self.offset + bytes);
    }

    /// Move the cursor to `offset`. Panics when moving backwards or off a character boundary.
    pub fn advance_to(&mut self, offset: usize) {
        assert!(
            offset >= self.offset,
            "offset may only move forward ({} -> {offset})",
            self.offset
        );
        assert!(
            self.source.is_char_boundary(offset),
            "offset {offset} is not a character boundary"
        );
        self.offset = offset;
    }

    /// Test `label` at the cursor, consuming the match when asked to
    pub fn probe(&mut self, label: &Label, consume: bool) -> bool {
        match label.match_len(self.rest()) {
            Some(len) => {
                if consume {
                    self.advance(len);
                }
                true
            }
            None => false,
        }
    }

    pub fn probe_str(&mut self, literal: &str, consume: bool) -> bool {
        if !self.rest().starts_with(literal) {
            return false;
        }
        if consume {
            self.advance(literal.len());
        }
        true
    }

    /// Capture groups of `regex` matched at the cursor.
    ///
    /// The regex runs over the remaining input, so `^` anchors at the cursor; a match that does
    /// not start at the cursor is ignored. Never moves the cursor.
    pub fn captures<'s>(&'s self, regex: &Regex) -> Option<Captures<'s>> {
        regex
            .captures(self.rest())
            .filter(|caps| caps.get(0).is_some_and(|m| m.start() == 0))
    }

    /// Record the cursor as the last committed token boundary
    pub fn mark_cut(&mut self) {
        self.cutting_offset = self.offset;
    }

    /// 1-based line and column of the cursor
    pub fn position(&self) -> Position {
        Position::of(&self.source, self.offset)
    }

    pub fn position_of(&self, offset: usize) -> Position {
        Position::of(&self.source, offset)
    }

    pub fn modes(&self) -> &ModeMachine {
        &self.modes
    }

    pub fn state(&self) -> ModeState {
        self.modes.state()
    }

    pub fn test(&self, requirements: &Requirements) -> bool {
        self.modes.test(requirements)
    }

    pub fn push_state(&mut self) {
        self.modes.push();
    }

    pub fn pop_state(&mut self) -> Result<(), UnbalancedGroup> {
        self.modes.pop()
    }

    /// Close every group opened above `depth`, restoring the state saved at that depth
    pub fn unwind_states(&mut self, depth: usize) {
        self.modes.unwind(depth);
    }

    pub fn apply(&mut self, directives: &[Directive]) -> Result<(), UnbalancedGroup> {
        self.modes.apply(directives)
    }

    pub fn stop_label(&self) -> Option<&Label> {
        self.stop_label.as_ref()
    }

    /// Set the label bounding the next sub-parse. Panics when one is already pending.
    pub fn set_stop_label(&mut self, label: Label) {
        assert!(
            self.stop_label.is_none(),
            "stop label {label} set while another is pending"
        );
        self.stop_label = Some(label);
    }

    pub fn take_stop_label(&mut self) -> Option<Label> {
        self.stop_label.take()
    }

    pub fn terminator(&self) -> Option<&Label> {
        self.terminator.as_ref()
    }

    pub fn replace_terminator(&mut self, terminator: Option<Label>) -> Option<Label> {
        std::mem::replace(&mut self.terminator, terminator)
    }

    /// Whether the active terminator matches at the cursor
    pub fn at_terminator(&self) -> bool {
        self.terminator
            .as_ref()
            .is_some_and(|label| label.match_len(self.rest()).is_some())
    }

    pub fn current_token(&self) -> Option<NodeId> {
        self.current_token
    }

    /// Replace the token new children attach to, returning the previous one
    pub fn set_current_token(&mut self, token: Option<NodeId>) -> Option<NodeId> {
        std::mem::replace(&mut self.current_token, token)
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub(crate) fn enter(&mut self) {
        self.depth += 1;
    }

    pub(crate) fn leave(&mut self) {
        self.depth -= 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tex::modes::{Mode, Target};

    type Context = ParsingContext<()>;

    #[test]
    fn test_probe_without_consume_keeps_offset() {
        let mut ctx = Context::new("hello world");
        assert!(ctx.probe(&Label::literal("hello"), false));
        assert_eq!(ctx.offset(), 0);
        assert!(ctx.probe(&Label::literal("hello"), true));
        assert_eq!(ctx.offset(), 5);
        assert!(!ctx.probe(&Label::literal("world"), true));
        assert_eq!(ctx.offset(), 5);
    }

    #[test]
    fn test_regex_label_is_anchored_at_cursor() {
        let mut ctx = Context::new("ab12");
        let digits = Label::regex("[0-9]+").unwrap();
        assert!(!ctx.probe(&digits, true));
        assert_eq!(digits.find(ctx.rest()), Some(2));
        ctx.advance(2);
        assert!(ctx.probe(&digits, true));
        assert!(ctx.is_at_end());
    }

    #[test]
    fn test_captures_never_moves() {
        let ctx = Context::new("x \\section{Intro}");
        let name = Regex::new(r"\\([a-z]+)").unwrap();
        assert!(ctx.captures(&name).is_none());

        let mut ctx = ctx;
        ctx.advance(2);
        let caps = ctx.captures(&name).unwrap();
        assert_eq!(&caps[1], "section");
        assert_eq!(ctx.offset(), 2);
    }

    #[test]
    #[should_panic(expected = "only move forward")]
    fn test_offset_cannot_rewind() {
        let mut ctx = Context::new("abc");
        ctx.advance(2);
        ctx.advance_to(1);
    }

    #[test]
    #[should_panic(expected = "set while another is pending")]
    fn test_stop_label_set_once() {
        let mut ctx = Context::new("abc");
        ctx.set_stop_label(Label::literal("}"));
        ctx.set_stop_label(Label::literal("]"));
    }

    #[test]
    fn test_copy_is_independent() {
        let mut live = Context::new("abcdef");
        live.advance(1);
        let snapshot = live.copy();
        live.advance(3);
        live.push_state();
        live.apply(&[Directive::Begin(Target::Mode(Mode::Math))]).unwrap();

        assert_eq!(snapshot.offset(), 1);
        assert_eq!(snapshot.modes().depth(), 0);
        assert!(!snapshot.state().is_set(Mode::Math));

        let mut target = Context::new("other");
        snapshot.copy_into(&mut target);
        assert_eq!(target.offset(), 1);
        assert_eq!(target.source(), "abcdef");
    }

    #[test]
    fn test_pop_without_push_fails() {
        let mut ctx = Context::new("");
        assert_eq!(ctx.pop_state(), Err(UnbalancedGroup));
        ctx.push_state();
        assert_eq!(ctx.pop_state(), Ok(()));
    }

    #[test]
    fn test_position_is_one_based() {
        let mut ctx = Context::new("ab\ncd");
        assert_eq!(ctx.position(), Position::new(1, 1));
        ctx.advance(4);
        assert_eq!(ctx.position(), Position::new(2, 2));
    }

    #[test]
    fn test_terminator_detection() {
        let mut ctx = Context::new("ab}");
        assert!(!ctx.at_terminator());
        ctx.replace_terminator(Some(Label::literal("}")));
        assert!(!ctx.at_terminator());
        ctx.advance(2);
        assert!(ctx.at_terminator());
    }
}
