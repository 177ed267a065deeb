//! Whitespace and comments

use super::{LatexContext, LatexDispatcher};
use crate::tex::engine::TreeBuilder;
use crate::tex::token::TokenKind;
use crate::tex::tree::NodeId;
use once_cell::sync::Lazy;
use regex::Regex;

static COMMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^%[^\n]*").expect("comment pattern is valid"));

fn is_inline_space(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\r')
}

impl LatexDispatcher<'_> {
    /// Skip one comment at the cursor. Returns whether it swallowed a line break, `None` when
    /// there was no comment.
    pub(super) fn skip_comment(&self, ctx: &mut LatexContext) -> Option<bool> {
        let len = ctx.captures(&COMMENT)?.get(0)?.end();
        ctx.advance(len);
        if self.options.absorb_line_break && ctx.probe_str("\n", true) {
            let rest = ctx.rest();
            let indent = rest.len() - rest.trim_start_matches(|c: char| c == ' ' || c == '\t').len();
            ctx.advance(indent);
            return Some(true);
        }
        Some(false)
    }

    /// Skip a run of comments, returning how many line breaks they swallowed
    pub(super) fn skip_comments(&self, ctx: &mut LatexContext) -> usize {
        let mut breaks = 0;
        while let Some(absorbed) = self.skip_comment(ctx) {
            breaks += usize::from(absorbed);
        }
        breaks
    }

    /// Spaces, tabs and comments; what a whitespace placeholder in a pattern matches
    pub(super) fn skip_inline_space(&self, ctx: &mut LatexContext) {
        loop {
            match ctx.peek() {
                Some(c) if is_inline_space(c) => ctx.advance(1),
                Some('%') => {
                    self.skip_comment(ctx);
                }
                _ => break,
            }
        }
    }

    /// Whitespace allowed between a control sequence and its argument: inline space with at
    /// most one line break
    pub(super) fn skip_argument_space(&self, ctx: &mut LatexContext) {
        self.skip_inline_space(ctx);
        if ctx.probe_str("\n", true) {
            self.skip_inline_space(ctx);
        }
    }

    pub(super) fn run_space(
        &self,
        ctx: &mut LatexContext,
        builder: &mut TreeBuilder,
    ) -> Option<NodeId> {
        let start = ctx.offset();
        // a comment right before the run still ends its line
        let mut line_breaks = ctx.pending.absorbed_breaks;
        loop {
            match ctx.peek() {
                Some(c) if is_inline_space(c) => ctx.advance(1),
                Some('\n') => {
                    line_breaks += 1;
                    ctx.advance(1);
                }
                Some('%') => {
                    if self.skip_comment(ctx) == Some(true) {
                        line_breaks += 1;
                    }
                }
                _ => break,
            }
        }
        (ctx.offset() > start).then(|| builder.create(TokenKind::Space { line_breaks }))
    }
}
