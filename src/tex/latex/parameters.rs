//! Parameter and raw-text steps
//!
//! An argument is read one of three ways:
//!
//! - up to a closing literal taken from the pattern, as in `[#1]` or `$#1$`
//! - in braces, `{...}`, when the pattern gives no closing literal and a brace follows
//! - as a single token otherwise, as in `\frac12`
//!
//! Each argument runs in its own mode scope: the parameter's directives apply inside it and
//! every change is undone when it ends. Verbatim arguments are kept as raw source.

use super::{LatexContext, LatexDispatcher};
use crate::tex::context::Label;
use crate::tex::engine::{Engine, ParseEnd, TreeBuilder};
use crate::tex::token::TokenKind;
use crate::tex::tree::NodeId;

impl LatexDispatcher<'_> {
    pub(super) fn run_parameter(
        &self,
        engine: &Engine<Self>,
        ctx: &mut LatexContext,
        builder: &mut TreeBuilder,
    ) -> Option<NodeId> {
        let request = ctx.pending.parameter.take()?;
        let verbatim = request.spec.verbatim;
        let token = builder.create(TokenKind::Parameter {
            index: request.index,
            brackets: false,
            verbatim,
        });
        ctx.set_current_token(Some(token));

        let depth = ctx.modes().depth();
        ctx.push_state();
        let offset = ctx.offset();
        self.apply_directives(
            ctx,
            builder,
            &request.spec.directives,
            offset,
            &format!("#{}", request.index),
        );
        let read = match &request.closing {
            Some(closing) => self.read_until(engine, ctx, builder, closing, verbatim),
            None => self.read_argument(engine, ctx, builder, token, verbatim),
        };
        ctx.unwind_states(depth);
        read.map(|()| token)
    }

    /// Parse (or copy, when verbatim) up to `closing`, leaving it unconsumed
    fn read_until(
        &self,
        engine: &Engine<Self>,
        ctx: &mut LatexContext,
        builder: &mut TreeBuilder,
        closing: &str,
        verbatim: bool,
    ) -> Option<()> {
        ctx.set_stop_label(Label::literal(closing));
        if verbatim {
            if engine.parse_token(ctx, builder).is_none() {
                ctx.take_stop_label();
                return None;
            }
        } else if engine.parse(ctx, builder).end != ParseEnd::Label {
            return None;
        }
        ctx.probe_str(closing, false).then_some(())
    }

    fn read_argument(
        &self,
        engine: &Engine<Self>,
        ctx: &mut LatexContext,
        builder: &mut TreeBuilder,
        token: NodeId,
        verbatim: bool,
    ) -> Option<()> {
        self.skip_argument_space(ctx);
        if ctx.probe_str("{", true) {
            if let TokenKind::Parameter { brackets, .. } = &mut builder.tree_mut().get_mut(token).kind
            {
                *brackets = true;
            }
            self.read_until(engine, ctx, builder, "}", verbatim)?;
            ctx.advance(1);
            return Some(());
        }
        // a paragraph break or the end of input is never an argument
        if ctx.peek().map_or(true, char::is_whitespace) {
            return None;
        }
        engine.parse_token(ctx, builder).map(|_| ())
    }

    /// Copy source up to the pending stop label, or to the end of input when it never matches
    pub(super) fn run_raw(
        &self,
        ctx: &mut LatexContext,
        builder: &mut TreeBuilder,
    ) -> Option<NodeId> {
        let label = ctx.take_stop_label()?;
        let len = label.find(ctx.rest()).unwrap_or(ctx.rest().len());
        let text = ctx.rest()[..len].to_string();
        ctx.advance(len);
        Some(builder.create(TokenKind::Source { text }))
    }
}
