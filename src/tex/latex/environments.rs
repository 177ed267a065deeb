//! Environment steps
//!
//! An environment token has up to three children, produced in order:
//!
//! 1. the begin marker, a command token for `\begin{name}` and its arguments
//! 2. the body, parsed until `\end{name}` inside the environment's own mode scope
//! 3. the end marker, a command token for `\end{name}`; missing when the body ran to the end
//!    of its input, which is reported as an unterminated environment
//!
//! The environment definition is the first candidate for the name; an unknown name still
//! produces the full structure, with no definition attached.

use super::{LatexContext, LatexDispatcher, PendingBody, PendingCommand, ENVIRONMENT_HEAD};
use crate::tex::context::Label;
use crate::tex::diagnostics::DiagnosticKind;
use crate::tex::engine::{Engine, TreeBuilder};
use crate::tex::token::{CommandHead, TokenKind};
use crate::tex::tree::NodeId;

/// Regex source matching `\end{name}` the way the environment head pattern does
fn end_marker(name: &str) -> String {
    format!(
        r"\\end(?:\s|%[^\n]*(?:\n|$))*\{{\s*{}\s*\}}",
        regex::escape(name)
    )
}

impl LatexDispatcher<'_> {
    pub(super) fn run_environment(
        &self,
        engine: &Engine<Self>,
        ctx: &mut LatexContext,
        builder: &mut TreeBuilder,
    ) -> Option<NodeId> {
        let start = ctx.offset();
        let name = {
            let caps = ctx.captures(&ENVIRONMENT_HEAD)?;
            if &caps[1] != "begin" {
                return None;
            }
            caps[2].trim().to_string()
        };
        let definition = self
            .registry
            .environments_for(ctx.state(), &name)
            .into_iter()
            .next();
        if definition.is_none() {
            self.report(ctx, builder, DiagnosticKind::UnknownEnvironment, start, name.clone());
        }

        let token = builder.create(TokenKind::Environment {
            name: name.clone(),
            definition: definition.clone(),
        });
        ctx.set_current_token(Some(token));
        ctx.pending.command = Some(PendingCommand {
            name: name.clone(),
            head: CommandHead::Begin,
        });
        if engine.parse_token(ctx, builder).is_none() {
            ctx.pending.command = None;
            return None;
        }

        let depth = ctx.modes().depth();
        ctx.push_state();
        if let Some(definition) = &definition {
            self.apply_directives(ctx, builder, &definition.directives, start, &name);
        }
        ctx.pending.environment = Some(PendingBody {
            name: name.clone(),
            verbatim: definition.as_ref().is_some_and(|d| d.verbatim),
        });
        let body = engine.parse_token(ctx, builder);
        ctx.pending.environment = None;
        ctx.unwind_states(depth);

        let closed = body.is_some() && self.at_end_marker(ctx, &name);
        if closed {
            ctx.pending.command = Some(PendingCommand {
                name,
                head: CommandHead::End,
            });
            if engine.parse_token(ctx, builder).is_none() {
                ctx.pending.command = None;
            }
        } else {
            self.report(ctx, builder, DiagnosticKind::UnterminatedEnvironment, start, name);
        }
        Some(token)
    }

    fn at_end_marker(&self, ctx: &LatexContext, name: &str) -> bool {
        ctx.captures(&ENVIRONMENT_HEAD)
            .is_some_and(|caps| &caps[1] == "end" && caps[2].trim() == name)
    }

    /// Body of the environment named by the pending request, up to its end marker
    pub(super) fn run_body(
        &self,
        engine: &Engine<Self>,
        ctx: &mut LatexContext,
        builder: &mut TreeBuilder,
    ) -> Option<NodeId> {
        let body = ctx.pending.environment.take()?;
        let end = Label::regex(&end_marker(&body.name)).ok()?;
        let token = builder.create(TokenKind::EnvironmentBody);
        ctx.set_current_token(Some(token));
        ctx.set_stop_label(end);
        if body.verbatim {
            if engine.parse_token(ctx, builder).is_none() {
                ctx.take_stop_label();
            }
        } else {
            engine.parse(ctx, builder);
        }
        Some(token)
    }
}
