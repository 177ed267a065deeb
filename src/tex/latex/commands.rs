//! Command step
//!
//! A control sequence is `\` followed by either a run of letters or exactly one other
//! character. Environment markers reach this step as pending commands: their head is the whole
//! `\begin{name}` or `\end{name}` text, and they look up the commands an environment registers
//! (`name` and `endname`).

use super::{LatexContext, LatexDispatcher, PendingCommand, ENVIRONMENT_HEAD};
use crate::tex::diagnostics::DiagnosticKind;
use crate::tex::engine::{Engine, TreeBuilder};
use crate::tex::token::{CommandHead, TokenKind};
use crate::tex::tree::NodeId;
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;

/// Control word, control symbol, or a lone backslash at the end of input
static COMMAND_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\\([A-Za-z@]+|(?s:.)|$)").expect("command name pattern is valid"));

impl LatexDispatcher<'_> {
    pub(super) fn run_command(
        &self,
        engine: &Engine<Self>,
        ctx: &mut LatexContext,
        builder: &mut TreeBuilder,
    ) -> Option<NodeId> {
        let start = ctx.offset();
        let (name, head, lookup) = match ctx.pending.command.take() {
            Some(pending) => {
                let lookup = match pending.head {
                    CommandHead::End => format!("end{}", pending.name),
                    _ => pending.name.clone(),
                };
                self.consume_marker(ctx, &pending)?;
                (pending.name, pending.head, lookup)
            }
            None => {
                let (name, len) = {
                    let caps = ctx.captures(&COMMAND_NAME)?;
                    (caps[1].to_string(), caps[0].len())
                };
                ctx.advance(len);
                (name.clone(), CommandHead::Control, name)
            }
        };

        let candidates = self.registry.commands_for(ctx.state(), &lookup);
        for definition in &candidates {
            let matched = self.try_candidate(engine, ctx, builder, definition, |ctx, builder| {
                let token = builder.create(TokenKind::Command {
                    name: name.clone(),
                    head,
                    definition: Some(Arc::clone(definition)),
                });
                self.match_pattern(engine, ctx, builder, token, &definition.pattern, |i| {
                    definition.parameter(i)
                })?;
                Some(token)
            });
            if let Some(token) = matched {
                self.apply_directives(ctx, builder, &definition.directives, start, &lookup);
                return Some(token);
            }
        }

        // markers of unknown environments were already reported as such
        if head == CommandHead::Control {
            self.report(ctx, builder, DiagnosticKind::UnknownCommand, start, name.clone());
        }
        Some(builder.create(TokenKind::Command {
            name,
            head,
            definition: None,
        }))
    }

    /// Consume `\begin{name}` or `\end{name}` for a pending marker
    fn consume_marker(&self, ctx: &mut LatexContext, pending: &PendingCommand) -> Option<()> {
        let expected = match pending.head {
            CommandHead::Begin => "begin",
            CommandHead::End => "end",
            CommandHead::Control => return None,
        };
        let len = {
            let caps = ctx.captures(&ENVIRONMENT_HEAD)?;
            if &caps[1] != expected || caps[2].trim() != pending.name {
                return None;
            }
            caps[0].len()
        };
        ctx.advance(len);
        Some(())
    }
}
