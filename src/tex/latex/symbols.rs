//! Symbol step

use super::{LatexContext, LatexDispatcher};
use crate::tex::diagnostics::DiagnosticKind;
use crate::tex::engine::{Engine, TreeBuilder};
use crate::tex::token::TokenKind;
use crate::tex::tree::NodeId;
use std::sync::Arc;

impl LatexDispatcher<'_> {
    /// Match a symbol definition at the cursor, or fall back to a single unrecognized character
    pub(super) fn run_symbol(
        &self,
        engine: &Engine<Self>,
        ctx: &mut LatexContext,
        builder: &mut TreeBuilder,
    ) -> Option<NodeId> {
        let c = ctx.peek()?;
        let start = ctx.offset();
        let candidates = self.registry.symbols_for(ctx.state(), c);

        for definition in &candidates {
            let matched = self.try_candidate(engine, ctx, builder, definition, |ctx, builder| {
                let token = builder.create(TokenKind::Symbol {
                    definition: Some(Arc::clone(definition)),
                    text: definition.name.clone(),
                });
                self.match_pattern(engine, ctx, builder, token, &definition.pattern, |i| {
                    definition.parameter(i)
                })?;
                Some(token)
            });
            if let Some(token) = matched {
                self.apply_directives(ctx, builder, &definition.directives, start, &definition.name);
                return Some(token);
            }
        }

        if !candidates.is_empty() && self.options.report_unknown_symbols {
            self.report(ctx, builder, DiagnosticKind::UnknownSymbol, start, c.to_string());
        }
        ctx.advance(c.len_utf8());
        Some(builder.create(TokenKind::Symbol {
            definition: None,
            text: c.to_string(),
        }))
    }
}
