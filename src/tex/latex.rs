//! LaTeX dispatcher
//!
//!     [`LatexDispatcher`] plugs the LaTeX vocabulary into the generic [`Engine`]. It decides
//!     which step produces the next token and implements each step on top of a
//!     [`DefinitionRegistry`].
//!
//! Dispatch order
//!
//!     At every token boundary the first matching rule wins:
//!
//!         1.  skip comments (`%` to end of line), unless raw text is pending
//!         2.  a pending command marker (`\begin{x}` / `\end{x}` of an environment)
//!         3.  end of input: no token
//!         4.  a pending parameter
//!         5.  a pending stop label: raw source up to the label
//!         6.  a pending environment body
//!         7.  the active terminator matches: no token
//!         8.  whitespace
//!         9.  `\begin{name}`: environment
//!         10. `\`: command
//!         11. anything else: symbol
//!
//!     Rules 2, 4, 5 and 6 are requests that a step leaves in [`Pending`] for the token it
//!     asks the engine to parse next; they take precedence so the requested token is produced
//!     regardless of what the input looks like.
//!
//! Matching
//!
//!     Symbols and commands try their candidates in registry order, each inside an
//!     [`Engine::attempt`]. The first candidate whose whole pattern matches wins and its mode
//!     directives are applied. When none matches, a fallback token with no definition is
//!     produced (one character for symbols, the control sequence for commands) and a
//!     diagnostic is buffered. The parse always makes progress.
//!
//!     A failed candidate is remembered for the rest of the parse, keyed by everything its
//!     outcome depends on: offset, depth, mode stack, active terminator and the definition.
//!     Unclosed openers such as `{{{{` would otherwise re-parse the remaining input once per
//!     enclosing attempt.

pub mod commands;
pub mod environments;
pub mod parameters;
pub mod space;
pub mod symbols;

use crate::tex::config::ParserConfig;
use crate::tex::context::ParsingContext;
use crate::tex::definitions::{Component, DefinitionRegistry, ParameterSpec, Pattern};
use crate::tex::diagnostics::{Diagnostic, DiagnosticKind};
use crate::tex::engine::{Dispatcher, Engine, TreeBuilder};
use crate::tex::modes::{Directive, ModeMachine};
use crate::tex::token::CommandHead;
use crate::tex::tree::NodeId;
use once_cell::sync::Lazy;
use regex::Regex;
use std::cell::RefCell;
use std::collections::HashSet;
use std::sync::Arc;

/// `\begin{name}` or `\end{name}`, allowing whitespace and comments before the brace
static ENVIRONMENT_HEAD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\\(begin|end)(?:\s|%[^\n]*(?:\n|$))*\{([^{}]*)\}")
        .expect("environment head pattern is valid")
});

pub type LatexContext = ParsingContext<Pending>;
pub type LatexEngine<'r> = Engine<LatexDispatcher<'r>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchOptions {
    /// A comment also swallows its line break and the next line's indentation
    pub absorb_line_break: bool,
    pub report_unknown_symbols: bool,
}

impl Default for DispatchOptions {
    fn default() -> Self {
        Self {
            absorb_line_break: true,
            report_unknown_symbols: true,
        }
    }
}

impl From<&ParserConfig> for DispatchOptions {
    fn from(config: &ParserConfig) -> Self {
        Self {
            absorb_line_break: config.comments.absorb_line_break,
            report_unknown_symbols: config.diagnostics.report_unknown_symbols,
        }
    }
}

/// Requests a step leaves for the next token it asks the engine for
#[derive(Debug, Clone, Default)]
pub struct Pending {
    pub command: Option<PendingCommand>,
    pub parameter: Option<PendingParameter>,
    pub environment: Option<PendingBody>,
    /// Line breaks swallowed by comments skipped just before the cursor
    pub absorbed_breaks: usize,
}

#[derive(Debug, Clone)]
pub struct PendingCommand {
    /// Environment name
    pub name: String,
    pub head: CommandHead,
}

#[derive(Debug, Clone)]
pub struct PendingParameter {
    pub index: usize,
    pub spec: ParameterSpec,
    /// Literal that ends the argument, taken from the pattern
    pub closing: Option<String>,
}

#[derive(Debug, Clone)]
pub struct PendingBody {
    pub name: String,
    pub verbatim: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Command,
    Parameter,
    Raw,
    EnvironmentBody,
    Space,
    Environment,
    Symbol,
}

/// Everything a candidate attempt's outcome depends on
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct AttemptKey {
    offset: usize,
    depth: usize,
    modes: ModeMachine,
    terminator: Option<String>,
    definition: usize,
}

impl AttemptKey {
    fn new<T>(ctx: &LatexContext, definition: &Arc<T>) -> Self {
        Self {
            offset: ctx.offset(),
            depth: ctx.depth(),
            modes: ctx.modes().clone(),
            terminator: ctx.terminator().map(ToString::to_string),
            definition: Arc::as_ptr(definition) as *const () as usize,
        }
    }
}

/// Drives one parse; failed attempts are cached for its lifetime
pub struct LatexDispatcher<'r> {
    registry: &'r dyn DefinitionRegistry,
    options: DispatchOptions,
    failed: RefCell<HashSet<AttemptKey>>,
}

impl<'r> LatexDispatcher<'r> {
    pub fn new(registry: &'r dyn DefinitionRegistry, options: DispatchOptions) -> Self {
        Self {
            registry,
            options,
            failed: RefCell::new(HashSet::new()),
        }
    }

    pub fn options(&self) -> DispatchOptions {
        self.options
    }

    fn report(
        &self,
        ctx: &LatexContext,
        builder: &mut TreeBuilder,
        kind: DiagnosticKind,
        offset: usize,
        text: impl Into<String>,
    ) {
        builder.report(Diagnostic::at(kind, ctx.source(), offset, text));
    }

    fn apply_directives(
        &self,
        ctx: &mut LatexContext,
        builder: &mut TreeBuilder,
        directives: &[Directive],
        offset: usize,
        owner: &str,
    ) {
        if ctx.apply(directives).is_err() {
            self.report(ctx, builder, DiagnosticKind::UnbalancedGroup, offset, owner);
        }
    }

    /// Try one candidate definition under [`Engine::attempt`], skipping it when the same
    /// attempt already failed at this point
    fn try_candidate<T>(
        &self,
        engine: &Engine<Self>,
        ctx: &mut LatexContext,
        builder: &mut TreeBuilder,
        definition: &Arc<T>,
        f: impl FnOnce(&mut LatexContext, &mut TreeBuilder) -> Option<NodeId>,
    ) -> Option<NodeId> {
        let key = AttemptKey::new(ctx, definition);
        if self.failed.borrow().contains(&key) {
            return None;
        }
        let result = engine.attempt(ctx, builder, f);
        if result.is_none() {
            self.failed.borrow_mut().insert(key);
        }
        result
    }

    /// Match `pattern` at the cursor, parsing each slot as a parameter of `token`
    fn match_pattern(
        &self,
        engine: &Engine<Self>,
        ctx: &mut LatexContext,
        builder: &mut TreeBuilder,
        token: NodeId,
        pattern: &Pattern,
        spec: impl Fn(usize) -> ParameterSpec,
    ) -> Option<()> {
        let outer = ctx.set_current_token(Some(token));
        let matched = self.match_components(engine, ctx, builder, pattern, spec);
        ctx.set_current_token(outer);
        matched
    }

    fn match_components(
        &self,
        engine: &Engine<Self>,
        ctx: &mut LatexContext,
        builder: &mut TreeBuilder,
        pattern: &Pattern,
        spec: impl Fn(usize) -> ParameterSpec,
    ) -> Option<()> {
        for component in pattern.components() {
            match component {
                Component::Literal(text) => {
                    if !ctx.probe_str(text, true) {
                        return None;
                    }
                }
                Component::Whitespace => self.skip_inline_space(ctx),
                Component::Parameter { index, closing } => {
                    ctx.pending.parameter = Some(PendingParameter {
                        index: *index,
                        spec: spec(*index),
                        closing: closing.clone(),
                    });
                    engine.parse_token(ctx, builder)?;
                }
            }
        }
        Some(())
    }
}

fn at_environment_head(ctx: &LatexContext, head: &str) -> bool {
    ctx.captures(&ENVIRONMENT_HEAD)
        .is_some_and(|caps| &caps[1] == head)
}

impl Dispatcher for LatexDispatcher<'_> {
    type Step = Step;
    type Pending = Pending;

    fn select(&self, ctx: &mut LatexContext, _: &mut TreeBuilder) -> Option<Step> {
        ctx.pending.absorbed_breaks = 0;
        if ctx.stop_label().is_none() {
            ctx.pending.absorbed_breaks = self.skip_comments(ctx);
        }
        if ctx.pending.command.is_some() {
            return Some(Step::Command);
        }
        if ctx.is_at_end() {
            return None;
        }
        if ctx.pending.parameter.is_some() {
            return Some(Step::Parameter);
        }
        if ctx.stop_label().is_some() {
            return Some(Step::Raw);
        }
        if ctx.pending.environment.is_some() {
            return Some(Step::EnvironmentBody);
        }
        if ctx.at_terminator() {
            return None;
        }
        match ctx.peek()? {
            ' ' | '\t' | '\r' | '\n' => Some(Step::Space),
            '\\' if at_environment_head(ctx, "begin") => Some(Step::Environment),
            '\\' => Some(Step::Command),
            _ => Some(Step::Symbol),
        }
    }

    fn run(
        &self,
        engine: &Engine<Self>,
        step: Step,
        ctx: &mut LatexContext,
        builder: &mut TreeBuilder,
    ) -> Option<NodeId> {
        log::trace!(target: "tex.dispatch", "{step:?} at {}", ctx.offset());
        match step {
            Step::Command => self.run_command(engine, ctx, builder),
            Step::Parameter => self.run_parameter(engine, ctx, builder),
            Step::Raw => self.run_raw(ctx, builder),
            Step::EnvironmentBody => self.run_body(engine, ctx, builder),
            Step::Space => self.run_space(ctx, builder),
            Step::Environment => self.run_environment(engine, ctx, builder),
            Step::Symbol => self.run_symbol(engine, ctx, builder),
        }
    }
}
