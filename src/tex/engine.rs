//! Parser engine
//!
//!     The engine is a small recursive-descent driver that knows nothing about LaTeX. It asks a
//!     [`Dispatcher`] for the next step, runs it, and wires the resulting token into the tree
//!     with its `shift` and `length`. All vocabulary lives in the dispatcher.
//!
//! Token protocol
//!
//!     [`Engine::parse_token`] produces one token:
//!
//!         1. remember the cutting offset (end of the previous sibling)
//!         2. select a step; none means "nothing here", the token fails
//!         3. mark the cut at the step's start and run it
//!         4. on success set length = consumed bytes and shift = start - previous cut, attach
//!            the token under the context's current token, mark the cut at its end
//!
//!     A failed token leaves the context wherever the step left it. Callers that want to try
//!     something else take a [`Checkpoint`] first, see [`Engine::attempt`].
//!
//! Backtracking
//!
//!     Nodes are only ever allocated at the end of the arena. Rolling back is therefore
//!     truncation: tokens allocated since the checkpoint are unlinked from older parents, the
//!     arena and the diagnostics buffer are cut back to their lengths at the checkpoint, and the
//!     context is replaced by its snapshot.

use crate::tex::context::ParsingContext;
use crate::tex::diagnostics::{Diagnostic, DiagnosticKind};
use crate::tex::token::{SyntaxTree, Token, TokenKind};
use crate::tex::tree::NodeId;
use std::fmt;

/// Default limit on nested token production
pub const DEFAULT_MAX_DEPTH: usize = 256;

/// Tree under construction plus the diagnostics raised while building it
#[derive(Debug, Clone)]
pub struct TreeBuilder {
    tree: SyntaxTree,
    diagnostics: Vec<Diagnostic>,
    /// Survives rollback: depth overflows are reported once per parse
    overflow: Option<Diagnostic>,
}

/// Lengths of the arena and the diagnostics buffer at a checkpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuilderMark {
    nodes: usize,
    diagnostics: usize,
}

impl TreeBuilder {
    pub fn new() -> Self {
        Self {
            tree: SyntaxTree::new(Token::new(TokenKind::Document)),
            diagnostics: Vec::new(),
            overflow: None,
        }
    }

    pub fn tree(&self) -> &SyntaxTree {
        &self.tree
    }

    pub fn tree_mut(&mut self) -> &mut SyntaxTree {
        &mut self.tree
    }

    pub fn root(&self) -> NodeId {
        self.tree.root()
    }

    /// Allocate a detached token
    pub fn create(&mut self, kind: TokenKind) -> NodeId {
        self.tree.create(Token::new(kind))
    }

    pub fn report(&mut self, diagnostic: Diagnostic) {
        log::trace!(target: "tex.engine", "buffered {diagnostic}");
        self.diagnostics.push(diagnostic);
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn mark(&self) -> BuilderMark {
        BuilderMark {
            nodes: self.tree.arena_len(),
            diagnostics: self.diagnostics.len(),
        }
    }

    pub fn rollback(&mut self, mark: BuilderMark) {
        self.tree.truncate(mark.nodes);
        self.diagnostics.truncate(mark.diagnostics);
    }

    fn overflowed(&mut self, diagnostic: Diagnostic) {
        if self.overflow.is_none() {
            self.overflow = Some(diagnostic);
        }
    }

    /// Hand over the tree and every surviving diagnostic
    pub fn finish(self) -> (SyntaxTree, Vec<Diagnostic>) {
        let mut diagnostics = self.diagnostics;
        diagnostics.extend(self.overflow);
        (self.tree, diagnostics)
    }
}

impl Default for TreeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Saved parser state to return to when an alternative fails
#[derive(Debug, Clone)]
pub struct Checkpoint<P> {
    context: ParsingContext<P>,
    mark: BuilderMark,
}

/// How a [`Engine::parse`] loop ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseEnd {
    EndOfInput,
    /// The stop label matched
    Label,
    /// Neither: no step applied at the cursor
    Stalled,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parsed {
    pub tokens: Vec<NodeId>,
    pub end: ParseEnd,
}

/// The vocabulary plugged into an [`Engine`].
///
/// `select` inspects the context and names the step that should produce the next token; it may
/// consume input that belongs to no token (comments). `run` executes the step, advancing the
/// context and returning the token, or `None` when the step does not apply after all.
pub trait Dispatcher: Sized {
    type Step: Copy + fmt::Debug;
    type Pending: Clone + Default + fmt::Debug;

    fn select(
        &self,
        ctx: &mut ParsingContext<Self::Pending>,
        builder: &mut TreeBuilder,
    ) -> Option<Self::Step>;

    fn run(
        &self,
        engine: &Engine<Self>,
        step: Self::Step,
        ctx: &mut ParsingContext<Self::Pending>,
        builder: &mut TreeBuilder,
    ) -> Option<NodeId>;
}

pub struct Engine<D> {
    dispatcher: D,
    max_depth: usize,
}

impl<D: Dispatcher> Engine<D> {
    pub fn new(dispatcher: D) -> Self {
        Self {
            dispatcher,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn dispatcher(&self) -> &D {
        &self.dispatcher
    }

    /// Produce one token at the cursor and attach it under the current token
    pub fn parse_token(
        &self,
        ctx: &mut ParsingContext<D::Pending>,
        builder: &mut TreeBuilder,
    ) -> Option<NodeId> {
        let previous_cut = ctx.cutting_offset();
        let step = self.dispatcher.select(ctx, builder)?;
        if ctx.depth() >= self.max_depth {
            log::debug!(target: "tex.engine", "depth limit {} reached", self.max_depth);
            builder.overflowed(Diagnostic::at(
                DiagnosticKind::NestingTooDeep,
                ctx.source(),
                ctx.offset(),
                self.max_depth.to_string(),
            ));
            return None;
        }

        let start = ctx.offset();
        ctx.mark_cut();
        let parent = ctx.current_token();
        ctx.enter();
        let produced = self.dispatcher.run(self, step, ctx, builder);
        ctx.leave();
        ctx.set_current_token(parent);
        let Some(token) = produced else {
            log::trace!(target: "tex.engine", "{step:?} failed at {start}");
            return None;
        };

        let length = ctx.offset() - start;
        {
            let data = builder.tree_mut().get_mut(token);
            data.length = Some(length);
            data.shift = start - previous_cut;
        }
        if let Some(parent) = parent {
            builder.tree_mut().insert_subtree(parent, token, None);
        }
        ctx.mark_cut();
        log::trace!(
            target: "tex.engine",
            "{step:?} produced {} at {start}+{length}",
            builder.tree().get(token).kind_name()
        );
        Some(token)
    }

    /// Produce tokens until none can be produced.
    ///
    /// A pending stop label becomes the terminator for this loop (and is restored to the outer
    /// one afterwards); the loop then ends when the label matches at the cursor.
    pub fn parse(&self, ctx: &mut ParsingContext<D::Pending>, builder: &mut TreeBuilder) -> Parsed {
        let label = ctx.take_stop_label();
        let outer = ctx.replace_terminator(label);
        let mut tokens = Vec::new();
        let end = loop {
            if let Some(token) = self.parse_token(ctx, builder) {
                tokens.push(token);
                continue;
            }
            break if ctx.at_terminator() {
                ParseEnd::Label
            } else if ctx.is_at_end() {
                ParseEnd::EndOfInput
            } else {
                ParseEnd::Stalled
            };
        };
        ctx.replace_terminator(outer);
        Parsed { tokens, end }
    }

    pub fn checkpoint(
        &self,
        ctx: &ParsingContext<D::Pending>,
        builder: &TreeBuilder,
    ) -> Checkpoint<D::Pending> {
        Checkpoint {
            context: ctx.copy(),
            mark: builder.mark(),
        }
    }

    pub fn restore(
        &self,
        checkpoint: Checkpoint<D::Pending>,
        ctx: &mut ParsingContext<D::Pending>,
        builder: &mut TreeBuilder,
    ) {
        *ctx = checkpoint.context;
        builder.rollback(checkpoint.mark);
    }

    /// Run `f`, undoing everything it did to the context and the builder when it returns `None`
    pub fn attempt<T>(
        &self,
        ctx: &mut ParsingContext<D::Pending>,
        builder: &mut TreeBuilder,
        f: impl FnOnce(&mut ParsingContext<D::Pending>, &mut TreeBuilder) -> Option<T>,
    ) -> Option<T> {
        let checkpoint = self.checkpoint(ctx, builder);
        let result = f(ctx, builder);
        if result.is_none() {
            self.restore(checkpoint, ctx, builder);
        }
        result
    }
}
