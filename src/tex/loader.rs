//! Document loading
//!
//! This module provides `DocumentLoader` - the entry point that wires a configuration, a
//! definition registry and the LaTeX dispatcher together and parses one source string. It is
//! used by both production code and tests.
//!
//! # Example
//!
//! ```rust,ignore
//! use tex_parser::tex::loader::DocumentLoader;
//!
//! let doc = DocumentLoader::from_string(r"\section{Intro} Hello").parse()?;
//! assert!(doc.diagnostics.is_empty());
//! println!("{}", doc.snapshot().render());
//! ```

use crate::tex::config::ParserConfig;
use crate::tex::context::ParsingContext;
use crate::tex::definitions::{DefinitionError, DefinitionRegistry, Registry};
use crate::tex::diagnostics::{Diagnostic, DiagnosticSink, LogSink};
use crate::tex::engine::{Engine, ParseEnd, TreeBuilder};
use crate::tex::latex::{LatexContext, LatexDispatcher};
use crate::tex::range::Range;
use crate::tex::snapshot::{snapshot_token, TokenSnapshot};
use crate::tex::token::{text, SyntaxTree, Token};
use crate::tex::tree::NodeId;
use std::fmt;

/// Error that can occur when loading documents
#[derive(Debug, Clone, PartialEq)]
pub enum LoaderError {
    /// A configured package could not be loaded
    Definitions(DefinitionError),
}

impl fmt::Display for LoaderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoaderError::Definitions(err) => write!(f, "Definition error: {}", err),
        }
    }
}

impl std::error::Error for LoaderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LoaderError::Definitions(err) => Some(err),
        }
    }
}

impl From<DefinitionError> for LoaderError {
    fn from(err: DefinitionError) -> Self {
        LoaderError::Definitions(err)
    }
}

/// Parses one source string.
///
/// Without an explicit registry the packages named by `config.packages` are loaded from the
/// built-in catalog.
pub struct DocumentLoader {
    source: String,
    config: ParserConfig,
    registry: Option<Box<dyn DefinitionRegistry>>,
}

impl DocumentLoader {
    pub fn from_string<S: Into<String>>(source: S) -> Self {
        DocumentLoader {
            source: source.into(),
            config: ParserConfig::default(),
            registry: None,
        }
    }

    pub fn with_config(mut self, config: ParserConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_registry<R: DefinitionRegistry + 'static>(mut self, registry: R) -> Self {
        self.registry = Some(Box::new(registry));
        self
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Parse, logging every diagnostic through [`LogSink`]
    pub fn parse(&self) -> Result<ParsedDocument, LoaderError> {
        self.parse_with_sink(&mut LogSink)
    }

    /// Parse, then deliver every diagnostic to `sink` in source order of discovery
    pub fn parse_with_sink(
        &self,
        sink: &mut dyn DiagnosticSink,
    ) -> Result<ParsedDocument, LoaderError> {
        let loaded;
        let registry: &dyn DefinitionRegistry = match &self.registry {
            Some(registry) => registry.as_ref(),
            None => {
                loaded = Registry::with_builtins(self.config.packages.as_slice())?;
                &loaded
            }
        };

        let engine = Engine::new(LatexDispatcher::new(registry, (&self.config).into()))
            .with_max_depth(self.config.limits.max_depth);
        let mut builder = TreeBuilder::new();
        let root = builder.root();
        let mut ctx: LatexContext = ParsingContext::new(self.source.as_str());
        ctx.set_current_token(Some(root));
        let parsed = engine.parse(&mut ctx, &mut builder);
        builder.tree_mut().get_mut(root).length = Some(self.source.len());
        log::debug!(
            target: "tex.loader",
            "parsed {} bytes into {} tokens ({:?})",
            self.source.len(),
            builder.tree().subtree_size(root),
            parsed.end
        );

        let (tree, diagnostics) = builder.finish();
        for diagnostic in &diagnostics {
            sink.report(diagnostic);
        }
        Ok(ParsedDocument {
            source: self.source.clone(),
            tree,
            root,
            diagnostics,
            end: parsed.end,
        })
    }
}

/// Result of a parse: the token tree, its source and what went wrong along the way
#[derive(Debug, Clone)]
pub struct ParsedDocument {
    pub source: String,
    pub tree: SyntaxTree,
    pub root: NodeId,
    pub diagnostics: Vec<Diagnostic>,
    /// `Stalled` only when the nesting limit cut the top level short
    pub end: ParseEnd,
}

impl ParsedDocument {
    /// Top-level tokens
    pub fn tokens(&self) -> impl Iterator<Item = (NodeId, &Token)> + '_ {
        self.tree
            .children(self.root)
            .iter()
            .map(move |id| (*id, self.tree.get(*id)))
    }

    /// Normalized source text of the whole document
    pub fn reconstruct(&self) -> String {
        text::reconstruct(&self.tree, self.root)
    }

    pub fn range(&self, id: NodeId) -> Option<Range> {
        self.tree
            .span(id)
            .map(|span| Range::from_span(&self.source, span))
    }

    /// Source text covered by a token
    pub fn text(&self, id: NodeId) -> Option<&str> {
        self.tree.span(id).and_then(|span| self.source.get(span))
    }

    pub fn snapshot(&self) -> TokenSnapshot {
        snapshot_token(&self.tree, self.root)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tex::definitions::{CommandDefinition, Package};
    use crate::tex::diagnostics::{Collect, DiagnosticKind};
    use crate::tex::token::TokenKind;

    #[test]
    fn test_parse_with_builtins() {
        let doc = DocumentLoader::from_string(r"\emph{x} y").parse().unwrap();
        assert!(doc.diagnostics.is_empty());
        assert_eq!(doc.end, ParseEnd::EndOfInput);
        assert_eq!(doc.tree.get(doc.root).length, Some(10));
        let kinds: Vec<_> = doc.tokens().map(|(_, t)| t.kind_name()).collect();
        assert_eq!(kinds, vec!["command", "space", "symbol"]);
    }

    #[test]
    fn test_diagnostics_reach_sink() {
        let mut sink = Collect::default();
        let doc = DocumentLoader::from_string(r"a \nosuch b")
            .parse_with_sink(&mut sink)
            .unwrap();
        assert_eq!(sink.diagnostics, doc.diagnostics);
        assert_eq!(sink.diagnostics.len(), 1);
        assert_eq!(sink.diagnostics[0].kind, DiagnosticKind::UnknownCommand);
        assert_eq!(sink.diagnostics[0].offset, 2);
    }

    #[test]
    fn test_custom_registry() {
        let mut registry = Registry::new();
        registry
            .load(
                "mini",
                Package::new().with_command(CommandDefinition::new("hi", "{#1}").unwrap()),
            )
            .unwrap();
        let doc = DocumentLoader::from_string(r"\hi{there}\emph{x}")
            .with_registry(registry)
            .parse()
            .unwrap();
        let (first, token) = doc.tokens().next().unwrap();
        assert!(token.is_recognized());
        assert_eq!(doc.text(first), Some(r"\hi{there}"));
        assert_eq!(doc.diagnostics.len(), 1);
    }

    #[test]
    fn test_unknown_configured_package() {
        let mut config = ParserConfig::default();
        config.packages.push("nonexistent".to_string());
        let err = DocumentLoader::from_string("x")
            .with_config(config)
            .parse()
            .unwrap_err();
        assert!(matches!(err, LoaderError::Definitions(_)));
    }

    #[test]
    fn test_range_of_token() {
        let doc = DocumentLoader::from_string("a\n\\par").parse().unwrap();
        let (id, token) = doc.tokens().last().unwrap();
        assert!(matches!(token.kind, TokenKind::Command { .. }));
        let range = doc.range(id).unwrap();
        assert_eq!(range.span, 2..6);
        assert_eq!(range.start.line, 2);
    }
}
