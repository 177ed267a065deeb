//! Testing utilities for token-tree assertions
//!
//!     Parser tests compare whole trees, not single fields. Two rules keep them readable:
//!
//!         1. Build the vocabulary a test relies on explicitly, either the built-in `latex`
//!            package or a small YAML package written inline with [registry_from_yaml]. A test
//!            whose outcome depends on a definition should show that definition.
//!         2. Assert on the [snapshot](crate::tex::snapshot) rendering (usually through an
//!            `insta` inline snapshot) or on [child_kinds] / [collect_kinds], never on arena
//!            ids or shifts.
//!
//!     Examples:
//!
//!     ```rust,ignore
//!     use tex_parser::tex::testing::{parse_source, registry_from_yaml, parse_with};
//!
//!     let doc = parse_source(r"\emph{x}");
//!     insta::assert_snapshot!(doc.snapshot().render(), @"...");
//!
//!     let registry = registry_from_yaml("commands: [{ name: hi, pattern: '#1' }]");
//!     let doc = parse_with(registry, r"\hi x");
//!     ```
//!
//!     These helpers panic on setup errors: a broken fixture is a broken test.

use crate::tex::definitions::{Package, Registry};
use crate::tex::diagnostics::DiagnosticKind;
use crate::tex::loader::{DocumentLoader, ParsedDocument};
use crate::tex::token::TokenKind;
use crate::tex::tree::NodeId;

/// Registry holding one package, named `test`, read from YAML
pub fn registry_from_yaml(yaml: &str) -> Registry {
    let package = Package::from_yaml(yaml)
        .unwrap_or_else(|err| panic!("test package does not load: {err}"));
    let mut registry = Registry::new();
    registry
        .load("test", package)
        .unwrap_or_else(|err| panic!("test package does not register: {err}"));
    registry
}

/// Parse with the default configuration and built-in packages
pub fn parse_source(source: &str) -> ParsedDocument {
    DocumentLoader::from_string(source)
        .parse()
        .unwrap_or_else(|err| panic!("built-in packages do not load: {err}"))
}

/// Parse with an explicit registry
pub fn parse_with(registry: Registry, source: &str) -> ParsedDocument {
    DocumentLoader::from_string(source)
        .with_registry(registry)
        .parse()
        .unwrap_or_else(|err| panic!("parse setup failed: {err}"))
}

/// Kind names of the direct children of a token
pub fn child_kinds(doc: &ParsedDocument, id: NodeId) -> Vec<&'static str> {
    doc.tree
        .children(id)
        .iter()
        .map(|child| doc.tree.get(*child).kind_name())
        .collect()
}

/// Kind names of every token below `id`, pre-order
pub fn collect_kinds(doc: &ParsedDocument, id: NodeId) -> Vec<&'static str> {
    doc.tree
        .descendants(id)
        .skip(1)
        .map(|node| doc.tree.get(node).kind_name())
        .collect()
}

pub fn diagnostic_kinds(doc: &ParsedDocument) -> Vec<DiagnosticKind> {
    doc.diagnostics.iter().map(|d| d.kind).collect()
}

/// First token below `id` (pre-order) satisfying `predicate`
pub fn find_token(
    doc: &ParsedDocument,
    id: NodeId,
    predicate: impl Fn(&TokenKind) -> bool,
) -> Option<NodeId> {
    doc.tree
        .descendants(id)
        .find(|node| predicate(&doc.tree.get(*node).kind))
}

/// Check that every token's span lies within its parent's and that siblings do not overlap
pub fn assert_spans_nested(doc: &ParsedDocument) {
    for node in doc.tree.descendants(doc.root) {
        let Some(span) = doc.tree.span(node) else {
            panic!("token {node} has no span");
        };
        assert!(span.end <= doc.source.len(), "token {node} ends past the source");
        let mut previous_end = span.start;
        for &child in doc.tree.children(node) {
            let Some(child_span) = doc.tree.span(child) else {
                panic!("token {child} has no span");
            };
            assert!(
                child_span.start >= previous_end && child_span.end <= span.end,
                "token {child} at {child_span:?} escapes {previous_end}..{}",
                span.end
            );
            previous_end = child_span.end;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_from_yaml() {
        let registry = registry_from_yaml("commands:\n  - { name: hi, pattern: '#1' }\n");
        assert!(registry.is_loaded("test"));
        let doc = parse_with(registry, r"\hi x");
        assert_eq!(child_kinds(&doc, doc.root), vec!["command"]);
        assert_eq!(
            collect_kinds(&doc, doc.root),
            vec!["command", "parameter", "symbol"]
        );
        assert_spans_nested(&doc);
    }

    #[test]
    fn test_find_token() {
        let doc = parse_source(r"a \nosuch");
        let found = find_token(&doc, doc.root, |kind| {
            matches!(kind, TokenKind::Command { .. })
        });
        assert_eq!(doc.text(found.unwrap()), Some(r"\nosuch"));
        assert_eq!(diagnostic_kinds(&doc), vec![DiagnosticKind::UnknownCommand]);
    }
}
