//! Tokens of the syntax tree
//!
//!     A parse produces a [`SyntaxTree`]: a [`Tree`] whose payloads are [`Token`]s. Tokens do
//!     not store absolute offsets. Each stores its `length` and its `shift`, the gap between the
//!     end of its previous sibling (or the start of its parent, for a first child) and its own
//!     start. The absolute offset of any token is recovered by walking the tree:
//!
//!         offset(t) = offset(parent) + sum(shift + length of earlier siblings) + shift(t)
//!
//!     Gaps hold source text no token covers: pattern literals such as the brackets around an
//!     optional argument, whitespace skipped before an argument, and comments. Editing a tree
//!     therefore only touches the siblings next to the edit (see [`SyntaxTree::remove_token`]),
//!     never the offsets of unrelated tokens.
//!
//!     [`text::reconstruct`] renders a token back into normalized source text.

pub mod text;

use crate::tex::definitions::{CommandDefinition, EnvironmentDefinition, SymbolDefinition};
use crate::tex::tree::{NodeId, Tree};
use std::ops::Range;
use std::sync::Arc;

pub type SyntaxTree = Tree<Token>;

/// Which marker of a control sequence a command token stands for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandHead {
    /// `\name`
    Control,
    /// `\begin{name}`
    Begin,
    /// `\end{name}`
    End,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    /// Root of a parsed document
    Document,
    /// A run of whitespace; two or more line breaks separate paragraphs
    Space { line_breaks: usize },
    /// `definition` is `None` for a character no symbol matched, `text` holds that character;
    /// otherwise `text` is the definition name
    Symbol {
        definition: Option<Arc<SymbolDefinition>>,
        text: String,
    },
    /// `definition` is `None` when no candidate matched
    Command {
        name: String,
        head: CommandHead,
        definition: Option<Arc<CommandDefinition>>,
    },
    /// Argument of a symbol or command; `brackets` when it was written in braces
    Parameter {
        index: usize,
        brackets: bool,
        verbatim: bool,
    },
    Environment {
        name: String,
        definition: Option<Arc<EnvironmentDefinition>>,
    },
    EnvironmentBody,
    /// Raw source read without parsing
    Source { text: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    /// Source bytes covered; `None` until the token is complete
    pub length: Option<usize>,
    /// Gap in bytes between the previous sibling's end (or the parent's start) and this token
    pub shift: usize,
}

impl Token {
    pub fn new(kind: TokenKind) -> Self {
        Self {
            kind,
            length: None,
            shift: 0,
        }
    }

    /// Short lowercase name of the token kind
    pub fn kind_name(&self) -> &'static str {
        match &self.kind {
            TokenKind::Document => "document",
            TokenKind::Space { .. } => "space",
            TokenKind::Symbol { .. } => "symbol",
            TokenKind::Command { .. } => "command",
            TokenKind::Parameter { .. } => "parameter",
            TokenKind::Environment { .. } => "environment",
            TokenKind::EnvironmentBody => "body",
            TokenKind::Source { .. } => "source",
        }
    }

    /// False for symbols, commands and environments no definition matched
    pub fn is_recognized(&self) -> bool {
        match &self.kind {
            TokenKind::Symbol { definition, .. } => definition.is_some(),
            TokenKind::Command { definition, .. } => definition.is_some(),
            TokenKind::Environment { definition, .. } => definition.is_some(),
            _ => true,
        }
    }

    pub fn is_paragraph_break(&self) -> bool {
        matches!(self.kind, TokenKind::Space { line_breaks } if line_breaks >= 2)
    }

    /// Distance from the start of the gap before this token to its end
    fn extent(&self) -> usize {
        self.shift + self.length.unwrap_or(0)
    }
}

impl SyntaxTree {
    /// Absolute byte offset of a token, `None` when it or an ancestor is still incomplete.
    ///
    /// Detached tokens are measured from the top of their own subtree.
    pub fn absolute_offset(&self, id: NodeId) -> Option<usize> {
        let mut offset = self.get(id).shift;
        let mut cursor = id;
        while let Some(parent) = self.parent(cursor) {
            for sibling in self.children(parent) {
                if *sibling == cursor {
                    break;
                }
                let token = self.get(*sibling);
                offset += token.shift + token.length?;
            }
            offset += self.get(parent).shift;
            cursor = parent;
        }
        Some(offset)
    }

    /// Byte span of a complete token
    pub fn span(&self, id: NodeId) -> Option<Range<usize>> {
        let start = self.absolute_offset(id)?;
        Some(start..start + self.get(id).length?)
    }

    /// Remove a token with its subtree, folding its extent into the next sibling's shift so
    /// every remaining token keeps its absolute offset.
    pub fn remove_token(&mut self, parent: NodeId, child: NodeId) -> Option<NodeId> {
        let index = self.child_index_of(parent, child)?;
        let extent = self.get(child).extent();
        let removed = self.remove_subtree(parent, index)?;
        if let Some(next) = self.child_at(parent, index) {
            self.get_mut(next).shift += extent;
        }
        Some(removed)
    }

    /// Remove a single token, promoting its children into its place with shifts adjusted so
    /// the promoted tokens and the following sibling keep their absolute offsets.
    pub fn unwrap_token(&mut self, parent: NodeId, child: NodeId) -> Option<NodeId> {
        let index = self.child_index_of(parent, child)?;
        let token = self.get(child).clone();
        let promoted = self.children(child).to_vec();
        let covered: usize = promoted.iter().map(|id| self.get(*id).extent()).sum();
        let trailing = token.length.unwrap_or(0).saturating_sub(covered);

        let removed = self.remove_child(parent, index)?;
        if let Some(first) = promoted.first() {
            self.get_mut(*first).shift += token.shift;
        }
        let next_index = index + promoted.len();
        let carried = if promoted.is_empty() {
            token.extent()
        } else {
            trailing
        };
        if let Some(next) = self.child_at(parent, next_index) {
            self.get_mut(next).shift += carried;
        }
        Some(removed)
    }

    /// Tokens under `id` in document order, `id` first
    pub fn tokens(&self, id: NodeId) -> impl Iterator<Item = (NodeId, &Token)> + '_ {
        self.descendants(id).map(move |node| (node, self.get(node)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn space(shift: usize, length: usize) -> Token {
        Token {
            kind: TokenKind::Space { line_breaks: 0 },
            length: Some(length),
            shift,
        }
    }

    fn source(text: &str, shift: usize) -> Token {
        Token {
            kind: TokenKind::Source {
                text: text.to_string(),
            },
            length: Some(text.len()),
            shift,
        }
    }

    // "ab [cd] ef"
    //  root
    //  ├── "ab"        0..2
    //  ├── param      4..6 (shift 2 for " [")
    //  │   └── "cd"   4..6
    //  └── "ef"       8..10 (shift 2 for "] ")
    fn sample() -> (SyntaxTree, [NodeId; 4]) {
        let mut tree = SyntaxTree::new(Token {
            kind: TokenKind::Document,
            length: Some(10),
            shift: 0,
        });
        let root = tree.root();
        let ab = tree.create(source("ab", 0));
        let param = tree.create(Token {
            kind: TokenKind::Parameter {
                index: 1,
                brackets: false,
                verbatim: false,
            },
            length: Some(2),
            shift: 2,
        });
        let cd = tree.create(source("cd", 0));
        let ef = tree.create(source("ef", 2));
        tree.insert_child(root, ab, None, 0);
        tree.insert_child(param, cd, None, 0);
        tree.insert_subtree(root, param, None);
        tree.insert_child(root, ef, None, 0);
        (tree, [ab, param, cd, ef])
    }

    #[test]
    fn test_absolute_offsets_from_shifts() {
        let (tree, [ab, param, cd, ef]) = sample();
        assert_eq!(tree.span(ab), Some(0..2));
        assert_eq!(tree.span(param), Some(4..6));
        assert_eq!(tree.span(cd), Some(4..6));
        assert_eq!(tree.span(ef), Some(8..10));
    }

    #[test]
    fn test_incomplete_sibling_hides_offsets() {
        let (mut tree, [ab, _, _, ef]) = sample();
        tree.get_mut(ab).length = None;
        assert_eq!(tree.absolute_offset(ab), Some(0));
        assert_eq!(tree.absolute_offset(ef), None);
    }

    #[test]
    fn test_remove_token_keeps_following_offsets() {
        let (mut tree, [_, param, _, ef]) = sample();
        let root = tree.root();
        assert_eq!(tree.remove_token(root, param), Some(param));
        assert_eq!(tree.span(ef), Some(8..10));
        assert_eq!(tree.children(root).len(), 2);
        tree.verify().unwrap();
    }

    #[test]
    fn test_unwrap_token_keeps_offsets() {
        let (mut tree, [ab, param, cd, ef]) = sample();
        let root = tree.root();
        assert_eq!(tree.unwrap_token(root, param), Some(param));
        assert_eq!(tree.children(root), &[ab, cd, ef]);
        assert_eq!(tree.span(cd), Some(4..6));
        assert_eq!(tree.span(ef), Some(8..10));
    }

    #[test]
    fn test_unwrap_childless_token_folds_extent() {
        let mut tree = SyntaxTree::new(Token::new(TokenKind::Document));
        let root = tree.root();
        let a = tree.create(space(1, 3));
        let b = tree.create(space(2, 1));
        tree.insert_child(root, a, None, 0);
        tree.insert_child(root, b, None, 0);
        tree.unwrap_token(root, a);
        assert_eq!(tree.span(b), Some(6..7));
    }

    #[test]
    fn test_recognition() {
        let unknown = Token::new(TokenKind::Command {
            name: "foo".into(),
            head: CommandHead::Control,
            definition: None,
        });
        assert!(!unknown.is_recognized());
        assert_eq!(unknown.kind_name(), "command");
        assert!(Token::new(TokenKind::Space { line_breaks: 2 }).is_paragraph_break());
        assert!(!Token::new(TokenKind::Space { line_breaks: 1 }).is_paragraph_break());
    }
}
