//! Token snapshot - a normalized, serializable view of a syntax tree
//!
//! A [`TokenSnapshot`] flattens each token into its kind name, a short label and its absolute
//! span, so tests and tools can compare trees without caring about arena ids, shifts or
//! shared definitions. [`TokenSnapshot::render`] prints one line per token:
//!
//! ```text
//! document  @0+8
//!   command \emph @0+8
//!     parameter #1 braced @5+3
//!       symbol 'I' @6+1
//! ```

use crate::tex::token::{CommandHead, SyntaxTree, TokenKind};
use crate::tex::tree::NodeId;
use serde::{Deserialize, Serialize};
use std::fmt::Write;
use std::ops::Range;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenSnapshot {
    /// Kind name, as given by `Token::kind_name`
    pub kind: String,
    pub label: String,
    /// `None` for tokens that never completed
    pub span: Option<Range<usize>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<TokenSnapshot>,
}

impl TokenSnapshot {
    /// One line per token, children indented by two spaces
    pub fn render(&self) -> String {
        let mut out = String::new();
        self.render_into(&mut out, 0);
        out
    }

    fn render_into(&self, out: &mut String, indent: usize) {
        let span = match &self.span {
            Some(span) => format!("@{}+{}", span.start, span.len()),
            None => "@?".to_string(),
        };
        let _ = writeln!(out, "{:indent$}{} {} {}", "", self.kind, self.label, span);
        for child in &self.children {
            child.render_into(out, indent + 2);
        }
    }

    /// Kind names in pre-order
    pub fn kinds(&self) -> Vec<&str> {
        let mut kinds = vec![self.kind.as_str()];
        for child in &self.children {
            kinds.extend(child.kinds());
        }
        kinds
    }
}

/// Snapshot a token and everything below it
pub fn snapshot_token(tree: &SyntaxTree, id: NodeId) -> TokenSnapshot {
    let token = tree.get(id);
    TokenSnapshot {
        kind: token.kind_name().to_string(),
        label: label(&token.kind),
        span: tree.span(id),
        children: tree
            .children(id)
            .iter()
            .map(|child| snapshot_token(tree, *child))
            .collect(),
    }
}

fn label(kind: &TokenKind) -> String {
    match kind {
        TokenKind::Document => String::new(),
        TokenKind::Space { line_breaks } if *line_breaks >= 2 => "paragraph".to_string(),
        TokenKind::Space { .. } => "inline".to_string(),
        TokenKind::Symbol {
            definition: Some(definition),
            ..
        } => definition.name.clone(),
        TokenKind::Symbol { text, .. } => format!("{:?}", text.chars().next().unwrap_or(' ')),
        TokenKind::Command {
            name,
            head,
            definition,
        } => {
            let mut label = match head {
                CommandHead::Control => format!("\\{name}"),
                CommandHead::Begin => format!("\\begin{{{name}}}"),
                CommandHead::End => format!("\\end{{{name}}}"),
            };
            if definition.is_none() {
                label.push_str(" unknown");
            }
            label
        }
        TokenKind::Parameter {
            index,
            brackets,
            verbatim,
        } => {
            let mut label = format!("#{index}");
            if *brackets {
                label.push_str(" braced");
            }
            if *verbatim {
                label.push_str(" verbatim");
            }
            label
        }
        TokenKind::Environment { name, definition } => match definition {
            Some(_) => name.clone(),
            None => format!("{name} unknown"),
        },
        TokenKind::EnvironmentBody => String::new(),
        TokenKind::Source { text } => format!("{text:?}"),
    }
}
