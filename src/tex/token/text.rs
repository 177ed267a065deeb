//! Normalized source text
//!
//! [`reconstruct`] renders a token and its subtree back into LaTeX source. The output is the
//! normalized form of the input: comments are dropped, a whitespace run becomes a single space
//! (or a blank line when it separated paragraphs), and skipped argument whitespace disappears.
//! Parsing the output again yields the same token structure.

use super::{CommandHead, SyntaxTree, TokenKind};
use crate::tex::definitions::{Component, Pattern};
use crate::tex::tree::NodeId;

pub fn reconstruct(tree: &SyntaxTree, id: NodeId) -> String {
    let mut writer = Writer::default();
    write_token(tree, id, &mut writer);
    writer.out
}

/// Output buffer that keeps a control word from running into following letters
#[derive(Default)]
struct Writer {
    out: String,
    after_control_word: bool,
}

impl Writer {
    fn text(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        if self.after_control_word && text.starts_with(is_letter) {
            self.out.push(' ');
        }
        self.after_control_word = false;
        self.out.push_str(text);
    }

    fn control(&mut self, name: &str) {
        self.text("\\");
        self.out.push_str(name);
        self.after_control_word = !name.is_empty() && name.chars().all(is_letter);
    }
}

fn is_letter(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '@'
}

fn write_children(tree: &SyntaxTree, id: NodeId, writer: &mut Writer) {
    for child in tree.children(id) {
        write_token(tree, *child, writer);
    }
}

fn write_token(tree: &SyntaxTree, id: NodeId, writer: &mut Writer) {
    match &tree.get(id).kind {
        TokenKind::Document | TokenKind::Environment { .. } | TokenKind::EnvironmentBody => {
            write_children(tree, id, writer)
        }
        TokenKind::Space { line_breaks } => {
            writer.text(if *line_breaks >= 2 { "\n\n" } else { " " })
        }
        TokenKind::Source { text } => writer.text(text),
        TokenKind::Symbol {
            definition: Some(definition),
            ..
        } => write_pattern(tree, id, &definition.pattern, writer),
        TokenKind::Symbol {
            definition: None,
            text,
        } => writer.text(text),
        TokenKind::Command {
            name,
            head,
            definition,
        } => {
            match head {
                CommandHead::Control => writer.control(name),
                CommandHead::Begin => writer.text(&format!("\\begin{{{name}}}")),
                CommandHead::End => writer.text(&format!("\\end{{{name}}}")),
            }
            if let Some(definition) = definition {
                write_pattern(tree, id, &definition.pattern, writer);
            }
        }
        TokenKind::Parameter { brackets, .. } => {
            if *brackets {
                writer.text("{");
            }
            write_children(tree, id, writer);
            if *brackets {
                writer.text("}");
            }
        }
    }
}

fn write_pattern(tree: &SyntaxTree, id: NodeId, pattern: &Pattern, writer: &mut Writer) {
    for component in pattern.components() {
        match component {
            Component::Literal(text) => writer.text(text),
            Component::Whitespace => {}
            Component::Parameter { index, .. } => {
                let argument = tree.children(id).iter().find(|child| {
                    matches!(tree.get(**child).kind, TokenKind::Parameter { index: i, .. } if i == *index)
                });
                if let Some(argument) = argument {
                    write_token(tree, *argument, writer);
                }
            }
        }
    }
}
