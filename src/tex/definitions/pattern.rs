//! Definition patterns
//!
//!     A pattern is the text a definition matches, written in a small template language:
//!
//!         #1 .. #9    parameter slot
//!         ##          a literal '#'
//!         ' '         whitespace placeholder (spaces, tabs and comments; may match nothing)
//!         anything    literal text
//!
//!     A slot immediately followed by literal text takes the start of that text as its closing
//!     label: the sub-parse for the parameter stops there. The label is the literal up to, but
//!     excluding, the next opening bracket after its first character, so in `{#1}{#2}` the first
//!     slot closes on `}` and not on `}{`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Component {
    Literal(String),
    Parameter {
        index: usize,
        closing: Option<String>,
    },
    Whitespace,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatternError {
    Empty,
    /// A `#` not followed by a digit 1-9 or another `#`
    MalformedSlot { position: usize },
    DuplicateSlot { index: usize },
}

impl fmt::Display for PatternError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PatternError::Empty => write!(f, "pattern is empty"),
            PatternError::MalformedSlot { position } => {
                write!(f, "malformed parameter slot at byte {position}")
            }
            PatternError::DuplicateSlot { index } => {
                write!(f, "parameter slot #{index} appears more than once")
            }
        }
    }
}

impl std::error::Error for PatternError {}

/// Parsed template of a symbol, command or environment
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Pattern {
    source: String,
    components: Vec<Component>,
}

impl Pattern {
    /// Parse a template. The empty template is accepted (commands without arguments); callers
    /// that need a non-empty one check [`Pattern::is_empty`].
    pub fn parse(source: &str) -> Result<Self, PatternError> {
        let mut components = Vec::new();
        let mut literal = String::new();
        let mut seen = [false; 10];
        let mut chars = source.char_indices().peekable();

        while let Some((position, c)) = chars.next() {
            match c {
                '#' => match chars.next() {
                    Some((_, '#')) => literal.push('#'),
                    Some((_, digit @ '1'..='9')) => {
                        let index = digit as usize - '0' as usize;
                        if seen[index] {
                            return Err(PatternError::DuplicateSlot { index });
                        }
                        seen[index] = true;
                        flush(&mut literal, &mut components);
                        components.push(Component::Parameter {
                            index,
                            closing: None,
                        });
                    }
                    _ => return Err(PatternError::MalformedSlot { position }),
                },
                ' ' => {
                    flush(&mut literal, &mut components);
                    while chars.next_if(|(_, c)| *c == ' ').is_some() {}
                    components.push(Component::Whitespace);
                }
                other => literal.push(other),
            }
        }
        flush(&mut literal, &mut components);

        for i in 1..components.len() {
            let label = match &components[i] {
                Component::Literal(text) => closing_label(text),
                _ => continue,
            };
            if let Component::Parameter { closing, .. } = &mut components[i - 1] {
                *closing = Some(label);
            }
        }

        Ok(Self {
            source: source.to_string(),
            components,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn components(&self) -> &[Component] {
        &self.components
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// First character of the template when it opens with literal text
    pub fn first_char(&self) -> Option<char> {
        match self.components.first() {
            Some(Component::Literal(text)) => text.chars().next(),
            _ => None,
        }
    }

    /// Bytes of literal text; longer literals make a more specific pattern
    pub fn literal_len(&self) -> usize {
        self.components
            .iter()
            .map(|c| match c {
                Component::Literal(text) => text.len(),
                _ => 0,
            })
            .sum()
    }

    /// Highest slot index used
    pub fn arity(&self) -> usize {
        self.components
            .iter()
            .filter_map(|c| match c {
                Component::Parameter { index, .. } => Some(*index),
                _ => None,
            })
            .max()
            .unwrap_or(0)
    }
}

fn flush(literal: &mut String, components: &mut Vec<Component>) {
    if !literal.is_empty() {
        components.push(Component::Literal(std::mem::take(literal)));
    }
}

fn closing_label(text: &str) -> String {
    let cut = text
        .char_indices()
        .skip(1)
        .find(|(_, c)| matches!(c, '{' | '[' | '('))
        .map_or(text.len(), |(i, _)| i);
    text[..cut].to_string()
}

impl FromStr for Pattern {
    type Err = PatternError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Pattern::parse(s)
    }
}

impl TryFrom<String> for Pattern {
    type Error = PatternError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Pattern::parse(&value)
    }
}

impl From<Pattern> for String {
    fn from(pattern: Pattern) -> Self {
        pattern.source
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn literal(text: &str) -> Component {
        Component::Literal(text.to_string())
    }

    fn slot(index: usize, closing: Option<&str>) -> Component {
        Component::Parameter {
            index,
            closing: closing.map(str::to_string),
        }
    }

    #[test]
    fn test_plain_literal() {
        let pattern = Pattern::parse("---").unwrap();
        assert_eq!(pattern.components(), &[literal("---")]);
        assert_eq!(pattern.first_char(), Some('-'));
        assert_eq!(pattern.literal_len(), 3);
        assert_eq!(pattern.arity(), 0);
    }

    #[test]
    fn test_slot_closing_labels() {
        let pattern = Pattern::parse("{#1}{#2}").unwrap();
        assert_eq!(
            pattern.components(),
            &[
                literal("{"),
                slot(1, Some("}")),
                literal("}{"),
                slot(2, Some("}")),
                literal("}"),
            ]
        );
        assert_eq!(pattern.arity(), 2);
    }

    #[test]
    fn test_trailing_slot_has_no_label() {
        let pattern = Pattern::parse("#1#2").unwrap();
        assert_eq!(pattern.components(), &[slot(1, None), slot(2, None)]);
    }

    #[test]
    fn test_whitespace_placeholder_and_escape() {
        let pattern = Pattern::parse("[#1]  ##").unwrap();
        assert_eq!(
            pattern.components(),
            &[
                literal("["),
                slot(1, Some("]")),
                literal("]"),
                Component::Whitespace,
                literal("#"),
            ]
        );
    }

    #[test]
    fn test_malformed_slots() {
        assert_eq!(
            Pattern::parse("ab#x"),
            Err(PatternError::MalformedSlot { position: 2 })
        );
        assert_eq!(
            Pattern::parse("#"),
            Err(PatternError::MalformedSlot { position: 0 })
        );
        assert_eq!(
            Pattern::parse("#1#1"),
            Err(PatternError::DuplicateSlot { index: 1 })
        );
    }

    #[test]
    fn test_empty_template_is_allowed() {
        let pattern = Pattern::parse("").unwrap();
        assert!(pattern.is_empty());
        assert_eq!(pattern.first_char(), None);
    }

    #[test]
    fn test_serde_uses_source_text() {
        let pattern: Pattern = serde_json::from_str("\"$#1$\"").unwrap();
        assert_eq!(pattern.components()[1], slot(1, Some("$")));
        assert_eq!(serde_json::to_string(&pattern).unwrap(), "\"$#1$\"");
        assert!(serde_json::from_str::<Pattern>("\"#0\"").is_err());
    }
}
