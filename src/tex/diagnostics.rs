//! Parse diagnostics
//!
//! Parsing never fails outright. Input the vocabulary does not cover, or structure that does not
//! close, is recorded as a [`Diagnostic`] and the parse carries on with a fallback token.
//!
//! ## Delivery
//!
//! Diagnostics are buffered alongside the tree while parsing. A diagnostic raised inside an
//! alternative that is later abandoned is discarded with it, so only diagnostics describing the
//! final tree survive. Once the parse completes they are handed, in source order of discovery,
//! to a [`DiagnosticSink`]. The default sink methods log through the `log` crate and continue.
//!
//! ## Kinds
//!
//! - Unknown symbol: a character with symbol candidates of which none matched
//! - Unknown command: a control sequence with no matching definition
//! - Unknown environment: `\begin{name}` for an undefined name
//! - Unterminated environment: the body reached the end of its input without `\end{name}`
//! - Unbalanced group: a directive closed a group that was never opened
//! - Nesting too deep: the parse exceeded the configured depth limit

use super::range::Position;
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum DiagnosticKind {
    UnknownSymbol,
    UnknownCommand,
    UnknownEnvironment,
    UnterminatedEnvironment,
    UnbalancedGroup,
    NestingTooDeep,
}

impl DiagnosticKind {
    pub fn code(self) -> &'static str {
        match self {
            DiagnosticKind::UnknownSymbol => "unknown-symbol",
            DiagnosticKind::UnknownCommand => "unknown-command",
            DiagnosticKind::UnknownEnvironment => "unknown-environment",
            DiagnosticKind::UnterminatedEnvironment => "unterminated-environment",
            DiagnosticKind::UnbalancedGroup => "unbalanced-group",
            DiagnosticKind::NestingTooDeep => "nesting-too-deep",
        }
    }

    pub fn severity(self) -> DiagnosticSeverity {
        match self {
            DiagnosticKind::UnknownSymbol
            | DiagnosticKind::UnknownCommand
            | DiagnosticKind::UnknownEnvironment => DiagnosticSeverity::Warning,
            DiagnosticKind::UnterminatedEnvironment
            | DiagnosticKind::UnbalancedGroup
            | DiagnosticKind::NestingTooDeep => DiagnosticSeverity::Error,
        }
    }
}

/// Diagnostic severity levels matching LSP protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticSeverity {
    Error,
    Warning,
    Information,
    Hint,
}

impl fmt::Display for DiagnosticSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiagnosticSeverity::Error => write!(f, "error"),
            DiagnosticSeverity::Warning => write!(f, "warning"),
            DiagnosticSeverity::Information => write!(f, "info"),
            DiagnosticSeverity::Hint => write!(f, "hint"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub severity: DiagnosticSeverity,
    /// Byte offset the problem starts at
    pub offset: usize,
    pub position: Position,
    /// The offending text: a character, a command or environment name
    pub text: String,
}

impl Diagnostic {
    /// Diagnostic at `offset` of `source`, positioned and with the kind's default severity
    pub fn at(kind: DiagnosticKind, source: &str, offset: usize, text: impl Into<String>) -> Self {
        Self {
            kind,
            severity: kind.severity(),
            offset,
            position: Position::of(source, offset),
            text: text.into(),
        }
    }

    pub fn with_severity(mut self, severity: DiagnosticSeverity) -> Self {
        self.severity = severity;
        self
    }

    pub fn message(&self) -> String {
        match self.kind {
            DiagnosticKind::UnknownSymbol => format!("unrecognized symbol '{}'", self.text),
            DiagnosticKind::UnknownCommand => format!("unknown command '\\{}'", self.text),
            DiagnosticKind::UnknownEnvironment => format!("unknown environment '{}'", self.text),
            DiagnosticKind::UnterminatedEnvironment => {
                format!("environment '{}' is never closed", self.text)
            }
            DiagnosticKind::UnbalancedGroup => {
                format!("'{}' closes a group that was never opened", self.text)
            }
            DiagnosticKind::NestingTooDeep => {
                format!("nesting deeper than {} levels", self.text)
            }
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [{}]: {} at {}",
            self.severity,
            self.kind.code(),
            self.message(),
            self.position
        )
    }
}

/// Receiver of the diagnostics of a parse.
///
/// Every method has a default that logs the diagnostic and carries on; implementors override
/// the ones they care about. [`DiagnosticSink::report`] routes a diagnostic to the matching
/// callback.
pub trait DiagnosticSink {
    fn on_unknown_symbol(&mut self, diagnostic: &Diagnostic) {
        log::warn!(target: "tex.diagnostics", "{diagnostic}");
    }

    fn on_unknown_command(&mut self, diagnostic: &Diagnostic) {
        log::warn!(target: "tex.diagnostics", "{diagnostic}");
    }

    fn on_unknown_environment(&mut self, diagnostic: &Diagnostic) {
        log::warn!(target: "tex.diagnostics", "{diagnostic}");
    }

    /// Unterminated environments, unbalanced groups and nesting overflows
    fn on_structure_error(&mut self, diagnostic: &Diagnostic) {
        log::error!(target: "tex.diagnostics", "{diagnostic}");
    }

    fn report(&mut self, diagnostic: &Diagnostic) {
        match diagnostic.kind {
            DiagnosticKind::UnknownSymbol => self.on_unknown_symbol(diagnostic),
            DiagnosticKind::UnknownCommand => self.on_unknown_command(diagnostic),
            DiagnosticKind::UnknownEnvironment => self.on_unknown_environment(diagnostic),
            DiagnosticKind::UnterminatedEnvironment
            | DiagnosticKind::UnbalancedGroup
            | DiagnosticKind::NestingTooDeep => self.on_structure_error(diagnostic),
        }
    }
}

/// Sink using only the logging defaults
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

impl DiagnosticSink for LogSink {}

/// Sink that keeps every diagnostic
#[derive(Debug, Clone, Default)]
pub struct Collect {
    pub diagnostics: Vec<Diagnostic>,
}

impl DiagnosticSink for Collect {
    fn report(&mut self, diagnostic: &Diagnostic) {
        self.diagnostics.push(diagnostic.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_format() {
        let diagnostic = Diagnostic::at(DiagnosticKind::UnknownCommand, "ab\n \\foo", 4, "foo");
        assert_eq!(diagnostic.position, Position::new(2, 2));
        assert_eq!(
            diagnostic.to_string(),
            "warning [unknown-command]: unknown command '\\foo' at 2:2"
        );
    }

    #[test]
    fn test_report_routes_by_kind() {
        #[derive(Default)]
        struct Counting {
            unknown: usize,
            structure: usize,
        }
        impl DiagnosticSink for Counting {
            fn on_unknown_symbol(&mut self, _: &Diagnostic) {
                self.unknown += 1;
            }
            fn on_structure_error(&mut self, _: &Diagnostic) {
                self.structure += 1;
            }
        }

        let mut sink = Counting::default();
        sink.report(&Diagnostic::at(DiagnosticKind::UnknownSymbol, "{", 0, "{"));
        sink.report(&Diagnostic::at(DiagnosticKind::NestingTooDeep, "", 0, "8"));
        sink.report(&Diagnostic::at(DiagnosticKind::UnbalancedGroup, "", 0, "x"));
        // falls through to the logging default
        sink.report(&Diagnostic::at(DiagnosticKind::UnknownCommand, "\\x", 0, "x"));
        assert_eq!((sink.unknown, sink.structure), (1, 2));
    }

    #[test]
    fn test_collect_keeps_order() {
        let mut sink = Collect::default();
        sink.report(&Diagnostic::at(DiagnosticKind::UnknownEnvironment, "", 0, "a"));
        sink.report(&Diagnostic::at(DiagnosticKind::UnknownCommand, "", 0, "b"));
        let texts: Vec<_> = sink.diagnostics.iter().map(|d| d.text.as_str()).collect();
        assert_eq!(texts, vec!["a", "b"]);
    }
}
