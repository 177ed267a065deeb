//! Definitions: the vocabulary a parse recognises
//!
//!     Three kinds of definitions drive dispatch:
//!
//!         - [`SymbolDefinition`]: literal-led text such as `--`, `~` or `{#1}`, keyed by the first
//!           character of its pattern.
//!         - [`CommandDefinition`]: a control sequence `\name` followed by an argument pattern,
//!           keyed by name.
//!         - [`EnvironmentDefinition`]: a `\begin{name}` .. `\end{name}` block, keyed by name.
//!
//!     Every definition carries mode requirements that gate whether it is a candidate at all, and
//!     mode directives applied once it has matched completely. Definitions are grouped into
//!     [`Package`]s and loaded into a [`Registry`], which answers candidate lookups in priority
//!     order.

pub mod package;
pub mod pattern;
pub mod registry;

pub use package::Package;
pub use pattern::{Component, Pattern, PatternError};
pub use registry::{DefinitionRegistry, Registry};

use crate::tex::modes::{Directive, Requirements};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Per-slot settings of a definition
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterSpec {
    /// Read the argument as raw source instead of parsing it
    #[serde(default)]
    pub verbatim: bool,
    /// Applied inside the argument only
    #[serde(default)]
    pub directives: Vec<Directive>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolDefinition {
    pub name: String,
    pub pattern: Pattern,
    #[serde(default)]
    pub modes: Requirements,
    #[serde(default)]
    pub directives: Vec<Directive>,
    #[serde(default)]
    pub parameters: Vec<ParameterSpec>,
    #[serde(default)]
    pub priority: i32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandDefinition {
    /// Control sequence name without the backslash
    pub name: String,
    /// Argument template following the name
    #[serde(default)]
    pub pattern: Pattern,
    #[serde(default)]
    pub modes: Requirements,
    #[serde(default)]
    pub directives: Vec<Directive>,
    #[serde(default)]
    pub parameters: Vec<ParameterSpec>,
    #[serde(default)]
    pub priority: i32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentDefinition {
    pub name: String,
    /// Argument template following `\begin{name}`
    #[serde(default)]
    pub pattern: Pattern,
    #[serde(default)]
    pub modes: Requirements,
    /// Applied for the duration of the body
    #[serde(default)]
    pub directives: Vec<Directive>,
    #[serde(default)]
    pub parameters: Vec<ParameterSpec>,
    #[serde(default)]
    pub priority: i32,
    /// Keep the body as raw source up to the end marker
    #[serde(default)]
    pub verbatim: bool,
}

fn parse_pattern(definition: &str, pattern: &str) -> Result<Pattern, DefinitionError> {
    Pattern::parse(pattern).map_err(|source| DefinitionError::Pattern {
        definition: definition.to_string(),
        source,
    })
}

macro_rules! definition_builders {
    ($($ty:ident),*) => {$(
        impl $ty {
            pub fn new(name: impl Into<String>, pattern: &str) -> Result<Self, DefinitionError> {
                let name = name.into();
                let pattern = parse_pattern(&name, pattern)?;
                Ok(Self {
                    name,
                    pattern,
                    ..Self::default()
                })
            }

            pub fn with_modes(mut self, modes: Requirements) -> Self {
                self.modes = modes;
                self
            }

            pub fn with_directives(mut self, directives: Vec<Directive>) -> Self {
                self.directives = directives;
                self
            }

            pub fn with_parameters(mut self, parameters: Vec<ParameterSpec>) -> Self {
                self.parameters = parameters;
                self
            }

            pub fn with_priority(mut self, priority: i32) -> Self {
                self.priority = priority;
                self
            }

            /// Settings for slot `index` (1-based); unlisted slots use the defaults
            pub fn parameter(&self, index: usize) -> ParameterSpec {
                index
                    .checked_sub(1)
                    .and_then(|i| self.parameters.get(i))
                    .cloned()
                    .unwrap_or_default()
            }
        }
    )*};
}

definition_builders!(SymbolDefinition, CommandDefinition, EnvironmentDefinition);

impl EnvironmentDefinition {
    pub fn verbatim(mut self) -> Self {
        self.verbatim = true;
        self
    }

    /// Name of the command closing this environment
    pub fn end_command(&self) -> String {
        format!("end{}", self.name)
    }
}

/// Errors raised while building or loading definitions
#[derive(Debug, Clone, PartialEq)]
pub enum DefinitionError {
    Pattern {
        definition: String,
        source: PatternError,
    },
    /// Symbol patterns must open with literal text
    SymbolWithoutLiteral { definition: String },
    DuplicatePackage(String),
    UnknownPackage(String),
    NoSuchBuiltin(String),
    /// Package text that failed to deserialize
    Format(String),
}

impl fmt::Display for DefinitionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DefinitionError::Pattern { definition, source } => {
                write!(f, "invalid pattern for '{definition}': {source}")
            }
            DefinitionError::SymbolWithoutLiteral { definition } => {
                write!(f, "symbol '{definition}' must start with literal text")
            }
            DefinitionError::DuplicatePackage(name) => {
                write!(f, "package '{name}' is already loaded")
            }
            DefinitionError::UnknownPackage(name) => write!(f, "package '{name}' is not loaded"),
            DefinitionError::NoSuchBuiltin(name) => {
                write!(f, "no built-in package named '{name}'")
            }
            DefinitionError::Format(msg) => write!(f, "malformed package: {msg}"),
        }
    }
}

impl std::error::Error for DefinitionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DefinitionError::Pattern { source, .. } => Some(source),
            _ => None,
        }
    }
}
