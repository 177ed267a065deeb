//! Definition packages
//!
//! A package is a named bundle of definitions loaded into a [`Registry`](super::Registry) as a
//! unit. Packages deserialize from YAML or JSON documents with up to three lists:
//!
//! ```yaml
//! symbols:
//!   - { name: en_dash, pattern: "--", modes: { math: false } }
//! commands:
//!   - { name: textbf, pattern: "#1" }
//! environments:
//!   - { name: itemize, directives: ["begin list"] }
//! ```
//!
//! Built-in packages ship inside the crate, see [`Package::builtin`].

use super::{
    CommandDefinition, DefinitionError, EnvironmentDefinition, PatternError, SymbolDefinition,
};
use serde::{Deserialize, Serialize};

/// Names and sources of the packages compiled into the crate
const BUILTIN: &[(&str, &str)] = &[("latex", include_str!("../../../defaults/latex.yaml"))];

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Package {
    #[serde(default)]
    pub symbols: Vec<SymbolDefinition>,
    #[serde(default)]
    pub commands: Vec<CommandDefinition>,
    #[serde(default)]
    pub environments: Vec<EnvironmentDefinition>,
}

impl Package {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_yaml(text: &str) -> Result<Self, DefinitionError> {
        let package: Package =
            serde_yaml::from_str(text).map_err(|e| DefinitionError::Format(e.to_string()))?;
        package.validate()?;
        Ok(package)
    }

    pub fn from_json(text: &str) -> Result<Self, DefinitionError> {
        let package: Package =
            serde_json::from_str(text).map_err(|e| DefinitionError::Format(e.to_string()))?;
        package.validate()?;
        Ok(package)
    }

    /// Load one of the packages compiled into the crate
    pub fn builtin(name: &str) -> Result<Self, DefinitionError> {
        let (_, source) = BUILTIN
            .iter()
            .find(|(builtin, _)| *builtin == name)
            .ok_or_else(|| DefinitionError::NoSuchBuiltin(name.to_string()))?;
        Self::from_yaml(source)
    }

    pub fn builtin_names() -> impl Iterator<Item = &'static str> {
        BUILTIN.iter().map(|(name, _)| *name)
    }

    pub fn with_symbol(mut self, symbol: SymbolDefinition) -> Self {
        self.symbols.push(symbol);
        self
    }

    pub fn with_command(mut self, command: CommandDefinition) -> Self {
        self.commands.push(command);
        self
    }

    pub fn with_environment(mut self, environment: EnvironmentDefinition) -> Self {
        self.environments.push(environment);
        self
    }

    pub fn len(&self) -> usize {
        self.symbols.len() + self.commands.len() + self.environments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Symbols need a non-empty pattern that opens with literal text; they are indexed by it.
    pub fn validate(&self) -> Result<(), DefinitionError> {
        for symbol in &self.symbols {
            if symbol.pattern.is_empty() {
                return Err(DefinitionError::Pattern {
                    definition: symbol.name.clone(),
                    source: PatternError::Empty,
                });
            }
            if symbol.pattern.first_char().is_none() {
                return Err(DefinitionError::SymbolWithoutLiteral {
                    definition: symbol.name.clone(),
                });
            }
        }
        Ok(())
    }
}
