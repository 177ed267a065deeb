//! Parser configuration
//!
//! `defaults/parser.default.toml` is embedded into the library so that documentation and runtime
//! behavior stay in sync. Callers layer their own files and overrides on top through
//! [`ConfigLoader`] before deserializing into [`ParserConfig`].

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError, File, FileFormat, FileSourceFile, ValueKind};
use serde::Deserialize;
use std::path::Path;

const DEFAULT_TOML: &str = include_str!("../../defaults/parser.default.toml");

/// Top-level configuration of a parse.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ParserConfig {
    /// Built-in packages loaded when no registry is supplied
    pub packages: Vec<String>,
    pub comments: CommentsConfig,
    pub limits: LimitsConfig,
    pub diagnostics: DiagnosticsConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct CommentsConfig {
    pub absorb_line_break: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct LimitsConfig {
    pub max_depth: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct DiagnosticsConfig {
    pub report_unknown_symbols: bool,
}

impl Default for ParserConfig {
    /// Same values as the embedded defaults file
    fn default() -> Self {
        Self {
            packages: vec!["latex".to_string()],
            comments: CommentsConfig {
                absorb_line_break: true,
            },
            limits: LimitsConfig {
                max_depth: crate::tex::engine::DEFAULT_MAX_DEPTH,
            },
            diagnostics: DiagnosticsConfig {
                report_unknown_symbols: true,
            },
        }
    }
}

/// Builds a [`ParserConfig`] from the embedded defaults plus caller layers.
///
/// Later layers win key by key, so a project file can set `packages` while a single
/// `set_override("limits.max_depth", ..)` still tightens the nesting limit for one run.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    builder: ConfigBuilder<DefaultState>,
}

fn toml_file(path: &Path, required: bool) -> File<FileSourceFile, FileFormat> {
    File::from(path).format(FileFormat::Toml).required(required)
}

impl ConfigLoader {
    pub fn new() -> Self {
        let builder = Config::builder().add_source(File::from_str(DEFAULT_TOML, FileFormat::Toml));
        Self { builder }
    }

    /// Layer a parser settings file; `build` fails when it does not exist
    pub fn with_file(mut self, path: impl AsRef<Path>) -> Self {
        self.builder = self.builder.add_source(toml_file(path.as_ref(), true));
        self
    }

    /// Layer a settings file that may be absent, such as a per-project `parser.toml`
    pub fn with_optional_file(mut self, path: impl AsRef<Path>) -> Self {
        self.builder = self.builder.add_source(toml_file(path.as_ref(), false));
        self
    }

    /// Layer settings given as TOML text
    pub fn with_toml(mut self, text: &str) -> Self {
        self.builder = self.builder.add_source(File::from_str(text, FileFormat::Toml));
        self
    }

    /// Override one dotted key, e.g. `comments.absorb_line_break`
    pub fn set_override<I>(mut self, key: &str, value: I) -> Result<Self, ConfigError>
    where
        I: Into<ValueKind>,
    {
        self.builder = self.builder.set_override(key, value)?;
        Ok(self)
    }

    /// Merge every layer and deserialize; unknown packages are only caught when the registry
    /// loads them
    pub fn build(self) -> Result<ParserConfig, ConfigError> {
        self.builder.build()?.try_deserialize()
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

/// The embedded parser defaults, deserialized
pub fn load_defaults() -> Result<ParserConfig, ConfigError> {
    ConfigLoader::new().build()
}
