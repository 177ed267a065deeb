//! Definition registry
//!
//!     [`Registry`] indexes loaded definitions for dispatch: symbols by the first character of
//!     their pattern, commands and environments by name. Each key maps to a bucket kept sorted in
//!     candidate order, so a lookup is a filter over one bucket by the current mode state.
//!
//!     Candidate order is total and explicit:
//!
//!         1. higher `priority` first
//!         2. more literal text in the pattern first (more specific)
//!         3. later-loaded package first
//!         4. later declaration within a package first
//!
//!     Loading an environment also registers the two commands the parser uses for its markers:
//!     `name` for `\begin{name}` with the environment's argument pattern, and `endname` for
//!     `\end{name}`.

use super::{CommandDefinition, DefinitionError, EnvironmentDefinition, Package, SymbolDefinition};
use crate::tex::modes::ModeState;
use std::cmp::Reverse;
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;

/// Candidate lookup used by the dispatcher
pub trait DefinitionRegistry {
    fn symbols_for(&self, state: ModeState, first: char) -> Vec<Arc<SymbolDefinition>>;
    fn commands_for(&self, state: ModeState, name: &str) -> Vec<Arc<CommandDefinition>>;
    fn environments_for(&self, state: ModeState, name: &str) -> Vec<Arc<EnvironmentDefinition>>;
}

#[derive(Debug, Clone)]
struct Entry<D> {
    package: u64,
    declared: usize,
    priority: i32,
    specificity: usize,
    definition: Arc<D>,
}

impl<D> Entry<D> {
    fn new(package: u64, declared: usize, priority: i32, specificity: usize, definition: D) -> Self {
        Self {
            package,
            declared,
            priority,
            specificity,
            definition: Arc::new(definition),
        }
    }

    fn order_key(&self) -> (Reverse<i32>, Reverse<usize>, Reverse<u64>, Reverse<usize>) {
        (
            Reverse(self.priority),
            Reverse(self.specificity),
            Reverse(self.package),
            Reverse(self.declared),
        )
    }
}

#[derive(Debug, Clone)]
struct Index<K, D> {
    buckets: HashMap<K, Vec<Entry<D>>>,
}

impl<K: Eq + Hash, D> Default for Index<K, D> {
    fn default() -> Self {
        Self {
            buckets: HashMap::new(),
        }
    }
}

impl<K: Eq + Hash, D> Index<K, D> {
    fn insert(&mut self, key: K, entry: Entry<D>) {
        let bucket = self.buckets.entry(key).or_default();
        bucket.push(entry);
        bucket.sort_by_key(Entry::order_key);
    }

    fn remove_package(&mut self, package: u64) {
        self.buckets.retain(|_, bucket| {
            bucket.retain(|entry| entry.package != package);
            !bucket.is_empty()
        });
    }

    fn lookup<Q>(&self, key: &Q, accept: impl Fn(&D) -> bool) -> Vec<Arc<D>>
    where
        K: std::borrow::Borrow<Q>,
        Q: Eq + Hash + ?Sized,
    {
        self.buckets
            .get(key)
            .into_iter()
            .flatten()
            .filter(|entry| accept(&entry.definition))
            .map(|entry| Arc::clone(&entry.definition))
            .collect()
    }

    fn len(&self) -> usize {
        self.buckets.values().map(Vec::len).sum()
    }
}

#[derive(Debug, Clone)]
struct LoadedPackage {
    name: String,
    sequence: u64,
}

/// Append-ordered multimap of definitions, loaded and unloaded by package
#[derive(Debug, Clone, Default)]
pub struct Registry {
    packages: Vec<LoadedPackage>,
    next_sequence: u64,
    symbols: Index<char, SymbolDefinition>,
    commands: Index<String, CommandDefinition>,
    environments: Index<String, EnvironmentDefinition>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the named built-in packages loaded in order
    pub fn with_builtins<S: AsRef<str>>(names: &[S]) -> Result<Self, DefinitionError> {
        let mut registry = Self::new();
        for name in names {
            let name = name.as_ref();
            registry.load(name, Package::builtin(name)?)?;
        }
        Ok(registry)
    }

    pub fn load(&mut self, name: &str, package: Package) -> Result<(), DefinitionError> {
        if self.is_loaded(name) {
            return Err(DefinitionError::DuplicatePackage(name.to_string()));
        }
        package.validate()?;

        let sequence = self.next_sequence;
        self.next_sequence += 1;
        log::debug!(
            target: "tex.definitions",
            "loading package '{name}' ({} definitions)",
            package.len()
        );

        let mut declared = 0;
        for symbol in package.symbols {
            let Some(first) = symbol.pattern.first_char() else {
                continue;
            };
            let specificity = symbol.pattern.literal_len();
            let entry = Entry::new(sequence, declared, symbol.priority, specificity, symbol);
            self.symbols.insert(first, entry);
            declared += 1;
        }
        for command in package.commands {
            let key = command.name.clone();
            let specificity = command.pattern.literal_len();
            let entry = Entry::new(sequence, declared, command.priority, specificity, command);
            self.commands.insert(key, entry);
            declared += 1;
        }
        for environment in package.environments {
            let begin = CommandDefinition {
                name: environment.name.clone(),
                pattern: environment.pattern.clone(),
                modes: environment.modes.clone(),
                directives: Vec::new(),
                parameters: environment.parameters.clone(),
                priority: environment.priority,
            };
            let end = CommandDefinition {
                name: environment.end_command(),
                modes: environment.modes.clone(),
                priority: environment.priority,
                ..CommandDefinition::default()
            };
            for command in [begin, end] {
                let key = command.name.clone();
                let specificity = command.pattern.literal_len();
                let entry = Entry::new(sequence, declared, command.priority, specificity, command);
                self.commands.insert(key, entry);
            }
            let key = environment.name.clone();
            let entry = Entry::new(
                sequence,
                declared,
                environment.priority,
                environment.pattern.literal_len(),
                environment,
            );
            self.environments.insert(key, entry);
            declared += 1;
        }

        self.packages.push(LoadedPackage {
            name: name.to_string(),
            sequence,
        });
        Ok(())
    }

    pub fn unload(&mut self, name: &str) -> Result<(), DefinitionError> {
        let position = self
            .packages
            .iter()
            .position(|package| package.name == name)
            .ok_or_else(|| DefinitionError::UnknownPackage(name.to_string()))?;
        let package = self.packages.remove(position);
        self.symbols.remove_package(package.sequence);
        self.commands.remove_package(package.sequence);
        self.environments.remove_package(package.sequence);
        log::debug!(target: "tex.definitions", "unloaded package '{name}'");
        Ok(())
    }

    pub fn is_loaded(&self, name: &str) -> bool {
        self.packages.iter().any(|package| package.name == name)
    }

    /// Loaded package names, oldest first
    pub fn package_names(&self) -> impl Iterator<Item = &str> {
        self.packages.iter().map(|package| package.name.as_str())
    }

    /// Total indexed definitions, including the commands derived from environments
    pub fn len(&self) -> usize {
        self.symbols.len() + self.commands.len() + self.environments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl DefinitionRegistry for Registry {
    fn symbols_for(&self, state: ModeState, first: char) -> Vec<Arc<SymbolDefinition>> {
        self.symbols.lookup(&first, |def| def.modes.test(state))
    }

    fn commands_for(&self, state: ModeState, name: &str) -> Vec<Arc<CommandDefinition>> {
        self.commands.lookup(name, |def| def.modes.test(state))
    }

    fn environments_for(&self, state: ModeState, name: &str) -> Vec<Arc<EnvironmentDefinition>> {
        self.environments.lookup(name, |def| def.modes.test(state))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tex::modes::{Mode, Requirements};

    fn names<D>(defs: &[Arc<D>], name: impl Fn(&D) -> String) -> Vec<String> {
        defs.iter().map(|d| name(d)).collect()
    }

    fn symbol(name: &str, pattern: &str) -> SymbolDefinition {
        SymbolDefinition::new(name, pattern).unwrap()
    }

    #[test]
    fn test_symbols_indexed_by_first_char() {
        let mut registry = Registry::new();
        let package = Package::new()
            .with_symbol(symbol("en", "--"))
            .with_symbol(symbol("em", "---"))
            .with_symbol(symbol("tie", "~"));
        registry.load("dashes", package).unwrap();

        let dashes = registry.symbols_for(ModeState::empty(), '-');
        assert_eq!(names(&dashes, |d| d.name.clone()), vec!["em", "en"]);
        assert!(registry.symbols_for(ModeState::empty(), 'x').is_empty());
    }

    #[test]
    fn test_priority_beats_specificity() {
        let mut registry = Registry::new();
        let package = Package::new()
            .with_symbol(symbol("long", "---"))
            .with_symbol(symbol("short", "-").with_priority(5));
        registry.load("p", package).unwrap();

        let found = registry.symbols_for(ModeState::empty(), '-');
        assert_eq!(names(&found, |d| d.name.clone()), vec!["short", "long"]);
    }

    #[test]
    fn test_later_package_then_later_declaration_wins_ties() {
        let mut registry = Registry::new();
        let first = Package::new()
            .with_command(CommandDefinition::new("x", "#1").unwrap().with_priority(0))
            .with_command(CommandDefinition::new("x", "#2").unwrap());
        registry.load("first", first).unwrap();
        registry
            .load(
                "second",
                Package::new().with_command(CommandDefinition::new("x", "#3").unwrap()),
            )
            .unwrap();

        let found = registry.commands_for(ModeState::empty(), "x");
        assert_eq!(
            names(&found, |d| d.pattern.to_string()),
            vec!["#3", "#2", "#1"]
        );
    }

    #[test]
    fn test_mode_filtering() {
        let mut registry = Registry::new();
        let math_only = CommandDefinition::new("alpha", "")
            .unwrap()
            .with_modes(Requirements::new().require(Mode::Math, true));
        registry
            .load("math", Package::new().with_command(math_only))
            .unwrap();

        assert!(registry.commands_for(ModeState::empty(), "alpha").is_empty());
        let in_math = ModeState::empty().with(Mode::Math);
        assert_eq!(registry.commands_for(in_math, "alpha").len(), 1);
    }

    #[test]
    fn test_environment_registers_marker_commands() {
        let mut registry = Registry::new();
        let env = EnvironmentDefinition::new("tabular", "#1").unwrap();
        registry
            .load("tables", Package::new().with_environment(env))
            .unwrap();

        let state = ModeState::empty();
        assert_eq!(registry.environments_for(state, "tabular").len(), 1);
        let begin = registry.commands_for(state, "tabular");
        assert_eq!(begin.len(), 1);
        assert_eq!(begin[0].pattern.arity(), 1);
        let end = registry.commands_for(state, "endtabular");
        assert_eq!(end.len(), 1);
        assert!(end[0].pattern.is_empty());
    }

    #[test]
    fn test_unload_removes_only_that_package() {
        let mut registry = Registry::new();
        registry
            .load("a", Package::new().with_symbol(symbol("a", "~")))
            .unwrap();
        registry
            .load("b", Package::new().with_symbol(symbol("b", "~~")))
            .unwrap();

        registry.unload("b").unwrap();
        let found = registry.symbols_for(ModeState::empty(), '~');
        assert_eq!(names(&found, |d| d.name.clone()), vec!["a"]);
        assert_eq!(registry.package_names().collect::<Vec<_>>(), vec!["a"]);

        registry.unload("a").unwrap();
        assert!(registry.is_empty());
    }

    #[test]
    fn test_load_and_unload_errors() {
        let mut registry = Registry::new();
        registry.load("a", Package::new()).unwrap();
        assert_eq!(
            registry.load("a", Package::new()),
            Err(DefinitionError::DuplicatePackage("a".into()))
        );
        assert_eq!(
            registry.unload("missing"),
            Err(DefinitionError::UnknownPackage("missing".into()))
        );
    }

    #[test]
    fn test_builtins() {
        let registry = Registry::with_builtins(&["latex"]).unwrap();
        assert!(registry.is_loaded("latex"));
        assert!(!registry.commands_for(ModeState::empty(), "textbf").is_empty());
        assert!(Registry::with_builtins(&["nope"]).is_err());
    }
}
