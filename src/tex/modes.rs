//! Document modes
//!
//!     A mode is a named boolean flag describing where the cursor is: inside math, inside a list,
//!     and so on. Definitions declare which modes they need ([`Requirements`]) and how they change
//!     them once matched ([`Directive`]s).
//!
//!     [`ModeMachine`] holds the current [`ModeState`] plus a stack of saved states. LaTeX groups
//!     map onto that stack: opening a group saves the state, closing it restores the saved one.
//!
//! Directive semantics
//!
//!     A directive list is applied as one unit. Group closings run first, then every flag change
//!     in the list, and group openings last, wherever they appear in the list. A rule that sets
//!     flags and opens a group therefore saves the state with its flags already set; changes made
//!     inside the group are undone when it closes, the rule's own flags are not:
//!
//!         [begin group, begin math]   current becomes {math}, saves {math}
//!         [begin list]                current becomes {math, list}
//!         [end group]                 current becomes {math} again

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    Math,
    List,
    Table,
    VerticalSpace,
    Picture,
    Text,
}

impl Mode {
    pub const ALL: [Mode; 6] = [
        Mode::Math,
        Mode::List,
        Mode::Table,
        Mode::VerticalSpace,
        Mode::Picture,
        Mode::Text,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Mode::Math => "math",
            Mode::List => "list",
            Mode::Table => "table",
            Mode::VerticalSpace => "vertical_space",
            Mode::Picture => "picture",
            Mode::Text => "text",
        }
    }

    fn bit(self) -> u8 {
        1 << (self as u8)
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Mode::ALL
            .into_iter()
            .find(|mode| mode.name() == s)
            .ok_or_else(|| format!("unknown mode '{s}'"))
    }
}

/// The set of modes currently switched on
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct ModeState {
    bits: u8,
}

impl ModeState {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_set(self, mode: Mode) -> bool {
        self.bits & mode.bit() != 0
    }

    pub fn set(&mut self, mode: Mode, on: bool) {
        if on {
            self.bits |= mode.bit();
        } else {
            self.bits &= !mode.bit();
        }
    }

    pub fn with(mut self, mode: Mode) -> Self {
        self.set(mode, true);
        self
    }
}

impl fmt::Display for ModeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let active: Vec<&str> = Mode::ALL
            .into_iter()
            .filter(|mode| self.is_set(*mode))
            .map(Mode::name)
            .collect();
        write!(f, "{{{}}}", active.join(", "))
    }
}

/// Required value per mode; modes not listed are unconstrained
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Requirements(BTreeMap<Mode, bool>);

impl Requirements {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn require(mut self, mode: Mode, value: bool) -> Self {
        self.0.insert(mode, value);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn test(&self, state: ModeState) -> bool {
        self.0
            .iter()
            .all(|(mode, required)| state.is_set(*mode) == *required)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Target {
    Mode(Mode),
    Group,
}

/// A mode update, written `begin math` / `end group` in definition packages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Directive {
    Begin(Target),
    End(Target),
}

impl fmt::Display for Directive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (verb, target) = match self {
            Directive::Begin(target) => ("begin", target),
            Directive::End(target) => ("end", target),
        };
        match target {
            Target::Group => write!(f, "{verb} group"),
            Target::Mode(mode) => write!(f, "{verb} {mode}"),
        }
    }
}

impl FromStr for Directive {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut words = s.split_whitespace();
        let (verb, target) = match (words.next(), words.next(), words.next()) {
            (Some(verb), Some(target), None) => (verb, target),
            _ => return Err(format!("malformed directive '{s}'")),
        };
        let target = match target {
            "group" => Target::Group,
            other => Target::Mode(other.parse()?),
        };
        match verb {
            "begin" => Ok(Directive::Begin(target)),
            "end" => Ok(Directive::End(target)),
            other => Err(format!("unknown directive verb '{other}'")),
        }
    }
}

impl TryFrom<String> for Directive {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Directive> for String {
    fn from(directive: Directive) -> Self {
        directive.to_string()
    }
}

/// A group was closed with no saved state left to restore
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnbalancedGroup;

impl fmt::Display for UnbalancedGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "group closed without a matching opening")
    }
}

impl std::error::Error for UnbalancedGroup {}

/// Current mode state plus the stack of states saved by open groups
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ModeMachine {
    state: ModeState,
    stack: Vec<ModeState>,
}

impl ModeMachine {
    pub fn new(state: ModeState) -> Self {
        Self {
            state,
            stack: Vec::new(),
        }
    }

    pub fn state(&self) -> ModeState {
        self.state
    }

    /// Number of currently open groups
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    pub fn push(&mut self) {
        self.stack.push(self.state);
    }

    pub fn pop(&mut self) -> Result<(), UnbalancedGroup> {
        self.state = self.stack.pop().ok_or(UnbalancedGroup)?;
        Ok(())
    }

    /// Pop saved states until only `depth` remain
    pub fn unwind(&mut self, depth: usize) {
        while self.stack.len() > depth {
            if let Some(saved) = self.stack.pop() {
                self.state = saved;
            }
        }
    }

    pub fn test(&self, requirements: &Requirements) -> bool {
        requirements.test(self.state)
    }

    /// Apply a directive list atomically (see the module docs for ordering).
    ///
    /// Flag changes are applied even when a group closing fails; the error only reports the
    /// imbalance.
    pub fn apply(&mut self, directives: &[Directive]) -> Result<(), UnbalancedGroup> {
        let mut result = Ok(());
        for directive in directives {
            if *directive == Directive::End(Target::Group) {
                if let Err(err) = self.pop() {
                    result = Err(err);
                }
            }
        }

        for directive in directives {
            match directive {
                Directive::Begin(Target::Mode(mode)) => self.state.set(*mode, true),
                Directive::End(Target::Mode(mode)) => self.state.set(*mode, false),
                Directive::Begin(Target::Group) | Directive::End(Target::Group) => {}
            }
        }
        for directive in directives {
            if *directive == Directive::Begin(Target::Group) {
                self.push();
            }
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_requirements_check_only_named_modes() {
        let requirements = Requirements::new()
            .require(Mode::Math, true)
            .require(Mode::List, false);

        assert!(requirements.test(ModeState::empty().with(Mode::Math)));
        assert!(requirements.test(ModeState::empty().with(Mode::Math).with(Mode::Table)));
        assert!(!requirements.test(ModeState::empty()));
        assert!(!requirements.test(ModeState::empty().with(Mode::Math).with(Mode::List)));
        assert!(Requirements::new().test(ModeState::empty().with(Mode::Picture)));
    }

    #[test]
    fn test_group_restores_state() {
        let mut machine = ModeMachine::default();
        machine.push();
        machine.apply(&[Directive::Begin(Target::Mode(Mode::Math))]).unwrap();
        assert!(machine.state().is_set(Mode::Math));
        machine.pop().unwrap();
        assert!(!machine.state().is_set(Mode::Math));
    }

    #[test]
    fn test_flags_then_group_resolve_atomically() {
        let mut machine = ModeMachine::default();
        // the group opens after the flag change, whatever the list order
        machine
            .apply(&[
                Directive::Begin(Target::Group),
                Directive::Begin(Target::Mode(Mode::Math)),
            ])
            .unwrap();
        assert!(machine.state().is_set(Mode::Math));
        assert_eq!(machine.depth(), 1);

        machine.apply(&[Directive::Begin(Target::Mode(Mode::List))]).unwrap();
        machine.apply(&[Directive::End(Target::Group)]).unwrap();
        assert!(machine.state().is_set(Mode::Math));
        assert!(!machine.state().is_set(Mode::List));
        assert_eq!(machine.depth(), 0);
    }

    #[test]
    fn test_close_then_clear_leaves_rule_scope() {
        let mut machine = ModeMachine::default();
        machine
            .apply(&[
                Directive::Begin(Target::Mode(Mode::Math)),
                Directive::Begin(Target::Group),
            ])
            .unwrap();
        machine
            .apply(&[
                Directive::End(Target::Mode(Mode::Math)),
                Directive::End(Target::Group),
            ])
            .unwrap();
        assert_eq!(machine.state(), ModeState::empty());
        assert_eq!(machine.depth(), 0);
    }

    #[test]
    fn test_unbalanced_pop_is_reported() {
        let mut machine = ModeMachine::default();
        assert_eq!(machine.pop(), Err(UnbalancedGroup));
        let result = machine.apply(&[
            Directive::End(Target::Group),
            Directive::Begin(Target::Mode(Mode::Text)),
        ]);
        assert_eq!(result, Err(UnbalancedGroup));
        assert!(machine.state().is_set(Mode::Text));
    }

    #[test]
    fn test_directive_text_form() {
        let directive: Directive = "begin vertical_space".parse().unwrap();
        assert_eq!(directive, Directive::Begin(Target::Mode(Mode::VerticalSpace)));
        assert_eq!(directive.to_string(), "begin vertical_space");
        assert_eq!(
            "end group".parse::<Directive>().unwrap(),
            Directive::End(Target::Group)
        );
        assert!("open math".parse::<Directive>().is_err());
        assert!("begin".parse::<Directive>().is_err());
        assert!("begin nowhere".parse::<Directive>().is_err());
    }

    #[test]
    fn test_unwind_restores_outermost_saved_state() {
        let mut machine = ModeMachine::default();
        machine.push();
        machine.apply(&[Directive::Begin(Target::Mode(Mode::List))]).unwrap();
        machine
            .apply(&[Directive::Begin(Target::Group), Directive::Begin(Target::Mode(Mode::Math))])
            .unwrap();
        assert_eq!(machine.depth(), 2);

        machine.unwind(0);
        assert_eq!(machine.depth(), 0);
        assert_eq!(machine.state(), ModeState::empty());
    }

    #[test]
    fn test_state_display() {
        let state = ModeState::empty().with(Mode::Table).with(Mode::Math);
        assert_eq!(state.to_string(), "{math, table}");
    }
}
