//! This module defines the core data structures shared by the compiler: the flag-guarded
//! source program, the expanded transition records it compiles into, and the error type.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::Rule;

/// The token for the accepting terminal pseudo-state.
pub const HALT_ACCEPT: &str = "halt-accept";
/// The token for the rejecting terminal pseudo-state.
pub const HALT_REJECT: &str = "halt-reject";
/// The reserved state the interpreter starts in before the bootstrap transition.
pub const BOOTSTRAP_STATE: &str = "0";
/// The literal the interpreter treats as "any symbol" on read and "no change" on write.
pub const WILDCARD_SYMBOL: &str = "*";
/// The maximum number of declared flags. Each flag doubles the concrete state space.
pub const MAX_FLAGS: usize = 16;
/// The maximum allowed size for a program source in bytes.
pub const MAX_PROGRAM_SIZE: usize = 65536; // 64KB

/// A flag-guarded Turing machine program, as written by the author.
///
/// Blocks keep their declaration order; that order is the order the expanded
/// transitions are emitted in.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Program {
    /// The name of the program. Only used for informational output.
    #[serde(default)]
    pub name: String,
    /// The declared flags, in declaration order. The order fixes the flag-state indices.
    #[serde(default)]
    pub flags: Vec<String>,
    /// The labeled rule blocks.
    pub blocks: Vec<Block>,
    /// The label execution begins in.
    pub start: String,
}

impl Program {
    /// Looks up a block by its label.
    pub fn block(&self, label: &str) -> Option<&Block> {
        self.blocks.iter().find(|block| block.label == label)
    }

    /// Returns the labels in declaration order.
    pub fn labels(&self) -> Vec<String> {
        self.blocks.iter().map(|block| block.label.clone()).collect()
    }

    /// Returns the total number of rules over all blocks.
    pub fn rule_count(&self) -> usize {
        self.blocks.iter().map(|block| block.transitions.len()).sum()
    }
}

/// A named, ordered list of transition rules.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Block {
    pub label: String,
    pub transitions: Vec<Transition>,
}

/// A flag-guarded transition rule inside a block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transition {
    /// Flags that must be present (`name`) or absent (`!name`) for the rule to apply.
    #[serde(default)]
    pub required: Vec<FlagLiteral>,
    /// The symbol under the head. Matched as an opaque token, including `*`.
    pub read: String,
    /// The symbol to write.
    pub write: String,
    /// The direction to move the head.
    pub direction: Direction,
    /// Where the machine goes next.
    pub target: Target,
}

/// Represents the possible directions a Turing Machine head can move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    /// Move the head one position to the left.
    Left,
    /// Move the head one position to the right.
    Right,
    /// Keep the head in the same position.
    Stay,
}

impl Direction {
    /// The token the interpreter expects for this move.
    pub fn as_token(&self) -> &'static str {
        match self {
            Direction::Left => "l",
            Direction::Right => "r",
            Direction::Stay => "*",
        }
    }
}

/// A flag name with a polarity.
///
/// As a required condition it reads "flag must be present" (`value == true`) or
/// "flag must be absent". As a directive it reads "set the flag" or "clear the flag".
/// The textual form is `name` or `!name`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FlagLiteral {
    pub name: String,
    pub value: bool,
}

impl FlagLiteral {
    pub fn set(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: true,
        }
    }

    pub fn clear(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: false,
        }
    }
}

impl FromStr for FlagLiteral {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (name, value) = match s.strip_prefix('!') {
            Some(name) => (name, false),
            None => (s, true),
        };

        if name.is_empty() {
            return Err(format!("Invalid flag literal: {s:?}"));
        }

        Ok(Self {
            name: name.to_string(),
            value,
        })
    }
}

impl TryFrom<String> for FlagLiteral {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<FlagLiteral> for String {
    fn from(flag: FlagLiteral) -> Self {
        flag.to_string()
    }
}

impl fmt::Display for FlagLiteral {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.value {
            write!(f, "{}", self.name)
        } else {
            write!(f, "!{}", self.name)
        }
    }
}

/// The destination of a rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Target {
    /// Stay in the current label, applying the directives.
    Continue {
        #[serde(default)]
        flags: Vec<FlagLiteral>,
    },
    /// Go to an explicit label, applying the directives.
    Jump {
        label: String,
        #[serde(default)]
        flags: Vec<FlagLiteral>,
    },
    /// Halt and accept. Never expanded with flags.
    Accept,
    /// Halt and reject. Never expanded with flags.
    Reject,
}

impl Target {
    /// The flag directives carried by this target. Halting targets carry none.
    pub fn directives(&self) -> &[FlagLiteral] {
        match self {
            Target::Continue { flags } | Target::Jump { flags, .. } => flags,
            Target::Accept | Target::Reject => &[],
        }
    }
}

/// A concrete machine state: a label paired with a flag-state index.
///
/// Kept as a composite key internally and only formatted as `<label><index>` on output.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StateId {
    pub label: String,
    pub index: usize,
}

impl StateId {
    pub fn new(label: impl Into<String>, index: usize) -> Self {
        Self {
            label: label.into(),
            index,
        }
    }
}

impl fmt::Display for StateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.label, self.index)
    }
}

/// The destination of an expanded transition.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StateRef {
    Concrete(StateId),
    Accept,
    Reject,
}

impl fmt::Display for StateRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StateRef::Concrete(state) => write!(f, "{state}"),
            StateRef::Accept => f.write_str(HALT_ACCEPT),
            StateRef::Reject => f.write_str(HALT_REJECT),
        }
    }
}

/// A single line of the compiled table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompiledTransition {
    pub source: StateId,
    pub read: String,
    pub write: String,
    pub direction: Direction,
    pub destination: StateRef,
}

/// The fully expanded transition table of a program.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionTable {
    /// The program name.
    pub name: String,
    /// The declared flags, in declaration order.
    pub flags: Vec<String>,
    /// The members of every flag state, indexed by flag-state index.
    pub flag_states: Vec<Vec<String>>,
    /// The labels, in declaration order.
    pub labels: Vec<String>,
    /// The concrete state the bootstrap transition enters.
    pub start: StateId,
    /// The expanded transitions, in emission order.
    pub transitions: Vec<CompiledTransition>,
}

/// Represents the errors that can occur while loading or compiling a program.
///
/// Every variant is fatal: compilation either produces the whole table or nothing.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CompileError {
    /// The start label is not one of the declared labels.
    #[error("Undefined start label: {0}")]
    UndefinedStartLabel(String),
    /// A rule jumps to a label that was never declared.
    #[error("Invalid destination label `{target}` in label `{label}`")]
    InvalidDestinationLabel { label: String, target: String },
    /// A condition or directive names a flag that was never declared.
    #[error("Invalid flag `{flag}` in label `{label}`")]
    InvalidFlagName { label: String, flag: String },
    /// A flag was declared more than once.
    #[error("Duplicate flag: {0}")]
    DuplicateFlag(String),
    /// A declared flag is not an identifier, so no rule could refer to it.
    #[error("Invalid flag: {0:?}")]
    InvalidFlag(String),
    /// The program name spans more than one line.
    #[error("Invalid program name: {0:?}")]
    InvalidName(String),
    /// More flags were declared than the compiler can enumerate.
    #[error("Too many flags: {0} declared, at most {} allowed", MAX_FLAGS)]
    TooManyFlags(usize),
    /// A label was declared more than once.
    #[error("Duplicate label: {0}")]
    DuplicateLabel(String),
    /// A label cannot be written to the output format.
    #[error("Invalid label: {0:?}")]
    InvalidLabel(String),
    /// A label uses one of the terminal state names.
    #[error("Reserved label: {0}")]
    ReservedLabel(String),
    /// A symbol cannot be written to the output format.
    #[error("Invalid symbol {symbol:?} in label `{label}`")]
    InvalidSymbol { label: String, symbol: String },
    /// Two distinct states would be written with the same name.
    #[error("Ambiguous state name `{name}`: produced by both {first} and {second}")]
    AmbiguousStateName {
        name: String,
        first: String,
        second: String,
    },
    /// Indicates a syntax error in a program source.
    #[error("Program parsing error: {0}")]
    ParseError(#[from] Box<pest::error::Error<Rule>>),
    /// Indicates a structural problem in a program source, such as a missing section.
    #[error("Program validation error: {0}")]
    ValidationError(String),
    /// Indicates an error reading a program or writing the table.
    #[error("File error: {0}")]
    FileError(String),
}
