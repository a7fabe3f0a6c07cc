//! This crate compiles flag-guarded Turing machine programs into flat transition tables.
//!
//! A program declares boolean flags and labeled blocks of rules. Every label is expanded
//! into one concrete state per combination of flags, so rules can read and update the
//! flags without the author writing out each combination. The result is emitted in the
//! text format accepted by common single-tape Turing machine simulators.

pub mod compiler;
pub mod emitter;
pub mod expander;
pub mod flags;
pub mod loader;
pub mod parser;
pub mod programs;
pub mod resolver;
pub mod types;
pub mod validator;

/// Re-exports the `Rule` enum from the parser module, used by the `pest` grammar.
pub use crate::parser::Rule;
/// Re-exports the compilation entry points from the compiler module.
pub use compiler::{compile, compile_to_string, CompileOptions};
/// Re-exports the text and JSON emitters from the emitter module.
pub use emitter::{emit, emit_json, write_table, EmitOptions};
/// Re-exports the flag-state enumeration from the flags module.
pub use flags::{FlagSet, FlagStates};
/// Re-exports the `ProgramLoader` struct from the loader module.
pub use loader::ProgramLoader;
/// Re-exports the `parse` function from the parser module.
pub use parser::parse;
/// Re-exports `ProgramInfo`, `ProgramManager`, and `PROGRAMS` from the programs module.
pub use programs::{ProgramInfo, ProgramManager, PROGRAMS};
/// Re-exports the program and table types from the types module.
pub use types::{
    Block, CompileError, CompiledTransition, Direction, FlagLiteral, Program, StateId, StateRef,
    Target, Transition, TransitionTable, MAX_FLAGS, MAX_PROGRAM_SIZE,
};
/// Re-exports the `validate` function from the validator module.
pub use validator::validate;
