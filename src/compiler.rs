//! This module drives a full compilation: flag-state enumeration, validation, expansion,
//! and assembly of the `TransitionTable`.

use crate::emitter::{emit, EmitOptions};
use crate::expander::expand;
use crate::flags::FlagStates;
use crate::types::{CompileError, Program, StateId, TransitionTable};
use crate::validator::validate;
use tracing::debug;

/// Options controlling compilation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CompileOptions {
    /// Expand labels concurrently. The output is identical either way.
    pub parallel: bool,
}

/// Compiles `program` into its expanded transition table.
///
/// The program is fully validated before any transition is produced, so an error
/// means no part of the table is valid.
///
/// # Arguments
///
/// * `program` - The program to compile.
/// * `options` - Compilation options.
///
/// # Returns
///
/// * `Ok(TransitionTable)` holding every resolved transition.
/// * `Err(CompileError)` if the program is invalid.
pub fn compile(
    program: &Program,
    options: CompileOptions,
) -> Result<TransitionTable, CompileError> {
    let states = FlagStates::new(&program.flags)?;
    validate(program, &states)?;

    debug!(
        name = %program.name,
        flags = program.flags.len(),
        labels = program.blocks.len(),
        states = program.blocks.len() * states.len(),
        "compiling program"
    );

    let transitions = expand(program, &states, options.parallel)?;

    debug!(transitions = transitions.len(), "expanded program");

    Ok(TransitionTable {
        name: program.name.clone(),
        flags: program.flags.clone(),
        flag_states: states.iter().map(|state| states.members(state)).collect(),
        labels: program.labels(),
        // The empty flag set is always canonical index 0.
        start: StateId::new(program.start.clone(), 0),
        transitions,
    })
}

/// Compiles `program` and emits the table as text.
pub fn compile_to_string(
    program: &Program,
    options: CompileOptions,
    emit_options: EmitOptions,
) -> Result<String, CompileError> {
    compile(program, options).map(|table| emit(&table, emit_options))
}
