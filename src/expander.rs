//! This module expands flag-guarded blocks into concrete transitions.
//!
//! Every block is expanded once per flag state, in canonical order. For each
//! (state, read-symbol) pair at most one rule is emitted: the first applicable one
//! in declaration order. Blocks do not depend on each other, so they can be
//! expanded in parallel and concatenated in declaration order afterwards.

use crate::flags::{FlagSet, FlagStates, UnknownFlag};
use crate::resolver::Resolver;
use crate::types::{Block, CompileError, CompiledTransition, Program, StateId, StateRef, Target};
use rayon::prelude::*;
use std::collections::HashSet;
use tracing::trace;

/// Expands every block of `program`.
///
/// # Arguments
///
/// * `program` - The program to expand. It is expected to have been validated.
/// * `states` - The flag states of the program.
/// * `parallel` - Expand blocks on the rayon thread pool.
///
/// # Returns
///
/// * `Ok(Vec<CompiledTransition>)` in label declaration order, then flag-state order,
///   then rule declaration order.
/// * `Err(CompileError)` if a rule references an undeclared label or flag.
pub fn expand(
    program: &Program,
    states: &FlagStates,
    parallel: bool,
) -> Result<Vec<CompiledTransition>, CompileError> {
    let blocks: Vec<Vec<CompiledTransition>> = if parallel {
        program
            .blocks
            .par_iter()
            .map(|block| expand_block(program, states, block))
            .collect::<Result<_, _>>()?
    } else {
        program
            .blocks
            .iter()
            .map(|block| expand_block(program, states, block))
            .collect::<Result<_, _>>()?
    };

    Ok(blocks.into_iter().flatten().collect())
}

/// Expands a single block across all flag states.
pub fn expand_block(
    program: &Program,
    states: &FlagStates,
    block: &Block,
) -> Result<Vec<CompiledTransition>, CompileError> {
    let resolver = Resolver::new(states, block);
    let mut transitions = Vec::new();

    // Keys are (flag-state index, read symbol). Scoped to this block only.
    let mut resolved: HashSet<(usize, &str)> = HashSet::new();

    for (index, state) in states.iter().enumerate() {
        let source = StateId::new(&block.label, index);

        for rule in &block.transitions {
            let key = (index, rule.read.as_str());
            if resolved.contains(&key) || !resolver.applies(rule, state)? {
                continue;
            }

            transitions.push(CompiledTransition {
                source: source.clone(),
                read: rule.read.clone(),
                write: rule.write.clone(),
                direction: rule.direction,
                destination: destination(program, states, block, state, &rule.target)?,
            });
            resolved.insert(key);
        }
    }

    trace!(
        label = %block.label,
        transitions = transitions.len(),
        "expanded block"
    );

    Ok(transitions)
}

/// Computes the concrete destination of a rule taken from `state` in `block`.
fn destination(
    program: &Program,
    states: &FlagStates,
    block: &Block,
    state: FlagSet,
    target: &Target,
) -> Result<StateRef, CompileError> {
    let (label, directives) = match target {
        Target::Accept => return Ok(StateRef::Accept),
        Target::Reject => return Ok(StateRef::Reject),
        Target::Continue { flags } => (&block.label, flags),
        Target::Jump { label, flags } => {
            if program.block(label).is_none() {
                return Err(CompileError::InvalidDestinationLabel {
                    label: block.label.clone(),
                    target: label.clone(),
                });
            }
            (label, flags)
        }
    };

    let next = states
        .overwrite(state, directives)
        .map_err(|UnknownFlag(flag)| CompileError::InvalidFlagName {
            label: block.label.clone(),
            flag,
        })?;

    let index = states.index_of(next).ok_or_else(|| {
        CompileError::ValidationError(format!(
            "Flag state {:?} has no canonical index",
            states.members(next)
        ))
    })?;

    Ok(StateRef::Concrete(StateId::new(label.clone(), index)))
}
