//! Rule resolution for a single block under a fixed flag state.
//!
//! Rules are scanned in declaration order. A rule is a candidate when all of its
//! required flags match the flag state; the first candidate for a read-symbol
//! literal wins and later candidates for the same literal are ignored. Literals
//! are compared as opaque tokens, so `*` only matches a rule that reads `*`.

use crate::flags::{FlagSet, FlagStates, UnknownFlag};
use crate::types::{Block, CompileError, Transition};

/// Resolves the rules of one block against flag states.
pub struct Resolver<'a> {
    states: &'a FlagStates,
    block: &'a Block,
}

impl<'a> Resolver<'a> {
    pub fn new(states: &'a FlagStates, block: &'a Block) -> Self {
        Self { states, block }
    }

    /// Returns whether `transition` is a candidate under `state`.
    pub fn applies(&self, transition: &Transition, state: FlagSet) -> Result<bool, CompileError> {
        self.states
            .satisfies(state, &transition.required)
            .map_err(|UnknownFlag(flag)| CompileError::InvalidFlagName {
                label: self.block.label.clone(),
                flag,
            })
    }

    /// Returns the rule that handles `symbol` under `state`, if any.
    ///
    /// `None` means no transition is emitted for the pair and the interpreter's own
    /// behaviour for unmapped symbols takes over.
    pub fn resolve_symbol(
        &self,
        state: FlagSet,
        symbol: &str,
    ) -> Result<Option<&'a Transition>, CompileError> {
        for transition in &self.block.transitions {
            if transition.read == symbol && self.applies(transition, state)? {
                return Ok(Some(transition));
            }
        }

        Ok(None)
    }
}
