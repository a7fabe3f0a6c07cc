//! Flag-state enumeration and the overwrite rules for flag directives.
//!
//! A flag state is a subset of the declared flags. For `F` flags there are `2^F` of
//! them, and each one gets a stable index: its position in the canonical order.
//! The canonical order lists subsets by increasing size and, within one size,
//! in combination order over the declared flag order. For flags `[a, b, c]`:
//!
//! ```text
//! 0: {}   1: {a}   2: {b}   3: {c}   4: {a, b}   5: {a, c}   6: {b, c}   7: {a, b, c}
//! ```
//!
//! State names embed these indices, so the order is part of the output format.

use crate::types::{CompileError, FlagLiteral, MAX_FLAGS};
use std::collections::HashMap;

/// A set of flags, stored as a bitmask over declared flag positions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FlagSet(u32);

impl FlagSet {
    /// The set with no flags.
    pub const EMPTY: FlagSet = FlagSet(0);

    /// Returns whether the flag at `position` is a member.
    pub fn contains(self, position: usize) -> bool {
        self.0 & (1 << position) != 0
    }

    /// Returns a copy with the flag at `position` added.
    pub fn with(self, position: usize) -> Self {
        FlagSet(self.0 | (1 << position))
    }

    /// Returns a copy with the flag at `position` removed.
    pub fn without(self, position: usize) -> Self {
        FlagSet(self.0 & !(1 << position))
    }

    /// The number of member flags.
    pub fn len(self) -> usize {
        self.0.count_ones() as usize
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

/// A directive or condition named a flag that was never declared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownFlag(pub String);

/// The canonical enumeration of every flag state of a program.
#[derive(Debug, Clone)]
pub struct FlagStates {
    flags: Vec<String>,
    positions: HashMap<String, usize>,
    states: Vec<FlagSet>,
    indices: HashMap<FlagSet, usize>,
}

impl FlagStates {
    /// Enumerates all subsets of `flags` in canonical order.
    ///
    /// # Arguments
    ///
    /// * `flags` - The declared flags, in declaration order.
    ///
    /// # Returns
    ///
    /// * `Ok(FlagStates)` holding `2^flags.len()` states.
    /// * `Err(CompileError::DuplicateFlag)` if a flag is declared twice.
    /// * `Err(CompileError::TooManyFlags)` if more than `MAX_FLAGS` flags are declared.
    pub fn new(flags: &[String]) -> Result<Self, CompileError> {
        if flags.len() > MAX_FLAGS {
            return Err(CompileError::TooManyFlags(flags.len()));
        }

        let mut positions = HashMap::with_capacity(flags.len());
        for (position, flag) in flags.iter().enumerate() {
            if positions.insert(flag.clone(), position).is_some() {
                return Err(CompileError::DuplicateFlag(flag.clone()));
            }
        }

        let states = enumerate(flags.len());
        let indices = states
            .iter()
            .enumerate()
            .map(|(index, &state)| (state, index))
            .collect();

        Ok(Self {
            flags: flags.to_vec(),
            positions,
            states,
            indices,
        })
    }

    /// The declared flags, in declaration order.
    pub fn flags(&self) -> &[String] {
        &self.flags
    }

    /// The number of flag states, `2^F`.
    pub fn len(&self) -> usize {
        self.states.len()
    }

    /// Always false: the empty set is a state even when no flags are declared.
    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// Iterates the states in canonical order; the iteration position is the index.
    pub fn iter(&self) -> impl Iterator<Item = FlagSet> + '_ {
        self.states.iter().copied()
    }

    /// Returns the state at `index`.
    pub fn get(&self, index: usize) -> Option<FlagSet> {
        self.states.get(index).copied()
    }

    /// Returns the canonical index of `state`.
    pub fn index_of(&self, state: FlagSet) -> Option<usize> {
        self.indices.get(&state).copied()
    }

    /// Returns the declaration position of the flag called `name`.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.positions.get(name).copied()
    }

    /// Returns the member flag names of `state`, sorted by name.
    pub fn members(&self, state: FlagSet) -> Vec<String> {
        let mut members: Vec<String> = self
            .flags
            .iter()
            .enumerate()
            .filter(|(position, _)| state.contains(*position))
            .map(|(_, flag)| flag.clone())
            .collect();
        members.sort();
        members
    }

    /// Builds the state holding exactly the named flags.
    pub fn state_of<S: AsRef<str>>(&self, names: &[S]) -> Result<FlagSet, UnknownFlag> {
        names.iter().try_fold(FlagSet::EMPTY, |state, name| {
            let name = name.as_ref();
            self.position(name)
                .map(|position| state.with(position))
                .ok_or_else(|| UnknownFlag(name.to_string()))
        })
    }

    /// Returns whether `state` satisfies every condition in `required`.
    ///
    /// A condition `name` needs the flag present, `!name` needs it absent.
    pub fn satisfies(
        &self,
        state: FlagSet,
        required: &[FlagLiteral],
    ) -> Result<bool, UnknownFlag> {
        for condition in required {
            let position = self.lookup(&condition.name)?;
            if state.contains(position) != condition.value {
                return Ok(false);
            }
        }

        Ok(true)
    }

    /// Applies flag directives to `state`.
    ///
    /// `name` sets the flag and `!name` clears it; both are idempotent. Flags the
    /// directives do not mention keep their membership. Directives apply in order,
    /// so a later directive on the same flag wins.
    pub fn overwrite(
        &self,
        state: FlagSet,
        directives: &[FlagLiteral],
    ) -> Result<FlagSet, UnknownFlag> {
        directives.iter().try_fold(state, |state, directive| {
            let position = self.lookup(&directive.name)?;
            Ok(if directive.value {
                state.with(position)
            } else {
                state.without(position)
            })
        })
    }

    fn lookup(&self, name: &str) -> Result<usize, UnknownFlag> {
        self.position(name).ok_or_else(|| UnknownFlag(name.to_string()))
    }
}

/// Lists every subset of `count` flag positions in canonical order.
fn enumerate(count: usize) -> Vec<FlagSet> {
    let mut states = Vec::with_capacity(1 << count);
    for size in 0..=count {
        states.extend(combinations(count, size));
    }
    states
}

/// Lists the `size`-element subsets of `0..count` in lexicographic order.
fn combinations(count: usize, size: usize) -> Vec<FlagSet> {
    let mut result = Vec::new();
    let mut picks: Vec<usize> = (0..size).collect();

    loop {
        result.push(
            picks
                .iter()
                .fold(FlagSet::EMPTY, |state, &position| state.with(position)),
        );

        // Rightmost pick that can still move right.
        let Some(i) = (0..size).rev().find(|&i| picks[i] != i + count - size) else {
            break;
        };

        picks[i] += 1;
        for j in i + 1..size {
            picks[j] = picks[j - 1] + 1;
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::HashSet;

    fn names(flags: &[&str]) -> Vec<String> {
        flags.iter().map(|flag| flag.to_string()).collect()
    }

    fn members_by_index(states: &FlagStates) -> Vec<Vec<String>> {
        states.iter().map(|state| states.members(state)).collect()
    }

    #[test]
    fn test_no_flags_has_single_empty_state() {
        let states = FlagStates::new(&[]).unwrap();
        assert_eq!(states.len(), 1);
        assert_eq!(states.get(0), Some(FlagSet::EMPTY));
    }

    #[test]
    fn test_canonical_order_three_flags() {
        let states = FlagStates::new(&names(&["a", "b", "c"])).unwrap();
        let expected: Vec<Vec<String>> = vec![
            vec![],
            vec!["a".into()],
            vec!["b".into()],
            vec!["c".into()],
            vec!["a".into(), "b".into()],
            vec!["a".into(), "c".into()],
            vec!["b".into(), "c".into()],
            vec!["a".into(), "b".into(), "c".into()],
        ];
        assert_eq!(members_by_index(&states), expected);
    }

    #[test]
    fn test_order_follows_declaration_not_name() {
        // Members are listed sorted, but the order of states follows declaration.
        let states = FlagStates::new(&names(&["zeta", "alpha"])).unwrap();
        assert_eq!(
            members_by_index(&states),
            vec![
                vec![],
                vec!["zeta".to_string()],
                vec!["alpha".to_string()],
                vec!["alpha".to_string(), "zeta".to_string()],
            ]
        );
    }

    #[test]
    fn test_state_of_is_order_insensitive() {
        let states = FlagStates::new(&names(&["a", "b", "c"])).unwrap();
        let forward = states.state_of(&["a", "c"]).unwrap();
        let backward = states.state_of(&["c", "a", "c"]).unwrap();
        assert_eq!(forward, backward);
        assert_eq!(states.index_of(forward), Some(5));
        assert_eq!(states.state_of(&["nope"]), Err(UnknownFlag("nope".into())));
    }

    #[test]
    fn test_duplicate_flag_rejected() {
        let result = FlagStates::new(&names(&["a", "b", "a"]));
        assert_eq!(result.unwrap_err(), CompileError::DuplicateFlag("a".into()));
    }

    #[test]
    fn test_too_many_flags_rejected() {
        let flags: Vec<String> = (0..=MAX_FLAGS).map(|i| format!("f{i}")).collect();
        assert_eq!(
            FlagStates::new(&flags).unwrap_err(),
            CompileError::TooManyFlags(MAX_FLAGS + 1)
        );
    }

    #[test]
    fn test_satisfies() {
        let states = FlagStates::new(&names(&["a", "b"])).unwrap();
        let a = states.state_of(&["a"]).unwrap();

        assert!(states.satisfies(a, &[]).unwrap());
        assert!(states.satisfies(a, &[FlagLiteral::set("a")]).unwrap());
        assert!(states
            .satisfies(a, &[FlagLiteral::set("a"), FlagLiteral::clear("b")])
            .unwrap());
        assert!(!states.satisfies(a, &[FlagLiteral::set("b")]).unwrap());
        assert!(!states.satisfies(a, &[FlagLiteral::clear("a")]).unwrap());
        assert_eq!(
            states.satisfies(a, &[FlagLiteral::set("c")]),
            Err(UnknownFlag("c".into()))
        );
    }

    #[test]
    fn test_overwrite_sets_and_clears() {
        let states = FlagStates::new(&names(&["a", "b"])).unwrap();
        let a = states.state_of(&["a"]).unwrap();

        let result = states
            .overwrite(a, &[FlagLiteral::clear("a"), FlagLiteral::set("b")])
            .unwrap();
        assert_eq!(states.members(result), vec!["b".to_string()]);

        let unknown = states.overwrite(a, &[FlagLiteral::set("c")]);
        assert_eq!(unknown, Err(UnknownFlag("c".into())));
    }

    #[test]
    fn test_overwrite_later_directive_wins() {
        let states = FlagStates::new(&names(&["a"])).unwrap();
        let result = states
            .overwrite(
                FlagSet::EMPTY,
                &[FlagLiteral::set("a"), FlagLiteral::clear("a")],
            )
            .unwrap();
        assert!(result.is_empty());
    }

    proptest! {
        #[test]
        fn enumeration_is_complete_and_distinct(count in 0usize..=10) {
            let flags: Vec<String> = (0..count).map(|i| format!("f{i}")).collect();
            let states = FlagStates::new(&flags).unwrap();
            prop_assert_eq!(states.len(), 1usize << count);

            let distinct: HashSet<FlagSet> = states.iter().collect();
            prop_assert_eq!(distinct.len(), states.len());

            for (index, state) in states.iter().enumerate() {
                prop_assert_eq!(states.index_of(state), Some(index));
                let members = states.members(state);
                let mut sorted = members.clone();
                sorted.sort();
                sorted.dedup();
                prop_assert_eq!(members, sorted);
            }

            // Sizes never decrease along the canonical order.
            let sizes: Vec<usize> = states.iter().map(FlagSet::len).collect();
            prop_assert!(sizes.windows(2).all(|pair| pair[0] <= pair[1]));
        }

        #[test]
        fn enumeration_is_stable(count in 0usize..=8) {
            let flags: Vec<String> = (0..count).map(|i| format!("f{i}")).collect();
            let first = FlagStates::new(&flags).unwrap();
            let second = FlagStates::new(&flags).unwrap();
            prop_assert_eq!(first.iter().collect::<Vec<_>>(), second.iter().collect::<Vec<_>>());
        }

        #[test]
        fn overwrite_is_idempotent(bits in 0u32..16, flag in 0usize..4, set in any::<bool>()) {
            let states = FlagStates::new(&names(&["a", "b", "c", "d"])).unwrap();
            let state = FlagSet(bits);
            let directive = FlagLiteral { name: states.flags()[flag].clone(), value: set };

            let once = states.overwrite(state, &[directive.clone()]).unwrap();
            let twice = states.overwrite(state, &[directive.clone(), directive]).unwrap();
            prop_assert_eq!(once, twice);
        }

        #[test]
        fn overwrite_leaves_other_flags(bits in 0u32..16, flag in 0usize..4, other in 0usize..4, set in any::<bool>()) {
            prop_assume!(flag != other);
            let states = FlagStates::new(&names(&["a", "b", "c", "d"])).unwrap();
            let state = FlagSet(bits);
            let directive = FlagLiteral { name: states.flags()[flag].clone(), value: set };

            let result = states.overwrite(state, &[directive]).unwrap();
            prop_assert_eq!(result.contains(other), state.contains(other));
            prop_assert_eq!(result.contains(flag), set);
        }
    }
}
