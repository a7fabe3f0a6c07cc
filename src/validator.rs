//! This module validates a program before expansion so that compilation fails atomically:
//! either the whole table is produced or nothing is. It checks the program name, the declared
//! flags, the start label, label names, jump destinations, flag references on both sides of a
//! rule, symbols, and that no two concrete states would be printed with the same name.

use crate::flags::FlagStates;
use crate::types::{
    CompileError, FlagLiteral, Program, Target, BOOTSTRAP_STATE, HALT_ACCEPT, HALT_REJECT,
};
use std::collections::{HashMap, HashSet};

type Check = fn(&Program, &FlagStates) -> Result<(), CompileError>;

/// Validates `program` against its flag states.
///
/// The checks run in a fixed order and the first failure is returned.
///
/// # Arguments
///
/// * `program` - The program to validate.
/// * `states` - The flag states built from the program's declared flags. Building them
///   already rejects duplicate flags and flag lists that are too long.
///
/// # Returns
///
/// * `Ok(())` if the program can be expanded.
/// * `Err(CompileError)` describing the first problem found.
pub fn validate(program: &Program, states: &FlagStates) -> Result<(), CompileError> {
    let checks: [Check; 8] = [
        check_name,
        check_flags,
        check_start_label,
        check_labels,
        check_destinations,
        check_flag_names,
        check_symbols,
        check_state_names,
    ];

    checks.iter().try_for_each(|check| check(program, states))
}

/// Checks that the name fits on the single comment line it is emitted in.
fn check_name(program: &Program, _: &FlagStates) -> Result<(), CompileError> {
    if program.name.contains(['\n', '\r']) {
        return Err(CompileError::InvalidName(program.name.clone()));
    }

    Ok(())
}

/// Checks that every declared flag is an identifier, the form conditions and
/// directives can name.
fn check_flags(program: &Program, _: &FlagStates) -> Result<(), CompileError> {
    match program.flags.iter().find(|flag| !is_identifier(flag)) {
        Some(flag) => Err(CompileError::InvalidFlag(flag.clone())),
        None => Ok(()),
    }
}

/// Checks that the start label is one of the declared labels.
fn check_start_label(program: &Program, _: &FlagStates) -> Result<(), CompileError> {
    if program.block(&program.start).is_none() {
        return Err(CompileError::UndefinedStartLabel(program.start.clone()));
    }

    Ok(())
}

/// Checks that labels are unique, printable, and not terminal state names.
fn check_labels(program: &Program, _: &FlagStates) -> Result<(), CompileError> {
    let mut seen = HashSet::new();

    for block in &program.blocks {
        let label = &block.label;
        if !is_token(label) {
            return Err(CompileError::InvalidLabel(label.clone()));
        }
        if label == HALT_ACCEPT || label == HALT_REJECT {
            return Err(CompileError::ReservedLabel(label.clone()));
        }
        if !seen.insert(label.as_str()) {
            return Err(CompileError::DuplicateLabel(label.clone()));
        }
    }

    Ok(())
}

/// Checks that every jump names a declared label.
///
/// Every rule is checked, including rules no flag state ever selects.
fn check_destinations(program: &Program, _: &FlagStates) -> Result<(), CompileError> {
    let labels: HashSet<&str> = program.blocks.iter().map(|b| b.label.as_str()).collect();

    for block in &program.blocks {
        for transition in &block.transitions {
            if let Target::Jump { label, .. } = &transition.target {
                if !labels.contains(label.as_str()) {
                    return Err(CompileError::InvalidDestinationLabel {
                        label: block.label.clone(),
                        target: label.clone(),
                    });
                }
            }
        }
    }

    Ok(())
}

/// Checks that required flags and flag directives only name declared flags.
fn check_flag_names(program: &Program, states: &FlagStates) -> Result<(), CompileError> {
    for block in &program.blocks {
        for transition in &block.transitions {
            let mut flags = transition
                .required
                .iter()
                .chain(transition.target.directives());

            if let Some(FlagLiteral { name, .. }) =
                flags.find(|flag| states.position(&flag.name).is_none())
            {
                return Err(CompileError::InvalidFlagName {
                    label: block.label.clone(),
                    flag: name.clone(),
                });
            }
        }
    }

    Ok(())
}

/// Checks that read and write symbols can be written to the output format.
fn check_symbols(program: &Program, _: &FlagStates) -> Result<(), CompileError> {
    for block in &program.blocks {
        for transition in &block.transitions {
            for symbol in [&transition.read, &transition.write] {
                if !is_token(symbol) {
                    return Err(CompileError::InvalidSymbol {
                        label: block.label.clone(),
                        symbol: symbol.clone(),
                    });
                }
            }
        }
    }

    Ok(())
}

/// Checks that every concrete state prints to a distinct name.
///
/// State names are `<label><index>`, so a label `A1` at index 0 and a label `A` at
/// index 10 would both print as `A10`. The bootstrap state and the terminal tokens
/// take part in the check as well.
fn check_state_names(program: &Program, states: &FlagStates) -> Result<(), CompileError> {
    let mut names: HashMap<String, String> = HashMap::new();
    for reserved in [BOOTSTRAP_STATE, HALT_ACCEPT, HALT_REJECT] {
        names.insert(reserved.to_string(), format!("reserved state `{reserved}`"));
    }

    for block in &program.blocks {
        for index in 0..states.len() {
            let name = format!("{}{}", block.label, index);
            let owner = format!("label `{}` at flag state {}", block.label, index);

            if let Some(first) = names.get(&name) {
                return Err(CompileError::AmbiguousStateName {
                    name,
                    first: first.clone(),
                    second: owner,
                });
            }

            names.insert(name, owner);
        }
    }

    Ok(())
}

/// Returns whether `value` is a letter or `_` followed by letters, digits, `_` or `-`.
fn is_identifier(value: &str) -> bool {
    let mut chars = value.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

/// Returns whether `value` can be written as a single whitespace-separated token.
fn is_token(value: &str) -> bool {
    !value.is_empty() && !value.chars().any(|c| c.is_whitespace() || c == ';')
}
