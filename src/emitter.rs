//! This module serializes a compiled `TransitionTable` into the text format read by
//! two-symbol-tape Turing machine interpreters such as <http://morphett.info/turing/turing.html>.
//!
//! Format: one transition per line, `<state> <read> <write> <move> <next>`, where
//! the move is `l`, `r` or `*`. Lines starting with `;` are comments. The first
//! transition routes the interpreter's initial state `0` to the start state.

use crate::types::{CompiledTransition, TransitionTable, BOOTSTRAP_STATE, WILDCARD_SYMBOL};
use std::io;

/// Options controlling the emitted text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EmitOptions {
    /// Prefix the table with comment sections listing flags, flag states and labels.
    pub comments: bool,
}

impl Default for EmitOptions {
    fn default() -> Self {
        Self { comments: true }
    }
}

/// Emits `table` as text.
///
/// # Arguments
///
/// * `table` - The compiled table.
/// * `options` - Whether to include the informational comment sections.
///
/// # Returns
///
/// * `String` - The table text, one line per transition, ending with a newline.
pub fn emit(table: &TransitionTable, options: EmitOptions) -> String {
    let mut out = String::new();

    if options.comments {
        emit_header(&mut out, table);
    }

    out.push_str(&bootstrap_line(table));
    out.push('\n');
    for transition in &table.transitions {
        out.push_str(&transition_line(transition));
        out.push('\n');
    }

    out
}

/// Emits `table` as text into `writer`.
pub fn write_table<W: io::Write>(
    table: &TransitionTable,
    options: EmitOptions,
    writer: &mut W,
) -> io::Result<()> {
    writer.write_all(emit(table, options).as_bytes())
}

/// Emits `table` as pretty-printed JSON, keeping the structured records.
pub fn emit_json(table: &TransitionTable) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(table)
}

/// The transition that enters the start state from the interpreter's initial state.
///
/// The start state always uses flag-state index 0, the empty set of flags.
fn bootstrap_line(table: &TransitionTable) -> String {
    format!(
        "{} {w} {w} {w} {}",
        BOOTSTRAP_STATE,
        table.start,
        w = WILDCARD_SYMBOL
    )
}

fn transition_line(transition: &CompiledTransition) -> String {
    format!(
        "{} {} {} {} {}",
        transition.source,
        transition.read,
        transition.write,
        transition.direction.as_token(),
        transition.destination
    )
}

/// Writes the informational comment sections.
fn emit_header(out: &mut String, table: &TransitionTable) {
    if !table.name.is_empty() {
        out.push_str(&format!("; {}\n", table.name));
        out.push('\n');
    }

    out.push_str("; == Flags ==\n");
    for flag in &table.flags {
        out.push_str(&format!("; {flag}\n"));
    }
    out.push('\n');

    out.push_str("; == Flag states ==\n");
    for (index, members) in table.flag_states.iter().enumerate() {
        out.push_str(&format!("; {index}: {{{}}}\n", members.join(", ")));
    }
    out.push('\n');

    out.push_str("; == Labels ==\n");
    for label in &table.labels {
        out.push_str(&format!("; {label}\n"));
    }
    out.push('\n');

    out.push_str("; == Transitions ==\n");
}
