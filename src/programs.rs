//! This module embeds the sample programs shipped with the crate and provides
//! `ProgramManager` for looking them up.

use crate::parser::parse;
use crate::types::{CompileError, Program};
use std::sync::RwLock;
use tracing::warn;

// Embedded sample programs
const PROGRAM_TEXTS: [&str; 3] = [
    include_str!("../samples/palindrome.ftm"),
    include_str!("../samples/parity.ftm"),
    include_str!("../samples/zero-one-balance.ftm"),
];

lazy_static::lazy_static! {
    pub static ref PROGRAMS: RwLock<Vec<Program>> = RwLock::new(Vec::new());
}

pub struct ProgramManager;

impl ProgramManager {
    /// Parses the embedded samples into `PROGRAMS`. Samples that fail to parse are skipped.
    pub fn load() -> Result<(), CompileError> {
        let mut programs = Vec::new();

        for (index, program_text) in PROGRAM_TEXTS.iter().enumerate() {
            match parse(program_text) {
                Ok(program) => programs.push(program),
                Err(e) => warn!(index, error = %e, "failed to parse embedded sample"),
            }
        }

        let mut write_guard = PROGRAMS
            .write()
            .map_err(|_| CompileError::FileError("Failed to acquire write lock".to_string()))?;
        *write_guard = programs;

        Ok(())
    }

    /// Loads the samples unless that has already happened.
    fn ensure_loaded() -> Result<(), CompileError> {
        let loaded = PROGRAMS
            .read()
            .map(|programs| !programs.is_empty())
            .unwrap_or(false);

        if loaded {
            Ok(())
        } else {
            Self::load()
        }
    }

    /// Get the number of available programs
    pub fn get_program_count() -> usize {
        let _ = Self::ensure_loaded();

        PROGRAMS.read().map(|programs| programs.len()).unwrap_or(0)
    }

    /// Get a program by its index
    pub fn get_program_by_index(index: usize) -> Result<Program, CompileError> {
        Self::ensure_loaded()?;

        PROGRAMS
            .read()
            .map_err(|_| CompileError::FileError("Failed to acquire read lock".to_string()))?
            .get(index)
            .cloned()
            .ok_or_else(|| {
                CompileError::ValidationError(format!("Program index {} out of range", index))
            })
    }

    /// Get a program by its name, ignoring case
    pub fn get_program_by_name(name: &str) -> Result<Program, CompileError> {
        Self::ensure_loaded()?;

        PROGRAMS
            .read()
            .map_err(|_| CompileError::FileError("Failed to acquire read lock".to_string()))?
            .iter()
            .find(|program| program.name.eq_ignore_ascii_case(name))
            .cloned()
            .ok_or_else(|| CompileError::ValidationError(format!("Program '{}' not found", name)))
    }

    /// List all program names
    pub fn list_program_names() -> Vec<String> {
        let _ = Self::ensure_loaded();

        PROGRAMS
            .read()
            .map(|programs| {
                programs
                    .iter()
                    .map(|program| program.name.clone())
                    .collect()
            })
            .unwrap_or_else(|_| Vec::new())
    }

    /// Get information about a program by its index
    pub fn get_program_info(index: usize) -> Result<ProgramInfo, CompileError> {
        let program = Self::get_program_by_index(index)?;

        Ok(ProgramInfo::new(index, &program))
    }

    /// Get the source text of a program by its index
    pub fn get_program_text_by_index(index: usize) -> Result<&'static str, CompileError> {
        PROGRAM_TEXTS.get(index).copied().ok_or_else(|| {
            CompileError::ValidationError(format!("Program text index {} out of range", index))
        })
    }
}

/// Summary counts for a program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgramInfo {
    pub index: usize,
    pub name: String,
    pub start: String,
    pub flag_count: usize,
    pub label_count: usize,
    pub rule_count: usize,
    /// Concrete states after expansion: one per label and flag state. Saturates at
    /// `usize::MAX` for flag counts that could never be compiled.
    pub state_count: usize,
}

impl ProgramInfo {
    pub fn new(index: usize, program: &Program) -> Self {
        let label_count = program.blocks.len();

        Self {
            index,
            name: program.name.clone(),
            start: program.start.clone(),
            flag_count: program.flags.len(),
            label_count,
            rule_count: program.rule_count(),
            state_count: u32::try_from(program.flags.len())
                .ok()
                .and_then(|flags| 1usize.checked_shl(flags))
                .map_or(usize::MAX, |states| label_count.saturating_mul(states)),
        }
    }
}
