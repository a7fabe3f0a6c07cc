//! This module provides the `ProgramLoader` struct, responsible for loading programs
//! from files and strings. Files ending in `.json` are read as serialized `Program`s;
//! everything else is parsed as `.ftm` source.

use crate::flags::FlagStates;
use crate::parser::parse;
use crate::types::{CompileError, Program};
use crate::validator::validate;
use std::fs;
use std::path::{Path, PathBuf};

/// The extension of program source files.
pub const SOURCE_EXTENSION: &str = "ftm";
/// The extension of serialized programs.
pub const JSON_EXTENSION: &str = "json";

/// `ProgramLoader` is a utility struct for loading programs.
/// It provides methods to load programs from individual files, from string content,
/// and to discover and load all `.ftm` files within a specified directory.
pub struct ProgramLoader;

impl ProgramLoader {
    /// Loads a single program from the specified file path.
    ///
    /// # Arguments
    ///
    /// * `path` - The `.ftm` or `.json` file to load.
    ///
    /// # Returns
    ///
    /// * `Ok(Program)` if the file is read, parsed and validated.
    /// * `Err(CompileError::FileError)` if the file cannot be read or is not valid JSON.
    /// * `Err(CompileError)` of the matching kind if the program is invalid.
    pub fn load_program(path: &Path) -> Result<Program, CompileError> {
        let content = fs::read_to_string(path).map_err(|e| {
            CompileError::FileError(format!("Failed to read file {}: {}", path.display(), e))
        })?;

        if path.extension().is_some_and(|ext| ext == JSON_EXTENSION) {
            Self::load_program_from_json(&content).map_err(|e| match e {
                CompileError::FileError(message) => {
                    CompileError::FileError(format!("{}: {}", path.display(), message))
                }
                other => other,
            })
        } else {
            parse(&content)
        }
    }

    /// Loads a single program from `.ftm` source text.
    ///
    /// # Arguments
    ///
    /// * `content` - A string slice containing the program definition.
    ///
    /// # Returns
    ///
    /// * `Ok(Program)` if the content is successfully parsed into a `Program`.
    /// * `Err(CompileError)` if the content is not a valid program.
    pub fn load_program_from_string(content: &str) -> Result<Program, CompileError> {
        parse(content)
    }

    /// Loads a single program from its JSON serialization.
    ///
    /// The program is validated the same way parsed source is, so a loaded
    /// program is always ready to compile.
    pub fn load_program_from_json(content: &str) -> Result<Program, CompileError> {
        let program: Program = serde_json::from_str(content)
            .map_err(|e| CompileError::FileError(format!("Invalid program JSON: {e}")))?;

        let states = FlagStates::new(&program.flags)?;
        validate(&program, &states)?;

        Ok(program)
    }

    /// Loads all program source files (`.ftm` extension) from a given directory.
    ///
    /// Directories and files with other extensions are skipped.
    ///
    /// # Arguments
    ///
    /// * `directory` - The directory to scan for programs.
    ///
    /// # Returns
    ///
    /// * `Vec<Result<(PathBuf, Program), CompileError>>` - One entry per source file, holding
    ///   either its path and program or the error that stopped it from loading.
    pub fn load_programs(directory: &Path) -> Vec<Result<(PathBuf, Program), CompileError>> {
        if !directory.exists() {
            return vec![Err(CompileError::FileError(format!(
                "Directory {} does not exist",
                directory.display()
            )))];
        }

        let entries = match fs::read_dir(directory) {
            Ok(entries) => entries,
            Err(e) => {
                return vec![Err(CompileError::FileError(format!(
                    "Failed to read directory {}: {}",
                    directory.display(),
                    e
                )))]
            }
        };

        let mut paths = Vec::new();
        for entry in entries {
            match entry {
                Ok(entry) => paths.push(entry.path()),
                Err(e) => {
                    return vec![Err(CompileError::FileError(format!(
                        "Failed to read directory entry: {}",
                        e
                    )))]
                }
            }
        }

        // Directory order is platform dependent.
        paths.sort();

        paths
            .into_iter()
            .filter(|path| {
                !path.is_dir() && path.extension().is_some_and(|ext| ext == SOURCE_EXTENSION)
            })
            .map(|path| match Self::load_program(&path) {
                Ok(program) => Ok((path, program)),
                Err(e) => Err(CompileError::FileError(format!(
                    "Failed to load program from {}: {}",
                    path.display(),
                    e
                ))),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Target;
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;

    const VALID_PROGRAM: &str =
        "name: Test Program\nflags: [seen]\nlabels:\n  start:\n    a -> b, R, stop {seen}\n  stop:\n    _ -> S, halt-accept\n";

    fn write_file(path: &Path, content: &str) {
        let mut file = File::create(path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
    }

    #[test]
    fn test_load_valid_program() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("test.ftm");
        write_file(&file_path, VALID_PROGRAM);

        let program = ProgramLoader::load_program(&file_path).unwrap();
        assert_eq!(program.name, "Test Program");
        assert_eq!(program.start, "start");
        assert_eq!(program.labels(), vec!["start", "stop"]);
        assert_eq!(program.flags, vec!["seen"]);
    }

    #[test]
    fn test_load_invalid_program() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("invalid.ftm");
        write_file(&file_path, "This is not a valid program");

        assert!(ProgramLoader::load_program(&file_path).is_err());
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempdir().unwrap();
        let result = ProgramLoader::load_program(&dir.path().join("missing.ftm"));

        assert!(matches!(result, Err(CompileError::FileError(_))));
    }

    #[test]
    fn test_load_json_program() {
        let program = ProgramLoader::load_program_from_string(VALID_PROGRAM).unwrap();

        let dir = tempdir().unwrap();
        let file_path = dir.path().join("test.json");
        write_file(&file_path, &serde_json::to_string(&program).unwrap());

        let loaded = ProgramLoader::load_program(&file_path).unwrap();
        assert_eq!(loaded, program);
        assert_eq!(loaded.blocks[1].transitions[0].target, Target::Accept);
    }

    #[test]
    fn test_load_json_validates() {
        let json = r#"{
            "name": "Broken",
            "flags": ["seen"],
            "blocks": [{
                "label": "start",
                "transitions": [{
                    "required": ["ghost"],
                    "read": "a",
                    "write": "a",
                    "direction": "Right",
                    "target": "accept"
                }]
            }],
            "start": "start"
        }"#;

        assert_eq!(
            ProgramLoader::load_program_from_json(json),
            Err(CompileError::InvalidFlagName {
                label: "start".into(),
                flag: "ghost".into(),
            })
        );

        assert!(matches!(
            ProgramLoader::load_program_from_json("{ not json"),
            Err(CompileError::FileError(_))
        ));
    }

    #[test]
    fn test_load_json_rejects_lines_in_header_text() {
        let json = r#"{
            "name": "Evil\nA0 0 0 r halt-accept",
            "flags": [],
            "blocks": [{"label": "A", "transitions": []}],
            "start": "A"
        }"#;
        assert!(matches!(
            ProgramLoader::load_program_from_json(json),
            Err(CompileError::InvalidName(_))
        ));

        let json = r#"{
            "name": "Evil",
            "flags": ["f\nA0 1 1 r halt-reject"],
            "blocks": [{"label": "A", "transitions": []}],
            "start": "A"
        }"#;
        assert_eq!(
            ProgramLoader::load_program_from_json(json),
            Err(CompileError::InvalidFlag("f\nA0 1 1 r halt-reject".into()))
        );
    }

    #[test]
    fn test_load_programs_from_directory() {
        let dir = tempdir().unwrap();

        write_file(&dir.path().join("valid.ftm"), VALID_PROGRAM);
        write_file(&dir.path().join("invalid.ftm"), "This is not a valid program");
        write_file(&dir.path().join("ignored.txt"), "This file should be ignored");

        let results = ProgramLoader::load_programs(dir.path());

        // Sorted by path: invalid.ftm, then valid.ftm.
        assert_eq!(results.len(), 2);
        assert!(results[0].is_err());
        assert!(results[1].is_ok());
    }

    #[test]
    fn test_load_programs_missing_directory() {
        let dir = tempdir().unwrap();
        let results = ProgramLoader::load_programs(&dir.path().join("nowhere"));

        assert_eq!(results.len(), 1);
        assert!(matches!(results[0], Err(CompileError::FileError(_))));
    }
}
