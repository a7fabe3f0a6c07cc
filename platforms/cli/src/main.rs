mod logging;

use clap::{Parser, ValueEnum};
use flagtur::{
    compile, emit, emit_json, CompileOptions, EmitOptions, Program, ProgramInfo, ProgramLoader,
    ProgramManager,
};
use std::fs;
use std::io::{self, Read};
use std::path::Path;
use std::process::ExitCode;
use tracing::info;

/// Compiles flag-guarded Turing machine programs into flat transition tables.
#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
#[clap(after_help = "EXAMPLES:
  flagtur samples/palindrome.ftm
  flagtur --sample palindrome --no-comments -o palindrome.txt
  cat samples/parity.ftm | flagtur --format json")]
struct Cli {
    /// Path to a program file (.ftm or .json).
    /// Program source can also be piped via stdin.
    program_file: Option<String>,

    /// Compile a built-in sample program by name
    #[clap(short, long, conflicts_with = "program_file")]
    sample: Option<String>,

    /// List the built-in sample programs and exit
    #[clap(long)]
    list_samples: bool,

    /// Write the output to a file instead of stdout
    #[clap(short, long)]
    output: Option<String>,

    /// Leave out the comment sections before the transitions
    #[clap(long)]
    no_comments: bool,

    /// Output format
    #[clap(short, long, value_enum, default_value_t = Format::Text)]
    format: Format,

    /// Expand labels in parallel
    #[clap(long)]
    parallel: bool,

    /// Increase log verbosity (-v, -vv, -vvv)
    #[clap(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Format {
    /// Transition table text, one transition per line
    Text,
    /// The compiled table as JSON
    Json,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = logging::init_logging(cli.verbose) {
        eprintln!("{}", e);
    }

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<(), String> {
    if cli.list_samples {
        print!("{}", list_samples());
        return Ok(());
    }

    let program = load_program(cli)?;
    let table = compile(
        &program,
        CompileOptions {
            parallel: cli.parallel,
        },
    )
    .map_err(|e| e.to_string())?;

    let output = match cli.format {
        Format::Text => emit(
            &table,
            EmitOptions {
                comments: !cli.no_comments,
            },
        ),
        Format::Json => emit_json(&table).map_err(|e| e.to_string())? + "\n",
    };

    match &cli.output {
        Some(path) => {
            fs::write(path, output)
                .map_err(|e| format!("Failed to write file '{}': {}", path, e))?;
            info!(
                path = %path,
                transitions = table.transitions.len(),
                "wrote transition table"
            );
        }
        None => print!("{}", output),
    }

    Ok(())
}

/// Loads the program from a sample name, a file path, or piped stdin, in that order.
fn load_program(cli: &Cli) -> Result<Program, String> {
    if let Some(name) = &cli.sample {
        ProgramManager::get_program_by_name(name).map_err(|e| e.to_string())
    } else if let Some(file_path) = &cli.program_file {
        ProgramLoader::load_program(Path::new(file_path)).map_err(|e| e.to_string())
    } else if atty::isnt(atty::Stream::Stdin) {
        let mut buffer = String::new();
        io::stdin()
            .read_to_string(&mut buffer)
            .map_err(|e| format!("Failed to read from stdin: {}", e))?;
        ProgramLoader::load_program_from_string(&buffer).map_err(|e| e.to_string())
    } else {
        Err("No program given. Pass a file, pipe one via stdin, or use --sample.".to_string())
    }
}

/// Formats one line per sample with its counts.
fn list_samples() -> String {
    (0..ProgramManager::get_program_count())
        .filter_map(|index| ProgramManager::get_program_info(index).ok())
        .map(|info| format_info(&info))
        .collect()
}

fn format_info(info: &ProgramInfo) -> String {
    format!(
        "{}: {} (start: {}, flags: {}, labels: {}, rules: {}, states: {})\n",
        info.index,
        info.name,
        info.start,
        info.flag_count,
        info.label_count,
        info.rule_count,
        info.state_count
    )
}
