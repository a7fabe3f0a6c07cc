//! This module provides the parser for flag-guarded Turing machine programs, utilizing the
//! `pest` crate. It defines the grammar for `.ftm` files and functions to parse the input
//! into a `Program` struct.

use crate::{
    flags::FlagStates,
    types::{
        Block, CompileError, Direction, FlagLiteral, Program, Target, Transition, HALT_ACCEPT,
        HALT_REJECT, MAX_PROGRAM_SIZE,
    },
    validator::validate,
};
use pest::{
    error::{Error, ErrorVariant},
    iterators::{Pair, Pairs},
    Parser as PestParser, Span,
};
use pest_derive::Parser as PestParser;
use std::collections::HashSet;

/// The target that keeps the machine in the current label.
const CONTINUE_TARGET: &str = ".";

/// Derives a `PestParser` for the program grammar defined in `grammar.pest`.
#[derive(PestParser)]
#[grammar = "grammar.pest"]
pub struct ProgramParser;

/// Parses the given input string into a `Program` struct.
///
/// This is the main entry point for parsing program definitions. It trims the input,
/// parses it using the `ProgramParser`, and then processes the resulting parse tree
/// into a structured `Program`. The parsed program is validated before being returned.
///
/// # Arguments
///
/// * `input` - A string slice containing the program definition.
///
/// # Returns
///
/// * `Ok(Program)` if the input is successfully parsed and validated.
/// * `Err(CompileError::ParseError)` if there are any syntax errors.
/// * `Err(CompileError::ValidationError)` if a required section is missing.
/// * `Err(CompileError)` of the matching kind if the program fails validation.
pub fn parse(input: &str) -> Result<Program, CompileError> {
    if input.len() > MAX_PROGRAM_SIZE {
        return Err(CompileError::ValidationError(format!(
            "Program is too large: {} bytes (maximum {MAX_PROGRAM_SIZE})",
            input.len()
        )));
    }

    let root = ProgramParser::parse(Rule::program, input.trim())
        .map_err(|e| CompileError::ParseError(e.into()))?
        .next()
        .ok_or_else(|| CompileError::ValidationError("Empty program".to_string()))?;

    let program = parse_program(root)?;

    let states = FlagStates::new(&program.flags)?;
    validate(&program, &states)?;

    Ok(program)
}

/// Parses the top-level sections of a program from a `Pair<Rule::program>`.
fn parse_program(pair: Pair<Rule>) -> Result<Program, CompileError> {
    let mut name: Option<String> = None;
    let mut flags: Option<Vec<String>> = None;
    let mut start: Option<String> = None;
    let mut blocks: Option<Vec<Block>> = None;
    let mut seen = HashSet::new();

    for p in pair.into_inner() {
        let span = p.as_span();
        let rule = p.as_rule();

        check_unique_rule(rule, span, &mut seen)?;

        match rule {
            Rule::name => name = Some(parse_inner_string(p, span)?.trim().to_string()),
            Rule::flags => {
                flags = Some(p.into_inner().map(|f| f.as_str().to_string()).collect());
            }
            Rule::start => start = Some(parse_inner_string(p, span)?),
            Rule::labels => blocks = Some(parse_blocks(p)?),
            _ => {} // EOI
        }
    }

    let name = check_required_rule(name, "name")?;
    let blocks = check_required_rule(blocks, "labels")?;

    // The first label is the default start label.
    let start = start.or_else(|| blocks.first().map(|block| block.label.clone()));
    let start = check_required_rule(start, "start")?;

    Ok(Program {
        name,
        flags: flags.unwrap_or_default(),
        blocks,
        start,
    })
}

/// Parses the `labels:` section, rejecting labels declared twice.
fn parse_blocks(pair: Pair<Rule>) -> Result<Vec<Block>, CompileError> {
    let mut blocks: Vec<Block> = Vec::new();

    for block_pair in pair.into_inner() {
        let span = block_pair.as_span();
        let mut pairs = block_pair.into_inner();
        let label = parse_inner_string(next_pair(&mut pairs, span)?, span)?;

        if blocks.iter().any(|block| block.label == label) {
            return Err(parse_error(&format!("Duplicate label: {label}"), span));
        }

        let transitions = pairs
            .map(parse_transition)
            .collect::<Result<Vec<_>, _>>()?;

        blocks.push(Block { label, transitions });
    }

    Ok(blocks)
}

/// Parses a single rule from a `Pair<Rule::transition>`.
///
/// If `write` is omitted, it defaults to the read symbol.
fn parse_transition(pair: Pair<Rule>) -> Result<Transition, CompileError> {
    let span = pair.as_span();
    let mut pairs = pair.into_inner();

    let required = match pairs.peek().map(|p| p.as_rule()) {
        Some(Rule::conditions) => parse_flags(next_pair(&mut pairs, span)?)?,
        _ => Vec::new(),
    };

    let read = parse_symbol(next_pair(&mut pairs, span)?.as_str());
    let write = match pairs.peek().map(|p| p.as_rule()) {
        Some(Rule::symbol) => parse_symbol(next_pair(&mut pairs, span)?.as_str()),
        _ => read.clone(),
    };

    let direction = parse_direction(next_pair(&mut pairs, span)?)?;
    let target = next_pair(&mut pairs, span)?;
    let directives = match pairs.next() {
        Some(p) => parse_flags(p)?,
        None => Vec::new(),
    };

    Ok(Transition {
        required,
        read,
        write,
        direction,
        target: parse_target(target, directives)?,
    })
}

/// Parses a target, attaching the directives that follow it.
///
/// `.` continues in the current label; `halt-accept` and `halt-reject` halt and
/// cannot carry directives; anything else jumps to the named label.
fn parse_target(pair: Pair<Rule>, flags: Vec<FlagLiteral>) -> Result<Target, CompileError> {
    let span = pair.as_span();

    match pair.as_str() {
        CONTINUE_TARGET => Ok(Target::Continue { flags }),
        halt @ (HALT_ACCEPT | HALT_REJECT) => {
            if !flags.is_empty() {
                return Err(parse_error(
                    &format!("Flag directives are not allowed on {halt}"),
                    span,
                ));
            }

            Ok(if halt == HALT_ACCEPT {
                Target::Accept
            } else {
                Target::Reject
            })
        }
        label => Ok(Target::Jump {
            label: label.to_string(),
            flags,
        }),
    }
}

/// Parses a `[...]` condition list or a `{...}` directive list.
fn parse_flags(pair: Pair<Rule>) -> Result<Vec<FlagLiteral>, CompileError> {
    pair.into_inner()
        .map(|flag| {
            flag.as_str()
                .parse()
                .map_err(|e: String| parse_error(&e, flag.as_span()))
        })
        .collect()
}

/// Parses a single direction from a `Pair<Rule::direction>`.
///
/// Supports '<' or 'L' for Left, '>' or 'R' for Right, and '-' or 'S' for Stay.
fn parse_direction(pair: Pair<Rule>) -> Result<Direction, CompileError> {
    let span = pair.as_span();
    match pair.as_str() {
        "<" | "L" => Ok(Direction::Left),
        ">" | "R" => Ok(Direction::Right),
        "-" | "S" => Ok(Direction::Stay),
        _ => Err(parse_error(
            &format!("Unsupported direction: {}", pair.as_str()),
            span,
        )),
    }
}

/// Parses a symbol, removing the quotes around a quoted symbol.
fn parse_symbol(input: &str) -> String {
    input
        .strip_prefix('\'')
        .and_then(|s| s.strip_suffix('\''))
        .unwrap_or(input)
        .to_string()
}

/// Creates a `CompileError::ParseError` from a message and a `Span`.
fn parse_error(msg: &str, span: Span) -> CompileError {
    CompileError::ParseError(Box::new(Error::new_from_span(
        ErrorVariant::CustomError {
            message: msg.to_string(),
        },
        span,
    )))
}

/// Takes the next pair, which the grammar guarantees is present.
fn next_pair<'i>(pairs: &mut Pairs<'i, Rule>, span: Span) -> Result<Pair<'i, Rule>, CompileError> {
    pairs
        .next()
        .ok_or_else(|| parse_error("Unexpected end of rule", span))
}

/// Extracts the string content of the first inner pair.
fn parse_inner_string(pair: Pair<Rule>, span: Span) -> Result<String, CompileError> {
    Ok(next_pair(&mut pair.into_inner(), span)?.as_str().to_string())
}

/// Checks if a given section has already been declared.
fn check_unique_rule(
    rule: Rule,
    span: Span,
    seen: &mut HashSet<Rule>,
) -> Result<(), CompileError> {
    if !matches!(rule, Rule::name | Rule::flags | Rule::start | Rule::labels) {
        return Ok(());
    };

    if !seen.insert(rule) {
        return Err(parse_error(
            &format!("Duplicate \"{rule:?}:\" declaration"),
            span,
        ));
    }

    Ok(())
}

/// Checks if a required section is present, returning an `Err` if it's missing.
fn check_required_rule<T>(value: Option<T>, name: &str) -> Result<T, CompileError> {
    value.ok_or_else(|| CompileError::ValidationError(format!("Missing '{name}' section")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_program() {
        let input = r#"
name: Simple Test
flags: [seen]
start: scan
labels:
  scan:
    1 -> 1, R, . {seen}
    [seen] _ -> _, S, halt-accept
    _ -> _, S, halt-reject
"#;

        let program = parse(input).unwrap();
        assert_eq!(program.name, "Simple Test");
        assert_eq!(program.flags, vec!["seen"]);
        assert_eq!(program.start, "scan");
        assert_eq!(program.blocks.len(), 1);

        let block = &program.blocks[0];
        assert_eq!(block.label, "scan");
        assert_eq!(
            block.transitions[0],
            Transition {
                required: vec![],
                read: "1".into(),
                write: "1".into(),
                direction: Direction::Right,
                target: Target::Continue {
                    flags: vec![FlagLiteral::set("seen")],
                },
            }
        );
        assert_eq!(block.transitions[1].required, vec![FlagLiteral::set("seen")]);
        assert_eq!(block.transitions[1].target, Target::Accept);
        assert_eq!(block.transitions[2].target, Target::Reject);
    }

    #[test]
    fn test_parse_jump_with_directives() {
        let input = r#"
name: Jump
flags: [a, b]
labels:
  first:
    [a, !b] x -> y, L, second {!a, b}
  second:
    * -> *, -, halt-accept
"#;

        let program = parse(input).unwrap();
        let rule = &program.blocks[0].transitions[0];
        assert_eq!(
            rule.required,
            vec![FlagLiteral::set("a"), FlagLiteral::clear("b")]
        );
        assert_eq!(rule.direction, Direction::Left);
        assert_eq!(
            rule.target,
            Target::Jump {
                label: "second".into(),
                flags: vec![FlagLiteral::clear("a"), FlagLiteral::set("b")],
            }
        );
        assert_eq!(program.blocks[1].transitions[0].direction, Direction::Stay);
    }

    #[test]
    fn test_parse_default_start_is_first_label() {
        let input = r#"
name: Default Start
labels:
  begin:
    a -> b, R, halt-accept
  other:
"#;

        let program = parse(input).unwrap();
        assert_eq!(program.start, "begin");
        assert!(program.flags.is_empty());
        assert!(program.blocks[1].transitions.is_empty());
    }

    #[test]
    fn test_parse_omitted_write_symbol() {
        let input = r#"
name: Omitted Write
labels:
  start:
    a -> R, start
    R -> L, start
"#;

        let program = parse(input).unwrap();
        let rules = &program.blocks[0].transitions;
        assert_eq!(rules[0].write, "a");
        assert_eq!(rules[0].direction, Direction::Right);
        assert_eq!(rules[1].read, "R");
        assert_eq!(rules[1].write, "R");
        assert_eq!(rules[1].direction, Direction::Left);
    }

    #[test]
    fn test_parse_quoted_symbols_and_comments() {
        let input = r#"
# Leading comment
name: Quoted # trailing comment
labels:
  start:
    ',' -> '#', > , halt-accept   # comma becomes hash
"#;

        let program = parse(input).unwrap();
        assert_eq!(program.name, "Quoted");
        let rule = &program.blocks[0].transitions[0];
        assert_eq!(rule.read, ",");
        assert_eq!(rule.write, "#");
    }

    #[test]
    fn test_parse_duplicate_section() {
        let input = r#"
name: First Name
name: Second Name
labels:
  start:
    a -> b, R, halt-accept
"#;
        let error = parse(input).unwrap_err();
        assert!(matches!(error, CompileError::ParseError(_)));
        assert!(error.to_string().contains("Duplicate \"name:\" declaration"));
    }

    #[test]
    fn test_parse_missing_name() {
        let input = r#"
labels:
  start:
    a -> b, R, halt-accept
"#;
        let error = parse(input).unwrap_err();
        assert_eq!(
            error,
            CompileError::ValidationError("Missing 'name' section".into())
        );
    }

    #[test]
    fn test_parse_missing_labels() {
        let input = "name: No Labels\nflags: [a]";
        let error = parse(input).unwrap_err();
        assert_eq!(
            error,
            CompileError::ValidationError("Missing 'labels' section".into())
        );
    }

    #[test]
    fn test_parse_duplicate_label() {
        let input = r#"
name: Duplicate
labels:
  start:
    a -> b, R, halt-accept
  start:
    b -> a, R, halt-accept
"#;
        let error = parse(input).unwrap_err();
        assert!(error.to_string().contains("Duplicate label: start"));
    }

    #[test]
    fn test_parse_directives_on_halt() {
        let input = r#"
name: Halt Flags
flags: [a]
labels:
  start:
    a -> b, R, halt-accept {a}
"#;
        let error = parse(input).unwrap_err();
        assert!(error
            .to_string()
            .contains("Flag directives are not allowed on halt-accept"));
    }

    #[test]
    fn test_parse_unsupported_direction() {
        let input = r#"
name: Bad Direction
labels:
  start:
    a -> b, X, halt-accept
"#;
        assert!(matches!(parse(input), Err(CompileError::ParseError(_))));
    }

    #[test]
    fn test_parse_runs_validation() {
        let input = r#"
name: Bad Start
start: nowhere
labels:
  start:
    a -> b, R, halt-accept
"#;
        assert_eq!(
            parse(input),
            Err(CompileError::UndefinedStartLabel("nowhere".into()))
        );

        let input = r#"
name: Bad Flag
flags: [a]
labels:
  start:
    a -> b, R, . {b}
"#;
        assert_eq!(
            parse(input),
            Err(CompileError::InvalidFlagName {
                label: "start".into(),
                flag: "b".into(),
            })
        );
    }

    #[test]
    fn test_parse_too_large() {
        let input = format!("name: Big\n#{}", "x".repeat(MAX_PROGRAM_SIZE));
        assert!(matches!(
            parse(&input),
            Err(CompileError::ValidationError(msg)) if msg.contains("too large")
        ));
    }
}
