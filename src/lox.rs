//! Whole‑program pipeline: scan → parse → resolve → interpret.
//!
//! Each phase runs only if every earlier phase was clean. Program output goes
//! to `out`; diagnostics go to `err`, one per line.

use std::io::Write;

use log::{debug, info};

use crate::error::{LoxError, Result};
use crate::interpreter::Interpreter;
use crate::parser::Parser;
use crate::resolver::Resolver;
use crate::scanner::scan_tokens;

/// Which kinds of failure a run hit. The host maps these to exit codes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunStatus {
    /// A lexical, syntactic or resolution error was reported.
    pub had_error: bool,
    /// Interpretation stopped on a runtime error.
    pub had_runtime_error: bool,
}

fn report(err: &mut dyn Write, errors: &[LoxError]) -> Result<()> {
    for e in errors {
        debug!("Reporting: {}", e);
        writeln!(err, "{}", e)?;
    }
    Ok(())
}

/// Run `source` as a complete program.
///
/// Only failures writing to `out` or `err` come back as `Err`; language
/// errors are written to `err` and summarized in the returned [`RunStatus`].
pub fn run(source: &str, out: &mut dyn Write, err: &mut dyn Write) -> Result<RunStatus> {
    info!("Running program ({} bytes)", source.len());

    let (tokens, lex_errors) = scan_tokens(source);
    let (statements, parse_errors) = Parser::new(&tokens).parse();

    if !lex_errors.is_empty() || !parse_errors.is_empty() {
        report(err, &lex_errors)?;
        report(err, &parse_errors)?;

        return Ok(RunStatus {
            had_error: true,
            had_runtime_error: false,
        });
    }

    let mut interpreter = Interpreter::new(out);

    let resolve_errors = Resolver::new(&mut interpreter).resolve(&statements);
    if !resolve_errors.is_empty() {
        report(err, &resolve_errors)?;

        return Ok(RunStatus {
            had_error: true,
            had_runtime_error: false,
        });
    }

    match interpreter.interpret(&statements) {
        Ok(()) => Ok(RunStatus::default()),

        Err(e @ LoxError::Runtime { .. }) => {
            writeln!(err, "{}", e)?;

            Ok(RunStatus {
                had_error: false,
                had_runtime_error: true,
            })
        }

        Err(e) => Err(e),
    }
}
