use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser as ClapParser;
use clap::Subcommand;
use env_logger::Builder;
use log::{debug, info};
use memmap2::Mmap;

use treelox as lox;

use lox::ast_printer::AstPrinter;
use lox::interpreter::Interpreter;
use lox::parser::Parser;
use lox::scanner::{scan_tokens, Scanner};

/// Exit code for any lexical, syntactic or resolution error.
const EXIT_COMPILE_ERROR: i32 = 65;

/// Exit code for a runtime error.
const EXIT_RUNTIME_ERROR: i32 = 70;

#[derive(ClapParser, Debug)]
#[command(version, about = "Tree-walking Lox interpreter", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    commands: Commands,

    /// Enable debug logging to a file
    #[arg(long, global = true)]
    log: bool,

    /// Where `--log` writes records
    #[arg(long, global = true, default_value = "app.log")]
    log_file: PathBuf,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Tokenizes input from a file, printing each token
    Tokenize {
        filename: PathBuf,

        /// Print the token stream as JSON instead of one token per line
        #[arg(long)]
        json: bool,
    },

    /// Parses input from a file as a single expression and prints its AST
    Parse { filename: PathBuf },

    /// Evaluates input from a file as a single expression and prints the result
    Evaluate { filename: PathBuf },

    /// Runs input from a file as a Lox program
    Run { filename: PathBuf },
}

/// Maps a source file into memory and copies it out as validated UTF-8.
fn read_source(filename: &Path) -> Result<String> {
    info!("Reading file: {:?}", filename);

    let file = File::open(filename).context(format!("Failed to open file {:?}", filename))?;

    let len = file
        .metadata()
        .context(format!("Failed to stat file {:?}", filename))?
        .len();

    // Zero-length mappings are rejected on some platforms.
    if len == 0 {
        info!("File {:?} is empty", filename);
        return Ok(String::new());
    }

    // SAFETY: the mapping is read once, immediately, and then dropped.
    let mmap = unsafe { Mmap::map(&file) }.context(format!("Failed to map file {:?}", filename))?;

    let text = std::str::from_utf8(&mmap)
        .map_err(lox::error::LoxError::from)
        .context(format!("File {:?} is not valid UTF-8", filename))?;

    info!("Read {} bytes from {:?}", mmap.len(), filename);

    Ok(text.to_owned())
}

fn init_logger(path: &Path) -> Result<()> {
    let log_file = File::create(path).context(format!("Failed to create {:?}", path))?;

    // `[module:line] - message`, with the crate prefix stripped from the module.
    Builder::new()
        .format(|buf, record| {
            let module = record
                .module_path()
                .unwrap_or("<unnamed>")
                .strip_prefix("treelox::")
                .unwrap_or(record.module_path().unwrap_or("<unnamed>"));
            writeln!(
                buf,
                "[{}:{}] - {}",
                module,
                record.line().unwrap_or(0),
                record.args()
            )
        })
        .target(env_logger::Target::Pipe(Box::new(log_file)))
        .filter(None, log::LevelFilter::Debug)
        .parse_default_env()
        .init();

    info!("Logger initialized, writing to {:?}", path);
    Ok(())
}

fn tokenize(filename: &Path, json: bool) -> Result<i32> {
    info!("Running Tokenize subcommand");
    let source = read_source(filename)?;

    if json {
        let (tokens, errors) = scan_tokens(&source);

        for e in &errors {
            eprintln!("{}", e);
        }

        let rendered = serde_json::to_string_pretty(&tokens).context("Failed to serialize tokens")?;
        println!("{}", rendered);

        return Ok(if errors.is_empty() { 0 } else { EXIT_COMPILE_ERROR });
    }

    let mut tokenized = true;

    for token in Scanner::new(&source) {
        match token {
            Ok(token) => {
                debug!("Scanned token: {}", token);
                println!("{}", token);
            }

            Err(e) => {
                tokenized = false;
                debug!("Tokenization debug: {}", e);
                eprintln!("{}", e);
            }
        }
    }

    if !tokenized {
        debug!("Tokenization failed, exiting with code {}", EXIT_COMPILE_ERROR);
        return Ok(EXIT_COMPILE_ERROR);
    }

    info!("Tokenization completed successfully");
    Ok(0)
}

/// Shared front half of `parse` and `evaluate`: one expression, or diagnostics.
fn parse_single_expression(source: &str) -> Option<lox::ast::Expr> {
    let (tokens, lex_errors) = scan_tokens(source);
    let (expr, parse_errors) = Parser::new(&tokens).parse_expression();

    for e in lex_errors.iter().chain(parse_errors.iter()) {
        debug!("Parse debug: {}", e);
        eprintln!("{}", e);
    }

    if !lex_errors.is_empty() || !parse_errors.is_empty() {
        return None;
    }

    expr
}

fn parse(filename: &Path) -> Result<i32> {
    info!("Running Parse subcommand");
    let source = read_source(filename)?;

    let Some(expr) = parse_single_expression(&source) else {
        return Ok(EXIT_COMPILE_ERROR);
    };

    let ast_str = AstPrinter::print(&expr);
    debug!("AST: {}", ast_str);
    println!("{}", ast_str);

    info!("Parse subcommand completed");
    Ok(0)
}

fn evaluate(filename: &Path) -> Result<i32> {
    info!("Running Evaluate subcommand");
    let source = read_source(filename)?;

    let Some(expr) = parse_single_expression(&source) else {
        return Ok(EXIT_COMPILE_ERROR);
    };

    let mut stdout = io::stdout();
    let mut interpreter = Interpreter::new(&mut stdout);

    match interpreter.evaluate(&expr) {
        Ok(value) => {
            debug!("Evaluated to: {}", value);
            println!("{}", value);
        }

        Err(e) => {
            debug!("Evaluation debug: {}", e);
            eprintln!("{}", e);
            return Ok(EXIT_RUNTIME_ERROR);
        }
    }

    info!("Evaluate subcommand completed");
    Ok(0)
}

fn run(filename: &Path) -> Result<i32> {
    info!("Running Run subcommand");
    let source = read_source(filename)?;
    info!("Provided input:\n {}", source);

    let mut stdout = io::stdout().lock();
    let mut stderr = io::stderr().lock();

    let status = lox::lox::run(&source, &mut stdout, &mut stderr)
        .context("Failed to write program output")?;

    info!("Run finished: {:?}", status);

    Ok(if status.had_error {
        EXIT_COMPILE_ERROR
    } else if status.had_runtime_error {
        EXIT_RUNTIME_ERROR
    } else {
        0
    })
}

fn main() -> Result<()> {
    let args: Cli = Cli::parse();

    // Initialize logger only if --log flag is provided
    if args.log {
        init_logger(&args.log_file)?;
    } else {
        env_logger::Builder::new()
            .filter_level(log::LevelFilter::Off)
            .init();
    }

    info!("CLI arguments: {:?}", args);

    let code = match &args.commands {
        Commands::Tokenize { filename, json } => tokenize(filename, *json)?,
        Commands::Parse { filename } => parse(filename)?,
        Commands::Evaluate { filename } => evaluate(filename)?,
        Commands::Run { filename } => run(filename)?,
    };

    if code != 0 {
        io::stdout().flush().context("Failed to flush stdout")?;
        std::process::exit(code);
    }

    Ok(())
}
