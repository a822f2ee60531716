use std::io::{IsTerminal, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

use schemer::error::{ScmError, ScmResult};
use schemer::eval::Interp;
use schemer::reader;
use schemer::value::Value;

/// A little Scheme with first-class continuations and proper tail calls.
#[derive(Parser)]
#[command(name = "schemer", version)]
struct Cli {
    /// Script to load and evaluate
    script: Option<PathBuf>,

    /// Pass "-" to enter the interactive loop after loading the script
    #[arg(value_name = "-")]
    interactive: Option<String>,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Some(flag) = &cli.interactive {
        if flag != "-" {
            eprintln!("unrecognized argument: {} (expected \"-\")", flag);
            return ExitCode::FAILURE;
        }
    }

    let mut interp = match Interp::new() {
        Ok(interp) => interp,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    if let Some(path) = &cli.script {
        if let Err(e) = load_file(&mut interp, path) {
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
        if cli.interactive.is_none() {
            return ExitCode::SUCCESS;
        }
    }

    if std::io::stdin().is_terminal() {
        run_interactive(&mut interp)
    } else {
        run_piped(&mut interp)
    }
}

/// Load a file: parse everything up front, then evaluate in order. Results
/// are not printed; an error aborts the load.
fn load_file(interp: &mut Interp, path: &Path) -> ScmResult<()> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| ScmError::Io(format!("{}: {}", path.display(), e)))?;
    tracing::debug!(path = %path.display(), "loading");
    let exprs = reader::read_all(&text, &mut interp.symbols)?;
    for exp in exprs {
        interp.eval_global(exp)?;
    }
    Ok(())
}

/// The interactive loop: accumulate lines until the pending input parses,
/// with a continuation prompt while it is unbalanced.
fn run_interactive(interp: &mut Interp) -> ExitCode {
    let mut rl = match DefaultEditor::new() {
        Ok(rl) => rl,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    let mut buf = String::new();
    loop {
        let prompt = if buf.is_empty() { "> " } else { "| " };
        match rl.readline(prompt) {
            Ok(line) => {
                buf.push_str(&line);
                buf.push('\n');
                match parse_buffer(&buf, interp) {
                    Ok(None) => {} // unbalanced: keep reading
                    Ok(Some(exprs)) => {
                        let _ = rl.add_history_entry(buf.trim());
                        buf.clear();
                        for exp in exprs {
                            eval_and_print(interp, exp);
                        }
                    }
                    Err(e) => {
                        eprintln!("{}", e);
                        buf.clear();
                    }
                }
            }
            Err(ReadlineError::Interrupted) => {
                buf.clear();
            }
            Err(ReadlineError::Eof) => {
                println!("Goodbye");
                return ExitCode::SUCCESS;
            }
            Err(e) => {
                eprintln!("{}", e);
                return ExitCode::FAILURE;
            }
        }
    }
}

/// Non-terminal stdin: read everything, evaluate each expression in order,
/// printing non-void results without prompts.
fn run_piped(interp: &mut Interp) -> ExitCode {
    let mut text = String::new();
    if let Err(e) = std::io::stdin().read_to_string(&mut text) {
        eprintln!("{}", e);
        return ExitCode::FAILURE;
    }
    match reader::read_all(&text, &mut interp.symbols) {
        Ok(exprs) => {
            for exp in exprs {
                eval_and_print(interp, exp);
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("{}", e);
            ExitCode::FAILURE
        }
    }
}

/// Parse the whole pending buffer. Ok(None) means the input is incomplete
/// and more lines should be read.
fn parse_buffer(text: &str, interp: &mut Interp) -> ScmResult<Option<Vec<Value>>> {
    let mut tokens = match reader::split_tokens(text) {
        Ok(tokens) => tokens,
        Err(ScmError::Incomplete) => return Ok(None),
        Err(e) => return Err(e),
    };
    let mut exprs = Vec::new();
    while !tokens.is_empty() {
        match reader::read_from_tokens(&mut tokens, &mut interp.symbols) {
            Ok(exp) => exprs.push(exp),
            Err(ScmError::Incomplete) => return Ok(None),
            Err(e) => return Err(e),
        }
    }
    Ok(Some(exprs))
}

fn eval_and_print(interp: &mut Interp, exp: Value) {
    match interp.eval_global(exp) {
        Ok(v) if !v.is_void() => println!("{}", interp.stringify(&v)),
        Ok(_) => {}
        Err(e) => eprintln!("{}", e),
    }
}
