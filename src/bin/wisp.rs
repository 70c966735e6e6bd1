//! `wisp` — compiles a source file to JavaScript, or launches the
//! interactive REPL.

use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use colored::Colorize;
use log::info;

use wisp::compiler::{self, HostDriver};
use wisp::diagnostics;
use wisp::error::WispError;
use wisp::lexer;
use wisp::macros::NoBridge;
use wisp::repl;
use wisp::runtime::RuntimeConfig;
use wisp::stdlib;

/// A Lisp-family compiler and REPL targeting JavaScript.
#[derive(Parser, Debug)]
#[command(name = "wisp", author, version, about, long_about = None)]
struct Args {
    /// Source file to compile. Omit with `--repl` to start the REPL
    /// instead.
    path: Option<PathBuf>,

    /// Output path; a `.js` suffix is enforced.
    #[arg(short, long, default_value = "out.js")]
    out: PathBuf,

    /// Start the REPL instead of compiling a file.
    #[arg(long)]
    repl: bool,

    /// After writing the output file, invoke the host to execute it.
    #[arg(long)]
    run: bool,

    /// Print intermediate artifacts: tokens, expressions, emitted code.
    #[arg(long)]
    debug: bool,

    /// The external JavaScript binary to use (overrides `WISP_HOST`).
    #[arg(long)]
    host: Option<String>,

    /// Raise logging verbosity (`-v` = info, `-vv` = debug).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.verbose);

    let mut config = RuntimeConfig::from_env();
    if let Some(host) = &args.host {
        config.host_bin = host.clone();
    }

    if args.repl {
        return match repl::run(config) {
            Ok(()) => ExitCode::SUCCESS,
            Err(err) => {
                report(&err, "");
                ExitCode::FAILURE
            }
        };
    }

    let Some(path) = args.path.clone() else {
        eprintln!("{}: a source path is required unless --repl is given", "error".bold().red());
        return ExitCode::FAILURE;
    };

    match run_compile(&args, &path, &config) {
        Ok(()) => ExitCode::SUCCESS,
        Err((source, err)) => {
            report(&err, &source);
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbosity: u8) {
    let level = match verbosity {
        0 => log::Level::Warn,
        1 => log::Level::Info,
        _ => log::Level::Debug,
    };
    let _ = simple_logger::init_with_level(level);
}

fn run_compile(args: &Args, path: &PathBuf, config: &RuntimeConfig) -> Result<(), (String, WispError)> {
    let source = fs::read_to_string(path).map_err(|e| (String::new(), WispError::Io(e)))?;

    if args.debug {
        let tokens = lexer::lex(source.as_bytes()).map_err(WispError::from).map_err(|e| (source.clone(), e))?;
        info!("lexed {} token(s): {tokens:#?}", tokens.len());
    }
    let exprs = compiler::parse(&source).map_err(|e| (source.clone(), e))?;
    if args.debug {
        info!("parsed {} top-level expression(s): {exprs:#?}", exprs.len());
    }

    let out_path = enforce_js_suffix(&args.out);
    let mut driver = if args.run || compiler::needs_eval_bridge(&exprs) {
        Some(HostDriver::spawn(config.clone()).map_err(|e| (source.clone(), e))?)
    } else {
        None
    };
    let js = match &mut driver {
        Some(driver) => compiler::compile(&source, driver).map_err(|e| (source.clone(), e))?,
        None => compiler::compile(&source, &mut NoBridge).map_err(|e| (source.clone(), e))?,
    };

    if args.debug {
        info!("emitted JavaScript:\n{js}");
    }

    let full_output = stdlib::with_banner(&js);
    fs::write(&out_path, &full_output).map_err(|e| (source.clone(), WispError::Io(e)))?;

    if args.run {
        let driver = driver.as_mut().expect("host driver spawned for --run");
        let frame = driver.run_js(&full_output).map_err(|e| (source.clone(), e))?;
        println!("{frame:?}");
    }

    Ok(())
}

fn enforce_js_suffix(path: &PathBuf) -> PathBuf {
    if path.extension().is_some_and(|ext| ext == "js") {
        path.clone()
    } else {
        path.with_extension("js")
    }
}

fn report(err: &WispError, source: &str) {
    eprintln!("{}", diagnostics::render(source, err));
}
