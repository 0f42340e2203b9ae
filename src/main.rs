//! Tabula - line up, compute over and reshape plain-text tables.
//!
//! Reads a table from stdin (or `--file`), applies the verbs given on the
//! command line in order, and prints any diagnostics followed by the result.

mod config;

use anyhow::{Context, Result};
use std::env;
use std::io::{IsTerminal, Write};
use std::path::PathBuf;
use tabula_core::Table;
use tabula_core::storage::{parse_lines, read_from, read_table, render};
use tabula_engine::builtins::BUILTINS;
use tracing_subscriber::EnvFilter;

fn print_usage() {
    eprintln!("Usage: tabula [OPTIONS] [SEPARATOR] [VERB [ARGS]...]...");
    eprintln!();
    eprintln!("Arguments:");
    eprintln!("  [SEPARATOR]               Minimum spaces between input cells (default 2)");
    eprintln!("  [VERB [ARGS]...]          Verbs to apply, in order, e.g. `sort b uniq`");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --file <FILE>             Read the table from FILE instead of stdin");
    eprintln!("  --precision <DIGITS>      Significant digits for inexact results (default 12)");
    eprintln!("  --filler <TEXT>           Text for missing cells (default -)");
    eprintln!("  --config <FILE>           Load settings from FILE instead of config.toml");
    eprintln!("  -h, --help                Print help");
    eprintln!();
    eprintln!("Verbs: {}", tabula_core::table::VERBS.join(" "));
    eprintln!();
    eprint!("{}", function_help());
}

/// One line per formula function, for `--help`.
fn function_help() -> String {
    let width = BUILTINS.iter().map(|b| b.name.len()).max().unwrap_or(0);
    let mut help = String::from("Functions for arr, tap and filter:\n");
    for builtin in BUILTINS {
        help.push_str(&format!("  {:<width$}  {}\n", builtin.name, builtin.description));
    }
    help
}

/// Diagnostics come first so they sit above the table they refer to.
fn output(table: &mut Table) -> String {
    let mut out = String::new();
    for diagnostic in table.take_diagnostics() {
        out.push_str(&diagnostic.to_string());
        out.push('\n');
    }
    out.push_str(&render(table));
    out
}

#[derive(Debug, Default)]
struct Args {
    file: Option<PathBuf>,
    config: Option<PathBuf>,
    precision: Option<u32>,
    filler: Option<String>,
    separator: Option<usize>,
    words: Vec<String>,
    help: bool,
}

/// Known flags are taken wherever they appear; every other word (including
/// verb arguments such as `-b`) is passed through to the verbs.
fn parse_args(args: impl IntoIterator<Item = String>) -> Result<Args> {
    let mut parsed = Args::default();
    let mut args = args.into_iter();
    while let Some(arg) = args.next() {
        let mut value = |flag: &str| {
            args.next()
                .with_context(|| format!("{flag} requires a value"))
        };
        match arg.as_str() {
            "-h" | "--help" => parsed.help = true,
            "--file" => parsed.file = Some(PathBuf::from(value("--file")?)),
            "--config" => parsed.config = Some(PathBuf::from(value("--config")?)),
            "--filler" => parsed.filler = Some(value("--filler")?),
            "--precision" => {
                let digits = value("--precision")?;
                parsed.precision = Some(
                    digits
                        .parse()
                        .with_context(|| format!("invalid --precision: {digits}"))?,
                );
            }
            _ => {
                if parsed.words.is_empty()
                    && parsed.separator.is_none()
                    && let Ok(n) = arg.parse::<usize>()
                {
                    parsed.separator = Some(n);
                } else {
                    parsed.words.push(arg);
                }
            }
        }
    }
    Ok(parsed)
}

fn init_logging() {
    let filter = EnvFilter::try_from_env("TABULA_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    init_logging();
    let args = parse_args(env::args().skip(1))?;
    if args.help {
        print_usage();
        return Ok(());
    }

    let (mut config, warnings) = config::load_config(args.config.as_deref());
    for warning in warnings {
        eprintln!("Warning: {}", warning);
    }
    if let Some(precision) = args.precision {
        config.precision = precision;
    }
    if let Some(filler) = args.filler {
        config.filler = filler;
    }
    if let Some(separator) = args.separator {
        config.separator = separator;
    }

    let options = config.table_options();
    let mut table = match &args.file {
        Some(path) => read_table(path, config.separator, options)
            .with_context(|| format!("failed to read {}", path.display()))?,
        None if std::io::stdin().is_terminal() => parse_lines("", config.separator, options)?,
        None => read_from(std::io::stdin().lock(), config.separator, options)
            .context("failed to read stdin")?,
    };

    table.run(args.words.iter().map(String::as_str));

    std::io::stdout().lock().write_all(output(&mut table).as_bytes())?;
    Ok(())
}
