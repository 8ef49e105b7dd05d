//! matcher-cli: command-line interface for the cohort matching engine.
//!
//! Drives the full engine against a cohort snapshot file so every code
//! path is exercisable without a web interface.
//!
//! # Commands
//!
//! - `run`: Execute a matching run (strict or exception mode)
//! - `readiness`: Print the readiness diagnostics report
//! - `score`: Rebuild and print the pair-score matrix
//! - `export`: Run matching and write the results CSV

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use matcher_core::engine::MatchEngine;
use matcher_core::models::{CohortSnapshot, Match, MatchMode, MatchRun, RunStatus};
use matcher_core::store::{MatchStore, MemoryStore};
use serde::Serialize;
use std::fs;
use std::io::{self, Read, Write};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "matcher-cli")]
#[command(version = "0.1.0")]
#[command(about = "Cohort mentor/mentee matching engine CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum Mode {
    Strict,
    Exception,
}

impl From<Mode> for MatchMode {
    fn from(mode: Mode) -> MatchMode {
        match mode {
            Mode::Strict => MatchMode::Strict,
            Mode::Exception => MatchMode::Exception,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Execute a matching run against a snapshot file
    Run {
        /// Snapshot file path, JSON or YAML (use --stdin to read JSON from stdin)
        #[arg(value_name = "FILE")]
        input: Option<PathBuf>,

        /// Read the snapshot from stdin instead of a file
        #[arg(long)]
        stdin: bool,

        /// Matching mode
        #[arg(short, long, value_enum, default_value = "strict")]
        mode: Mode,

        /// Recorded as the run's creator
        #[arg(long, default_value = "cli")]
        initiator: String,

        /// Output file path (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Pretty-print the JSON output
        #[arg(long)]
        pretty: bool,
    },

    /// Print the readiness diagnostics report for a snapshot
    Readiness {
        #[arg(value_name = "FILE")]
        input: Option<PathBuf>,

        #[arg(long)]
        stdin: bool,

        #[arg(long)]
        pretty: bool,
    },

    /// Rebuild and print the pair-score matrix
    Score {
        #[arg(value_name = "FILE")]
        input: Option<PathBuf>,

        #[arg(long)]
        stdin: bool,

        #[arg(long)]
        pretty: bool,
    },

    /// Run matching and write the results CSV
    Export {
        #[arg(value_name = "FILE")]
        input: Option<PathBuf>,

        #[arg(long)]
        stdin: bool,

        #[arg(short, long, value_enum, default_value = "strict")]
        mode: Mode,

        /// Output file path (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            input,
            stdin,
            mode,
            initiator,
            output,
            pretty,
        } => cmd_run(input, stdin, mode, &initiator, output, pretty),

        Commands::Readiness { input, stdin, pretty } => cmd_readiness(input, stdin, pretty),

        Commands::Score { input, stdin, pretty } => cmd_score(input, stdin, pretty),

        Commands::Export {
            input,
            stdin,
            mode,
            output,
        } => cmd_export(input, stdin, mode, output),
    }
}

fn read_input(file: Option<PathBuf>, use_stdin: bool) -> Result<(String, Option<PathBuf>)> {
    if use_stdin {
        let mut buffer = String::new();
        io::stdin()
            .read_to_string(&mut buffer)
            .context("Failed to read from stdin")?;
        Ok((buffer, None))
    } else if let Some(path) = file {
        let text = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read file: {path:?}"))?;
        Ok((text, Some(path)))
    } else {
        anyhow::bail!("Either provide an input file or use --stdin")
    }
}

fn parse_snapshot(text: &str, path: Option<&PathBuf>) -> Result<CohortSnapshot> {
    let is_yaml = path
        .and_then(|p| p.extension())
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml"));
    if is_yaml {
        serde_yaml::from_str(text).context("Failed to parse YAML snapshot")
    } else {
        serde_json::from_str(text).context("Failed to parse JSON snapshot")
    }
}

fn load_engine(input: Option<PathBuf>, use_stdin: bool) -> Result<(MatchEngine, u64)> {
    let (text, path) = read_input(input, use_stdin)?;
    let snapshot = parse_snapshot(&text, path.as_ref())?;
    let cohort_id = snapshot.cohort.id;
    let store = Arc::new(MemoryStore::from_snapshot(snapshot));
    Ok((MatchEngine::new(store), cohort_id))
}

fn write_output(content: &str, output: Option<PathBuf>) -> Result<()> {
    match output {
        Some(path) => fs::write(&path, content)
            .with_context(|| format!("Failed to write output: {path:?}")),
        None => {
            let mut stdout = io::stdout();
            stdout.write_all(content.as_bytes())?;
            stdout.write_all(b"\n")?;
            Ok(())
        }
    }
}

fn to_json<T: Serialize>(value: &T, pretty: bool) -> Result<String> {
    if pretty {
        serde_json::to_string_pretty(value).context("Failed to serialize output")
    } else {
        serde_json::to_string(value).context("Failed to serialize output")
    }
}

/// A run together with its matches, the CLI's result document.
#[derive(Serialize)]
struct RunDocument {
    #[serde(flatten)]
    run: MatchRun,
    matches: Vec<Match>,
}

fn cmd_run(
    input: Option<PathBuf>,
    use_stdin: bool,
    mode: Mode,
    initiator: &str,
    output: Option<PathBuf>,
    pretty: bool,
) -> Result<()> {
    let (engine, cohort_id) = load_engine(input, use_stdin)?;
    engine
        .rebuild_pair_scores(cohort_id)
        .context("Failed to compute pair scores")?;
    let run = engine
        .run(cohort_id, initiator, mode.into())
        .context("Matching run failed")?;
    let matches = engine.store().matches(run.id).context("Failed to read matches")?;

    let document = RunDocument { run, matches };
    write_output(&to_json(&document, pretty)?, output)?;
    if document.run.status == RunStatus::Failed {
        std::process::exit(1);
    }
    Ok(())
}

fn cmd_readiness(input: Option<PathBuf>, use_stdin: bool, pretty: bool) -> Result<()> {
    let (engine, cohort_id) = load_engine(input, use_stdin)?;
    let report = engine
        .readiness(cohort_id)
        .context("Failed to build readiness report")?;
    write_output(&to_json(&report, pretty)?, None)
}

fn cmd_score(input: Option<PathBuf>, use_stdin: bool, pretty: bool) -> Result<()> {
    let (engine, cohort_id) = load_engine(input, use_stdin)?;
    let scores = engine
        .rebuild_pair_scores(cohort_id)
        .context("Failed to compute pair scores")?;
    write_output(&to_json(&scores, pretty)?, None)
}

fn cmd_export(
    input: Option<PathBuf>,
    use_stdin: bool,
    mode: Mode,
    output: Option<PathBuf>,
) -> Result<()> {
    let (engine, cohort_id) = load_engine(input, use_stdin)?;
    engine
        .rebuild_pair_scores(cohort_id)
        .context("Failed to compute pair scores")?;
    let run = engine
        .run(cohort_id, "cli", mode.into())
        .context("Matching run failed")?;
    if run.status == RunStatus::Failed {
        anyhow::bail!("run failed, nothing to export: {:?}", run.failure_report);
    }

    let mut buffer = Vec::new();
    engine
        .export_csv(run.id, &mut buffer)
        .context("Failed to build CSV")?;
    let csv_text = String::from_utf8(buffer).context("CSV output was not UTF-8")?;
    match output {
        Some(path) => fs::write(&path, csv_text)
            .with_context(|| format!("Failed to write output: {path:?}")),
        None => {
            io::stdout().write_all(csv_text.as_bytes())?;
            Ok(())
        }
    }
}
