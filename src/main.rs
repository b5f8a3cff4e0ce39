mod compiler;
mod config;
mod core;
mod engine;
mod error;
mod judger;
mod languages;
mod report;
mod runner;

use anyhow::{Context, Result};
use clap::Parser;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use crate::compiler::Compiler;
use crate::config::JudgeConfig;
use crate::engine::Executor;
use crate::error::JudgeError;
use crate::judger::{Judge, JudgeRequest};
use crate::languages::LanguageRegistry;
use crate::report::TerminalReporter;
use crate::runner::{LocalRunner, ProcessRunner};

const USAGE_EXAMPLES: &str = "\
Executes code against input files and compares with solutions.

Examples:
  redcode-judge B.cpp --lang cpp -i ./contest/B/in -o ./contest/B/out
  redcode-judge A.py --lang python -i ./in -o ./out -w ./my_results";

/// Local judge for competitive programming solutions
#[derive(Parser, Debug)]
#[command(name = "redcode-judge", version, about, after_help = USAGE_EXAMPLES)]
struct Cli {
    /// Source code file path
    file: PathBuf,

    /// Programming language (c, cpp, java, python, or an alias)
    #[arg(long)]
    lang: String,

    /// Directory containing input files
    #[arg(short = 'i', long)]
    input_dir: PathBuf,

    /// Directory containing expected output files
    #[arg(short = 'o', long)]
    output_dir: PathBuf,

    /// Directory for build artifacts and test results
    #[arg(short = 'w', long)]
    work_dir: Option<PathBuf>,

    /// Show detailed I/O for every test case
    #[arg(short, long)]
    verbose: bool,

    /// Wall-clock limit per test case, in seconds
    #[arg(short = 't', long, value_name = "SECONDS", value_parser = parse_seconds)]
    time_limit: Option<Duration>,

    /// Number of test cases run at the same time
    #[arg(short = 'j', long, value_parser = clap::value_parser!(u16).range(1..))]
    jobs: Option<u16>,

    /// TOML file replacing the built-in language profiles
    #[arg(long, value_name = "TOML")]
    languages: Option<PathBuf>,

    /// Write summary.json into the work directory
    #[arg(long)]
    json: bool,

    /// Do not print the startup banner
    #[arg(long)]
    no_banner: bool,
}

fn parse_seconds(raw: &str) -> Result<Duration, String> {
    let secs: f64 = raw
        .parse()
        .map_err(|_| format!("'{}' is not a number of seconds", raw))?;
    if !secs.is_finite() || secs <= 0.0 {
        return Err(format!("time limit must be positive, got '{}'", raw));
    }
    Ok(Duration::from_secs_f64(secs))
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("redcode_judge=warn")),
        )
        .init();

    let cli = Cli::parse();
    let mut reporter = TerminalReporter::new(cli.verbose);

    if !cli.no_banner {
        reporter.banner();
    }

    match run(&cli, &mut reporter).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            reporter.fatal(&e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: &Cli, reporter: &mut TerminalReporter) -> Result<()> {
    let mut config = JudgeConfig::from_env();
    if let Some(limit) = cli.time_limit {
        config.time_limit = limit;
    }
    if let Some(jobs) = cli.jobs {
        config.jobs = jobs as usize;
    }
    if let Some(path) = &cli.languages {
        config.languages_file = Some(path.clone());
    }
    debug!("Configuration: {:?}", config);

    let source = existing(&cli.file, "Source file")?;
    let input_dir = existing(&cli.input_dir, "Input directory")?;
    let output_dir = existing(&cli.output_dir, "Output (Solution) directory")?;

    let registry = match &config.languages_file {
        Some(path) => LanguageRegistry::from_file(path)?,
        None => LanguageRegistry::builtin()?,
    };
    // Fail on an unknown language before anything is created on disk
    registry.resolve(&cli.lang)?;

    let work_dir = cli
        .work_dir
        .clone()
        .unwrap_or_else(|| default_work_dir(&source));
    std::fs::create_dir_all(&work_dir)
        .with_context(|| format!("Failed to create work directory {}", work_dir.display()))?;
    let work_dir = std::fs::canonicalize(&work_dir)
        .with_context(|| format!("Failed to resolve {}", work_dir.display()))?;
    info!("Work directory: {}", work_dir.display());

    let runner: Arc<dyn ProcessRunner> = Arc::new(LocalRunner::new());
    let compiler = Compiler::new(registry, runner.clone(), config.build_time_limit);
    let judge = Judge::new(compiler, Executor::new(runner), config);

    let request = JudgeRequest {
        language: cli.lang.clone(),
        source,
        input_dir,
        output_dir,
        work_dir,
    };

    let report = judge.run(&request, &mut *reporter).await?;
    reporter.summary(&report);

    if cli.json {
        let path = report::write_summary(&request, &report)?;
        info!("Summary written to {}", path.display());
    }

    Ok(())
}

fn existing(path: &Path, kind: &'static str) -> Result<PathBuf> {
    std::fs::canonicalize(path).map_err(|_| {
        anyhow::Error::from(JudgeError::MissingPath {
            kind,
            path: path.to_path_buf(),
        })
    })
}

/// `.redcodejudge-<timestamp>-<stem>` in the current directory
fn default_work_dir(source: &Path) -> PathBuf {
    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    PathBuf::from(format!(
        ".redcodejudge-{}-{}",
        chrono::Local::now().format("%Y%m%d%H%M%S"),
        stem
    ))
}
