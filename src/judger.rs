//! Judger module for processing a local judging run
//!
//! This module drives the whole run: build the program once, then for every
//! discovered test case execute it, persist its output, classify it and fold
//! the verdict into the run statistics. Cases may run concurrently but are
//! always reported in discovery order.

use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::compiler::{Compilation, Compiler};
use crate::config::JudgeConfig;
use crate::core::{
    classify, diff_lines, discover_testcases, normalize, DiffLine, Evidence, RunStats, TestCase,
    Verdict,
};
use crate::engine::executer::{ExecutionStatus, Executor, ExitKind};
use crate::runner::CommandSpec;

/// One judging run
#[derive(Debug, Clone)]
pub struct JudgeRequest {
    pub language: String,
    pub source: PathBuf,
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    pub work_dir: PathBuf,
}

/// Result of judging a single test case
#[derive(Debug, Clone)]
pub struct CaseReport {
    pub id: String,
    /// Input file name
    pub name: String,
    pub verdict: Verdict,
    /// `None` when the case never ran
    pub duration: Option<Duration>,
    /// Exit status of an abnormal exit
    pub exit: Option<ExitKind>,
    /// Reason a case was skipped or could not be run
    pub note: Option<String>,
    pub input: String,
    pub expected: String,
    pub actual: String,
    pub stderr: Option<String>,
    /// Where the raw output was written
    pub result_path: Option<PathBuf>,
}

impl CaseReport {
    /// Line diff between expected and actual output (one line of context)
    pub fn diff(&self) -> Vec<DiffLine> {
        diff_lines(&normalize(&self.expected), &normalize(&self.actual), 1)
    }

    /// Short status comment shown next to the verdict
    pub fn comment(&self) -> String {
        match (&self.note, self.duration) {
            (Some(note), _) => note.clone(),
            (None, Some(duration)) => format!("{:.3}s", duration.as_secs_f64()),
            (None, None) => String::new(),
        }
    }
}

/// Final state of a run
#[derive(Debug, Clone)]
pub struct JudgeReport {
    pub compilation: Compilation,
    pub stats: RunStats,
    /// Cases discovered in the input directory
    pub total_cases: usize,
    pub result_dir: PathBuf,
}

/// Receives progress of a run as it happens
pub trait JudgeObserver {
    fn build_started(&mut self, _language: &str) {}
    fn build_finished(&mut self, _compilation: &Compilation) {}
    fn cases_started(&mut self, _total: usize) {}
    fn case_finished(&mut self, _report: &CaseReport) {}
}

pub struct Judge {
    compiler: Compiler,
    executor: Arc<Executor>,
    config: JudgeConfig,
}

/// Per-case settings shared by all workers
struct CaseContext {
    executor: Arc<Executor>,
    command: CommandSpec,
    result_dir: PathBuf,
    result_extension: String,
    time_limit: Duration,
}

impl Judge {
    pub fn new(compiler: Compiler, executor: Executor, config: JudgeConfig) -> Self {
        Self {
            compiler,
            executor: Arc::new(executor),
            config,
        }
    }

    /// Build, then judge every test case.
    ///
    /// Fails only on fatal errors (unsupported language, build failure, no
    /// test cases, unusable directories). Per-case problems become verdicts.
    pub async fn run(
        &self,
        request: &JudgeRequest,
        observer: &mut dyn JudgeObserver,
    ) -> Result<JudgeReport> {
        let profile = self.compiler.profile(&request.language)?;
        observer.build_started(&profile.key);

        let compilation = self
            .compiler
            .resolve(&request.language, &request.source, &request.work_dir)
            .await?;
        observer.build_finished(&compilation);

        let cases = discover_testcases(&request.input_dir, &request.output_dir)?;
        let total_cases = cases.len();
        info!(
            "Judging {} test case(s) from {}",
            total_cases,
            request.input_dir.display()
        );

        let result_dir = self.config.result_dir(&request.work_dir);
        tokio::fs::create_dir_all(&result_dir)
            .await
            .with_context(|| format!("Failed to create {}", result_dir.display()))?;

        observer.cases_started(total_cases);

        let ctx = Arc::new(CaseContext {
            executor: self.executor.clone(),
            command: compilation.command.clone(),
            result_dir: result_dir.clone(),
            result_extension: self.config.result_extension.clone(),
            time_limit: self.config.time_limit,
        });

        let stats = run_cases(ctx, cases, self.config.jobs, observer).await?;

        info!(
            "Run summary: language={}, AC={}, WA={}, TLE={}, RTE={}, skipped={}",
            compilation.language,
            stats.accepted,
            stats.wrong_answer,
            stats.time_limit_exceeded,
            stats.runtime_error,
            stats.unknown
        );

        Ok(JudgeReport {
            compilation,
            stats,
            total_cases,
            result_dir,
        })
    }
}

/// Run cases on up to `jobs` workers, reporting in discovery order.
///
/// This function is the only writer of the statistics.
async fn run_cases(
    ctx: Arc<CaseContext>,
    cases: Vec<TestCase>,
    jobs: usize,
    observer: &mut dyn JudgeObserver,
) -> Result<RunStats> {
    let semaphore = Arc::new(Semaphore::new(jobs.max(1)));
    let mut workers = JoinSet::new();

    for (idx, case) in cases.into_iter().enumerate() {
        let ctx = ctx.clone();
        let semaphore = semaphore.clone();
        workers.spawn(async move {
            let _permit = semaphore.acquire_owned().await?;
            Ok::<_, anyhow::Error>((idx, judge_case(&ctx, case).await))
        });
    }

    let mut stats = RunStats::new();
    let mut pending = BTreeMap::new();
    let mut next = 0;

    while let Some(joined) = workers.join_next().await {
        let (idx, report) = joined.context("Test case worker panicked")??;
        pending.insert(idx, report);

        while let Some(report) = pending.remove(&next) {
            stats.record(report.verdict);
            observer.case_finished(&report);
            next += 1;
        }
    }

    Ok(stats)
}

/// Judge one case. Never fails: every problem ends up as a verdict.
async fn judge_case(ctx: &CaseContext, case: TestCase) -> CaseReport {
    let input = read_lossy(&case.input_path).await.unwrap_or_default();

    let mut report = CaseReport {
        id: case.id.clone(),
        name: case.name.clone(),
        verdict: Verdict::Unknown,
        duration: None,
        exit: None,
        note: None,
        input,
        expected: String::new(),
        actual: String::new(),
        stderr: None,
        result_path: None,
    };

    let Some(expected_path) = &case.expected_path else {
        debug!("No expected output for {}, skipping", case.name);
        report.verdict = classify(&Evidence::missing_fixture());
        report.note = Some("Missing expected output file (Skipping)".to_string());
        return report;
    };

    let expected = match read_lossy(expected_path).await {
        Ok(text) => text,
        Err(e) => {
            warn!("{:#}", e);
            report.verdict = classify(&Evidence::missing_fixture());
            report.note = Some("Unreadable expected output file (Skipping)".to_string());
            return report;
        }
    };
    report.expected = expected;

    let result = match ctx
        .executor
        .execute(&ctx.command, &case.input_path, ctx.time_limit)
        .await
    {
        Ok(result) => result,
        Err(e) => {
            // The program could not even be started on this input
            warn!("Failed to execute {}: {:#}", case.name, e);
            report.verdict = Verdict::RuntimeError;
            report.note = Some("Failed to execute".to_string());
            report.stderr = Some(format!("{:#}", e));
            return report;
        }
    };

    if result.status == ExecutionStatus::Completed {
        let path = ctx
            .result_dir
            .join(format!("{}.{}", case.id, ctx.result_extension));
        match tokio::fs::write(&path, &result.stdout).await {
            Ok(()) => {
                debug!("Saved output of {} to {}", case.name, path.display());
                report.result_path = Some(path);
            }
            Err(e) => warn!("Failed to save output to {}: {}", path.display(), e),
        }
    }

    report.verdict = classify(&Evidence::executed(&report.expected, &result));
    debug!(
        "{}: {} in {:.3}s",
        case.name,
        report.verdict,
        result.duration.as_secs_f64()
    );
    report.duration = Some(result.duration);
    report.actual = result.stdout_lossy().into_owned();
    if let ExecutionStatus::Failed(exit) = result.status {
        report.exit = Some(exit);
        report.stderr = result.stderr;
    }

    report
}

async fn read_lossy(path: &Path) -> Result<String> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}
