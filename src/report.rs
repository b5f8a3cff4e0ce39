//! Terminal presentation of a judging run

use anyhow::{Context, Result};
use chrono::Local;
use colored::{ColoredString, Colorize};
use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::compiler::Compilation;
use crate::core::{split_lines, DiffLine, RunStats, Verdict};
use crate::error::JudgeError;
use crate::judger::{CaseReport, JudgeObserver, JudgeReport, JudgeRequest};

const PROJECT: &str = "RedCodeJudge";
const AUTHOR: &str = "RedCodeNinja Team";
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Lines shown per section in the verbose view
const TRUNCATE_LINES: usize = 25;
const RULE_WIDTH: usize = 65;

const LOGO: &str = r"
 ____           _  ____          _            _           _
|  _ \ ___   __| |/ ___|___   __| | ___      | |_   _  __| | __ _  ___
| |_) / _ \ / _` | |   / _ \ / _` |/ _ \  _  | | | | |/ _` |/ _` |/ _ \
|  _ <  __/| (_| | |__| (_) | (_| |  __/ | |_| | |_| | (_| | (_| |  __/
|_| \_\___| \__,_|\____\___/ \__,_|\___|  \___/ \__,_|\__,_|\__, |\___|
                                                             |___/      CLI
";

mod icons {
    pub const SUCCESS: &str = "🟢";
    pub const FAIL: &str = "🔴";
    pub const INPUT: &str = "📥";
    pub const OUTPUT: &str = "🎯";
    pub const RESULT: &str = "💬";
    pub const BUILD: &str = "🔨";
    pub const RUN: &str = "🚀";
    pub const STEP: &str = "⚙️ ";
    pub const SCORE: &str = "🏆";
    pub const ACCURACY: &str = "🎯";
    pub const BALLOON: &str = "🎈";
}

fn verdict_icon(verdict: Verdict) -> &'static str {
    match verdict {
        Verdict::Accepted => "✅",
        Verdict::WrongAnswer => "⛔",
        Verdict::TimeLimitExceeded => "🐌",
        Verdict::RuntimeError => "💣",
        Verdict::Unknown => "👽",
    }
}

fn paint(verdict: Verdict, text: &str) -> ColoredString {
    match verdict {
        Verdict::Accepted => text.bright_green(),
        Verdict::WrongAnswer => text.bright_red(),
        Verdict::TimeLimitExceeded => text.bright_yellow(),
        Verdict::RuntimeError => text.bright_magenta(),
        Verdict::Unknown => text.bright_black(),
    }
}

/// Prints progress to stdout as the run happens
pub struct TerminalReporter {
    verbose: bool,
}

impl TerminalReporter {
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }

    pub fn banner(&self) {
        println!("{}", LOGO.bright_red());
        println!(
            "{} | {}",
            format!("{} v{}", PROJECT, VERSION).bold(),
            format!("Powered by {} {}", AUTHOR, icons::BALLOON).bright_black()
        );
        println!(
            "{}",
            format!("System Time: {}", Local::now().format("%Y-%m-%d %H:%M")).bright_black()
        );
    }

    pub fn summary(&self, report: &JudgeReport) {
        print!("{}", render_summary(&report.stats, report.total_cases));
        println!(
            "{}\n",
            format!("Results saved in {}", report.result_dir.display()).bright_black()
        );
    }

    /// Print a fatal error; build failures also get the compiler output
    pub fn fatal(&self, err: &anyhow::Error) {
        if let Some(JudgeError::BuildFailed {
            exit_code, stderr, ..
        }) = err.downcast_ref::<JudgeError>()
        {
            let comment = match exit_code {
                Some(code) => format!("(Exit {})", code),
                None => String::new(),
            };
            println!("{}", message_line("Build Failed", icons::FAIL, |s| s.bright_red(), &comment));
            if !stderr.trim().is_empty() {
                println!("{}", stderr.trim_end().bright_black());
            }
        }
        eprintln!("{}", format!("{:#}", err).bright_red());
    }
}

impl JudgeObserver for TerminalReporter {
    fn build_started(&mut self, _language: &str) {
        print!("{}", section("Step #1: Building", icons::BUILD));
    }

    fn build_finished(&mut self, compilation: &Compilation) {
        let line = match &compilation.build {
            Some(build) => message_line(
                &format!("Build Success ({:.2}s)", build.elapsed.as_secs_f64()),
                icons::SUCCESS,
                |s| s.bright_green(),
                "",
            ),
            None => message_line("Skipping build step...", icons::STEP, |s| s.bright_black(), ""),
        };
        println!("{}", line);
    }

    fn cases_started(&mut self, _total: usize) {
        print!("{}", section("Step #2: Running", icons::RUN));
    }

    fn case_finished(&mut self, report: &CaseReport) {
        if self.verbose {
            print!("{}", render_block(report));
        } else {
            print!("{}", render_inline(report));
        }
    }
}

fn section(title: &str, icon: &str) -> String {
    let rule = "=".repeat(RULE_WIDTH).bright_magenta();
    format!(
        "\n{}\n{}  {}\n{}\n\n",
        rule,
        icon,
        title.to_uppercase().bold(),
        rule
    )
}

fn message_line(
    text: &str,
    icon: &str,
    color: impl Fn(&str) -> ColoredString,
    comment: &str,
) -> String {
    format!("   {} {} {}", icon, color(&format!("{:<25}", text)), comment)
        .trim_end()
        .to_string()
}

fn stderr_block(report: &CaseReport) -> Option<String> {
    let stderr = report.stderr.as_deref()?;
    if stderr.trim().is_empty() {
        return None;
    }
    Some(format!("{}\n", stderr.trim_end().bright_black()))
}

/// One line per case, plus the quick diff for wrong answers
pub fn render_inline(report: &CaseReport) -> String {
    let verdict = report.verdict;
    let text = format!("{:<15} {}", report.name, verdict.acronym());
    let mut out = message_line(
        &text,
        verdict_icon(verdict),
        |s| paint(verdict, s),
        &format!("| {}", report.comment()),
    );
    out.push('\n');

    if let Some(stderr) = stderr_block(report) {
        out.push_str(&stderr);
    }
    if verdict == Verdict::WrongAnswer {
        out.push_str(&render_quick_diff(&report.diff()));
    }
    out
}

pub fn render_quick_diff(diff: &[DiffLine]) -> String {
    if diff.is_empty() {
        return String::new();
    }

    let mut out = format!("      {}\n", "┌─ Quick Diff ────────".bright_black());
    for line in diff {
        let text = line.to_string();
        let colored = match line {
            DiffLine::Added(_) => text.bright_green(),
            DiffLine::Removed(_) => text.bright_red(),
            DiffLine::Context(_) => text.bright_black(),
        };
        out.push_str(&format!("      {} {}\n", "│".bright_black(), colored));
    }
    out.push_str(&format!("      {}\n", "└─────────────────────".bright_black()));
    out
}

/// Detailed view used with `--verbose`
pub fn render_block(report: &CaseReport) -> String {
    let verdict = report.verdict;
    let bar = paint(verdict, "│");
    let mut out = String::from("\n");

    out.push_str(&format!(
        "   {}{}\n",
        paint(verdict, "┌── Case: "),
        paint(
            verdict,
            &format!(
                "{} ─ {} {} ({})",
                report.name,
                verdict_icon(verdict),
                verdict.title(),
                report.comment()
            )
        )
        .bold()
    ));
    out.push_str(&format!("   {}\n", bar));
    out.push_str(&format!(
        "   {} {}\n",
        bar,
        format!("Note: {}.", verdict.description()).bright_black()
    ));
    if let Some(exit) = report.exit {
        out.push_str(&format!(
            "   {} {}\n",
            bar,
            format!("Exit status: {}", exit).bright_black()
        ));
    }
    out.push_str(&format!("   {}\n", bar));

    let sections = [
        (format!("{} INPUT:", icons::INPUT).bright_blue(), &report.input),
        (format!("{} OUTPUT:", icons::OUTPUT).bright_blue(), &report.expected),
        (
            paint(verdict, &format!("{} RESULT:                   (Test Result)", icons::RESULT)),
            &report.actual,
        ),
    ];
    for (title, body) in sections {
        out.push_str(&format!("   {} {}\n", bar, title));
        for line in truncate(body, TRUNCATE_LINES) {
            out.push_str(&format!("   {}    {}\n", bar, line));
        }
    }

    out.push_str(&format!(
        "   {}\n",
        paint(verdict, &format!("└{}", "─".repeat(52)))
    ));

    if let Some(path) = &report.result_path {
        out.push_str(&format!(
            "   {}\n",
            format!("Saved to {}", path.display()).bright_black()
        ));
    }
    if let Some(stderr) = stderr_block(report) {
        out.push_str(&stderr);
    }
    out
}

/// Lines of `text` (outer whitespace stripped), cut after `limit` lines
pub fn truncate(text: &str, limit: usize) -> Vec<String> {
    let lines = split_lines(text.trim());
    if lines.is_empty() {
        return vec!["(empty)".to_string()];
    }

    let mut out: Vec<String> = lines.iter().take(limit).map(|l| l.to_string()).collect();
    if lines.len() > limit {
        out.push(
            format!("... ({} hidden lines)", lines.len() - limit)
                .bright_yellow()
                .to_string(),
        );
    }
    out
}

pub fn render_summary(stats: &RunStats, total_cases: usize) -> String {
    let rule = "=".repeat(RULE_WIDTH);
    let note = if stats.all_accepted() {
        format!(" (File match exactly! {})", icons::BALLOON)
    } else {
        String::new()
    };

    let mut out = format!("\n{}\n\n", rule);
    out.push_str(&format!("   {} {}\n", icons::SCORE, "FINAL SCORE:".bold()));
    let counts: Vec<String> = Verdict::ALL
        .into_iter()
        .filter(|v| v.is_countable())
        .map(|v| format!("{}: {}", v.acronym(), paint(v, &stats.count(v).to_string())))
        .collect();
    out.push_str(&format!("   {}\n", counts.join("  |  ")));

    out.push_str(&format!(
        "   {}\n",
        format!(
            "Cases: {}  |  Skipped: {}",
            total_cases,
            stats.count(Verdict::Unknown)
        )
        .bright_black()
    ));
    out.push_str(&format!(
        "\n   {} Accuracy: {:.1}%{}\n\n{}\n\n",
        icons::ACCURACY,
        stats.accuracy(),
        note,
        rule
    ));
    out
}

/// Machine-readable result of a run
#[derive(Debug, Serialize)]
pub struct Summary<'a> {
    pub tool: &'static str,
    pub version: &'static str,
    pub language: &'a str,
    pub source: &'a Path,
    pub stats: &'a RunStats,
    pub total_cases: usize,
    pub accuracy: f64,
    pub finished_at: String,
}

impl<'a> Summary<'a> {
    pub fn new(request: &'a JudgeRequest, report: &'a JudgeReport) -> Self {
        Self {
            tool: PROJECT,
            version: VERSION,
            language: &report.compilation.language,
            source: &request.source,
            stats: &report.stats,
            total_cases: report.total_cases,
            accuracy: report.stats.accuracy(),
            finished_at: Local::now().to_rfc3339(),
        }
    }
}

/// Write `summary.json` into the work dir
pub fn write_summary(request: &JudgeRequest, report: &JudgeReport) -> Result<PathBuf> {
    let path = request.work_dir.join("summary.json");
    let json = serde_json::to_string_pretty(&Summary::new(request, report))
        .context("Failed to serialize summary")?;
    std::fs::write(&path, json)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::CommandSpec;
    use std::time::Duration;

    fn plain() {
        colored::control::set_override(false);
    }

    fn case(verdict: Verdict, expected: &str, actual: &str) -> CaseReport {
        CaseReport {
            id: "1".into(),
            name: "1.in".into(),
            verdict,
            duration: Some(Duration::from_millis(123)),
            exit: None,
            note: None,
            input: "3 4\n".into(),
            expected: expected.into(),
            actual: actual.into(),
            stderr: None,
            result_path: None,
        }
    }

    #[test]
    fn test_inline_accepted() {
        plain();
        let out = render_inline(&case(Verdict::Accepted, "7\n", "7"));
        assert_eq!(out.lines().count(), 1);
        assert!(out.contains("✅"));
        assert!(out.contains("1.in            AC"));
        assert!(out.ends_with("| 0.123s\n"));
    }

    #[test]
    fn test_inline_wrong_answer_has_quick_diff() {
        plain();
        let out = render_inline(&case(Verdict::WrongAnswer, "7\n", "8\n"));
        assert!(out.contains("Quick Diff"));
        assert!(out.contains("│ -7"));
        assert!(out.contains("│ +8"));
    }

    #[test]
    fn test_inline_runtime_error_shows_stderr() {
        plain();
        let mut report = case(Verdict::RuntimeError, "7\n", "");
        report.stderr = Some("Traceback: boom\n".into());
        let out = render_inline(&report);
        assert!(out.contains("RTE"));
        assert!(out.contains("Traceback: boom"));
        assert!(!out.contains("Quick Diff"));
    }

    #[test]
    fn test_skipped_case_shows_note() {
        plain();
        let mut report = case(Verdict::Unknown, "", "");
        report.duration = None;
        report.note = Some("Missing expected output file (Skipping)".into());
        let out = render_inline(&report);
        assert!(out.contains("UNK"));
        assert!(out.contains("| Missing expected output file (Skipping)"));
    }

    #[test]
    fn test_truncate() {
        plain();
        assert_eq!(truncate("  \n ", 25), vec!["(empty)"]);

        let text: String = (1..=30).map(|i| format!("{}\n", i)).collect();
        let lines = truncate(&text, 25);
        assert_eq!(lines.len(), 26);
        assert_eq!(lines[24], "25");
        assert_eq!(lines[25], "... (5 hidden lines)");

        assert_eq!(truncate("1\r2\r3", 2), vec!["1", "2", "... (1 hidden lines)"]);
    }

    #[test]
    fn test_block_view() {
        plain();
        let out = render_block(&case(Verdict::WrongAnswer, "7\n", "8\n"));
        assert!(out.contains("┌── Case: 1.in ─ ⛔ Wrong Answer (0.123s)"));
        assert!(out.contains("Note: File mismatch."));
        assert!(out.contains("INPUT:"));
        assert!(out.contains("│    3 4"));
        assert!(!out.contains("Exit status"));
    }

    #[test]
    fn test_block_view_runtime_error() {
        plain();
        let mut report = case(Verdict::RuntimeError, "7\n", "");
        report.exit = Some(crate::runner::ExitKind::Signal(11));
        report.stderr = Some("core dumped".into());
        let out = render_block(&report);
        assert!(out.contains("Exit status: Signal 11"));
        assert!(out.contains("RESULT:"));
        assert!(out.contains("(empty)"));
        assert!(out.trim_end().ends_with("core dumped"));
    }

    #[test]
    fn test_summary_accuracy_and_balloon() {
        plain();
        let mut stats = RunStats::new();
        stats.record(Verdict::Accepted);
        stats.record(Verdict::Accepted);
        stats.record(Verdict::WrongAnswer);
        let out = render_summary(&stats, 3);
        assert!(out.contains("AC: 2  |  WA: 1  |  TLE: 0  |  RTE: 0"));
        assert!(out.contains("Cases: 3  |  Skipped: 0"));
        assert!(out.contains("Accuracy: 66.7%"));
        assert!(!out.contains(icons::BALLOON));

        let mut stats = RunStats::new();
        stats.record(Verdict::Accepted);
        assert!(render_summary(&stats, 1).contains("Accuracy: 100.0% (File match exactly!"));
    }

    #[test]
    fn test_summary_with_no_countable_cases() {
        plain();
        let mut stats = RunStats::new();
        stats.record(Verdict::Unknown);
        let out = render_summary(&stats, 1);
        assert!(out.contains("Accuracy: 0.0%"));
        assert!(out.contains("Skipped: 1"));
        assert!(!out.contains(icons::BALLOON));
    }

    #[test]
    fn test_write_summary() {
        let dir = tempfile::tempdir().unwrap();
        let request = JudgeRequest {
            language: "py".into(),
            source: dir.path().join("a.py"),
            input_dir: dir.path().join("in"),
            output_dir: dir.path().join("out"),
            work_dir: dir.path().to_path_buf(),
        };
        let mut stats = RunStats::new();
        stats.record(Verdict::Accepted);
        stats.record(Verdict::TimeLimitExceeded);
        let report = JudgeReport {
            compilation: Compilation {
                language: "python".into(),
                command: CommandSpec::new("python3"),
                build: None,
            },
            stats,
            total_cases: 2,
            result_dir: dir.path().join("output"),
        };

        let path = write_summary(&request, &report).unwrap();
        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(json["language"], "python");
        assert_eq!(json["stats"]["accepted"], 1);
        assert_eq!(json["stats"]["time_limit_exceeded"], 1);
        assert_eq!(json["total_cases"], 2);
        assert_eq!(json["accuracy"], 50.0);
    }
}
