use serde::Serialize;
use std::fmt;

use crate::core::compare::compare_output;
use crate::engine::executer::{ExecutionResult, ExecutionStatus};

/// Verdict from judging
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Accepted,
    WrongAnswer,
    TimeLimitExceeded,
    RuntimeError,
    Unknown,
}

impl Verdict {
    pub const ALL: [Verdict; 5] = [
        Verdict::Accepted,
        Verdict::WrongAnswer,
        Verdict::TimeLimitExceeded,
        Verdict::RuntimeError,
        Verdict::Unknown,
    ];

    pub fn acronym(&self) -> &'static str {
        match self {
            Verdict::Accepted => "AC",
            Verdict::WrongAnswer => "WA",
            Verdict::TimeLimitExceeded => "TLE",
            Verdict::RuntimeError => "RTE",
            Verdict::Unknown => "UNK",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Verdict::Accepted => "Accepted",
            Verdict::WrongAnswer => "Wrong Answer",
            Verdict::TimeLimitExceeded => "Time Limit Exceeded",
            Verdict::RuntimeError => "Runtime Error",
            Verdict::Unknown => "Unknown",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Verdict::Accepted => "File match exactly",
            Verdict::WrongAnswer => "File mismatch",
            Verdict::TimeLimitExceeded => "Execution timed out",
            Verdict::RuntimeError => "Process crashed (non-zero exit code)",
            Verdict::Unknown => "State not recognized",
        }
    }

    /// Whether the verdict takes part in the accuracy computation
    pub fn is_countable(&self) -> bool {
        !matches!(self, Verdict::Unknown)
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Verdict::Accepted => "accepted",
            Verdict::WrongAnswer => "wrong_answer",
            Verdict::TimeLimitExceeded => "time_limit_exceeded",
            Verdict::RuntimeError => "runtime_error",
            Verdict::Unknown => "unknown",
        };
        write!(f, "{}", s)
    }
}

/// What is known about a test case when its verdict is decided
#[derive(Debug, Clone, Copy)]
pub struct Evidence<'a> {
    /// Expected output text, `None` when the fixture is missing
    pub expected: Option<&'a str>,
    /// Outcome of the single execution, `None` when the case was never run
    pub execution: Option<&'a ExecutionResult>,
}

impl<'a> Evidence<'a> {
    pub fn missing_fixture() -> Self {
        Self {
            expected: None,
            execution: None,
        }
    }

    pub fn executed(expected: &'a str, execution: &'a ExecutionResult) -> Self {
        Self {
            expected: Some(expected),
            execution: Some(execution),
        }
    }

    fn status(&self) -> Option<ExecutionStatus> {
        self.execution.map(|e| e.status)
    }

    fn output_matches(&self) -> Option<bool> {
        let expected = self.expected?;
        let execution = self.execution?;
        Some(compare_output(expected, &execution.stdout_lossy()))
    }
}

type Guard = fn(&Evidence<'_>) -> bool;

/// Verdict rules in priority order; the first guard that holds decides.
pub const RULES: &[(Guard, Verdict)] = &[
    (missing_fixture, Verdict::Unknown),
    (timed_out, Verdict::TimeLimitExceeded),
    (abnormal_exit, Verdict::RuntimeError),
    (output_matches, Verdict::Accepted),
    (output_differs, Verdict::WrongAnswer),
];

fn missing_fixture(ev: &Evidence<'_>) -> bool {
    ev.expected.is_none()
}

fn timed_out(ev: &Evidence<'_>) -> bool {
    ev.status() == Some(ExecutionStatus::TimedOut)
}

fn abnormal_exit(ev: &Evidence<'_>) -> bool {
    matches!(ev.status(), Some(ExecutionStatus::Failed(_)))
}

fn output_matches(ev: &Evidence<'_>) -> bool {
    ev.status() == Some(ExecutionStatus::Completed) && ev.output_matches() == Some(true)
}

fn output_differs(ev: &Evidence<'_>) -> bool {
    ev.status() == Some(ExecutionStatus::Completed) && ev.output_matches() == Some(false)
}

/// Classify a test case. Evidence no rule recognizes is `Unknown`.
pub fn classify(evidence: &Evidence<'_>) -> Verdict {
    RULES
        .iter()
        .find(|(guard, _)| guard(evidence))
        .map(|(_, verdict)| *verdict)
        .unwrap_or(Verdict::Unknown)
}
