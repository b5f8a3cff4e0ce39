use serde::Serialize;

use crate::core::verdict::Verdict;

/// Verdict counters for one judging run
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct RunStats {
    pub accepted: usize,
    pub wrong_answer: usize,
    pub time_limit_exceeded: usize,
    pub runtime_error: usize,
    /// Cases that could not be judged; never part of the accuracy
    pub unknown: usize,
}

impl RunStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, verdict: Verdict) {
        match verdict {
            Verdict::Accepted => self.accepted += 1,
            Verdict::WrongAnswer => self.wrong_answer += 1,
            Verdict::TimeLimitExceeded => self.time_limit_exceeded += 1,
            Verdict::RuntimeError => self.runtime_error += 1,
            Verdict::Unknown => self.unknown += 1,
        }
    }

    pub fn count(&self, verdict: Verdict) -> usize {
        match verdict {
            Verdict::Accepted => self.accepted,
            Verdict::WrongAnswer => self.wrong_answer,
            Verdict::TimeLimitExceeded => self.time_limit_exceeded,
            Verdict::RuntimeError => self.runtime_error,
            Verdict::Unknown => self.unknown,
        }
    }

    /// Cases that reached execution
    pub fn total_countable(&self) -> usize {
        self.accepted + self.wrong_answer + self.time_limit_exceeded + self.runtime_error
    }

    /// Every recorded case, skipped ones included
    pub fn total(&self) -> usize {
        self.total_countable() + self.unknown
    }

    /// Accepted percentage over `total_countable` cases (0 when there are none)
    pub fn summarize(&self, total_countable: usize) -> f64 {
        if total_countable == 0 {
            return 0.0;
        }
        self.accepted as f64 / total_countable as f64 * 100.0
    }

    pub fn accuracy(&self) -> f64 {
        self.summarize(self.total_countable())
    }

    /// Every countable case accepted, and at least one of them
    pub fn all_accepted(&self) -> bool {
        self.accepted > 0 && self.accepted == self.total_countable()
    }
}
