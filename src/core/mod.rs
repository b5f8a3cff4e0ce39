pub mod compare;
pub mod stats;
pub mod testcase;
pub mod verdict;

pub use compare::{diff_lines, normalize, split_lines, DiffLine};
pub use stats::RunStats;
pub use testcase::{discover_testcases, TestCase};
pub use verdict::{classify, Evidence, Verdict};
