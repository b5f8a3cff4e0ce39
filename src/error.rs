//! Fatal errors that abort a judging run
//!
//! Everything that can go wrong with a single test case is recovered into a
//! verdict by the judger. Only the errors below stop the whole run.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum JudgeError {
    #[error("Language '{key}' not supported (available: {})", .supported.join(", "))]
    UnsupportedLanguage { key: String, supported: Vec<String> },

    #[error("Invalid language configuration for '{language}': {reason}")]
    InvalidLanguageConfig { language: String, reason: String },

    #[error("Build failed ({}): `{command}`", describe_exit(.exit_code))]
    BuildFailed {
        command: String,
        exit_code: Option<i32>,
        stderr: String,
    },

    #[error("No input files found in directory '{}'", .dir.display())]
    NoTestCases { dir: PathBuf },

    #[error("{kind} '{}' not found", .path.display())]
    MissingPath { kind: &'static str, path: PathBuf },
}

fn describe_exit(exit_code: &Option<i32>) -> String {
    match exit_code {
        Some(code) => format!("exit {}", code),
        None => "no exit code".to_string(),
    }
}
