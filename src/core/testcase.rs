//! Test case discovery from input/output directories

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use crate::error::JudgeError;

/// One input file and the expected output paired with it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestCase {
    /// Input file name without extension
    pub id: String,
    /// Input file name as shown to the user
    pub name: String,
    pub input_path: PathBuf,
    /// `None` when the output directory has no file for this case
    pub expected_path: Option<PathBuf>,
}

/// Every regular file of `input_dir` becomes a case, sorted by file name.
///
/// The expected output is the first file of `output_dir` (in name order)
/// whose name without extension equals the case id.
pub fn discover_testcases(input_dir: &Path, output_dir: &Path) -> Result<Vec<TestCase>> {
    let inputs = list_files(input_dir)?;
    if inputs.is_empty() {
        return Err(JudgeError::NoTestCases {
            dir: input_dir.to_path_buf(),
        }
        .into());
    }

    let outputs = list_files(output_dir)?;

    Ok(inputs
        .into_iter()
        .map(|input_path| {
            let id = file_stem(&input_path);
            let name = input_path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| id.clone());
            let expected_path = outputs.iter().find(|p| file_stem(p) == id).cloned();

            TestCase {
                id,
                name,
                input_path,
                expected_path,
            }
        })
        .collect())
}

fn list_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    let entries =
        std::fs::read_dir(dir).with_context(|| format!("Failed to read {}", dir.display()))?;

    for entry in entries {
        let entry = entry.with_context(|| format!("Failed to read {}", dir.display()))?;
        let path = entry.path();
        if path.is_file() {
            files.push(path);
        }
    }

    files.sort();
    Ok(files)
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}
