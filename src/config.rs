//! Judge configuration
//!
//! Defaults, overridden by environment variables (a `.env` file is honored),
//! overridden in turn by command line flags.

use std::path::PathBuf;
use std::time::Duration;
use tracing::warn;

/// Default wall-clock limit per test case (10.000s)
pub const DEFAULT_TIME_LIMIT_MS: u64 = 10_000;
/// Default wall-clock limit for the build step
pub const DEFAULT_BUILD_TIME_LIMIT_MS: u64 = 60_000;

#[derive(Debug, Clone)]
pub struct JudgeConfig {
    /// Wall-clock limit per test case
    pub time_limit: Duration,
    /// Wall-clock limit for the build command
    pub build_time_limit: Duration,
    /// Test cases run at the same time
    pub jobs: usize,
    /// Name of the result directory inside the work dir
    pub result_dir_name: String,
    /// Extension of the per-case result files
    pub result_extension: String,
    /// Language profiles replacing the built-in ones
    pub languages_file: Option<PathBuf>,
}

impl Default for JudgeConfig {
    fn default() -> Self {
        Self {
            time_limit: Duration::from_millis(DEFAULT_TIME_LIMIT_MS),
            build_time_limit: Duration::from_millis(DEFAULT_BUILD_TIME_LIMIT_MS),
            jobs: 1,
            result_dir_name: "output".to_string(),
            result_extension: "out".to_string(),
            languages_file: None,
        }
    }
}

impl JudgeConfig {
    /// Defaults overlaid with `REDCODE_*` environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(ms) = parse_var::<u64>(&lookup, "REDCODE_TIME_LIMIT_MS").filter(|ms| *ms > 0) {
            config.time_limit = Duration::from_millis(ms);
        }
        if let Some(ms) =
            parse_var::<u64>(&lookup, "REDCODE_BUILD_TIME_LIMIT_MS").filter(|ms| *ms > 0)
        {
            config.build_time_limit = Duration::from_millis(ms);
        }
        if let Some(jobs) = parse_var::<usize>(&lookup, "REDCODE_JOBS").filter(|j| *j > 0) {
            config.jobs = jobs;
        }
        if let Some(path) = lookup("REDCODE_LANGUAGES").filter(|p| !p.is_empty()) {
            config.languages_file = Some(PathBuf::from(path));
        }

        config
    }

    /// Result directory for a given work dir
    pub fn result_dir(&self, work_dir: &std::path::Path) -> PathBuf {
        work_dir.join(&self.result_dir_name)
    }
}

fn parse_var<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Option<T> {
    let raw = lookup(key)?;
    match raw.trim().parse::<T>() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!("Ignoring invalid {}={:?}", key, raw);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = JudgeConfig::default();
        assert_eq!(config.time_limit, Duration::from_secs(10));
        assert_eq!(config.jobs, 1);
        assert_eq!(config.result_dir_name, "output");
        assert_eq!(config.result_extension, "out");
        assert!(config.languages_file.is_none());
    }

    #[test]
    fn test_env_overrides() {
        let config = JudgeConfig::from_lookup(lookup(&[
            ("REDCODE_TIME_LIMIT_MS", "2500"),
            ("REDCODE_BUILD_TIME_LIMIT_MS", "1000"),
            ("REDCODE_JOBS", "4"),
            ("REDCODE_LANGUAGES", "/etc/langs.toml"),
        ]));
        assert_eq!(config.time_limit, Duration::from_millis(2500));
        assert_eq!(config.build_time_limit, Duration::from_secs(1));
        assert_eq!(config.jobs, 4);
        assert_eq!(
            config.languages_file,
            Some(PathBuf::from("/etc/langs.toml"))
        );
    }

    #[test]
    fn test_invalid_env_values_are_ignored() {
        let config = JudgeConfig::from_lookup(lookup(&[
            ("REDCODE_TIME_LIMIT_MS", "fast"),
            ("REDCODE_JOBS", "0"),
        ]));
        assert_eq!(config.time_limit, Duration::from_secs(10));
        assert_eq!(config.jobs, 1);
    }

    #[test]
    fn test_result_dir() {
        let config = JudgeConfig::default();
        assert_eq!(
            config.result_dir(std::path::Path::new("/w")),
            PathBuf::from("/w/output")
        );
    }
}
