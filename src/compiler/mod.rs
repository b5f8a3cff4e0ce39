//! Compiler module - Source code compilation
//!
//! Turns a language key and a source file into the command that runs the
//! program, invoking the profile's build step first when it has one. A build
//! that cannot produce a program is fatal to the whole judging run.

use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::error::JudgeError;
use crate::languages::{LanguageProfile, LanguageRegistry, TemplateValues};
use crate::runner::{CommandSpec, ProcessRunner};

/// Result of a successful build step
#[derive(Debug, Clone)]
pub struct BuildReport {
    pub command: CommandSpec,
    pub elapsed: Duration,
}

/// A program ready to be executed
#[derive(Debug, Clone)]
pub struct Compilation {
    /// Registry key of the resolved profile
    pub language: String,
    /// Command that runs the program
    pub command: CommandSpec,
    /// `None` for languages without a build step
    pub build: Option<BuildReport>,
}

pub struct Compiler {
    registry: LanguageRegistry,
    runner: Arc<dyn ProcessRunner>,
    build_time_limit: Duration,
}

impl Compiler {
    pub fn new(
        registry: LanguageRegistry,
        runner: Arc<dyn ProcessRunner>,
        build_time_limit: Duration,
    ) -> Self {
        Self {
            registry,
            runner,
            build_time_limit,
        }
    }

    /// Look up a profile without building anything
    pub fn profile(&self, language: &str) -> Result<&LanguageProfile, JudgeError> {
        self.registry.resolve(language)
    }

    /// Build `source` (when the profile has a build step) and return the run command
    pub async fn resolve(
        &self,
        language: &str,
        source: &Path,
        work_dir: &Path,
    ) -> Result<Compilation, JudgeError> {
        let profile = self.profile(language)?;
        let values = template_values(profile, source, work_dir);

        let build = match profile.build_command(&values) {
            Some(build_cmd) => {
                let command = CommandSpec::from_vec(&build_cmd).with_work_dir(work_dir);
                Some(self.build(command).await?)
            }
            None => {
                debug!("{} has no build step", profile.key);
                None
            }
        };

        Ok(Compilation {
            language: profile.key.clone(),
            command: CommandSpec::from_vec(&profile.run_command(&values)),
            build,
        })
    }

    async fn build(&self, command: CommandSpec) -> Result<BuildReport, JudgeError> {
        info!("Building: {}", command);

        let failed = |exit_code: Option<i32>, stderr: String| JudgeError::BuildFailed {
            command: command.to_string(),
            exit_code,
            stderr,
        };

        let start = Instant::now();
        let mut child = self
            .runner
            .spawn(&command)
            .await
            .map_err(|e| failed(None, format!("{:#}", e)))?;

        let waited = match child.write_stdin(Vec::new()).await {
            Ok(()) => child.wait_with_deadline(self.build_time_limit).await,
            Err(e) => Err(e),
        };
        let exit = match waited {
            Ok(exit) => exit,
            Err(e) => {
                if let Err(kill_err) = child.terminate().await {
                    warn!("Failed to terminate build: {:#}", kill_err);
                }
                return Err(failed(None, format!("{:#}", e)));
            }
        };

        let Some(exit) = exit else {
            if let Err(e) = child.terminate().await {
                warn!("Failed to terminate build: {:#}", e);
            }
            return Err(failed(
                None,
                format!(
                    "Build timed out after {:.1}s",
                    self.build_time_limit.as_secs_f64()
                ),
            ));
        };

        if !exit.exit.is_success() {
            let stderr = String::from_utf8_lossy(&exit.stderr);
            let message = if !stderr.trim().is_empty() {
                stderr.into_owned()
            } else {
                String::from_utf8_lossy(&exit.stdout).into_owned()
            };
            return Err(failed(exit.exit.code(), message));
        }

        let elapsed = start.elapsed();
        info!("Build finished in {:.2}s", elapsed.as_secs_f64());
        Ok(BuildReport { command, elapsed })
    }
}

/// Placeholder values for a source file; native executables get the
/// platform suffix (".exe" on Windows).
pub fn template_values(profile: &LanguageProfile, source: &Path, work_dir: &Path) -> TemplateValues {
    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();

    let exe_name = if profile.native {
        format!("{}{}", stem, std::env::consts::EXE_SUFFIX)
    } else {
        stem.clone()
    };

    TemplateValues {
        source: source.to_string_lossy().into_owned(),
        executable: work_dir.join(exe_name).to_string_lossy().into_owned(),
        work_dir: work_dir.to_string_lossy().into_owned(),
        stem,
    }
}
