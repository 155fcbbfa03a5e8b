//! Build execution: install and build steps through the command capability.
//!
//! Two sequential invocations per job. A non-zero exit fails the job with the
//! captured output attached; a zero exit followed by a missing output
//! directory is its own distinct failure, reported separately from exit
//! status.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

use crate::detect::Detection;
use crate::error::StageError;
use crate::exec::CommandRunner;

/// How much captured tool output is carried into an error message.
const OUTPUT_TAIL_CHARS: usize = 2000;

pub struct BuildExecutor {
    runner: Arc<dyn CommandRunner>,
}

impl BuildExecutor {
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self { runner }
    }

    /// Runs `<pm> install` in the project root.
    pub async fn install(&self, root: &Path, detection: &Detection) -> Result<(), StageError> {
        self.run_step(root, detection, &["install"]).await
    }

    /// Runs `<pm> run build`, then the tolerated export step if the decision
    /// table asked for one.
    pub async fn build(&self, root: &Path, detection: &Detection) -> Result<(), StageError> {
        self.run_step(root, detection, &["run", "build"]).await?;

        if detection.export_step {
            // Static export is best-effort: projects without an export script
            // still produce a usable .next directory.
            let program = detection.package_manager.command();
            match self.runner.run(program, &["run", "export"], root).await {
                Ok(output) if !output.success() => {
                    warn!(program, "export step exited non-zero, continuing");
                }
                Err(e) => warn!(program, error = %e, "export step failed to run, continuing"),
                Ok(_) => {}
            }
        }
        Ok(())
    }

    /// Verifies the resolved output directory exists and is non-empty.
    ///
    /// A build can exit zero yet produce nothing where the decision table
    /// expects it; that is a build failure, never a success.
    pub fn verify_output(&self, root: &Path, detection: &Detection) -> Result<PathBuf, StageError> {
        let output_path = root.join(&detection.output_dir);

        let populated = output_path.is_dir()
            && output_path
                .read_dir()
                .map(|mut entries| entries.next().is_some())
                .unwrap_or(false);

        if !populated {
            return Err(StageError::Build(format!(
                "build succeeded but output directory {} is missing or empty",
                output_path.display()
            )));
        }
        Ok(output_path)
    }

    async fn run_step(
        &self,
        root: &Path,
        detection: &Detection,
        args: &[&str],
    ) -> Result<(), StageError> {
        let program = detection.package_manager.command();
        info!(program, ?args, "running build step");

        let output = self
            .runner
            .run(program, args, root)
            .await
            .map_err(|e| StageError::Build(format!("{:#}", e)))?;

        if !output.success() {
            let status = output
                .status
                .map(|c| c.to_string())
                .unwrap_or_else(|| "signal".to_string());
            return Err(StageError::Build(format!(
                "`{} {}` exited with status {}: {}",
                program,
                args.join(" "),
                status,
                output.tail(OUTPUT_TAIL_CHARS)
            )));
        }
        Ok(())
    }
}
