use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;

use crate::config::ExecutorConfig;
use crate::scheduler::JobId;

/// Result of running one program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionResult {
    pub success: bool,
    /// Everything the job produced: compiler diagnostics, program output, or an error line
    pub output: String,
}

impl ExecutionResult {
    pub fn succeeded(output: String) -> Self {
        Self {
            success: true,
            output,
        }
    }

    pub fn failed(output: String) -> Self {
        Self {
            success: false,
            output,
        }
    }
}

/// Runs a job program with a single input argument.
///
/// `tag` names the job's artifacts; it must be unique among jobs that have
/// not been discarded yet.
#[async_trait]
pub trait Execute: Send + Sync {
    async fn execute(&self, tag: &str, input: &str, program: &str) -> ExecutionResult;

    /// Remove whatever `execute` left behind for `tag`.
    async fn discard(&self, _tag: &str) {}
}

/// Artifact tag for a server-side job.
pub fn job_tag(job_id: JobId) -> String {
    format!("job-{}", job_id)
}

/// Compiles C source with the configured compiler and runs the binary.
///
/// Each tag gets its own directory under the work dir holding the source,
/// the binary, and nothing else.
#[derive(Debug, Clone)]
pub struct JobExecutor {
    config: ExecutorConfig,
}

impl JobExecutor {
    pub fn new(config: ExecutorConfig) -> Self {
        Self { config }
    }

    pub fn artifact_dir(&self, tag: &str) -> PathBuf {
        self.config.work_dir.join(tag)
    }

    async fn compile_and_run(&self, dir: &Path, input: &str, program: &str) -> ExecutionResult {
        let source = dir.join("program.c");
        let binary = dir.join("program");

        if let Err(e) = tokio::fs::create_dir_all(dir).await {
            return ExecutionResult::failed(format!("Failed to create work dir: {}", e));
        }
        if let Err(e) = tokio::fs::write(&source, program).await {
            return ExecutionResult::failed(format!("Failed to write program: {}", e));
        }

        let compiled = Command::new(&self.config.compiler)
            .arg(&source)
            .arg("-o")
            .arg(&binary)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await;

        let diagnostics = match compiled {
            Ok(out) if out.status.success() => collect_output(&out),
            Ok(out) => {
                let mut text = collect_output(&out);
                if text.is_empty() {
                    text = format!("Compilation failed with exit code {:?}\n", out.status.code());
                }
                return ExecutionResult::failed(text);
            }
            Err(e) => {
                return ExecutionResult::failed(format!(
                    "Failed to run compiler {}: {}\n",
                    self.config.compiler, e
                ))
            }
        };

        let ran = Command::new(&binary)
            .arg(input)
            .current_dir(dir)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await;

        match ran {
            Ok(out) => {
                let output = diagnostics + &collect_output(&out);
                if out.status.success() {
                    ExecutionResult::succeeded(output)
                } else {
                    ExecutionResult::failed(output)
                }
            }
            Err(e) => ExecutionResult::failed(format!("{}Failed to run program: {}\n", diagnostics, e)),
        }
    }
}

#[async_trait]
impl Execute for JobExecutor {
    async fn execute(&self, tag: &str, input: &str, program: &str) -> ExecutionResult {
        tracing::info!(tag, input, compiler = %self.config.compiler, "Compiling and executing");
        let dir = self.artifact_dir(tag);

        let result = match tokio::time::timeout(
            self.config.timeout,
            self.compile_and_run(&dir, input, program),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => ExecutionResult::failed(format!(
                "Execution timed out after {}s\n",
                self.config.timeout.as_secs_f64()
            )),
        };

        if result.success {
            tracing::info!(tag, "Job completed");
        } else {
            tracing::warn!(tag, output = %result.output, "Job failed");
        }
        result
    }

    async fn discard(&self, tag: &str) {
        let dir = self.artifact_dir(tag);
        match tokio::fs::remove_dir_all(&dir).await {
            Ok(()) => tracing::debug!(tag, "Artifacts removed"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!(tag, error = %e, "Failed to remove artifacts"),
        }
    }
}

fn collect_output(output: &std::process::Output) -> String {
    let mut text = String::from_utf8_lossy(&output.stdout).to_string();
    text.push_str(&String::from_utf8_lossy(&output.stderr));
    text
}
