use std::time::Duration;

use edge_offload::config::ExecutorConfig;
use edge_offload::worker::{job_tag, Execute, JobExecutor};

const LOAD_PROGRAM: &str = include_str!("../programs/load.c");

/// Executor writing its artifacts into a fresh temp dir.
fn test_executor(dir: &tempfile::TempDir) -> JobExecutor {
    JobExecutor::new(ExecutorConfig {
        work_dir: dir.path().to_path_buf(),
        ..ExecutorConfig::default()
    })
}

/// Whether a C compiler is on the PATH.
async fn cc_available() -> bool {
    tokio::process::Command::new("cc")
        .arg("--version")
        .output()
        .await
        .map(|out| out.status.success())
        .unwrap_or(false)
}

#[tokio::test]
async fn test_execute_load_program() {
    if !cc_available().await {
        eprintln!("Skipping test: cc not available");
        return;
    }
    let dir = tempfile::tempdir().unwrap();
    let executor = test_executor(&dir);

    let result = executor.execute(&job_tag(0), "0.1", LOAD_PROGRAM).await;

    assert!(result.success, "output: {}", result.output);
    assert!(result.output.contains("Slept 0.100000 seconds."));
    // 42 * 0.1 truncates to 4
    assert!(result.output.contains("4 is even."));
    assert!(executor.artifact_dir("job-0").join("program").exists());
}

#[tokio::test]
async fn test_nonzero_exit_is_failure_with_output() {
    if !cc_available().await {
        eprintln!("Skipping test: cc not available");
        return;
    }
    let dir = tempfile::tempdir().unwrap();
    let executor = test_executor(&dir);

    let program = "#include <stdio.h>\nint main(void) { printf(\"bye\\n\"); return 3; }\n";
    let result = executor.execute("job-1", "x", program).await;

    assert!(!result.success);
    assert_eq!(result.output, "bye\n");
}

#[tokio::test]
async fn test_compile_error_is_job_output() {
    if !cc_available().await {
        eprintln!("Skipping test: cc not available");
        return;
    }
    let dir = tempfile::tempdir().unwrap();
    let executor = test_executor(&dir);

    let result = executor
        .execute("job-2", "1", "this is not C")
        .await;

    assert!(!result.success);
    assert!(!result.output.is_empty());
}

#[tokio::test]
async fn test_missing_compiler_fails_without_panicking() {
    let dir = tempfile::tempdir().unwrap();
    let executor = JobExecutor::new(ExecutorConfig {
        compiler: "definitely-not-a-compiler".to_string(),
        work_dir: dir.path().to_path_buf(),
        ..ExecutorConfig::default()
    });

    let result = executor.execute("job-3", "1", LOAD_PROGRAM).await;

    assert!(!result.success);
    assert!(result.output.contains("Failed to run compiler definitely-not-a-compiler"));
}

#[tokio::test]
async fn test_timeout_is_reported_as_output() {
    if !cc_available().await {
        eprintln!("Skipping test: cc not available");
        return;
    }
    let dir = tempfile::tempdir().unwrap();
    let executor = JobExecutor::new(ExecutorConfig {
        work_dir: dir.path().to_path_buf(),
        timeout: Duration::from_millis(300),
        ..ExecutorConfig::default()
    });

    let result = executor.execute("job-4", "5", LOAD_PROGRAM).await;

    assert!(!result.success);
    assert!(result.output.contains("timed out"));
}

#[tokio::test]
async fn test_discard_removes_artifacts() {
    let dir = tempfile::tempdir().unwrap();
    let executor = test_executor(&dir);
    let artifacts = executor.artifact_dir("job-5");
    tokio::fs::create_dir_all(&artifacts).await.unwrap();
    tokio::fs::write(artifacts.join("program.c"), "int main(void){}")
        .await
        .unwrap();

    executor.discard("job-5").await;
    assert!(!artifacts.exists());

    // Discarding twice is harmless
    executor.discard("job-5").await;
}
