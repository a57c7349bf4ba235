//! Process launcher
//!
//! Starts one analyzer process per invocation. The request is handed to
//! the analyzer on stdin by a background task, which closes stdin afterwards
//! so the analyzer never waits for more input.

use opportunity_scout_sdk::{AnalysisRequest, OrchestrationError};
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::io::AsyncWriteExt;
use tokio::process::{Child, ChildStdin, Command};
use tokio::task::JoinHandle;

use crate::config::AnalyzerConfig;

/// A started analyzer whose stdout/stderr are still unread
#[derive(Debug)]
pub struct ProcessHandle {
    pub(crate) child: Child,
    pub(crate) started_at: Instant,
    pub(crate) timeout: Option<Duration>,
    /// Request writer, running until the payload is delivered or refused
    pub(crate) stdin_task: Option<JoinHandle<()>>,
    pid: Option<u32>,
}

impl ProcessHandle {
    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }
}

/// Build the analyzer command from configuration.
///
/// The child inherits the parent environment plus the configured overrides,
/// runs inside the project root and is killed if its handle is dropped.
pub fn build_command(config: &AnalyzerConfig) -> Command {
    let mut cmd = Command::new(&config.program);
    cmd.args(&config.args)
        .current_dir(&config.project_root)
        .envs(config.environment_overrides())
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    cmd
}

/// Spawn the analyzer and deliver the request payload
pub async fn launch(
    request: &AnalysisRequest,
    config: &AnalyzerConfig,
) -> Result<ProcessHandle, OrchestrationError> {
    let payload = request.to_payload().map_err(|e| {
        OrchestrationError::invalid_request(format!("Failed to serialize request: {}", e))
    })?;

    let mut child = build_command(config).spawn().map_err(|e| {
        OrchestrationError::spawn_failure(format!(
            "Failed to spawn analyzer '{}' in {}: {}",
            config.program.display(),
            config.project_root.display(),
            e
        ))
    })?;
    let started_at = Instant::now();
    let pid = child.id();

    tracing::debug!(
        pid = ?pid,
        program = %config.program.display(),
        cwd = %config.project_root.display(),
        "Spawned analyzer"
    );

    let stdin_task = child
        .stdin
        .take()
        .map(|stdin| tokio::spawn(feed_stdin(stdin, payload, pid)));

    Ok(ProcessHandle {
        child,
        started_at,
        timeout: config.timeout(),
        stdin_task,
        pid,
    })
}

/// Write the request and close stdin.
///
/// Runs beside the output readers and under the same deadline.
async fn feed_stdin(mut stdin: ChildStdin, payload: String, pid: Option<u32>) {
    let written = async {
        stdin.write_all(payload.as_bytes()).await?;
        stdin.write_all(b"\n").await?;
        stdin.shutdown().await
    }
    .await;

    if let Err(e) = written {
        // Exit status decides the outcome; the analyzer may have quit early
        tracing::warn!(pid = ?pid, error = %e, "Analyzer closed stdin before reading the request");
    }
}
