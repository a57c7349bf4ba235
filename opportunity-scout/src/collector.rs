//! Stream collector
//!
//! Drains the analyzer's stdout and stderr on two independent tasks while
//! the process runs, so neither pipe can fill up and stall the child. The
//! request writer started by the launcher runs alongside them. Output is
//! decoded only after the process has exited.

use opportunity_scout_sdk::excerpt;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::task::{AbortHandle, JoinHandle};

use crate::launcher::ProcessHandle;

const CHUNK_SIZE: usize = 8 * 1024;
const PREVIEW_CHARS: usize = 50;

/// Everything an exited analyzer left behind
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessOutcome {
    /// Exit code, or -1 when the process was terminated by a signal
    pub exit_status: i32,
    pub stdout_text: String,
    pub stderr_text: String,
}

impl ProcessOutcome {
    /// Decode raw buffers; invalid UTF-8 is replaced, never rejected
    pub fn from_raw(exit_status: i32, stdout: &[u8], stderr: &[u8]) -> Self {
        Self {
            exit_status,
            stdout_text: String::from_utf8_lossy(stdout).into_owned(),
            stderr_text: String::from_utf8_lossy(stderr).into_owned(),
        }
    }

    pub fn success(&self) -> bool {
        self.exit_status == 0
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CollectError {
    #[error("Analyzer did not exit within {} seconds", .0.as_secs())]
    TimedOut(Duration),
    #[error("Failed to wait for analyzer: {0}")]
    Wait(#[from] std::io::Error),
}

/// Wait for the analyzer to exit and return its decoded output.
///
/// Does not judge the exit status. When the handle carries a deadline and
/// it passes first, the child is killed and `CollectError::TimedOut` is
/// returned.
pub async fn collect(mut handle: ProcessHandle) -> Result<ProcessOutcome, CollectError> {
    let pid = handle.pid();
    let stdout_task = tokio::spawn(drain(handle.child.stdout.take(), "stdout"));
    let stderr_task = tokio::spawn(drain(handle.child.stderr.take(), "stderr"));
    let stdout_abort = stdout_task.abort_handle();
    let stderr_abort = stderr_task.abort_handle();
    let stdin_task = handle.stdin_task.take();
    let stdin_abort = stdin_task.as_ref().map(JoinHandle::abort_handle);

    let child = &mut handle.child;
    let finished = async move {
        let status = child.wait().await?;
        if let Some(task) = stdin_task {
            if let Err(e) = task.await {
                tracing::warn!(error = %e, "Request writer task did not finish");
            }
        }
        let stdout = join_reader(stdout_task, "stdout").await;
        let stderr = join_reader(stderr_task, "stderr").await;
        Ok::<_, std::io::Error>((status, stdout, stderr))
    };

    let waited = match handle.timeout {
        Some(limit) => {
            let remaining = limit.saturating_sub(handle.started_at.elapsed());
            tokio::time::timeout(remaining, finished).await.ok()
        }
        None => Some(finished.await),
    };

    let (status, stdout, stderr) = match waited {
        Some(Ok(parts)) => parts,
        Some(Err(e)) => {
            abort_all(&stdin_abort, &stdout_abort, &stderr_abort);
            return Err(CollectError::Wait(e));
        }
        None => {
            abort_all(&stdin_abort, &stdout_abort, &stderr_abort);
            if let Err(e) = handle.child.kill().await {
                tracing::warn!(pid = ?pid, error = %e, "Failed to kill timed out analyzer");
            }
            let limit = handle.timeout.unwrap_or_default();
            tracing::warn!(pid = ?pid, timeout_secs = limit.as_secs(), "Analyzer timed out and was killed");
            return Err(CollectError::TimedOut(limit));
        }
    };

    let exit_status = exit_code(&status);
    tracing::debug!(
        pid = ?pid,
        exit_status,
        stdout_bytes = stdout.len(),
        stderr_bytes = stderr.len(),
        elapsed_ms = handle.started_at.elapsed().as_millis() as u64,
        "Analyzer exited"
    );

    Ok(ProcessOutcome::from_raw(exit_status, &stdout, &stderr))
}

/// Read one pipe to EOF into an owned buffer
async fn drain<R>(reader: Option<R>, stream: &'static str) -> Vec<u8>
where
    R: AsyncRead + Unpin,
{
    let mut buffer = Vec::new();
    let Some(mut reader) = reader else {
        return buffer;
    };

    let mut chunk = vec![0u8; CHUNK_SIZE];
    loop {
        match reader.read(&mut chunk).await {
            Ok(0) => break,
            Ok(n) => {
                tracing::trace!(
                    stream,
                    bytes = n,
                    preview = %excerpt(&String::from_utf8_lossy(&chunk[..n]), PREVIEW_CHARS),
                    "Analyzer output chunk"
                );
                buffer.extend_from_slice(&chunk[..n]);
            }
            Err(e) => {
                tracing::warn!(stream, error = %e, "Failed reading analyzer output");
                break;
            }
        }
    }

    buffer
}

fn abort_all(stdin: &Option<AbortHandle>, stdout: &AbortHandle, stderr: &AbortHandle) {
    if let Some(stdin) = stdin {
        stdin.abort();
    }
    stdout.abort();
    stderr.abort();
}

async fn join_reader(task: JoinHandle<Vec<u8>>, stream: &'static str) -> Vec<u8> {
    match task.await {
        Ok(buffer) => buffer,
        Err(e) => {
            tracing::warn!(stream, error = %e, "Output reader task did not finish");
            Vec::new()
        }
    }
}

fn exit_code(status: &std::process::ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }

    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            tracing::debug!(signal, "Analyzer terminated by signal");
        }
    }

    -1
}
