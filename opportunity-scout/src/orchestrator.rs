//! Orchestrator: one request in, one report or one error out
//!
//! Each call to [`Orchestrator::run`] is an independent invocation:
//!
//! ```text
//! Idle ──► Launching ──► Running ──► Collecting ──► Succeeded
//!   │          │            │             │
//!   └──────────┴────────────┴─────────────┴───────► Failed(kind)
//! ```
//!
//! - **Launching**: spawning the analyzer and writing the request to stdin
//! - **Running**: the analyzer is alive while both output pipes are drained
//! - **Collecting**: the analyzer exited; exit status and stdout are judged
//!
//! Invocations share nothing but the immutable configuration, so one
//! orchestrator can serve many concurrent requests. Nothing is retried.

use opportunity_scout_sdk::{
    async_trait, excerpt, AnalysisRequest, AnalysisResult, AnalysisRuntime, ErrorKind,
    OrchestrationError,
};
use std::sync::Arc;
use std::time::{Duration, Instant};
use uuid::Uuid;

use crate::collector::{collect, CollectError, ProcessOutcome};
use crate::config::AnalyzerConfig;
use crate::diagnostics;
use crate::extractor::extract;
use crate::launcher::launch;

/// Upper bound on stderr text copied into a `NonZeroExit` message
const MAX_DIAGNOSTIC_CHARS: usize = 2000;

/// Lifecycle of one invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvocationState {
    Idle,
    Launching,
    Running,
    Collecting,
    Succeeded,
    Failed(ErrorKind),
}

impl InvocationState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, InvocationState::Succeeded | InvocationState::Failed(_))
    }
}

/// Everything known about a finished invocation
#[derive(Debug)]
pub struct InvocationReport {
    pub id: Uuid,
    /// States visited, starting with `Idle` and ending in a terminal state
    pub states: Vec<InvocationState>,
    pub outcome: Result<AnalysisResult, OrchestrationError>,
    pub elapsed: Duration,
}

/// Tracks the state machine of a single invocation
struct Invocation {
    id: Uuid,
    states: Vec<InvocationState>,
    started: Instant,
}

impl Invocation {
    fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            states: vec![InvocationState::Idle],
            started: Instant::now(),
        }
    }

    fn state(&self) -> InvocationState {
        self.states
            .last()
            .copied()
            .unwrap_or(InvocationState::Idle)
    }

    fn advance(&mut self, next: InvocationState) {
        let current = self.state();
        debug_assert!(
            !current.is_terminal(),
            "invocation {} already finished in {:?}",
            self.id,
            current
        );
        if current.is_terminal() {
            return;
        }

        tracing::debug!(invocation = %self.id, from = ?current, to = ?next, "Invocation state");
        self.states.push(next);
    }

    fn finish(
        mut self,
        outcome: Result<AnalysisResult, OrchestrationError>,
    ) -> InvocationReport {
        let terminal = match &outcome {
            Ok(_) => InvocationState::Succeeded,
            Err(e) => InvocationState::Failed(e.kind()),
        };
        self.advance(terminal);

        let elapsed = self.started.elapsed();
        match &outcome {
            Ok(_) => tracing::info!(
                invocation = %self.id,
                elapsed_ms = elapsed.as_millis() as u64,
                "Analysis succeeded"
            ),
            Err(e) => tracing::warn!(
                invocation = %self.id,
                kind = %e.kind(),
                elapsed_ms = elapsed.as_millis() as u64,
                error = %e,
                "Analysis failed"
            ),
        }

        InvocationReport {
            id: self.id,
            states: self.states,
            outcome,
            elapsed,
        }
    }
}

/// Runs analysis requests against the configured external analyzer
#[derive(Debug, Clone)]
pub struct Orchestrator {
    config: Arc<AnalyzerConfig>,
}

impl Orchestrator {
    pub fn new(config: AnalyzerConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    /// Analyze one request; produces exactly one report or one error
    pub async fn run(
        &self,
        request: AnalysisRequest,
    ) -> Result<AnalysisResult, OrchestrationError> {
        self.run_traced(request).await.outcome
    }

    /// Like [`run`](Self::run) but also returns the visited states and timing
    pub async fn run_traced(&self, request: AnalysisRequest) -> InvocationReport {
        let mut invocation = Invocation::new();
        tracing::info!(
            invocation = %invocation.id,
            url = %request.url(),
            platform = %request.platform(),
            "Starting analysis"
        );

        let outcome = self.drive(&mut invocation, &request).await;
        invocation.finish(outcome)
    }

    async fn drive(
        &self,
        invocation: &mut Invocation,
        request: &AnalysisRequest,
    ) -> Result<AnalysisResult, OrchestrationError> {
        request.validate()?;

        invocation.advance(InvocationState::Launching);
        let handle = launch(request, &self.config).await?;
        tracing::debug!(invocation = %invocation.id, pid = ?handle.pid(), "Analyzer running");

        invocation.advance(InvocationState::Running);
        let outcome = collect(handle).await.map_err(|e| match e {
            CollectError::TimedOut(_) => OrchestrationError::timeout(e.to_string()),
            CollectError::Wait(_) => OrchestrationError::non_zero_exit(e.to_string()),
        })?;

        invocation.advance(InvocationState::Collecting);
        diagnostics::replay(&invocation.id, &outcome.stderr_text);

        classify_exit(&outcome, self.config.excerpt_chars)?;
        extract(&outcome, self.config.extraction, self.config.excerpt_chars)
    }
}

/// Any non-zero exit is a failure, whatever stdout contains
pub fn classify_exit(
    outcome: &ProcessOutcome,
    excerpt_chars: usize,
) -> Result<(), OrchestrationError> {
    if outcome.success() {
        return Ok(());
    }

    let diagnostic = diagnostics::human_readable(&outcome.stderr_text);
    let diagnostic = diagnostic.trim();
    let message = if diagnostic.is_empty() {
        format!(
            "Analyzer error: process exited with status {} without a diagnostic message",
            outcome.exit_status
        )
    } else {
        format!("Analyzer error: {}", tail(diagnostic, MAX_DIAGNOSTIC_CHARS))
    };

    Err(OrchestrationError::non_zero_exit(message)
        .with_excerpt(excerpt(&outcome.stdout_text, excerpt_chars)))
}

/// Last `max_chars` characters; the end of stderr usually names the failure
fn tail(text: &str, max_chars: usize) -> &str {
    match text.char_indices().rev().nth(max_chars.saturating_sub(1)) {
        Some((idx, _)) if max_chars > 0 => &text[idx..],
        _ => text,
    }
}

#[async_trait]
impl AnalysisRuntime for Orchestrator {
    async fn analyze(
        &self,
        request: AnalysisRequest,
    ) -> Result<AnalysisResult, OrchestrationError> {
        self.run(request).await
    }
}
