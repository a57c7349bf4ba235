//! Opportunity Scout orchestration
//!
//! Runs an external review analyzer as a child process, feeds it one JSON
//! request on stdin and turns its noisy output into either a structured
//! [`AnalysisResult`] or a classified [`OrchestrationError`].

// Analyzer launch settings
pub mod config;

// Child process start-up and stdin hand-off
pub mod launcher;

// Concurrent stdout/stderr draining and exit status
pub mod collector;

// Report location and parsing
pub mod extractor;

// Analyzer stderr replay into tracing
pub mod diagnostics;

// Invocation state machine
pub mod orchestrator;

// Many requests with bounded concurrency
pub mod batch;

// Command-line interface
pub mod cli;

pub use collector::ProcessOutcome;
pub use config::AnalyzerConfig;
pub use extractor::ExtractionMode;
pub use orchestrator::{InvocationReport, InvocationState, Orchestrator};

pub use opportunity_scout_sdk::{
    AnalysisRequest, AnalysisResponse, AnalysisResult, AnalysisRuntime, ErrorKind,
    OrchestrationError, Platform,
};
