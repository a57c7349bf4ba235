//! Common test utilities for orchestration tests

use opportunity_scout::{AnalysisRequest, AnalyzerConfig, Orchestrator};
use std::path::Path;

/// Path of the fixture analyzer built alongside the tests
pub fn mock_analyzer() -> &'static str {
    env!("CARGO_BIN_EXE_mock-analyzer")
}

/// Config running the mock analyzer in `mode` inside `root`
pub fn mock_config(mode: &str, root: &Path) -> AnalyzerConfig {
    AnalyzerConfig::new(mock_analyzer(), root).with_env("MOCK_ANALYZER_MODE", mode)
}

pub fn orchestrator(mode: &str) -> Orchestrator {
    Orchestrator::new(mock_config(mode, &std::env::temp_dir()))
}

pub fn app_store_request() -> AnalysisRequest {
    AnalysisRequest::new("https://apps.apple.com/x", "App Store")
}
