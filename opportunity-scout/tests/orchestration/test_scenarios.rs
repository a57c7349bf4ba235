//! Outcome classification of single invocations

use super::common::*;
use opportunity_scout::{
    AnalysisRequest, AnalysisResponse, AnalyzerConfig, ErrorKind, ExtractionMode,
    InvocationState, Orchestrator, Platform,
};

// ============================================================================
// Successful runs
// ============================================================================

#[tokio::test]
async fn test_noisy_stdout_around_report() {
    let report = orchestrator("scenario-a")
        .run(app_store_request())
        .await
        .unwrap();

    assert_eq!(report.categories.pain_points, vec!["slow".to_string()]);
    assert!(report.categories.missing_features.is_empty());
    assert!(report.categories.highlights.is_empty());
    assert_eq!(report.software_opportunity.concept, "X");
    assert_eq!(report.software_opportunity.target_users, "Y");
    assert_eq!(report.software_opportunity.value_prop, "Z");
    assert_eq!(report.marketing.ad_copy, "A");
    assert_eq!(report.marketing.image_prompt, "B");
    assert_eq!(report.marketing.video_script, "C");
}

#[tokio::test]
async fn test_report_reflects_request() {
    let request = AnalysisRequest::new("https://www.amazon.com/dp/B0TEST", Platform::Amazon);
    let report = orchestrator("report").run(request).await.unwrap();

    assert_eq!(
        report.software_opportunity.concept,
        "Lean alternative for Amazon users"
    );
    assert!(report
        .software_opportunity
        .target_users
        .contains("https://www.amazon.com/dp/B0TEST"));
}

#[tokio::test]
async fn test_sentinel_report_with_braces_in_noise() {
    let strict = Orchestrator::new(
        mock_config("sentinel", &std::env::temp_dir()).with_extraction(ExtractionMode::Sentinel),
    );
    let report = strict.run(app_store_request()).await.unwrap();
    assert_eq!(
        report.software_opportunity.concept,
        "Lean alternative for App Store users"
    );

    let auto = orchestrator("sentinel").run(app_store_request()).await.unwrap();
    assert_eq!(auto, report);
}

#[tokio::test]
async fn test_braces_mode_trips_over_noise() {
    let braces = Orchestrator::new(
        mock_config("sentinel", &std::env::temp_dir()).with_extraction(ExtractionMode::Braces),
    );
    let err = braces.run(app_store_request()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MalformedJson);
}

#[tokio::test]
async fn test_same_request_twice_is_identical() {
    let orchestrator = orchestrator("report");
    let first = orchestrator.run(app_store_request()).await.unwrap();
    let second = orchestrator.run(app_store_request()).await.unwrap();
    assert_eq!(first, second);
}

// ============================================================================
// Failures
// ============================================================================

#[tokio::test]
async fn test_exit_one_with_stderr() {
    let err = orchestrator("fail").run(app_store_request()).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::NonZeroExit);
    assert!(err.message().contains("network timeout"));
    // Structured events are not part of the user-facing message
    assert!(!err.message().contains("__SCOUT_EVENT__"));
}

#[tokio::test]
async fn test_silent_failure_gets_fallback_message() {
    let err = orchestrator("fail-silent")
        .run(app_store_request())
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::NonZeroExit);
    assert!(err.message().contains("status 2"));
    assert!(!err.message().trim().is_empty());
}

#[tokio::test]
async fn test_non_zero_exit_wins_over_valid_stdout() {
    let err = orchestrator("fail-with-json")
        .run(app_store_request())
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::NonZeroExit);
    assert!(err.message().contains("report generation crashed"));
}

#[tokio::test]
async fn test_no_json_found() {
    let err = orchestrator("no-json").run(app_store_request()).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::NoJsonFound);
    assert_eq!(err.raw_output_excerpt(), Some("nothing useful here"));
}

#[tokio::test]
async fn test_malformed_and_schema_violations() {
    for mode in ["malformed", "schema"] {
        let err = orchestrator(mode).run(app_store_request()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedJson, "mode {}", mode);
    }
}

#[tokio::test]
async fn test_error_document_from_analyzer() {
    let err = orchestrator("error-doc")
        .run(app_store_request())
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::MalformedJson);
    assert!(err.message().contains("quota exceeded"));
}

#[tokio::test]
async fn test_missing_executable() {
    let orchestrator = Orchestrator::new(AnalyzerConfig::new(
        "/nonexistent/opportunity-analyzer",
        std::env::temp_dir(),
    ));

    let traced = orchestrator.run_traced(app_store_request()).await;
    let err = traced.outcome.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::SpawnFailure);
    assert!(err.raw_output_excerpt().is_none());
    assert_eq!(
        traced.states.last(),
        Some(&InvocationState::Failed(ErrorKind::SpawnFailure))
    );
}

// ============================================================================
// Invocation lifecycle
// ============================================================================

#[tokio::test]
async fn test_successful_state_path() {
    let traced = orchestrator("report").run_traced(app_store_request()).await;

    assert!(traced.outcome.is_ok());
    assert_eq!(
        traced.states,
        vec![
            InvocationState::Idle,
            InvocationState::Launching,
            InvocationState::Running,
            InvocationState::Collecting,
            InvocationState::Succeeded,
        ]
    );
}

#[tokio::test]
async fn test_extraction_failure_happens_while_collecting() {
    let traced = orchestrator("no-json").run_traced(app_store_request()).await;

    assert_eq!(
        &traced.states[3..],
        &[
            InvocationState::Collecting,
            InvocationState::Failed(ErrorKind::NoJsonFound)
        ]
    );
}

#[tokio::test]
async fn test_response_document_shape() {
    let err = orchestrator("fail").run(app_store_request()).await;
    let json = serde_json::to_value(AnalysisResponse::from(err)).unwrap();

    let message = json["error"].as_str().unwrap();
    assert!(message.contains("network timeout"));
    assert!(json.get("categories").is_none());
}
