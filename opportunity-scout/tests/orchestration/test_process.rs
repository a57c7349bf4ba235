//! Process plumbing: working directory, environment, stdin, deadline, large output

use super::common::*;
use opportunity_scout::{AnalysisRequest, ErrorKind, InvocationState, Orchestrator};
use std::time::{Duration, Instant};

#[tokio::test]
async fn test_analyzer_runs_in_project_root_with_utf8_environment() {
    let root = tempfile::tempdir().unwrap();
    let config = mock_config("env", root.path()).with_env("SCOUT_MOCK_MARKER", "from-config");

    let report = Orchestrator::new(config)
        .run(app_store_request())
        .await
        .unwrap();

    let expected_root = root.path().canonicalize().unwrap();
    let reported_root = std::path::Path::new(&report.software_opportunity.concept)
        .canonicalize()
        .unwrap();
    assert_eq!(reported_root, expected_root);

    assert_eq!(report.software_opportunity.target_users, "utf-8");
    assert_eq!(report.software_opportunity.value_prop, "1");
    assert_eq!(report.marketing.ad_copy, root.path().display().to_string());
    assert_eq!(report.marketing.image_prompt, "from-config");
}

#[tokio::test]
async fn test_configured_env_overrides_defaults() {
    let root = tempfile::tempdir().unwrap();
    let config = mock_config("env", root.path()).with_env("PYTHONIOENCODING", "utf-8:strict");

    let report = Orchestrator::new(config)
        .run(app_store_request())
        .await
        .unwrap();
    assert_eq!(report.software_opportunity.target_users, "utf-8:strict");
}

#[tokio::test]
async fn test_request_reaches_analyzer_intact() {
    let request = AnalysisRequest::new("https://shopee.sg/product/42?ref=测试", "Shopee");
    let report = orchestrator("echo").run(request.clone()).await.unwrap();

    assert_eq!(report.software_opportunity.concept, request.url());
    assert_eq!(report.software_opportunity.target_users, "Shopee");

    let received: AnalysisRequest =
        serde_json::from_str(&report.software_opportunity.value_prop).unwrap();
    assert_eq!(received, request);
}

#[tokio::test]
async fn test_unknown_platform_label_is_passed_through() {
    let request = AnalysisRequest::new("https://example.com/item", "Etsy");
    let report = orchestrator("echo").run(request).await.unwrap();
    assert_eq!(report.software_opportunity.target_users, "Etsy");
}

#[tokio::test]
async fn test_hung_analyzer_is_killed_at_deadline() {
    let config = mock_config("hang", &std::env::temp_dir()).with_timeout(Some(Duration::from_secs(1)));
    let started = Instant::now();

    let traced = Orchestrator::new(config)
        .run_traced(app_store_request())
        .await;

    assert!(started.elapsed() < Duration::from_secs(15));
    let err = traced.outcome.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Timeout);
    assert_eq!(
        traced.states.last(),
        Some(&InvocationState::Failed(ErrorKind::Timeout))
    );
    assert!(!traced.states.contains(&InvocationState::Collecting));
}

#[tokio::test]
async fn test_large_output_on_both_streams_does_not_deadlock() {
    let config = mock_config("flood", &std::env::temp_dir()).with_timeout(Some(Duration::from_secs(60)));

    let report = Orchestrator::new(config)
        .run(app_store_request())
        .await
        .unwrap();
    assert_eq!(
        report.software_opportunity.concept,
        "Lean alternative for App Store users"
    );
}

#[tokio::test]
async fn test_blank_url_is_rejected_before_launch() {
    let err = orchestrator("report")
        .run(AnalysisRequest::new("", "App Store"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidRequest);
}

#[cfg(unix)]
#[tokio::test]
async fn test_deadline_covers_request_delivery() {
    let config = opportunity_scout::AnalyzerConfig::new("sh", std::env::temp_dir())
        .with_args(["-c", "sleep 8"])
        .with_timeout(Some(Duration::from_secs(1)));
    let url = format!("https://apps.apple.com/{}", "z".repeat(256 * 1024));
    let started = Instant::now();

    let traced = Orchestrator::new(config)
        .run_traced(AnalysisRequest::new(url, "App Store"))
        .await;

    assert!(started.elapsed() < Duration::from_secs(5));
    assert_eq!(traced.outcome.unwrap_err().kind(), ErrorKind::Timeout);
}
