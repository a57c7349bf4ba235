//! Batch runs and concurrent invocations against real analyzer processes

use opportunity_scout::batch::analyze_batch;
use opportunity_scout::{
    AnalysisRequest, AnalysisResponse, AnalyzerConfig, AnalysisRuntime, Orchestrator,
};
use std::sync::Arc;

use super::common::*;

/// Orchestrator whose mock analyzer picks its mode from `mock://<mode>` URLs
fn url_driven_orchestrator() -> Orchestrator {
    Orchestrator::new(AnalyzerConfig::new(mock_analyzer(), std::env::temp_dir()))
}

#[tokio::test]
async fn test_batch_isolates_failures() {
    let requests = vec![
        AnalysisRequest::new("mock://report", "App Store"),
        AnalysisRequest::new("mock://fail", "Amazon"),
        AnalysisRequest::new("mock://no-json", "TikTok"),
        AnalysisRequest::new("mock://report", "Google Maps"),
    ];

    let entries = analyze_batch(Arc::new(url_driven_orchestrator()), requests, 2).await;

    assert_eq!(entries.len(), 4);
    let failed: Vec<usize> = entries
        .iter()
        .filter(|e| e.response.is_error())
        .map(|e| e.index)
        .collect();
    assert_eq!(failed, vec![1, 2]);

    match &entries[3].response {
        AnalysisResponse::Report(report) => assert_eq!(
            report.software_opportunity.concept,
            "Lean alternative for Google Maps users"
        ),
        other => panic!("expected report, got {:?}", other),
    }
    match &entries[1].response {
        AnalysisResponse::Error(doc) => assert!(doc.error.contains("network timeout")),
        other => panic!("expected error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_batch_entries_serialize_for_output_file() {
    let requests = vec![AnalysisRequest::new("mock://report", "Shopee")];
    let entries = analyze_batch(Arc::new(url_driven_orchestrator()), requests, 1).await;

    let json = serde_json::to_value(&entries).unwrap();
    assert_eq!(json[0]["index"], 0);
    assert_eq!(json[0]["request"]["platform"], "Shopee");
    assert!(json[0]["response"]["categories"].is_object());
    assert!(json[0]["completed_at"].is_string());
}

#[tokio::test]
async fn test_concurrent_invocations_do_not_share_output() {
    let orchestrator = Arc::new(orchestrator("echo"));

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let orchestrator = orchestrator.clone();
            tokio::spawn(async move {
                let url = format!("https://apps.apple.com/app/id{}", i);
                let report = orchestrator
                    .analyze(AnalysisRequest::new(url.as_str(), "App Store"))
                    .await
                    .unwrap();
                (url, report)
            })
        })
        .collect();

    for handle in handles {
        let (url, report) = handle.await.unwrap();
        assert_eq!(report.software_opportunity.concept, url);
    }
}
