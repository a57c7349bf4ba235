//! Batch execution of many analysis requests with concurrency control

use chrono::{DateTime, Utc};
use futures::{stream::FuturesUnordered, StreamExt};
use opportunity_scout_sdk::{AnalysisRequest, AnalysisResponse, AnalysisRuntime};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;

/// Result of one request within a batch
#[derive(Debug, Clone, Serialize)]
pub struct BatchEntry {
    /// Position of the request in the input
    pub index: usize,
    pub request: AnalysisRequest,
    pub response: AnalysisResponse,
    pub completed_at: DateTime<Utc>,
    pub elapsed_ms: u64,
}

/// Run `requests` through `runtime` with at most `concurrency` in flight
///
/// # Returns
/// One entry per request, in input order
///
/// # Error Handling
/// Failures are recorded per entry; one failed request never stops the others
///
/// # Example
/// ```rust,no_run
/// # use std::sync::Arc;
/// # use opportunity_scout::{batch::analyze_batch, AnalyzerConfig, Orchestrator};
/// # use opportunity_scout_sdk::AnalysisRequest;
/// # async fn demo() {
/// let runtime = Arc::new(Orchestrator::new(AnalyzerConfig::default()));
/// let requests = vec![
///     AnalysisRequest::new("https://apps.apple.com/app/id1", "App Store"),
///     AnalysisRequest::new("https://www.amazon.com/dp/B0", "Amazon"),
/// ];
/// let entries = analyze_batch(runtime, requests, 2).await;
/// assert_eq!(entries.len(), 2);
/// # }
/// ```
pub async fn analyze_batch<R>(
    runtime: Arc<R>,
    requests: Vec<AnalysisRequest>,
    concurrency: usize,
) -> Vec<BatchEntry>
where
    R: AnalysisRuntime + ?Sized + 'static,
{
    let total = requests.len();
    let sem = Arc::new(Semaphore::new(concurrency.max(1)));
    let mut tasks = FuturesUnordered::new();

    for (index, request) in requests.into_iter().enumerate() {
        let sem = sem.clone();
        let runtime = runtime.clone();

        tasks.push(async move {
            // Acquire permit (waits while `concurrency` requests are running)
            let _permit = sem.acquire().await.ok();

            tracing::info!(request = index + 1, total, url = %request.url(), "Batch request started");
            let started = Instant::now();
            let response = AnalysisResponse::from(runtime.analyze(request.clone()).await);

            BatchEntry {
                index,
                request,
                response,
                completed_at: Utc::now(),
                elapsed_ms: started.elapsed().as_millis() as u64,
            }
        });
    }

    let mut entries = Vec::with_capacity(total);
    while let Some(entry) = tasks.next().await {
        if entry.response.is_error() {
            tracing::warn!(request = entry.index + 1, total, "Batch request failed");
        }
        entries.push(entry);
    }

    entries.sort_by_key(|entry| entry.index);
    entries
}
