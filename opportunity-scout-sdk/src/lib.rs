// Re-export async trait for convenience
pub use async_trait::async_trait;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::{Read, Write};

/// Prefix of structured analyzer events written to stderr
pub const EVENT_PREFIX: &str = "__SCOUT_EVENT__:";

/// Line that opens a sentinel-delimited report on stdout
pub const REPORT_BEGIN_MARKER: &str = "<<<OPPORTUNITY_REPORT>>>";

/// Line that closes a sentinel-delimited report on stdout
pub const REPORT_END_MARKER: &str = "<<<END_OPPORTUNITY_REPORT>>>";

// ============================================================================
// Request
// ============================================================================

/// Review platform a product URL belongs to.
///
/// The set is open: labels the analyzer has no dedicated scraper for are
/// carried verbatim in `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Platform {
    #[default]
    AppStore,
    Amazon,
    GoogleMaps,
    TikTok,
    Shopee,
    Other(String),
}

impl Platform {
    /// Platforms with a dedicated label in the analyzer
    pub fn known() -> [Platform; 5] {
        [
            Platform::AppStore,
            Platform::Amazon,
            Platform::GoogleMaps,
            Platform::TikTok,
            Platform::Shopee,
        ]
    }

    pub fn label(&self) -> &str {
        match self {
            Platform::AppStore => "App Store",
            Platform::Amazon => "Amazon",
            Platform::GoogleMaps => "Google Maps",
            Platform::TikTok => "TikTok",
            Platform::Shopee => "Shopee",
            Platform::Other(label) => label,
        }
    }
}

impl From<String> for Platform {
    fn from(label: String) -> Self {
        let normalized: String = label
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect::<String>()
            .to_ascii_lowercase();

        match normalized.as_str() {
            "appstore" => Platform::AppStore,
            "amazon" => Platform::Amazon,
            "googlemaps" => Platform::GoogleMaps,
            "tiktok" => Platform::TikTok,
            "shopee" => Platform::Shopee,
            _ => Platform::Other(label),
        }
    }
}

impl From<&str> for Platform {
    fn from(label: &str) -> Self {
        Platform::from(label.to_string())
    }
}

impl From<Platform> for String {
    fn from(platform: Platform) -> Self {
        platform.label().to_string()
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A single analysis request: which product page to scrape and where it lives.
///
/// Fields are private so a request cannot change after construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisRequest {
    url: String,
    #[serde(default)]
    platform: Platform,
}

impl AnalysisRequest {
    pub fn new(url: impl Into<String>, platform: impl Into<Platform>) -> Self {
        Self {
            url: url.into(),
            platform: platform.into(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn platform(&self) -> &Platform {
        &self.platform
    }

    /// Minimal admission check: the URL must contain something other than whitespace
    pub fn validate(&self) -> Result<(), OrchestrationError> {
        if self.url.trim().is_empty() {
            return Err(OrchestrationError::invalid_request(
                "Request URL must not be empty",
            ));
        }
        Ok(())
    }

    /// JSON document written to the analyzer's stdin
    pub fn to_payload(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

// ============================================================================
// Result
// ============================================================================

/// Review findings grouped by theme
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Categories {
    pub pain_points: Vec<String>,
    pub missing_features: Vec<String>,
    pub highlights: Vec<String>,
}

/// Product idea derived from the findings
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SoftwareOpportunity {
    pub concept: String,
    pub target_users: String,
    pub value_prop: String,
}

/// Launch material for the product idea
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Marketing {
    pub ad_copy: String,
    pub image_prompt: String,
    pub video_script: String,
}

/// Structured opportunity report produced by a successful analysis
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub categories: Categories,
    pub software_opportunity: SoftwareOpportunity,
    pub marketing: Marketing,
}

/// Failure document returned to the presentation layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorDocument {
    pub error: String,
}

/// Response document: either the report or `{ "error": "..." }`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AnalysisResponse {
    Report(AnalysisResult),
    Error(ErrorDocument),
}

impl AnalysisResponse {
    pub fn is_error(&self) -> bool {
        matches!(self, AnalysisResponse::Error(_))
    }
}

impl From<Result<AnalysisResult, OrchestrationError>> for AnalysisResponse {
    fn from(outcome: Result<AnalysisResult, OrchestrationError>) -> Self {
        match outcome {
            Ok(report) => AnalysisResponse::Report(report),
            Err(e) => AnalysisResponse::Error(ErrorDocument {
                error: e.message().to_string(),
            }),
        }
    }
}

// ============================================================================
// Error contract
// ============================================================================

/// Why an invocation failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// The analyzer process could not be started
    SpawnFailure,
    /// The analyzer exited with a non-zero status
    NonZeroExit,
    /// Exit status was zero but stdout held no `{...}` region
    NoJsonFound,
    /// A region was found but it is not a valid report
    MalformedJson,
    /// The analyzer did not exit within the configured deadline
    Timeout,
    /// The request was rejected before launching anything
    InvalidRequest,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::SpawnFailure => "spawn_failure",
            ErrorKind::NonZeroExit => "non_zero_exit",
            ErrorKind::NoJsonFound => "no_json_found",
            ErrorKind::MalformedJson => "malformed_json",
            ErrorKind::Timeout => "timeout",
            ErrorKind::InvalidRequest => "invalid_request",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Uniform failure value of one invocation.
///
/// `Display` renders only the message so it can be shown to users verbatim.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct OrchestrationError {
    kind: ErrorKind,
    message: String,
    raw_output_excerpt: Option<String>,
}

impl OrchestrationError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            raw_output_excerpt: None,
        }
    }

    pub fn spawn_failure(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::SpawnFailure, message)
    }

    pub fn non_zero_exit(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NonZeroExit, message)
    }

    pub fn no_json_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NoJsonFound, message)
    }

    pub fn malformed_json(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::MalformedJson, message)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Timeout, message)
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidRequest, message)
    }

    /// Attach a (already truncated) slice of the analyzer's raw output
    pub fn with_excerpt(mut self, excerpt: impl Into<String>) -> Self {
        self.raw_output_excerpt = Some(excerpt.into());
        self
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn raw_output_excerpt(&self) -> Option<&str> {
        self.raw_output_excerpt.as_deref()
    }
}

/// First `max_chars` characters of `text`, never splitting a code point
pub fn excerpt(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

/// Anything that turns a request into a report.
///
/// The process-backed orchestrator is the production implementation; batch
/// runners and presentation code only depend on this trait.
#[async_trait]
pub trait AnalysisRuntime: Send + Sync {
    async fn analyze(
        &self,
        request: AnalysisRequest,
    ) -> Result<AnalysisResult, OrchestrationError>;
}

// ============================================================================
// Analyzer side of the protocol
// ============================================================================

/// Result type for analyzer helpers
pub type WorkerResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// Read the request document from stdin (until EOF)
pub fn read_request() -> WorkerResult<AnalysisRequest> {
    read_request_from(std::io::stdin().lock())
}

pub fn read_request_from(mut reader: impl Read) -> WorkerResult<AnalysisRequest> {
    let mut input = String::new();
    reader.read_to_string(&mut input)?;

    let input = input.trim();
    if input.is_empty() {
        return Err("No input data provided".into());
    }

    Ok(serde_json::from_str(input)?)
}

/// Print the report on stdout between the sentinel markers
pub fn emit_result(result: &AnalysisResult) -> WorkerResult<()> {
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    write_result(&mut out, result)
}

pub fn write_result(mut writer: impl Write, result: &AnalysisResult) -> WorkerResult<()> {
    let json = serde_json::to_string(result)?;
    writeln!(writer, "{}", REPORT_BEGIN_MARKER)?;
    writeln!(writer, "{}", json)?;
    writeln!(writer, "{}", REPORT_END_MARKER)?;
    writer.flush()?;
    Ok(())
}

/// Print an error document on stdout
pub fn emit_error(message: impl Into<String>) {
    let doc = ErrorDocument {
        error: message.into(),
    };
    if let Ok(json) = serde_json::to_string(&doc) {
        println!("{}", json);
        let _ = std::io::stdout().flush();
    }
}

/// Structured progress events emitted by analyzers on stderr
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AnalyzerLog {
    StageStarted {
        stage: String,
    },
    StageCompleted {
        stage: String,
    },
    ReviewsCollected {
        source: String,
        count: usize,
    },
    /// Analyzer substituted canned data for a failed step
    FallbackUsed {
        reason: String,
    },
    Warning {
        message: String,
    },
}

impl AnalyzerLog {
    /// Emit this event to stderr for the orchestrator to pick up
    pub fn emit(&self) {
        if let Ok(json) = serde_json::to_string(self) {
            eprintln!("{}{}", EVENT_PREFIX, json);
            let _ = std::io::stderr().flush();
        }
    }

    /// Parse a stderr line; `None` when it is not a structured event
    pub fn parse_line(line: &str) -> Option<Self> {
        let json = line.trim_end().strip_prefix(EVENT_PREFIX)?;
        serde_json::from_str(json).ok()
    }
}

#[macro_export]
macro_rules! log_stage_start {
    ($stage:expr) => {
        $crate::AnalyzerLog::StageStarted {
            stage: $stage.to_string(),
        }
        .emit();
    };
}

#[macro_export]
macro_rules! log_stage_complete {
    ($stage:expr) => {
        $crate::AnalyzerLog::StageCompleted {
            stage: $stage.to_string(),
        }
        .emit();
    };
}

#[macro_export]
macro_rules! log_reviews_collected {
    ($source:expr, $count:expr) => {
        $crate::AnalyzerLog::ReviewsCollected {
            source: $source.to_string(),
            count: $count,
        }
        .emit();
    };
}

#[macro_export]
macro_rules! log_fallback {
    ($reason:expr) => {
        $crate::AnalyzerLog::FallbackUsed {
            reason: $reason.to_string(),
        }
        .emit();
    };
}

#[macro_export]
macro_rules! log_analyzer_warning {
    ($message:expr) => {
        $crate::AnalyzerLog::Warning {
            message: $message.to_string(),
        }
        .emit();
    };
    ($fmt:expr, $($arg:tt)*) => {
        $crate::AnalyzerLog::Warning {
            message: format!($fmt, $($arg)*),
        }
        .emit();
    };
}
