//! Result extraction from noisy analyzer output
//!
//! Analyzers are free to print log lines around their report. The report is
//! located either between the sentinel markers or, for analyzers that do not
//! use them, as the span from the first `{` to the last `}` of stdout.

use opportunity_scout_sdk::{
    excerpt, AnalysisResult, ErrorDocument, OrchestrationError, REPORT_BEGIN_MARKER,
    REPORT_END_MARKER,
};
use serde::{Deserialize, Serialize};

use crate::collector::ProcessOutcome;

/// How the structured region is located in stdout
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionMode {
    /// Use the sentinel block when it holds a region, brace scanning otherwise
    #[default]
    Auto,
    /// First `{` to last `}` of the whole output
    Braces,
    /// Only accept reports between the sentinel markers
    Sentinel,
}

/// Span from the first `{` to the last `}`, if the latter follows the former
pub fn locate_structured_region(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

/// Text between the begin and end markers; `None` unless both are present
pub fn sentinel_block(text: &str) -> Option<&str> {
    let begin = text.find(REPORT_BEGIN_MARKER)? + REPORT_BEGIN_MARKER.len();
    let rest = &text[begin..];
    let end = rest.find(REPORT_END_MARKER)?;
    Some(&rest[..end])
}

/// Pull the report out of an analyzer's stdout.
///
/// Only structure is checked: empty strings and lists are valid reports.
pub fn extract(
    outcome: &ProcessOutcome,
    mode: ExtractionMode,
    excerpt_chars: usize,
) -> Result<AnalysisResult, OrchestrationError> {
    let stdout = outcome.stdout_text.as_str();
    let raw_excerpt = excerpt(stdout, excerpt_chars);

    let scope = match mode {
        ExtractionMode::Braces => stdout,
        ExtractionMode::Auto => sentinel_block(stdout)
            .filter(|block| locate_structured_region(block).is_some())
            .unwrap_or(stdout),
        ExtractionMode::Sentinel => match sentinel_block(stdout) {
            Some(block) => block,
            None => {
                return Err(OrchestrationError::no_json_found(format!(
                    "No report markers found in output: {}",
                    raw_excerpt
                ))
                .with_excerpt(raw_excerpt));
            }
        },
    };

    let region = match locate_structured_region(scope) {
        Some(region) => region,
        None => {
            return Err(OrchestrationError::no_json_found(format!(
                "No valid JSON found in output: {}",
                raw_excerpt
            ))
            .with_excerpt(raw_excerpt));
        }
    };

    parse_report(region).map_err(|reason| {
        OrchestrationError::malformed_json(format!("{}: {}", reason, raw_excerpt))
            .with_excerpt(raw_excerpt)
    })
}

fn parse_report(region: &str) -> Result<AnalysisResult, String> {
    match serde_json::from_str::<AnalysisResult>(region) {
        Ok(report) => Ok(report),
        Err(e) => {
            // Analyzers report their own failures as {"error": "..."} with exit 0
            if let Ok(doc) = serde_json::from_str::<ErrorDocument>(region) {
                return Err(format!("Analyzer reported an error ({})", doc.error));
            }
            Err(format!("Malformed analysis JSON ({})", e))
        }
    }
}
