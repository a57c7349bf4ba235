//! Replay of analyzer stderr into the tracing log

use opportunity_scout_sdk::AnalyzerLog;
use tracing::Level;
use uuid::Uuid;

/// One classified stderr line
#[derive(Debug, Clone, PartialEq)]
pub enum StderrLine<'a> {
    Event(AnalyzerLog),
    Raw { level: Level, text: &'a str },
}

pub fn classify_line(line: &str) -> StderrLine<'_> {
    match AnalyzerLog::parse_line(line) {
        Some(event) => StderrLine::Event(event),
        None => StderrLine::Raw {
            level: infer_level(line),
            text: line,
        },
    }
}

/// Analyzers prefix their plain log lines with `ERROR:`, `INFO:` and friends
fn infer_level(line: &str) -> Level {
    let head: String = line
        .trim_start()
        .chars()
        .take(8)
        .collect::<String>()
        .to_ascii_uppercase();

    if head.starts_with("ERROR") || head.starts_with("FATAL") {
        Level::ERROR
    } else if head.starts_with("WARN") {
        Level::WARN
    } else if head.starts_with("INFO") {
        Level::INFO
    } else {
        Level::DEBUG
    }
}

/// Stderr without structured event lines, as shown to users on failure
pub fn human_readable(stderr: &str) -> String {
    stderr
        .lines()
        .filter(|line| AnalyzerLog::parse_line(line).is_none())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Emit every non-empty stderr line as a tracing event tagged with the invocation
pub fn replay(invocation: &Uuid, stderr: &str) {
    for line in stderr.lines().filter(|l| !l.trim().is_empty()) {
        match classify_line(line) {
            StderrLine::Event(event) => trace_event(invocation, &event),
            StderrLine::Raw { level, text } => {
                if level == Level::ERROR {
                    tracing::error!(invocation = %invocation, "[analyzer] {}", text);
                } else if level == Level::WARN {
                    tracing::warn!(invocation = %invocation, "[analyzer] {}", text);
                } else if level == Level::INFO {
                    tracing::info!(invocation = %invocation, "[analyzer] {}", text);
                } else {
                    tracing::debug!(invocation = %invocation, "[analyzer] {}", text);
                }
            }
        }
    }
}

fn trace_event(invocation: &Uuid, event: &AnalyzerLog) {
    match event {
        AnalyzerLog::StageStarted { stage } => {
            tracing::info!(invocation = %invocation, stage = %stage, "Analyzer stage started");
        }
        AnalyzerLog::StageCompleted { stage } => {
            tracing::info!(invocation = %invocation, stage = %stage, "Analyzer stage completed");
        }
        AnalyzerLog::ReviewsCollected { source, count } => {
            tracing::info!(invocation = %invocation, source = %source, count, "Reviews collected");
        }
        AnalyzerLog::FallbackUsed { reason } => {
            tracing::warn!(invocation = %invocation, reason = %reason, "Analyzer used fallback data");
        }
        AnalyzerLog::Warning { message } => {
            tracing::warn!(invocation = %invocation, "[analyzer] {}", message);
        }
    }
}
