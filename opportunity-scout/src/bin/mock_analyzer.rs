//! Deterministic analyzer used as a test fixture and demo worker.
//!
//! Reads one request from stdin and answers according to a mode, taken from
//! `MOCK_ANALYZER_MODE` or else from a `mock://<mode>` request URL.
//!
//! Modes: report, sentinel, scenario-a, echo, env, fail, fail-silent,
//! fail-with-json, no-json, malformed, schema, error-doc, hang, flood.

use opportunity_scout_sdk::{
    emit_error, emit_result, log_analyzer_warning, log_fallback, log_reviews_collected,
    log_stage_complete, log_stage_start, read_request_from, AnalysisRequest, AnalysisResult,
    Categories, Marketing, SoftwareOpportunity, WorkerResult,
};
use std::io::{Read, Write};
use std::process::ExitCode;
use std::time::Duration;

const MODE_ENV: &str = "MOCK_ANALYZER_MODE";

/// Report printed verbatim in `scenario-a` mode
const SCENARIO_A_STDOUT: &str = "log line\n{\"categories\":{\"pain_points\":[\"slow\"],\"missing_features\":[],\"highlights\":[]},\"software_opportunity\":{\"concept\":\"X\",\"target_users\":\"Y\",\"value_prop\":\"Z\"},\"marketing\":{\"ad_copy\":\"A\",\"image_prompt\":\"B\",\"video_script\":\"C\"}}\ndone";

fn main() -> ExitCode {
    let mut raw = String::new();
    if let Err(e) = std::io::stdin().read_to_string(&mut raw) {
        emit_error(format!("Failed to read stdin: {}", e));
        return ExitCode::SUCCESS;
    }

    let request = match read_request_from(raw.as_bytes()) {
        Ok(request) => request,
        Err(e) => {
            // Fatal errors are reported as a document with exit 0
            emit_error(e.to_string());
            return ExitCode::SUCCESS;
        }
    };

    let mode = std::env::var(MODE_ENV)
        .ok()
        .or_else(|| request.url().strip_prefix("mock://").map(str::to_string))
        .unwrap_or_else(|| "report".to_string());

    match run(&mode, &request, raw.trim()) {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            eprintln!("FATAL ERROR: {}", e);
            ExitCode::from(1)
        }
    }
}

fn run(mode: &str, request: &AnalysisRequest, raw: &str) -> WorkerResult<u8> {
    let mut out = std::io::stdout().lock();

    match mode {
        "report" => {
            scrape(request);
            writeln!(out, "DEBUG: analysis finished")?;
            writeln!(out, "{}", serde_json::to_string(&build_report(request))?)?;
            writeln!(out, "done")?;
        }
        "sentinel" => {
            scrape(request);
            writeln!(out, "progress {{step 1 of 2}}")?;
            drop(out);
            emit_result(&build_report(request))?;
            println!("cleanup {{ok}}");
        }
        "scenario-a" => {
            eprint!("scraping...");
            write!(out, "{}", SCENARIO_A_STDOUT)?;
        }
        "echo" => {
            let mut report = build_report(request);
            report.software_opportunity.concept = request.url().to_string();
            report.software_opportunity.target_users = request.platform().to_string();
            report.software_opportunity.value_prop = raw.to_string();
            writeln!(out, "{}", serde_json::to_string(&report)?)?;
        }
        "env" => {
            let var = |key: &str| std::env::var(key).unwrap_or_default();
            let mut report = build_report(request);
            report.software_opportunity.concept = std::env::current_dir()?.display().to_string();
            report.software_opportunity.target_users = var("PYTHONIOENCODING");
            report.software_opportunity.value_prop = var("PYTHONUTF8");
            report.marketing.ad_copy = var("PYTHONPATH");
            report.marketing.image_prompt = var("SCOUT_MOCK_MARKER");
            writeln!(out, "{}", serde_json::to_string(&report)?)?;
        }
        "fail" => {
            log_stage_start!("scrape");
            eprintln!("network timeout");
            return Ok(1);
        }
        "fail-silent" => return Ok(2),
        "fail-with-json" => {
            writeln!(out, "{}", serde_json::to_string(&build_report(request))?)?;
            eprintln!("ERROR: report generation crashed after printing");
            return Ok(1);
        }
        "no-json" => write!(out, "nothing useful here")?,
        "malformed" => writeln!(out, "result: {{\"categories\": oops}}")?,
        "schema" => writeln!(out, "{{\"categories\":{{\"pain_points\":[]}}}}")?,
        "error-doc" => {
            drop(out);
            emit_error("Analysis failed: quota exceeded");
        }
        "hang" => {
            eprintln!("INFO: waiting on upstream");
            std::thread::sleep(Duration::from_secs(30));
            writeln!(out, "{}", serde_json::to_string(&build_report(request))?)?;
        }
        "flood" => {
            let line = "x".repeat(1023);
            for _ in 0..512 {
                eprintln!("{}", line);
                writeln!(out, "{}", line)?;
            }
            drop(out);
            emit_result(&build_report(request))?;
        }
        other => {
            log_analyzer_warning!("unknown mode {}", other);
            eprintln!("ERROR: unknown mock mode '{}'", other);
            return Ok(64);
        }
    }

    std::io::stdout().flush()?;
    Ok(0)
}

/// Structured progress events, as a real analyzer would emit them
fn scrape(request: &AnalysisRequest) {
    log_stage_start!("scrape");
    log_reviews_collected!(request.platform(), 3);
    if request.url().contains("fallback") {
        log_fallback!("no reviews found, using sample data");
    }
    log_stage_complete!("scrape");
}

fn build_report(request: &AnalysisRequest) -> AnalysisResult {
    let platform = request.platform().label();
    AnalysisResult {
        categories: Categories {
            pain_points: vec!["Slow sync".to_string(), "Confusing setup".to_string()],
            missing_features: vec!["Offline mode".to_string()],
            highlights: vec!["Clean interface".to_string()],
        },
        software_opportunity: SoftwareOpportunity {
            concept: format!("Lean alternative for {} users", platform),
            target_users: format!("Reviewers of {}", request.url()),
            value_prop: "Fast, offline-first, no setup".to_string(),
        },
        marketing: Marketing {
            ad_copy: "Finally, an app that just works.".to_string(),
            image_prompt: "minimal desk, soft morning light".to_string(),
            video_script: format!("Scene 1: a frustrated {} user. Scene 2: relief.", platform),
        },
    }
}
