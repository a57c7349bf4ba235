//! Analyzer configuration
//!
//! Describes how the external analyzer is started: program, arguments,
//! project root, environment overrides, deadline and extraction policy.
//! Values come from built-in defaults, an optional YAML file and finally
//! command-line flags (see `cli`).

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::extractor::ExtractionMode;

pub const DEFAULT_PROGRAM: &str = "python";
pub const DEFAULT_SCRIPT: &str = "scripts/bridge_analyze.py";
pub const DEFAULT_TIMEOUT_SECS: u64 = 300;
pub const DEFAULT_EXCERPT_CHARS: usize = 100;

/// Launch settings for the external analyzer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    pub program: PathBuf,
    pub args: Vec<String>,
    /// Working directory of the analyzer (its own project root)
    pub project_root: PathBuf,
    /// Extra environment overrides, applied after the UTF-8 defaults
    pub env: BTreeMap<String, String>,
    /// Deadline for the analyzer to exit; 0 waits forever
    pub timeout_secs: u64,
    pub extraction: ExtractionMode,
    /// Length of raw output excerpts attached to errors
    pub excerpt_chars: usize,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            program: PathBuf::from(DEFAULT_PROGRAM),
            args: vec![DEFAULT_SCRIPT.to_string()],
            project_root: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            env: BTreeMap::new(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            extraction: ExtractionMode::default(),
            excerpt_chars: DEFAULT_EXCERPT_CHARS,
        }
    }
}

impl AnalyzerConfig {
    /// Run `program` inside `project_root` with no arguments
    pub fn new(program: impl Into<PathBuf>, project_root: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            project_root: project_root.into(),
            ..Self::default()
        }
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Set the deadline; `None` disables it
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout_secs = timeout.map(|t| t.as_secs().max(1)).unwrap_or(0);
        self
    }

    pub fn with_extraction(mut self, mode: ExtractionMode) -> Self {
        self.extraction = mode;
        self
    }

    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs))
    }

    /// Environment the analyzer is launched with, on top of the inherited one.
    ///
    /// Python analyzers get UTF-8 stdio regardless of the host locale and
    /// can import from the project root. Entries in `env` win.
    pub fn environment_overrides(&self) -> BTreeMap<String, String> {
        let mut overrides = BTreeMap::new();
        overrides.insert(
            "PYTHONPATH".to_string(),
            self.project_root.display().to_string(),
        );
        overrides.insert("PYTHONIOENCODING".to_string(), "utf-8".to_string());
        overrides.insert("PYTHONUTF8".to_string(), "1".to_string());

        for (key, value) in &self.env {
            overrides.insert(key.clone(), value.clone());
        }

        overrides
    }

    /// Location of the per-user config file
    pub fn default_config_path() -> Option<PathBuf> {
        use directories::ProjectDirs;

        ProjectDirs::from("com", "opportunity-scout", "opportunity-scout")
            .map(|dirs| dirs.config_dir().join("config.yaml"))
    }

    /// Read a YAML config file; missing keys keep their defaults
    pub fn from_yaml_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    /// Load configuration.
    ///
    /// An explicit path must exist and parse. Without one, the per-user
    /// config file is used when present and defaults otherwise.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::from_yaml_file(path);
        }

        match Self::default_config_path() {
            Some(path) if path.exists() => Self::from_yaml_file(&path),
            _ => Ok(Self::default()),
        }
    }

    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).context("Failed to serialize configuration")
    }
}
