//! Finding Output Sinks
//!
//! Findings are streamed out one line at a time as the scan discovers them.
//! On Lambda, stdout is collected by CloudWatch Logs.

use clap::ValueEnum;
use std::sync::Mutex;
use tracing::warn;

use crate::types::Finding;

/// Destination for findings as they are raised
pub trait FindingSink: Send + Sync {
    fn emit(&self, finding: &Finding);
}

/// Line format for console output
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable message line
    #[default]
    Text,
    /// One JSON object per line
    Json,
}

/// Writes one line per finding to stdout
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleSink {
    format: OutputFormat,
}

impl ConsoleSink {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Render a finding in this sink's format
    pub fn render(&self, finding: &Finding) -> String {
        match self.format {
            OutputFormat::Text => finding.message(),
            OutputFormat::Json => serde_json::to_string(finding).unwrap_or_else(|e| {
                warn!(error = %e, user = %finding.user_name, "Failed to serialize finding");
                finding.message()
            }),
        }
    }
}

impl FindingSink for ConsoleSink {
    fn emit(&self, finding: &Finding) {
        println!("{}", self.render(finding));
    }
}

/// Buffers findings in memory
#[derive(Debug, Default)]
pub struct CollectingSink {
    findings: Mutex<Vec<Finding>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything emitted so far, in emission order
    pub fn findings(&self) -> Vec<Finding> {
        self.findings
            .lock()
            .map(|f| f.clone())
            .unwrap_or_default()
    }

    /// Names of flagged users, in emission order
    pub fn user_names(&self) -> Vec<String> {
        self.findings().into_iter().map(|f| f.user_name).collect()
    }
}

impl FindingSink for CollectingSink {
    fn emit(&self, finding: &Finding) {
        if let Ok(mut findings) = self.findings.lock() {
            findings.push(finding.clone());
        }
    }
}

impl<S: FindingSink + ?Sized> FindingSink for &S {
    fn emit(&self, finding: &Finding) {
        (**self).emit(finding)
    }
}
