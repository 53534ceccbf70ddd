//! Agent Configuration
//!
//! CLI flags with environment fallbacks, plus the shared AWS SDK config
//! they produce.

use aws_config::retry::RetryConfig;
use aws_config::timeout::TimeoutConfig;
use aws_config::{BehaviorVersion, Region, SdkConfig};
use clap::{Parser, ValueEnum};
use std::time::Duration;
use tracing::debug;

use crate::auditor::AuditPolicy;
use crate::sink::OutputFormat;

/// How the agent is driven
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum RunMode {
    /// Serve scheduled invocations through the Lambda runtime
    #[default]
    Lambda,
    /// Run a single scan and exit (local runs, CronJob mode)
    Once,
}

/// Log line format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    #[default]
    Json,
    Pretty,
}

/// IAM Audit Agent - flag IAM users with no recorded sign-in
#[derive(Parser, Debug, Clone)]
#[command(name = "iam-audit-agent", version, about)]
pub struct AgentConfig {
    /// Entry mode
    #[arg(long, value_enum, default_value = "lambda", env = "AUDIT_MODE")]
    pub mode: RunMode,

    /// AWS region override (defaults to the SDK provider chain)
    #[arg(long, env = "AWS_REGION")]
    pub region: Option<String>,

    /// Also flag users whose last sign-in is at least this many days old
    #[arg(long, env = "STALE_AFTER_DAYS", value_parser = clap::value_parser!(u32).range(1..))]
    pub stale_after_days: Option<u32>,

    /// Per-operation timeout for IAM calls, in seconds
    #[arg(
        long,
        default_value = "30",
        env = "IAM_OPERATION_TIMEOUT_SECS",
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub operation_timeout_secs: u64,

    /// Maximum attempts per IAM call (standard retry mode)
    #[arg(
        long,
        default_value = "3",
        env = "IAM_MAX_ATTEMPTS",
        value_parser = clap::value_parser!(u32).range(1..)
    )]
    pub max_attempts: u32,

    /// Finding line format
    #[arg(long, value_enum, default_value = "text", env = "AUDIT_OUTPUT")]
    pub output: OutputFormat,

    /// Log format
    #[arg(long, value_enum, default_value = "json", env = "LOG_FORMAT")]
    pub log_format: LogFormat,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl AgentConfig {
    /// Audit policy derived from the flags
    pub fn policy(&self) -> AuditPolicy {
        AuditPolicy {
            stale_after_days: self.stale_after_days,
        }
    }

    pub fn operation_timeout(&self) -> Duration {
        Duration::from_secs(self.operation_timeout_secs)
    }

    /// Load the shared AWS SDK config (credentials, region, timeouts, retries)
    pub async fn load_sdk_config(&self) -> SdkConfig {
        debug!(
            region = ?self.region,
            timeout_secs = self.operation_timeout_secs,
            max_attempts = self.max_attempts,
            "Loading AWS SDK config"
        );

        let mut loader = aws_config::defaults(BehaviorVersion::latest())
            .timeout_config(
                TimeoutConfig::builder()
                    .operation_timeout(self.operation_timeout())
                    .build(),
            )
            .retry_config(RetryConfig::standard().with_max_attempts(self.max_attempts));

        if let Some(region) = &self.region {
            loader = loader.region(Region::new(region.clone()));
        }

        loader.load().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AgentConfig::try_parse_from(["iam-audit-agent"]).unwrap();

        assert_eq!(config.mode, RunMode::Lambda);
        assert_eq!(config.operation_timeout(), Duration::from_secs(30));
        assert_eq!(config.max_attempts, 3);
        assert_eq!(config.output, OutputFormat::Text);
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(config.policy(), AuditPolicy::default());
    }

    #[test]
    fn test_once_mode_with_threshold() {
        let config = AgentConfig::try_parse_from([
            "iam-audit-agent",
            "--mode",
            "once",
            "--stale-after-days",
            "90",
            "--output",
            "json",
        ])
        .unwrap();

        assert_eq!(config.mode, RunMode::Once);
        assert_eq!(config.policy().stale_after_days, Some(90));
        assert_eq!(config.output, OutputFormat::Json);
    }

    #[test]
    fn test_rejects_zero_values() {
        assert!(AgentConfig::try_parse_from(["iam-audit-agent", "--max-attempts", "0"]).is_err());
        assert!(
            AgentConfig::try_parse_from(["iam-audit-agent", "--stale-after-days", "0"]).is_err()
        );
        assert!(AgentConfig::try_parse_from([
            "iam-audit-agent",
            "--operation-timeout-secs",
            "0"
        ])
        .is_err());
    }
}
