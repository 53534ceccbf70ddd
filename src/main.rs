//! IAM Audit Agent
//!
//! Flags IAM users that have never signed in. Deployed as a Lambda behind an
//! EventBridge schedule; can also run a single scan from the command line.
//!
//! # Usage
//! ```bash
//! # Serve scheduled invocations (Lambda)
//! iam-audit-agent
//!
//! # One-shot scan against the current AWS profile
//! iam-audit-agent --mode once --log-format pretty
//!
//! # Also flag users idle for 90+ days, findings as JSON lines
//! iam-audit-agent --mode once --stale-after-days 90 --output json
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use lambda_runtime::service_fn;
use tracing::info;
use tracing_subscriber::EnvFilter;

use iam_audit_agent::handler::function_handler;
use iam_audit_agent::{
    AgentConfig, ConsoleSink, IamDirectory, InactiveUserAuditor, LogFormat, OutputFormat, RunMode,
};

// ============================================================
// Main Entry Point
// ============================================================

#[tokio::main]
async fn main() -> Result<()> {
    let config = AgentConfig::parse();

    init_tracing(&config);

    info!(
        mode = ?config.mode,
        region = ?config.region,
        stale_after_days = ?config.stale_after_days,
        "Starting IAM Audit Agent"
    );

    // One client per process, reused across invocations
    let sdk_config = config.load_sdk_config().await;
    let directory = IamDirectory::new(aws_sdk_iam::Client::new(&sdk_config));

    let auditor = InactiveUserAuditor::new(directory, ConsoleSink::new(config.output))
        .with_policy(config.policy());

    match config.mode {
        RunMode::Lambda => {
            lambda_runtime::run(service_fn(|event| function_handler(event, &auditor)))
                .await
                .map_err(|e| anyhow::anyhow!("Lambda runtime exited: {}", e))?;
        }

        RunMode::Once => {
            let result = auditor.run().await.context("Inactive user audit failed")?;

            match config.output {
                OutputFormat::Text => println!("{}", result.body),
                OutputFormat::Json => println!(
                    "{}",
                    serde_json::to_string(&result).context("Failed to serialize result")?
                ),
            }
        }
    }

    Ok(())
}

/// Logs go to stderr so stdout only carries findings and the final result.
fn init_tracing(config: &AgentConfig) {
    let default_level = if config.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    // CloudWatch stamps every line already
    match (config.log_format, config.mode) {
        (LogFormat::Json, RunMode::Lambda) => builder.json().without_time().init(),
        (LogFormat::Json, RunMode::Once) => builder.json().init(),
        (LogFormat::Pretty, RunMode::Lambda) => builder.without_time().init(),
        (LogFormat::Pretty, RunMode::Once) => builder.init(),
    }
}
