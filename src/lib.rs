//! IAM Audit Agent Library
//!
//! Scans an AWS account's IAM users and flags accounts with no recorded
//! sign-in. Runs as a scheduled Lambda or as a one-shot CLI.

pub mod auditor;
pub mod config;
pub mod directory;
pub mod handler;
pub mod iam;
pub mod sink;
pub mod types;

pub use auditor::{evaluate, AuditPolicy, InactiveUserAuditor};
pub use config::{AgentConfig, LogFormat, RunMode};
pub use directory::{IdentityDirectory, InMemoryDirectory, UserPage};
pub use iam::IamDirectory;
pub use sink::{CollectingSink, ConsoleSink, FindingSink, OutputFormat};
pub use types::{AuditError, AuditSummary, Finding, FindingReason, InvocationResult, UserRecord};
