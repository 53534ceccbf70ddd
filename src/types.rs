//! Types for the IAM inactive-user audit
//!
//! Records fetched from the identity directory, the findings raised against
//! them, and the result handed back to the scheduler.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Fixed message returned to the scheduler after a completed scan
pub const COMPLETION_MESSAGE: &str = "Inactive user check completed.";

/// Snapshot of a single IAM user, fetched fresh on every invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    /// Account-unique user name
    pub name: String,
    /// Most recent recorded sign-in (`None` = never observed)
    pub last_authenticated_at: Option<DateTime<Utc>>,
}

impl UserRecord {
    pub fn new(name: impl Into<String>, last_authenticated_at: Option<DateTime<Utc>>) -> Self {
        Self {
            name: name.into(),
            last_authenticated_at,
        }
    }

    /// User with no recorded sign-in
    pub fn never_authenticated(name: impl Into<String>) -> Self {
        Self::new(name, None)
    }
}

/// Why a user was flagged
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum FindingReason {
    /// No last-authentication timestamp on record
    NeverAuthenticated,
    /// Timestamp present but older than the configured threshold
    Stale {
        last_authenticated_at: DateTime<Utc>,
        days_inactive: i64,
    },
}

/// A user flagged by the audit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    pub user_name: String,
    #[serde(flatten)]
    pub reason: FindingReason,
}

impl Finding {
    pub fn never_authenticated(user_name: impl Into<String>) -> Self {
        Self {
            user_name: user_name.into(),
            reason: FindingReason::NeverAuthenticated,
        }
    }

    pub fn stale(
        user_name: impl Into<String>,
        last_authenticated_at: DateTime<Utc>,
        days_inactive: i64,
    ) -> Self {
        Self {
            user_name: user_name.into(),
            reason: FindingReason::Stale {
                last_authenticated_at,
                days_inactive,
            },
        }
    }

    /// Human-readable line for the output sink
    pub fn message(&self) -> String {
        match &self.reason {
            FindingReason::NeverAuthenticated => {
                format!("User {} has never logged in.", self.user_name)
            }
            FindingReason::Stale { days_inactive, .. } => format!(
                "User {} has not logged in for {} days.",
                self.user_name, days_inactive
            ),
        }
    }
}

impl std::fmt::Display for Finding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message())
    }
}

/// Counters for one completed scan
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditSummary {
    /// Users whose detail record was evaluated
    pub users_scanned: usize,
    /// Findings emitted to the sink
    pub findings: usize,
    /// Users skipped because their detail lookup failed
    pub skipped: usize,
}

/// Completion signal returned to the invoking scheduler
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvocationResult {
    pub status_code: u16,
    pub body: String,
    pub summary: AuditSummary,
}

impl InvocationResult {
    pub fn completed(summary: AuditSummary) -> Self {
        Self {
            status_code: 200,
            body: COMPLETION_MESSAGE.to_string(),
            summary,
        }
    }
}

/// Errors raised while talking to the identity directory
#[derive(Debug, Error)]
pub enum AuditError {
    /// Transient network or service fault
    #[error("Identity service unavailable: {0}")]
    ServiceUnavailable(String),

    /// Caller lacks permission to list or describe users
    #[error("Access denied: {0}")]
    AccessDenied(String),

    /// Directory entry had an unexpected shape
    #[error("Malformed record: {0}")]
    MalformedRecord(String),

    /// User disappeared between list and detail lookup
    #[error("User not found: {0}")]
    NotFound(String),

    /// Any other service-reported error
    #[error("Identity service error: {0}")]
    Service(String),
}
