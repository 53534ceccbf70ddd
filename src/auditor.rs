//! Inactive-User Auditor
//!
//! Walks the full identity directory and flags every user without a recorded
//! sign-in. Findings go straight to the sink as they are found.
//!
//! ## Fault model
//!
//! - Listing failures (any page) abort the scan.
//! - A detail lookup denied by IAM aborts the scan.
//! - Any other detail lookup failure is logged and the user is skipped; the
//!   rest of the directory is still audited.
//!
//! ## Example Usage
//!
//! ```ignore
//! use iam_audit_agent::{ConsoleSink, IamDirectory, InactiveUserAuditor, OutputFormat};
//!
//! let directory = IamDirectory::new(aws_sdk_iam::Client::new(&sdk_config));
//! let auditor = InactiveUserAuditor::new(directory, ConsoleSink::new(OutputFormat::Text));
//!
//! let result = auditor.run().await?;
//! println!("{}", result.body);
//! ```

use chrono::{DateTime, Utc};
use std::collections::HashSet;
use tracing::{debug, error, info, warn};

use crate::directory::IdentityDirectory;
use crate::sink::FindingSink;
use crate::types::{AuditError, AuditSummary, Finding, InvocationResult, UserRecord};

/// What counts as inactive
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AuditPolicy {
    /// Also flag users whose last sign-in is at least this many days old.
    /// `None` flags only users with no sign-in at all.
    pub stale_after_days: Option<u32>,
}

impl AuditPolicy {
    pub fn with_stale_after_days(mut self, days: u32) -> Self {
        self.stale_after_days = Some(days);
        self
    }
}

/// Decide whether a single user record should be flagged
pub fn evaluate(record: &UserRecord, now: DateTime<Utc>, policy: &AuditPolicy) -> Option<Finding> {
    let Some(last) = record.last_authenticated_at else {
        return Some(Finding::never_authenticated(&record.name));
    };

    let threshold = policy.stale_after_days?;
    let days_inactive = now.signed_duration_since(last).num_days();

    (days_inactive >= i64::from(threshold))
        .then(|| Finding::stale(&record.name, last, days_inactive))
}

/// Scans an identity directory for users without recorded sign-ins
pub struct InactiveUserAuditor<D, S> {
    directory: D,
    sink: S,
    policy: AuditPolicy,
}

impl<D, S> InactiveUserAuditor<D, S>
where
    D: IdentityDirectory,
    S: FindingSink,
{
    pub fn new(directory: D, sink: S) -> Self {
        Self {
            directory,
            sink,
            policy: AuditPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: AuditPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn directory(&self) -> &D {
        &self.directory
    }

    pub fn policy(&self) -> &AuditPolicy {
        &self.policy
    }

    /// Run one audit and build the scheduler's completion result
    pub async fn run(&self) -> Result<InvocationResult, AuditError> {
        let summary = self.enumerate_and_flag().await?;
        Ok(InvocationResult::completed(summary))
    }

    /// Walk every page of the directory and emit a finding per flagged user
    pub async fn enumerate_and_flag(&self) -> Result<AuditSummary, AuditError> {
        self.enumerate_and_flag_at(Utc::now()).await
    }

    /// Same as [`enumerate_and_flag`](Self::enumerate_and_flag) with a fixed clock
    pub async fn enumerate_and_flag_at(
        &self,
        now: DateTime<Utc>,
    ) -> Result<AuditSummary, AuditError> {
        let start = std::time::Instant::now();
        info!(
            stale_after_days = ?self.policy.stale_after_days,
            "Starting inactive user scan"
        );

        let mut summary = AuditSummary::default();
        let mut marker: Option<String> = None;
        let mut seen_markers: HashSet<String> = HashSet::new();
        let mut page = 0usize;

        loop {
            page += 1;

            let listing = self
                .directory
                .list_users(marker.clone())
                .await
                .inspect_err(|e| error!(page, error = %e, "Failed to list users"))?;

            debug!(page, users = listing.user_names.len(), "Listed users page");

            for user_name in &listing.user_names {
                let record = match self.directory.get_user(user_name).await {
                    Ok(record) => record,
                    Err(e @ AuditError::AccessDenied(_)) => {
                        error!(user = %user_name, error = %e, "Not allowed to describe users");
                        return Err(e);
                    }
                    Err(e) => {
                        warn!(user = %user_name, error = %e, "Skipping user, detail lookup failed");
                        summary.skipped += 1;
                        continue;
                    }
                };

                summary.users_scanned += 1;

                if let Some(finding) = evaluate(&record, now, &self.policy) {
                    self.sink.emit(&finding);
                    summary.findings += 1;
                }
            }

            match listing.next_marker {
                Some(next) if !seen_markers.insert(next.clone()) => {
                    return Err(AuditError::MalformedRecord(format!(
                        "Directory returned marker {} more than once",
                        next
                    )));
                }
                Some(next) => marker = Some(next),
                None => break,
            }
        }

        info!(
            pages = page,
            users_scanned = summary.users_scanned,
            findings = summary.findings,
            skipped = summary.skipped,
            duration_ms = start.elapsed().as_millis() as u64,
            "Inactive user scan complete"
        );

        Ok(summary)
    }
}
