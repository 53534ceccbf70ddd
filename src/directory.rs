//! Identity Directory Abstraction
//!
//! Trait-based seam over the account-wide user directory. The auditor only
//! needs two calls: list one page of user names, and fetch one user's detail.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use crate::types::{AuditError, UserRecord};

/// One page of the user listing
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserPage {
    /// User names on this page
    pub user_names: Vec<String>,
    /// Marker for the next page (`None` when the listing is exhausted)
    pub next_marker: Option<String>,
}

/// Trait for the identity directory backing an audit
#[async_trait]
pub trait IdentityDirectory: Send + Sync {
    /// List one page of users, starting at `marker` (first page when `None`)
    async fn list_users(&self, marker: Option<String>) -> Result<UserPage, AuditError>;

    /// Fetch the detail record for a single user
    async fn get_user(&self, user_name: &str) -> Result<UserRecord, AuditError>;
}

#[async_trait]
impl<T: IdentityDirectory + ?Sized> IdentityDirectory for &T {
    async fn list_users(&self, marker: Option<String>) -> Result<UserPage, AuditError> {
        (**self).list_users(marker).await
    }

    async fn get_user(&self, user_name: &str) -> Result<UserRecord, AuditError> {
        (**self).get_user(user_name).await
    }
}

/// Fault to inject into an [`InMemoryDirectory`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    ServiceUnavailable,
    AccessDenied,
    MalformedRecord,
    NotFound,
}

impl Fault {
    fn into_error(self, subject: &str) -> AuditError {
        match self {
            Fault::ServiceUnavailable => AuditError::ServiceUnavailable(subject.to_string()),
            Fault::AccessDenied => AuditError::AccessDenied(subject.to_string()),
            Fault::MalformedRecord => AuditError::MalformedRecord(subject.to_string()),
            Fault::NotFound => AuditError::NotFound(subject.to_string()),
        }
    }
}

/// In-memory directory with fixed-size pages and injectable faults
///
/// Backs local dry runs and tests. Listing honors `page_size`; markers are
/// the index of the next user as a string.
pub struct InMemoryDirectory {
    users: Vec<UserRecord>,
    page_size: usize,
    list_fault: Option<Fault>,
    detail_faults: HashMap<String, Fault>,
    detail_calls: Mutex<HashSet<String>>,
}

impl InMemoryDirectory {
    pub fn new(users: Vec<UserRecord>) -> Self {
        Self {
            users,
            page_size: 100,
            list_fault: None,
            detail_faults: HashMap::new(),
            detail_calls: Mutex::new(HashSet::new()),
        }
    }

    /// Set the listing page size (minimum 1)
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Fail every listing call with `fault`
    pub fn with_list_fault(mut self, fault: Fault) -> Self {
        self.list_fault = Some(fault);
        self
    }

    /// Fail the detail lookup for `user_name` with `fault`
    pub fn with_detail_fault(mut self, user_name: impl Into<String>, fault: Fault) -> Self {
        self.detail_faults.insert(user_name.into(), fault);
        self
    }

    /// Users whose detail record has been requested
    pub fn detail_calls(&self) -> HashSet<String> {
        self.detail_calls
            .lock()
            .map(|calls| calls.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl IdentityDirectory for InMemoryDirectory {
    async fn list_users(&self, marker: Option<String>) -> Result<UserPage, AuditError> {
        if let Some(fault) = self.list_fault {
            return Err(fault.into_error("ListUsers"));
        }

        let start = match marker {
            Some(m) => m
                .parse::<usize>()
                .map_err(|_| AuditError::MalformedRecord(format!("Invalid marker: {}", m)))?,
            None => 0,
        };

        let end = (start + self.page_size).min(self.users.len());
        let user_names = self
            .users
            .get(start..end)
            .unwrap_or_default()
            .iter()
            .map(|u| u.name.clone())
            .collect();

        let next_marker = (end < self.users.len()).then(|| end.to_string());

        Ok(UserPage {
            user_names,
            next_marker,
        })
    }

    async fn get_user(&self, user_name: &str) -> Result<UserRecord, AuditError> {
        if let Ok(mut calls) = self.detail_calls.lock() {
            calls.insert(user_name.to_string());
        }

        if let Some(fault) = self.detail_faults.get(user_name) {
            return Err(fault.into_error(user_name));
        }

        self.users
            .iter()
            .find(|u| u.name == user_name)
            .cloned()
            .ok_or_else(|| AuditError::NotFound(user_name.to_string()))
    }
}
