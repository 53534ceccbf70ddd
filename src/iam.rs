//! AWS IAM Directory
//!
//! [`IdentityDirectory`] backed by the IAM `ListUsers` and `GetUser` APIs.
//! The client is built once per process from the shared SDK config and
//! reused across invocations.

use async_trait::async_trait;
use aws_sdk_iam::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_iam::types::User;
use aws_sdk_iam::Client;
use chrono::{DateTime, Utc};
use tracing::debug;

use crate::directory::{IdentityDirectory, UserPage};
use crate::types::{AuditError, UserRecord};

/// Error codes that mean the caller is not allowed to make the call
const ACCESS_DENIED_CODES: &[&str] = &[
    "AccessDenied",
    "AccessDeniedException",
    "UnauthorizedOperation",
    "InvalidClientTokenId",
];

/// Error codes for transient service-side faults
const UNAVAILABLE_CODES: &[&str] = &[
    "ServiceFailure",
    "ServiceUnavailable",
    "Throttling",
    "ThrottlingException",
    "RequestLimitExceeded",
];

/// IAM-backed identity directory
#[derive(Debug, Clone)]
pub struct IamDirectory {
    client: Client,
}

impl IamDirectory {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl IdentityDirectory for IamDirectory {
    async fn list_users(&self, marker: Option<String>) -> Result<UserPage, AuditError> {
        debug!(marker = ?marker, "Calling iam:ListUsers");

        let output = self
            .client
            .list_users()
            .set_marker(marker)
            .send()
            .await
            .map_err(|e| classify_sdk_error("ListUsers", e))?;

        let user_names = output
            .users()
            .iter()
            .map(|u| u.user_name().to_string())
            .collect();

        let next_marker = if output.is_truncated() {
            let marker = output.marker().ok_or_else(|| {
                AuditError::MalformedRecord("ListUsers truncated without a marker".to_string())
            })?;
            Some(marker.to_string())
        } else {
            None
        };

        Ok(UserPage {
            user_names,
            next_marker,
        })
    }

    async fn get_user(&self, user_name: &str) -> Result<UserRecord, AuditError> {
        debug!(user = %user_name, "Calling iam:GetUser");

        let output = self
            .client
            .get_user()
            .user_name(user_name)
            .send()
            .await
            .map_err(|e| classify_sdk_error("GetUser", e))?;

        let user = output.user().ok_or_else(|| {
            AuditError::MalformedRecord(format!("GetUser returned no user for {}", user_name))
        })?;

        user_record(user)
    }
}

/// Convert an IAM `User` into the audit's record type
pub fn user_record(user: &User) -> Result<UserRecord, AuditError> {
    let name = user.user_name();
    if name.is_empty() {
        return Err(AuditError::MalformedRecord(
            "User has an empty user name".to_string(),
        ));
    }

    let last_authenticated_at = user
        .password_last_used()
        .map(|ts| {
            DateTime::<Utc>::from_timestamp(ts.secs(), ts.subsec_nanos()).ok_or_else(|| {
                AuditError::MalformedRecord(format!(
                    "PasswordLastUsed out of range for {}: {} seconds",
                    name,
                    ts.secs()
                ))
            })
        })
        .transpose()?;

    Ok(UserRecord::new(name, last_authenticated_at))
}

fn classify_sdk_error<E, R>(operation: &str, err: SdkError<E, R>) -> AuditError
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
    R: std::fmt::Debug + 'static,
{
    let detail = format!("{} failed: {}", operation, DisplayErrorContext(&err));

    match &err {
        SdkError::TimeoutError(_) | SdkError::DispatchFailure(_) => {
            AuditError::ServiceUnavailable(detail)
        }
        _ => classify_error_code(err.as_service_error().and_then(|e| e.code()), detail),
    }
}

/// Map an AWS error code onto the audit error taxonomy
pub fn classify_error_code(code: Option<&str>, detail: String) -> AuditError {
    match code {
        Some(c) if ACCESS_DENIED_CODES.contains(&c) => AuditError::AccessDenied(detail),
        Some(c) if UNAVAILABLE_CODES.contains(&c) => AuditError::ServiceUnavailable(detail),
        Some("NoSuchEntity") => AuditError::NotFound(detail),
        _ => AuditError::Service(detail),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aws_sdk_iam::error::ErrorMetadata;
    use aws_sdk_iam::operation::get_user::{GetUserError, GetUserOutput};
    use aws_sdk_iam::operation::list_users::{ListUsersError, ListUsersOutput};
    use aws_sdk_iam::primitives::DateTime as SmithyDateTime;
    use aws_sdk_iam::types::error::NoSuchEntityException;
    use aws_smithy_mocks::{mock, mock_client};

    fn iam_user(name: &str, last_used: Option<SmithyDateTime>) -> User {
        User::builder()
            .path("/")
            .user_name(name)
            .user_id("AIDAEXAMPLE")
            .arn(format!("arn:aws:iam::123456789012:user/{}", name))
            .create_date(SmithyDateTime::from_secs(1_600_000_000))
            .set_password_last_used(last_used)
            .build()
            .unwrap()
    }

    #[test]
    fn test_user_without_password_last_used() {
        let record = user_record(&iam_user("bob", None)).unwrap();
        assert_eq!(record, UserRecord::never_authenticated("bob"));
    }

    #[test]
    fn test_user_with_password_last_used() {
        let record =
            user_record(&iam_user("alice", Some(SmithyDateTime::from_secs(1_704_067_200))))
                .unwrap();

        let expected = "2024-01-01T00:00:00Z".parse::<DateTime<Utc>>().unwrap();
        assert_eq!(record.last_authenticated_at, Some(expected));
    }

    #[test]
    fn test_empty_user_name_is_malformed() {
        let err = user_record(&iam_user("", None)).unwrap_err();
        assert!(matches!(err, AuditError::MalformedRecord(_)));
    }

    #[test]
    fn test_error_code_classification() {
        assert!(matches!(
            classify_error_code(Some("AccessDenied"), String::new()),
            AuditError::AccessDenied(_)
        ));
        assert!(matches!(
            classify_error_code(Some("Throttling"), String::new()),
            AuditError::ServiceUnavailable(_)
        ));
        assert!(matches!(
            classify_error_code(Some("NoSuchEntity"), String::new()),
            AuditError::NotFound(_)
        ));
        assert!(matches!(
            classify_error_code(None, String::new()),
            AuditError::Service(_)
        ));
    }

    #[tokio::test]
    async fn test_list_users_follows_marker() {
        let page = mock!(Client::list_users)
            .match_requests(|req| req.marker() == Some("m1"))
            .then_output(|| {
                ListUsersOutput::builder()
                    .users(iam_user("alice", None))
                    .users(iam_user("bob", None))
                    .is_truncated(true)
                    .marker("m2")
                    .build()
                    .unwrap()
            });
        let directory = IamDirectory::new(mock_client!(aws_sdk_iam, [&page]));

        let listing = directory.list_users(Some("m1".to_string())).await.unwrap();
        assert_eq!(listing.user_names, vec!["alice", "bob"]);
        assert_eq!(listing.next_marker.as_deref(), Some("m2"));
    }

    #[tokio::test]
    async fn test_list_users_last_page_has_no_marker() {
        let page = mock!(Client::list_users).then_output(|| {
            ListUsersOutput::builder()
                .users(iam_user("alice", None))
                .is_truncated(false)
                .marker("ignored")
                .build()
                .unwrap()
        });
        let directory = IamDirectory::new(mock_client!(aws_sdk_iam, [&page]));

        let listing = directory.list_users(None).await.unwrap();
        assert!(listing.next_marker.is_none());
    }

    #[tokio::test]
    async fn test_truncated_page_without_marker_is_malformed() {
        let page = mock!(Client::list_users).then_output(|| {
            ListUsersOutput::builder()
                .set_users(Some(vec![]))
                .is_truncated(true)
                .build()
                .unwrap()
        });
        let directory = IamDirectory::new(mock_client!(aws_sdk_iam, [&page]));

        let err = directory.list_users(None).await.unwrap_err();
        assert!(matches!(err, AuditError::MalformedRecord(_)));
    }

    #[tokio::test]
    async fn test_list_users_access_denied() {
        let denied = mock!(Client::list_users).then_error(|| {
            ListUsersError::generic(
                ErrorMetadata::builder()
                    .code("AccessDenied")
                    .message("not authorized to perform iam:ListUsers")
                    .build(),
            )
        });
        let directory = IamDirectory::new(mock_client!(aws_sdk_iam, [&denied]));

        let err = directory.list_users(None).await.unwrap_err();
        assert!(matches!(err, AuditError::AccessDenied(_)));
        assert!(err.to_string().contains("ListUsers failed"));
    }

    #[tokio::test]
    async fn test_get_user_maps_password_last_used() {
        let detail = mock!(Client::get_user)
            .match_requests(|req| req.user_name() == Some("alice"))
            .then_output(|| {
                GetUserOutput::builder()
                    .user(iam_user("alice", Some(SmithyDateTime::from_secs(1_704_067_200))))
                    .build()
            });
        let directory = IamDirectory::new(mock_client!(aws_sdk_iam, [&detail]));

        let record = directory.get_user("alice").await.unwrap();
        assert_eq!(record.name, "alice");
        assert!(record.last_authenticated_at.is_some());
    }

    #[tokio::test]
    async fn test_get_user_no_such_entity() {
        let missing = mock!(Client::get_user).then_error(|| {
            GetUserError::NoSuchEntityException(
                NoSuchEntityException::builder()
                    .message("The user with name ghost cannot be found.")
                    .meta(ErrorMetadata::builder().code("NoSuchEntity").build())
                    .build(),
            )
        });
        let directory = IamDirectory::new(mock_client!(aws_sdk_iam, [&missing]));

        let err = directory.get_user("ghost").await.unwrap_err();
        assert!(matches!(err, AuditError::NotFound(_)));
    }
}
