//! Lambda Entry Point
//!
//! Each scheduled invocation runs one audit. The trigger payload is ignored;
//! a fatal audit error is returned to the runtime as an invocation failure.

use lambda_runtime::{Error, LambdaEvent};
use serde_json::Value;
use tracing::{error, info, info_span, Instrument};

use crate::auditor::InactiveUserAuditor;
use crate::directory::IdentityDirectory;
use crate::sink::FindingSink;
use crate::types::InvocationResult;

/// Handle one scheduler invocation
pub async fn function_handler<D, S>(
    event: LambdaEvent<Value>,
    auditor: &InactiveUserAuditor<D, S>,
) -> Result<InvocationResult, Error>
where
    D: IdentityDirectory,
    S: FindingSink,
{
    let (_payload, context) = event.into_parts();
    let span = info_span!("invocation", request_id = %context.request_id);

    async move {
        match auditor.run().await {
            Ok(result) => {
                info!(
                    findings = result.summary.findings,
                    skipped = result.summary.skipped,
                    "Invocation complete"
                );
                Ok(result)
            }
            Err(e) => {
                error!(error = %e, "Invocation failed");
                Err(e.into())
            }
        }
    }
    .instrument(span)
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::{Fault, InMemoryDirectory};
    use crate::sink::CollectingSink;
    use crate::types::{UserRecord, COMPLETION_MESSAGE};
    use lambda_runtime::Context;
    use serde_json::json;

    fn scheduled_event() -> LambdaEvent<Value> {
        let payload = json!({
            "source": "aws.events",
            "detail-type": "Scheduled Event",
            "detail": {}
        });
        LambdaEvent::new(payload, Context::default())
    }

    #[tokio::test]
    async fn test_handler_returns_completion() {
        let sink = CollectingSink::new();
        let auditor = InactiveUserAuditor::new(
            InMemoryDirectory::new(vec![UserRecord::never_authenticated("bob")]),
            &sink,
        );

        let result = function_handler(scheduled_event(), &auditor).await.unwrap();

        assert_eq!(result.status_code, 200);
        assert_eq!(result.body, COMPLETION_MESSAGE);
        assert_eq!(sink.user_names(), vec!["bob"]);
    }

    #[tokio::test]
    async fn test_handler_propagates_fatal_error() {
        let sink = CollectingSink::new();
        let auditor = InactiveUserAuditor::new(
            InMemoryDirectory::new(vec![UserRecord::never_authenticated("bob")])
                .with_list_fault(Fault::ServiceUnavailable),
            &sink,
        );

        let err = function_handler(scheduled_event(), &auditor)
            .await
            .unwrap_err();

        assert!(err.to_string().contains("unavailable"));
        assert!(sink.findings().is_empty());
    }
}
