//! # Scheduled Action Adapter Tests
//!
//! Exercises put/read/delete against the in-memory remote:
//! - put retry while the scalable target is not visible yet
//! - read absence and result cardinality
//! - delete of an already removed action
//! - malformed identifiers and times

mod common;

use common::{remote, scheduled_action};
use scaling_reconciler::error::{ReconcileError, RemoteError, RemoteErrorKind};
use scaling_reconciler::identifier::ServiceNamespace;
use scaling_reconciler::metrics;
use scaling_reconciler::provider::memory::{InMemoryRemote, Operation};
use async_trait::async_trait;
use scaling_reconciler::provider::{
    DeleteScheduledActionRequest, PutScheduledActionRequest, ScalingApi, ScheduledActionRecord,
};
use scaling_reconciler::resource::{ResourceAdapter, ScheduledActionAdapter, ScheduledActionConfig};
use scaling_reconciler::retry::RetryPolicy;
use std::sync::Arc;
use std::time::Duration;

fn adapter(remote: &Arc<InMemoryRemote>) -> ScheduledActionAdapter {
    ScheduledActionAdapter::new(Arc::clone(remote) as _, RetryPolicy::default())
}

fn record(name: &str, resource_id: &str) -> ScheduledActionRecord {
    ScheduledActionRecord {
        name: name.to_string(),
        arn: format!("arn:aws:autoscaling:us-east-1:123456789012:scheduledAction:{name}"),
        service_namespace: ServiceNamespace::Ecs,
        resource_id: resource_id.to_string(),
        scalable_dimension: Some("ecs:service:DesiredCount".to_string()),
        schedule: Some("rate(1 hour)".to_string()),
        scalable_target_action: None,
        start_time: None,
        end_time: None,
    }
}

/// Remote that ignores the requested names and returns fixed records
struct FixedDescribe(Vec<ScheduledActionRecord>);

#[async_trait]
impl ScalingApi for FixedDescribe {
    async fn put_scheduled_action(
        &self,
        _request: &PutScheduledActionRequest,
    ) -> Result<(), RemoteError> {
        Ok(())
    }

    async fn describe_scheduled_actions(
        &self,
        _names: &[String],
        _service_namespace: ServiceNamespace,
    ) -> Result<Vec<ScheduledActionRecord>, RemoteError> {
        Ok(self.0.clone())
    }

    async fn delete_scheduled_action(
        &self,
        _request: &DeleteScheduledActionRequest,
    ) -> Result<(), RemoteError> {
        Ok(())
    }
}

#[tokio::test(start_paused = true)]
async fn test_put_then_read_round_trip() {
    let remote = remote();
    let adapter = adapter(&remote);
    let config = ScheduledActionConfig {
        schedule: Some("at(2020-01-01T00:00:00)".to_string()),
        scalable_dimension: None,
        scalable_target_action: None,
        ..ScheduledActionConfig::new("a", ServiceNamespace::Ecs, "service/x")
    };

    let id = adapter.put(&config).await.unwrap();
    assert_eq!(id, "a-ecs-service/x");

    let read = adapter.read(&id).await.unwrap().expect("action exists");
    assert_eq!(read.declared(), config);
    assert!(read.arn.is_some());
}

#[tokio::test(start_paused = true)]
async fn test_put_with_times_reads_back_identical_text() {
    let remote = remote();
    let adapter = adapter(&remote);
    let config = ScheduledActionConfig {
        start_time: Some("2030-01-01T08:00:00Z".to_string()),
        end_time: Some("2030-12-31T20:00:00Z".to_string()),
        ..scheduled_action("nightly", "service/prod/web")
    };

    let id = adapter.put(&config).await.unwrap();
    let read = adapter.read(&id).await.unwrap().unwrap();
    assert_eq!(read.start_time, config.start_time);
    assert_eq!(read.end_time, config.end_time);
    assert_eq!(adapter.change(&config, &read), None);
}

#[tokio::test(start_paused = true)]
async fn test_put_retries_until_target_is_visible() {
    let remote = remote();
    remote.fail_next(
        Operation::PutScheduledAction,
        RemoteError::object_not_found("No scalable target registered"),
        2,
    );

    let id = adapter(&remote)
        .put(&scheduled_action("morning", "service/prod/web"))
        .await
        .unwrap();

    assert_eq!(id, "morning-ecs-service/prod/web");
    assert_eq!(remote.calls(Operation::PutScheduledAction), 3);
    assert_eq!(remote.scheduled_actions().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_put_gives_up_after_five_minutes() {
    let remote = remote();
    remote.fail_always(
        Operation::PutScheduledAction,
        RemoteError::object_not_found("No scalable target registered"),
    );
    let started = tokio::time::Instant::now();

    let err = adapter(&remote)
        .put(&scheduled_action("morning", "service/prod/web"))
        .await
        .unwrap_err();

    match &err {
        ReconcileError::RetryTimeout { attempts, last, .. } => {
            assert_eq!(*attempts, remote.calls(Operation::PutScheduledAction));
            assert_eq!(last.kind(), RemoteErrorKind::ObjectNotFound);
        }
        other => panic!("expected RetryTimeout, got {other:?}"),
    }
    assert_eq!(err.remote().map(RemoteError::kind), Some(RemoteErrorKind::ObjectNotFound));
    assert!(started.elapsed() >= Duration::from_secs(300));
    assert!(remote.scheduled_actions().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_put_other_errors_are_not_retried() {
    let remote = remote();
    remote.fail_next(
        Operation::PutScheduledAction,
        RemoteError::other("ValidationException", "Invalid schedule expression"),
        1,
    );

    let err = adapter(&remote)
        .put(&scheduled_action("morning", "service/prod/web"))
        .await
        .unwrap_err();

    assert!(matches!(err, ReconcileError::Remote(ref e) if e.code() == "ValidationException"));
    assert_eq!(remote.calls(Operation::PutScheduledAction), 1);
}

#[tokio::test]
async fn test_put_rejects_malformed_time_before_calling_remote() {
    let remote = remote();
    let config = ScheduledActionConfig {
        start_time: Some("2030-01-01".to_string()),
        ..scheduled_action("morning", "service/prod/web")
    };

    let err = adapter(&remote).put(&config).await.unwrap_err();

    assert!(matches!(err, ReconcileError::TimeParse { field: "start_time", .. }));
    assert_eq!(remote.calls(Operation::PutScheduledAction), 0);
}

#[tokio::test]
async fn test_put_rejects_empty_key_fields_before_calling_remote() {
    let remote = remote();
    let adapter = adapter(&remote);

    for config in [
        scheduled_action("", "service/prod/web"),
        scheduled_action("morning", ""),
    ] {
        let err = adapter.put(&config).await.unwrap_err();
        assert!(matches!(err, ReconcileError::InvalidConfig(_)), "{err:?}");
    }
    assert_eq!(remote.calls(Operation::PutScheduledAction), 0);
}

#[tokio::test]
async fn test_read_missing_action_is_absent() {
    let remote = remote();
    let read = adapter(&remote)
        .read("morning-ecs-service/prod/web")
        .await
        .unwrap();
    assert!(read.is_none());
}

#[tokio::test]
async fn test_read_rejects_multiple_matches() {
    let remote = remote();
    remote.insert_scheduled_action(record("morning", "service/prod/web"));
    remote.insert_scheduled_action(record("morning", "service/prod/api"));

    let err = adapter(&remote)
        .read("morning-ecs-service/prod/web")
        .await
        .unwrap_err();

    match err {
        ReconcileError::UnexpectedResultCardinality { name, found } => {
            assert_eq!(name, "morning");
            assert_eq!(found.len(), 2);
        }
        other => panic!("expected UnexpectedResultCardinality, got {other:?}"),
    }
}

#[tokio::test]
async fn test_read_rejects_single_match_with_other_name() {
    let adapter = ScheduledActionAdapter::new(
        Arc::new(FixedDescribe(vec![record("evening", "service/prod/web")])),
        RetryPolicy::default(),
    );

    let err = adapter
        .read("morning-ecs-service/prod/web")
        .await
        .unwrap_err();

    match err {
        ReconcileError::UnexpectedResultCardinality { name, found } => {
            assert_eq!(name, "morning");
            assert_eq!(found, vec!["evening".to_string()]);
        }
        other => panic!("expected UnexpectedResultCardinality, got {other:?}"),
    }
}

#[tokio::test]
async fn test_read_rejects_malformed_identifier_without_remote_call() {
    let remote = remote();
    let err = adapter(&remote).read("only-one-part").await.unwrap_err();

    assert!(matches!(err, ReconcileError::MalformedIdentifier(ref id) if id == "only-one-part"));
    assert_eq!(remote.calls(Operation::DescribeScheduledActions), 0);
}

#[tokio::test]
async fn test_read_surfaces_other_remote_errors() {
    let remote = remote();
    remote.fail_next(
        Operation::DescribeScheduledActions,
        RemoteError::other("AccessDeniedException", "not authorized"),
        1,
    );

    metrics::register_metrics().unwrap();

    let err = adapter(&remote)
        .read("morning-ecs-service/prod/web")
        .await
        .unwrap_err();
    assert_eq!(err.remote().map(RemoteError::code), Some("AccessDeniedException"));

    let exposition = metrics::gather_metrics().unwrap();
    assert!(exposition.contains(
        r#"scaling_reconciler_remote_operation_errors_total{kind="scheduled_action",operation="read"}"#
    ));
}

#[tokio::test]
async fn test_delete_removes_action() {
    let remote = remote();
    let adapter = adapter(&remote);
    let config = scheduled_action("morning", "service/prod/web");
    let id = adapter.put(&config).await.unwrap();

    adapter.delete(&id, &config).await.unwrap();

    assert!(remote.scheduled_actions().is_empty());
    assert!(adapter.read(&id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_delete_already_removed_action_succeeds() {
    let remote = remote();
    let config = scheduled_action("morning", "service/prod/web");

    adapter(&remote)
        .delete("morning-ecs-service/prod/web", &config)
        .await
        .unwrap();

    assert_eq!(remote.calls(Operation::DeleteScheduledAction), 1);
}

#[tokio::test]
async fn test_delete_surfaces_other_remote_errors() {
    let remote = remote();
    remote.fail_next(
        Operation::DeleteScheduledAction,
        RemoteError::other("ConcurrentUpdateException", "try again"),
        1,
    );
    let config = scheduled_action("morning", "service/prod/web");

    let err = adapter(&remote)
        .delete("morning-ecs-service/prod/web", &config)
        .await
        .unwrap_err();
    assert!(matches!(err, ReconcileError::Remote(_)));
}

#[tokio::test]
async fn test_custom_resource_identifier_round_trip() {
    let remote = remote();
    let adapter = adapter(&remote);
    let config = ScheduledActionConfig {
        schedule: Some("rate(5 minutes)".to_string()),
        ..ScheduledActionConfig::new(
            "nightly",
            ServiceNamespace::CustomResource,
            "https://example.execute-api.us-east-1.amazonaws.com/prod/scalableTargetDimensions/1-23456789",
        )
    };

    let id = adapter.put(&config).await.unwrap();
    let read = adapter.read(&id).await.unwrap().unwrap();
    assert_eq!(read.resource_id, config.resource_id);
    assert_eq!(read.service_namespace, ServiceNamespace::CustomResource);
}
