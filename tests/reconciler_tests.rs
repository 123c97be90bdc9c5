//! # Reconciler Tests
//!
//! Transition planning and execution for a single resource:
//! - create, no-op, update in place, replace and delete
//! - refresh after out-of-band removal
//! - import of existing resources
//! - state left consistent when a step fails

mod common;

use common::{cors_policy, remote, scheduled_action};
use scaling_reconciler::error::RemoteError;
use scaling_reconciler::provider::memory::{InMemoryRemote, Operation};
use scaling_reconciler::provider::ScalingApi;
use scaling_reconciler::provider::DeleteScheduledActionRequest;
use scaling_reconciler::reconciler::{Reconciler, ResourceState};
use scaling_reconciler::resource::{
    CorsPolicyAdapter, ScheduledActionAdapter, ScheduledActionConfig, Transition,
};
use scaling_reconciler::retry::RetryPolicy;
use std::sync::Arc;

fn actions(remote: &Arc<InMemoryRemote>) -> ScheduledActionAdapter {
    ScheduledActionAdapter::new(Arc::clone(remote) as _, RetryPolicy::default())
}

fn policies(remote: &Arc<InMemoryRemote>) -> CorsPolicyAdapter {
    CorsPolicyAdapter::new(Arc::clone(remote) as _)
}

#[tokio::test]
async fn test_create_then_converged() {
    let remote = remote();
    let adapter = actions(&remote);
    let desired = scheduled_action("morning", "service/prod/web");
    let mut reconciler = Reconciler::new(&adapter, None);

    assert_eq!(reconciler.plan(Some(&desired)), Some(Transition::Create));
    assert_eq!(
        reconciler.apply(Some(&desired)).await.unwrap(),
        Some(Transition::Create)
    );

    let state = reconciler.state().expect("state recorded");
    assert_eq!(state.id, "morning-ecs-service/prod/web");
    assert!(state.config.arn.is_some());

    // Computed fields in state do not cause another change
    assert_eq!(reconciler.plan(Some(&desired)), None);
    assert_eq!(reconciler.apply(Some(&desired)).await.unwrap(), None);
    assert_eq!(remote.calls(Operation::PutScheduledAction), 1);
}

#[tokio::test]
async fn test_scheduled_action_change_replaces() {
    let remote = remote();
    let adapter = actions(&remote);
    let original = scheduled_action("morning", "service/prod/web");
    let mut reconciler = Reconciler::new(&adapter, None);
    reconciler.apply(Some(&original)).await.unwrap();

    let changed = ScheduledActionConfig {
        schedule: Some("cron(0 9 * * ? *)".to_string()),
        ..original
    };
    assert_eq!(
        reconciler.apply(Some(&changed)).await.unwrap(),
        Some(Transition::Replace)
    );

    assert_eq!(remote.calls(Operation::DeleteScheduledAction), 1);
    assert_eq!(remote.calls(Operation::PutScheduledAction), 2);
    let stored = remote.scheduled_actions();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].schedule.as_deref(), Some("cron(0 9 * * ? *)"));
}

#[tokio::test]
async fn test_renamed_action_removes_old_one() {
    let remote = remote();
    let adapter = actions(&remote);
    let mut reconciler = Reconciler::new(&adapter, None);
    reconciler
        .apply(Some(&scheduled_action("morning", "service/prod/web")))
        .await
        .unwrap();

    reconciler
        .apply(Some(&scheduled_action("early-morning", "service/prod/web")))
        .await
        .unwrap();

    let names: Vec<String> = remote.scheduled_actions().into_iter().map(|r| r.name).collect();
    assert_eq!(names, vec!["early-morning".to_string()]);
    assert_eq!(
        reconciler.state().map(|s| s.id.as_str()),
        Some("early-morning-ecs-service/prod/web")
    );
}

#[tokio::test]
async fn test_cors_policy_change_updates_in_place() {
    let remote = remote();
    remote.create_container("media");
    let adapter = policies(&remote);
    let mut reconciler = Reconciler::new(&adapter, None);
    reconciler
        .apply(Some(&cors_policy("media", &["https://a.example"])))
        .await
        .unwrap();

    let changed = cors_policy("media", &["https://a.example", "https://b.example"]);
    assert_eq!(
        reconciler.apply(Some(&changed)).await.unwrap(),
        Some(Transition::Update)
    );

    assert_eq!(remote.calls(Operation::DeleteCorsPolicy), 0);
    assert_eq!(remote.calls(Operation::PutCorsPolicy), 2);
    assert_eq!(reconciler.state().map(|s| &s.config), Some(&changed));
}

#[tokio::test]
async fn test_cors_container_change_replaces() {
    let remote = remote();
    remote.create_container("media");
    remote.create_container("archive");
    let adapter = policies(&remote);
    let mut reconciler = Reconciler::new(&adapter, None);
    reconciler
        .apply(Some(&cors_policy("media", &["*"])))
        .await
        .unwrap();

    assert_eq!(
        reconciler
            .apply(Some(&cors_policy("archive", &["*"])))
            .await
            .unwrap(),
        Some(Transition::Replace)
    );

    assert!(remote.cors_policy("media").is_none());
    assert!(remote.cors_policy("archive").is_some());
}

#[tokio::test]
async fn test_delete_clears_state() {
    let remote = remote();
    let adapter = actions(&remote);
    let mut reconciler = Reconciler::new(&adapter, None);
    reconciler
        .apply(Some(&scheduled_action("morning", "service/prod/web")))
        .await
        .unwrap();

    assert_eq!(reconciler.apply(None).await.unwrap(), Some(Transition::Delete));
    assert!(reconciler.state().is_none());
    assert!(remote.scheduled_actions().is_empty());

    assert_eq!(reconciler.apply(None).await.unwrap(), None);
}

#[tokio::test]
async fn test_failed_delete_keeps_state() {
    let remote = remote();
    let adapter = actions(&remote);
    let mut reconciler = Reconciler::new(&adapter, None);
    reconciler
        .apply(Some(&scheduled_action("morning", "service/prod/web")))
        .await
        .unwrap();
    let before = reconciler.state().cloned();

    remote.fail_next(
        Operation::DeleteScheduledAction,
        RemoteError::other("ConcurrentUpdateException", "busy"),
        1,
    );
    assert!(reconciler.apply(None).await.is_err());
    assert_eq!(reconciler.state().cloned(), before);
}

#[tokio::test]
async fn test_failed_read_after_put_keeps_identifier() {
    let remote = remote();
    let adapter = actions(&remote);
    let desired = scheduled_action("morning", "service/prod/web");
    let mut reconciler = Reconciler::new(&adapter, None);

    remote.fail_next(
        Operation::DescribeScheduledActions,
        RemoteError::other("ThrottlingException", "slow down"),
        1,
    );
    assert!(reconciler.apply(Some(&desired)).await.is_err());

    let state = reconciler.state().expect("identifier kept");
    assert_eq!(state.id, "morning-ecs-service/prod/web");
    assert_eq!(state.config, desired);
}

#[tokio::test]
async fn test_refresh_drops_resource_removed_out_of_band() {
    let remote = remote();
    let adapter = actions(&remote);
    let desired = scheduled_action("morning", "service/prod/web");
    let mut reconciler = Reconciler::new(&adapter, None);
    reconciler.apply(Some(&desired)).await.unwrap();

    remote
        .delete_scheduled_action(&DeleteScheduledActionRequest {
            name: "morning".to_string(),
            service_namespace: desired.service_namespace,
            resource_id: desired.resource_id.clone(),
            scalable_dimension: None,
        })
        .await
        .unwrap();

    assert!(!reconciler.refresh().await.unwrap());
    assert!(reconciler.state().is_none());
    assert_eq!(reconciler.plan(Some(&desired)), Some(Transition::Create));
}

#[tokio::test]
async fn test_import_existing_and_missing() {
    let remote = remote();
    remote.create_container("media");
    let adapter = policies(&remote);
    Reconciler::new(&adapter, None)
        .apply(Some(&cors_policy("media", &["*"])))
        .await
        .unwrap();

    let mut reconciler = Reconciler::new(&adapter, None);
    assert!(reconciler.import("media").await.unwrap());
    assert_eq!(
        reconciler.state(),
        Some(&ResourceState {
            id: "media".to_string(),
            config: cors_policy("media", &["*"]),
        })
    );
    assert_eq!(reconciler.plan(Some(&cors_policy("media", &["*"]))), None);

    let mut missing = Reconciler::new(&adapter, None);
    assert!(!missing.import("archive").await.unwrap());
    assert!(missing.state().is_none());
}
