//! # Scheduled Scaling Action
//!
//! Adapter for scheduled actions of the application auto-scaling service.
//!
//! The remote API has no update call: `put` creates or fully replaces an
//! action, so every declared field forces replacement. The identifier is the
//! `<name>-<service-namespace>-<resource-id>` composite built by
//! [`ScheduledActionId`].
//!
//! A put right after the scalable target was registered can fail with
//! `ObjectNotFound` until the target propagates; that case is retried under
//! the adapter's [`RetryPolicy`].

use crate::error::{ReconcileError, RemoteError, RemoteErrorKind};
use crate::identifier::{ScheduledActionId, ServiceNamespace};
use crate::observability::metrics;
use crate::provider::{
    DeleteScheduledActionRequest, PutScheduledActionRequest, ScalableTargetAction, ScalingApi,
    ScheduledActionRecord,
};
use crate::resource::{FieldSchema, FieldType, ResourceAdapter, Transition};
use crate::retry::RetryPolicy;
use crate::schedule_time;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, info_span, warn, Instrument};

pub const KIND: &str = "scheduled_action";

const SCALABLE_TARGET_ACTION_SCHEMA: &[FieldSchema] = &[
    FieldSchema::optional("max_capacity", FieldType::Int).force_new(),
    FieldSchema::optional("min_capacity", FieldType::Int).force_new(),
];

const SCHEMA: &[FieldSchema] = &[
    FieldSchema::required("name", FieldType::String).force_new(),
    FieldSchema::required("service_namespace", FieldType::String).force_new(),
    FieldSchema::required("resource_id", FieldType::String).force_new(),
    FieldSchema::optional("scalable_dimension", FieldType::String).force_new(),
    FieldSchema::optional("schedule", FieldType::String).force_new(),
    FieldSchema::optional("start_time", FieldType::String).force_new(),
    FieldSchema::optional("end_time", FieldType::String).force_new(),
    FieldSchema::optional("scalable_target_action", FieldType::Block)
        .force_new()
        .max_items(1)
        .elem(SCALABLE_TARGET_ACTION_SCHEMA),
    FieldSchema::computed("arn", FieldType::String),
];

/// Declared scheduled action
///
/// `start_time` and `end_time` use the `YYYY-MM-DDThh:mm:ssZ` layout.
/// `arn` is filled in by reads and ignored when comparing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduledActionConfig {
    pub name: String,
    pub service_namespace: ServiceNamespace,
    pub resource_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scalable_dimension: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schedule: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scalable_target_action: Option<ScalableTargetAction>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arn: Option<String>,
}

impl ScheduledActionConfig {
    /// Minimal configuration with only the key fields set
    pub fn new(
        name: impl Into<String>,
        service_namespace: ServiceNamespace,
        resource_id: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            service_namespace,
            resource_id: resource_id.into(),
            scalable_dimension: None,
            schedule: None,
            start_time: None,
            end_time: None,
            scalable_target_action: None,
            arn: None,
        }
    }

    #[must_use]
    pub fn id(&self) -> ScheduledActionId {
        ScheduledActionId::new(&self.name, self.service_namespace, &self.resource_id)
    }

    /// Copy without computed fields
    #[must_use]
    pub fn declared(&self) -> Self {
        Self {
            arn: None,
            ..self.clone()
        }
    }

    /// Check the key fields before anything is sent
    ///
    /// An empty name or resource id would produce an identifier that cannot
    /// be decoded again.
    ///
    /// # Errors
    ///
    /// Returns [`ReconcileError::InvalidConfig`] if `name` or `resource_id`
    /// is empty.
    pub fn validate(&self) -> Result<(), ReconcileError> {
        if self.name.is_empty() {
            return Err(ReconcileError::InvalidConfig(
                "scheduled action name must not be empty".to_string(),
            ));
        }
        if self.resource_id.is_empty() {
            return Err(ReconcileError::InvalidConfig(format!(
                "resource_id for scheduled action {} must not be empty",
                self.name
            )));
        }
        Ok(())
    }
}

/// Build the put request, validating the time fields
///
/// # Errors
///
/// Returns [`ReconcileError::TimeParse`] for a malformed start or end time.
pub fn build_put_request(
    config: &ScheduledActionConfig,
) -> Result<PutScheduledActionRequest, ReconcileError> {
    Ok(PutScheduledActionRequest {
        name: config.name.clone(),
        service_namespace: config.service_namespace,
        resource_id: config.resource_id.clone(),
        scalable_dimension: config.scalable_dimension.clone(),
        schedule: config.schedule.clone(),
        scalable_target_action: config.scalable_target_action,
        start_time: schedule_time::parse_opt("start_time", config.start_time.as_deref())?,
        end_time: schedule_time::parse_opt("end_time", config.end_time.as_deref())?,
    })
}

/// Map a remote record back to configuration
#[must_use]
pub fn flatten_record(record: &ScheduledActionRecord) -> ScheduledActionConfig {
    ScheduledActionConfig {
        name: record.name.clone(),
        service_namespace: record.service_namespace,
        resource_id: record.resource_id.clone(),
        scalable_dimension: record.scalable_dimension.clone(),
        schedule: record.schedule.clone(),
        start_time: record.start_time.as_ref().map(schedule_time::format),
        end_time: record.end_time.as_ref().map(schedule_time::format),
        scalable_target_action: record.scalable_target_action,
        arn: Some(record.arn.clone()),
    }
}

/// Puts are retried only while the scalable target is not visible yet
#[must_use]
pub fn is_retryable_put_error(err: &RemoteError) -> bool {
    err.kind() == RemoteErrorKind::ObjectNotFound
}

/// Scheduled action adapter over a [`ScalingApi`]
pub struct ScheduledActionAdapter {
    client: Arc<dyn ScalingApi>,
    retry: RetryPolicy,
}

impl std::fmt::Debug for ScheduledActionAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScheduledActionAdapter")
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

impl ScheduledActionAdapter {
    pub fn new(client: Arc<dyn ScalingApi>, retry: RetryPolicy) -> Self {
        Self { client, retry }
    }
}

#[async_trait]
impl ResourceAdapter for ScheduledActionAdapter {
    type Config = ScheduledActionConfig;

    fn kind(&self) -> &'static str {
        KIND
    }

    fn schema(&self) -> &'static [FieldSchema] {
        SCHEMA
    }

    fn change(&self, desired: &Self::Config, applied: &Self::Config) -> Option<Transition> {
        // Every declared field is immutable remotely
        if desired.declared() == applied.declared() {
            None
        } else {
            Some(Transition::Replace)
        }
    }

    async fn put(&self, config: &Self::Config) -> Result<String, ReconcileError> {
        config.validate()?;

        let span = info_span!(
            "scheduled_action.put",
            action.name = %config.name,
            service_namespace = %config.service_namespace,
            resource_id = %config.resource_id
        );
        let start = Instant::now();

        async move {
            let request = build_put_request(config)?;
            let client = &self.client;
            let request = &request;

            info!(
                action_name = %config.name,
                service_namespace = %config.service_namespace,
                "Putting scheduled action {}",
                config.name
            );

            match self
                .retry
                .run(KIND, is_retryable_put_error, move || {
                    client.put_scheduled_action(request)
                })
                .await
            {
                Ok(()) => {
                    metrics::record_remote_operation(KIND, "put", start.elapsed().as_secs_f64());
                    Ok(config.id().encode())
                }
                Err(e) => {
                    metrics::increment_remote_operation_errors(KIND, "put");
                    warn!(
                        action_name = %config.name,
                        error = %e,
                        "Failed to put scheduled action {}",
                        config.name
                    );
                    Err(e)
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn read(&self, id: &str) -> Result<Option<Self::Config>, ReconcileError> {
        let key = ScheduledActionId::decode(id)?;
        let span = info_span!(
            "scheduled_action.read",
            action.name = %key.name,
            service_namespace = %key.service_namespace
        );
        let start = Instant::now();

        async move {
            let records = self
                .client
                .describe_scheduled_actions(std::slice::from_ref(&key.name), key.service_namespace)
                .await
                .inspect_err(|_| metrics::increment_remote_operation_errors(KIND, "read"))?;
            metrics::record_remote_operation(KIND, "read", start.elapsed().as_secs_f64());

            match records.as_slice() {
                [] => {
                    warn!(
                        action_id = id,
                        "Scheduled action {} not found, removing from state", id
                    );
                    metrics::increment_absent_resources(KIND, "read");
                    Ok(None)
                }
                [record] if record.name == key.name => {
                    debug!(action_id = id, arn = %record.arn, "Read scheduled action");
                    Ok(Some(flatten_record(record)))
                }
                _ => Err(ReconcileError::UnexpectedResultCardinality {
                    name: key.name.clone(),
                    found: records.iter().map(|r| r.name.clone()).collect(),
                }),
            }
        }
        .instrument(span)
        .await
    }

    async fn delete(&self, id: &str, config: &Self::Config) -> Result<(), ReconcileError> {
        let key = ScheduledActionId::decode(id)?;
        let span = info_span!(
            "scheduled_action.delete",
            action.name = %key.name,
            service_namespace = %key.service_namespace
        );
        let start = Instant::now();

        async move {
            let request = DeleteScheduledActionRequest {
                name: key.name,
                service_namespace: key.service_namespace,
                resource_id: key.resource_id,
                scalable_dimension: config.scalable_dimension.clone(),
            };

            match self.client.delete_scheduled_action(&request).await {
                Ok(()) => {
                    metrics::record_remote_operation(KIND, "delete", start.elapsed().as_secs_f64());
                    info!(action_id = id, "Deleted scheduled action {}", id);
                    Ok(())
                }
                Err(e) if e.kind() == RemoteErrorKind::ObjectNotFound => {
                    warn!(
                        action_id = id,
                        "Scheduled action {} already gone, removing from state", id
                    );
                    metrics::increment_absent_resources(KIND, "delete");
                    Ok(())
                }
                Err(e) => {
                    metrics::increment_remote_operation_errors(KIND, "delete");
                    Err(e.into())
                }
            }
        }
        .instrument(span)
        .await
    }
}
