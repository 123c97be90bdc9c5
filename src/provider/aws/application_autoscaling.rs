//! # Application Auto Scaling
//!
//! Implements [`ScalingApi`] over `aws-sdk-applicationautoscaling`.

use super::classify_sdk_error;
use crate::error::{RemoteError, RemoteErrorKind};
use crate::identifier::ServiceNamespace;
use crate::provider::{
    DeleteScheduledActionRequest, PutScheduledActionRequest, ScalableTargetAction, ScalingApi,
    ScheduledActionRecord,
};
use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_applicationautoscaling::primitives::DateTime as AwsDateTime;
use aws_sdk_applicationautoscaling::types::{
    ScalableDimension, ScalableTargetAction as AwsScalableTargetAction, ScheduledAction,
    ServiceNamespace as AwsServiceNamespace,
};
use aws_sdk_applicationautoscaling::Client;
use chrono::{DateTime, Utc};
use tracing::debug;

const NOT_FOUND_CODES: &[(&str, RemoteErrorKind)] =
    &[("ObjectNotFoundException", RemoteErrorKind::ObjectNotFound)];

/// Application Auto Scaling client
pub struct AwsApplicationAutoScaling {
    client: Client,
}

impl std::fmt::Debug for AwsApplicationAutoScaling {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AwsApplicationAutoScaling")
            .finish_non_exhaustive()
    }
}

impl AwsApplicationAutoScaling {
    #[must_use]
    pub fn new(sdk_config: &SdkConfig) -> Self {
        Self {
            client: Client::new(sdk_config),
        }
    }
}

fn to_aws_namespace(namespace: ServiceNamespace) -> AwsServiceNamespace {
    AwsServiceNamespace::from(namespace.as_str())
}

fn to_aws_time(time: Option<DateTime<Utc>>) -> Option<AwsDateTime> {
    time.map(|t| AwsDateTime::from_secs(t.timestamp()))
}

fn from_aws_time(time: Option<&AwsDateTime>) -> Option<DateTime<Utc>> {
    time.and_then(|t| DateTime::from_timestamp(t.secs(), t.subsec_nanos()))
}

fn capacity_to_aws(field: &str, value: Option<i64>) -> Result<Option<i32>, RemoteError> {
    value
        .map(|v| {
            i32::try_from(v).map_err(|e| {
                RemoteError::other(
                    "ValidationException",
                    format!("{field} {v} is out of range: {e}"),
                )
            })
        })
        .transpose()
}

fn to_aws_target_action(
    action: &ScalableTargetAction,
) -> Result<AwsScalableTargetAction, RemoteError> {
    Ok(AwsScalableTargetAction::builder()
        .set_max_capacity(capacity_to_aws("max_capacity", action.max_capacity)?)
        .set_min_capacity(capacity_to_aws("min_capacity", action.min_capacity)?)
        .build())
}

fn to_record(action: &ScheduledAction) -> Result<ScheduledActionRecord, RemoteError> {
    let namespace_value = action.service_namespace().as_str();
    let service_namespace = namespace_value.parse::<ServiceNamespace>().map_err(|e| {
        RemoteError::other("UnknownServiceNamespace", e.to_string())
    })?;

    Ok(ScheduledActionRecord {
        name: action.scheduled_action_name().to_string(),
        arn: action.scheduled_action_arn().to_string(),
        service_namespace,
        resource_id: action.resource_id().to_string(),
        scalable_dimension: action
            .scalable_dimension()
            .map(|d| d.as_str().to_string()),
        schedule: Some(action.schedule().to_string()).filter(|s| !s.is_empty()),
        scalable_target_action: action.scalable_target_action().map(|a| {
            ScalableTargetAction {
                max_capacity: a.max_capacity().map(i64::from),
                min_capacity: a.min_capacity().map(i64::from),
            }
        }),
        start_time: from_aws_time(action.start_time()),
        end_time: from_aws_time(action.end_time()),
    })
}

#[async_trait]
impl ScalingApi for AwsApplicationAutoScaling {
    async fn put_scheduled_action(
        &self,
        request: &PutScheduledActionRequest,
    ) -> Result<(), RemoteError> {
        let target_action = request
            .scalable_target_action
            .as_ref()
            .map(to_aws_target_action)
            .transpose()?;

        self.client
            .put_scheduled_action()
            .scheduled_action_name(&request.name)
            .service_namespace(to_aws_namespace(request.service_namespace))
            .resource_id(&request.resource_id)
            .set_scalable_dimension(
                request
                    .scalable_dimension
                    .as_deref()
                    .map(ScalableDimension::from),
            )
            .set_schedule(request.schedule.clone())
            .set_scalable_target_action(target_action)
            .set_start_time(to_aws_time(request.start_time))
            .set_end_time(to_aws_time(request.end_time))
            .send()
            .await
            .map_err(|e| classify_sdk_error(&e, NOT_FOUND_CODES))?;

        debug!(action_name = %request.name, "PutScheduledAction succeeded");
        Ok(())
    }

    async fn describe_scheduled_actions(
        &self,
        names: &[String],
        service_namespace: ServiceNamespace,
    ) -> Result<Vec<ScheduledActionRecord>, RemoteError> {
        let output = self
            .client
            .describe_scheduled_actions()
            .set_scheduled_action_names(Some(names.to_vec()))
            .service_namespace(to_aws_namespace(service_namespace))
            .send()
            .await
            .map_err(|e| classify_sdk_error(&e, NOT_FOUND_CODES))?;

        output.scheduled_actions().iter().map(to_record).collect()
    }

    async fn delete_scheduled_action(
        &self,
        request: &DeleteScheduledActionRequest,
    ) -> Result<(), RemoteError> {
        self.client
            .delete_scheduled_action()
            .scheduled_action_name(&request.name)
            .service_namespace(to_aws_namespace(request.service_namespace))
            .resource_id(&request.resource_id)
            .set_scalable_dimension(
                request
                    .scalable_dimension
                    .as_deref()
                    .map(ScalableDimension::from),
            )
            .send()
            .await
            .map_err(|e| classify_sdk_error(&e, NOT_FOUND_CODES))?;

        debug!(action_name = %request.name, "DeleteScheduledAction succeeded");
        Ok(())
    }
}
