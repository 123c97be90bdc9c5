//! # Provider Modules
//!
//! Remote control-plane APIs the adapters reconcile against.
//!
//! Each remote service implements one trait:
//! - `ScalingApi` for scheduled scaling actions
//! - `CorsPolicyApi` for container CORS policies
//!
//! Implementations classify every failure into a
//! [`RemoteErrorKind`](crate::error::RemoteErrorKind) before returning it, so
//! adapters never look at service-specific error codes.

use crate::error::RemoteError;
use crate::identifier::ServiceNamespace;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Capacity bounds applied when a scheduled action fires
///
/// Shared by requests, remote records and declared configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScalableTargetAction {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_capacity: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_capacity: Option<i64>,
}

/// Create-or-replace request for a scheduled action
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PutScheduledActionRequest {
    pub name: String,
    pub service_namespace: ServiceNamespace,
    pub resource_id: String,
    pub scalable_dimension: Option<String>,
    pub schedule: Option<String>,
    pub scalable_target_action: Option<ScalableTargetAction>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
}

/// A scheduled action as the remote service reports it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduledActionRecord {
    pub name: String,
    pub arn: String,
    pub service_namespace: ServiceNamespace,
    pub resource_id: String,
    pub scalable_dimension: Option<String>,
    pub schedule: Option<String>,
    pub scalable_target_action: Option<ScalableTargetAction>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
}

/// Delete request for a scheduled action
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteScheduledActionRequest {
    pub name: String,
    pub service_namespace: ServiceNamespace,
    pub resource_id: String,
    pub scalable_dimension: Option<String>,
}

/// One CORS rule on the wire
///
/// Empty vectors mean the field is absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WireCorsRule {
    pub allowed_headers: Vec<String>,
    pub allowed_methods: Vec<String>,
    pub allowed_origins: Vec<String>,
    pub expose_headers: Vec<String>,
    pub max_age_seconds: Option<i64>,
}

/// Scheduled scaling actions
#[async_trait]
pub trait ScalingApi: Send + Sync {
    /// Create or fully replace a scheduled action
    ///
    /// Fails with `ObjectNotFound` while the scalable target is not visible yet.
    async fn put_scheduled_action(&self, request: &PutScheduledActionRequest)
        -> Result<(), RemoteError>;

    /// List scheduled actions with the given names in a namespace
    async fn describe_scheduled_actions(
        &self,
        names: &[String],
        service_namespace: ServiceNamespace,
    ) -> Result<Vec<ScheduledActionRecord>, RemoteError>;

    /// Delete a scheduled action
    ///
    /// Fails with `ObjectNotFound` if it does not exist.
    async fn delete_scheduled_action(
        &self,
        request: &DeleteScheduledActionRequest,
    ) -> Result<(), RemoteError>;
}

/// CORS policies attached to a named container
#[async_trait]
pub trait CorsPolicyApi: Send + Sync {
    /// Replace the container's whole policy
    async fn put_cors_policy(
        &self,
        container_name: &str,
        rules: &[WireCorsRule],
    ) -> Result<(), RemoteError>;

    /// Fetch the container's policy
    ///
    /// Fails with `ContainerNotFound` or `CorsPolicyNotFound`.
    async fn get_cors_policy(&self, container_name: &str) -> Result<Vec<WireCorsRule>, RemoteError>;

    /// Remove the container's policy
    ///
    /// Fails with `ContainerNotFound` or `CorsPolicyNotFound`.
    async fn delete_cors_policy(&self, container_name: &str) -> Result<(), RemoteError>;
}

// In-memory stand-in for tests and local runs
pub mod memory;

#[cfg(feature = "aws")]
pub mod aws;
