//! # Identifier Codec
//!
//! Scheduled actions are addressed externally by a composite identifier:
//!
//! ```text
//! <name>-<service-namespace>-<resource-id>
//! ```
//!
//! Parts are joined without escaping, so any part may contain the delimiter
//! (`early-scale`, `custom-resource`, `service/cluster-1/web`). Decoding
//! anchors on the service namespace, which is one of a fixed set of values:
//! the name ends at the first delimiter that is followed by
//! `<service-namespace>-`. A name that itself contains such a sequence
//! (`a-ecs-b`) cannot be told apart and decodes to a shorter name.
//!
//! CORS policies need no codec: their identifier is the container name.

use crate::constants::ID_DELIMITER;
use crate::error::ReconcileError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Service namespaces accepted by the scaling API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ServiceNamespace {
    Appstream,
    Cassandra,
    Comprehend,
    CustomResource,
    Dynamodb,
    Ec2,
    Ecs,
    Elasticache,
    Elasticmapreduce,
    Kafka,
    Lambda,
    Neptune,
    Rds,
    Sagemaker,
    Workspaces,
}

impl ServiceNamespace {
    pub const ALL: [ServiceNamespace; 15] = [
        ServiceNamespace::Appstream,
        ServiceNamespace::Cassandra,
        ServiceNamespace::Comprehend,
        ServiceNamespace::CustomResource,
        ServiceNamespace::Dynamodb,
        ServiceNamespace::Ec2,
        ServiceNamespace::Ecs,
        ServiceNamespace::Elasticache,
        ServiceNamespace::Elasticmapreduce,
        ServiceNamespace::Kafka,
        ServiceNamespace::Lambda,
        ServiceNamespace::Neptune,
        ServiceNamespace::Rds,
        ServiceNamespace::Sagemaker,
        ServiceNamespace::Workspaces,
    ];

    /// Wire value of the namespace
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ServiceNamespace::Appstream => "appstream",
            ServiceNamespace::Cassandra => "cassandra",
            ServiceNamespace::Comprehend => "comprehend",
            ServiceNamespace::CustomResource => "custom-resource",
            ServiceNamespace::Dynamodb => "dynamodb",
            ServiceNamespace::Ec2 => "ec2",
            ServiceNamespace::Ecs => "ecs",
            ServiceNamespace::Elasticache => "elasticache",
            ServiceNamespace::Elasticmapreduce => "elasticmapreduce",
            ServiceNamespace::Kafka => "kafka",
            ServiceNamespace::Lambda => "lambda",
            ServiceNamespace::Neptune => "neptune",
            ServiceNamespace::Rds => "rds",
            ServiceNamespace::Sagemaker => "sagemaker",
            ServiceNamespace::Workspaces => "workspaces",
        }
    }
}

impl fmt::Display for ServiceNamespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a string is not a known service namespace
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown service namespace {0:?}")]
pub struct UnknownServiceNamespace(pub String);

impl FromStr for ServiceNamespace {
    type Err = UnknownServiceNamespace;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ServiceNamespace::ALL
            .into_iter()
            .find(|ns| ns.as_str() == s)
            .ok_or_else(|| UnknownServiceNamespace(s.to_string()))
    }
}

/// The three key fields of a scheduled action
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ScheduledActionId {
    pub name: String,
    pub service_namespace: ServiceNamespace,
    pub resource_id: String,
}

impl ScheduledActionId {
    pub fn new(
        name: impl Into<String>,
        service_namespace: ServiceNamespace,
        resource_id: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            service_namespace,
            resource_id: resource_id.into(),
        }
    }

    /// Join the parts in order with the delimiter, without escaping
    #[must_use]
    pub fn encode(&self) -> String {
        format!(
            "{}{ID_DELIMITER}{}{ID_DELIMITER}{}",
            self.name, self.service_namespace, self.resource_id
        )
    }

    /// Split an identifier produced by [`encode`](Self::encode)
    ///
    /// # Errors
    ///
    /// Returns [`ReconcileError::MalformedIdentifier`] when the string does not
    /// yield a non-empty name, a known service namespace and a non-empty
    /// resource id.
    pub fn decode(id: &str) -> Result<Self, ReconcileError> {
        id.match_indices(ID_DELIMITER)
            .filter(|(at, _)| *at > 0)
            .find_map(|(at, _)| {
                let (name, rest) = (&id[..at], &id[at + ID_DELIMITER.len_utf8()..]);
                ServiceNamespace::ALL.into_iter().find_map(|ns| {
                    rest.strip_prefix(ns.as_str())
                        .and_then(|r| r.strip_prefix(ID_DELIMITER))
                        .filter(|resource_id| !resource_id.is_empty())
                        .map(|resource_id| Self::new(name, ns, resource_id))
                })
            })
            .ok_or_else(|| ReconcileError::MalformedIdentifier(id.to_string()))
    }
}

impl fmt::Display for ScheduledActionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

impl FromStr for ScheduledActionId {
    type Err = ReconcileError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::decode(s)
    }
}
