//! # Container CORS Policy
//!
//! Adapter for the CORS policy attached to a media container. The
//! identifier is the container name. A put replaces the whole rule set, so a
//! changed policy is applied in place; only a different container forces
//! replacement.

use crate::constants::MAX_CORS_RULES;
use crate::error::{ReconcileError, RemoteErrorKind};
use crate::observability::metrics;
use crate::provider::CorsPolicyApi;
use crate::resource::cors_transcoder::{
    expand_cors_policy, flatten_cors_policy, normalize_cors_policy, CorsRuleConfig,
};
use crate::resource::{FieldSchema, FieldType, ResourceAdapter, Transition};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, info_span, warn, Instrument};

pub const KIND: &str = "cors_policy";

const CORS_RULE_SCHEMA: &[FieldSchema] = &[
    FieldSchema::optional("allowed_headers", FieldType::StringSet),
    FieldSchema::optional("allowed_methods", FieldType::StringSet),
    FieldSchema::optional("allowed_origins", FieldType::StringSet),
    FieldSchema::optional("expose_headers", FieldType::StringSet),
    FieldSchema::optional("max_age_seconds", FieldType::Int),
];

const SCHEMA: &[FieldSchema] = &[
    FieldSchema::required("container_name", FieldType::String).force_new(),
    FieldSchema::required("cors_policy", FieldType::BlockSet)
        .max_items(MAX_CORS_RULES)
        .elem(CORS_RULE_SCHEMA),
];

/// Declared CORS policy of one container
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorsPolicyConfig {
    pub container_name: String,
    pub cors_policy: BTreeSet<CorsRuleConfig>,
}

impl CorsPolicyConfig {
    /// Reject policies the remote service would refuse
    ///
    /// # Errors
    ///
    /// Returns [`ReconcileError::InvalidConfig`] for an empty policy or one
    /// with more than [`MAX_CORS_RULES`] rules.
    pub fn validate(&self) -> Result<(), ReconcileError> {
        if self.container_name.is_empty() {
            return Err(ReconcileError::InvalidConfig(
                "container_name must not be empty".to_string(),
            ));
        }
        match self.cors_policy.len() {
            0 => Err(ReconcileError::InvalidConfig(format!(
                "cors_policy for container {} must contain at least 1 rule",
                self.container_name
            ))),
            n if n > MAX_CORS_RULES => Err(ReconcileError::InvalidConfig(format!(
                "cors_policy for container {} has {n} rules, at most {MAX_CORS_RULES} are allowed",
                self.container_name
            ))),
            _ => Ok(()),
        }
    }
}

/// Both "no such container" and "no policy" mean the policy is gone
#[must_use]
pub fn is_policy_absent(kind: RemoteErrorKind) -> bool {
    matches!(
        kind,
        RemoteErrorKind::ContainerNotFound | RemoteErrorKind::CorsPolicyNotFound
    )
}

/// CORS policy adapter over a [`CorsPolicyApi`]
pub struct CorsPolicyAdapter {
    client: Arc<dyn CorsPolicyApi>,
}

impl std::fmt::Debug for CorsPolicyAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CorsPolicyAdapter").finish_non_exhaustive()
    }
}

impl CorsPolicyAdapter {
    pub fn new(client: Arc<dyn CorsPolicyApi>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ResourceAdapter for CorsPolicyAdapter {
    type Config = CorsPolicyConfig;

    fn kind(&self) -> &'static str {
        KIND
    }

    fn schema(&self) -> &'static [FieldSchema] {
        SCHEMA
    }

    fn change(&self, desired: &Self::Config, applied: &Self::Config) -> Option<Transition> {
        if desired.container_name != applied.container_name {
            Some(Transition::Replace)
        } else if normalize_cors_policy(&desired.cors_policy)
            != normalize_cors_policy(&applied.cors_policy)
        {
            Some(Transition::Update)
        } else {
            None
        }
    }

    async fn put(&self, config: &Self::Config) -> Result<String, ReconcileError> {
        config.validate()?;

        let span = info_span!(
            "cors_policy.put",
            container.name = %config.container_name,
            rules = config.cors_policy.len()
        );
        let start = Instant::now();

        async move {
            let rules = expand_cors_policy(&config.cors_policy);
            match self
                .client
                .put_cors_policy(&config.container_name, &rules)
                .await
            {
                Ok(()) => {
                    metrics::record_remote_operation(KIND, "put", start.elapsed().as_secs_f64());
                    info!(
                        container_name = %config.container_name,
                        rules = rules.len(),
                        "Put CORS policy on container {}",
                        config.container_name
                    );
                    Ok(config.container_name.clone())
                }
                Err(e) => {
                    metrics::increment_remote_operation_errors(KIND, "put");
                    warn!(
                        container_name = %config.container_name,
                        error = %e,
                        "Failed to put CORS policy on container {}",
                        config.container_name
                    );
                    Err(e.into())
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn read(&self, id: &str) -> Result<Option<Self::Config>, ReconcileError> {
        let span = info_span!("cors_policy.read", container.name = id);
        let start = Instant::now();

        async move {
            match self.client.get_cors_policy(id).await {
                Ok(rules) => {
                    metrics::record_remote_operation(KIND, "read", start.elapsed().as_secs_f64());
                    Ok(Some(CorsPolicyConfig {
                        container_name: id.to_string(),
                        cors_policy: flatten_cors_policy(&rules),
                    }))
                }
                Err(e) if is_policy_absent(e.kind()) => {
                    warn!(
                        container_name = id,
                        reason = %e.kind(),
                        "CORS policy on container {} not found, removing from state", id
                    );
                    metrics::increment_absent_resources(KIND, "read");
                    Ok(None)
                }
                Err(e) => {
                    metrics::increment_remote_operation_errors(KIND, "read");
                    Err(e.into())
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn delete(&self, id: &str, _config: &Self::Config) -> Result<(), ReconcileError> {
        let span = info_span!("cors_policy.delete", container.name = id);
        let start = Instant::now();

        async move {
            match self.client.delete_cors_policy(id).await {
                Ok(()) => {
                    metrics::record_remote_operation(KIND, "delete", start.elapsed().as_secs_f64());
                    info!(container_name = id, "Deleted CORS policy on container {}", id);
                    Ok(())
                }
                Err(e) if is_policy_absent(e.kind()) => {
                    warn!(
                        container_name = id,
                        reason = %e.kind(),
                        "CORS policy on container {} already gone", id
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::memory::InMemoryRemote;

    fn rule(origin: &str) -> CorsRuleConfig {
        CorsRuleConfig {
            allowed_methods: Some(["GET".to_string()].into_iter().collect()),
            allowed_origins: Some([origin.to_string()].into_iter().collect()),
            ..CorsRuleConfig::default()
        }
    }

    fn config(container: &str, origins: &[&str]) -> CorsPolicyConfig {
        CorsPolicyConfig {
            container_name: container.to_string(),
            cors_policy: origins.iter().map(|o| rule(o)).collect(),
        }
    }

    fn adapter() -> CorsPolicyAdapter {
        CorsPolicyAdapter::new(Arc::new(InMemoryRemote::new()))
    }

    #[test]
    fn test_policy_change_updates_in_place() {
        assert_eq!(
            adapter().change(&config("media", &["*"]), &config("media", &["https://a.example"])),
            Some(Transition::Update)
        );
    }

    #[test]
    fn test_container_change_replaces() {
        assert_eq!(
            adapter().change(&config("media", &["*"]), &config("other", &["*"])),
            Some(Transition::Replace)
        );
    }

    #[test]
    fn test_equal_policies_need_no_change() {
        assert_eq!(
            adapter().change(&config("media", &["a", "b"]), &config("media", &["b", "a"])),
            None
        );
    }

    #[test]
    fn test_empty_sets_and_zero_max_age_match_their_read_back() {
        let mut desired = config("media", &["*"]);
        desired.cors_policy = desired
            .cors_policy
            .into_iter()
            .map(|r| CorsRuleConfig {
                allowed_headers: Some(BTreeSet::new()),
                max_age_seconds: Some(0),
                ..r
            })
            .collect();

        assert_eq!(adapter().change(&desired, &config("media", &["*"])), None);
    }

    #[test]
    fn test_validate_rule_count_bounds() {
        assert!(config("media", &["*"]).validate().is_ok());
        assert!(matches!(
            config("media", &[]).validate(),
            Err(ReconcileError::InvalidConfig(_))
        ));

        let origins: Vec<String> = (0..=MAX_CORS_RULES)
            .map(|i| format!("https://{i}.example"))
            .collect();
        let refs: Vec<&str> = origins.iter().map(String::as_str).collect();
        assert!(matches!(
            config("media", &refs).validate(),
            Err(ReconcileError::InvalidConfig(msg)) if msg.contains("101 rules")
        ));
    }

    #[test]
    fn test_absent_kinds() {
        assert!(is_policy_absent(RemoteErrorKind::ContainerNotFound));
        assert!(is_policy_absent(RemoteErrorKind::CorsPolicyNotFound));
        assert!(!is_policy_absent(RemoteErrorKind::ObjectNotFound));
        assert!(!is_policy_absent(RemoteErrorKind::Other));
    }
}
