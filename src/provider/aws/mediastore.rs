//! # MediaStore
//!
//! Implements [`CorsPolicyApi`] over `aws-sdk-mediastore`.

use super::classify_sdk_error;
use crate::error::{RemoteError, RemoteErrorKind};
use crate::provider::{CorsPolicyApi, WireCorsRule};
use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_mediastore::types::{CorsRule, MethodName};
use aws_sdk_mediastore::Client;
use tracing::debug;

const NOT_FOUND_CODES: &[(&str, RemoteErrorKind)] = &[
    ("ContainerNotFoundException", RemoteErrorKind::ContainerNotFound),
    ("CorsPolicyNotFoundException", RemoteErrorKind::CorsPolicyNotFound),
];

/// MediaStore client
pub struct AwsMediaStore {
    client: Client,
}

impl std::fmt::Debug for AwsMediaStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AwsMediaStore").finish_non_exhaustive()
    }
}

impl AwsMediaStore {
    #[must_use]
    pub fn new(sdk_config: &SdkConfig) -> Self {
        Self {
            client: Client::new(sdk_config),
        }
    }
}

fn to_aws_rule(rule: &WireCorsRule) -> Result<CorsRule, RemoteError> {
    let max_age_seconds = rule
        .max_age_seconds
        .map(|v| {
            i32::try_from(v).map_err(|e| {
                RemoteError::other(
                    "ValidationException",
                    format!("max_age_seconds {v} is out of range: {e}"),
                )
            })
        })
        .transpose()?;

    CorsRule::builder()
        .set_allowed_headers(Some(rule.allowed_headers.clone()))
        .set_allowed_methods(Some(
            rule.allowed_methods
                .iter()
                .map(|m| MethodName::from(m.as_str()))
                .collect(),
        ))
        .set_allowed_origins(Some(rule.allowed_origins.clone()))
        .set_expose_headers(Some(rule.expose_headers.clone()))
        .set_max_age_seconds(max_age_seconds)
        .build()
        .map_err(|e| RemoteError::other("BuildError", e.to_string()))
}

fn strings(values: Option<&[String]>) -> Vec<String> {
    values.unwrap_or_default().to_vec()
}

fn from_aws_rule(rule: &CorsRule) -> WireCorsRule {
    WireCorsRule {
        allowed_headers: strings(Option::<&[String]>::from(rule.allowed_headers())),
        allowed_methods: Option::<&[MethodName]>::from(rule.allowed_methods())
            .unwrap_or_default()
            .iter()
            .map(|m| m.as_str().to_string())
            .collect(),
        allowed_origins: strings(Option::<&[String]>::from(rule.allowed_origins())),
        expose_headers: strings(Option::<&[String]>::from(rule.expose_headers())),
        // The service reports 0 when no max age was set
        max_age_seconds: Option::<i32>::from(rule.max_age_seconds())
            .filter(|v| *v != 0)
            .map(i64::from),
    }
}

#[async_trait]
impl CorsPolicyApi for AwsMediaStore {
    async fn put_cors_policy(
        &self,
        container_name: &str,
        rules: &[WireCorsRule],
    ) -> Result<(), RemoteError> {
        let policy = rules
            .iter()
            .map(to_aws_rule)
            .collect::<Result<Vec<_>, _>>()?;

        self.client
            .put_cors_policy()
            .container_name(container_name)
            .set_cors_policy(Some(policy))
            .send()
            .await
            .map_err(|e| classify_sdk_error(&e, NOT_FOUND_CODES))?;

        debug!(container_name, "PutCorsPolicy succeeded");
        Ok(())
    }

    async fn get_cors_policy(&self, container_name: &str) -> Result<Vec<WireCorsRule>, RemoteError> {
        let output = self
            .client
            .get_cors_policy()
            .container_name(container_name)
            .send()
            .await
            .map_err(|e| classify_sdk_error(&e, NOT_FOUND_CODES))?;

        Ok(Option::<&[CorsRule]>::from(output.cors_policy())
            .unwrap_or_default()
            .iter()
            .map(from_aws_rule)
            .collect())
    }

    async fn delete_cors_policy(&self, container_name: &str) -> Result<(), RemoteError> {
        self.client
            .delete_cors_policy()
            .container_name(container_name)
            .send()
            .await
            .map_err(|e| classify_sdk_error(&e, NOT_FOUND_CODES))?;

        debug!(container_name, "DeleteCorsPolicy succeeded");
        Ok(())
    }
}
