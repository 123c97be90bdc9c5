//! # AWS Providers
//!
//! Clients for the two AWS control-plane APIs:
//! - Application Auto Scaling (scheduled actions)
//! - Elemental MediaStore (container CORS policies)
//!
//! Credentials come from the SDK's default chain (environment, profile,
//! IRSA web identity, instance metadata).

mod application_autoscaling;
mod mediastore;

pub use application_autoscaling::AwsApplicationAutoScaling;
pub use mediastore::AwsMediaStore;

use crate::error::{RemoteError, RemoteErrorKind};
use aws_config::SdkConfig;
use aws_sdk_applicationautoscaling::error::{DisplayErrorContext, ProvideErrorMetadata};
use tracing::info;

/// Load SDK configuration, overriding the region when one is given
pub async fn load_sdk_config(region: Option<&str>) -> SdkConfig {
    let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest());
    if let Some(region) = region {
        info!("Using AWS region {}", region);
        loader = loader.region(aws_config::Region::new(region.to_string()));
    }
    loader.load().await
}

/// Classify an SDK failure by its service error code
///
/// `not_found` maps error codes to the not-found kinds the caller cares about.
pub(crate) fn classify_sdk_error<E>(
    err: &E,
    not_found: &[(&str, RemoteErrorKind)],
) -> RemoteError
where
    E: ProvideErrorMetadata + std::error::Error,
{
    let message = err
        .message()
        .map_or_else(|| DisplayErrorContext(err).to_string(), ToString::to_string);

    match err.code() {
        Some(code) => {
            let kind = not_found
                .iter()
                .find(|(c, _)| *c == code)
                .map_or(RemoteErrorKind::Other, |(_, kind)| *kind);
            RemoteError::new(kind, code, message)
        }
        None => RemoteError::other("Unknown", message),
    }
}
