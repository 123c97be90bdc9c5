//! Common test utilities for adapter and reconciler tests
//!
//! Provides the in-memory remote, declared configurations used across test
//! files, and one-time tracing setup.

#![allow(dead_code, reason = "Each test crate uses a different subset of helpers")]

use scaling_reconciler::identifier::ServiceNamespace;
use scaling_reconciler::provider::memory::InMemoryRemote;
use scaling_reconciler::provider::ScalableTargetAction;
use scaling_reconciler::resource::{CorsPolicyConfig, CorsRuleConfig, ScheduledActionConfig};
use scaling_reconciler::retry::RetryPolicy;
use scaling_reconciler::runner::Runner;
use std::collections::BTreeSet;
use std::sync::{Arc, Once};

static TRACING_INIT: Once = Once::new();

/// Route logs to the test harness once per test binary
///
/// Set `RUST_LOG=scaling_reconciler=debug` to see adapter logs.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "scaling_reconciler=warn".into()),
            )
            .with_test_writer()
            .try_init();
    });
}

pub fn remote() -> Arc<InMemoryRemote> {
    init_tracing();
    Arc::new(InMemoryRemote::new())
}

pub fn runner(remote: &Arc<InMemoryRemote>) -> Runner {
    Runner::new(
        Arc::clone(remote) as _,
        Arc::clone(remote) as _,
        RetryPolicy::default(),
    )
}

pub fn scheduled_action(name: &str, resource_id: &str) -> ScheduledActionConfig {
    ScheduledActionConfig {
        scalable_dimension: Some("ecs:service:DesiredCount".to_string()),
        schedule: Some("cron(0 8 * * ? *)".to_string()),
        scalable_target_action: Some(ScalableTargetAction {
            max_capacity: Some(10),
            min_capacity: Some(2),
        }),
        ..ScheduledActionConfig::new(name, ServiceNamespace::Ecs, resource_id)
    }
}

pub fn strings(values: &[&str]) -> Option<BTreeSet<String>> {
    Some(values.iter().map(ToString::to_string).collect())
}

pub fn cors_rule(origin: &str) -> CorsRuleConfig {
    CorsRuleConfig {
        allowed_headers: strings(&["*"]),
        allowed_methods: strings(&["GET", "HEAD"]),
        allowed_origins: strings(&[origin]),
        expose_headers: None,
        max_age_seconds: Some(3000),
    }
}

pub fn cors_policy(container_name: &str, origins: &[&str]) -> CorsPolicyConfig {
    CorsPolicyConfig {
        container_name: container_name.to_string(),
        cors_policy: origins.iter().map(|o| cors_rule(o)).collect(),
    }
}
