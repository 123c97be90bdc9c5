//! # Manifest and State Files
//!
//! The manifest (YAML) lists declared resources by address:
//!
//! ```yaml
//! resources:
//!   - address: web-morning
//!     scheduled_action:
//!       name: web-morning
//!       service_namespace: ecs
//!       resource_id: service/prod/web
//!       schedule: cron(0 8 * * ? *)
//!       scalable_target_action:
//!         min_capacity: 2
//!         max_capacity: 10
//!   - address: media-cors
//!     cors_policy:
//!       container_name: media
//!       cors_policy:
//!         - allowed_origins: ["*"]
//!           allowed_methods: [GET]
//! ```
//!
//! The state file (JSON) records, per address, the identifier and the
//! configuration last read back from the remote service.

use crate::reconciler::ResourceState;
use crate::resource::{CorsPolicyConfig, ScheduledActionConfig};
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::path::Path;
use tracing::debug;

pub const STATE_FILE_VERSION: u32 = 1;

/// Resource kinds a manifest can declare
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, clap::ValueEnum)]
pub enum ResourceKind {
    #[value(name = "scheduled_action")]
    ScheduledAction,
    #[value(name = "cors_policy")]
    CorsPolicy,
}

impl ResourceKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ResourceKind::ScheduledAction => crate::resource::scheduled_action::KIND,
            ResourceKind::CorsPolicy => crate::resource::cors_policy::KIND,
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Configuration of any supported resource kind
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceConfig {
    ScheduledAction(ScheduledActionConfig),
    CorsPolicy(CorsPolicyConfig),
}

impl ResourceConfig {
    #[must_use]
    pub fn kind(&self) -> ResourceKind {
        match self {
            ResourceConfig::ScheduledAction(_) => ResourceKind::ScheduledAction,
            ResourceConfig::CorsPolicy(_) => ResourceKind::CorsPolicy,
        }
    }

    #[must_use]
    pub fn as_scheduled_action(&self) -> Option<&ScheduledActionConfig> {
        match self {
            ResourceConfig::ScheduledAction(config) => Some(config),
            ResourceConfig::CorsPolicy(_) => None,
        }
    }

    #[must_use]
    pub fn as_cors_policy(&self) -> Option<&CorsPolicyConfig> {
        match self {
            ResourceConfig::CorsPolicy(config) => Some(config),
            ResourceConfig::ScheduledAction(_) => None,
        }
    }
}

/// One declared resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub address: String,
    #[serde(flatten)]
    pub resource: ResourceConfig,
}

/// Declared resources, in apply order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(default)]
    pub resources: Vec<ManifestEntry>,
}

impl Manifest {
    /// Parse and validate a YAML manifest
    ///
    /// # Errors
    ///
    /// Fails on invalid YAML, unknown kinds or namespaces, and duplicate or
    /// empty addresses.
    pub fn from_yaml(content: &str) -> Result<Self> {
        let manifest: Manifest =
            serde_yaml::from_str(content).context("Failed to parse manifest YAML")?;
        manifest.validate()?;
        Ok(manifest)
    }

    /// Load a manifest from disk
    ///
    /// # Errors
    ///
    /// Fails if the file cannot be read or does not parse.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read manifest: {}", path.display()))?;
        Self::from_yaml(&content).with_context(|| format!("Invalid manifest: {}", path.display()))
    }

    /// Check that addresses are non-empty and unique
    ///
    /// # Errors
    ///
    /// Names the first offending address.
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for entry in &self.resources {
            if entry.address.is_empty() {
                bail!("Resource address must not be empty");
            }
            if !seen.insert(entry.address.as_str()) {
                bail!("Duplicate resource address: {}", entry.address);
            }
        }
        Ok(())
    }

    #[must_use]
    pub fn get(&self, address: &str) -> Option<&ResourceConfig> {
        self.resources
            .iter()
            .find(|entry| entry.address == address)
            .map(|entry| &entry.resource)
    }
}

/// Recorded state of one resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateEntry {
    pub id: String,
    #[serde(flatten)]
    pub resource: ResourceConfig,
}

impl StateEntry {
    #[must_use]
    pub fn kind(&self) -> ResourceKind {
        self.resource.kind()
    }

    #[must_use]
    pub fn into_scheduled_action(self) -> Option<ResourceState<ScheduledActionConfig>> {
        match self.resource {
            ResourceConfig::ScheduledAction(config) => Some(ResourceState {
                id: self.id,
                config,
            }),
            ResourceConfig::CorsPolicy(_) => None,
        }
    }

    #[must_use]
    pub fn into_cors_policy(self) -> Option<ResourceState<CorsPolicyConfig>> {
        match self.resource {
            ResourceConfig::CorsPolicy(config) => Some(ResourceState {
                id: self.id,
                config,
            }),
            ResourceConfig::ScheduledAction(_) => None,
        }
    }
}

impl From<ResourceState<ScheduledActionConfig>> for StateEntry {
    fn from(state: ResourceState<ScheduledActionConfig>) -> Self {
        Self {
            id: state.id,
            resource: ResourceConfig::ScheduledAction(state.config),
        }
    }
}

impl From<ResourceState<CorsPolicyConfig>> for StateEntry {
    fn from(state: ResourceState<CorsPolicyConfig>) -> Self {
        Self {
            id: state.id,
            resource: ResourceConfig::CorsPolicy(state.config),
        }
    }
}

/// Applied state of every managed resource, keyed by address
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateFile {
    pub version: u32,
    #[serde(default)]
    pub resources: BTreeMap<String, StateEntry>,
}

impl Default for StateFile {
    fn default() -> Self {
        Self {
            version: STATE_FILE_VERSION,
            resources: BTreeMap::new(),
        }
    }
}

impl StateFile {
    /// Load state, starting empty when the file does not exist yet
    ///
    /// # Errors
    ///
    /// Fails on unreadable files, invalid JSON and unsupported versions.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!("State file {} not found, starting empty", path.display());
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read state file: {}", path.display()))?;
        let state: StateFile = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse state file: {}", path.display()))?;
        if state.version != STATE_FILE_VERSION {
            bail!(
                "Unsupported state file version {} in {} (expected {STATE_FILE_VERSION})",
                state.version,
                path.display()
            );
        }
        Ok(state)
    }

    /// Write state as pretty-printed JSON
    ///
    /// # Errors
    ///
    /// Fails if the file cannot be written.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content =
            serde_json::to_string_pretty(self).context("Failed to serialize state file")?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write state file: {}", path.display()))
    }
}
