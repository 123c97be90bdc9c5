//! # Runner
//!
//! Applies a whole [`Manifest`] against a [`StateFile`], dispatching each
//! address to the adapter for its resource kind.
//!
//! Addresses are processed in manifest order, then addresses that are only
//! in state are deleted. The state file is updated in place after every
//! address, so on error it still reflects every change that completed.

use crate::error::ReconcileError;
use crate::manifest::{Manifest, ResourceConfig, ResourceKind, StateEntry, StateFile};
use crate::provider::{CorsPolicyApi, ScalingApi};
use crate::reconciler::{Reconciler, ResourceState};
use crate::resource::{CorsPolicyAdapter, ResourceAdapter, ScheduledActionAdapter, Transition};
use crate::retry::RetryPolicy;
use std::sync::Arc;
use tracing::{info, warn};

/// A transition applied to one address
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Change {
    pub address: String,
    pub kind: ResourceKind,
    pub transition: Transition,
}

/// Outcome of one address: the state to keep and what happened
type EntryOutcome = (Option<StateEntry>, Result<Option<Transition>, ReconcileError>);

/// Reconciles manifests with one adapter per resource kind
#[derive(Debug)]
pub struct Runner {
    scheduled_actions: ScheduledActionAdapter,
    cors_policies: CorsPolicyAdapter,
}

impl Runner {
    pub fn new(
        scaling: Arc<dyn ScalingApi>,
        cors: Arc<dyn CorsPolicyApi>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            scheduled_actions: ScheduledActionAdapter::new(scaling, retry),
            cors_policies: CorsPolicyAdapter::new(cors),
        }
    }

    /// Refresh state, then converge every address onto the manifest
    ///
    /// # Errors
    ///
    /// Stops at the first failing address; `state` keeps completed work.
    pub async fn apply(
        &self,
        manifest: &Manifest,
        state: &mut StateFile,
    ) -> Result<Vec<Change>, ReconcileError> {
        self.refresh(state).await?;

        let mut changes = Vec::new();
        for entry in &manifest.resources {
            let current = state.resources.remove(&entry.address);
            let outcome = self.apply_entry(Some(&entry.resource), current).await;
            record(state, &mut changes, &entry.address, entry.resource.kind(), outcome)?;
        }

        let orphaned: Vec<String> = state
            .resources
            .keys()
            .filter(|address| manifest.get(address).is_none())
            .cloned()
            .collect();
        for address in orphaned {
            if let Some(current) = state.resources.remove(&address) {
                let kind = current.kind();
                let outcome = self.apply_entry(None, Some(current)).await;
                record(state, &mut changes, &address, kind, outcome)?;
            }
        }

        info!(changes = changes.len(), "Apply complete");
        Ok(changes)
    }

    /// Re-read every recorded resource, dropping the ones that are gone
    ///
    /// Returns the addresses that were dropped.
    ///
    /// # Errors
    ///
    /// Stops at the first failed read.
    pub async fn refresh(&self, state: &mut StateFile) -> Result<Vec<String>, ReconcileError> {
        let mut dropped = Vec::new();
        let addresses: Vec<String> = state.resources.keys().cloned().collect();

        for address in addresses {
            let Some(current) = state.resources.remove(&address) else {
                continue;
            };
            let (kept, result) = match current.kind() {
                ResourceKind::ScheduledAction => {
                    refresh_one(&self.scheduled_actions, current.into_scheduled_action()).await
                }
                ResourceKind::CorsPolicy => {
                    refresh_one(&self.cors_policies, current.into_cors_policy()).await
                }
            };
            match kept {
                Some(entry) => {
                    state.resources.insert(address.clone(), entry);
                }
                None => {
                    warn!(address = %address, "Resource {} no longer exists remotely", address);
                    dropped.push(address.clone());
                }
            }
            result?;
        }
        Ok(dropped)
    }

    /// Delete every recorded resource
    ///
    /// # Errors
    ///
    /// Stops at the first failed delete.
    pub async fn destroy(&self, state: &mut StateFile) -> Result<Vec<Change>, ReconcileError> {
        let mut changes = Vec::new();
        let addresses: Vec<String> = state.resources.keys().cloned().collect();
        for address in addresses {
            if let Some(current) = state.resources.remove(&address) {
                let kind = current.kind();
                let outcome = self.apply_entry(None, Some(current)).await;
                record(state, &mut changes, &address, kind, outcome)?;
            }
        }
        Ok(changes)
    }

    /// Record an existing remote resource under `address`
    ///
    /// Returns `false` when nothing exists under `id`.
    ///
    /// # Errors
    ///
    /// Fails on malformed identifiers and remote read errors.
    pub async fn import(
        &self,
        state: &mut StateFile,
        address: &str,
        kind: ResourceKind,
        id: &str,
    ) -> Result<bool, ReconcileError> {
        let imported: Option<StateEntry> = match kind {
            ResourceKind::ScheduledAction => import_one(&self.scheduled_actions, id).await?,
            ResourceKind::CorsPolicy => import_one(&self.cors_policies, id).await?,
        };
        match imported {
            Some(entry) => {
                info!(address, kind = %kind, id, "Imported {} {}", kind, id);
                state.resources.insert(address.to_string(), entry);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn apply_entry(
        &self,
        desired: Option<&ResourceConfig>,
        current: Option<StateEntry>,
    ) -> EntryOutcome {
        match (desired, current) {
            // Kind changed under the same address: remove the old resource first
            (Some(desired), Some(current)) if desired.kind() != current.kind() => {
                let (left, result) = self.apply_same_kind(None, Some(current)).await;
                if let Err(e) = result {
                    return (left, Err(e));
                }
                let (state, result) = self.apply_same_kind(Some(desired), left).await;
                (state, result.map(|t| t.map(|_| Transition::Replace)))
            }
            (desired, current) => self.apply_same_kind(desired, current).await,
        }
    }

    async fn apply_same_kind(
        &self,
        desired: Option<&ResourceConfig>,
        current: Option<StateEntry>,
    ) -> EntryOutcome {
        let kind = desired
            .map(ResourceConfig::kind)
            .or_else(|| current.as_ref().map(StateEntry::kind));

        match kind {
            None => (None, Ok(None)),
            Some(ResourceKind::ScheduledAction) => {
                drive(
                    &self.scheduled_actions,
                    desired.and_then(ResourceConfig::as_scheduled_action),
                    current.and_then(StateEntry::into_scheduled_action),
                )
                .await
            }
            Some(ResourceKind::CorsPolicy) => {
                drive(
                    &self.cors_policies,
                    desired.and_then(ResourceConfig::as_cors_policy),
                    current.and_then(StateEntry::into_cors_policy),
                )
                .await
            }
        }
    }
}

fn record(
    state: &mut StateFile,
    changes: &mut Vec<Change>,
    address: &str,
    kind: ResourceKind,
    (kept, result): EntryOutcome,
) -> Result<(), ReconcileError> {
    if let Some(entry) = kept {
        state.resources.insert(address.to_string(), entry);
    }
    if let Some(transition) = result? {
        changes.push(Change {
            address: address.to_string(),
            kind,
            transition,
        });
    }
    Ok(())
}

async fn drive<A>(
    adapter: &A,
    desired: Option<&A::Config>,
    current: Option<ResourceState<A::Config>>,
) -> EntryOutcome
where
    A: ResourceAdapter,
    StateEntry: From<ResourceState<A::Config>>,
{
    let mut reconciler = Reconciler::new(adapter, current);
    let result = reconciler.apply(desired).await;
    (reconciler.into_state().map(StateEntry::from), result)
}

async fn refresh_one<A>(
    adapter: &A,
    current: Option<ResourceState<A::Config>>,
) -> (Option<StateEntry>, Result<bool, ReconcileError>)
where
    A: ResourceAdapter,
    StateEntry: From<ResourceState<A::Config>>,
{
    let mut reconciler = Reconciler::new(adapter, current);
    let result = reconciler.refresh().await;
    (reconciler.into_state().map(StateEntry::from), result)
}

async fn import_one<A>(adapter: &A, id: &str) -> Result<Option<StateEntry>, ReconcileError>
where
    A: ResourceAdapter,
    StateEntry: From<ResourceState<A::Config>>,
{
    let mut reconciler = Reconciler::new(adapter, None);
    if reconciler.import(id).await? {
        Ok(reconciler.into_state().map(StateEntry::from))
    } else {
        Ok(None)
    }
}
