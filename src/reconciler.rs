//! # Reconciler
//!
//! Drives one resource from its last-applied state toward its declared state
//! through a [`ResourceAdapter`].
//!
//! ## Reconciliation Flow
//!
//! 1. Plan: compare declared and applied configuration ([`plan`])
//! 2. Apply the transition:
//!    - **Create / Update**: put, then read back
//!    - **Replace**: delete the applied resource, then put and read back
//!    - **Delete**: delete, then forget the state
//! 3. Record what the remote reports as the new applied state
//!
//! A read that finds nothing clears the state, so the next plan recreates
//! the resource.

use crate::error::ReconcileError;
use crate::observability::metrics;
use crate::resource::{plan, ResourceAdapter, Transition};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Last-applied state of one resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceState<C> {
    pub id: String,
    pub config: C,
}

/// Reconciles a single resource instance
pub struct Reconciler<'a, A: ResourceAdapter> {
    adapter: &'a A,
    state: Option<ResourceState<A::Config>>,
}

impl<A: ResourceAdapter> std::fmt::Debug for Reconciler<'_, A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reconciler")
            .field("kind", &self.adapter.kind())
            .field("state", &self.state)
            .finish()
    }
}

impl<'a, A: ResourceAdapter> Reconciler<'a, A> {
    pub fn new(adapter: &'a A, state: Option<ResourceState<A::Config>>) -> Self {
        Self { adapter, state }
    }

    #[must_use]
    pub fn state(&self) -> Option<&ResourceState<A::Config>> {
        self.state.as_ref()
    }

    #[must_use]
    pub fn into_state(self) -> Option<ResourceState<A::Config>> {
        self.state
    }

    /// Transition [`apply`](Self::apply) would perform for `desired`
    #[must_use]
    pub fn plan(&self, desired: Option<&A::Config>) -> Option<Transition> {
        plan(
            self.adapter,
            desired,
            self.state.as_ref().map(|s| &s.config),
        )
    }

    /// Move the remote resource to `desired` (`None` removes it)
    ///
    /// Returns the transition performed, or `None` when already converged.
    /// On failure the state reflects every step that completed.
    ///
    /// # Errors
    ///
    /// Propagates the first adapter error.
    pub async fn apply(
        &mut self,
        desired: Option<&A::Config>,
    ) -> Result<Option<Transition>, ReconcileError> {
        let Some(transition) = self.plan(desired) else {
            return Ok(None);
        };

        info!(
            resource.kind = self.adapter.kind(),
            transition = %transition,
            "Applying {} to {}",
            transition,
            self.adapter.kind()
        );

        if matches!(transition, Transition::Replace | Transition::Delete) {
            self.destroy_current().await?;
        }
        if let Some(desired) = desired.filter(|_| transition != Transition::Delete) {
            self.put_and_read(desired).await?;
        }

        metrics::increment_transitions(transition.as_str());
        Ok(Some(transition))
    }

    /// Re-read the applied resource; returns whether it still exists
    ///
    /// # Errors
    ///
    /// Propagates adapter read errors; state is left unchanged.
    pub async fn refresh(&mut self) -> Result<bool, ReconcileError> {
        let Some(current) = self.state.as_mut() else {
            return Ok(false);
        };
        match self.adapter.read(&current.id).await? {
            Some(config) => {
                current.config = config;
                Ok(true)
            }
            None => {
                self.state = None;
                Ok(false)
            }
        }
    }

    /// Adopt an existing remote resource by identifier
    ///
    /// Returns `false` and leaves state untouched when nothing exists under `id`.
    ///
    /// # Errors
    ///
    /// Propagates adapter read errors, including malformed identifiers.
    pub async fn import(&mut self, id: &str) -> Result<bool, ReconcileError> {
        match self.adapter.read(id).await? {
            Some(config) => {
                self.state = Some(ResourceState {
                    id: id.to_string(),
                    config,
                });
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn put_and_read(&mut self, desired: &A::Config) -> Result<(), ReconcileError> {
        let id = self.adapter.put(desired).await?;
        // Keep the id even if the read below fails
        self.state = Some(ResourceState {
            id: id.clone(),
            config: desired.clone(),
        });

        match self.adapter.read(&id).await? {
            Some(config) => {
                self.state = Some(ResourceState { id, config });
            }
            None => {
                warn!(
                    resource.kind = self.adapter.kind(),
                    resource.id = %id,
                    "Resource {} not visible right after put",
                    id
                );
                self.state = None;
            }
        }
        Ok(())
    }

    async fn destroy_current(&mut self) -> Result<(), ReconcileError> {
        if let Some(current) = &self.state {
            self.adapter.delete(&current.id, &current.config).await?;
        }
        self.state = None;
        Ok(())
    }
}
