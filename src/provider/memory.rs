//! # In-Memory Remote
//!
//! A deterministic stand-in for both remote APIs. It keeps scheduled actions
//! and container policies in memory, counts calls per operation, and can be
//! told to fail upcoming calls with a given error, which is how the retry and
//! not-found paths are exercised without a real service.
//!
//! ```rust
//! use scaling_reconciler::error::RemoteError;
//! use scaling_reconciler::provider::memory::{InMemoryRemote, Operation};
//!
//! let remote = InMemoryRemote::new();
//! remote.fail_next(Operation::PutScheduledAction, RemoteError::object_not_found("converging"), 2);
//! assert_eq!(remote.calls(Operation::PutScheduledAction), 0);
//! ```

use crate::error::RemoteError;
use crate::identifier::ServiceNamespace;
use crate::provider::{
    CorsPolicyApi, DeleteScheduledActionRequest, PutScheduledActionRequest, ScalingApi,
    ScheduledActionRecord, WireCorsRule,
};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Remote operations, for fault injection and call counting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    PutScheduledAction,
    DescribeScheduledActions,
    DeleteScheduledAction,
    PutCorsPolicy,
    GetCorsPolicy,
    DeleteCorsPolicy,
}

#[derive(Debug, Default)]
struct State {
    scheduled_actions: Vec<ScheduledActionRecord>,
    // Container name -> policy (None when the container has no policy)
    containers: BTreeMap<String, Option<Vec<WireCorsRule>>>,
    queued_faults: HashMap<Operation, VecDeque<RemoteError>>,
    persistent_faults: HashMap<Operation, RemoteError>,
    calls: HashMap<Operation, u32>,
}

impl State {
    /// Count the call and return the injected failure, if any
    fn enter(&mut self, operation: Operation) -> Result<(), RemoteError> {
        *self.calls.entry(operation).or_default() += 1;

        if let Some(err) = self
            .queued_faults
            .get_mut(&operation)
            .and_then(VecDeque::pop_front)
        {
            return Err(err);
        }
        match self.persistent_faults.get(&operation) {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }
}

/// In-memory implementation of [`ScalingApi`] and [`CorsPolicyApi`]
#[derive(Debug)]
pub struct InMemoryRemote {
    region: String,
    account_id: String,
    state: Mutex<State>,
}

impl Default for InMemoryRemote {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryRemote {
    #[must_use]
    pub fn new() -> Self {
        Self {
            region: "us-east-1".to_string(),
            account_id: "123456789012".to_string(),
            state: Mutex::new(State::default()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Create an empty container (no CORS policy yet)
    pub fn create_container(&self, name: &str) {
        self.lock().containers.entry(name.to_string()).or_insert(None);
    }

    /// Remove a container and any policy attached to it
    pub fn remove_container(&self, name: &str) {
        self.lock().containers.remove(name);
    }

    /// Fail the next `times` calls to `operation` with `error`
    pub fn fail_next(&self, operation: Operation, error: RemoteError, times: usize) {
        self.lock()
            .queued_faults
            .entry(operation)
            .or_default()
            .extend(std::iter::repeat_n(error, times));
    }

    /// Fail every call to `operation` with `error` until cleared
    pub fn fail_always(&self, operation: Operation, error: RemoteError) {
        self.lock().persistent_faults.insert(operation, error);
    }

    /// Drop all injected failures for `operation`
    pub fn clear_faults(&self, operation: Operation) {
        let mut state = self.lock();
        state.queued_faults.remove(&operation);
        state.persistent_faults.remove(&operation);
    }

    /// Number of calls made to `operation`, including failed ones
    #[must_use]
    pub fn calls(&self, operation: Operation) -> u32 {
        self.lock().calls.get(&operation).copied().unwrap_or(0)
    }

    /// Seed a record directly, bypassing put semantics
    pub fn insert_scheduled_action(&self, record: ScheduledActionRecord) {
        self.lock().scheduled_actions.push(record);
    }

    /// Snapshot of every stored scheduled action
    #[must_use]
    pub fn scheduled_actions(&self) -> Vec<ScheduledActionRecord> {
        self.lock().scheduled_actions.clone()
    }

    /// Policy currently attached to a container
    #[must_use]
    pub fn cors_policy(&self, container_name: &str) -> Option<Vec<WireCorsRule>> {
        self.lock().containers.get(container_name).cloned().flatten()
    }

    fn scheduled_action_arn(&self, request: &PutScheduledActionRequest) -> String {
        format!(
            "arn:aws:autoscaling:{}:{}:scheduledAction:{}:resource/{}/{}:scheduledActionName/{}",
            self.region,
            self.account_id,
            request.name,
            request.service_namespace,
            request.resource_id,
            request.name
        )
    }
}

fn same_action(
    record: &ScheduledActionRecord,
    name: &str,
    service_namespace: ServiceNamespace,
    resource_id: &str,
    scalable_dimension: Option<&str>,
) -> bool {
    record.name == name
        && record.service_namespace == service_namespace
        && record.resource_id == resource_id
        && scalable_dimension.is_none_or(|d| record.scalable_dimension.as_deref() == Some(d))
}

#[async_trait]
impl ScalingApi for InMemoryRemote {
    async fn put_scheduled_action(
        &self,
        request: &PutScheduledActionRequest,
    ) -> Result<(), RemoteError> {
        let arn = self.scheduled_action_arn(request);
        let mut state = self.lock();
        state.enter(Operation::PutScheduledAction)?;

        let record = ScheduledActionRecord {
            name: request.name.clone(),
            arn,
            service_namespace: request.service_namespace,
            resource_id: request.resource_id.clone(),
            scalable_dimension: request.scalable_dimension.clone(),
            schedule: request.schedule.clone(),
            scalable_target_action: request.scalable_target_action,
            start_time: request.start_time,
            end_time: request.end_time,
        };

        let existing = state.scheduled_actions.iter().position(|r| {
            same_action(
                r,
                &request.name,
                request.service_namespace,
                &request.resource_id,
                request.scalable_dimension.as_deref(),
            )
        });
        match existing {
            Some(index) => state.scheduled_actions[index] = record,
            None => state.scheduled_actions.push(record),
        }
        Ok(())
    }

    async fn describe_scheduled_actions(
        &self,
        names: &[String],
        service_namespace: ServiceNamespace,
    ) -> Result<Vec<ScheduledActionRecord>, RemoteError> {
        let mut state = self.lock();
        state.enter(Operation::DescribeScheduledActions)?;

        Ok(state
            .scheduled_actions
            .iter()
            .filter(|r| r.service_namespace == service_namespace)
            .filter(|r| names.is_empty() || names.contains(&r.name))
            .cloned()
            .collect())
    }

    async fn delete_scheduled_action(
        &self,
        request: &DeleteScheduledActionRequest,
    ) -> Result<(), RemoteError> {
        let mut state = self.lock();
        state.enter(Operation::DeleteScheduledAction)?;

        let position = state.scheduled_actions.iter().position(|r| {
            same_action(
                r,
                &request.name,
                request.service_namespace,
                &request.resource_id,
                request.scalable_dimension.as_deref(),
            )
        });
        match position {
            Some(index) => {
                state.scheduled_actions.remove(index);
                Ok(())
            }
            None => Err(RemoteError::object_not_found(format!(
                "No scheduled action found for name {} on {}",
                request.name, request.resource_id
            ))),
        }
    }
}

#[async_trait]
impl CorsPolicyApi for InMemoryRemote {
    async fn put_cors_policy(
        &self,
        container_name: &str,
        rules: &[WireCorsRule],
    ) -> Result<(), RemoteError> {
        let mut state = self.lock();
        state.enter(Operation::PutCorsPolicy)?;

        match state.containers.get_mut(container_name) {
            Some(policy) => {
                *policy = Some(rules.to_vec());
                Ok(())
            }
            None => Err(container_not_found(container_name)),
        }
    }

    async fn get_cors_policy(&self, container_name: &str) -> Result<Vec<WireCorsRule>, RemoteError> {
        let mut state = self.lock();
        state.enter(Operation::GetCorsPolicy)?;

        match state.containers.get(container_name) {
            Some(Some(rules)) => Ok(rules.clone()),
            Some(None) => Err(cors_policy_not_found(container_name)),
            None => Err(container_not_found(container_name)),
        }
    }

    async fn delete_cors_policy(&self, container_name: &str) -> Result<(), RemoteError> {
        let mut state = self.lock();
        state.enter(Operation::DeleteCorsPolicy)?;

        match state.containers.get_mut(container_name) {
            Some(policy) => policy
                .take()
                .map(|_| ())
                .ok_or_else(|| cors_policy_not_found(container_name)),
            None => Err(container_not_found(container_name)),
        }
    }
}

fn container_not_found(container_name: &str) -> RemoteError {
    RemoteError::container_not_found(format!("container {container_name} does not exist"))
}

fn cors_policy_not_found(container_name: &str) -> RemoteError {
    RemoteError::cors_policy_not_found(format!(
        "container {container_name} has no CORS policy"
    ))
}
