//! # Resource Adapters
//!
//! An adapter translates between a declared configuration and one remote
//! API's request/response shapes for a single resource kind. Every adapter
//! supplies the same three operations:
//!
//! - `put` - create or replace, returning the resource identifier
//! - `read` - fetch by identifier; `Ok(None)` means the resource is gone
//! - `delete` - remove by identifier; "already gone" counts as success
//!
//! Adapters also declare their fields ([`FieldSchema`]) and decide which kind
//! of [`Transition`] a configuration change needs.

use crate::error::ReconcileError;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;

pub mod cors_policy;
pub mod cors_transcoder;
pub mod scheduled_action;

pub use cors_policy::{CorsPolicyAdapter, CorsPolicyConfig};
pub use cors_transcoder::CorsRuleConfig;
pub use scheduled_action::{ScheduledActionAdapter, ScheduledActionConfig};

/// A state change the reconciler applies to one resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Transition {
    /// Nothing recorded yet
    Create,
    /// Recorded and changed in a field the remote can update in place
    Update,
    /// Recorded and changed in an immutable field: delete, then create
    Replace,
    /// Recorded but no longer declared
    Delete,
}

impl Transition {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Transition::Create => "create",
            Transition::Update => "update",
            Transition::Replace => "replace",
            Transition::Delete => "delete",
        }
    }
}

impl fmt::Display for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Value type of a declared field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    String,
    Int,
    /// Unordered, de-duplicated strings
    StringSet,
    /// Nested block with at most `max_items` entries
    Block,
    /// Unordered, de-duplicated nested blocks
    BlockSet,
}

/// Declaration of one configuration field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSchema {
    pub name: &'static str,
    pub field_type: FieldType,
    pub required: bool,
    /// A change to this field replaces the whole resource
    pub force_new: bool,
    /// Assigned by the remote service; never declared
    pub computed: bool,
    pub max_items: Option<usize>,
    /// Fields of a nested block
    pub elem: &'static [FieldSchema],
}

impl FieldSchema {
    const fn new(name: &'static str, field_type: FieldType) -> Self {
        Self {
            name,
            field_type,
            required: false,
            force_new: false,
            computed: false,
            max_items: None,
            elem: &[],
        }
    }

    #[must_use]
    pub const fn required(name: &'static str, field_type: FieldType) -> Self {
        let mut field = Self::new(name, field_type);
        field.required = true;
        field
    }

    #[must_use]
    pub const fn optional(name: &'static str, field_type: FieldType) -> Self {
        Self::new(name, field_type)
    }

    #[must_use]
    pub const fn computed(name: &'static str, field_type: FieldType) -> Self {
        let mut field = Self::new(name, field_type);
        field.computed = true;
        field
    }

    #[must_use]
    pub const fn force_new(mut self) -> Self {
        self.force_new = true;
        self
    }

    #[must_use]
    pub const fn max_items(mut self, max_items: usize) -> Self {
        self.max_items = Some(max_items);
        self
    }

    #[must_use]
    pub const fn elem(mut self, elem: &'static [FieldSchema]) -> Self {
        self.elem = elem;
        self
    }
}

/// Adapter between declared configuration and a remote API, for one resource kind
#[async_trait]
pub trait ResourceAdapter: Send + Sync {
    /// Declared (plus computed) fields of the resource
    type Config: Clone + PartialEq + fmt::Debug + Serialize + DeserializeOwned + Send + Sync;

    /// Resource kind, used for logs, metrics and state files
    fn kind(&self) -> &'static str;

    /// Field declarations
    fn schema(&self) -> &'static [FieldSchema];

    /// Transition needed to go from `applied` to `desired`, both present
    ///
    /// Computed fields in `applied` must not cause a change.
    fn change(&self, desired: &Self::Config, applied: &Self::Config) -> Option<Transition>;

    /// Create or replace the remote resource, returning its identifier
    async fn put(&self, config: &Self::Config) -> Result<String, ReconcileError>;

    /// Fetch the remote resource; `Ok(None)` when it no longer exists
    async fn read(&self, id: &str) -> Result<Option<Self::Config>, ReconcileError>;

    /// Remove the remote resource; succeeds if it is already gone
    async fn delete(&self, id: &str, config: &Self::Config) -> Result<(), ReconcileError>;
}

/// Decide the transition from the last-applied record to the desired one
pub fn plan<A: ResourceAdapter + ?Sized>(
    adapter: &A,
    desired: Option<&A::Config>,
    applied: Option<&A::Config>,
) -> Option<Transition> {
    match (desired, applied) {
        (Some(_), None) => Some(Transition::Create),
        (None, Some(_)) => Some(Transition::Delete),
        (None, None) => None,
        (Some(desired), Some(applied)) => adapter.change(desired, applied),
    }
}
