//! Scaling Reconciler Library
//!
//! Declarative lifecycle management for two kinds of cloud resources:
//!
//! - **Scheduled scaling actions** of the application auto-scaling service
//! - **Container CORS policies** of the media storage service
//!
//! Each kind has a [`resource::ResourceAdapter`] that maps declared
//! configuration onto the remote API ([`provider`]). The [`reconciler`]
//! drives one resource through create, update, replace and delete; the
//! [`runner`] does so for every address in a [`manifest::Manifest`].
//!
//! Tests are included in the module files and under `tests/`.

pub mod backoff;
pub mod config;
pub mod constants;
pub mod error;
pub mod identifier;
pub mod manifest;
pub mod observability;
pub mod provider;
pub mod reconciler;
pub mod resource;
pub mod retry;
pub mod runner;
pub mod schedule_time;

pub use error::{ReconcileError, RemoteError, RemoteErrorKind};
pub use identifier::{ScheduledActionId, ServiceNamespace};
pub use observability::metrics;
