//! # Errors
//!
//! Error taxonomy for reconciliation.
//!
//! Remote failures are classified once, at the provider boundary, into a
//! closed set of [`RemoteErrorKind`]s. Adapters then decide per call site
//! whether a kind is retried, treated as "already absent", or propagated.

use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Classification of a remote API failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RemoteErrorKind {
    /// The addressed object (or something it depends on) does not exist yet or any more
    ObjectNotFound,
    /// The container a policy is attached to does not exist
    ContainerNotFound,
    /// The container exists but has no CORS policy
    CorsPolicyNotFound,
    /// Anything else - never retried, never swallowed
    Other,
}

impl RemoteErrorKind {
    /// Get the metrics label for this kind
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            RemoteErrorKind::ObjectNotFound => "object_not_found",
            RemoteErrorKind::ContainerNotFound => "container_not_found",
            RemoteErrorKind::CorsPolicyNotFound => "cors_policy_not_found",
            RemoteErrorKind::Other => "other",
        }
    }
}

impl fmt::Display for RemoteErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A failed remote API call
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{code}: {message}")]
pub struct RemoteError {
    kind: RemoteErrorKind,
    code: String,
    message: String,
}

impl RemoteError {
    pub fn new(kind: RemoteErrorKind, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            code: code.into(),
            message: message.into(),
        }
    }

    /// `ObjectNotFoundException` from the scaling API
    pub fn object_not_found(message: impl Into<String>) -> Self {
        Self::new(
            RemoteErrorKind::ObjectNotFound,
            "ObjectNotFoundException",
            message,
        )
    }

    /// `ContainerNotFoundException` from the media store API
    pub fn container_not_found(message: impl Into<String>) -> Self {
        Self::new(
            RemoteErrorKind::ContainerNotFound,
            "ContainerNotFoundException",
            message,
        )
    }

    /// `CorsPolicyNotFoundException` from the media store API
    pub fn cors_policy_not_found(message: impl Into<String>) -> Self {
        Self::new(
            RemoteErrorKind::CorsPolicyNotFound,
            "CorsPolicyNotFoundException",
            message,
        )
    }

    /// Any unclassified failure, keeping the service error code
    pub fn other(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(RemoteErrorKind::Other, code, message)
    }

    #[must_use]
    pub fn kind(&self) -> RemoteErrorKind {
        self.kind
    }

    #[must_use]
    pub fn code(&self) -> &str {
        &self.code
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Errors surfaced by adapters and the reconciler
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// Identifier did not decode into `<name>-<service-namespace>-<resource-id>`
    #[error(
        "scheduled action ID must be of the form <name>-<service-namespace>-<resource-id>, was provided: {0:?}"
    )]
    MalformedIdentifier(String),

    /// A start or end time did not match `YYYY-MM-DDThh:mm:ssZ`
    #[error("failed to parse scheduled action {field} {value:?}: {source}")]
    TimeParse {
        field: &'static str,
        value: String,
        #[source]
        source: chrono::ParseError,
    },

    /// The put kept failing with a retryable error until the budget ran out
    #[error("gave up after {attempts} attempts over {elapsed:?}: {last}")]
    RetryTimeout {
        attempts: u32,
        elapsed: Duration,
        #[source]
        last: RemoteError,
    },

    /// The remote read did not return exactly the one record asked for
    #[error("expected exactly 1 scheduled action named {name:?}, found {found:?}")]
    UnexpectedResultCardinality { name: String, found: Vec<String> },

    /// Configuration rejected before any remote call
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Remote(#[from] RemoteError),
}

impl ReconcileError {
    /// The remote error behind this failure, if any
    #[must_use]
    pub fn remote(&self) -> Option<&RemoteError> {
        match self {
            ReconcileError::Remote(e) | ReconcileError::RetryTimeout { last: e, .. } => Some(e),
            _ => None,
        }
    }
}
