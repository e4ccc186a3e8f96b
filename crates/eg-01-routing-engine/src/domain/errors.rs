//! Domain errors for the routing engine.
//!
//! Every failure the engine reports falls into one of five kinds. Transports
//! map the kind (via [`RoutingError::code`]) to their own status codes.

use std::fmt;

use thiserror::Error;

/// Stable, transport-independent error kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    InvalidArgument,
    PermissionDenied,
    NotFound,
    Unavailable,
    Internal,
}

impl ErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::InvalidArgument => "INVALID_ARGUMENT",
            Self::PermissionDenied => "PERMISSION_DENIED",
            Self::NotFound => "NOT_FOUND",
            Self::Unavailable => "UNAVAILABLE",
            Self::Internal => "INTERNAL",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sub-classification of [`RoutingError::Internal`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InternalReason {
    /// Key-value store read or write failed
    Store,
    /// Health catalog query failed
    Catalog,
    /// Conditional write kept losing to concurrent writers
    ConflictRetriesExhausted,
    /// The request deadline passed before the operation finished
    DeadlineExceeded,
    /// Selection was attempted over zero candidates
    EmptyCandidateSet,
}

impl InternalReason {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Store => "store",
            Self::Catalog => "catalog",
            Self::ConflictRetriesExhausted => "conflict_retries_exhausted",
            Self::DeadlineExceeded => "deadline_exceeded",
            Self::EmptyCandidateSet => "empty_candidate_set",
        }
    }
}

impl fmt::Display for InternalReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors returned by `RegisterNode` / `ResolveNode`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RoutingError {
    /// Empty key, empty node id, or a node id the codec cannot store
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Node is outside the authorization set
    #[error("node {node_id} is not authorized")]
    PermissionDenied { node_id: String },

    /// Every node serving the key is outside the authorization set
    #[error("no authorized node serves {key}")]
    NoAuthorizedNodes { key: String },

    /// No assignment exists for the key, or it is empty
    #[error("no nodes assigned to {key}")]
    NotFound { key: String },

    /// The selected node is not reported healthy by the catalog
    #[error("node {node_id} is not available")]
    Unavailable { node_id: String },

    /// Store, catalog or retry failure
    #[error("internal error ({reason}): {message}")]
    Internal {
        reason: InternalReason,
        message: String,
    },
}

impl RoutingError {
    pub fn internal(reason: InternalReason, message: impl Into<String>) -> Self {
        Self::Internal {
            reason,
            message: message.into(),
        }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            Self::InvalidArgument(_) => ErrorCode::InvalidArgument,
            Self::PermissionDenied { .. } | Self::NoAuthorizedNodes { .. } => {
                ErrorCode::PermissionDenied
            }
            Self::NotFound { .. } => ErrorCode::NotFound,
            Self::Unavailable { .. } => ErrorCode::Unavailable,
            Self::Internal { .. } => ErrorCode::Internal,
        }
    }

    /// Internal sub-reason, if any.
    pub fn reason(&self) -> Option<InternalReason> {
        match self {
            Self::Internal { reason, .. } => Some(*reason),
            _ => None,
        }
    }

    pub fn is_deadline_exceeded(&self) -> bool {
        self.reason() == Some(InternalReason::DeadlineExceeded)
    }
}

/// Errors from the round-robin selector.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectionError {
    #[error("no candidates to select from for {key}")]
    EmptyCandidateSet { key: String },
}

impl From<SelectionError> for RoutingError {
    fn from(err: SelectionError) -> Self {
        RoutingError::internal(InternalReason::EmptyCandidateSet, err.to_string())
    }
}

/// Stored node list could not be decoded.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    #[error("stored node list is not valid UTF-8")]
    InvalidUtf8,
}

impl From<CodecError> for RoutingError {
    fn from(err: CodecError) -> Self {
        RoutingError::internal(InternalReason::Store, err.to_string())
    }
}
