//! Outcome and failure values returned to the view layer.
//!
//! # Design
//! - Remote and validation failures become a [`Failure`] whose `message` is
//!   ready to display; callers never inspect error internals.
//! - A mutation ends in exactly one [`MutationOutcome`]: committed, rolled back
//!   after an optimistic change, or rejected before anything was applied.

use std::fmt::{self, Display, Formatter};

use crate::error::ValidationError;
use crate::remote::RemoteError;

/// Operation a failure or outcome refers to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Operation {
    /// List a collection.
    List,
    /// Create an entity.
    Create,
    /// Update an entity.
    Update,
    /// Delete an entity.
    Delete,
    /// Delete several entities.
    BatchDelete,
    /// Flip or set an entity's status.
    StatusToggle,
    /// Check an entity's connectivity.
    Test,
    /// Start a collection refresh job.
    Refresh,
    /// List a market's tools.
    ListTools,
    /// Load one market tool.
    LoadTool,
    /// Load several market tools.
    BatchLoadTools,
}

impl Operation {
    /// Stable identifier used in logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::List => "list",
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::BatchDelete => "batch_delete",
            Self::StatusToggle => "status_toggle",
            Self::Test => "test",
            Self::Refresh => "refresh",
            Self::ListTools => "list_tools",
            Self::LoadTool => "load_tool",
            Self::BatchLoadTools => "batch_load_tools",
        }
    }

    /// Message shown when neither the server nor the transport supplied one.
    #[must_use]
    pub const fn default_failure(self) -> &'static str {
        match self {
            Self::List => "failed to load records",
            Self::Create => "failed to create record",
            Self::Update => "failed to update record",
            Self::Delete => "failed to delete record",
            Self::BatchDelete => "failed to delete selected records",
            Self::StatusToggle => "failed to change status",
            Self::Test => "connection test failed",
            Self::Refresh => "failed to start refresh",
            Self::ListTools => "failed to load market tools",
            Self::LoadTool => "failed to load tool",
            Self::BatchLoadTools => "failed to load selected tools",
        }
    }

    /// Message shown on success when the server did not supply one.
    #[must_use]
    pub const fn default_success(self) -> &'static str {
        match self {
            Self::List | Self::ListTools => "loaded",
            Self::Create => "created",
            Self::Update => "updated",
            Self::Delete => "deleted",
            Self::BatchDelete => "selected records deleted",
            Self::StatusToggle => "status updated",
            Self::Test => "connection test succeeded",
            Self::Refresh => "refresh started",
            Self::LoadTool => "tool loaded",
            Self::BatchLoadTools => "selected tools loaded",
        }
    }
}

impl Display for Operation {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Failure taxonomy exposed to callers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FailureKind {
    /// Network or HTTP failure before a body was parsed.
    Transport,
    /// Well-formed response with `success: false`.
    Application,
    /// Local input rejected before any call.
    Validation,
}

/// Displayable failure descriptor.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Failure {
    /// Failure class.
    pub kind: FailureKind,
    /// Operation that failed.
    pub operation: Operation,
    /// Message ready to show to the user.
    pub message: String,
}

impl Failure {
    /// Failure from a transport error, defaulting the message from the status.
    #[must_use]
    pub fn transport(operation: Operation, error: &RemoteError) -> Self {
        Self {
            kind: FailureKind::Transport,
            operation,
            message: error
                .display_message()
                .unwrap_or_else(|| operation.default_failure().to_string()),
        }
    }

    /// Failure from a `success: false` envelope.
    #[must_use]
    pub fn application(operation: Operation, message: Option<String>) -> Self {
        Self {
            kind: FailureKind::Application,
            operation,
            message: message
                .filter(|text| !text.trim().is_empty())
                .unwrap_or_else(|| operation.default_failure().to_string()),
        }
    }

    /// Failure from rejected local input.
    #[must_use]
    pub fn validation(operation: Operation, error: &ValidationError) -> Self {
        Self {
            kind: FailureKind::Validation,
            operation,
            message: error.to_string(),
        }
    }
}

impl Display for Failure {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str(&self.message)
    }
}

impl std::error::Error for Failure {}

/// Terminal state of one mutation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MutationOutcome<T> {
    /// The backend confirmed the change.
    Committed {
        /// Server-returned payload.
        payload: T,
        /// Displayable confirmation.
        message: String,
    },
    /// The backend refused or was unreachable; the prior snapshot is restored.
    RolledBack(Failure),
    /// Input was invalid; nothing was applied or sent.
    Rejected(Failure),
}

impl<T> MutationOutcome<T> {
    /// Committed outcome with the server message or the operation default.
    #[must_use]
    pub fn committed(operation: Operation, payload: T, message: Option<String>) -> Self {
        Self::Committed {
            payload,
            message: message
                .filter(|text| !text.trim().is_empty())
                .unwrap_or_else(|| operation.default_success().to_string()),
        }
    }

    /// Whether the backend confirmed the change.
    #[must_use]
    pub const fn is_committed(&self) -> bool {
        matches!(self, Self::Committed { .. })
    }

    /// Failure of a rolled back or rejected mutation.
    #[must_use]
    pub const fn failure(&self) -> Option<&Failure> {
        match self {
            Self::Committed { .. } => None,
            Self::RolledBack(failure) | Self::Rejected(failure) => Some(failure),
        }
    }

    /// Convert into a `Result`, keeping only the payload and the failure.
    ///
    /// # Errors
    ///
    /// Returns the [`Failure`] of a rolled back or rejected mutation.
    pub fn into_result(self) -> Result<(T, String), Failure> {
        match self {
            Self::Committed { payload, message } => Ok((payload, message)),
            Self::RolledBack(failure) | Self::Rejected(failure) => Err(failure),
        }
    }
}
