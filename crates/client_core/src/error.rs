use std::fmt;

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    Load,
    Create,
    Update,
    Delete,
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Load => "load",
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
        })
    }
}

/// A failed remote operation. The display text is the fixed message shown
/// to the user; the source carries the transport or service cause.
#[derive(Debug, Error)]
pub enum OperationError {
    #[error("Failed to fetch todos")]
    Load { source: anyhow::Error },
    #[error("Failed to add todo")]
    Create { source: anyhow::Error },
    #[error("Failed to update todo")]
    Update { source: anyhow::Error },
    #[error("Failed to delete todo")]
    Delete { source: anyhow::Error },
}

impl OperationError {
    pub fn kind(&self) -> OperationKind {
        match self {
            Self::Load { .. } => OperationKind::Load,
            Self::Create { .. } => OperationKind::Create,
            Self::Update { .. } => OperationKind::Update,
            Self::Delete { .. } => OperationKind::Delete,
        }
    }

    pub fn cause(&self) -> &anyhow::Error {
        match self {
            Self::Load { source }
            | Self::Create { source }
            | Self::Update { source }
            | Self::Delete { source } => source,
        }
    }

    pub fn to_error_state(&self) -> ErrorState {
        ErrorState {
            operation: self.kind(),
            message: self.to_string(),
        }
    }
}

/// The single error banner the list surfaces. It persists until dismissed
/// or replaced by the next failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorState {
    pub operation: OperationKind,
    pub message: String,
}
