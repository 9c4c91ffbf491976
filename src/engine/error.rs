use ulid::Ulid;

use crate::model::Conflict;

/// Caller-facing error category, stable on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    NotFound,
    InvalidRange,
    Conflict,
    InvalidState,
    Storage,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::Validation => "validation_error",
            ErrorKind::NotFound => "not_found",
            ErrorKind::InvalidRange => "invalid_range",
            ErrorKind::Conflict => "conflict",
            ErrorKind::InvalidState => "invalid_state",
            ErrorKind::Storage => "storage_error",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: Ulid },
    #[error("invalid range: start {start} must be before end {end}")]
    InvalidRange { start: String, end: String },
    #[error("scheduling conflict: {}", join_messages(.0))]
    Conflict(Vec<Conflict>),
    #[error("availability overlaps existing availability {existing} on day {day_of_week} ({window})")]
    OverlappingAvailability {
        existing: Ulid,
        day_of_week: u8,
        window: String,
    },
    #[error("availability {id} has {count} upcoming booking(s)")]
    AvailabilityInUse { id: Ulid, count: usize },
    #[error("cannot {action} {entity} {id}: status is {status}")]
    InvalidState {
        entity: &'static str,
        id: Ulid,
        status: &'static str,
        action: &'static str,
    },
    #[error("limit exceeded: {0}")]
    LimitExceeded(&'static str),
    #[error("WAL error: {0}")]
    WalError(String),
}

fn join_messages(conflicts: &[Conflict]) -> String {
    conflicts
        .iter()
        .map(|c| c.message.as_str())
        .collect::<Vec<_>>()
        .join("; ")
}

impl EngineError {
    pub fn not_found(entity: &'static str, id: Ulid) -> Self {
        EngineError::NotFound { entity, id }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            EngineError::Validation(_) | EngineError::LimitExceeded(_) => ErrorKind::Validation,
            EngineError::NotFound { .. } => ErrorKind::NotFound,
            EngineError::InvalidRange { .. } => ErrorKind::InvalidRange,
            EngineError::Conflict(_)
            | EngineError::OverlappingAvailability { .. }
            | EngineError::AvailabilityInUse { .. } => ErrorKind::Conflict,
            EngineError::InvalidState { .. } => ErrorKind::InvalidState,
            EngineError::WalError(_) => ErrorKind::Storage,
        }
    }

    /// Structured scheduling conflicts, if this is one.
    pub fn conflicts(&self) -> Option<&[Conflict]> {
        match self {
            EngineError::Conflict(c) => Some(c),
            _ => None,
        }
    }
}
