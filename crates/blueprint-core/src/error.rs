use thiserror::Error;

// ---------------------------------------------------------------------------
// ErrorKind
// ---------------------------------------------------------------------------

/// Coarse classification of a [`BlueprintError`], shared with outer layers
/// that translate failures into transport status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Tracking data could not be shaped into the expected payload.
    PayloadResolver,
    /// Any other resolution-stage failure. Terminal for the attempt.
    ActionResolver,
    /// Declared field type disagrees with the payload's actual type.
    SchemaMismatch,
    /// A downstream store or lookup is temporarily unreachable.
    Unavailable,
    Internal,
}

// ---------------------------------------------------------------------------
// BlueprintError
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum BlueprintError {
    #[error("payload resolution failed: {0}")]
    Payload(String),

    #[error("condition not met for action {action_id}")]
    ConditionNotMet { action_id: u32 },

    #[error("invalid condition on action {action_id}: {reason}")]
    InvalidCondition { action_id: u32, reason: String },

    #[error("action {action_id} could not be found in blueprint {blueprint}")]
    ActionNotFound { blueprint: String, action_id: u32 },

    #[error("blueprint not found: {0}")]
    BlueprintNotFound(String),

    #[error("participant with id '{0}' could not be found in the blueprint")]
    ParticipantNotFound(String),

    #[error("invalid transaction reference '{0}'")]
    InvalidTransactionId(String),

    #[error("{0} must not be blank")]
    BlankIdentity(String),

    #[error("previous transaction not found: {0}")]
    PreviousTransactionNotFound(String),

    #[error("field '{field}' declared as {expected} but payload holds {actual}")]
    SchemaMismatch {
        field: String,
        expected: String,
        actual: String,
    },

    #[error("{service} unavailable: {message}")]
    Unavailable { service: String, message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl BlueprintError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            BlueprintError::Payload(_) => ErrorKind::PayloadResolver,
            BlueprintError::ConditionNotMet { .. }
            | BlueprintError::InvalidCondition { .. }
            | BlueprintError::ActionNotFound { .. }
            | BlueprintError::BlueprintNotFound(_)
            | BlueprintError::ParticipantNotFound(_)
            | BlueprintError::InvalidTransactionId(_)
            | BlueprintError::BlankIdentity(_)
            | BlueprintError::PreviousTransactionNotFound(_) => ErrorKind::ActionResolver,
            BlueprintError::SchemaMismatch { .. } => ErrorKind::SchemaMismatch,
            BlueprintError::Unavailable { .. } => ErrorKind::Unavailable,
            BlueprintError::Io(_) | BlueprintError::Yaml(_) | BlueprintError::Json(_) => {
                ErrorKind::Internal
            }
        }
    }

    /// Recommended HTTP status for this failure. The mapping itself is
    /// performed by whichever layer owns the transport.
    pub fn status_hint(&self) -> u16 {
        match self {
            BlueprintError::Payload(_)
            | BlueprintError::InvalidTransactionId(_)
            | BlueprintError::BlankIdentity(_) => 400,
            BlueprintError::ActionNotFound { .. }
            | BlueprintError::BlueprintNotFound(_)
            | BlueprintError::ParticipantNotFound(_)
            | BlueprintError::PreviousTransactionNotFound(_) => 404,
            BlueprintError::ConditionNotMet { .. } => 409,
            BlueprintError::InvalidCondition { .. } | BlueprintError::SchemaMismatch { .. } => 422,
            BlueprintError::Unavailable { .. } => 503,
            BlueprintError::Io(_) | BlueprintError::Yaml(_) | BlueprintError::Json(_) => 500,
        }
    }
}

pub type Result<T> = std::result::Result<T, BlueprintError>;

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
