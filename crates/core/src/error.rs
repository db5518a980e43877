use crate::store::StoreError;
use triage_types::{AssessmentId, PatientId, ProtocolId, QueueEntryId, TextError, UserId};

/// Coarse classification of a [`TriageError`].
///
/// Callers branch on the kind rather than on individual variants: every kind except `Fatal` is
/// an expected outcome that leaves the engine untouched.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Authorization,
    NotFound,
    InvalidState,
    Validation,
    Fatal,
}

#[derive(Debug, thiserror::Error)]
pub enum TriageError {
    #[error("user {0} is not authorised to perform triage")]
    Unauthorised(UserId),

    #[error("patient {0} not found")]
    PatientNotFound(PatientId),
    #[error("assessment {0} not found")]
    AssessmentNotFound(AssessmentId),
    #[error("queue entry {0} not found")]
    QueueEntryNotFound(QueueEntryId),
    #[error("protocol {0} not found")]
    ProtocolNotFound(ProtocolId),

    #[error("assessment {0} is closed")]
    AssessmentClosed(AssessmentId),
    #[error("assessment {0} is already completed")]
    AssessmentAlreadyCompleted(AssessmentId),
    #[error("assessment {0} was cancelled")]
    AssessmentCancelled(AssessmentId),
    #[error("assessment {assessment_id} already has active queue entry {entry_id}")]
    ActiveQueueEntryExists {
        assessment_id: AssessmentId,
        entry_id: QueueEntryId,
    },
    #[error("queue entry {0} is already completed")]
    QueueEntryClosed(QueueEntryId),
    #[error("queue entry {id} cannot move from {from} to {to}")]
    InvalidQueueTransition {
        id: QueueEntryId,
        from: &'static str,
        to: &'static str,
    },
    #[error("protocol {id} is not applicable: {reason}")]
    ProtocolNotApplicable { id: ProtocolId, reason: String },
    #[error("protocol {protocol_id} is already applied to assessment {assessment_id}")]
    ProtocolAlreadyApplied {
        assessment_id: AssessmentId,
        protocol_id: ProtocolId,
    },

    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("invalid vital signs: {0}")]
    InvalidVitalSigns(String),
    #[error("invalid text: {0}")]
    InvalidText(#[from] TextError),
    #[error("protocol catalog schema mismatch at {path}: {message}")]
    CatalogSchema { path: String, message: String },

    #[error("failed to read file: {0}")]
    FileRead(std::io::Error),
    #[error("storage error: {0}")]
    Storage(#[from] StoreError),
    #[error("internal invariant violated: {0}")]
    Invariant(String),
}

impl TriageError {
    /// Returns the taxonomy bucket for this error.
    pub fn kind(&self) -> ErrorKind {
        use TriageError::*;
        match self {
            Unauthorised(_) => ErrorKind::Authorization,
            PatientNotFound(_)
            | AssessmentNotFound(_)
            | QueueEntryNotFound(_)
            | ProtocolNotFound(_) => ErrorKind::NotFound,
            AssessmentClosed(_)
            | AssessmentAlreadyCompleted(_)
            | AssessmentCancelled(_)
            | ActiveQueueEntryExists { .. }
            | QueueEntryClosed(_)
            | InvalidQueueTransition { .. }
            | ProtocolNotApplicable { .. }
            | ProtocolAlreadyApplied { .. } => ErrorKind::InvalidState,
            InvalidInput(_) | InvalidVitalSigns(_) | InvalidText(_) | CatalogSchema { .. } => {
                ErrorKind::Validation
            }
            FileRead(_) | Storage(_) | Invariant(_) => ErrorKind::Fatal,
        }
    }

    /// True for faults the caller should log and abort on.
    pub fn is_fatal(&self) -> bool {
        self.kind() == ErrorKind::Fatal
    }
}

pub type TriageResult<T> = std::result::Result<T, TriageError>;
