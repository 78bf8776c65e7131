use crate::persist::Collection;
use thiserror::Error;

/// Failures a store mutation can report back to its caller.
///
/// Unknown ids on update/delete are not errors; they are silent no-ops.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The value points at a parent record that does not exist.
    #[error("{kind} not found: {id}")]
    MissingParent { kind: &'static str, id: String },

    /// A record with the same id is already stored.
    #[error("duplicate {kind} id: {id}")]
    DuplicateId { kind: &'static str, id: String },

    /// A submission already exists for this student and assignment.
    #[error("student {student_id} already has a submission for assignment {assignment_id}")]
    DuplicateSubmission {
        student_id: String,
        assignment_id: String,
    },

    #[error("final grade must be a finite number, got {0}")]
    InvalidGrade(f64),

    /// An image path or submission id that does not name a file inside the
    /// submission's own image directory.
    #[error("invalid image path for submission {submission_id}: {path}")]
    InvalidImagePath { submission_id: String, path: String },

    /// The in-memory change was applied but could not be written to disk.
    #[error("failed to persist {collection}: {message}")]
    Persist {
        collection: Collection,
        message: String,
    },
}

impl StoreError {
    /// Short machine-readable code, used by the sidecar error envelope.
    pub fn code(&self) -> &'static str {
        match self {
            StoreError::MissingParent { .. } => "invalid_reference",
            StoreError::DuplicateId { .. } | StoreError::DuplicateSubmission { .. } => "conflict",
            StoreError::InvalidGrade(_) | StoreError::InvalidImagePath { .. } => "bad_params",
            StoreError::Persist { .. } => "persist_failed",
        }
    }
}
