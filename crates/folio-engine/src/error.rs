/// Errors returned by the document model and the command engine.
///
/// Every error is local and recoverable: the session that produced it is left
/// exactly as it was before the failing call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EditError {
    #[error("schema violation at {path:?}: {reason}")]
    SchemaViolation { path: Vec<usize>, reason: String },
    #[error("invalid selection: {0}")]
    InvalidSelection(String),
    #[error("selection is not inside a table")]
    NoTableContext,
    #[error("could not deserialize document: {0}")]
    Deserialization(String),
    #[error("nothing to undo")]
    NothingToUndo,
    #[error("nothing to redo")]
    NothingToRedo,
}

impl EditError {
    pub(crate) fn schema(path: &[usize], reason: impl Into<String>) -> Self {
        EditError::SchemaViolation {
            path: path.to_vec(),
            reason: reason.into(),
        }
    }

    pub(crate) fn selection(reason: impl Into<String>) -> Self {
        EditError::InvalidSelection(reason.into())
    }
}

pub type Result<T, E = EditError> = std::result::Result<T, E>;
