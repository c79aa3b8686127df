use serde::Serialize;

use crate::model::Selection;

/// Result of a successful `Editor::apply`, `undo` or `redo`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Patch {
    /// Session version after the call. Unchanged for selection-only updates
    /// and no-ops.
    pub version: u64,
    pub selection: Selection,
    pub doc_changed: bool,
}
