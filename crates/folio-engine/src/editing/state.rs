use super::transaction::Transaction;
use crate::error::Result;
use crate::model::{Document, MarkSet, Selection};

/// Document, selection and pending marks of a session at one version.
#[derive(Debug, Clone, PartialEq)]
pub struct EditorState {
    pub doc: Document,
    pub selection: Selection,
    /// Marks the next typed text receives, overriding the marks at the cursor.
    pub stored_marks: Option<MarkSet>,
}

impl EditorState {
    /// State with the cursor at the start of `doc`.
    pub fn new(doc: Document) -> Self {
        let selection = Selection::cursor(doc.start());
        EditorState {
            doc,
            selection,
            stored_marks: None,
        }
    }

    pub fn apply(&self, tr: &Transaction) -> Result<EditorState> {
        let doc = if tr.is_empty() {
            self.doc.check_selection(&tr.selection)?;
            self.doc.clone()
        } else {
            self.doc.apply(tr)?
        };
        Ok(EditorState {
            doc,
            selection: tr.selection.clone(),
            stored_marks: tr.stored_marks.clone(),
        })
    }
}

impl Default for EditorState {
    fn default() -> Self {
        EditorState::new(Document::new())
    }
}
