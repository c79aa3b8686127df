use serde::{Deserialize, Serialize};

use super::step::Step;
use crate::error::Result;
use crate::model::{Block, Document, MarkSet, Selection};

/// How the history manager treats a transaction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EditKind {
    /// Text typed at the cursor; consecutive typing coalesces.
    Typing,
    /// Single-unit backward deletes; consecutive deletes coalesce.
    Deleting,
    /// Everything else. Always its own undo step.
    #[default]
    Structural,
}

/// An atomic edit: steps plus the selection and pending marks that result.
///
/// Applying the same transaction to the same document always produces the
/// same result, so transactions can be stored and replayed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub steps: Vec<Step>,
    pub selection: Selection,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stored_marks: Option<MarkSet>,
    #[serde(default)]
    pub kind: EditKind,
}

impl Transaction {
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

/// Working tree used while a command builds its transaction. Each pushed step
/// is applied immediately so later steps can be computed against its result.
pub(crate) struct Draft {
    root: Block,
    steps: Vec<Step>,
}

impl Draft {
    pub fn new(doc: &Document) -> Self {
        Draft {
            root: doc.root().clone(),
            steps: Vec::new(),
        }
    }

    pub fn root(&self) -> &Block {
        &self.root
    }

    pub fn push(&mut self, step: Step) -> Result<()> {
        step.apply(&mut self.root)?;
        self.steps.push(step);
        Ok(())
    }

    pub fn finish(
        self,
        selection: Selection,
        stored_marks: Option<MarkSet>,
        kind: EditKind,
    ) -> Transaction {
        Transaction {
            steps: self.steps,
            selection,
            stored_marks,
            kind,
        }
    }
}
