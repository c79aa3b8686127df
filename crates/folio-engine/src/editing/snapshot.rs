//! Toolbar state view.
//!
//! A `Snapshot` answers every question a formatting toolbar asks in one
//! serializable value, so a frontend can re-render its buttons after each
//! change without issuing a query per button.

use serde::Serialize;

use super::history::History;
use super::query::{cursor_marks, eligible_runs, is_align_active, is_block_active, is_mark_active};
use super::state::EditorState;
use crate::model::{Align, Attrs, BlockKind, Mark, MarkKind};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub version: u64,
    pub can_undo: bool,
    pub can_redo: bool,
    pub marks: ActiveMarks,
    pub blocks: ActiveBlocks,
    /// Alignment shared by every paragraph and heading in the selection.
    pub align: Option<Align>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveMarks {
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
    pub strike: bool,
    pub code: bool,
    /// Href when the whole selection carries the same link.
    pub link: Option<String>,
    pub color: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveBlocks {
    pub paragraph: bool,
    pub heading: Option<u8>,
    pub bullet_list: bool,
    pub ordered_list: bool,
    pub blockquote: bool,
    pub code_block: bool,
    pub table: bool,
}

/// The mark of `kind` when the selection carries exactly one value of it.
fn uniform_mark(state: &EditorState, kind: MarkKind) -> Option<Mark> {
    if state.selection.is_collapsed() {
        return cursor_marks(state).get(kind).cloned();
    }
    let runs = eligible_runs(state, kind);
    let first = runs.first()?.get(kind)?;
    runs.iter()
        .all(|marks| marks.get(kind) == Some(first))
        .then(|| first.clone())
}

impl ActiveMarks {
    fn capture(state: &EditorState) -> Self {
        let active = |kind| is_mark_active(state, kind, None);
        ActiveMarks {
            bold: active(MarkKind::Bold),
            italic: active(MarkKind::Italic),
            underline: active(MarkKind::Underline),
            strike: active(MarkKind::Strike),
            code: active(MarkKind::Code),
            link: match uniform_mark(state, MarkKind::Link) {
                Some(Mark::Link { href }) => Some(href),
                _ => None,
            },
            color: match uniform_mark(state, MarkKind::Color) {
                Some(Mark::Color { value }) => Some(value),
                _ => None,
            },
        }
    }
}

impl ActiveBlocks {
    fn capture(state: &EditorState) -> Self {
        let plain = Attrs::default();
        let active = |kind| is_block_active(state, kind, &plain);
        ActiveBlocks {
            paragraph: active(BlockKind::Paragraph),
            heading: (1..=6).find(|&level| {
                is_block_active(state, BlockKind::Heading, &Attrs::heading(level))
            }),
            bullet_list: active(BlockKind::BulletList),
            ordered_list: active(BlockKind::OrderedList),
            blockquote: active(BlockKind::Blockquote),
            code_block: active(BlockKind::CodeBlock),
            table: active(BlockKind::Table),
        }
    }
}

impl Snapshot {
    pub fn capture(state: &EditorState, version: u64, history: &History) -> Self {
        Snapshot {
            version,
            can_undo: history.can_undo(),
            can_redo: history.can_redo(),
            marks: ActiveMarks::capture(state),
            blocks: ActiveBlocks::capture(state),
            align: [Align::Left, Align::Center, Align::Right, Align::Justify]
                .into_iter()
                .find(|&align| is_align_active(state, align)),
        }
    }
}
