//! Read-only questions a toolbar asks about the current state.

use super::state::EditorState;
use crate::model::{Align, Attrs, BlockKind, Mark, MarkKind, MarkSet};

/// Marks that apply at a collapsed cursor: pending marks if any, otherwise
/// the marks a typed character would inherit.
pub fn cursor_marks(state: &EditorState) -> MarkSet {
    if let Some(stored) = &state.stored_marks {
        return stored.clone();
    }
    let head = &state.selection.head;
    match state.doc.textblock(&head.path) {
        Some(block) if block.kind != BlockKind::CodeBlock => block.marks_at(head.offset),
        _ => MarkSet::new(),
    }
}

fn matches(marks: &MarkSet, kind: MarkKind, mark: Option<&Mark>) -> bool {
    match mark {
        Some(mark) => marks.contains(mark),
        None => marks.has_kind(kind),
    }
}

/// Every text run in the selection that could carry a mark of `kind`
/// (code blocks and runs whose marks exclude it are skipped).
pub(crate) fn eligible_runs(state: &EditorState, kind: MarkKind) -> Vec<MarkSet> {
    let sel = &state.selection;
    let mut out = Vec::new();
    for (path, start, end) in state.doc.textblocks_between(sel.from(), sel.to()) {
        let Some(block) = state.doc.block(&path) else {
            continue;
        };
        if block.kind == BlockKind::CodeBlock {
            continue;
        }
        for (_, _, marks) in block.runs(start, end) {
            if marks.allows(kind) {
                out.push(marks.clone());
            }
        }
    }
    out
}

/// True when every text run in the selection carries the mark.
///
/// With `mark` given, parameters must match too; otherwise any mark of
/// `kind` counts. A collapsed cursor looks at pending marks, else the marks
/// at the cursor.
pub fn is_mark_active(state: &EditorState, kind: MarkKind, mark: Option<&Mark>) -> bool {
    if state.selection.is_collapsed() {
        return matches(&cursor_marks(state), kind, mark);
    }
    let runs = eligible_runs(state, kind);
    !runs.is_empty() && runs.iter().all(|m| matches(m, kind, mark))
}

/// True when every textblock in the selection is, or sits inside, a block of
/// `kind` whose attributes match `pattern`.
pub fn is_block_active(state: &EditorState, kind: BlockKind, pattern: &Attrs) -> bool {
    let sel = &state.selection;
    let blocks = state.doc.textblocks_between(sel.from(), sel.to());
    !blocks.is_empty()
        && blocks.iter().all(|(path, _, _)| {
            (0..=path.len()).any(|depth| {
                state
                    .doc
                    .block(&path[..depth])
                    .is_some_and(|b| b.kind == kind && b.attrs.matches(pattern))
            })
        })
}

/// True when every aligned textblock in the selection uses `align`.
/// Unset alignment counts as left.
pub fn is_align_active(state: &EditorState, align: Align) -> bool {
    let sel = &state.selection;
    let aligns: Vec<Align> = state
        .doc
        .textblocks_between(sel.from(), sel.to())
        .iter()
        .filter_map(|(path, _, _)| state.doc.block(path))
        .filter(|b| matches!(b.kind, BlockKind::Paragraph | BlockKind::Heading))
        .map(|b| b.attrs.align.unwrap_or_default())
        .collect();
    !aligns.is_empty() && aligns.iter().all(|a| *a == align)
}
