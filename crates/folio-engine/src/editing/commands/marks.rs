use super::unchanged;
use crate::editing::query::{cursor_marks, eligible_runs, is_mark_active};
use crate::editing::state::EditorState;
use crate::editing::step::Step;
use crate::editing::transaction::{Draft, EditKind, Transaction};
use crate::error::{EditError, Result};
use crate::model::{BlockKind, Mark, MarkKind, Position, Selection};

fn in_code_block(state: &EditorState) -> bool {
    let head = &state.selection.head;
    state
        .doc
        .textblock(&head.path)
        .is_some_and(|b| b.kind == BlockKind::CodeBlock)
}

/// Pending-mark update for a collapsed cursor.
fn store(state: &EditorState, f: impl FnOnce(&mut crate::model::MarkSet) -> bool) -> Result<Transaction> {
    if in_code_block(state) {
        return Err(EditError::schema(
            &state.selection.head.path,
            "code blocks cannot carry marks",
        ));
    }
    let mut marks = cursor_marks(state);
    if !f(&mut marks) {
        return Err(EditError::schema(
            &state.selection.head.path,
            "mark is excluded by the marks at the cursor",
        ));
    }
    Ok(Transaction {
        stored_marks: Some(marks),
        ..unchanged(state)
    })
}

fn range_step(state: &EditorState, step: Step) -> Result<Transaction> {
    let mut draft = Draft::new(&state.doc);
    draft.push(step)?;
    Ok(draft.finish(state.selection.clone(), None, EditKind::Structural))
}

fn ends(state: &EditorState) -> (Position, Position) {
    (
        state.selection.from().clone(),
        state.selection.to().clone(),
    )
}

fn add_mark(state: &EditorState, mark: &Mark) -> Result<Transaction> {
    mark.validate()?;
    if state.selection.is_collapsed() {
        let mark = mark.clone();
        return store(state, |marks| marks.add(mark));
    }
    if eligible_runs(state, mark.kind()).is_empty() {
        return Err(EditError::schema(
            &state.selection.from().path,
            format!("no text in the selection accepts {}", mark.kind().name()),
        ));
    }
    let (from, to) = ends(state);
    range_step(
        state,
        Step::SetMark {
            from,
            to,
            mark: mark.clone(),
        },
    )
}

fn remove_mark(state: &EditorState, kind: MarkKind) -> Result<Transaction> {
    if state.selection.is_collapsed() {
        return store(state, |marks| {
            marks.remove(kind);
            true
        });
    }
    let (from, to) = ends(state);
    range_step(state, Step::UnsetMark { from, to, kind })
}

/// Uniform toggle: removes the mark when every run already has it,
/// otherwise applies it everywhere. Links and colors match on their value,
/// so toggling a different value replaces the old one.
pub(super) fn toggle_mark(state: &EditorState, mark: &Mark) -> Result<Transaction> {
    let params = matches!(mark, Mark::Link { .. } | Mark::Color { .. }).then_some(mark);
    if is_mark_active(state, mark.kind(), params) {
        remove_mark(state, mark.kind())
    } else {
        add_mark(state, mark)
    }
}

pub(super) fn set_color(state: &EditorState, value: &str) -> Result<Transaction> {
    add_mark(state, &Mark::color(value.trim()))
}

pub(super) fn unset_color(state: &EditorState) -> Result<Transaction> {
    remove_mark(state, MarkKind::Color)
}

/// An empty href removes the link. A collapsed cursor has no text to link,
/// so the command succeeds without changes.
pub(super) fn set_link(state: &EditorState, href: &str) -> Result<Transaction> {
    let href = href.trim();
    if href.is_empty() {
        return unset_link(state);
    }
    if state.selection.is_collapsed() {
        return Ok(unchanged(state));
    }
    add_mark(state, &Mark::link(href))
}

/// On a collapsed cursor inside a link, removes the whole link run.
pub(super) fn unset_link(state: &EditorState) -> Result<Transaction> {
    if !state.selection.is_collapsed() {
        return remove_mark(state, MarkKind::Link);
    }
    let head = &state.selection.head;
    let Some(block) = state.doc.textblock(&head.path) else {
        return Ok(unchanged(state));
    };
    let link = block
        .runs(head.offset.saturating_sub(1), head.offset + 1)
        .into_iter()
        .find_map(|(_, _, marks)| marks.get(MarkKind::Link).cloned());
    let Some((start, end)) = link.and_then(|l| block.mark_extent(head.offset, &l)) else {
        return Ok(unchanged(state));
    };
    let mut draft = Draft::new(&state.doc);
    draft.push(Step::UnsetMark {
        from: Position::new(head.path.clone(), start),
        to: Position::new(head.path.clone(), end),
        kind: MarkKind::Link,
    })?;
    Ok(draft.finish(
        Selection::cursor(head.clone()),
        state.stored_marks.clone(),
        EditKind::Structural,
    ))
}
