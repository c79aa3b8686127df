use super::{blocks, cell_of, common_prefix, lists, unchanged};
use crate::editing::state::EditorState;
use crate::editing::step::Step;
use crate::editing::transaction::{Draft, EditKind, Transaction};
use crate::error::{EditError, Result};
use crate::model::node::{coerce_inline, inline_len, normalize_inline};
use crate::model::{Attrs, Block, BlockKind, MarkSet, Node, Position, Selection, TextNode};

/// Deletes `from..to`, joining the textblocks at either end when they differ.
/// Returns where the cursor lands.
pub(super) fn delete_range(draft: &mut Draft, from: &Position, to: &Position) -> Result<Position> {
    if from == to {
        return Ok(from.clone());
    }
    if from.path == to.path {
        draft.push(Step::DeleteText {
            from: from.clone(),
            to: to.clone(),
        })?;
        return Ok(from.clone());
    }

    let root = draft.root();
    if cell_of(root, &from.path) != cell_of(root, &to.path) {
        return Err(EditError::selection("selection crosses table cells"));
    }
    let prefix = common_prefix(&from.path, &to.path);
    let depth = prefix.len();
    let container = root
        .descendant(&prefix)
        .ok_or_else(|| EditError::selection("selection endpoints do not resolve"))?;
    let (i, j) = (from.path[depth], to.path[depth]);
    let (Some(first), Some(last)) = (container.child_block(i), container.child_block(j)) else {
        return Err(EditError::selection("selection endpoints do not resolve"));
    };

    let mut left = truncate_after(first, &from.path[depth + 1..], from.offset);
    let right = truncate_before(last, &to.path[depth + 1..], to.offset);
    let (tail, rest) = take_first_inline(right);

    let target = left
        .descendant_mut(&from.path[depth + 1..])
        .ok_or_else(|| EditError::selection("selection start is not a textblock"))?;
    let into_code = target.kind == BlockKind::CodeBlock;
    let mut children = std::mem::take(&mut target.children);
    children.extend(coerce_inline(tail, into_code));
    target.children = normalize_inline(children);

    let mut replaced = container.clone();
    let mut children: Vec<Node> = container.children[..i].to_vec();
    children.push(Node::Block(left));
    children.extend(rest.map(Node::Block));
    children.extend(container.children[j + 1..].iter().cloned());
    replaced.children = children;

    draft.push(Step::ReplaceNode {
        path: prefix,
        node: replaced,
    })?;
    Ok(from.clone())
}

/// Keeps `block` up to the position `rel`/`offset` inside it.
fn truncate_after(block: &Block, rel: &[usize], offset: usize) -> Block {
    let mut out = block.clone();
    match rel.split_first() {
        None => out.children = block.slice_inline(0, offset),
        Some((&k, rest)) => {
            out.children.truncate(k + 1);
            if let Some(child) = block.child_block(k) {
                out.children[k] = Node::Block(truncate_after(child, rest, offset));
            }
        }
    }
    out
}

/// Keeps `block` from the position `rel`/`offset` inside it onwards.
fn truncate_before(block: &Block, rel: &[usize], offset: usize) -> Block {
    let mut out = block.clone();
    match rel.split_first() {
        None => out.children = block.slice_inline(offset, block.inline_len()),
        Some((&k, rest)) => {
            out.children.drain(..k);
            if let Some(child) = block.child_block(k) {
                out.children[0] = Node::Block(truncate_before(child, rest, offset));
            }
        }
    }
    out
}

/// Removes the first textblock of `block`, returning its inline content and
/// whatever is left. Containers emptied along the way are dropped.
fn take_first_inline(mut block: Block) -> (Vec<Node>, Option<Block>) {
    if block.is_textblock() {
        return (block.children, None);
    }
    if block.children.is_empty() {
        return (Vec::new(), Some(block));
    }
    match block.children.remove(0) {
        Node::Block(first) if !first.kind.is_leaf() => {
            let (inline, rest) = take_first_inline(first);
            if let Some(rest) = rest {
                block.children.insert(0, Node::Block(rest));
            }
            if block.children.is_empty() {
                (inline, None)
            } else {
                (inline, Some(block))
            }
        }
        other => {
            block.children.insert(0, other);
            (Vec::new(), Some(block))
        }
    }
}

fn textblock_at<'a>(root: &'a Block, pos: &Position) -> Result<&'a Block> {
    root.descendant(&pos.path)
        .filter(|b| b.is_textblock())
        .ok_or_else(|| EditError::selection(format!("{:?} is not a textblock", pos.path)))
}

/// Inline nodes for typed text: newlines become hard breaks outside code.
fn typed_nodes(text: &str, marks: &MarkSet, code: bool) -> Vec<Node> {
    let text = text.replace("\r\n", "\n").replace('\r', "\n");
    if code {
        return vec![Node::text(text)];
    }
    let mut nodes = Vec::new();
    for (i, piece) in text.split('\n').enumerate() {
        if i > 0 {
            nodes.push(Node::hard_break());
        }
        if !piece.is_empty() {
            nodes.push(Node::Text(TextNode {
                text: piece.to_string(),
                marks: marks.clone(),
            }));
        }
    }
    nodes
}

pub(super) fn insert_text(state: &EditorState, text: &str) -> Result<Transaction> {
    let from = state.selection.from().clone();
    let to = state.selection.to().clone();
    if text.is_empty() && from == to {
        return Ok(unchanged(state));
    }

    let mut draft = Draft::new(&state.doc);
    let pos = delete_range(&mut draft, &from, &to)?;
    if text.is_empty() {
        return Ok(draft.finish(Selection::cursor(pos), None, EditKind::Deleting));
    }

    let code = textblock_at(draft.root(), &pos)?.kind == BlockKind::CodeBlock;
    let marks = if code {
        MarkSet::new()
    } else {
        match &state.stored_marks {
            Some(stored) => stored.clone(),
            None => state.doc.resolve(&from)?.marks_at(from.offset),
        }
    };
    let nodes = typed_nodes(text, &marks, code);
    let len = inline_len(&nodes);
    draft.push(Step::InsertText {
        at: pos.clone(),
        nodes,
    })?;

    let cursor = Position::new(pos.path, pos.offset + len);
    Ok(draft.finish(Selection::cursor(cursor), None, EditKind::Typing))
}

pub(super) fn delete_backward(state: &EditorState) -> Result<Transaction> {
    let selection = &state.selection;
    let mut draft = Draft::new(&state.doc);
    if !selection.is_collapsed() {
        let pos = delete_range(&mut draft, selection.from(), selection.to())?;
        return Ok(draft.finish(Selection::cursor(pos), None, EditKind::Deleting));
    }

    let pos = selection.head.clone();
    if pos.offset > 0 {
        let from = Position::new(pos.path.clone(), pos.offset - 1);
        draft.push(Step::DeleteText {
            from: from.clone(),
            to: pos,
        })?;
        return Ok(draft.finish(Selection::cursor(from), None, EditKind::Deleting));
    }
    join_backward(state)
}

/// Backspace at the start of a textblock.
fn join_backward(state: &EditorState) -> Result<Transaction> {
    let root = state.doc.root();
    let path = &state.selection.head.path;
    let Some((&idx, parent_path)) = path.split_last() else {
        return Ok(unchanged(state));
    };
    let Some(parent) = root.descendant(parent_path) else {
        return Ok(unchanged(state));
    };

    if idx == 0 && parent.kind == BlockKind::ListItem {
        let list = parent_path
            .split_last()
            .and_then(|(_, list_path)| root.descendant(list_path));
        if let Some(list) = list {
            let kind = match list.kind {
                BlockKind::OrderedList => super::ListKind::Ordered,
                _ => super::ListKind::Bullet,
            };
            return lists::toggle_list(state, kind);
        }
    }
    if idx == 0 && parent.kind == BlockKind::Blockquote {
        return blocks::toggle_blockquote(state);
    }
    if idx > 0 && parent.child_block(idx - 1).is_some_and(|b| b.kind.is_leaf()) {
        let mut draft = Draft::new(&state.doc);
        draft.push(Step::DeleteNodes {
            parent: parent_path.to_vec(),
            from: idx - 1,
            to: idx,
        })?;
        let mut moved = path.clone();
        if let Some(last) = moved.last_mut() {
            *last -= 1;
        }
        return Ok(draft.finish(
            Selection::cursor(Position::new(moved, 0)),
            None,
            EditKind::Deleting,
        ));
    }

    let paths = root.textblock_paths();
    let Some(k) = paths.iter().position(|p| p == path) else {
        return Ok(unchanged(state));
    };
    if k == 0 || cell_of(root, &paths[k - 1]) != cell_of(root, path) {
        return Ok(unchanged(state));
    }
    let prev_end = state.doc.end_of(&paths[k - 1]);
    let mut draft = Draft::new(&state.doc);
    delete_range(&mut draft, &prev_end, &Position::new(path.clone(), 0))?;
    Ok(draft.finish(Selection::cursor(prev_end), None, EditKind::Deleting))
}

pub(super) fn split_block(state: &EditorState) -> Result<Transaction> {
    let selection = &state.selection;
    let root = state.doc.root();
    let head = &selection.head;

    if selection.is_collapsed()
        && let Some((&0, item_path)) = head.path.split_last()
        && let Some(item) = root.descendant(item_path)
        && item.kind == BlockKind::ListItem
        && item.children.len() == 1
        && textblock_at(root, head)?.inline_len() == 0
    {
        let ordered = item_path
            .split_last()
            .and_then(|(_, list_path)| root.descendant(list_path))
            .is_some_and(|l| l.kind == BlockKind::OrderedList);
        let kind = if ordered {
            super::ListKind::Ordered
        } else {
            super::ListKind::Bullet
        };
        return lists::toggle_list(state, kind);
    }

    let mut draft = Draft::new(&state.doc);
    let pos = delete_range(&mut draft, selection.from(), selection.to())?;
    let block = textblock_at(draft.root(), &pos)?.clone();

    if block.kind == BlockKind::CodeBlock {
        draft.push(Step::InsertText {
            at: pos.clone(),
            nodes: vec![Node::text("\n")],
        })?;
        let cursor = Position::new(pos.path, pos.offset + 1);
        return Ok(draft.finish(Selection::cursor(cursor), None, EditKind::Typing));
    }

    let Some((&idx, parent_path)) = pos.path.split_last() else {
        return Err(EditError::selection("cursor is not inside a textblock"));
    };
    let parent = draft
        .root()
        .descendant(parent_path)
        .cloned()
        .ok_or_else(|| EditError::selection("cursor is not inside a textblock"))?;

    let len = block.inline_len();
    let marks = block.marks_at(pos.offset);
    let first = Block {
        children: block.slice_inline(0, pos.offset),
        ..block.clone()
    };
    let tail = block.slice_inline(pos.offset, len);
    let second = if block.kind == BlockKind::Heading && pos.offset == len {
        Block::new(
            BlockKind::Paragraph,
            Attrs {
                align: block.attrs.align,
                ..Attrs::default()
            },
            tail,
        )
    } else {
        Block {
            children: tail,
            ..block.clone()
        }
    };

    let cursor_path = if parent.kind == BlockKind::ListItem
        && idx == 0
        && let Some((&item_idx, list_path)) = parent_path.split_last()
    {
        let mut head_item = parent.clone();
        head_item.children = vec![Node::Block(first)];
        let mut tail_item = parent.clone();
        tail_item.children = std::iter::once(Node::Block(second))
            .chain(parent.children[1..].iter().cloned())
            .collect();
        draft.push(Step::ReplaceNode {
            path: parent_path.to_vec(),
            node: head_item,
        })?;
        draft.push(Step::InsertNodes {
            parent: list_path.to_vec(),
            index: item_idx + 1,
            nodes: vec![tail_item],
        })?;
        let mut path = list_path.to_vec();
        path.extend([item_idx + 1, 0]);
        path
    } else {
        draft.push(Step::ReplaceNode {
            path: pos.path.clone(),
            node: first,
        })?;
        draft.push(Step::InsertNodes {
            parent: parent_path.to_vec(),
            index: idx + 1,
            nodes: vec![second],
        })?;
        let mut path = parent_path.to_vec();
        path.push(idx + 1);
        path
    };

    let stored = (!marks.is_empty()).then_some(marks);
    Ok(draft.finish(
        Selection::cursor(Position::new(cursor_path, 0)),
        stored,
        EditKind::Structural,
    ))
}

pub(super) fn insert_hard_break(state: &EditorState) -> Result<Transaction> {
    let mut draft = Draft::new(&state.doc);
    let pos = delete_range(&mut draft, state.selection.from(), state.selection.to())?;
    let block = textblock_at(draft.root(), &pos)?;
    let code = block.kind == BlockKind::CodeBlock;
    let marks = if code {
        MarkSet::new()
    } else {
        state
            .stored_marks
            .clone()
            .unwrap_or_else(|| block.marks_at(pos.offset))
    };
    let node = if code {
        Node::text("\n")
    } else {
        Node::hard_break()
    };
    draft.push(Step::InsertText {
        at: pos.clone(),
        nodes: vec![node],
    })?;
    let stored = (!marks.is_empty()).then_some(marks);
    let cursor = Position::new(pos.path, pos.offset + 1);
    Ok(draft.finish(Selection::cursor(cursor), stored, EditKind::Typing))
}

pub(super) fn select_all(state: &EditorState) -> Transaction {
    Transaction {
        steps: Vec::new(),
        selection: Selection::range(state.doc.start(), state.doc.end()),
        stored_marks: None,
        kind: EditKind::Structural,
    }
}

#[cfg(test)]
mod tests {
    use crate::editing::Cmd;
    use crate::model::{Mark, MarkKind, Node, Position};
    use crate::tests::*;
    use pretty_assertions::assert_eq;

    fn insert(text: &str) -> Cmd {
        Cmd::InsertText { text: text.into() }
    }

    #[test]
    fn typing_into_empty_heading() {
        let state = cursor_state(vec![h(2, "")], &[0], 0);
        let state = run(&run(&state, insert("H")), insert("i"));
        assert_eq!(state.doc, doc(vec![h(2, "Hi")]));
        assert_eq!(state.selection.head, at(&[0], 2));
    }

    #[test]
    fn typing_inherits_marks_before_cursor() {
        let state = cursor_state(
            vec![para(vec![Node::marked("bo", [Mark::Bold]), Node::text("x")])],
            &[0],
            2,
        );
        let state = run(&state, insert("ld"));
        assert_eq!(
            state.doc,
            doc(vec![para(vec![
                Node::marked("bold", [Mark::Bold]),
                Node::text("x")
            ])])
        );
    }

    #[test]
    fn typing_after_link_is_not_linked() {
        let state = cursor_state(
            vec![para(vec![Node::marked("site", [Mark::link("https://a.example")])])],
            &[0],
            4,
        );
        let state = run(&state, insert("!"));
        let block = state.doc.block(&[0]).unwrap();
        assert!(!block.marks_at(5).has_kind(MarkKind::Link));
        assert_eq!(block.text(), "site!");
    }

    #[test]
    fn typing_newline_inserts_hard_break() {
        let state = cursor_state(vec![p("ab")], &[0], 1);
        let state = run(&state, insert("\n"));
        assert_eq!(
            state.doc,
            doc(vec![para(vec![Node::text("a"), Node::hard_break(), Node::text("b")])])
        );
        assert_eq!(state.selection.head, at(&[0], 2));
    }

    #[test]
    fn typing_replaces_range_across_blocks() {
        let state = range_state(vec![p("hello"), p("big"), p("world")], (&[0], 2), (&[2], 3));
        let state = run(&state, insert("-"));
        assert_eq!(state.doc, doc(vec![p("he-ld")]));
        assert_eq!(state.selection.head, at(&[0], 3));
    }

    #[test]
    fn delete_range_from_paragraph_into_list_keeps_later_items() {
        let state = range_state(
            vec![p("intro"), ul(vec![li(vec![p("one")]), li(vec![p("two")])])],
            (&[0], 2),
            (&[1, 0, 0], 1),
        );
        let state = run(&state, Cmd::DeleteBackward);
        assert_eq!(
            state.doc,
            doc(vec![p("inne"), ul(vec![li(vec![p("two")])])])
        );
    }

    #[test]
    fn delete_across_cells_is_rejected() {
        let state = range_state(
            vec![table(vec![tr(vec![td("a"), td("b")])])],
            (&[0, 0, 0, 0], 0),
            (&[0, 0, 1, 0], 1),
        );
        assert!(try_run(&state, Cmd::DeleteBackward).is_err());
    }

    #[test]
    fn backspace_joins_paragraphs() {
        let state = cursor_state(vec![p("ab"), p("cd")], &[1], 0);
        let state = run(&state, Cmd::DeleteBackward);
        assert_eq!(state.doc, doc(vec![p("abcd")]));
        assert_eq!(state.selection.head, at(&[0], 2));
    }

    #[test]
    fn backspace_at_document_start_does_nothing() {
        let state = cursor_state(vec![p("ab")], &[0], 0);
        assert_eq!(run(&state, Cmd::DeleteBackward), state);
    }

    #[test]
    fn backspace_removes_rule_before_paragraph() {
        let state = cursor_state(vec![p("a"), hr(), p("b")], &[2], 0);
        let state = run(&state, Cmd::DeleteBackward);
        assert_eq!(state.doc, doc(vec![p("a"), p("b")]));
        assert_eq!(state.selection.head, at(&[1], 0));
    }

    #[test]
    fn backspace_in_first_list_paragraph_lifts_item() {
        let state = cursor_state(vec![ul(vec![li(vec![p("a")])])], &[0, 0, 0], 0);
        let state = run(&state, Cmd::DeleteBackward);
        assert_eq!(state.doc, doc(vec![p("a")]));
    }

    #[test]
    fn split_heading_at_end_starts_paragraph() {
        let state = cursor_state(vec![h(1, "Title")], &[0], 5);
        let state = run(&state, Cmd::SplitBlock);
        assert_eq!(state.doc, doc(vec![h(1, "Title"), p("")]));
        assert_eq!(state.selection.head, at(&[1], 0));
    }

    #[test]
    fn split_paragraph_keeps_marks_pending() {
        let state = cursor_state(vec![para(vec![Node::marked("ab", [Mark::Bold])])], &[0], 1);
        let state = run(&state, Cmd::SplitBlock);
        assert_eq!(
            state.doc,
            doc(vec![
                para(vec![Node::marked("a", [Mark::Bold])]),
                para(vec![Node::marked("b", [Mark::Bold])]),
            ])
        );
        assert!(state.stored_marks.unwrap().has_kind(MarkKind::Bold));
    }

    #[test]
    fn split_list_item() {
        let state = cursor_state(vec![ul(vec![li(vec![p("onetwo")])])], &[0, 0, 0], 3);
        let state = run(&state, Cmd::SplitBlock);
        assert_eq!(
            state.doc,
            doc(vec![ul(vec![li(vec![p("one")]), li(vec![p("two")])])])
        );
        assert_eq!(state.selection.head, at(&[0, 1, 0], 0));
    }

    #[test]
    fn enter_in_empty_last_item_leaves_list() {
        let state = cursor_state(
            vec![ul(vec![li(vec![p("one")]), li(vec![p("")])])],
            &[0, 1, 0],
            0,
        );
        let state = run(&state, Cmd::SplitBlock);
        assert_eq!(state.doc, doc(vec![ul(vec![li(vec![p("one")])]), p("")]));
        assert_eq!(state.selection.head, at(&[1], 0));
    }

    #[test]
    fn enter_in_code_block_inserts_newline() {
        let state = cursor_state(vec![code("ab")], &[0], 1);
        let state = run(&state, Cmd::SplitBlock);
        assert_eq!(state.doc, doc(vec![code("a\nb")]));
    }

    #[test]
    fn select_all_spans_document() {
        let state = cursor_state(vec![p("a"), p("bc")], &[0], 0);
        let state = run(&state, Cmd::SelectAll);
        assert_eq!(state.selection.anchor, Position::new([0], 0));
        assert_eq!(state.selection.head, Position::new([1], 2));
    }
}
