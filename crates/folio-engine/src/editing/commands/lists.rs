use super::blocks::{block_range, replace_container};
use super::{ListKind, cell_of, common_prefix, enclosing};
use crate::editing::state::EditorState;
use crate::editing::transaction::Transaction;
use crate::error::{EditError, Result};
use crate::model::{Attrs, Block, BlockKind, Node};

/// Joins the list at `index` with same-kind lists directly before and after it.
fn merge_adjacent(children: &mut Vec<Node>, index: usize, kind: BlockKind) {
    if index + 1 < children.len() && children[index + 1].kind() == Some(kind) {
        let next = children.remove(index + 1);
        if let (Node::Block(next), Some(Node::Block(current))) = (next, children.get_mut(index)) {
            current.children.extend(next.children);
        }
    }
    if index > 0 && children[index - 1].kind() == Some(kind) {
        let current = children.remove(index);
        if let (Node::Block(current), Some(Node::Block(prev))) = (current, children.get_mut(index - 1))
        {
            prev.children.extend(current.children);
        }
    }
}

/// Wraps, unwraps or retargets lists around the selection.
///
/// Inside a list of the same kind the selected items are lifted out and the
/// list splits around them. Inside a list of the other kind that list is
/// converted. Otherwise the selected blocks are wrapped, absorbing any lists
/// among them, and the result merges with neighbouring lists of the same kind.
pub(super) fn toggle_list(state: &EditorState, kind: ListKind) -> Result<Transaction> {
    let root = state.doc.root();
    let (from, to) = (&state.selection.from().path, &state.selection.to().path);
    if cell_of(root, from) != cell_of(root, to) {
        return Err(EditError::selection("lists cannot span table cells"));
    }
    let list_kind = kind.block_kind();
    let shared = common_prefix(from, to);

    if let Some(list_path) = enclosing(root, &shared, BlockKind::is_list)
        && let Some((&index, parent_path)) = list_path.split_last()
        && let Some(parent) = root.descendant(parent_path)
        && let Some(list) = parent.child_block(index)
    {
        let mut rebuilt = parent.clone();
        if list.kind == list_kind {
            let depth = list_path.len();
            let (i1, i2) = (from[depth], to[depth]);
            let mut replacement = Vec::new();
            if i1 > 0 {
                replacement.push(Node::Block(Block {
                    children: list.children[..i1].to_vec(),
                    ..list.clone()
                }));
            }
            for item in list.blocks().skip(i1).take(i2 + 1 - i1) {
                replacement.extend(item.children.iter().cloned());
            }
            if i2 + 1 < list.children.len() {
                replacement.push(Node::Block(Block::new(
                    list.kind,
                    Attrs::default(),
                    list.children[i2 + 1..].to_vec(),
                )));
            }
            rebuilt.children.splice(index..=index, replacement);
        } else {
            let mut attrs = list.attrs.clone();
            if list_kind == BlockKind::BulletList {
                attrs.start = None;
            }
            rebuilt.children[index] =
                Node::Block(Block::new(list_kind, attrs, list.children.clone()));
            merge_adjacent(&mut rebuilt.children, index, list_kind);
        }
        return replace_container(state, parent_path.to_vec(), rebuilt);
    }

    let (container_path, i1, i2) = block_range(root, from, to)
        .ok_or_else(|| EditError::selection("selection has no enclosing container"))?;
    let Some(container) = root.descendant(&container_path) else {
        return Err(EditError::selection("selection has no enclosing container"));
    };
    let mut items = Vec::new();
    for child in container.blocks().skip(i1).take(i2 + 1 - i1) {
        if child.kind.is_list() {
            items.extend(child.children.iter().cloned());
        } else {
            items.push(Node::Block(Block::wrap(
                BlockKind::ListItem,
                vec![child.clone()],
            )));
        }
    }
    let mut rebuilt = container.clone();
    rebuilt.children.splice(
        i1..=i2,
        std::iter::once(Node::Block(Block::new(list_kind, Attrs::default(), items))),
    );
    merge_adjacent(&mut rebuilt.children, i1, list_kind);
    replace_container(state, container_path, rebuilt)
}
