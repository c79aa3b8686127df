use super::text::delete_range;
use super::{TextblockType, common_prefix, enclosing, remap_by_ordinal};
use crate::editing::query::is_block_active;
use crate::editing::state::EditorState;
use crate::editing::step::Step;
use crate::editing::transaction::{Draft, EditKind, Transaction};
use crate::error::{EditError, Result};
use crate::model::node::coerce_inline;
use crate::model::{Align, Attrs, Block, BlockKind, Node, Position, Selection};

fn target(block: &TextblockType) -> Result<(BlockKind, Attrs)> {
    match block {
        TextblockType::Paragraph => Ok((BlockKind::Paragraph, Attrs::default())),
        TextblockType::Heading { level } if (1..=6).contains(level) => {
            Ok((BlockKind::Heading, Attrs::heading(*level)))
        }
        TextblockType::Heading { level } => Err(EditError::schema(
            &[],
            format!("heading level {level} is outside 1-6"),
        )),
        TextblockType::CodeBlock { language } => {
            Ok((BlockKind::CodeBlock, Attrs::code(language.clone())))
        }
    }
}

/// Converts every textblock in the selection. Alignment survives conversions
/// between paragraphs and headings.
pub(super) fn set_block_type(state: &EditorState, block: &TextblockType) -> Result<Transaction> {
    let (kind, mut attrs) = target(block)?;
    let sel = &state.selection;
    let mut draft = Draft::new(&state.doc);
    for (path, _, _) in state.doc.textblocks_between(sel.from(), sel.to()) {
        let Some(old) = state.doc.block(&path) else {
            continue;
        };
        attrs.align = match kind {
            BlockKind::CodeBlock => None,
            _ => old.attrs.align,
        };
        let attrs = attrs.clone().normalized();
        if old.kind == kind && old.attrs == attrs {
            continue;
        }
        let into_code = kind == BlockKind::CodeBlock;
        let children = if into_code || old.kind == BlockKind::CodeBlock {
            coerce_inline(old.children.clone(), into_code)
        } else {
            old.children.clone()
        };
        draft.push(Step::ReplaceNode {
            path,
            node: Block::new(kind, attrs, children),
        })?;
    }
    Ok(draft.finish(sel.clone(), None, EditKind::Structural))
}

pub(super) fn toggle_heading(state: &EditorState, level: u8) -> Result<Transaction> {
    if !(1..=6).contains(&level) {
        return Err(EditError::schema(
            &[],
            format!("heading level {level} is outside 1-6"),
        ));
    }
    let block = if is_block_active(state, BlockKind::Heading, &Attrs::heading(level)) {
        TextblockType::Paragraph
    } else {
        TextblockType::Heading { level }
    };
    set_block_type(state, &block)
}

pub(super) fn toggle_code_block(state: &EditorState) -> Result<Transaction> {
    let block = if is_block_active(state, BlockKind::CodeBlock, &Attrs::default()) {
        TextblockType::Paragraph
    } else {
        TextblockType::CodeBlock { language: None }
    };
    set_block_type(state, &block)
}

/// Deepest block container holding both selection ends, plus the indices
/// of the children containing each end.
pub(super) fn block_range(root: &Block, from: &[usize], to: &[usize]) -> Option<(Vec<usize>, usize, usize)> {
    let shared = common_prefix(from, to);
    let limit = shared.len().min(from.len() - 1).min(to.len() - 1);
    let container = enclosing(root, &shared[..limit], BlockKind::holds_blocks)?;
    let depth = container.len();
    Some((container, from[depth], to[depth]))
}

/// Replaces the container at `path` with `rebuilt` and carries the selection
/// across by textblock order.
pub(super) fn replace_container(
    state: &EditorState,
    path: Vec<usize>,
    rebuilt: Block,
) -> Result<Transaction> {
    let mut draft = Draft::new(&state.doc);
    draft.push(Step::ReplaceNode {
        path,
        node: rebuilt,
    })?;
    let selection = remap_by_ordinal(state.doc.root(), draft.root(), &state.selection);
    Ok(draft.finish(selection, None, EditKind::Structural))
}

/// Wraps the selected blocks in a blockquote, or lifts them out of the
/// innermost blockquote holding the whole selection.
pub(super) fn toggle_blockquote(state: &EditorState) -> Result<Transaction> {
    let root = state.doc.root();
    let (from, to) = (&state.selection.from().path, &state.selection.to().path);
    let shared = common_prefix(from, to);

    if let Some(quote_path) = enclosing(root, &shared, |k| k == BlockKind::Blockquote)
        && quote_path.len() < from.len()
        && let Some((&index, parent_path)) = quote_path.split_last()
        && let Some(parent) = root.descendant(parent_path)
        && let Some(quote) = parent.child_block(index)
    {
        let depth = quote_path.len();
        let (i1, i2) = (from[depth], to[depth]);
        let mut replacement = Vec::new();
        if i1 > 0 {
            replacement.push(Node::Block(Block {
                children: quote.children[..i1].to_vec(),
                ..quote.clone()
            }));
        }
        replacement.extend(quote.children[i1..=i2].iter().cloned());
        if i2 + 1 < quote.children.len() {
            replacement.push(Node::Block(Block {
                children: quote.children[i2 + 1..].to_vec(),
                ..quote.clone()
            }));
        }
        let mut rebuilt = parent.clone();
        rebuilt.children.splice(index..=index, replacement);
        return replace_container(state, parent_path.to_vec(), rebuilt);
    }

    let (container_path, i1, i2) = block_range(root, from, to)
        .ok_or_else(|| EditError::selection("selection has no enclosing container"))?;
    let Some(container) = root.descendant(&container_path) else {
        return Err(EditError::selection("selection has no enclosing container"));
    };
    let wrapped = Block::new(
        BlockKind::Blockquote,
        Attrs::default(),
        container.children[i1..=i2].to_vec(),
    );
    let mut rebuilt = container.clone();
    rebuilt
        .children
        .splice(i1..=i2, std::iter::once(Node::Block(wrapped)));
    replace_container(state, container_path, rebuilt)
}

pub(super) fn set_text_align(state: &EditorState, align: Option<Align>) -> Result<Transaction> {
    let sel = &state.selection;
    let mut draft = Draft::new(&state.doc);
    let mut aligned = 0;
    for (path, _, _) in state.doc.textblocks_between(sel.from(), sel.to()) {
        let Some(block) = state
            .doc
            .block(&path)
            .filter(|b| matches!(b.kind, BlockKind::Paragraph | BlockKind::Heading))
        else {
            continue;
        };
        aligned += 1;
        let attrs = Attrs {
            align,
            ..block.attrs.clone()
        }
        .normalized();
        if attrs != block.attrs {
            draft.push(Step::SetAttributes { path, attrs })?;
        }
    }
    if aligned == 0 {
        return Err(EditError::selection(
            "alignment needs a paragraph or heading in the selection",
        ));
    }
    Ok(draft.finish(sel.clone(), None, EditKind::Structural))
}

/// Puts a block at the selection: it replaces an empty textblock, goes before
/// or after the textblock when the cursor is at an edge, and splits it
/// otherwise. The cursor moves into the new block when it has text,
/// else to the textblock after it (created if missing). A block inserted
/// last in its container is followed by an empty paragraph.
pub(super) fn insert_block(state: &EditorState, block: Block) -> Result<Transaction> {
    let mut draft = Draft::new(&state.doc);
    let pos = delete_range(&mut draft, state.selection.from(), state.selection.to())?;
    let current = draft
        .root()
        .descendant(&pos.path)
        .filter(|b| b.is_textblock())
        .cloned()
        .ok_or_else(|| EditError::selection("cursor is not inside a textblock"))?;
    let Some((&idx, parent_path)) = pos.path.split_last() else {
        return Err(EditError::selection("cursor is not inside a textblock"));
    };
    let parent_path = parent_path.to_vec();
    let len = current.inline_len();

    let node_index = if len == 0 {
        draft.push(Step::ReplaceNode {
            path: pos.path.clone(),
            node: block,
        })?;
        idx
    } else if pos.offset == 0 {
        draft.push(Step::InsertNodes {
            parent: parent_path.clone(),
            index: idx,
            nodes: vec![block],
        })?;
        idx
    } else if pos.offset == len {
        draft.push(Step::InsertNodes {
            parent: parent_path.clone(),
            index: idx + 1,
            nodes: vec![block],
        })?;
        idx + 1
    } else {
        let head = Block {
            children: current.slice_inline(0, pos.offset),
            ..current.clone()
        };
        let tail = Block {
            children: current.slice_inline(pos.offset, len),
            ..current.clone()
        };
        draft.push(Step::ReplaceNode {
            path: pos.path.clone(),
            node: head,
        })?;
        draft.push(Step::InsertNodes {
            parent: parent_path.clone(),
            index: idx + 1,
            nodes: vec![block, tail],
        })?;
        idx + 1
    };

    let mut node_path = parent_path.clone();
    node_path.push(node_index);
    let inner = draft
        .root()
        .descendant(&node_path)
        .and_then(|b| b.textblock_paths().into_iter().next())
        .filter(|rel| !rel.is_empty());
    let next = node_index + 1;
    let parent = draft
        .root()
        .descendant(&parent_path)
        .ok_or_else(|| EditError::selection("cursor is not inside a textblock"))?;
    let trailing = match inner {
        Some(_) => parent.children.len() <= next,
        None => !parent.child_block(next).is_some_and(Block::is_textblock),
    };
    if trailing {
        draft.push(Step::InsertNodes {
            parent: parent_path.clone(),
            index: next,
            nodes: vec![Block::paragraph(Vec::new())],
        })?;
    }
    let cursor = match inner {
        Some(rel) => [node_path, rel].concat(),
        None => [parent_path, vec![next]].concat(),
    };
    Ok(draft.finish(
        Selection::cursor(Position::new(cursor, 0)),
        None,
        EditKind::Structural,
    ))
}

pub(super) fn insert_image(
    state: &EditorState,
    src: &str,
    alt: Option<String>,
    title: Option<String>,
) -> Result<Transaction> {
    let src = src.trim();
    if src.is_empty() {
        return Err(EditError::schema(&[], "image requires a src"));
    }
    let attrs = Attrs {
        alt: alt.filter(|a| !a.is_empty()),
        title: title.filter(|t| !t.is_empty()),
        ..Attrs::image(src)
    };
    insert_block(state, Block::leaf(BlockKind::Image, attrs))
}

pub(super) fn set_horizontal_rule(state: &EditorState) -> Result<Transaction> {
    insert_block(
        state,
        Block::leaf(BlockKind::HorizontalRule, Attrs::default()),
    )
}
