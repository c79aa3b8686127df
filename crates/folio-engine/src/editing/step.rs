use serde::{Deserialize, Serialize};

use crate::error::{EditError, Result};
use crate::model::document::textblock_ranges;
use crate::model::{Attrs, Block, BlockKind, Mark, MarkKind, Node, Position};

/// A primitive edit. Transactions are ordered lists of steps; each step
/// addresses the tree as left by the steps before it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "step", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Step {
    /// Inserts inline nodes (text runs and hard breaks) at a position.
    InsertText { at: Position, nodes: Vec<Node> },
    /// Deletes inline content inside one textblock.
    DeleteText { from: Position, to: Position },
    InsertNodes {
        parent: Vec<usize>,
        index: usize,
        nodes: Vec<Block>,
    },
    DeleteNodes {
        parent: Vec<usize>,
        from: usize,
        to: usize,
    },
    /// Adds a mark to every text run in the range, skipping code blocks
    /// and runs that refuse it.
    SetMark {
        from: Position,
        to: Position,
        mark: Mark,
    },
    UnsetMark {
        from: Position,
        to: Position,
        kind: MarkKind,
    },
    SetAttributes { path: Vec<usize>, attrs: Attrs },
    /// Replaces the block at `path`. An empty path replaces the root.
    ReplaceNode { path: Vec<usize>, node: Block },
}

fn textblock_mut<'a>(root: &'a mut Block, pos: &Position) -> Result<&'a mut Block> {
    let block = root
        .descendant_mut(&pos.path)
        .filter(|b| b.is_textblock())
        .ok_or_else(|| EditError::selection(format!("{:?} is not a textblock", pos.path)))?;
    if pos.offset > block.inline_len() {
        return Err(EditError::selection(format!(
            "offset {} is past the end of {:?}",
            pos.offset, pos.path
        )));
    }
    Ok(block)
}

fn container_mut<'a>(root: &'a mut Block, path: &[usize]) -> Result<&'a mut Block> {
    root.descendant_mut(path)
        .ok_or_else(|| EditError::schema(path, "no block at this path"))
}

impl Step {
    /// Applies the step in place. Schema checks happen once the whole
    /// transaction has run.
    pub fn apply(&self, root: &mut Block) -> Result<()> {
        match self {
            Step::InsertText { at, nodes } => {
                let block = textblock_mut(root, at)?;
                block.replace_inline(at.offset, at.offset, nodes.clone());
            }
            Step::DeleteText { from, to } => {
                if from.path != to.path {
                    return Err(EditError::selection("deleteText must stay inside one textblock"));
                }
                textblock_mut(root, to)?;
                let block = textblock_mut(root, from)?;
                if from.offset > to.offset {
                    return Err(EditError::selection("deleteText range is reversed"));
                }
                block.replace_inline(from.offset, to.offset, Vec::new());
            }
            Step::InsertNodes {
                parent,
                index,
                nodes,
            } => {
                let block = container_mut(root, parent)?;
                if *index > block.children.len() {
                    return Err(EditError::schema(parent, "insert index out of range"));
                }
                block.children.splice(
                    *index..*index,
                    nodes.iter().cloned().map(Node::Block),
                );
            }
            Step::DeleteNodes { parent, from, to } => {
                let block = container_mut(root, parent)?;
                if from > to || *to > block.children.len() {
                    return Err(EditError::schema(parent, "delete range out of range"));
                }
                block.children.drain(*from..*to);
            }
            Step::SetMark { from, to, mark } => {
                mark.validate()?;
                for_text_ranges(root, from, to, |marks| {
                    marks.add(mark.clone());
                })?;
            }
            Step::UnsetMark { from, to, kind } => {
                for_text_ranges(root, from, to, |marks| {
                    marks.remove(*kind);
                })?;
            }
            Step::SetAttributes { path, attrs } => {
                container_mut(root, path)?.attrs = attrs.clone().normalized();
            }
            Step::ReplaceNode { path, node } => match path.split_last() {
                None if node.kind == BlockKind::Doc => *root = node.clone(),
                None => return Err(EditError::schema(path, "root must be a doc node")),
                Some((last, parent)) => {
                    let block = container_mut(root, parent)?;
                    let slot = block
                        .children
                        .get_mut(*last)
                        .ok_or_else(|| EditError::schema(path, "no block at this path"))?;
                    *slot = Node::Block(node.clone());
                }
            },
        }
        Ok(())
    }
}

fn for_text_ranges(
    root: &mut Block,
    from: &Position,
    to: &Position,
    mut f: impl FnMut(&mut crate::model::MarkSet),
) -> Result<()> {
    textblock_mut(root, from)?;
    textblock_mut(root, to)?;
    for (path, start, end) in textblock_ranges(root, from, to) {
        if let Some(block) = root.descendant_mut(&path)
            && block.kind != BlockKind::CodeBlock
            && start < end
        {
            block.map_marks(start, end, &mut f);
        }
    }
    Ok(())
}
