//! Nesting and attribute rules every document must satisfy.

use super::attrs::Attrs;
use super::node::{Block, BlockKind, Node};
use super::table::TableGrid;
use crate::error::{EditError, Result};

/// Validates a whole document tree rooted at a `doc` block.
pub fn check_document(root: &Block) -> Result<()> {
    if root.kind != BlockKind::Doc {
        return Err(EditError::schema(&[], "root must be a doc node"));
    }
    let mut path = Vec::new();
    check_block(root, &mut path)?;
    if root.textblock_paths().is_empty() {
        return Err(EditError::schema(&[], "document must contain a textblock"));
    }
    Ok(())
}

/// Validates one block and everything below it. `path` is the block's own
/// path and is restored before returning.
pub fn check_block(block: &Block, path: &mut Vec<usize>) -> Result<()> {
    check_attrs(block.kind, &block.attrs, path)?;

    let kind = block.kind;
    if kind.is_leaf() {
        if !block.children.is_empty() {
            return Err(EditError::schema(path, format!("{} takes no content", kind.name())));
        }
        return Ok(());
    }

    if kind.is_textblock() {
        return check_inline(block, path);
    }

    let allowed = |child: BlockKind| match kind {
        BlockKind::BulletList | BlockKind::OrderedList => child == BlockKind::ListItem,
        BlockKind::Table => child == BlockKind::TableRow,
        BlockKind::TableRow => child.is_cell(),
        _ => child.is_block_content(),
    };
    if block.children.is_empty() && kind != BlockKind::TableRow {
        return Err(EditError::schema(
            path,
            format!("{} needs at least one child", kind.name()),
        ));
    }
    for (i, child) in block.children.iter().enumerate() {
        path.push(i);
        let result = match child {
            Node::Block(b) if allowed(b.kind) => check_block(b, path),
            Node::Block(b) => Err(EditError::schema(
                path,
                format!("{} is not allowed inside {}", b.kind.name(), kind.name()),
            )),
            Node::Text(_) => Err(EditError::schema(
                path,
                format!("text is not allowed inside {}", kind.name()),
            )),
        };
        path.pop();
        result?;
    }

    if kind == BlockKind::Table {
        TableGrid::from_table(block).map_err(|reason| EditError::schema(path, reason))?;
    }
    Ok(())
}

fn check_inline(block: &Block, path: &mut Vec<usize>) -> Result<()> {
    let code = block.kind == BlockKind::CodeBlock;
    for (i, child) in block.children.iter().enumerate() {
        path.push(i);
        let result = match child {
            Node::Text(t) if t.text.is_empty() => Err(EditError::schema(path, "empty text node")),
            Node::Text(t) if code && !t.marks.is_empty() => {
                Err(EditError::schema(path, "code blocks cannot carry marks"))
            }
            Node::Text(t) if !code && t.text.contains('\n') => Err(EditError::schema(
                path,
                "newlines are only allowed inside code blocks",
            )),
            Node::Text(t) => t.marks.iter().try_for_each(|m| {
                m.validate().map_err(|e| match e {
                    EditError::SchemaViolation { reason, .. } => EditError::schema(path, reason),
                    other => other,
                })
            }),
            Node::Block(b) if b.kind.is_inline() && !code => check_block(b, path),
            Node::Block(b) => Err(EditError::schema(
                path,
                format!("{} is not allowed inside {}", b.kind.name(), block.kind.name()),
            )),
        };
        path.pop();
        result?;
    }
    Ok(())
}

fn check_attrs(kind: BlockKind, attrs: &Attrs, path: &[usize]) -> Result<()> {
    let fail = |reason: String| Err(EditError::schema(path, reason));
    let name = kind.name();

    match (kind, attrs.level) {
        (BlockKind::Heading, Some(1..=6)) => {}
        (BlockKind::Heading, Some(level)) => {
            return fail(format!("heading level {level} is outside 1-6"));
        }
        (BlockKind::Heading, None) => return fail("heading requires a level".into()),
        (_, Some(_)) => return fail(format!("{name} does not take a level")),
        (_, None) => {}
    }
    if attrs.align.is_some() && !matches!(kind, BlockKind::Paragraph | BlockKind::Heading) {
        return fail(format!("{name} does not take an alignment"));
    }
    if kind == BlockKind::Image {
        if attrs.src.as_deref().is_none_or(|s| s.trim().is_empty()) {
            return fail("image requires a src".into());
        }
    } else if attrs.src.is_some() || attrs.alt.is_some() || attrs.title.is_some() {
        return fail(format!("{name} does not take image attributes"));
    }
    if kind.is_cell() {
        if attrs.colspan == Some(0) || attrs.rowspan == Some(0) {
            return fail("cell spans must be at least 1".into());
        }
    } else if attrs.colspan.is_some() || attrs.rowspan.is_some() {
        return fail(format!("{name} does not take spans"));
    }
    if attrs.language.is_some() && kind != BlockKind::CodeBlock {
        return fail(format!("{name} does not take a language"));
    }
    if attrs.start.is_some() && kind != BlockKind::OrderedList {
        return fail(format!("{name} does not take a start number"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::attrs::Align;
    use crate::model::mark::Mark;
    use rstest::rstest;

    fn doc(children: Vec<Block>) -> Block {
        Block::wrap(BlockKind::Doc, children)
    }

    fn para(text: &str) -> Block {
        if text.is_empty() {
            Block::paragraph(vec![])
        } else {
            Block::paragraph(vec![Node::text(text)])
        }
    }

    fn reason(result: Result<()>) -> String {
        match result {
            Err(EditError::SchemaViolation { reason, .. }) => reason,
            other => panic!("expected schema violation, got {other:?}"),
        }
    }

    #[test]
    fn minimal_document_is_valid() {
        assert_eq!(check_document(&doc(vec![para("")])), Ok(()));
    }

    #[test]
    fn empty_doc_is_rejected() {
        assert!(check_document(&doc(vec![])).is_err());
    }

    #[test]
    fn doc_without_textblock_is_rejected() {
        let root = doc(vec![Block::leaf(BlockKind::HorizontalRule, Attrs::default())]);
        assert_eq!(
            reason(check_document(&root)),
            "document must contain a textblock"
        );
    }

    #[rstest]
    #[case(0)]
    #[case(7)]
    fn heading_level_out_of_range(#[case] level: u8) {
        let root = doc(vec![Block::heading(level, vec![])]);
        assert!(reason(check_document(&root)).contains("outside 1-6"));
    }

    #[test]
    fn list_must_hold_list_items() {
        let root = doc(vec![Block::wrap(BlockKind::BulletList, vec![para("x")])]);
        let err = check_document(&root).unwrap_err();
        assert_eq!(
            err,
            EditError::SchemaViolation {
                path: vec![0, 0],
                reason: "paragraph is not allowed inside bulletList".into()
            }
        );
    }

    #[test]
    fn newline_outside_code_is_rejected() {
        let root = doc(vec![para("a\nb")]);
        assert!(reason(check_document(&root)).contains("newlines"));

        let code = Block::new(BlockKind::CodeBlock, Attrs::default(), vec![Node::text("a\nb")]);
        assert_eq!(check_document(&doc(vec![code])), Ok(()));
    }

    #[test]
    fn marks_in_code_block_are_rejected() {
        let code = Block::new(
            BlockKind::CodeBlock,
            Attrs::default(),
            vec![Node::marked("x", [Mark::Bold])],
        );
        assert!(check_document(&doc(vec![code])).is_err());
    }

    #[test]
    fn align_on_list_is_rejected() {
        let mut list = Block::wrap(
            BlockKind::BulletList,
            vec![Block::wrap(BlockKind::ListItem, vec![para("x")])],
        );
        list.attrs.align = Some(Align::Center);
        assert!(check_document(&doc(vec![list])).is_err());
    }

    #[test]
    fn image_needs_src() {
        let img = Block::leaf(BlockKind::Image, Attrs::default());
        assert_eq!(
            reason(check_document(&doc(vec![para(""), img]))),
            "image requires a src"
        );
    }

    #[test]
    fn ragged_table_is_rejected() {
        let cell = || {
            Node::Block(Block::new(
                BlockKind::TableCell,
                Attrs::default(),
                vec![Node::Block(para(""))],
            ))
        };
        let table = Block::new(
            BlockKind::Table,
            Attrs::default(),
            vec![
                Node::Block(Block::new(BlockKind::TableRow, Attrs::default(), vec![cell(), cell()])),
                Node::Block(Block::new(BlockKind::TableRow, Attrs::default(), vec![cell()])),
            ],
        );
        assert!(reason(check_document(&doc(vec![table]))).contains("missing a cell"));
    }

    #[test]
    fn invalid_color_mark_is_rejected() {
        let root = doc(vec![Block::paragraph(vec![Node::marked(
            "x",
            [Mark::color("javascript:1")],
        )])]);
        assert!(check_document(&root).is_err());
    }
}
