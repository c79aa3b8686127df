use std::fmt::Write as _;

use serde::{Deserialize, Serialize};

use super::attrs::Attrs;
use super::node::{Block, BlockKind, Node, normalize_inline};
use super::position::{Position, Selection};
use super::schema;
use crate::editing::Transaction;
use crate::error::{EditError, Result};
use crate::html::{self, ParseOptions, ParseOutcome};

/// An immutable, schema-valid rich-text document.
///
/// Every `Document` value satisfies the nesting rules and is in canonical
/// form. Edits produce a new value through [`Document::apply`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "Block", into = "Block")]
pub struct Document {
    root: Block,
}

impl Default for Document {
    fn default() -> Self {
        Document::new()
    }
}

impl Document {
    /// The empty document: `doc(paragraph())`.
    pub fn new() -> Self {
        Document {
            root: Block::wrap(BlockKind::Doc, vec![Block::paragraph(Vec::new())]),
        }
    }

    /// Normalizes and validates a `doc` tree.
    pub fn from_root(root: Block) -> Result<Self> {
        let root = normalize_block(root);
        schema::check_document(&root)?;
        Ok(Document { root })
    }

    pub fn from_blocks(blocks: Vec<Block>) -> Result<Self> {
        if blocks.is_empty() {
            return Ok(Document::new());
        }
        Self::from_root(Block::wrap(BlockKind::Doc, blocks))
    }

    pub fn root(&self) -> &Block {
        &self.root
    }

    pub fn block(&self, path: &[usize]) -> Option<&Block> {
        self.root.descendant(path)
    }

    pub fn textblock(&self, path: &[usize]) -> Option<&Block> {
        self.block(path).filter(|b| b.is_textblock())
    }

    pub fn textblock_paths(&self) -> Vec<Vec<usize>> {
        self.root.textblock_paths()
    }

    /// Resolves a position to its textblock, checking the offset is in range.
    pub fn resolve(&self, pos: &Position) -> Result<&Block> {
        let block = self
            .textblock(&pos.path)
            .ok_or_else(|| EditError::selection(format!("{:?} is not a textblock", pos.path)))?;
        if pos.offset > block.inline_len() {
            return Err(EditError::selection(format!(
                "offset {} is past the end of {:?}",
                pos.offset, pos.path
            )));
        }
        Ok(block)
    }

    pub fn check_selection(&self, selection: &Selection) -> Result<()> {
        self.resolve(&selection.anchor)?;
        self.resolve(&selection.head)?;
        Ok(())
    }

    pub fn start(&self) -> Position {
        let first = self.textblock_paths().into_iter().next().unwrap_or_default();
        Position::new(first, 0)
    }

    pub fn end(&self) -> Position {
        let last = self.textblock_paths().pop().unwrap_or_default();
        let len = self.block(&last).map(Block::inline_len).unwrap_or(0);
        Position::new(last, len)
    }

    pub fn end_of(&self, path: &[usize]) -> Position {
        let len = self.block(path).map(Block::inline_len).unwrap_or(0);
        Position::new(path, len)
    }

    /// Textblocks touched by `from..to` with the inline range covered in each.
    pub fn textblocks_between(
        &self,
        from: &Position,
        to: &Position,
    ) -> Vec<(Vec<usize>, usize, usize)> {
        textblock_ranges(&self.root, from, to)
    }

    /// Applies every step of `tr` and validates the result. `self` is untouched.
    pub fn apply(&self, tr: &Transaction) -> Result<Document> {
        let mut root = self.root.clone();
        for step in &tr.steps {
            step.apply(&mut root)?;
        }
        let doc = Document::from_root(root)?;
        doc.check_selection(&tr.selection)?;
        Ok(doc)
    }

    pub fn to_html(&self) -> String {
        html::write_document(self)
    }

    /// Strict parse: any recovery the lenient parser would perform is an error.
    pub fn from_html(input: &str) -> Result<Document> {
        html::parse_strict(input, &ParseOptions::default())
    }

    /// Lenient parse: always yields a document plus warnings.
    pub fn parse_html(input: &str, options: &ParseOptions) -> ParseOutcome {
        html::parse(input, options)
    }

    /// Plain text of all textblocks joined with newlines.
    pub fn text(&self) -> String {
        self.textblock_paths()
            .iter()
            .filter_map(|p| self.block(p))
            .map(Block::text)
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Selects the first occurrence of `needle` inside a single textblock.
    pub fn find(&self, needle: &str) -> Option<Selection> {
        if needle.is_empty() {
            return None;
        }
        self.textblock_paths().into_iter().find_map(|path| {
            let text = self.block(&path)?.text();
            let byte = text.find(needle)?;
            let start = text[..byte].chars().count();
            let end = start + needle.chars().count();
            Some(Selection::range(
                Position::new(path.clone(), start),
                Position::new(path, end),
            ))
        })
    }

    /// Indented tree dump, one node per line.
    pub fn outline(&self) -> String {
        let mut out = String::new();
        outline_block(&self.root, 0, &mut out);
        out.truncate(out.trim_end().len());
        out
    }
}

impl TryFrom<Block> for Document {
    type Error = EditError;

    fn try_from(root: Block) -> Result<Self> {
        Document::from_root(root)
    }
}

impl From<Document> for Block {
    fn from(doc: Document) -> Self {
        doc.root
    }
}

pub(crate) fn textblock_ranges(
    root: &Block,
    from: &Position,
    to: &Position,
) -> Vec<(Vec<usize>, usize, usize)> {
    root.textblock_paths()
        .into_iter()
        .filter(|p| p.as_slice() >= from.path.as_slice() && p.as_slice() <= to.path.as_slice())
        .map(|p| {
            let start = if p == from.path { from.offset } else { 0 };
            let end = if p == to.path {
                to.offset
            } else {
                root.descendant(&p).map(Block::inline_len).unwrap_or(0)
            };
            (p, start, end)
        })
        .collect()
}

/// Canonicalizes attributes and inline runs throughout a tree.
pub(crate) fn normalize_block(mut block: Block) -> Block {
    block.attrs = block.attrs.normalized();
    if block.is_textblock() {
        block.children = normalize_inline(block.children);
    } else {
        block.children = block
            .children
            .into_iter()
            .map(|child| match child {
                Node::Block(b) => Node::Block(normalize_block(b)),
                text => text,
            })
            .collect();
    }
    block
}

fn outline_attrs(attrs: &Attrs) -> String {
    let mut parts = Vec::new();
    if let Some(level) = attrs.level {
        parts.push(format!("level={level}"));
    }
    if let Some(align) = attrs.align {
        parts.push(format!("align={}", align.as_str()));
    }
    if let Some(src) = &attrs.src {
        parts.push(format!("src={src:?}"));
    }
    if let Some(alt) = &attrs.alt {
        parts.push(format!("alt={alt:?}"));
    }
    if let Some(title) = &attrs.title {
        parts.push(format!("title={title:?}"));
    }
    if let Some(colspan) = attrs.colspan {
        parts.push(format!("colspan={colspan}"));
    }
    if let Some(rowspan) = attrs.rowspan {
        parts.push(format!("rowspan={rowspan}"));
    }
    if let Some(language) = &attrs.language {
        parts.push(format!("language={language}"));
    }
    if let Some(start) = attrs.start {
        parts.push(format!("start={start}"));
    }
    parts.join(" ")
}

fn outline_block(block: &Block, depth: usize, out: &mut String) {
    let indent = "  ".repeat(depth);
    let attrs = outline_attrs(&block.attrs);
    if attrs.is_empty() {
        let _ = writeln!(out, "{indent}{}", block.kind.name());
    } else {
        let _ = writeln!(out, "{indent}{} {attrs}", block.kind.name());
    }
    for child in &block.children {
        match child {
            Node::Block(b) => outline_block(b, depth + 1, out),
            Node::Text(t) => {
                let marks: Vec<String> = t
                    .marks
                    .iter()
                    .map(|m| match m {
                        super::mark::Mark::Link { href } => format!("link({href})"),
                        super::mark::Mark::Color { value } => format!("color({value})"),
                        other => other.kind().name().to_string(),
                    })
                    .collect();
                if marks.is_empty() {
                    let _ = writeln!(out, "{indent}  text {:?}", t.text);
                } else {
                    let _ = writeln!(out, "{indent}  text {:?} [{}]", t.text, marks.join(", "));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::mark::Mark;
    use insta::assert_snapshot;

    #[test]
    fn new_document_is_single_empty_paragraph() {
        let doc = Document::new();
        assert_eq!(doc.textblock_paths(), vec![vec![0]]);
        assert_eq!(doc.end(), Position::new([0], 0));
    }

    #[test]
    fn from_root_merges_adjacent_runs() {
        let doc = Document::from_blocks(vec![Block::paragraph(vec![
            Node::marked("a", [Mark::Bold]),
            Node::marked("b", [Mark::Bold]),
            Node::text(""),
        ])])
        .unwrap();
        assert_eq!(
            doc.block(&[0]).unwrap().children,
            vec![Node::marked("ab", [Mark::Bold])]
        );
    }

    #[test]
    fn resolve_rejects_offset_past_end() {
        let doc = Document::from_blocks(vec![Block::paragraph(vec![Node::text("abc")])]).unwrap();
        assert!(doc.resolve(&Position::new([0], 3)).is_ok());
        assert!(matches!(
            doc.resolve(&Position::new([0], 4)),
            Err(EditError::InvalidSelection(_))
        ));
        assert!(doc.resolve(&Position::new([1], 0)).is_err());
    }

    #[test]
    fn find_counts_characters() {
        let doc = Document::from_blocks(vec![
            Block::paragraph(vec![Node::text("first")]),
            Block::paragraph(vec![Node::text("café crème")]),
        ])
        .unwrap();
        let sel = doc.find("crème").unwrap();
        assert_eq!(sel.anchor, Position::new([1], 5));
        assert_eq!(sel.head, Position::new([1], 10));
    }

    #[test]
    fn textblocks_between_clips_ends() {
        let doc = Document::from_blocks(vec![
            Block::paragraph(vec![Node::text("one")]),
            Block::paragraph(vec![Node::text("two")]),
            Block::paragraph(vec![Node::text("three")]),
        ])
        .unwrap();
        let spans = doc.textblocks_between(&Position::new([0], 1), &Position::new([2], 2));
        assert_eq!(
            spans,
            vec![(vec![0], 1, 3), (vec![1], 0, 3), (vec![2], 0, 2)]
        );
    }

    #[test]
    fn serde_rejects_invalid_tree() {
        let json = r#"{"kind":"doc","children":[]}"#;
        assert!(serde_json::from_str::<Document>(json).is_err());
    }

    #[test]
    fn outline_shows_structure() {
        let doc = Document::from_blocks(vec![
            Block::heading(2, vec![Node::text("Title")]),
            Block::paragraph(vec![
                Node::marked("bold", [Mark::Bold]),
                Node::hard_break(),
                Node::text("plain"),
            ]),
        ])
        .unwrap();
        assert_snapshot!(doc.outline(), @r#"
        doc
          heading level=2
            text "Title"
          paragraph
            text "bold" [bold]
            hardBreak
            text "plain"
        "#);
    }
}
