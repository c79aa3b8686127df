//! Tree builders and command runners shared by unit tests.

use crate::editing::{Cmd, EditorState, compile_command};
use crate::error::Result;
use crate::model::{Attrs, Block, BlockKind, Document, Node, Position, Selection};

pub fn para(nodes: Vec<Node>) -> Block {
    Block::paragraph(nodes)
}

pub fn p(text: &str) -> Block {
    para(text_nodes(text))
}

pub fn h(level: u8, text: &str) -> Block {
    Block::heading(level, text_nodes(text))
}

pub fn code(text: &str) -> Block {
    Block::new(BlockKind::CodeBlock, Attrs::default(), text_nodes(text))
}

fn text_nodes(text: &str) -> Vec<Node> {
    if text.is_empty() {
        Vec::new()
    } else {
        vec![Node::text(text)]
    }
}

pub fn li(blocks: Vec<Block>) -> Block {
    Block::wrap(BlockKind::ListItem, blocks)
}

pub fn ul(items: Vec<Block>) -> Block {
    Block::wrap(BlockKind::BulletList, items)
}

pub fn ol(items: Vec<Block>) -> Block {
    Block::wrap(BlockKind::OrderedList, items)
}

pub fn quote(blocks: Vec<Block>) -> Block {
    Block::wrap(BlockKind::Blockquote, blocks)
}

pub fn td(text: &str) -> Block {
    Block::wrap(BlockKind::TableCell, vec![p(text)])
}

pub fn th(text: &str) -> Block {
    Block::wrap(BlockKind::TableHeader, vec![p(text)])
}

pub fn tr(cells: Vec<Block>) -> Block {
    Block::wrap(BlockKind::TableRow, cells)
}

pub fn table(rows: Vec<Block>) -> Block {
    Block::wrap(BlockKind::Table, rows)
}

pub fn hr() -> Block {
    Block::leaf(BlockKind::HorizontalRule, Attrs::default())
}

pub fn img(src: &str) -> Block {
    Block::leaf(BlockKind::Image, Attrs::image(src))
}

pub fn doc_root(blocks: Vec<Block>) -> Block {
    Block::wrap(BlockKind::Doc, blocks)
}

pub fn doc(blocks: Vec<Block>) -> Document {
    Document::from_blocks(blocks).expect("test document is valid")
}

pub fn at(path: &[usize], offset: usize) -> Position {
    Position::new(path, offset)
}

pub fn cursor_state(blocks: Vec<Block>, path: &[usize], offset: usize) -> EditorState {
    EditorState {
        selection: Selection::cursor(at(path, offset)),
        ..EditorState::new(doc(blocks))
    }
}

pub fn range_state(blocks: Vec<Block>, from: (&[usize], usize), to: (&[usize], usize)) -> EditorState {
    EditorState {
        selection: Selection::range(at(from.0, from.1), at(to.0, to.1)),
        ..EditorState::new(doc(blocks))
    }
}

pub fn try_run(state: &EditorState, cmd: Cmd) -> Result<EditorState> {
    let tr = compile_command(state, &cmd)?;
    state.apply(&tr)
}

pub fn run(state: &EditorState, cmd: Cmd) -> EditorState {
    try_run(state, cmd.clone()).unwrap_or_else(|e| panic!("{} failed: {e}", cmd.name()))
}
