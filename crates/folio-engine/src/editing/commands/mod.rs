//! Commands compile the current [`EditorState`] into a [`Transaction`].
//!
//! Compilation is pure. A command that cannot run returns an error and the
//! session is left alone; a command with nothing to do returns a transaction
//! that leaves the state unchanged.

mod blocks;
mod lists;
mod marks;
mod tables;
mod text;

use serde::{Deserialize, Serialize};

use super::state::EditorState;
use super::transaction::Transaction;
use crate::error::{EditError, Result};
use crate::model::{Align, Block, BlockKind, Mark, Position, Selection};

/// Textblock kinds a selection can be converted to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum TextblockType {
    Paragraph,
    Heading { level: u8 },
    CodeBlock {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        language: Option<String>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ListKind {
    Bullet,
    Ordered,
}

impl ListKind {
    pub fn block_kind(self) -> BlockKind {
        match self {
            ListKind::Bullet => BlockKind::BulletList,
            ListKind::Ordered => BlockKind::OrderedList,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Side {
    Before,
    After,
}

/// Every edit a caller can request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "cmd", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Cmd {
    InsertText {
        text: String,
    },
    DeleteBackward,
    SplitBlock,
    InsertHardBreak,
    SelectAll,
    ToggleMark {
        mark: Mark,
    },
    SetColor {
        value: String,
    },
    UnsetColor,
    SetLink {
        href: String,
    },
    UnsetLink,
    SetBlockType {
        block: TextblockType,
    },
    ToggleHeading {
        level: u8,
    },
    ToggleCodeBlock,
    ToggleBlockquote,
    ToggleList {
        kind: ListKind,
    },
    SetTextAlign {
        align: Align,
    },
    UnsetTextAlign,
    InsertImage {
        src: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        alt: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        title: Option<String>,
    },
    SetHorizontalRule,
    InsertTable {
        rows: usize,
        cols: usize,
        #[serde(default)]
        with_header_row: bool,
    },
    AddRow {
        side: Side,
    },
    AddColumn {
        side: Side,
    },
    DeleteRow,
    DeleteColumn,
    DeleteTable,
    Undo,
    Redo,
}

impl Cmd {
    pub fn name(&self) -> &'static str {
        match self {
            Cmd::InsertText { .. } => "insertText",
            Cmd::DeleteBackward => "deleteBackward",
            Cmd::SplitBlock => "splitBlock",
            Cmd::InsertHardBreak => "insertHardBreak",
            Cmd::SelectAll => "selectAll",
            Cmd::ToggleMark { .. } => "toggleMark",
            Cmd::SetColor { .. } => "setColor",
            Cmd::UnsetColor => "unsetColor",
            Cmd::SetLink { .. } => "setLink",
            Cmd::UnsetLink => "unsetLink",
            Cmd::SetBlockType { .. } => "setBlockType",
            Cmd::ToggleHeading { .. } => "toggleHeading",
            Cmd::ToggleCodeBlock => "toggleCodeBlock",
            Cmd::ToggleBlockquote => "toggleBlockquote",
            Cmd::ToggleList { .. } => "toggleList",
            Cmd::SetTextAlign { .. } => "setTextAlign",
            Cmd::UnsetTextAlign => "unsetTextAlign",
            Cmd::InsertImage { .. } => "insertImage",
            Cmd::SetHorizontalRule => "setHorizontalRule",
            Cmd::InsertTable { .. } => "insertTable",
            Cmd::AddRow { .. } => "addRow",
            Cmd::AddColumn { .. } => "addColumn",
            Cmd::DeleteRow => "deleteRow",
            Cmd::DeleteColumn => "deleteColumn",
            Cmd::DeleteTable => "deleteTable",
            Cmd::Undo => "undo",
            Cmd::Redo => "redo",
        }
    }

    pub fn is_history(&self) -> bool {
        matches!(self, Cmd::Undo | Cmd::Redo)
    }
}

/// Compiles a command against `state`.
///
/// Undo and redo act on session history rather than on a state and are
/// rejected here; [`crate::editing::Editor`] handles them.
pub fn compile_command(state: &EditorState, cmd: &Cmd) -> Result<Transaction> {
    state.doc.check_selection(&state.selection)?;
    match cmd {
        Cmd::InsertText { text } => text::insert_text(state, text),
        Cmd::DeleteBackward => text::delete_backward(state),
        Cmd::SplitBlock => text::split_block(state),
        Cmd::InsertHardBreak => text::insert_hard_break(state),
        Cmd::SelectAll => Ok(text::select_all(state)),
        Cmd::ToggleMark { mark } => marks::toggle_mark(state, mark),
        Cmd::SetColor { value } => marks::set_color(state, value),
        Cmd::UnsetColor => marks::unset_color(state),
        Cmd::SetLink { href } => marks::set_link(state, href),
        Cmd::UnsetLink => marks::unset_link(state),
        Cmd::SetBlockType { block } => blocks::set_block_type(state, block),
        Cmd::ToggleHeading { level } => blocks::toggle_heading(state, *level),
        Cmd::ToggleCodeBlock => blocks::toggle_code_block(state),
        Cmd::ToggleBlockquote => blocks::toggle_blockquote(state),
        Cmd::ToggleList { kind } => lists::toggle_list(state, *kind),
        Cmd::SetTextAlign { align } => blocks::set_text_align(state, Some(*align)),
        Cmd::UnsetTextAlign => blocks::set_text_align(state, None),
        Cmd::InsertImage { src, alt, title } => {
            blocks::insert_image(state, src, alt.clone(), title.clone())
        }
        Cmd::SetHorizontalRule => blocks::set_horizontal_rule(state),
        Cmd::InsertTable {
            rows,
            cols,
            with_header_row,
        } => tables::insert_table(state, *rows, *cols, *with_header_row),
        Cmd::AddRow { side } => tables::add_row(state, *side),
        Cmd::AddColumn { side } => tables::add_column(state, *side),
        Cmd::DeleteRow => tables::delete_row(state),
        Cmd::DeleteColumn => tables::delete_column(state),
        Cmd::DeleteTable => tables::delete_table(state),
        Cmd::Undo | Cmd::Redo => Err(EditError::selection(format!(
            "{} is a history command and has no transaction",
            cmd.name()
        ))),
    }
}

/// Transaction that changes nothing.
pub(crate) fn unchanged(state: &EditorState) -> Transaction {
    Transaction {
        steps: Vec::new(),
        selection: state.selection.clone(),
        stored_marks: state.stored_marks.clone(),
        kind: Default::default(),
    }
}

/// Path of the deepest ancestor-or-self of `path` matching `pred`.
pub(crate) fn enclosing(
    root: &Block,
    path: &[usize],
    pred: impl Fn(BlockKind) -> bool,
) -> Option<Vec<usize>> {
    (0..=path.len())
        .rev()
        .find(|&depth| root.descendant(&path[..depth]).is_some_and(|b| pred(b.kind)))
        .map(|depth| path[..depth].to_vec())
}

pub(crate) fn cell_of(root: &Block, path: &[usize]) -> Option<Vec<usize>> {
    enclosing(root, path, BlockKind::is_cell)
}

pub(crate) fn common_prefix(a: &[usize], b: &[usize]) -> Vec<usize> {
    a.iter()
        .zip(b)
        .take_while(|(x, y)| x == y)
        .map(|(x, _)| *x)
        .collect()
}

/// Index of `path` among the textblocks of `root`.
pub(crate) fn ordinal(root: &Block, path: &[usize]) -> Option<usize> {
    root.textblock_paths().iter().position(|p| p == path)
}

/// Maps a selection across an edit that kept the number and order of
/// textblocks intact.
pub(crate) fn remap_by_ordinal(old: &Block, new: &Block, selection: &Selection) -> Selection {
    let paths = new.textblock_paths();
    let map = |pos: &Position| -> Position {
        ordinal(old, &pos.path)
            .and_then(|i| paths.get(i))
            .map(|p| Position::new(p.clone(), pos.offset))
            .unwrap_or_else(|| pos.clone())
    };
    Selection::range(map(&selection.anchor), map(&selection.head))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::MarkKind;

    #[test]
    fn commands_use_camel_case_tags() {
        let cmd = Cmd::InsertTable {
            rows: 2,
            cols: 3,
            with_header_row: true,
        };
        let json = serde_json::to_string(&cmd).unwrap();
        assert_eq!(
            json,
            r#"{"cmd":"insertTable","rows":2,"cols":3,"withHeaderRow":true}"#
        );
    }

    #[test]
    fn toggle_mark_deserializes_nested_mark() {
        let cmd: Cmd =
            serde_json::from_str(r#"{"cmd":"toggleMark","mark":{"type":"bold"}}"#).unwrap();
        assert_eq!(cmd, Cmd::ToggleMark { mark: Mark::Bold });
        assert_eq!(Mark::Bold.kind(), MarkKind::Bold);
    }

    #[test]
    fn history_commands_do_not_compile() {
        let state = EditorState::default();
        assert!(compile_command(&state, &Cmd::Undo).is_err());
    }

    #[test]
    fn enclosing_finds_deepest_match() {
        let root = crate::tests::doc_root(vec![crate::tests::quote(vec![
            crate::tests::quote(vec![crate::tests::p("x")]),
        ])]);
        assert_eq!(
            enclosing(&root, &[0, 0, 0], |k| k == BlockKind::Blockquote),
            Some(vec![0, 0])
        );
        assert_eq!(enclosing(&root, &[0, 0, 0], BlockKind::is_cell), None);
    }
}
