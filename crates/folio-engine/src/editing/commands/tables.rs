use super::blocks::insert_block;
use super::{Side, enclosing};
use crate::editing::state::EditorState;
use crate::editing::step::Step;
use crate::editing::transaction::{Draft, EditKind, Transaction};
use crate::error::{EditError, Result};
use crate::model::{Attrs, Block, BlockKind, Position, Selection, TableGrid};

fn table_of(root: &Block, path: &[usize]) -> Option<Vec<usize>> {
    enclosing(root, path, |k| k == BlockKind::Table)
}

pub(super) fn insert_table(
    state: &EditorState,
    rows: usize,
    cols: usize,
    with_header_row: bool,
) -> Result<Transaction> {
    let root = state.doc.root();
    let sel = &state.selection;
    if table_of(root, &sel.anchor.path).is_some() || table_of(root, &sel.head.path).is_some() {
        return Err(EditError::selection("tables cannot be nested"));
    }
    if rows == 0 || cols == 0 {
        return Err(EditError::schema(
            &[],
            format!("a table needs at least one row and column, got {rows}x{cols}"),
        ));
    }
    let table = TableGrid::new(rows, cols, with_header_row).into_table(Attrs::default());
    insert_block(state, table)
}

/// The table around the selection and the slot rectangle the selection
/// covers in it.
struct TableContext {
    path: Vec<usize>,
    grid: TableGrid,
    attrs: Attrs,
    top: usize,
    bottom: usize,
    left: usize,
    right: usize,
}

/// `(row, index in row)` of the cell holding `pos`, when inside `table_path`.
fn cell_source(table_path: &[usize], pos: &Position) -> Option<(usize, usize)> {
    let depth = table_path.len();
    if pos.path.len() < depth + 3 || pos.path[..depth] != *table_path {
        return None;
    }
    Some((pos.path[depth], pos.path[depth + 1]))
}

fn table_context(state: &EditorState) -> Result<TableContext> {
    let root = state.doc.root();
    let from = state.selection.from();
    let path = table_of(root, &from.path).ok_or(EditError::NoTableContext)?;
    let table = root.descendant(&path).ok_or(EditError::NoTableContext)?;
    let grid = TableGrid::from_table(table).map_err(|reason| EditError::schema(&path, reason))?;

    let mut rect: Option<(usize, usize, usize, usize)> = None;
    for pos in [state.selection.from(), state.selection.to()] {
        let Some(index) = cell_source(&path, pos).and_then(|s| grid.find_source(s)) else {
            continue;
        };
        let cell = &grid.cells[index];
        let (top, bottom, left, right) = (cell.top, cell.top + cell.rows, cell.left, cell.left + cell.cols);
        rect = Some(match rect {
            None => (top, bottom, left, right),
            Some((t, b, l, r)) => (t.min(top), b.max(bottom), l.min(left), r.max(right)),
        });
    }
    let (top, bottom, left, right) = rect.ok_or(EditError::NoTableContext)?;
    Ok(TableContext {
        attrs: table.attrs.clone(),
        path,
        grid,
        top,
        bottom,
        left,
        right,
    })
}

/// Where a position inside the old table ends up after the grid edit.
fn remap(ctx: &TableContext, grid: &TableGrid, pos: &Position) -> Position {
    let Some(index) = cell_source(&ctx.path, pos).and_then(|s| grid.find_source(s)) else {
        return pos.clone();
    };
    let (row, rank) = grid.location(index);
    let depth = ctx.path.len();
    let mut path = ctx.path.clone();
    path.extend([row, rank]);
    path.extend_from_slice(&pos.path[depth + 2..]);
    Position::new(path, pos.offset)
}

fn commit(state: &EditorState, ctx: &TableContext, grid: TableGrid, selection: Selection) -> Result<Transaction> {
    let mut draft = Draft::new(&state.doc);
    draft.push(Step::ReplaceNode {
        path: ctx.path.clone(),
        node: grid.into_table(ctx.attrs.clone()),
    })?;
    Ok(draft.finish(selection, None, EditKind::Structural))
}

fn commit_remapped(state: &EditorState, ctx: &TableContext, grid: TableGrid) -> Result<Transaction> {
    let selection = Selection::range(
        remap(ctx, &grid, &state.selection.anchor),
        remap(ctx, &grid, &state.selection.head),
    );
    commit(state, ctx, grid, selection)
}

/// Cursor at the start of the cell covering a slot, clamped into the grid.
fn cursor_at_slot(ctx: &TableContext, grid: &TableGrid, row: usize, col: usize) -> Selection {
    let row = row.min(grid.height.saturating_sub(1));
    let col = col.min(grid.width.saturating_sub(1));
    let mut path = ctx.path.clone();
    if let Some(index) = grid.cell_at(row, col) {
        let (r, rank) = grid.location(index);
        path.extend([r, rank]);
        if let Some(rel) = grid.cells[index].cell.textblock_paths().into_iter().next() {
            path.extend(rel);
        }
    }
    Selection::cursor(Position::new(path, 0))
}

pub(super) fn add_row(state: &EditorState, side: Side) -> Result<Transaction> {
    let ctx = table_context(state)?;
    let mut grid = ctx.grid.clone();
    grid.insert_row(match side {
        Side::Before => ctx.top,
        Side::After => ctx.bottom,
    });
    commit_remapped(state, &ctx, grid)
}

pub(super) fn add_column(state: &EditorState, side: Side) -> Result<Transaction> {
    let ctx = table_context(state)?;
    let mut grid = ctx.grid.clone();
    grid.insert_column(match side {
        Side::Before => ctx.left,
        Side::After => ctx.right,
    });
    commit_remapped(state, &ctx, grid)
}

pub(super) fn delete_row(state: &EditorState) -> Result<Transaction> {
    let ctx = table_context(state)?;
    if ctx.bottom - ctx.top >= ctx.grid.height {
        return delete_table(state);
    }
    let mut grid = ctx.grid.clone();
    for _ in ctx.top..ctx.bottom {
        grid.remove_row(ctx.top);
    }
    let selection = cursor_at_slot(&ctx, &grid, ctx.top, ctx.left);
    commit(state, &ctx, grid, selection)
}

pub(super) fn delete_column(state: &EditorState) -> Result<Transaction> {
    let ctx = table_context(state)?;
    if ctx.right - ctx.left >= ctx.grid.width {
        return delete_table(state);
    }
    let mut grid = ctx.grid.clone();
    for _ in ctx.left..ctx.right {
        grid.remove_column(ctx.left);
    }
    let selection = cursor_at_slot(&ctx, &grid, ctx.top, ctx.left);
    commit(state, &ctx, grid, selection)
}

/// Removes the table. The cursor moves to the textblock after it, or the end
/// of the one before it when the table was last.
pub(super) fn delete_table(state: &EditorState) -> Result<Transaction> {
    let root = state.doc.root();
    let path = table_of(root, &state.selection.from().path).ok_or(EditError::NoTableContext)?;
    let Some((&index, parent_path)) = path.split_last() else {
        return Err(EditError::NoTableContext);
    };
    let before = root
        .textblock_paths()
        .iter()
        .filter(|p| p.as_slice() < path.as_slice())
        .count();

    let mut draft = Draft::new(&state.doc);
    draft.push(Step::DeleteNodes {
        parent: parent_path.to_vec(),
        from: index,
        to: index + 1,
    })?;

    let paths = draft.root().textblock_paths();
    let parent_empty = draft
        .root()
        .descendant(parent_path)
        .is_some_and(|p| p.children.is_empty());
    let cursor = if parent_empty || paths.is_empty() {
        draft.push(Step::InsertNodes {
            parent: parent_path.to_vec(),
            index,
            nodes: vec![Block::paragraph(Vec::new())],
        })?;
        Position::new(path.clone(), 0)
    } else if let Some(next) = paths.get(before) {
        Position::new(next.clone(), 0)
    } else {
        let prev = &paths[before - 1];
        let len = draft.root().descendant(prev).map(Block::inline_len).unwrap_or(0);
        Position::new(prev.clone(), len)
    };
    Ok(draft.finish(Selection::cursor(cursor), None, EditKind::Structural))
}

#[cfg(test)]
mod tests {
    use super::super::Side;
    use crate::editing::Cmd;
    use crate::error::EditError;
    use crate::model::{Attrs, Block, BlockKind, TableGrid};
    use crate::tests::*;
    use pretty_assertions::assert_eq;

    fn grid_of(state: &crate::editing::EditorState, path: &[usize]) -> TableGrid {
        TableGrid::from_table(state.doc.block(path).unwrap()).unwrap()
    }

    fn two_by_two() -> Block {
        table(vec![tr(vec![td("a"), td("b")]), tr(vec![td("c"), td("d")])])
    }

    #[test]
    fn insert_table_places_cursor_in_first_cell() {
        let state = cursor_state(vec![p("")], &[0], 0);
        let state = run(
            &state,
            Cmd::InsertTable {
                rows: 2,
                cols: 3,
                with_header_row: true,
            },
        );
        let grid = grid_of(&state, &[0]);
        assert_eq!((grid.height, grid.width), (2, 3));
        assert!(grid.row_is_header(0));
        assert!(!grid.row_is_header(1));
        assert_eq!(state.selection.head, at(&[0, 0, 0, 0], 0));
        assert_eq!(state.doc.block(&[1]).unwrap().kind, BlockKind::Paragraph);
    }

    #[test]
    fn insert_table_inside_table_is_rejected() {
        let state = cursor_state(vec![two_by_two()], &[0, 0, 0, 0], 0);
        let err = try_run(
            &state,
            Cmd::InsertTable {
                rows: 1,
                cols: 1,
                with_header_row: false,
            },
        )
        .unwrap_err();
        assert!(matches!(err, EditError::InvalidSelection(_)));
        // state is untouched: the failed command produced no new state
        assert_eq!(state.doc, doc(vec![two_by_two()]));
    }

    #[test]
    fn zero_sized_table_is_rejected() {
        let state = cursor_state(vec![p("")], &[0], 0);
        assert!(matches!(
            try_run(
                &state,
                Cmd::InsertTable {
                    rows: 0,
                    cols: 2,
                    with_header_row: false
                }
            ),
            Err(EditError::SchemaViolation { .. })
        ));
    }

    #[test]
    fn table_commands_need_table_context() {
        let state = cursor_state(vec![p("x")], &[0], 0);
        for cmd in [
            Cmd::AddRow { side: Side::After },
            Cmd::AddColumn { side: Side::Before },
            Cmd::DeleteRow,
            Cmd::DeleteColumn,
            Cmd::DeleteTable,
        ] {
            assert_eq!(try_run(&state, cmd), Err(EditError::NoTableContext));
        }
    }

    #[test]
    fn add_row_after_keeps_cursor_in_its_cell() {
        let state = cursor_state(vec![two_by_two()], &[0, 0, 1, 0], 1);
        let state = run(&state, Cmd::AddRow { side: Side::After });
        assert_eq!(
            state.doc,
            doc(vec![table(vec![
                tr(vec![td("a"), td("b")]),
                tr(vec![td(""), td("")]),
                tr(vec![td("c"), td("d")]),
            ])])
        );
        assert_eq!(state.selection.head, at(&[0, 0, 1, 0], 1));
    }

    #[test]
    fn add_column_before_moves_cursor_right() {
        let state = cursor_state(vec![two_by_two()], &[0, 1, 0, 0], 0);
        let state = run(&state, Cmd::AddColumn { side: Side::Before });
        assert_eq!(
            state.doc,
            doc(vec![table(vec![
                tr(vec![td(""), td("a"), td("b")]),
                tr(vec![td(""), td("c"), td("d")]),
            ])])
        );
        assert_eq!(state.selection.head, at(&[0, 1, 1, 0], 0));
    }

    #[test]
    fn delete_row_moves_cursor_to_same_column() {
        let state = cursor_state(vec![two_by_two()], &[0, 1, 1, 0], 0);
        let state = run(&state, Cmd::DeleteRow);
        assert_eq!(state.doc, doc(vec![table(vec![tr(vec![td("a"), td("b")])])]));
        assert_eq!(state.selection.head, at(&[0, 0, 1, 0], 0));
    }

    #[test]
    fn delete_column_with_colspan_shrinks_it() {
        let wide = Block::new(BlockKind::TableCell, Attrs::span(2, 1), vec![p("wide").into()]);
        let state = cursor_state(
            vec![table(vec![tr(vec![wide]), tr(vec![td("c"), td("d")])])],
            &[0, 1, 1, 0],
            0,
        );
        let state = run(&state, Cmd::DeleteColumn);
        assert_eq!(
            state.doc,
            doc(vec![table(vec![tr(vec![td("wide")]), tr(vec![td("c")])])])
        );
        assert!(grid_of(&state, &[0]).is_rectangular());
    }

    #[test]
    fn deleting_last_row_removes_table() {
        let state = cursor_state(
            vec![p("before"), table(vec![tr(vec![td("x")])])],
            &[1, 0, 0, 0],
            0,
        );
        let state = run(&state, Cmd::DeleteRow);
        assert_eq!(state.doc, doc(vec![p("before")]));
        assert_eq!(state.selection.head, at(&[0], 6));
    }

    #[test]
    fn delete_table_moves_cursor_after() {
        let state = cursor_state(vec![p("a"), two_by_two(), p("z")], &[1, 1, 1, 0], 0);
        let state = run(&state, Cmd::DeleteTable);
        assert_eq!(state.doc, doc(vec![p("a"), p("z")]));
        assert_eq!(state.selection.head, at(&[1], 0));
    }

    #[test]
    fn delete_only_table_leaves_empty_paragraph() {
        let state = cursor_state(vec![two_by_two()], &[0, 0, 0, 0], 0);
        let state = run(&state, Cmd::DeleteTable);
        assert_eq!(state.doc, doc(vec![p("")]));
        assert_eq!(state.selection.head, at(&[0], 0));
    }
}
