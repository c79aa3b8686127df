use super::attrs::Attrs;
use super::node::{Block, BlockKind, Node};

/// A cell placed on the table's slot grid.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedCell {
    pub top: usize,
    pub left: usize,
    pub rows: usize,
    pub cols: usize,
    pub cell: Block,
    /// `(row index, index within row)` in the table the grid was read from.
    pub source: Option<(usize, usize)>,
}

impl PlacedCell {
    fn covers(&self, row: usize, col: usize) -> bool {
        (self.top..self.top + self.rows).contains(&row)
            && (self.left..self.left + self.cols).contains(&col)
    }
}

/// Slot view of a table, accounting for row and column spans.
///
/// A valid table covers every slot of its `height x width` rectangle exactly
/// once. Structural table edits are done on the grid and written back with
/// [`TableGrid::into_table`].
#[derive(Debug, Clone, PartialEq)]
pub struct TableGrid {
    pub width: usize,
    pub height: usize,
    pub cells: Vec<PlacedCell>,
}

pub fn empty_cell(kind: BlockKind) -> Block {
    Block::new(
        kind,
        Attrs::default(),
        vec![Node::Block(Block::paragraph(Vec::new()))],
    )
}

impl TableGrid {
    /// Reads a table, failing on anything that is not a rectangular grid.
    pub fn from_table(table: &Block) -> Result<TableGrid, String> {
        let (grid, repaired) = Self::place(table, false)?;
        debug_assert!(!repaired);
        if grid.width == 0 {
            return Err("table has no cells".to_string());
        }
        Ok(grid)
    }

    /// Reads a table, clamping spans and padding short rows so the result is
    /// rectangular. The flag reports whether anything had to change.
    pub fn repair(table: &Block) -> (TableGrid, bool) {
        match Self::place(table, true) {
            Ok(result) => result,
            // lenient placement never fails
            Err(_) => (
                TableGrid {
                    width: 0,
                    height: 0,
                    cells: Vec::new(),
                },
                true,
            ),
        }
    }

    fn place(table: &Block, lenient: bool) -> Result<(TableGrid, bool), String> {
        let height = table.children.len();
        if height == 0 && !lenient {
            return Err("table has no rows".to_string());
        }
        let mut repaired = false;
        let mut occupied: Vec<Vec<bool>> = vec![Vec::new(); height];
        let mut cells = Vec::new();

        for (r, row) in table.children.iter().enumerate() {
            let Some(row) = row.as_block().filter(|b| b.kind == BlockKind::TableRow) else {
                if !lenient {
                    return Err(format!("table child {r} is not a row"));
                }
                repaired = true;
                continue;
            };
            let mut col = 0;
            for (i, cell) in row.children.iter().enumerate() {
                let Some(cell) = cell.as_block().filter(|b| b.kind.is_cell()) else {
                    if !lenient {
                        return Err(format!("row {r} child {i} is not a cell"));
                    }
                    repaired = true;
                    continue;
                };
                while occupied[r].get(col).copied().unwrap_or(false) {
                    col += 1;
                }
                let mut rows = cell.attrs.row_span().max(1) as usize;
                let mut cols = cell.attrs.col_span().max(1) as usize;
                if r + rows > height {
                    if !lenient {
                        return Err(format!("cell at row {r} spans past the last row"));
                    }
                    rows = height - r;
                    repaired = true;
                }
                let clash = (r..r + rows).any(|rr| {
                    (col..col + cols).any(|cc| occupied[rr].get(cc).copied().unwrap_or(false))
                });
                if clash {
                    if !lenient {
                        return Err(format!("cell at row {r} overlaps a spanning cell"));
                    }
                    rows = 1;
                    cols = (col..col + cols)
                        .take_while(|&cc| !occupied[r].get(cc).copied().unwrap_or(false))
                        .count()
                        .max(1);
                    repaired = true;
                }
                for line in occupied.iter_mut().skip(r).take(rows) {
                    if line.len() < col + cols {
                        line.resize(col + cols, false);
                    }
                    for slot in &mut line[col..col + cols] {
                        *slot = true;
                    }
                }
                let mut cell = cell.clone();
                cell.attrs.colspan = Some(cols as u32);
                cell.attrs.rowspan = Some(rows as u32);
                cell.attrs = cell.attrs.normalized();
                cells.push(PlacedCell {
                    top: r,
                    left: col,
                    rows,
                    cols,
                    cell,
                    source: Some((r, i)),
                });
                col += cols;
            }
        }

        let width = occupied.iter().map(Vec::len).max().unwrap_or(0);
        for (r, line) in occupied.iter().enumerate() {
            for c in 0..width {
                if line.get(c).copied().unwrap_or(false) {
                    continue;
                }
                if !lenient {
                    return Err(format!("row {r} is missing a cell at column {c}"));
                }
                repaired = true;
                cells.push(PlacedCell {
                    top: r,
                    left: c,
                    rows: 1,
                    cols: 1,
                    cell: empty_cell(BlockKind::TableCell),
                    source: None,
                });
            }
        }

        Ok((
            TableGrid {
                width,
                height,
                cells,
            },
            repaired,
        ))
    }

    /// Builds a grid of fresh empty cells.
    pub fn new(rows: usize, cols: usize, header_row: bool) -> TableGrid {
        let mut cells = Vec::with_capacity(rows * cols);
        for top in 0..rows {
            let kind = if header_row && top == 0 {
                BlockKind::TableHeader
            } else {
                BlockKind::TableCell
            };
            for left in 0..cols {
                cells.push(PlacedCell {
                    top,
                    left,
                    rows: 1,
                    cols: 1,
                    cell: empty_cell(kind),
                    source: None,
                });
            }
        }
        TableGrid {
            width: cols,
            height: rows,
            cells,
        }
    }

    /// Writes the grid back as `tableRow` children, one row per grid row.
    pub fn into_table(mut self, attrs: Attrs) -> Block {
        self.cells.sort_by_key(|c| (c.top, c.left));
        let mut rows: Vec<Vec<Node>> = vec![Vec::new(); self.height];
        for placed in self.cells {
            let mut cell = placed.cell;
            cell.attrs.colspan = Some(placed.cols as u32);
            cell.attrs.rowspan = Some(placed.rows as u32);
            cell.attrs = cell.attrs.normalized();
            rows[placed.top].push(Node::Block(cell));
        }
        Block::new(
            BlockKind::Table,
            attrs,
            rows.into_iter()
                .map(|cells| Node::Block(Block::new(BlockKind::TableRow, Attrs::default(), cells)))
                .collect(),
        )
    }

    /// Index of the cell covering a slot.
    pub fn cell_at(&self, row: usize, col: usize) -> Option<usize> {
        self.cells.iter().position(|c| c.covers(row, col))
    }

    pub fn find_source(&self, source: (usize, usize)) -> Option<usize> {
        self.cells.iter().position(|c| c.source == Some(source))
    }

    /// Where a cell lands in the table [`TableGrid::into_table`] produces.
    pub fn location(&self, index: usize) -> (usize, usize) {
        let target = &self.cells[index];
        let rank = self
            .cells
            .iter()
            .filter(|c| c.top == target.top && c.left < target.left)
            .count();
        (target.top, rank)
    }

    fn kind_at(&self, row: usize, col: usize) -> BlockKind {
        self.cell_at(row, col)
            .map(|i| self.cells[i].cell.kind)
            .unwrap_or(BlockKind::TableCell)
    }

    pub fn row_is_header(&self, row: usize) -> bool {
        self.width > 0 && (0..self.width).all(|c| self.kind_at(row, c) == BlockKind::TableHeader)
    }

    pub fn column_is_header(&self, col: usize) -> bool {
        self.height > 0 && (0..self.height).all(|r| self.kind_at(r, col) == BlockKind::TableHeader)
    }

    /// Inserts an empty row so it becomes row `at`.
    ///
    /// New cells copy the kind of the neighbouring row, except that a full
    /// header row is only continued when the new row sits between two rows.
    pub fn insert_row(&mut self, at: usize) {
        let reference = if self.height == 0 {
            None
        } else {
            let above = at.saturating_sub(1).min(self.height - 1);
            if self.row_is_header(above) {
                (at > 0 && at < self.height).then_some(at)
            } else {
                Some(above)
            }
        };
        let kinds: Vec<BlockKind> = (0..self.width)
            .map(|c| {
                reference
                    .map(|r| self.kind_at(r, c))
                    .unwrap_or(BlockKind::TableCell)
            })
            .collect();

        for cell in &mut self.cells {
            if cell.top >= at {
                cell.top += 1;
            } else if cell.top + cell.rows > at {
                cell.rows += 1;
            }
        }
        self.height += 1;

        for (col, kind) in kinds.into_iter().enumerate() {
            if self.cell_at(at, col).is_none() {
                self.cells.push(PlacedCell {
                    top: at,
                    left: col,
                    rows: 1,
                    cols: 1,
                    cell: empty_cell(kind),
                    source: None,
                });
            }
        }
    }

    /// Inserts an empty column so it becomes column `at`.
    pub fn insert_column(&mut self, at: usize) {
        let reference = if self.width == 0 {
            None
        } else {
            let left = at.saturating_sub(1).min(self.width - 1);
            if self.column_is_header(left) {
                (at > 0 && at < self.width).then_some(at)
            } else {
                Some(left)
            }
        };
        let kinds: Vec<BlockKind> = (0..self.height)
            .map(|r| {
                reference
                    .map(|c| self.kind_at(r, c))
                    .unwrap_or(BlockKind::TableCell)
            })
            .collect();

        for cell in &mut self.cells {
            if cell.left >= at {
                cell.left += 1;
            } else if cell.left + cell.cols > at {
                cell.cols += 1;
            }
        }
        self.width += 1;

        for (row, kind) in kinds.into_iter().enumerate() {
            if self.cell_at(row, at).is_none() {
                self.cells.push(PlacedCell {
                    top: row,
                    left: at,
                    rows: 1,
                    cols: 1,
                    cell: empty_cell(kind),
                    source: None,
                });
            }
        }
    }

    /// Removes row `at`. Cells spanning it shrink; cells starting on it with
    /// a rowspan keep their content and move onto the next row.
    pub fn remove_row(&mut self, at: usize) {
        self.cells.retain_mut(|cell| {
            if cell.top == at {
                if cell.rows == 1 {
                    return false;
                }
                cell.rows -= 1;
            } else if cell.top < at && cell.top + cell.rows > at {
                cell.rows -= 1;
            } else if cell.top > at {
                cell.top -= 1;
            }
            true
        });
        self.height -= 1;
    }

    pub fn remove_column(&mut self, at: usize) {
        self.cells.retain_mut(|cell| {
            if cell.left == at {
                if cell.cols == 1 {
                    return false;
                }
                cell.cols -= 1;
            } else if cell.left < at && cell.left + cell.cols > at {
                cell.cols -= 1;
            } else if cell.left > at {
                cell.left -= 1;
            }
            true
        });
        self.width -= 1;
    }

    /// True when every slot is covered exactly once.
    pub fn is_rectangular(&self) -> bool {
        let mut seen = vec![0u8; self.width * self.height];
        for cell in &self.cells {
            if cell.rows == 0
                || cell.cols == 0
                || cell.top + cell.rows > self.height
                || cell.left + cell.cols > self.width
            {
                return false;
            }
            for r in cell.top..cell.top + cell.rows {
                for c in cell.left..cell.left + cell.cols {
                    seen[r * self.width + c] += 1;
                }
            }
        }
        seen.iter().all(|&n| n == 1)
    }
}
