use serde::{Deserialize, Serialize};

/// A point inside a textblock: the block's path from the root plus a
/// character offset into its inline content.
///
/// The derived ordering is document order, because paths compare
/// lexicographically and textblocks never nest.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Position {
    pub path: Vec<usize>,
    pub offset: usize,
}

impl Position {
    pub fn new(path: impl Into<Vec<usize>>, offset: usize) -> Self {
        Position {
            path: path.into(),
            offset,
        }
    }
}

/// A collapsed cursor or a range. `anchor` stays put while `head` moves.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Selection {
    pub anchor: Position,
    pub head: Position,
}

impl Selection {
    pub fn cursor(at: Position) -> Self {
        Selection {
            anchor: at.clone(),
            head: at,
        }
    }

    pub fn range(anchor: Position, head: Position) -> Self {
        Selection { anchor, head }
    }

    pub fn is_collapsed(&self) -> bool {
        self.anchor == self.head
    }

    pub fn from(&self) -> &Position {
        std::cmp::min(&self.anchor, &self.head)
    }

    pub fn to(&self) -> &Position {
        std::cmp::max(&self.anchor, &self.head)
    }
}

impl Default for Selection {
    fn default() -> Self {
        Selection::cursor(Position::new([0], 0))
    }
}
