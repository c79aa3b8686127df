pub mod attrs;
pub mod document;
pub mod mark;
pub mod node;
pub mod position;
pub mod schema;
pub mod table;

pub use attrs::{Align, Attrs};
pub use document::Document;
pub use mark::{Mark, MarkKind, MarkSet};
pub use node::{Block, BlockKind, Node, TextNode};
pub use position::{Position, Selection};
pub use table::TableGrid;
