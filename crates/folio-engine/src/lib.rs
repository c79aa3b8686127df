//! Headless rich-text editing engine.
//!
//! A [`Document`] is an immutable, schema-valid tree of blocks and marked
//! text. An [`Editor`] session applies [`Cmd`]s to it as transactions, keeps
//! an undo history and notifies listeners when content changes. Documents
//! serialize to and from the HTML subset a tiptap editor produces.

pub mod editing;
pub mod error;
pub mod html;
pub mod io;
pub mod model;

#[cfg(test)]
pub mod tests;

pub use editing::{Cmd, ContentChanged, Editor, EditorConfig, Patch, SessionId, Snapshot};
pub use error::{EditError, Result};
pub use html::{ParseOptions, ParseOutcome, ParseWarning, UnknownTagPolicy};
pub use io::IoError;
pub use model::{Document, Mark, MarkKind, Position, Selection};
