/*!
 * # Editing
 *
 * Commands, transactions, history and the session object built on top of
 * the immutable [`Document`](crate::model::Document).
 *
 * ## Flow
 *
 * 1. A caller issues a [`Cmd`] to an [`Editor`].
 * 2. [`compile_command`] turns the current [`EditorState`] and the command
 *    into a [`Transaction`]: primitive [`Step`]s plus the resulting
 *    selection and pending marks. Compilation is pure.
 * 3. The editor applies the transaction. Each step is checked against the
 *    schema, and any violation rejects the whole transaction.
 * 4. On success the new state is swapped in, the version bumps, [`History`]
 *    records a checkpoint and listeners receive a [`ContentChanged`] event.
 *    Typed text may be followed by [`input_rules`] (typography, autolink),
 *    committed as transactions of their own.
 *
 * Queries ([`is_mark_active`], [`is_block_active`], [`is_align_active`],
 * [`Snapshot`]) read state without touching it.
 *
 * ```
 * use folio_engine::editing::{Cmd, Editor};
 * use folio_engine::model::{Mark, MarkKind};
 *
 * let mut editor = Editor::default();
 * editor.apply(Cmd::InsertText { text: "hello".into() }).unwrap();
 * editor.apply(Cmd::SelectAll).unwrap();
 * editor.apply(Cmd::ToggleMark { mark: Mark::Bold }).unwrap();
 * assert!(editor.is_mark_active(MarkKind::Bold, None));
 * assert_eq!(editor.html(), "<p><strong>hello</strong></p>");
 *
 * editor.undo().unwrap();
 * assert_eq!(editor.html(), "<p>hello</p>");
 * ```
 */

pub mod commands;
pub mod editor;
pub mod history;
pub mod input_rules;
pub mod patch;
pub mod query;
pub mod snapshot;
pub mod state;
pub mod step;
pub mod transaction;

pub use commands::{Cmd, ListKind, Side, TextblockType, compile_command};
pub use editor::{ContentChanged, Editor, EditorConfig, SessionId};
pub use history::{Checkpoint, History, HistoryConfig};
pub use input_rules::InputRules;
pub use patch::Patch;
pub use query::{cursor_marks, is_align_active, is_block_active, is_mark_active};
pub use snapshot::{ActiveBlocks, ActiveMarks, Snapshot};
pub use state::EditorState;
pub use step::Step;
pub use transaction::{EditKind, Transaction};
