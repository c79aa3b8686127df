use std::fmt;
use std::time::Instant;

use serde::Serialize;
use uuid::Uuid;

use super::commands::{Cmd, compile_command};
use super::history::{Checkpoint, History, HistoryConfig};
use super::input_rules::{self, InputRules};
use super::patch::Patch;
use super::query;
use super::snapshot::Snapshot;
use super::state::EditorState;
use super::transaction::Transaction;
use crate::error::{EditError, Result};
use crate::html::{ParseOptions, ParseWarning};
use crate::model::{Align, Attrs, BlockKind, Document, Mark, MarkKind, MarkSet, Selection};

/// Identifies one editing session in change events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct SessionId(Uuid);

impl SessionId {
    fn new() -> Self {
        SessionId(Uuid::new_v4())
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct EditorConfig {
    pub history: HistoryConfig,
    pub html: ParseOptions,
    pub input_rules: InputRules,
}

/// Emitted once per content-changing transaction, undo and redo included.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContentChanged {
    pub session: SessionId,
    pub version: u64,
    pub html: String,
}

type Listener = Box<dyn FnMut(&ContentChanged) + Send>;

/// An editing session. Owns its document and history exclusively; every
/// mutation goes through [`Editor::apply`], [`Editor::select`],
/// [`Editor::undo`] or [`Editor::redo`], and a failing call leaves the
/// session exactly as it was.
///
/// ```
/// use folio_engine::editing::{Cmd, Editor, TextblockType};
///
/// let mut editor = Editor::default();
/// editor.apply(Cmd::SetBlockType { block: TextblockType::Heading { level: 2 } }).unwrap();
/// editor.apply(Cmd::InsertText { text: "Hi".into() }).unwrap();
/// assert_eq!(editor.html(), "<h2>Hi</h2>");
/// ```
pub struct Editor {
    id: SessionId,
    state: EditorState,
    version: u64,
    history: History,
    config: EditorConfig,
    listeners: Vec<Listener>,
}

impl Editor {
    pub fn new(doc: Document) -> Self {
        Editor::with_config(doc, EditorConfig::default())
    }

    pub fn with_config(doc: Document, config: EditorConfig) -> Self {
        Editor {
            id: SessionId::new(),
            state: EditorState::new(doc),
            version: 0,
            history: History::new(config.history),
            config,
            listeners: Vec::new(),
        }
    }

    /// Opens a session on lenient-parsed HTML, returning the recovery
    /// warnings alongside it.
    pub fn from_html(input: &str, config: EditorConfig) -> (Self, Vec<ParseWarning>) {
        let outcome = Document::parse_html(input, &config.html);
        (Editor::with_config(outcome.document, config), outcome.warnings)
    }

    pub fn session_id(&self) -> SessionId {
        self.id
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn doc(&self) -> &Document {
        &self.state.doc
    }

    pub fn selection(&self) -> &Selection {
        &self.state.selection
    }

    pub fn stored_marks(&self) -> Option<&MarkSet> {
        self.state.stored_marks.as_ref()
    }

    pub fn state(&self) -> &EditorState {
        &self.state
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn html(&self) -> String {
        self.state.doc.to_html()
    }

    pub fn on_change(&mut self, listener: impl FnMut(&ContentChanged) + Send + 'static) {
        self.listeners.push(Box::new(listener));
    }

    /// Runs a command against the current selection and commits the result.
    pub fn apply(&mut self, cmd: Cmd) -> Result<Patch> {
        match cmd {
            Cmd::Undo => self.undo(),
            Cmd::Redo => self.redo(),
            cmd => {
                let tr = compile_command(&self.state, &cmd).inspect_err(|e| {
                    log::debug!("{} rejected: {e}", cmd.name());
                })?;
                let changed = self.commit(&tr)?;
                if changed && let Cmd::InsertText { text } = &cmd {
                    self.run_input_rules(text);
                }
                Ok(self.finish(changed))
            }
        }
    }

    /// Dry run of [`Editor::apply`].
    pub fn can_apply(&self, cmd: &Cmd) -> bool {
        match cmd {
            Cmd::Undo => self.can_undo(),
            Cmd::Redo => self.can_redo(),
            cmd => compile_command(&self.state, cmd)
                .and_then(|tr| self.state.apply(&tr))
                .is_ok(),
        }
    }

    /// Commits a transaction built elsewhere, e.g. one replayed from a log.
    pub fn apply_transaction(&mut self, tr: &Transaction) -> Result<Patch> {
        let changed = self.commit(tr)?;
        Ok(self.finish(changed))
    }

    /// Moves the selection. Pending marks are dropped and the open typing
    /// group closes.
    pub fn select(&mut self, selection: Selection) -> Result<Patch> {
        self.state.doc.check_selection(&selection)?;
        self.history.close_group();
        self.state.selection = selection;
        self.state.stored_marks = None;
        Ok(self.patch(false))
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    pub fn undo(&mut self) -> Result<Patch> {
        let restored = self
            .history
            .undo(self.checkpoint())
            .ok_or(EditError::NothingToUndo)?;
        Ok(self.restore(restored, "undo"))
    }

    pub fn redo(&mut self) -> Result<Patch> {
        let restored = self
            .history
            .redo(self.checkpoint())
            .ok_or(EditError::NothingToRedo)?;
        Ok(self.restore(restored, "redo"))
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot::capture(&self.state, self.version, &self.history)
    }

    pub fn is_mark_active(&self, kind: MarkKind, mark: Option<&Mark>) -> bool {
        query::is_mark_active(&self.state, kind, mark)
    }

    pub fn is_block_active(&self, kind: BlockKind, attrs: &Attrs) -> bool {
        query::is_block_active(&self.state, kind, attrs)
    }

    pub fn is_align_active(&self, align: Align) -> bool {
        query::is_align_active(&self.state, align)
    }

    fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            doc: self.state.doc.clone(),
            selection: self.state.selection.clone(),
        }
    }

    /// Swaps in the result of `tr` and records it, returning whether the
    /// document changed. Listeners are notified by [`Editor::finish`].
    fn commit(&mut self, tr: &Transaction) -> Result<bool> {
        let next = self.state.apply(tr)?;
        if next == self.state {
            return Ok(false);
        }
        let before = self.checkpoint();
        let doc_changed = next.doc != before.doc;
        self.state = next;
        if !doc_changed {
            self.history.close_group();
            return Ok(false);
        }

        self.version += 1;
        self.history.record(
            before,
            self.state.selection.clone(),
            tr.kind,
            Instant::now(),
        );
        log::debug!(
            "session {} applied {} step(s) ({:?}), now at version {}",
            self.id,
            tr.steps.len(),
            tr.kind,
            self.version
        );
        Ok(true)
    }

    /// Autolink joins the typing step. A typographic replacement is an undo
    /// step of its own.
    fn run_input_rules(&mut self, typed: &str) {
        let rules = self.config.input_rules;
        if rules.autolink
            && let Some(tr) = input_rules::autolink(&self.state, typed)
        {
            self.commit_follow_up(&tr);
        }
        if rules.typography
            && let Some(tr) = input_rules::typography(&self.state, typed)
        {
            self.commit_follow_up(&tr);
        }
    }

    fn commit_follow_up(&mut self, tr: &Transaction) {
        if let Err(e) = self.commit(tr) {
            log::debug!("input rule skipped: {e}");
        }
    }

    fn finish(&mut self, changed: bool) -> Patch {
        if changed {
            self.emit();
        }
        self.patch(changed)
    }

    fn restore(&mut self, checkpoint: Checkpoint, action: &str) -> Patch {
        self.state = EditorState {
            doc: checkpoint.doc,
            selection: checkpoint.selection,
            stored_marks: None,
        };
        self.version += 1;
        log::debug!("session {} {action} to version {}", self.id, self.version);
        self.emit();
        self.patch(true)
    }

    fn emit(&mut self) {
        if self.listeners.is_empty() {
            return;
        }
        let event = ContentChanged {
            session: self.id,
            version: self.version,
            html: self.state.doc.to_html(),
        };
        for listener in &mut self.listeners {
            listener(&event);
        }
    }

    fn patch(&self, doc_changed: bool) -> Patch {
        Patch {
            version: self.version,
            selection: self.state.selection.clone(),
            doc_changed,
        }
    }
}

impl Default for Editor {
    fn default() -> Self {
        Editor::new(Document::new())
    }
}

impl fmt::Debug for Editor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Editor")
            .field("id", &self.id)
            .field("version", &self.version)
            .field("state", &self.state)
            .field("listeners", &self.listeners.len())
            .finish_non_exhaustive()
    }
}
