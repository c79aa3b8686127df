use std::collections::VecDeque;
use std::time::{Duration, Instant};

use super::transaction::EditKind;
use crate::model::{Document, Selection};

/// Document and selection to restore on undo or redo.
#[derive(Debug, Clone, PartialEq)]
pub struct Checkpoint {
    pub doc: Document,
    pub selection: Selection,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryConfig {
    /// Maximum number of undo steps kept; the oldest are dropped first.
    pub depth: usize,
    /// Typing or deleting within this interval joins the previous step.
    pub coalesce_window: Duration,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        HistoryConfig {
            depth: 100,
            coalesce_window: Duration::from_millis(500),
        }
    }
}

#[derive(Debug, Clone)]
struct HistoryEntry {
    before: Checkpoint,
    kind: EditKind,
    last_edit: Instant,
    /// Selection after the most recent edit folded into this entry.
    last_selection: Selection,
}

/// Snapshot-based undo/redo stacks with coalescing of rapid typing.
#[derive(Debug, Clone)]
pub struct History {
    config: HistoryConfig,
    undo: VecDeque<HistoryEntry>,
    redo: Vec<Checkpoint>,
    group_open: bool,
}

impl History {
    pub fn new(config: HistoryConfig) -> Self {
        History {
            config,
            undo: VecDeque::new(),
            redo: Vec::new(),
            group_open: false,
        }
    }

    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    pub fn undo_depth(&self) -> usize {
        self.undo.len()
    }

    pub fn redo_depth(&self) -> usize {
        self.redo.len()
    }

    /// Ends the open typing group so the next edit starts a new step.
    pub fn close_group(&mut self) {
        self.group_open = false;
    }

    /// Records a document-changing edit. `before` is the state the edit
    /// started from, `after` the selection it left.
    pub fn record(&mut self, before: Checkpoint, after: Selection, kind: EditKind, now: Instant) {
        self.redo.clear();

        if self.group_open
            && kind != EditKind::Structural
            && let Some(top) = self.undo.back_mut()
            && top.kind == kind
            && now.saturating_duration_since(top.last_edit) < self.config.coalesce_window
            && top.last_selection == before.selection
        {
            log::trace!("coalescing {kind:?} edit into the open undo step");
            top.last_edit = now;
            top.last_selection = after;
            return;
        }

        self.undo.push_back(HistoryEntry {
            before,
            kind,
            last_edit: now,
            last_selection: after,
        });
        while self.undo.len() > self.config.depth {
            self.undo.pop_front();
        }
        self.group_open = kind != EditKind::Structural;
    }

    /// Pops one step, returning the checkpoint to restore. `current` becomes
    /// the redo target.
    pub fn undo(&mut self, current: Checkpoint) -> Option<Checkpoint> {
        let entry = self.undo.pop_back()?;
        self.redo.push(current);
        self.group_open = false;
        Some(entry.before)
    }

    pub fn redo(&mut self, current: Checkpoint) -> Option<Checkpoint> {
        let next = self.redo.pop()?;
        self.undo.push_back(HistoryEntry {
            last_selection: next.selection.clone(),
            before: current,
            kind: EditKind::Structural,
            last_edit: Instant::now(),
        });
        self.group_open = false;
        Some(next)
    }
}

impl Default for History {
    fn default() -> Self {
        History::new(HistoryConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Position;
    use crate::tests::*;

    fn checkpoint(text: &str, offset: usize) -> Checkpoint {
        Checkpoint {
            doc: doc(vec![p(text)]),
            selection: Selection::cursor(Position::new([0], offset)),
        }
    }

    fn cursor(offset: usize) -> Selection {
        Selection::cursor(Position::new([0], offset))
    }

    #[test]
    fn rapid_typing_coalesces() {
        let mut history = History::default();
        let t0 = Instant::now();
        history.record(checkpoint("", 0), cursor(1), EditKind::Typing, t0);
        history.record(
            checkpoint("a", 1),
            cursor(2),
            EditKind::Typing,
            t0 + Duration::from_millis(100),
        );
        assert_eq!(history.undo_depth(), 1);

        let restored = history.undo(checkpoint("ab", 2)).unwrap();
        assert_eq!(restored, checkpoint("", 0));
        assert!(!history.can_undo());
        assert!(history.can_redo());
    }

    #[test]
    fn slow_typing_starts_new_step() {
        let mut history = History::default();
        let t0 = Instant::now();
        history.record(checkpoint("", 0), cursor(1), EditKind::Typing, t0);
        history.record(
            checkpoint("a", 1),
            cursor(2),
            EditKind::Typing,
            t0 + Duration::from_millis(500),
        );
        assert_eq!(history.undo_depth(), 2);
    }

    #[test]
    fn typing_elsewhere_starts_new_step() {
        let mut history = History::default();
        let t0 = Instant::now();
        history.record(checkpoint("ab", 0), cursor(1), EditKind::Typing, t0);
        history.record(checkpoint("xab", 3), cursor(4), EditKind::Typing, t0);
        assert_eq!(history.undo_depth(), 2);
    }

    #[test]
    fn closed_group_and_structural_edits_do_not_coalesce() {
        let mut history = History::default();
        let t0 = Instant::now();
        history.record(checkpoint("", 0), cursor(1), EditKind::Typing, t0);
        history.close_group();
        history.record(checkpoint("a", 1), cursor(2), EditKind::Typing, t0);
        history.record(checkpoint("ab", 2), cursor(2), EditKind::Structural, t0);
        history.record(checkpoint("ab", 2), cursor(2), EditKind::Structural, t0);
        assert_eq!(history.undo_depth(), 4);
    }

    #[test]
    fn typing_then_deleting_are_separate() {
        let mut history = History::default();
        let t0 = Instant::now();
        history.record(checkpoint("", 0), cursor(1), EditKind::Typing, t0);
        history.record(checkpoint("a", 1), cursor(0), EditKind::Deleting, t0);
        assert_eq!(history.undo_depth(), 2);
    }

    #[test]
    fn depth_is_bounded() {
        let mut history = History::new(HistoryConfig {
            depth: 3,
            ..HistoryConfig::default()
        });
        let t0 = Instant::now();
        for i in 0..5 {
            history.record(checkpoint("", i), cursor(0), EditKind::Structural, t0);
        }
        assert_eq!(history.undo_depth(), 3);
        let oldest_kept = (0..3).fold(None, |_, _| history.undo(checkpoint("", 0)));
        assert_eq!(oldest_kept, Some(checkpoint("", 2)));
    }

    #[test]
    fn new_edit_clears_redo() {
        let mut history = History::default();
        let t0 = Instant::now();
        history.record(checkpoint("", 0), cursor(1), EditKind::Structural, t0);
        history.undo(checkpoint("a", 1));
        assert!(history.can_redo());
        history.record(checkpoint("", 0), cursor(1), EditKind::Structural, t0);
        assert!(!history.can_redo());
    }

    #[test]
    fn redo_returns_undone_state() {
        let mut history = History::default();
        history.record(checkpoint("", 0), cursor(1), EditKind::Structural, Instant::now());
        let before = history.undo(checkpoint("a", 1)).unwrap();
        let after = history.redo(before).unwrap();
        assert_eq!(after, checkpoint("a", 1));
        assert!(history.can_undo());
        assert!(!history.can_redo());
    }
}
