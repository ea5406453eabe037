//! The single authoritative document and its bounded undo history.

use facet::Facet;
use std::collections::VecDeque;

use crate::config::EngineConfig;
use crate::error::EditError;
use crate::validate;
use crate::{debug, warn};

/// Minimal page used when no template is supplied.
pub const DEFAULT_TEMPLATE: &str = include_str!("default_template.html");

/// Result of a successful [`DocumentStore::commit`].
#[derive(Facet, Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommitReceipt {
    pub history_len: usize,
    /// The oldest snapshot was dropped to make room
    pub evicted: bool,
}

/// Result of [`DocumentStore::undo`]. An empty history is not an error.
#[derive(Facet, Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum UndoOutcome {
    Restored { history_len: usize },
    NothingToUndo,
}

/// Diagnostics snapshot of the store.
#[derive(Facet, Debug, Clone, PartialEq, Eq)]
pub struct DebugInfo {
    pub length: usize,
    pub history_len: usize,
    pub capacity: usize,
    pub is_valid: bool,
}

/// Full copy of the store state, used to roll back a multi-stage request.
#[derive(Debug, Clone)]
pub struct Snapshot {
    current: String,
    history: VecDeque<String>,
}

#[derive(Debug, Clone)]
pub struct DocumentStore {
    current: String,
    history: VecDeque<String>,
    capacity: usize,
}

impl DocumentStore {
    /// Create a store around `initial`, which must pass [`validate::check`].
    pub fn new(initial: impl Into<String>, capacity: usize) -> Result<Self, EditError> {
        let initial = initial.into();
        validate::check(&initial)?;
        Ok(Self::unchecked(initial, capacity))
    }

    pub fn with_config(initial: impl Into<String>, config: &EngineConfig) -> Result<Self, EditError> {
        Self::new(initial, config.history_capacity)
    }

    /// Store seeded with [`DEFAULT_TEMPLATE`].
    pub fn with_default_template(config: &EngineConfig) -> Self {
        Self::unchecked(DEFAULT_TEMPLATE.to_string(), config.history_capacity)
    }

    fn unchecked(current: String, capacity: usize) -> Self {
        Self {
            current,
            history: VecDeque::with_capacity(capacity.min(64)),
            capacity,
        }
    }

    /// The current document, byte for byte.
    pub fn current(&self) -> &str {
        &self.current
    }

    /// The downloadable artifact: identical to [`current`](Self::current).
    pub fn export_html(&self) -> String {
        self.current.clone()
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Validate `new_text` and, if it passes, make it current and push the old text onto history.
    pub fn commit(&mut self, new_text: impl Into<String>) -> Result<CommitReceipt, EditError> {
        let new_text = new_text.into();
        if let Err(err) = validate::check(&new_text) {
            warn!(error = %err, "rejected commit");
            return Err(err.into());
        }

        let previous = std::mem::replace(&mut self.current, new_text);
        let mut evicted = false;
        if self.capacity > 0 {
            self.history.push_back(previous);
            while self.history.len() > self.capacity {
                self.history.pop_front();
                evicted = true;
            }
        }

        debug!(
            length = self.current.len(),
            history_len = self.history.len(),
            evicted,
            "committed document"
        );
        Ok(CommitReceipt {
            history_len: self.history.len(),
            evicted,
        })
    }

    /// Restore the most recent snapshot. The replaced text is discarded (no redo).
    pub fn undo(&mut self) -> UndoOutcome {
        match self.history.pop_back() {
            Some(previous) => {
                self.current = previous;
                debug!(history_len = self.history.len(), "undo");
                UndoOutcome::Restored {
                    history_len: self.history.len(),
                }
            }
            None => UndoOutcome::NothingToUndo,
        }
    }

    /// Install a new baseline document and forget all history.
    pub fn replace_baseline(&mut self, text: impl Into<String>) -> Result<(), EditError> {
        let text = text.into();
        validate::check(&text)?;
        self.current = text;
        self.history.clear();
        Ok(())
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            current: self.current.clone(),
            history: self.history.clone(),
        }
    }

    pub fn restore(&mut self, snapshot: Snapshot) {
        self.current = snapshot.current;
        self.history = snapshot.history;
    }

    pub fn debug_info(&self) -> DebugInfo {
        DebugInfo {
            length: self.current.len(),
            history_len: self.history.len(),
            capacity: self.capacity,
            is_valid: validate::is_valid(&self.current),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(title: &str) -> String {
        format!("<!DOCTYPE html>\n<html><head></head><body><h1>{title}</h1></body></html>")
    }

    #[test]
    fn default_template_is_valid() {
        assert_eq!(validate::check(DEFAULT_TEMPLATE), Ok(()));
        let store = DocumentStore::with_default_template(&EngineConfig::default());
        assert!(store.debug_info().is_valid);
        assert_eq!(store.capacity(), 50);
    }

    #[test]
    fn invalid_commit_leaves_state_unchanged() {
        let mut store = DocumentStore::new(page("A"), 5).unwrap();
        let err = store.commit("<html><body><div>").unwrap_err();
        assert!(matches!(err, EditError::StructuralIntegrity { .. }));
        assert_eq!(store.current(), page("A"));
        assert_eq!(store.history_len(), 0);
    }

    #[test]
    fn zero_capacity_keeps_no_history() {
        let mut store = DocumentStore::new(page("A"), 0).unwrap();
        store.commit(page("B")).unwrap();
        assert_eq!(store.history_len(), 0);
        assert_eq!(store.undo(), UndoOutcome::NothingToUndo);
        assert_eq!(store.current(), page("B"));
    }

    #[test]
    fn snapshot_restore_round_trip() {
        let mut store = DocumentStore::new(page("A"), 5).unwrap();
        let snap = store.snapshot();
        store.commit(page("B")).unwrap();
        store.restore(snap);
        assert_eq!(store.current(), page("A"));
        assert_eq!(store.history_len(), 0);
    }

    #[test]
    fn replace_baseline_clears_history() {
        let mut store = DocumentStore::new(page("A"), 5).unwrap();
        store.commit(page("B")).unwrap();
        store.replace_baseline(page("C")).unwrap();
        assert_eq!(store.history_len(), 0);
        assert_eq!(store.current(), page("C"));
    }
}
