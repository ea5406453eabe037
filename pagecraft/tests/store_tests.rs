//! Tests for the document store and its undo history.

use facet_testhelpers::test;
use pagecraft::{DocumentStore, EditError, UndoOutcome};

fn page(n: usize) -> String {
    format!("<!DOCTYPE html>\n<html><head></head><body><h1>Version {n}</h1></body></html>")
}

#[test]
fn test_history_is_bounded() {
    let mut store = DocumentStore::new(page(0), 50).unwrap();
    for n in 1..=60 {
        let receipt = store.commit(page(n)).unwrap();
        assert_eq!(receipt.evicted, n > 50);
    }
    assert_eq!(store.history_len(), 50);
    assert_eq!(store.current(), page(60));

    let mut seen = Vec::new();
    while let UndoOutcome::Restored { .. } = store.undo() {
        seen.push(store.current().to_string());
    }
    assert_eq!(seen.len(), 50);
    assert_eq!(seen.last(), Some(&page(10)));
    assert!(!seen.contains(&page(0)));
    assert_eq!(store.undo(), UndoOutcome::NothingToUndo);
}

#[test]
fn test_undo_discards_redo_branch() {
    let mut store = DocumentStore::new(page(0), 50).unwrap();
    store.commit(page(1)).unwrap();
    store.commit(page(2)).unwrap();
    assert_eq!(store.undo(), UndoOutcome::Restored { history_len: 1 });
    assert_eq!(store.current(), page(1));

    store.commit(page(3)).unwrap();
    let mut states = vec![store.current().to_string()];
    while let UndoOutcome::Restored { .. } = store.undo() {
        states.push(store.current().to_string());
    }
    assert_eq!(states, [page(3), page(1), page(0)]);
    assert!(!states.contains(&page(2)));
}

#[test]
fn test_undo_on_empty_history_is_not_an_error() {
    let mut store = DocumentStore::new(page(0), 50).unwrap();
    assert_eq!(store.undo(), UndoOutcome::NothingToUndo);
    assert_eq!(store.current(), page(0));
}

#[test]
fn test_rejects_invalid_initial_document() {
    let err = DocumentStore::new("<div>fragment</div>", 50).unwrap_err();
    assert!(matches!(err, EditError::StructuralIntegrity { .. }));
}

#[test]
fn test_export_matches_current() {
    let mut store = DocumentStore::new(page(0), 50).unwrap();
    store.commit(page(1)).unwrap();
    assert_eq!(store.export_html(), store.current());
}

#[test]
fn test_replace_baseline_clears_history() {
    let mut store = DocumentStore::new(page(0), 50).unwrap();
    store.commit(page(1)).unwrap();
    store.replace_baseline(page(9)).unwrap();
    assert_eq!(store.history_len(), 0);
    assert_eq!(store.current(), page(9));
    assert!(store.replace_baseline("").is_err());
    assert_eq!(store.current(), page(9));
}

#[test]
fn test_snapshot_restore_includes_history() {
    let mut store = DocumentStore::new(page(0), 50).unwrap();
    let snapshot = store.snapshot();
    store.commit(page(1)).unwrap();
    store.commit(page(2)).unwrap();
    store.restore(snapshot);
    assert_eq!(store.current(), page(0));
    assert_eq!(store.history_len(), 0);
}

#[test]
fn test_debug_info() {
    let mut store = DocumentStore::new(page(0), 5).unwrap();
    store.commit(page(1)).unwrap();
    let info = store.debug_info();
    assert_eq!(info.length, page(1).len());
    assert_eq!(info.history_len, 1);
    assert_eq!(info.capacity, 5);
    assert!(info.is_valid);
}
