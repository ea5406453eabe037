//! Tests for applying patch batches against a store.

use facet_testhelpers::test;
use pagecraft::patch::{self, MatchTier, Patch};
use pagecraft::{DocumentStore, EditError, EngineConfig};

const BRAND: &str = r#"<h1 class="brand-name" contenteditable="true" id="brand-name">JasonCom</h1>"#;

fn store() -> DocumentStore {
    DocumentStore::with_default_template(&EngineConfig::default())
}

#[test]
fn test_rename_brand() {
    let mut store = store();
    let outcome = patch::apply(&mut store, &[Patch::new("JasonCom", "Winter Sale")]);
    assert!(outcome.success);
    assert_eq!(outcome.applied_count, 1);
    assert!(store.current().contains("Winter Sale"));
    assert!(!store.current().contains("JasonCom"));
    assert_eq!(store.history_len(), 1);
}

#[test]
fn test_exact_patch_and_inverse_restore_original() {
    let mut store = store();
    let original = store.current().to_string();
    let renamed = BRAND.replace("JasonCom", "Holiday Deals");

    let forward = Patch::new(BRAND, renamed.as_str());
    assert!(patch::apply(&mut store, &[forward.clone()]).success);
    assert_ne!(store.current(), original);

    let inverse = Patch::new(forward.replace, forward.search);
    let outcome = patch::apply(&mut store, &[inverse]);
    assert!(outcome.success);
    assert_eq!(outcome.tiers, [MatchTier::Exact]);
    assert_eq!(store.current(), original);
}

#[test]
fn test_batch_is_atomic() {
    let mut store = store();
    let before = store.current().to_string();
    let outcome = patch::apply(
        &mut store,
        &[
            Patch::new("JasonCom", "Winter Sale"),
            Patch::new("<p>this text is nowhere</p>", "<p>x</p>"),
            Patch::new("#4EA699", "#e53e3e"),
        ],
    );
    assert!(!outcome.success);
    assert!(matches!(
        outcome.error,
        Some(EditError::PatchNotFound { index: 2, .. })
    ));
    assert_eq!(store.current(), before);
    assert_eq!(store.history_len(), 0);
}

#[test]
fn test_whitespace_tolerant_match_equals_exact() {
    let canonical = r#"<p class="tagline" contenteditable="true">Everything you need to launch.</p>"#;
    let spaced = r#"<p class="tagline"  contenteditable="true">Everything  you need  to launch.</p>"#;
    let replacement = r#"<p class="tagline" contenteditable="true">Ship it today.</p>"#;

    let mut exact = store();
    assert!(patch::apply(&mut exact, &[Patch::new(canonical, replacement)]).success);

    let mut fuzzy = store();
    let outcome = patch::apply(&mut fuzzy, &[Patch::new(spaced, replacement)]);
    assert!(outcome.success);
    assert_eq!(outcome.tiers, [MatchTier::Whitespace]);
    assert_eq!(fuzzy.current(), exact.current());
}

#[test]
fn test_line_breaks_in_search_still_match() {
    let mut store = store();
    let search = "<h3 class=\"plan-name\" contenteditable=\"true\">Pro</h3>\n<div class=\"plan-price\" contenteditable=\"true\">$29</div>";
    let replace = "<h3 class=\"plan-name\" contenteditable=\"true\">Pro</h3>\n                <div class=\"plan-price\" contenteditable=\"true\">$39</div>";
    let outcome = patch::apply(&mut store, &[Patch::new(search, replace)]);
    assert!(outcome.success);
    assert_eq!(outcome.tiers, [MatchTier::Whitespace]);
    assert!(store.current().contains(">$39</div>"));
}

#[test]
fn test_invalid_result_is_auto_fixed() {
    let mut store = store();
    let banner = r#"<div class="limited-banner" id="limited-banner">Limited time offer!</div>"#;
    let broken = r#"<div class="limited-banner" id="limited-banner"><div>Limited time offer!</div>"#;
    let outcome = patch::apply(&mut store, &[Patch::new(banner, broken)]);
    assert!(outcome.success);
    assert!(outcome.auto_fixed);
    assert!(pagecraft::is_valid(store.current()));
}

#[test]
fn test_unfixable_result_is_rejected() {
    let mut store = store();
    let before = store.current().to_string();
    let outcome = patch::apply(
        &mut store,
        &[Patch::new(
            r#"<header class="hero">"#,
            r#"<header class="hero"><section>"#,
        )],
    );
    assert!(!outcome.success);
    assert!(matches!(
        outcome.error,
        Some(EditError::StructuralIntegrity { .. })
    ));
    assert!(outcome.rejected_html.as_deref().is_some_and(|h| h.contains("<section>")));
    assert_eq!(store.current(), before);
}

#[test]
fn test_empty_batch_is_validation_error() {
    let mut store = store();
    let outcome = patch::apply(&mut store, &[]);
    assert!(matches!(outcome.error, Some(EditError::Validation { .. })));
}

#[test]
fn test_noop_patch_warns_but_commits() {
    let mut store = store();
    let outcome = patch::apply(&mut store, &[Patch::new("JasonCom", "JasonCom")]);
    assert!(outcome.success);
    assert_eq!(outcome.warnings, ["patch 1 does not change anything"]);
}
