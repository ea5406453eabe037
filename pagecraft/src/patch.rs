//! Whole-document search/replace with a three-tier fuzzy ladder.
//!
//! Each patch is tried as an exact substring first (first occurrence only),
//! then as a pattern where every whitespace run in the search text matches
//! one or more whitespace characters, then as a pattern where it matches zero
//! or more. The fuzzy tiers replace every match. A batch is all-or-nothing:
//! the store only changes once every patch matched and the result validates.

use facet::Facet;
use regex::{NoExpand, Regex};

use crate::error::EditError;
use crate::store::DocumentStore;
use crate::validate;
use crate::{debug, warn};

/// Literal find/replace proposed by the generator.
#[derive(Facet, Debug, Clone, PartialEq, Eq)]
pub struct Patch {
    pub search: String,
    pub replace: String,
    #[facet(default)]
    pub description: Option<String>,
}

impl Patch {
    pub fn new(search: impl Into<String>, replace: impl Into<String>) -> Self {
        Self {
            search: search.into(),
            replace: replace.into(),
            description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Which rung of the ladder matched a patch.
#[derive(Facet, Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum MatchTier {
    Exact,
    Whitespace,
    Flexible,
}

/// Result of [`apply`]. Patch positions in errors are 1-based.
#[derive(Facet, Debug, Clone, PartialEq)]
pub struct PatchOutcome {
    pub success: bool,
    pub applied_count: usize,
    /// Committed document on success
    pub html: Option<String>,
    pub error: Option<EditError>,
    /// Last candidate that failed validation, kept for the repair fallback
    pub rejected_html: Option<String>,
    pub auto_fixed: bool,
    pub tiers: Vec<MatchTier>,
    pub warnings: Vec<String>,
}

impl PatchOutcome {
    fn failed(error: EditError, warnings: Vec<String>) -> Self {
        Self {
            success: false,
            applied_count: 0,
            html: None,
            error: Some(error),
            rejected_html: None,
            auto_fixed: false,
            tiers: Vec::new(),
            warnings,
        }
    }
}

/// Check batch-level invariants. Returns soft warnings on success.
pub fn validate_patches(patches: &[Patch]) -> Result<Vec<String>, EditError> {
    if patches.is_empty() {
        return Err(EditError::validation("no patches to apply"));
    }
    let mut warnings = Vec::new();
    for (i, patch) in patches.iter().enumerate() {
        if patch.search.is_empty() {
            return Err(EditError::validation(format!(
                "patch {} has an empty search string",
                i + 1
            )));
        }
        if patch.search == patch.replace {
            warnings.push(format!("patch {} does not change anything", i + 1));
        }
    }
    Ok(warnings)
}

/// Regex for `search` with every whitespace run replaced by `gap`.
fn whitespace_pattern(search: &str, gap: &str) -> Option<Regex> {
    if search.trim().is_empty() {
        return None;
    }
    let mut pattern = String::with_capacity(search.len() * 2);
    let mut literal = String::new();
    let mut in_gap = false;
    for c in search.chars() {
        if c.is_whitespace() {
            if !in_gap {
                pattern.push_str(&regex::escape(&literal));
                literal.clear();
                pattern.push_str(gap);
                in_gap = true;
            }
        } else {
            literal.push(c);
            in_gap = false;
        }
    }
    pattern.push_str(&regex::escape(&literal));
    Regex::new(&pattern).ok()
}

/// Apply one patch to `text`, or `None` if no tier matches.
pub fn apply_one(text: &str, patch: &Patch) -> Option<(String, MatchTier)> {
    if patch.search.is_empty() {
        return None;
    }

    if text.contains(&patch.search) {
        return Some((text.replacen(&patch.search, &patch.replace, 1), MatchTier::Exact));
    }

    for (gap, tier) in [(r"\s+", MatchTier::Whitespace), (r"\s*", MatchTier::Flexible)] {
        let Some(re) = whitespace_pattern(&patch.search, gap) else {
            continue;
        };
        if re.is_match(text) {
            let replaced = re.replace_all(text, NoExpand(&patch.replace)).into_owned();
            return Some((replaced, tier));
        }
    }

    None
}

fn preview(search: &str) -> String {
    const MAX: usize = 80;
    if search.chars().count() <= MAX {
        search.to_string()
    } else {
        let mut short: String = search.chars().take(MAX).collect();
        short.push_str("...");
        short
    }
}

/// Apply `patches` in order against the store's document, committing only if all succeed.
pub fn apply(store: &mut DocumentStore, patches: &[Patch]) -> PatchOutcome {
    let warnings = match validate_patches(patches) {
        Ok(warnings) => warnings,
        Err(err) => return PatchOutcome::failed(err, Vec::new()),
    };

    let mut working = store.current().to_string();
    let mut tiers = Vec::with_capacity(patches.len());
    for (i, patch) in patches.iter().enumerate() {
        match apply_one(&working, patch) {
            Some((next, tier)) => {
                debug!(index = i + 1, ?tier, "patch matched");
                working = next;
                tiers.push(tier);
            }
            None => {
                warn!(index = i + 1, "patch search text not found");
                return PatchOutcome::failed(
                    EditError::PatchNotFound {
                        index: i + 1,
                        search: preview(&patch.search),
                    },
                    warnings,
                );
            }
        }
    }

    let mut auto_fixed = false;
    if validate::check(&working).is_err() {
        let fixed = validate::auto_fix(&working);
        if let Err(err) = validate::check(&fixed) {
            warn!(error = %err, "patched document still invalid after auto-fix");
            let mut outcome = PatchOutcome::failed(err.into(), warnings);
            outcome.rejected_html = Some(fixed);
            outcome.tiers = tiers;
            return outcome;
        }
        debug!("auto-fix repaired patched document");
        working = fixed;
        auto_fixed = true;
    }

    match store.commit(working) {
        Ok(_) => PatchOutcome {
            success: true,
            applied_count: patches.len(),
            html: Some(store.current().to_string()),
            error: None,
            rejected_html: None,
            auto_fixed,
            tiers,
            warnings,
        },
        Err(err) => PatchOutcome::failed(err, warnings),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_replaces_first_occurrence_only() {
        let (out, tier) = apply_one("<b>x</b><b>x</b>", &Patch::new("<b>x</b>", "<i>y</i>")).unwrap();
        assert_eq!(out, "<i>y</i><b>x</b>");
        assert_eq!(tier, MatchTier::Exact);
    }

    #[test]
    fn whitespace_tier_replaces_all_matches() {
        let text = "<p>Big   sale</p>\n<p>Big\tsale</p>";
        let (out, tier) = apply_one(text, &Patch::new("<p>Big sale</p>", "<p>Huge sale</p>")).unwrap();
        assert_eq!(out, "<p>Huge sale</p>\n<p>Huge sale</p>");
        assert_eq!(tier, MatchTier::Whitespace);
    }

    #[test]
    fn flexible_tier_tolerates_missing_whitespace() {
        let text = "<ul><li>A</li></ul>";
        let (out, tier) = apply_one(text, &Patch::new("<ul>\n  <li>A</li>\n</ul>", "<ul></ul>")).unwrap();
        assert_eq!(out, "<ul></ul>");
        assert_eq!(tier, MatchTier::Flexible);
    }

    #[test]
    fn regex_metacharacters_are_literal() {
        let text = "price: $9.99 (today)";
        let patch = Patch::new("$9.99  (today)", "$4.99 (today)");
        let (out, _) = apply_one(text, &patch).unwrap();
        assert_eq!(out, "price: $4.99 (today)");
        assert!(apply_one("price: $9x99 (today)", &Patch::new("$9.99  (today)", "")).is_none());
    }

    #[test]
    fn replacement_is_not_expanded() {
        let (out, _) = apply_one("a  b", &Patch::new("a b", "$1 ${0}")).unwrap();
        assert_eq!(out, "$1 ${0}");
    }

    #[test]
    fn whitespace_only_search_never_fuzzes() {
        assert!(apply_one("abc", &Patch::new("  ", "x")).is_none());
    }

    #[test]
    fn validation_rules() {
        assert!(validate_patches(&[]).is_err());
        assert!(validate_patches(&[Patch::new("", "x")]).is_err());
        let warnings = validate_patches(&[Patch::new("a", "a")]).unwrap();
        assert_eq!(warnings, ["patch 1 does not change anything"]);
    }

    #[test]
    fn preview_truncates_on_char_boundary() {
        let long = "é".repeat(100);
        let short = preview(&long);
        assert_eq!(short.chars().count(), 83);
        assert!(short.ends_with("..."));
    }
}
