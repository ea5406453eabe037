//! Structural validity checks and the rule-based auto-fixer.
//!
//! html5ever never rejects input, so validity is decided by a tag-level scan
//! of the source text (balanced required end tags, no truncated markup) plus
//! a parse to confirm the tree has a `<body>`.

use facet::Facet;
use indexmap::IndexMap;
use regex::{Captures, Regex};
use std::ops::Range;
use std::sync::LazyLock;

use crate::dom;
use crate::serialize::is_void_element;
use crate::trace;

/// Why a document failed the structural check.
#[derive(Facet, Debug, Clone, PartialEq, Eq)]
#[facet(derive(Error))]
#[repr(u8)]
pub enum StructureError {
    /// document is empty
    Empty,
    /// unterminated <{tag}> tag at byte {offset}
    UnterminatedTag { tag: String, offset: usize },
    /// unterminated comment at byte {offset}
    UnterminatedComment { offset: usize },
    /// document has no explicit <{tag}> element
    MissingElement { tag: String },
    /// unbalanced <{tag}>: {opened} opened, {closed} closed
    Unbalanced {
        tag: String,
        opened: usize,
        closed: usize,
    },
    /// parsed tree has no body element
    NoBody,
}

/// Elements whose end tag HTML lets authors omit.
const OPTIONAL_END_TAGS: &[&str] = &[
    "html", "head", "body", "p", "li", "dt", "dd", "option", "optgroup", "tr", "td", "th",
    "thead", "tbody", "tfoot", "colgroup", "caption", "rb", "rt", "rp", "rtc",
];

/// Elements whose content is not markup.
const RAW_CONTENT: &[&str] = &["script", "style", "textarea", "title"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TagKind {
    Start,
    End,
}

#[derive(Debug, Clone)]
pub(crate) struct Tag {
    pub kind: TagKind,
    /// lowercased
    pub name: String,
    pub span: Range<usize>,
    pub self_closing: bool,
}

#[derive(Debug, Clone)]
pub(crate) struct RawSpan {
    pub name: String,
    pub content: Range<usize>,
}

/// Result of a lenient tag scan. Scanning stops at the first truncated tag or comment.
#[derive(Debug, Default)]
pub(crate) struct Scan {
    pub tags: Vec<Tag>,
    pub raw: Vec<RawSpan>,
    pub error: Option<StructureError>,
}

pub(crate) fn scan(html: &str) -> Scan {
    let bytes = html.as_bytes();
    let len = bytes.len();
    let mut out = Scan::default();
    let mut i = 0;

    while i < len {
        if bytes[i] != b'<' {
            i += 1;
            continue;
        }
        let rest = &bytes[i..];

        if rest.starts_with(b"<!--") {
            match find(bytes, i + 4, b"-->") {
                Some(end) => i = end + 3,
                None => {
                    out.error = Some(StructureError::UnterminatedComment { offset: i });
                    break;
                }
            }
            continue;
        }

        if rest.starts_with(b"<!") || rest.starts_with(b"<?") {
            match find(bytes, i, b">") {
                Some(end) => i = end + 1,
                None => {
                    out.error = Some(StructureError::UnterminatedTag {
                        tag: "!".to_string(),
                        offset: i,
                    });
                    break;
                }
            }
            continue;
        }

        let (kind, name_start) = if rest.get(1) == Some(&b'/') {
            (TagKind::End, i + 2)
        } else {
            (TagKind::Start, i + 1)
        };
        if !bytes.get(name_start).is_some_and(|b| b.is_ascii_alphabetic()) {
            // a literal '<' in text
            i += 1;
            continue;
        }

        let mut j = name_start;
        while j < len && (bytes[j].is_ascii_alphanumeric() || bytes[j] == b'-' || bytes[j] == b':')
        {
            j += 1;
        }
        let name = html[name_start..j].to_ascii_lowercase();

        let Some(end) = tag_end(bytes, j) else {
            out.error = Some(StructureError::UnterminatedTag {
                tag: name,
                offset: i,
            });
            break;
        };

        let self_closing = kind == TagKind::Start && end > j && bytes[end - 1] == b'/';
        let opens_raw =
            kind == TagKind::Start && !self_closing && RAW_CONTENT.contains(&name.as_str());
        out.tags.push(Tag {
            kind,
            name: name.clone(),
            span: i..end + 1,
            self_closing,
        });
        i = end + 1;

        if opens_raw {
            let closer = format!("</{name}");
            let content_end = find_ignore_case(bytes, i, closer.as_bytes()).unwrap_or(len);
            out.raw.push(RawSpan {
                name,
                content: i..content_end,
            });
            i = content_end;
        }
    }

    out
}

/// Index of the `>` closing a tag whose name ends at `from`, skipping quoted attribute values.
fn tag_end(bytes: &[u8], from: usize) -> Option<usize> {
    let mut quote: Option<u8> = None;
    let mut prev = 0u8;
    for (k, &b) in bytes.iter().enumerate().skip(from) {
        match quote {
            Some(q) => {
                if b == q {
                    quote = None;
                    prev = b;
                }
            }
            None => match b {
                b'>' => return Some(k),
                b'<' => return None,
                b'"' | b'\'' if prev == b'=' => quote = Some(b),
                _ if b.is_ascii_whitespace() => {}
                _ => prev = b,
            },
        }
    }
    None
}

fn find(haystack: &[u8], from: usize, needle: &[u8]) -> Option<usize> {
    haystack
        .get(from..)?
        .windows(needle.len())
        .position(|w| w == needle)
        .map(|p| p + from)
}

fn find_ignore_case(haystack: &[u8], from: usize, needle: &[u8]) -> Option<usize> {
    haystack
        .get(from..)?
        .windows(needle.len())
        .position(|w| w.eq_ignore_ascii_case(needle))
        .map(|p| p + from)
}

/// Start/end counts for every non-self-closing element, in first-seen order.
fn tag_counts(tags: &[Tag]) -> IndexMap<&str, (usize, usize)> {
    let mut counts: IndexMap<&str, (usize, usize)> = IndexMap::new();
    for tag in tags {
        if tag.self_closing {
            continue;
        }
        let entry = counts.entry(tag.name.as_str()).or_default();
        match tag.kind {
            TagKind::Start => entry.0 += 1,
            TagKind::End => entry.1 += 1,
        }
    }
    counts
}

/// Check that `html` is a complete, well-formed document.
pub fn check(html: &str) -> Result<(), StructureError> {
    if html.trim().is_empty() {
        return Err(StructureError::Empty);
    }

    let scanned = scan(html);
    if let Some(err) = scanned.error {
        return Err(err);
    }

    for required in ["html", "body"] {
        let present = scanned
            .tags
            .iter()
            .any(|t| t.kind == TagKind::Start && t.name == required);
        if !present {
            return Err(StructureError::MissingElement {
                tag: required.to_string(),
            });
        }
    }

    for (tag, (opened, closed)) in tag_counts(&scanned.tags) {
        if is_void_element(tag) || OPTIONAL_END_TAGS.contains(&tag) {
            continue;
        }
        if opened != closed {
            return Err(StructureError::Unbalanced {
                tag: tag.to_string(),
                opened,
                closed,
            });
        }
    }

    let doc = dom::parse(html);
    if doc.tag(doc.root) != Some("html") || doc.body().is_none() {
        return Err(StructureError::NoBody);
    }

    Ok(())
}

/// Convenience wrapper over [`check`].
pub fn is_valid(html: &str) -> bool {
    check(html).is_ok()
}

static VOID_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)<(br|hr|img|input|meta|link)\b([^<>]*)>").expect("static regex")
});

static START_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[a-zA-Z][^<>]*>").expect("static regex"));

static ATTR_VALUE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(\s[A-Za-z_:][\w:.-]*)=("[^"]*"|'[^']*'|[^\s"'<>`]+)"#).expect("static regex")
});

static EMPTY_THEN_REOPEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)<(div|p|h[1-6])([^<>]*)></(div|p|h[1-6])>\s*<(div|p|h[1-6])([^<>]*)>")
        .expect("static regex")
});

static AMPERSAND: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"&([A-Za-z][A-Za-z0-9]*;|#[0-9]+;|#[xX][0-9A-Fa-f]+;)?").expect("static regex")
});

/// Elements whose missing end tags the fixer appends.
const CLOSABLE: &[&str] = &["div", "p", "span", "h1", "h2", "h3", "h4", "h5", "h6"];

/// Apply the repair rules in their fixed order. Each rule is idempotent.
pub fn auto_fix(html: &str) -> String {
    let fixed = self_close_void_tags(html);
    let fixed = quote_attribute_values(&fixed);
    let fixed = collapse_empty_reopen(&fixed);
    let fixed = escape_bare_ampersands(&fixed);
    let fixed = close_unclosed(&fixed);
    trace!(
        before = html.len(),
        after = fixed.len(),
        "auto-fix pass complete"
    );
    fixed
}

/// Run `f` over every stretch of `html` that is not script or style source.
fn map_markup(html: &str, f: impl Fn(&str) -> String) -> String {
    let scanned = scan(html);
    let mut out = String::with_capacity(html.len());
    let mut cursor = 0;
    for raw in scanned
        .raw
        .iter()
        .filter(|r| r.name == "script" || r.name == "style")
    {
        out.push_str(&f(&html[cursor..raw.content.start]));
        out.push_str(&html[raw.content.clone()]);
        cursor = raw.content.end;
    }
    out.push_str(&f(&html[cursor..]));
    out
}

/// Rule 1: `<br>` becomes `<br />`.
fn self_close_void_tags(html: &str) -> String {
    map_markup(html, |segment| {
        VOID_TAG
            .replace_all(segment, |caps: &Captures| {
                let rest = caps[2].trim_end();
                if rest.ends_with('/') {
                    caps[0].to_string()
                } else {
                    format!("<{}{} />", &caps[1], rest)
                }
            })
            .into_owned()
    })
}

/// Rule 2: `class=hero` becomes `class="hero"`, inside tags only.
fn quote_attribute_values(html: &str) -> String {
    map_markup(html, |segment| {
        START_TAG
            .replace_all(segment, |caps: &Captures| {
                let tag = &caps[0];
                let inner = &tag[..tag.len() - 1];
                let (body, tail) = match inner.strip_suffix('/') {
                    Some(body) => (body, "/>"),
                    None => (inner, ">"),
                };
                let quoted = ATTR_VALUE.replace_all(body, |attr: &Captures| {
                    let value = &attr[2];
                    if value.starts_with(['"', '\'']) {
                        attr[0].to_string()
                    } else {
                        format!("{}=\"{}\"", &attr[1], value)
                    }
                });
                format!("{quoted}{tail}")
            })
            .into_owned()
    })
}

/// Rule 3: `<div a></div> <div a>` collapses to `<div a>`.
fn collapse_empty_reopen(html: &str) -> String {
    map_markup(html, |segment| {
        EMPTY_THEN_REOPEN
            .replace_all(segment, |caps: &Captures| {
                let same_tag = caps[1].eq_ignore_ascii_case(&caps[3])
                    && caps[1].eq_ignore_ascii_case(&caps[4]);
                if same_tag && caps[2] == caps[5] {
                    format!("<{}{}>", &caps[1], &caps[2])
                } else {
                    caps[0].to_string()
                }
            })
            .into_owned()
    })
}

/// Rule 4: a bare `&` becomes `&amp;`; entities are left alone.
fn escape_bare_ampersands(html: &str) -> String {
    map_markup(html, |segment| {
        AMPERSAND
            .replace_all(segment, |caps: &Captures| match caps.get(1) {
                Some(entity) => format!("&{}", entity.as_str()),
                None => "&amp;".to_string(),
            })
            .into_owned()
    })
}

/// Rule 5: append end tags for elements opened more often than closed.
fn close_unclosed(html: &str) -> String {
    let scanned = scan(html);
    let counts = tag_counts(&scanned.tags);
    let mut fixed = html.to_string();
    for tag in CLOSABLE {
        if let Some(&(opened, closed)) = counts.get(tag)
            && opened > closed
        {
            for _ in closed..opened {
                fixed.push_str("</");
                fixed.push_str(tag);
                fixed.push('>');
            }
        }
    }
    fixed
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(body: &str) -> String {
        format!("<!DOCTYPE html>\n<html><head><title>t</title></head><body>{body}</body></html>")
    }

    #[test]
    fn accepts_well_formed_document() {
        assert_eq!(check(&page("<div class=\"hero\"><h1>Sale</h1><p>Hi</div>")), Ok(()));
    }

    #[test]
    fn rejects_empty_and_fragments() {
        assert_eq!(check("   "), Err(StructureError::Empty));
        assert_eq!(
            check("<div>only a fragment</div>"),
            Err(StructureError::MissingElement {
                tag: "html".to_string()
            })
        );
    }

    #[test]
    fn rejects_unclosed_div() {
        assert_eq!(
            check(&page("<div><span>x</span>")),
            Err(StructureError::Unbalanced {
                tag: "div".to_string(),
                opened: 1,
                closed: 0,
            })
        );
    }

    #[test]
    fn rejects_stray_closer() {
        assert!(matches!(
            check(&page("<section></section></section>")),
            Err(StructureError::Unbalanced { .. })
        ));
    }

    #[test]
    fn rejects_truncated_tag() {
        let html = "<html><body><div class=\"x\"";
        assert!(matches!(
            check(html),
            Err(StructureError::UnterminatedTag { .. })
        ));
    }

    #[test]
    fn rejects_truncated_comment() {
        assert!(matches!(
            check(&page("<!-- note")),
            Err(StructureError::UnterminatedComment { .. })
        ));
    }

    #[test]
    fn ignores_markup_inside_script_and_quotes() {
        let html = page(r#"<script>if (a < b) { s = "<div>"; }</script><a title="1 > 0">x</a>"#);
        assert_eq!(check(&html), Ok(()));
    }

    #[test]
    fn scan_records_raw_spans() {
        let scanned = scan("<style>p > a {}</style><p>x</p>");
        assert_eq!(scanned.raw.len(), 1);
        assert_eq!(scanned.raw[0].name, "style");
        let names: Vec<&str> = scanned.tags.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, ["style", "style", "p", "p"]);
    }

    #[test]
    fn auto_fix_repairs_missing_closer() {
        let broken = page("<div class=hero><h2>Deal");
        assert!(!is_valid(&broken));
        let fixed = auto_fix(&broken);
        assert!(fixed.contains(r#"<div class="hero">"#));
        assert!(fixed.ends_with("</div></h2>"));
        assert!(is_valid(&fixed));
    }

    #[test]
    fn auto_fix_is_idempotent() {
        let broken = page("<p>Tom & Jerry<br><img src=a.png><div></div> <div>x");
        let once = auto_fix(&broken);
        assert_eq!(auto_fix(&once), once);
    }

    #[test]
    fn quoting_skips_already_quoted_values() {
        let tag = r#"<meta name="viewport" content="width=device-width, initial-scale=1.0">"#;
        assert_eq!(quote_attribute_values(tag), tag);
        assert_eq!(
            quote_attribute_values("<td colspan=2 title='a b=c'>"),
            r#"<td colspan="2" title='a b=c'>"#
        );
        assert_eq!(
            quote_attribute_values("<a href=/buy?plan=pro>"),
            r#"<a href="/buy?plan=pro">"#
        );
    }

    #[test]
    fn auto_fix_leaves_scripts_alone() {
        let html = page("<script>if (a && b) { x = '<br>'; }</script>");
        assert_eq!(auto_fix(&html), html);

        let template = page("<script>const card = '<div class=\"c\"></div>\n<div class=\"c\">';</script>");
        assert_eq!(collapse_empty_reopen(&template), template);
    }
}
