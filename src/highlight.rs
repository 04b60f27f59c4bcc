//! Character-level highlighting of modified lines.
//!
//! Works on HTML-escaped text. A deleted line and the added line paired with
//! it share a common prefix and suffix; the span in between is wrapped in
//! `<del>` on the deleted side and `<ins>` on the added side.

use crate::diff::hunk::{Action, Line};

/// Escape the characters that are significant in HTML text content.
///
/// Quotes are left alone: the output is only ever placed between tags.
#[must_use]
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            c => escaped.push(c),
        }
    }
    escaped
}

/// Marked renditions of a deleted/added line pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkedPair {
    pub deleted: String,
    pub added: String,
}

/// Wrap the differing middle of `deleted` and `added` in `<del>`/`<ins>`.
///
/// Returns `None` when the lines share neither a prefix nor a suffix; such
/// lines are shown unmarked.
///
/// ```
/// use hunkmark::highlight::highlight_pair;
///
/// let marked = highlight_pair("hello world", "hello earth").unwrap();
/// assert_eq!(marked.deleted, "hello <del>world</del>");
/// assert_eq!(marked.added, "hello <ins>earth</ins>");
///
/// assert_eq!(highlight_pair("abc", "xyz"), None);
/// ```
#[must_use]
pub fn highlight_pair(deleted: &str, added: &str) -> Option<MarkedPair> {
    let (prefix, suffix) = common_bounds(deleted, added);
    if prefix == 0 && suffix == 0 {
        return None;
    }

    Some(MarkedPair {
        deleted: mark(deleted, prefix, suffix, "del"),
        added: mark(added, prefix, suffix, "ins"),
    })
}

/// Byte lengths of the shared prefix and of the shared suffix of what
/// remains after the prefix. Both are identical text in `a` and `b`, so the
/// lengths apply to either string.
fn common_bounds(a: &str, b: &str) -> (usize, usize) {
    let prefix = entity_safe_prefix(&a[..common_prefix(a, b)]);
    let (a_rest, b_rest) = (&a[prefix..], &b[prefix..]);

    let suffix = common_suffix(a_rest, b_rest);
    let suffix = entity_safe_suffix(a_rest, suffix).min(entity_safe_suffix(b_rest, suffix));
    (prefix, suffix)
}

fn common_prefix(a: &str, b: &str) -> usize {
    a.chars()
        .zip(b.chars())
        .take_while(|(x, y)| x == y)
        .map(|(c, _)| c.len_utf8())
        .sum()
}

fn common_suffix(a: &str, b: &str) -> usize {
    a.chars()
        .rev()
        .zip(b.chars().rev())
        .take_while(|(x, y)| x == y)
        .map(|(c, _)| c.len_utf8())
        .sum()
}

/// Whether `text` ends inside an `&...;` entity
fn ends_in_entity(text: &str) -> Option<usize> {
    let amp = text.rfind('&')?;
    match text.rfind(';') {
        Some(semi) if semi > amp => None,
        _ => Some(amp),
    }
}

/// Pull a prefix back to the `&` of an entity it would cut in half
fn entity_safe_prefix(prefix: &str) -> usize {
    ends_in_entity(prefix).unwrap_or(prefix.len())
}

/// Push a suffix forward past the `;` of an entity it would cut in half
fn entity_safe_suffix(text: &str, suffix: usize) -> usize {
    let boundary = text.len() - suffix;
    if ends_in_entity(&text[..boundary]).is_none() {
        return suffix;
    }
    match text[boundary..].find(';') {
        Some(semi) => suffix - (semi + 1),
        None => suffix,
    }
}

fn mark(text: &str, prefix: usize, suffix: usize, tag: &str) -> String {
    let end = text.len() - suffix;
    format!(
        "{}<{tag}>{}</{tag}>{}",
        &text[..prefix],
        &text[prefix..end],
        &text[end..]
    )
}

/// Length of the run of `action` lines at the start of `lines`
fn run_length(lines: &[Line], action: Action) -> usize {
    lines.iter().take_while(|l| l.action == action).count()
}

/// Highlight same-index pairs of equally long delete/add runs.
///
/// A maximal run of Delete lines directly followed by a maximal run of Add
/// lines of the same length is paired element by element. Runs of unequal
/// length have no natural correspondence and stay unmarked.
#[must_use]
pub fn pair_change_runs(lines: Vec<Line>) -> Vec<Line> {
    let mut marks: Vec<Option<String>> = vec![None; lines.len()];

    let mut i = 0;
    while i < lines.len() {
        let deleted = run_length(&lines[i..], Action::Delete);
        if deleted == 0 {
            i += 1;
            continue;
        }

        let add_start = i + deleted;
        let added = run_length(&lines[add_start..], Action::Add);
        if added == deleted {
            for k in 0..deleted {
                if let Some(pair) = highlight_pair(&lines[i + k].text, &lines[add_start + k].text) {
                    marks[i + k] = Some(pair.deleted);
                    marks[add_start + k] = Some(pair.added);
                }
            }
        } else {
            log::trace!("not pairing {deleted} deleted with {added} added lines");
        }
        i = add_start + added;
    }

    lines
        .into_iter()
        .zip(marks)
        .map(|(line, mark)| match mark {
            Some(marked) => line.with_highlight(marked),
            None => line,
        })
        .collect()
}

/// Remove `<del>`, `</del>`, `<ins>` and `</ins>` markers.
///
/// Markup in line text is always escaped, so the literal tags can only come
/// from [`highlight_pair`].
#[must_use]
pub fn strip_markers(marked: &str) -> String {
    ["<del>", "</del>", "<ins>", "</ins>"]
        .iter()
        .fold(marked.to_string(), |text, tag| text.replace(tag, ""))
}
