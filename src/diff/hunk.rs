use nom::bytes::complete::tag;
use nom::character::complete::{char, u32 as number};
use nom::combinator::opt;
use nom::sequence::{delimited, preceded, separated_pair};
use nom::{IResult, Parser};
use serde::Serialize;

use super::{Input, ParseError};
use crate::highlight::pair_change_runs;

/// What a body line does to the old and new documents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    /// Present on both sides
    Context,
    /// Present only in the new document
    Add,
    /// Present only in the old document
    Delete,
}

impl Action {
    #[must_use]
    pub fn affects_old(self) -> bool {
        matches!(self, Action::Context | Action::Delete)
    }

    #[must_use]
    pub fn affects_new(self) -> bool {
        matches!(self, Action::Context | Action::Add)
    }
}

/// A single classified line of a hunk body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Line {
    pub action: Action,
    /// 1-based line number in the old document (Context and Delete only)
    pub old_lineno: Option<u32>,
    /// 1-based line number in the new document (Context and Add only)
    pub new_lineno: Option<u32>,
    /// HTML-escaped line content without its diff marker
    pub text: String,
    /// `text` with the changed span wrapped in `<del>`/`<ins>`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub highlighted: Option<String>,
    /// Followed by a `\ No newline at end of file` marker
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub missing_final_newline: bool,
}

impl Line {
    /// Same line carrying an inline-highlighted rendition of its text
    #[must_use]
    pub fn with_highlight(self, highlighted: String) -> Self {
        Self {
            highlighted: Some(highlighted),
            ..self
        }
    }

    /// Highlighted text when present, plain text otherwise
    #[must_use]
    pub fn display_text(&self) -> &str {
        self.highlighted.as_deref().unwrap_or(&self.text)
    }
}

/// Running zero-based positions in the old and new documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cursors {
    pub old: u32,
    pub new: u32,
}

/// Diff marker at the start of a hunk body line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Marker {
    Context,
    Add,
    Delete,
    /// A bare `"` line. Seen in diffs of gettext catalogs where a line holding
    /// only a quote loses its leading space somewhere upstream.
    QuoteQuirk,
    /// Empty line standing for an empty context line whose single space was stripped
    Blank,
}

impl Marker {
    fn of(line: &str) -> Result<Self, ParseError> {
        match first_char_unescaped(line) {
            None => Ok(Marker::Blank),
            Some(' ') => Ok(Marker::Context),
            Some('+') => Ok(Marker::Add),
            Some('-') => Ok(Marker::Delete),
            Some('"') => Ok(Marker::QuoteQuirk),
            Some(marker) => Err(ParseError::UnexpectedLineMarker { marker }),
        }
    }
}

/// First character of an escaped line as it was written in the diff
fn first_char_unescaped(line: &str) -> Option<char> {
    [("&lt;", '<'), ("&gt;", '>'), ("&amp;", '&')]
        .into_iter()
        .find(|(entity, _)| line.starts_with(entity))
        .map(|(_, c)| c)
        .or_else(|| line.chars().next())
}

/// Classify one raw (escaped) body line and advance the cursors past it.
///
/// | marker  | action  | old | new |
/// |---------|---------|-----|-----|
/// | ` `     | Context | +1  | +1  |
/// | `+`     | Add     |     | +1  |
/// | `-`     | Delete  | +1  |     |
/// | `"`     | Context | +1  | +1  |
/// | (empty) | Context | +1  | +1  |
///
/// # Errors
///
/// Returns [`ParseError::UnexpectedLineMarker`] for any other first character
/// and [`ParseError::LineNumberOverflow`] if a cursor would pass `u32::MAX`.
pub fn classify(raw: &str, cursors: Cursors) -> Result<(Line, Cursors), ParseError> {
    let marker = Marker::of(raw)?;
    let (action, text) = match marker {
        Marker::Context => (Action::Context, &raw[1..]),
        Marker::Add => (Action::Add, &raw[1..]),
        Marker::Delete => (Action::Delete, &raw[1..]),
        Marker::QuoteQuirk => (Action::Context, "\""),
        Marker::Blank => (Action::Context, ""),
    };

    let mut next = cursors;
    let mut old_lineno = None;
    let mut new_lineno = None;
    let overflow = || ParseError::LineNumberOverflow {
        old: cursors.old,
        new: cursors.new,
    };
    if action.affects_old() {
        next.old = next.old.checked_add(1).ok_or_else(overflow)?;
        old_lineno = Some(next.old);
    }
    if action.affects_new() {
        next.new = next.new.checked_add(1).ok_or_else(overflow)?;
        new_lineno = Some(next.new);
    }

    Ok((
        Line {
            action,
            old_lineno,
            new_lineno,
            text: text.to_string(),
            highlighted: None,
            missing_final_newline: false,
        },
        next,
    ))
}

/// Parsed `@@ -A[,B] +C[,D] @@ [section]` line, starts converted to zero-based cursors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HunkHeader {
    pub old_start: u32,
    pub old_count: u32,
    pub new_start: u32,
    pub new_count: u32,
    /// Trailing text after the closing `@@`, usually an enclosing function
    pub section: Option<String>,
}

impl HunkHeader {
    /// Parse a hunk header line. Omitted counts default to 1.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::MalformedHunkHeader`] if the line does not match
    /// or a range ends past `u32::MAX`.
    pub fn parse(line: &str) -> Result<Self, ParseError> {
        let malformed = || ParseError::MalformedHunkHeader {
            header: line.to_string(),
        };
        let Ok((rest, ((old_start, old_count), (new_start, new_count)))) = ranges(line) else {
            return Err(malformed());
        };

        let old_start = old_start.saturating_sub(1);
        let new_start = new_start.saturating_sub(1);
        if old_start.checked_add(old_count).is_none() || new_start.checked_add(new_count).is_none()
        {
            return Err(malformed());
        }

        let section = rest.trim();
        Ok(HunkHeader {
            old_start,
            old_count,
            new_start,
            new_count,
            section: (!section.is_empty()).then(|| section.to_string()),
        })
    }

    /// Cursors after the last line; `parse` guarantees both sums fit
    fn end(&self) -> Cursors {
        Cursors {
            old: self.old_start + self.old_count,
            new: self.new_start + self.new_count,
        }
    }
}

/// `-A,B +C,D` between the `@@` fences
fn ranges(input: &str) -> IResult<&str, ((u32, u32), (u32, u32))> {
    delimited(tag("@@ -"), separated_pair(range, tag(" +"), range), tag(" @@")).parse(input)
}

/// `start[,count]`
fn range(input: &str) -> IResult<&str, (u32, u32)> {
    (number, opt(preceded(char(','), number)))
        .map(|(start, count)| (start, count.unwrap_or(1)))
        .parse(input)
}

/// One contiguous block of a unified diff.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Hunk {
    /// Zero-based cursor of the first old line
    pub old_start: u32,
    pub old_count: u32,
    /// Zero-based cursor of the first new line
    pub new_start: u32,
    pub new_count: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub section: Option<String>,
    pub lines: Vec<Line>,
}

impl Hunk {
    /// Read body lines for `header` until both declared counts are met,
    /// then pair change runs for inline highlighting.
    ///
    /// On error the offending line is left unconsumed.
    pub(crate) fn read(header: HunkHeader, input: &mut Input) -> Result<Self, ParseError> {
        let end = header.end();
        let mut cursors = Cursors {
            old: header.old_start,
            new: header.new_start,
        };
        let mut lines: Vec<Line> = Vec::new();

        while cursors != end {
            let Some(raw) = input.peek() else {
                return Err(ParseError::TruncatedHunk {
                    expected_old: header.old_count,
                    expected_new: header.new_count,
                    seen_old: cursors.old - header.old_start,
                    seen_new: cursors.new - header.new_start,
                });
            };

            if raw.starts_with('\\') {
                mark_missing_newline(&mut lines);
                input.advance();
                continue;
            }

            let overrun = ParseError::HunkCountMismatch {
                expected_old: header.old_count,
                expected_new: header.new_count,
            };
            // A cursor can only overflow when it already sits on its end at u32::MAX
            let (line, next) = match classify(raw, cursors) {
                Ok((_, next)) if next.old > end.old || next.new > end.new => return Err(overrun),
                Err(ParseError::LineNumberOverflow { .. }) => return Err(overrun),
                step => step?,
            };

            input.advance();
            lines.push(line);
            cursors = next;
        }

        // The marker for the hunk's final line comes after the counts are met
        if input.peek().is_some_and(|raw| raw.starts_with('\\')) {
            mark_missing_newline(&mut lines);
            input.advance();
        }

        log::debug!(
            "hunk -{},{} +{},{} complete with {} lines",
            header.old_start,
            header.old_count,
            header.new_start,
            header.new_count,
            lines.len()
        );

        Ok(Hunk {
            old_start: header.old_start,
            old_count: header.old_count,
            new_start: header.new_start,
            new_count: header.new_count,
            section: header.section,
            lines: pair_change_runs(lines),
        })
    }

    /// Lines present in the old document, in order
    pub fn old_lines(&self) -> impl Iterator<Item = &Line> {
        self.lines.iter().filter(|l| l.action.affects_old())
    }

    /// Lines present in the new document, in order
    pub fn new_lines(&self) -> impl Iterator<Item = &Line> {
        self.lines.iter().filter(|l| l.action.affects_new())
    }
}

fn mark_missing_newline(lines: &mut [Line]) {
    if let Some(last) = lines.last_mut() {
        last.missing_final_newline = true;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use similar_asserts::assert_eq;

    fn header(line: &str) -> HunkHeader {
        HunkHeader::parse(line).unwrap()
    }

    fn read(text: &str) -> Result<Hunk, ParseError> {
        let mut input = Input::new(text);
        let header = HunkHeader::parse(input.peek().unwrap())?;
        input.advance();
        Hunk::read(header, &mut input)
    }

    #[test]
    fn parse_header_full() {
        assert_eq!(
            header("@@ -10,2 +10,3 @@"),
            HunkHeader {
                old_start: 9,
                old_count: 2,
                new_start: 9,
                new_count: 3,
                section: None,
            }
        );
    }

    #[test]
    fn parse_header_default_counts() {
        let h = header("@@ -15 +14,0 @@");
        assert_eq!((h.old_start, h.old_count), (14, 1));
        assert_eq!((h.new_start, h.new_count), (13, 0));
    }

    #[test]
    fn parse_header_keeps_section() {
        let h = header("@@ -38,0 +39,5 @@ fn main() {");
        assert_eq!(h.section.as_deref(), Some("fn main() {"));
    }

    #[test]
    fn parse_header_zero_start_saturates() {
        let h = header("@@ -0,0 +1,3 @@");
        assert_eq!((h.old_start, h.old_count), (0, 0));
        assert_eq!((h.new_start, h.new_count), (0, 3));
    }

    #[test]
    fn parse_header_rejects_garbage() {
        for line in [
            "@@ -a,1 +1 @@",
            "@@ -1,1 +1",
            "@@@ -1,1 -1,1 +1,1 @@@",
            "@@ 1,1 +1,1 @@",
            "@@ -1,1 +1,1@@",
        ] {
            assert!(
                matches!(
                    HunkHeader::parse(line),
                    Err(ParseError::MalformedHunkHeader { .. })
                ),
                "{line} should be rejected"
            );
        }
    }

    #[test]
    fn parse_header_rejects_overflowing_range() {
        for line in ["@@ -4294967295,2 +1 @@", "@@ -1 +4294967290,7 @@"] {
            assert!(
                matches!(
                    HunkHeader::parse(line),
                    Err(ParseError::MalformedHunkHeader { .. })
                ),
                "{line} should be rejected"
            );
        }
    }

    #[test]
    fn parse_header_accepts_range_ending_at_max() {
        let h = header("@@ -4294967295 +4294967290,6 @@");
        assert_eq!((h.old_start, h.old_count), (u32::MAX - 1, 1));
        assert_eq!((h.new_start, h.new_count), (u32::MAX - 6, 6));
    }

    #[test]
    fn classify_table() {
        let start = Cursors { old: 4, new: 7 };

        let (line, next) = classify(" same", start).unwrap();
        assert_eq!(line.action, Action::Context);
        assert_eq!((line.old_lineno, line.new_lineno), (Some(5), Some(8)));
        assert_eq!(line.text, "same");
        assert_eq!(next, Cursors { old: 5, new: 8 });

        let (line, next) = classify("+added", start).unwrap();
        assert_eq!(line.action, Action::Add);
        assert_eq!((line.old_lineno, line.new_lineno), (None, Some(8)));
        assert_eq!(next, Cursors { old: 4, new: 8 });

        let (line, next) = classify("-gone", start).unwrap();
        assert_eq!(line.action, Action::Delete);
        assert_eq!((line.old_lineno, line.new_lineno), (Some(5), None));
        assert_eq!(next, Cursors { old: 5, new: 7 });
    }

    #[test]
    fn classify_quote_quirk_is_context() {
        let (line, next) = classify("\"msgstr", Cursors { old: 0, new: 0 }).unwrap();
        assert_eq!(line.action, Action::Context);
        assert_eq!(line.text, "\"");
        assert_eq!(next, Cursors { old: 1, new: 1 });
    }

    #[test]
    fn classify_blank_is_empty_context() {
        let (line, next) = classify("", Cursors { old: 2, new: 3 }).unwrap();
        assert_eq!(line.action, Action::Context);
        assert_eq!(line.text, "");
        assert_eq!(next, Cursors { old: 3, new: 4 });
    }

    #[test]
    fn classify_rejects_unknown_marker() {
        let result = classify("*what", Cursors { old: 0, new: 0 });
        assert!(matches!(
            result,
            Err(ParseError::UnexpectedLineMarker { marker: '*' })
        ));
    }

    #[test]
    fn classify_reports_marker_before_escaping() {
        for (raw, expected) in [("&lt;b", '<'), ("&gt;b", '>'), ("&amp;b", '&')] {
            let result = classify(raw, Cursors { old: 0, new: 0 });
            assert!(
                matches!(result, Err(ParseError::UnexpectedLineMarker { marker }) if marker == expected),
                "{raw} should report '{expected}'"
            );
        }
    }

    #[test]
    fn classify_refuses_to_pass_max() {
        let result = classify(" a", Cursors { old: u32::MAX, new: 3 });
        assert!(matches!(
            result,
            Err(ParseError::LineNumberOverflow { old: u32::MAX, new: 3 })
        ));
        let (line, _) = classify("+a", Cursors { old: u32::MAX, new: 3 }).unwrap();
        assert_eq!(line.new_lineno, Some(4));
    }

    #[test]
    fn read_hunk_highlights_pair() {
        let hunk = read("@@ -1,3 +1,3 @@\n common\n-hello world\n+hello earth\n common").unwrap();
        assert_eq!(hunk.lines.len(), 4);
        assert_eq!(hunk.lines[1].highlighted.as_deref(), Some("hello <del>world</del>"));
        assert_eq!(hunk.lines[2].highlighted.as_deref(), Some("hello <ins>earth</ins>"));
        assert_eq!(hunk.lines[0].highlighted, None);
        assert_eq!(hunk.lines[3].old_lineno, Some(3));
        assert_eq!(hunk.lines[3].new_lineno, Some(3));
    }

    #[test]
    fn read_hunk_stops_at_counts() {
        let mut input = Input::new("@@ -1 +1 @@\n-a\n+b\n trailing");
        let header = HunkHeader::parse(input.peek().unwrap()).unwrap();
        input.advance();
        let hunk = Hunk::read(header, &mut input).unwrap();
        assert_eq!(hunk.lines.len(), 2);
        assert_eq!(input.peek(), Some(" trailing"));
    }

    #[test]
    fn read_hunk_truncated() {
        let result = read("@@ -1,3 +1,3 @@\n common\n-gone");
        assert!(matches!(
            result,
            Err(ParseError::TruncatedHunk {
                expected_old: 3,
                expected_new: 3,
                seen_old: 2,
                seen_new: 1,
            })
        ));
    }

    #[test]
    fn read_hunk_overrun() {
        let result = read("@@ -1,2 +1 @@\n+one\n+two\n-x\n-y");
        assert!(matches!(
            result,
            Err(ParseError::HunkCountMismatch {
                expected_old: 2,
                expected_new: 1,
            })
        ));
    }

    #[test]
    fn read_hunk_overrun_at_max() {
        let result = read("@@ -4294967295 +1,2 @@\n a\n b");
        assert!(matches!(
            result,
            Err(ParseError::HunkCountMismatch {
                expected_old: 1,
                expected_new: 2,
            })
        ));
    }

    #[test]
    fn read_hunk_last_possible_line() {
        let hunk = read("@@ -4294967295 +4294967295 @@\n-a\n+b").unwrap();
        assert_eq!(hunk.lines[0].old_lineno, Some(u32::MAX));
        assert_eq!(hunk.lines[1].new_lineno, Some(u32::MAX));
    }

    #[test]
    fn read_hunk_unexpected_marker_leaves_line() {
        let mut input = Input::new("@@ -1,2 +1,2 @@\n a\n?b\n c");
        let header = HunkHeader::parse(input.peek().unwrap()).unwrap();
        input.advance();
        let result = Hunk::read(header, &mut input);
        assert!(matches!(
            result,
            Err(ParseError::UnexpectedLineMarker { marker: '?' })
        ));
        assert_eq!(input.peek(), Some("?b"));
    }

    #[test]
    fn read_hunk_no_newline_markers() {
        let hunk = read(
            "@@ -3 +3,2 @@\n-no newline\n\\ No newline at end of file\n+no newline\n+new line\n\\ No newline at end of file",
        )
        .unwrap();
        assert_eq!(hunk.lines.len(), 3);
        assert!(hunk.lines[0].missing_final_newline);
        assert!(!hunk.lines[1].missing_final_newline);
        assert!(hunk.lines[2].missing_final_newline);
    }

    #[test]
    fn old_and_new_sides() {
        let hunk = read("@@ -1,3 +1,2 @@\n a\n-b\n-c\n+d").unwrap();
        let old: Vec<&str> = hunk.old_lines().map(|l| l.text.as_str()).collect();
        let new: Vec<&str> = hunk.new_lines().map(|l| l.text.as_str()).collect();
        assert_eq!(old, vec!["a", "b", "c"]);
        assert_eq!(new, vec!["a", "d"]);
    }
}
