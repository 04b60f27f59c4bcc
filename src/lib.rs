//! Unified diff parsing with inline change highlighting.
//!
//! [`DiffDocument::parse`] turns `diff -u` / `git diff` output into files,
//! hunks and classified lines. Where a run of deleted lines is directly
//! followed by an equally long run of added lines, each pair is compared
//! character by character and the differing span is wrapped in
//! `<del>`/`<ins>`. All text is HTML-escaped, so the result can be placed
//! into markup as is.
//!
//! ```
//! use hunkmark::{Action, DiffDocument};
//!
//! let diff = "--- a/notes.txt\n+++ b/notes.txt\n@@ -1,2 +1,2 @@\n title\n-x < 1\n+x < 2\n";
//! let parsed = DiffDocument::parse(diff);
//!
//! let lines = &parsed.document.files[0].hunks[0].lines;
//! assert_eq!(lines[0].action, Action::Context);
//! assert_eq!(lines[1].highlighted.as_deref(), Some("x &lt; <del>1</del>"));
//! assert_eq!(lines[2].highlighted.as_deref(), Some("x &lt; <ins>2</ins>"));
//! ```

pub mod diff;
pub mod highlight;
pub mod render;

pub use diff::{
    Action, Diagnostic, DiffDocument, FileDiff, Hunk, HunkHeader, Line, ParseError, Parsed,
};
pub use render::format_document;
