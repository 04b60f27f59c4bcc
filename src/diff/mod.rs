pub mod document;
pub mod file;
pub mod hunk;

use error_set::error_set;

use crate::highlight::escape_html;

pub use document::{Diagnostic, DiffDocument, Parsed};
pub use file::FileDiff;
pub use hunk::{Action, Cursors, Hunk, HunkHeader, Line};

error_set! {
    /// Conditions that make the parser abandon part of its input
    ParseError := {
        /// A line starting with `@@` does not follow `@@ -A[,B] +C[,D] @@`
        #[display("Malformed hunk header '{header}'")]
        MalformedHunkHeader { header: String },
        /// A hunk body line starts with something other than ` `, `+`, `-` or `"`
        #[display("Unexpected line marker '{marker}' inside hunk")]
        UnexpectedLineMarker { marker: char },
        /// Input ended before the hunk's declared line counts were reached
        #[display("Hunk truncated: saw {seen_old}/{expected_old} old and {seen_new}/{expected_new} new lines")]
        TruncatedHunk {
            expected_old: u32,
            expected_new: u32,
            seen_old: u32,
            seen_new: u32,
        },
        /// Hunk body carries more lines for one side than its header declares
        #[display("Hunk overruns its header: line would exceed {expected_old} old / {expected_new} new lines")]
        HunkCountMismatch { expected_old: u32, expected_new: u32 },
        /// Advancing past a body line would push a line number beyond `u32::MAX`
        #[display("Line number overflow after old line {old} / new line {new}")]
        LineNumberOverflow { old: u32, new: u32 },
        /// A `--- ` line is not followed by a `+++ ` line
        #[display("'{line}' is not followed by a '+++ ' header")]
        NotAFileHeader { line: String },
    }
}

/// Escaped input lines with an explicit read position.
///
/// End of input is reported as `None` from [`Input::peek`] rather than
/// through iterator exhaustion, so every loop in the parser has a visible
/// termination condition.
#[derive(Debug)]
pub(crate) struct Input {
    lines: Vec<String>,
    pos: usize,
}

impl Input {
    pub(crate) fn new(text: &str) -> Self {
        Self {
            lines: text.lines().map(escape_html).collect(),
            pos: 0,
        }
    }

    /// The next unconsumed line
    pub(crate) fn peek(&self) -> Option<&str> {
        self.lines.get(self.pos).map(String::as_str)
    }

    pub(crate) fn advance(&mut self) {
        if self.pos < self.lines.len() {
            self.pos += 1;
        }
    }

    /// 1-based number of the next unconsumed line (one past the end at EOF)
    pub(crate) fn line_number(&self) -> usize {
        self.pos + 1
    }
}
