use serde::Serialize;

use super::file::FileDiff;
use super::hunk::{Hunk, HunkHeader};
use super::{Input, ParseError};

/// Every file section recognized in a unified diff, in input order.
///
/// An empty document is a valid result: the input held no usable
/// `--- `/`+++ ` section and should be shown as plain text instead.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DiffDocument {
    pub files: Vec<FileDiff>,
}

/// A recoverable problem found while parsing
#[derive(Debug)]
pub struct Diagnostic {
    /// 1-based input line where the problem was detected; one past the last
    /// line when input ended early
    pub line: usize,
    pub error: ParseError,
}

/// Parse result: the document plus what had to be skipped to build it
#[derive(Debug)]
pub struct Parsed {
    pub document: DiffDocument,
    pub diagnostics: Vec<Diagnostic>,
}

impl DiffDocument {
    /// Parse a unified diff.
    ///
    /// Never fails. A malformed hunk is dropped together with the rest of its
    /// file section and parsing resumes at the next `--- ` header; each such
    /// recovery is reported in [`Parsed::diagnostics`].
    ///
    /// ```
    /// use hunkmark::DiffDocument;
    ///
    /// let parsed = DiffDocument::parse(
    ///     "--- a.txt\n+++ b.txt\n@@ -1 +1 @@\n-hello world\n+hello earth\n",
    /// );
    /// let lines = &parsed.document.files[0].hunks[0].lines;
    /// assert_eq!(lines[0].highlighted.as_deref(), Some("hello <del>world</del>"));
    /// assert_eq!(lines[1].highlighted.as_deref(), Some("hello <ins>earth</ins>"));
    /// assert!(parsed.diagnostics.is_empty());
    /// ```
    #[must_use]
    pub fn parse(text: &str) -> Parsed {
        DocumentParser::new(text).run()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Added lines across all files
    #[must_use]
    pub fn additions(&self) -> usize {
        self.files.iter().map(FileDiff::additions).sum()
    }

    /// Deleted lines across all files
    #[must_use]
    pub fn deletions(&self) -> usize {
        self.files.iter().map(FileDiff::deletions).sum()
    }
}

enum State {
    SeekingFileHeader,
    InFileHeader,
    InHunk(FileDiff),
    Done,
}

struct DocumentParser {
    input: Input,
    files: Vec<FileDiff>,
    diagnostics: Vec<Diagnostic>,
}

impl DocumentParser {
    fn new(text: &str) -> Self {
        Self {
            input: Input::new(text),
            files: Vec::new(),
            diagnostics: Vec::new(),
        }
    }

    fn run(mut self) -> Parsed {
        let mut state = State::SeekingFileHeader;
        loop {
            state = match state {
                State::SeekingFileHeader => self.seek_file_header(),
                State::InFileHeader => self.read_file_header(),
                State::InHunk(file) => self.read_hunk(file),
                State::Done => break,
            };
        }

        Parsed {
            document: DiffDocument { files: self.files },
            diagnostics: self.diagnostics,
        }
    }

    /// Skip everything up to the next `--- ` line
    fn seek_file_header(&mut self) -> State {
        while let Some(line) = self.input.peek() {
            if line.starts_with("--- ") {
                return State::InFileHeader;
            }
            self.input.advance();
        }
        State::Done
    }

    /// Consume a `--- ` line and the `+++ ` line that must follow it
    fn read_file_header(&mut self) -> State {
        let line_number = self.input.line_number();
        let old = self.input.peek().unwrap_or_default().to_string();
        self.input.advance();

        match self.input.peek().and_then(|new| FileDiff::from_headers(&old, new)) {
            Some(file) => {
                self.input.advance();
                log::trace!("file section '{}' at line {line_number}", file.filename);
                State::InHunk(file)
            }
            None => {
                self.report(line_number, ParseError::NotAFileHeader { line: old });
                State::SeekingFileHeader
            }
        }
    }

    /// Read the next hunk of `file`, or close the file section
    fn read_hunk(&mut self, mut file: FileDiff) -> State {
        let Some(line) = self.input.peek() else {
            self.finish_file(file);
            return State::Done;
        };
        if !line.starts_with("@@") {
            self.finish_file(file);
            return State::SeekingFileHeader;
        }

        let header_line = self.input.line_number();
        let header = match HunkHeader::parse(line) {
            Ok(header) => header,
            Err(error) => {
                self.input.advance();
                self.report(header_line, error);
                self.finish_file(file);
                return State::SeekingFileHeader;
            }
        };
        self.input.advance();

        match Hunk::read(header, &mut self.input) {
            Ok(hunk) => {
                file.hunks.push(hunk);
                State::InHunk(file)
            }
            Err(error) => {
                log::info!(
                    "dropping hunk at line {header_line} and the rest of '{}'",
                    file.filename
                );
                self.report(self.input.line_number(), error);
                self.finish_file(file);
                State::SeekingFileHeader
            }
        }
    }

    fn finish_file(&mut self, file: FileDiff) {
        log::debug!(
            "parsed '{}': {} hunks, +{} -{}",
            file.filename,
            file.hunks.len(),
            file.additions(),
            file.deletions()
        );
        self.files.push(file);
    }

    fn report(&mut self, line: usize, error: ParseError) {
        log::warn!("line {line}: {error}");
        self.diagnostics.push(Diagnostic { line, error });
    }
}
