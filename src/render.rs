//! Plain-text rendering of a parsed diff for terminal display.

use crate::diff::{Action, DiffDocument, FileDiff, Hunk, Line};

/// Format a document with explicit old/new line numbers.
///
/// Each file starts with `filename (Old -> New): +adds -dels`, each hunk with
/// its `@@` range, and each line shows its old and new numbers followed by
/// the (highlighted, when paired) text.
///
/// Example output:
/// ```text
/// a.txt (Old -> New): +1 -1
/// @@ -1,3 +1,3 @@
///     1     1   common
///     2       - hello <del>world</del>
///           2 + hello <ins>earth</ins>
///     3     3   common
/// ```
#[must_use]
pub fn format_document(document: &DiffDocument) -> String {
    document
        .files
        .iter()
        .map(format_file)
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn format_file(file: &FileDiff) -> String {
    let mut out = format!(
        "{} ({} -> {}): +{} -{}",
        file.filename,
        file.old_label,
        file.new_label,
        file.additions(),
        file.deletions()
    );

    for hunk in &file.hunks {
        out.push('\n');
        out.push_str(&format_hunk_header(hunk));
        for line in &hunk.lines {
            out.push('\n');
            out.push_str(&format_line(line));
        }
    }

    out
}

fn format_hunk_header(hunk: &Hunk) -> String {
    let mut header = format!(
        "@@ -{},{} +{},{} @@",
        hunk.old_start + 1,
        hunk.old_count,
        hunk.new_start + 1,
        hunk.new_count
    );
    if let Some(section) = &hunk.section {
        header.push(' ');
        header.push_str(section);
    }
    header
}

fn format_line(line: &Line) -> String {
    let number = |n: Option<u32>| n.map(|n| n.to_string()).unwrap_or_default();
    let sign = match line.action {
        Action::Context => ' ',
        Action::Add => '+',
        Action::Delete => '-',
    };

    let mut out = format!(
        "{:>5} {:>5} {sign} {}",
        number(line.old_lineno),
        number(line.new_lineno),
        line.display_text()
    );
    if line.missing_final_newline {
        out.push_str(" (no newline at end of file)");
    }
    out
}
