use serde::Serialize;

use super::hunk::{Action, Hunk};

/// Label shown for the old side of every file section
pub const OLD_LABEL: &str = "Old";
/// Label shown for the new side of every file section
pub const NEW_LABEL: &str = "New";

/// All hunks for one `--- `/`+++ ` file section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileDiff {
    /// Path from the `--- ` header, up to the first whitespace
    pub filename: String,
    pub old_label: String,
    pub new_label: String,
    pub hunks: Vec<Hunk>,
}

impl FileDiff {
    /// Start a file section from its header pair.
    ///
    /// Returns `None` unless `old` starts with `--- ` and `new` with `+++ `.
    /// Revision text after the path (timestamps, commit ids) is dropped in
    /// favour of the generic [`OLD_LABEL`]/[`NEW_LABEL`].
    #[must_use]
    pub fn from_headers(old: &str, new: &str) -> Option<Self> {
        let path = old.strip_prefix("--- ")?;
        new.strip_prefix("+++ ")?;

        Some(FileDiff {
            filename: path.split_whitespace().next().unwrap_or_default().to_string(),
            old_label: OLD_LABEL.to_string(),
            new_label: NEW_LABEL.to_string(),
            hunks: Vec::new(),
        })
    }

    /// Number of added lines across all hunks
    #[must_use]
    pub fn additions(&self) -> usize {
        self.count(Action::Add)
    }

    /// Number of deleted lines across all hunks
    #[must_use]
    pub fn deletions(&self) -> usize {
        self.count(Action::Delete)
    }

    fn count(&self, action: Action) -> usize {
        self.hunks
            .iter()
            .flat_map(|h| &h.lines)
            .filter(|l| l.action == action)
            .count()
    }
}
