//! Accumulating result type for fail-soft batch runs.

use std::fmt;

use crate::error::PageError;

/// A problem attached to one item (file name or record title) of a batch.
#[derive(Debug)]
pub struct ItemIssue {
    /// File name or record label the issue belongs to.
    pub item: String,
    /// What went wrong.
    pub error: PageError,
}

impl fmt::Display for ItemIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.item, self.error)
    }
}

/// Outcome of a batch operation: every item ends up in exactly one of
/// `succeeded` or `failures`; `warnings` are extra, non-fatal notes.
#[derive(Debug)]
pub struct BatchReport<T> {
    /// Items processed successfully.
    pub succeeded: Vec<T>,
    /// Items that could not be processed.
    pub failures: Vec<ItemIssue>,
    /// Non-fatal notes about processed items.
    pub warnings: Vec<ItemIssue>,
}

impl<T> Default for BatchReport<T> {
    fn default() -> Self {
        Self {
            succeeded: Vec::new(),
            failures: Vec::new(),
            warnings: Vec::new(),
        }
    }
}

impl<T> BatchReport<T> {
    /// Empty report.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a processed item.
    pub fn success(&mut self, value: T) {
        self.succeeded.push(value);
    }

    /// Record a failed item.
    pub fn fail(&mut self, item: impl Into<String>, error: PageError) {
        self.failures.push(ItemIssue {
            item: item.into(),
            error,
        });
    }

    /// Record a non-fatal note.
    pub fn warn(&mut self, item: impl Into<String>, error: PageError) {
        self.warnings.push(ItemIssue {
            item: item.into(),
            error,
        });
    }

    /// Total number of items seen.
    pub fn processed(&self) -> usize {
        self.succeeded.len() + self.failures.len()
    }

    /// `true` when no item failed.
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    /// One-line count summary.
    pub fn summary(&self) -> String {
        format!(
            "{} succeeded, {} failed, {} warnings",
            self.succeeded.len(),
            self.failures.len(),
            self.warnings.len()
        )
    }
}
