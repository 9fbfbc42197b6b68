use std::path::{Path, PathBuf};

use anyhow::Result;
use tracing::{debug, info, warn};

use crate::{
    batch::BatchReport,
    corpus::{display_name, game_pages},
    error::PageError,
    textfile::{TextEncoding, TextFileAccessor},
};

use super::{
    locator::{RuleLocator, SpanLocator, StyleBlockLocator},
    revision::{SpanStrategy, StyleRevision},
};

/// Result of migrating one page's content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Migration {
    /// Page content after applying the revision.
    pub content: String,
    /// `false` when the page already matched the revision byte-for-byte.
    pub changed: bool,
    /// Named-rule selectors that were not present at the top level.
    pub missing_rules: Vec<String>,
}

/// Apply `revision` to the stylesheet block of `page`.
///
/// Only the located spans are rewritten; text outside the stylesheet block is
/// returned untouched. A page with no block is an error and nothing changes.
pub fn migrate(page: &str, revision: &StyleRevision) -> Result<Migration, PageError> {
    let mut content = page.to_string();
    let mut missing_rules = Vec::new();

    for rule in revision.rules() {
        match &rule.strategy {
            SpanStrategy::WholeBlock => {
                let span = StyleBlockLocator
                    .locate(&content)
                    .ok_or(PageError::NoStyleBlock)?;
                if content[span.clone()] != rule.replacement {
                    content.replace_range(span, &rule.replacement);
                }
            }
            SpanStrategy::NamedRule { selector } => {
                let block = StyleBlockLocator
                    .locate_body(&content)
                    .ok_or(PageError::NoStyleBlock)?;
                let Some(body) = RuleLocator::new(selector).locate(&content[block.clone()]) else {
                    missing_rules.push(selector.clone());
                    continue;
                };
                let span = block.start + body.start..block.start + body.end;
                if content[span.clone()] != rule.replacement {
                    content.replace_range(span, &rule.replacement);
                }
            }
        }
    }

    let changed = content != page;
    Ok(Migration {
        content,
        changed,
        missing_rules,
    })
}

/// Per-page outcome of a migration batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageMigration {
    /// File name.
    pub file: String,
    /// Full path.
    pub path: PathBuf,
    /// Whether the page was (or, in a dry run, would be) rewritten.
    pub changed: bool,
    /// Encoding the page was read with.
    pub encoding: TextEncoding,
    /// Named-rule selectors absent from this page.
    pub missing_rules: Vec<String>,
}

/// Runs a revision over every game page in a directory.
pub struct MigrationRunner {
    accessor: TextFileAccessor,
    revision: StyleRevision,
    excluded: Vec<String>,
    dry_run: bool,
}

impl MigrationRunner {
    /// Create a runner; `excluded` lists file names that are never touched.
    pub fn new(accessor: TextFileAccessor, revision: StyleRevision, excluded: Vec<String>) -> Self {
        Self {
            accessor,
            revision,
            excluded,
            dry_run: false,
        }
    }

    /// Report what would change without writing anything.
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Migrate every eligible page in `dir`.
    ///
    /// Only failing to enumerate `dir` is fatal; per-file problems are
    /// collected in the report.
    pub fn run(&self, dir: impl AsRef<Path>) -> Result<BatchReport<PageMigration>> {
        let mut report = BatchReport::new();
        for path in game_pages(dir, &self.excluded)? {
            let file = display_name(&path);
            match self.migrate_file(&path) {
                Ok(outcome) => {
                    if !outcome.missing_rules.is_empty() {
                        debug!("{}: rules not present: {:?}", file, outcome.missing_rules);
                    }
                    report.success(outcome);
                }
                Err(err) => {
                    warn!("{}: {}", file, err);
                    report.fail(file, err);
                }
            }
        }
        info!("migration finished: {}", report.summary());
        Ok(report)
    }

    fn migrate_file(&self, path: &Path) -> Result<PageMigration, PageError> {
        let decoded = self.accessor.read_text(path)?;
        let migration = migrate(&decoded.content, &self.revision)?;

        if migration.changed && !self.dry_run {
            self.accessor.write_text(path, &migration.content)?;
            info!("updated {}", path.display());
        } else if !migration.changed {
            debug!("{} already current", path.display());
        }

        Ok(PageMigration {
            file: display_name(path),
            path: path.to_path_buf(),
            changed: migration.changed,
            encoding: decoded.encoding,
            missing_rules: migration.missing_rules,
        })
    }
}
