//! Stylesheet migration for already-generated pages.

/// Bounded-span locators.
pub mod locator;
/// Page and batch migration.
pub mod migrate;
/// Canonical revisions and how they are loaded.
pub mod revision;

pub use locator::{RuleLocator, SpanLocator, StyleBlockLocator};
pub use migrate::{migrate, Migration, MigrationRunner, PageMigration};
pub use revision::{MigrationMode, RevisionRule, SpanStrategy, StyleRevision};
