use std::path::Path;

use crate::{error::PageError, textfile::TextFileAccessor};

use super::locator::{scan_rules, SpanLocator, StyleBlockLocator};

/// Built-in canonical stylesheet block.
pub const CANONICAL_STYLE_BLOCK: &str = include_str!("../../assets/canonical_style.html");

/// Built-in targeted rule set for the game container, iframe and narrow
/// viewport group.
pub const CANONICAL_IFRAME_RULES: &str = include_str!("../../assets/iframe_rules.css");

/// How a revision rule finds the text it replaces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpanStrategy {
    /// The whole `<style>…</style>` block.
    WholeBlock,
    /// The body of one top-level rule inside the block.
    NamedRule {
        /// Selector or at-rule prelude.
        selector: String,
    },
}

/// One (match pattern, canonical replacement) pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevisionRule {
    /// Locator strategy.
    pub strategy: SpanStrategy,
    /// Text the located span must end up equal to.
    pub replacement: String,
}

/// Ordered rewrite rules describing the current correct stylesheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyleRevision {
    rules: Vec<RevisionRule>,
}

/// Which migration mode a revision file is read for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationMode {
    /// Replace the entire stylesheet block.
    WholeBlock,
    /// Replace only the bodies of named top-level rules.
    NamedRules,
}

impl StyleRevision {
    /// Replace the whole block with `text`.
    ///
    /// Bare CSS is wrapped in `<style>` tags. The result must be located in
    /// full by the block locator, otherwise re-running would not converge.
    pub fn whole_block(text: &str) -> Result<Self, PageError> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(PageError::revision("stylesheet block is empty"));
        }
        let replacement = if trimmed.to_ascii_lowercase().starts_with("<style") {
            trimmed.to_string()
        } else {
            format!("<style>\n{trimmed}\n</style>")
        };

        if StyleBlockLocator.locate(&replacement) != Some(0..replacement.len()) {
            return Err(PageError::revision(
                "replacement must be exactly one <style>…</style> block",
            ));
        }

        Ok(Self {
            rules: vec![RevisionRule {
                strategy: SpanStrategy::WholeBlock,
                replacement,
            }],
        })
    }

    /// Replace the bodies of the top-level rules defined in `css`.
    pub fn named_rules(css: &str) -> Result<Self, PageError> {
        let rules: Vec<_> = scan_rules(css)
            .into_iter()
            .filter(|rule| !rule.selector.is_empty())
            .map(|rule| RevisionRule {
                strategy: SpanStrategy::NamedRule {
                    selector: rule.selector,
                },
                replacement: css[rule.body].to_string(),
            })
            .collect();

        if rules.is_empty() {
            return Err(PageError::revision("no complete rules found"));
        }
        Ok(Self { rules })
    }

    /// Built-in whole-block revision.
    pub fn canonical() -> Self {
        Self {
            rules: vec![RevisionRule {
                strategy: SpanStrategy::WholeBlock,
                replacement: CANONICAL_STYLE_BLOCK.trim().to_string(),
            }],
        }
    }

    /// Built-in revision for `mode`.
    pub fn builtin(mode: MigrationMode) -> Result<Self, PageError> {
        match mode {
            MigrationMode::WholeBlock => Ok(Self::canonical()),
            MigrationMode::NamedRules => Self::named_rules(CANONICAL_IFRAME_RULES),
        }
    }

    /// Read a revision file for `mode`.
    pub fn load(
        path: impl AsRef<Path>,
        mode: MigrationMode,
        accessor: &TextFileAccessor,
    ) -> Result<Self, PageError> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(PageError::MissingInput {
                what: "style revision",
                path: path.to_path_buf(),
            });
        }
        let text = accessor.read_text(path)?.content;
        match mode {
            MigrationMode::WholeBlock => Self::whole_block(&text),
            MigrationMode::NamedRules => Self::named_rules(&text),
        }
    }

    /// Rules in application order.
    pub fn rules(&self) -> &[RevisionRule] {
        &self.rules
    }
}
