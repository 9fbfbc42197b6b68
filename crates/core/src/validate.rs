//! Structural checks run after migrations: tag balance, stylesheet braces and
//! the elements every game page must carry.
//!
//! The validator only reads; findings are advisory and never block a run.

use std::{fmt, path::Path};

use anyhow::Result;
use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;
use tracing::{info, warn};

use crate::{
    batch::BatchReport,
    corpus::{display_name, game_pages},
    style::StyleBlockLocator,
    textfile::TextFileAccessor,
};

const VOID_ELEMENTS: [&str; 14] = [
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

const RAW_TEXT_ELEMENTS: [&str; 2] = ["script", "style"];

const AT_RULE_PREFIXES: [&str; 3] = ["@media", "@import", "@keyframes"];

static TAG_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^<(/?)([A-Za-z][A-Za-z0-9:-]*)(?:[\s/][^>]*)?>").expect("invalid tag regex")
});
static HTML_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)<html[\s>]").expect("invalid html regex"));
static HEAD_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)<head[\s>]").expect("invalid head regex"));
static BODY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)<body[\s>]").expect("invalid body regex"));
static IFRAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<iframe\b[^>]*>").expect("invalid iframe regex"));
static CLASS_ATTR_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)\bclass\s*=\s*(?:"([^"]*)"|'([^']*)')"#).expect("invalid class regex")
});

/// Elements every game page must contain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequiredElement {
    /// `<!DOCTYPE html>`
    Doctype,
    /// `<html>`
    Html,
    /// `<head>`
    Head,
    /// `<body>`
    Body,
    /// `<iframe>` carrying the game display class.
    GameIframe,
}

impl fmt::Display for RequiredElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RequiredElement::Doctype => "DOCTYPE declaration",
            RequiredElement::Html => "<html> element",
            RequiredElement::Head => "<head> element",
            RequiredElement::Body => "<body> element",
            RequiredElement::GameIframe => "game iframe",
        })
    }
}

/// A hard structural problem in a page.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StructuralError {
    /// End tag that does not close the innermost open element.
    #[error("line {line}: unexpected closing tag </{tag}>")]
    UnexpectedClosingTag {
        /// Tag name, lowercased.
        tag: String,
        /// 1-based line of the end tag.
        line: usize,
    },
    /// Element still open at end of input.
    #[error("line {line}: unclosed tag <{tag}>")]
    UnclosedTag {
        /// Tag name, lowercased.
        tag: String,
        /// 1-based line of the start tag.
        line: usize,
    },
    /// A stylesheet block whose `{` and `}` counts differ.
    #[error("line {line}: stylesheet braces unbalanced ({delta:+} unclosed)")]
    UnbalancedBraces {
        /// Line where the stylesheet text starts.
        line: usize,
        /// Opening minus closing braces.
        delta: i64,
    },
    /// A required element is absent.
    #[error("missing {0}")]
    MissingElement(RequiredElement),
}

/// A property-looking stylesheet line without a terminator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyleWarning {
    /// 1-based line in the page.
    pub line: usize,
    /// Trimmed line text.
    pub text: String,
}

impl fmt::Display for StyleWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}: property may be missing a semicolon: {}", self.line, self.text)
    }
}

/// Findings for one page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    /// Hard structural problems.
    pub errors: Vec<StructuralError>,
    /// Suspicious but non-fatal findings.
    pub warnings: Vec<StyleWarning>,
}

impl ValidationReport {
    /// No errors and no warnings.
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty() && self.warnings.is_empty()
    }
}

struct LineIndex {
    newlines: Vec<usize>,
}

impl LineIndex {
    fn new(text: &str) -> Self {
        Self {
            newlines: text.match_indices('\n').map(|(at, _)| at).collect(),
        }
    }

    fn line_at(&self, offset: usize) -> usize {
        self.newlines.partition_point(|&at| at < offset) + 1
    }
}

/// Page validator.
#[derive(Debug, Clone)]
pub struct Validator {
    iframe_class: String,
}

impl Default for Validator {
    fn default() -> Self {
        Self::new("game-iframe")
    }
}

impl Validator {
    /// Validator expecting an iframe with class `iframe_class`.
    pub fn new(iframe_class: impl Into<String>) -> Self {
        Self {
            iframe_class: iframe_class.into(),
        }
    }

    /// Run every check; later checks run even when earlier ones found errors.
    pub fn validate(&self, page: &str) -> ValidationReport {
        let lines = LineIndex::new(page);
        let mut report = ValidationReport::default();
        check_tags(page, &lines, &mut report);
        check_stylesheets(page, &lines, &mut report);
        self.check_required(page, &mut report);
        report
    }

    fn check_required(&self, page: &str, report: &mut ValidationReport) {
        let lower = page.to_ascii_lowercase();
        let checks = [
            (RequiredElement::Doctype, lower.contains("<!doctype html")),
            (RequiredElement::Html, HTML_RE.is_match(page)),
            (RequiredElement::Head, HEAD_RE.is_match(page)),
            (RequiredElement::Body, BODY_RE.is_match(page)),
            (RequiredElement::GameIframe, self.has_game_iframe(page)),
        ];
        for (element, present) in checks {
            if !present {
                report.errors.push(StructuralError::MissingElement(element));
            }
        }
    }

    fn has_game_iframe(&self, page: &str) -> bool {
        IFRAME_RE.find_iter(page).any(|tag| {
            CLASS_ATTR_RE
                .captures(tag.as_str())
                .and_then(|caps| caps.get(1).or_else(|| caps.get(2)))
                .map(|classes| {
                    classes
                        .as_str()
                        .split_whitespace()
                        .any(|class| class == self.iframe_class)
                })
                .unwrap_or(false)
        })
    }
}

fn check_tags(page: &str, lines: &LineIndex, report: &mut ValidationReport) {
    let lower = page.to_ascii_lowercase();
    let mut stack: Vec<(String, usize)> = Vec::new();
    let mut pos = 0;

    while let Some(found) = page[pos..].find('<') {
        let at = pos + found;
        let rest = &page[at..];

        if rest.starts_with("<!--") {
            pos = rest.find("-->").map(|end| at + end + 3).unwrap_or(page.len());
            continue;
        }
        if rest.starts_with("<!") || rest.starts_with("<?") {
            pos = rest.find('>').map(|end| at + end + 1).unwrap_or(page.len());
            continue;
        }
        let Some(caps) = TAG_RE.captures(rest) else {
            pos = at + 1;
            continue;
        };

        let tag_end = at + caps[0].len();
        let name = caps[2].to_ascii_lowercase();
        let line = lines.line_at(at);
        let is_void = VOID_ELEMENTS.contains(&name.as_str());

        if !caps[1].is_empty() {
            let closes_top = stack.last().map(|(open, _)| *open == name).unwrap_or(false);
            if closes_top {
                stack.pop();
            } else if !is_void {
                report
                    .errors
                    .push(StructuralError::UnexpectedClosingTag { tag: name, line });
            }
            pos = tag_end;
            continue;
        }

        let self_closing = caps[0].ends_with("/>");
        if !is_void && !self_closing {
            stack.push((name.clone(), line));
        }
        pos = tag_end;

        if RAW_TEXT_ELEMENTS.contains(&name.as_str()) && !self_closing {
            let closing = format!("</{name}");
            pos = lower[tag_end..]
                .find(&closing)
                .map(|offset| tag_end + offset)
                .unwrap_or(page.len());
        }
    }

    for (tag, line) in stack {
        report.errors.push(StructuralError::UnclosedTag { tag, line });
    }
}

fn check_stylesheets(page: &str, lines: &LineIndex, report: &mut ValidationReport) {
    for (start, css) in StyleBlockLocator.all_bodies(page) {
        let opened = css.matches('{').count() as i64;
        let closed = css.matches('}').count() as i64;
        if opened != closed {
            report.errors.push(StructuralError::UnbalancedBraces {
                line: lines.line_at(start),
                delta: opened - closed,
            });
        }

        let first_line = lines.line_at(start);
        for (index, raw) in css.split('\n').enumerate() {
            let text = raw.trim();
            if text.is_empty() || text.starts_with("/*") || text.ends_with("*/") {
                continue;
            }
            let terminated = text.ends_with(';') || text.ends_with('{') || text.ends_with('}');
            let at_rule = AT_RULE_PREFIXES.iter().any(|prefix| text.contains(prefix));
            if text.contains(':') && !terminated && !at_rule {
                report.warnings.push(StyleWarning {
                    line: first_line + index,
                    text: text.to_string(),
                });
            }
        }
    }
}

/// Validation result for one file.
#[derive(Debug, Clone)]
pub struct FileValidation {
    /// File name.
    pub file: String,
    /// Findings.
    pub report: ValidationReport,
}

/// Counts across a validation batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ValidationSummary {
    /// Files that could be read and checked.
    pub checked: usize,
    /// Files with at least one error.
    pub with_errors: usize,
    /// Files with at least one warning.
    pub with_warnings: usize,
    /// Files with neither.
    pub clean: usize,
}

impl ValidationSummary {
    /// Tally a batch report.
    pub fn from_report(report: &BatchReport<FileValidation>) -> Self {
        let mut summary = Self {
            checked: report.succeeded.len(),
            ..Self::default()
        };
        for file in &report.succeeded {
            if !file.report.errors.is_empty() {
                summary.with_errors += 1;
            }
            if !file.report.warnings.is_empty() {
                summary.with_warnings += 1;
            }
            if file.report.is_clean() {
                summary.clean += 1;
            }
        }
        summary
    }
}

/// Validate every game page in `dir`; unreadable files are batch failures.
pub fn validate_pages(
    dir: impl AsRef<Path>,
    excluded: &[String],
    accessor: &TextFileAccessor,
    validator: &Validator,
) -> Result<BatchReport<FileValidation>> {
    let mut batch = BatchReport::new();
    for path in game_pages(dir, excluded)? {
        let file = display_name(&path);
        match accessor.read_text(&path) {
            Ok(decoded) => {
                let report = validator.validate(&decoded.content);
                if !report.errors.is_empty() {
                    warn!("{}: {} structural errors", file, report.errors.len());
                }
                batch.success(FileValidation { file, report });
            }
            Err(err) => {
                warn!("{}: {}", file, err);
                batch.fail(file, err);
            }
        }
    }
    info!("validation finished: {}", batch.summary());
    Ok(batch)
}
