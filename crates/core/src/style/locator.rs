//! Bounded-span locators for the stylesheet region of a page.
//!
//! Pages are treated as text. A locator returns the byte range of one
//! well-defined region and everything outside that range is left alone.

use std::ops::Range;

use once_cell::sync::Lazy;
use regex::Regex;

static STYLE_BLOCK_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)<style\b[^>]*>(.*?)</style\s*>").expect("invalid style block regex")
});

/// Finds a region of a document.
pub trait SpanLocator {
    /// Byte range of the region, or `None` when absent.
    fn locate(&self, text: &str) -> Option<Range<usize>>;
}

/// The first `<style>` element, from its opening tag to the first closing
/// tag that follows it.
///
/// The match is non-greedy so a stray later `</style>` in a malformed page is
/// never swallowed.
#[derive(Debug, Clone, Copy, Default)]
pub struct StyleBlockLocator;

impl StyleBlockLocator {
    /// Range of the stylesheet text between the opening and closing tags.
    pub fn locate_body(&self, text: &str) -> Option<Range<usize>> {
        STYLE_BLOCK_RE
            .captures(text)
            .and_then(|caps| caps.get(1))
            .map(|body| body.range())
    }

    /// Every stylesheet body in the document, in order.
    pub fn all_bodies<'t>(&self, text: &'t str) -> Vec<(usize, &'t str)> {
        STYLE_BLOCK_RE
            .captures_iter(text)
            .filter_map(|caps| caps.get(1))
            .map(|body| (body.start(), body.as_str()))
            .collect()
    }
}

impl SpanLocator for StyleBlockLocator {
    fn locate(&self, text: &str) -> Option<Range<usize>> {
        STYLE_BLOCK_RE.find(text).map(|block| block.range())
    }
}

/// A top-level rule found in a stylesheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleSpan {
    /// Selector or at-rule prelude, whitespace-normalised.
    pub selector: String,
    /// Range of the text between the rule's braces.
    pub body: Range<usize>,
}

/// The brace-delimited body of the first top-level rule whose prelude equals
/// `selector` (whitespace-insensitive). Rules nested inside at-rules are not
/// considered.
#[derive(Debug, Clone)]
pub struct RuleLocator {
    selector: String,
}

impl RuleLocator {
    /// Locate rules written as `selector { ... }`.
    pub fn new(selector: &str) -> Self {
        Self {
            selector: normalize_selector(selector),
        }
    }

    /// Normalised selector this locator matches.
    pub fn selector(&self) -> &str {
        &self.selector
    }
}

impl SpanLocator for RuleLocator {
    fn locate(&self, css: &str) -> Option<Range<usize>> {
        scan_rules(css)
            .into_iter()
            .find(|rule| rule.selector == self.selector)
            .map(|rule| rule.body)
    }
}

/// Collapse whitespace runs so formatting drift does not defeat matching.
pub fn normalize_selector(selector: &str) -> String {
    selector.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// List the top-level rules of `css` in order.
///
/// Comments and quoted strings are skipped when counting braces. Scanning
/// stops at the first rule whose body never closes, so a truncated
/// stylesheet yields only the rules before the damage.
pub fn scan_rules(css: &str) -> Vec<RuleSpan> {
    let bytes = css.as_bytes();
    let mut rules = Vec::new();
    let mut depth = 0usize;
    let mut prelude_start = 0usize;
    let mut open: Option<(String, usize)> = None;
    let mut i = 0usize;

    while i < bytes.len() {
        match bytes[i] {
            b'/' if bytes.get(i + 1) == Some(&b'*') => {
                let end = css[i + 2..]
                    .find("*/")
                    .map(|offset| i + 2 + offset + 2)
                    .unwrap_or(bytes.len());
                if depth == 0 {
                    prelude_start = end;
                }
                i = end;
                continue;
            }
            quote @ (b'"' | b'\'') => {
                let end = css[i + 1..]
                    .find(char::from(quote))
                    .map(|offset| i + 1 + offset + 1)
                    .unwrap_or(bytes.len());
                i = end;
                continue;
            }
            b'{' => {
                if depth == 0 {
                    open = Some((normalize_selector(&css[prelude_start..i]), i + 1));
                }
                depth += 1;
            }
            b'}' => {
                if depth == 0 {
                    prelude_start = i + 1;
                } else {
                    depth -= 1;
                    if depth == 0 {
                        if let Some((selector, body_start)) = open.take() {
                            rules.push(RuleSpan {
                                selector,
                                body: body_start..i,
                            });
                        }
                        prelude_start = i + 1;
                    }
                }
            }
            b';' if depth == 0 => prelude_start = i + 1,
            _ => {}
        }
        i += 1;
    }

    rules
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = "<head>\n<style>\n.a { color: red; }\n</style>\n</head>\n<body><style>.b{}</style></body>";

    #[test]
    fn block_locator_is_non_greedy() {
        let range = StyleBlockLocator.locate(PAGE).expect("block present");
        assert_eq!(&PAGE[range], "<style>\n.a { color: red; }\n</style>");
        let body = StyleBlockLocator.locate_body(PAGE).expect("body present");
        assert_eq!(&PAGE[body], "\n.a { color: red; }\n");
        assert_eq!(StyleBlockLocator.all_bodies(PAGE).len(), 2);
    }

    #[test]
    fn block_locator_accepts_attributes_and_case() {
        let text = r#"<STYLE type="text/css">x</Style >"#;
        assert_eq!(StyleBlockLocator.locate(text), Some(0..text.len()));
        assert!(StyleBlockLocator.locate("<styles>x</styles>").is_none());
        assert!(StyleBlockLocator.locate("<style>unterminated").is_none());
    }

    #[test]
    fn rule_scan_handles_nesting_and_comments() {
        let css = "/* top */ .game-iframe { width: 1px; }\n\
                   @media (max-width: 768px) { .game-iframe { height: 2px; } }\n\
                   .quote { content: \"}\"; }";
        let rules = scan_rules(css);
        let selectors: Vec<_> = rules.iter().map(|rule| rule.selector.as_str()).collect();
        assert_eq!(
            selectors,
            vec![".game-iframe", "@media (max-width: 768px)", ".quote"]
        );
        assert_eq!(&css[rules[1].body.clone()], " .game-iframe { height: 2px; } ");
    }

    #[test]
    fn rule_locator_ignores_nested_matches_and_drift() {
        let css = "@media (max-width: 480px) { .game-iframe { height: 1px; } }\n.game-iframe   {\n  width: 2px;\n}";
        let locator = RuleLocator::new(".game-iframe");
        let body = locator.locate(css).expect("top-level rule present");
        assert_eq!(&css[body], "\n  width: 2px;\n");

        let media = RuleLocator::new("@media   (max-width:  480px)");
        assert_eq!(media.selector(), "@media (max-width: 480px)");
        assert!(media.locate(css).is_some());
        assert!(RuleLocator::new(".missing").locate(css).is_none());
    }

    #[test]
    fn unbalanced_rule_is_not_reported() {
        let rules = scan_rules(".ok { a: b; } .broken { c: d;");
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].selector, ".ok");
    }
}
