use std::{collections::BTreeMap, path::Path};

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use crate::{error::PageError, textfile::TextFileAccessor};

/// Built-in page template, written by `init-template`.
pub const DEFAULT_TEMPLATE: &str = include_str!("../../assets/game_template.html");

static PLACEHOLDER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("invalid placeholder regex")
});

/// Named values substituted into `{name}` tokens.
pub type PlaceholderTable = BTreeMap<&'static str, String>;

/// Template text containing literal `{name}` placeholder tokens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    body: String,
}

/// Output of [`Template::fill`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filled {
    /// Template with every known placeholder replaced.
    pub content: String,
    /// Distinct token names left verbatim because the table had no entry.
    pub unresolved: Vec<String>,
}

impl Template {
    /// Wrap template text.
    pub fn new(body: impl Into<String>) -> Self {
        Self { body: body.into() }
    }

    /// Read a template through the accessor; absence is fatal to generation.
    pub fn load(path: impl AsRef<Path>, accessor: &TextFileAccessor) -> Result<Self, PageError> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(PageError::MissingInput {
                what: "page template",
                path: path.to_path_buf(),
            });
        }
        Ok(Self::new(accessor.read_text(path)?.content))
    }

    /// Substitute placeholders in a single left-to-right pass.
    ///
    /// Inserted values are never rescanned, so a value containing `{title}`
    /// stays literal. Unknown tokens are kept as-is and reported.
    pub fn fill(&self, table: &PlaceholderTable) -> Filled {
        let mut unresolved: Vec<String> = Vec::new();
        let content = PLACEHOLDER_RE.replace_all(&self.body, |caps: &Captures<'_>| {
            let name = &caps[1];
            match table.get(name) {
                Some(value) => value.clone(),
                None => {
                    if !unresolved.iter().any(|seen| seen == name) {
                        unresolved.push(name.to_string());
                    }
                    caps[0].to_string()
                }
            }
        });

        Filled {
            content: content.into_owned(),
            unresolved,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(entries: &[(&'static str, &str)]) -> PlaceholderTable {
        entries
            .iter()
            .map(|(key, value)| (*key, (*value).to_string()))
            .collect()
    }

    #[test]
    fn replaces_every_occurrence() {
        let filled = Template::new("<h1>{title}</h1><title>{title}</title>")
            .fill(&table(&[("title", "Bus Jam")]));
        assert_eq!(filled.content, "<h1>Bus Jam</h1><title>Bus Jam</title>");
        assert!(filled.unresolved.is_empty());
    }

    #[test]
    fn inserted_values_are_not_rescanned() {
        let filled = Template::new("{title}|{description}")
            .fill(&table(&[("title", "{description}"), ("description", "plain")]));
        assert_eq!(filled.content, "{description}|plain");
    }

    #[test]
    fn unknown_tokens_survive_and_are_reported() {
        let filled = Template::new("{title} {rating} {rating} .rule { color: red; }")
            .fill(&table(&[("title", "Jam")]));
        assert_eq!(filled.content, "Jam {rating} {rating} .rule { color: red; }");
        assert_eq!(filled.unresolved, vec!["rating".to_string()]);
    }
}
