//! Template rendering: one feed record in, one standalone page out.

/// Batch generation over a record set.
pub mod generator;
/// Placeholder template handling.
pub mod template;

pub use generator::{GeneratedPage, Ledger, LedgerEntry, PageGenerator};
pub use template::{Filled, PlaceholderTable, Template, DEFAULT_TEMPLATE};

use crate::{config::SiteConfig, models::GameRecord, slug::slugify};

/// Appended to descriptions cut at the character budget.
pub const TRUNCATION_MARKER: &str = "...";

/// A rendered page that has not been written yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedPage {
    /// Slug derived from the record title.
    pub slug: String,
    /// Complete document.
    pub content: String,
    /// Template tokens that had no value.
    pub unresolved: Vec<String>,
}

/// Cut `text` to `limit` characters, appending [`TRUNCATION_MARKER`] if anything was removed.
pub fn truncate_description(text: &str, limit: usize) -> String {
    match text.char_indices().nth(limit) {
        Some((cut, _)) => format!("{}{}", &text[..cut], TRUNCATION_MARKER),
        None => text.to_string(),
    }
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(ch),
        }
    }
    out
}

fn keywords(tags: Option<&str>, site_keywords: &str) -> String {
    [tags.unwrap_or_default().trim(), site_keywords.trim()]
        .into_iter()
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Build the placeholder table for `record`.
pub fn placeholder_table(record: &GameRecord, slug: &str, site: &SiteConfig) -> PlaceholderTable {
    let category = record
        .category
        .as_deref()
        .unwrap_or(&site.default_category);
    let category_info = match record.category.as_deref() {
        Some(category) => format!(
            "<p><strong>Category:</strong> {}</p>",
            escape_html(category)
        ),
        None => String::new(),
    };

    let mut table = PlaceholderTable::new();
    table.insert("title", escape_html(&record.title));
    table.insert(
        "description",
        escape_html(&truncate_description(
            &record.description,
            site.description_limit,
        )),
    );
    table.insert(
        "keywords",
        escape_html(&keywords(record.tags.as_deref(), &site.keywords)),
    );
    table.insert("thumb", record.thumbnail_url.clone());
    table.insert(
        "page_url",
        format!(
            "{}/games/{slug}.html",
            site.base_url.trim_end_matches('/')
        ),
    );
    table.insert("game_url", record.play_url.clone());
    table.insert("category", escape_html(category));
    table.insert("category_info", category_info);
    table
}

/// Render `record` into `template`.
pub fn render(record: &GameRecord, template: &Template, site: &SiteConfig) -> RenderedPage {
    let slug = slugify(&record.title);
    let filled = template.fill(&placeholder_table(record, &slug, site));
    RenderedPage {
        slug,
        content: filled.content,
        unresolved: filled.unresolved,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use once_cell::sync::Lazy;
    use regex::Regex;

    static TOKEN_RE: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"\{[a-z_]+\}").expect("invalid token regex"));

    fn full_record() -> GameRecord {
        GameRecord {
            id: "a1".to_string(),
            title: "Traffic Rush 3D!".to_string(),
            description: "Weave through \"rush hour\" & survive.".to_string(),
            thumbnail_url: "https://img.example/a1.jpg".to_string(),
            play_url: "https://play.example/a1?x=1&y=2".to_string(),
            category: Some("Racing".to_string()),
            tags: Some("cars, racing".to_string()),
        }
    }

    #[test]
    fn description_truncation_boundary() {
        let exact = "a".repeat(160);
        assert_eq!(truncate_description(&exact, 160), exact);

        let over = "b".repeat(161);
        let cut = truncate_description(&over, 160);
        assert_eq!(cut, format!("{}{}", "b".repeat(160), TRUNCATION_MARKER));

        let wide = "é".repeat(161);
        assert_eq!(truncate_description(&wide, 160).chars().count(), 163);
    }

    #[test]
    fn fully_populated_record_leaves_no_tokens() {
        let page = render(
            &full_record(),
            &Template::new(DEFAULT_TEMPLATE),
            &SiteConfig::default(),
        );
        assert_eq!(page.slug, "traffic-rush-3d");
        assert!(page.unresolved.is_empty());
        assert!(!TOKEN_RE.is_match(&page.content), "raw placeholder left");
        assert!(page
            .content
            .contains("https://yourdomain.com/games/traffic-rush-3d.html"));
        assert!(page
            .content
            .contains(r#"src="https://play.example/a1?x=1&y=2""#));
        assert!(page
            .content
            .contains("Weave through &quot;rush hour&quot; &amp; survive."));
        assert!(page
            .content
            .contains("<p><strong>Category:</strong> Racing</p>"));
    }

    #[test]
    fn absent_optionals_use_defaults() {
        let record = GameRecord {
            category: None,
            tags: None,
            ..full_record()
        };
        let table = placeholder_table(&record, "x", &SiteConfig::default());
        assert_eq!(table["category"], "Game");
        assert_eq!(table["category_info"], "");
        assert_eq!(table["keywords"], "traffic games, html5 games");

        let tagged = placeholder_table(&full_record(), "x", &SiteConfig::default());
        assert_eq!(tagged["keywords"], "cars, racing, traffic games, html5 games");
    }

    #[test]
    fn unknown_template_token_is_reported() {
        let page = render(
            &full_record(),
            &Template::new("<h1>{title}</h1>{rating}"),
            &SiteConfig::default(),
        );
        assert_eq!(page.content, "<h1>Traffic Rush 3D!</h1>{rating}");
        assert_eq!(page.unresolved, vec!["rating".to_string()]);
    }
}
