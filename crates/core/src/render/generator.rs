use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::{
    batch::BatchReport, config::SiteConfig, error::PageError, models::GameRecord,
    textfile::TextFileAccessor,
};

use super::{render, Template};

/// A page written during generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedPage {
    /// Feed identifier of the source record.
    pub id: String,
    /// Source record title.
    pub title: String,
    /// Derived slug.
    pub slug: String,
    /// Written file.
    pub path: PathBuf,
    /// Template tokens left unresolved in this page.
    pub unresolved: Vec<String>,
}

/// One line of the generation ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    /// Feed identifier.
    pub id: String,
    /// Record title.
    pub title: String,
    /// Derived slug.
    pub slug: String,
    /// Written file.
    pub path: PathBuf,
}

/// Audit trail of a generation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ledger {
    /// When the run finished.
    pub generated_at: DateTime<Utc>,
    /// Pages written, in record order.
    pub pages: Vec<LedgerEntry>,
}

impl Ledger {
    /// Build a ledger from a generation report.
    pub fn from_report(report: &BatchReport<GeneratedPage>) -> Self {
        Self {
            generated_at: Utc::now(),
            pages: report
                .succeeded
                .iter()
                .map(|page| LedgerEntry {
                    id: page.id.clone(),
                    title: page.title.clone(),
                    slug: page.slug.clone(),
                    path: page.path.clone(),
                })
                .collect(),
        }
    }

    /// Write the ledger as pretty JSON.
    pub fn persist(&self, path: impl AsRef<Path>) -> Result<(), PageError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|err| PageError::io(parent, err))?;
        }
        let serialized = serde_json::to_vec_pretty(self).map_err(|source| PageError::Json {
            path: path.to_path_buf(),
            source,
        })?;
        fs::write(path, serialized).map_err(|err| PageError::io(path, err))
    }

    /// Read a previously written ledger.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, PageError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|err| PageError::io(path, err))?;
        serde_json::from_str(&content).map_err(|source| PageError::Json {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Renders records into `<games_dir>/<slug>.html`.
pub struct PageGenerator {
    accessor: TextFileAccessor,
    site: SiteConfig,
    games_dir: PathBuf,
}

impl PageGenerator {
    /// Create a generator writing into `games_dir`.
    pub fn new(accessor: TextFileAccessor, site: SiteConfig, games_dir: impl Into<PathBuf>) -> Self {
        Self {
            accessor,
            site,
            games_dir: games_dir.into(),
        }
    }

    /// Target path for a slug.
    pub fn page_path(&self, slug: &str) -> PathBuf {
        self.games_dir.join(format!("{slug}.html"))
    }

    /// Render and write every record, continuing past per-record failures.
    ///
    /// Slug collisions are not resolved: the later record overwrites the
    /// earlier page and a `SlugCollision` warning is recorded.
    pub fn generate(&self, records: &[GameRecord], template: &Template) -> BatchReport<GeneratedPage> {
        let mut report = BatchReport::new();
        let mut owners: HashMap<String, String> = HashMap::new();

        for (position, record) in records.iter().enumerate() {
            let label = if record.title.trim().is_empty() {
                format!("#{position}")
            } else {
                record.title.clone()
            };

            if record.title.trim().is_empty() {
                report.fail(
                    label,
                    PageError::MissingField {
                        field: "title",
                        record: if record.id.is_empty() {
                            format!("#{position}")
                        } else {
                            record.id.clone()
                        },
                    },
                );
                continue;
            }

            let page = render(record, template, &self.site);
            if page.slug.is_empty() {
                warn!("{}: title yields an empty slug", label);
                report.fail(
                    label,
                    PageError::EmptySlug {
                        title: record.title.clone(),
                    },
                );
                continue;
            }

            for name in &page.unresolved {
                warn!("{}: placeholder {{{}}} left unresolved", label, name);
                report.warn(
                    label.clone(),
                    PageError::PlaceholderUnresolved { name: name.clone() },
                );
            }

            let path = self.page_path(&page.slug);
            if let Err(err) = self.accessor.write_text(&path, &page.content) {
                warn!("failed to generate {}: {}", label, err);
                report.fail(label, err);
                continue;
            }

            if let Some(previous) = owners.insert(page.slug.clone(), record.title.clone()) {
                warn!("slug {} reused by \"{}\"", page.slug, record.title);
                report.warn(
                    label.clone(),
                    PageError::SlugCollision {
                        slug: page.slug.clone(),
                        title: record.title.clone(),
                        previous,
                    },
                );
            }

            info!("generated {}", path.display());
            report.success(GeneratedPage {
                id: record.id.clone(),
                title: record.title.clone(),
                slug: page.slug,
                path,
                unresolved: page.unresolved,
            });
        }

        info!("generation finished: {}", report.summary());
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::DEFAULT_TEMPLATE;
    use anyhow::Result;
    use tempfile::tempdir;

    fn record(id: &str, title: &str) -> GameRecord {
        GameRecord {
            id: id.to_string(),
            title: title.to_string(),
            description: format!("{title} description"),
            thumbnail_url: format!("https://img.example/{id}.jpg"),
            play_url: format!("https://play.example/{id}"),
            category: None,
            tags: None,
        }
    }

    #[test]
    fn writes_pages_and_ledger() -> Result<()> {
        let dir = tempdir()?;
        let generator = PageGenerator::new(
            TextFileAccessor::default(),
            SiteConfig::default(),
            dir.path().join("games"),
        );
        let records = vec![record("1", "Bus Jam"), record("2", "Taxi Rush")];

        let report = generator.generate(&records, &Template::new(DEFAULT_TEMPLATE));
        assert!(report.is_clean());
        assert_eq!(report.succeeded.len(), 2);
        let page = fs::read_to_string(dir.path().join("games/taxi-rush.html"))?;
        assert!(page.contains("<h1>Taxi Rush</h1>"));

        let ledger_path = dir.path().join("games/generated_games.json");
        Ledger::from_report(&report).persist(&ledger_path)?;
        let ledger = Ledger::load(&ledger_path)?;
        assert_eq!(ledger.pages.len(), 2);
        assert_eq!(ledger.pages[0].slug, "bus-jam");
        assert_eq!(ledger.pages[1].id, "2");
        Ok(())
    }

    #[test]
    fn failures_do_not_stop_the_batch() -> Result<()> {
        let dir = tempdir()?;
        let blocked = dir.path().join("games");
        fs::create_dir_all(blocked.join("blocked.html"))?;
        let generator =
            PageGenerator::new(TextFileAccessor::default(), SiteConfig::default(), &blocked);
        let records = vec![record("1", "Blocked"), record("2", "  "), record("3", "Open Road")];

        let report = generator.generate(&records, &Template::new("<h1>{title}</h1>"));
        assert_eq!(report.failures.len(), 2);
        assert_eq!(report.failures[0].item, "Blocked");
        assert!(matches!(report.failures[0].error, PageError::Io { .. }));
        assert!(matches!(
            report.failures[1].error,
            PageError::MissingField { field: "title", .. }
        ));
        assert_eq!(report.succeeded.len(), 1);
        assert_eq!(report.succeeded[0].slug, "open-road");
        Ok(())
    }

    #[test]
    fn titles_without_slug_characters_are_rejected() -> Result<()> {
        let dir = tempdir()?;
        let generator = PageGenerator::new(
            TextFileAccessor::default(),
            SiteConfig::default(),
            dir.path(),
        );
        let records = vec![record("", "交通拥堵"), record("7", "!!!"), record("8", "Bus Jam")];

        let report = generator.generate(&records, &Template::new("<h1>{title}</h1>"));
        assert_eq!(report.failures.len(), 2);
        assert_eq!(report.failures[0].item, "交通拥堵");
        assert!(matches!(
            &report.failures[0].error,
            PageError::EmptySlug { title } if title == "交通拥堵"
        ));
        assert!(matches!(
            &report.failures[1].error,
            PageError::EmptySlug { title } if title == "!!!"
        ));
        assert_eq!(report.succeeded.len(), 1);
        assert!(!dir.path().join(".html").exists());
        Ok(())
    }

    #[test]
    fn slug_collisions_keep_last_write() -> Result<()> {
        let dir = tempdir()?;
        let generator = PageGenerator::new(
            TextFileAccessor::default(),
            SiteConfig::default(),
            dir.path(),
        );
        let records = vec![record("1", "Jam!"), record("2", "Jam?")];

        let report = generator.generate(&records, &Template::new("<h1>{title}</h1>"));
        assert_eq!(report.succeeded.len(), 2);
        assert_eq!(report.warnings.len(), 1);
        assert!(matches!(
            &report.warnings[0].error,
            PageError::SlugCollision { previous, .. } if previous == "Jam!"
        ));
        assert_eq!(fs::read_to_string(dir.path().join("jam.html"))?, "<h1>Jam?</h1>");
        Ok(())
    }

    #[test]
    fn unresolved_tokens_become_warnings() -> Result<()> {
        let dir = tempdir()?;
        let generator = PageGenerator::new(
            TextFileAccessor::default(),
            SiteConfig::default(),
            dir.path(),
        );
        let report = generator.generate(
            &[record("1", "Bus Jam")],
            &Template::new("{title} {rating}"),
        );
        assert_eq!(report.succeeded.len(), 1);
        assert!(matches!(
            &report.warnings[0].error,
            PageError::PlaceholderUnresolved { name } if name == "rating"
        ));
        Ok(())
    }
}
