//! Layered application configuration.
//!
//! Built-in defaults are overlaid by the user config file, an optional
//! explicit file and finally `GAMEPAGES__*` environment variables.

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::textfile::TextEncoding;

/// Directory under the platform config dir holding `config.toml`.
pub const CONFIG_DIR: &str = "gamepages";

/// Remote feed settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedConfig {
    /// Endpoint without query string.
    pub url: String,
    /// Response format selector.
    pub format: u32,
    /// Collection/ordering key, sent as the feed's `name` parameter.
    pub sort: String,
    /// Records per page.
    pub page_size: u32,
    /// Page number to request.
    pub page: u32,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
    /// `User-Agent` header value.
    pub user_agent: String,
    /// `Referer` header value.
    pub referer: String,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            url: "https://gamemonetize.com/feed.php".to_string(),
            format: 0,
            sort: "traffic".to_string(),
            page_size: 50,
            page: 1,
            timeout_secs: 10,
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                         (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36"
                .to_string(),
            referer: "https://gamemonetize.com/".to_string(),
        }
    }
}

/// Values baked into every generated page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteConfig {
    /// Public URL prefix; pages live at `<base_url>/games/<slug>.html`.
    pub base_url: String,
    /// Keywords appended to each game's tags.
    pub keywords: String,
    /// Character budget for descriptions.
    pub description_limit: usize,
    /// Category shown when a record has none.
    pub default_category: String,
    /// Class marking the game iframe.
    pub iframe_class: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            base_url: "https://yourdomain.com".to_string(),
            keywords: "traffic games, html5 games".to_string(),
            description_limit: 160,
            default_category: "Game".to_string(),
            iframe_class: "game-iframe".to_string(),
        }
    }
}

/// On-disk locations, relative to `root` unless absolute.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Project root.
    pub root: PathBuf,
    /// Directory holding generated pages.
    pub games_dir: PathBuf,
    /// Page template.
    pub template: PathBuf,
    /// Persisted feed snapshot.
    pub snapshot: PathBuf,
    /// Generation ledger.
    pub ledger: PathBuf,
    /// File names in `games_dir` that are never treated as game pages.
    pub excluded: Vec<String>,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            games_dir: PathBuf::from("games"),
            template: PathBuf::from("games/game_template.html"),
            snapshot: PathBuf::from("games_data.json"),
            ledger: PathBuf::from("games/generated_games.json"),
            excluded: vec![
                "index.html".to_string(),
                "play.html".to_string(),
                "game_template.html".to_string(),
            ],
        }
    }
}

impl PathsConfig {
    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }

    /// Absolute or root-relative games directory.
    pub fn games_dir(&self) -> PathBuf {
        self.resolve(&self.games_dir)
    }

    /// Resolved template path.
    pub fn template(&self) -> PathBuf {
        self.resolve(&self.template)
    }

    /// Resolved snapshot path.
    pub fn snapshot(&self) -> PathBuf {
        self.resolve(&self.snapshot)
    }

    /// Resolved ledger path.
    pub fn ledger(&self) -> PathBuf {
        self.resolve(&self.ledger)
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    /// Feed endpoint.
    pub feed: FeedConfig,
    /// Page content.
    pub site: SiteConfig,
    /// File locations.
    pub paths: PathsConfig,
    /// Read fallback order.
    #[serde(default = "default_encodings")]
    pub encodings: Vec<TextEncoding>,
}

fn default_encodings() -> Vec<TextEncoding> {
    TextEncoding::DEFAULT_ORDER.to_vec()
}

impl AppConfig {
    /// Load from defaults, the user config file and the environment.
    pub fn load() -> Result<Self> {
        Self::load_with(None)
    }

    /// Like [`AppConfig::load`], layering `extra` on top of the user file.
    pub fn load_with(extra: Option<&Path>) -> Result<Self> {
        let defaults = Config::try_from(&AppConfig::with_default_encodings())
            .context("failed to encode default configuration")?;

        let mut builder = Config::builder().add_source(defaults);
        if let Some(user) = config_path() {
            builder = builder.add_source(File::from(user).required(false));
        }
        if let Some(extra) = extra {
            builder = builder.add_source(File::from(extra.to_path_buf()).required(true));
        }
        builder = builder.add_source(
            Environment::with_prefix("GAMEPAGES")
                .prefix_separator("__")
                .separator("__"),
        );

        builder
            .build()
            .context("failed to assemble configuration")?
            .try_deserialize()
            .context("invalid configuration")
    }

    fn with_default_encodings() -> Self {
        Self {
            encodings: default_encodings(),
            ..Self::default()
        }
    }
}

/// Location of the user configuration file, if a config dir exists.
pub fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(CONFIG_DIR).join("config.toml"))
}

/// Write the default configuration file when none exists yet.
pub fn ensure_default_config() -> Result<()> {
    let Some(path) = config_path() else {
        return Ok(());
    };
    if path.exists() {
        return Ok(());
    }
    write_default_config(&path)
}

fn write_default_config(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create config directory {}", parent.display()))?;
    }
    let rendered = render_default_toml()?;
    fs::write(path, rendered)
        .with_context(|| format!("failed to write config {}", path.display()))?;
    info!("wrote default configuration to {}", path.display());
    Ok(())
}

fn render_default_toml() -> Result<String> {
    let defaults = AppConfig::with_default_encodings();
    let value = serde_json::to_value(&defaults).context("failed to encode defaults")?;
    let mut out = String::new();

    if let Some(encodings) = value.get("encodings") {
        out.push_str(&format!("encodings = {encodings}\n"));
    }
    for section in ["feed", "site", "paths"] {
        let Some(table) = value.get(section).and_then(|v| v.as_object()) else {
            continue;
        };
        out.push_str(&format!("\n[{section}]\n"));
        for (key, entry) in table {
            out.push_str(&format!("{key} = {entry}\n"));
        }
    }
    Ok(out)
}
