//! Enumeration of generated game pages.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::debug;
use walkdir::WalkDir;

/// List `.html` files directly inside `dir`, sorted by name, skipping any
/// whose file name appears in `excluded`.
pub fn game_pages(dir: impl AsRef<Path>, excluded: &[String]) -> Result<Vec<PathBuf>> {
    let dir = dir.as_ref();
    let mut pages = Vec::new();

    for entry in WalkDir::new(dir).min_depth(1).max_depth(1).sort_by_file_name() {
        let entry = entry.with_context(|| format!("failed to read {}", dir.display()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        let is_html = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.eq_ignore_ascii_case("html"))
            .unwrap_or(false);
        if !is_html {
            continue;
        }
        let name = entry.file_name().to_string_lossy();
        if excluded.iter().any(|skip| skip.as_str() == name.as_ref()) {
            debug!("skipping excluded page {}", name);
            continue;
        }
        pages.push(path.to_path_buf());
    }

    Ok(pages)
}

/// File name of `path` for reports.
pub fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn lists_game_pages_only() -> Result<()> {
        let dir = tempdir()?;
        for name in ["b-game.html", "a-game.HTML", "index.html", "play.html", "notes.txt"] {
            fs::write(dir.path().join(name), "x")?;
        }
        fs::create_dir_all(dir.path().join("nested"))?;
        fs::write(dir.path().join("nested").join("deep.html"), "x")?;

        let excluded = vec!["index.html".to_string(), "play.html".to_string()];
        let names: Vec<_> = game_pages(dir.path(), &excluded)?
            .iter()
            .map(|path| display_name(path))
            .collect();
        assert_eq!(names, vec!["a-game.HTML", "b-game.html"]);
        Ok(())
    }

    #[test]
    fn missing_directory_is_fatal() {
        assert!(game_pages("/nonexistent/games", &[]).is_err());
    }
}
