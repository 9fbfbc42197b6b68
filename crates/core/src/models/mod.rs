//! Shared domain models.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::PageError;

/// One game as delivered by the metadata feed, after normalisation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameRecord {
    /// Opaque feed identifier.
    #[serde(default)]
    pub id: String,
    /// Display title; never empty.
    pub title: String,
    /// Free-text description.
    #[serde(default)]
    pub description: String,
    /// Thumbnail image URL.
    #[serde(default)]
    pub thumbnail_url: String,
    /// URL of the embeddable game.
    #[serde(default)]
    pub play_url: String,
    /// Optional category label.
    #[serde(default)]
    pub category: Option<String>,
    /// Optional comma-delimited tag list.
    #[serde(default)]
    pub tags: Option<String>,
}

impl GameRecord {
    /// Normalise one raw feed object.
    ///
    /// String and numeric values are accepted; everything else counts as
    /// absent. `position` labels the record in diagnostics when it has no id.
    pub fn from_feed(raw: &Map<String, Value>, position: usize) -> Result<Self, PageError> {
        let id = text_field(raw, "id").unwrap_or_default();
        let title = text_field(raw, "title")
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .ok_or_else(|| PageError::MissingField {
                field: "title",
                record: if id.is_empty() {
                    format!("#{position}")
                } else {
                    id.clone()
                },
            })?;

        Ok(Self {
            id,
            title,
            description: text_field(raw, "description").unwrap_or_default(),
            thumbnail_url: text_field(raw, "thumb").unwrap_or_default(),
            play_url: text_field(raw, "url").unwrap_or_default(),
            category: non_empty(text_field(raw, "category")),
            tags: non_empty(text_field(raw, "tags")),
        })
    }
}

fn text_field(raw: &Map<String, Value>, key: &str) -> Option<String> {
    match raw.get(key)? {
        Value::String(value) => Some(value.clone()),
        Value::Number(value) => Some(value.to_string()),
        _ => None,
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
