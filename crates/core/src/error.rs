//! Error taxonomy shared by every pipeline stage.

use std::path::PathBuf;

use thiserror::Error;

use crate::textfile::TextEncoding;

/// Per-item and fatal failures raised by the page pipeline.
///
/// Batch runners never return these for a single bad item; they are collected
/// into a [`crate::batch::BatchReport`] alongside the item they belong to.
#[derive(Debug, Error)]
pub enum PageError {
    /// No configured encoding could decode the file.
    #[error("could not decode {} with any of [{}]", .path.display(), join_encodings(.tried))]
    Decode {
        /// File that failed to decode.
        path: PathBuf,
        /// Encodings attempted, in order.
        tried: Vec<TextEncoding>,
    },

    /// Reading or writing a file failed at the OS level.
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        /// File being accessed.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The metadata feed could not be fetched or understood.
    #[error("feed request to {url} failed: {source}")]
    Fetch {
        /// Endpoint that was queried.
        url: String,
        /// What went wrong.
        #[source]
        source: FetchError,
    },

    /// A mandatory record field was absent or empty.
    #[error("record {record} is missing mandatory field `{field}`")]
    MissingField {
        /// Field name as it appears in the feed.
        field: &'static str,
        /// Best available label for the record (feed id or position).
        record: String,
    },

    /// A title is present but leaves nothing once reduced to a slug.
    #[error("title \"{title}\" yields an empty slug")]
    EmptySlug {
        /// Offending title.
        title: String,
    },

    /// A template token had no value and was left in the output.
    #[error("placeholder {{{name}}} left unresolved")]
    PlaceholderUnresolved {
        /// Token name without braces.
        name: String,
    },

    /// Two titles in one run produced the same slug; the later one wins.
    #[error("slug `{slug}` from \"{title}\" overwrites the page generated for \"{previous}\"")]
    SlugCollision {
        /// Shared slug.
        slug: String,
        /// Title written last.
        title: String,
        /// Title whose page was overwritten.
        previous: String,
    },

    /// The page has no stylesheet block to migrate.
    #[error("no stylesheet block")]
    NoStyleBlock,

    /// A required input artifact does not exist.
    #[error("{what} not found at {}", .path.display())]
    MissingInput {
        /// Human label for the artifact.
        what: &'static str,
        /// Expected location.
        path: PathBuf,
    },

    /// A JSON artifact could not be (de)serialised.
    #[error("invalid JSON in {}: {source}", .path.display())]
    Json {
        /// Artifact path.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: serde_json::Error,
    },

    /// A style revision is malformed.
    #[error("invalid style revision: {0}")]
    Revision(String),
}

/// Causes of a failed feed fetch.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Connection, timeout or body read failure.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Endpoint answered with a non-success status.
    #[error("unexpected HTTP status {0}")]
    Status(u16),

    /// A configured header value cannot be sent.
    #[error("invalid {name} header: {source}")]
    InvalidHeader {
        /// Header name.
        name: &'static str,
        /// Underlying error.
        #[source]
        source: reqwest::header::InvalidHeaderValue,
    },

    /// Body was not valid JSON.
    #[error("malformed JSON: {0}")]
    Malformed(#[from] serde_json::Error),

    /// Body was JSON but not an array of records.
    #[error("expected a JSON array of records")]
    NotAnArray,
}

impl PageError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn revision(msg: impl Into<String>) -> Self {
        Self::Revision(msg.into())
    }
}

fn join_encodings(tried: &[TextEncoding]) -> String {
    tried
        .iter()
        .map(|encoding| encoding.label())
        .collect::<Vec<_>>()
        .join(", ")
}
