#![warn(clippy::all, missing_docs)]

//! Core logic for the game page corpus.
//!
//! This crate hosts the feed ingestion, page generation, stylesheet
//! migration and structural validation used by the `gamepages` command and
//! any future frontends. Every batch operation is sequential and fail-soft:
//! per-file problems end up in a [`BatchReport`] instead of aborting the run.

pub mod batch;
pub mod config;
pub mod corpus;
pub mod error;
pub mod feed;
pub mod models;
pub mod render;
pub mod slug;
pub mod style;
pub mod textfile;
pub mod validate;

pub use batch::{BatchReport, ItemIssue};
pub use config::AppConfig;
pub use error::{FetchError, PageError};
pub use models::GameRecord;
pub use slug::slugify;
pub use style::{migrate, MigrationMode, StyleRevision};
pub use textfile::{TextEncoding, TextFileAccessor};
pub use validate::{ValidationReport, Validator};
