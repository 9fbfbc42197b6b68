//! Game metadata ingestion.

/// Blocking feed client and response normalisation.
pub mod client;
/// Persisted record snapshot.
pub mod snapshot;

pub use client::{parse_feed, FeedClient, FetchOutcome};
pub use snapshot::Snapshot;
