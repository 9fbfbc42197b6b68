use std::{path::Path, time::Duration};

use reqwest::{
    blocking::Client,
    header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, REFERER, USER_AGENT},
};
use serde_json::Value;
use tracing::{info, warn};

use crate::{
    batch::ItemIssue,
    config::FeedConfig,
    error::{FetchError, PageError},
    models::GameRecord,
};

use super::snapshot::Snapshot;

/// Fields the page template relies on, checked on the first raw record.
pub const KEY_FIELDS: [&str; 6] = ["title", "description", "url", "thumb", "category", "tags"];

/// Result of one successful fetch.
#[derive(Debug, Default)]
pub struct FetchOutcome {
    /// Normalised records in feed order.
    pub records: Vec<GameRecord>,
    /// Records dropped during normalisation.
    pub dropped: Vec<ItemIssue>,
    /// Presence of each [`KEY_FIELDS`] entry on the first raw record.
    pub key_fields: Vec<(&'static str, bool)>,
}

/// Blocking client for the game metadata feed. No retries are attempted.
pub struct FeedClient {
    http: Client,
    config: FeedConfig,
}

impl FeedClient {
    /// Build a client with the configured headers and timeout.
    pub fn new(config: FeedConfig) -> Result<Self, PageError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/json, text/plain, */*"),
        );
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));
        headers.insert(
            USER_AGENT,
            header_value(&config, "User-Agent", &config.user_agent)?,
        );
        headers.insert(
            REFERER,
            header_value(&config, "Referer", &config.referer)?,
        );

        let http = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|err| PageError::Fetch {
                url: config.url.clone(),
                source: err.into(),
            })?;

        Ok(Self { http, config })
    }

    fn query(&self) -> [(&'static str, String); 4] {
        [
            ("format", self.config.format.to_string()),
            ("name", self.config.sort.clone()),
            ("num", self.config.page_size.to_string()),
            ("page", self.config.page.to_string()),
        ]
    }

    /// Perform one GET against the feed and normalise the response.
    pub fn fetch(&self) -> Result<FetchOutcome, PageError> {
        let url = self.config.url.clone();
        let fail = |source: FetchError| PageError::Fetch {
            url: url.clone(),
            source,
        };

        info!("fetching game feed from {}", self.config.url);
        let response = self
            .http
            .get(&self.config.url)
            .query(&self.query())
            .send()
            .map_err(|err| fail(err.into()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(fail(FetchError::Status(status.as_u16())));
        }

        let body = response.text().map_err(|err| fail(err.into()))?;
        let outcome = parse_feed(&body).map_err(fail)?;
        info!(
            "feed returned {} records ({} dropped)",
            outcome.records.len(),
            outcome.dropped.len()
        );
        Ok(outcome)
    }

    /// Fetch and persist the normalised records as the new snapshot.
    pub fn fetch_into(&self, snapshot_path: impl AsRef<Path>) -> Result<FetchOutcome, PageError> {
        let outcome = self.fetch()?;
        Snapshot::new(outcome.records.clone()).persist(snapshot_path.as_ref())?;
        info!("snapshot written to {}", snapshot_path.as_ref().display());
        Ok(outcome)
    }
}

fn header_value(
    config: &FeedConfig,
    name: &'static str,
    value: &str,
) -> Result<HeaderValue, PageError> {
    HeaderValue::from_str(value).map_err(|source| PageError::Fetch {
        url: config.url.clone(),
        source: FetchError::InvalidHeader { name, source },
    })
}

/// Parse a feed body into normalised records.
///
/// The body must be a JSON array; array entries that are not objects or lack
/// a title are dropped and reported instead of failing the whole fetch.
pub fn parse_feed(body: &str) -> Result<FetchOutcome, FetchError> {
    let value: Value = serde_json::from_str(body)?;
    let Value::Array(entries) = value else {
        return Err(FetchError::NotAnArray);
    };

    let mut outcome = FetchOutcome {
        key_fields: key_field_presence(entries.first()),
        ..FetchOutcome::default()
    };

    for (position, entry) in entries.iter().enumerate() {
        let Some(object) = entry.as_object() else {
            warn!("dropping feed entry #{position}: not an object");
            outcome.dropped.push(ItemIssue {
                item: format!("#{position}"),
                error: PageError::MissingField {
                    field: "title",
                    record: format!("#{position}"),
                },
            });
            continue;
        };

        match GameRecord::from_feed(object, position) {
            Ok(record) => outcome.records.push(record),
            Err(err) => {
                warn!("dropping feed entry #{position}: {err}");
                outcome.dropped.push(ItemIssue {
                    item: format!("#{position}"),
                    error: err,
                });
            }
        }
    }

    Ok(outcome)
}

fn key_field_presence(first: Option<&Value>) -> Vec<(&'static str, bool)> {
    KEY_FIELDS
        .iter()
        .map(|&field| {
            let present = first
                .and_then(|record| record.get(field))
                .map(|value| !value.is_null())
                .unwrap_or(false);
            (field, present)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use std::{
        io::{Read, Write},
        net::TcpListener,
        thread,
    };
    use tempfile::tempdir;

    const BODY: &str = r#"[
        {"id": "a1", "title": "Traffic Rush 3D", "description": "Weave.", "url": "https://play.example/a1",
         "thumb": "https://img.example/a1.jpg", "category": "Racing", "tags": "cars"},
        {"id": "a2", "description": "No title here"},
        {"id": 3, "title": "Bus Jam", "url": "https://play.example/3", "thumb": "https://img.example/3.jpg"}
    ]"#;

    fn serve_once(status_line: &'static str, body: &'static str) -> Result<String> {
        let listener = TcpListener::bind("127.0.0.1:0")?;
        let addr = listener.local_addr()?;
        thread::spawn(move || {
            if let Ok((mut stream, _)) = listener.accept() {
                let mut request = Vec::new();
                let mut buf = [0u8; 1024];
                while let Ok(read) = stream.read(&mut buf) {
                    if read == 0 {
                        break;
                    }
                    request.extend_from_slice(&buf[..read]);
                    if request.windows(4).any(|w| w == b"\r\n\r\n") {
                        break;
                    }
                }
                let response = format!(
                    "{status_line}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                    body.len()
                );
                let _ = stream.write_all(response.as_bytes());
            }
        });
        Ok(format!("http://{addr}/feed.php"))
    }

    fn config_for(url: String) -> FeedConfig {
        FeedConfig {
            url,
            timeout_secs: 5,
            ..FeedConfig::default()
        }
    }

    #[test]
    fn drops_untitled_records() -> Result<()> {
        let outcome = parse_feed(BODY)?;
        assert_eq!(outcome.records.len(), 2);
        assert_eq!(outcome.records[1].id, "3");
        assert_eq!(outcome.dropped.len(), 1);
        assert_eq!(outcome.dropped[0].item, "#1");
        assert!(outcome.key_fields.iter().all(|(_, present)| *present));
        Ok(())
    }

    #[test]
    fn rejects_non_array_bodies() {
        assert!(matches!(
            parse_feed(r#"{"title": "x"}"#),
            Err(FetchError::NotAnArray)
        ));
        assert!(matches!(parse_feed("<html>"), Err(FetchError::Malformed(_))));
    }

    #[test]
    fn fetch_persists_snapshot() -> Result<()> {
        let url = serve_once("HTTP/1.1 200 OK", BODY)?;
        let dir = tempdir()?;
        let snapshot_path = dir.path().join("games_data.json");

        let outcome = FeedClient::new(config_for(url))?.fetch_into(&snapshot_path)?;
        assert_eq!(outcome.records.len(), 2);
        assert_eq!(Snapshot::load(&snapshot_path)?.records, outcome.records);
        Ok(())
    }

    #[test]
    fn unreachable_endpoint_is_a_transport_failure() -> Result<()> {
        let addr = TcpListener::bind("127.0.0.1:0")?.local_addr()?;
        let err = FeedClient::new(config_for(format!("http://{addr}/feed.php")))?
            .fetch()
            .expect_err("nothing is listening");
        assert!(matches!(
            err,
            PageError::Fetch {
                source: FetchError::Transport(_),
                ..
            }
        ));
        Ok(())
    }

    #[test]
    fn unsendable_header_is_rejected_up_front() {
        let config = FeedConfig {
            referer: "https://gamemonetize.com/\nX-Injected: 1".to_string(),
            ..FeedConfig::default()
        };
        match FeedClient::new(config) {
            Err(PageError::Fetch {
                source: FetchError::InvalidHeader { name, .. },
                ..
            }) => assert_eq!(name, "Referer"),
            Err(other) => panic!("unexpected error {other}"),
            Ok(_) => panic!("header with a newline should be rejected"),
        }
    }

    #[test]
    fn non_success_status_is_a_fetch_failure() -> Result<()> {
        let url = serve_once("HTTP/1.1 503 Service Unavailable", "[]")?;
        let err = FeedClient::new(config_for(url))?
            .fetch()
            .expect_err("503 should fail");
        assert!(matches!(
            err,
            PageError::Fetch {
                source: FetchError::Status(503),
                ..
            }
        ));
        Ok(())
    }
}
