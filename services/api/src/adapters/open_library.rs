//! services/api/src/adapters/open_library.rs
//!
//! This module contains the adapter for the Open Library catalog, the primary
//! metadata source. It implements the `MetadataSource` port from the `core` crate.

use crate::adapters::http::fetch_json;
use async_trait::async_trait;
use book_scanner_core::domain::BookMetadata;
use book_scanner_core::ports::{MetadataSource, PortResult};
use futures::future::join_all;
use regex::Regex;
use serde::Deserialize;
use tracing::debug;

const COVERS_BASE_URL: &str = "https://covers.openlibrary.org";

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements the `MetadataSource` port using the Open Library API.
#[derive(Clone)]
pub struct OpenLibraryAdapter {
    client: reqwest::Client,
    base_url: String,
}

impl OpenLibraryAdapter {
    /// Creates a new `OpenLibraryAdapter`. `base_url` has no trailing slash.
    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    async fn author_name(&self, key: &str) -> Option<String> {
        let url = format!("{}{}.json", self.base_url, key);
        match fetch_json::<AuthorRecord>(&self.client, &url).await {
            Ok(author) => author.name.filter(|name| !name.is_empty()),
            Err(e) => {
                debug!(key, error = %e, "Skipping author that could not be fetched");
                None
            }
        }
    }

    async fn work_description(&self, key: &str) -> String {
        let url = format!("{}{}.json", self.base_url, key);
        match fetch_json::<WorkRecord>(&self.client, &url).await {
            Ok(work) => work.description.map(Description::into_text).unwrap_or_default(),
            Err(e) => {
                debug!(key, error = %e, "Work description unavailable");
                String::new()
            }
        }
    }
}

//=========================================================================================
// Wire Formats
//=========================================================================================

#[derive(Deserialize)]
struct KeyRef {
    key: String,
}

#[derive(Deserialize)]
struct EditionRecord {
    title: Option<String>,
    #[serde(default)]
    authors: Vec<KeyRef>,
    publish_date: Option<String>,
    #[serde(default)]
    works: Vec<KeyRef>,
    #[serde(default)]
    covers: Vec<i64>,
}

#[derive(Deserialize)]
struct AuthorRecord {
    name: Option<String>,
}

#[derive(Deserialize)]
struct WorkRecord {
    description: Option<Description>,
}

/// Work descriptions come either as a bare string or as a typed text value.
#[derive(Deserialize)]
#[serde(untagged)]
enum Description {
    Text(String),
    Typed { value: String },
}

impl Description {
    fn into_text(self) -> String {
        match self {
            Description::Text(text) => text,
            Description::Typed { value } => value,
        }
    }
}

/// Extracts the first four-digit run, e.g. "March 2003" -> 2003.
fn publish_year(publish_date: &str) -> Option<i32> {
    let pattern = Regex::new(r"[0-9]{4}").ok()?;
    pattern.find(publish_date)?.as_str().parse().ok()
}

//=========================================================================================
// `MetadataSource` Trait Implementation
//=========================================================================================

#[async_trait]
impl MetadataSource for OpenLibraryAdapter {
    fn name(&self) -> &'static str {
        "open_library"
    }

    async fn lookup(&self, isbn: &str) -> PortResult<BookMetadata> {
        let url = format!("{}/isbn/{}.json", self.base_url, isbn);
        let edition: EditionRecord = fetch_json(&self.client, &url).await?;

        let author = join_all(edition.authors.iter().map(|a| self.author_name(&a.key)))
            .await
            .into_iter()
            .flatten()
            .collect::<Vec<_>>()
            .join(", ");

        let plot = match edition.works.first() {
            Some(work) => self.work_description(&work.key).await,
            None => String::new(),
        };

        let cover = edition
            .covers
            .first()
            .map(|id| format!("{}/b/id/{}-L.jpg", COVERS_BASE_URL, id));

        Ok(BookMetadata {
            title: edition.title.unwrap_or_default(),
            author,
            year: edition.publish_date.as_deref().and_then(publish_year),
            genre: String::new(),
            cover,
            plot,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn publish_year_finds_the_first_four_digit_run() {
        assert_eq!(publish_year("2003"), Some(2003));
        assert_eq!(publish_year("March 12, 1999"), Some(1999));
        assert_eq!(publish_year("c1965, printing 1990"), Some(1965));
        assert_eq!(publish_year("n.d."), None);
        assert_eq!(publish_year("'99"), None);
    }

    #[test]
    fn description_accepts_both_shapes() {
        let plain: WorkRecord = serde_json::from_str(r#"{"description": "A desert planet."}"#).unwrap();
        assert_eq!(plain.description.unwrap().into_text(), "A desert planet.");

        let typed: WorkRecord = serde_json::from_str(
            r#"{"description": {"type": "/type/text", "value": "Spice."}}"#,
        )
        .unwrap();
        assert_eq!(typed.description.unwrap().into_text(), "Spice.");

        let missing: WorkRecord = serde_json::from_str("{}").unwrap();
        assert!(missing.description.is_none());
    }
}
