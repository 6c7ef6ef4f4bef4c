//! services/api/src/adapters/google_books.rs
//!
//! Adapter for the Google Books volumes API, used as the fallback metadata source.

use crate::adapters::http::fetch_json;
use async_trait::async_trait;
use book_scanner_core::domain::BookMetadata;
use book_scanner_core::ports::{MetadataSource, PortError, PortResult};
use serde::Deserialize;

#[derive(Clone)]
pub struct GoogleBooksAdapter {
    client: reqwest::Client,
    base_url: String,
}

impl GoogleBooksAdapter {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }
}

#[derive(Deserialize)]
struct VolumesResponse {
    #[serde(default)]
    items: Vec<Volume>,
}

#[derive(Deserialize)]
struct Volume {
    #[serde(rename = "volumeInfo", default)]
    volume_info: VolumeInfo,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct VolumeInfo {
    title: Option<String>,
    #[serde(default)]
    authors: Vec<String>,
    published_date: Option<String>,
    #[serde(default)]
    categories: Vec<String>,
    image_links: Option<ImageLinks>,
    description: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ImageLinks {
    thumbnail: Option<String>,
    small_thumbnail: Option<String>,
}

impl From<VolumeInfo> for BookMetadata {
    fn from(info: VolumeInfo) -> Self {
        BookMetadata {
            title: info.title.unwrap_or_default(),
            author: info.authors.join(", "),
            year: info
                .published_date
                .as_deref()
                .and_then(|date| date.get(..4))
                .and_then(|year| year.parse().ok()),
            genre: info.categories.join(", "),
            cover: info
                .image_links
                .and_then(|links| links.thumbnail.or(links.small_thumbnail)),
            plot: info.description.unwrap_or_default(),
        }
    }
}

#[async_trait]
impl MetadataSource for GoogleBooksAdapter {
    fn name(&self) -> &'static str {
        "google_books"
    }

    async fn lookup(&self, isbn: &str) -> PortResult<BookMetadata> {
        let url = format!("{}/books/v1/volumes?q=isbn:{}", self.base_url, isbn);
        let response: VolumesResponse = fetch_json(&self.client, &url).await?;

        let volume = response
            .items
            .into_iter()
            .next()
            .ok_or_else(|| PortError::NotFound(format!("No Google Books volume for {}", isbn)))?;

        Ok(volume.volume_info.into())
    }
}
