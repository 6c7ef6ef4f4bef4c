//! crates/book_scanner_core/src/domain.rs
//!
//! Defines the pure, core data structures for the application.
//! These structs are independent of any database or serialization format.

use chrono::{DateTime, Utc};
use std::time::Instant;
use uuid::Uuid;

/// A single decoded barcode as delivered by the camera decode stream.
#[derive(Debug, Clone)]
pub struct RawDecodeEvent {
    pub text: String,
    pub at: Instant,
}

impl RawDecodeEvent {
    pub fn new(text: impl Into<String>, at: Instant) -> Self {
        Self {
            text: text.into(),
            at,
        }
    }
}

/// Best-effort catalog metadata for a book. `Default` is the empty record
/// persisted when every source fails.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BookMetadata {
    pub title: String,
    pub author: String,
    pub year: Option<i32>,
    pub genre: String,
    pub cover: Option<String>,
    pub plot: String,
}

/// A named physical container being cataloged.
#[derive(Debug, Clone)]
pub struct BookBox {
    pub id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// The payload of a single accepted scan, ready to be appended to storage.
#[derive(Debug, Clone)]
pub struct NewBook {
    pub box_name: String,
    pub isbn: String,
    pub metadata: BookMetadata,
}

/// A persisted scan record. Never mutated after insert.
#[derive(Debug, Clone)]
pub struct Book {
    pub id: Uuid,
    pub box_id: Uuid,
    pub box_name: String,
    pub isbn: String,
    pub metadata: BookMetadata,
    // Reserved for a price enrichment step; always NULL today.
    pub market_price: Option<f64>,
    pub price_source: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Book {
    /// True when the book belongs to `box_name`, or when no box is given.
    pub fn in_box(&self, box_name: Option<&str>) -> bool {
        box_name.map_or(true, |name| name == self.box_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn book_in(box_name: &str) -> Book {
        Book {
            id: Uuid::new_v4(),
            box_id: Uuid::new_v4(),
            box_name: box_name.to_string(),
            isbn: "9780441172719".to_string(),
            metadata: BookMetadata::default(),
            market_price: None,
            price_source: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn box_filter_matches_exact_names_only() {
        let book = book_in("Attic 1");
        assert!(book.in_box(None));
        assert!(book.in_box(Some("Attic 1")));
        assert!(!book.in_box(Some("Garage")));
        assert!(!book.in_box(Some("attic 1")));
    }
}
