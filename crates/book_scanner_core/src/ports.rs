//! crates/book_scanner_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of specific external implementations like databases or APIs.

use crate::domain::{Book, BookBox, BookMetadata, NewBook};
use async_trait::async_trait;
use futures::Stream;
use std::pin::Pin;
use uuid::Uuid;

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., database, network).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

/// Live stream of newly inserted books.
pub type BookStream = Pin<Box<dyn Stream<Item = PortResult<Book>> + Send>>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

#[async_trait]
pub trait BookRepository: Send + Sync {
    // --- Box Registry ---
    /// Creates the box if the name is new, otherwise returns the existing one.
    async fn ensure_box(&self, name: &str) -> PortResult<BookBox>;

    async fn list_boxes(&self) -> PortResult<Vec<BookBox>>;

    // --- Books ---
    /// Appends a scan record. Records are never updated afterwards.
    async fn insert_book(&self, book: NewBook) -> PortResult<Book>;

    async fn get_book(&self, book_id: Uuid) -> PortResult<Book>;

    /// Books of one box, newest first.
    async fn books_in_box(&self, box_name: &str) -> PortResult<Vec<Book>>;

    /// Every book, newest first.
    async fn all_books(&self) -> PortResult<Vec<Book>>;

    /// Pushes every book inserted after the call, optionally only for one box.
    async fn subscribe_inserts(&self, box_name: Option<String>) -> PortResult<BookStream>;
}

#[async_trait]
pub trait MetadataSource: Send + Sync {
    /// Short identifier used in logs.
    fn name(&self) -> &'static str;

    /// Looks up a book by its normalized ISBN.
    async fn lookup(&self, isbn: &str) -> PortResult<BookMetadata>;
}
