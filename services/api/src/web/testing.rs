//! services/api/src/web/testing.rs
//!
//! In-memory fakes for exercising the web layer without PostgreSQL or the network.

use crate::config::Config;
use crate::web::state::AppState;
use async_trait::async_trait;
use book_scanner_core::domain::{Book, BookBox, BookMetadata, NewBook};
use book_scanner_core::ports::{
    BookRepository, BookStream, MetadataSource, PortError, PortResult,
};
use book_scanner_core::MetadataResolver;
use chrono::Utc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast;
use uuid::Uuid;

pub(crate) struct MemoryRepository {
    boxes: Mutex<Vec<BookBox>>,
    books: Mutex<Vec<Book>>,
    // Stands in for the insert trigger's NOTIFY.
    inserts: broadcast::Sender<Book>,
    pub fail_boxes: AtomicBool,
    pub fail_inserts: AtomicBool,
    pub insert_attempts: AtomicUsize,
}

impl Default for MemoryRepository {
    fn default() -> Self {
        let (inserts, _) = broadcast::channel(16);
        Self {
            boxes: Mutex::default(),
            books: Mutex::default(),
            inserts,
            fail_boxes: AtomicBool::new(false),
            fail_inserts: AtomicBool::new(false),
            insert_attempts: AtomicUsize::new(0),
        }
    }
}

impl MemoryRepository {
    pub fn book_count(&self) -> usize {
        self.books.lock().unwrap().len()
    }
}

#[async_trait]
impl BookRepository for MemoryRepository {
    async fn ensure_box(&self, name: &str) -> PortResult<BookBox> {
        if self.fail_boxes.load(Ordering::SeqCst) {
            return Err(PortError::Unexpected("database unavailable".to_string()));
        }
        let mut boxes = self.boxes.lock().unwrap();
        if let Some(existing) = boxes.iter().find(|b| b.name == name) {
            return Ok(existing.clone());
        }
        let created = BookBox {
            id: Uuid::new_v4(),
            name: name.to_string(),
            created_at: Utc::now(),
        };
        boxes.push(created.clone());
        Ok(created)
    }

    async fn list_boxes(&self) -> PortResult<Vec<BookBox>> {
        let mut boxes = self.boxes.lock().unwrap().clone();
        boxes.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(boxes)
    }

    async fn insert_book(&self, book: NewBook) -> PortResult<Book> {
        self.insert_attempts.fetch_add(1, Ordering::SeqCst);
        if self.fail_inserts.load(Ordering::SeqCst) {
            return Err(PortError::Unexpected("insert rejected".to_string()));
        }
        let book_box = self.ensure_box(&book.box_name).await?;
        let stored = Book {
            id: Uuid::new_v4(),
            box_id: book_box.id,
            box_name: book_box.name,
            isbn: book.isbn,
            metadata: book.metadata,
            market_price: None,
            price_source: None,
            created_at: Utc::now(),
        };
        self.books.lock().unwrap().push(stored.clone());
        // No live subscribers is not an error.
        let _ = self.inserts.send(stored.clone());
        Ok(stored)
    }

    async fn get_book(&self, book_id: Uuid) -> PortResult<Book> {
        self.books
            .lock()
            .unwrap()
            .iter()
            .find(|b| b.id == book_id)
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("Book {} not found", book_id)))
    }

    async fn books_in_box(&self, box_name: &str) -> PortResult<Vec<Book>> {
        Ok(self
            .books
            .lock()
            .unwrap()
            .iter()
            .rev()
            .filter(|b| b.box_name == box_name)
            .cloned()
            .collect())
    }

    async fn all_books(&self) -> PortResult<Vec<Book>> {
        Ok(self.books.lock().unwrap().iter().rev().cloned().collect())
    }

    async fn subscribe_inserts(&self, box_name: Option<String>) -> PortResult<BookStream> {
        let mut inserts = self.inserts.subscribe();
        let stream = async_stream::stream! {
            loop {
                match inserts.recv().await {
                    Ok(book) if book.in_box(box_name.as_deref()) => {
                        yield Ok::<Book, PortError>(book);
                    }
                    Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => {}
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        };
        Ok(Box::pin(stream))
    }
}

/// A catalog that always answers with the same record, or always misses.
pub(crate) struct StaticSource(pub Option<BookMetadata>);

#[async_trait]
impl MetadataSource for StaticSource {
    fn name(&self) -> &'static str {
        "static"
    }

    async fn lookup(&self, isbn: &str) -> PortResult<BookMetadata> {
        self.0
            .clone()
            .ok_or_else(|| PortError::NotFound(isbn.to_string()))
    }
}

pub(crate) fn dune() -> BookMetadata {
    BookMetadata {
        title: "Dune".to_string(),
        author: "Frank Herbert".to_string(),
        year: Some(1965),
        ..Default::default()
    }
}

pub(crate) fn app_state(repo: Arc<MemoryRepository>) -> Arc<AppState> {
    let config = Config::from_lookup(|key| match key {
        "DATABASE_URL" => Some("postgres://localhost/books_test".to_string()),
        _ => None,
    })
    .unwrap();

    Arc::new(AppState {
        db: repo,
        config: Arc::new(config),
        resolver: MetadataResolver::new(
            Arc::new(StaticSource(Some(dune()))),
            Arc::new(StaticSource(None)),
        ),
    })
}
