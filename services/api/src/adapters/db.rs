//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, which is the concrete implementation
//! of the `BookRepository` port from the `core` crate. It handles all interactions
//! with the PostgreSQL database using `sqlx`.

use async_trait::async_trait;
use book_scanner_core::domain::{Book, BookBox, BookMetadata, NewBook};
use book_scanner_core::ports::{BookRepository, BookStream, PortError, PortResult};
use chrono::{DateTime, Utc};
use sqlx::postgres::PgListener;
use sqlx::{FromRow, PgPool};
use tracing::{debug, warn};
use uuid::Uuid;

/// The channel the `books` insert trigger notifies with the new row id.
pub const BOOK_INSERT_CHANNEL: &str = "book_inserted";

const BOOK_SELECT: &str = "SELECT b.id, b.box_id, x.name AS box_name, b.isbn, b.title, b.author, \
     b.year, b.genre, b.cover, b.plot, b.market_price, b.price_source, b.created_at \
     FROM books b JOIN boxes x ON x.id = b.box_id";

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the `BookRepository` port.
#[derive(Clone)]
pub struct DbAdapter {
    pool: PgPool,
}

impl DbAdapter {
    /// Creates a new `DbAdapter`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct BoxRecord {
    id: Uuid,
    name: String,
    created_at: DateTime<Utc>,
}
impl BoxRecord {
    fn to_domain(self) -> BookBox {
        BookBox {
            id: self.id,
            name: self.name,
            created_at: self.created_at,
        }
    }
}

#[derive(FromRow)]
struct BookRecord {
    id: Uuid,
    box_id: Uuid,
    box_name: String,
    isbn: String,
    title: String,
    author: String,
    year: Option<i32>,
    genre: String,
    cover: Option<String>,
    plot: String,
    market_price: Option<f64>,
    price_source: Option<String>,
    created_at: DateTime<Utc>,
}
impl BookRecord {
    fn to_domain(self) -> Book {
        Book {
            id: self.id,
            box_id: self.box_id,
            box_name: self.box_name,
            isbn: self.isbn,
            metadata: BookMetadata {
                title: self.title,
                author: self.author,
                year: self.year,
                genre: self.genre,
                cover: self.cover,
                plot: self.plot,
            },
            market_price: self.market_price,
            price_source: self.price_source,
            created_at: self.created_at,
        }
    }
}

#[derive(FromRow)]
struct InsertedRecord {
    id: Uuid,
    created_at: DateTime<Utc>,
}

async fn fetch_book(pool: &PgPool, book_id: Uuid) -> PortResult<Book> {
    let record = sqlx::query_as::<_, BookRecord>(&format!("{} WHERE b.id = $1", BOOK_SELECT))
        .bind(book_id)
        .fetch_one(pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => PortError::NotFound(format!("Book {} not found", book_id)),
            _ => PortError::Unexpected(e.to_string()),
        })?;
    Ok(record.to_domain())
}

//=========================================================================================
// `BookRepository` Trait Implementation
//=========================================================================================

#[async_trait]
impl BookRepository for DbAdapter {
    async fn ensure_box(&self, name: &str) -> PortResult<BookBox> {
        sqlx::query("INSERT INTO boxes (id, name) VALUES ($1, $2) ON CONFLICT (name) DO NOTHING")
            .bind(Uuid::new_v4())
            .bind(name)
            .execute(&self.pool)
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        let record = sqlx::query_as::<_, BoxRecord>(
            "SELECT id, name, created_at FROM boxes WHERE name = $1",
        )
        .bind(name)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => PortError::NotFound(format!("Box {} not found", name)),
            _ => PortError::Unexpected(e.to_string()),
        })?;

        Ok(record.to_domain())
    }

    async fn list_boxes(&self) -> PortResult<Vec<BookBox>> {
        let records = sqlx::query_as::<_, BoxRecord>(
            "SELECT id, name, created_at FROM boxes ORDER BY name ASC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| PortError::Unexpected(e.to_string()))?;

        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn insert_book(&self, book: NewBook) -> PortResult<Book> {
        let book_box = self.ensure_box(&book.box_name).await?;
        let metadata = book.metadata;

        let inserted = sqlx::query_as::<_, InsertedRecord>(
            "INSERT INTO books (id, box_id, isbn, title, author, year, genre, cover, plot, market_price, price_source) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, NULL, NULL) RETURNING id, created_at",
        )
        .bind(Uuid::new_v4())
        .bind(book_box.id)
        .bind(&book.isbn)
        .bind(&metadata.title)
        .bind(&metadata.author)
        .bind(metadata.year)
        .bind(&metadata.genre)
        .bind(&metadata.cover)
        .bind(&metadata.plot)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| PortError::Unexpected(e.to_string()))?;

        Ok(Book {
            id: inserted.id,
            box_id: book_box.id,
            box_name: book_box.name,
            isbn: book.isbn,
            metadata,
            market_price: None,
            price_source: None,
            created_at: inserted.created_at,
        })
    }

    async fn get_book(&self, book_id: Uuid) -> PortResult<Book> {
        fetch_book(&self.pool, book_id).await
    }

    async fn books_in_box(&self, box_name: &str) -> PortResult<Vec<Book>> {
        let records = sqlx::query_as::<_, BookRecord>(&format!(
            "{} WHERE x.name = $1 ORDER BY b.created_at DESC",
            BOOK_SELECT
        ))
        .bind(box_name)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| PortError::Unexpected(e.to_string()))?;

        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn all_books(&self) -> PortResult<Vec<Book>> {
        let records = sqlx::query_as::<_, BookRecord>(&format!(
            "{} ORDER BY b.created_at DESC",
            BOOK_SELECT
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| PortError::Unexpected(e.to_string()))?;

        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn subscribe_inserts(&self, box_name: Option<String>) -> PortResult<BookStream> {
        let mut listener = PgListener::connect_with(&self.pool)
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        listener
            .listen(BOOK_INSERT_CHANNEL)
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        let pool = self.pool.clone();
        let stream = async_stream::stream! {
            loop {
                let notification = match listener.recv().await {
                    Ok(notification) => notification,
                    Err(e) => {
                        yield Err(PortError::Unexpected(e.to_string()));
                        break;
                    }
                };

                let book_id = match Uuid::parse_str(notification.payload()) {
                    Ok(id) => id,
                    Err(e) => {
                        warn!(payload = notification.payload(), error = %e, "Ignoring malformed insert notification");
                        continue;
                    }
                };

                match fetch_book(&pool, book_id).await {
                    Ok(book) => {
                        if book.in_box(box_name.as_deref()) {
                            yield Ok(book);
                        } else {
                            debug!(%book_id, "Insert outside the subscribed box");
                        }
                    }
                    Err(e) => yield Err(e),
                }
            }
        };

        Ok(Box::pin(stream))
    }
}
