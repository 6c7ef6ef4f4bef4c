//! services/api/src/web/rest.rs
//!
//! Contains the Axum handlers for the REST API endpoints and the master
//! definition for the OpenAPI specification.

use crate::web::state::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use book_scanner_core::domain::{Book, BookBox};
use book_scanner_core::ports::PortError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::error;
use utoipa::{OpenApi, ToSchema};
use uuid::Uuid;

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        list_boxes_handler,
        create_box_handler,
        list_box_books_handler,
        list_books_handler,
        get_book_handler,
    ),
    components(
        schemas(BoxResponse, CreateBoxRequest, BookResponse)
    ),
    tags(
        (name = "Book Box Scanner API", description = "Boxes and the books scanned into them.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// API Response and Payload Structs
//=========================================================================================

#[derive(Serialize, Debug, Clone, ToSchema)]
pub struct BoxResponse {
    pub id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

impl From<BookBox> for BoxResponse {
    fn from(book_box: BookBox) -> Self {
        Self {
            id: book_box.id,
            name: book_box.name,
            created_at: book_box.created_at,
        }
    }
}

/// Payload for registering a box.
#[derive(Deserialize, ToSchema)]
pub struct CreateBoxRequest {
    pub name: String,
}

/// A stored scan, as shown in list and detail views.
#[derive(Serialize, Debug, Clone, ToSchema)]
pub struct BookResponse {
    pub id: Uuid,
    pub box_name: String,
    pub isbn: String,
    pub title: String,
    pub author: String,
    pub year: Option<i32>,
    pub genre: String,
    pub cover: Option<String>,
    pub plot: String,
    pub market_price: Option<f64>,
    pub price_source: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<Book> for BookResponse {
    fn from(book: Book) -> Self {
        Self {
            id: book.id,
            box_name: book.box_name,
            isbn: book.isbn,
            title: book.metadata.title,
            author: book.metadata.author,
            year: book.metadata.year,
            genre: book.metadata.genre,
            cover: book.metadata.cover,
            plot: book.metadata.plot,
            market_price: book.market_price,
            price_source: book.price_source,
            created_at: book.created_at,
        }
    }
}

type HandlerError = (StatusCode, String);

/// `NotFound` becomes a 404; everything else is logged and hidden behind a 500.
fn port_failure(context: &str, e: PortError) -> HandlerError {
    match e {
        PortError::NotFound(what) => (StatusCode::NOT_FOUND, what),
        other => {
            error!("{}: {:?}", context, other);
            (StatusCode::INTERNAL_SERVER_ERROR, context.to_string())
        }
    }
}

//=========================================================================================
// REST API Handlers
//=========================================================================================

/// List every box, alphabetically.
#[utoipa::path(
    get,
    path = "/boxes",
    responses(
        (status = 200, description = "All boxes", body = [BoxResponse]),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn list_boxes_handler(
    State(app_state): State<Arc<AppState>>,
) -> Result<Json<Vec<BoxResponse>>, HandlerError> {
    let boxes = app_state
        .db
        .list_boxes()
        .await
        .map_err(|e| port_failure("Failed to list boxes", e))?;
    Ok(Json(boxes.into_iter().map(BoxResponse::from).collect()))
}

/// Register a box. Registering an existing name returns the existing box.
#[utoipa::path(
    post,
    path = "/boxes",
    request_body = CreateBoxRequest,
    responses(
        (status = 200, description = "The box with that name", body = BoxResponse),
        (status = 400, description = "Blank box name"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn create_box_handler(
    State(app_state): State<Arc<AppState>>,
    Json(payload): Json<CreateBoxRequest>,
) -> Result<Json<BoxResponse>, HandlerError> {
    let name = payload.name.trim();
    if name.is_empty() {
        return Err((StatusCode::BAD_REQUEST, "Box name must not be blank".to_string()));
    }
    let book_box = app_state
        .db
        .ensure_box(name)
        .await
        .map_err(|e| port_failure("Failed to create box", e))?;
    Ok(Json(book_box.into()))
}

/// List the books of one box, newest first.
#[utoipa::path(
    get,
    path = "/boxes/{name}/books",
    params(
        ("name" = String, Path, description = "The box name.")
    ),
    responses(
        (status = 200, description = "Books in the box", body = [BookResponse]),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn list_box_books_handler(
    State(app_state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> Result<Json<Vec<BookResponse>>, HandlerError> {
    let books = app_state
        .db
        .books_in_box(name.trim())
        .await
        .map_err(|e| port_failure("Failed to list books", e))?;
    Ok(Json(books.into_iter().map(BookResponse::from).collect()))
}

/// List every scanned book, newest first.
#[utoipa::path(
    get,
    path = "/books",
    responses(
        (status = 200, description = "All books", body = [BookResponse]),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn list_books_handler(
    State(app_state): State<Arc<AppState>>,
) -> Result<Json<Vec<BookResponse>>, HandlerError> {
    let books = app_state
        .db
        .all_books()
        .await
        .map_err(|e| port_failure("Failed to list books", e))?;
    Ok(Json(books.into_iter().map(BookResponse::from).collect()))
}

/// Fetch a single book.
#[utoipa::path(
    get,
    path = "/books/{id}",
    params(
        ("id" = Uuid, Path, description = "The book id.")
    ),
    responses(
        (status = 200, description = "The book", body = BookResponse),
        (status = 404, description = "No such book"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn get_book_handler(
    State(app_state): State<Arc<AppState>>,
    Path(book_id): Path<Uuid>,
) -> Result<Json<BookResponse>, HandlerError> {
    let book = app_state
        .db
        .get_book(book_id)
        .await
        .map_err(|e| port_failure("Failed to load book", e))?;
    Ok(Json(book.into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::web::testing::{app_state, dune, MemoryRepository};
    use book_scanner_core::domain::NewBook;
    use book_scanner_core::ports::BookRepository;

    #[tokio::test]
    async fn create_box_trims_and_deduplicates() {
        let state = app_state(Arc::new(MemoryRepository::default()));

        let Json(first) = create_box_handler(
            State(state.clone()),
            Json(CreateBoxRequest { name: " Attic 1 ".to_string() }),
        )
        .await
        .unwrap();
        let Json(second) = create_box_handler(
            State(state.clone()),
            Json(CreateBoxRequest { name: "Attic 1".to_string() }),
        )
        .await
        .unwrap();

        assert_eq!(first.name, "Attic 1");
        assert_eq!(first.id, second.id);
        let Json(boxes) = list_boxes_handler(State(state)).await.unwrap();
        assert_eq!(boxes.len(), 1);
    }

    #[tokio::test]
    async fn blank_box_name_is_a_bad_request() {
        let state = app_state(Arc::new(MemoryRepository::default()));
        let err = create_box_handler(
            State(state),
            Json(CreateBoxRequest { name: "  ".to_string() }),
        )
        .await
        .unwrap_err();
        assert_eq!(err.0, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn box_books_are_newest_first() {
        let repo = Arc::new(MemoryRepository::default());
        let state = app_state(repo.clone());
        for (box_name, isbn) in [("Attic 1", "0306406152"), ("Garage", "9780134685991"), ("Attic 1", "9780441172719")] {
            repo.insert_book(NewBook {
                box_name: box_name.to_string(),
                isbn: isbn.to_string(),
                metadata: dune(),
            })
            .await
            .unwrap();
        }

        let Json(books) = list_box_books_handler(State(state.clone()), Path("Attic 1".to_string()))
            .await
            .unwrap();
        let isbns: Vec<_> = books.iter().map(|b| b.isbn.as_str()).collect();
        assert_eq!(isbns, vec!["9780441172719", "0306406152"]);

        let Json(padded) = list_box_books_handler(State(state.clone()), Path(" Attic 1 ".to_string()))
            .await
            .unwrap();
        assert_eq!(padded.len(), 2);

        let Json(all) = list_books_handler(State(state)).await.unwrap();
        assert_eq!(all.len(), 3);
    }

    #[tokio::test]
    async fn missing_book_is_not_found() {
        let state = app_state(Arc::new(MemoryRepository::default()));
        let err = get_book_handler(State(state), Path(Uuid::new_v4()))
            .await
            .unwrap_err();
        assert_eq!(err.0, StatusCode::NOT_FOUND);
    }
}
