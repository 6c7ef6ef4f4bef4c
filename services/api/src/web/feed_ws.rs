//! services/api/src/web/feed_ws.rs
//!
//! Live feed of newly inserted books, used to keep list views current.

use crate::web::{
    protocol::{send_message, ServerMessage},
    state::AppState,
};
use axum::{
    extract::{
        ws::{Message, WebSocket},
        Query, State, WebSocketUpgrade,
    },
    response::Response,
};
use book_scanner_core::domain::Book;
use book_scanner_core::ports::PortResult;
use futures::StreamExt;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{error, info, warn};

#[derive(Deserialize, Debug, Default)]
pub struct FeedQuery {
    /// Only books of this box are pushed; all books when absent.
    #[serde(rename = "box")]
    pub box_name: Option<String>,
}

pub async fn feed_ws_handler(
    ws: WebSocketUpgrade,
    State(app_state): State<Arc<AppState>>,
    Query(query): Query<FeedQuery>,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, app_state, query.box_filter()))
}

impl FeedQuery {
    /// The trimmed box name to filter on. A blank name means every box.
    fn box_filter(self) -> Option<String> {
        self.box_name
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty())
    }
}

/// The frame pushed for one item of the insert stream, if any.
fn feed_frame(item: PortResult<Book>) -> Option<ServerMessage> {
    match item {
        Ok(book) => Some(ServerMessage::BookInserted { book: book.into() }),
        Err(e) => {
            warn!("Live feed error: {}", e);
            None
        }
    }
}

async fn handle_socket(socket: WebSocket, app_state: Arc<AppState>, box_name: Option<String>) {
    info!(box_name = ?box_name, "New live feed connection.");
    let (mut sender, mut receiver) = socket.split();

    let mut inserts = match app_state.db.subscribe_inserts(box_name).await {
        Ok(stream) => stream,
        Err(e) => {
            error!("Failed to subscribe to book inserts: {:?}", e);
            let _ = send_message(
                &mut sender,
                &ServerMessage::Error {
                    message: "Live updates are unavailable.".to_string(),
                },
            )
            .await;
            return;
        }
    };

    loop {
        tokio::select! {
            item = inserts.next() => match item {
                Some(item) => {
                    if let Some(message) = feed_frame(item) {
                        if !send_message(&mut sender, &message).await {
                            break;
                        }
                    }
                }
                None => {
                    warn!("Insert notifications ended.");
                    break;
                }
            },
            frame = receiver.next() => match frame {
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => {}
            },
        }
    }

    info!("Live feed connection closed.");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::web::testing::{app_state, dune, MemoryRepository};
    use book_scanner_core::domain::NewBook;
    use book_scanner_core::ports::{BookRepository, PortError};
    use std::time::Duration;
    use tokio::time::timeout;

    fn scan_into(box_name: &str, isbn: &str) -> NewBook {
        NewBook {
            box_name: box_name.to_string(),
            isbn: isbn.to_string(),
            metadata: dune(),
        }
    }

    #[test]
    fn box_query_is_trimmed_and_blank_means_all() {
        let query = |name: Option<&str>| FeedQuery {
            box_name: name.map(str::to_string),
        };
        assert_eq!(query(Some(" Attic 1 ")).box_filter().as_deref(), Some("Attic 1"));
        assert_eq!(query(Some("   ")).box_filter(), None);
        assert_eq!(query(None).box_filter(), None);
    }

    #[tokio::test]
    async fn subscribed_box_only_receives_its_own_inserts() {
        let repo = Arc::new(MemoryRepository::default());
        let state = app_state(repo.clone());
        let mut attic = state
            .db
            .subscribe_inserts(Some("Attic 1".to_string()))
            .await
            .unwrap();
        let mut everything = state.db.subscribe_inserts(None).await.unwrap();

        repo.insert_book(scan_into("Garage", "0306406152")).await.unwrap();
        repo.insert_book(scan_into("Attic 1", "9780441172719")).await.unwrap();

        let first = timeout(Duration::from_secs(1), attic.next())
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        assert_eq!(first.box_name, "Attic 1");
        assert_eq!(first.isbn, "9780441172719");

        let garage = timeout(Duration::from_secs(1), everything.next())
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        let attic_book = timeout(Duration::from_secs(1), everything.next())
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        assert_eq!(garage.box_name, "Garage");
        assert_eq!(attic_book.box_name, "Attic 1");

        assert!(timeout(Duration::from_millis(50), attic.next()).await.is_err());
    }

    #[tokio::test]
    async fn inserted_books_become_book_inserted_frames() {
        let repo = Arc::new(MemoryRepository::default());
        let book = repo
            .insert_book(scan_into("Attic 1", "9780441172719"))
            .await
            .unwrap();

        match feed_frame(Ok(book.clone())) {
            Some(ServerMessage::BookInserted { book: pushed }) => {
                assert_eq!(pushed.id, book.id);
                assert_eq!(pushed.box_name, "Attic 1");
            }
            other => panic!("unexpected frame: {:?}", other),
        }
        assert!(feed_frame(Err(PortError::Unexpected("listener lost".to_string()))).is_none());
    }
}
