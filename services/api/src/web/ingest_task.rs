//! services/api/src/web/ingest_task.rs
//!
//! This module contains the background "worker" for one accepted scan:
//! metadata lookup followed by the insert, reported back over a channel.

use crate::web::{scan_session::AcceptedScan, state::AppState};
use book_scanner_core::domain::{Book, NewBook};
use std::sync::Arc;
use tokio::{sync::mpsc::UnboundedSender, task::JoinHandle};
use tracing::{debug, error, info};

/// What happened to an accepted scan once its background work finished.
#[derive(Debug)]
pub enum IngestOutcome {
    Saved { generation: u64, book: Book },
    Failed { generation: u64, isbn: String, message: String },
}

impl IngestOutcome {
    pub fn generation(&self) -> u64 {
        match self {
            IngestOutcome::Saved { generation, .. } | IngestOutcome::Failed { generation, .. } => {
                *generation
            }
        }
    }
}

/// Runs the ingest for `scan` in the background without blocking the decode loop.
///
/// The insert always completes, even if the session stops meanwhile. Only the
/// report is dropped once the session's token is cancelled.
pub fn spawn_ingest(
    app_state: Arc<AppState>,
    scan: AcceptedScan,
    outcomes: UnboundedSender<IngestOutcome>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let outcome = ingest(&app_state, &scan).await;
        if scan.token.is_cancelled() {
            debug!(isbn = %scan.isbn, "Session stopped, discarding ingest outcome");
            return;
        }
        // The receiver goes away with the connection; nothing left to report to.
        let _ = outcomes.send(outcome);
    })
}

/// Resolves metadata for the scan and appends it to storage.
pub async fn ingest(app_state: &AppState, scan: &AcceptedScan) -> IngestOutcome {
    let metadata = app_state.resolver.resolve(&scan.isbn).await;

    let new_book = NewBook {
        box_name: scan.box_name.clone(),
        isbn: scan.isbn.clone(),
        metadata,
    };

    match app_state.db.insert_book(new_book).await {
        Ok(book) => {
            info!(isbn = %book.isbn, box_name = %book.box_name, book_id = %book.id, "Book saved");
            IngestOutcome::Saved {
                generation: scan.generation,
                book,
            }
        }
        Err(e) => {
            error!(isbn = %scan.isbn, box_name = %scan.box_name, error = %e, "Failed to save scanned book");
            IngestOutcome::Failed {
                generation: scan.generation,
                isbn: scan.isbn.clone(),
                message: e.to_string(),
            }
        }
    }
}
