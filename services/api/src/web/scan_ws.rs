//! services/api/src/web/scan_ws.rs
//!
//! This is the main entry point and control loop for a scanning WebSocket.
//! It drives the scan session state machine and dispatches ingest tasks.

use crate::web::{
    ingest_task::{spawn_ingest, IngestOutcome},
    protocol::{send_message, ClientMessage, ServerMessage, ACCEPT_TONE},
    scan_session::ScanSession,
    state::AppState,
};
use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::Response,
};
use book_scanner_core::RawDecodeEvent;
use futures::StreamExt;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc::{self, UnboundedSender};
use tracing::{debug, error, info, warn};

const CAMERA_ERROR: &str = "Unable to start the camera. Grant camera permission and try again.";

/// The handler for upgrading HTTP requests to scanning WebSocket connections.
pub async fn scan_ws_handler(
    ws: WebSocketUpgrade,
    State(app_state): State<Arc<AppState>>,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, app_state))
}

async fn handle_socket(socket: WebSocket, app_state: Arc<AppState>) {
    info!("New scan connection established.");

    let (mut sender, mut receiver) = socket.split();
    let (outcome_tx, mut outcome_rx) = mpsc::unbounded_channel::<IngestOutcome>();
    let mut session = ScanSession::new(app_state.config.gate);

    // --- Main Message Loop ---
    'connection: loop {
        tokio::select! {
            frame = receiver.next() => match frame {
                Some(Ok(Message::Text(text))) => {
                    let replies =
                        handle_client_text(text.as_str(), &app_state, &mut session, &outcome_tx).await;
                    for reply in replies {
                        if !send_message(&mut sender, &reply).await {
                            warn!("Failed to send reply, closing scan connection.");
                            break 'connection;
                        }
                    }
                }
                Some(Ok(Message::Close(_))) => {
                    info!("Client sent close message.");
                    break;
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    warn!("Scan socket receive error: {}", e);
                    break;
                }
                None => {
                    info!("Client disconnected.");
                    break;
                }
            },
            Some(outcome) = outcome_rx.recv() => {
                if let Some(reply) = outcome_message(&session, outcome) {
                    if !send_message(&mut sender, &reply).await {
                        break;
                    }
                }
            }
        }
    }

    // --- Cleanup ---
    if let Some(count) = session.stop() {
        info!(count, "Scan session stopped on connection teardown.");
    }
    info!("Scan connection closed.");
}

/// Applies one client text frame to the session and returns the replies to send.
pub(crate) async fn handle_client_text(
    text: &str,
    app_state: &Arc<AppState>,
    session: &mut ScanSession,
    outcomes: &UnboundedSender<IngestOutcome>,
) -> Vec<ServerMessage> {
    let client_msg = match serde_json::from_str::<ClientMessage>(text) {
        Ok(msg) => msg,
        Err(e) => {
            warn!("Failed to deserialize client message: {}", e);
            return Vec::new();
        }
    };

    match client_msg {
        ClientMessage::StartScan { box_name } => start_scan(&box_name, app_state, session).await,
        ClientMessage::CameraReady => {
            if !session.camera_ready() {
                warn!("CameraReady received without a pending start, ignored.");
                return Vec::new();
            }
            let box_name = session.box_name().unwrap_or_default().to_string();
            info!(box_name = %box_name, "Scan session running.");
            vec![ServerMessage::ScanStarted { box_name }]
        }
        ClientMessage::CameraFailed { reason } => {
            if !session.abort_start() {
                return Vec::new();
            }
            warn!(reason = %reason, "Camera could not be started.");
            vec![ServerMessage::Error {
                message: CAMERA_ERROR.to_string(),
            }]
        }
        ClientMessage::Decoded { text } => {
            let event = RawDecodeEvent::new(text, Instant::now());
            let Some(scan) = session.on_decode(&event) else {
                return Vec::new();
            };
            info!(isbn = %scan.isbn, count = scan.count, "Scan accepted.");
            let reply = ServerMessage::ScanAccepted {
                isbn: scan.isbn.clone(),
                count: scan.count,
                tone: ACCEPT_TONE,
            };
            spawn_ingest(app_state.clone(), scan, outcomes.clone());
            vec![reply]
        }
        ClientMessage::StopScan => match session.stop() {
            Some(count) => {
                info!(count, "Scan session stopped.");
                vec![ServerMessage::ScanStopped {
                    count,
                    last_isbn: session.last_isbn().map(str::to_string),
                }]
            }
            None => Vec::new(),
        },
    }
}

async fn start_scan(
    box_name: &str,
    app_state: &Arc<AppState>,
    session: &mut ScanSession,
) -> Vec<ServerMessage> {
    let box_name = box_name.trim();
    if box_name.is_empty() {
        return vec![ServerMessage::Error {
            message: "A box name is required to start scanning.".to_string(),
        }];
    }
    if !session.request_start(box_name) {
        debug!("StartScan received while a session is active, ignored.");
        return Vec::new();
    }

    match app_state.db.ensure_box(box_name).await {
        Ok(book_box) => vec![ServerMessage::CameraRequested {
            box_name: book_box.name,
        }],
        Err(e) => {
            error!("Failed to open box {}: {:?}", box_name, e);
            session.abort_start();
            vec![ServerMessage::Error {
                message: "Failed to open the box.".to_string(),
            }]
        }
    }
}

/// Turns an ingest outcome into a client message, unless it belongs to a
/// session that has since stopped.
pub(crate) fn outcome_message(session: &ScanSession, outcome: IngestOutcome) -> Option<ServerMessage> {
    if !session.is_current(outcome.generation()) {
        debug!("Discarding ingest outcome from a stopped session.");
        return None;
    }
    Some(match outcome {
        IngestOutcome::Saved { book, .. } => ServerMessage::BookSaved { book: book.into() },
        IngestOutcome::Failed { isbn, message, .. } => ServerMessage::SaveFailed { isbn, message },
    })
}
