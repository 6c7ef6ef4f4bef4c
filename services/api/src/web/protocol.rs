//! services/api/src/web/protocol.rs
//!
//! Defines the WebSocket message protocol between the browser client and the API server.
//!
//! The browser owns the camera and the barcode decoder. It streams every decoded
//! text to the server, which runs the scan gate and reports back what was accepted.

use crate::web::rest::BookResponse;
use axum::extract::ws::{Message, WebSocket};
use futures::{stream::SplitSink, SinkExt};
use serde::{Deserialize, Serialize};
use tracing::error;

//=========================================================================================
// Messages Sent FROM the Client (Browser) TO the Server
//=========================================================================================

/// Represents the structured text messages a client can send on the scan socket.
#[derive(Deserialize, Debug, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Asks to start scanning into the named box. The box is created on first use.
    StartScan { box_name: String },

    /// The camera was granted and the decode stream is running.
    CameraReady,

    /// The camera could not be started (permission denied, no device, ...).
    CameraFailed { reason: String },

    /// One raw result from the continuous decode stream.
    Decoded { text: String },

    /// Stops the current scan session. Safe to send at any time.
    StopScan,
}

//=========================================================================================
// Messages Sent FROM the Server TO the Client (Browser)
//=========================================================================================

/// Audible confirmation the client should play when a scan is accepted.
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tone {
    pub frequency_hz: u32,
    pub duration_ms: u32,
    pub waveform: &'static str,
}

pub const ACCEPT_TONE: Tone = Tone {
    frequency_hz: 880,
    duration_ms: 150,
    waveform: "sine",
};

/// Represents the structured text messages the server can send to the client.
#[derive(Serialize, Debug, Clone)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// The box is ready; the client should now request camera access.
    CameraRequested { box_name: String },

    /// The session is running and decode results will be evaluated.
    ScanStarted { box_name: String },

    /// A new ISBN passed the gate. The client plays `tone` and updates its counters.
    ScanAccepted { isbn: String, count: u64, tone: Tone },

    /// The accepted ISBN was enriched and stored.
    BookSaved { book: BookResponse },

    /// The accepted ISBN could not be stored. Scanning continues.
    SaveFailed { isbn: String, message: String },

    /// The session stopped after forwarding `count` codes, the last being `last_isbn`.
    ScanStopped {
        count: u64,
        last_isbn: Option<String>,
    },

    /// A book was inserted (live feed socket).
    BookInserted { book: BookResponse },

    /// Reports an error to the client, which should display an error message.
    Error { message: String },
}

/// Serializes and sends one message. Returns `false` once the socket is gone.
pub async fn send_message(
    sender: &mut SplitSink<WebSocket, Message>,
    message: &ServerMessage,
) -> bool {
    let json = match serde_json::to_string(message) {
        Ok(json) => json,
        Err(e) => {
            error!("Failed to serialize server message: {}", e);
            return true;
        }
    };
    sender.send(Message::Text(json.into())).await.is_ok()
}
