//! services/api/src/web/scan_session.rs
//!
//! The scan session controller: owns the scan gate for one WebSocket connection
//! and tracks the `Idle -> Starting -> Running -> Idle` lifecycle.
//!
//! The session is owned by the connection task and mutated serially, so none of
//! its state is shared or locked.

use book_scanner_core::{GateConfig, GateDecision, RawDecodeEvent, ScanGate};
use tokio_util::sync::CancellationToken;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanState {
    Idle,
    /// Waiting for the client to report on camera access.
    Starting,
    Running,
}

/// Everything the ingest task needs about a code the gate let through.
#[derive(Debug, Clone)]
pub struct AcceptedScan {
    pub isbn: String,
    pub box_name: String,
    pub count: u64,
    pub generation: u64,
    /// Cancelled when the session that accepted the code stops.
    pub token: CancellationToken,
}

pub struct ScanSession {
    state: ScanState,
    box_name: Option<String>,
    gate: ScanGate,
    generation: u64,
    scanned: u64,
    last_isbn: Option<String>,
    token: CancellationToken,
}

impl ScanSession {
    pub fn new(config: GateConfig) -> Self {
        Self {
            state: ScanState::Idle,
            box_name: None,
            gate: ScanGate::new(config),
            generation: 0,
            scanned: 0,
            last_isbn: None,
            token: CancellationToken::new(),
        }
    }

    pub fn state(&self) -> ScanState {
        self.state
    }

    pub fn box_name(&self) -> Option<&str> {
        self.box_name.as_deref()
    }

    /// The most recent ISBN forwarded by the current or last session.
    pub fn last_isbn(&self) -> Option<&str> {
        self.last_isbn.as_deref()
    }

    /// Enters `Starting`. Returns `false` (and changes nothing) when a session
    /// is already starting or running.
    pub fn request_start(&mut self, box_name: &str) -> bool {
        if self.state != ScanState::Idle {
            return false;
        }
        self.state = ScanState::Starting;
        self.box_name = Some(box_name.to_string());
        self.scanned = 0;
        self.last_isbn = None;
        true
    }

    /// The camera is live: opens a new generation with clean gate state.
    pub fn camera_ready(&mut self) -> bool {
        if self.state != ScanState::Starting {
            return false;
        }
        self.generation += 1;
        self.token = CancellationToken::new();
        self.gate.reset();
        self.state = ScanState::Running;
        true
    }

    /// Abandons a pending start (camera refused, box unavailable). The session
    /// never reaches `Running`.
    pub fn abort_start(&mut self) -> bool {
        if self.state != ScanState::Starting {
            return false;
        }
        self.state = ScanState::Idle;
        self.box_name = None;
        true
    }

    /// Runs one decode event through the gate. Only a running session
    /// evaluates events.
    pub fn on_decode(&mut self, event: &RawDecodeEvent) -> Option<AcceptedScan> {
        if self.state != ScanState::Running {
            return None;
        }
        let box_name = self.box_name.clone()?;

        match self.gate.evaluate(event) {
            GateDecision::Accept(isbn) => {
                self.scanned += 1;
                self.last_isbn = Some(isbn.clone());
                Some(AcceptedScan {
                    isbn,
                    box_name,
                    count: self.scanned,
                    generation: self.generation,
                    token: self.token.clone(),
                })
            }
            GateDecision::Reject(reason) => {
                debug!(?reason, text = %event.text, "Decode rejected");
                None
            }
        }
    }

    /// True while `generation` is the session that is currently running.
    pub fn is_current(&self, generation: u64) -> bool {
        self.state == ScanState::Running && self.generation == generation
    }

    /// Stops the session and returns how many codes it forwarded, or `None`
    /// when there was nothing to stop. Idempotent.
    pub fn stop(&mut self) -> Option<u64> {
        if self.state == ScanState::Idle {
            return None;
        }
        self.token.cancel();
        self.gate.reset();
        self.state = ScanState::Idle;
        self.box_name = None;
        Some(self.scanned)
    }
}

impl Drop for ScanSession {
    fn drop(&mut self) {
        self.token.cancel();
    }
}
