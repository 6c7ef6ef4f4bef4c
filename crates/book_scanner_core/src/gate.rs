//! crates/book_scanner_core/src/gate.rs
//!
//! The scan gate: the accept/reject decision applied to every raw decode event.
//!
//! A camera keeps decoding the same barcode several times per second while it
//! stays in frame. The gate combines a global rate limiter, a per-code
//! deduplication window and a hard lockout after each accepted code so that a
//! book is forwarded once per pass under the camera.

use crate::classifier::{is_isbn, normalize};
use crate::domain::RawDecodeEvent;
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Timing knobs for the gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GateConfig {
    /// Minimum spacing between any two evaluated events.
    pub global_rate: Duration,
    /// How long a forwarded code stays suppressed.
    pub dedup_window: Duration,
    /// Hard lockout after any forward, whatever the next code is.
    pub post_accept_lock: Duration,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            global_rate: Duration::from_millis(500),
            dedup_window: Duration::from_millis(8000),
            post_accept_lock: Duration::from_millis(1200),
        }
    }
}

/// Why an event was not forwarded. Rejections are expected and silent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    RateLimited,
    LockedOut,
    NotIsbn,
    Duplicate,
    Repeat,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    /// Forward the normalized ISBN.
    Accept(String),
    Reject(RejectReason),
}

impl GateDecision {
    pub fn accepted(&self) -> Option<&str> {
        match self {
            GateDecision::Accept(code) => Some(code),
            GateDecision::Reject(_) => None,
        }
    }
}

/// Per-session gate state. Owned by a single scan session and evaluated
/// serially, so it carries no synchronization.
#[derive(Debug, Clone)]
pub struct ScanGate {
    config: GateConfig,
    last_any_scan_at: Option<Instant>,
    last_accepted_at: Option<Instant>,
    last_accepted_code: Option<String>,
    recent_codes: HashMap<String, Instant>,
}

impl ScanGate {
    pub fn new(config: GateConfig) -> Self {
        Self {
            config,
            last_any_scan_at: None,
            last_accepted_at: None,
            last_accepted_code: None,
            recent_codes: HashMap::new(),
        }
    }

    /// Number of codes currently held in the dedup window.
    pub fn tracked_codes(&self) -> usize {
        self.recent_codes.len()
    }

    /// Clears all timing state. The configuration is kept.
    pub fn reset(&mut self) {
        self.last_any_scan_at = None;
        self.last_accepted_at = None;
        self.last_accepted_code = None;
        self.recent_codes.clear();
    }

    /// Evaluates one decode event, updating state when it gets past the
    /// global rate check.
    pub fn evaluate(&mut self, event: &RawDecodeEvent) -> GateDecision {
        let now = event.at;

        if within(self.last_any_scan_at, now, self.config.global_rate) {
            return GateDecision::Reject(RejectReason::RateLimited);
        }
        self.last_any_scan_at = Some(now);

        if within(self.last_accepted_at, now, self.config.post_accept_lock) {
            return GateDecision::Reject(RejectReason::LockedOut);
        }

        let digits = normalize(&event.text);
        if !is_isbn(&digits) {
            return GateDecision::Reject(RejectReason::NotIsbn);
        }

        self.sweep(now);
        if self.recent_codes.contains_key(&digits) {
            return GateDecision::Reject(RejectReason::Duplicate);
        }

        // Only meaningful inside the window; past it the code is new again.
        if self.last_accepted_code.as_deref() == Some(digits.as_str())
            && !elapsed_beyond(self.last_accepted_at, now, self.config.dedup_window)
        {
            return GateDecision::Reject(RejectReason::Repeat);
        }

        self.recent_codes.insert(digits.clone(), now);
        self.last_accepted_code = Some(digits.clone());
        self.last_accepted_at = Some(now);
        GateDecision::Accept(digits)
    }

    fn sweep(&mut self, now: Instant) {
        let window = self.config.dedup_window;
        self.recent_codes
            .retain(|_, seen| now.saturating_duration_since(*seen) <= window);
    }
}

impl Default for ScanGate {
    fn default() -> Self {
        Self::new(GateConfig::default())
    }
}

/// True when `since` is set and less than `span` has elapsed at `now`.
fn within(since: Option<Instant>, now: Instant, span: Duration) -> bool {
    since.is_some_and(|t| now.saturating_duration_since(t) < span)
}

/// True when `since` is unset or more than `span` has elapsed at `now`.
fn elapsed_beyond(since: Option<Instant>, now: Instant, span: Duration) -> bool {
    since.map_or(true, |t| now.saturating_duration_since(t) > span)
}
