//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use crate::config::Config;
use book_scanner_core::{BookRepository, MetadataResolver};
use std::sync::Arc;

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<dyn BookRepository>,
    pub config: Arc<Config>,
    pub resolver: MetadataResolver,
}
