//! crates/book_scanner_core/src/resolver.rs
//!
//! Best-effort metadata lookup over a primary and a fallback catalog.

use crate::domain::BookMetadata;
use crate::ports::MetadataSource;
use std::sync::Arc;
use tracing::{debug, warn};

/// Tries the primary source, then the fallback exactly once, and settles for
/// the empty record when both fail. Never returns an error.
#[derive(Clone)]
pub struct MetadataResolver {
    primary: Arc<dyn MetadataSource>,
    fallback: Arc<dyn MetadataSource>,
}

impl MetadataResolver {
    pub fn new(primary: Arc<dyn MetadataSource>, fallback: Arc<dyn MetadataSource>) -> Self {
        Self { primary, fallback }
    }

    pub async fn resolve(&self, isbn: &str) -> BookMetadata {
        match self.primary.lookup(isbn).await {
            Ok(metadata) => {
                debug!(isbn, source = self.primary.name(), "Metadata resolved");
                return metadata;
            }
            Err(e) => warn!(
                isbn,
                source = self.primary.name(),
                error = %e,
                "Primary metadata lookup failed, trying fallback"
            ),
        }

        match self.fallback.lookup(isbn).await {
            Ok(metadata) => {
                debug!(isbn, source = self.fallback.name(), "Metadata resolved");
                metadata
            }
            Err(e) => {
                warn!(
                    isbn,
                    source = self.fallback.name(),
                    error = %e,
                    "Fallback metadata lookup failed, storing blank metadata"
                );
                BookMetadata::default()
            }
        }
    }
}
