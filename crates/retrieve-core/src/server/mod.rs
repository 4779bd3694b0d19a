//! Block server
//!
//! [`BlockServer`] is a stateless request handler over one [`Store`]. It
//! turns the four logical operations into store calls and distinguishes
//! "no such block" from backend failure for its callers. The HTTP surface
//! lives in [`http`].

pub mod http;

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, warn, Span};

use crate::store::{Store, StoreError};

pub use http::{router, serve};

/// Errors returned by server operations
#[derive(Error, Debug)]
pub enum ServerError {
    /// No row exists for the requested root
    #[error("block not found: {root}")]
    NotFound { root: String },

    /// Backend failure
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ServerError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ServerError::NotFound { .. })
    }
}

/// Result type for server operations
pub type ServerResult<T> = Result<T, ServerError>;

/// Request handler layered on a store
#[derive(Debug)]
pub struct BlockServer {
    store: Arc<Store>,
    span: Span,
}

impl BlockServer {
    /// Create a server over `store`, logging under a `server` span
    pub fn new(store: Arc<Store>) -> Self {
        Self {
            store,
            span: tracing::info_span!("server"),
        }
    }

    /// Log under the given span instead of the default one
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    /// The store this server reads and writes
    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Get the bytes stored for `root`
    pub async fn get_block(&self, root: &str) -> ServerResult<Vec<u8>> {
        let block = self
            .store
            .get_block(root)
            .await
            .inspect_err(|e| warn!(parent: &self.span, root, error = %e, "getblock failed"))?
            .ok_or_else(|| not_found(root))?;

        debug!(parent: &self.span, root, size = block.len(), "getblock");
        Ok(block)
    }

    /// Get the stored size for `root`
    pub async fn get_size(&self, root: &str) -> ServerResult<u64> {
        let size = self
            .store
            .get_size(root)
            .await
            .inspect_err(|e| warn!(parent: &self.span, root, error = %e, "getsize failed"))?
            .ok_or_else(|| not_found(root))?;

        debug!(parent: &self.span, root, size, "getsize");
        Ok(size)
    }

    /// Store `data` under `root`, replacing any existing block
    pub async fn upsert(&self, root: &str, data: &[u8]) -> ServerResult<u64> {
        let size = self
            .store
            .upsert(root, data)
            .await
            .inspect_err(|e| warn!(parent: &self.span, root, error = %e, "upsert failed"))?;

        debug!(parent: &self.span, root, size, "upsert");
        Ok(size)
    }

    /// Remove the block for `root`, returning whether it existed
    ///
    /// A missing root is a no-op, not [`ServerError::NotFound`].
    pub async fn delete(&self, root: &str) -> ServerResult<bool> {
        let existed = self
            .store
            .delete(root)
            .await
            .inspect_err(|e| warn!(parent: &self.span, root, error = %e, "delete failed"))?;

        debug!(parent: &self.span, root, existed, "delete");
        Ok(existed)
    }
}

fn not_found(root: &str) -> ServerError {
    ServerError::NotFound {
        root: root.to_owned(),
    }
}
