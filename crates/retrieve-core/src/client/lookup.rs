//! Best-effort block lookups
//!
//! [`BestEffortLookup`] is the read policy handed to the content-exchange
//! layer. Every failure (unreachable server, non-success status, malformed
//! body) is reported as [`BlockNotFound`]; the cause is only logged. `has`
//! is a size lookup whose answer must echo the requested root, so a
//! transport failure also reads as "absent".
//!
//! Treat this as a cache, never as the source of truth for existence. Use
//! the [`Client`] methods directly when the cause matters.

use thiserror::Error;
use tracing::error;

use super::http::Client;

/// The only error a best-effort lookup returns
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("block not found")]
pub struct BlockNotFound;

/// Read-only block capability consumed by the content-exchange layer
pub trait BlockSource: Send + Sync {
    /// Bytes of the block named `root`
    fn get(&self, root: &str) -> Result<Vec<u8>, BlockNotFound>;

    /// Size of the block named `root`
    fn get_size(&self, root: &str) -> Result<u64, BlockNotFound>;

    /// Whether the block named `root` is available
    fn has(&self, root: &str) -> bool;
}

/// [`BlockSource`] over a remote block server that folds every failure
/// into "not found"
#[derive(Debug, Clone)]
pub struct BestEffortLookup {
    client: Client,
}

impl BestEffortLookup {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// The underlying client, for lookups that need the real error
    pub fn client(&self) -> &Client {
        &self.client
    }
}

impl BlockSource for BestEffortLookup {
    fn get(&self, root: &str) -> Result<Vec<u8>, BlockNotFound> {
        match self.client.fetch_block(root) {
            Ok(rb) => Ok(rb.block),
            Err(e) => {
                error!(parent: &self.client.span, root, error = %e, "get block");
                Err(BlockNotFound)
            }
        }
    }

    fn get_size(&self, root: &str) -> Result<u64, BlockNotFound> {
        match self.client.fetch_size(root) {
            Ok(rz) => Ok(rz.size),
            Err(e) => {
                error!(parent: &self.client.span, root, error = %e, "get size");
                Err(BlockNotFound)
            }
        }
    }

    fn has(&self, root: &str) -> bool {
        match self.client.fetch_size(root) {
            Ok(rz) => rz.root == root,
            Err(e) => {
                error!(parent: &self.client.span, root, error = %e, "has");
                false
            }
        }
    }
}
