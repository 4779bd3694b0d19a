//! Remote blockstore client
//!
//! - [`Client`]: one blocking HTTP round trip per call, full error detail
//! - [`BestEffortLookup`]: the [`BlockSource`] handed to the exchange layer,
//!   where every failure reads as "not found"
//!
//! ## Usage
//!
//! ```ignore
//! let blocks = Client::new("127.0.0.1:9876")?.best_effort();
//! if blocks.has("bafy1") {
//!     let data = blocks.get("bafy1")?;
//! }
//! ```

mod http;
mod lookup;

pub use http::{Client, ClientError, ClientResult, DEFAULT_TIMEOUT};
pub use lookup::{BestEffortLookup, BlockNotFound, BlockSource};
