//! Retrieve Core Library
//!
//! This crate provides the remote blockstore behind a content-distribution
//! gateway: blocks keyed by content identifier, stored in SQL, served over
//! HTTP and read back through a best-effort client.
//!
//! # Architecture
//!
//! - **Store**: embedded (SQLite, single writer) or distributed
//!   (Postgres protocol, many writers) backend, picked from the connection
//!   string
//! - **Server**: get / size / upsert / delete over one store, with an HTTP
//!   surface
//! - **Client**: blocking HTTP client and the best-effort `BlockSource`
//! - **Migration**: one-shot copy of every block between two stores
//!
//! # Quick Start
//!
//! ```text
//! let store = Arc::new(Store::open("postgres://yugabyte@db:5433/yugabyte").await?);
//! let server = Arc::new(BlockServer::new(store));
//! server::serve(listener, server, shutdown).await?;
//!
//! // Elsewhere
//! let blocks = Client::new("127.0.0.1:9876")?.best_effort();
//! let data = blocks.get("bafy...")?;
//! ```
//!
//! # Modules
//!
//! - `store`: backends, dialects and schema
//! - `server`: request handling and HTTP routes
//! - `client`: remote lookups
//! - `migrate`: bulk copy between stores
//! - `wire`: JSON messages shared by server and client
//! - `config`: application configuration

pub mod client;
pub mod config;
pub mod migrate;
pub mod server;
pub mod store;
pub mod wire;

pub use client::{BestEffortLookup, BlockNotFound, BlockSource, Client, ClientError};
pub use config::Config;
pub use migrate::{Migration, MigrationError, MigrationReport};
pub use server::{BlockServer, ServerError};
pub use store::{Block, Dialect, Store, StoreError, StoreOptions};
pub use wire::{RootBlock, RootSize};
