//! Blocking HTTP client for the block server
//!
//! One call is one request; there is no caching, coalescing or retry. Every
//! method returns the full [`ClientError`] so callers that care can tell a
//! missing block from an unreachable server.

use std::time::Duration;

use reqwest::blocking::Response;
use reqwest::header::CONTENT_TYPE;
use reqwest::{StatusCode, Url};
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, Span};

use super::lookup::BestEffortLookup;
use crate::wire::{RootBlock, RootSize};

/// Default request timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Errors from a single client round trip
#[derive(Error, Debug)]
pub enum ClientError {
    /// Server address could not be turned into a URL
    #[error("Invalid server address '{addr}': {details}")]
    InvalidAddress { addr: String, details: String },

    /// Connection, timeout or body transfer failure
    #[error("Request to block server failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// Server answered with a non-success status
    #[error("status: {status} msg: {message}")]
    Status { status: StatusCode, message: String },

    /// Body is not the expected JSON
    #[error("Invalid JSON body: {0}")]
    Decode(#[from] serde_json::Error),
}

impl ClientError {
    /// Whether the server answered that the block does not exist
    pub fn is_not_found(&self) -> bool {
        matches!(self, ClientError::Status { status, .. } if *status == StatusCode::NOT_FOUND)
    }
}

/// Result type for client round trips
pub type ClientResult<T> = Result<T, ClientError>;

/// Client for a remote block server
#[derive(Debug, Clone)]
pub struct Client {
    base: Url,
    http: reqwest::blocking::Client,
    pub(crate) span: Span,
}

impl Client {
    /// Create a client for the server at `addr`
    ///
    /// `addr` is either `host:port` (plain HTTP) or a full `http(s)://` URL.
    pub fn new(addr: &str) -> ClientResult<Self> {
        Self::with_timeout(addr, DEFAULT_TIMEOUT)
    }

    /// Create a client with a per-request timeout
    pub fn with_timeout(addr: &str, timeout: Duration) -> ClientResult<Self> {
        let base = parse_base(addr)?;
        let http = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()?;

        Ok(Self {
            base,
            http,
            span: tracing::info_span!("client"),
        })
    }

    /// Log under the given span instead of the default one
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    /// Base URL of the server
    pub fn base_url(&self) -> &Url {
        &self.base
    }

    /// Wrap this client in the best-effort lookup policy
    pub fn best_effort(self) -> BestEffortLookup {
        BestEffortLookup::new(self)
    }

    /// `GET /block/{root}`
    pub fn fetch_block(&self, root: &str) -> ClientResult<RootBlock> {
        let url = self.endpoint(&["block", root])?;
        let rb: RootBlock = self.get_json(url)?;
        debug!(parent: &self.span, root, size = rb.block.len(), "fetched block");
        Ok(rb)
    }

    /// `GET /size/{root}`
    pub fn fetch_size(&self, root: &str) -> ClientResult<RootSize> {
        let url = self.endpoint(&["size", root])?;
        let rz: RootSize = self.get_json(url)?;
        debug!(parent: &self.span, root, size = rz.size, "fetched size");
        Ok(rz)
    }

    /// `POST /block`
    pub fn post_block(&self, root: &str, block: &[u8]) -> ClientResult<()> {
        let url = self.endpoint(&["block"])?;
        let body = serde_json::to_vec(&RootBlock {
            root: root.to_owned(),
            block: block.to_vec(),
        })?;

        let resp = self
            .http
            .post(url)
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()?;
        check_status(resp)?;

        debug!(parent: &self.span, root, size = block.len(), "posted block");
        Ok(())
    }

    fn get_json<T: DeserializeOwned>(&self, url: Url) -> ClientResult<T> {
        let resp = check_status(self.http.get(url).send()?)?;
        let body = resp.bytes()?;
        Ok(serde_json::from_slice(&body)?)
    }

    fn endpoint(&self, segments: &[&str]) -> ClientResult<Url> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| ClientError::InvalidAddress {
                addr: self.base.to_string(),
                details: "cannot be a base URL".to_string(),
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }
}

/// Turn a non-success response into [`ClientError::Status`]
fn check_status(resp: Response) -> ClientResult<Response> {
    let status = resp.status();
    if status == StatusCode::OK {
        return Ok(resp);
    }
    let message = resp.text()?;
    Err(ClientError::Status { status, message })
}

fn parse_base(addr: &str) -> ClientResult<Url> {
    let addr = addr.trim();
    let with_scheme = if addr.starts_with("http://") || addr.starts_with("https://") {
        addr.to_string()
    } else {
        format!("http://{addr}")
    };

    let url = Url::parse(&with_scheme).map_err(|e| ClientError::InvalidAddress {
        addr: addr.to_string(),
        details: e.to_string(),
    })?;
    if url.cannot_be_a_base() || url.host_str().is_none() {
        return Err(ClientError::InvalidAddress {
            addr: addr.to_string(),
            details: "missing host".to_string(),
        });
    }
    Ok(url)
}
