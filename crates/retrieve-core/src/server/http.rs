//! HTTP surface of the block server
//!
//! Routes:
//! - `GET /block/{root}` -> 200 `{"root", "block"}`
//! - `GET /size/{root}` -> 200 `{"root", "size"}`
//! - `POST /block` with `{"root", "block"}` -> 200
//!
//! Failures answer with a plain-text body: 404 when the block is absent,
//! 500 when the store fails, 4xx for a malformed request body.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::extract::rejection::JsonRejection;
use axum::extract::{ConnectInfo, DefaultBodyLimit, Path, Request, State};
use axum::http::StatusCode;
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use tokio::net::TcpListener;
use tracing::{debug, info, warn};

use super::{BlockServer, ServerError};
use crate::wire::{RootBlock, RootSize};

/// Build the router for `server`
pub fn router(server: Arc<BlockServer>) -> Router {
    Router::new()
        .route("/block/:root", get(get_block))
        .route("/size/:root", get(get_size))
        .route("/block", post(post_block))
        // Blocks have no size cap
        .layer(DefaultBodyLimit::disable())
        .layer(middleware::from_fn(log_request))
        .with_state(server)
}

/// Serve `server` on `listener` until `shutdown` resolves
pub async fn serve<F>(
    listener: TcpListener,
    server: Arc<BlockServer>,
    shutdown: F,
) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = listener.local_addr()?;
    info!(%addr, dialect = %server.store().dialect(), "block server listening");

    axum::serve(
        listener,
        router(server).into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown)
    .await?;

    info!("block server stopped");
    Ok(())
}

async fn get_block(
    State(server): State<Arc<BlockServer>>,
    Path(root): Path<String>,
) -> Response {
    match server.get_block(&root).await {
        Ok(block) => Json(RootBlock { root, block }).into_response(),
        Err(e) => error_response(e),
    }
}

async fn get_size(
    State(server): State<Arc<BlockServer>>,
    Path(root): Path<String>,
) -> Response {
    match server.get_size(&root).await {
        Ok(size) => Json(RootSize { root, size }).into_response(),
        Err(e) => error_response(e),
    }
}

async fn post_block(
    State(server): State<Arc<BlockServer>>,
    body: Result<Json<RootBlock>, JsonRejection>,
) -> Response {
    let Json(rb) = match body {
        Ok(body) => body,
        Err(rejection) => {
            warn!(error = %rejection.body_text(), "rejected block upload");
            return rejection.into_response();
        }
    };

    match server.upsert(&rb.root, &rb.block).await {
        Ok(_) => StatusCode::OK.into_response(),
        Err(e) => error_response(e),
    }
}

fn error_response(err: ServerError) -> Response {
    let status = match &err {
        ServerError::NotFound { .. } => StatusCode::NOT_FOUND,
        ServerError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, err.to_string()).into_response()
}

/// Log every request with its outcome and latency
async fn log_request(req: Request, next: Next) -> Response {
    let method = req.method().clone();
    let path = req.uri().path().to_owned();
    let remote = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.to_string());
    let started = Instant::now();

    let response = next.run(req).await;

    debug!(
        %method,
        path = %path,
        remote = remote.as_deref().unwrap_or("-"),
        status = response.status().as_u16(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "request"
    );
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{Store, MEMORY};
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Method};
    use tower::ServiceExt;

    async fn app() -> (Router, Arc<BlockServer>) {
        let store = Arc::new(Store::open(MEMORY).await.unwrap());
        let server = Arc::new(BlockServer::new(store));
        (router(Arc::clone(&server)), server)
    }

    async fn send(app: &Router, req: axum::http::Request<Body>) -> (StatusCode, Vec<u8>) {
        let response = app.clone().oneshot(req).await.unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, body.to_vec())
    }

    fn get(uri: &str) -> axum::http::Request<Body> {
        axum::http::Request::builder()
            .uri(uri)
            .body(Body::empty())
            .unwrap()
    }

    fn post_json(body: String) -> axum::http::Request<Body> {
        axum::http::Request::builder()
            .method(Method::POST)
            .uri("/block")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body))
            .unwrap()
    }

    #[tokio::test]
    async fn test_post_then_get() {
        let (app, _) = app().await;

        let (status, _) = send(&app, post_json(r#"{"root":"bafy1","block":"AQID"}"#.into())).await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = send(&app, get("/block/bafy1")).await;
        assert_eq!(status, StatusCode::OK);
        let rb: RootBlock = serde_json::from_slice(&body).unwrap();
        assert_eq!(rb.root, "bafy1");
        assert_eq!(rb.block, vec![0x01, 0x02, 0x03]);

        let (status, body) = send(&app, get("/size/bafy1")).await;
        assert_eq!(status, StatusCode::OK);
        let rz: RootSize = serde_json::from_slice(&body).unwrap();
        assert_eq!(rz.root, "bafy1");
        assert_eq!(rz.size, 3);
    }

    #[tokio::test]
    async fn test_missing_block_is_404_text() {
        let (app, _) = app().await;

        let (status, body) = send(&app, get("/block/bafyMissing")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(String::from_utf8(body).unwrap().contains("bafyMissing"));

        let (status, _) = send(&app, get("/size/bafyMissing")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_malformed_body_is_rejected() {
        let (app, server) = app().await;

        let (status, _) = send(&app, post_json("{not json".into())).await;
        assert!(status.is_client_error());

        let (status, _) = send(&app, post_json(r#"{"root":"bafy1","block":"%%%"}"#.into())).await;
        assert!(status.is_client_error());

        assert_eq!(server.store().block_count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_large_block_is_accepted() {
        let (app, server) = app().await;
        let data = vec![0xAB; 4 * 1024 * 1024];
        let body = serde_json::to_string(&RootBlock {
            root: "bafyLarge".to_string(),
            block: data.clone(),
        })
        .unwrap();

        let (status, _) = send(&app, post_json(body)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(server.get_size("bafyLarge").await.unwrap(), data.len() as u64);
    }

    #[tokio::test]
    async fn test_delete_has_no_route() {
        let (app, server) = app().await;
        server.upsert("bafy1", b"kept").await.unwrap();

        let req = axum::http::Request::builder()
            .method(Method::DELETE)
            .uri("/block/bafy1")
            .body(Body::empty())
            .unwrap();
        let (status, _) = send(&app, req).await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(server.get_block("bafy1").await.unwrap(), b"kept".to_vec());
    }
}
