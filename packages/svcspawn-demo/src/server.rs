//! The axum wiring: one `POST /invoke` endpoint that streams the request
//! body into a freshly spawned service child and streams its stdout back,
//! plus a `/healthz` liveness probe. Built the way `mcp-daemon`'s SSE
//! server wires `ServerState` + `Router` + `axum::serve`.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{HeaderMap, Request, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use bytes::Bytes;
use futures_util::StreamExt;
use log::{info, warn};
use svcspawn_core::env::{RequestBody, RequestMeta};
use svcspawn_core::middleware::{default_next, MiddlewareOutcome, ServiceSpawnMiddleware};
use tokio_stream::wrappers::UnboundedReceiverStream;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

/// Shared, immutable per-process state: the single fixed service this
/// host was started with.
#[derive(Clone)]
pub struct AppState {
    pub middleware: Arc<ServiceSpawnMiddleware>,
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/invoke", post(handle_invoke))
        .route("/healthz", get(handle_health))
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
        .with_state(state)
}

pub async fn serve(addr: SocketAddr, router: Router) -> anyhow::Result<()> {
    info!("svcspawn demo host listening on {addr}");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router).await?;
    Ok(())
}

async fn handle_health() -> &'static str {
    "ok"
}

/// Normalizes an axum request into `RequestMeta` + a framework-agnostic
/// body stream, invokes the middleware, and adapts whichever
/// [`MiddlewareOutcome`] comes back into an HTTP response.
async fn handle_invoke(State(state): State<AppState>, req: Request<Body>) -> Response {
    let (parts, body) = req.into_parts();

    let headers = header_map_to_strings(&parts.headers);
    let remote_addr = headers
        .get("x-forwarded-for")
        .cloned()
        .unwrap_or_else(|| "0.0.0.0".to_string());

    let code_override = headers.get("x-service-code").cloned();
    let hook_access_key = headers.get("x-hook-access-key").cloned();

    let path = parts.uri.path().to_string();
    let url = parts
        .uri
        .path_and_query()
        .map(|pq| pq.to_string())
        .unwrap_or_else(|| path.clone());
    let host = headers
        .get("host")
        .cloned()
        .unwrap_or_else(|| "localhost".to_string());

    // §4.4: `isStreaming` is true only for an as-yet-unfinished stream
    // with buffered or pending bytes — a GET with no body must report
    // `false`, not the streaming variant unconditionally.
    let has_body = match headers.get("content-length").and_then(|v| v.parse::<u64>().ok()) {
        Some(0) => false,
        Some(_) => true,
        None => headers
            .get("transfer-encoding")
            .is_some_and(|v| v.to_lowercase().contains("chunked")),
    };
    let body_state = if has_body {
        RequestBody::Streaming {
            finished: false,
            has_pending_bytes: true,
        }
    } else {
        RequestBody::None
    };

    let request_meta = RequestMeta {
        method: parts.method.to_string(),
        headers,
        host,
        path,
        url,
        params: std::collections::HashMap::new(),
        remote_addr,
        resource_instance: None,
        resource_params: None,
        body: body_state,
    };

    let body_stream = body
        .into_data_stream()
        .map(|chunk| chunk.map_err(|e| std::io::Error::other(e.to_string())));

    let outcome = state
        .middleware
        .handle(
            code_override,
            request_meta,
            Some(Box::pin(body_stream)),
            hook_access_key,
        )
        .await;

    match outcome {
        Ok(MiddlewareOutcome::Spawned { body: rx, join }) => {
            tokio::spawn(async move {
                match join.await {
                    Ok(invocation_outcome) => default_next(&Ok(invocation_outcome)),
                    Err(e) => warn!("invocation task panicked: {e}"),
                }
            });

            let stream = UnboundedReceiverStream::new(rx);
            Response::builder()
                .status(StatusCode::OK)
                .body(Body::from_stream(stream))
                .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())
        }
        Ok(MiddlewareOutcome::Diagnostic { body }) => diagnostic_response(body),
        Err(e) => {
            warn!("configuration error handling request: {e}");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}

fn diagnostic_response(body: Bytes) -> Response {
    Response::builder()
        .status(StatusCode::INTERNAL_SERVER_ERROR)
        .body(Body::from(body))
        .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())
}

fn header_map_to_strings(headers: &HeaderMap) -> std::collections::HashMap<String, String> {
    headers
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|v| (name.as_str().to_lowercase(), v.to_string()))
        })
        .collect()
}
