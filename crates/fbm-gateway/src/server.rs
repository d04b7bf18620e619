//! Webhook HTTP server
//!
//! Serves the Messenger webhook (subscription challenge and event
//! deliveries) plus a health probe.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    routing::get,
    Json, Router,
};
use fbm_webhook::verify::{verify_challenge, verify_signature, SIGNATURE_HEADER};
use fbm_webhook::{WebhookError, WebhookRouter};
use serde::Deserialize;
use serde_json::{json, Value};
use tower_http::trace::TraceLayer;
use tracing::{debug, info};

use crate::error::Result;

/// Body answered for every accepted delivery
pub const EVENT_RECEIVED: &str = "EVENT_RECEIVED";

/// Shared webhook server state
#[derive(Clone)]
pub struct WebhookState {
    pub router: Arc<WebhookRouter>,
    pub verify_token: String,
    /// Signature checks are skipped when unset
    pub app_secret: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct VerifyParams {
    #[serde(rename = "hub.mode", default)]
    pub mode: String,
    #[serde(rename = "hub.verify_token", default)]
    pub verify_token: String,
    #[serde(rename = "hub.challenge", default)]
    pub challenge: String,
}

/// Build the axum router serving `webhook_path` and `/health`
pub fn create_router(state: WebhookState, webhook_path: &str) -> Router {
    Router::new()
        .route(webhook_path, get(verify_webhook).post(receive_webhook))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(Arc::new(state))
}

/// Bind and serve until the task is aborted
pub async fn start_server(port: u16, webhook_path: &str, state: WebhookState) -> anyhow::Result<()> {
    let app = create_router(state, webhook_path);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!("Webhook server listening on {}{}", addr, webhook_path);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// Answer the subscription handshake
async fn verify_webhook(
    State(state): State<Arc<WebhookState>>,
    Query(params): Query<VerifyParams>,
) -> Result<String> {
    let challenge = verify_challenge(
        &params.mode,
        &params.verify_token,
        &params.challenge,
        &state.verify_token,
    )?;
    Ok(challenge)
}

/// Check the signature, then dispatch the delivery
async fn receive_webhook(
    State(state): State<Arc<WebhookState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, &'static str)> {
    if let Some(secret) = &state.app_secret {
        let signature = headers
            .get(SIGNATURE_HEADER)
            .and_then(|v| v.to_str().ok())
            .ok_or(WebhookError::InvalidSignature)?;
        verify_signature(secret, &body, signature)?;
    }

    let body = std::str::from_utf8(&body)
        .map_err(|e| WebhookError::InvalidPayload(e.to_string()))?;
    debug!("Received webhook delivery ({} bytes)", body.len());

    state.router.route_json(body).await?;

    Ok((StatusCode::OK, EVENT_RECEIVED))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use fbm_webhook::verify::sign;
    use http::Request;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tower::ServiceExt;

    const SECRET: &str = "app_secret";

    const DELIVERY: &str = r#"{
        "object": "page",
        "entry": [{
            "id": "page456",
            "time": 1,
            "messaging": [{
                "sender": {"id": "user123"},
                "recipient": {"id": "page456"},
                "timestamp": 1,
                "message": {"mid": "m1", "text": "Hello World"}
            }]
        }]
    }"#;

    fn app(app_secret: Option<&str>) -> (Router, Arc<AtomicUsize>) {
        let router = Arc::new(WebhookRouter::new());
        let count = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&count);
        router.messages().on_text(move |_| {
            let c = Arc::clone(&c);
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        });

        let state = WebhookState {
            router,
            verify_token: "verify".to_string(),
            app_secret: app_secret.map(str::to_string),
        };
        (create_router(state, "/webhook"), count)
    }

    fn post(body: &str, signature: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri("/webhook")
            .header("content-type", "application/json");
        if let Some(signature) = signature {
            builder = builder.header(SIGNATURE_HEADER, signature);
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    async fn body_string(response: axum::response::Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let (app, _) = app(None);
        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_string(response).await, r#"{"status":"ok"}"#);
    }

    #[tokio::test]
    async fn test_verify_challenge() {
        let (app, _) = app(None);
        let uri = "/webhook?hub.mode=subscribe&hub.verify_token=verify&hub.challenge=12345";
        let response = app
            .clone()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_string(response).await, "12345");

        let uri = "/webhook?hub.mode=subscribe&hub.verify_token=wrong&hub.challenge=12345";
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_delivery_is_dispatched() {
        let (app, count) = app(None);
        let response = tokio_test::assert_ok!(app.oneshot(post(DELIVERY, None)).await);
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_string(response).await, EVENT_RECEIVED);
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_signed_delivery() {
        let (app, count) = app(Some(SECRET));
        let signature = sign(SECRET, DELIVERY.as_bytes()).unwrap();
        let response = app.oneshot(post(DELIVERY, Some(&signature))).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_bad_or_missing_signature_is_rejected() {
        let (app, count) = app(Some(SECRET));
        let signature = sign("other", DELIVERY.as_bytes()).unwrap();
        let response = app.clone().oneshot(post(DELIVERY, Some(&signature))).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = app.oneshot(post(DELIVERY, None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_malformed_body() {
        let (app, _) = app(None);
        let response = app.oneshot(post("{not json", None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_non_page_object() {
        let (app, count) = app(None);
        let body = DELIVERY.replace(r#""object": "page""#, r#""object": "user""#);
        let response = app.oneshot(post(&body, None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }
}
