//! Webhook receiver
//!
//! Long-lived HTTP service that accepts enrichment callbacks from the vendor
//! and writes them into the profile store. It shares nothing with research
//! runs except the store directory.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use std::future::Future;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use crate::store::ProfileStore;

/// Vendor callback endpoint path
pub const CALLBACK_PATH: &str = "/webhook/clay-callback";
/// Health endpoint path
pub const HEALTH_PATH: &str = "/health";

/// Build the receiver routes over `store`
pub fn router(store: ProfileStore) -> Router {
    Router::new()
        .route(CALLBACK_PATH, post(clay_callback))
        .route(HEALTH_PATH, get(health))
        .with_state(store)
}

/// Serve on `listener` until `shutdown` resolves
pub async fn serve<F>(listener: TcpListener, store: ProfileStore, shutdown: F) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    info!(
        addr = %listener.local_addr()?,
        profiles_dir = %store.dir().display(),
        "Webhook receiver listening"
    );
    axum::serve(listener, router(store))
        .with_graceful_shutdown(shutdown)
        .await
}

async fn health() -> Json<Value> {
    Json(json!({"status": "ok", "message": "Webhook receiver is running"}))
}

fn client_error(message: String) -> Response {
    warn!(error = %message, "Rejected webhook payload");
    (StatusCode::BAD_REQUEST, Json(json!({"error": message}))).into_response()
}

async fn clay_callback(State(store): State<ProfileStore>, body: Bytes) -> Response {
    if body.iter().all(u8::is_ascii_whitespace) {
        return client_error("No data received".to_string());
    }

    let payload: Value = match serde_json::from_slice(&body) {
        Ok(payload) => payload,
        Err(e) => return client_error(format!("Invalid JSON payload: {}", e)),
    };
    if !payload.is_object() {
        return client_error("Payload must be a JSON object".to_string());
    }

    match store.save(&payload).await {
        Ok(file) => {
            info!(file = %file, "Received and saved profile data via webhook");
            Json(json!({
                "status": "success",
                "message": "Profile data received and saved",
                "file": file,
            }))
            .into_response()
        }
        Err(e) => {
            error!(error = %e, "Failed to save profile data");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"error": e.to_string()})),
            )
                .into_response()
        }
    }
}
