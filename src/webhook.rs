use std::sync::Arc;

use axum::{
    Router,
    body::Bytes,
    extract::{DefaultBodyLimit, State, rejection::BytesRejection},
    http::{HeaderMap, StatusCode},
    response::Json,
    routing::{get, post},
};
use hmac::{Hmac, Mac};
use serde::de::DeserializeOwned;
use sha1::Sha1;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info, warn};

use crate::payload::{BuildPayload, SubmissionPayload, UpdatePayload};
use crate::relay::Relay;

type HmacSha1 = Hmac<Sha1>;

/// Header Expo signs build and submission webhooks with.
pub const EXPO_SIGNATURE_HEADER: &str = "expo-signature";
/// Header Expo signs update webhooks with.
pub const SIGNATURE_HEADER: &str = "signature";

/// Larger bodies are refused with 413 before signature checks.
pub const MAX_BODY_BYTES: usize = 2 * 1024 * 1024;

#[derive(Clone)]
pub struct AppState {
    pub webhook_secret: String,
    pub relay: Relay,
}

/// `sha1=` followed by the lowercase hex HMAC-SHA1 of `payload`, or `None`
/// when the key is unusable.
pub fn sign(secret: &str, payload: &[u8]) -> Option<String> {
    let mut mac = match HmacSha1::new_from_slice(secret.as_bytes()) {
        Ok(mac) => mac,
        Err(_) => return None,
    };

    mac.update(payload);

    Some(format!("sha1={}", hex::encode(mac.finalize().into_bytes())))
}

pub fn verify_signature(secret: &str, payload: &[u8], signature: &str) -> bool {
    let Some(signature) = signature.strip_prefix("sha1=") else {
        return false;
    };

    let mut mac = match HmacSha1::new_from_slice(secret.as_bytes()) {
        Ok(mac) => mac,
        Err(_) => return false,
    };

    mac.update(payload);

    match hex::decode(signature) {
        Ok(expected) => mac.verify_slice(&expected).is_ok(),
        Err(_) => false,
    }
}

/// Reads, authenticates and decodes a webhook body. Everything that can
/// reject the request happens here, before the caller acknowledges it.
fn accept<T: DeserializeOwned>(
    state: &AppState,
    headers: &HeaderMap,
    signature_header: &str,
    body: Result<Bytes, BytesRejection>,
) -> Result<T, StatusCode> {
    let body = body.map_err(|rejection| match rejection.status() {
        StatusCode::PAYLOAD_TOO_LARGE => {
            warn!(limit = MAX_BODY_BYTES, "Request body too large");
            StatusCode::PAYLOAD_TOO_LARGE
        }
        _ => {
            error!("Failed to read request body: {}", rejection.body_text());
            StatusCode::INTERNAL_SERVER_ERROR
        }
    })?;

    let signature = headers
        .get(signature_header)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    if !verify_signature(&state.webhook_secret, &body, signature) {
        warn!(header = signature_header, received = signature, "Invalid webhook signature");
        return Err(StatusCode::UNAUTHORIZED);
    }

    debug!(payload = %String::from_utf8_lossy(&body), "Received payload");

    serde_json::from_slice(&body).map_err(|e| {
        error!("Failed to parse webhook payload: {}", e);
        StatusCode::BAD_REQUEST
    })
}

async fn handle_build(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> StatusCode {
    let payload: BuildPayload = match accept(&state, &headers, EXPO_SIGNATURE_HEADER, body) {
        Ok(payload) => payload,
        Err(status) => return status,
    };
    info!(
        build = %payload.id,
        app = %payload.metadata.app_name,
        version = %payload.metadata.version.app_version,
        build_version = %payload.metadata.version.app_build_version,
        "Received build webhook"
    );

    let relay = state.relay.clone();
    tokio::spawn(async move { relay.relay_build(payload).await });
    StatusCode::OK
}

async fn handle_submission(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> StatusCode {
    let payload: SubmissionPayload = match accept(&state, &headers, EXPO_SIGNATURE_HEADER, body) {
        Ok(payload) => payload,
        Err(status) => return status,
    };
    info!(submission = %payload.id, platform = %payload.platform, "Received submission webhook");

    let relay = state.relay.clone();
    tokio::spawn(async move { relay.relay_submission(payload).await });
    StatusCode::OK
}

async fn handle_update(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> StatusCode {
    let payload: Vec<UpdatePayload> = match accept(&state, &headers, SIGNATURE_HEADER, body) {
        Ok(payload) => payload,
        Err(status) => return status,
    };
    let ids = payload
        .iter()
        .map(|u| u.id.as_str())
        .collect::<Vec<_>>()
        .join(",");
    let group = payload.last().map(|u| u.group.as_str()).unwrap_or_default();
    info!(group, updates = %ids, "Received update webhook");

    let relay = state.relay.clone();
    tokio::spawn(async move { relay.relay_updates(payload).await });
    StatusCode::OK
}

async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "expo-relay",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/build", post(handle_build))
        .route("/submit", post(handle_submission))
        .route("/update", post(handle_update))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signature_matches_known_digest() {
        // HMAC-SHA1(key = "s", message = "{}")
        let expected = "sha1=850413ce2dee4c4142838bab9e9086cb305da54d";
        assert_eq!(sign("s", b"{}").as_deref(), Some(expected));
        assert!(verify_signature("s", b"{}", expected));
    }

    #[test]
    fn any_mutation_flips_the_result() {
        let signature = sign("s", b"{}").unwrap();
        assert!(!verify_signature("s", b"{ }", &signature));
        assert!(!verify_signature("s", b"[]", &signature));
        assert!(!verify_signature("t", b"{}", &signature));
        assert!(!verify_signature("ss", b"{}", &signature));
    }

    #[test]
    fn malformed_signatures_are_rejected() {
        let signature = sign("s", b"{}").unwrap();
        assert!(!verify_signature("s", b"{}", ""));
        assert!(!verify_signature("s", b"{}", &signature[5..]));
        assert!(!verify_signature("s", b"{}", &signature.replace("sha1=", "sha256=")));
        assert!(!verify_signature("s", b"{}", "sha1=not-hex"));
    }

    #[test]
    fn empty_and_long_keys_still_sign() {
        let long_key = "k".repeat(200);
        for secret in ["", long_key.as_str()] {
            let signature = sign(secret, b"{}").unwrap();
            assert!(verify_signature(secret, b"{}", &signature));
        }
    }

    #[test]
    fn uppercase_hex_is_still_the_same_digest() {
        let signature = sign("s", b"{}")
            .unwrap()
            .to_uppercase()
            .replacen("SHA1=", "sha1=", 1);
        assert!(verify_signature("s", b"{}", &signature));
    }
}
