use axum::{Json, extract::State, http::HeaderMap, http::StatusCode};
use tracing::{info, warn};

use super::super::AppState;
use crate::core::training::{Outcome, ProviderUpdate, ReconcileError, apply_provider_update};

/// Provider push channel. At-least-once delivery is assumed: the shared
/// transition guard makes redelivery a no-op, so this handler returns 200
/// whether or not anything changed.
///
/// Policy: a missing or invalid signature is logged but never rejected.
/// This is the only notification channel for many jobs, so availability is
/// traded for strict authenticity here; hard rejection would be a
/// documented policy change, not a fix.
pub async fn training_webhook_endpoint(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: String,
) -> (StatusCode, Json<serde_json::Value>) {
    if let Some(secret) = &state.webhook_secret
        && !verify_webhook_signature(&headers, &body, secret)
    {
        warn!("Training webhook signature missing or invalid; processing anyway");
    }

    let update: ProviderUpdate = match serde_json::from_str(&body) {
        Ok(update) => update,
        Err(e) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(serde_json::json!({
                    "success": false,
                    "error": format!("Malformed webhook body: {}", e)
                })),
            );
        }
    };

    let now = chrono::Utc::now().timestamp();
    match apply_provider_update(&state.store, &update, now).await {
        Ok(outcome) => {
            info!(
                "Webhook for job {} reported '{}' -> {:?}",
                update.id, update.status, outcome
            );
            (
                StatusCode::OK,
                Json(serde_json::json!({
                    "success": true,
                    "applied": matches!(outcome, Outcome::Transitioned(_))
                })),
            )
        }
        Err(ReconcileError::InvalidPayload(msg)) => (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({ "success": false, "error": msg })),
        ),
        // 404 tells the provider to drop this delivery, no retry storm.
        Err(ReconcileError::NotFound(id)) => (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({
                "success": false,
                "error": format!("Unknown training job '{}'", id)
            })),
        ),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({ "success": false, "error": e.to_string() })),
        ),
    }
}

/// Verify an HMAC-SHA256 webhook signature against common header patterns:
/// GitHub-style (X-Hub-Signature-256: sha256=<hex>) and generic
/// (X-Signature: <hex>).
fn verify_webhook_signature(headers: &HeaderMap, body: &str, secret: &str) -> bool {
    use hmac::{Hmac, Mac};
    use sha2::Sha256;

    type HmacSha256 = Hmac<Sha256>;

    let expected = |payload: &str| -> Option<String> {
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).ok()?;
        mac.update(payload.as_bytes());
        Some(hex::encode(mac.finalize().into_bytes()))
    };

    if let Some(sig) = headers
        .get("x-hub-signature-256")
        .and_then(|v| v.to_str().ok())
        && let Some(hex_sig) = sig.strip_prefix("sha256=")
        && let Some(expected) = expected(body)
    {
        return constant_time_eq(hex_sig.as_bytes(), expected.as_bytes());
    }

    if let Some(sig) = headers.get("x-signature").and_then(|v| v.to_str().ok())
        && let Some(expected) = expected(body)
    {
        return constant_time_eq(sig.as_bytes(), expected.as_bytes());
    }

    // No recognized signature header found.
    false
}

/// Constant-time comparison to prevent timing attacks.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter()
        .zip(b.iter())
        .fold(0u8, |acc, (x, y)| acc | (x ^ y))
        == 0
}
