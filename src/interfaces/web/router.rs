use axum::{
    Router,
    body::Body,
    http::{HeaderValue, Method, Request, header},
    middleware,
    middleware::Next,
    routing::{get, post},
};
use tower_http::cors::CorsLayer;

use super::AppState;
use super::handlers::{trainings, users, webhooks};

fn build_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(tower_http::cors::Any)
}

pub fn build_api_router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health_endpoint))
        // Provider push channel. Authenticity is advisory (HMAC checked when
        // configured, warn-only) so the only notification channel for many
        // jobs stays available.
        .route(
            "/api/webhooks/training",
            post(webhooks::training_webhook_endpoint),
        )
        .route(
            "/api/trainings",
            post(trainings::create_training_endpoint),
        )
        .route(
            "/api/trainings/{job_id}",
            get(trainings::get_training_endpoint),
        )
        .route("/api/users", post(users::upsert_user_endpoint))
        .route("/api/users/{user_id}/quota", get(users::get_quota_endpoint))
        .route(
            "/api/users/{user_id}/generations",
            post(users::create_generation_endpoint),
        )
        .layer(middleware::from_fn(security_headers))
        .layer(build_cors())
        .with_state(state)
}

async fn health_endpoint() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({ "success": true, "service": "faceforge" }))
}

async fn security_headers(req: Request<Body>, next: Next) -> axum::response::Response {
    let mut response = next.run(req).await;
    let headers = response.headers_mut();
    headers.insert(
        header::X_CONTENT_TYPE_OPTIONS,
        HeaderValue::from_static("nosniff"),
    );
    headers.insert(header::X_FRAME_OPTIONS, HeaderValue::from_static("DENY"));
    response
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::core::store::{Store, test_store};
    use crate::core::training::ProviderUpdate;
    use crate::core::training::provider::StaticProvider;
    use axum::http::StatusCode;
    use std::sync::Arc;
    use tower::util::ServiceExt;

    pub(crate) fn test_state(provider_update: Option<ProviderUpdate>) -> AppState {
        AppState {
            store: Arc::new(test_store()),
            provider: Arc::new(StaticProvider {
                update: provider_update,
            }),
            webhook_secret: None,
            staleness_secs: 3600,
        }
    }

    pub(crate) fn test_state_with_store(
        store: Arc<Store>,
        provider_update: Option<ProviderUpdate>,
        webhook_secret: Option<String>,
    ) -> AppState {
        AppState {
            store,
            provider: Arc::new(StaticProvider {
                update: provider_update,
            }),
            webhook_secret,
            staleness_secs: 3600,
        }
    }

    pub(crate) async fn json_request(
        app: Router,
        method: Method,
        path: &str,
        body: Option<serde_json::Value>,
    ) -> (StatusCode, serde_json::Value) {
        let body = match body {
            Some(json) => Body::from(serde_json::to_string(&json).unwrap()),
            None => Body::empty(),
        };

        let req = Request::builder()
            .method(method)
            .uri(path)
            .header("content-type", "application/json")
            .body(body)
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        let status = resp.status();
        let body_bytes = axum::body::to_bytes(resp.into_body(), 1024 * 1024)
            .await
            .unwrap();
        let json: serde_json::Value =
            serde_json::from_slice(&body_bytes).unwrap_or(serde_json::json!({}));
        (status, json)
    }

    #[tokio::test]
    async fn health_endpoint_responds() {
        let app = build_api_router(test_state(None));
        let (status, json) = json_request(app, Method::GET, "/api/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["success"], true);
    }

    #[tokio::test]
    async fn security_headers_present_on_responses() {
        let app = build_api_router(test_state(None));
        let req = Request::builder()
            .method(Method::GET)
            .uri("/api/health")
            .body(Body::empty())
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(
            resp.headers().get("x-content-type-options").unwrap(),
            "nosniff"
        );
        assert_eq!(resp.headers().get("x-frame-options").unwrap(), "DENY");
    }
}
