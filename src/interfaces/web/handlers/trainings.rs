use axum::{
    Json,
    extract::{Path, State},
};
use tracing::{info, warn};

use super::super::AppState;
use crate::core::quota::{self, Tier};
use crate::core::training::{ReconcileError, is_stale, reconcile_with_provider};

#[derive(serde::Deserialize)]
pub struct CreateTrainingRequest {
    /// The provider's job identifier, assigned at submission.
    id: String,
    user_id: String,
    #[serde(default)]
    trigger_word: String,
}

/// Register a training job that was just submitted to the provider.
/// Enforces the tier's model quota before the insert.
pub async fn create_training_endpoint(
    State(state): State<AppState>,
    Json(payload): Json<CreateTrainingRequest>,
) -> Json<serde_json::Value> {
    let id = payload.id.trim().to_string();
    let user_id = payload.user_id.trim().to_string();
    if id.is_empty() || user_id.is_empty() {
        return Json(serde_json::json!({
            "success": false,
            "error": "id and user_id are required"
        }));
    }

    let tier = match state.store.get_user(&user_id).await {
        Ok(Some(user)) => user.tier,
        Ok(None) => Tier::Free,
        Err(e) => {
            return Json(serde_json::json!({
                "success": false,
                "error": format!("Store error: {}", e)
            }));
        }
    };
    let models_owned = match state.store.count_jobs_for_user(&user_id).await {
        Ok(count) => count,
        Err(e) => {
            return Json(serde_json::json!({
                "success": false,
                "error": format!("Store error: {}", e)
            }));
        }
    };
    if quota::evaluate(tier, models_owned, 0).models_remaining == 0 {
        return Json(serde_json::json!({
            "success": false,
            "error": format!("Model quota exhausted ({} of {})", models_owned, tier.model_limit())
        }));
    }

    let now = chrono::Utc::now().timestamp();
    match state
        .store
        .create_job(&id, &user_id, payload.trigger_word.trim(), now)
        .await
    {
        Ok(job) => {
            info!("Registered training job {} for user {}", job.id, user_id);
            Json(serde_json::json!({ "success": true, "job": job }))
        }
        Err(e) => Json(serde_json::json!({ "success": false, "error": e.to_string() })),
    }
}

/// Read path. When the record looks stuck (still processing past the
/// staleness threshold) this pulls the provider's current view first; a
/// transient provider failure just serves the last known state.
pub async fn get_training_endpoint(
    Path(job_id): Path<String>,
    State(state): State<AppState>,
) -> Json<serde_json::Value> {
    let now = chrono::Utc::now().timestamp();

    let job = match state.store.get_job(&job_id).await {
        Ok(Some(job)) => job,
        Ok(None) => {
            return Json(serde_json::json!({
                "success": false,
                "error": "Training job not found"
            }));
        }
        Err(e) => {
            return Json(serde_json::json!({
                "success": false,
                "error": format!("Store error: {}", e)
            }));
        }
    };

    if is_stale(&job, now, state.staleness_secs) {
        match reconcile_with_provider(&state.store, state.provider.as_ref(), &job_id, now).await {
            Ok(outcome) => info!("Stale job {} reconciled: {:?}", job_id, outcome),
            Err(ReconcileError::ProviderUnavailable(e)) => {
                warn!("Poll for stale job {} failed, serving last known state: {}", job_id, e);
            }
            Err(e) => {
                return Json(serde_json::json!({
                    "success": false,
                    "error": e.to_string()
                }));
            }
        }
    }

    // Re-read so the response reflects whatever the reconciler decided.
    match state.store.get_job(&job_id).await {
        Ok(Some(job)) => Json(serde_json::json!({ "success": true, "job": job })),
        Ok(None) => Json(serde_json::json!({
            "success": false,
            "error": "Training job not found"
        })),
        Err(e) => Json(serde_json::json!({
            "success": false,
            "error": format!("Store error: {}", e)
        })),
    }
}
