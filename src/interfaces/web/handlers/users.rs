use axum::{
    Json,
    extract::{Path, State},
};
use chrono::Local;
use tracing::info;

use super::super::AppState;
use crate::core::quota::{self, Tier};
use crate::core::training::JobStatus;

#[derive(serde::Deserialize)]
pub struct UpsertUserRequest {
    id: String,
    tier: String,
}

/// Mirror a user's tier from the billing collaborator.
pub async fn upsert_user_endpoint(
    State(state): State<AppState>,
    Json(payload): Json<UpsertUserRequest>,
) -> Json<serde_json::Value> {
    let id = payload.id.trim().to_string();
    if id.is_empty() {
        return Json(serde_json::json!({ "success": false, "error": "id is required" }));
    }
    let Some(tier) = Tier::from_name(&payload.tier) else {
        return Json(serde_json::json!({
            "success": false,
            "error": "tier must be 'free' or 'premium'"
        }));
    };

    let now = chrono::Utc::now().timestamp();
    match state.store.upsert_user(&id, tier, now).await {
        Ok(()) => Json(serde_json::json!({ "success": true, "tier": tier })),
        Err(e) => Json(serde_json::json!({ "success": false, "error": e.to_string() })),
    }
}

/// Remaining model and daily-generation quota for dashboards. Counts are
/// recomputed on every call; the generation window starts at local midnight
/// of this instant.
pub async fn get_quota_endpoint(
    Path(user_id): Path<String>,
    State(state): State<AppState>,
) -> Json<serde_json::Value> {
    match quota_for(&state, &user_id).await {
        Ok((tier, view)) => Json(serde_json::json!({
            "success": true,
            "tier": tier,
            "quota": view
        })),
        Err(e) => Json(serde_json::json!({ "success": false, "error": e.to_string() })),
    }
}

#[derive(serde::Deserialize)]
pub struct CreateGenerationRequest {
    job_id: String,
    #[serde(default)]
    prompt: String,
}

/// Record one image generation against the user's daily quota. The
/// generation itself runs at the provider; this only gates and counts it.
pub async fn create_generation_endpoint(
    Path(user_id): Path<String>,
    State(state): State<AppState>,
    Json(payload): Json<CreateGenerationRequest>,
) -> Json<serde_json::Value> {
    let job = match state.store.get_job(&payload.job_id).await {
        Ok(Some(job)) => job,
        Ok(None) => {
            return Json(serde_json::json!({
                "success": false,
                "error": "Training job not found"
            }));
        }
        Err(e) => {
            return Json(serde_json::json!({ "success": false, "error": e.to_string() }));
        }
    };
    if job.status != JobStatus::Succeeded {
        return Json(serde_json::json!({
            "success": false,
            "error": format!("Model is not ready (status: {})", job.status.as_str())
        }));
    }

    let (tier, view) = match quota_for(&state, &user_id).await {
        Ok(res) => res,
        Err(e) => {
            return Json(serde_json::json!({ "success": false, "error": e.to_string() }));
        }
    };
    if view.generations_remaining == 0 {
        return Json(serde_json::json!({
            "success": false,
            "error": format!(
                "Daily generation quota exhausted ({} of {})",
                view.generations_used, view.generations_limit
            )
        }));
    }

    let now = chrono::Utc::now().timestamp();
    match state
        .store
        .record_generation(&user_id, &payload.job_id, payload.prompt.trim(), now)
        .await
    {
        Ok(generation) => {
            info!("Generation {} recorded for user {} ({:?})", generation.id, user_id, tier);
            Json(serde_json::json!({
                "success": true,
                "generation": generation,
                "generations_remaining": view.generations_remaining - 1
            }))
        }
        Err(e) => Json(serde_json::json!({ "success": false, "error": e.to_string() })),
    }
}

async fn quota_for(state: &AppState, user_id: &str) -> anyhow::Result<(Tier, quota::QuotaView)> {
    let tier = state
        .store
        .get_user(user_id)
        .await?
        .map(|u| u.tier)
        .unwrap_or(Tier::Free);
    let models_owned = state.store.count_jobs_for_user(user_id).await?;
    let midnight = quota::local_midnight_epoch(Local::now());
    let generations_today = state
        .store
        .count_generations_since(user_id, midnight)
        .await?;
    Ok((tier, quota::evaluate(tier, models_owned, generations_today)))
}
