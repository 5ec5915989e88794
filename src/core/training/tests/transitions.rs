use serde_json::json;

use crate::core::store::{Store, test_store};
use crate::core::training::provider::StaticProvider;
use crate::core::training::{
    JobStatus, Outcome, ProviderUpdate, ReconcileError, apply_provider_update,
    reconcile_with_provider,
};

fn update_from(value: serde_json::Value) -> ProviderUpdate {
    serde_json::from_value(value).unwrap()
}

async fn seeded_store() -> Store {
    let store = test_store();
    store.create_job("T1", "u1", "", 1000).await.unwrap();
    store
}

#[tokio::test]
async fn success_payload_writes_all_metadata() {
    let store = seeded_store().await;
    let update = update_from(json!({
        "id": "T1",
        "status": "succeeded",
        "output": { "version": "v9", "trigger_word": "zeta" }
    }));

    let outcome = apply_provider_update(&store, &update, 2000).await.unwrap();
    assert_eq!(outcome, Outcome::Transitioned(JobStatus::Succeeded));

    let job = store.get_job("T1").await.unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Succeeded);
    assert_eq!(job.version_id.as_deref(), Some("v9"));
    assert_eq!(job.trigger_word, "zeta");
    assert_eq!(job.trained_at, Some(2000));
    assert!(job.output_json.unwrap().contains("v9"));
}

#[tokio::test]
async fn replaying_the_same_webhook_is_idempotent() {
    let store = seeded_store().await;
    let update = update_from(json!({
        "id": "T1",
        "status": "succeeded",
        "output": { "version": "v9", "trigger_word": "zeta" }
    }));

    apply_provider_update(&store, &update, 2000).await.unwrap();
    let first = store.get_job("T1").await.unwrap().unwrap();

    let outcome = apply_provider_update(&store, &update, 3000).await.unwrap();
    assert_eq!(outcome, Outcome::AlreadyTerminal);
    let second = store.get_job("T1").await.unwrap().unwrap();
    assert_eq!(first, second);
}

#[tokio::test]
async fn terminal_state_never_regresses() {
    let store = seeded_store().await;
    apply_provider_update(
        &store,
        &update_from(json!({
            "id": "T1",
            "status": "succeeded",
            "output": { "version": "v9" }
        })),
        2000,
    )
    .await
    .unwrap();

    // A late failure report (e.g. from a confused poll) is a no-op.
    let outcome = apply_provider_update(
        &store,
        &update_from(json!({ "id": "T1", "status": "failed", "error": "oom" })),
        3000,
    )
    .await
    .unwrap();
    assert_eq!(outcome, Outcome::AlreadyTerminal);

    let job = store.get_job("T1").await.unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Succeeded);
    assert_eq!(job.version_id.as_deref(), Some("v9"));
    assert!(job.error_message.is_none());
    assert_eq!(job.trained_at, Some(2000));
}

#[tokio::test]
async fn failure_payload_records_error_detail() {
    let store = seeded_store().await;
    let outcome = apply_provider_update(
        &store,
        &update_from(json!({ "id": "T1", "status": "failed", "error": "oom" })),
        2000,
    )
    .await
    .unwrap();
    assert_eq!(outcome, Outcome::Transitioned(JobStatus::Failed));

    let job = store.get_job("T1").await.unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Failed);
    assert_eq!(job.error_message.as_deref(), Some("oom"));
    assert!(job.trained_at.is_none());
    assert!(job.version_id.is_none());
}

#[tokio::test]
async fn failure_without_detail_gets_a_default_message() {
    let store = seeded_store().await;
    apply_provider_update(&store, &update_from(json!({ "id": "T1", "status": "failed" })), 2000)
        .await
        .unwrap();
    let job = store.get_job("T1").await.unwrap().unwrap();
    assert_eq!(job.error_message.as_deref(), Some("training failed"));
}

#[tokio::test]
async fn in_progress_report_refreshes_updated_at() {
    let store = seeded_store().await;
    let outcome = apply_provider_update(
        &store,
        &update_from(json!({ "id": "T1", "status": "starting" })),
        2000,
    )
    .await
    .unwrap();
    assert_eq!(outcome, Outcome::StillProcessing);

    let job = store.get_job("T1").await.unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Processing);
    assert_eq!(job.updated_at, 2000);
}

#[tokio::test]
async fn version_id_falls_back_to_payload_id() {
    let store = seeded_store().await;
    apply_provider_update(
        &store,
        &update_from(json!({
            "id": "T1",
            "status": "succeeded",
            "output": { "weights_url": "https://example.com/w.tar" }
        })),
        2000,
    )
    .await
    .unwrap();
    let job = store.get_job("T1").await.unwrap().unwrap();
    assert_eq!(job.version_id.as_deref(), Some("T1"));
}

#[tokio::test]
async fn trigger_word_backfills_onto_terminal_job() {
    let store = test_store();
    store.create_job("T1", "u1", "", 1000).await.unwrap();
    apply_provider_update(&store, &update_from(json!({ "id": "T1", "status": "failed" })), 2000)
        .await
        .unwrap();

    // Late success payload carrying a trigger word: only that field lands.
    let outcome = apply_provider_update(
        &store,
        &update_from(json!({
            "id": "T1",
            "status": "succeeded",
            "output": { "version": "v9", "trigger_word": "zeta" }
        })),
        3000,
    )
    .await
    .unwrap();
    assert_eq!(outcome, Outcome::AlreadyTerminal);

    let job = store.get_job("T1").await.unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Failed);
    assert_eq!(job.trigger_word, "zeta");
    assert!(job.version_id.is_none());
    assert!(job.trained_at.is_none());
}

#[tokio::test]
async fn missing_id_is_an_invalid_payload() {
    let store = seeded_store().await;
    let err = apply_provider_update(&store, &update_from(json!({ "status": "succeeded" })), 2000)
        .await
        .unwrap_err();
    assert!(matches!(err, ReconcileError::InvalidPayload(_)));
}

#[tokio::test]
async fn unknown_job_is_not_found() {
    let store = test_store();
    let err = apply_provider_update(
        &store,
        &update_from(json!({ "id": "ghost", "status": "succeeded" })),
        2000,
    )
    .await
    .unwrap_err();
    assert!(matches!(err, ReconcileError::NotFound(_)));
}

// --- Polling path ---

#[tokio::test]
async fn webhook_and_poll_paths_produce_identical_records() {
    let payload = json!({
        "id": "T1",
        "status": "succeeded",
        "output": { "version": "v9", "trigger_word": "zeta" }
    });

    let webhook_store = seeded_store().await;
    apply_provider_update(&webhook_store, &update_from(payload.clone()), 2000)
        .await
        .unwrap();

    let poll_store = seeded_store().await;
    let provider = StaticProvider {
        update: Some(update_from(payload)),
    };
    reconcile_with_provider(&poll_store, &provider, "T1", 2000)
        .await
        .unwrap();

    let via_webhook = webhook_store.get_job("T1").await.unwrap().unwrap();
    let via_poll = poll_store.get_job("T1").await.unwrap().unwrap();
    assert_eq!(via_webhook, via_poll);
}

#[tokio::test]
async fn provider_outage_leaves_record_unchanged() {
    let store = seeded_store().await;
    let provider = StaticProvider { update: None };

    let err = reconcile_with_provider(&store, &provider, "T1", 2000)
        .await
        .unwrap_err();
    assert!(matches!(err, ReconcileError::ProviderUnavailable(_)));

    let job = store.get_job("T1").await.unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Processing);
    assert_eq!(job.updated_at, 1000);
}

#[tokio::test]
async fn poll_for_unknown_job_skips_the_network_call() {
    let store = test_store();
    let provider = StaticProvider { update: None }; // would error if reached
    let err = reconcile_with_provider(&store, &provider, "ghost", 2000)
        .await
        .unwrap_err();
    assert!(matches!(err, ReconcileError::NotFound(_)));
}
