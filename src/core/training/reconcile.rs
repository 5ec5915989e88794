use thiserror::Error;
use tracing::{debug, info};

use super::provider::{ProviderError, TrainingProvider};
use super::{JobStatus, ProviderUpdate};
use crate::core::store::Store;
use crate::core::store::types::TrainingJobRecord;

#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("invalid payload: {0}")]
    InvalidPayload(&'static str),
    #[error("training job not found: {0}")]
    NotFound(String),
    #[error("provider unavailable: {0}")]
    ProviderUnavailable(#[from] ProviderError),
    #[error("store failure: {0}")]
    Store(#[from] anyhow::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Status moved to a terminal state in this pass.
    Transitioned(JobStatus),
    /// Provider still reports the job in progress; staleness clock reset.
    StillProcessing,
    /// Job was already terminal; at most a trigger-word backfill happened.
    AlreadyTerminal,
}

/// The single transition function, invoked from both the webhook handler
/// and the polling path so the two channels can never diverge in how they
/// interpret the same provider status. Safe to apply repeatedly: the
/// store's terminal-state guard makes redelivery and races no-ops.
pub async fn apply_provider_update(
    store: &Store,
    update: &ProviderUpdate,
    now: i64,
) -> Result<Outcome, ReconcileError> {
    if update.id.trim().is_empty() {
        return Err(ReconcileError::InvalidPayload("missing job id"));
    }

    let job = store
        .get_job(&update.id)
        .await?
        .ok_or_else(|| ReconcileError::NotFound(update.id.clone()))?;

    let target = JobStatus::from_provider(&update.status);

    if job.status.is_terminal() {
        backfill_trigger_word(store, &job, update, now).await?;
        debug!(
            "Job {} already {}, ignoring reported '{}'",
            job.id,
            job.status.as_str(),
            update.status
        );
        return Ok(Outcome::AlreadyTerminal);
    }

    match target {
        JobStatus::Succeeded => {
            let version_id = update.version_id();
            let applied = store
                .mark_job_succeeded(
                    &job.id,
                    &version_id,
                    &update.output_json(),
                    update.trigger_word(),
                    now,
                )
                .await?;
            if !applied {
                // Raced with another reconciler that terminalized first.
                backfill_trigger_word(store, &job, update, now).await?;
                return Ok(Outcome::AlreadyTerminal);
            }
            info!("Job {} trained, version {}", job.id, version_id);
            Ok(Outcome::Transitioned(JobStatus::Succeeded))
        }
        JobStatus::Failed => {
            let message = update
                .error
                .clone()
                .unwrap_or_else(|| "training failed".to_string());
            let applied = store.mark_job_failed(&job.id, &message, now).await?;
            if !applied {
                backfill_trigger_word(store, &job, update, now).await?;
                return Ok(Outcome::AlreadyTerminal);
            }
            info!("Job {} failed: {}", job.id, message);
            Ok(Outcome::Transitioned(JobStatus::Failed))
        }
        JobStatus::Processing => {
            store.touch_job_processing(&job.id, now).await?;
            Ok(Outcome::StillProcessing)
        }
    }
}

/// Pull-based fallback for when the push channel is believed to have
/// failed: fetch the provider's current view and run it through the same
/// transition function as the webhook path. A transient provider failure
/// leaves the record exactly as it was.
pub async fn reconcile_with_provider(
    store: &Store,
    provider: &dyn TrainingProvider,
    job_id: &str,
    now: i64,
) -> Result<Outcome, ReconcileError> {
    // Confirm the job is ours before spending the network round trip.
    if store.get_job(job_id).await?.is_none() {
        return Err(ReconcileError::NotFound(job_id.to_string()));
    }

    let mut update = provider.fetch_training(job_id).await?;
    if update.id.trim().is_empty() {
        update.id = job_id.to_string();
    }
    apply_provider_update(store, &update, now).await
}

/// The one field writable after a terminal decision: an empty trigger word
/// repairs data missing from job creation rather than contradicting the
/// terminal state.
async fn backfill_trigger_word(
    store: &Store,
    job: &TrainingJobRecord,
    update: &ProviderUpdate,
    now: i64,
) -> Result<(), ReconcileError> {
    if job.trigger_word.is_empty()
        && let Some(word) = update.trigger_word()
    {
        let filled = store.backfill_trigger_word(&job.id, word, now).await?;
        if filled {
            info!("Job {} backfilled trigger word '{}'", job.id, word);
        }
    }
    Ok(())
}
