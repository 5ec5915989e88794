pub mod provider;
mod reconcile;

pub use provider::{ProviderError, TrainingProvider};
pub use reconcile::{Outcome, ReconcileError, apply_provider_update, reconcile_with_provider};

use crate::core::store::types::TrainingJobRecord;

pub const DEFAULT_STALENESS_SECS: i64 = 3600;

/// Canonical three-state classification derived from the provider's
/// free-text status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Processing,
    Succeeded,
    Failed,
}

impl JobStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Processing => "processing",
            JobStatus::Succeeded => "succeeded",
            JobStatus::Failed => "failed",
        }
    }

    pub fn from_status(value: &str) -> Option<Self> {
        match value {
            "processing" => Some(JobStatus::Processing),
            "succeeded" => Some(JobStatus::Succeeded),
            "failed" => Some(JobStatus::Failed),
            _ => None,
        }
    }

    /// Lossy, total mapping from whatever status string the provider
    /// reports. Unrecognized values ("starting", "queued", or anything the
    /// provider adds tomorrow) read as still-in-progress, so a new provider
    /// status can never strand a job in an invalid internal state.
    pub fn from_provider(value: &str) -> Self {
        match value {
            "succeeded" => JobStatus::Succeeded,
            "failed" => JobStatus::Failed,
            _ => JobStatus::Processing,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Succeeded | JobStatus::Failed)
    }
}

/// Provider-reported view of a training job. The same shape arrives on both
/// channels: webhook push bodies and poll fetch responses. Extra fields are
/// ignored.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct ProviderUpdate {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub output: Option<serde_json::Value>,
    #[serde(default)]
    pub error: Option<String>,
}

impl ProviderUpdate {
    /// Artifact identifier for a success write: the output's explicit
    /// version field when present, else the payload's own id.
    pub fn version_id(&self) -> String {
        self.output
            .as_ref()
            .and_then(|o| o.get("version"))
            .and_then(|v| v.as_str())
            .unwrap_or(&self.id)
            .to_string()
    }

    pub fn trigger_word(&self) -> Option<&str> {
        self.output
            .as_ref()
            .and_then(|o| o.get("trigger_word"))
            .and_then(|v| v.as_str())
            .filter(|w| !w.is_empty())
    }

    pub fn output_json(&self) -> String {
        self.output
            .as_ref()
            .map(|o| o.to_string())
            .unwrap_or_else(|| "{}".to_string())
    }
}

/// A job has possibly missed its webhook and is worth a provider poll.
/// Pure gate, checked before spending a network round trip.
pub fn is_stale(job: &TrainingJobRecord, now: i64, threshold_secs: i64) -> bool {
    job.status == JobStatus::Processing && now - job.updated_at > threshold_secs
}

#[cfg(test)]
mod tests;
