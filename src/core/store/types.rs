use crate::core::quota::Tier;
use crate::core::training::JobStatus;

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct TrainingJobRecord {
    pub id: String,
    pub user_id: String,
    pub trigger_word: String,
    pub status: JobStatus,
    pub version_id: Option<String>,
    pub output_json: Option<String>,
    pub error_message: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
    pub trained_at: Option<i64>,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct UserRecord {
    pub id: String,
    pub tier: Tier,
    pub created_at: i64,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct GenerationRecord {
    pub id: String,
    pub user_id: String,
    pub job_id: String,
    pub prompt: String,
    pub created_at: i64,
}
