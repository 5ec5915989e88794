use anyhow::{Result, bail};
use rusqlite::params;

use super::Store;
use super::types::TrainingJobRecord;
use crate::core::training::JobStatus;

const JOB_COLUMNS: &str = "id, user_id, trigger_word, status, version_id, output_json, \
     error_message, created_at, updated_at, trained_at";

fn job_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<TrainingJobRecord> {
    let status: String = row.get(3)?;
    Ok(TrainingJobRecord {
        id: row.get(0)?,
        user_id: row.get(1)?,
        trigger_word: row.get(2)?,
        // Unknown stored values read back as processing rather than erroring.
        status: JobStatus::from_status(&status).unwrap_or(JobStatus::Processing),
        version_id: row.get(4)?,
        output_json: row.get(5)?,
        error_message: row.get(6)?,
        created_at: row.get(7)?,
        updated_at: row.get(8)?,
        trained_at: row.get(9)?,
    })
}

impl Store {
    /// Register a job already submitted to the provider. `id` is the
    /// provider's job identifier and is immutable from here on.
    pub async fn create_job(
        &self,
        id: &str,
        user_id: &str,
        trigger_word: &str,
        now: i64,
    ) -> Result<TrainingJobRecord> {
        let db = self.db.lock().await;
        let inserted = db.execute(
            "INSERT OR IGNORE INTO training_jobs (id, user_id, trigger_word, status, created_at, updated_at) \
             VALUES (?1, ?2, ?3, 'processing', ?4, ?4)",
            params![id, user_id, trigger_word, now],
        )?;
        if inserted == 0 {
            bail!("training job '{}' is already registered", id);
        }
        Ok(TrainingJobRecord {
            id: id.to_string(),
            user_id: user_id.to_string(),
            trigger_word: trigger_word.to_string(),
            status: JobStatus::Processing,
            version_id: None,
            output_json: None,
            error_message: None,
            created_at: now,
            updated_at: now,
            trained_at: None,
        })
    }

    pub async fn get_job(&self, id: &str) -> Result<Option<TrainingJobRecord>> {
        let db = self.db.lock().await;
        let mut stmt = db.prepare(&format!(
            "SELECT {JOB_COLUMNS} FROM training_jobs WHERE id = ?1"
        ))?;
        let mut rows = stmt.query_map(params![id], job_from_row)?;
        match rows.next() {
            Some(row) => Ok(Some(row?)),
            None => Ok(None),
        }
    }

    /// Success transition. Guarded on `status = 'processing'` so a job a
    /// racing writer already terminalized is left untouched; returns whether
    /// the row was written. An empty trigger word is filled from the payload
    /// in the same single-row write.
    pub async fn mark_job_succeeded(
        &self,
        id: &str,
        version_id: &str,
        output_json: &str,
        trigger_word: Option<&str>,
        now: i64,
    ) -> Result<bool> {
        let db = self.db.lock().await;
        let rows = db.execute(
            "UPDATE training_jobs SET \
                status = 'succeeded', \
                version_id = ?2, \
                output_json = ?3, \
                trained_at = ?4, \
                updated_at = ?4, \
                trigger_word = CASE WHEN trigger_word = '' \
                    THEN COALESCE(?5, trigger_word) ELSE trigger_word END \
             WHERE id = ?1 AND status = 'processing'",
            params![id, version_id, output_json, now, trigger_word],
        )?;
        Ok(rows > 0)
    }

    /// Failure transition, same guard as the success path.
    pub async fn mark_job_failed(&self, id: &str, error_message: &str, now: i64) -> Result<bool> {
        let db = self.db.lock().await;
        let rows = db.execute(
            "UPDATE training_jobs SET status = 'failed', error_message = ?2, updated_at = ?3 \
             WHERE id = ?1 AND status = 'processing'",
            params![id, error_message, now],
        )?;
        Ok(rows > 0)
    }

    /// A provider poll confirmed the job is still running: refresh
    /// `updated_at` so the staleness clock restarts.
    pub async fn touch_job_processing(&self, id: &str, now: i64) -> Result<bool> {
        let db = self.db.lock().await;
        let rows = db.execute(
            "UPDATE training_jobs SET updated_at = ?2 \
             WHERE id = ?1 AND status = 'processing'",
            params![id, now],
        )?;
        Ok(rows > 0)
    }

    /// Fill a trigger word that was missing at creation. The only write
    /// permitted against a terminal job; guarded so an existing word is
    /// never overwritten.
    pub async fn backfill_trigger_word(&self, id: &str, trigger_word: &str, now: i64) -> Result<bool> {
        let db = self.db.lock().await;
        let rows = db.execute(
            "UPDATE training_jobs SET trigger_word = ?2, updated_at = ?3 \
             WHERE id = ?1 AND trigger_word = ''",
            params![id, trigger_word, now],
        )?;
        Ok(rows > 0)
    }

    pub async fn count_jobs_for_user(&self, user_id: &str) -> Result<u32> {
        let db = self.db.lock().await;
        let count: u32 = db.query_row(
            "SELECT COUNT(*) FROM training_jobs WHERE user_id = ?1",
            params![user_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}
