use anyhow::Result;
use rusqlite::params;

use super::Store;
use super::types::GenerationRecord;

impl Store {
    pub async fn record_generation(
        &self,
        user_id: &str,
        job_id: &str,
        prompt: &str,
        now: i64,
    ) -> Result<GenerationRecord> {
        let id = uuid::Uuid::new_v4().to_string();
        let db = self.db.lock().await;
        db.execute(
            "INSERT INTO generations (id, user_id, job_id, prompt, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![id, user_id, job_id, prompt, now],
        )?;
        Ok(GenerationRecord {
            id,
            user_id: user_id.to_string(),
            job_id: job_id.to_string(),
            prompt: prompt.to_string(),
            created_at: now,
        })
    }

    /// Generations at or after `since` (unix seconds). Callers pass local
    /// midnight to get the daily counter.
    pub async fn count_generations_since(&self, user_id: &str, since: i64) -> Result<u32> {
        let db = self.db.lock().await;
        let count: u32 = db.query_row(
            "SELECT COUNT(*) FROM generations WHERE user_id = ?1 AND created_at >= ?2",
            params![user_id, since],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_store;

    #[tokio::test]
    async fn records_and_counts_generations() {
        let store = test_store();
        store
            .record_generation("u1", "T1", "zeta on a beach", 1000)
            .await
            .unwrap();
        store
            .record_generation("u1", "T1", "zeta in the city", 2000)
            .await
            .unwrap();
        store
            .record_generation("u2", "T9", "other user", 2000)
            .await
            .unwrap();

        assert_eq!(store.count_generations_since("u1", 0).await.unwrap(), 2);
        assert_eq!(store.count_generations_since("u2", 0).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn count_window_excludes_older_generations() {
        let store = test_store();
        store.record_generation("u1", "T1", "old", 100).await.unwrap();
        store.record_generation("u1", "T1", "new", 5000).await.unwrap();

        // Boundary is inclusive: a record exactly at midnight counts.
        assert_eq!(store.count_generations_since("u1", 5000).await.unwrap(), 1);
        assert_eq!(store.count_generations_since("u1", 101).await.unwrap(), 1);
        assert_eq!(store.count_generations_since("u1", 100).await.unwrap(), 2);
    }
}
