use anyhow::Result;
use rusqlite::params;

use super::Store;
use super::types::UserRecord;
use crate::core::quota::Tier;

impl Store {
    /// Create or re-tier a user. Account lifecycle is owned by the billing
    /// collaborator; this store only mirrors the tier for quota reads.
    pub async fn upsert_user(&self, id: &str, tier: Tier, now: i64) -> Result<()> {
        let db = self.db.lock().await;
        db.execute(
            "INSERT INTO users (id, tier, created_at) VALUES (?1, ?2, ?3) \
             ON CONFLICT(id) DO UPDATE SET tier = excluded.tier",
            params![id, tier.as_str(), now],
        )?;
        Ok(())
    }

    pub async fn get_user(&self, id: &str) -> Result<Option<UserRecord>> {
        let db = self.db.lock().await;
        let mut stmt = db.prepare("SELECT id, tier, created_at FROM users WHERE id = ?1")?;
        let mut rows = stmt.query_map(params![id], |row| {
            let tier: String = row.get(1)?;
            Ok(UserRecord {
                id: row.get(0)?,
                tier: Tier::from_name(&tier).unwrap_or(Tier::Free),
                created_at: row.get(2)?,
            })
        })?;
        match rows.next() {
            Some(row) => Ok(Some(row?)),
            None => Ok(None),
        }
    }
}
