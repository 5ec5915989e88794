mod generations;
mod jobs;
pub mod types;
mod users;

use anyhow::Result;
use rusqlite::Connection;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;

/// Durable record store for training jobs and the account data quota
/// evaluation reads. Single SQLite connection; every write is one row and
/// SQLite makes single-row updates atomic, which is all the reconciliation
/// guard requires.
pub struct Store {
    db: Arc<Mutex<Connection>>,
}

impl Store {
    pub fn open<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let db_path = db_path.as_ref();
        if let Some(parent) = db_path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        let db = Connection::open(db_path)?;
        create_schema(&db)?;
        info!("Store opened at {}", db_path.display());

        Ok(Self {
            db: Arc::new(Mutex::new(db)),
        })
    }
}

fn create_schema(db: &Connection) -> Result<()> {
    db.execute(
        "CREATE TABLE IF NOT EXISTS training_jobs (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
            trigger_word TEXT NOT NULL DEFAULT '',
            status TEXT NOT NULL DEFAULT 'processing',
            version_id TEXT,
            output_json TEXT,
            error_message TEXT,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL,
            trained_at INTEGER
        )",
        [],
    )?;

    db.execute(
        "CREATE TABLE IF NOT EXISTS users (
            id TEXT PRIMARY KEY,
            tier TEXT NOT NULL DEFAULT 'free',
            created_at INTEGER NOT NULL
        )",
        [],
    )?;

    db.execute(
        "CREATE TABLE IF NOT EXISTS generations (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
            job_id TEXT NOT NULL,
            prompt TEXT NOT NULL DEFAULT '',
            created_at INTEGER NOT NULL
        )",
        [],
    )?;

    db.execute(
        "CREATE INDEX IF NOT EXISTS idx_training_jobs_user ON training_jobs(user_id)",
        [],
    )?;
    db.execute(
        "CREATE INDEX IF NOT EXISTS idx_training_jobs_status_updated ON training_jobs(status, updated_at)",
        [],
    )?;
    db.execute(
        "CREATE INDEX IF NOT EXISTS idx_generations_user_created ON generations(user_id, created_at)",
        [],
    )?;

    Ok(())
}

/// Create an in-memory Store for testing. Avoids filesystem side-effects.
#[cfg(test)]
pub fn test_store() -> Store {
    let db = Connection::open_in_memory().expect("open in-memory db");
    create_schema(&db).expect("create schema");
    Store {
        db: Arc::new(Mutex::new(db)),
    }
}
