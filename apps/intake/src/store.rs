use async_trait::async_trait;
use sqlx::PgPool;
use tracing::{debug, warn};

use crate::models::application::ApplicationRecord;
use crate::pipeline::{PersistError, RecordStore};

/// Postgres-backed `RecordStore`. Append-only: rows are inserted, never updated.
#[derive(Clone)]
pub struct PgRecordStore {
    pool: PgPool,
}

impl PgRecordStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RecordStore for PgRecordStore {
    async fn insert(&self, record: &ApplicationRecord) -> Result<(), PersistError> {
        let result = sqlx::query(
            r#"
            INSERT INTO applications
                (application_id, name, email, phone, cv_url, submitted_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (application_id) DO NOTHING
            "#,
        )
        .bind(&record.application_id)
        .bind(&record.name)
        .bind(&record.email)
        .bind(&record.phone)
        .bind(&record.cv_url)
        .bind(record.submitted_at)
        .execute(&self.pool)
        .await
        .map_err(backend)?;

        if result.rows_affected() == 1 {
            debug!(application_id = %record.application_id, "Inserted application");
            return Ok(());
        }

        // Id already taken: identical re-insert is a no-op, anything else collides.
        match self.get(&record.application_id).await? {
            Some(existing) if existing == *record => {
                debug!(application_id = %record.application_id, "Re-insert of identical application");
                Ok(())
            }
            _ => {
                warn!(application_id = %record.application_id, "Application id already in use");
                Err(PersistError::DuplicateId(record.application_id.clone()))
            }
        }
    }

    async fn get(&self, application_id: &str) -> Result<Option<ApplicationRecord>, PersistError> {
        sqlx::query_as::<_, ApplicationRecord>(
            "SELECT application_id, name, email, phone, cv_url, submitted_at FROM applications WHERE application_id = $1",
        )
        .bind(application_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)
    }
}

fn backend(e: sqlx::Error) -> PersistError {
    PersistError::Backend(e.to_string())
}
