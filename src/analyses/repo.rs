use anyhow::Context;
use axum::async_trait;
use sqlx::{types::Json, PgPool};
use uuid::Uuid;

use super::dto::format_timestamp;
use super::repo_types::{AnalysisRecord, NewAnalysis};

/// Persistence for analysis records: one flat collection, newest first.
#[async_trait]
pub trait AnalysisStore: Send + Sync {
    async fn insert(&self, new: NewAnalysis) -> anyhow::Result<Uuid>;
    async fn list_recent(&self, limit: i64) -> anyhow::Result<Vec<AnalysisRecord>>;
    async fn find(&self, id: Uuid) -> anyhow::Result<Option<AnalysisRecord>>;
    /// Returns `false` when nothing had that id.
    async fn delete(&self, id: Uuid) -> anyhow::Result<bool>;
    async fn close(&self) {}
}

#[derive(Clone)]
pub struct PgAnalysisStore {
    db: PgPool,
    table: String,
}

impl PgAnalysisStore {
    /// `table` must already be validated as a plain identifier.
    pub fn new(db: PgPool, table: impl Into<String>) -> Self {
        Self {
            db,
            table: table.into(),
        }
    }

    pub async fn ensure_schema(&self) -> anyhow::Result<()> {
        sqlx::query(&format!(
            r#"
            CREATE TABLE IF NOT EXISTS {t} (
                id                UUID PRIMARY KEY DEFAULT gen_random_uuid(),
                created_at        TIMESTAMPTZ NOT NULL,
                original_filename TEXT NOT NULL,
                image_base64      TEXT NOT NULL,
                food_data         JSONB NOT NULL,
                analysis_date     TEXT NOT NULL,
                user_session      TEXT,
                location_data     JSONB
            )
            "#,
            t = self.table
        ))
        .execute(&self.db)
        .await
        .with_context(|| format!("create table {}", self.table))?;

        sqlx::query(&format!(
            "CREATE INDEX IF NOT EXISTS {t}_created_at_idx ON {t} (created_at DESC)",
            t = self.table
        ))
        .execute(&self.db)
        .await
        .with_context(|| format!("create index on {}", self.table))?;
        Ok(())
    }

    fn select_columns() -> &'static str {
        "id, created_at, original_filename, image_base64, food_data, analysis_date, user_session, location_data"
    }
}

#[async_trait]
impl AnalysisStore for PgAnalysisStore {
    async fn insert(&self, new: NewAnalysis) -> anyhow::Result<Uuid> {
        let analysis_date = format_timestamp(new.timestamp);
        let (id,): (Uuid,) = sqlx::query_as(&format!(
            r#"
            INSERT INTO {} (created_at, original_filename, image_base64, food_data,
                            analysis_date, user_session, location_data)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id
            "#,
            self.table
        ))
        .bind(new.timestamp)
        .bind(&new.original_filename)
        .bind(&new.image_base64)
        .bind(&new.food_data)
        .bind(&analysis_date)
        .bind(&new.user_session)
        .bind(new.location_data.map(Json))
        .fetch_one(&self.db)
        .await
        .context("insert analysis")?;
        Ok(id)
    }

    async fn list_recent(&self, limit: i64) -> anyhow::Result<Vec<AnalysisRecord>> {
        let rows = sqlx::query_as::<_, AnalysisRecord>(&format!(
            r#"
            SELECT {}
              FROM {}
             ORDER BY created_at DESC
             LIMIT $1
            "#,
            Self::select_columns(),
            self.table
        ))
        .bind(limit)
        .fetch_all(&self.db)
        .await
        .context("list analyses")?;
        Ok(rows)
    }

    async fn find(&self, id: Uuid) -> anyhow::Result<Option<AnalysisRecord>> {
        let row = sqlx::query_as::<_, AnalysisRecord>(&format!(
            "SELECT {} FROM {} WHERE id = $1",
            Self::select_columns(),
            self.table
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await
        .context("find analysis")?;
        Ok(row)
    }

    async fn delete(&self, id: Uuid) -> anyhow::Result<bool> {
        let result = sqlx::query(&format!("DELETE FROM {} WHERE id = $1", self.table))
            .bind(id)
            .execute(&self.db)
            .await
            .context("delete analysis")?;
        Ok(result.rows_affected() > 0)
    }

    async fn close(&self) {
        self.db.close().await;
    }
}
