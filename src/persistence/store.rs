//! SQLite-based run history store

use crate::core::RunStatus;
use crate::persistence::{PersistenceBackend, RunSummary};
use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDateTime, Utc};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

/// SQLite run store
pub struct SqliteRunStore {
    pool: SqlitePool,
}

impl SqliteRunStore {
    /// Create a new SQLite store
    pub async fn new(db_path: &str) -> Result<Self> {
        let pool = SqlitePool::connect(&format!("sqlite:{}", db_path))
            .await
            .context("Failed to connect to database")?;

        let store = Self { pool };
        store.init().await?;

        Ok(store)
    }

    /// Create store with default path
    pub async fn with_default_path() -> Result<Self> {
        let data_dir = dirs::data_local_dir().unwrap_or_else(|| std::path::PathBuf::from("."));
        let db_dir = data_dir.join("matrix-ci");
        std::fs::create_dir_all(&db_dir)?;

        let db_path = db_dir.join("runs.db");
        Self::new(&db_path.to_string_lossy()).await
    }

    /// Initialize database schema
    async fn init(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS runs (
                id TEXT PRIMARY KEY,
                pipeline_name TEXT NOT NULL,
                status TEXT NOT NULL,
                trigger_kind TEXT NOT NULL,
                branch TEXT NOT NULL,
                actor TEXT NOT NULL,
                started_at TEXT NOT NULL,
                completed_at TEXT,
                total_configurations INTEGER NOT NULL DEFAULT 0,
                succeeded INTEGER NOT NULL DEFAULT 0,
                failed INTEGER NOT NULL DEFAULT 0,
                skipped INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE INDEX IF NOT EXISTS idx_pipeline_name ON runs(pipeline_name);
            CREATE INDEX IF NOT EXISTS idx_status ON runs(status);
            CREATE INDEX IF NOT EXISTS idx_started_at ON runs(started_at);
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    fn to_naive(dt: DateTime<Utc>) -> NaiveDateTime {
        dt.naive_utc()
    }

    fn from_naive(dt: NaiveDateTime) -> DateTime<Utc> {
        DateTime::from_naive_utc_and_offset(dt, Utc)
    }

    fn status_to_str(status: RunStatus) -> &'static str {
        match status {
            RunStatus::Pending => "Pending",
            RunStatus::Running => "Running",
            RunStatus::Success => "Success",
            RunStatus::Failed => "Failed",
            RunStatus::Skipped => "Skipped",
            RunStatus::Cancelled => "Cancelled",
        }
    }

    fn status_from_str(status: &str) -> RunStatus {
        match status {
            "Running" => RunStatus::Running,
            "Success" => RunStatus::Success,
            "Failed" => RunStatus::Failed,
            "Skipped" => RunStatus::Skipped,
            "Cancelled" => RunStatus::Cancelled,
            _ => RunStatus::Pending,
        }
    }

    fn row_to_summary(row: &sqlx::sqlite::SqliteRow) -> Result<RunSummary> {
        Ok(RunSummary {
            run_id: Uuid::parse_str(&row.get::<String, _>("id"))?,
            pipeline_name: row.get("pipeline_name"),
            status: Self::status_from_str(&row.get::<String, _>("status")),
            trigger: row.get("trigger_kind"),
            branch: row.get("branch"),
            actor: row.get("actor"),
            started_at: Self::from_naive(row.get("started_at")),
            completed_at: row
                .get::<Option<NaiveDateTime>, _>("completed_at")
                .map(Self::from_naive),
            total_configurations: row.get::<i64, _>("total_configurations") as usize,
            succeeded: row.get::<i64, _>("succeeded") as usize,
            failed: row.get::<i64, _>("failed") as usize,
            skipped: row.get::<i64, _>("skipped") as usize,
        })
    }
}

const SUMMARY_COLUMNS: &str = "id, pipeline_name, status, trigger_kind, branch, actor, \
     started_at, completed_at, total_configurations, succeeded, failed, skipped";

#[async_trait::async_trait]
impl PersistenceBackend for SqliteRunStore {
    async fn save_run(&self, run: &RunSummary) -> Result<()> {
        sqlx::query(
            r#"
            INSERT OR REPLACE INTO runs
            (id, pipeline_name, status, trigger_kind, branch, actor, started_at, completed_at,
             total_configurations, succeeded, failed, skipped)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            "#,
        )
        .bind(run.run_id.to_string())
        .bind(&run.pipeline_name)
        .bind(Self::status_to_str(run.status))
        .bind(&run.trigger)
        .bind(&run.branch)
        .bind(&run.actor)
        .bind(Self::to_naive(run.started_at))
        .bind(run.completed_at.map(Self::to_naive))
        .bind(run.total_configurations as i64)
        .bind(run.succeeded as i64)
        .bind(run.failed as i64)
        .bind(run.skipped as i64)
        .execute(&self.pool)
        .await
        .context("Failed to save run")?;

        Ok(())
    }

    async fn load_run(&self, run_id: Uuid) -> Result<Option<RunSummary>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM runs WHERE id = ?1",
            SUMMARY_COLUMNS
        ))
        .bind(run_id.to_string())
        .fetch_optional(&self.pool)
        .await
        .context("Failed to load run")?;

        row.as_ref().map(Self::row_to_summary).transpose()
    }

    async fn list_runs(&self, pipeline_name: &str) -> Result<Vec<RunSummary>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM runs WHERE pipeline_name = ?1 ORDER BY started_at DESC",
            SUMMARY_COLUMNS
        ))
        .bind(pipeline_name)
        .fetch_all(&self.pool)
        .await
        .context("Failed to list runs")?;

        rows.iter().map(Self::row_to_summary).collect()
    }

    async fn latest_run(&self, pipeline_name: &str) -> Result<Option<RunSummary>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM runs WHERE pipeline_name = ?1 ORDER BY started_at DESC LIMIT 1",
            SUMMARY_COLUMNS
        ))
        .bind(pipeline_name)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to get latest run")?;

        row.as_ref().map(Self::row_to_summary).transpose()
    }

    async fn list_pipelines(&self) -> Result<Vec<String>> {
        let rows = sqlx::query(
            r#"
            SELECT DISTINCT pipeline_name
            FROM runs
            ORDER BY pipeline_name ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .context("Failed to list pipelines")?;

        Ok(rows.iter().map(|row| row.get("pipeline_name")).collect())
    }
}
