//! Issue persistence.
//!
//! [`IssueRepository`] is the seam the orchestrator saves completed drafts
//! through; [`PgIssueStore`] is the Postgres implementation. Saving promotes
//! an [`IssueDraft`] into a [`SavedIssue`] with a generated id and a `saved`
//! status. Incomplete drafts are rejected at this boundary regardless of what
//! upstream validation concluded.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Row};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{NajuaError, Result};
use crate::issue::{IssueDraft, IssueStatus, IssueType, Severity};

/// A persisted issue record.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SavedIssue {
    pub issue_id: String,
    pub issue_status: IssueStatus,
    pub issue_type: IssueType,
    pub issue_description: String,
    pub issue_location: String,
    pub issue_date: Option<String>,
    pub issue_time: Option<String>,
    pub issue_severity: Option<Severity>,
    pub created_at: DateTime<Utc>,
}

/// Filter for listing persisted issues.
#[derive(Debug, Clone)]
pub struct IssueFilter {
    pub status: Option<IssueStatus>,
    pub limit: i64,
}

impl Default for IssueFilter {
    fn default() -> Self {
        Self {
            status: None,
            limit: 100,
        }
    }
}

/// Storage seam for completed issue drafts.
#[async_trait]
pub trait IssueRepository: Send + Sync {
    /// Persists a complete draft, returning the saved record. Fails with
    /// [`NajuaError::IncompleteIssue`] if any mandatory field is missing.
    async fn save(&self, draft: &IssueDraft) -> Result<SavedIssue>;

    /// Updates the status of a saved issue. Returns `None` for unknown ids.
    async fn update_status(
        &self,
        issue_id: &str,
        status: IssueStatus,
    ) -> Result<Option<SavedIssue>>;

    /// Fetches a saved issue by id.
    async fn get(&self, issue_id: &str) -> Result<Option<SavedIssue>>;

    /// Lists saved issues, newest first.
    async fn list(&self, filter: IssueFilter) -> Result<Vec<SavedIssue>>;
}

/// Postgres-backed [`IssueRepository`].
pub struct PgIssueStore {
    pool: PgPool,
}

impl PgIssueStore {
    /// Connects to the database and ensures the schema exists.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await?;
        let store = Self { pool };
        store.run_migrations().await?;
        Ok(store)
    }

    pub fn with_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn run_migrations(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS issues (
                issue_id TEXT PRIMARY KEY,
                issue_status TEXT NOT NULL,
                issue_type TEXT NOT NULL,
                issue_description TEXT NOT NULL,
                issue_location TEXT NOT NULL,
                issue_date TEXT,
                issue_time TEXT,
                issue_severity TEXT,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_issues_status ON issues (issue_status)",
        )
        .execute(&self.pool)
        .await?;

        debug!("issue store migrations applied");
        Ok(())
    }

    fn row_to_issue(row: &sqlx::postgres::PgRow) -> Result<SavedIssue> {
        let status: String = row.try_get("issue_status")?;
        let issue_type: String = row.try_get("issue_type")?;
        let severity: Option<String> = row.try_get("issue_severity")?;

        Ok(SavedIssue {
            issue_id: row.try_get("issue_id")?,
            issue_status: status
                .parse::<IssueStatus>()
                .map_err(|e| NajuaError::DecisionContract { message: e })?,
            issue_type: issue_type
                .parse::<IssueType>()
                .map_err(|e| NajuaError::DecisionContract { message: e })?,
            issue_description: row.try_get("issue_description")?,
            issue_location: row.try_get("issue_location")?,
            issue_date: row.try_get("issue_date")?,
            issue_time: row.try_get("issue_time")?,
            issue_severity: severity
                .map(|s| s.parse::<Severity>())
                .transpose()
                .map_err(|e| NajuaError::DecisionContract { message: e })?,
            created_at: row.try_get("created_at")?,
        })
    }
}

/// Generates a short human-readable issue id, e.g. `ISS-9F2C41AB`.
pub fn generate_issue_id() -> String {
    let hex = Uuid::new_v4().simple().to_string();
    format!("ISS-{}", hex[..8].to_uppercase())
}

#[async_trait]
impl IssueRepository for PgIssueStore {
    async fn save(&self, draft: &IssueDraft) -> Result<SavedIssue> {
        let missing = draft.missing_fields();
        if !missing.is_empty() {
            return Err(NajuaError::IncompleteIssue {
                fields: missing.join(", "),
            });
        }

        // missing_fields() already guarantees these are present.
        let (issue_type, description, location) = match (
            draft.issue_type,
            draft.issue_description.as_deref(),
            draft.issue_location.as_deref(),
        ) {
            (Some(t), Some(d), Some(l)) => (t, d, l),
            _ => {
                return Err(NajuaError::IncompleteIssue {
                    fields: "issue_type, issue_description, issue_location".to_string(),
                })
            }
        };

        let issue_id = generate_issue_id();
        let created_at = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO issues (
                issue_id, issue_status, issue_type, issue_description,
                issue_location, issue_date, issue_time, issue_severity, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(&issue_id)
        .bind(IssueStatus::Saved.as_str())
        .bind(issue_type.as_str())
        .bind(description)
        .bind(location)
        .bind(&draft.issue_date)
        .bind(&draft.issue_time)
        .bind(draft.issue_severity.map(|s| s.as_str()))
        .bind(created_at)
        .execute(&self.pool)
        .await?;

        info!(%issue_id, issue_type = %issue_type, "issue saved");

        Ok(SavedIssue {
            issue_id,
            issue_status: IssueStatus::Saved,
            issue_type,
            issue_description: description.to_string(),
            issue_location: location.to_string(),
            issue_date: draft.issue_date.clone(),
            issue_time: draft.issue_time.clone(),
            issue_severity: draft.issue_severity,
            created_at,
        })
    }

    async fn update_status(
        &self,
        issue_id: &str,
        status: IssueStatus,
    ) -> Result<Option<SavedIssue>> {
        let row = sqlx::query(
            "UPDATE issues SET issue_status = $1 WHERE issue_id = $2 RETURNING *",
        )
        .bind(status.as_str())
        .bind(issue_id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(Self::row_to_issue).transpose()
    }

    async fn get(&self, issue_id: &str) -> Result<Option<SavedIssue>> {
        let row = sqlx::query("SELECT * FROM issues WHERE issue_id = $1")
            .bind(issue_id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(Self::row_to_issue).transpose()
    }

    async fn list(&self, filter: IssueFilter) -> Result<Vec<SavedIssue>> {
        let rows = match filter.status {
            Some(status) => {
                sqlx::query(
                    "SELECT * FROM issues WHERE issue_status = $1 \
                     ORDER BY created_at DESC LIMIT $2",
                )
                .bind(status.as_str())
                .bind(filter.limit)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query("SELECT * FROM issues ORDER BY created_at DESC LIMIT $1")
                    .bind(filter.limit)
                    .fetch_all(&self.pool)
                    .await?
            }
        };

        rows.iter().map(Self::row_to_issue).collect()
    }
}
