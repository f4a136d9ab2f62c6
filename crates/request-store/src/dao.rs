use finder_core::{AnalyzeRequestRecord, Engagement, RecordUpdate};
use sqlx::FromRow;

use crate::db::StoreDb;
use crate::error::{StoreError, StoreResult};

#[derive(Debug, FromRow)]
struct RecordRow {
    wallet_address: String,
    count: Option<i64>,
    text: String,
    engagement: String,
    prompt: String,
}

impl TryFrom<RecordRow> for AnalyzeRequestRecord {
    type Error = StoreError;

    fn try_from(row: RecordRow) -> StoreResult<Self> {
        let engagement: Engagement = row.engagement.parse().map_err(|e| StoreError::CorruptRow {
            wallet_address: row.wallet_address.clone(),
            reason: format!("{}", e),
        })?;

        Ok(AnalyzeRequestRecord {
            wallet_address: row.wallet_address,
            count: row.count,
            text: row.text,
            engagement,
            prompt: row.prompt,
        })
    }
}

const SELECT_BY_KEY: &str = "SELECT wallet_address, count, text, engagement, prompt
     FROM analyze_request WHERE wallet_address = ?";

/// Keyed store of the last analyze request per wallet address.
///
/// The store does not upsert on `insert`; callers pick insert or update, or
/// use [`AnalyzeRequestStore::upsert`] for the atomic variant.
#[derive(Clone)]
pub struct AnalyzeRequestStore {
    db: StoreDb,
}

impl AnalyzeRequestStore {
    pub fn new(db: StoreDb) -> Self {
        Self { db }
    }

    pub async fn get_by_key(&self, wallet_address: &str) -> StoreResult<Option<AnalyzeRequestRecord>> {
        let pool = self.db.pool().await?;

        let row: Option<RecordRow> = sqlx::query_as(SELECT_BY_KEY)
            .bind(wallet_address)
            .fetch_optional(pool)
            .await?;

        row.map(AnalyzeRequestRecord::try_from).transpose()
    }

    /// Insert a new record. Fails with `DuplicateKey` if the wallet already has one.
    pub async fn insert(&self, record: &AnalyzeRequestRecord) -> StoreResult<AnalyzeRequestRecord> {
        let pool = self.db.pool().await?;

        let result = sqlx::query(
            r#"
            INSERT INTO analyze_request (wallet_address, count, text, engagement, prompt)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&record.wallet_address)
        .bind(record.count)
        .bind(&record.text)
        .bind(record.engagement.as_str())
        .bind(&record.prompt)
        .execute(pool)
        .await;

        match result {
            Ok(_) => {
                tracing::debug!("Inserted analyze request for {}", record.wallet_address);
                Ok(record.clone())
            }
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                Err(StoreError::DuplicateKey(record.wallet_address.clone()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Apply a partial update. Returns the updated row, or `None` when the
    /// wallet has no record (nothing is created).
    ///
    /// A single statement, so concurrent writers only queue on SQLite's write
    /// lock instead of failing a read-to-write lock upgrade.
    pub async fn update(
        &self,
        wallet_address: &str,
        update: RecordUpdate,
    ) -> StoreResult<Option<AnalyzeRequestRecord>> {
        if update.is_empty() {
            return self.get_by_key(wallet_address).await;
        }
        let pool = self.db.pool().await?;

        let row: Option<RecordRow> = sqlx::query_as(
            r#"
            UPDATE analyze_request SET
                count = CASE WHEN ? THEN ? ELSE count END,
                text = COALESCE(?, text),
                engagement = COALESCE(?, engagement),
                prompt = COALESCE(?, prompt)
            WHERE wallet_address = ?
            RETURNING wallet_address, count, text, engagement, prompt
            "#,
        )
        .bind(update.count.is_some())
        .bind(update.count.flatten())
        .bind(update.text)
        .bind(update.engagement.map(|e| e.as_str()))
        .bind(update.prompt)
        .bind(wallet_address)
        .fetch_optional(pool)
        .await?;

        if row.is_some() {
            tracing::debug!("Updated analyze request for {}", wallet_address);
        }
        row.map(AnalyzeRequestRecord::try_from).transpose()
    }

    /// True iff a row existed and was removed.
    pub async fn delete(&self, wallet_address: &str) -> StoreResult<bool> {
        let pool = self.db.pool().await?;

        let result = sqlx::query("DELETE FROM analyze_request WHERE wallet_address = ?")
            .bind(wallet_address)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn list_all(&self) -> StoreResult<Vec<AnalyzeRequestRecord>> {
        let pool = self.db.pool().await?;

        let rows: Vec<RecordRow> = sqlx::query_as(
            "SELECT wallet_address, count, text, engagement, prompt
             FROM analyze_request ORDER BY wallet_address",
        )
        .fetch_all(pool)
        .await?;

        rows.into_iter().map(AnalyzeRequestRecord::try_from).collect()
    }

    /// Insert or overwrite in a single statement.
    pub async fn upsert(&self, record: &AnalyzeRequestRecord) -> StoreResult<AnalyzeRequestRecord> {
        let pool = self.db.pool().await?;

        sqlx::query(
            r#"
            INSERT INTO analyze_request (wallet_address, count, text, engagement, prompt)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(wallet_address) DO UPDATE SET
                count = excluded.count,
                text = excluded.text,
                engagement = excluded.engagement,
                prompt = excluded.prompt
            "#,
        )
        .bind(&record.wallet_address)
        .bind(record.count)
        .bind(&record.text)
        .bind(record.engagement.as_str())
        .bind(&record.prompt)
        .execute(pool)
        .await?;

        Ok(record.clone())
    }
}
