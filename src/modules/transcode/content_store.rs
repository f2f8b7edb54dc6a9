use async_trait::async_trait;
use sqlx::FromRow;
use time::OffsetDateTime;

use crate::infrastructure::db::pool::DbPool;
use crate::modules::transcode::error::TranscodeError;
use crate::modules::transcode::model::{ContentRecord, ContentState, ContentUpdate};

/// Persistence collaborator for content records and the mirrored per-owner
/// entries the profile listing reads.
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Inserts the placeholder record (state Processing) the moment a job is
    /// accepted, together with its owner reference.
    async fn create_placeholder(
        &self,
        content_id: &str,
        owner: &str,
        title: Option<&str>,
    ) -> Result<(), TranscodeError>;

    async fn get(&self, content_id: &str) -> Result<Option<ContentRecord>, TranscodeError>;

    /// Applies the finalizer's update to the record and the owner reference in
    /// one transaction, so the two views never disagree.
    async fn finalize(
        &self,
        content_id: &str,
        owner: &str,
        update: &ContentUpdate,
    ) -> Result<(), TranscodeError>;
}

pub struct PgContentStore {
    pool: DbPool,
}

impl PgContentStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[derive(FromRow)]
struct ContentRow {
    content_id: String,
    owner_username: String,
    title: Option<String>,
    manifest_location: Option<String>,
    renditions: Option<String>,
    state: String,
    state_since: OffsetDateTime,
    created_at: OffsetDateTime,
}

impl ContentRow {
    fn into_record(self) -> Result<ContentRecord, TranscodeError> {
        let rendition_locations = match self.renditions {
            Some(raw) => serde_json::from_str(&raw)?,
            None => Vec::new(),
        };

        Ok(ContentRecord {
            content_id: self.content_id,
            owner_username: self.owner_username,
            title: self.title,
            manifest_location: self.manifest_location,
            rendition_locations,
            state: ContentState::from_column(&self.state, self.state_since),
            created_at: self.created_at,
        })
    }
}

#[async_trait]
impl ContentStore for PgContentStore {
    async fn create_placeholder(
        &self,
        content_id: &str,
        owner: &str,
        title: Option<&str>,
    ) -> Result<(), TranscodeError> {
        let now = OffsetDateTime::now_utc();
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO contents (content_id, owner_username, title, state, state_since, created_at)
            VALUES ($1, $2, $3, 'processing', $4, $4)
            "#,
        )
        .bind(content_id)
        .bind(owner)
        .bind(title)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO owner_contents (owner_username, content_id, state, state_since)
            VALUES ($1, $2, 'processing', $3)
            "#,
        )
        .bind(owner)
        .bind(content_id)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn get(&self, content_id: &str) -> Result<Option<ContentRecord>, TranscodeError> {
        let row: Option<ContentRow> = sqlx::query_as(
            r#"
            SELECT content_id, owner_username, title, manifest_location,
                   renditions, state, state_since, created_at
            FROM contents
            WHERE content_id = $1
            "#,
        )
        .bind(content_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(ContentRow::into_record).transpose()
    }

    async fn finalize(
        &self,
        content_id: &str,
        owner: &str,
        update: &ContentUpdate,
    ) -> Result<(), TranscodeError> {
        let renditions = serde_json::to_string(&update.rendition_locations)?;
        let since = update
            .state
            .since()
            .unwrap_or_else(OffsetDateTime::now_utc);

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            UPDATE contents
            SET manifest_location = $2, renditions = $3, state = $4, state_since = $5
            WHERE content_id = $1
            "#,
        )
        .bind(content_id)
        .bind(&update.manifest_location)
        .bind(renditions)
        .bind(update.state.as_str())
        .bind(since)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            UPDATE owner_contents
            SET state = $3, state_since = $4
            WHERE owner_username = $1 AND content_id = $2
            "#,
        )
        .bind(owner)
        .bind(content_id)
        .bind(update.state.as_str())
        .bind(since)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }
}
