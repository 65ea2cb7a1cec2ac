//! SQLite-backed Versioned Store (C2, §4.2).

use async_trait::async_trait;
use chrono::Utc;
use domain::errors::StoreError;
use domain::models::snapshot::{Snapshot, SnapshotMeta, SnapshotPayload};
use domain::store::{ListOptions, ParentLink, PutOptions, StoreId, VersionedStore};
use sha2::{Digest, Sha256};
use sqlx::Row;

use crate::db::SqlitePool;

/// [`VersionedStore`] over a single SQLite pool shared with the rest of
/// the infrastructure layer.
#[derive(Clone)]
pub struct SqlStore {
    pool: SqlitePool,
}

impl SqlStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn content_hash(payload: &SnapshotPayload) -> Result<(String, String), StoreError> {
    let json = serde_json::to_string(payload).map_err(|e| StoreError::ParseError(e.to_string()))?;
    let mut hasher = Sha256::new();
    hasher.update(json.as_bytes());
    let hash = format!("{:x}", hasher.finalize());
    Ok((json, hash))
}

#[async_trait]
impl VersionedStore for SqlStore {
    async fn put(
        &self,
        store_id: &StoreId,
        payload: &SnapshotPayload,
        options: PutOptions,
    ) -> Result<i64, StoreError> {
        let path = store_id.to_path();
        let (json, hash) = content_hash(payload)?;

        let current_head: Option<(i64, String)> = sqlx::query_as(
            "SELECT version, content_hash FROM snapshots WHERE store_id = ? ORDER BY version DESC LIMIT 1",
        )
        .bind(&path)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StoreError::StoreError {
            operation: format!("put/read_head: {e}"),
        })?;

        if let Some((version, existing_hash)) = &current_head {
            if existing_hash == &hash {
                return Ok(*version);
            }
        }

        let next_version = current_head.map(|(v, _)| v + 1).unwrap_or(1);
        let now = Utc::now();

        let mut tx = self.pool.begin().await.map_err(|e| StoreError::StoreError {
            operation: format!("put/begin: {e}"),
        })?;

        sqlx::query(
            "INSERT INTO snapshots (store_id, version, content_hash, created_at, payload) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&path)
        .bind(next_version)
        .bind(&hash)
        .bind(now.to_rfc3339())
        .bind(&json)
        .execute(&mut *tx)
        .await
        .map_err(|e| StoreError::StoreError {
            operation: format!("put/insert: {e}"),
        })?;

        for tag in &options.tags {
            sqlx::query("INSERT INTO snapshot_tags (store_id, version, tag) VALUES (?, ?, ?)")
                .bind(&path)
                .bind(next_version)
                .bind(tag)
                .execute(&mut *tx)
                .await
                .map_err(|e| StoreError::StoreError {
                    operation: format!("put/tag: {e}"),
                })?;
        }

        for parent in &options.parents {
            insert_parent(&mut tx, &path, next_version, parent).await?;
        }

        tx.commit().await.map_err(|e| StoreError::StoreError {
            operation: format!("put/commit: {e}"),
        })?;

        Ok(next_version)
    }

    async fn get_latest(&self, store_id: &StoreId) -> Result<Option<Snapshot>, StoreError> {
        let path = store_id.to_path();
        let row = sqlx::query(
            "SELECT version, content_hash, created_at, payload FROM snapshots WHERE store_id = ? ORDER BY version DESC LIMIT 1",
        )
        .bind(&path)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StoreError::StoreError {
            operation: format!("get_latest: {e}"),
        })?;

        match row {
            Some(row) => Ok(Some(self.hydrate(&path, row).await?)),
            None => Ok(None),
        }
    }

    async fn get(&self, store_id: &StoreId, version: i64) -> Result<Option<Snapshot>, StoreError> {
        let path = store_id.to_path();
        let row = sqlx::query(
            "SELECT version, content_hash, created_at, payload FROM snapshots WHERE store_id = ? AND version = ?",
        )
        .bind(&path)
        .bind(version)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StoreError::StoreError {
            operation: format!("get: {e}"),
        })?;

        match row {
            Some(row) => Ok(Some(self.hydrate(&path, row).await?)),
            None => Ok(None),
        }
    }

    async fn list(&self, store_id: &StoreId, options: ListOptions) -> Result<Vec<SnapshotMeta>, StoreError> {
        let path = store_id.to_path();
        let limit = options.limit.unwrap_or(50);

        let rows = if let Some(before) = options.before {
            sqlx::query(
                "SELECT version, content_hash, created_at FROM snapshots WHERE store_id = ? AND version < ? ORDER BY version DESC LIMIT ?",
            )
            .bind(&path)
            .bind(before)
            .bind(limit)
            .fetch_all(&self.pool)
            .await
        } else {
            sqlx::query(
                "SELECT version, content_hash, created_at FROM snapshots WHERE store_id = ? ORDER BY version DESC LIMIT ?",
            )
            .bind(&path)
            .bind(limit)
            .fetch_all(&self.pool)
            .await
        }
        .map_err(|e| StoreError::StoreError {
            operation: format!("list: {e}"),
        })?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            let version: i64 = row.get("version");
            let tags = self.load_tags(&path, version).await?;
            out.push(SnapshotMeta {
                store_id: path.clone(),
                version,
                content_hash: row.get("content_hash"),
                created_at: parse_timestamp(row.get::<String, _>("created_at"))?,
                tags,
            });
        }
        Ok(out)
    }

    async fn purge_account(&self, account_id: &str) -> Result<u64, StoreError> {
        // Raw stores put account_id last (`media/raw/<platform>/<account_id>`);
        // every other shape puts it as an interior segment
        // (`media/<platform>/<account_id>/...`).
        let raw_pattern = format!("media/raw/%/{account_id}");
        let interior_pattern = format!("%/{account_id}/%");

        let mut tx = self.pool.begin().await.map_err(|e| StoreError::StoreError {
            operation: format!("purge_account/begin: {e}"),
        })?;

        let distinct_stores: Vec<(String,)> = sqlx::query_as(
            "SELECT DISTINCT store_id FROM snapshots WHERE store_id LIKE ? OR store_id LIKE ?",
        )
        .bind(&raw_pattern)
        .bind(&interior_pattern)
        .fetch_all(&mut *tx)
        .await
        .map_err(|e| StoreError::StoreError {
            operation: format!("purge_account/select: {e}"),
        })?;

        sqlx::query("DELETE FROM snapshot_tags WHERE store_id LIKE ? OR store_id LIKE ?")
            .bind(&raw_pattern)
            .bind(&interior_pattern)
            .execute(&mut *tx)
            .await
            .map_err(|e| StoreError::StoreError {
                operation: format!("purge_account/delete_tags: {e}"),
            })?;

        sqlx::query(
            "DELETE FROM snapshot_parents WHERE child_store LIKE ? OR child_store LIKE ? \
             OR parent_store LIKE ? OR parent_store LIKE ?",
        )
        .bind(&raw_pattern)
        .bind(&interior_pattern)
        .bind(&raw_pattern)
        .bind(&interior_pattern)
        .execute(&mut *tx)
        .await
        .map_err(|e| StoreError::StoreError {
            operation: format!("purge_account/delete_parents: {e}"),
        })?;

        sqlx::query("DELETE FROM snapshots WHERE store_id LIKE ? OR store_id LIKE ?")
            .bind(&raw_pattern)
            .bind(&interior_pattern)
            .execute(&mut *tx)
            .await
            .map_err(|e| StoreError::StoreError {
                operation: format!("purge_account/delete_snapshots: {e}"),
            })?;

        tx.commit().await.map_err(|e| StoreError::StoreError {
            operation: format!("purge_account/commit: {e}"),
        })?;

        Ok(distinct_stores.len() as u64)
    }
}

impl SqlStore {
    async fn hydrate(&self, path: &str, row: sqlx::sqlite::SqliteRow) -> Result<Snapshot, StoreError> {
        let version: i64 = row.get("version");
        let payload_json: String = row.get("payload");
        let payload: SnapshotPayload =
            serde_json::from_str(&payload_json).map_err(|e| StoreError::ParseError(e.to_string()))?;
        let tags = self.load_tags(path, version).await?;
        let parents = self.load_parents(path, version).await?;

        Ok(Snapshot {
            store_id: path.to_string(),
            version,
            content_hash: row.get("content_hash"),
            created_at: parse_timestamp(row.get::<String, _>("created_at"))?,
            tags,
            parents,
            payload,
        })
    }

    async fn load_tags(&self, path: &str, version: i64) -> Result<Vec<String>, StoreError> {
        let rows: Vec<(String,)> = sqlx::query_as(
            "SELECT tag FROM snapshot_tags WHERE store_id = ? AND version = ?",
        )
        .bind(path)
        .bind(version)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StoreError::StoreError {
            operation: format!("load_tags: {e}"),
        })?;
        Ok(rows.into_iter().map(|(t,)| t).collect())
    }

    async fn load_parents(
        &self,
        path: &str,
        version: i64,
    ) -> Result<Vec<domain::models::snapshot::ParentRef>, StoreError> {
        let rows: Vec<(String, i64, String)> = sqlx::query_as(
            "SELECT parent_store, parent_version, role FROM snapshot_parents WHERE child_store = ? AND child_version = ?",
        )
        .bind(path)
        .bind(version)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StoreError::StoreError {
            operation: format!("load_parents: {e}"),
        })?;
        Ok(rows
            .into_iter()
            .map(|(store_id, version, role)| domain::models::snapshot::ParentRef {
                store_id,
                version,
                role,
            })
            .collect())
    }
}

async fn insert_parent(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    child_store: &str,
    child_version: i64,
    parent: &ParentLink,
) -> Result<(), StoreError> {
    sqlx::query(
        "INSERT INTO snapshot_parents (child_store, child_version, parent_store, parent_version, role) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(child_store)
    .bind(child_version)
    .bind(&parent.store_id)
    .bind(parent.version)
    .bind(&parent.role)
    .execute(&mut **tx)
    .await
    .map_err(|e| StoreError::StoreError {
        operation: format!("put/parent: {e}"),
    })?;
    Ok(())
}

fn parse_timestamp(raw: String) -> Result<chrono::DateTime<Utc>, StoreError> {
    chrono::DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StoreError::ParseError(e.to_string()))
}
