//! SQLite-backed Asset Directory

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use crate::models::{AssetMetadata, AssetRecord};
use crate::services::{AssetDirectory, DirectoryError};

/// Asset Directory stored in the local `assets` table
#[derive(Clone)]
pub struct SqliteAssetDirectory {
    pool: SqlitePool,
}

impl SqliteAssetDirectory {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn record_from_row(row: &SqliteRow) -> Result<AssetRecord, DirectoryError> {
    let id: String = row.try_get("id")?;
    let id = Uuid::parse_str(&id).map_err(|e| sqlx::Error::Decode(Box::new(e)))?;
    let files: String = row.try_get("files")?;
    let score: i64 = row.try_get("score")?;
    let created_at: DateTime<Utc> = row.try_get("created_at")?;

    Ok(AssetRecord {
        id,
        metadata: AssetMetadata {
            name: row.try_get("name")?,
            description: row.try_get("description")?,
            asset_type: row.try_get("asset_type")?,
            value: row.try_get("value")?,
        },
        status: row.try_get("status")?,
        score: score.clamp(0, 100) as u8,
        owner: row.try_get("owner")?,
        token_id: row.try_get("token_id")?,
        transaction_ref: row.try_get("transaction_ref")?,
        files: serde_json::from_str(&files)?,
        created_at,
    })
}

#[async_trait]
impl AssetDirectory for SqliteAssetDirectory {
    async fn create(&self, record: &AssetRecord) -> Result<(), DirectoryError> {
        let files = serde_json::to_string(&record.files)?;

        sqlx::query(
            r#"
            INSERT INTO assets (
                id, name, description, asset_type, value,
                status, score, owner, token_id, transaction_ref,
                files, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(record.id.to_string())
        .bind(&record.metadata.name)
        .bind(&record.metadata.description)
        .bind(&record.metadata.asset_type)
        .bind(&record.metadata.value)
        .bind(&record.status)
        .bind(record.score as i64)
        .bind(&record.owner)
        .bind(&record.token_id)
        .bind(&record.transaction_ref)
        .bind(files)
        .bind(record.created_at)
        .execute(&self.pool)
        .await?;

        tracing::info!(
            asset_id = %record.id,
            token_id = %record.token_id,
            owner = %record.owner,
            "Asset record stored in directory"
        );

        Ok(())
    }

    async fn list(&self, owner: Option<&str>) -> Result<Vec<AssetRecord>, DirectoryError> {
        let rows = match owner {
            Some(owner) => {
                sqlx::query("SELECT * FROM assets WHERE owner = ? ORDER BY created_at DESC")
                    .bind(owner)
                    .fetch_all(&self.pool)
                    .await?
            }
            None => {
                sqlx::query("SELECT * FROM assets ORDER BY created_at DESC")
                    .fetch_all(&self.pool)
                    .await?
            }
        };

        rows.iter().map(record_from_row).collect()
    }
}
