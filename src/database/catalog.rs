use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    catalog::FileCatalog,
    errors::Result,
    models::{FileRecord, NewFileRecord},
};

/// Postgres-backed file catalog.
pub struct PgFileCatalog {
    pool: PgPool,
}

impl PgFileCatalog {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl FileCatalog for PgFileCatalog {
    async fn create(&self, record: NewFileRecord) -> Result<FileRecord> {
        let created = sqlx::query_as::<_, FileRecord>(
            r#"
            INSERT INTO files (id, owner_id, key, original_name, size_bytes, content_type, provider_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id, owner_id, key, original_name, size_bytes, content_type, provider_id, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(record.owner_id)
        .bind(&record.key)
        .bind(&record.original_name)
        .bind(record.size_bytes)
        .bind(&record.content_type)
        .bind(&record.provider_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(created)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<FileRecord>> {
        let record = sqlx::query_as::<_, FileRecord>(
            r#"
            SELECT id, owner_id, key, original_name, size_bytes, content_type, provider_id, created_at
            FROM files
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    async fn list_by_owner(&self, owner_id: Uuid) -> Result<Vec<FileRecord>> {
        let records = sqlx::query_as::<_, FileRecord>(
            r#"
            SELECT id, owner_id, key, original_name, size_bytes, content_type, provider_id, created_at
            FROM files
            WHERE owner_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        sqlx::query("DELETE FROM files WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}
