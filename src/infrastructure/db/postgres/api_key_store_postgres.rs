use crate::infrastructure::db::dto::ApiKeyRow;
use crate::infrastructure::db::postgres::PostgresDatabase;
use crate::infrastructure::db::stores::api_key_store::{ApiKeyRepositoryError, ApiKeyStore};
use async_trait::async_trait;
use sqlx::PgConnection;

#[derive(Clone)]
pub struct ApiKeyStorePostgres {
    db: std::sync::Arc<PostgresDatabase>,
}

impl ApiKeyStorePostgres {
    /// Build a Postgres-backed API key store.
    pub fn new(db: std::sync::Arc<PostgresDatabase>) -> Self {
        Self { db }
    }

    async fn insert_impl_conn(
        conn: &mut PgConnection,
        row: &ApiKeyRow,
    ) -> Result<ApiKeyRow, ApiKeyRepositoryError> {
        let stored = sqlx::query_as::<_, ApiKeyRow>(
            "INSERT INTO api_keys (
                id,
                user_id,
                key_hash,
                key_prefix,
                created_at,
                revoked_at
            )
            VALUES ($1,$2,$3,$4,$5,$6)
            RETURNING
                id,
                user_id,
                key_hash,
                key_prefix,
                created_at,
                revoked_at",
        )
        .bind(row.id)
        .bind(row.user_id)
        .bind(&row.key_hash)
        .bind(&row.key_prefix)
        .bind(row.created_at)
        .bind(row.revoked_at)
        .fetch_one(&mut *conn)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                ApiKeyRepositoryError::Conflict
            }
            _ => ApiKeyRepositoryError::StorageUnavailable,
        })?;

        Ok(stored)
    }

    async fn get_active_by_prefix_and_hash_impl_conn(
        conn: &mut PgConnection,
        key_prefix: &str,
        key_hash: &str,
    ) -> Result<Option<ApiKeyRow>, ApiKeyRepositoryError> {
        let row = sqlx::query_as::<_, ApiKeyRow>(
            "SELECT
                id,
                user_id,
                key_hash,
                key_prefix,
                created_at,
                revoked_at
            FROM api_keys
            WHERE key_prefix = $1
              AND key_hash = $2
              AND revoked_at IS NULL",
        )
        .bind(key_prefix)
        .bind(key_hash)
        .fetch_optional(&mut *conn)
        .await
        .map_err(|_| ApiKeyRepositoryError::StorageUnavailable)?;

        Ok(row)
    }
}

#[async_trait]
impl ApiKeyStore for ApiKeyStorePostgres {
    async fn insert(&self, row: &ApiKeyRow) -> Result<ApiKeyRow, ApiKeyRepositoryError> {
        let row = row.clone();
        self.db
            .with_conn(move |conn| {
                let row = row;
                Box::pin(async move { Self::insert_impl_conn(conn, &row).await })
            })
            .await
    }

    async fn get_active_by_prefix_and_hash(
        &self,
        key_prefix: &str,
        key_hash: &str,
    ) -> Result<Option<ApiKeyRow>, ApiKeyRepositoryError> {
        let key_prefix = key_prefix.to_string();
        let key_hash = key_hash.to_string();
        self.db
            .with_conn(move |conn| {
                Box::pin(async move {
                    Self::get_active_by_prefix_and_hash_impl_conn(conn, &key_prefix, &key_hash)
                        .await
                })
            })
            .await
    }
}
