use crate::infrastructure::db::database::DatabaseError;
use crate::infrastructure::db::dto::ApiKeyRow;
use async_trait::async_trait;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiKeyRepositoryError {
    NotFound,
    Conflict,
    StorageUnavailable,
}

impl From<DatabaseError> for ApiKeyRepositoryError {
    fn from(_: DatabaseError) -> Self {
        ApiKeyRepositoryError::StorageUnavailable
    }
}

#[async_trait]
pub trait ApiKeyStore: Send + Sync {
    /// Create an API key and return exactly what was stored.
    async fn insert(&self, row: &ApiKeyRow) -> Result<ApiKeyRow, ApiKeyRepositoryError>;
    /// Fetch an active API key by prefix+hash (used for auth).
    async fn get_active_by_prefix_and_hash(
        &self,
        key_prefix: &str,
        key_hash: &str,
    ) -> Result<Option<ApiKeyRow>, ApiKeyRepositoryError>;
}
