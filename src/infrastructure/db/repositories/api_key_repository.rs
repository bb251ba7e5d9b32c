use crate::infrastructure::db::dto::ApiKeyRow;
use crate::infrastructure::db::stores::api_key_store::{ApiKeyRepositoryError, ApiKeyStore};
use std::sync::Arc;

pub struct ApiKeyRepository {
    store: Arc<dyn ApiKeyStore>,
}

impl ApiKeyRepository {
    /// Build a repository that uses the given store implementation.
    pub fn new(store: Arc<dyn ApiKeyStore>) -> Self {
        Self { store }
    }

    /// Create an API key and return what was actually stored.
    pub async fn insert(&self, row: &ApiKeyRow) -> Result<ApiKeyRow, ApiKeyRepositoryError> {
        self.store.insert(row).await
    }

    /// Fetch an active key by prefix+hash. Returns `None` for unknown or revoked keys.
    pub async fn get_active_by_prefix_and_hash(
        &self,
        key_prefix: &str,
        key_hash: &str,
    ) -> Result<Option<ApiKeyRow>, ApiKeyRepositoryError> {
        self.store
            .get_active_by_prefix_and_hash(key_prefix, key_hash)
            .await
    }
}
