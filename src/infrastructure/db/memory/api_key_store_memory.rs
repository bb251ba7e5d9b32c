use crate::infrastructure::db::dto::ApiKeyRow;
use crate::infrastructure::db::stores::api_key_store::{ApiKeyRepositoryError, ApiKeyStore};
use async_trait::async_trait;
use std::sync::Mutex;

#[derive(Default)]
pub struct ApiKeyStoreMemory {
    rows: Mutex<Vec<ApiKeyRow>>,
}

impl ApiKeyStoreMemory {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ApiKeyStore for ApiKeyStoreMemory {
    async fn insert(&self, row: &ApiKeyRow) -> Result<ApiKeyRow, ApiKeyRepositoryError> {
        let mut rows = self.rows.lock().unwrap_or_else(|p| p.into_inner());
        if rows.iter().any(|existing| existing.id == row.id) {
            return Err(ApiKeyRepositoryError::Conflict);
        }
        rows.push(row.clone());
        Ok(row.clone())
    }

    async fn get_active_by_prefix_and_hash(
        &self,
        key_prefix: &str,
        key_hash: &str,
    ) -> Result<Option<ApiKeyRow>, ApiKeyRepositoryError> {
        let rows = self.rows.lock().unwrap_or_else(|p| p.into_inner());
        Ok(rows
            .iter()
            .find(|row| row.is_active() && row.key_prefix == key_prefix && row.key_hash == key_hash)
            .cloned())
    }
}
