// Use case: issue_api_key.

use crate::application::context::AppContext;
use crate::application::shared::api_key_helpers::generate_api_key;
use crate::domain::value_objects::ids::{ApiKeyId, UserId};
use crate::infrastructure::db::dto::ApiKeyRow;
use tracing::info;

/// Issues a fresh API key for a user. Only the hash is stored.
pub struct IssueApiKeyUseCase;

#[derive(Debug, Clone)]
pub struct IssuedApiKey {
    pub key_id: ApiKeyId,
    pub user_id: UserId,
    /// Returned once; never persisted.
    pub api_key: String,
    pub key_prefix: String,
}

#[derive(Debug)]
pub enum IssueApiKeyError {
    Storage(String),
}

impl IssueApiKeyUseCase {
    pub async fn execute(
        ctx: &AppContext,
        user_id: UserId,
    ) -> Result<IssuedApiKey, IssueApiKeyError> {
        // Step 1: Generate the raw key and its lookup fields.
        let (api_key, key_prefix, key_hash) = generate_api_key();
        let row = ApiKeyRow {
            id: uuid::Uuid::new_v4(),
            user_id: user_id.0,
            key_hash,
            key_prefix: key_prefix.clone(),
            created_at: ctx.clock.now().into_inner(),
            revoked_at: None,
        };

        // Step 2: Persist the hashed key.
        let stored = ctx
            .repos
            .api_key
            .insert(&row)
            .await
            .map_err(|e| IssueApiKeyError::Storage(format!("{e:?}")))?;

        info!(user_id = %user_id, key_prefix = %key_prefix, "api_key_issued");

        // Step 3: Hand back the raw key.
        Ok(IssuedApiKey {
            key_id: ApiKeyId(stored.id),
            user_id,
            api_key,
            key_prefix,
        })
    }
}
