use std::sync::Arc;

use crate::infrastructure::db::database::{Database, DatabaseError};
use crate::infrastructure::db::memory::{ApiKeyStoreMemory, JobStoreMemory};
use crate::infrastructure::db::postgres::PostgresDatabase;
use crate::infrastructure::db::postgres::api_key_store_postgres::ApiKeyStorePostgres;
use crate::infrastructure::db::postgres::job_store_postgres::JobStorePostgres;
use crate::infrastructure::db::repositories::api_key_repository::ApiKeyRepository;
use crate::infrastructure::db::repositories::job_repository::JobRepository;
use crate::infrastructure::db::stores::api_key_store::ApiKeyStore;
use crate::infrastructure::db::stores::job_store::JobStore;

/// One credential's view of the store: every repository built over the same connection.
#[derive(Clone)]
pub struct Repositories {
    pub db: Option<Arc<PostgresDatabase>>,
    pub job: Arc<JobRepository>,
    pub api_key: Arc<ApiKeyRepository>,
}

impl Repositories {
    /// Build all repositories backed by Postgres stores.
    pub fn postgres(db: Arc<PostgresDatabase>) -> Self {
        let job_store = Arc::new(JobStorePostgres::new(db.clone()));
        let api_key_store = Arc::new(ApiKeyStorePostgres::new(db.clone()));

        Self {
            db: Some(db),
            job: Arc::new(JobRepository::new(job_store)),
            api_key: Arc::new(ApiKeyRepository::new(api_key_store)),
        }
    }

    /// Build repositories over fresh process-local stores.
    pub fn in_memory() -> Self {
        Self::from_stores(
            Arc::new(JobStoreMemory::new()),
            Arc::new(ApiKeyStoreMemory::new()),
        )
    }

    /// Build repositories over arbitrary store implementations.
    pub fn from_stores(job_store: Arc<dyn JobStore>, api_key_store: Arc<dyn ApiKeyStore>) -> Self {
        Self {
            db: None,
            job: Arc::new(JobRepository::new(job_store)),
            api_key: Arc::new(ApiKeyRepository::new(api_key_store)),
        }
    }

    /// Round-trip to the database, if there is one.
    pub async fn ping(&self) -> Result<(), DatabaseError> {
        let Some(db) = self.db.as_ref() else {
            return Ok(());
        };
        db.ping().await
    }
}
