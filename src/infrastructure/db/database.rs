use async_trait::async_trait;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("could not reach the database: {0}")]
    Connection(String),

    #[error("statement failed: {0}")]
    Query(String),
}

/// Connection-level operations shared by every store backed by one database.
#[async_trait]
pub trait Database: Send + Sync {
    /// Cheapest possible round-trip, used by readiness checks.
    async fn ping(&self) -> Result<(), DatabaseError>;
}
