use crate::infrastructure::db::database::DatabaseError;
use crate::infrastructure::db::dto::JobRow;
use async_trait::async_trait;
use time::OffsetDateTime;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobRepositoryError {
    NotFound,
    Conflict,
    InvalidInput,
    StorageUnavailable,
}

impl From<DatabaseError> for JobRepositoryError {
    fn from(_: DatabaseError) -> Self {
        JobRepositoryError::StorageUnavailable
    }
}

/// Durable job table.
///
/// Operations taking a `user_id` only ever touch rows owned by that user.
/// `claim_token` is the `processing_attempts` value a worker observed when it
/// claimed the row; writes carrying a stale token are refused.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Fetch a job by its ID. Returns `None` if it doesn't exist.
    async fn get(&self, job_id: uuid::Uuid) -> Result<Option<JobRow>, JobRepositoryError>;
    /// Fetch a job only if `user_id` owns it.
    async fn get_for_user(
        &self,
        job_id: uuid::Uuid,
        user_id: uuid::Uuid,
    ) -> Result<Option<JobRow>, JobRepositoryError>;
    /// Create a job and return exactly what was stored.
    async fn insert(&self, row: &JobRow) -> Result<JobRow, JobRepositoryError>;
    /// Delete a job by its ID. Returns `NotFound` if it doesn't exist.
    async fn delete(&self, job_id: uuid::Uuid) -> Result<(), JobRepositoryError>;
    /// Most recent jobs of a user, newest first.
    async fn list_for_user(
        &self,
        user_id: uuid::Uuid,
        limit: u32,
    ) -> Result<Vec<JobRow>, JobRepositoryError>;
    /// Atomically claim the best eligible job: a due `pending` row, or a
    /// `processing` row whose heartbeat is older than `stalled_before`.
    async fn claim_next(
        &self,
        now: OffsetDateTime,
        stalled_before: OffsetDateTime,
    ) -> Result<Option<JobRow>, JobRepositoryError>;
    /// Refresh the heartbeat; `false` when the claim is no longer held.
    async fn heartbeat(
        &self,
        job_id: uuid::Uuid,
        claim_token: i32,
        at: OffsetDateTime,
    ) -> Result<bool, JobRepositoryError>;
    /// Persist the outcome of a processing attempt; `None` when the claim was lost.
    async fn finish(
        &self,
        row: &JobRow,
        claim_token: i32,
    ) -> Result<Option<JobRow>, JobRepositoryError>;
    /// Move an owned `failed` job back to `pending` with cleared counters.
    /// `NotFound` for missing/foreign jobs, `Conflict` for any other status.
    async fn retry_owned(
        &self,
        job_id: uuid::Uuid,
        user_id: uuid::Uuid,
        now: OffsetDateTime,
    ) -> Result<JobRow, JobRepositoryError>;
    /// Cancel an owned `pending` or `processing` job.
    /// `NotFound` for missing/foreign jobs, `Conflict` for any other status.
    async fn cancel_owned(
        &self,
        job_id: uuid::Uuid,
        user_id: uuid::Uuid,
        now: OffsetDateTime,
    ) -> Result<JobRow, JobRepositoryError>;
}
