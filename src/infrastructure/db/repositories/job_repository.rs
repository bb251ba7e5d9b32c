use crate::domain::entities::job::Job;
use crate::domain::value_objects::ids::{JobId, UserId};
use crate::domain::value_objects::timestamps::Timestamp;
use crate::infrastructure::db::dto::JobRow;
use crate::infrastructure::db::stores::job_store::{JobRepositoryError, JobStore};
use std::sync::Arc;

/// Entity-level access to the job table.
pub struct JobRepository {
    store: Arc<dyn JobStore>,
}

impl JobRepository {
    /// Build a repository that uses the given store implementation.
    pub fn new(store: Arc<dyn JobStore>) -> Self {
        Self { store }
    }

    /// Create a job and return what was actually stored.
    pub async fn insert(&self, job: &Job) -> Result<Job, JobRepositoryError> {
        let stored = self.store.insert(&JobRow::from_job(job)).await?;
        stored.into_job()
    }

    /// Fetch a job by its ID. Returns `None` if it doesn't exist.
    pub async fn get(&self, job_id: JobId) -> Result<Option<Job>, JobRepositoryError> {
        self.store.get(job_id.0).await?.map(JobRow::into_job).transpose()
    }

    /// Fetch a job the caller owns. Foreign jobs look exactly like missing ones.
    pub async fn get_for_user(
        &self,
        job_id: JobId,
        user_id: UserId,
    ) -> Result<Option<Job>, JobRepositoryError> {
        self.store
            .get_for_user(job_id.0, user_id.0)
            .await?
            .map(JobRow::into_job)
            .transpose()
    }

    pub async fn delete(&self, job_id: JobId) -> Result<(), JobRepositoryError> {
        self.store.delete(job_id.0).await
    }

    /// The caller's most recent jobs, newest first.
    pub async fn list_for_user(
        &self,
        user_id: UserId,
        limit: u32,
    ) -> Result<Vec<Job>, JobRepositoryError> {
        self.store
            .list_for_user(user_id.0, limit)
            .await?
            .into_iter()
            .map(JobRow::into_job)
            .collect()
    }

    /// Claim the next eligible job; `stalled_before` bounds how old a heartbeat may be.
    pub async fn claim_next(
        &self,
        now: Timestamp,
        stalled_before: Timestamp,
    ) -> Result<Option<Job>, JobRepositoryError> {
        self.store
            .claim_next(now.as_inner(), stalled_before.as_inner())
            .await?
            .map(JobRow::into_job)
            .transpose()
    }

    pub async fn heartbeat(
        &self,
        job_id: JobId,
        claim_token: u32,
        at: Timestamp,
    ) -> Result<bool, JobRepositoryError> {
        let token = i32::try_from(claim_token).map_err(|_| JobRepositoryError::InvalidInput)?;
        self.store.heartbeat(job_id.0, token, at.as_inner()).await
    }

    /// Write the outcome of an attempt; `None` when the claim was lost meanwhile.
    pub async fn finish(
        &self,
        job: &Job,
        claim_token: u32,
    ) -> Result<Option<Job>, JobRepositoryError> {
        let token = i32::try_from(claim_token).map_err(|_| JobRepositoryError::InvalidInput)?;
        self.store
            .finish(&JobRow::from_job(job), token)
            .await?
            .map(JobRow::into_job)
            .transpose()
    }

    pub async fn retry_owned(
        &self,
        job_id: JobId,
        user_id: UserId,
        now: Timestamp,
    ) -> Result<Job, JobRepositoryError> {
        self.store
            .retry_owned(job_id.0, user_id.0, now.as_inner())
            .await?
            .into_job()
    }

    pub async fn cancel_owned(
        &self,
        job_id: JobId,
        user_id: UserId,
        now: Timestamp,
    ) -> Result<Job, JobRepositoryError> {
        self.store
            .cancel_owned(job_id.0, user_id.0, now.as_inner())
            .await?
            .into_job()
    }
}
