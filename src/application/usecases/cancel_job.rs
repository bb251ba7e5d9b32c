// Use case: cancel_job.

use crate::application::context::AppContext;
use crate::domain::entities::job::Job;
use crate::domain::value_objects::ids::{JobId, UserId};
use crate::infrastructure::db::stores::job_store::JobRepositoryError;
use metrics::counter;
use tracing::{info, instrument};

/// Cancels one of the caller's pending or processing jobs.
pub struct CancelJobUseCase;

#[derive(Debug)]
pub enum CancelJobError {
    NotFound,
    InvalidState,
    Storage(String),
}

impl CancelJobUseCase {
    #[instrument(skip(ctx))]
    pub async fn execute(
        ctx: &AppContext,
        caller: UserId,
        job_id: JobId,
    ) -> Result<Job, CancelJobError> {
        // Step 1: Guarded update; terminal jobs are left untouched.
        let job = ctx
            .repos
            .job
            .cancel_owned(job_id, caller, ctx.clock.now())
            .await
            .map_err(|e| match e {
                JobRepositoryError::NotFound => CancelJobError::NotFound,
                JobRepositoryError::Conflict => CancelJobError::InvalidState,
                _ => CancelJobError::Storage(format!("{e:?}")),
            })?;

        // Step 2: Record and return the cancelled job.
        counter!("jobs_cancelled_total").increment(1);
        info!(job_id = %job.id, "job_cancelled");
        Ok(job)
    }
}
