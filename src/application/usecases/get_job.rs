// Use case: get_job.

use crate::application::context::AppContext;
use crate::domain::entities::job::Job;
use crate::domain::value_objects::ids::{JobId, UserId};

/// Fetches one of the caller's jobs.
pub struct GetJobUseCase;

#[derive(Debug)]
pub enum GetJobError {
    NotFound,
    Storage(String),
}

impl GetJobUseCase {
    pub async fn execute(
        ctx: &AppContext,
        caller: UserId,
        job_id: JobId,
    ) -> Result<Job, GetJobError> {
        // Step 1: Fetch scoped to the owner; foreign jobs read as missing.
        let job = ctx
            .repos
            .job
            .get_for_user(job_id, caller)
            .await
            .map_err(|e| GetJobError::Storage(format!("{e:?}")))?;

        // Step 2: Return NotFound when missing.
        job.ok_or(GetJobError::NotFound)
    }
}
