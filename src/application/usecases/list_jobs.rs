// Use case: list_jobs.

use crate::application::context::AppContext;
use crate::domain::entities::job::Job;
use crate::domain::value_objects::ids::UserId;

pub const DEFAULT_LIST_LIMIT: u32 = 50;
pub const MAX_LIST_LIMIT: u32 = 100;

/// Lists the caller's most recent jobs, newest first.
pub struct ListJobsUseCase;

#[derive(Debug)]
pub enum ListJobsError {
    Storage(String),
}

impl ListJobsUseCase {
    pub async fn execute(
        ctx: &AppContext,
        caller: UserId,
        limit: Option<u32>,
    ) -> Result<Vec<Job>, ListJobsError> {
        // Step 1: Clamp the page size.
        let limit = limit.unwrap_or(DEFAULT_LIST_LIMIT).clamp(1, MAX_LIST_LIMIT);

        // Step 2: Read the caller's jobs only.
        ctx.repos
            .job
            .list_for_user(caller, limit)
            .await
            .map_err(|e| ListJobsError::Storage(format!("{e:?}")))
    }
}
