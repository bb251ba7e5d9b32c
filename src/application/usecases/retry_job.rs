// Use case: retry_job.

use crate::application::context::AppContext;
use crate::domain::entities::job::Job;
use crate::domain::value_objects::ids::{JobId, UserId};
use crate::infrastructure::db::stores::job_store::JobRepositoryError;
use metrics::counter;
use tracing::{info, instrument};

/// Puts one of the caller's failed jobs back in the queue with fresh counters.
pub struct RetryJobUseCase;

#[derive(Debug)]
pub enum RetryJobError {
    NotFound,
    InvalidState,
    Storage(String),
}

impl RetryJobUseCase {
    #[instrument(skip(ctx))]
    pub async fn execute(
        ctx: &AppContext,
        caller: UserId,
        job_id: JobId,
    ) -> Result<Job, RetryJobError> {
        // Step 1: Guarded failed -> pending update scoped to the owner.
        let job = ctx
            .repos
            .job
            .retry_owned(job_id, caller, ctx.clock.now())
            .await
            .map_err(|e| match e {
                JobRepositoryError::NotFound => RetryJobError::NotFound,
                JobRepositoryError::Conflict => RetryJobError::InvalidState,
                _ => RetryJobError::Storage(format!("{e:?}")),
            })?;

        // Step 2: Record and return the re-queued job.
        counter!("jobs_retried_total").increment(1);
        info!(job_id = %job.id, "job_retry_requested");
        Ok(job)
    }
}

#[cfg(test)]
mod tests {
    use super::{RetryJobError, RetryJobUseCase};
    use crate::application::context::test_support::memory_context;
    use crate::application::usecases::create_job::{CreateJobCommand, CreateJobUseCase};
    use crate::domain::entities::job::{Job, JobStatus};
    use crate::domain::value_objects::ids::UserId;
    use serde_json::json;

    async fn failed_job(ctx: &crate::application::context::AppContext, owner: UserId) -> Job {
        let job = CreateJobUseCase::execute(
            ctx,
            CreateJobCommand {
                caller: Some(owner),
                job_type: "story_generation".to_string(),
                parameters: json!({ "topic": "otters", "level": "C1" }),
                priority: None,
            },
        )
        .await
        .unwrap();
        let now = ctx.clock.now();
        let mut claimed = ctx.repos.job.claim_next(now, now).await.unwrap().unwrap();
        assert_eq!(claimed.id, job.id);
        let token = claimed.processing_attempts;
        claimed.retry_count = 3;
        claimed
            .fail(
                "provider down".to_string(),
                Some(json!({ "kind": "transient" })),
                now,
            )
            .unwrap();
        ctx.repos.job.finish(&claimed, token).await.unwrap().unwrap()
    }

    #[tokio::test]
    async fn given_owned_failed_job_when_execute_should_reset_and_requeue() {
        let ctx = memory_context();
        let owner = UserId::new();
        let failed = failed_job(&ctx, owner).await;

        let retried = RetryJobUseCase::execute(&ctx, owner, failed.id).await.unwrap();

        assert_eq!(retried.status, JobStatus::Pending);
        assert_eq!(retried.retry_count, 0);
        assert_eq!(retried.error_message, None);
        assert_eq!(retried.error_details, None);
        assert_eq!(retried.completed_at, None);
        assert_eq!(retried.available_at, None);

        let now = ctx.clock.now();
        let reclaimed = ctx.repos.job.claim_next(now, now).await.unwrap();
        assert_eq!(reclaimed.map(|j| j.id), Some(failed.id));
    }

    #[tokio::test]
    async fn given_foreign_job_when_execute_should_return_not_found() {
        let ctx = memory_context();
        let failed = failed_job(&ctx, UserId::new()).await;

        let result = RetryJobUseCase::execute(&ctx, UserId::new(), failed.id).await;

        assert!(matches!(result, Err(RetryJobError::NotFound)));
        let unchanged = ctx.repos.job.get(failed.id).await.unwrap().unwrap();
        assert_eq!(unchanged.status, JobStatus::Failed);
    }

    #[tokio::test]
    async fn given_pending_job_when_execute_should_return_invalid_state() {
        let ctx = memory_context();
        let owner = UserId::new();
        let job = CreateJobUseCase::execute(
            &ctx,
            CreateJobCommand {
                caller: Some(owner),
                job_type: "story_generation".to_string(),
                parameters: json!({ "topic": "otters", "level": "A2" }),
                priority: None,
            },
        )
        .await
        .unwrap();

        let result = RetryJobUseCase::execute(&ctx, owner, job.id).await;

        assert!(matches!(result, Err(RetryJobError::InvalidState)));
    }
}
