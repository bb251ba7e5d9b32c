// Use case: heartbeat_job.

use crate::application::context::WorkerContext;
use crate::domain::value_objects::ids::JobId;

/// Refreshes `last_heartbeat_at` for a job the worker still holds.
pub struct HeartbeatJobUseCase;

#[derive(Debug)]
pub enum HeartbeatJobError {
    Storage(String),
}

impl HeartbeatJobUseCase {
    /// Returns `false` once the claim is gone (cancelled or reclaimed elsewhere).
    pub async fn execute(
        ctx: &WorkerContext,
        job_id: JobId,
        claim_token: u32,
    ) -> Result<bool, HeartbeatJobError> {
        // Step 1: Ask the repository to record the heartbeat under our token.
        ctx.repos
            .job
            .heartbeat(job_id, claim_token, ctx.clock.now())
            .await
            .map_err(|e| HeartbeatJobError::Storage(format!("{e:?}")))
    }
}

#[cfg(test)]
mod tests {
    use super::HeartbeatJobUseCase;
    use crate::application::context::test_support::{memory_context, memory_worker};
    use crate::application::usecases::claim_next_job::ClaimNextJobUseCase;
    use crate::application::usecases::create_job::{CreateJobCommand, CreateJobUseCase};
    use crate::domain::value_objects::ids::UserId;
    use crate::infrastructure::producers::ScriptedProducer;
    use serde_json::json;
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn given_current_token_when_execute_should_move_heartbeat_forward() {
        let ctx = memory_context();
        let worker = memory_worker(&ctx, Arc::new(ScriptedProducer::new()));
        CreateJobUseCase::execute(
            &ctx,
            CreateJobCommand {
                caller: Some(UserId::new()),
                job_type: "story_generation".to_string(),
                parameters: json!({ "topic": "otters", "level": "A2" }),
                priority: None,
            },
        )
        .await
        .unwrap();
        let claimed = ClaimNextJobUseCase::execute(&worker).await.unwrap().unwrap();
        tokio::time::advance(std::time::Duration::from_secs(30)).await;

        let fresh = HeartbeatJobUseCase::execute(&worker, claimed.id, claimed.processing_attempts)
            .await
            .unwrap();
        let stale =
            HeartbeatJobUseCase::execute(&worker, claimed.id, claimed.processing_attempts + 1)
                .await
            .unwrap();

        assert!(fresh);
        assert!(!stale);
        let stored = ctx.repos.job.get(claimed.id).await.unwrap().unwrap();
        assert!(stored.last_heartbeat_at > claimed.last_heartbeat_at);
    }
}
