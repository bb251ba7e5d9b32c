// Use case: claim_next_job.

use crate::application::context::WorkerContext;
use crate::domain::entities::job::Job;
use metrics::counter;
use tracing::{info, instrument};

/// Claims the next eligible job (due `pending`, or `processing` with a stale heartbeat).
pub struct ClaimNextJobUseCase;

#[derive(Debug)]
pub enum ClaimNextJobError {
    Storage(String),
}

impl ClaimNextJobUseCase {
    #[instrument(skip(ctx))]
    pub async fn execute(ctx: &WorkerContext) -> Result<Option<Job>, ClaimNextJobError> {
        // Step 1: Anything with a heartbeat older than this counts as stalled.
        let now = ctx.clock.now();
        let stalled_before = now.plus(-ctx.config.stall_threshold);

        // Step 2: Atomically claim the best candidate.
        let claimed = ctx
            .repos
            .job
            .claim_next(now, stalled_before)
            .await
            .map_err(|e| ClaimNextJobError::Storage(format!("{e:?}")))?;

        // Step 3: Log the claim; a reclaim shows up as attempts > 1.
        if let Some(job) = &claimed {
            counter!("jobs_claimed_total", "job_type" => job.job_type.as_str()).increment(1);
            info!(
                job_id = %job.id,
                job_type = job.job_type.as_str(),
                processing_attempts = job.processing_attempts,
                "job_claimed"
            );
        }

        Ok(claimed)
    }
}
