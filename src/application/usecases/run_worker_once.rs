// Use case: run_worker_once.

use crate::application::context::WorkerContext;
use crate::application::usecases::claim_next_job::ClaimNextJobUseCase;
use crate::application::usecases::heartbeat_job::HeartbeatJobUseCase;
use crate::domain::entities::job::{Job, JobType};
use crate::domain::services::content_producer::ProducerError;
use crate::domain::value_objects::timestamps::Timestamp;
use crate::domain::workflows::job_catalog::JobCatalog;
use crate::domain::workflows::retry_policy::RetryPolicy;
use crate::domain::workflows::state_machine::TransitionError;
use metrics::{counter, histogram};
use serde_json::{Value, json};
use std::collections::HashMap;
use time::Duration;
use tokio::time::MissedTickBehavior;
use tracing::{info, instrument, warn};

/// Configuration for claiming, executing, and retrying jobs.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// A `processing` job whose heartbeat is older than this is reclaimable.
    pub stall_threshold: Duration,
    pub heartbeat_interval: std::time::Duration,
    pub retry_policy: RetryPolicy,
    /// Stall reclaims tolerated before the job is failed instead of run again.
    pub max_processing_attempts: u32,
    pub max_jobs_per_tick: u32,
    pub max_inline_backoff: std::time::Duration,
    /// Minimum gap between the end of one job of a type and the start of the next.
    pub spacing: HashMap<JobType, std::time::Duration>,
}

impl WorkerConfig {
    pub fn default_spacing() -> HashMap<JobType, std::time::Duration> {
        JobType::ALL
            .into_iter()
            .map(|t| (t, JobCatalog::profile(t).default_spacing.unsigned_abs()))
            .collect()
    }
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            stall_threshold: Duration::minutes(5),
            heartbeat_interval: std::time::Duration::from_secs(30),
            retry_policy: RetryPolicy::default(),
            max_processing_attempts: 10,
            max_jobs_per_tick: 1,
            max_inline_backoff: std::time::Duration::from_secs(15),
            spacing: Self::default_spacing(),
        }
    }
}

/// How a single claimed job ended for this attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum ExecutionOutcome {
    Completed,
    /// Provider asked us to back off; no retry was counted.
    Deferred { retry_after: Duration },
    /// Transient failure with retry budget left.
    Requeued {
        retry_count: u32,
        available_at: Timestamp,
    },
    Failed { reason: String },
    /// The claim was lost (cancelled or reclaimed) before the result was written.
    Abandoned,
}

impl ExecutionOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionOutcome::Completed => "completed",
            ExecutionOutcome::Deferred { .. } => "deferred",
            ExecutionOutcome::Requeued { .. } => "requeued",
            ExecutionOutcome::Failed { .. } => "failed",
            ExecutionOutcome::Abandoned => "abandoned",
        }
    }
}

/// Claims and executes a single job from the queue (if any is eligible).
pub struct RunWorkerOnceUseCase;

#[derive(Debug)]
pub enum RunWorkerOnceError {
    Storage(String),
    Transition(TransitionError),
}

#[derive(Debug)]
pub struct RunWorkerOnceResult {
    /// Stored state after the attempt; the local view when the write was dropped.
    pub job: Job,
    pub outcome: ExecutionOutcome,
}

impl RunWorkerOnceUseCase {
    #[instrument(skip(ctx))]
    pub async fn execute(
        ctx: &WorkerContext,
    ) -> Result<Option<RunWorkerOnceResult>, RunWorkerOnceError> {
        // Step 1: Claim the next eligible job.
        let claimed = ClaimNextJobUseCase::execute(ctx)
            .await
            .map_err(|e| RunWorkerOnceError::Storage(format!("{e:?}")))?;
        let Some(mut job) = claimed else {
            return Ok(None);
        };
        let claim_token = job.processing_attempts;

        // Step 2: A job that keeps getting abandoned is not run again.
        if job.abandoned_count >= ctx.config.max_processing_attempts {
            let reason = format!(
                "job abandoned {} times without finishing",
                job.abandoned_count
            );
            job.fail(
                reason.clone(),
                Some(json!({ "kind": "abandoned", "abandoned_count": job.abandoned_count })),
                ctx.clock.now(),
            )
            .map_err(RunWorkerOnceError::Transition)?;
            let outcome = ExecutionOutcome::Failed { reason };
            return Self::finish(ctx, job, claim_token, outcome).await.map(Some);
        }

        // Step 3: Respect the per-type spacing before calling the producer.
        ctx.throttle.wait_turn(job.job_type).await;

        // Step 4: Dispatch while keeping the heartbeat fresh.
        let started = tokio::time::Instant::now();
        let produced = Self::dispatch_with_heartbeat(ctx, &job, claim_token).await;
        ctx.throttle.record_finished(job.job_type);
        histogram!("job_execution_seconds", "job_type" => job.job_type.as_str())
            .record(started.elapsed().as_secs_f64());

        // Step 5: Map the producer result onto the job.
        let outcome = Self::apply_result(ctx, &mut job, claim_token, produced)
            .map_err(RunWorkerOnceError::Transition)?;

        // Step 6: Persist conditionally on our claim.
        Self::finish(ctx, job, claim_token, outcome).await.map(Some)
    }

    async fn dispatch_with_heartbeat(
        ctx: &WorkerContext,
        job: &Job,
        claim_token: u32,
    ) -> Result<Value, ProducerError> {
        let dispatch = ctx.handlers.dispatch(job);
        tokio::pin!(dispatch);

        let period = ctx
            .config
            .heartbeat_interval
            .max(std::time::Duration::from_millis(100));
        let mut beat = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
        beat.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                produced = &mut dispatch => return produced,
                _ = beat.tick() => {
                    match HeartbeatJobUseCase::execute(ctx, job.id, claim_token).await {
                        Ok(true) => {}
                        Ok(false) => warn!(job_id = %job.id, "job_claim_lost"),
                        Err(e) => warn!(job_id = %job.id, error = ?e, "job_heartbeat_failed"),
                    }
                }
            }
        }
    }

    fn apply_result(
        ctx: &WorkerContext,
        job: &mut Job,
        claim_token: u32,
        produced: Result<Value, ProducerError>,
    ) -> Result<ExecutionOutcome, TransitionError> {
        let now = ctx.clock.now();
        let error = match produced {
            Ok(result) => {
                job.complete(result, now)?;
                return Ok(ExecutionOutcome::Completed);
            }
            Err(error) => error,
        };

        let details = json!({
            "kind": error.kind(),
            "job_type": job.job_type.as_str(),
            "processing_attempts": claim_token,
        });

        match error {
            ProducerError::Transient {
                retry_after: Some(hint),
                ..
            } => {
                job.requeue(Some(now.plus(hint)), now)?;
                Ok(ExecutionOutcome::Deferred { retry_after: hint })
            }
            ProducerError::Transient {
                message,
                retry_after: None,
            } => {
                // A zero budget fails on the first error; the count never passes the budget.
                if job.retry_count < job.max_retries {
                    job.retry_count += 1;
                }
                if job.retry_count < job.max_retries {
                    let delay = ctx.config.retry_policy.backoff_for(job.id, job.retry_count);
                    let available_at = now.plus(delay);
                    job.requeue(Some(available_at), now)?;
                    Ok(ExecutionOutcome::Requeued {
                        retry_count: job.retry_count,
                        available_at,
                    })
                } else {
                    job.fail(message.clone(), Some(details), now)?;
                    Ok(ExecutionOutcome::Failed { reason: message })
                }
            }
            ProducerError::Terminal { reason } => {
                job.fail(reason.clone(), Some(details), now)?;
                Ok(ExecutionOutcome::Failed { reason })
            }
        }
    }

    async fn finish(
        ctx: &WorkerContext,
        job: Job,
        claim_token: u32,
        outcome: ExecutionOutcome,
    ) -> Result<RunWorkerOnceResult, RunWorkerOnceError> {
        let stored = ctx
            .repos
            .job
            .finish(&job, claim_token)
            .await
            .map_err(|e| RunWorkerOnceError::Storage(format!("{e:?}")))?;

        let Some(stored) = stored else {
            counter!("jobs_abandoned_total", "job_type" => job.job_type.as_str()).increment(1);
            warn!(
                job_id = %job.id,
                discarded = outcome.as_str(),
                "job_result_dropped"
            );
            return Ok(RunWorkerOnceResult {
                job,
                outcome: ExecutionOutcome::Abandoned,
            });
        };

        let job_type = stored.job_type.as_str();
        counter!("jobs_processed_total", "job_type" => job_type).increment(1);
        match &outcome {
            ExecutionOutcome::Completed => {
                counter!("jobs_completed_total", "job_type" => job_type).increment(1)
            }
            ExecutionOutcome::Failed { .. } => {
                counter!("jobs_failed_total", "job_type" => job_type).increment(1)
            }
            ExecutionOutcome::Deferred { .. } => {
                counter!("jobs_deferred_total", "job_type" => job_type).increment(1)
            }
            ExecutionOutcome::Requeued { .. } => {
                counter!("jobs_requeued_total", "job_type" => job_type).increment(1)
            }
            ExecutionOutcome::Abandoned => {}
        }
        info!(
            job_id = %stored.id,
            job_type,
            status = stored.status.as_str(),
            outcome = outcome.as_str(),
            retry_count = stored.retry_count,
            "job_execution_complete"
        );

        Ok(RunWorkerOnceResult {
            job: stored,
            outcome,
        })
    }
}
