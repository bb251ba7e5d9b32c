// Use case: worker_tick.

use crate::application::context::WorkerContext;
use crate::application::usecases::run_worker_once::{
    ExecutionOutcome, RunWorkerOnceError, RunWorkerOnceResult, RunWorkerOnceUseCase,
};
use tracing::{debug, info, instrument};

/// One scheduler invocation: processes up to `max_jobs_per_tick` jobs, one at a time.
pub struct WorkerTickUseCase;

#[derive(Debug)]
pub enum WorkerTickError {
    Worker(RunWorkerOnceError),
}

#[derive(Debug, Default)]
pub struct WorkerTickReport {
    pub runs: Vec<RunWorkerOnceResult>,
}

impl WorkerTickReport {
    pub fn processed(&self) -> usize {
        self.runs.len()
    }
}

impl WorkerTickUseCase {
    #[instrument(skip(ctx))]
    pub async fn execute(ctx: &WorkerContext) -> Result<WorkerTickReport, WorkerTickError> {
        let mut report = WorkerTickReport::default();
        let budget = ctx.config.max_jobs_per_tick.max(1);

        for index in 0..budget {
            // Step 1: Process the next job, stop when the queue is empty.
            let Some(run) = RunWorkerOnceUseCase::execute(ctx)
                .await
                .map_err(WorkerTickError::Worker)?
            else {
                break;
            };

            // Step 2: Honour a rate-limit hint before the next job in this tick.
            let deferred_for = match &run.outcome {
                ExecutionOutcome::Deferred { retry_after } => Some(*retry_after),
                _ => None,
            };
            report.runs.push(run);

            let more_to_come = index + 1 < budget;
            if let (Some(retry_after), true) = (deferred_for, more_to_come) {
                let pause = retry_after
                    .unsigned_abs()
                    .min(ctx.config.max_inline_backoff);
                debug!(pause_ms = pause.as_millis() as u64, "worker_tick_backoff");
                tokio::time::sleep(pause).await;
            }
        }

        // Step 3: Summarise the tick.
        info!(processed = report.processed(), "worker_tick_complete");
        Ok(report)
    }
}
