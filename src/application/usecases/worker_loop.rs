// Use case: worker_loop.

use crate::application::context::WorkerContext;
use crate::application::usecases::worker_tick::WorkerTickUseCase;
use std::time::Duration;
use tracing::{error, info};

/// Embedded scheduler: runs a worker tick at a fixed interval until shutdown.
pub struct WorkerLoopUseCase;

impl WorkerLoopUseCase {
    /// Tick failures are logged and the loop keeps going.
    pub async fn run(
        ctx: &WorkerContext,
        tick_interval: Duration,
        mut shutdown: tokio::sync::watch::Receiver<bool>,
    ) {
        info!(tick_interval_ms = tick_interval.as_millis() as u64, "worker_loop_started");

        // Step 1: Loop until the shutdown signal is triggered.
        loop {
            if *shutdown.borrow() {
                break;
            }

            // Step 2: Run one tick.
            if let Err(e) = WorkerTickUseCase::execute(ctx).await {
                error!(error = ?e, "worker_tick_failed");
            }

            // Step 3: Sleep until the next tick or shutdown.
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
                _ = tokio::time::sleep(tick_interval) => {}
            }
        }

        // Step 4: Exit cleanly once shutdown is signaled.
        info!("worker_loop_stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::WorkerLoopUseCase;
    use crate::application::context::test_support::{
        memory_context, memory_worker, test_context,
    };
    use crate::application::usecases::create_job::{CreateJobCommand, CreateJobUseCase};
    use crate::domain::entities::job::JobStatus;
    use crate::domain::value_objects::ids::UserId;
    use crate::infrastructure::producers::ScriptedProducer;
    use serde_json::json;
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn given_shutdown_signal_when_run_should_exit_cleanly() {
        let ctx = test_context();
        let worker = memory_worker(&ctx, Arc::new(ScriptedProducer::new()));
        let (_tx, rx) = tokio::sync::watch::channel(true);

        WorkerLoopUseCase::run(&worker, Duration::from_millis(100), rx).await;
    }

    #[tokio::test(start_paused = true)]
    async fn given_queued_jobs_when_loop_runs_should_process_them_until_stopped() {
        let ctx = memory_context();
        let worker = Arc::new(memory_worker(&ctx, Arc::new(ScriptedProducer::new())));
        let owner = UserId::new();
        let mut ids = Vec::new();
        for _ in 0..3 {
            let job = CreateJobUseCase::execute(
                &ctx,
                CreateJobCommand {
                    caller: Some(owner),
                    job_type: "story_generation".to_string(),
                    parameters: json!({ "topic": "otters", "level": "B2" }),
                    priority: None,
                },
            )
            .await
            .unwrap();
            ids.push(job.id);
        }
        let (tx, rx) = tokio::sync::watch::channel(false);

        let handle = {
            let worker = worker.clone();
            tokio::spawn(async move {
                WorkerLoopUseCase::run(&worker, Duration::from_secs(2), rx).await;
            })
        };
        tokio::time::sleep(Duration::from_secs(7)).await;
        tx.send(true).unwrap();
        handle.await.unwrap();

        for id in ids {
            let job = ctx.repos.job.get(id).await.unwrap().unwrap();
            assert_eq!(job.status, JobStatus::Completed);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn given_failing_store_when_loop_runs_should_keep_ticking() {
        let ctx = test_context();
        let worker = Arc::new(memory_worker(&ctx, Arc::new(ScriptedProducer::new())));
        let (tx, rx) = tokio::sync::watch::channel(false);

        let handle = {
            let worker = worker.clone();
            tokio::spawn(async move {
                WorkerLoopUseCase::run(&worker, Duration::from_secs(1), rx).await;
            })
        };
        tokio::time::sleep(Duration::from_secs(3)).await;
        assert!(!handle.is_finished());
        tx.send(true).unwrap();
        handle.await.unwrap();
    }
}
