use async_trait::async_trait;
use pagecraft::application::context::{AppContext, WorkerContext};
use pagecraft::application::handlers::HandlerRegistry;
use pagecraft::application::shared::clock::{Clock, TokioClock};
use pagecraft::application::usecases::run_worker_once::{
    ExecutionOutcome, RunWorkerOnceUseCase, WorkerConfig,
};
use pagecraft::client::{
    FileCache, InProcessGateway, JobNotifier, JobQueueManager, LocalCache, ManagerConfig,
    MemoryCache, NotifySource, PollOutcome,
};
use pagecraft::domain::entities::job::{Job, JobStatus, JobType};
use pagecraft::domain::services::content_producer::ProducerError;
use pagecraft::domain::value_objects::ids::{JobId, UserId};
use pagecraft::domain::workflows::retry_policy::RetryPolicy;
use pagecraft::infrastructure::db::repositories::Repositories;
use pagecraft::infrastructure::producers::ScriptedProducer;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Default)]
struct RecordingNotifier {
    events: Mutex<Vec<(&'static str, JobId, String)>>,
}

impl RecordingNotifier {
    fn events(&self) -> Vec<(&'static str, JobId, String)> {
        self.events.lock().unwrap().clone()
    }
}

#[async_trait]
impl JobNotifier for RecordingNotifier {
    async fn job_finished(&self, job: &Job) {
        self.events.lock().unwrap().push((
            "finished",
            job.id,
            pagecraft::client::notifier::completion_message(job),
        ));
    }

    async fn job_failed(&self, job: &Job) {
        self.events.lock().unwrap().push((
            "failed",
            job.id,
            pagecraft::client::notifier::failure_message(job),
        ));
    }
}

struct Harness {
    ctx: Arc<AppContext>,
    worker: Arc<WorkerContext>,
    producer: Arc<ScriptedProducer>,
    manager: JobQueueManager,
    notifier: Arc<RecordingNotifier>,
    owner: UserId,
}

fn harness_with(producer: ScriptedProducer, cache: Arc<dyn LocalCache>) -> Harness {
    let clock = Arc::new(TokioClock::new());
    let repos = Repositories::in_memory();
    let ctx = Arc::new(
        AppContext::new(repos.clone(), RetryPolicy::default()).with_clock(clock.clone()),
    );
    let producer = Arc::new(producer);
    let handlers =
        HandlerRegistry::with_producers(producer.clone(), producer.clone(), producer.clone());
    let config = WorkerConfig {
        spacing: HashMap::new(),
        ..WorkerConfig::default()
    };
    let worker =
        Arc::new(WorkerContext::new(repos, Arc::new(handlers), config).with_clock(clock));

    let owner = UserId::new();
    let notifier = Arc::new(RecordingNotifier::default());
    let (_hints, source) = NotifySource::channel(1);
    let manager = JobQueueManager::new(
        Arc::new(InProcessGateway::new(ctx.clone(), owner)),
        Box::new(source),
        cache,
        notifier.clone(),
        ManagerConfig::default(),
    );

    Harness {
        ctx,
        worker,
        producer,
        manager,
        notifier,
        owner,
    }
}

fn harness(producer: ScriptedProducer) -> Harness {
    harness_with(producer, Arc::new(MemoryCache::new()))
}

fn story_params() -> Value {
    json!({ "topic": "otters", "level": "A2", "length": "short" })
}

fn audio_params() -> Value {
    json!({ "story_id": uuid::Uuid::new_v4().to_string(), "text": "Once upon a time" })
}

async fn run_once(worker: &WorkerContext) -> ExecutionOutcome {
    RunWorkerOnceUseCase::execute(worker)
        .await
        .unwrap()
        .expect("a claimable job")
        .outcome
}

#[tokio::test(start_paused = true)]
async fn given_story_job_when_worker_completes_should_notify_exactly_once() {
    let h = harness(ScriptedProducer::new());

    let job = h
        .manager
        .create_job(JobType::StoryGeneration, story_params(), None)
        .await
        .unwrap();
    assert_eq!(h.manager.get_pending_count(), 1);

    assert_eq!(run_once(&h.worker).await, ExecutionOutcome::Completed);
    let first = h.manager.poll_now().await.unwrap();
    let second = h.manager.poll_now().await.unwrap();

    assert_eq!(first, PollOutcome::Changed);
    assert_eq!(second, PollOutcome::Unchanged);
    assert_eq!(
        h.notifier.events(),
        vec![(
            "finished",
            job.id,
            "Your story \"A story about otters\" is ready".to_string()
        )]
    );
    let local = h.manager.get_job(job.id).unwrap();
    assert_eq!(local.status, JobStatus::Completed);
    assert_eq!(h.manager.get_pending_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn given_audio_rate_limited_for_12s_when_polled_should_stay_pending_until_retry() {
    let producer = ScriptedProducer::new();
    producer.push_failure(ProducerError::rate_limited(
        "quota exceeded",
        time::Duration::seconds(12),
    ));
    let h = harness(producer);
    let job = h
        .manager
        .create_job(JobType::AudioGeneration, audio_params(), Some(1))
        .await
        .unwrap();

    let first = run_once(&h.worker).await;
    h.manager.poll_now().await.unwrap();
    let deferred = h.manager.get_job(job.id).unwrap();
    let early = RunWorkerOnceUseCase::execute(&h.worker).await.unwrap();
    tokio::time::advance(Duration::from_secs(12)).await;
    let second = run_once(&h.worker).await;
    h.manager.poll_now().await.unwrap();

    assert!(matches!(first, ExecutionOutcome::Deferred { .. }));
    assert_eq!(deferred.status, JobStatus::Pending);
    assert_eq!(deferred.retry_count, 0);
    assert!(early.is_none());
    assert_eq!(second, ExecutionOutcome::Completed);
    assert_eq!(h.producer.calls(), 2);
    assert_eq!(
        h.notifier.events(),
        vec![("finished", job.id, "Audio narration is ready".to_string())]
    );
}

#[tokio::test(start_paused = true)]
async fn given_retries_exhausted_when_user_retries_should_fail_then_complete() {
    let producer = ScriptedProducer::new();
    for _ in 0..RetryPolicy::default().max_retries {
        producer.push_failure(ProducerError::transient("provider returned 503"));
    }
    let h = harness(producer);
    let job = h
        .manager
        .create_job(JobType::StoryGeneration, story_params(), None)
        .await
        .unwrap();

    let mut outcome = run_once(&h.worker).await;
    while matches!(outcome, ExecutionOutcome::Requeued { .. }) {
        tokio::time::advance(Duration::from_secs(120)).await;
        outcome = run_once(&h.worker).await;
    }
    h.manager.poll_now().await.unwrap();
    let failed = h.manager.get_job(job.id).unwrap();

    let retried = h.manager.retry_job(job.id).await.unwrap();
    assert_eq!(run_once(&h.worker).await, ExecutionOutcome::Completed);
    h.manager.poll_now().await.unwrap();

    assert!(matches!(outcome, ExecutionOutcome::Failed { .. }));
    assert_eq!(failed.status, JobStatus::Failed);
    assert_eq!(failed.retry_count, failed.max_retries);
    assert_eq!(retried.status, JobStatus::Pending);
    assert_eq!(retried.retry_count, 0);
    assert_eq!(
        h.notifier.events(),
        vec![
            (
                "failed",
                job.id,
                "Story generation failed: provider returned 503".to_string()
            ),
            (
                "finished",
                job.id,
                "Your story \"A story about otters\" is ready".to_string()
            ),
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn given_25_finished_jobs_when_polled_should_keep_newest_20_and_persist_them() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("jobs.json");
    let h = harness_with(ScriptedProducer::new(), Arc::new(FileCache::new(&path)));
    let mut created = Vec::new();
    for _ in 0..25 {
        let job = pagecraft::application::usecases::create_job::CreateJobUseCase::execute(
            &h.ctx,
            pagecraft::application::usecases::create_job::CreateJobCommand {
                caller: Some(h.owner),
                job_type: "image_generation".to_string(),
                parameters: json!({
                    "story_id": uuid::Uuid::new_v4().to_string(),
                    "segment_index": 0
                }),
                priority: None,
            },
        )
        .await
        .unwrap();
        created.push(job.id);
        tokio::time::advance(Duration::from_secs(1)).await;
    }
    while RunWorkerOnceUseCase::execute(&h.worker)
        .await
        .unwrap()
        .is_some()
    {}

    h.manager.poll_now().await.unwrap();

    let kept: Vec<JobId> = h.manager.get_jobs().iter().map(|j| j.id).collect();
    let newest: Vec<JobId> = created.iter().rev().take(20).copied().collect();
    assert_eq!(kept, newest);
    assert!(h.notifier.events().is_empty());
    assert_eq!(FileCache::new(&path).load().unwrap().len(), 20);
}

#[tokio::test(start_paused = true)]
async fn given_many_workers_when_claiming_one_job_should_hand_it_to_exactly_one() {
    let h = harness(ScriptedProducer::new());
    h.manager
        .create_job(JobType::StoryGeneration, story_params(), None)
        .await
        .unwrap();

    let mut claims = tokio::task::JoinSet::new();
    for _ in 0..8 {
        let worker = h.worker.clone();
        claims.spawn(async move {
            let now = worker.clock.now();
            worker.repos.job.claim_next(now, now.plus(-time::Duration::minutes(5))).await
        });
    }
    let mut winners = 0;
    while let Some(claim) = claims.join_next().await {
        if claim.unwrap().unwrap().is_some() {
            winners += 1;
        }
    }

    assert_eq!(winners, 1);
}

#[tokio::test(start_paused = true)]
async fn given_stalled_claim_when_threshold_passes_should_reclaim_and_complete() {
    let h = harness(ScriptedProducer::new());
    let job = h
        .manager
        .create_job(JobType::StoryGeneration, story_params(), None)
        .await
        .unwrap();
    let now = h.worker.clock.now();
    let crashed = h
        .worker
        .repos
        .job
        .claim_next(now, now.plus(-time::Duration::minutes(5)))
        .await
        .unwrap()
        .unwrap();

    let before_threshold = RunWorkerOnceUseCase::execute(&h.worker).await.unwrap();
    tokio::time::advance(Duration::from_secs(301)).await;
    let run = RunWorkerOnceUseCase::execute(&h.worker)
        .await
        .unwrap()
        .unwrap();

    assert_eq!(crashed.processing_attempts, 1);
    assert!(before_threshold.is_none());
    assert_eq!(run.job.id, job.id);
    assert_eq!(run.outcome, ExecutionOutcome::Completed);
    assert_eq!(run.job.processing_attempts, 2);
}

#[tokio::test(start_paused = true)]
async fn given_cancel_during_processing_when_worker_returns_should_drop_result() {
    let h = harness(ScriptedProducer::new().with_latency(Duration::from_secs(5)));
    let job = h
        .manager
        .create_job(JobType::StoryGeneration, story_params(), None)
        .await
        .unwrap();

    let running = {
        let worker = h.worker.clone();
        tokio::spawn(async move { RunWorkerOnceUseCase::execute(&worker).await })
    };
    tokio::time::sleep(Duration::from_secs(1)).await;
    h.manager.poll_now().await.unwrap();
    let cancelled = h.manager.cancel_job(job.id).await.unwrap();
    let run = running.await.unwrap().unwrap().unwrap();
    h.manager.poll_now().await.unwrap();

    assert_eq!(cancelled.status, JobStatus::Cancelled);
    assert_eq!(run.outcome, ExecutionOutcome::Abandoned);
    let stored = h.ctx.repos.job.get(job.id).await.unwrap().unwrap();
    assert_eq!(stored.status, JobStatus::Cancelled);
    assert_eq!(stored.result, None);
    assert_eq!(h.manager.get_pending_count(), 0);
    assert!(h.notifier.events().is_empty());
}
