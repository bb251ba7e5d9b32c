use crate::client::change_source::{ChangeSource, IntervalSource};
use crate::client::gateway::{GatewayError, JobGateway};
use crate::client::local_cache::{FileCache, LocalCache};
use crate::client::notifier::JobNotifier;
use crate::client::subscribers::{SubscriberRegistry, Subscription};
use crate::domain::entities::job::{Job, JobStatus, JobType};
use crate::domain::value_objects::ids::JobId;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, RwLock};
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
pub struct ManagerConfig {
    /// How many of the caller's most recent jobs each poll fetches.
    pub fetch_limit: u32,
    /// Terminal jobs kept locally, newest by `created_at`.
    pub retain_terminal: usize,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            fetch_limit: 50,
            retain_terminal: 20,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueueManagerError {
    #[error("job {job_id} is {} and cannot be {action}", .status.as_str())]
    InvalidState {
        job_id: JobId,
        status: JobStatus,
        action: &'static str,
    },
    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// Another poll was already running.
    Skipped,
    Unchanged,
    Changed,
}

struct PollingTask {
    shutdown: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

struct ManagerInner {
    gateway: Arc<dyn JobGateway>,
    cache: Arc<dyn LocalCache>,
    notifier: Arc<dyn JobNotifier>,
    config: ManagerConfig,
    jobs: RwLock<HashMap<JobId, Job>>,
    reconcile: tokio::sync::Mutex<()>,
    subscribers: Arc<SubscriberRegistry>,
    snapshot: watch::Sender<Vec<Job>>,
    source: Mutex<Option<Box<dyn ChangeSource>>>,
    task: Mutex<Option<PollingTask>>,
}

/// Client-side mirror of the caller's jobs.
///
/// Polls the server through a [`JobGateway`], merges what it sees into a local
/// map, keeps a [`LocalCache`] backup, fires one notification per observed
/// completion or failure, and publishes the list to subscribers.
#[derive(Clone)]
pub struct JobQueueManager {
    inner: Arc<ManagerInner>,
}

impl JobQueueManager {
    /// Builds the manager and loads the local cache; no network traffic yet.
    pub fn new(
        gateway: Arc<dyn JobGateway>,
        source: Box<dyn ChangeSource>,
        cache: Arc<dyn LocalCache>,
        notifier: Arc<dyn JobNotifier>,
        config: ManagerConfig,
    ) -> Self {
        let cached = cache.load().unwrap_or_else(|e| {
            warn!(error = %e, "job_cache_load_failed");
            Vec::new()
        });
        let jobs: HashMap<JobId, Job> = cached.into_iter().map(|job| (job.id, job)).collect();
        let (snapshot, _) = watch::channel(newest_first(jobs.values().cloned().collect()));
        debug!(cached = jobs.len(), "job_queue_manager_created");

        Self {
            inner: Arc::new(ManagerInner {
                gateway,
                cache,
                notifier,
                config,
                jobs: RwLock::new(jobs),
                reconcile: tokio::sync::Mutex::new(()),
                subscribers: SubscriberRegistry::new(),
                snapshot,
                source: Mutex::new(Some(source)),
                task: Mutex::new(None),
            }),
        }
    }

    /// Manager wired from the `client` settings: interval polling and a file cache.
    pub fn from_settings(
        settings: &crate::config::Client,
        gateway: Arc<dyn JobGateway>,
        notifier: Arc<dyn JobNotifier>,
    ) -> Self {
        Self::new(
            gateway,
            Box::new(IntervalSource::new(settings.poll_interval())),
            Arc::new(FileCache::new(&settings.cache_path)),
            notifier,
            settings.manager_config(),
        )
    }

    /// Start polling: one poll right away, then one per change-source hint.
    pub fn init(&self) {
        let mut task = self.inner.task.lock().unwrap_or_else(|p| p.into_inner());
        if task.is_some() {
            return;
        }
        let Some(mut source) = self
            .inner
            .source
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .take()
        else {
            warn!("job_queue_manager_no_change_source");
            return;
        };

        let (shutdown, mut stopped) = watch::channel(false);
        let manager = self.clone();
        let handle = tokio::spawn(async move {
            manager.poll_logged().await;
            loop {
                tokio::select! {
                    _ = stopped.changed() => break,
                    change = source.next_change() => {
                        if change.is_none() {
                            break;
                        }
                        manager.poll_logged().await;
                    }
                }
            }
            *manager
                .inner
                .source
                .lock()
                .unwrap_or_else(|p| p.into_inner()) = Some(source);
        });

        *task = Some(PollingTask { shutdown, handle });
        info!("job_queue_manager_started");
    }

    /// Stop polling. The manager can be started again with `init`.
    pub async fn stop(&self) {
        let task = self
            .inner
            .task
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .take();
        if let Some(task) = task {
            let _ = task.shutdown.send(true);
            if let Err(e) = task.handle.await {
                warn!(error = %e, "job_queue_manager_task_failed");
            }
            info!("job_queue_manager_stopped");
        }
    }

    pub async fn dispose(&self) {
        self.stop().await;
        self.inner.subscribers.clear();
    }

    pub fn is_running(&self) -> bool {
        self.inner
            .task
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .is_some()
    }

    /// Timer-driven poll; skipped when another reconciliation is in flight.
    pub async fn poll(&self) -> Result<PollOutcome, GatewayError> {
        let Ok(_guard) = self.inner.reconcile.try_lock() else {
            debug!("job_poll_skipped");
            return Ok(PollOutcome::Skipped);
        };
        self.fetch_and_reconcile().await
    }

    /// Poll that waits for any in-flight one, used after local operations.
    pub async fn poll_now(&self) -> Result<PollOutcome, GatewayError> {
        let _guard = self.inner.reconcile.lock().await;
        self.fetch_and_reconcile().await
    }

    async fn poll_logged(&self) {
        if let Err(e) = self.poll().await {
            warn!(error = %e, "job_poll_failed");
        }
    }

    async fn fetch_and_reconcile(&self) -> Result<PollOutcome, GatewayError> {
        let fetched = self
            .inner
            .gateway
            .list_jobs(self.inner.config.fetch_limit)
            .await?;
        Ok(self.reconcile(fetched).await)
    }

    /// Merge server state into the map, prune, persist, notify, publish.
    async fn reconcile(&self, fetched: Vec<Job>) -> PollOutcome {
        let window_complete = fetched.len() < self.inner.config.fetch_limit as usize;
        let oldest_fetched = fetched.iter().map(|j| j.created_at).min();
        let seen: HashSet<JobId> = fetched.iter().map(|j| j.id).collect();

        let (finished, failed, changed, snapshot) = {
            let mut jobs = self.inner.jobs.write().unwrap_or_else(|p| p.into_inner());
            let before = jobs.clone();
            let mut finished = Vec::new();
            let mut failed = Vec::new();

            for job in fetched {
                let previous = before.get(&job.id).map(|j| j.status);
                if let Some(previous) = previous {
                    if previous != JobStatus::Completed && job.status == JobStatus::Completed {
                        finished.push(job.clone());
                    }
                    if previous != JobStatus::Failed && job.status == JobStatus::Failed {
                        failed.push(job.clone());
                    }
                }
                jobs.insert(job.id, job);
            }

            // An active job the server should have listed but didn't is gone.
            jobs.retain(|id, job| {
                let covered = window_complete
                    || oldest_fetched.is_some_and(|oldest| job.created_at > oldest);
                seen.contains(id) || !job.status.is_active() || !covered
            });

            prune_terminal(&mut jobs, self.inner.config.retain_terminal);
            let changed = *jobs != before;
            let snapshot = newest_first(jobs.values().cloned().collect());
            (finished, failed, changed, snapshot)
        };

        if let Err(e) = self.inner.cache.save(&snapshot) {
            warn!(error = %e, "job_cache_save_failed");
        }

        for job in &finished {
            self.inner.notifier.job_finished(job).await;
        }
        for job in &failed {
            self.inner.notifier.job_failed(job).await;
        }

        if !changed {
            return PollOutcome::Unchanged;
        }
        self.publish(snapshot);
        PollOutcome::Changed
    }

    fn publish(&self, snapshot: Vec<Job>) {
        self.inner.subscribers.publish(&snapshot);
        self.inner.snapshot.send_replace(snapshot);
    }

    /// Apply a local edit to the map, then persist and publish it.
    fn edit_local(&self, edit: impl FnOnce(&mut HashMap<JobId, Job>)) {
        let snapshot = {
            let mut jobs = self.inner.jobs.write().unwrap_or_else(|p| p.into_inner());
            edit(&mut jobs);
            newest_first(jobs.values().cloned().collect())
        };
        if let Err(e) = self.inner.cache.save(&snapshot) {
            warn!(error = %e, "job_cache_save_failed");
        }
        self.publish(snapshot);
    }

    async fn refresh_after(&self, action: &'static str) {
        if let Err(e) = self.poll_now().await {
            warn!(error = %e, action, "job_refresh_failed");
        }
    }

    pub async fn create_job(
        &self,
        job_type: JobType,
        parameters: Value,
        priority: Option<i32>,
    ) -> Result<Job, QueueManagerError> {
        let job = self
            .inner
            .gateway
            .create_job(job_type, parameters, priority)
            .await?;
        let created = job.clone();
        self.edit_local(|jobs| {
            jobs.insert(created.id, created);
        });
        self.refresh_after("create").await;
        Ok(job)
    }

    pub async fn retry_job(&self, job_id: JobId) -> Result<Job, QueueManagerError> {
        if let Some(known) = self.get_job(job_id) {
            if known.status != JobStatus::Failed {
                return Err(QueueManagerError::InvalidState {
                    job_id,
                    status: known.status,
                    action: "retried",
                });
            }
        }
        let job = self.inner.gateway.retry_job(job_id).await?;
        let retried = job.clone();
        self.edit_local(|jobs| {
            jobs.insert(retried.id, retried);
        });
        self.refresh_after("retry").await;
        Ok(job)
    }

    pub async fn cancel_job(&self, job_id: JobId) -> Result<Job, QueueManagerError> {
        if let Some(known) = self.get_job(job_id) {
            if !known.status.is_active() {
                return Err(QueueManagerError::InvalidState {
                    job_id,
                    status: known.status,
                    action: "cancelled",
                });
            }
        }
        let job = self.inner.gateway.cancel_job(job_id).await?;
        self.edit_local(|jobs| {
            jobs.remove(&job_id);
        });
        self.refresh_after("cancel").await;
        Ok(job)
    }

    /// Register a callback; it runs now with the current list and after every change.
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&[Job]) + Send + Sync + 'static,
    {
        let subscription = self.inner.subscribers.subscribe(callback);
        let current = self.get_jobs();
        if let Some(callback) = self.inner.subscribers.callback(subscription.id()) {
            SubscriberRegistry::deliver(subscription.id(), &callback, &current);
        }
        subscription
    }

    /// The job list as a `watch` channel, newest first.
    pub fn watch(&self) -> watch::Receiver<Vec<Job>> {
        self.inner.snapshot.subscribe()
    }

    pub fn get_job(&self, job_id: JobId) -> Option<Job> {
        self.inner
            .jobs
            .read()
            .unwrap_or_else(|p| p.into_inner())
            .get(&job_id)
            .cloned()
    }

    /// All known jobs, newest first.
    pub fn get_jobs(&self) -> Vec<Job> {
        let jobs = self.inner.jobs.read().unwrap_or_else(|p| p.into_inner());
        newest_first(jobs.values().cloned().collect())
    }

    /// Jobs still waiting or running.
    pub fn get_pending_count(&self) -> usize {
        self.inner
            .jobs
            .read()
            .unwrap_or_else(|p| p.into_inner())
            .values()
            .filter(|job| job.status.is_active())
            .count()
    }
}

fn newest_first(mut jobs: Vec<Job>) -> Vec<Job> {
    jobs.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
    jobs
}

/// Keep only the `retain` newest terminal jobs; active jobs are never evicted.
fn prune_terminal(jobs: &mut HashMap<JobId, Job>, retain: usize) {
    let mut terminal: Vec<&Job> = jobs.values().filter(|j| j.status.is_terminal()).collect();
    if terminal.len() <= retain {
        return;
    }
    terminal.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
    let evicted: Vec<JobId> = terminal[retain..].iter().map(|j| j.id).collect();
    debug!(evicted = evicted.len(), "job_cache_pruned");
    for id in evicted {
        jobs.remove(&id);
    }
}
