use std::sync::Arc;

use crate::application::handlers::HandlerRegistry;
use crate::application::shared::clock::{Clock, SystemClock};
use crate::application::shared::throttle::JobTypeThrottle;
use crate::application::usecases::run_worker_once::WorkerConfig;
use crate::domain::workflows::retry_policy::RetryPolicy;
use crate::infrastructure::db::repositories::Repositories;

/// Shared resources for user-facing use cases.
pub struct AppContext {
    pub repos: Repositories,
    pub retry_policy: RetryPolicy,
    pub clock: Arc<dyn Clock>,
}

impl AppContext {
    pub fn new(repos: Repositories, retry_policy: RetryPolicy) -> Self {
        Self {
            repos,
            retry_policy,
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }
}

/// Worker-side resources, built over the worker's own repository set.
pub struct WorkerContext {
    pub repos: Repositories,
    pub handlers: Arc<HandlerRegistry>,
    pub throttle: Arc<JobTypeThrottle>,
    pub config: WorkerConfig,
    pub clock: Arc<dyn Clock>,
}

impl WorkerContext {
    pub fn new(repos: Repositories, handlers: Arc<HandlerRegistry>, config: WorkerConfig) -> Self {
        let throttle = Arc::new(JobTypeThrottle::new(config.spacing.clone()));
        Self {
            repos,
            handlers,
            throttle,
            config,
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }
}
