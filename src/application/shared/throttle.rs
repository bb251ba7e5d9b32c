use crate::domain::entities::job::JobType;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;

/// Minimum spacing between consecutive jobs of the same type, shared by every worker tick.
pub struct JobTypeThrottle {
    spacing: HashMap<JobType, Duration>,
    last_finished: Mutex<HashMap<JobType, Instant>>,
}

impl JobTypeThrottle {
    pub fn new(spacing: HashMap<JobType, Duration>) -> Self {
        Self {
            spacing,
            last_finished: Mutex::new(HashMap::new()),
        }
    }

    /// How long a job of `job_type` still has to wait right now.
    pub fn remaining(&self, job_type: JobType) -> Duration {
        let Some(spacing) = self.spacing.get(&job_type).copied() else {
            return Duration::ZERO;
        };
        let last = self
            .last_finished
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .get(&job_type)
            .copied();
        match last {
            Some(finished) => spacing.saturating_sub(finished.elapsed()),
            None => Duration::ZERO,
        }
    }

    /// Sleep until a job of `job_type` may start.
    pub async fn wait_turn(&self, job_type: JobType) {
        let remaining = self.remaining(job_type);
        if !remaining.is_zero() {
            tokio::time::sleep(remaining).await;
        }
    }

    pub fn record_finished(&self, job_type: JobType) {
        self.last_finished
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .insert(job_type, Instant::now());
    }
}
