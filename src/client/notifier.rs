use crate::domain::entities::job::{Job, JobType};
use async_trait::async_trait;
use tracing::{info, warn};

/// Side effects for jobs the manager has just seen finish.
///
/// Each method fires at most once per observed transition.
#[async_trait]
pub trait JobNotifier: Send + Sync {
    async fn job_finished(&self, job: &Job);
    async fn job_failed(&self, job: &Job);
}

/// User-facing text for a finished job.
pub fn completion_message(job: &Job) -> String {
    match job.job_type {
        JobType::StoryGeneration => {
            let title = job
                .result
                .as_ref()
                .and_then(|r| r.get("title"))
                .and_then(|t| t.as_str());
            match title {
                Some(title) => format!("Your story \"{title}\" is ready"),
                None => "Your story is ready".to_string(),
            }
        }
        JobType::AudioGeneration => "Audio narration is ready".to_string(),
        JobType::ImageGeneration => "Illustration is ready".to_string(),
    }
}

pub fn failure_message(job: &Job) -> String {
    let what = match job.job_type {
        JobType::StoryGeneration => "Story generation",
        JobType::AudioGeneration => "Audio generation",
        JobType::ImageGeneration => "Image generation",
    };
    match job.error_message.as_deref() {
        Some(reason) => format!("{what} failed: {reason}"),
        None => format!("{what} failed"),
    }
}

/// Notifier that only logs.
#[derive(Default)]
pub struct TracingNotifier;

#[async_trait]
impl JobNotifier for TracingNotifier {
    async fn job_finished(&self, job: &Job) {
        info!(job_id = %job.id, message = %completion_message(job), "job_finished_notification");
    }

    async fn job_failed(&self, job: &Job) {
        warn!(job_id = %job.id, message = %failure_message(job), "job_failed_notification");
    }
}
