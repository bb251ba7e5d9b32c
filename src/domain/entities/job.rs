use crate::domain::value_objects::ids::{JobId, StoryId, UserId};
use crate::domain::value_objects::timestamps::Timestamp;
use crate::domain::workflows::state_machine::{JobStateMachine, TransitionError};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobType {
    StoryGeneration,
    AudioGeneration,
    ImageGeneration,
}

impl JobType {
    pub const ALL: [JobType; 3] = [
        JobType::StoryGeneration,
        JobType::AudioGeneration,
        JobType::ImageGeneration,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            JobType::StoryGeneration => "story_generation",
            JobType::AudioGeneration => "audio_generation",
            JobType::ImageGeneration => "image_generation",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "story_generation" => Some(JobType::StoryGeneration),
            "audio_generation" => Some(JobType::AudioGeneration),
            "image_generation" => Some(JobType::ImageGeneration),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Processing,
    Completed,
    Failed,
    Cancelled,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
            JobStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "pending" => Some(JobStatus::Pending),
            "processing" => Some(JobStatus::Processing),
            "completed" => Some(JobStatus::Completed),
            "failed" => Some(JobStatus::Failed),
            "cancelled" => Some(JobStatus::Cancelled),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobStatus::Completed | JobStatus::Failed | JobStatus::Cancelled
        )
    }

    /// `pending` and `processing` both count as outstanding work for the user.
    pub fn is_active(&self) -> bool {
        matches!(self, JobStatus::Pending | JobStatus::Processing)
    }
}

/// Inputs for a freshly admitted job.
#[derive(Debug, Clone)]
pub struct NewJob {
    pub user_id: UserId,
    pub story_id: Option<StoryId>,
    pub job_type: JobType,
    pub parameters: Value,
    pub priority: i32,
    pub max_retries: u32,
    pub estimated_completion_at: Option<Timestamp>,
}

/// A unit of background generation work and its progress.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub user_id: UserId,
    pub story_id: Option<StoryId>,
    pub job_type: JobType,
    pub parameters: Value,
    pub status: JobStatus,
    pub priority: i32,
    pub result: Option<Value>,
    pub error_message: Option<String>,
    pub error_details: Option<Value>,
    pub retry_count: u32,
    pub max_retries: u32,
    pub processing_attempts: u32,
    /// Stall reclaims since creation or the last user retry.
    #[serde(default)]
    pub abandoned_count: u32,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    pub started_at: Option<Timestamp>,
    pub completed_at: Option<Timestamp>,
    pub estimated_completion_at: Option<Timestamp>,
    pub last_heartbeat_at: Option<Timestamp>,
    pub available_at: Option<Timestamp>,
}

impl Job {
    pub fn new(id: JobId, new: NewJob, now: Timestamp) -> Self {
        Self {
            id,
            user_id: new.user_id,
            story_id: new.story_id,
            job_type: new.job_type,
            parameters: new.parameters,
            status: JobStatus::Pending,
            priority: new.priority,
            result: None,
            error_message: None,
            error_details: None,
            retry_count: 0,
            max_retries: new.max_retries,
            processing_attempts: 0,
            abandoned_count: 0,
            created_at: now,
            updated_at: now,
            started_at: None,
            completed_at: None,
            estimated_completion_at: new.estimated_completion_at,
            last_heartbeat_at: None,
            available_at: None,
        }
    }

    /// A `pending` job is claimable once its deferral (if any) has elapsed.
    pub fn is_due(&self, now: Timestamp) -> bool {
        self.status == JobStatus::Pending && self.available_at.is_none_or(|at| at <= now)
    }

    /// A `processing` job whose heartbeat is older than `threshold` is presumed abandoned.
    pub fn is_stalled(&self, now: Timestamp, threshold: Duration) -> bool {
        self.status == JobStatus::Processing
            && self
                .last_heartbeat_at
                .is_none_or(|beat| beat.elapsed_since(now) > threshold)
    }

    fn move_to(&mut self, next: JobStatus, now: Timestamp) -> Result<(), TransitionError> {
        self.status = JobStateMachine::transition(self.status, next)?;
        self.updated_at = now;
        Ok(())
    }

    /// Takes ownership for one processing attempt.
    ///
    /// A stalled `processing` job is first released back to `pending`, so the
    /// only edges walked are the ones the state machine allows.
    pub fn claim(&mut self, now: Timestamp) -> Result<(), TransitionError> {
        if self.status == JobStatus::Processing {
            self.move_to(JobStatus::Pending, now)?;
            self.abandoned_count = self.abandoned_count.saturating_add(1);
        }
        self.move_to(JobStatus::Processing, now)?;
        if self.started_at.is_none() {
            self.started_at = Some(now);
        }
        self.last_heartbeat_at = Some(now);
        self.processing_attempts = self.processing_attempts.saturating_add(1);
        self.available_at = None;
        Ok(())
    }

    pub fn complete(&mut self, result: Value, now: Timestamp) -> Result<(), TransitionError> {
        self.move_to(JobStatus::Completed, now)?;
        self.result = Some(result);
        self.error_message = None;
        self.error_details = None;
        self.completed_at = Some(now);
        Ok(())
    }

    pub fn fail(
        &mut self,
        message: String,
        details: Option<Value>,
        now: Timestamp,
    ) -> Result<(), TransitionError> {
        self.move_to(JobStatus::Failed, now)?;
        self.result = None;
        self.error_message = Some(message);
        self.error_details = details;
        self.completed_at = Some(now);
        Ok(())
    }

    /// Returns a processing job to the queue, claimable again from `available_at`.
    pub fn requeue(
        &mut self,
        available_at: Option<Timestamp>,
        now: Timestamp,
    ) -> Result<(), TransitionError> {
        self.move_to(JobStatus::Pending, now)?;
        self.available_at = available_at;
        Ok(())
    }

    pub fn cancel(&mut self, now: Timestamp) -> Result<(), TransitionError> {
        self.move_to(JobStatus::Cancelled, now)
    }

    /// User-initiated retry of a failed job; clears the previous terminal episode.
    pub fn reset_for_retry(&mut self, now: Timestamp) -> Result<(), TransitionError> {
        self.move_to(JobStatus::Pending, now)?;
        self.retry_count = 0;
        self.abandoned_count = 0;
        self.result = None;
        self.error_message = None;
        self.error_details = None;
        self.completed_at = None;
        self.available_at = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn pending_job(now: Timestamp) -> Job {
        Job::new(
            JobId::new(),
            NewJob {
                user_id: UserId::new(),
                story_id: None,
                job_type: JobType::StoryGeneration,
                parameters: json!({ "topic": "otters", "level": "A2" }),
                priority: 0,
                max_retries: 3,
                estimated_completion_at: None,
            },
            now,
        )
    }

    #[test]
    fn given_job_type_strings_when_parsed_should_round_trip() {
        for job_type in JobType::ALL {
            assert_eq!(JobType::parse(job_type.as_str()), Some(job_type));
        }
        assert_eq!(JobType::parse("video_generation"), None);
    }

    #[test]
    fn given_new_job_when_built_should_be_pending_without_terminal_fields() {
        let now = Timestamp::now_utc();
        let job = pending_job(now);

        assert_eq!(job.status, JobStatus::Pending);
        assert!(job.result.is_none());
        assert!(job.error_message.is_none());
        assert!(job.started_at.is_none());
        assert!(job.is_due(now));
    }

    #[test]
    fn given_second_claim_when_job_was_requeued_should_keep_first_started_at() {
        let t0 = Timestamp::now_utc();
        let mut job = pending_job(t0);
        job.claim(t0).unwrap();
        job.requeue(None, t0.plus(Duration::seconds(1))).unwrap();

        job.claim(t0.plus(Duration::seconds(5))).unwrap();

        assert_eq!(job.started_at, Some(t0));
        assert_eq!(job.processing_attempts, 2);
        assert_eq!(job.abandoned_count, 0);
    }

    #[test]
    fn given_stalled_processing_job_when_claimed_should_bump_attempts_and_refresh_heartbeat() {
        let t0 = Timestamp::now_utc();
        let mut job = pending_job(t0);
        job.claim(t0).unwrap();
        let later = t0.plus(Duration::minutes(6));
        assert!(job.is_stalled(later, Duration::minutes(5)));

        job.claim(later).unwrap();

        assert_eq!(job.status, JobStatus::Processing);
        assert_eq!(job.processing_attempts, 2);
        assert_eq!(job.abandoned_count, 1);
        assert_eq!(job.last_heartbeat_at, Some(later));
    }

    #[test]
    fn given_completed_job_when_failed_should_be_forbidden() {
        let now = Timestamp::now_utc();
        let mut job = pending_job(now);
        job.claim(now).unwrap();
        job.complete(json!({ "ok": true }), now).unwrap();

        let result = job.fail("late".to_string(), None, now);

        assert!(result.is_err());
        assert_eq!(job.status, JobStatus::Completed);
        assert!(job.error_message.is_none());
    }

    #[test]
    fn given_failed_job_when_reset_for_retry_should_clear_terminal_fields() {
        let now = Timestamp::now_utc();
        let mut job = pending_job(now);
        job.claim(now).unwrap();
        job.retry_count = 3;
        job.fail(
            "provider down".to_string(),
            Some(json!({ "kind": "transient" })),
            now,
        )
        .unwrap();

        job.reset_for_retry(now).unwrap();

        assert_eq!(job.status, JobStatus::Pending);
        assert_eq!(job.retry_count, 0);
        assert!(job.error_message.is_none());
        assert!(job.error_details.is_none());
        assert!(job.completed_at.is_none());
    }

    #[test]
    fn given_deferred_job_when_checked_before_available_at_should_not_be_due() {
        let now = Timestamp::now_utc();
        let mut job = pending_job(now);
        job.claim(now).unwrap();
        job.requeue(Some(now.plus(Duration::seconds(12))), now).unwrap();

        assert!(!job.is_due(now.plus(Duration::seconds(11))));
        assert!(job.is_due(now.plus(Duration::seconds(12))));
    }
}
