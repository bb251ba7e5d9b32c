use crate::domain::entities::job::{Job, JobStatus, JobType};
use crate::domain::value_objects::ids::{JobId, StoryId, UserId};
use crate::domain::value_objects::timestamps::Timestamp;
use crate::infrastructure::db::stores::job_store::JobRepositoryError;
use serde_json::Value;
use time::OffsetDateTime;

#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct JobRow {
    pub id: uuid::Uuid,
    pub user_id: uuid::Uuid,
    pub story_id: Option<uuid::Uuid>,
    pub job_type: String,
    pub parameters: Value,
    pub status: String,
    pub priority: i32,
    pub result: Option<Value>,
    pub error_message: Option<String>,
    pub error_details: Option<Value>,
    pub retry_count: i32,
    pub max_retries: i32,
    pub processing_attempts: i32,
    pub abandoned_count: i32,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
    pub started_at: Option<OffsetDateTime>,
    pub completed_at: Option<OffsetDateTime>,
    pub estimated_completion_at: Option<OffsetDateTime>,
    pub last_heartbeat_at: Option<OffsetDateTime>,
    pub available_at: Option<OffsetDateTime>,
}

fn to_i32(value: u32) -> i32 {
    i32::try_from(value).unwrap_or(i32::MAX)
}

fn to_u32(value: i32) -> u32 {
    u32::try_from(value).unwrap_or(0)
}

impl JobRow {
    pub fn from_job(job: &Job) -> Self {
        Self {
            id: job.id.0,
            user_id: job.user_id.0,
            story_id: job.story_id.map(|s| s.0),
            job_type: job.job_type.as_str().to_string(),
            parameters: job.parameters.clone(),
            status: job.status.as_str().to_string(),
            priority: job.priority,
            result: job.result.clone(),
            error_message: job.error_message.clone(),
            error_details: job.error_details.clone(),
            retry_count: to_i32(job.retry_count),
            max_retries: to_i32(job.max_retries),
            processing_attempts: to_i32(job.processing_attempts),
            abandoned_count: to_i32(job.abandoned_count),
            created_at: job.created_at.as_inner(),
            updated_at: job.updated_at.as_inner(),
            started_at: job.started_at.map(|t| t.as_inner()),
            completed_at: job.completed_at.map(|t| t.as_inner()),
            estimated_completion_at: job.estimated_completion_at.map(|t| t.as_inner()),
            last_heartbeat_at: job.last_heartbeat_at.map(|t| t.as_inner()),
            available_at: job.available_at.map(|t| t.as_inner()),
        }
    }

    /// Maps a stored row back into the entity; unknown enum text is rejected.
    pub fn into_job(self) -> Result<Job, JobRepositoryError> {
        let job_type = JobType::parse(&self.job_type).ok_or(JobRepositoryError::InvalidInput)?;
        let status = JobStatus::parse(&self.status).ok_or(JobRepositoryError::InvalidInput)?;

        Ok(Job {
            id: JobId(self.id),
            user_id: UserId(self.user_id),
            story_id: self.story_id.map(StoryId),
            job_type,
            parameters: self.parameters,
            status,
            priority: self.priority,
            result: self.result,
            error_message: self.error_message,
            error_details: self.error_details,
            retry_count: to_u32(self.retry_count),
            max_retries: to_u32(self.max_retries),
            processing_attempts: to_u32(self.processing_attempts),
            abandoned_count: to_u32(self.abandoned_count),
            created_at: Timestamp::from(self.created_at),
            updated_at: Timestamp::from(self.updated_at),
            started_at: self.started_at.map(Timestamp::from),
            completed_at: self.completed_at.map(Timestamp::from),
            estimated_completion_at: self.estimated_completion_at.map(Timestamp::from),
            last_heartbeat_at: self.last_heartbeat_at.map(Timestamp::from),
            available_at: self.available_at.map(Timestamp::from),
        })
    }
}
