// Use case: create_job.

use crate::application::context::AppContext;
use crate::domain::entities::job::{Job, NewJob};
use crate::domain::services::job_validator::{JobValidator, ValidationError};
use crate::domain::value_objects::ids::{JobId, UserId};
use crate::domain::workflows::job_catalog::JobCatalog;
use metrics::counter;
use serde_json::Value;
use tracing::{info, instrument};

/// Input for creating a job on behalf of an authenticated caller.
#[derive(Debug, Clone)]
pub struct CreateJobCommand {
    pub caller: Option<UserId>,
    pub job_type: String,
    pub parameters: Value,
    pub priority: Option<i32>,
}

/// Validates and persists a new `pending` job.
pub struct CreateJobUseCase;

#[derive(Debug)]
pub enum CreateJobError {
    Unauthorized,
    Validation(ValidationError),
    Storage(String),
}

impl CreateJobUseCase {
    #[instrument(skip(ctx, command), fields(job_type = %command.job_type))]
    pub async fn execute(
        ctx: &AppContext,
        command: CreateJobCommand,
    ) -> Result<Job, CreateJobError> {
        // Step 1: Require an identifiable caller.
        let user_id = command.caller.ok_or(CreateJobError::Unauthorized)?;

        // Step 2: Validate before touching storage.
        let (job_type, parameters) =
            JobValidator::validate_raw(&command.job_type, &command.parameters)
                .map_err(CreateJobError::Validation)?;

        // Step 3: Build the pending job with its completion estimate.
        let now = ctx.clock.now();
        let job = Job::new(
            JobId::new(),
            NewJob {
                user_id,
                story_id: parameters.story_id(),
                job_type,
                parameters: command.parameters,
                priority: command.priority.unwrap_or(0),
                max_retries: ctx.retry_policy.max_retries,
                estimated_completion_at: Some(JobCatalog::estimated_completion(job_type, now)),
            },
            now,
        );

        // Step 4: Persist exactly one row.
        let stored = ctx
            .repos
            .job
            .insert(&job)
            .await
            .map_err(|e| CreateJobError::Storage(format!("{e:?}")))?;

        counter!("jobs_created_total", "job_type" => job_type.as_str()).increment(1);
        info!(job_id = %stored.id, user_id = %stored.user_id, "job_created");

        Ok(stored)
    }
}

#[cfg(test)]
mod tests {
    use super::{CreateJobCommand, CreateJobError, CreateJobUseCase};
    use crate::application::context::test_support::{memory_context, test_context};
    use crate::domain::entities::job::{JobStatus, JobType};
    use crate::domain::services::job_validator::ValidationError;
    use crate::domain::value_objects::ids::UserId;
    use serde_json::json;

    fn story_command(caller: Option<UserId>) -> CreateJobCommand {
        CreateJobCommand {
            caller,
            job_type: "story_generation".to_string(),
            parameters: json!({ "topic": "otters", "level": "A2" }),
            priority: None,
        }
    }

    #[tokio::test]
    async fn given_valid_story_request_when_execute_should_insert_pending_job() {
        let ctx = memory_context();
        let user = UserId::new();

        let job = CreateJobUseCase::execute(&ctx, story_command(Some(user)))
            .await
            .unwrap();

        assert_eq!(job.status, JobStatus::Pending);
        assert_eq!(job.job_type, JobType::StoryGeneration);
        assert_eq!(job.user_id, user);
        assert_eq!(job.priority, 0);
        assert_eq!(job.max_retries, 3);
        assert_eq!(job.retry_count, 0);
        let eta = job.estimated_completion_at.unwrap();
        assert_eq!(
            eta.elapsed_since(job.created_at),
            -time::Duration::seconds(45)
        );
        let stored = ctx.repos.job.get(job.id).await.unwrap();
        assert_eq!(stored, Some(job));
    }

    #[tokio::test]
    async fn given_audio_request_when_execute_should_copy_story_id_to_job() {
        let ctx = memory_context();
        let story = uuid::Uuid::new_v4();
        let command = CreateJobCommand {
            caller: Some(UserId::new()),
            job_type: "audio_generation".to_string(),
            parameters: json!({ "story_id": story.to_string(), "text": "Hello" }),
            priority: Some(2),
        };

        let job = CreateJobUseCase::execute(&ctx, command).await.unwrap();

        assert_eq!(job.story_id.map(|s| s.0), Some(story));
        assert_eq!(job.priority, 2);
    }

    #[tokio::test]
    async fn given_missing_caller_when_execute_should_return_unauthorized() {
        let ctx = test_context();

        let result = CreateJobUseCase::execute(&ctx, story_command(None)).await;

        assert!(matches!(result, Err(CreateJobError::Unauthorized)));
    }

    #[tokio::test]
    async fn given_invalid_parameters_when_execute_should_not_persist() {
        // The null store fails every call, so reaching storage would surface Storage.
        let ctx = test_context();
        let command = CreateJobCommand {
            parameters: json!({ "topic": "", "level": "A2" }),
            ..story_command(Some(UserId::new()))
        };

        let result = CreateJobUseCase::execute(&ctx, command).await;

        assert!(matches!(
            result,
            Err(CreateJobError::Validation(ValidationError::InvalidField { .. }))
        ));
    }

    #[tokio::test]
    async fn given_unknown_type_when_execute_should_return_validation_error() {
        let ctx = test_context();
        let command = CreateJobCommand {
            job_type: "video_generation".to_string(),
            ..story_command(Some(UserId::new()))
        };

        let result = CreateJobUseCase::execute(&ctx, command).await;

        assert!(matches!(
            result,
            Err(CreateJobError::Validation(ValidationError::UnknownJobType(_)))
        ));
    }

    #[tokio::test]
    async fn given_store_unavailable_when_execute_should_return_storage_error() {
        let ctx = test_context();

        let result = CreateJobUseCase::execute(&ctx, story_command(Some(UserId::new()))).await;

        assert!(matches!(result, Err(CreateJobError::Storage(_))));
    }
}
