use crate::application::context::AppContext;
use crate::application::usecases::cancel_job::{CancelJobError, CancelJobUseCase};
use crate::application::usecases::create_job::{CreateJobCommand, CreateJobError, CreateJobUseCase};
use crate::application::usecases::list_jobs::{ListJobsError, ListJobsUseCase};
use crate::application::usecases::retry_job::{RetryJobError, RetryJobUseCase};
use crate::domain::entities::job::{Job, JobType};
use crate::domain::value_objects::ids::{JobId, UserId};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
    #[error("caller is not authenticated")]
    Unauthorized,
    #[error("job not found")]
    NotFound,
    #[error("job is not in a state that allows this operation")]
    InvalidState,
    #[error("request rejected: {0}")]
    Rejected(String),
    #[error("network error: {0}")]
    Network(String),
    #[error("API error ({0}): {1}")]
    Api(u16, String),
    #[error("parse error: {0}")]
    Parse(String),
}

/// The client's view of the job service, always acting as one caller.
#[async_trait]
pub trait JobGateway: Send + Sync {
    async fn create_job(
        &self,
        job_type: JobType,
        parameters: Value,
        priority: Option<i32>,
    ) -> Result<Job, GatewayError>;

    /// The caller's most recent jobs, newest first.
    async fn list_jobs(&self, limit: u32) -> Result<Vec<Job>, GatewayError>;

    async fn retry_job(&self, job_id: JobId) -> Result<Job, GatewayError>;

    async fn cancel_job(&self, job_id: JobId) -> Result<Job, GatewayError>;
}

/// Gateway that calls the use cases directly, for single-process setups and tests.
pub struct InProcessGateway {
    ctx: Arc<AppContext>,
    caller: UserId,
}

impl InProcessGateway {
    pub fn new(ctx: Arc<AppContext>, caller: UserId) -> Self {
        Self { ctx, caller }
    }
}

#[async_trait]
impl JobGateway for InProcessGateway {
    async fn create_job(
        &self,
        job_type: JobType,
        parameters: Value,
        priority: Option<i32>,
    ) -> Result<Job, GatewayError> {
        let command = CreateJobCommand {
            caller: Some(self.caller),
            job_type: job_type.as_str().to_string(),
            parameters,
            priority,
        };
        CreateJobUseCase::execute(&self.ctx, command)
            .await
            .map_err(|e| match e {
                CreateJobError::Unauthorized => GatewayError::Unauthorized,
                CreateJobError::Validation(v) => GatewayError::Rejected(v.to_string()),
                CreateJobError::Storage(s) => GatewayError::Api(500, s),
            })
    }

    async fn list_jobs(&self, limit: u32) -> Result<Vec<Job>, GatewayError> {
        ListJobsUseCase::execute(&self.ctx, self.caller, Some(limit))
            .await
            .map_err(|ListJobsError::Storage(s)| GatewayError::Api(500, s))
    }

    async fn retry_job(&self, job_id: JobId) -> Result<Job, GatewayError> {
        RetryJobUseCase::execute(&self.ctx, self.caller, job_id)
            .await
            .map_err(|e| match e {
                RetryJobError::NotFound => GatewayError::NotFound,
                RetryJobError::InvalidState => GatewayError::InvalidState,
                RetryJobError::Storage(s) => GatewayError::Api(500, s),
            })
    }

    async fn cancel_job(&self, job_id: JobId) -> Result<Job, GatewayError> {
        CancelJobUseCase::execute(&self.ctx, self.caller, job_id)
            .await
            .map_err(|e| match e {
                CancelJobError::NotFound => GatewayError::NotFound,
                CancelJobError::InvalidState => GatewayError::InvalidState,
                CancelJobError::Storage(s) => GatewayError::Api(500, s),
            })
    }
}
