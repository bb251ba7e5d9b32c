use crate::client::gateway::{GatewayError, JobGateway};
use crate::domain::entities::job::{Job, JobType};
use crate::domain::value_objects::ids::JobId;
use crate::interface::http::dto::job::{CreateJobRequest, JobListResponse};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

/// Talks to the job API over HTTP with a bearer API key.
pub struct HttpJobGateway {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl HttpJobGateway {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T, GatewayError> {
        let response = request
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(|e| GatewayError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            debug!(status = status.as_u16(), "job_api_error");
            return Err(map_status(status, body));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| GatewayError::Parse(e.to_string()))
    }
}

/// Problem responses carry a human readable `detail`; fall back to the raw body.
fn problem_detail(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.get("detail").and_then(Value::as_str).map(str::to_string))
        .unwrap_or_else(|| body.to_string())
}

fn map_status(status: StatusCode, body: String) -> GatewayError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => GatewayError::Unauthorized,
        StatusCode::NOT_FOUND => GatewayError::NotFound,
        StatusCode::CONFLICT => GatewayError::InvalidState,
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
            GatewayError::Rejected(problem_detail(&body))
        }
        other => GatewayError::Api(other.as_u16(), problem_detail(&body)),
    }
}

#[async_trait]
impl JobGateway for HttpJobGateway {
    async fn create_job(
        &self,
        job_type: JobType,
        parameters: Value,
        priority: Option<i32>,
    ) -> Result<Job, GatewayError> {
        let body = CreateJobRequest {
            job_type: job_type.as_str().to_string(),
            parameters,
            priority,
        };
        self.send(self.client.post(self.url("/jobs")).json(&body))
            .await
    }

    async fn list_jobs(&self, limit: u32) -> Result<Vec<Job>, GatewayError> {
        let request = self
            .client
            .get(self.url("/jobs"))
            .query(&[("limit", limit)]);
        let list: JobListResponse = self.send(request).await?;
        Ok(list.jobs)
    }

    async fn retry_job(&self, job_id: JobId) -> Result<Job, GatewayError> {
        self.send(self.client.post(self.url(&format!("/jobs/{job_id}/retry"))))
            .await
    }

    async fn cancel_job(&self, job_id: JobId) -> Result<Job, GatewayError> {
        self.send(self.client.post(self.url(&format!("/jobs/{job_id}/cancel"))))
            .await
    }
}
