use crate::domain::entities::job::Job;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateJobRequest {
    pub job_type: String,
    #[serde(default)]
    pub parameters: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub struct ListJobsQuery {
    pub limit: Option<u32>,
}

/// Jobs are returned in their stored shape; a list wraps them in `jobs`.
#[derive(Debug, Serialize, Deserialize)]
pub struct JobListResponse {
    pub jobs: Vec<Job>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct WorkerTickResponse {
    pub processed: usize,
    pub outcomes: Vec<WorkerRunSummary>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct WorkerRunSummary {
    pub job_id: String,
    pub job_type: String,
    pub status: String,
    pub outcome: String,
}
