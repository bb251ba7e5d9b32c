// HTTP routes: create/list/get/retry/cancel jobs for the authenticated user.

use crate::application::usecases::cancel_job::{CancelJobError, CancelJobUseCase};
use crate::application::usecases::create_job::{CreateJobCommand, CreateJobError, CreateJobUseCase};
use crate::application::usecases::get_job::{GetJobError, GetJobUseCase};
use crate::application::usecases::list_jobs::{ListJobsError, ListJobsUseCase};
use crate::application::usecases::retry_job::{RetryJobError, RetryJobUseCase};
use crate::domain::value_objects::ids::{JobId, UserId};
use crate::interface::http::dto::job::{CreateJobRequest, JobListResponse, ListJobsQuery};
use crate::interface::http::problem::{
    PGC_AUTH_INVALID_CREDENTIALS, PGC_JOB_CONFLICT, PGC_JOB_NOT_FOUND, PGC_JOB_VALIDATION_FAILED,
    PGC_REQUEST_MALFORMED, PGC_STORAGE_DB_ERROR, problem,
};
use crate::interface::http::state::AppState;
use crate::interface::http::trace::TraceId;
use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Extension, Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};

/// Builds job routes.
pub fn router() -> axum::Router<AppState> {
    axum::Router::new()
        .route("/jobs", post(create_job).get(list_jobs))
        .route("/jobs/{job_id}", get(get_job))
        .route("/jobs/{job_id}/retry", post(retry_job))
        .route("/jobs/{job_id}/cancel", post(cancel_job))
}

fn parse_job_id(raw: &str, trace_id: &TraceId) -> Result<JobId, Response> {
    raw.parse::<JobId>().map_err(|_| {
        problem(
            StatusCode::BAD_REQUEST,
            PGC_REQUEST_MALFORMED,
            Some("job id must be a UUID".to_string()),
            None,
            Some(trace_id.0.clone()),
        )
    })
}

fn storage_problem(detail: String, trace_id: &TraceId) -> Response {
    tracing::error!(trace_id = %trace_id.0, detail = %detail, "job_storage_error");
    problem(
        StatusCode::INTERNAL_SERVER_ERROR,
        PGC_STORAGE_DB_ERROR,
        Some("storage error".to_string()),
        None,
        Some(trace_id.0.clone()),
    )
}

fn not_found(job_id: JobId, trace_id: &TraceId) -> Response {
    problem(
        StatusCode::NOT_FOUND,
        PGC_JOB_NOT_FOUND,
        Some("job not found".to_string()),
        Some(format!("/jobs/{job_id}")),
        Some(trace_id.0.clone()),
    )
}

fn conflict(job_id: JobId, detail: &str, trace_id: &TraceId) -> Response {
    problem(
        StatusCode::CONFLICT,
        PGC_JOB_CONFLICT,
        Some(detail.to_string()),
        Some(format!("/jobs/{job_id}")),
        Some(trace_id.0.clone()),
    )
}

/// Creates a job and returns it with status 201.
async fn create_job(
    State(state): State<AppState>,
    Extension(user_id): Extension<UserId>,
    Extension(trace_id): Extension<TraceId>,
    payload: Result<Json<CreateJobRequest>, JsonRejection>,
) -> Response {
    // Step 1: Reject unreadable bodies up front.
    let Json(payload) = match payload {
        Ok(payload) => payload,
        Err(rejection) => {
            return problem(
                StatusCode::BAD_REQUEST,
                PGC_REQUEST_MALFORMED,
                Some(rejection.body_text()),
                None,
                Some(trace_id.0.clone()),
            );
        }
    };

    // Step 2: Execute the create use case.
    let result = CreateJobUseCase::execute(
        &state.ctx,
        CreateJobCommand {
            caller: Some(user_id),
            job_type: payload.job_type,
            parameters: payload.parameters,
            priority: payload.priority,
        },
    )
    .await;

    // Step 3: Map output to HTTP response.
    match result {
        Ok(job) => (StatusCode::CREATED, Json(job)).into_response(),
        Err(CreateJobError::Unauthorized) => problem(
            StatusCode::UNAUTHORIZED,
            PGC_AUTH_INVALID_CREDENTIALS,
            Some("caller is not authenticated".to_string()),
            None,
            Some(trace_id.0.clone()),
        ),
        Err(CreateJobError::Validation(e)) => problem(
            StatusCode::BAD_REQUEST,
            PGC_JOB_VALIDATION_FAILED,
            Some(e.to_string()),
            None,
            Some(trace_id.0.clone()),
        ),
        Err(CreateJobError::Storage(detail)) => storage_problem(detail, &trace_id),
    }
}

async fn list_jobs(
    State(state): State<AppState>,
    Extension(user_id): Extension<UserId>,
    Extension(trace_id): Extension<TraceId>,
    Query(query): Query<ListJobsQuery>,
) -> Response {
    match ListJobsUseCase::execute(&state.ctx, user_id, query.limit).await {
        Ok(jobs) => Json(JobListResponse { jobs }).into_response(),
        Err(ListJobsError::Storage(detail)) => storage_problem(detail, &trace_id),
    }
}

async fn get_job(
    State(state): State<AppState>,
    Extension(user_id): Extension<UserId>,
    Extension(trace_id): Extension<TraceId>,
    Path(job_id): Path<String>,
) -> Response {
    let job_id = match parse_job_id(&job_id, &trace_id) {
        Ok(id) => id,
        Err(response) => return response,
    };
    match GetJobUseCase::execute(&state.ctx, user_id, job_id).await {
        Ok(job) => Json(job).into_response(),
        Err(GetJobError::NotFound) => not_found(job_id, &trace_id),
        Err(GetJobError::Storage(detail)) => storage_problem(detail, &trace_id),
    }
}

async fn retry_job(
    State(state): State<AppState>,
    Extension(user_id): Extension<UserId>,
    Extension(trace_id): Extension<TraceId>,
    Path(job_id): Path<String>,
) -> Response {
    let job_id = match parse_job_id(&job_id, &trace_id) {
        Ok(id) => id,
        Err(response) => return response,
    };
    match RetryJobUseCase::execute(&state.ctx, user_id, job_id).await {
        Ok(job) => Json(job).into_response(),
        Err(RetryJobError::NotFound) => not_found(job_id, &trace_id),
        Err(RetryJobError::InvalidState) => {
            conflict(job_id, "only failed jobs can be retried", &trace_id)
        }
        Err(RetryJobError::Storage(detail)) => storage_problem(detail, &trace_id),
    }
}

async fn cancel_job(
    State(state): State<AppState>,
    Extension(user_id): Extension<UserId>,
    Extension(trace_id): Extension<TraceId>,
    Path(job_id): Path<String>,
) -> Response {
    let job_id = match parse_job_id(&job_id, &trace_id) {
        Ok(id) => id,
        Err(response) => return response,
    };
    match CancelJobUseCase::execute(&state.ctx, user_id, job_id).await {
        Ok(job) => Json(job).into_response(),
        Err(CancelJobError::NotFound) => not_found(job_id, &trace_id),
        Err(CancelJobError::InvalidState) => conflict(
            job_id,
            "only pending or processing jobs can be cancelled",
            &trace_id,
        ),
        Err(CancelJobError::Storage(detail)) => storage_problem(detail, &trace_id),
    }
}
