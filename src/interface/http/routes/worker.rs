// HTTP route for the external scheduler.

use crate::application::usecases::worker_tick::WorkerTickUseCase;
use crate::interface::http::dto::job::{WorkerRunSummary, WorkerTickResponse};
use crate::interface::http::problem::{PGC_WORKER_FAILED, problem};
use crate::interface::http::state::AppState;
use crate::interface::http::trace::TraceId;
use axum::Json;
use axum::extract::{Extension, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use tracing::error;

pub fn router() -> axum::Router<AppState> {
    axum::Router::new().route("/worker/tick", post(tick))
}

/// Runs one worker invocation and reports what it did.
async fn tick(State(state): State<AppState>, Extension(trace_id): Extension<TraceId>) -> Response {
    match WorkerTickUseCase::execute(&state.worker).await {
        Ok(report) => {
            let outcomes = report
                .runs
                .iter()
                .map(|run| WorkerRunSummary {
                    job_id: run.job.id.to_string(),
                    job_type: run.job.job_type.as_str().to_string(),
                    status: run.job.status.as_str().to_string(),
                    outcome: run.outcome.as_str().to_string(),
                })
                .collect();
            Json(WorkerTickResponse {
                processed: report.processed(),
                outcomes,
            })
            .into_response()
        }
        Err(e) => {
            error!(trace_id = %trace_id.0, error = ?e, "worker_tick_failed");
            problem(
                StatusCode::INTERNAL_SERVER_ERROR,
                PGC_WORKER_FAILED,
                Some("worker tick failed".to_string()),
                Some("/worker/tick".to_string()),
                Some(trace_id.0),
            )
        }
    }
}
