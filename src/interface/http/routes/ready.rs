use crate::infrastructure::db::repositories::Repositories;
use crate::interface::http::state::AppState;
use axum::Json;
use axum::Router;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct Readiness {
    pub status: &'static str,
    pub api_store: bool,
    pub worker_store: bool,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/ready", get(ready))
}

async fn reachable(repos: &Repositories, side: &'static str) -> bool {
    match repos.ping().await {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(side, error = ?e, "readiness_ping_failed");
            false
        }
    }
}

/// Ready once both the user-facing and the worker store answer.
async fn ready(State(state): State<AppState>) -> (StatusCode, Json<Readiness>) {
    let api_store = reachable(&state.ctx.repos, "api").await;
    let worker_store = reachable(&state.worker.repos, "worker").await;
    let (code, status) = if api_store && worker_store {
        (StatusCode::OK, "ready")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "not_ready")
    };
    (
        code,
        Json(Readiness {
            status,
            api_store,
            worker_store,
        }),
    )
}
