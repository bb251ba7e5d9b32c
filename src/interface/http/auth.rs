use crate::application::shared::api_key_helpers::{api_key_hash, api_key_prefix, secrets_match};
use crate::domain::value_objects::ids::UserId;
use crate::interface::http::problem::{
    PGC_AUTH_FORBIDDEN, PGC_AUTH_INVALID_CREDENTIALS, PGC_INTERNAL, problem,
};
use crate::interface::http::state::AppState;
use crate::interface::http::trace::TraceId;
use axum::body::Body;
use axum::extract::State;
use axum::http::{Request, StatusCode, header};
use axum::middleware::Next;
use axum::response::Response;

pub const SCHEDULER_SECRET_HEADER: &str = "x-scheduler-secret";

/// Authenticates the caller and injects their `UserId` into the request.
///
/// Probes are public. `/worker/tick` takes the scheduler secret instead of an API key.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, Response> {
    let trace_id = req.extensions().get::<TraceId>().map(|t| t.0.clone());
    // Step 1: allow unauthenticated public endpoints.
    let path = req.uri().path().to_string();
    if path == "/health" || path == "/ready" || path == "/metrics" {
        return Ok(next.run(req).await);
    }

    // Step 2: the scheduler endpoint is guarded by a shared secret.
    if path == "/worker/tick" {
        let provided = req
            .headers()
            .get(SCHEDULER_SECRET_HEADER)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("");
        if !secrets_match(provided, &state.settings.auth.scheduler_secret) {
            return Err(problem(
                StatusCode::FORBIDDEN,
                PGC_AUTH_FORBIDDEN,
                Some("invalid scheduler secret".to_string()),
                Some(path),
                trace_id,
            ));
        }
        return Ok(next.run(req).await);
    }

    // Step 3: extract the Bearer token from the Authorization header.
    let header_value = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    let raw = header_value
        .strip_prefix("Bearer ")
        .or_else(|| header_value.strip_prefix("bearer "))
        .map(str::trim)
        .unwrap_or("");
    if raw.is_empty() {
        return Err(problem(
            StatusCode::UNAUTHORIZED,
            PGC_AUTH_INVALID_CREDENTIALS,
            Some("missing bearer token".to_string()),
            Some(path),
            trace_id,
        ));
    }

    // Step 4: look up an active API key by prefix + hash.
    let key = state
        .ctx
        .repos
        .api_key
        .get_active_by_prefix_and_hash(&api_key_prefix(raw), &api_key_hash(raw))
        .await
        .map_err(|_| {
            problem(
                StatusCode::INTERNAL_SERVER_ERROR,
                PGC_INTERNAL,
                Some("failed to verify api key".to_string()),
                Some(path.clone()),
                trace_id.clone(),
            )
        })?;

    // Step 5: reject unknown keys; otherwise attach the user id for handlers.
    let Some(key) = key else {
        return Err(problem(
            StatusCode::UNAUTHORIZED,
            PGC_AUTH_INVALID_CREDENTIALS,
            Some("invalid api key".to_string()),
            Some(path),
            trace_id,
        ));
    };

    req.extensions_mut().insert(UserId(key.user_id));
    Ok(next.run(req).await)
}
