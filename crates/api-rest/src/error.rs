use axum::http::{HeaderMap, StatusCode};
use clerk_core::{CoreError, Role, WorkflowError};

/// Request header carrying the caller's already-resolved role.
pub const ACTOR_ROLE_HEADER: &str = "x-actor-role";

pub type ApiError = (StatusCode, String);

/// Maps a service error to a status code and message.
///
/// Storage and configuration failures are logged and reported as an opaque 500.
pub fn map_core_error(err: CoreError) -> ApiError {
    let status = match &err {
        CoreError::Workflow(WorkflowError::InvalidTransition { .. }) => StatusCode::CONFLICT,
        CoreError::Workflow(WorkflowError::Unauthorized { .. }) => StatusCode::FORBIDDEN,
        CoreError::Workflow(WorkflowError::GuardFailed(_)) => StatusCode::UNPROCESSABLE_ENTITY,
        CoreError::NotFound(_) => StatusCode::NOT_FOUND,
        CoreError::Conflict { .. } | CoreError::AlreadyExists(_) => StatusCode::CONFLICT,
        CoreError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        _ => {
            tracing::error!("Record service error: {:?}", err);
            return (StatusCode::INTERNAL_SERVER_ERROR, "Internal error".into());
        }
    };
    (status, err.to_string())
}

/// Reads the caller's role. A missing or unknown role is refused.
pub fn actor_role(headers: &HeaderMap) -> Result<Role, ApiError> {
    let Some(value) = headers.get(ACTOR_ROLE_HEADER) else {
        return Err((
            StatusCode::FORBIDDEN,
            format!("missing {ACTOR_ROLE_HEADER} header"),
        ));
    };
    value
        .to_str()
        .ok()
        .and_then(|v| v.parse::<Role>().ok())
        .ok_or_else(|| {
            tracing::warn!(?value, "unknown actor role");
            (
                StatusCode::FORBIDDEN,
                format!("unknown role in {ACTOR_ROLE_HEADER} header"),
            )
        })
}

pub fn bad_request(message: impl Into<String>) -> ApiError {
    (StatusCode::BAD_REQUEST, message.into())
}
