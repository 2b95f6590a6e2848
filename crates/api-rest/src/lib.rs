//! # API REST
//!
//! REST API for Clerk.
//!
//! Handles:
//! - HTTP endpoints with axum
//! - OpenAPI/Swagger documentation
//! - REST-specific concerns (JSON bodies, CORS, the `x-actor-role` header)
//!
//! Workflow rules and permission checks live in `clerk-core`; handlers only translate.

#![warn(rust_2018_idioms)]

pub mod dto;
pub mod error;

use axum::{
    extract::{Path as AxumPath, Query, State},
    http::{HeaderMap, StatusCode},
    response::Json,
    routing::{get, post},
    Router,
};
use clerk_core::{
    build_engine, config::optional_path_from_env_value, CoreConfig, FileRepository, ListFilter,
    RecordId, RecordService, WorkflowType,
};
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use dto::*;
use error::{actor_role, bad_request, map_core_error, ApiError};

/// Application state shared across REST handlers.
#[derive(Clone)]
pub struct AppState {
    service: Arc<RecordService>,
}

impl AppState {
    pub fn new(service: Arc<RecordService>) -> Self {
        Self { service }
    }

    /// Builds state over the file repository from `CLERK_RECORD_DATA_DIR` and
    /// `CLERK_PERMISSIONS_FILE`.
    ///
    /// # Errors
    ///
    /// Returns an error if the data directory is missing, the permission matrix cannot be
    /// loaded, or a workflow uses an undeclared module.
    pub fn from_env() -> anyhow::Result<Self> {
        let record_data_dir = std::env::var("CLERK_RECORD_DATA_DIR")
            .unwrap_or_else(|_| clerk_core::DEFAULT_RECORD_DATA_DIR.into());
        let record_data_path = PathBuf::from(&record_data_dir);
        if !record_data_path.exists() {
            anyhow::bail!(
                "Record data directory does not exist: {}",
                record_data_path.display()
            );
        }
        let permissions_file =
            optional_path_from_env_value(std::env::var("CLERK_PERMISSIONS_FILE").ok());

        let cfg = CoreConfig::new(record_data_path, permissions_file)?;
        let engine = Arc::new(build_engine(&cfg)?);
        let repo = Arc::new(FileRepository::from_config(&cfg));
        Ok(Self::new(Arc::new(RecordService::new(engine, repo))))
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health,
        list_workflows,
        get_permissions,
        create_record,
        list_records,
        get_record,
        list_actions,
        apply_action,
        delete_record,
    ),
    components(schemas(
        HealthRes,
        ListWorkflowsRes,
        WorkflowRes,
        TransitionRes,
        PermissionRes,
        CreateRecordReq,
        ApplyActionReq,
        RecordRes,
        HistoryRes,
        ListRecordsRes,
        ActionRes,
        ListActionsRes,
    ))
)]
pub struct ApiDoc;

/// The REST router with Swagger UI and permissive CORS.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/workflows", get(list_workflows))
        .route("/permissions/:role/:module", get(get_permissions))
        .route("/records", get(list_records).post(create_record))
        .route("/records/:id", get(get_record).delete(delete_record))
        .route("/records/:id/actions", get(list_actions))
        .route("/records/:id/actions/:action", post(apply_action))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

fn parse_id(id: &str) -> Result<RecordId, ApiError> {
    id.parse::<RecordId>().map_err(map_core_error)
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Health check response", body = HealthRes)
    )
)]
#[axum::debug_handler]
async fn health(State(_state): State<AppState>) -> Json<HealthRes> {
    Json(HealthRes {
        ok: true,
        message: "Clerk REST API is alive".into(),
    })
}

#[utoipa::path(
    get,
    path = "/workflows",
    responses(
        (status = 200, description = "Workflow definitions", body = ListWorkflowsRes)
    )
)]
/// Lists every workflow definition with its states and transitions.
#[axum::debug_handler]
async fn list_workflows(State(state): State<AppState>) -> Json<ListWorkflowsRes> {
    Json(ListWorkflowsRes::from_catalog(
        state.service.engine().catalog(),
    ))
}

#[utoipa::path(
    get,
    path = "/permissions/{role}/{module}",
    params(
        ("role" = String, Path, description = "Role name"),
        ("module" = String, Path, description = "Module key")
    ),
    responses(
        (status = 200, description = "Permission entry; all false for unknown roles or modules", body = PermissionRes)
    )
)]
/// Permission entry for a role on a module.
///
/// Used for UI visibility. Unknown roles and modules answer all-false rather than an error.
#[axum::debug_handler]
async fn get_permissions(
    State(state): State<AppState>,
    AxumPath((role, module)): AxumPath<(String, String)>,
) -> Json<PermissionRes> {
    let gate = state.service.engine().gate();
    let can = |capability: &str| gate.authorize_raw(Some(&role), &module, capability);
    Json(PermissionRes {
        can_create: can("create"),
        can_read: can("read"),
        can_update: can("update"),
        can_delete: can("delete"),
        role,
        module,
    })
}

#[utoipa::path(
    post,
    path = "/records",
    request_body = CreateRecordReq,
    params(("x-actor-role" = String, Header, description = "Caller role")),
    responses(
        (status = 201, description = "Record created", body = RecordRes),
        (status = 400, description = "Unknown workflow type"),
        (status = 403, description = "Role may not create this workflow"),
        (status = 500, description = "Internal server error")
    )
)]
#[axum::debug_handler]
async fn create_record(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<CreateRecordReq>,
) -> Result<(StatusCode, Json<RecordRes>), ApiError> {
    let role = actor_role(&headers)?;
    let workflow_type = req
        .workflow_type
        .parse::<WorkflowType>()
        .map_err(|e| bad_request(e.to_string()))?;

    let record = state
        .service
        .create(workflow_type, role, req.payload)
        .map_err(map_core_error)?;
    Ok((StatusCode::CREATED, Json(RecordRes::from(&record))))
}

#[utoipa::path(
    get,
    path = "/records",
    params(
        ("x-actor-role" = String, Header, description = "Caller role"),
        ListRecordsQuery
    ),
    responses(
        (status = 200, description = "Readable records, finished first", body = ListRecordsRes),
        (status = 400, description = "Unknown workflow type"),
        (status = 403, description = "Role may not read the requested workflow"),
        (status = 500, description = "Internal server error")
    )
)]
#[axum::debug_handler]
async fn list_records(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<ListRecordsQuery>,
) -> Result<Json<ListRecordsRes>, ApiError> {
    let role = actor_role(&headers)?;
    let workflow_type = query
        .workflow
        .as_deref()
        .map(str::parse::<WorkflowType>)
        .transpose()
        .map_err(|e| bad_request(e.to_string()))?;
    let filter = ListFilter {
        workflow_type,
        include_deleted: query.include_deleted.unwrap_or(false),
    };

    let records = state.service.list(role, filter).map_err(map_core_error)?;
    Ok(Json(ListRecordsRes {
        records: records.iter().map(RecordRes::from).collect(),
    }))
}

#[utoipa::path(
    get,
    path = "/records/{id}",
    params(
        ("id" = String, Path, description = "Record id (32 lowercase hex characters)"),
        ("x-actor-role" = String, Header, description = "Caller role")
    ),
    responses(
        (status = 200, description = "The record", body = RecordRes),
        (status = 400, description = "Malformed id"),
        (status = 403, description = "Role may not read this workflow"),
        (status = 404, description = "No such record")
    )
)]
#[axum::debug_handler]
async fn get_record(
    State(state): State<AppState>,
    headers: HeaderMap,
    AxumPath(id): AxumPath<String>,
) -> Result<Json<RecordRes>, ApiError> {
    let role = actor_role(&headers)?;
    let id = parse_id(&id)?;
    let record = state.service.get(&id, role).map_err(map_core_error)?;
    Ok(Json(RecordRes::from(&record)))
}

#[utoipa::path(
    get,
    path = "/records/{id}/actions",
    params(
        ("id" = String, Path, description = "Record id (32 lowercase hex characters)"),
        ("x-actor-role" = String, Header, description = "Caller role")
    ),
    responses(
        (status = 200, description = "Actions the role may fire now", body = ListActionsRes),
        (status = 403, description = "Role may not read this workflow"),
        (status = 404, description = "No such record")
    )
)]
#[axum::debug_handler]
async fn list_actions(
    State(state): State<AppState>,
    headers: HeaderMap,
    AxumPath(id): AxumPath<String>,
) -> Result<Json<ListActionsRes>, ApiError> {
    let role = actor_role(&headers)?;
    let id = parse_id(&id)?;
    let actions = state
        .service
        .available_actions(&id, role)
        .map_err(map_core_error)?;
    Ok(Json(ListActionsRes {
        actions: actions.into_iter().map(ActionRes::from).collect(),
    }))
}

#[utoipa::path(
    post,
    path = "/records/{id}/actions/{action}",
    request_body = ApplyActionReq,
    params(
        ("id" = String, Path, description = "Record id (32 lowercase hex characters)"),
        ("action" = String, Path, description = "Action name, e.g. markPaid"),
        ("x-actor-role" = String, Header, description = "Caller role")
    ),
    responses(
        (status = 200, description = "Updated record", body = RecordRes),
        (status = 403, description = "Role lacks the capability for this action"),
        (status = 404, description = "No such record"),
        (status = 409, description = "Action not valid in the current state, or concurrent update"),
        (status = 422, description = "Action payload failed the guard")
    )
)]
/// Applies a workflow action to a record.
#[axum::debug_handler]
async fn apply_action(
    State(state): State<AppState>,
    headers: HeaderMap,
    AxumPath((id, action)): AxumPath<(String, String)>,
    Json(req): Json<ApplyActionReq>,
) -> Result<Json<RecordRes>, ApiError> {
    let role = actor_role(&headers)?;
    let id = parse_id(&id)?;
    let record = state
        .service
        .apply(&id, &action, role, &req.payload)
        .map_err(map_core_error)?;
    Ok(Json(RecordRes::from(&record)))
}

#[utoipa::path(
    delete,
    path = "/records/{id}",
    params(
        ("id" = String, Path, description = "Record id (32 lowercase hex characters)"),
        ("x-actor-role" = String, Header, description = "Caller role")
    ),
    responses(
        (status = 200, description = "Soft-deleted record", body = RecordRes),
        (status = 403, description = "Role may not delete this workflow"),
        (status = 404, description = "No such record"),
        (status = 409, description = "Record already deleted")
    )
)]
/// Soft-deletes a record. State and history are kept.
#[axum::debug_handler]
async fn delete_record(
    State(state): State<AppState>,
    headers: HeaderMap,
    AxumPath(id): AxumPath<String>,
) -> Result<Json<RecordRes>, ApiError> {
    let role = actor_role(&headers)?;
    let id = parse_id(&id)?;
    let record = state.service.delete(&id, role).map_err(map_core_error)?;
    Ok(Json(RecordRes::from(&record)))
}
