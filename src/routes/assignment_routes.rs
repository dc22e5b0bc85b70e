use axum::{
    extract::{Path, Query, State},
    http::HeaderMap,
    routing::{delete, get, post},
    Json, Router,
};
use uuid::Uuid;

use crate::controllers::assignment_controller::AssignmentController;
use crate::dto::assignment_dto::{
    ApiResponse, AssignmentResponse, CancelAssignmentRequest, ConfirmDriversRequest,
    CreateAssignmentRequest, SeatResponse,
};
use crate::models::AssignmentFilters;
use crate::services::ConfirmationResult;
use crate::state::AppState;
use crate::utils::errors::AppError;

pub fn create_assignment_router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_assignment))
        .route("/", get(list_assignments))
        .route("/:id", get(get_assignment))
        .route("/:id", delete(delete_assignment))
        .route("/:id/confirm", post(confirm_drivers))
        .route("/:id/cancel", post(cancel_assignment))
        .route("/seat/:id/unconfirm", post(unconfirm_driver))
}

// El actor llega como header opcional puesto por el gateway de permisos
fn actor_from_headers(headers: &HeaderMap) -> Option<Uuid> {
    headers
        .get("x-actor-id")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| Uuid::parse_str(value).ok())
}

async fn create_assignment(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<CreateAssignmentRequest>,
) -> Result<Json<ApiResponse<AssignmentResponse>>, AppError> {
    let actor = actor_from_headers(&headers);
    let controller = AssignmentController::new(state.engine.clone());
    let response = controller.create(request, actor).await?;
    Ok(Json(response))
}

async fn list_assignments(
    State(state): State<AppState>,
    Query(filters): Query<AssignmentFilters>,
) -> Result<Json<Vec<AssignmentResponse>>, AppError> {
    let controller = AssignmentController::new(state.engine.clone());
    let response = controller.list(filters).await?;
    Ok(Json(response))
}

async fn get_assignment(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<AssignmentResponse>, AppError> {
    let controller = AssignmentController::new(state.engine.clone());
    let response = controller.get_by_id(id).await?;
    Ok(Json(response))
}

async fn confirm_drivers(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
    Json(request): Json<ConfirmDriversRequest>,
) -> Result<Json<ApiResponse<ConfirmationResult>>, AppError> {
    let actor = actor_from_headers(&headers);
    let controller = AssignmentController::new(state.engine.clone());
    let response = controller.confirm(id, request, actor).await?;
    Ok(Json(response))
}

async fn unconfirm_driver(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
) -> Result<Json<ApiResponse<SeatResponse>>, AppError> {
    let actor = actor_from_headers(&headers);
    let controller = AssignmentController::new(state.engine.clone());
    let response = controller.unconfirm(id, actor).await?;
    Ok(Json(response))
}

async fn cancel_assignment(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
    Json(request): Json<CancelAssignmentRequest>,
) -> Result<Json<ApiResponse<AssignmentResponse>>, AppError> {
    let actor = actor_from_headers(&headers);
    let controller = AssignmentController::new(state.engine.clone());
    let response = controller.cancel(id, request, actor).await?;
    Ok(Json(response))
}

async fn delete_assignment(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
) -> Result<Json<serde_json::Value>, AppError> {
    let actor = actor_from_headers(&headers);
    let controller = AssignmentController::new(state.engine.clone());
    controller.delete(id, actor).await?;
    Ok(Json(serde_json::json!({
        "success": true,
        "message": "Asignación eliminada exitosamente"
    })))
}
