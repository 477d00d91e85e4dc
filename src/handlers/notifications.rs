// src/handlers/notifications.rs
//
// Caixa de entrada por papel: cada usuário enxerga as notificações
// endereçadas ao seu papel (owner, admin, desainer, operator).

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use serde_json::json;
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::auth::AuthenticatedUser,
    middleware::roles::{Management, RequireRole},
    models::auth::Role,
    models::notifications::Notification,
};

const DEFAULT_LIMIT: i64 = 20;

#[derive(Debug, Deserialize)]
pub struct ListNotificationsQuery {
    pub unread: Option<bool>,
    pub limit: Option<i64>,
}

// GET /api/notifications?unread=true&limit=N
#[utoipa::path(
    get,
    path = "/api/notifications",
    tag = "Notifications",
    params(
        ("unread" = Option<bool>, Query, description = "Somente não lidas"),
        ("limit" = Option<i64>, Query, description = "Máximo de linhas (padrão 20)")
    ),
    responses(
        (status = 200, description = "Caixa de entrada do papel do usuário", body = [Notification])
    ),
    security(("api_jwt" = []))
)]
pub async fn list_notifications(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Query(query): Query<ListNotificationsQuery>,
) -> Result<Json<Vec<Notification>>, AppError> {
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, 100);
    let notifications = app_state
        .notification_repo
        .list_for_role(user.role, query.unread.unwrap_or(false), limit)
        .await?;
    Ok(Json(notifications))
}

// GET /api/notifications/unread-count
#[utoipa::path(
    get,
    path = "/api/notifications/unread-count",
    tag = "Notifications",
    responses(
        (status = 200, description = "Quantidade de não lidas do papel do usuário")
    ),
    security(("api_jwt" = []))
)]
pub async fn unread_count(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
) -> Result<impl IntoResponse, AppError> {
    let count = app_state.notification_repo.unread_count(user.role).await?;
    Ok(Json(json!({ "count": count })))
}

// PUT /api/notifications/{id}/read
#[utoipa::path(
    put,
    path = "/api/notifications/{id}/read",
    tag = "Notifications",
    params(("id" = i64, Path, description = "ID da notificação")),
    responses(
        (status = 204, description = "Marcada como lida"),
        (status = 404, description = "Notificação não encontrada na caixa do papel")
    ),
    security(("api_jwt" = []))
)]
pub async fn mark_read(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    app_state.notification_repo.mark_read(id, user.role).await?;
    Ok(StatusCode::NO_CONTENT)
}

// PUT /api/notifications/read-all
#[utoipa::path(
    put,
    path = "/api/notifications/read-all",
    tag = "Notifications",
    responses(
        (status = 200, description = "Não lidas do papel do usuário marcadas como lidas")
    ),
    security(("api_jwt" = []))
)]
pub async fn mark_all_read(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
) -> Result<impl IntoResponse, AppError> {
    let updated = app_state.notification_repo.mark_all_read(user.role).await?;
    Ok(Json(json!({ "updated": updated })))
}

// DELETE /api/notifications/{id}
#[utoipa::path(
    delete,
    path = "/api/notifications/{id}",
    tag = "Notifications",
    params(("id" = i64, Path, description = "ID da notificação")),
    responses(
        (status = 204, description = "Notificação removida"),
        (status = 404, description = "Notificação não encontrada na caixa do papel")
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_notification(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    app_state.notification_repo.delete(id, user.role).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SendNotificationPayload {
    pub order_id: Option<i64>,
    #[schema(example = "aviso")]
    pub r#type: Option<String>,
    #[validate(length(min = 1, message = "O título é obrigatório."))]
    pub title: String,
    #[validate(length(min = 1, message = "A mensagem é obrigatória."))]
    pub message: String,
    pub target_role: Role,
}

// POST /api/notifications/send — entrada manual, direto na caixa do papel.
#[utoipa::path(
    post,
    path = "/api/notifications/send",
    tag = "Notifications",
    request_body = SendNotificationPayload,
    responses(
        (status = 201, description = "Notificação registrada", body = Notification)
    ),
    security(("api_jwt" = []))
)]
pub async fn send_notification(
    State(app_state): State<AppState>,
    _guard: RequireRole<Management>,
    Json(payload): Json<SendNotificationPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate().map_err(AppError::ValidationError)?;

    let notification = app_state
        .notification_repo
        .insert(
            payload.order_id,
            payload.r#type.as_deref().unwrap_or("manual"),
            &payload.title,
            &payload.message,
            payload.target_role,
        )
        .await?;

    Ok((StatusCode::CREATED, Json(notification)))
}
