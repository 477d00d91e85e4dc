// src/handlers/orders.rs

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde_json::json;
use validator::Validate;

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::auth::AuthenticatedUser,
    middleware::roles::{Management, RequireRole},
    models::orders::{
        CreateOrderPayload, HistoryEntry, OrderDetail, OrderItem, OrderSummary,
        UpdateItemStatusPayload, UpdateOrderItemPayload, UpdateOrderPayload,
    },
};

// =============================================================================
//  1. INVOICES
// =============================================================================

// GET /api/orders
#[utoipa::path(
    get,
    path = "/api/orders",
    tag = "Orders",
    responses(
        (status = 200, description = "Pedidos, do mais recente para o mais antigo", body = [OrderSummary])
    ),
    security(("api_jwt" = []))
)]
pub async fn list_orders(
    State(app_state): State<AppState>,
) -> Result<Json<Vec<OrderSummary>>, AppError> {
    let orders = app_state.order_service.list().await?;
    Ok(Json(orders))
}

// POST /api/orders — invoice + itens em uma transação.
#[utoipa::path(
    post,
    path = "/api/orders",
    tag = "Orders",
    request_body = CreateOrderPayload,
    responses(
        (status = 201, description = "Pedido criado", body = OrderDetail),
        (status = 404, description = "Cliente ou produto não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_order(
    State(app_state): State<AppState>,
    _guard: RequireRole<Management>,
    Json(payload): Json<CreateOrderPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate().map_err(AppError::ValidationError)?;

    let detail = app_state.order_service.create_order(payload).await?;
    Ok((StatusCode::CREATED, Json(detail)))
}

// GET /api/orders/{id}
#[utoipa::path(
    get,
    path = "/api/orders/{id}",
    tag = "Orders",
    params(("id" = i64, Path, description = "ID do pedido")),
    responses(
        (status = 200, description = "Pedido com itens", body = OrderDetail),
        (status = 404, description = "Pedido não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_order(
    State(app_state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<OrderDetail>, AppError> {
    let detail = app_state.order_service.detail(id).await?;
    Ok(Json(detail))
}

// PUT /api/orders/{id} — `items` presente substitui todos os itens.
#[utoipa::path(
    put,
    path = "/api/orders/{id}",
    tag = "Orders",
    request_body = UpdateOrderPayload,
    params(("id" = i64, Path, description = "ID do pedido")),
    responses(
        (status = 200, description = "Pedido atualizado", body = OrderDetail),
        (status = 404, description = "Pedido, cliente ou produto não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_order(
    State(app_state): State<AppState>,
    _guard: RequireRole<Management>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateOrderPayload>,
) -> Result<Json<OrderDetail>, AppError> {
    payload.validate().map_err(AppError::ValidationError)?;

    let detail = app_state.order_service.update_order(id, payload).await?;
    Ok(Json(detail))
}

// GET /api/orders/{id}/timeline — trilha de auditoria, mais antigo primeiro.
#[utoipa::path(
    get,
    path = "/api/orders/{id}/timeline",
    tag = "Orders",
    params(("id" = i64, Path, description = "ID do pedido")),
    responses(
        (status = 200, description = "Linha do tempo da invoice", body = [HistoryEntry]),
        (status = 404, description = "Pedido não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn order_timeline(
    State(app_state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Vec<HistoryEntry>>, AppError> {
    let entries = app_state.order_service.timeline(id).await?;
    Ok(Json(entries))
}

// =============================================================================
//  2. ITENS
// =============================================================================

// PUT /api/order-items/{id}/status — override administrativo: escreve o
// status sem validar o grafo de transições. O enum fechado do payload já
// é a allow-list.
#[utoipa::path(
    put,
    path = "/api/order-items/{id}/status",
    tag = "Orders",
    request_body = UpdateItemStatusPayload,
    params(("id" = i64, Path, description = "ID do item")),
    responses(
        (status = 200, description = "Status gravado", body = OrderItem),
        (status = 404, description = "Item não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_item_status(
    State(app_state): State<AppState>,
    _guard: RequireRole<Management>,
    AuthenticatedUser(actor): AuthenticatedUser,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateItemStatusPayload>,
) -> Result<Json<OrderItem>, AppError> {
    let item = app_state
        .workflow_service
        .update_item_status(id, payload.status, &actor)
        .await?;
    Ok(Json(item))
}

// PUT /api/order-items/{id} — atualização parcial (status fica de fora).
#[utoipa::path(
    put,
    path = "/api/order-items/{id}",
    tag = "Orders",
    request_body = UpdateOrderItemPayload,
    params(("id" = i64, Path, description = "ID do item")),
    responses(
        (status = 200, description = "Item atualizado", body = OrderItem),
        (status = 404, description = "Item não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_item(
    State(app_state): State<AppState>,
    _guard: RequireRole<Management>,
    AuthenticatedUser(actor): AuthenticatedUser,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateOrderItemPayload>,
) -> Result<Json<OrderItem>, AppError> {
    payload.validate().map_err(AppError::ValidationError)?;

    let item = app_state
        .order_service
        .update_item(id, &actor, payload)
        .await?;
    Ok(Json(item))
}

// DELETE /api/order-items/{id} — o último item derruba a invoice junto.
#[utoipa::path(
    delete,
    path = "/api/order-items/{id}",
    tag = "Orders",
    params(("id" = i64, Path, description = "ID do item")),
    responses(
        (status = 200, description = "Item removido; `invoiceDeleted` indica se a invoice caiu junto"),
        (status = 404, description = "Item não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_item(
    State(app_state): State<AppState>,
    _guard: RequireRole<Management>,
    AuthenticatedUser(actor): AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let invoice_deleted = app_state.order_service.delete_item(id, &actor).await?;
    Ok(Json(json!({ "invoiceDeleted": invoice_deleted })))
}
