// src/handlers/workflow.rs
//
// Endpoints das bancadas de produção: a fila de desenho (/api/designs) e
// a de impressão (/api/operator). Cada ação delega ao motor de workflow,
// que valida a transição e executa os efeitos em uma transação.

use axum::{
    extract::{Path, State},
    Json,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use utoipa::ToSchema;

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::auth::AuthenticatedUser,
    middleware::roles::{
        DesignQueueView, DesignStation, PrintQueueView, PrintStation, RequireRole,
    },
    models::inventory::ProductionMaterialDetail,
    models::orders::{ClaimItemPayload, OrderItem, ProductionQueueItem},
};

// =============================================================================
//  1. BANCADA DE DESENHO
// =============================================================================

// GET /api/designs — itens em 'Di Desain' / 'Proses Desain'.
#[utoipa::path(
    get,
    path = "/api/designs",
    tag = "Workflow",
    responses(
        (status = 200, description = "Fila de desenho", body = [ProductionQueueItem])
    ),
    security(("api_jwt" = []))
)]
pub async fn design_queue(
    State(app_state): State<AppState>,
    _guard: RequireRole<DesignQueueView>,
) -> Result<Json<Vec<ProductionQueueItem>>, AppError> {
    let items = app_state.workflow_service.design_queue().await?;
    Ok(Json(items))
}

// POST /api/designs/kerjakan — desainer assume o item da fila.
#[utoipa::path(
    post,
    path = "/api/designs/kerjakan",
    tag = "Workflow",
    request_body = ClaimItemPayload,
    responses(
        (status = 200, description = "Item em desenho", body = OrderItem),
        (status = 404, description = "Item não encontrado"),
        (status = 409, description = "Item não está em 'Di Desain'")
    ),
    security(("api_jwt" = []))
)]
pub async fn start_design(
    State(app_state): State<AppState>,
    _guard: RequireRole<DesignStation>,
    AuthenticatedUser(actor): AuthenticatedUser,
    Json(payload): Json<ClaimItemPayload>,
) -> Result<Json<OrderItem>, AppError> {
    let item = app_state
        .workflow_service
        .start_design(payload.item_id, &actor)
        .await?;
    Ok(Json(item))
}

// POST /api/designs/kirim/{item_id} — desenho pronto, vai para aprovação.
#[utoipa::path(
    post,
    path = "/api/designs/kirim/{item_id}",
    tag = "Workflow",
    params(("item_id" = i64, Path, description = "ID do item")),
    responses(
        (status = 200, description = "Desenho enviado para aprovação", body = OrderItem),
        (status = 404, description = "Item não encontrado"),
        (status = 409, description = "Item não está em 'Proses Desain'")
    ),
    security(("api_jwt" = []))
)]
pub async fn finish_design(
    State(app_state): State<AppState>,
    _guard: RequireRole<DesignStation>,
    AuthenticatedUser(actor): AuthenticatedUser,
    Path(item_id): Path<i64>,
) -> Result<Json<OrderItem>, AppError> {
    let item = app_state
        .workflow_service
        .finish_design(item_id, &actor)
        .await?;
    Ok(Json(item))
}

// DELETE /api/designs/batal/{item_id} — cancela dentro do fluxo de desenho.
#[utoipa::path(
    delete,
    path = "/api/designs/batal/{item_id}",
    tag = "Workflow",
    params(("item_id" = i64, Path, description = "ID do item")),
    responses(
        (status = 200, description = "Item cancelado", body = OrderItem),
        (status = 404, description = "Item não encontrado"),
        (status = 409, description = "Item fora do fluxo de desenho")
    ),
    security(("api_jwt" = []))
)]
pub async fn cancel_design(
    State(app_state): State<AppState>,
    _guard: RequireRole<DesignStation>,
    AuthenticatedUser(actor): AuthenticatedUser,
    Path(item_id): Path<i64>,
) -> Result<Json<OrderItem>, AppError> {
    let item = app_state
        .workflow_service
        .cancel_design(item_id, &actor)
        .await?;
    Ok(Json(item))
}

// =============================================================================
//  2. BANCADA DE IMPRESSÃO
// =============================================================================

// GET /api/operator/jobs — itens em 'Operator' / 'Proses Cetak'.
#[utoipa::path(
    get,
    path = "/api/operator/jobs",
    tag = "Workflow",
    responses(
        (status = 200, description = "Fila de impressão", body = [ProductionQueueItem])
    ),
    security(("api_jwt" = []))
)]
pub async fn job_queue(
    State(app_state): State<AppState>,
    _guard: RequireRole<PrintQueueView>,
) -> Result<Json<Vec<ProductionQueueItem>>, AppError> {
    let items = app_state.workflow_service.job_queue().await?;
    Ok(Json(items))
}

// POST /api/operator/kerjakan — operador assume o item da fila.
#[utoipa::path(
    post,
    path = "/api/operator/kerjakan",
    tag = "Workflow",
    request_body = ClaimItemPayload,
    responses(
        (status = 200, description = "Item em impressão", body = OrderItem),
        (status = 404, description = "Item não encontrado"),
        (status = 409, description = "Item não está em 'Operator'")
    ),
    security(("api_jwt" = []))
)]
pub async fn start_job(
    State(app_state): State<AppState>,
    _guard: RequireRole<PrintStation>,
    AuthenticatedUser(actor): AuthenticatedUser,
    Json(payload): Json<ClaimItemPayload>,
) -> Result<Json<OrderItem>, AppError> {
    let item = app_state
        .workflow_service
        .start_job(payload.item_id, &actor)
        .await?;
    Ok(Json(item))
}

// POST /api/operator/kirim/{item_id} — finaliza a impressão, debitando a
// receita do produto. Falta de material aborta tudo com o erro nomeando
// o material, o disponível e o necessário.
#[utoipa::path(
    post,
    path = "/api/operator/kirim/{item_id}",
    tag = "Workflow",
    params(("item_id" = i64, Path, description = "ID do item")),
    responses(
        (status = 200, description = "Item finalizado", body = OrderItem),
        (status = 400, description = "Estoque insuficiente de algum material"),
        (status = 404, description = "Item não encontrado"),
        (status = 409, description = "Item não está em 'Proses Cetak'")
    ),
    security(("api_jwt" = []))
)]
pub async fn finish_job(
    State(app_state): State<AppState>,
    _guard: RequireRole<PrintStation>,
    AuthenticatedUser(actor): AuthenticatedUser,
    Path(item_id): Path<i64>,
) -> Result<Json<OrderItem>, AppError> {
    let item = app_state
        .workflow_service
        .finish_job(item_id, &actor)
        .await?;
    Ok(Json(item))
}

// DELETE /api/operator/batal/{item_id} — cancela qualquer item não terminal.
#[utoipa::path(
    delete,
    path = "/api/operator/batal/{item_id}",
    tag = "Workflow",
    params(("item_id" = i64, Path, description = "ID do item")),
    responses(
        (status = 200, description = "Item cancelado", body = OrderItem),
        (status = 404, description = "Item não encontrado"),
        (status = 409, description = "Item já em estado terminal")
    ),
    security(("api_jwt" = []))
)]
pub async fn cancel_job(
    State(app_state): State<AppState>,
    _guard: RequireRole<PrintStation>,
    AuthenticatedUser(actor): AuthenticatedUser,
    Path(item_id): Path<i64>,
) -> Result<Json<OrderItem>, AppError> {
    let item = app_state
        .workflow_service
        .cancel_job(item_id, &actor)
        .await?;
    Ok(Json(item))
}

// =============================================================================
//  3. MATERIAIS AVULSOS
// =============================================================================

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AddMaterialPayload {
    #[schema(example = 3)]
    pub product_id: i64,
    #[schema(example = "1.50")]
    pub qty: Decimal,
}

// POST /api/operator/{item_id}/materials — material extra consumido fora
// da receita: débito + registro, uma transação.
#[utoipa::path(
    post,
    path = "/api/operator/{item_id}/materials",
    tag = "Workflow",
    request_body = AddMaterialPayload,
    params(("item_id" = i64, Path, description = "ID do item")),
    responses(
        (status = 200, description = "Consumo registrado", body = [ProductionMaterialDetail]),
        (status = 400, description = "Estoque insuficiente"),
        (status = 404, description = "Item ou material não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn add_production_material(
    State(app_state): State<AppState>,
    _guard: RequireRole<PrintStation>,
    AuthenticatedUser(actor): AuthenticatedUser,
    Path(item_id): Path<i64>,
    Json(payload): Json<AddMaterialPayload>,
) -> Result<Json<Vec<ProductionMaterialDetail>>, AppError> {
    app_state
        .workflow_service
        .add_production_material(item_id, &actor, payload.product_id, payload.qty)
        .await?;

    let materials = app_state
        .workflow_service
        .list_production_materials(item_id)
        .await?;
    Ok(Json(materials))
}

// GET /api/operator/{item_id}/materials
#[utoipa::path(
    get,
    path = "/api/operator/{item_id}/materials",
    tag = "Workflow",
    params(("item_id" = i64, Path, description = "ID do item")),
    responses(
        (status = 200, description = "Materiais avulsos do item", body = [ProductionMaterialDetail]),
        (status = 404, description = "Item não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn list_production_materials(
    State(app_state): State<AppState>,
    _guard: RequireRole<PrintQueueView>,
    Path(item_id): Path<i64>,
) -> Result<Json<Vec<ProductionMaterialDetail>>, AppError> {
    let materials = app_state
        .workflow_service
        .list_production_materials(item_id)
        .await?;
    Ok(Json(materials))
}
