// src/handlers/products.rs

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::roles::{Management, RequireRole},
    models::inventory::{Product, ProductType, RecipeEntryDetail, StockMovement},
};

// =============================================================================
//  1. CATÁLOGO DE PRODUTOS
// =============================================================================

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateProductPayload {
    #[validate(length(min = 1, message = "O nome do produto é obrigatório."))]
    #[schema(example = "Banner Flexi 280g")]
    pub name: String,

    #[validate(length(min = 1, message = "A unidade é obrigatória."))]
    #[schema(example = "m2")]
    pub unit: String,

    #[schema(example = "25000.00")]
    pub price: Decimal,

    #[schema(example = "Outdoor")]
    pub category: Option<String>,

    pub product_type: ProductType,

    // Saldo inicial; ausente = zero.
    #[schema(example = "120.00")]
    pub stock: Option<Decimal>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProductPayload {
    #[validate(length(min = 1, message = "O nome do produto não pode ficar vazio."))]
    pub name: Option<String>,
    #[validate(length(min = 1, message = "A unidade não pode ficar vazia."))]
    pub unit: Option<String>,
    pub price: Option<Decimal>,
    pub category: Option<String>,
    pub product_type: Option<ProductType>,
}

// GET /api/products
#[utoipa::path(
    get,
    path = "/api/products",
    tag = "Products",
    responses(
        (status = 200, description = "Catálogo completo", body = [Product])
    ),
    security(("api_jwt" = []))
)]
pub async fn list_products(
    State(app_state): State<AppState>,
) -> Result<Json<Vec<Product>>, AppError> {
    let products = app_state.product_repo.list().await?;
    Ok(Json(products))
}

// GET /api/products/raw-materials
#[utoipa::path(
    get,
    path = "/api/products/raw-materials",
    tag = "Products",
    responses(
        (status = 200, description = "Somente matérias-primas (Bahan Baku)", body = [Product])
    ),
    security(("api_jwt" = []))
)]
pub async fn list_raw_materials(
    State(app_state): State<AppState>,
) -> Result<Json<Vec<Product>>, AppError> {
    let products = app_state.product_repo.list_raw_materials().await?;
    Ok(Json(products))
}

// POST /api/products
#[utoipa::path(
    post,
    path = "/api/products",
    tag = "Products",
    request_body = CreateProductPayload,
    responses(
        (status = 201, description = "Produto criado", body = Product)
    ),
    security(("api_jwt" = []))
)]
pub async fn create_product(
    State(app_state): State<AppState>,
    _guard: RequireRole<Management>,
    Json(payload): Json<CreateProductPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate().map_err(AppError::ValidationError)?;
    if payload.price < Decimal::ZERO {
        return Err(AppError::invalid_input("O preço não pode ser negativo."));
    }
    let stock = payload.stock.unwrap_or(Decimal::ZERO);
    if stock < Decimal::ZERO {
        return Err(AppError::invalid_input(
            "O estoque inicial não pode ser negativo.",
        ));
    }

    let product = app_state
        .product_repo
        .create(
            &payload.name,
            &payload.unit,
            payload.price,
            payload.category.as_deref(),
            payload.product_type,
            stock,
        )
        .await?;

    Ok((StatusCode::CREATED, Json(product)))
}

// PUT /api/products/{id}
#[utoipa::path(
    put,
    path = "/api/products/{id}",
    tag = "Products",
    request_body = UpdateProductPayload,
    params(("id" = i64, Path, description = "ID do produto")),
    responses(
        (status = 200, description = "Produto atualizado", body = Product),
        (status = 404, description = "Produto não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_product(
    State(app_state): State<AppState>,
    _guard: RequireRole<Management>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateProductPayload>,
) -> Result<Json<Product>, AppError> {
    payload.validate().map_err(AppError::ValidationError)?;
    if matches!(payload.price, Some(p) if p < Decimal::ZERO) {
        return Err(AppError::invalid_input("O preço não pode ser negativo."));
    }

    let product = app_state
        .product_repo
        .update(
            id,
            payload.name.as_deref(),
            payload.unit.as_deref(),
            payload.price,
            payload.category.as_deref(),
            payload.product_type,
        )
        .await?;

    Ok(Json(product))
}

// DELETE /api/products/{id}
#[utoipa::path(
    delete,
    path = "/api/products/{id}",
    tag = "Products",
    params(("id" = i64, Path, description = "ID do produto")),
    responses(
        (status = 204, description = "Produto removido"),
        (status = 404, description = "Produto não encontrado"),
        (status = 409, description = "Produto em uso por pedidos ou receitas")
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_product(
    State(app_state): State<AppState>,
    _guard: RequireRole<Management>,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    app_state.product_repo.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
//  2. RECEITA (BILL OF MATERIALS)
// =============================================================================

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RecipeEntryInput {
    #[schema(example = 3)]
    pub material_id: i64,
    #[schema(example = "2.50")]
    pub qty_per_unit: Decimal,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SaveRecipePayload {
    #[schema(example = 1)]
    pub product_id: i64,
    #[validate(nested)]
    pub entries: Vec<RecipeEntryInput>,
}

// GET /api/products/recipe/{product_id}
#[utoipa::path(
    get,
    path = "/api/products/recipe/{product_id}",
    tag = "Products",
    params(("product_id" = i64, Path, description = "ID do produto")),
    responses(
        (status = 200, description = "Receita do produto", body = [RecipeEntryDetail]),
        (status = 404, description = "Produto não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_recipe(
    State(app_state): State<AppState>,
    Path(product_id): Path<i64>,
) -> Result<Json<Vec<RecipeEntryDetail>>, AppError> {
    let entries = app_state.inventory_service.recipe_detail(product_id).await?;
    Ok(Json(entries))
}

// POST /api/products/recipe — substitui a receita inteira.
#[utoipa::path(
    post,
    path = "/api/products/recipe",
    tag = "Products",
    request_body = SaveRecipePayload,
    responses(
        (status = 200, description = "Receita salva", body = [RecipeEntryDetail]),
        (status = 404, description = "Produto ou material não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn save_recipe(
    State(app_state): State<AppState>,
    _guard: RequireRole<Management>,
    Json(payload): Json<SaveRecipePayload>,
) -> Result<Json<Vec<RecipeEntryDetail>>, AppError> {
    payload.validate().map_err(AppError::ValidationError)?;

    let entries: Vec<(i64, Decimal)> = payload
        .entries
        .iter()
        .map(|entry| (entry.material_id, entry.qty_per_unit))
        .collect();

    let saved = app_state
        .inventory_service
        .save_recipe(payload.product_id, &entries)
        .await?;

    Ok(Json(saved))
}

// =============================================================================
//  3. MOVIMENTAÇÃO DE ESTOQUE
// =============================================================================

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StockAdjustPayload {
    #[schema(example = "10.00")]
    pub qty: Decimal,
    #[schema(example = "Compra do fornecedor XYZ")]
    pub keterangan: Option<String>,
}

// POST /api/products/{id}/stock/add
#[utoipa::path(
    post,
    path = "/api/products/{id}/stock/add",
    tag = "Products",
    request_body = StockAdjustPayload,
    params(("id" = i64, Path, description = "ID do produto")),
    responses(
        (status = 200, description = "Saldo atualizado", body = Product),
        (status = 404, description = "Produto não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn add_stock(
    State(app_state): State<AppState>,
    _guard: RequireRole<Management>,
    Path(id): Path<i64>,
    Json(payload): Json<StockAdjustPayload>,
) -> Result<Json<Product>, AppError> {
    let keterangan = payload
        .keterangan
        .as_deref()
        .unwrap_or("Entrada manual de estoque");

    let product = app_state
        .inventory_service
        .add_stock(id, payload.qty, keterangan)
        .await?;

    Ok(Json(product))
}

// POST /api/products/{id}/stock/reduce
#[utoipa::path(
    post,
    path = "/api/products/{id}/stock/reduce",
    tag = "Products",
    request_body = StockAdjustPayload,
    params(("id" = i64, Path, description = "ID do produto")),
    responses(
        (status = 200, description = "Saldo atualizado", body = Product),
        (status = 400, description = "Estoque insuficiente"),
        (status = 404, description = "Produto não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn reduce_stock(
    State(app_state): State<AppState>,
    _guard: RequireRole<Management>,
    Path(id): Path<i64>,
    Json(payload): Json<StockAdjustPayload>,
) -> Result<Json<Product>, AppError> {
    let keterangan = payload
        .keterangan
        .as_deref()
        .unwrap_or("Saída manual de estoque");

    let product = app_state
        .inventory_service
        .reduce_stock(id, payload.qty, keterangan)
        .await?;

    Ok(Json(product))
}

// GET /api/products/{id}/stock/history
#[utoipa::path(
    get,
    path = "/api/products/{id}/stock/history",
    tag = "Products",
    params(("id" = i64, Path, description = "ID do produto")),
    responses(
        (status = 200, description = "Últimas 50 movimentações", body = [StockMovement]),
        (status = 404, description = "Produto não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn stock_history(
    State(app_state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Vec<StockMovement>>, AppError> {
    let movements = app_state.inventory_service.history(id).await?;
    Ok(Json(movements))
}
