// src/models/inventory.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

// Tipo do produto. Os rótulos são valores de domínio fixos:
// matéria-prima nunca sofre débito automático; produto impresso
// consome a receita ao finalizar a impressão; produto acabado não tem receita.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "product_type")]
pub enum ProductType {
    #[sqlx(rename = "Bahan Baku")]
    #[serde(rename = "Bahan Baku")]
    BahanBaku,
    #[sqlx(rename = "Cetak")]
    #[serde(rename = "Cetak")]
    Cetak,
    #[sqlx(rename = "Barang Jadi")]
    #[serde(rename = "Barang Jadi")]
    BarangJadi,
}

impl ProductType {
    // Só produto impresso dispara o débito de receita no fim da produção.
    pub fn consumes_recipe(&self) -> bool {
        matches!(self, ProductType::Cetak)
    }
}

// Direção de movimentação no livro-razão de estoque.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "movement_direction", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum MovementDirection {
    Masuk,
    Keluar,
}

// --- Produto / Material ---
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    #[schema(example = 1)]
    pub id: i64,
    #[schema(example = "Banner Flexi 280g")]
    pub name: String,
    #[schema(example = "m2")]
    pub unit: String,
    #[schema(example = "25000.00")]
    pub price: Decimal,
    #[schema(example = "Outdoor")]
    pub category: Option<String>,
    pub product_type: ProductType,
    #[schema(example = "120.00")]
    pub stock: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// --- Livro-razão (histórico de movimentações) ---
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StockMovement {
    pub id: i64,
    pub product_id: i64,
    pub direction: MovementDirection,
    #[schema(example = "6.00")]
    pub qty: Decimal,
    #[schema(example = "Consumido na produção de Banner (3 unid.) - Item ORD-001")]
    pub keterangan: String,
    pub created_at: DateTime<Utc>,
}

// --- Receita (bill of materials) ---
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RecipeEntry {
    pub id: i64,
    pub product_id: i64,
    pub material_id: i64,
    #[schema(example = "2.00")]
    pub qty_per_unit: Decimal,
}

// Linha de receita com os dados do material, para a tela de edição.
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RecipeEntryDetail {
    pub id: i64,
    pub material_id: i64,
    pub material_name: String,
    pub unit: String,
    pub qty_per_unit: Decimal,
    pub material_stock: Decimal,
}

// --- Materiais avulsos usados na produção de um item ---
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProductionMaterialDetail {
    pub id: i64,
    pub order_item_id: i64,
    pub product_id: i64,
    pub product_name: String,
    pub unit: String,
    pub qty: Decimal,
    pub operator_name: Option<String>,
    pub created_at: DateTime<Utc>,
}
