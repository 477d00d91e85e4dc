// src/models/clients.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Client {
    #[schema(example = 1)]
    pub id: i64,
    #[schema(example = "Budi Santoso")]
    pub full_name: String,
    #[schema(example = "0812-3456-7890")]
    pub phone: Option<String>,
    pub address: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateClientPayload {
    #[validate(length(min = 1, message = "O nome do cliente é obrigatório."))]
    pub full_name: String,
    pub phone: Option<String>,
    pub address: Option<String>,
}

// Atualização parcial: campos ausentes ficam como estão.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateClientPayload {
    #[validate(length(min = 1, message = "O nome do cliente não pode ficar vazio."))]
    pub full_name: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
}
