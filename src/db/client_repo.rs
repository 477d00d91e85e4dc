// src/db/client_repo.rs

use sqlx::PgPool;

use crate::common::error::AppError;
use crate::models::clients::Client;

#[derive(Clone)]
pub struct ClientRepository {
    pool: PgPool,
}

impl ClientRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn list(&self) -> Result<Vec<Client>, AppError> {
        let clients = sqlx::query_as::<_, Client>(
            "SELECT id, full_name, phone, address, created_at
             FROM clients ORDER BY full_name ASC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(clients)
    }

    pub async fn find_by_id(&self, id: i64) -> Result<Option<Client>, AppError> {
        let client = sqlx::query_as::<_, Client>(
            "SELECT id, full_name, phone, address, created_at
             FROM clients WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(client)
    }

    pub async fn create(
        &self,
        full_name: &str,
        phone: Option<&str>,
        address: Option<&str>,
    ) -> Result<Client, AppError> {
        let client = sqlx::query_as::<_, Client>(
            "INSERT INTO clients (full_name, phone, address)
             VALUES ($1, $2, $3)
             RETURNING id, full_name, phone, address, created_at",
        )
        .bind(full_name)
        .bind(phone)
        .bind(address)
        .fetch_one(&self.pool)
        .await?;
        Ok(client)
    }

    pub async fn update(
        &self,
        id: i64,
        full_name: Option<&str>,
        phone: Option<&str>,
        address: Option<&str>,
    ) -> Result<Client, AppError> {
        sqlx::query_as::<_, Client>(
            "UPDATE clients SET
                full_name = COALESCE($2, full_name),
                phone = COALESCE($3, phone),
                address = COALESCE($4, address)
             WHERE id = $1
             RETURNING id, full_name, phone, address, created_at",
        )
        .bind(id)
        .bind(full_name)
        .bind(phone)
        .bind(address)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::not_found("Cliente"))
    }

    pub async fn delete(&self, id: i64) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM clients WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::not_found("Cliente"));
        }
        Ok(())
    }
}
