// src/db/user_repo.rs

use sqlx::PgPool;

use crate::common::error::AppError;
use crate::models::auth::{Role, User};

// O repositório de usuários, responsável por todas as interações com a tabela 'users'
#[derive(Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_by_username(&self, username: &str) -> Result<Option<User>, AppError> {
        let maybe_user = sqlx::query_as::<_, User>(
            "SELECT id, username, full_name, password_hash, role, created_at
             FROM users WHERE username = $1",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;
        Ok(maybe_user)
    }

    pub async fn find_by_id(&self, id: i64) -> Result<Option<User>, AppError> {
        let maybe_user = sqlx::query_as::<_, User>(
            "SELECT id, username, full_name, password_hash, role, created_at
             FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(maybe_user)
    }

    // Lista usuários, com filtro opcional por papel (usado pela tela
    // de atribuição de desainer/operador).
    pub async fn list(&self, role: Option<Role>) -> Result<Vec<User>, AppError> {
        let users = match role {
            Some(role) => {
                sqlx::query_as::<_, User>(
                    "SELECT id, username, full_name, password_hash, role, created_at
                     FROM users WHERE role = $1 ORDER BY full_name ASC",
                )
                .bind(role)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, User>(
                    "SELECT id, username, full_name, password_hash, role, created_at
                     FROM users ORDER BY full_name ASC",
                )
                .fetch_all(&self.pool)
                .await?
            }
        };
        Ok(users)
    }

    // Cria um novo usuário, com tratamento específico para username duplicado.
    pub async fn create(
        &self,
        username: &str,
        full_name: &str,
        password_hash: &str,
        role: Role,
    ) -> Result<User, AppError> {
        sqlx::query_as::<_, User>(
            "INSERT INTO users (username, full_name, password_hash, role)
             VALUES ($1, $2, $3, $4)
             RETURNING id, username, full_name, password_hash, role, created_at",
        )
        .bind(username)
        .bind(full_name)
        .bind(password_hash)
        .bind(role)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(db_err) = &e {
                if db_err.is_unique_violation() {
                    return AppError::UsernameAlreadyExists;
                }
            }
            e.into()
        })
    }

    // Atualização parcial via COALESCE: só sobrescreve o que foi enviado.
    pub async fn update(
        &self,
        id: i64,
        full_name: Option<&str>,
        password_hash: Option<&str>,
        role: Option<Role>,
    ) -> Result<User, AppError> {
        sqlx::query_as::<_, User>(
            "UPDATE users SET
                full_name = COALESCE($2, full_name),
                password_hash = COALESCE($3, password_hash),
                role = COALESCE($4, role)
             WHERE id = $1
             RETURNING id, username, full_name, password_hash, role, created_at",
        )
        .bind(id)
        .bind(full_name)
        .bind(password_hash)
        .bind(role)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::not_found("Usuário"))
    }

    pub async fn delete(&self, id: i64) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::not_found("Usuário"));
        }
        Ok(())
    }

    // Usado no bootstrap: só cria o owner inicial se nenhum existir.
    pub async fn owner_exists(&self) -> Result<bool, AppError> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE role = 'owner'")
                .fetch_one(&self.pool)
                .await?;
        Ok(count > 0)
    }
}
