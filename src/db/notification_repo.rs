// src/db/notification_repo.rs

use sqlx::PgPool;

use crate::common::error::AppError;
use crate::models::auth::Role;
use crate::models::notifications::Notification;

const NOTIFICATION_COLUMNS: &str =
    "id, order_id, type, title, message, target_role, is_read, created_at";

#[derive(Clone)]
pub struct NotificationRepository {
    pool: PgPool,
}

impl NotificationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn insert(
        &self,
        order_id: Option<i64>,
        notif_type: &str,
        title: &str,
        message: &str,
        target_role: Role,
    ) -> Result<Notification, AppError> {
        let notification = sqlx::query_as::<_, Notification>(&format!(
            "INSERT INTO notifications (order_id, type, title, message, target_role)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {NOTIFICATION_COLUMNS}"
        ))
        .bind(order_id)
        .bind(notif_type)
        .bind(title)
        .bind(message)
        .bind(target_role)
        .fetch_one(&self.pool)
        .await?;
        Ok(notification)
    }

    // Caixa de entrada do papel, mais recente primeiro.
    pub async fn list_for_role(
        &self,
        role: Role,
        unread_only: bool,
        limit: i64,
    ) -> Result<Vec<Notification>, AppError> {
        let filter = if unread_only { "AND is_read = FALSE" } else { "" };
        let sql = format!(
            "SELECT {NOTIFICATION_COLUMNS} FROM notifications
             WHERE target_role = $1 {filter}
             ORDER BY created_at DESC
             LIMIT $2"
        );
        let notifications = sqlx::query_as::<_, Notification>(&sql)
            .bind(role)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;
        Ok(notifications)
    }

    pub async fn unread_count(&self, role: Role) -> Result<i64, AppError> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM notifications WHERE target_role = $1 AND is_read = FALSE",
        )
        .bind(role)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    // Escopado pelo papel do chamador: uma notificação de outra caixa
    // é indistinguível de inexistente.
    pub async fn mark_read(&self, id: i64, role: Role) -> Result<(), AppError> {
        let result = sqlx::query(
            "UPDATE notifications SET is_read = TRUE WHERE id = $1 AND target_role = $2",
        )
        .bind(id)
        .bind(role)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::not_found("Notificação"));
        }
        Ok(())
    }

    pub async fn mark_all_read(&self, role: Role) -> Result<u64, AppError> {
        let result = sqlx::query(
            "UPDATE notifications SET is_read = TRUE WHERE target_role = $1 AND is_read = FALSE",
        )
        .bind(role)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    pub async fn delete(&self, id: i64, role: Role) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM notifications WHERE id = $1 AND target_role = $2")
            .bind(id)
            .bind(role)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::not_found("Notificação"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::postgres::PgPoolOptions;

    async fn test_pool() -> PgPool {
        dotenvy::dotenv().ok();
        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL para os testes com banco");
        let pool = PgPoolOptions::new()
            .max_connections(2)
            .connect(&url)
            .await
            .expect("conexão com o Postgres de teste");
        sqlx::migrate!().run(&pool).await.expect("migrações");
        pool
    }

    #[tokio::test]
    #[ignore = "requer um Postgres acessível via DATABASE_URL"]
    async fn marcar_e_apagar_nao_cruzam_caixas_de_outros_papeis() {
        let repo = NotificationRepository::new(test_pool().await);
        let notification = repo
            .insert(None, "aviso", "Teste", "Mensagem de teste", Role::Owner)
            .await
            .unwrap();

        // para o operador, a linha do owner não existe
        let err = repo.mark_read(notification.id, Role::Operator).await.unwrap_err();
        assert_eq!(err.kind(), "NOT_FOUND");
        let err = repo.delete(notification.id, Role::Operator).await.unwrap_err();
        assert_eq!(err.kind(), "NOT_FOUND");

        repo.mark_read(notification.id, Role::Owner).await.unwrap();
        repo.delete(notification.id, Role::Owner).await.unwrap();
    }
}
