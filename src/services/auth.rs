// src/services/auth.rs

use bcrypt::{hash, verify};
use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};

use crate::{
    common::error::AppError,
    db::UserRepository,
    models::auth::{Claims, Role, User},
};

#[derive(Clone)]
pub struct AuthService {
    user_repo: UserRepository,
    jwt_secret: String,
}

impl AuthService {
    pub fn new(user_repo: UserRepository, jwt_secret: String) -> Self {
        Self {
            user_repo,
            jwt_secret,
        }
    }

    pub async fn login_user(&self, username: &str, password: &str) -> Result<(String, User), AppError> {
        let user = self
            .user_repo
            .find_by_username(username)
            .await?
            .ok_or(AppError::InvalidCredentials)?;

        let password_clone = password.to_owned();
        let password_hash_clone = user.password_hash.clone();

        // Executa a verificação em um thread separado
        let is_password_valid =
            tokio::task::spawn_blocking(move || verify(&password_clone, &password_hash_clone))
                .await
                .map_err(|e| anyhow::anyhow!("Falha na task de verificação de senha: {}", e))??;

        if !is_password_valid {
            return Err(AppError::InvalidCredentials);
        }

        let token = self.create_token(&user)?;
        Ok((token, user))
    }

    pub async fn validate_token(&self, token: &str) -> Result<User, AppError> {
        let validation = Validation::default();
        let token_data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.jwt_secret.as_ref()),
            &validation,
        )
        .map_err(|_| AppError::InvalidToken)?;

        self.user_repo
            .find_by_id(token_data.claims.sub)
            .await?
            .ok_or_else(|| AppError::not_found("Usuário"))
    }

    // Hashing fora do runtime: bcrypt é caro de propósito.
    pub async fn hash_password(&self, password: &str) -> Result<String, AppError> {
        let password_clone = password.to_owned();
        let hashed =
            tokio::task::spawn_blocking(move || hash(&password_clone, bcrypt::DEFAULT_COST))
                .await
                .map_err(|e| anyhow::anyhow!("Falha na task de hashing: {}", e))??;
        Ok(hashed)
    }

    pub async fn create_user(
        &self,
        username: &str,
        full_name: &str,
        password: &str,
        role: Role,
    ) -> Result<User, AppError> {
        let hashed = self.hash_password(password).await?;
        self.user_repo
            .create(username, full_name, &hashed, role)
            .await
    }

    pub async fn update_user(
        &self,
        id: i64,
        full_name: Option<&str>,
        password: Option<&str>,
        role: Option<Role>,
    ) -> Result<User, AppError> {
        let hashed = match password {
            Some(p) => Some(self.hash_password(p).await?),
            None => None,
        };
        self.user_repo
            .update(id, full_name, hashed.as_deref(), role)
            .await
    }

    // Primeiro boot: garante um owner inicial quando o banco está vazio,
    // a partir das variáveis de ambiente ADMIN_*.
    pub async fn ensure_bootstrap_owner(
        &self,
        username: &str,
        full_name: &str,
        password: &str,
    ) -> Result<(), AppError> {
        if self.user_repo.owner_exists().await? {
            return Ok(());
        }
        let user = self.create_user(username, full_name, password, Role::Owner).await?;
        tracing::info!("✅ Owner inicial '{}' criado (id {}).", user.username, user.id);
        Ok(())
    }

    fn create_token(&self, user: &User) -> Result<String, AppError> {
        let now = Utc::now();
        let expires_at = now + chrono::Duration::hours(24);

        let claims = Claims {
            sub: user.id,
            role: user.role,
            exp: expires_at.timestamp() as usize,
            iat: now.timestamp() as usize,
        };

        // Usa '?' para um tratamento de erro mais limpo
        Ok(encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.jwt_secret.as_ref()),
        )?)
    }
}
