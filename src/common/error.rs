use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use rust_decimal::Decimal;
use serde_json::json;
use thiserror::Error;

// Nosso tipo de erro, com `thiserror` para melhor ergonomia.
// Cada variante de domínio vira um `kind` estável no corpo da resposta,
// para que o cliente possa tratar o erro sem depender da mensagem.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Erro de validação")]
    ValidationError(#[from] validator::ValidationErrors),

    // Validações manuais fora do alcance do derive (ex.: quantidade
    // decimal positiva).
    #[error("{0}")]
    InvalidInput(String),

    // Recurso referenciado (invoice, item, produto, usuário...) não existe.
    #[error("{0} não encontrado")]
    NotFound(String),

    // Transição de status ilegal a partir do estado atual. Também cobre
    // a perda de corrida entre duas requisições concorrentes: o UPDATE
    // guardado do perdedor não afeta nenhuma linha e cai aqui.
    #[error("{0}")]
    InvalidTransition(String),

    // Débito de estoque recusado. Carrega o material e os números exatos
    // para o cliente poder mostrar o que precisa ser reposto.
    #[error("Estoque insuficiente de {material}: disponível {available}, necessário {required}")]
    InsufficientStock {
        material: String,
        available: Decimal,
        required: Decimal,
    },

    #[error("Este nome de usuário já está em uso")]
    UsernameAlreadyExists,

    #[error("Credenciais inválidas")]
    InvalidCredentials,

    #[error("Token inválido")]
    InvalidToken,

    #[error("Acesso negado")]
    Forbidden,

    // Variante para erros de banco de dados (sqlx)
    #[error("Erro de banco de dados")]
    DatabaseError(#[from] sqlx::Error),

    // Variante genérica para qualquer outro erro inesperado.
    // `anyhow::Error` é ótimo para capturar o contexto do erro.
    #[error("Erro interno do servidor")]
    InternalServerError(#[from] anyhow::Error),

    #[error("Erro de Bcrypt: {0}")]
    BcryptError(#[from] bcrypt::BcryptError),

    #[error("Erro de JWT: {0}")]
    JwtError(#[from] jsonwebtoken::errors::Error),
}

impl AppError {
    // Construtor de conveniência: evita `AppError::NotFound("Item".into())`
    // espalhado pelos serviços.
    pub fn not_found(resource: &str) -> Self {
        AppError::NotFound(resource.to_string())
    }

    pub fn invalid_transition(msg: impl Into<String>) -> Self {
        AppError::InvalidTransition(msg.into())
    }

    pub fn invalid_input(msg: impl Into<String>) -> Self {
        AppError::InvalidInput(msg.into())
    }

    // Tag estável exposta como `kind` no corpo JSON.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::ValidationError(_) | AppError::InvalidInput(_) => "VALIDATION",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::InvalidTransition(_) => "INVALID_TRANSITION",
            AppError::InsufficientStock { .. } => "INSUFFICIENT_STOCK",
            AppError::UsernameAlreadyExists => "USERNAME_TAKEN",
            AppError::InvalidCredentials => "INVALID_CREDENTIALS",
            AppError::InvalidToken => "INVALID_TOKEN",
            AppError::Forbidden => "FORBIDDEN",
            AppError::DatabaseError(_)
            | AppError::InternalServerError(_)
            | AppError::BcryptError(_)
            | AppError::JwtError(_) => "INTERNAL",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::ValidationError(_)
            | AppError::InvalidInput(_)
            | AppError::InsufficientStock { .. } => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::InvalidTransition(_) | AppError::UsernameAlreadyExists => {
                StatusCode::CONFLICT
            }
            AppError::InvalidCredentials | AppError::InvalidToken => StatusCode::UNAUTHORIZED,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::DatabaseError(_)
            | AppError::InternalServerError(_)
            | AppError::BcryptError(_)
            | AppError::JwtError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let kind = self.kind();

        let body = match &self {
            // Retorna todos os detalhes da validação, campo a campo.
            AppError::ValidationError(errors) => {
                let mut details = std::collections::HashMap::new();
                for (field, field_errors) in errors.field_errors() {
                    let messages: Vec<String> = field_errors
                        .iter()
                        .filter_map(|e| e.message.as_ref().map(|m| m.to_string()))
                        .collect();
                    details.insert(field.to_string(), messages);
                }
                json!({
                    "error": "Um ou mais campos são inválidos.",
                    "kind": kind,
                    "details": details,
                })
            }
            // O cliente precisa dos números para exibir o que repor.
            AppError::InsufficientStock {
                material,
                available,
                required,
            } => json!({
                "error": self.to_string(),
                "kind": kind,
                "details": {
                    "material": material,
                    "available": available,
                    "required": required,
                },
            }),
            // Erros de infraestrutura viram 500 com corpo genérico.
            // O `tracing` loga a mensagem detalhada que `thiserror` nos deu.
            AppError::DatabaseError(_)
            | AppError::InternalServerError(_)
            | AppError::BcryptError(_)
            | AppError::JwtError(_) => {
                tracing::error!("Erro Interno do Servidor: {}", self);
                json!({ "error": "Ocorreu um erro inesperado.", "kind": kind })
            }
            _ => json!({ "error": self.to_string(), "kind": kind }),
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_seguem_a_taxonomia() {
        assert_eq!(
            AppError::not_found("Item").status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::invalid_transition("x").status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            AppError::InsufficientStock {
                material: "Tinta".into(),
                available: Decimal::from(1),
                required: Decimal::from(6),
            }
            .status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::InvalidCredentials.status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(AppError::Forbidden.status_code(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn estoque_insuficiente_nomeia_material_e_quantidades() {
        let err = AppError::InsufficientStock {
            material: "Vinil".into(),
            available: Decimal::from(1),
            required: Decimal::from(6),
        };
        let msg = err.to_string();
        assert!(msg.contains("Vinil"));
        assert!(msg.contains('1'));
        assert!(msg.contains('6'));
        assert_eq!(err.kind(), "INSUFFICIENT_STOCK");
    }

    #[test]
    fn kinds_sao_estaveis() {
        assert_eq!(AppError::not_found("Produto").kind(), "NOT_FOUND");
        assert_eq!(AppError::invalid_transition("x").kind(), "INVALID_TRANSITION");
        assert_eq!(AppError::InvalidToken.kind(), "INVALID_TOKEN");
    }
}
