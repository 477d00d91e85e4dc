// src/middleware/roles.rs

use axum::{extract::FromRequestParts, http::request::Parts};
use std::marker::PhantomData;

use crate::{
    common::error::AppError,
    models::auth::{Role, User},
};

/// 1. O Trait que define um conjunto de papéis autorizados
pub trait RoleSet: Send + Sync + 'static {
    fn allowed() -> &'static [Role];
}

/// 2. O Extractor (Guardião): rejeita a requisição antes do handler rodar
/// quando o papel do usuário autenticado não está na lista.
pub struct RequireRole<T>(pub PhantomData<T>);

// 3. Implementação do FromRequestParts

impl<T, S> FromRequestParts<S> for RequireRole<T>
where
    T: RoleSet,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        // O auth_guard já rodou e colocou o usuário nos extensions.
        let user = parts.extensions.get::<User>().ok_or(AppError::InvalidToken)?;

        if !T::allowed().contains(&user.role) {
            return Err(AppError::Forbidden);
        }

        Ok(RequireRole(PhantomData))
    }
}

// ---
// DEFINIÇÃO DOS CONJUNTOS DE PAPÉIS (TIPOS)
// ---

/// Gestão do negócio: pedidos, clientes, catálogo e usuários.
pub struct Management;
impl RoleSet for Management {
    fn allowed() -> &'static [Role] {
        &[Role::Owner, Role::Admin]
    }
}

/// Consulta da fila de desenho.
pub struct DesignQueueView;
impl RoleSet for DesignQueueView {
    fn allowed() -> &'static [Role] {
        &[Role::Owner, Role::Desainer, Role::Admin]
    }
}

/// Operações da estação de desenho (assumir, enviar, cancelar).
pub struct DesignStation;
impl RoleSet for DesignStation {
    fn allowed() -> &'static [Role] {
        &[Role::Owner, Role::Desainer]
    }
}

/// Consulta da fila de impressão.
pub struct PrintQueueView;
impl RoleSet for PrintQueueView {
    fn allowed() -> &'static [Role] {
        &[Role::Operator, Role::Owner]
    }
}

/// Operações da estação de impressão (assumir, finalizar, cancelar, materiais).
pub struct PrintStation;
impl RoleSet for PrintStation {
    fn allowed() -> &'static [Role] {
        &[Role::Operator, Role::Owner, Role::Admin]
    }
}

/// Ações reservadas ao dono (ex.: remover usuários).
pub struct OwnerOnly;
impl RoleSet for OwnerOnly {
    fn allowed() -> &'static [Role] {
        &[Role::Owner]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gestao_exclui_chao_de_fabrica() {
        assert!(Management::allowed().contains(&Role::Owner));
        assert!(Management::allowed().contains(&Role::Admin));
        assert!(!Management::allowed().contains(&Role::Desainer));
        assert!(!Management::allowed().contains(&Role::Operator));
    }

    #[test]
    fn estacao_de_desenho_nao_aceita_operador() {
        assert!(DesignStation::allowed().contains(&Role::Desainer));
        assert!(!DesignStation::allowed().contains(&Role::Operator));
        // Admin enxerga a fila mas não assume trabalhos de desenho.
        assert!(DesignQueueView::allowed().contains(&Role::Admin));
        assert!(!DesignStation::allowed().contains(&Role::Admin));
    }

    #[test]
    fn estacao_de_impressao_aceita_admin() {
        assert!(PrintStation::allowed().contains(&Role::Admin));
        assert!(!PrintQueueView::allowed().contains(&Role::Admin));
    }

    #[test]
    fn somente_owner() {
        assert_eq!(OwnerOnly::allowed(), &[Role::Owner]);
    }
}
