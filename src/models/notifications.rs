// src/models/notifications.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

use crate::models::auth::Role;
use crate::models::orders::ItemStatus;

// Linha da caixa de entrada, uma por papel de destino.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: i64,
    pub order_id: Option<i64>,
    #[schema(example = "status_update")]
    pub r#type: String,
    pub title: String,
    pub message: String,
    pub target_role: Role,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

// Intenção de notificação: o motor de workflow descreve "quem deve saber
// do quê" e entrega ao port Notifier depois do commit. O transporte
// (caixa de entrada, push, socket) é problema da implementação do port.
#[derive(Debug, Clone, PartialEq)]
pub enum NotificationIntent {
    // Um item/invoice atingiu um novo status. Os papéis de destino vêm
    // da tabela fixa status → papéis.
    StatusChanged {
        order_id: i64,
        order_code: String,
        new_status: ItemStatus,
        old_status: Option<ItemStatus>,
    },
    // A invoice inteira foi cancelada; avisa o owner, identificando quem
    // cancelou e com que papel.
    OrderCanceled {
        order_id: i64,
        invoice_code: String,
        actor_name: String,
        actor_role: Role,
    },
    // Chegou pedido novo: avisa owner, admin e desainer.
    NewOrder {
        order_id: i64,
        invoice_code: String,
        client_name: String,
        total: Decimal,
        items_count: usize,
    },
    // Entrada manual (endpoint /send), já pronta.
    Manual {
        order_id: Option<i64>,
        notif_type: String,
        title: String,
        message: String,
        target_role: Role,
    },
}

impl NotificationIntent {
    pub fn target_roles(&self) -> Vec<Role> {
        match self {
            NotificationIntent::StatusChanged { new_status, .. } => {
                new_status.notified_roles().to_vec()
            }
            NotificationIntent::OrderCanceled { .. } => vec![Role::Owner],
            NotificationIntent::NewOrder { .. } => {
                vec![Role::Owner, Role::Admin, Role::Desainer]
            }
            NotificationIntent::Manual { target_role, .. } => vec![*target_role],
        }
    }

    pub fn type_tag(&self) -> &str {
        match self {
            NotificationIntent::StatusChanged { .. } => "status_update",
            NotificationIntent::OrderCanceled { .. } => "order_canceled",
            NotificationIntent::NewOrder { .. } => "new_order",
            NotificationIntent::Manual { notif_type, .. } => notif_type,
        }
    }

    pub fn order_id(&self) -> Option<i64> {
        match self {
            NotificationIntent::StatusChanged { order_id, .. }
            | NotificationIntent::OrderCanceled { order_id, .. }
            | NotificationIntent::NewOrder { order_id, .. } => Some(*order_id),
            NotificationIntent::Manual { order_id, .. } => *order_id,
        }
    }

    pub fn title(&self) -> String {
        match self {
            NotificationIntent::StatusChanged { order_code, .. } => {
                format!("Pedido {order_code} atualizado")
            }
            NotificationIntent::OrderCanceled { invoice_code, .. } => {
                format!("Pedido {invoice_code} cancelado")
            }
            NotificationIntent::NewOrder { invoice_code, .. } => {
                format!("Novo pedido {invoice_code}")
            }
            NotificationIntent::Manual { title, .. } => title.clone(),
        }
    }

    pub fn message(&self) -> String {
        match self {
            NotificationIntent::StatusChanged {
                order_code,
                new_status,
                old_status,
                ..
            } => match old_status {
                Some(old) => {
                    format!("Pedido {order_code} mudou de '{old}' para '{new_status}'.")
                }
                None => format!("Pedido {order_code} entrou em '{new_status}'."),
            },
            NotificationIntent::OrderCanceled {
                invoice_code,
                actor_name,
                actor_role,
                ..
            } => format!(
                "Pedido {invoice_code} foi cancelado por {actor_name} ({}).",
                actor_role.display_name()
            ),
            NotificationIntent::NewOrder {
                invoice_code,
                client_name,
                total,
                items_count,
                ..
            } => format!(
                "Pedido {invoice_code} de {client_name}: {items_count} item(ns), total Rp {total}."
            ),
            NotificationIntent::Manual { message, .. } => message.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mudanca_de_status_segue_a_tabela_de_papeis() {
        let intent = NotificationIntent::StatusChanged {
            order_id: 7,
            order_code: "IA-ORD-0007".into(),
            new_status: ItemStatus::Dikirim,
            old_status: Some(ItemStatus::Selesai),
        };
        assert_eq!(intent.target_roles(), vec![Role::Admin, Role::Owner]);
        assert_eq!(intent.type_tag(), "status_update");
        assert!(intent.message().contains("'Selesai'"));
        assert!(intent.message().contains("'Dikirim'"));
    }

    #[test]
    fn status_sem_papel_nao_gera_destinatario() {
        let intent = NotificationIntent::StatusChanged {
            order_id: 7,
            order_code: "ORD-001".into(),
            new_status: ItemStatus::ProsesCetak,
            old_status: Some(ItemStatus::Operator),
        };
        assert!(intent.target_roles().is_empty());
    }

    #[test]
    fn cancelamento_mira_somente_o_owner_e_nomeia_o_autor() {
        let intent = NotificationIntent::OrderCanceled {
            order_id: 3,
            invoice_code: "IA-ORD-0003".into(),
            actor_name: "Siti".into(),
            actor_role: Role::Desainer,
        };
        assert_eq!(intent.target_roles(), vec![Role::Owner]);
        let msg = intent.message();
        assert!(msg.contains("Siti"));
        assert!(msg.contains("Desainer"));
    }

    #[test]
    fn pedido_novo_avisa_owner_admin_e_desainer() {
        let intent = NotificationIntent::NewOrder {
            order_id: 1,
            invoice_code: "IA-ORD-0001".into(),
            client_name: "Budi".into(),
            total: Decimal::from(150_000),
            items_count: 2,
        };
        assert_eq!(
            intent.target_roles(),
            vec![Role::Owner, Role::Admin, Role::Desainer]
        );
    }
}
