// src/services/notifier.rs

use std::sync::Arc;

use async_trait::async_trait;

use crate::db::NotificationRepository;
use crate::models::notifications::NotificationIntent;

// Port de saída do motor de workflow: o core descreve a intenção e não
// conhece o transporte. Implementações podem gravar caixa de entrada,
// empurrar push, emitir socket — sem tocar no código de workflow.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, intent: NotificationIntent) -> anyhow::Result<()>;
}

// Implementação padrão: uma linha de caixa de entrada por papel de destino,
// lida de volta pelos endpoints de notificações.
pub struct DbNotifier {
    repo: NotificationRepository,
}

impl DbNotifier {
    pub fn new(repo: NotificationRepository) -> Self {
        Self { repo }
    }
}

#[async_trait]
impl Notifier for DbNotifier {
    async fn notify(&self, intent: NotificationIntent) -> anyhow::Result<()> {
        let roles = intent.target_roles();
        if roles.is_empty() {
            return Ok(());
        }

        let title = intent.title();
        let message = intent.message();
        for role in roles {
            self.repo
                .insert(intent.order_id(), intent.type_tag(), &title, &message, role)
                .await?;
        }
        Ok(())
    }
}

// Despacho pós-commit: nunca dentro da transação, nunca aguardado pelo
// chamador. Falha aqui é logada e morre aqui — a transição já foi gravada.
pub fn dispatch(notifier: Arc<dyn Notifier>, intent: NotificationIntent) {
    tokio::spawn(async move {
        if let Err(e) = notifier.notify(intent).await {
            tracing::error!("Falha ao despachar notificação: {e:#}");
        }
    });
}
