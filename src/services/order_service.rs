// src/services/order_service.rs

use std::sync::Arc;

use rust_decimal::Decimal;
use sqlx::PgPool;

use crate::{
    common::error::AppError,
    db::{ClientRepository, OrderRepository, ProductRepository, UserRepository},
    models::{
        auth::User,
        inventory::Product,
        notifications::NotificationIntent,
        orders::{
            CreateOrderPayload, HistoryEntry, ItemStatus, NewOrderItemInput, OrderDetail,
            OrderItem, OrderSummary, PaymentStatus, UpdateOrderItemPayload, UpdateOrderPayload,
        },
    },
    services::notifier::{self, Notifier},
};

// ---
// Códigos
// ---
// A invoice segue o id da tabela ("IA-ORD-0042"); os itens seguem um
// contador global contínuo entre invoices ("ORD-007" → próximo "ORD-008").
// Ambos são lidos dentro da transação de gravação.

pub fn format_invoice_code(seq: i64) -> String {
    format!("IA-ORD-{seq:04}")
}

pub fn format_item_code(counter: i64) -> String {
    format!("ORD-{counter:03}")
}

// Continua do último código gravado; código ilegível reinicia em 1.
pub fn next_item_counter(last_code: Option<&str>) -> i64 {
    last_code
        .and_then(|code| code.rsplit('-').next())
        .and_then(|digits| digits.parse::<i64>().ok())
        .map(|n| n + 1)
        .unwrap_or(1)
}

#[derive(Clone)]
pub struct OrderService {
    pool: PgPool,
    order_repo: OrderRepository,
    client_repo: ClientRepository,
    product_repo: ProductRepository,
    user_repo: UserRepository,
    notifier: Arc<dyn Notifier>,
}

impl OrderService {
    pub fn new(
        pool: PgPool,
        order_repo: OrderRepository,
        client_repo: ClientRepository,
        product_repo: ProductRepository,
        user_repo: UserRepository,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            pool,
            order_repo,
            client_repo,
            product_repo,
            user_repo,
            notifier,
        }
    }

    // ---
    // Criação
    // ---
    // Invoice + itens em uma transação: códigos, preços de tabela e
    // subtotais derivados, tudo ou nada. A notificação de pedido novo
    // sai DEPOIS do commit.
    pub async fn create_order(&self, payload: CreateOrderPayload) -> Result<OrderDetail, AppError> {
        let client = self
            .client_repo
            .find_by_id(payload.client_id)
            .await?
            .ok_or_else(|| AppError::not_found("Cliente"))?;

        // Resolve os produtos antes de abrir a transação (leituras de
        // catálogo não precisam segurar a conexão da escrita).
        let products = self.resolve_products(&payload.items).await?;

        let initial_status = payload.status.unwrap_or(ItemStatus::Admin);
        let payment = payload.payment_status.unwrap_or(PaymentStatus::BelumLunas);

        let mut tx = self.pool.begin().await?;

        let next_seq = self.order_repo.last_invoice_id(&mut tx).await?.unwrap_or(0) + 1;
        let invoice_code = format_invoice_code(next_seq);

        let order = self
            .order_repo
            .insert_order(
                &mut tx,
                &invoice_code,
                Some(client.id),
                Some(&client.full_name),
                payment,
            )
            .await?;
        if initial_status != ItemStatus::Admin {
            self.order_repo
                .set_order_status(&mut tx, order.id, initial_status)
                .await?;
        }

        let mut counter =
            next_item_counter(self.order_repo.last_item_code(&mut tx).await?.as_deref());
        for (input, product) in payload.items.iter().zip(&products) {
            let subtotal = product.price * Decimal::from(input.qty);
            self.order_repo
                .insert_item(
                    &mut tx,
                    order.id,
                    &format_item_code(counter),
                    product.id,
                    input.qty,
                    input.p,
                    input.l,
                    product.price,
                    subtotal,
                    initial_status,
                    input.finishing.as_deref(),
                    input.nama_file.as_deref(),
                    input.keterangan.as_deref(),
                )
                .await?;
            counter += 1;
        }

        let total = self.order_repo.recompute_total(&mut tx, order.id).await?;
        self.order_repo
            .append_history(
                &mut tx,
                order.id,
                initial_status.as_str(),
                &format!(
                    "Invoice {invoice_code} criada com {} item(ns)",
                    payload.items.len()
                ),
            )
            .await?;

        tx.commit().await?;

        tracing::info!(
            "📝 Pedido {} criado para {} ({} itens)",
            invoice_code,
            client.full_name,
            payload.items.len()
        );

        notifier::dispatch(
            self.notifier.clone(),
            NotificationIntent::NewOrder {
                order_id: order.id,
                invoice_code,
                client_name: client.full_name,
                total,
                items_count: payload.items.len(),
            },
        );

        self.detail(order.id).await
    }

    // ---
    // Leitura
    // ---

    pub async fn list(&self) -> Result<Vec<OrderSummary>, AppError> {
        self.order_repo.list().await
    }

    pub async fn detail(&self, id: i64) -> Result<OrderDetail, AppError> {
        let header = self
            .order_repo
            .find_order(&self.pool, id)
            .await?
            .ok_or_else(|| AppError::not_found("Pedido"))?;
        let items = self.order_repo.order_items_detail(id).await?;
        Ok(OrderDetail { header, items })
    }

    pub async fn timeline(&self, id: i64) -> Result<Vec<HistoryEntry>, AppError> {
        self.order_repo
            .find_order(&self.pool, id)
            .await?
            .ok_or_else(|| AppError::not_found("Pedido"))?;
        self.order_repo.timeline(id).await
    }

    // ---
    // Atualização da invoice
    // ---
    // Campos via COALESCE; `items` presente substitui todos os itens com
    // códigos novos do contador global. Mudança de status e de pagamento
    // geram entradas próprias no histórico.
    pub async fn update_order(
        &self,
        id: i64,
        payload: UpdateOrderPayload,
    ) -> Result<OrderDetail, AppError> {
        let prev = self
            .order_repo
            .find_order(&self.pool, id)
            .await?
            .ok_or_else(|| AppError::not_found("Pedido"))?;

        // Troca de cliente refaz o snapshot do nome na invoice.
        let client_change = match payload.client_id {
            Some(client_id) if Some(client_id) != prev.client_id => Some(
                self.client_repo
                    .find_by_id(client_id)
                    .await?
                    .ok_or_else(|| AppError::not_found("Cliente"))?,
            ),
            _ => None,
        };

        // Lista vazia já foi rejeitada na validação do payload.
        let replacement = match payload.items.as_ref() {
            Some(items) => Some((items, self.resolve_products(items).await?)),
            None => None,
        };

        let mut intents = Vec::new();
        let mut tx = self.pool.begin().await?;

        self.order_repo
            .update_order_fields(
                &mut tx,
                id,
                client_change.as_ref().map(|c| c.id),
                client_change.as_ref().map(|c| c.full_name.as_str()),
                payload.payment_status,
            )
            .await?;

        if let Some((items, products)) = &replacement {
            self.order_repo.delete_items(&mut tx, id).await?;

            let item_status = payload.status.unwrap_or(prev.status);
            let mut counter =
                next_item_counter(self.order_repo.last_item_code(&mut tx).await?.as_deref());
            for (input, product) in items.iter().zip(products) {
                let subtotal = product.price * Decimal::from(input.qty);
                self.order_repo
                    .insert_item(
                        &mut tx,
                        id,
                        &format_item_code(counter),
                        product.id,
                        input.qty,
                        input.p,
                        input.l,
                        product.price,
                        subtotal,
                        item_status,
                        input.finishing.as_deref(),
                        input.nama_file.as_deref(),
                        input.keterangan.as_deref(),
                    )
                    .await?;
                counter += 1;
            }

            self.order_repo.recompute_total(&mut tx, id).await?;
            self.order_repo
                .append_history(
                    &mut tx,
                    id,
                    "Update",
                    &format!("Invoice atualizada com {} item(ns)", items.len()),
                )
                .await?;
        }

        if let Some(status) = payload.status {
            if status != prev.status {
                self.order_repo.set_order_status(&mut tx, id, status).await?;
                self.order_repo
                    .append_history(
                        &mut tx,
                        id,
                        status.as_str(),
                        &format!("Status alterado de \"{}\" para \"{status}\"", prev.status),
                    )
                    .await?;
                intents.push(NotificationIntent::StatusChanged {
                    order_id: id,
                    order_code: prev.invoice_code.clone(),
                    new_status: status,
                    old_status: Some(prev.status),
                });
            }
        }

        if let Some(payment) = payload.payment_status {
            if payment != prev.payment_status {
                self.order_repo
                    .append_history(
                        &mut tx,
                        id,
                        "Pembayaran",
                        &format!(
                            "Status de pagamento alterado de \"{}\" para \"{}\"",
                            prev.payment_status.as_str(),
                            payment.as_str()
                        ),
                    )
                    .await?;
            }
        }

        tx.commit().await?;

        for intent in intents {
            notifier::dispatch(self.notifier.clone(), intent);
        }

        self.detail(id).await
    }

    // ---
    // Itens
    // ---

    // Atualização parcial. Atribuição de operador vira entrada no
    // histórico; o total da invoice é recalculado (o subtotal pode mudar).
    pub async fn update_item(
        &self,
        id: i64,
        actor: &User,
        payload: UpdateOrderItemPayload,
    ) -> Result<OrderItem, AppError> {
        let prev = self
            .order_repo
            .find_item(&self.pool, id)
            .await?
            .ok_or_else(|| AppError::not_found("Item"))?;

        let operator_change = match payload.operator {
            Some(operator_id) if Some(operator_id) != prev.operator => Some(
                self.user_repo
                    .find_by_id(operator_id)
                    .await?
                    .ok_or_else(|| AppError::not_found("Operador"))?,
            ),
            _ => None,
        };

        let mut tx = self.pool.begin().await?;

        let updated = self
            .order_repo
            .update_item_partial(
                &mut tx,
                id,
                payload.qty,
                payload.p,
                payload.l,
                payload.price,
                payload.finishing.as_deref(),
                payload.nama_file.as_deref(),
                payload.keterangan.as_deref(),
                payload.operator,
                payload.desainer,
            )
            .await?;

        if let Some(new_operator) = &operator_change {
            let deskripsi = match prev.operator {
                Some(_) => format!(
                    "Operador do item {} alterado para \"{}\" por {}",
                    prev.order_code, new_operator.full_name, actor.full_name
                ),
                None => format!(
                    "Operador \"{}\" atribuído ao item {} por {}",
                    new_operator.full_name, prev.order_code, actor.full_name
                ),
            };
            self.order_repo
                .append_history(&mut tx, prev.invoice_id, "Operator", &deskripsi)
                .await?;
        }

        self.order_repo
            .recompute_total(&mut tx, prev.invoice_id)
            .await?;
        tx.commit().await?;

        Ok(updated)
    }

    // Remove um item. O último item derruba a invoice junto (o histórico
    // some por cascata); senão o total é recalculado e a remoção auditada.
    // Devolve true quando a invoice também foi removida.
    pub async fn delete_item(&self, id: i64, actor: &User) -> Result<bool, AppError> {
        let item = self
            .order_repo
            .find_item(&self.pool, id)
            .await?
            .ok_or_else(|| AppError::not_found("Item"))?;
        let product_name = self
            .product_repo
            .find_by_id(item.product_id)
            .await?
            .map(|p| p.name)
            .unwrap_or_else(|| format!("#{}", item.product_id));

        let mut tx = self.pool.begin().await?;
        self.order_repo.delete_item(&mut tx, id).await?;

        let remaining = self.order_repo.count_items(&mut tx, item.invoice_id).await?;
        if remaining == 0 {
            self.order_repo.delete_order(&mut tx, item.invoice_id).await?;
            tx.commit().await?;
            tracing::info!(
                "🗑️ Último item removido; invoice #{} apagada junto",
                item.invoice_id
            );
            return Ok(true);
        }

        self.order_repo
            .append_history(
                &mut tx,
                item.invoice_id,
                "Hapus Item",
                &format!(
                    "Item \"{product_name}\" ({}) removido por {}",
                    item.order_code, actor.full_name
                ),
            )
            .await?;
        self.order_repo
            .recompute_total(&mut tx, item.invoice_id)
            .await?;
        tx.commit().await?;

        Ok(false)
    }

    // Resolve cada product_id do payload para a linha de catálogo; 404
    // se algum não existir. A ordem do retorno acompanha a dos itens.
    async fn resolve_products(
        &self,
        items: &[NewOrderItemInput],
    ) -> Result<Vec<Product>, AppError> {
        let mut products = Vec::with_capacity(items.len());
        for input in items {
            let product = self
                .product_repo
                .find_by_id(input.product_id)
                .await?
                .ok_or_else(|| AppError::not_found("Produto"))?;
            products.push(product);
        }
        Ok(products)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codigo_da_invoice_segue_o_id_com_quatro_digitos() {
        assert_eq!(format_invoice_code(1), "IA-ORD-0001");
        assert_eq!(format_invoice_code(42), "IA-ORD-0042");
        // acima de 9999 o código cresce, não trunca
        assert_eq!(format_invoice_code(10_000), "IA-ORD-10000");
    }

    #[test]
    fn contador_de_itens_continua_do_ultimo_codigo() {
        assert_eq!(next_item_counter(None), 1);
        assert_eq!(next_item_counter(Some("ORD-007")), 8);
        assert_eq!(next_item_counter(Some("ORD-099")), 100);
        assert_eq!(next_item_counter(Some("ORD-999")), 1000);
    }

    #[test]
    fn codigo_ilegivel_reinicia_o_contador() {
        assert_eq!(next_item_counter(Some("lixo")), 1);
        assert_eq!(next_item_counter(Some("ORD-")), 1);
        assert_eq!(next_item_counter(Some("")), 1);
    }

    #[test]
    fn codigo_de_item_tem_tres_digitos_sem_truncar() {
        assert_eq!(format_item_code(1), "ORD-001");
        assert_eq!(format_item_code(42), "ORD-042");
        assert_eq!(format_item_code(1000), "ORD-1000");
    }
}
