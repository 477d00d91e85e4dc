// src/services/workflow_service.rs
//
// Motor de workflow dos itens de produção. Cada operação roda como UMA
// transação: transição guardada do item, débito de estoque quando a
// etapa consome receita, rollup da invoice, histórico. As notificações
// saem depois do commit, nunca dentro da transação.

use std::sync::Arc;

use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, Transaction};

use crate::{
    common::error::AppError,
    db::{OrderRepository, ProductRepository},
    models::{
        auth::User,
        inventory::ProductionMaterialDetail,
        notifications::NotificationIntent,
        orders::{ItemStatus, Order, OrderItem, ProductionQueueItem},
    },
    services::{
        inventory_service::{plan_consumption, InventoryService},
        notifier::{self, Notifier},
    },
};

// Regra do rollup: a invoice espelha os itens quando TODOS convergem
// para um único status diferente do atual. Conjuntos heterogêneos não
// mexem na invoice — inclusive {Batal, Selesai}, que nunca converge e
// deixa o status da invoice parado (comportamento deliberado, ver
// DESIGN.md).
pub fn rollup_target(distinct: &[ItemStatus], current: ItemStatus) -> Option<ItemStatus> {
    match distinct {
        [only] if *only != current => Some(*only),
        _ => None,
    }
}

#[derive(Clone)]
pub struct WorkflowService {
    pool: PgPool,
    order_repo: OrderRepository,
    product_repo: ProductRepository,
    inventory: InventoryService,
    notifier: Arc<dyn Notifier>,
}

impl WorkflowService {
    pub fn new(
        pool: PgPool,
        order_repo: OrderRepository,
        product_repo: ProductRepository,
        inventory: InventoryService,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            pool,
            order_repo,
            product_repo,
            inventory,
            notifier,
        }
    }

    // ---
    // Filas das bancadas
    // ---

    pub async fn design_queue(&self) -> Result<Vec<ProductionQueueItem>, AppError> {
        self.order_repo.design_queue().await
    }

    pub async fn job_queue(&self) -> Result<Vec<ProductionQueueItem>, AppError> {
        self.order_repo.job_queue().await
    }

    // ---
    // Fluxo de desenho
    // ---

    // Desainer assume um item da fila: 'Di Desain' → 'Proses Desain',
    // com atribuição no mesmo UPDATE guardado. Chamado duas vezes, o
    // segundo perde a guarda e sai com InvalidTransition.
    pub async fn start_design(&self, item_id: i64, designer: &User) -> Result<OrderItem, AppError> {
        let item = self.load_item(item_id).await?;
        if !item.status.can_start_design() {
            return Err(Self::wrong_status(&item, ItemStatus::START_DESIGN.0));
        }

        let mut tx = self.pool.begin().await?;

        let claimed = self
            .order_repo
            .claim_for_design(&mut tx, item_id, designer.id)
            .await?;
        if !claimed {
            // outra requisição moveu o item entre a leitura e a guarda
            return Err(Self::wrong_status(&item, ItemStatus::START_DESIGN.0));
        }

        self.order_repo
            .append_history(
                &mut tx,
                item.invoice_id,
                ItemStatus::ProsesDesain.as_str(),
                &format!(
                    "Item {} em desenho por {}",
                    item.order_code, designer.full_name
                ),
            )
            .await?;

        let intents = self.rollup_after_transition(&mut tx, item.invoice_id).await?;
        let updated = self.reread_item(&mut tx, item_id).await?;
        tx.commit().await?;

        self.dispatch_all(intents.into_iter().collect());
        Ok(updated)
    }

    // 'Proses Desain' → 'Acc Admin': o desenho vai para aprovação.
    pub async fn finish_design(&self, item_id: i64, actor: &User) -> Result<OrderItem, AppError> {
        let item = self.load_item(item_id).await?;
        let (expected, next) = ItemStatus::FINISH_DESIGN;
        if !item.status.can_finish_design() {
            return Err(Self::wrong_status(&item, expected));
        }

        let mut tx = self.pool.begin().await?;

        let claimed = self
            .order_repo
            .transition_exact(&mut tx, item_id, expected, next)
            .await?;
        if !claimed {
            return Err(Self::wrong_status(&item, expected));
        }

        self.order_repo
            .append_history(
                &mut tx,
                item.invoice_id,
                next.as_str(),
                &format!(
                    "Desenho do item {} enviado para aprovação por {}",
                    item.order_code, actor.full_name
                ),
            )
            .await?;

        let mut intents = vec![NotificationIntent::StatusChanged {
            order_id: item.invoice_id,
            order_code: item.order_code.clone(),
            new_status: next,
            old_status: Some(item.status),
        }];
        intents.extend(self.rollup_after_transition(&mut tx, item.invoice_id).await?);
        let updated = self.reread_item(&mut tx, item_id).await?;
        tx.commit().await?;

        self.dispatch_all(intents);
        Ok(updated)
    }

    // Cancela enquanto o item ainda está no fluxo de desenho.
    pub async fn cancel_design(&self, item_id: i64, actor: &User) -> Result<OrderItem, AppError> {
        let item = self.load_item(item_id).await?;

        let mut tx = self.pool.begin().await?;

        let marked = self.order_repo.cancel_design_mark(&mut tx, item_id).await?;
        if !marked {
            return Err(AppError::invalid_transition(format!(
                "Item {} não está no fluxo de desenho (status atual: {})",
                item.order_code, item.status
            )));
        }

        self.order_repo
            .append_history(
                &mut tx,
                item.invoice_id,
                ItemStatus::Batal.as_str(),
                &format!("Item {} cancelado por {}", item.order_code, actor.full_name),
            )
            .await?;

        let intents = self.cancel_rollup(&mut tx, item.invoice_id, actor).await?;
        let updated = self.reread_item(&mut tx, item_id).await?;
        tx.commit().await?;

        self.dispatch_all(intents.into_iter().collect());
        Ok(updated)
    }

    // ---
    // Fluxo de impressão
    // ---

    // Operador assume um item da fila: 'Operator' → 'Proses Cetak'.
    pub async fn start_job(&self, item_id: i64, operator: &User) -> Result<OrderItem, AppError> {
        let item = self.load_item(item_id).await?;
        if !item.status.can_start_job() {
            return Err(Self::wrong_status(&item, ItemStatus::START_JOB.0));
        }

        let mut tx = self.pool.begin().await?;

        let claimed = self
            .order_repo
            .claim_for_print(&mut tx, item_id, operator.id)
            .await?;
        if !claimed {
            return Err(Self::wrong_status(&item, ItemStatus::START_JOB.0));
        }

        self.order_repo
            .append_history(
                &mut tx,
                item.invoice_id,
                ItemStatus::ProsesCetak.as_str(),
                &format!(
                    "Item {} em impressão por {}",
                    item.order_code, operator.full_name
                ),
            )
            .await?;

        let intents = self.rollup_after_transition(&mut tx, item.invoice_id).await?;
        let updated = self.reread_item(&mut tx, item_id).await?;
        tx.commit().await?;

        self.dispatch_all(intents.into_iter().collect());
        Ok(updated)
    }

    // 'Proses Cetak' → 'Selesai', debitando a receita do produto quando
    // ele é do tipo impresso. Qualquer material sem saldo aborta a
    // transação inteira: nem débito parcial, nem mudança de status.
    pub async fn finish_job(&self, item_id: i64, operator: &User) -> Result<OrderItem, AppError> {
        let item = self.load_item(item_id).await?;
        let (expected, next) = ItemStatus::FINISH_JOB;
        if !item.status.can_finish_job() {
            return Err(Self::wrong_status(&item, expected));
        }
        let product = self
            .product_repo
            .find_by_id(item.product_id)
            .await?
            .ok_or_else(|| AppError::not_found("Produto"))?;

        let mut tx = self.pool.begin().await?;

        // O claim vem ANTES do débito: de dois finish concorrentes, só o
        // vencedor da guarda chega a tocar o estoque.
        let claimed = self
            .order_repo
            .transition_exact(&mut tx, item_id, expected, next)
            .await?;
        if !claimed {
            return Err(Self::wrong_status(&item, expected));
        }

        if product.product_type.consumes_recipe() {
            let recipe = self
                .product_repo
                .get_recipe_entries(&mut *tx, item.product_id)
                .await?;
            for requirement in plan_consumption(&recipe, item.qty) {
                self.inventory
                    .debit(
                        &mut tx,
                        requirement.material_id,
                        requirement.required,
                        &format!(
                            "Consumido na produção de {} ({} unid.) - Item {}",
                            product.name, item.qty, item.order_code
                        ),
                    )
                    .await?;
            }
        }

        self.order_repo
            .append_history(
                &mut tx,
                item.invoice_id,
                next.as_str(),
                &format!(
                    "Item {} impresso e finalizado por {}",
                    item.order_code, operator.full_name
                ),
            )
            .await?;

        let mut intents = vec![NotificationIntent::StatusChanged {
            order_id: item.invoice_id,
            order_code: item.order_code.clone(),
            new_status: next,
            old_status: Some(item.status),
        }];
        intents.extend(self.rollup_after_transition(&mut tx, item.invoice_id).await?);
        let updated = self.reread_item(&mut tx, item_id).await?;
        tx.commit().await?;

        self.dispatch_all(intents);
        Ok(updated)
    }

    // Cancela qualquer item não terminal. Cancelar de novo é erro, não
    // um segundo registro no histórico.
    pub async fn cancel_job(&self, item_id: i64, actor: &User) -> Result<OrderItem, AppError> {
        let item = self.load_item(item_id).await?;

        let mut tx = self.pool.begin().await?;

        let marked = self.order_repo.cancel_active_mark(&mut tx, item_id).await?;
        if !marked {
            return Err(AppError::invalid_transition(format!(
                "Item {} já está em estado terminal (status atual: {})",
                item.order_code, item.status
            )));
        }

        self.order_repo
            .append_history(
                &mut tx,
                item.invoice_id,
                ItemStatus::Batal.as_str(),
                &format!("Item {} cancelado por {}", item.order_code, actor.full_name),
            )
            .await?;

        let intents = self.cancel_rollup(&mut tx, item.invoice_id, actor).await?;
        let updated = self.reread_item(&mut tx, item_id).await?;
        tx.commit().await?;

        self.dispatch_all(intents.into_iter().collect());
        Ok(updated)
    }

    // ---
    // Override administrativo
    // ---

    // Escreve o status sem olhar o grafo — a válvula de escape do admin,
    // separada de propósito das operações guardadas. O enum fechado já é
    // a allow-list; histórico e rollup acontecem como em qualquer transição.
    pub async fn update_item_status(
        &self,
        item_id: i64,
        status: ItemStatus,
        actor: &User,
    ) -> Result<OrderItem, AppError> {
        let item = self.load_item(item_id).await?;

        let mut tx = self.pool.begin().await?;

        self.order_repo
            .set_item_status_unchecked(&mut tx, item_id, status)
            .await?;
        self.order_repo
            .append_history(
                &mut tx,
                item.invoice_id,
                status.as_str(),
                &format!(
                    "Status do item {} alterado de \"{}\" para \"{status}\" por {}",
                    item.order_code, item.status, actor.full_name
                ),
            )
            .await?;

        let mut intents = vec![NotificationIntent::StatusChanged {
            order_id: item.invoice_id,
            order_code: item.order_code.clone(),
            new_status: status,
            old_status: Some(item.status),
        }];
        intents.extend(self.rollup_after_transition(&mut tx, item.invoice_id).await?);
        let updated = self.reread_item(&mut tx, item_id).await?;
        tx.commit().await?;

        self.dispatch_all(intents);
        Ok(updated)
    }

    // ---
    // Materiais avulsos
    // ---

    // Material extra consumido fora da receita: débito no livro-razão e
    // registro do consumo, na mesma transação.
    pub async fn add_production_material(
        &self,
        item_id: i64,
        operator: &User,
        product_id: i64,
        qty: Decimal,
    ) -> Result<(), AppError> {
        let item = self.load_item(item_id).await?;

        let mut tx = self.pool.begin().await?;
        self.inventory
            .debit(
                &mut tx,
                product_id,
                qty,
                &format!(
                    "Material avulso para o item {} (adicionado por {})",
                    item.order_code, operator.full_name
                ),
            )
            .await?;
        self.product_repo
            .insert_production_material(&mut tx, item_id, product_id, operator.id, qty)
            .await?;
        tx.commit().await?;
        Ok(())
    }

    pub async fn list_production_materials(
        &self,
        item_id: i64,
    ) -> Result<Vec<ProductionMaterialDetail>, AppError> {
        self.load_item(item_id).await?;
        self.product_repo.list_production_materials(item_id).await
    }

    // ---
    // Internos
    // ---

    // Leitura simples fora da transação; a guarda transacional revalida
    // o status na hora da escrita.
    async fn load_item(&self, item_id: i64) -> Result<OrderItem, AppError> {
        self.order_repo
            .find_item(&self.pool, item_id)
            .await?
            .ok_or_else(|| AppError::not_found("Item"))
    }

    async fn reread_item(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        item_id: i64,
    ) -> Result<OrderItem, AppError> {
        self.order_repo
            .find_item(&mut **tx, item_id)
            .await?
            .ok_or_else(|| AppError::not_found("Item"))
    }

    // Leitura da invoice com trava de linha: transações que decidem o
    // rollup da mesma invoice serializam aqui, e a perdedora relê o
    // conjunto de status já com o commit da vencedora visível.
    async fn load_order_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        order_id: i64,
    ) -> Result<Order, AppError> {
        self.order_repo
            .find_order_for_update(tx, order_id)
            .await?
            .ok_or_else(|| AppError::not_found("Pedido"))
    }

    // Mensagem padrão das guardas: nomeia o status exigido e o atual.
    fn wrong_status(item: &OrderItem, expected: ItemStatus) -> AppError {
        AppError::invalid_transition(format!(
            "Item {} não está em '{}' (status atual: {})",
            item.order_code, expected, item.status
        ))
    }

    // Rollup das transições não-canceladoras. Invoice e conjunto de
    // status são relidos DENTRO da transação que decide, para tolerar
    // intercalação com operações sobre outros itens da mesma invoice.
    async fn rollup_after_transition(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        order_id: i64,
    ) -> Result<Option<NotificationIntent>, AppError> {
        let order = self.load_order_tx(tx, order_id).await?;
        let statuses = self.order_repo.distinct_item_statuses(tx, order_id).await?;

        let Some(target) = rollup_target(&statuses, order.status) else {
            return Ok(None);
        };

        self.order_repo.set_order_status(tx, order_id, target).await?;
        self.order_repo
            .append_history(
                tx,
                order_id,
                target.as_str(),
                &format!(
                    "Status da invoice {} atualizado automaticamente para \"{target}\" (todos os itens convergiram)",
                    order.invoice_code
                ),
            )
            .await?;

        Ok(Some(NotificationIntent::StatusChanged {
            order_id,
            order_code: order.invoice_code,
            new_status: target,
            old_status: Some(order.status),
        }))
    }

    // Rollup das operações de cancelamento: quando o último item ativo
    // cai, a invoice vira 'Batal' e UMA intenção de cancelamento sai
    // para o owner, identificando quem cancelou.
    async fn cancel_rollup(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        order_id: i64,
        actor: &User,
    ) -> Result<Option<NotificationIntent>, AppError> {
        // trava antes de contar: dois cancels simultâneos dos dois últimos
        // itens não podem ambos enxergar o outro ainda ativo
        let order = self.load_order_tx(tx, order_id).await?;
        let active = self.order_repo.count_non_canceled_items(tx, order_id).await?;
        if active > 0 {
            return Ok(None);
        }

        self.order_repo
            .set_order_status(tx, order_id, ItemStatus::Batal)
            .await?;
        self.order_repo
            .append_history(
                tx,
                order_id,
                ItemStatus::Batal.as_str(),
                &format!(
                    "Invoice {} cancelada (todos os itens cancelados)",
                    order.invoice_code
                ),
            )
            .await?;

        Ok(Some(NotificationIntent::OrderCanceled {
            order_id,
            invoice_code: order.invoice_code,
            actor_name: actor.full_name.clone(),
            actor_role: actor.role,
        }))
    }

    // Fire-and-forget; só pode ser chamado depois do commit.
    fn dispatch_all(&self, intents: Vec<NotificationIntent>) {
        for intent in intents {
            notifier::dispatch(self.notifier.clone(), intent);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rollup_dispara_quando_todos_os_itens_convergem() {
        let distinct = [ItemStatus::Selesai];
        assert_eq!(
            rollup_target(&distinct, ItemStatus::ProsesCetak),
            Some(ItemStatus::Selesai)
        );
    }

    #[test]
    fn rollup_nao_repete_quando_a_invoice_ja_esta_no_alvo() {
        // Sem isso, cada transição redundante duplicaria o histórico.
        let distinct = [ItemStatus::Selesai];
        assert_eq!(rollup_target(&distinct, ItemStatus::Selesai), None);
    }

    #[test]
    fn conjunto_heterogeneo_nao_mexe_na_invoice() {
        let distinct = [ItemStatus::Selesai, ItemStatus::Operator];
        assert_eq!(rollup_target(&distinct, ItemStatus::Operator), None);
    }

    #[test]
    fn batal_mais_selesai_nunca_converge() {
        // Um item cancelado no meio trava o rollup para sempre: a
        // invoice fica no último status convergido. Comportamento
        // preservado de propósito — não "corrigir" aqui.
        let distinct = [ItemStatus::Batal, ItemStatus::Selesai];
        assert_eq!(rollup_target(&distinct, ItemStatus::ProsesCetak), None);
    }

    #[test]
    fn todos_cancelados_converge_para_batal() {
        let distinct = [ItemStatus::Batal];
        assert_eq!(
            rollup_target(&distinct, ItemStatus::ProsesCetak),
            Some(ItemStatus::Batal)
        );
    }

    #[test]
    fn invoice_sem_itens_nao_faz_rollup() {
        assert_eq!(rollup_target(&[], ItemStatus::Admin), None);
    }

    // Os testes abaixo exercitam as guardas e o rollup contra um
    // Postgres de verdade: `cargo test -- --ignored` com DATABASE_URL
    // apontando para um banco descartável.

    use std::time::{SystemTime, UNIX_EPOCH};

    use async_trait::async_trait;
    use sqlx::postgres::PgPoolOptions;

    use crate::db::{ClientRepository, UserRepository};
    use crate::models::auth::Role;
    use crate::models::inventory::ProductType;
    use crate::models::orders::PaymentStatus;

    struct SilentNotifier;

    #[async_trait]
    impl Notifier for SilentNotifier {
        async fn notify(&self, _intent: NotificationIntent) -> anyhow::Result<()> {
            Ok(())
        }
    }

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

    fn unique_suffix() -> u128 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos()
    }

    struct Fixture {
        pool: PgPool,
        service: WorkflowService,
        order_repo: OrderRepository,
        operator: User,
        order: Order,
    }

    // Invoice com um item por status pedido, produto sem receita.
    async fn seed_order(statuses: &[ItemStatus]) -> (Fixture, Vec<OrderItem>) {
        let pool = test_pool().await;
        let suffix = unique_suffix();

        let order_repo = OrderRepository::new(pool.clone());
        let product_repo = ProductRepository::new(pool.clone());
        let user_repo = UserRepository::new(pool.clone());
        let client_repo = ClientRepository::new(pool.clone());
        let inventory = InventoryService::new(pool.clone(), product_repo.clone());
        let service = WorkflowService::new(
            pool.clone(),
            order_repo.clone(),
            product_repo.clone(),
            inventory,
            Arc::new(SilentNotifier),
        );

        let operator = user_repo
            .create(
                &format!("op-{suffix}"),
                "Operador de Teste",
                "hash",
                Role::Operator,
            )
            .await
            .unwrap();
        let client = client_repo
            .create("Cliente de Teste", None, None)
            .await
            .unwrap();
        let product = product_repo
            .create(
                &format!("Produto {suffix}"),
                "unid",
                Decimal::from(1000),
                None,
                ProductType::BarangJadi,
                Decimal::ZERO,
            )
            .await
            .unwrap();

        let mut tx = pool.begin().await.unwrap();
        let order = order_repo
            .insert_order(
                &mut tx,
                &format!("TST-{suffix}"),
                Some(client.id),
                Some(&client.full_name),
                PaymentStatus::BelumLunas,
            )
            .await
            .unwrap();
        let mut items = Vec::new();
        for (i, status) in statuses.iter().enumerate() {
            let item = order_repo
                .insert_item(
                    &mut tx,
                    order.id,
                    &format!("TST-{suffix}-{i}"),
                    product.id,
                    1,
                    None,
                    None,
                    product.price,
                    product.price,
                    *status,
                    None,
                    None,
                    None,
                )
                .await
                .unwrap();
            items.push(item);
        }
        order_repo
            .set_order_status(&mut tx, order.id, statuses[0])
            .await
            .unwrap();
        tx.commit().await.unwrap();

        let fixture = Fixture {
            pool,
            service,
            order_repo,
            operator,
            order,
        };
        (fixture, items)
    }

    #[tokio::test]
    #[ignore = "requer um Postgres acessível via DATABASE_URL"]
    async fn claim_duplo_na_fila_de_impressao_e_rejeitado() {
        let (fx, items) = seed_order(&[ItemStatus::Operator]).await;

        fx.service.start_job(items[0].id, &fx.operator).await.unwrap();
        let err = fx
            .service
            .start_job(items[0].id, &fx.operator)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "INVALID_TRANSITION");
    }

    #[tokio::test]
    #[ignore = "requer um Postgres acessível via DATABASE_URL"]
    async fn cancelamento_duplo_falha_sem_duplicar_o_historico() {
        let (fx, items) = seed_order(&[ItemStatus::ProsesCetak]).await;

        fx.service.cancel_job(items[0].id, &fx.operator).await.unwrap();
        let before = fx.order_repo.timeline(fx.order.id).await.unwrap().len();

        let err = fx
            .service
            .cancel_job(items[0].id, &fx.operator)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "INVALID_TRANSITION");
        let after = fx.order_repo.timeline(fx.order.id).await.unwrap().len();
        assert_eq!(before, after);
    }

    #[tokio::test]
    #[ignore = "requer um Postgres acessível via DATABASE_URL"]
    async fn rollup_converge_quando_o_ultimo_item_termina() {
        let (fx, items) = seed_order(&[ItemStatus::ProsesCetak, ItemStatus::ProsesCetak]).await;

        fx.service.finish_job(items[0].id, &fx.operator).await.unwrap();
        let mid = fx
            .order_repo
            .find_order(&fx.pool, fx.order.id)
            .await
            .unwrap()
            .unwrap();
        // conjunto ainda heterogêneo: a invoice não se move
        assert_eq!(mid.status, ItemStatus::ProsesCetak);

        fx.service.finish_job(items[1].id, &fx.operator).await.unwrap();
        let done = fx
            .order_repo
            .find_order(&fx.pool, fx.order.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(done.status, ItemStatus::Selesai);
    }
}
