// src/db/order_repo.rs

use rust_decimal::Decimal;
use sqlx::{Executor, PgPool, Postgres, Transaction};

use crate::common::error::AppError;
use crate::models::orders::{
    HistoryEntry, ItemStatus, Order, OrderItem, OrderItemDetail, OrderSummary, PaymentStatus,
    ProductionQueueItem,
};

const ORDER_COLUMNS: &str =
    "id, invoice_code, client_id, client_name, status, payment_status, total, created_at, updated_at";

const ITEM_COLUMNS: &str = "id, invoice_id, order_code, product_id, qty, p, l, price, subtotal, \
     status, desainer, operator, finishing, nama_file, keterangan, created_at";

// Consulta base das filas de produção; o chamador escolhe o filtro de status.
const QUEUE_SQL: &str = "SELECT oi.id AS item_id, oi.order_code, o.id AS invoice_id, o.invoice_code,
        COALESCE(o.client_name, c.full_name, 'Unknown Client') AS customer_name,
        COALESCE(c.phone, '-') AS customer_phone,
        p.name AS product_name, oi.p, oi.l, oi.qty,
        oi.finishing, oi.nama_file,
        du.full_name AS designer_name, ou.full_name AS operator_name,
        oi.keterangan, oi.status, oi.created_at
     FROM order_items oi
     JOIN orders o ON o.id = oi.invoice_id
     LEFT JOIN clients c ON c.id = o.client_id
     JOIN products p ON p.id = oi.product_id
     LEFT JOIN users du ON du.id = oi.desainer
     LEFT JOIN users ou ON ou.id = oi.operator
     WHERE oi.status IN ";

#[derive(Clone)]
pub struct OrderRepository {
    pool: PgPool,
}

impl OrderRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // ---
    // Geração de códigos
    // ---
    // Lidos dentro da transação de criação para o próximo código ser
    // calculado sobre o último valor realmente gravado.

    pub async fn last_invoice_id(
        &self,
        tx: &mut Transaction<'_, Postgres>,
    ) -> Result<Option<i64>, AppError> {
        let id = sqlx::query_scalar::<_, i64>("SELECT id FROM orders ORDER BY id DESC LIMIT 1")
            .fetch_optional(&mut **tx)
            .await?;
        Ok(id)
    }

    pub async fn last_item_code(
        &self,
        tx: &mut Transaction<'_, Postgres>,
    ) -> Result<Option<String>, AppError> {
        let code = sqlx::query_scalar::<_, String>(
            "SELECT order_code FROM order_items ORDER BY id DESC LIMIT 1",
        )
        .fetch_optional(&mut **tx)
        .await?;
        Ok(code)
    }

    // ---
    // Invoices
    // ---

    pub async fn insert_order(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        invoice_code: &str,
        client_id: Option<i64>,
        client_name: Option<&str>,
        payment_status: PaymentStatus,
    ) -> Result<Order, AppError> {
        let order = sqlx::query_as::<_, Order>(&format!(
            "INSERT INTO orders (invoice_code, client_id, client_name, payment_status)
             VALUES ($1, $2, $3, $4)
             RETURNING {ORDER_COLUMNS}"
        ))
        .bind(invoice_code)
        .bind(client_id)
        .bind(client_name)
        .bind(payment_status)
        .fetch_one(&mut **tx)
        .await?;
        Ok(order)
    }

    pub async fn list(&self) -> Result<Vec<OrderSummary>, AppError> {
        let orders = sqlx::query_as::<_, OrderSummary>(
            "SELECT o.id, o.invoice_code,
                    COALESCE(o.client_name, c.full_name) AS client_name,
                    o.status, o.payment_status, o.total,
                    (SELECT COUNT(*) FROM order_items oi WHERE oi.invoice_id = o.id) AS items_count,
                    (SELECT p.name FROM order_items oi
                     JOIN products p ON p.id = oi.product_id
                     WHERE oi.invoice_id = o.id
                     ORDER BY oi.id ASC LIMIT 1) AS first_product,
                    o.created_at
             FROM orders o
             LEFT JOIN clients c ON c.id = o.client_id
             ORDER BY o.id DESC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(orders)
    }

    pub async fn find_order<'e, E>(&self, executor: E, id: i64) -> Result<Option<Order>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let order = sqlx::query_as::<_, Order>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(executor)
        .await?;
        Ok(order)
    }

    // Mesma leitura, mas travando a linha da invoice. Duas transações
    // terminando itens da mesma invoice serializam aqui; a segunda só
    // relê os status depois do commit da primeira.
    pub async fn find_order_for_update(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        id: i64,
    ) -> Result<Option<Order>, AppError> {
        let order = sqlx::query_as::<_, Order>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1 FOR UPDATE"
        ))
        .bind(id)
        .fetch_optional(&mut **tx)
        .await?;
        Ok(order)
    }

    pub async fn order_items_detail(
        &self,
        order_id: i64,
    ) -> Result<Vec<OrderItemDetail>, AppError> {
        let items = sqlx::query_as::<_, OrderItemDetail>(
            "SELECT oi.id, oi.invoice_id, oi.order_code, oi.product_id,
                    p.name AS product_name, oi.qty, oi.p, oi.l, oi.price, oi.subtotal,
                    oi.status, du.full_name AS designer_name, ou.full_name AS operator_name,
                    oi.finishing, oi.nama_file, oi.keterangan, oi.created_at
             FROM order_items oi
             JOIN products p ON p.id = oi.product_id
             LEFT JOIN users du ON du.id = oi.desainer
             LEFT JOIN users ou ON ou.id = oi.operator
             WHERE oi.invoice_id = $1
             ORDER BY oi.id ASC",
        )
        .bind(order_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(items)
    }

    pub async fn update_order_fields(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        id: i64,
        client_id: Option<i64>,
        client_name: Option<&str>,
        payment_status: Option<PaymentStatus>,
    ) -> Result<Order, AppError> {
        sqlx::query_as::<_, Order>(&format!(
            "UPDATE orders SET
                client_id = COALESCE($2, client_id),
                client_name = COALESCE($3, client_name),
                payment_status = COALESCE($4, payment_status),
                updated_at = now()
             WHERE id = $1
             RETURNING {ORDER_COLUMNS}"
        ))
        .bind(id)
        .bind(client_id)
        .bind(client_name)
        .bind(payment_status)
        .fetch_optional(&mut **tx)
        .await?
        .ok_or_else(|| AppError::not_found("Pedido"))
    }

    pub async fn set_order_status(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        id: i64,
        status: ItemStatus,
    ) -> Result<(), AppError> {
        sqlx::query("UPDATE orders SET status = $2, updated_at = now() WHERE id = $1")
            .bind(id)
            .bind(status)
            .execute(&mut **tx)
            .await?;
        Ok(())
    }

    // Total = soma dos subtotais dos itens restantes, em um único UPDATE.
    pub async fn recompute_total(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        order_id: i64,
    ) -> Result<Decimal, AppError> {
        let total = sqlx::query_scalar::<_, Decimal>(
            "UPDATE orders SET
                total = (SELECT COALESCE(SUM(subtotal), 0)
                         FROM order_items WHERE invoice_id = $1),
                updated_at = now()
             WHERE id = $1
             RETURNING total",
        )
        .bind(order_id)
        .fetch_one(&mut **tx)
        .await?;
        Ok(total)
    }

    pub async fn delete_order(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        id: i64,
    ) -> Result<(), AppError> {
        // Itens e histórico somem por cascata.
        sqlx::query("DELETE FROM orders WHERE id = $1")
            .bind(id)
            .execute(&mut **tx)
            .await?;
        Ok(())
    }

    // ---
    // Itens
    // ---

    #[allow(clippy::too_many_arguments)]
    pub async fn insert_item(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        invoice_id: i64,
        order_code: &str,
        product_id: i64,
        qty: i32,
        p: Option<Decimal>,
        l: Option<Decimal>,
        price: Decimal,
        subtotal: Decimal,
        status: ItemStatus,
        finishing: Option<&str>,
        nama_file: Option<&str>,
        keterangan: Option<&str>,
    ) -> Result<OrderItem, AppError> {
        let item = sqlx::query_as::<_, OrderItem>(&format!(
            "INSERT INTO order_items
                (invoice_id, order_code, product_id, qty, p, l, price, subtotal, status,
                 finishing, nama_file, keterangan)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
             RETURNING {ITEM_COLUMNS}"
        ))
        .bind(invoice_id)
        .bind(order_code)
        .bind(product_id)
        .bind(qty)
        .bind(p)
        .bind(l)
        .bind(price)
        .bind(subtotal)
        .bind(status)
        .bind(finishing)
        .bind(nama_file)
        .bind(keterangan)
        .fetch_one(&mut **tx)
        .await?;
        Ok(item)
    }

    pub async fn find_item<'e, E>(
        &self,
        executor: E,
        id: i64,
    ) -> Result<Option<OrderItem>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let item = sqlx::query_as::<_, OrderItem>(&format!(
            "SELECT {ITEM_COLUMNS} FROM order_items WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(executor)
        .await?;
        Ok(item)
    }

    pub async fn delete_items(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        order_id: i64,
    ) -> Result<(), AppError> {
        sqlx::query("DELETE FROM order_items WHERE invoice_id = $1")
            .bind(order_id)
            .execute(&mut **tx)
            .await?;
        Ok(())
    }

    // Atualização parcial do item. O subtotal é sempre recalculado como
    // preço × quantidade finais — o invariante não depende do cliente.
    // Status NÃO entra aqui: mudanças de status têm endpoints próprios.
    #[allow(clippy::too_many_arguments)]
    pub async fn update_item_partial(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        id: i64,
        qty: Option<i32>,
        p: Option<Decimal>,
        l: Option<Decimal>,
        price: Option<Decimal>,
        finishing: Option<&str>,
        nama_file: Option<&str>,
        keterangan: Option<&str>,
        operator: Option<i64>,
        desainer: Option<i64>,
    ) -> Result<OrderItem, AppError> {
        sqlx::query_as::<_, OrderItem>(&format!(
            "UPDATE order_items SET
                qty = COALESCE($2, qty),
                p = COALESCE($3, p),
                l = COALESCE($4, l),
                price = COALESCE($5, price),
                finishing = COALESCE($6, finishing),
                nama_file = COALESCE($7, nama_file),
                keterangan = COALESCE($8, keterangan),
                operator = COALESCE($9, operator),
                desainer = COALESCE($10, desainer),
                subtotal = COALESCE($5, price) * COALESCE($2, qty)
             WHERE id = $1
             RETURNING {ITEM_COLUMNS}"
        ))
        .bind(id)
        .bind(qty)
        .bind(p)
        .bind(l)
        .bind(price)
        .bind(finishing)
        .bind(nama_file)
        .bind(keterangan)
        .bind(operator)
        .bind(desainer)
        .fetch_optional(&mut **tx)
        .await?
        .ok_or_else(|| AppError::not_found("Item"))
    }

    pub async fn delete_item(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        id: i64,
    ) -> Result<(), AppError> {
        sqlx::query("DELETE FROM order_items WHERE id = $1")
            .bind(id)
            .execute(&mut **tx)
            .await?;
        Ok(())
    }

    pub async fn count_items(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        order_id: i64,
    ) -> Result<i64, AppError> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM order_items WHERE invoice_id = $1",
        )
        .bind(order_id)
        .fetch_one(&mut **tx)
        .await?;
        Ok(count)
    }

    // ---
    // Transições guardadas
    // ---
    // O UPDATE condicionado ao status esperado é o ponto de serialização:
    // de duas requisições concorrentes, a perdedora não afeta linha alguma
    // e o serviço devolve InvalidTransition.

    pub async fn transition_exact(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        item_id: i64,
        expected: ItemStatus,
        to: ItemStatus,
    ) -> Result<bool, AppError> {
        let result = sqlx::query(
            "UPDATE order_items SET status = $3 WHERE id = $1 AND status = $2",
        )
        .bind(item_id)
        .bind(expected)
        .bind(to)
        .execute(&mut **tx)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    // Claim do desainer: transição + atribuição no mesmo comando. O par
    // esperado/próximo vem do enum, onde as guardas têm teste unitário.
    pub async fn claim_for_design(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        item_id: i64,
        designer_id: i64,
    ) -> Result<bool, AppError> {
        let (expected, next) = ItemStatus::START_DESIGN;
        let result = sqlx::query(
            "UPDATE order_items SET status = $3, desainer = $2
             WHERE id = $1 AND status = $4",
        )
        .bind(item_id)
        .bind(designer_id)
        .bind(next)
        .bind(expected)
        .execute(&mut **tx)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    // Claim do operador: transição + atribuição no mesmo comando.
    pub async fn claim_for_print(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        item_id: i64,
        operator_id: i64,
    ) -> Result<bool, AppError> {
        let (expected, next) = ItemStatus::START_JOB;
        let result = sqlx::query(
            "UPDATE order_items SET status = $3, operator = $2
             WHERE id = $1 AND status = $4",
        )
        .bind(item_id)
        .bind(operator_id)
        .bind(next)
        .bind(expected)
        .execute(&mut **tx)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    // Cancela só enquanto o item está no fluxo de desenho.
    pub async fn cancel_design_mark(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        item_id: i64,
    ) -> Result<bool, AppError> {
        let result = sqlx::query(
            "UPDATE order_items SET status = $2 WHERE id = $1 AND status = ANY($3)",
        )
        .bind(item_id)
        .bind(ItemStatus::Batal)
        .bind(ItemStatus::design_cancelable())
        .execute(&mut **tx)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    // Cancela qualquer item não terminal (cancelar duas vezes falha).
    pub async fn cancel_active_mark(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        item_id: i64,
    ) -> Result<bool, AppError> {
        let result = sqlx::query(
            "UPDATE order_items SET status = $2 WHERE id = $1 AND status = ANY($3)",
        )
        .bind(item_id)
        .bind(ItemStatus::Batal)
        .bind(ItemStatus::cancelable())
        .execute(&mut **tx)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    // Override administrativo: escreve o status sem olhar o grafo.
    pub async fn set_item_status_unchecked(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        item_id: i64,
        status: ItemStatus,
    ) -> Result<(), AppError> {
        sqlx::query("UPDATE order_items SET status = $2 WHERE id = $1")
            .bind(item_id)
            .bind(status)
            .execute(&mut **tx)
            .await?;
        Ok(())
    }

    // ---
    // Suporte ao rollup
    // ---

    // Conjunto de status dos itens, lido DENTRO da transação que decide
    // o rollup, para tolerar intercalação com outros itens da invoice.
    pub async fn distinct_item_statuses(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        order_id: i64,
    ) -> Result<Vec<ItemStatus>, AppError> {
        let statuses = sqlx::query_scalar::<_, ItemStatus>(
            "SELECT DISTINCT status FROM order_items WHERE invoice_id = $1",
        )
        .bind(order_id)
        .fetch_all(&mut **tx)
        .await?;
        Ok(statuses)
    }

    pub async fn count_non_canceled_items(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        order_id: i64,
    ) -> Result<i64, AppError> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM order_items WHERE invoice_id = $1 AND status <> 'Batal'",
        )
        .bind(order_id)
        .fetch_one(&mut **tx)
        .await?;
        Ok(count)
    }

    // ---
    // Histórico
    // ---

    pub async fn append_history(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        order_id: i64,
        status: &str,
        deskripsi: &str,
    ) -> Result<(), AppError> {
        sqlx::query(
            "INSERT INTO order_history (order_id, status, deskripsi) VALUES ($1, $2, $3)",
        )
        .bind(order_id)
        .bind(status)
        .bind(deskripsi)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    // Linha do tempo da invoice, do mais antigo para o mais novo.
    pub async fn timeline(&self, order_id: i64) -> Result<Vec<HistoryEntry>, AppError> {
        let entries = sqlx::query_as::<_, HistoryEntry>(
            "SELECT id, order_id, status, deskripsi, tanggal
             FROM order_history WHERE order_id = $1
             ORDER BY tanggal ASC, id ASC",
        )
        .bind(order_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(entries)
    }

    // ---
    // Filas de produção
    // ---

    pub async fn design_queue(&self) -> Result<Vec<ProductionQueueItem>, AppError> {
        let sql = format!("{QUEUE_SQL}('Di Desain', 'Proses Desain') ORDER BY oi.id DESC");
        let rows = sqlx::query_as::<_, ProductionQueueItem>(&sql)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    pub async fn job_queue(&self) -> Result<Vec<ProductionQueueItem>, AppError> {
        let sql = format!("{QUEUE_SQL}('Operator', 'Proses Cetak') ORDER BY oi.id DESC");
        let rows = sqlx::query_as::<_, ProductionQueueItem>(&sql)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }
}
