// src/db/product_repo.rs

use rust_decimal::Decimal;
use sqlx::{Executor, PgPool, Postgres};

use crate::common::error::AppError;
use crate::models::inventory::{
    MovementDirection, Product, ProductType, ProductionMaterialDetail, RecipeEntry,
    RecipeEntryDetail, StockMovement,
};

// Saldo travado de um produto (linha lida com FOR UPDATE dentro de uma
// transação de débito). Carrega o nome para as mensagens de erro.
#[derive(Debug, sqlx::FromRow)]
pub struct StockLevel {
    pub id: i64,
    pub name: String,
    pub stock: Decimal,
}

#[derive(Clone)]
pub struct ProductRepository {
    pool: PgPool,
}

impl ProductRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // ---
    // Funções de "Leitura" (Getters)
    // ---
    // Funções de leitura são simples e usam a pool principal.

    pub async fn list(&self) -> Result<Vec<Product>, AppError> {
        let products = sqlx::query_as::<_, Product>(
            "SELECT id, name, unit, price, category, product_type, stock, created_at, updated_at
             FROM products ORDER BY name ASC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(products)
    }

    pub async fn list_raw_materials(&self) -> Result<Vec<Product>, AppError> {
        let products = sqlx::query_as::<_, Product>(
            "SELECT id, name, unit, price, category, product_type, stock, created_at, updated_at
             FROM products WHERE product_type = 'Bahan Baku' ORDER BY name ASC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(products)
    }

    pub async fn find_by_id(&self, id: i64) -> Result<Option<Product>, AppError> {
        let product = sqlx::query_as::<_, Product>(
            "SELECT id, name, unit, price, category, product_type, stock, created_at, updated_at
             FROM products WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(product)
    }

    pub async fn create(
        &self,
        name: &str,
        unit: &str,
        price: Decimal,
        category: Option<&str>,
        product_type: ProductType,
        stock: Decimal,
    ) -> Result<Product, AppError> {
        let product = sqlx::query_as::<_, Product>(
            "INSERT INTO products (name, unit, price, category, product_type, stock)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING id, name, unit, price, category, product_type, stock, created_at, updated_at",
        )
        .bind(name)
        .bind(unit)
        .bind(price)
        .bind(category)
        .bind(product_type)
        .bind(stock)
        .fetch_one(&self.pool)
        .await?;
        Ok(product)
    }

    // Atualização parcial via COALESCE. O estoque NÃO entra aqui:
    // toda mudança de saldo passa pelo livro-razão (débito/crédito).
    pub async fn update(
        &self,
        id: i64,
        name: Option<&str>,
        unit: Option<&str>,
        price: Option<Decimal>,
        category: Option<&str>,
        product_type: Option<ProductType>,
    ) -> Result<Product, AppError> {
        sqlx::query_as::<_, Product>(
            "UPDATE products SET
                name = COALESCE($2, name),
                unit = COALESCE($3, unit),
                price = COALESCE($4, price),
                category = COALESCE($5, category),
                product_type = COALESCE($6, product_type),
                updated_at = now()
             WHERE id = $1
             RETURNING id, name, unit, price, category, product_type, stock, created_at, updated_at",
        )
        .bind(id)
        .bind(name)
        .bind(unit)
        .bind(price)
        .bind(category)
        .bind(product_type)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::not_found("Produto"))
    }

    pub async fn delete(&self, id: i64) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                if let sqlx::Error::Database(db_err) = &e {
                    if db_err.is_foreign_key_violation() {
                        return AppError::invalid_transition(
                            "Produto está em uso em pedidos e não pode ser removido.",
                        );
                    }
                }
                AppError::from(e)
            })?;
        if result.rows_affected() == 0 {
            return Err(AppError::not_found("Produto"));
        }
        Ok(())
    }

    // ---
    // Receita (bill of materials)
    // ---

    // Receita com os dados do material, para a tela de edição.
    pub async fn get_recipe_detail(
        &self,
        product_id: i64,
    ) -> Result<Vec<RecipeEntryDetail>, AppError> {
        let entries = sqlx::query_as::<_, RecipeEntryDetail>(
            "SELECT r.id, r.material_id, m.name AS material_name, m.unit,
                    r.qty_per_unit, m.stock AS material_stock
             FROM product_recipes r
             JOIN products m ON m.id = r.material_id
             WHERE r.product_id = $1
             ORDER BY m.name ASC",
        )
        .bind(product_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(entries)
    }

    // Entradas cruas da receita, lidas dentro da transação de produção.
    pub async fn get_recipe_entries<'e, E>(
        &self,
        executor: E,
        product_id: i64,
    ) -> Result<Vec<RecipeEntry>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let entries = sqlx::query_as::<_, RecipeEntry>(
            "SELECT id, product_id, material_id, qty_per_unit
             FROM product_recipes WHERE product_id = $1",
        )
        .bind(product_id)
        .fetch_all(executor)
        .await?;
        Ok(entries)
    }

    // Substitui a receita inteira: apaga e reinsere, dentro da transação
    // do chamador, para a tela de edição salvar de uma vez.
    pub async fn replace_recipe(
        &self,
        tx: &mut sqlx::Transaction<'_, Postgres>,
        product_id: i64,
        entries: &[(i64, Decimal)],
    ) -> Result<(), AppError> {
        sqlx::query("DELETE FROM product_recipes WHERE product_id = $1")
            .bind(product_id)
            .execute(&mut **tx)
            .await?;

        for (material_id, qty_per_unit) in entries {
            sqlx::query(
                "INSERT INTO product_recipes (product_id, material_id, qty_per_unit)
                 VALUES ($1, $2, $3)",
            )
            .bind(product_id)
            .bind(material_id)
            .bind(qty_per_unit)
            .execute(&mut **tx)
            .await?;
        }
        Ok(())
    }

    // ---
    // Livro-razão de estoque
    // ---

    // Trava a linha do produto para o débito/crédito em curso. Duas
    // requisições concorrentes sobre o mesmo produto serializam aqui.
    pub async fn get_stock_for_update(
        &self,
        tx: &mut sqlx::Transaction<'_, Postgres>,
        product_id: i64,
    ) -> Result<Option<StockLevel>, AppError> {
        let level = sqlx::query_as::<_, StockLevel>(
            "SELECT id, name, stock FROM products WHERE id = $1 FOR UPDATE",
        )
        .bind(product_id)
        .fetch_optional(&mut **tx)
        .await?;
        Ok(level)
    }

    pub async fn apply_stock_delta(
        &self,
        tx: &mut sqlx::Transaction<'_, Postgres>,
        product_id: i64,
        delta: Decimal,
    ) -> Result<(), AppError> {
        sqlx::query("UPDATE products SET stock = stock + $2, updated_at = now() WHERE id = $1")
            .bind(product_id)
            .bind(delta)
            .execute(&mut **tx)
            .await?;
        Ok(())
    }

    // Registra uma movimentação no livro-razão (auditoria, só INSERT).
    pub async fn record_movement(
        &self,
        tx: &mut sqlx::Transaction<'_, Postgres>,
        product_id: i64,
        direction: MovementDirection,
        qty: Decimal,
        keterangan: &str,
    ) -> Result<(), AppError> {
        sqlx::query(
            "INSERT INTO stock_movements (product_id, direction, qty, keterangan)
             VALUES ($1, $2, $3, $4)",
        )
        .bind(product_id)
        .bind(direction)
        .bind(qty)
        .bind(keterangan)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    // Histórico do produto, mais recente primeiro.
    pub async fn movement_history(&self, product_id: i64) -> Result<Vec<StockMovement>, AppError> {
        let movements = sqlx::query_as::<_, StockMovement>(
            "SELECT id, product_id, direction, qty, keterangan, created_at
             FROM stock_movements
             WHERE product_id = $1
             ORDER BY created_at DESC
             LIMIT 50",
        )
        .bind(product_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(movements)
    }

    // ---
    // Materiais avulsos de produção
    // ---

    pub async fn insert_production_material(
        &self,
        tx: &mut sqlx::Transaction<'_, Postgres>,
        order_item_id: i64,
        product_id: i64,
        operator_id: i64,
        qty: Decimal,
    ) -> Result<(), AppError> {
        sqlx::query(
            "INSERT INTO production_materials (order_item_id, product_id, operator_id, qty)
             VALUES ($1, $2, $3, $4)",
        )
        .bind(order_item_id)
        .bind(product_id)
        .bind(operator_id)
        .bind(qty)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    pub async fn list_production_materials(
        &self,
        order_item_id: i64,
    ) -> Result<Vec<ProductionMaterialDetail>, AppError> {
        let materials = sqlx::query_as::<_, ProductionMaterialDetail>(
            "SELECT pm.id, pm.order_item_id, pm.product_id, p.name AS product_name,
                    p.unit, pm.qty, u.full_name AS operator_name, pm.created_at
             FROM production_materials pm
             JOIN products p ON p.id = pm.product_id
             LEFT JOIN users u ON u.id = pm.operator_id
             WHERE pm.order_item_id = $1
             ORDER BY pm.created_at ASC",
        )
        .bind(order_item_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(materials)
    }
}
