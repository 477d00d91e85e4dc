// src/services/inventory_service.rs

use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, Transaction};

use crate::{
    common::error::AppError,
    db::ProductRepository,
    models::inventory::{
        MovementDirection, Product, RecipeEntry, RecipeEntryDetail, StockMovement,
    },
};

// Necessidade de material calculada a partir da receita e da quantidade
// do item: required = qty_per_unit × qty.
#[derive(Debug, Clone, PartialEq)]
pub struct MaterialRequirement {
    pub material_id: i64,
    pub required: Decimal,
}

// Expande a receita de um produto para a quantidade pedida. Função pura:
// o débito em si acontece depois, dentro da transação.
pub fn plan_consumption(recipe: &[RecipeEntry], qty: i32) -> Vec<MaterialRequirement> {
    let factor = Decimal::from(qty);
    recipe
        .iter()
        .map(|entry| MaterialRequirement {
            material_id: entry.material_id,
            required: entry.qty_per_unit * factor,
        })
        .collect()
}

#[derive(Clone)]
pub struct InventoryService {
    pool: PgPool,
    product_repo: ProductRepository,
}

impl InventoryService {
    pub fn new(pool: PgPool, product_repo: ProductRepository) -> Self {
        Self { pool, product_repo }
    }

    // --- DÉBITO (SAÍDA) ---
    // Check-then-decrement atômico, sempre dentro da transação do chamador:
    // trava a linha do produto, valida o saldo e só então decrementa e
    // registra a movimentação. Saldo insuficiente aborta a operação inteira.
    pub async fn debit(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        product_id: i64,
        qty: Decimal,
        keterangan: &str,
    ) -> Result<(), AppError> {
        if qty <= Decimal::ZERO {
            return Err(AppError::invalid_input("A quantidade deve ser maior que zero."));
        }

        let level = self
            .product_repo
            .get_stock_for_update(tx, product_id)
            .await?
            .ok_or_else(|| AppError::not_found("Material"))?;

        if level.stock < qty {
            return Err(AppError::InsufficientStock {
                material: level.name,
                available: level.stock,
                required: qty,
            });
        }

        self.product_repo
            .apply_stock_delta(tx, product_id, -qty)
            .await?;
        self.product_repo
            .record_movement(tx, product_id, MovementDirection::Keluar, qty, keterangan)
            .await?;
        Ok(())
    }

    // --- CRÉDITO (ENTRADA) ---
    // Incremento incondicional, sem teto, com registro no livro-razão.
    pub async fn credit(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        product_id: i64,
        qty: Decimal,
        keterangan: &str,
    ) -> Result<(), AppError> {
        if qty <= Decimal::ZERO {
            return Err(AppError::invalid_input("A quantidade deve ser maior que zero."));
        }

        self.product_repo
            .get_stock_for_update(tx, product_id)
            .await?
            .ok_or_else(|| AppError::not_found("Produto"))?;

        self.product_repo
            .apply_stock_delta(tx, product_id, qty)
            .await?;
        self.product_repo
            .record_movement(tx, product_id, MovementDirection::Masuk, qty, keterangan)
            .await?;
        Ok(())
    }

    // --- ENTRADA MANUAL DE ESTOQUE ---
    // Transação própria: é um ajuste avulso, não parte de uma transição.
    pub async fn add_stock(
        &self,
        product_id: i64,
        qty: Decimal,
        keterangan: &str,
    ) -> Result<Product, AppError> {
        let mut tx = self.pool.begin().await?;
        self.credit(&mut tx, product_id, qty, keterangan).await?;
        tx.commit().await?;

        self.product_repo
            .find_by_id(product_id)
            .await?
            .ok_or_else(|| AppError::not_found("Produto"))
    }

    // --- SAÍDA MANUAL DE ESTOQUE ---
    pub async fn reduce_stock(
        &self,
        product_id: i64,
        qty: Decimal,
        keterangan: &str,
    ) -> Result<Product, AppError> {
        let mut tx = self.pool.begin().await?;
        self.debit(&mut tx, product_id, qty, keterangan).await?;
        tx.commit().await?;

        self.product_repo
            .find_by_id(product_id)
            .await?
            .ok_or_else(|| AppError::not_found("Produto"))
    }

    // Histórico do produto, mais recente primeiro (50 últimas).
    pub async fn history(&self, product_id: i64) -> Result<Vec<StockMovement>, AppError> {
        self.product_repo
            .find_by_id(product_id)
            .await?
            .ok_or_else(|| AppError::not_found("Produto"))?;
        self.product_repo.movement_history(product_id).await
    }

    // --- RECEITA ---
    // Salva a receita inteira de uma vez (apaga e reinsere). Valida o
    // produto e cada material antes de abrir a transação.
    pub async fn save_recipe(
        &self,
        product_id: i64,
        entries: &[(i64, Decimal)],
    ) -> Result<Vec<RecipeEntryDetail>, AppError> {
        self.product_repo
            .find_by_id(product_id)
            .await?
            .ok_or_else(|| AppError::not_found("Produto"))?;

        for (material_id, qty_per_unit) in entries {
            if *qty_per_unit <= Decimal::ZERO {
                return Err(AppError::invalid_input(
                    "A quantidade por unidade deve ser maior que zero.",
                ));
            }
            self.product_repo
                .find_by_id(*material_id)
                .await?
                .ok_or_else(|| AppError::not_found("Material"))?;
        }

        let mut tx = self.pool.begin().await?;
        self.product_repo
            .replace_recipe(&mut tx, product_id, entries)
            .await?;
        tx.commit().await?;

        self.product_repo.get_recipe_detail(product_id).await
    }

    pub async fn recipe_detail(
        &self,
        product_id: i64,
    ) -> Result<Vec<RecipeEntryDetail>, AppError> {
        self.product_repo
            .find_by_id(product_id)
            .await?
            .ok_or_else(|| AppError::not_found("Produto"))?;
        self.product_repo.get_recipe_detail(product_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(material_id: i64, qty_per_unit: Decimal) -> RecipeEntry {
        RecipeEntry {
            id: 0,
            product_id: 1,
            material_id,
            qty_per_unit,
        }
    }

    #[test]
    fn receita_escala_pela_quantidade_do_item() {
        // Receita: 2 unidades do material 10 por unidade produzida.
        // Item com qty 3 consome 6.
        let recipe = vec![entry(10, Decimal::from(2))];
        let plan = plan_consumption(&recipe, 3);
        assert_eq!(
            plan,
            vec![MaterialRequirement {
                material_id: 10,
                required: Decimal::from(6),
            }]
        );
    }

    #[test]
    fn receita_vazia_nao_consome_nada() {
        assert!(plan_consumption(&[], 5).is_empty());
    }

    #[test]
    fn receita_com_varios_materiais_expande_todos() {
        let recipe = vec![
            entry(10, Decimal::from(2)),
            entry(11, Decimal::new(50, 2)), // 0.50 por unidade
        ];
        let plan = plan_consumption(&recipe, 4);
        assert_eq!(plan.len(), 2);
        assert_eq!(plan[0].required, Decimal::from(8));
        assert_eq!(plan[1].required, Decimal::from(2));
    }

    #[test]
    fn faltando_estoque_o_erro_nomeia_material_e_numeros() {
        // O shape do erro é contrato: material, disponível e necessário.
        let err = AppError::InsufficientStock {
            material: "Flexi 280g".into(),
            available: Decimal::from(1),
            required: Decimal::from(6),
        };
        match err {
            AppError::InsufficientStock {
                material,
                available,
                required,
            } => {
                assert_eq!(material, "Flexi 280g");
                assert_eq!(available, Decimal::from(1));
                assert_eq!(required, Decimal::from(6));
            }
            _ => panic!("variante errada"),
        }
    }
}
