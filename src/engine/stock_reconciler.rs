// ==========================================
// 餐厅运营平台 - 库存对账引擎
// ==========================================
// 红线: 台账是唯一事实来源，缓存库存只是它的投影
// ==========================================
// 台账库存 = Σ 批次入库数量 − Σ 出库明细数量（含已过期批次）
// apply=true 时按台账重写缓存库存与库存状态
// ==========================================

use crate::domain::ingredient::StockDrift;
use crate::domain::types::{StockStatus, QUANTITY_EPSILON};
use crate::repository::error::RepositoryResult;
use crate::repository::inventory_store::InventoryStore;
use chrono::NaiveDateTime;
use tracing::instrument;

#[derive(Debug, Clone, Copy, Default)]
pub struct StockReconciler;

impl StockReconciler {
    pub fn new() -> Self {
        Self
    }

    /// 对比全部原料的缓存库存与台账库存
    ///
    /// # 返回
    /// 仅包含存在偏差的原料；apply=true 时偏差已修正（repaired=true）
    #[instrument(skip(self, store))]
    pub fn reconcile<S: InventoryStore + ?Sized>(
        &self,
        store: &S,
        apply: bool,
        now: NaiveDateTime,
    ) -> RepositoryResult<Vec<StockDrift>> {
        let totals = store.ledger_totals()?;
        let mut drifts = Vec::new();

        for ingredient in store.list_ingredients()? {
            let ledger_quantity = totals
                .get(&ingredient.ingredient_id)
                .map(|t| t.on_hand())
                .unwrap_or(0.0)
                .max(0.0);
            let drift = ingredient.quantity_in_stock - ledger_quantity;
            let derived = StockStatus::derive(ledger_quantity, ingredient.minimum_quantity);

            if drift.abs() <= QUANTITY_EPSILON && derived == ingredient.stock_status {
                continue;
            }

            tracing::warn!(
                ingredient_id = %ingredient.ingredient_id,
                cached = ingredient.quantity_in_stock,
                ledger = ledger_quantity,
                drift,
                "缓存库存与台账不一致"
            );

            if apply {
                store.update_ingredient_stock(&ingredient.ingredient_id, ledger_quantity, derived, now)?;
            }

            drifts.push(StockDrift {
                ingredient_id: ingredient.ingredient_id,
                ingredient_name: ingredient.name,
                cached_quantity: ingredient.quantity_in_stock,
                ledger_quantity,
                drift,
                repaired: apply,
            });
        }

        tracing::info!(drifts = drifts.len(), apply, "对账完成");
        Ok(drifts)
    }
}
