// ==========================================
// 餐厅运营平台 - 库存可用性校验引擎
// ==========================================
// 红线: 纯读，不得调用任何写操作；被拒订单不留痕迹
// 红线: 收集全部缺口后再返回，不在第一个缺口处中断
// ==========================================
// 校验两道关:
// 1) 快速检查: ingredient.quantity_in_stock >= required（缓存）
// 2) 权威检查: Σ 可用批次剩余量 >= required（台账）
// 两者都通过才进入扣减计划
// ==========================================

use crate::domain::deduction::{DeductionCheck, DeductionPlanEntry, Shortfall, ShortfallReason};
use crate::domain::recipe::IngredientRequirement;
use crate::domain::types::QUANTITY_EPSILON;
use crate::engine::batch_ledger::BatchLedger;
use crate::repository::error::RepositoryResult;
use crate::repository::inventory_store::InventoryStore;
use chrono::NaiveDate;
use tracing::instrument;

#[derive(Debug, Clone, Default)]
pub struct AvailabilityValidator {
    ledger: BatchLedger,
}

impl AvailabilityValidator {
    pub fn new(ledger: BatchLedger) -> Self {
        Self { ledger }
    }

    /// 校验一组原料需求
    ///
    /// # 返回
    /// - DeductionCheck.is_valid: 无任何缺口
    /// - DeductionCheck.shortfalls: 全部缺口（含原料不存在）
    /// - DeductionCheck.plan: 通过校验的需求（只含数量，不含批次分配）
    #[instrument(skip(self, store, requirements), fields(requirements_count = requirements.len()))]
    pub fn validate<S: InventoryStore + ?Sized>(
        &self,
        store: &S,
        requirements: &[IngredientRequirement],
        as_of: NaiveDate,
    ) -> RepositoryResult<DeductionCheck> {
        let mut shortfalls = Vec::new();
        let mut plan = Vec::new();

        for requirement in requirements {
            if requirement.required_quantity <= QUANTITY_EPSILON {
                tracing::debug!(ingredient_id = %requirement.ingredient_id, "需求量为 0，跳过");
                continue;
            }

            let ingredient = match store.find_ingredient(&requirement.ingredient_id)? {
                Some(i) => i,
                None => {
                    tracing::warn!(
                        ingredient_id = %requirement.ingredient_id,
                        dish_id = %requirement.dish_id,
                        "配方引用的原料不存在，记为缺口"
                    );
                    shortfalls.push(Shortfall {
                        ingredient_id: requirement.ingredient_id.clone(),
                        ingredient_name: requirement.ingredient_id.clone(),
                        required: requirement.required_quantity,
                        available: 0.0,
                        unit: requirement.unit.clone(),
                        reason: ShortfallReason::IngredientNotFound,
                    });
                    continue;
                }
            };

            let required = requirement.required_quantity;
            let cached_ok = ingredient.quantity_in_stock + QUANTITY_EPSILON >= required;

            let balances = self
                .ledger
                .available_batches(store, &ingredient.ingredient_id, as_of)?;
            let batch_total = BatchLedger::total_remaining(&balances);
            let batches_ok = batch_total + QUANTITY_EPSILON >= required;

            if cached_ok && batches_ok {
                plan.push(DeductionPlanEntry {
                    ingredient_id: ingredient.ingredient_id,
                    ingredient_name: ingredient.name,
                    required_quantity: required,
                    unit: requirement.unit.clone(),
                });
                continue;
            }

            let available = ingredient.quantity_in_stock.min(batch_total).max(0.0);
            tracing::warn!(
                ingredient_id = %ingredient.ingredient_id,
                required,
                cached = ingredient.quantity_in_stock,
                batch_total,
                "库存不足"
            );
            shortfalls.push(Shortfall {
                ingredient_id: ingredient.ingredient_id,
                ingredient_name: ingredient.name,
                required,
                available,
                unit: requirement.unit.clone(),
                reason: ShortfallReason::InsufficientStock,
            });
        }

        let is_valid = shortfalls.is_empty();
        tracing::info!(
            is_valid,
            shortfalls = shortfalls.len(),
            plan_entries = plan.len(),
            "库存校验完成"
        );

        Ok(DeductionCheck {
            is_valid,
            shortfalls,
            plan,
        })
    }
}

#[cfg(test)]
mod tests;
