// ==========================================
// 餐厅运营平台 - 库存扣减执行引擎
// ==========================================
// 红线: 批次数量永不修改，只追加出库明细
// 红线: 无法完整满足计划时整单失败，不写任何台账行
// ==========================================
// 执行分两段（都在调用方的事务内）:
// 1) 分配: 逐计划项按 FIFO 遍历可用批次，扣除本单前序计划项已占用的量
// 2) 落库: 出库单（总成本一次定稿）→ 出库明细 → 原料缓存库存递减
// ==========================================

use crate::domain::deduction::DeductionPlanEntry;
use crate::domain::export::{DeductionReceipt, ExportDetail, ExportRecord, StockChange};
use crate::domain::types::{StockStatus, EXPORT_STATUS_COMPLETED, QUANTITY_EPSILON};
use crate::engine::batch_ledger::BatchLedger;
use crate::engine::error::{DeductionError, DeductionResult};
use crate::repository::error::RepositoryResult;
use crate::repository::inventory_store::InventoryStore;
use chrono::{NaiveDate, NaiveDateTime};
use std::collections::HashMap;
use tracing::instrument;
use uuid::Uuid;

/// 出库单抬头信息
#[derive(Debug, Clone)]
pub struct ExportContext {
    pub order_ref: String,
    pub export_number: String,
    pub as_of: NaiveDate, // 出库日期，同时是批次可用性判定日
    pub now: NaiveDateTime,
}

/// 单个批次的分配结果（内部）
#[derive(Debug, Clone)]
struct Allocation {
    ingredient_id: String,
    batch_id: String,
    quantity: f64,
    unit_price: f64,
}

// ==========================================
// DeductionExecutor - 扣减执行器
// ==========================================
#[derive(Debug, Clone, Default)]
pub struct DeductionExecutor {
    ledger: BatchLedger,
}

impl DeductionExecutor {
    pub fn new(ledger: BatchLedger) -> Self {
        Self { ledger }
    }

    /// 生成出库单号: {prefix}-{YYYYMMDD}-{当日流水:04}
    pub fn next_export_number<S: InventoryStore + ?Sized>(
        store: &S,
        prefix: &str,
        export_date: NaiveDate,
    ) -> RepositoryResult<String> {
        let seq = store.count_exports_on(export_date)? + 1;
        Ok(format!("{}-{}-{:04}", prefix, export_date.format("%Y%m%d"), seq))
    }

    /// 执行扣减
    ///
    /// # 返回
    /// - Ok(DeductionReceipt): 出库单、明细、缓存库存变化
    /// - Err(DeductionError::Consistency): 可用批次不足以满足计划（未写任何数据）
    /// - Err(DeductionError::Repository): 落库失败，调用方事务必须回滚
    #[instrument(skip(self, store, plan), fields(
        order_ref = %ctx.order_ref,
        export_number = %ctx.export_number,
        plan_entries = plan.len()
    ))]
    pub fn execute<S: InventoryStore + ?Sized>(
        &self,
        store: &S,
        plan: &[DeductionPlanEntry],
        ctx: &ExportContext,
    ) -> DeductionResult<DeductionReceipt> {
        for entry in plan {
            if !entry.required_quantity.is_finite() || entry.required_quantity <= QUANTITY_EPSILON {
                return Err(DeductionError::InvalidPlan(format!(
                    "ingredient_id={} required_quantity={}",
                    entry.ingredient_id, entry.required_quantity
                )));
            }
        }

        // ===== 阶段 1: 分配（只读） =====
        let allocations = self.allocate(store, plan, ctx.as_of)?;
        let stock_changes = self.project_stock_changes(store, plan)?;

        // ===== 阶段 2: 落库 =====
        let export_id = Uuid::new_v4().to_string();
        let details: Vec<ExportDetail> = allocations
            .into_iter()
            .map(|a| ExportDetail {
                export_id: export_id.clone(),
                line_total: a.quantity * a.unit_price,
                ingredient_id: a.ingredient_id,
                batch_id: a.batch_id,
                quantity: a.quantity,
                unit_price: a.unit_price,
            })
            .collect();
        let total_cost: f64 = details.iter().map(|d| d.line_total).sum();

        let record = ExportRecord {
            export_id,
            export_number: ctx.export_number.clone(),
            export_date: ctx.as_of,
            order_ref: ctx.order_ref.clone(),
            total_cost,
            status: EXPORT_STATUS_COMPLETED.to_string(),
            created_at: ctx.now,
        };

        store.insert_export_record(&record)?;
        for detail in &details {
            store.insert_export_detail(detail)?;
        }
        for change in &stock_changes {
            store.update_ingredient_stock(&change.ingredient_id, change.after, change.status_after, ctx.now)?;
        }

        tracing::info!(
            export_id = %record.export_id,
            total_cost = record.total_cost,
            details = details.len(),
            "扣减已写入台账"
        );

        Ok(DeductionReceipt {
            record,
            details,
            stock_changes,
        })
    }

    /// FIFO 分配；同一计划内多次出现的原料共享批次占用
    fn allocate<S: InventoryStore + ?Sized>(
        &self,
        store: &S,
        plan: &[DeductionPlanEntry],
        as_of: NaiveDate,
    ) -> DeductionResult<Vec<Allocation>> {
        let mut allocations = Vec::new();
        let mut taken: HashMap<String, f64> = HashMap::new();

        for entry in plan {
            let balances = self.ledger.available_batches(store, &entry.ingredient_id, as_of)?;
            let mut still_needed = entry.required_quantity;

            for balance in balances {
                if still_needed <= QUANTITY_EPSILON {
                    break;
                }
                let already = taken.get(&balance.batch.batch_id).copied().unwrap_or(0.0);
                let free = balance.remaining - already;
                if free <= QUANTITY_EPSILON {
                    continue;
                }

                let quantity = free.min(still_needed);
                tracing::debug!(
                    ingredient_id = %entry.ingredient_id,
                    batch_id = %balance.batch.batch_id,
                    quantity,
                    expiry_date = ?balance.batch.expiry_date,
                    "分配批次"
                );

                *taken.entry(balance.batch.batch_id.clone()).or_insert(0.0) += quantity;
                still_needed -= quantity;
                allocations.push(Allocation {
                    ingredient_id: entry.ingredient_id.clone(),
                    batch_id: balance.batch.batch_id,
                    quantity,
                    unit_price: balance.batch.unit_price,
                });
            }

            if still_needed > QUANTITY_EPSILON {
                let allocated = entry.required_quantity - still_needed;
                tracing::error!(
                    ingredient_id = %entry.ingredient_id,
                    required = entry.required_quantity,
                    allocated,
                    "FIFO 分配不足，整单放弃"
                );
                return Err(DeductionError::Consistency {
                    ingredient_id: entry.ingredient_id.clone(),
                    required: entry.required_quantity,
                    allocated,
                });
            }
        }

        Ok(allocations)
    }

    /// 推算每个原料缓存库存的变化（按计划项顺序累减，原料首次出现的顺序输出）
    fn project_stock_changes<S: InventoryStore + ?Sized>(
        &self,
        store: &S,
        plan: &[DeductionPlanEntry],
    ) -> DeductionResult<Vec<StockChange>> {
        let mut changes: Vec<StockChange> = Vec::new();
        let mut minimums: HashMap<String, f64> = HashMap::new();

        for entry in plan {
            let index = match changes.iter().position(|c| c.ingredient_id == entry.ingredient_id) {
                Some(i) => i,
                None => {
                    let ingredient = store
                        .find_ingredient(&entry.ingredient_id)?
                        .ok_or_else(|| DeductionError::IngredientNotFound(entry.ingredient_id.clone()))?;
                    minimums.insert(ingredient.ingredient_id.clone(), ingredient.minimum_quantity);
                    changes.push(StockChange {
                        ingredient_id: ingredient.ingredient_id,
                        before: ingredient.quantity_in_stock,
                        after: ingredient.quantity_in_stock,
                        status_before: ingredient.stock_status,
                        status_after: ingredient.stock_status,
                    });
                    changes.len() - 1
                }
            };

            let change = &mut changes[index];
            let mut after = change.after - entry.required_quantity;
            if after < -QUANTITY_EPSILON {
                tracing::warn!(
                    ingredient_id = %change.ingredient_id,
                    cached = change.after,
                    required = entry.required_quantity,
                    "缓存库存低于台账扣减量，按 0 处理，需对账"
                );
                after = 0.0;
            }
            change.after = after.max(0.0);
            let minimum = minimums.get(&change.ingredient_id).copied().unwrap_or(0.0);
            change.status_after = StockStatus::derive(change.after, minimum);
        }

        Ok(changes)
    }
}
