// ==========================================
// 餐厅运营平台 - 批次台账引擎
// ==========================================
// 红线: 批次剩余量永远由台账推导（入库数量 − Σ出库明细），从不落库
// ==========================================
// 职责: 计算批次剩余量；给出 FIFO（最早到期优先）可用批次序列
// 可用条件: expiry_date 为空 或 expiry_date >= as_of（当日到期仍可用）
// 排序: expiry_date 升序，空值排最后，同日按 batch_id 升序
// ==========================================

use crate::domain::ingredient::{Batch, BatchBalance};
use crate::domain::types::QUANTITY_EPSILON;
use crate::repository::error::RepositoryResult;
use crate::repository::inventory_store::InventoryStore;
use chrono::NaiveDate;
use std::cmp::Ordering;
use tracing::instrument;

// ==========================================
// BatchLedger - 批次台账
// ==========================================
#[derive(Debug, Clone, Copy, Default)]
pub struct BatchLedger;

impl BatchLedger {
    pub fn new() -> Self {
        Self
    }

    /// 批次在 as_of 当天是否可分配
    pub fn is_eligible(batch: &Batch, as_of: NaiveDate) -> bool {
        match batch.expiry_date {
            None => true,
            Some(expiry) => expiry >= as_of,
        }
    }

    /// FIFO 排序规则
    pub fn fifo_order(a: &Batch, b: &Batch) -> Ordering {
        let by_expiry = match (a.expiry_date, b.expiry_date) {
            (Some(x), Some(y)) => x.cmp(&y),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        };
        by_expiry.then_with(|| a.batch_id.cmp(&b.batch_id))
    }

    /// 计算批次剩余量
    ///
    /// # 返回
    /// - 批次不存在时返回 0（软失败，不报错）
    #[instrument(skip(self, store))]
    pub fn remaining<S: InventoryStore + ?Sized>(
        &self,
        store: &S,
        batch_id: &str,
    ) -> RepositoryResult<f64> {
        let batch = match store.find_batch(batch_id)? {
            Some(b) => b,
            None => {
                tracing::debug!(batch_id, "批次不存在，剩余量按 0 处理");
                return Ok(0.0);
            }
        };

        let exported = store.exported_quantity_for_batch(batch_id)?;
        Ok(net_remaining(&batch, exported))
    }

    /// 查询某原料在 as_of 当天可分配的批次（FIFO 顺序，剩余量 > 0）
    #[instrument(skip(self, store))]
    pub fn available_batches<S: InventoryStore + ?Sized>(
        &self,
        store: &S,
        ingredient_id: &str,
        as_of: NaiveDate,
    ) -> RepositoryResult<Vec<BatchBalance>> {
        let mut balances: Vec<BatchBalance> = store
            .list_batch_balances(ingredient_id)?
            .into_iter()
            .filter(|(batch, _)| Self::is_eligible(batch, as_of))
            .map(|(batch, exported)| {
                let remaining = net_remaining(&batch, exported);
                BatchBalance { batch, remaining }
            })
            .filter(|b| b.remaining > QUANTITY_EPSILON)
            .collect();

        balances.sort_by(|a, b| Self::fifo_order(&a.batch, &b.batch));

        tracing::debug!(
            ingredient_id,
            batch_count = balances.len(),
            total = Self::total_remaining(&balances),
            "可用批次"
        );
        Ok(balances)
    }

    /// 可用批次剩余量合计
    pub fn total_remaining(balances: &[BatchBalance]) -> f64 {
        balances.iter().map(|b| b.remaining).sum()
    }
}

/// 入库数量 − 累计出库；出现负数说明台账已超卖，记错误日志并按 0 处理
fn net_remaining(batch: &Batch, exported: f64) -> f64 {
    let remaining = batch.quantity - exported;
    if remaining < -QUANTITY_EPSILON {
        tracing::error!(
            batch_id = %batch.batch_id,
            quantity = batch.quantity,
            exported,
            "批次出库量超过入库量（台账不变量被破坏）"
        );
        return 0.0;
    }
    remaining.max(0.0)
}
