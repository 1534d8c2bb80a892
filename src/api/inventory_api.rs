// ==========================================
// 餐厅运营平台 - 库存扣减 API
// ==========================================
// 职责: 下单校验、扣减执行、订单明细开做触发、出库台账查询
// 红线: 校验拒绝时不写任何数据；扣减要么全部落账要么全部回滚
// 红线: 每个订单明细只扣减一次（PENDING → PREPARING 条件更新）
// ==========================================

use std::sync::{Arc, Mutex};

use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::Connection;
use tracing::{info, instrument, warn};

use crate::api::error::{ApiError, ApiResult};
use crate::api::tx;
use crate::config::{ConfigManager, DeductionSettings};
use crate::domain::deduction::{DeductionCheck, DeductionPlanEntry};
use crate::domain::export::{DeductionReceipt, ExportRecord, ExportRecordView};
use crate::domain::ingredient::BatchBalance;
use crate::domain::recipe::OrderItem;
use crate::domain::types::{OrderLineStatus, StockStatus};
use crate::engine::{
    AvailabilityValidator, BatchLedger, DeductionExecutor, DishRequirementResolver, ExportContext,
    OptionalEventPublisher, StockEvent, StockEventType,
};
use crate::repository::export_repo::{self, ExportRepository};
use crate::repository::inventory_store::{InventoryStore, SqliteInventoryStore};
use crate::repository::order_line_repo;

// ==========================================
// InventoryApi - 库存扣减 API
// ==========================================
pub struct InventoryApi {
    conn: Arc<Mutex<Connection>>,
    config: Arc<ConfigManager>,
    export_repo: ExportRepository,
    ledger: BatchLedger,
    events: OptionalEventPublisher,
}

impl InventoryApi {
    /// 创建 InventoryApi
    ///
    /// # 参数
    /// - conn: 业务连接（与仓储共享）
    /// - config: 配置管理器（可与 conn 共享同一把锁）
    pub fn new(conn: Arc<Mutex<Connection>>, config: Arc<ConfigManager>) -> Self {
        Self {
            export_repo: ExportRepository::new(conn.clone()),
            conn,
            config,
            ledger: BatchLedger::new(),
            events: OptionalEventPublisher::none(),
        }
    }

    /// 挂载事件发布者（提交后发布）
    pub fn with_events(mut self, events: OptionalEventPublisher) -> Self {
        self.events = events;
        self
    }

    // ==========================================
    // 校验
    // ==========================================

    /// 校验下单项能否满足（纯读，不写任何数据）
    pub fn validate_and_prepare_deduction(&self, items: &[OrderItem]) -> ApiResult<DeductionCheck> {
        self.validate_and_prepare_deduction_as_of(items, tx::local_now().date())
    }

    #[instrument(skip(self, items), fields(items_count = items.len()))]
    pub fn validate_and_prepare_deduction_as_of(
        &self,
        items: &[OrderItem],
        as_of: NaiveDate,
    ) -> ApiResult<DeductionCheck> {
        validate_items(items)?;
        let settings = tx::load_settings(&self.config)?;

        let mut conn = tx::lock(&self.conn)?;
        let read_tx = tx::begin_read(&mut conn)?;
        let check = {
            let store = SqliteInventoryStore::new(&read_tx);
            self.resolve_and_validate(&store, &settings, items, as_of)?
        };
        read_tx
            .rollback()
            .map_err(|e| ApiError::DatabaseTransactionError(format!("读事务回滚失败: {}", e)))?;

        Ok(check)
    }

    // ==========================================
    // 执行
    // ==========================================

    /// 按已校验的计划执行扣减
    ///
    /// 计划可能已过时（校验后被并发消耗），此时返回 Consistency 且不落任何数据
    pub fn execute_deduction(&self, plan: &[DeductionPlanEntry], order_ref: &str) -> ApiResult<ExportRecord> {
        self.execute_deduction_at(plan, order_ref, tx::local_now())
    }

    #[instrument(skip(self, plan), fields(plan_entries = plan.len()))]
    pub fn execute_deduction_at(
        &self,
        plan: &[DeductionPlanEntry],
        order_ref: &str,
        now: NaiveDateTime,
    ) -> ApiResult<ExportRecord> {
        let order_ref = require_non_blank("order_ref", order_ref)?;
        let settings = tx::load_settings(&self.config)?;

        let receipt = {
            let mut conn = tx::lock(&self.conn)?;
            let write_tx = tx::begin_write(&mut conn)?;
            let receipt = {
                let store = SqliteInventoryStore::new(&write_tx);
                self.execute_plan(&store, &settings, plan, order_ref, now)?
            };
            tx::commit(write_tx)?;
            receipt
        };

        self.publish_deduction_events(&receipt);
        Ok(receipt.record)
    }

    /// 一次完成 展开 → 校验 → 执行（同一个写事务）
    ///
    /// # 返回
    /// - Err(ApiError::InsufficientStock): 全部缺口，未写任何数据
    pub fn deduct_for_items(&self, items: &[OrderItem], order_ref: &str) -> ApiResult<DeductionReceipt> {
        self.deduct_for_items_at(items, order_ref, tx::local_now())
    }

    #[instrument(skip(self, items), fields(items_count = items.len()))]
    pub fn deduct_for_items_at(
        &self,
        items: &[OrderItem],
        order_ref: &str,
        now: NaiveDateTime,
    ) -> ApiResult<DeductionReceipt> {
        validate_items(items)?;
        let order_ref = require_non_blank("order_ref", order_ref)?;
        let settings = tx::load_settings(&self.config)?;

        let receipt = {
            let mut conn = tx::lock(&self.conn)?;
            let write_tx = tx::begin_write(&mut conn)?;
            let receipt = {
                let store = SqliteInventoryStore::new(&write_tx);
                let check = self.resolve_and_validate(&store, &settings, items, now.date())?;
                if !check.is_valid {
                    warn!(order_ref, shortfalls = check.shortfalls.len(), "库存不足，拒绝扣减");
                    return Err(ApiError::InsufficientStock {
                        shortfalls: check.shortfalls,
                    });
                }
                self.execute_plan(&store, &settings, &check.plan, order_ref, now)?
            };
            tx::commit(write_tx)?;
            receipt
        };

        self.publish_deduction_events(&receipt);
        Ok(receipt)
    }

    /// 订单明细开做：PENDING → PREPARING，并且只扣减一次
    ///
    /// # 返回
    /// - PENDING: 扣减并返回新出库单
    /// - PREPARING 且已关联出库单: 直接返回已有出库单（重试安全）
    /// - 其他状态: InvalidStateTransition
    pub fn start_preparing_order_line(&self, order_line_id: &str) -> ApiResult<ExportRecord> {
        self.start_preparing_order_line_at(order_line_id, tx::local_now())
    }

    #[instrument(skip(self))]
    pub fn start_preparing_order_line_at(
        &self,
        order_line_id: &str,
        now: NaiveDateTime,
    ) -> ApiResult<ExportRecord> {
        let order_line_id = require_non_blank("order_line_id", order_line_id)?;
        let settings = tx::load_settings(&self.config)?;

        let receipt = {
            let mut conn = tx::lock(&self.conn)?;
            let write_tx = tx::begin_write(&mut conn)?;

            let line = order_line_repo::select_order_line(&write_tx, order_line_id)?
                .ok_or_else(|| ApiError::NotFound(format!("订单明细(id={})不存在", order_line_id)))?;

            match (line.status, line.export_id.as_deref()) {
                (OrderLineStatus::Pending, _) => {}
                (OrderLineStatus::Preparing, Some(export_id)) => {
                    info!(order_line_id, export_id, "订单明细已开做，返回已有出库单");
                    let view = export_repo::select_view(&write_tx, export_id)?.ok_or_else(|| {
                        ApiError::InternalError(format!(
                            "订单明细 {} 关联的出库单 {} 不存在",
                            order_line_id, export_id
                        ))
                    })?;
                    return Ok(view.record);
                }
                (status, _) => {
                    return Err(ApiError::InvalidStateTransition {
                        from: status.to_string(),
                        to: OrderLineStatus::Preparing.to_string(),
                    });
                }
            }

            let receipt = {
                let store = SqliteInventoryStore::new(&write_tx);
                let items = [OrderItem::new(line.dish_id.clone(), line.quantity)];
                let check = self.resolve_and_validate(&store, &settings, &items, now.date())?;
                if !check.is_valid {
                    warn!(order_line_id, shortfalls = check.shortfalls.len(), "库存不足，订单明细保持 PENDING");
                    return Err(ApiError::InsufficientStock {
                        shortfalls: check.shortfalls,
                    });
                }
                self.execute_plan(&store, &settings, &check.plan, order_line_id, now)?
            };

            let affected =
                order_line_repo::mark_preparing(&write_tx, order_line_id, &receipt.record.export_id, now)?;
            if affected != 1 {
                return Err(ApiError::InvalidStateTransition {
                    from: line.status.to_string(),
                    to: OrderLineStatus::Preparing.to_string(),
                });
            }

            tx::commit(write_tx)?;
            receipt
        };

        info!(
            order_line_id,
            export_number = %receipt.record.export_number,
            "订单明细已开做"
        );
        self.publish_deduction_events(&receipt);
        Ok(receipt.record)
    }

    // ==========================================
    // 查询
    // ==========================================

    /// 出库单 + 明细
    pub fn get_export(&self, export_id: &str) -> ApiResult<ExportRecordView> {
        self.export_repo
            .find_view_by_id(export_id)?
            .ok_or_else(|| ApiError::NotFound(format!("出库单(id={})不存在", export_id)))
    }

    pub fn list_exports_by_order_ref(&self, order_ref: &str) -> ApiResult<Vec<ExportRecord>> {
        Ok(self.export_repo.list_by_order_ref(order_ref)?)
    }

    /// 批次剩余量（批次不存在返回 0）
    pub fn batch_remaining(&self, batch_id: &str) -> ApiResult<f64> {
        let conn = tx::lock(&self.conn)?;
        let store = SqliteInventoryStore::new(&conn);
        Ok(self.ledger.remaining(&store, batch_id)?)
    }

    /// 某原料今日可用批次（FIFO 顺序）
    pub fn available_batches(&self, ingredient_id: &str) -> ApiResult<Vec<BatchBalance>> {
        self.available_batches_as_of(ingredient_id, tx::local_now().date())
    }

    pub fn available_batches_as_of(&self, ingredient_id: &str, as_of: NaiveDate) -> ApiResult<Vec<BatchBalance>> {
        let conn = tx::lock(&self.conn)?;
        let store = SqliteInventoryStore::new(&conn);
        Ok(self.ledger.available_batches(&store, ingredient_id, as_of)?)
    }

    // ==========================================
    // 内部流程
    // ==========================================

    fn resolve_and_validate<S: InventoryStore + ?Sized>(
        &self,
        store: &S,
        settings: &DeductionSettings,
        items: &[OrderItem],
        as_of: NaiveDate,
    ) -> ApiResult<DeductionCheck> {
        let resolver = DishRequirementResolver::new(settings.merge_duplicate_requirements);
        let requirements = resolver.resolve(store, items)?;
        let validator = AvailabilityValidator::new(self.ledger);
        Ok(validator.validate(store, &requirements, as_of)?)
    }

    fn execute_plan<S: InventoryStore + ?Sized>(
        &self,
        store: &S,
        settings: &DeductionSettings,
        plan: &[DeductionPlanEntry],
        order_ref: &str,
        now: NaiveDateTime,
    ) -> ApiResult<DeductionReceipt> {
        let export_date = now.date();
        let export_number =
            DeductionExecutor::next_export_number(store, &settings.export_number_prefix, export_date)?;
        let ctx = ExportContext {
            order_ref: order_ref.to_string(),
            export_number,
            as_of: export_date,
            now,
        };
        Ok(DeductionExecutor::new(self.ledger).execute(store, plan, &ctx)?)
    }

    /// 提交后发布事件：扣减 + 状态跌入低库存/缺货
    fn publish_deduction_events(&self, receipt: &DeductionReceipt) {
        let reference = Some(receipt.record.export_number.clone());
        let ingredient_ids = receipt
            .stock_changes
            .iter()
            .map(|c| c.ingredient_id.clone())
            .collect();
        self.events.publish(
            StockEvent::new(StockEventType::StockDeducted, ingredient_ids, reference.clone())
                .with_source("InventoryApi"),
        );

        for change in &receipt.stock_changes {
            if change.status_after == change.status_before {
                continue;
            }
            let event_type = match change.status_after {
                StockStatus::LowStock => StockEventType::LowStock,
                StockStatus::OutOfStock => StockEventType::OutOfStock,
                StockStatus::Available => continue,
            };
            self.events.publish(
                StockEvent::new(event_type, vec![change.ingredient_id.clone()], reference.clone())
                    .with_source("InventoryApi"),
            );
        }
    }
}

// ==========================================
// 入参校验
// ==========================================

fn validate_items(items: &[OrderItem]) -> ApiResult<()> {
    if items.is_empty() {
        return Err(ApiError::InvalidInput("下单项不能为空".to_string()));
    }
    for (idx, item) in items.iter().enumerate() {
        if item.dish_id.trim().is_empty() {
            return Err(ApiError::InvalidInput(format!("第 {} 个下单项 dish_id 为空", idx + 1)));
        }
        if item.quantity == 0 {
            return Err(ApiError::InvalidInput(format!(
                "第 {} 个下单项({}) 份数必须大于 0",
                idx + 1,
                item.dish_id
            )));
        }
    }
    Ok(())
}

fn require_non_blank<'a>(field: &str, value: &'a str) -> ApiResult<&'a str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ApiError::InvalidInput(format!("{} 不能为空", field)));
    }
    Ok(trimmed)
}
