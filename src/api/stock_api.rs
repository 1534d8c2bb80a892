// ==========================================
// 餐厅运营平台 - 入库与对账 API
// ==========================================
// 职责: 批次入库（唯一的批次创建入口）、入库单 CSV 导入、
//       缓存库存对账、低库存与临期查询
// 红线: 批次一经入库数量不可变；导入整批成功或整批失败
// ==========================================

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use chrono::{Duration, NaiveDate, NaiveDateTime};
use rusqlite::Connection;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::api::error::{ApiError, ApiResult};
use crate::api::tx;
use crate::config::ConfigManager;
use crate::domain::ingredient::{Batch, BatchBalance, Ingredient, StockDrift, StockReceipt};
use crate::domain::types::StockStatus;
use crate::engine::{BatchLedger, OptionalEventPublisher, StockEvent, StockEventType, StockReconciler};
use crate::importer::{ReceiptCsvImporter, ReceiptImportReport, RowViolation};
use crate::repository::inventory_store::{InventoryStore, SqliteInventoryStore};
use crate::repository::{batch_repo, ingredient_repo, IngredientRepository};

// ==========================================
// StockApi - 入库与对账 API
// ==========================================
pub struct StockApi {
    conn: Arc<Mutex<Connection>>,
    config: Arc<ConfigManager>,
    ingredient_repo: IngredientRepository,
    importer: ReceiptCsvImporter,
    events: OptionalEventPublisher,
}

impl StockApi {
    pub fn new(conn: Arc<Mutex<Connection>>, config: Arc<ConfigManager>) -> Self {
        Self {
            ingredient_repo: IngredientRepository::new(conn.clone()),
            conn,
            config,
            importer: ReceiptCsvImporter::new(),
            events: OptionalEventPublisher::none(),
        }
    }

    pub fn with_events(mut self, events: OptionalEventPublisher) -> Self {
        self.events = events;
        self
    }

    // ==========================================
    // 入库
    // ==========================================

    /// 单批次入库：写批次 + 增加原料缓存库存（同一事务）
    pub fn receive_batch(&self, receipt: &StockReceipt) -> ApiResult<Batch> {
        self.receive_batch_at(receipt, tx::local_now())
    }

    #[instrument(skip(self, receipt), fields(ingredient_id = %receipt.ingredient_id, quantity = receipt.quantity))]
    pub fn receive_batch_at(&self, receipt: &StockReceipt, now: NaiveDateTime) -> ApiResult<Batch> {
        validate_receipt(receipt)?;

        let batch = {
            let mut conn = tx::lock(&self.conn)?;
            let write_tx = tx::begin_write(&mut conn)?;
            let batch = receive_in_tx(&write_tx, receipt, now)?;
            tx::commit(write_tx)?;
            batch
        };

        info!(batch_id = %batch.batch_id, "批次已入库");
        self.events.publish(
            StockEvent::new(
                StockEventType::StockReceived,
                vec![batch.ingredient_id.clone()],
                Some(batch.batch_id.clone()),
            )
            .with_source("StockApi"),
        );
        Ok(batch)
    }

    /// 导入入库单 CSV
    ///
    /// # 返回
    /// - Err(ApiError::ImportValidationFailed): 任一行有错（含原料不存在），全部行错误一并返回，未写入
    /// - Ok(ReceiptImportReport): 全部行已在一个事务内入库
    pub fn import_receipts_csv(&self, file_path: &Path) -> ApiResult<ReceiptImportReport> {
        self.import_receipts_csv_at(file_path, tx::local_now())
    }

    #[instrument(skip(self), fields(file = %file_path.display()))]
    pub fn import_receipts_csv_at(&self, file_path: &Path, now: NaiveDateTime) -> ApiResult<ReceiptImportReport> {
        let started = Instant::now();
        let parsed = self.importer.parse_file(file_path)?;
        if !parsed.is_clean() {
            warn!(violations = parsed.violations.len(), "入库单存在行级错误，整批拒绝");
            return Err(ApiError::ImportValidationFailed {
                violations: parsed.violations,
            });
        }
        if parsed.receipts.is_empty() {
            return Err(ApiError::InvalidInput("入库单没有数据行".to_string()));
        }

        let batches = {
            let mut conn = tx::lock(&self.conn)?;
            let write_tx = tx::begin_write(&mut conn)?;

            let mut violations = Vec::new();
            for row in &parsed.receipts {
                if ingredient_repo::select_ingredient(&write_tx, &row.receipt.ingredient_id)?.is_none() {
                    violations.push(RowViolation::new(
                        row.row_number,
                        "ingredient_id",
                        format!("原料不存在: {}", row.receipt.ingredient_id),
                    ));
                }
            }
            if !violations.is_empty() {
                warn!(violations = violations.len(), "入库单引用了不存在的原料，整批拒绝");
                return Err(ApiError::ImportValidationFailed { violations });
            }

            let mut batches = Vec::with_capacity(parsed.receipts.len());
            for row in &parsed.receipts {
                batches.push(receive_in_tx(&write_tx, &row.receipt, now)?);
            }
            tx::commit(write_tx)?;
            batches
        };

        let mut total_quantity_by_ingredient: HashMap<String, f64> = HashMap::new();
        for batch in &batches {
            *total_quantity_by_ingredient
                .entry(batch.ingredient_id.clone())
                .or_insert(0.0) += batch.quantity;
        }

        let report = ReceiptImportReport {
            import_id: Uuid::new_v4().to_string(),
            file_name: file_path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default(),
            total_rows: parsed.total_rows,
            batches,
            total_quantity_by_ingredient,
            elapsed_ms: started.elapsed().as_millis() as u64,
        };

        info!(
            import_id = %report.import_id,
            batches = report.batches.len(),
            elapsed_ms = report.elapsed_ms,
            "入库单导入完成"
        );
        let mut ingredient_ids: Vec<String> = report.total_quantity_by_ingredient.keys().cloned().collect();
        ingredient_ids.sort();
        self.events.publish(
            StockEvent::new(StockEventType::StockReceived, ingredient_ids, Some(report.import_id.clone()))
                .with_source("StockApi::import_receipts_csv"),
        );

        Ok(report)
    }

    // ==========================================
    // 对账
    // ==========================================

    /// 缓存库存对账；apply=true 时按台账修正
    pub fn reconcile_stock(&self, apply: bool) -> ApiResult<Vec<StockDrift>> {
        self.reconcile_stock_at(apply, tx::local_now())
    }

    #[instrument(skip(self))]
    pub fn reconcile_stock_at(&self, apply: bool, now: NaiveDateTime) -> ApiResult<Vec<StockDrift>> {
        let drifts = {
            let mut conn = tx::lock(&self.conn)?;
            let txn = if apply {
                tx::begin_write(&mut conn)?
            } else {
                tx::begin_read(&mut conn)?
            };
            let drifts = {
                let store = SqliteInventoryStore::new(&txn);
                StockReconciler::new().reconcile(&store, apply, now)?
            };
            tx::commit(txn)?;
            drifts
        };

        if apply && !drifts.is_empty() {
            self.events.publish(
                StockEvent::new(
                    StockEventType::StockReconciled,
                    drifts.iter().map(|d| d.ingredient_id.clone()).collect(),
                    None,
                )
                .with_source("StockApi"),
            );
        }
        Ok(drifts)
    }

    // ==========================================
    // 查询
    // ==========================================

    /// 全部原料（按 ingredient_id 排序）
    pub fn list_ingredients(&self) -> ApiResult<Vec<Ingredient>> {
        Ok(self.ingredient_repo.list_all()?)
    }

    /// 低库存与缺货原料
    pub fn list_low_stock(&self) -> ApiResult<Vec<Ingredient>> {
        Ok(self
            .ingredient_repo
            .list_by_status(&[StockStatus::LowStock, StockStatus::OutOfStock])?)
    }

    /// 临期批次（今天起 within_days 天内到期、仍有剩余）；None 取配置默认窗口
    pub fn expiring_batches(&self, within_days: Option<u32>) -> ApiResult<Vec<BatchBalance>> {
        self.expiring_batches_as_of(within_days, tx::local_now().date())
    }

    pub fn expiring_batches_as_of(&self, within_days: Option<u32>, as_of: NaiveDate) -> ApiResult<Vec<BatchBalance>> {
        let days = match within_days {
            Some(d) => d,
            None => tx::load_settings(&self.config)?.expiry_warning_days,
        };
        let horizon = as_of + Duration::days(i64::from(days));

        let conn = tx::lock(&self.conn)?;
        let store = SqliteInventoryStore::new(&conn);
        let ledger = BatchLedger::new();

        let mut expiring = Vec::new();
        for ingredient in store.list_ingredients()? {
            for balance in ledger.available_batches(&store, &ingredient.ingredient_id, as_of)? {
                if matches!(balance.batch.expiry_date, Some(expiry) if expiry <= horizon) {
                    expiring.push(balance);
                }
            }
        }
        expiring.sort_by(|a, b| BatchLedger::fifo_order(&a.batch, &b.batch));
        Ok(expiring)
    }
}

// ==========================================
// 内部函数
// ==========================================

fn validate_receipt(receipt: &StockReceipt) -> ApiResult<()> {
    if receipt.ingredient_id.trim().is_empty() {
        return Err(ApiError::InvalidInput("ingredient_id 不能为空".to_string()));
    }
    if !receipt.quantity.is_finite() || receipt.quantity <= 0.0 {
        return Err(ApiError::InvalidInput(format!("入库数量必须大于 0: {}", receipt.quantity)));
    }
    if !receipt.unit_price.is_finite() || receipt.unit_price < 0.0 {
        return Err(ApiError::InvalidInput(format!("入库单价不能为负: {}", receipt.unit_price)));
    }
    Ok(())
}

/// 在调用方事务内入库一行：写批次 + 缓存库存递增 + 重算状态
fn receive_in_tx(conn: &Connection, receipt: &StockReceipt, now: NaiveDateTime) -> ApiResult<Batch> {
    let ingredient = ingredient_repo::select_ingredient(conn, &receipt.ingredient_id)?
        .ok_or_else(|| ApiError::NotFound(format!("原料(id={})不存在", receipt.ingredient_id)))?;

    if let Some(expiry) = receipt.expiry_date {
        if expiry < now.date() {
            warn!(ingredient_id = %receipt.ingredient_id, %expiry, "入库批次已过期，将不会被分配");
        }
    }

    let batch = Batch {
        batch_id: Uuid::new_v4().to_string(),
        ingredient_id: ingredient.ingredient_id.clone(),
        quantity: receipt.quantity,
        unit_price: receipt.unit_price,
        expiry_date: receipt.expiry_date,
        received_at: now,
    };
    batch_repo::insert_batch(conn, &batch)?;

    let stock = ingredient.quantity_in_stock + receipt.quantity;
    let status = StockStatus::derive(stock, ingredient.minimum_quantity);
    ingredient_repo::update_stock(conn, &ingredient.ingredient_id, stock, status, now)?;

    Ok(batch)
}
