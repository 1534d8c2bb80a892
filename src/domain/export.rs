// ==========================================
// 餐厅运营平台 - 出库台账领域模型
// ==========================================
// 红线: 出库单/出库明细只追加，写入后不再修改
// 用途: 审计追踪，按时点重算批次剩余量
// ==========================================

use crate::domain::types::StockStatus;
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

// ==========================================
// ExportRecord - 出库单（每次扣减一张）
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportRecord {
    pub export_id: String,
    pub export_number: String,   // PX-20241210-0001
    pub export_date: NaiveDate,
    pub order_ref: String,       // 订单/订单明细引用
    pub total_cost: f64,         // = Σ ExportDetail.line_total
    pub status: String,
    pub created_at: NaiveDateTime,
}

// ==========================================
// ExportDetail - 出库明细（每个 出库单×批次 一行）
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportDetail {
    pub export_id: String,
    pub ingredient_id: String,
    pub batch_id: String,
    pub quantity: f64,
    pub unit_price: f64,
    pub line_total: f64,
}

/// 出库单 + 明细（查询视图）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportRecordView {
    pub record: ExportRecord,
    pub details: Vec<ExportDetail>,
}

// ==========================================
// StockChange - 单个原料缓存库存的变化
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockChange {
    pub ingredient_id: String,
    pub before: f64,
    pub after: f64,
    pub status_before: StockStatus,
    pub status_after: StockStatus,
}

// ==========================================
// DeductionReceipt - 一次扣减的审计回执
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeductionReceipt {
    pub record: ExportRecord,
    pub details: Vec<ExportDetail>,
    pub stock_changes: Vec<StockChange>,
}
