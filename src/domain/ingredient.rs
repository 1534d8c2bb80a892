// ==========================================
// 餐厅运营平台 - 原料与批次领域模型
// ==========================================
// 红线: 批次数量入库后不可变；剩余量只能由出库台账推导
// ==========================================

use crate::domain::types::StockStatus;
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

// ==========================================
// Ingredient - 原料
// ==========================================
// quantity_in_stock 是缓存（= Σ批次数量 − Σ出库明细数量），以台账为准
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ingredient {
    pub ingredient_id: String,
    pub name: String,
    pub unit: String,
    pub quantity_in_stock: f64,
    pub minimum_quantity: f64,
    pub unit_price: f64,
    pub stock_status: StockStatus,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Ingredient {
    /// 以零库存创建原料（库存只能通过入库批次增加）
    pub fn new(
        ingredient_id: impl Into<String>,
        name: impl Into<String>,
        unit: impl Into<String>,
        minimum_quantity: f64,
        unit_price: f64,
        now: NaiveDateTime,
    ) -> Self {
        Self {
            ingredient_id: ingredient_id.into(),
            name: name.into(),
            unit: unit.into(),
            quantity_in_stock: 0.0,
            minimum_quantity,
            unit_price,
            stock_status: StockStatus::derive(0.0, minimum_quantity),
            created_at: now,
            updated_at: now,
        }
    }
}

// ==========================================
// Batch - 入库批次
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Batch {
    pub batch_id: String,
    pub ingredient_id: String,
    pub quantity: f64,                   // 入库数量（不可变）
    pub unit_price: f64,                 // 入库单价
    pub expiry_date: Option<NaiveDate>,  // 保质期（None = 不过期）
    pub received_at: NaiveDateTime,
}

/// 批次 + 推导出的剩余量
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchBalance {
    pub batch: Batch,
    pub remaining: f64,
}

// ==========================================
// StockReceipt - 入库单（单行）
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockReceipt {
    pub ingredient_id: String,
    pub quantity: f64,
    pub unit_price: f64,
    pub expiry_date: Option<NaiveDate>,
}

// ==========================================
// StockDrift - 缓存与台账的偏差
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockDrift {
    pub ingredient_id: String,
    pub ingredient_name: String,
    pub cached_quantity: f64,
    pub ledger_quantity: f64,
    pub drift: f64,        // cached − ledger
    pub repaired: bool,
}
