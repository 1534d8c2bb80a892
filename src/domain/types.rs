// ==========================================
// 餐厅运营平台 - 领域类型定义
// ==========================================
// 序列化格式: SCREAMING_SNAKE_CASE (与数据库一致)
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 数量比较容差（原料数量、金额均以 f64 表示）
pub const QUANTITY_EPSILON: f64 = 1e-9;

/// 出库单状态：已完成（台账只追加，写入即定稿）
pub const EXPORT_STATUS_COMPLETED: &str = "COMPLETED";

// ==========================================
// 库存状态 (Stock Status)
// ==========================================
// 由 quantity_in_stock 与 minimum_quantity 派生，不允许人工设置
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StockStatus {
    Available,  // 充足
    LowStock,   // 低于安全库存
    OutOfStock, // 缺货
}

impl StockStatus {
    /// 根据当前库存与最低库存派生状态
    ///
    /// - 库存 <= 0 → OUT_OF_STOCK
    /// - 库存 <= 最低库存 → LOW_STOCK
    /// - 其余 → AVAILABLE
    pub fn derive(quantity_in_stock: f64, minimum_quantity: f64) -> Self {
        if quantity_in_stock <= QUANTITY_EPSILON {
            StockStatus::OutOfStock
        } else if quantity_in_stock <= minimum_quantity + QUANTITY_EPSILON {
            StockStatus::LowStock
        } else {
            StockStatus::Available
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StockStatus::Available => "AVAILABLE",
            StockStatus::LowStock => "LOW_STOCK",
            StockStatus::OutOfStock => "OUT_OF_STOCK",
        }
    }
}

impl fmt::Display for StockStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StockStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "AVAILABLE" => Ok(StockStatus::Available),
            "LOW_STOCK" => Ok(StockStatus::LowStock),
            "OUT_OF_STOCK" => Ok(StockStatus::OutOfStock),
            other => Err(format!("未知库存状态: {}", other)),
        }
    }
}

// ==========================================
// 订单明细状态 (Order Line Status)
// ==========================================
// 扣减只在 PENDING → PREPARING 这一次状态迁移时触发
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderLineStatus {
    Pending,   // 待制作
    Preparing, // 制作中（已扣减）
    Served,    // 已上菜
    Cancelled, // 已取消
}

impl OrderLineStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderLineStatus::Pending => "PENDING",
            OrderLineStatus::Preparing => "PREPARING",
            OrderLineStatus::Served => "SERVED",
            OrderLineStatus::Cancelled => "CANCELLED",
        }
    }
}

impl fmt::Display for OrderLineStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderLineStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(OrderLineStatus::Pending),
            "PREPARING" => Ok(OrderLineStatus::Preparing),
            "SERVED" => Ok(OrderLineStatus::Served),
            "CANCELLED" => Ok(OrderLineStatus::Cancelled),
            other => Err(format!("未知订单明细状态: {}", other)),
        }
    }
}
