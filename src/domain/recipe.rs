// ==========================================
// 餐厅运营平台 - 配方与订单领域模型
// ==========================================

use crate::domain::types::OrderLineStatus;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// 配方行：一份菜品所需的某种原料数量
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DishIngredientRequirement {
    pub dish_id: String,
    pub ingredient_id: String,
    pub quantity_required: f64,
    pub unit: String,
}

/// 下单项（菜品 × 份数）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderItem {
    pub dish_id: String,
    pub quantity: u32,
}

impl OrderItem {
    pub fn new(dish_id: impl Into<String>, quantity: u32) -> Self {
        Self {
            dish_id: dish_id.into(),
            quantity,
        }
    }
}

/// 展开后的原料需求（每个下单项独立一组）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngredientRequirement {
    pub ingredient_id: String,
    pub required_quantity: f64,
    pub unit: String,
    pub dish_id: String, // 来源菜品（合并后为以逗号分隔的多个菜品）
}

/// 订单明细
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderLine {
    pub order_line_id: String,
    pub order_id: String,
    pub dish_id: String,
    pub quantity: u32,
    pub status: OrderLineStatus,
    pub export_id: Option<String>, // 扣减后关联的出库单
    pub updated_at: NaiveDateTime,
}
