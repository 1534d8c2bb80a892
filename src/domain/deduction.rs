// ==========================================
// 餐厅运营平台 - 扣减校验结果模型
// ==========================================
// 红线: 校验必须列出全部缺口，不得只报第一个
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

/// 缺口原因
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ShortfallReason {
    InsufficientStock,  // 缓存库存或可用批次不足
    IngredientNotFound, // 配方引用了不存在的原料
}

impl fmt::Display for ShortfallReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShortfallReason::InsufficientStock => write!(f, "INSUFFICIENT_STOCK"),
            ShortfallReason::IngredientNotFound => write!(f, "INGREDIENT_NOT_FOUND"),
        }
    }
}

/// 单个原料的缺口
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Shortfall {
    pub ingredient_id: String,
    pub ingredient_name: String,
    pub required: f64,
    pub available: f64,
    pub unit: String,
    pub reason: ShortfallReason,
}

impl fmt::Display for Shortfall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}({}): 需要 {} {}，可用 {} {} [{}]",
            self.ingredient_name,
            self.ingredient_id,
            self.required,
            self.unit,
            self.available,
            self.unit,
            self.reason
        )
    }
}

/// 扣减计划项：只记录需求量，批次分配推迟到执行阶段
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeductionPlanEntry {
    pub ingredient_id: String,
    pub ingredient_name: String,
    pub required_quantity: f64,
    pub unit: String,
}

/// 校验结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeductionCheck {
    pub is_valid: bool,
    pub shortfalls: Vec<Shortfall>,
    pub plan: Vec<DeductionPlanEntry>,
}

impl DeductionCheck {
    /// 全部需求的合计（按原料），便于上层展示
    pub fn total_required_for(&self, ingredient_id: &str) -> f64 {
        self.plan
            .iter()
            .filter(|e| e.ingredient_id == ingredient_id)
            .map(|e| e.required_quantity)
            .sum()
    }
}
