// ==========================================
// 餐厅运营平台 - 引擎层错误类型
// ==========================================

use crate::repository::error::RepositoryError;
use thiserror::Error;

/// 扣减执行错误
#[derive(Error, Debug)]
pub enum DeductionError {
    /// 校验通过但 FIFO 分配无法满足（校验与执行之间被并发消耗）
    ///
    /// 致命：整个扣减必须回滚
    #[error("库存一致性错误: ingredient_id={ingredient_id}, 需要 {required}, 仅能分配 {allocated}")]
    Consistency {
        ingredient_id: String,
        required: f64,
        allocated: f64,
    },

    #[error("原料不存在: {0}")]
    IngredientNotFound(String),

    #[error("扣减计划无效: {0}")]
    InvalidPlan(String),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

pub type DeductionResult<T> = Result<T, DeductionError>;
