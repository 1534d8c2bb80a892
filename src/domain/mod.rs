// ==========================================
// 餐厅运营平台 - 领域模型层
// ==========================================
// 职责: 定义领域实体、类型
// 红线: 不含数据访问逻辑,不含引擎逻辑
// ==========================================

pub mod deduction;
pub mod export;
pub mod ingredient;
pub mod recipe;
pub mod types;

// 重导出核心类型
pub use deduction::{DeductionCheck, DeductionPlanEntry, Shortfall, ShortfallReason};
pub use export::{DeductionReceipt, ExportDetail, ExportRecord, ExportRecordView, StockChange};
pub use ingredient::{Batch, BatchBalance, Ingredient, StockDrift, StockReceipt};
pub use recipe::{DishIngredientRequirement, IngredientRequirement, OrderItem, OrderLine};
pub use types::{OrderLineStatus, StockStatus, EXPORT_STATUS_COMPLETED, QUANTITY_EPSILON};
