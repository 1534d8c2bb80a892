// ==========================================
// 餐厅运营平台 - API 层
// ==========================================
// 职责: 服务边界，掌握事务、入参校验、错误映射、事件发布
// ==========================================

pub mod error;
pub mod inventory_api;
pub mod stock_api;
mod tx;

// 重导出核心类型
pub use error::{ApiError, ApiResult};
pub use inventory_api::InventoryApi;
pub use stock_api::StockApi;
