// ==========================================
// 餐厅运营平台 - 引擎层
// ==========================================
// 职责: 实现库存扣减业务规则，不拼 SQL
// 红线: Engine 只依赖 InventoryStore trait，事务边界由 API 层掌握
// ==========================================

pub mod availability_validator;
pub mod batch_ledger;
pub mod deduction_executor;
pub mod error;
pub mod events;
pub mod requirement_resolver;
pub mod stock_reconciler;

#[cfg(test)]
pub(crate) mod test_support;

// 重导出核心引擎
pub use availability_validator::AvailabilityValidator;
pub use batch_ledger::BatchLedger;
pub use deduction_executor::{DeductionExecutor, ExportContext};
pub use error::{DeductionError, DeductionResult};
pub use events::{
    CollectingEventPublisher, NoOpEventPublisher, OptionalEventPublisher, StockEvent,
    StockEventPublisher, StockEventType,
};
pub use requirement_resolver::DishRequirementResolver;
pub use stock_reconciler::StockReconciler;
