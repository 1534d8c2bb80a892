// ==========================================
// 餐厅运营平台 - 库存扣减核心库
// ==========================================
// 技术栈: Rust + SQLite
// 系统定位: 订单驱动的批次库存扣减（FIFO 按到期日）
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 数据访问
pub mod repository;

// 引擎层 - 业务规则
pub mod engine;

// 导入层 - 入库单
pub mod importer;

// 配置层 - 系统配置
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一/建表）
pub mod db;

// 日志系统
pub mod logging;

// API 层 - 业务接口
pub mod api;

// 应用层 - 进程级装配
pub mod app;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{OrderLineStatus, StockStatus};

// 领域实体
pub use domain::{
    Batch, BatchBalance, DeductionCheck, DeductionPlanEntry, DeductionReceipt, ExportDetail,
    ExportRecord, ExportRecordView, Ingredient, IngredientRequirement, OrderItem, OrderLine,
    Shortfall, StockDrift, StockReceipt,
};

// 引擎
pub use engine::{
    AvailabilityValidator, BatchLedger, DeductionExecutor, DishRequirementResolver,
    StockReconciler,
};

// API
pub use api::{ApiError, ApiResult, InventoryApi, StockApi};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "餐厅运营平台-库存扣减";

// 数据库版本
pub const DB_VERSION: &str = "v1";
