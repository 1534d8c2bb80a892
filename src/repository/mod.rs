// ==========================================
// 餐厅运营平台 - 数据仓储层
// ==========================================
// 红线: Repository 不含业务逻辑
// ==========================================
// 职责: 提供数据访问接口,屏蔽数据库细节
// 约束: 所有查询使用参数化,防止 SQL 注入
// ==========================================

pub mod batch_repo;
pub mod error;
pub mod export_repo;
pub mod ingredient_repo;
pub mod inventory_store;
pub mod order_line_repo;
pub mod recipe_repo;

// 重导出核心仓储
pub use batch_repo::{BatchRepository, LedgerTotals};
pub use error::{RepositoryError, RepositoryResult};
pub use export_repo::ExportRepository;
pub use ingredient_repo::IngredientRepository;
pub use inventory_store::{InventoryStore, SqliteInventoryStore};
pub use order_line_repo::OrderLineRepository;
pub use recipe_repo::RecipeRepository;
