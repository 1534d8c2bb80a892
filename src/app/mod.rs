// ==========================================
// 餐厅运营平台 - 应用层
// ==========================================
// 职责: 进程级装配（连接、配置、API、事件发布者）
// ==========================================

pub mod state;

// 重导出
pub use state::{get_default_db_path, AppState};
