// ==========================================
// 餐厅运营平台 - 应用状态
// ==========================================
// 职责: 管理进程级共享连接与 API 实例
// ==========================================

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use crate::api::{InventoryApi, StockApi};
use crate::config::ConfigManager;
use crate::db::{init_schema, open_sqlite_connection, read_schema_version, CURRENT_SCHEMA_VERSION};
use crate::engine::{OptionalEventPublisher, StockEventPublisher};

/// 数据库路径环境变量
pub const DB_PATH_ENV: &str = "RESTAURANT_INVENTORY_DB_PATH";

/// 应用状态
///
/// 所有 API 共享同一个 `Arc<Mutex<Connection>>`
pub struct AppState {
    pub db_path: String,
    pub config_manager: Arc<ConfigManager>,
    pub inventory_api: Arc<InventoryApi>,
    pub stock_api: Arc<StockApi>,
}

impl AppState {
    /// 打开（必要时创建）数据库并初始化全部 API
    ///
    /// # 返回
    /// - Err(String): 打开数据库、建表或读取配置失败
    pub fn new(db_path: String) -> Result<Self, String> {
        Self::with_publisher(db_path, None)
    }

    pub fn with_publisher(
        db_path: String,
        publisher: Option<Arc<dyn StockEventPublisher>>,
    ) -> Result<Self, String> {
        tracing::info!("初始化AppState，数据库路径: {}", db_path);

        let conn = open_sqlite_connection(&db_path).map_err(|e| format!("无法打开数据库: {}", e))?;
        init_schema(&conn).map_err(|e| format!("数据库建表失败: {}", e))?;
        match read_schema_version(&conn) {
            Ok(Some(v)) if v == CURRENT_SCHEMA_VERSION => {}
            Ok(other) => tracing::warn!(
                found = ?other,
                expected = CURRENT_SCHEMA_VERSION,
                "schema_version 与代码期望不一致"
            ),
            Err(e) => return Err(format!("读取 schema_version 失败: {}", e)),
        }
        let conn = Arc::new(Mutex::new(conn));

        let config_manager = Arc::new(
            ConfigManager::from_connection(conn.clone()).map_err(|e| format!("无法初始化ConfigManager: {}", e))?,
        );

        let events = match publisher {
            Some(p) => OptionalEventPublisher::with_publisher(p),
            None => OptionalEventPublisher::none(),
        };

        let inventory_api =
            Arc::new(InventoryApi::new(conn.clone(), config_manager.clone()).with_events(events.clone()));
        let stock_api = Arc::new(StockApi::new(conn, config_manager.clone()).with_events(events));

        tracing::info!("AppState初始化完成");
        Ok(Self {
            db_path,
            config_manager,
            inventory_api,
            stock_api,
        })
    }
}

/// 默认数据库路径
///
/// 优先级: 环境变量 > 用户数据目录 > 当前目录
pub fn get_default_db_path() -> String {
    if let Ok(path) = std::env::var(DB_PATH_ENV) {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    let mut path = PathBuf::from("./restaurant_inventory.db");

    if let Some(data_dir) = dirs::data_dir() {
        let dir = data_dir.join("restaurant-inventory");
        // 目录创建失败时回退到当前目录
        if std::fs::create_dir_all(&dir).is_ok() {
            path = dir.join("restaurant_inventory.db");
        }
    }

    path.to_string_lossy().to_string()
}
