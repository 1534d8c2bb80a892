// ==========================================
// 餐厅运营平台 - 配置管理器
// ==========================================
// 职责: 配置加载、查询、覆写管理
// 存储: config_kv 表 (key-value + scope)，当前只使用 global scope
// ==========================================

use crate::db::open_sqlite_connection;
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashMap;
use std::error::Error;
use std::sync::{Arc, Mutex};

/// 扣减相关配置（一次性读取，供 API 层组装引擎）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeductionSettings {
    /// 出库单号前缀
    pub export_number_prefix: String,
    /// 是否跨下单项合并同一原料需求
    pub merge_duplicate_requirements: bool,
    /// 临期预警窗口（天）
    pub expiry_warning_days: u32,
}

impl Default for DeductionSettings {
    fn default() -> Self {
        Self {
            export_number_prefix: defaults::EXPORT_NUMBER_PREFIX.to_string(),
            merge_duplicate_requirements: false,
            expiry_warning_days: defaults::EXPIRY_WARNING_DAYS,
        }
    }
}

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 创建新的 ConfigManager 实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> Result<Self, Box<dyn Error>> {
        let conn = open_sqlite_connection(db_path)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建 ConfigManager
    ///
    /// 说明：对传入连接再次应用统一 PRAGMA（幂等）。
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Result<Self, Box<dyn Error>> {
        {
            let conn_guard = conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
            crate::db::configure_sqlite_connection(&conn_guard)?;
        }

        Ok(Self { conn })
    }

    /// 从 config_kv 表读取配置值（scope_id='global'）
    pub fn get_global_config_value(&self, key: &str) -> Result<Option<String>, Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        let result = conn.query_row(
            "SELECT value FROM config_kv WHERE scope_id = 'global' AND key = ?1",
            params![key],
            |row| row.get::<_, String>(0),
        );

        match result {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(Box::new(e)),
        }
    }

    /// 写入 global scope 配置（UPSERT）
    pub fn set_global_config_value(&self, key: &str, value: &str) -> Result<(), Box<dyn Error>> {
        let key = key.trim();
        if key.is_empty() {
            return Err("配置键不能为空".into());
        }

        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
        conn.execute(
            "INSERT INTO config_kv (scope_id, key, value, updated_at) VALUES ('global', ?1, ?2, datetime('now'))
             ON CONFLICT(scope_id, key) DO UPDATE SET value = ?2, updated_at = datetime('now')",
            params![key, value],
        )?;
        tracing::info!(key, value, "配置已更新");
        Ok(())
    }

    fn get_config_or_default(&self, key: &str, default: &str) -> Result<String, Box<dyn Error>> {
        Ok(self
            .get_global_config_value(key)?
            .unwrap_or_else(|| default.to_string()))
    }

    /// 获取所有 global 配置的快照（JSON格式）
    ///
    /// # 用途
    /// - 启动日志与排障时记录生效配置
    pub fn get_config_snapshot(&self) -> Result<String, Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        let mut stmt = conn.prepare("SELECT key, value FROM config_kv WHERE scope_id = 'global' ORDER BY key")?;

        let mut config_map: HashMap<String, String> = HashMap::new();
        let rows = stmt.query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?;

        for row in rows {
            let (key, value) = row?;
            config_map.insert(key, value);
        }

        let json_value = json!(config_map);
        Ok(serde_json::to_string(&json_value)?)
    }

    // ===== 扣减配置 =====

    /// 出库单号前缀（默认 PX；空白值回落默认）
    pub fn get_export_number_prefix(&self) -> Result<String, Box<dyn Error>> {
        let value = self.get_config_or_default(config_keys::EXPORT_NUMBER_PREFIX, defaults::EXPORT_NUMBER_PREFIX)?;
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Ok(defaults::EXPORT_NUMBER_PREFIX.to_string());
        }
        Ok(trimmed.to_string())
    }

    /// 是否合并重复原料需求（默认 false）
    pub fn get_merge_duplicate_requirements(&self) -> Result<bool, Box<dyn Error>> {
        let value = self.get_config_or_default(config_keys::MERGE_DUPLICATE_REQUIREMENTS, "false")?;
        Ok(parse_bool(&value).unwrap_or_else(|| {
            tracing::warn!(
                config_key = config_keys::MERGE_DUPLICATE_REQUIREMENTS,
                raw_value = %value,
                "布尔配置格式错误，使用默认值 false"
            );
            false
        }))
    }

    /// 临期预警窗口（默认 3 天）
    pub fn get_expiry_warning_days(&self) -> Result<u32, Box<dyn Error>> {
        let default = defaults::EXPIRY_WARNING_DAYS.to_string();
        let value = self.get_config_or_default(config_keys::EXPIRY_WARNING_DAYS, &default)?;
        Ok(value.trim().parse::<u32>().unwrap_or_else(|_| {
            tracing::warn!(
                config_key = config_keys::EXPIRY_WARNING_DAYS,
                raw_value = %value,
                "天数配置格式错误，使用默认值 {}",
                defaults::EXPIRY_WARNING_DAYS
            );
            defaults::EXPIRY_WARNING_DAYS
        }))
    }

    /// 一次读取全部扣减配置
    pub fn load_deduction_settings(&self) -> Result<DeductionSettings, Box<dyn Error>> {
        Ok(DeductionSettings {
            export_number_prefix: self.get_export_number_prefix()?,
            merge_duplicate_requirements: self.get_merge_duplicate_requirements()?,
            expiry_warning_days: self.get_expiry_warning_days()?,
        })
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

// ==========================================
// 配置键常量
// ==========================================
pub mod config_keys {
    pub const EXPORT_NUMBER_PREFIX: &str = "inventory_export_number_prefix";
    pub const MERGE_DUPLICATE_REQUIREMENTS: &str = "inventory_merge_duplicate_requirements";
    pub const EXPIRY_WARNING_DAYS: &str = "inventory_expiry_warning_days";
}

pub mod defaults {
    pub const EXPORT_NUMBER_PREFIX: &str = "PX";
    pub const EXPIRY_WARNING_DAYS: u32 = 3;
}
