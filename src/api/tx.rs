// ==========================================
// 餐厅运营平台 - API 层事务辅助
// ==========================================
// 写事务一律 BEGIN IMMEDIATE：开事务即拿写锁，
// 第二个写者在 busy_timeout 内排队，校验与执行之间不会被插入其他扣减
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::config::{ConfigManager, DeductionSettings};
use chrono::NaiveDateTime;
use rusqlite::{Connection, Transaction, TransactionBehavior};
use std::sync::{Arc, Mutex, MutexGuard};

pub(crate) fn lock(conn: &Arc<Mutex<Connection>>) -> ApiResult<MutexGuard<'_, Connection>> {
    conn.lock()
        .map_err(|e| ApiError::DatabaseConnectionError(format!("数据库锁获取失败: {}", e)))
}

/// 开启写事务（BEGIN IMMEDIATE）
pub(crate) fn begin_write(conn: &mut Connection) -> ApiResult<Transaction<'_>> {
    conn.transaction_with_behavior(TransactionBehavior::Immediate)
        .map_err(|e| ApiError::DatabaseTransactionError(format!("开启写事务失败: {}", e)))
}

/// 开启只读事务（BEGIN DEFERRED，调用方负责回滚）
pub(crate) fn begin_read(conn: &mut Connection) -> ApiResult<Transaction<'_>> {
    conn.transaction_with_behavior(TransactionBehavior::Deferred)
        .map_err(|e| ApiError::DatabaseTransactionError(format!("开启读事务失败: {}", e)))
}

pub(crate) fn commit(tx: Transaction<'_>) -> ApiResult<()> {
    tx.commit()
        .map_err(|e| ApiError::DatabaseTransactionError(format!("事务提交失败: {}", e)))
}

/// 读取扣减配置（必须在锁住业务连接之前调用，ConfigManager 可能共享同一把锁）
pub(crate) fn load_settings(config: &ConfigManager) -> ApiResult<DeductionSettings> {
    config
        .load_deduction_settings()
        .map_err(|e| ApiError::InternalError(format!("配置读取失败: {}", e)))
}

pub(crate) fn local_now() -> NaiveDateTime {
    chrono::Local::now().naive_local()
}
