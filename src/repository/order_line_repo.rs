// ==========================================
// 餐厅运营平台 - 订单明细数据仓储
// ==========================================
// 说明: 扣减触发点 PENDING → PREPARING 使用条件更新，
//       受影响行数为 0 说明状态已被其他请求迁移
// ==========================================

use crate::domain::recipe::OrderLine;
use crate::domain::types::OrderLineStatus;
use crate::repository::error::{text_conversion_error, RepositoryError, RepositoryResult};
use chrono::NaiveDateTime;
use rusqlite::{params, Connection, OptionalExtension, Row, Result as SqliteResult};
use std::sync::{Arc, Mutex};

pub struct OrderLineRepository {
    conn: Arc<Mutex<Connection>>,
}

impl OrderLineRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 新增订单明细
    pub fn insert(&self, line: &OrderLine) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO order_line (
                order_line_id, order_id, dish_id, quantity, status, export_id, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
            params![
                line.order_line_id,
                line.order_id,
                line.dish_id,
                line.quantity,
                line.status.as_str(),
                line.export_id,
                line.updated_at,
            ],
        )?;
        Ok(())
    }

    pub fn find_by_id(&self, order_line_id: &str) -> RepositoryResult<Option<OrderLine>> {
        let conn = self.get_conn()?;
        select_order_line(&conn, order_line_id)
    }
}

pub(crate) fn select_order_line(
    conn: &Connection,
    order_line_id: &str,
) -> RepositoryResult<Option<OrderLine>> {
    let line = conn
        .query_row(
            r#"
            SELECT order_line_id, order_id, dish_id, quantity, status, export_id, updated_at
            FROM order_line
            WHERE order_line_id = ?1
            "#,
            params![order_line_id],
            map_order_line_row,
        )
        .optional()?;
    Ok(line)
}

/// PENDING → PREPARING 并关联出库单
///
/// # 返回
/// - Ok(1): 迁移成功
/// - Ok(0): 当前状态不是 PENDING（未做任何修改）
pub(crate) fn mark_preparing(
    conn: &Connection,
    order_line_id: &str,
    export_id: &str,
    updated_at: NaiveDateTime,
) -> RepositoryResult<usize> {
    let affected = conn.execute(
        r#"
        UPDATE order_line
        SET status = ?2, export_id = ?3, updated_at = ?4
        WHERE order_line_id = ?1 AND status = ?5
        "#,
        params![
            order_line_id,
            OrderLineStatus::Preparing.as_str(),
            export_id,
            updated_at,
            OrderLineStatus::Pending.as_str(),
        ],
    )?;
    Ok(affected)
}

fn map_order_line_row(row: &Row<'_>) -> SqliteResult<OrderLine> {
    let status_raw: String = row.get(4)?;
    let status = status_raw
        .parse::<OrderLineStatus>()
        .map_err(|e| text_conversion_error(4, e))?;

    Ok(OrderLine {
        order_line_id: row.get(0)?,
        order_id: row.get(1)?,
        dish_id: row.get(2)?,
        quantity: row.get(3)?,
        status,
        export_id: row.get(5)?,
        updated_at: row.get(6)?,
    })
}
