// ==========================================
// 餐厅运营平台 - 出库台账数据仓储
// ==========================================
// 红线: 只提供插入与查询，不提供更新/删除
// ==========================================

use crate::domain::export::{ExportDetail, ExportRecord, ExportRecordView};
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension, Result as SqliteResult, Row};
use std::sync::{Arc, Mutex};

const RECORD_COLUMNS: &str =
    "export_id, export_number, export_date, order_ref, total_cost, status, created_at";

// ==========================================
// ExportRepository - 出库台账仓储
// ==========================================
pub struct ExportRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ExportRepository {
    /// 从已有连接创建仓储实例
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 按出库单 ID 查询出库单及明细
    pub fn find_view_by_id(&self, export_id: &str) -> RepositoryResult<Option<ExportRecordView>> {
        let conn = self.get_conn()?;
        select_view(&conn, export_id)
    }

    /// 按订单引用查询出库单（按创建时间升序）
    pub fn list_by_order_ref(&self, order_ref: &str) -> RepositoryResult<Vec<ExportRecord>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM export_record WHERE order_ref = ?1 ORDER BY created_at, export_number",
            RECORD_COLUMNS
        ))?;
        let records = stmt
            .query_map(params![order_ref], map_record_row)?
            .collect::<SqliteResult<Vec<ExportRecord>>>()?;
        Ok(records)
    }

    /// 查询某批次的全部出库明细
    pub fn list_details_by_batch(&self, batch_id: &str) -> RepositoryResult<Vec<ExportDetail>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT export_id, ingredient_id, batch_id, quantity, unit_price, line_total
            FROM export_detail
            WHERE batch_id = ?1
            ORDER BY detail_id
            "#,
        )?;
        let details = stmt
            .query_map(params![batch_id], map_detail_row)?
            .collect::<SqliteResult<Vec<ExportDetail>>>()?;
        Ok(details)
    }
}

// ==========================================
// 连接级 SQL（供事务内复用）
// ==========================================

pub(crate) fn insert_record(conn: &Connection, record: &ExportRecord) -> RepositoryResult<()> {
    conn.execute(
        r#"
        INSERT INTO export_record (
            export_id, export_number, export_date, order_ref, total_cost, status, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        "#,
        params![
            record.export_id,
            record.export_number,
            record.export_date,
            record.order_ref,
            record.total_cost,
            record.status,
            record.created_at,
        ],
    )?;
    Ok(())
}

pub(crate) fn insert_detail(conn: &Connection, detail: &ExportDetail) -> RepositoryResult<()> {
    conn.execute(
        r#"
        INSERT INTO export_detail (
            export_id, ingredient_id, batch_id, quantity, unit_price, line_total
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        "#,
        params![
            detail.export_id,
            detail.ingredient_id,
            detail.batch_id,
            detail.quantity,
            detail.unit_price,
            detail.line_total,
        ],
    )?;
    Ok(())
}

pub(crate) fn count_on_date(conn: &Connection, export_date: NaiveDate) -> RepositoryResult<i64> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM export_record WHERE export_date = ?1",
        params![export_date],
        |row| row.get(0),
    )?;
    Ok(count)
}

pub(crate) fn select_view(conn: &Connection, export_id: &str) -> RepositoryResult<Option<ExportRecordView>> {
    let record = conn
        .query_row(
            &format!("SELECT {} FROM export_record WHERE export_id = ?1", RECORD_COLUMNS),
            params![export_id],
            map_record_row,
        )
        .optional()?;

    let record = match record {
        Some(r) => r,
        None => return Ok(None),
    };

    let mut stmt = conn.prepare(
        r#"
        SELECT export_id, ingredient_id, batch_id, quantity, unit_price, line_total
        FROM export_detail
        WHERE export_id = ?1
        ORDER BY detail_id
        "#,
    )?;
    let details = stmt
        .query_map(params![export_id], map_detail_row)?
        .collect::<SqliteResult<Vec<ExportDetail>>>()?;

    Ok(Some(ExportRecordView { record, details }))
}

fn map_record_row(row: &Row<'_>) -> SqliteResult<ExportRecord> {
    Ok(ExportRecord {
        export_id: row.get(0)?,
        export_number: row.get(1)?,
        export_date: row.get(2)?,
        order_ref: row.get(3)?,
        total_cost: row.get(4)?,
        status: row.get(5)?,
        created_at: row.get(6)?,
    })
}

fn map_detail_row(row: &Row<'_>) -> SqliteResult<ExportDetail> {
    Ok(ExportDetail {
        export_id: row.get(0)?,
        ingredient_id: row.get(1)?,
        batch_id: row.get(2)?,
        quantity: row.get(3)?,
        unit_price: row.get(4)?,
        line_total: row.get(5)?,
    })
}
