// ==========================================
// 餐厅运营平台 - 入库批次数据仓储
// ==========================================
// 红线: 批次只插入，不更新数量、不删除（schema 触发器兜底）
// 说明: 剩余量 = 批次数量 − Σ出库明细数量，不落库
// ==========================================

use crate::domain::ingredient::Batch;
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection, OptionalExtension, Result as SqliteResult, Row};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// 单个原料的台账合计
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LedgerTotals {
    pub received: f64, // Σ 批次入库数量
    pub exported: f64, // Σ 出库明细数量
}

impl LedgerTotals {
    /// 台账推导出的在库量
    pub fn on_hand(&self) -> f64 {
        self.received - self.exported
    }
}

// ==========================================
// BatchRepository - 入库批次仓储
// ==========================================
pub struct BatchRepository {
    conn: Arc<Mutex<Connection>>,
}

impl BatchRepository {
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

    /// 按 ID 查询批次
    pub fn find_by_id(&self, batch_id: &str) -> RepositoryResult<Option<Batch>> {
        let conn = self.get_conn()?;
        select_batch(&conn, batch_id)
    }

    /// 查询某原料的全部批次（含已耗尽、已过期）
    pub fn list_by_ingredient(&self, ingredient_id: &str) -> RepositoryResult<Vec<Batch>> {
        let conn = self.get_conn()?;
        let balances = select_batch_balances(&conn, ingredient_id)?;
        Ok(balances.into_iter().map(|(batch, _)| batch).collect())
    }

    /// 查询某批次累计出库量
    pub fn exported_quantity(&self, batch_id: &str) -> RepositoryResult<f64> {
        let conn = self.get_conn()?;
        select_exported_quantity(&conn, batch_id)
    }
}

// ==========================================
// 连接级 SQL（供事务内复用）
// ==========================================

pub(crate) fn insert_batch(conn: &Connection, batch: &Batch) -> RepositoryResult<()> {
    conn.execute(
        r#"
        INSERT INTO ingredient_batch (
            batch_id, ingredient_id, quantity, unit_price, expiry_date, received_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        "#,
        params![
            batch.batch_id,
            batch.ingredient_id,
            batch.quantity,
            batch.unit_price,
            batch.expiry_date,
            batch.received_at,
        ],
    )?;
    Ok(())
}

pub(crate) fn select_batch(conn: &Connection, batch_id: &str) -> RepositoryResult<Option<Batch>> {
    let batch = conn
        .query_row(
            r#"
            SELECT batch_id, ingredient_id, quantity, unit_price, expiry_date, received_at
            FROM ingredient_batch
            WHERE batch_id = ?1
            "#,
            params![batch_id],
            map_batch_row,
        )
        .optional()?;
    Ok(batch)
}

pub(crate) fn select_exported_quantity(conn: &Connection, batch_id: &str) -> RepositoryResult<f64> {
    let exported: f64 = conn.query_row(
        "SELECT COALESCE(SUM(quantity), 0.0) FROM export_detail WHERE batch_id = ?1",
        params![batch_id],
        |row| row.get(0),
    )?;
    Ok(exported)
}

/// 查询某原料全部批次及其累计出库量（一条 SQL，按 batch_id 排序）
pub(crate) fn select_batch_balances(
    conn: &Connection,
    ingredient_id: &str,
) -> RepositoryResult<Vec<(Batch, f64)>> {
    let mut stmt = conn.prepare(
        r#"
        SELECT
            b.batch_id, b.ingredient_id, b.quantity, b.unit_price, b.expiry_date, b.received_at,
            COALESCE(SUM(d.quantity), 0.0) AS exported
        FROM ingredient_batch b
        LEFT JOIN export_detail d ON d.batch_id = b.batch_id
        WHERE b.ingredient_id = ?1
        GROUP BY b.batch_id
        ORDER BY b.batch_id
        "#,
    )?;

    let rows = stmt
        .query_map(params![ingredient_id], |row| {
            let batch = map_batch_row(row)?;
            let exported: f64 = row.get(6)?;
            Ok((batch, exported))
        })?
        .collect::<SqliteResult<Vec<(Batch, f64)>>>()?;

    Ok(rows)
}

/// 按原料汇总入库与出库合计（对账用）
pub(crate) fn select_ledger_totals(conn: &Connection) -> RepositoryResult<HashMap<String, LedgerTotals>> {
    let mut totals: HashMap<String, LedgerTotals> = HashMap::new();

    let mut stmt = conn.prepare(
        "SELECT ingredient_id, COALESCE(SUM(quantity), 0.0) FROM ingredient_batch GROUP BY ingredient_id",
    )?;
    let received = stmt
        .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, f64>(1)?)))?
        .collect::<SqliteResult<Vec<_>>>()?;
    for (ingredient_id, quantity) in received {
        totals.entry(ingredient_id).or_default().received = quantity;
    }

    let mut stmt = conn.prepare(
        "SELECT ingredient_id, COALESCE(SUM(quantity), 0.0) FROM export_detail GROUP BY ingredient_id",
    )?;
    let exported = stmt
        .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, f64>(1)?)))?
        .collect::<SqliteResult<Vec<_>>>()?;
    for (ingredient_id, quantity) in exported {
        totals.entry(ingredient_id).or_default().exported = quantity;
    }

    Ok(totals)
}

fn map_batch_row(row: &Row<'_>) -> SqliteResult<Batch> {
    Ok(Batch {
        batch_id: row.get(0)?,
        ingredient_id: row.get(1)?,
        quantity: row.get(2)?,
        unit_price: row.get(3)?,
        expiry_date: row.get(4)?,
        received_at: row.get(5)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ingredient::Ingredient;
    use crate::repository::ingredient_repo::insert_ingredient;
    use chrono::{NaiveDate, NaiveDateTime};

    fn ts() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 12, 1)
            .unwrap()
            .and_hms_opt(8, 0, 0)
            .unwrap()
    }

    fn batch(id: &str, qty: f64, expiry: Option<NaiveDate>) -> Batch {
        Batch {
            batch_id: id.to_string(),
            ingredient_id: "ING-BEEF".to_string(),
            quantity: qty,
            unit_price: 10.0,
            expiry_date: expiry,
            received_at: ts(),
        }
    }

    fn setup() -> Connection {
        let conn = crate::db::open_in_memory_with_schema().unwrap();
        insert_ingredient(&conn, &Ingredient::new("ING-BEEF", "Beef", "kg", 0.0, 10.0, ts())).unwrap();
        conn
    }

    #[test]
    fn test_insert_and_select_batch_with_null_expiry() {
        let conn = setup();
        let b = batch("B1", 10.0, None);
        insert_batch(&conn, &b).unwrap();

        assert_eq!(select_batch(&conn, "B1").unwrap(), Some(b));
        assert_eq!(select_batch(&conn, "B404").unwrap(), None);
        assert_eq!(select_exported_quantity(&conn, "B1").unwrap(), 0.0);
    }

    #[test]
    fn test_batch_requires_existing_ingredient() {
        let conn = setup();
        let mut b = batch("B1", 10.0, None);
        b.ingredient_id = "ING-NONE".to_string();

        let err = insert_batch(&conn, &b).unwrap_err();
        assert!(matches!(err, RepositoryError::ForeignKeyViolation(_)));
    }

    #[test]
    fn test_ledger_totals_without_exports() {
        let conn = setup();
        insert_batch(&conn, &batch("B1", 10.0, None)).unwrap();
        insert_batch(&conn, &batch("B2", 2.5, NaiveDate::from_ymd_opt(2024, 12, 20))).unwrap();

        let totals = select_ledger_totals(&conn).unwrap();
        let beef = totals.get("ING-BEEF").copied().unwrap_or_default();
        assert_eq!(beef.received, 12.5);
        assert_eq!(beef.exported, 0.0);
        assert_eq!(beef.on_hand(), 12.5);
    }
}
