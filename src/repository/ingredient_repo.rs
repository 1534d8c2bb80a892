// ==========================================
// 餐厅运营平台 - 原料数据仓储
// ==========================================
// 红线: Repository 不含业务逻辑
// ==========================================

use crate::domain::ingredient::Ingredient;
use crate::domain::types::StockStatus;
use crate::repository::error::{text_conversion_error, RepositoryError, RepositoryResult};
use chrono::NaiveDateTime;
use rusqlite::{params, Connection, OptionalExtension, Result as SqliteResult, Row};
use std::sync::{Arc, Mutex};

const INGREDIENT_COLUMNS: &str = "ingredient_id, name, unit, quantity_in_stock, minimum_quantity, \
     unit_price, stock_status, created_at, updated_at";

// ==========================================
// IngredientRepository - 原料仓储
// ==========================================
/// 原料仓储
/// 职责: 管理 ingredient 表的 CRUD 操作
pub struct IngredientRepository {
    conn: Arc<Mutex<Connection>>,
}

impl IngredientRepository {
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

    /// 新增原料
    pub fn insert(&self, ingredient: &Ingredient) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        insert_ingredient(&conn, ingredient)
    }

    /// 按 ID 查询原料
    ///
    /// # 返回
    /// - Ok(Some(Ingredient)): 找到
    /// - Ok(None): 未找到
    pub fn find_by_id(&self, ingredient_id: &str) -> RepositoryResult<Option<Ingredient>> {
        let conn = self.get_conn()?;
        select_ingredient(&conn, ingredient_id)
    }

    /// 查询全部原料（按 ID 排序）
    pub fn list_all(&self) -> RepositoryResult<Vec<Ingredient>> {
        let conn = self.get_conn()?;
        select_all_ingredients(&conn)
    }

    /// 按库存状态查询原料
    pub fn list_by_status(&self, statuses: &[StockStatus]) -> RepositoryResult<Vec<Ingredient>> {
        let conn = self.get_conn()?;
        let mut result = Vec::new();
        for status in statuses {
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM ingredient WHERE stock_status = ?1 ORDER BY ingredient_id",
                INGREDIENT_COLUMNS
            ))?;
            let rows = stmt
                .query_map(params![status.as_str()], map_ingredient_row)?
                .collect::<SqliteResult<Vec<Ingredient>>>()?;
            result.extend(rows);
        }
        Ok(result)
    }
}

// ==========================================
// 连接级 SQL（供事务内复用）
// ==========================================

pub(crate) fn insert_ingredient(conn: &Connection, ingredient: &Ingredient) -> RepositoryResult<()> {
    conn.execute(
        r#"
        INSERT INTO ingredient (
            ingredient_id, name, unit, quantity_in_stock, minimum_quantity,
            unit_price, stock_status, created_at, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
        "#,
        params![
            ingredient.ingredient_id,
            ingredient.name,
            ingredient.unit,
            ingredient.quantity_in_stock,
            ingredient.minimum_quantity,
            ingredient.unit_price,
            ingredient.stock_status.as_str(),
            ingredient.created_at,
            ingredient.updated_at,
        ],
    )?;
    Ok(())
}

pub(crate) fn select_ingredient(
    conn: &Connection,
    ingredient_id: &str,
) -> RepositoryResult<Option<Ingredient>> {
    let ingredient = conn
        .query_row(
            &format!("SELECT {} FROM ingredient WHERE ingredient_id = ?1", INGREDIENT_COLUMNS),
            params![ingredient_id],
            map_ingredient_row,
        )
        .optional()?;
    Ok(ingredient)
}

pub(crate) fn select_all_ingredients(conn: &Connection) -> RepositoryResult<Vec<Ingredient>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM ingredient ORDER BY ingredient_id",
        INGREDIENT_COLUMNS
    ))?;
    let rows = stmt
        .query_map([], map_ingredient_row)?
        .collect::<SqliteResult<Vec<Ingredient>>>()?;
    Ok(rows)
}

/// 覆写缓存库存与库存状态
///
/// 0 行受影响视为原料不存在
pub(crate) fn update_stock(
    conn: &Connection,
    ingredient_id: &str,
    quantity_in_stock: f64,
    stock_status: StockStatus,
    updated_at: NaiveDateTime,
) -> RepositoryResult<()> {
    let affected = conn.execute(
        r#"
        UPDATE ingredient
        SET quantity_in_stock = ?2, stock_status = ?3, updated_at = ?4
        WHERE ingredient_id = ?1
        "#,
        params![ingredient_id, quantity_in_stock, stock_status.as_str(), updated_at],
    )?;

    if affected == 0 {
        return Err(RepositoryError::not_found("Ingredient", ingredient_id));
    }
    Ok(())
}

fn map_ingredient_row(row: &Row<'_>) -> SqliteResult<Ingredient> {
    let status_raw: String = row.get(6)?;
    let stock_status = status_raw
        .parse::<StockStatus>()
        .map_err(|e| text_conversion_error(6, e))?;

    Ok(Ingredient {
        ingredient_id: row.get(0)?,
        name: row.get(1)?,
        unit: row.get(2)?,
        quantity_in_stock: row.get(3)?,
        minimum_quantity: row.get(4)?,
        unit_price: row.get(5)?,
        stock_status,
        created_at: row.get(7)?,
        updated_at: row.get(8)?,
    })
}
