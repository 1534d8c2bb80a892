// ==========================================
// 引擎层单元测试辅助
// ==========================================

use crate::domain::export::{ExportDetail, ExportRecord};
use crate::domain::ingredient::{Batch, Ingredient};
use crate::domain::recipe::DishIngredientRequirement;
use crate::domain::types::{StockStatus, EXPORT_STATUS_COMPLETED};
use crate::repository::{batch_repo, export_repo, ingredient_repo};
use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::{params, Connection};

pub(crate) fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub(crate) fn ts() -> NaiveDateTime {
    date(2024, 12, 1).and_hms_opt(8, 0, 0).unwrap()
}

pub(crate) fn setup_conn() -> Connection {
    crate::db::open_in_memory_with_schema().unwrap()
}

/// 插入原料，缓存库存按给定值写入
pub(crate) fn seed_ingredient(conn: &Connection, id: &str, name: &str, stock: f64, minimum: f64) {
    let mut ingredient = Ingredient::new(id, name, "kg", minimum, 10.0, ts());
    ingredient.quantity_in_stock = stock;
    ingredient.stock_status = StockStatus::derive(stock, minimum);
    ingredient_repo::insert_ingredient(conn, &ingredient).unwrap();
}

pub(crate) fn seed_batch(
    conn: &Connection,
    batch_id: &str,
    ingredient_id: &str,
    quantity: f64,
    unit_price: f64,
    expiry: Option<NaiveDate>,
) {
    batch_repo::insert_batch(
        conn,
        &Batch {
            batch_id: batch_id.to_string(),
            ingredient_id: ingredient_id.to_string(),
            quantity,
            unit_price,
            expiry_date: expiry,
            received_at: ts(),
        },
    )
    .unwrap();
}

/// 直接写一笔历史出库（模拟此前的扣减）
pub(crate) fn seed_export(conn: &Connection, export_id: &str, ingredient_id: &str, batch_id: &str, quantity: f64) {
    export_repo::insert_record(
        conn,
        &ExportRecord {
            export_id: export_id.to_string(),
            export_number: format!("SEED-{}", export_id),
            export_date: date(2024, 12, 1),
            order_ref: "seed".to_string(),
            total_cost: quantity,
            status: EXPORT_STATUS_COMPLETED.to_string(),
            created_at: ts(),
        },
    )
    .unwrap();
    export_repo::insert_detail(
        conn,
        &ExportDetail {
            export_id: export_id.to_string(),
            ingredient_id: ingredient_id.to_string(),
            batch_id: batch_id.to_string(),
            quantity,
            unit_price: 1.0,
            line_total: quantity,
        },
    )
    .unwrap();
}

pub(crate) fn seed_recipe(conn: &Connection, dish_id: &str, ingredient_id: &str, quantity_required: f64) {
    let row = DishIngredientRequirement {
        dish_id: dish_id.to_string(),
        ingredient_id: ingredient_id.to_string(),
        quantity_required,
        unit: "kg".to_string(),
    };
    conn.execute(
        "INSERT INTO dish_ingredient (dish_id, ingredient_id, quantity_required, unit) VALUES (?1, ?2, ?3, ?4)",
        params![row.dish_id, row.ingredient_id, row.quantity_required, row.unit],
    )
    .unwrap();
}

pub(crate) fn count_rows(conn: &Connection, table: &str) -> i64 {
    conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| row.get(0))
        .unwrap()
}

/// 库存相关表的完整快照（逐行逐列，按 rowid 排序）
pub(crate) fn snapshot_tables(conn: &Connection) -> Vec<String> {
    let mut dump = Vec::new();
    for table in ["ingredient", "ingredient_batch", "export_record", "export_detail", "order_line"] {
        let mut stmt = conn
            .prepare(&format!("SELECT * FROM {} ORDER BY rowid", table))
            .unwrap();
        let columns = stmt.column_count();
        let rows = stmt
            .query_map([], |row| {
                let mut values = Vec::with_capacity(columns);
                for idx in 0..columns {
                    values.push(format!("{:?}", row.get::<_, rusqlite::types::Value>(idx)?));
                }
                Ok(format!("{}|{}", table, values.join("|")))
            })
            .unwrap();
        for row in rows {
            dump.push(row.unwrap());
        }
    }
    dump
}
