// ==========================================
// 餐厅运营平台 - 库存存储接口
// ==========================================
// 职责: 定义扣减引擎所需的数据访问接口（不含业务规则）
// 说明: Engine 层只依赖此 trait；SQLite 实现借用一个 &Connection，
//       通常是调用方开启的事务，保证一次扣减的读写落在同一事务内
// ==========================================

use crate::domain::export::{ExportDetail, ExportRecord};
use crate::domain::ingredient::{Batch, Ingredient};
use crate::domain::recipe::DishIngredientRequirement;
use crate::domain::types::StockStatus;
use crate::repository::batch_repo::{self, LedgerTotals};
use crate::repository::error::RepositoryResult;
use crate::repository::{export_repo, ingredient_repo, recipe_repo};
use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::Connection;
use std::collections::HashMap;

// ==========================================
// InventoryStore Trait
// ==========================================
pub trait InventoryStore {
    // ===== 读操作 =====

    fn find_ingredient(&self, ingredient_id: &str) -> RepositoryResult<Option<Ingredient>>;

    fn list_ingredients(&self) -> RepositoryResult<Vec<Ingredient>>;

    fn find_batch(&self, batch_id: &str) -> RepositoryResult<Option<Batch>>;

    /// 某批次累计出库量（无出库返回 0）
    fn exported_quantity_for_batch(&self, batch_id: &str) -> RepositoryResult<f64>;

    /// 某原料全部批次及累计出库量（未过滤、未排序语义）
    fn list_batch_balances(&self, ingredient_id: &str) -> RepositoryResult<Vec<(Batch, f64)>>;

    /// 按原料汇总的台账合计
    fn ledger_totals(&self) -> RepositoryResult<HashMap<String, LedgerTotals>>;

    fn find_recipe(&self, dish_id: &str) -> RepositoryResult<Vec<DishIngredientRequirement>>;

    /// 某日已生成的出库单数量（用于出库单号流水）
    fn count_exports_on(&self, export_date: NaiveDate) -> RepositoryResult<i64>;

    // ===== 写操作 =====

    fn insert_export_record(&self, record: &ExportRecord) -> RepositoryResult<()>;

    fn insert_export_detail(&self, detail: &ExportDetail) -> RepositoryResult<()>;

    fn update_ingredient_stock(
        &self,
        ingredient_id: &str,
        quantity_in_stock: f64,
        stock_status: StockStatus,
        updated_at: NaiveDateTime,
    ) -> RepositoryResult<()>;
}

// ==========================================
// SqliteInventoryStore - SQLite 实现
// ==========================================
pub struct SqliteInventoryStore<'c> {
    conn: &'c Connection,
}

impl<'c> SqliteInventoryStore<'c> {
    /// 借用连接（或事务，`Transaction` 可解引用为 `Connection`）
    pub fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }
}

impl InventoryStore for SqliteInventoryStore<'_> {
    fn find_ingredient(&self, ingredient_id: &str) -> RepositoryResult<Option<Ingredient>> {
        ingredient_repo::select_ingredient(self.conn, ingredient_id)
    }

    fn list_ingredients(&self) -> RepositoryResult<Vec<Ingredient>> {
        ingredient_repo::select_all_ingredients(self.conn)
    }

    fn find_batch(&self, batch_id: &str) -> RepositoryResult<Option<Batch>> {
        batch_repo::select_batch(self.conn, batch_id)
    }

    fn exported_quantity_for_batch(&self, batch_id: &str) -> RepositoryResult<f64> {
        batch_repo::select_exported_quantity(self.conn, batch_id)
    }

    fn list_batch_balances(&self, ingredient_id: &str) -> RepositoryResult<Vec<(Batch, f64)>> {
        batch_repo::select_batch_balances(self.conn, ingredient_id)
    }

    fn ledger_totals(&self) -> RepositoryResult<HashMap<String, LedgerTotals>> {
        batch_repo::select_ledger_totals(self.conn)
    }

    fn find_recipe(&self, dish_id: &str) -> RepositoryResult<Vec<DishIngredientRequirement>> {
        recipe_repo::select_recipe(self.conn, dish_id)
    }

    fn count_exports_on(&self, export_date: NaiveDate) -> RepositoryResult<i64> {
        export_repo::count_on_date(self.conn, export_date)
    }

    fn insert_export_record(&self, record: &ExportRecord) -> RepositoryResult<()> {
        export_repo::insert_record(self.conn, record)
    }

    fn insert_export_detail(&self, detail: &ExportDetail) -> RepositoryResult<()> {
        export_repo::insert_detail(self.conn, detail)
    }

    fn update_ingredient_stock(
        &self,
        ingredient_id: &str,
        quantity_in_stock: f64,
        stock_status: StockStatus,
        updated_at: NaiveDateTime,
    ) -> RepositoryResult<()> {
        ingredient_repo::update_stock(self.conn, ingredient_id, quantity_in_stock, stock_status, updated_at)
    }
}
