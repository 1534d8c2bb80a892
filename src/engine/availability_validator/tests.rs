use super::AvailabilityValidator;
use crate::domain::deduction::ShortfallReason;
use crate::domain::export::{ExportDetail, ExportRecord};
use crate::domain::ingredient::{Batch, Ingredient};
use crate::domain::recipe::{DishIngredientRequirement, IngredientRequirement};
use crate::domain::types::StockStatus;
use crate::engine::test_support::*;
use crate::repository::batch_repo::LedgerTotals;
use crate::repository::error::RepositoryResult;
use crate::repository::inventory_store::InventoryStore;
use crate::repository::SqliteInventoryStore;
use chrono::{NaiveDate, NaiveDateTime};
use std::collections::HashMap;

// ==========================================
// 测试辅助函数
// ==========================================

/// 只读包装：任何写操作直接 panic，用于证明校验是纯读
struct ReadOnlyStore<'a>(SqliteInventoryStore<'a>);

impl InventoryStore for ReadOnlyStore<'_> {
    fn find_ingredient(&self, id: &str) -> RepositoryResult<Option<Ingredient>> {
        self.0.find_ingredient(id)
    }
    fn list_ingredients(&self) -> RepositoryResult<Vec<Ingredient>> {
        self.0.list_ingredients()
    }
    fn find_batch(&self, id: &str) -> RepositoryResult<Option<Batch>> {
        self.0.find_batch(id)
    }
    fn exported_quantity_for_batch(&self, id: &str) -> RepositoryResult<f64> {
        self.0.exported_quantity_for_batch(id)
    }
    fn list_batch_balances(&self, id: &str) -> RepositoryResult<Vec<(Batch, f64)>> {
        self.0.list_batch_balances(id)
    }
    fn ledger_totals(&self) -> RepositoryResult<HashMap<String, LedgerTotals>> {
        self.0.ledger_totals()
    }
    fn find_recipe(&self, dish_id: &str) -> RepositoryResult<Vec<DishIngredientRequirement>> {
        self.0.find_recipe(dish_id)
    }
    fn count_exports_on(&self, d: NaiveDate) -> RepositoryResult<i64> {
        self.0.count_exports_on(d)
    }
    fn insert_export_record(&self, _: &ExportRecord) -> RepositoryResult<()> {
        panic!("validation must not write export_record");
    }
    fn insert_export_detail(&self, _: &ExportDetail) -> RepositoryResult<()> {
        panic!("validation must not write export_detail");
    }
    fn update_ingredient_stock(&self, _: &str, _: f64, _: StockStatus, _: NaiveDateTime) -> RepositoryResult<()> {
        panic!("validation must not update ingredient");
    }
}

fn requirement(ingredient_id: &str, qty: f64) -> IngredientRequirement {
    IngredientRequirement {
        ingredient_id: ingredient_id.to_string(),
        required_quantity: qty,
        unit: "kg".to_string(),
        dish_id: "DISH-TEST".to_string(),
    }
}

// ==========================================
// 正常案例
// ==========================================

#[test]
fn test_sufficient_stock_produces_plan() {
    let conn = setup_conn();
    seed_ingredient(&conn, "ING-BEEF", "Beef", 20.0, 5.0);
    seed_batch(&conn, "B1", "ING-BEEF", 10.0, 5.0, Some(date(2024, 12, 10)));
    seed_batch(&conn, "B2", "ING-BEEF", 10.0, 6.0, Some(date(2024, 12, 20)));

    let store = ReadOnlyStore(SqliteInventoryStore::new(&conn));
    let check = AvailabilityValidator::default()
        .validate(&store, &[requirement("ING-BEEF", 15.0)], date(2024, 12, 5))
        .unwrap();

    assert!(check.is_valid);
    assert!(check.shortfalls.is_empty());
    assert_eq!(check.plan.len(), 1);
    assert_eq!(check.plan[0].ingredient_name, "Beef");
    assert_eq!(check.total_required_for("ING-BEEF"), 15.0);
}

#[test]
fn test_exact_quantity_is_sufficient() {
    let conn = setup_conn();
    seed_ingredient(&conn, "ING-BEEF", "Beef", 10.0, 0.0);
    seed_batch(&conn, "B1", "ING-BEEF", 10.0, 5.0, None);

    let store = ReadOnlyStore(SqliteInventoryStore::new(&conn));
    let check = AvailabilityValidator::default()
        .validate(&store, &[requirement("ING-BEEF", 10.0)], date(2024, 12, 5))
        .unwrap();
    assert!(check.is_valid);
}

// ==========================================
// 缺口案例
// ==========================================

#[test]
fn test_shortfall_reports_required_and_available() {
    let conn = setup_conn();
    seed_ingredient(&conn, "ING-BEEF", "Beef", 20.0, 0.0);
    seed_batch(&conn, "B1", "ING-BEEF", 10.0, 5.0, Some(date(2024, 12, 10)));
    seed_batch(&conn, "B2", "ING-BEEF", 10.0, 6.0, Some(date(2024, 12, 20)));

    let store = ReadOnlyStore(SqliteInventoryStore::new(&conn));
    let check = AvailabilityValidator::default()
        .validate(&store, &[requirement("ING-BEEF", 25.0)], date(2024, 12, 5))
        .unwrap();

    assert!(!check.is_valid);
    assert_eq!(check.shortfalls.len(), 1);
    assert_eq!(check.shortfalls[0].required, 25.0);
    assert_eq!(check.shortfalls[0].available, 20.0);
    assert_eq!(check.shortfalls[0].reason, ShortfallReason::InsufficientStock);
    assert!(check.plan.is_empty());
}

#[test]
fn test_cache_passes_but_batches_expired() {
    let conn = setup_conn();
    // 缓存显示 20，但其中 10 已过期
    seed_ingredient(&conn, "ING-BEEF", "Beef", 20.0, 0.0);
    seed_batch(&conn, "B-OLD", "ING-BEEF", 10.0, 5.0, Some(date(2024, 12, 1)));
    seed_batch(&conn, "B-NEW", "ING-BEEF", 10.0, 5.0, Some(date(2024, 12, 20)));

    let store = ReadOnlyStore(SqliteInventoryStore::new(&conn));
    let check = AvailabilityValidator::default()
        .validate(&store, &[requirement("ING-BEEF", 15.0)], date(2024, 12, 5))
        .unwrap();

    assert!(!check.is_valid);
    assert_eq!(check.shortfalls[0].available, 10.0);
}

#[test]
fn test_batches_pass_but_cache_low() {
    let conn = setup_conn();
    seed_ingredient(&conn, "ING-BEEF", "Beef", 8.0, 0.0);
    seed_batch(&conn, "B1", "ING-BEEF", 20.0, 5.0, None);

    let store = ReadOnlyStore(SqliteInventoryStore::new(&conn));
    let check = AvailabilityValidator::default()
        .validate(&store, &[requirement("ING-BEEF", 10.0)], date(2024, 12, 5))
        .unwrap();

    assert!(!check.is_valid);
    assert_eq!(check.shortfalls[0].available, 8.0);
}

#[test]
fn test_collects_every_shortfall_including_missing_ingredient() {
    let conn = setup_conn();
    seed_ingredient(&conn, "ING-BEEF", "Beef", 5.0, 0.0);
    seed_batch(&conn, "B1", "ING-BEEF", 5.0, 5.0, None);
    seed_ingredient(&conn, "ING-SALT", "Salt", 1.0, 0.0);
    seed_batch(&conn, "S1", "ING-SALT", 1.0, 0.5, None);
    seed_ingredient(&conn, "ING-OIL", "Oil", 0.0, 0.0);

    let store = ReadOnlyStore(SqliteInventoryStore::new(&conn));
    let check = AvailabilityValidator::default()
        .validate(
            &store,
            &[
                requirement("ING-BEEF", 6.0),
                requirement("ING-SALT", 0.5),
                requirement("ING-GHOST", 1.0),
                requirement("ING-OIL", 2.0),
            ],
            date(2024, 12, 5),
        )
        .unwrap();

    assert!(!check.is_valid);
    let ids: Vec<&str> = check.shortfalls.iter().map(|s| s.ingredient_id.as_str()).collect();
    assert_eq!(ids, vec!["ING-BEEF", "ING-GHOST", "ING-OIL"]);
    assert_eq!(check.shortfalls[1].reason, ShortfallReason::IngredientNotFound);
    assert_eq!(check.shortfalls[1].available, 0.0);
    // 盐通过校验，仍进入计划
    assert_eq!(check.plan.len(), 1);
    assert_eq!(check.plan[0].ingredient_id, "ING-SALT");
}

#[test]
fn test_validation_leaves_every_table_unchanged() {
    let conn = setup_conn();
    seed_ingredient(&conn, "ING-BEEF", "Beef", 20.0, 5.0);
    seed_batch(&conn, "B1", "ING-BEEF", 10.0, 5.0, Some(date(2024, 12, 10)));
    seed_batch(&conn, "B2", "ING-BEEF", 10.0, 6.0, Some(date(2024, 12, 20)));
    seed_export(&conn, "E1", "ING-BEEF", "B1", 2.0);
    conn.execute(
        "INSERT INTO order_line (order_line_id, order_id, dish_id, quantity, status, updated_at)
         VALUES ('LINE-1', 'ORD-1', 'DISH-STEW', 2, 'PENDING', '2024-12-01 08:00:00')",
        [],
    )
    .unwrap();

    let before = snapshot_tables(&conn);
    let store = SqliteInventoryStore::new(&conn);
    let validator = AvailabilityValidator::default();

    // 缺口: 需要 25，可用 18
    let rejected = validator
        .validate(&store, &[requirement("ING-BEEF", 25.0)], date(2024, 12, 5))
        .unwrap();
    assert!(!rejected.is_valid);

    let accepted = validator
        .validate(&store, &[requirement("ING-BEEF", 5.0)], date(2024, 12, 5))
        .unwrap();
    assert!(accepted.is_valid);

    assert_eq!(snapshot_tables(&conn), before);
}
