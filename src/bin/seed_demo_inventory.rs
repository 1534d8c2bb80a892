// ==========================================
// 餐厅运营平台 - 演示数据初始化
// ==========================================
// 用法: seed_demo_inventory [db_path]
// 备份并重建数据库，写入原料、批次、配方与待制作订单明细
// ==========================================

use chrono::{Duration, Local, NaiveDate};
use rusqlite::Connection;
use std::error::Error;
use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

use restaurant_inventory::app::{get_default_db_path, AppState};
use restaurant_inventory::domain::{DishIngredientRequirement, Ingredient, OrderLine, StockReceipt};
use restaurant_inventory::repository::{IngredientRepository, OrderLineRepository, RecipeRepository};
use restaurant_inventory::OrderLineStatus;

/// (ingredient_id, 名称, 单位, 最低库存, 参考单价)
const INGREDIENTS: [(&str, &str, &str, f64, f64); 6] = [
    ("ING-BEEF", "牛肉", "kg", 5.0, 68.0),
    ("ING-POTATO", "土豆", "kg", 10.0, 4.5),
    ("ING-MILK", "牛奶", "L", 4.0, 12.0),
    ("ING-SALT", "盐", "kg", 0.5, 3.0),
    ("ING-RICE", "大米", "kg", 20.0, 6.0),
    ("ING-FISH", "鲈鱼", "kg", 3.0, 55.0),
];

/// (ingredient_id, 数量, 单价, 距今到期天数；None 为不过期)
const BATCHES: [(&str, f64, f64, Option<i64>); 9] = [
    ("ING-BEEF", 10.0, 65.0, Some(2)),
    ("ING-BEEF", 15.0, 70.0, Some(9)),
    ("ING-POTATO", 40.0, 4.2, Some(20)),
    ("ING-MILK", 6.0, 11.5, Some(1)),
    ("ING-MILK", 12.0, 12.0, Some(6)),
    ("ING-SALT", 5.0, 3.0, None),
    ("ING-RICE", 25.0, 5.8, None),
    ("ING-FISH", 4.0, 52.0, Some(1)),
    ("ING-FISH", 3.0, 58.0, Some(-1)), // 已过期，只出现在台账里
];

/// (dish_id, ingredient_id, 单份用量, 单位)
const RECIPES: [(&str, &str, f64, &str); 9] = [
    ("DISH-STEAK", "ING-BEEF", 0.3, "kg"),
    ("DISH-STEAK", "ING-POTATO", 0.2, "kg"),
    ("DISH-STEAK", "ING-SALT", 0.005, "kg"),
    ("DISH-STEW", "ING-BEEF", 0.2, "kg"),
    ("DISH-STEW", "ING-POTATO", 0.3, "kg"),
    ("DISH-STEW", "ING-MILK", 0.1, "L"),
    ("DISH-FISH-RICE", "ING-FISH", 0.4, "kg"),
    ("DISH-FISH-RICE", "ING-RICE", 0.25, "kg"),
    ("DISH-FISH-RICE", "ING-SALT", 0.004, "kg"),
];

fn main() -> Result<(), Box<dyn Error>> {
    restaurant_inventory::logging::init();

    let db_path = std::env::args().nth(1).unwrap_or_else(get_default_db_path);

    backup_and_reset_db(&db_path)?;

    let state = AppState::new(db_path.clone())?;
    let conn = Arc::new(Mutex::new(restaurant_inventory::db::open_sqlite_connection(&db_path)?));
    let today = Local::now().date_naive();
    let now = Local::now().naive_local();

    let ingredient_repo = IngredientRepository::new(conn.clone());
    for (id, name, unit, minimum, price) in INGREDIENTS {
        ingredient_repo.insert(&Ingredient::new(id, name, unit, minimum, price, now))?;
    }

    for (ingredient_id, quantity, unit_price, days) in BATCHES {
        let receipt = StockReceipt {
            ingredient_id: ingredient_id.to_string(),
            quantity,
            unit_price,
            expiry_date: days.map(|d| offset(today, d)),
        };
        state.stock_api.receive_batch(&receipt)?;
    }

    let recipe_repo = RecipeRepository::new(conn.clone());
    for (dish_id, ingredient_id, quantity_required, unit) in RECIPES {
        recipe_repo.upsert(&DishIngredientRequirement {
            dish_id: dish_id.to_string(),
            ingredient_id: ingredient_id.to_string(),
            quantity_required,
            unit: unit.to_string(),
        })?;
    }

    let order_line_repo = OrderLineRepository::new(conn.clone());
    let order_id = format!("ORD-{}", today.format("%Y%m%d"));
    for (dish_id, quantity) in [("DISH-STEAK", 2u32), ("DISH-STEW", 3), ("DISH-FISH-RICE", 1)] {
        order_line_repo.insert(&OrderLine {
            order_line_id: Uuid::new_v4().to_string(),
            order_id: order_id.clone(),
            dish_id: dish_id.to_string(),
            quantity,
            status: OrderLineStatus::Pending,
            export_id: None,
            updated_at: now,
        })?;
    }

    print_quick_counts(&conn)?;
    eprintln!("Seeded {}", db_path);
    Ok(())
}

fn offset(today: NaiveDate, days: i64) -> NaiveDate {
    today + Duration::days(days)
}

fn backup_and_reset_db(db_path: &str) -> Result<(), Box<dyn Error>> {
    let path = Path::new(db_path);
    if !path.exists() {
        return Ok(());
    }

    let ts = Local::now().format("%Y%m%d_%H%M%S").to_string();
    let backup_path = format!("{}.bak.{}", db_path, ts);
    fs::copy(path, &backup_path)?;
    fs::remove_file(path)?;

    eprintln!("Backed up {} -> {}", db_path, backup_path);
    Ok(())
}

fn print_quick_counts(conn: &Arc<Mutex<Connection>>) -> Result<(), Box<dyn Error>> {
    let conn = conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
    let tables = [
        "ingredient",
        "ingredient_batch",
        "dish_ingredient",
        "order_line",
        "export_record",
        "export_detail",
    ];

    eprintln!("Row counts:");
    for t in tables {
        let sql = format!("SELECT COUNT(*) FROM {}", t);
        let c: i64 = conn.query_row(&sql, [], |row| row.get(0))?;
        eprintln!("  {:<20} {}", t, c);
    }
    Ok(())
}
