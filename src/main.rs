// ==========================================
// 餐厅运营平台 - 库存扣减 主入口
// ==========================================
// 用法: restaurant-inventory [db_path] [--repair] [--json-log]
// 启动时建表（幂等），输出库存概览与对账结果
// ==========================================

use anyhow::{Context, Result};
use restaurant_inventory::app::{get_default_db_path, AppState};
use restaurant_inventory::StockStatus;

fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.iter().any(|a| a == "--json-log") {
        restaurant_inventory::logging::init_json();
    } else {
        restaurant_inventory::logging::init();
    }

    let repair = args.iter().any(|a| a == "--repair");
    let db_path = args
        .iter()
        .find(|a| !a.starts_with("--"))
        .cloned()
        .unwrap_or_else(get_default_db_path);

    tracing::info!("==================================================");
    tracing::info!("{}", restaurant_inventory::APP_NAME);
    tracing::info!("系统版本: {}", restaurant_inventory::VERSION);
    tracing::info!("==================================================");
    tracing::info!("使用数据库: {}", db_path);

    let state = AppState::new(db_path).map_err(anyhow::Error::msg)?;

    let snapshot = state
        .config_manager
        .get_config_snapshot()
        .map_err(|e| anyhow::anyhow!("{}", e))
        .context("读取配置快照失败")?;
    tracing::info!(config = %snapshot, "生效配置");

    // ===== 库存概览 =====
    let ingredients = state.stock_api.list_ingredients()?;
    let low = ingredients
        .iter()
        .filter(|i| i.stock_status == StockStatus::LowStock)
        .count();
    let out = ingredients
        .iter()
        .filter(|i| i.stock_status == StockStatus::OutOfStock)
        .count();
    tracing::info!(total = ingredients.len(), low_stock = low, out_of_stock = out, "库存概览");

    for ingredient in state.stock_api.list_low_stock()? {
        tracing::warn!(
            ingredient_id = %ingredient.ingredient_id,
            name = %ingredient.name,
            stock = ingredient.quantity_in_stock,
            minimum = ingredient.minimum_quantity,
            status = %ingredient.stock_status,
            "需要补货"
        );
    }

    for balance in state.stock_api.expiring_batches(None)? {
        tracing::warn!(
            batch_id = %balance.batch.batch_id,
            ingredient_id = %balance.batch.ingredient_id,
            remaining = balance.remaining,
            expiry_date = ?balance.batch.expiry_date,
            "批次临期"
        );
    }

    // ===== 对账 =====
    let drifts = state.stock_api.reconcile_stock(repair)?;
    if drifts.is_empty() {
        tracing::info!("缓存库存与台账一致");
    } else {
        for drift in &drifts {
            tracing::warn!(
                ingredient_id = %drift.ingredient_id,
                cached = drift.cached_quantity,
                ledger = drift.ledger_quantity,
                repaired = drift.repaired,
                "库存偏差"
            );
        }
        if !repair {
            tracing::warn!("发现 {} 处偏差，使用 --repair 按台账修正", drifts.len());
        }
    }

    Ok(())
}
