// ==========================================
// 餐厅运营平台 - 菜品需求展开引擎
// ==========================================
// 职责: (菜品, 份数) → 原料需求量（配方用量 × 份数）
// 默认: 不跨下单项合并同一原料，每行独立校验
//       merge_duplicates=true 时按原料汇总（配置项 inventory_merge_duplicate_requirements）
// ==========================================

use crate::domain::recipe::{IngredientRequirement, OrderItem};
use crate::repository::error::RepositoryResult;
use crate::repository::inventory_store::InventoryStore;
use tracing::instrument;

#[derive(Debug, Clone, Default)]
pub struct DishRequirementResolver {
    merge_duplicates: bool,
}

impl DishRequirementResolver {
    pub fn new(merge_duplicates: bool) -> Self {
        Self { merge_duplicates }
    }

    /// 展开下单项为原料需求
    ///
    /// # 说明
    /// - 无配方的菜品不产生需求（记 warn 日志）
    /// - 输出顺序：按下单项顺序，同一菜品内按 ingredient_id
    #[instrument(skip(self, store, items), fields(items_count = items.len(), merge = self.merge_duplicates))]
    pub fn resolve<S: InventoryStore + ?Sized>(
        &self,
        store: &S,
        items: &[OrderItem],
    ) -> RepositoryResult<Vec<IngredientRequirement>> {
        let mut requirements: Vec<IngredientRequirement> = Vec::new();

        for item in items {
            let recipe = store.find_recipe(&item.dish_id)?;
            if recipe.is_empty() {
                tracing::warn!(dish_id = %item.dish_id, "菜品无配方，不产生原料需求");
                continue;
            }

            for row in recipe {
                let required_quantity = row.quantity_required * f64::from(item.quantity);

                if self.merge_duplicates {
                    if let Some(existing) = requirements
                        .iter_mut()
                        .find(|r| r.ingredient_id == row.ingredient_id)
                    {
                        existing.required_quantity += required_quantity;
                        if !existing.dish_id.split(',').any(|d| d == item.dish_id) {
                            existing.dish_id = format!("{},{}", existing.dish_id, item.dish_id);
                        }
                        continue;
                    }
                }

                requirements.push(IngredientRequirement {
                    ingredient_id: row.ingredient_id,
                    required_quantity,
                    unit: row.unit,
                    dish_id: item.dish_id.clone(),
                });
            }
        }

        tracing::debug!(requirements_count = requirements.len(), "需求展开完成");
        Ok(requirements)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::test_support::*;
    use crate::repository::SqliteInventoryStore;

    fn seed_menu(conn: &rusqlite::Connection) {
        seed_recipe(conn, "DISH-STEAK", "ING-BEEF", 0.3);
        seed_recipe(conn, "DISH-STEAK", "ING-SALT", 0.005);
        seed_recipe(conn, "DISH-STEW", "ING-BEEF", 0.2);
    }

    #[test]
    fn test_resolve_multiplies_by_ordered_quantity() {
        let conn = setup_conn();
        seed_menu(&conn);
        let store = SqliteInventoryStore::new(&conn);

        let reqs = DishRequirementResolver::default()
            .resolve(&store, &[OrderItem::new("DISH-STEAK", 4)])
            .unwrap();

        assert_eq!(reqs.len(), 2);
        assert_eq!(reqs[0].ingredient_id, "ING-BEEF");
        assert!((reqs[0].required_quantity - 1.2).abs() < 1e-9);
        assert_eq!(reqs[1].ingredient_id, "ING-SALT");
        assert!((reqs[1].required_quantity - 0.02).abs() < 1e-9);
    }

    #[test]
    fn test_duplicate_ingredients_stay_separate_by_default() {
        let conn = setup_conn();
        seed_menu(&conn);
        let store = SqliteInventoryStore::new(&conn);

        let reqs = DishRequirementResolver::default()
            .resolve(
                &store,
                &[OrderItem::new("DISH-STEAK", 1), OrderItem::new("DISH-STEW", 2)],
            )
            .unwrap();

        let beef: Vec<&IngredientRequirement> =
            reqs.iter().filter(|r| r.ingredient_id == "ING-BEEF").collect();
        assert_eq!(beef.len(), 2);
        assert_eq!(beef[0].dish_id, "DISH-STEAK");
        assert_eq!(beef[1].dish_id, "DISH-STEW");
    }

    #[test]
    fn test_merge_duplicates_sums_per_ingredient() {
        let conn = setup_conn();
        seed_menu(&conn);
        let store = SqliteInventoryStore::new(&conn);

        let reqs = DishRequirementResolver::new(true)
            .resolve(
                &store,
                &[OrderItem::new("DISH-STEAK", 1), OrderItem::new("DISH-STEW", 2)],
            )
            .unwrap();

        assert_eq!(reqs.len(), 2);
        let beef = reqs.iter().find(|r| r.ingredient_id == "ING-BEEF").unwrap();
        assert!((beef.required_quantity - 0.7).abs() < 1e-9);
        assert_eq!(beef.dish_id, "DISH-STEAK,DISH-STEW");
    }

    #[test]
    fn test_dish_without_recipe_yields_nothing() {
        let conn = setup_conn();
        let store = SqliteInventoryStore::new(&conn);

        let reqs = DishRequirementResolver::default()
            .resolve(&store, &[OrderItem::new("DISH-WATER", 3)])
            .unwrap();
        assert!(reqs.is_empty());
    }
}
