// ==========================================
// 餐厅运营平台 - 菜品配方数据仓储
// ==========================================

use crate::domain::recipe::DishIngredientRequirement;
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection, Result as SqliteResult};
use std::sync::{Arc, Mutex};

pub struct RecipeRepository {
    conn: Arc<Mutex<Connection>>,
}

impl RecipeRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 新增或覆盖一条配方行（dish_id + ingredient_id 唯一）
    pub fn upsert(&self, requirement: &DishIngredientRequirement) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO dish_ingredient (dish_id, ingredient_id, quantity_required, unit)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(dish_id, ingredient_id) DO UPDATE SET
                quantity_required = excluded.quantity_required,
                unit = excluded.unit
            "#,
            params![
                requirement.dish_id,
                requirement.ingredient_id,
                requirement.quantity_required,
                requirement.unit,
            ],
        )?;
        Ok(())
    }

    pub fn find_by_dish(&self, dish_id: &str) -> RepositoryResult<Vec<DishIngredientRequirement>> {
        let conn = self.get_conn()?;
        select_recipe(&conn, dish_id)
    }
}

pub(crate) fn select_recipe(
    conn: &Connection,
    dish_id: &str,
) -> RepositoryResult<Vec<DishIngredientRequirement>> {
    let mut stmt = conn.prepare(
        r#"
        SELECT dish_id, ingredient_id, quantity_required, unit
        FROM dish_ingredient
        WHERE dish_id = ?1
        ORDER BY ingredient_id
        "#,
    )?;

    let rows = stmt
        .query_map(params![dish_id], |row| {
            Ok(DishIngredientRequirement {
                dish_id: row.get(0)?,
                ingredient_id: row.get(1)?,
                quantity_required: row.get(2)?,
                unit: row.get(3)?,
            })
        })?
        .collect::<SqliteResult<Vec<DishIngredientRequirement>>>()?;

    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upsert_overwrites_quantity() {
        let conn = crate::db::open_in_memory_with_schema().unwrap();
        let repo = RecipeRepository::new(Arc::new(Mutex::new(conn)));

        let mut row = DishIngredientRequirement {
            dish_id: "DISH-STEAK".to_string(),
            ingredient_id: "ING-BEEF".to_string(),
            quantity_required: 0.3,
            unit: "kg".to_string(),
        };
        repo.upsert(&row).unwrap();
        row.quantity_required = 0.35;
        repo.upsert(&row).unwrap();

        let recipe = repo.find_by_dish("DISH-STEAK").unwrap();
        assert_eq!(recipe, vec![row]);
        assert!(repo.find_by_dish("DISH-NONE").unwrap().is_empty());
    }
}
