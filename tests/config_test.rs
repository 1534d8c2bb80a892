// ==========================================
// ConfigManager 集成测试
// ==========================================
// 测试目标: 验证配置项对扣减行为的影响
// ==========================================


#[cfg(test)]
mod config_test {
    use restaurant_inventory::config::{config_keys, ConfigManager};
    use restaurant_inventory::{ApiError, OrderItem};

    use crate::test_helpers::*;

    #[test]
    fn test_config_manager_creation() {
        let (_temp_file, db_path) = create_test_db().expect("Failed to create test db");

        let config_manager = ConfigManager::new(&db_path);
        assert!(config_manager.is_ok(), "ConfigManager should be created successfully");

        let settings = config_manager.unwrap().load_deduction_settings().unwrap();
        assert_eq!(settings.export_number_prefix, "PX");
        assert!(!settings.merge_duplicate_requirements);
        assert_eq!(settings.expiry_warning_days, 3);
    }

    #[test]
    fn test_export_number_prefix_is_configurable() {
        let (_temp_file, _db_path, state, conn) = setup_test_env();
        seed_beef_scenario(&state, &conn);

        state
            .config_manager
            .set_global_config_value(config_keys::EXPORT_NUMBER_PREFIX, "KITCHEN")
            .unwrap();

        let receipt = state
            .inventory_api
            .deduct_for_items_at(&[OrderItem::new("DISH-STEW", 1)], "ORD-CFG", noon(2024, 12, 5))
            .unwrap();
        assert_eq!(receipt.record.export_number, "KITCHEN-20241205-0001");
    }

    #[test]
    fn test_merge_flag_changes_validation() {
        let (_temp_file, _db_path, state, conn) = setup_test_env();
        seed_beef_scenario(&state, &conn);
        seed_recipe(&conn, "DISH-STEAK", "ING-BEEF", 0.5);

        // 牛肉需求 12 + 9 = 21，库存 20
        let items = [OrderItem::new("DISH-STEW", 12), OrderItem::new("DISH-STEAK", 18)];

        // 默认不合并：逐条校验都通过，执行阶段分配不足
        let check = state
            .inventory_api
            .validate_and_prepare_deduction_as_of(&items, date(2024, 12, 5))
            .unwrap();
        assert!(check.is_valid);
        assert_eq!(check.plan.len(), 2);

        let err = state
            .inventory_api
            .deduct_for_items_at(&items, "ORD-UNMERGED", noon(2024, 12, 5))
            .unwrap_err();
        assert!(matches!(err, ApiError::Consistency(_)), "got {:?}", err);
        assert_eq!(count_rows(&conn, "export_record"), 0);

        // 开启合并：校验阶段即发现缺口
        state
            .config_manager
            .set_global_config_value(config_keys::MERGE_DUPLICATE_REQUIREMENTS, "true")
            .unwrap();

        let check = state
            .inventory_api
            .validate_and_prepare_deduction_as_of(&items, date(2024, 12, 5))
            .unwrap();
        assert!(!check.is_valid);
        assert_eq!(check.shortfalls.len(), 1);
        assert_approx(check.shortfalls[0].required, 21.0);
        assert_approx(check.shortfalls[0].available, 20.0);
    }

    #[test]
    fn test_expiry_warning_days_drives_default_window() {
        let (_temp_file, _db_path, state, conn) = setup_test_env();
        seed_beef_scenario(&state, &conn);

        // 默认 3 天：12-06 看不到 12-10 到期的 B1
        assert!(state
            .stock_api
            .expiring_batches_as_of(None, date(2024, 12, 6))
            .unwrap()
            .is_empty());

        state
            .config_manager
            .set_global_config_value(config_keys::EXPIRY_WARNING_DAYS, "4")
            .unwrap();
        let expiring = state
            .stock_api
            .expiring_batches_as_of(None, date(2024, 12, 6))
            .unwrap();
        assert_eq!(expiring.len(), 1);
        assert_eq!(expiring[0].batch.expiry_date, Some(date(2024, 12, 10)));
    }
}
