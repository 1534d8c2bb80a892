// ==========================================
// 扣减全流程集成测试
// ==========================================
// 职责: 验证 展开 → 校验 → FIFO 执行 → 落账 的端到端行为
// ==========================================


#[cfg(test)]
mod deduction_flow_test {
    use std::sync::Arc;

    use restaurant_inventory::app::AppState;
    use restaurant_inventory::domain::ShortfallReason;
    use restaurant_inventory::engine::{CollectingEventPublisher, StockEventPublisher, StockEventType};
    use restaurant_inventory::repository::IngredientRepository;
    use restaurant_inventory::{ApiError, OrderItem, OrderLineStatus, StockStatus};

    use crate::test_helpers::*;

    // ==========================================
    // 测试1: FIFO 跨批次扣减
    // ==========================================

    #[test]
    fn test_deduction_spans_batches_in_expiry_order() {
        let (_temp_file, _db_path, state, conn) = setup_test_env();
        let (b1, b2) = seed_beef_scenario(&state, &conn);

        let receipt = state
            .inventory_api
            .deduct_for_items_at(&[OrderItem::new("DISH-STEW", 15)], "ORD-1", noon(2024, 12, 5))
            .unwrap();

        // 1. 出库单
        assert_eq!(receipt.record.export_number, "PX-20241205-0001");
        assert_eq!(receipt.record.order_ref, "ORD-1");
        assert_approx(receipt.record.total_cost, 80.0);

        // 2. 明细: 先耗尽 B1，再从 B2 取 5
        assert_eq!(receipt.details.len(), 2);
        assert_eq!(receipt.details[0].batch_id, b1);
        assert_approx(receipt.details[0].quantity, 10.0);
        assert_approx(receipt.details[0].line_total, 50.0);
        assert_eq!(receipt.details[1].batch_id, b2);
        assert_approx(receipt.details[1].quantity, 5.0);
        assert_approx(receipt.details[1].line_total, 30.0);

        // 3. 批次剩余
        assert_approx(state.inventory_api.batch_remaining(&b1).unwrap(), 0.0);
        assert_approx(state.inventory_api.batch_remaining(&b2).unwrap(), 5.0);

        // 4. 缓存库存与状态
        let beef = IngredientRepository::new(conn.clone())
            .find_by_id("ING-BEEF")
            .unwrap()
            .unwrap();
        assert_approx(beef.quantity_in_stock, 5.0);
        assert_eq!(beef.stock_status, StockStatus::LowStock);

        assert_eq!(count_rows(&conn, "export_record"), 1);
        assert_eq!(count_rows(&conn, "export_detail"), 2);
    }

    #[test]
    fn test_get_export_returns_persisted_details() {
        let (_temp_file, _db_path, state, conn) = setup_test_env();
        seed_beef_scenario(&state, &conn);

        let receipt = state
            .inventory_api
            .deduct_for_items_at(&[OrderItem::new("DISH-STEW", 12)], "ORD-2", noon(2024, 12, 5))
            .unwrap();

        let view = state.inventory_api.get_export(&receipt.record.export_id).unwrap();
        assert_eq!(view.record, receipt.record);
        assert_eq!(view.details, receipt.details);

        let detail_sum: f64 = view.details.iter().map(|d| d.line_total).sum();
        assert_approx(view.record.total_cost, detail_sum);

        let missing = state.inventory_api.get_export("no-such-export");
        assert!(matches!(missing, Err(ApiError::NotFound(_))));
    }

    #[test]
    fn test_list_exports_by_order_ref_and_numbering() {
        let (_temp_file, _db_path, state, conn) = setup_test_env();
        seed_beef_scenario(&state, &conn);

        let api = &state.inventory_api;
        api.deduct_for_items_at(&[OrderItem::new("DISH-STEW", 2)], "TABLE-7", noon(2024, 12, 5))
            .unwrap();
        api.deduct_for_items_at(&[OrderItem::new("DISH-STEW", 3)], "TABLE-8", noon(2024, 12, 5))
            .unwrap();
        api.deduct_for_items_at(&[OrderItem::new("DISH-STEW", 1)], "TABLE-7", noon(2024, 12, 5))
            .unwrap();

        let records = api.list_exports_by_order_ref("TABLE-7").unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].export_number, "PX-20241205-0001");
        assert_eq!(records[1].export_number, "PX-20241205-0003");

        assert!(api.list_exports_by_order_ref("TABLE-9").unwrap().is_empty());
    }

    // ==========================================
    // 测试2: 库存不足拒绝（全部缺口、零写入）
    // ==========================================

    #[test]
    fn test_insufficient_stock_lists_every_shortfall_and_writes_nothing() {
        let (_temp_file, _db_path, state, conn) = setup_test_env();
        seed_beef_scenario(&state, &conn);
        seed_ingredient(&conn, "ING-POTATO", "土豆", "kg", 2.0);
        seed_recipe(&conn, "DISH-MASH", "ING-POTATO", 0.5);
        state
            .stock_api
            .receive_batch_at(&receipt("ING-POTATO", 1.0, 4.0, None), noon(2024, 12, 1))
            .unwrap();

        let items = [OrderItem::new("DISH-STEW", 25), OrderItem::new("DISH-MASH", 10)];
        let err = state
            .inventory_api
            .deduct_for_items_at(&items, "ORD-BIG", noon(2024, 12, 5))
            .unwrap_err();

        match err {
            ApiError::InsufficientStock { shortfalls } => {
                assert_eq!(shortfalls.len(), 2);
                assert_eq!(shortfalls[0].ingredient_id, "ING-BEEF");
                assert_approx(shortfalls[0].required, 25.0);
                assert_approx(shortfalls[0].available, 20.0);
                assert_eq!(shortfalls[0].reason, ShortfallReason::InsufficientStock);
                assert_eq!(shortfalls[1].ingredient_id, "ING-POTATO");
                assert_approx(shortfalls[1].required, 5.0);
                assert_approx(shortfalls[1].available, 1.0);
            }
            other => panic!("expected InsufficientStock, got {:?}", other),
        }

        assert_eq!(count_rows(&conn, "export_record"), 0);
        assert_eq!(count_rows(&conn, "export_detail"), 0);
        let beef = IngredientRepository::new(conn.clone())
            .find_by_id("ING-BEEF")
            .unwrap()
            .unwrap();
        assert_approx(beef.quantity_in_stock, 20.0);
    }

    #[test]
    fn test_recipe_referencing_unknown_ingredient_is_rejected() {
        let (_temp_file, _db_path, state, conn) = setup_test_env();
        seed_beef_scenario(&state, &conn);
        seed_recipe(&conn, "DISH-STEW", "ING-TRUFFLE", 0.01);

        let err = state
            .inventory_api
            .deduct_for_items_at(&[OrderItem::new("DISH-STEW", 1)], "ORD-3", noon(2024, 12, 5))
            .unwrap_err();

        match err {
            ApiError::InsufficientStock { shortfalls } => {
                assert_eq!(shortfalls.len(), 1);
                assert_eq!(shortfalls[0].ingredient_id, "ING-TRUFFLE");
                assert_eq!(shortfalls[0].reason, ShortfallReason::IngredientNotFound);
            }
            other => panic!("expected InsufficientStock, got {:?}", other),
        }
        assert_eq!(count_rows(&conn, "export_record"), 0);
    }

    // ==========================================
    // 测试3: 校验只读
    // ==========================================

    #[test]
    fn test_validate_and_prepare_is_read_only() {
        let (_temp_file, _db_path, state, conn) = setup_test_env();
        let (b1, _b2) = seed_beef_scenario(&state, &conn);
        seed_order_line(&conn, "LINE-1", "DISH-STEW", 3, OrderLineStatus::Pending);
        state
            .inventory_api
            .deduct_for_items_at(&[OrderItem::new("DISH-STEW", 2)], "ORD-EARLIER", noon(2024, 12, 3))
            .unwrap();

        let before = snapshot_tables(&conn);
        assert!(before.iter().any(|row| row.starts_with("export_detail|")));

        // 可用 18：15 通过，25 被拒
        let check = state
            .inventory_api
            .validate_and_prepare_deduction_as_of(&[OrderItem::new("DISH-STEW", 15)], date(2024, 12, 5))
            .unwrap();
        assert!(check.is_valid);
        assert!(check.shortfalls.is_empty());
        assert_eq!(check.plan.len(), 1);
        assert_eq!(check.plan[0].ingredient_name, "牛肉");
        assert_approx(check.total_required_for("ING-BEEF"), 15.0);

        let rejected = state
            .inventory_api
            .validate_and_prepare_deduction_as_of(&[OrderItem::new("DISH-STEW", 25)], date(2024, 12, 5))
            .unwrap();
        assert!(!rejected.is_valid);
        assert_approx(rejected.shortfalls[0].available, 18.0);

        assert_eq!(snapshot_tables(&conn), before);
        assert_approx(state.inventory_api.batch_remaining(&b1).unwrap(), 8.0);
    }

    #[test]
    fn test_expired_batch_is_not_available() {
        let (_temp_file, _db_path, state, conn) = setup_test_env();
        seed_beef_scenario(&state, &conn);

        // 12-15 时 B1 已过期，只剩 B2 的 10
        let check = state
            .inventory_api
            .validate_and_prepare_deduction_as_of(&[OrderItem::new("DISH-STEW", 15)], date(2024, 12, 15))
            .unwrap();

        assert!(!check.is_valid);
        assert_eq!(check.shortfalls.len(), 1);
        assert_approx(check.shortfalls[0].available, 10.0);

        let batches = state
            .inventory_api
            .available_batches_as_of("ING-BEEF", date(2024, 12, 15))
            .unwrap();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].batch.expiry_date, Some(date(2024, 12, 20)));
    }

    #[test]
    fn test_invalid_items_are_rejected() {
        let (_temp_file, _db_path, state, conn) = setup_test_env();
        seed_beef_scenario(&state, &conn);

        let api = &state.inventory_api;
        assert!(matches!(
            api.validate_and_prepare_deduction_as_of(&[], date(2024, 12, 5)),
            Err(ApiError::InvalidInput(_))
        ));
        assert!(matches!(
            api.validate_and_prepare_deduction_as_of(&[OrderItem::new("DISH-STEW", 0)], date(2024, 12, 5)),
            Err(ApiError::InvalidInput(_))
        ));
        assert!(matches!(
            api.deduct_for_items_at(&[OrderItem::new("DISH-STEW", 1)], "  ", noon(2024, 12, 5)),
            Err(ApiError::InvalidInput(_))
        ));
    }

    // ==========================================
    // 测试4: 过时计划
    // ==========================================

    #[test]
    fn test_stale_plan_raises_consistency_and_rolls_back() {
        let (_temp_file, _db_path, state, conn) = setup_test_env();
        seed_beef_scenario(&state, &conn);

        let api = &state.inventory_api;
        let check = api
            .validate_and_prepare_deduction_as_of(&[OrderItem::new("DISH-STEW", 15)], date(2024, 12, 5))
            .unwrap();
        assert!(check.is_valid);

        // 校验与执行之间被其他订单消耗 10
        api.deduct_for_items_at(&[OrderItem::new("DISH-STEW", 10)], "ORD-FIRST", noon(2024, 12, 5))
            .unwrap();

        let err = api
            .execute_deduction_at(&check.plan, "ORD-STALE", noon(2024, 12, 5))
            .unwrap_err();
        assert!(matches!(err, ApiError::Consistency(_)), "got {:?}", err);

        assert_eq!(count_rows(&conn, "export_record"), 1);
        assert!(api.list_exports_by_order_ref("ORD-STALE").unwrap().is_empty());
        let beef = IngredientRepository::new(conn.clone())
            .find_by_id("ING-BEEF")
            .unwrap()
            .unwrap();
        assert_approx(beef.quantity_in_stock, 10.0);
    }

    #[test]
    fn test_execute_deduction_with_fresh_plan() {
        let (_temp_file, _db_path, state, conn) = setup_test_env();
        seed_beef_scenario(&state, &conn);

        let api = &state.inventory_api;
        let check = api
            .validate_and_prepare_deduction_as_of(&[OrderItem::new("DISH-STEW", 4)], date(2024, 12, 5))
            .unwrap();
        let record = api.execute_deduction_at(&check.plan, "ORD-4", noon(2024, 12, 5)).unwrap();

        assert_approx(record.total_cost, 20.0);
        assert_eq!(record.export_date, date(2024, 12, 5));
    }

    // ==========================================
    // 测试5: 事件发布
    // ==========================================

    #[test]
    fn test_events_published_after_commit() {
        let (_temp_file, db_path) = create_test_db().unwrap();
        let collector = Arc::new(CollectingEventPublisher::new());
        let state =
            AppState::with_publisher(db_path.clone(), Some(collector.clone() as Arc<dyn StockEventPublisher>))
                .unwrap();
        let conn = open_test_connection(&db_path).unwrap();
        seed_beef_scenario(&state, &conn);

        state
            .inventory_api
            .deduct_for_items_at(&[OrderItem::new("DISH-STEW", 15)], "ORD-EV", noon(2024, 12, 5))
            .unwrap();

        let types: Vec<StockEventType> = collector.events().iter().map(|e| e.event_type).collect();
        assert_eq!(
            types,
            vec![
                StockEventType::StockReceived,
                StockEventType::StockReceived,
                StockEventType::StockDeducted,
                StockEventType::LowStock,
            ]
        );

        let deducted = &collector.events()[2];
        assert_eq!(deducted.ingredient_ids, vec!["ING-BEEF".to_string()]);
        assert_eq!(deducted.reference.as_deref(), Some("PX-20241205-0001"));

        // 被拒绝的扣减不发布事件
        let _ = state
            .inventory_api
            .deduct_for_items_at(&[OrderItem::new("DISH-STEW", 50)], "ORD-EV", noon(2024, 12, 5));
        assert_eq!(collector.events().len(), 4);
    }
}
