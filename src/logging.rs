// ==========================================
// 库存服务 - 日志输出
// ==========================================
// 扣减、入库、对账的关键步骤都挂在 #[instrument] span 上，
// 这里只负责选择输出格式：终端文本 / JSON 行 / 测试捕获
// ==========================================

use tracing_subscriber::{fmt, EnvFilter};

/// 未设置 RUST_LOG 时的过滤器：本 crate 输出 info，依赖库只输出 warn
const DEFAULT_FILTER: &str = "warn,restaurant_inventory=info";

fn env_filter_or(default: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default))
}

/// 终端文本日志（主程序默认）
///
/// 排查某次扣减的批次分配时，可只放开引擎层:
/// `RUST_LOG=restaurant_inventory::engine=debug`
pub fn init() {
    fmt()
        .with_env_filter(env_filter_or(DEFAULT_FILTER))
        .with_target(true)
        .with_line_number(true)
        .init();
}

/// JSON 行日志（主程序 `--json-log`）
///
/// 每行带当前 span 字段（出库单号、下单引用等），便于按单据检索
pub fn init_json() {
    fmt()
        .json()
        .with_env_filter(env_filter_or(DEFAULT_FILTER))
        .with_current_span(true)
        .init();
}

/// 集成测试用：debug 级别，输出交给 libtest 按用例捕获
///
/// 每个测试都会调用，只有第一次生效
pub fn init_test() {
    let _ = fmt()
        .with_env_filter(env_filter_or("debug"))
        .with_test_writer()
        .try_init();
}
