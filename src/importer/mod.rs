// ==========================================
// 餐厅运营平台 - 导入层
// ==========================================
// 职责: 外部入库单导入（CSV），产出经过校验的入库行
// ==========================================

pub mod error;
pub mod receipt_importer;

// 重导出核心类型
pub use error::{ImportError, ImportResult};
pub use receipt_importer::{
    ParsedReceipt, ParsedReceipts, ReceiptCsvImporter, ReceiptImportReport, RowViolation,
};
