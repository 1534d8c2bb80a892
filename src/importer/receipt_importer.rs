// ==========================================
// 餐厅运营平台 - 入库单 CSV 导入
// ==========================================
// 流程: 文件读取 → 表头检查 → 逐行转换与校验（收集全部行错误）
// 列: ingredient_id, quantity, unit_price, expiry_date(可空)
// 落库由 StockApi 在单个事务内完成；任一行有错则整批不导入
// ==========================================

use crate::domain::ingredient::{Batch, StockReceipt};
use crate::importer::error::{ImportError, ImportResult};
use chrono::NaiveDate;
use csv::ReaderBuilder;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::fs::File;
use std::path::Path;

pub const REQUIRED_COLUMNS: [&str; 3] = ["ingredient_id", "quantity", "unit_price"];
pub const EXPIRY_COLUMN: &str = "expiry_date";

// ==========================================
// 行级校验结果
// ==========================================

/// 单行校验问题（行号从 1 开始，不含表头）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowViolation {
    pub row_number: usize,
    pub field: String,
    pub message: String,
}

impl RowViolation {
    pub fn new(row_number: usize, field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            row_number,
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for RowViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "行 {} [{}]: {}", self.row_number, self.field, self.message)
    }
}

/// 解析出的入库行
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedReceipt {
    pub row_number: usize,
    pub receipt: StockReceipt,
}

/// 文件解析结果
#[derive(Debug, Clone, Default)]
pub struct ParsedReceipts {
    pub total_rows: usize,
    pub receipts: Vec<ParsedReceipt>,
    pub violations: Vec<RowViolation>,
}

impl ParsedReceipts {
    pub fn is_clean(&self) -> bool {
        self.violations.is_empty()
    }
}

/// 导入报告
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReceiptImportReport {
    pub import_id: String,
    pub file_name: String,
    pub total_rows: usize,
    pub batches: Vec<Batch>,
    pub total_quantity_by_ingredient: HashMap<String, f64>,
    pub elapsed_ms: u64,
}

// ==========================================
// ReceiptCsvImporter
// ==========================================
#[derive(Debug, Clone, Copy, Default)]
pub struct ReceiptCsvImporter;

impl ReceiptCsvImporter {
    pub fn new() -> Self {
        Self
    }

    /// 读取并校验入库单 CSV（不访问数据库）
    ///
    /// # 返回
    /// - Err: 文件级错误（不存在、格式、缺列、CSV 结构损坏）
    /// - Ok(ParsedReceipts): 行级错误收集在 violations 中
    pub fn parse_file(&self, file_path: &Path) -> ImportResult<ParsedReceipts> {
        if !file_path.exists() {
            return Err(ImportError::FileNotFound(file_path.display().to_string()));
        }

        let ext = file_path.extension().and_then(|e| e.to_str()).unwrap_or("");
        if !ext.eq_ignore_ascii_case("csv") {
            return Err(ImportError::UnsupportedFormat(ext.to_string()));
        }

        let file = File::open(file_path)?;
        let parsed = self.parse_reader(file)?;

        tracing::info!(
            file = %file_path.display(),
            total_rows = parsed.total_rows,
            valid = parsed.receipts.len(),
            violations = parsed.violations.len(),
            "入库单解析完成"
        );
        Ok(parsed)
    }

    /// 从任意 reader 解析（测试与内存数据使用）
    pub fn parse_reader<R: std::io::Read>(&self, reader: R) -> ImportResult<ParsedReceipts> {
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers: Vec<String> = reader
            .headers()?
            .iter()
            .map(|h| h.trim().to_ascii_lowercase())
            .collect();

        for column in REQUIRED_COLUMNS {
            if !headers.iter().any(|h| h == column) {
                return Err(ImportError::MissingColumn(column.to_string()));
            }
        }

        let mut parsed = ParsedReceipts::default();
        for (idx, result) in reader.records().enumerate() {
            let record = result?;
            let row_number = idx + 1;

            let row: HashMap<&str, &str> = headers
                .iter()
                .map(String::as_str)
                .zip(record.iter())
                .collect();

            // 跳过完全空白的行
            if row.values().all(|v| v.is_empty()) {
                continue;
            }
            parsed.total_rows += 1;

            match convert_row(row_number, &row) {
                Ok(receipt) => parsed.receipts.push(ParsedReceipt { row_number, receipt }),
                Err(mut violations) => parsed.violations.append(&mut violations),
            }
        }

        Ok(parsed)
    }
}

/// 单行转换；返回该行的全部问题
fn convert_row(row_number: usize, row: &HashMap<&str, &str>) -> Result<StockReceipt, Vec<RowViolation>> {
    let mut violations = Vec::new();
    let field = |name: &str| row.get(name).copied().unwrap_or("");

    let ingredient_id = field("ingredient_id");
    if ingredient_id.is_empty() {
        violations.push(RowViolation::new(row_number, "ingredient_id", "原料编号为空"));
    }

    let quantity = match parse_f64(field("quantity")) {
        Some(q) if q > 0.0 => Some(q),
        Some(q) => {
            violations.push(RowViolation::new(row_number, "quantity", format!("入库数量必须大于 0: {}", q)));
            None
        }
        None => {
            violations.push(RowViolation::new(
                row_number,
                "quantity",
                format!("无法解析为数字: '{}'", field("quantity")),
            ));
            None
        }
    };

    let unit_price = match parse_f64(field("unit_price")) {
        Some(p) if p >= 0.0 => Some(p),
        Some(p) => {
            violations.push(RowViolation::new(row_number, "unit_price", format!("单价不能为负: {}", p)));
            None
        }
        None => {
            violations.push(RowViolation::new(
                row_number,
                "unit_price",
                format!("无法解析为数字: '{}'", field("unit_price")),
            ));
            None
        }
    };

    let raw_expiry = field(EXPIRY_COLUMN);
    let expiry_date = if raw_expiry.is_empty() {
        Ok(None)
    } else {
        parse_date(raw_expiry).map(Some).ok_or_else(|| {
            RowViolation::new(
                row_number,
                EXPIRY_COLUMN,
                format!("日期格式错误，期望 YYYY-MM-DD 或 YYYYMMDD: '{}'", raw_expiry),
            )
        })
    };
    let expiry_date = match expiry_date {
        Ok(d) => d,
        Err(v) => {
            violations.push(v);
            None
        }
    };

    match (quantity, unit_price) {
        (Some(quantity), Some(unit_price)) if violations.is_empty() => Ok(StockReceipt {
            ingredient_id: ingredient_id.to_string(),
            quantity,
            unit_price,
            expiry_date,
        }),
        _ => Err(violations),
    }
}

fn parse_f64(raw: &str) -> Option<f64> {
    raw.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// 支持 YYYY-MM-DD 与 YYYYMMDD
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(raw, "%Y%m%d"))
        .ok()
}
