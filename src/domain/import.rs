// ==========================================
// 加工安装报价系统 - 批量导入领域模型
// ==========================================
// 职责: 导入管道中间产物与导入报告
// 生命周期: 仅在单个导入批次内
// ==========================================

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// 原始行记录（列名 → 单元格文本）
pub type RawRow = HashMap<String, String>;

/// 导入模板列（顺序即模板导出顺序）
pub const IMPORT_COLUMNS: [&str; 11] = [
    "customer_name",
    "customer_phone",
    "customer_email",
    "location",
    "type",
    "height",
    "width",
    "qty",
    "unit_price",
    "remarks",
    "valid_until",
];

// ==========================================
// QuoteRow - 校验通过的导入行
// ==========================================
// 用途: 行校验 → 分组对账之间的类型化中间结构
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuoteRow {
    pub row_number: usize, // 表格行号（表头为第 1 行）

    // 客户字段
    pub customer_name: String,
    pub customer_phone: String, // 已 TRIM
    pub customer_email: Option<String>,

    // 明细字段
    pub location: String,
    pub item_type: String,
    pub height: f64,
    pub width: f64,
    pub qty: u32,
    pub unit_price: f64,

    // 报价字段（仅分组首行生效）
    pub remarks: Option<String>,
    pub valid_until: Option<NaiveDate>,
}

// ==========================================
// ValidationError - 字段级校验错误
// ==========================================
// 逐条累积，从不单独抛出
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[error("第 {row} 行 [{field}]: {message}")]
pub struct ValidationError {
    pub row: usize,
    pub field: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(row: usize, field: &str, message: impl Into<String>) -> Self {
        Self {
            row,
            field: field.to_string(),
            message: message.into(),
        }
    }
}

// ==========================================
// ImportFailure - 批次错误条目
// ==========================================
// 任何失败都降级为此列表中的一条，不会中断进程
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ImportFailure {
    /// 行校验失败（批次整体放弃落库）
    #[error("行校验失败: {0}")]
    RowValidation(ValidationError),

    /// 客户查找/创建或报价编号生成失败（该分组报价放弃，批次继续）
    #[error("客户对账失败 (分组 {group}, phone={phone}): {message}")]
    Reconciliation {
        group: usize,
        phone: String,
        message: String,
    },

    /// 报价写入失败（仅该报价失败，批次继续）
    #[error("报价落库失败 (分组 {group}, phone={phone}, quote_number={quote_number}): {message}")]
    Persistence {
        group: usize,
        phone: String,
        quote_number: String,
        message: String,
    },

    /// 文件无法解析
    #[error("文件解析失败: {message}")]
    Parse { message: String },
}

impl ImportFailure {
    pub fn is_validation(&self) -> bool {
        matches!(self, ImportFailure::RowValidation(_))
    }

    pub fn is_reconciliation(&self) -> bool {
        matches!(self, ImportFailure::Reconciliation { .. })
    }

    pub fn is_persistence(&self) -> bool {
        matches!(self, ImportFailure::Persistence { .. })
    }
}

// ==========================================
// ImportStatus - 批次终态
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ImportStatus {
    Completed,        // 已完成落库阶段（可能部分失败）
    ValidationFailed, // 存在行校验错误，零落库
    Empty,            // 文件无数据行
    ParseFailed,      // 文件无法解析
}

// ==========================================
// ImportReport - 导入报告
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportReport {
    pub batch_id: String,
    pub status: ImportStatus,
    pub total_rows: usize,
    pub total_groups: usize,
    pub success_count: usize,
    pub quote_numbers: Vec<String>, // 成功落库的报价编号（按落库顺序）
    pub errors: Vec<ImportFailure>,
    pub elapsed_ms: u64,
}

impl ImportReport {
    /// 校验错误明细
    pub fn validation_errors(&self) -> Vec<&ValidationError> {
        self.errors
            .iter()
            .filter_map(|e| match e {
                ImportFailure::RowValidation(v) => Some(v),
                _ => None,
            })
            .collect()
    }
}

// ==========================================
// ImportProgress - 落库进度
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ImportProgress {
    pub persisted: usize,
    pub failed: usize,
    pub total: usize,
}

impl ImportProgress {
    pub fn is_finished(&self) -> bool {
        self.persisted + self.failed >= self.total
    }
}

// ==========================================
// QuoteGroup - 按电话分组的待建报价
// ==========================================
// 首行决定客户名称/邮箱/备注/有效期，后续行只贡献明细
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuoteGroup {
    pub phone: String,
    pub customer_name: String,
    pub customer_email: Option<String>,
    pub remarks: Option<String>,
    pub valid_until: Option<NaiveDate>,
    pub first_row: usize,
    pub rows: Vec<QuoteRow>,
}
