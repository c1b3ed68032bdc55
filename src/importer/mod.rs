// ==========================================
// 加工安装报价系统 - 导入层
// ==========================================
// 职责: 表格批量导入 → 校验 → 分组对账 → 报价落库；导入模板导出
// 支持: Excel (.xlsx/.xls), CSV
// ==========================================

// 模块声明
pub mod customer_reconciler;
pub mod error;
pub mod file_parser;
pub mod quote_importer_impl;
pub mod quote_importer_trait;
pub mod row_validator;
pub mod template;

// 重导出核心类型
pub use customer_reconciler::{group_rows, CustomerReconciler};
pub use error::{ImportError, ImportResult};
pub use file_parser::{
    detect_format, CsvParser, ExcelParser, RowSource, SourceRow, SpreadsheetFormat,
    UniversalFileParser,
};
pub use quote_importer_impl::{BatchContext, ImportOrchestrator, ImportState, PendingQuote};
pub use quote_importer_trait::QuoteImporter;
pub use row_validator::{parse_valid_until, QuoteRowValidator, RowValidator};
pub use template::{TemplateExporter, TemplateFormat};
