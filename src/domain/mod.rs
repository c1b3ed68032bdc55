// ==========================================
// 加工安装报价系统 - 领域模型层
// ==========================================
// 职责: 定义领域实体、类型
// 红线: 不含数据访问逻辑,不含计价逻辑
// ==========================================

pub mod customer;
pub mod import;
pub mod quote;
pub mod types;

// 重导出核心类型
pub use customer::{normalize_phone, Customer, NewCustomer};
pub use import::{
    ImportFailure, ImportProgress, ImportReport, ImportStatus, QuoteGroup, QuoteRow, RawRow,
    ValidationError, IMPORT_COLUMNS,
};
pub use quote::{DiscountPolicy, ItemPricing, Quote, QuoteDraft, QuoteItem, QuoteTotals};
pub use types::{CustomerStatus, DiscountType, QuoteStatus};
