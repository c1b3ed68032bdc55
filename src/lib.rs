// ==========================================
// 加工安装报价系统 - 核心库
// ==========================================
// 系统定位: 加工/安装报价计价 + 表格批量导入对账
// 技术栈: Rust + SQLite
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 数据访问
pub mod repository;

// 引擎层 - 计价/汇总/编号
pub mod engine;

// 导入层 - 表格批量导入
pub mod importer;

// 配置层 - 系统配置
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一）
pub mod db;

// 日志系统
pub mod logging;

// API 层 - 业务接口
pub mod api;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{CustomerStatus, DiscountType, QuoteStatus};

// 领域实体
pub use domain::{
    Customer, DiscountPolicy, ImportFailure, ImportProgress, ImportReport, ImportStatus, Quote,
    QuoteDraft, QuoteItem, QuoteTotals, ValidationError,
};

// 引擎
pub use engine::{
    recompute, IdentifierGenerator, ItemPricingCalculator, QuoteAggregator, RetryUntilUniqueSlug,
    UncheckedRandomId,
};

// 导入
pub use importer::{ImportOrchestrator, QuoteImporter, TemplateExporter};

// API
pub use api::{ImportApi, QuoteApi};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "加工安装报价系统";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
