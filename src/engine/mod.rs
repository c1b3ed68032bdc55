// ==========================================
// 加工安装报价系统 - 引擎层
// ==========================================
// 职责: 计价、汇总、草稿重算、编号生成
// 红线: Engine 不拼 SQL；计价与汇总为纯函数
// ==========================================

pub mod aggregator;
pub mod draft;
pub mod identifier;
pub mod pricing;

// 重导出核心引擎
pub use aggregator::{QuoteAggregator, VAT_RATE};
pub use draft::{recompute, recompute_with};
pub use identifier::{
    format_random_id, slugify, IdStrategy, IdentifierGenerator, RetryUntilUniqueSlug,
    UncheckedRandomId,
};
pub use pricing::{coerce_number, ItemPricingCalculator};
