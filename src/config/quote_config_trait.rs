// ==========================================
// 加工安装报价系统 - 报价配置读取 Trait
// ==========================================
// 职责: 定义计价/导入所需的配置读取接口（不包含实现）
// 红线: 不包含配置写入、不包含业务逻辑
// ==========================================

use crate::config::settings::QuoteSettings;
use crate::repository::error::RepositoryResult;
use async_trait::async_trait;

// ==========================================
// QuoteConfigReader Trait
// ==========================================
// 实现者: ConfigManager（config_kv 表）、QuoteSettings（静态配置）
#[async_trait]
pub trait QuoteConfigReader: Send + Sync {
    // ===== 计价配置 =====

    /// 增值税率（默认 0.05）
    async fn get_vat_rate(&self) -> RepositoryResult<f64>;

    /// 每件最低计费面积 m²（默认 1.0）
    async fn get_minimum_chargeable_area(&self) -> RepositoryResult<f64>;

    /// 货币代码（默认 AED）
    async fn get_default_currency(&self) -> RepositoryResult<String>;

    // ===== 编号配置 =====

    /// 报价编号前缀（默认 QT）
    async fn get_quote_number_prefix(&self) -> RepositoryResult<String>;

    /// 订单编号前缀（默认 ORD）
    async fn get_order_number_prefix(&self) -> RepositoryResult<String>;

    // ===== 报价有效期 =====

    /// valid_until 缺失时的默认有效天数（默认 30）
    async fn get_quote_validity_days(&self) -> RepositoryResult<i64>;

    /// 一次读取全部配置
    async fn load_settings(&self) -> RepositoryResult<QuoteSettings> {
        Ok(QuoteSettings {
            vat_rate: self.get_vat_rate().await?,
            minimum_chargeable_area: self.get_minimum_chargeable_area().await?,
            default_currency: self.get_default_currency().await?,
            quote_number_prefix: self.get_quote_number_prefix().await?,
            order_number_prefix: self.get_order_number_prefix().await?,
            quote_validity_days: self.get_quote_validity_days().await?,
        })
    }
}
