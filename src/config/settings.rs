// ==========================================
// 加工安装报价系统 - 报价配置值
// ==========================================

use crate::config::quote_config_trait::QuoteConfigReader;
use crate::engine::aggregator::VAT_RATE;
use crate::engine::identifier::{ORDER_NUMBER_PREFIX, QUOTE_NUMBER_PREFIX};
use crate::repository::error::RepositoryResult;
use async_trait::async_trait;
use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

pub const DEFAULT_MINIMUM_CHARGEABLE_AREA: f64 = 1.0;
pub const DEFAULT_QUOTE_VALIDITY_DAYS: i64 = 30;
pub const MAX_QUOTE_VALIDITY_DAYS: i64 = 36_500;
pub const DEFAULT_CURRENCY: &str = "AED";

/// 计价与导入配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuoteSettings {
    pub vat_rate: f64,
    pub minimum_chargeable_area: f64,
    pub default_currency: String,
    pub quote_number_prefix: String,
    pub order_number_prefix: String,
    pub quote_validity_days: i64,
}

impl Default for QuoteSettings {
    fn default() -> Self {
        Self {
            vat_rate: VAT_RATE,
            minimum_chargeable_area: DEFAULT_MINIMUM_CHARGEABLE_AREA,
            default_currency: DEFAULT_CURRENCY.to_string(),
            quote_number_prefix: QUOTE_NUMBER_PREFIX.to_string(),
            order_number_prefix: ORDER_NUMBER_PREFIX.to_string(),
            quote_validity_days: DEFAULT_QUOTE_VALIDITY_DAYS,
        }
    }
}

impl QuoteSettings {
    /// 缺省有效期: today + quote_validity_days，超出日期范围时退回 today
    pub fn valid_until_from(&self, today: NaiveDate) -> NaiveDate {
        Duration::try_days(self.quote_validity_days)
            .and_then(|days| today.checked_add_signed(days))
            .unwrap_or(today)
    }
}

// 静态配置直接作为配置源（CLI / 测试）
#[async_trait]
impl QuoteConfigReader for QuoteSettings {
    async fn get_vat_rate(&self) -> RepositoryResult<f64> {
        Ok(self.vat_rate)
    }

    async fn get_minimum_chargeable_area(&self) -> RepositoryResult<f64> {
        Ok(self.minimum_chargeable_area)
    }

    async fn get_default_currency(&self) -> RepositoryResult<String> {
        Ok(self.default_currency.clone())
    }

    async fn get_quote_number_prefix(&self) -> RepositoryResult<String> {
        Ok(self.quote_number_prefix.clone())
    }

    async fn get_order_number_prefix(&self) -> RepositoryResult<String> {
        Ok(self.order_number_prefix.clone())
    }

    async fn get_quote_validity_days(&self) -> RepositoryResult<i64> {
        Ok(self.quote_validity_days)
    }

    async fn load_settings(&self) -> RepositoryResult<QuoteSettings> {
        Ok(self.clone())
    }
}
