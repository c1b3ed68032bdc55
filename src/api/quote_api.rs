// ==========================================
// 报价API
// ==========================================
// 职责: 交互式单张报价（预览重算 / 保存草稿）与订单编号
// 说明: 不经过行校验与导入编排，直接使用计价与汇总引擎
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::config::{ConfigManager, QuoteConfigReader};
use crate::db::open_and_init;
use crate::domain::customer::{normalize_phone, Customer, NewCustomer};
use crate::domain::quote::{Quote, QuoteDraft};
use crate::engine::aggregator::QuoteAggregator;
use crate::engine::draft::recompute_with;
use crate::engine::identifier::{IdentifierGenerator, UncheckedRandomId};
use crate::repository::{
    CustomerRepository, CustomerRepositoryImpl, QuoteRepository, QuoteRepositoryImpl,
};
use chrono::Local;
use std::sync::{Arc, Mutex};
use tracing::{info, instrument};

/// SQLite 装配的报价API
pub type SqliteQuoteApi = QuoteApi<CustomerRepositoryImpl, QuoteRepositoryImpl, ConfigManager>;

/// 报价API
pub struct QuoteApi<C, Q, K>
where
    C: CustomerRepository,
    Q: QuoteRepository,
    K: QuoteConfigReader,
{
    customer_repo: C,
    quote_repo: Q,
    config: K,

    // 编号生成（前缀取自配置）
    quote_numbers: Box<dyn IdentifierGenerator>,
    order_numbers: Box<dyn IdentifierGenerator>,
}

impl SqliteQuoteApi {
    /// 基于数据库文件创建
    pub fn open(db_path: &str) -> ApiResult<Self> {
        let conn = open_and_init(db_path)
            .map_err(|e| ApiError::DatabaseConnectionError(e.to_string()))?;
        let conn = Arc::new(Mutex::new(conn));

        Ok(QuoteApi::new(
            CustomerRepositoryImpl::from_connection(conn.clone()),
            QuoteRepositoryImpl::from_connection(conn.clone()),
            ConfigManager::from_connection(conn)?,
        ))
    }
}

impl<C, Q, K> QuoteApi<C, Q, K>
where
    C: CustomerRepository,
    Q: QuoteRepository,
    K: QuoteConfigReader,
{
    /// 创建报价API（默认随机报价编号 / 随机订单编号）
    pub fn new(customer_repo: C, quote_repo: Q, config: K) -> Self {
        Self {
            customer_repo,
            quote_repo,
            config,
            quote_numbers: Box::new(UncheckedRandomId::quote_numbers()),
            order_numbers: Box::new(UncheckedRandomId::order_numbers()),
        }
    }

    pub fn with_quote_number_generator(mut self, generator: Box<dyn IdentifierGenerator>) -> Self {
        self.quote_numbers = generator;
        self
    }

    pub fn with_order_number_generator(mut self, generator: Box<dyn IdentifierGenerator>) -> Self {
        self.order_numbers = generator;
        self
    }

    /// 预览：按当前配置的 VAT 税率重算草稿（不落库）
    pub async fn preview(&self, draft: &QuoteDraft) -> ApiResult<QuoteDraft> {
        let aggregator = QuoteAggregator::new(self.config.get_vat_rate().await?);
        Ok(recompute_with(draft, &aggregator))
    }

    /// 保存草稿为报价
    ///
    /// # 流程
    /// 1. 重算全部明细与汇总
    /// 2. 按电话查找客户，不存在则创建（Lead）
    /// 3. 生成报价编号并落库
    ///
    /// # 返回
    /// - Ok(Quote): 已落库报价
    /// - Err(ApiError::InvalidInput): 缺少客户名称/电话或无明细
    #[instrument(skip(self, draft), fields(phone = %draft.customer_phone.trim()))]
    pub async fn save_draft(&self, draft: &QuoteDraft) -> ApiResult<Quote> {
        if draft.customer_name.trim().is_empty() {
            return Err(ApiError::InvalidInput("客户名称不能为空".to_string()));
        }
        if draft.customer_phone.trim().is_empty() {
            return Err(ApiError::InvalidInput("客户电话不能为空".to_string()));
        }
        if draft.items.is_empty() {
            return Err(ApiError::InvalidInput("报价至少需要一条明细".to_string()));
        }

        let settings = self.config.load_settings().await?;
        let draft = recompute_with(draft, &QuoteAggregator::new(settings.vat_rate));

        let customer = self.resolve_customer(&draft).await?;

        let quote_number = self
            .quote_numbers
            .generate(&settings.quote_number_prefix, None)
            .await?;
        let valid_until = draft
            .valid_until
            .unwrap_or_else(|| settings.valid_until_from(Local::now().date_naive()));

        let quote = draft.to_quote(&customer.customer_id, &quote_number, valid_until);
        self.quote_repo.insert(&quote).await?;

        info!(
            quote_number = %quote.quote_number,
            customer_id = %quote.customer_id,
            total = quote.total,
            "报价已保存"
        );
        Ok(quote)
    }

    /// 生成订单编号（默认 ORD-YYYYMM-RRRR，不查重）
    pub async fn next_order_number(&self) -> ApiResult<String> {
        let prefix = self.config.get_order_number_prefix().await?;
        Ok(self.order_numbers.generate(&prefix, None).await?)
    }

    /// 按报价编号查询
    pub async fn get_quote(&self, quote_number: &str) -> ApiResult<Quote> {
        self.quote_repo
            .get_by_quote_number(quote_number)
            .await?
            .ok_or_else(|| ApiError::NotFound(format!("报价(quote_number={})不存在", quote_number)))
    }

    /// 客户名下全部报价
    pub async fn list_customer_quotes(&self, customer_id: &str) -> ApiResult<Vec<Quote>> {
        Ok(self.quote_repo.list_by_customer(customer_id).await?)
    }

    async fn resolve_customer(&self, draft: &QuoteDraft) -> ApiResult<Customer> {
        let phone = normalize_phone(&draft.customer_phone);
        if let Some(customer) = self.customer_repo.find_by_phone(&phone).await? {
            return Ok(customer);
        }

        let customer = self
            .customer_repo
            .create(NewCustomer::lead(
                &draft.customer_name,
                &phone,
                draft.customer_email.as_deref(),
            ))
            .await?;
        info!(phone = %phone, customer_id = %customer.customer_id, "新建客户 (Lead)");
        Ok(customer)
    }
}
