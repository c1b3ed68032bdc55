// ==========================================
// 加工安装报价系统 - 报价领域模型
// ==========================================
// 职责: 报价明细、报价单、折扣策略、编辑草稿
// 红线: 派生字段（面积/计费面积/金额/合计）只能由计价引擎写入
// ==========================================

use crate::domain::types::{DiscountType, QuoteStatus};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ==========================================
// QuoteItem - 报价明细
// ==========================================
// 尺寸单位: 厘米；面积单位: 平方米；单价: 货币/平方米
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuoteItem {
    // ===== 输入字段 =====
    pub location: String, // 安装位置
    #[serde(rename = "type")]
    pub item_type: String, // 产品类型
    pub height: f64,      // 高（cm）
    pub width: f64,       // 宽（cm）
    pub qty: u32,         // 数量
    pub unit_price: f64,  // 单价（每平方米）

    // ===== 派生字段 =====
    pub area: f64,            // 几何面积（m²）
    pub chargeable_area: f64, // 计费面积（m²，含最低计费）
    pub total: f64,           // 行金额
}

impl QuoteItem {
    /// 创建未计价的明细（派生字段为 0，需经 recompute 计价）
    pub fn new(
        location: impl Into<String>,
        item_type: impl Into<String>,
        height: f64,
        width: f64,
        qty: u32,
        unit_price: f64,
    ) -> Self {
        Self {
            location: location.into(),
            item_type: item_type.into(),
            height,
            width,
            qty,
            unit_price,
            area: 0.0,
            chargeable_area: 0.0,
            total: 0.0,
        }
    }
}

// ==========================================
// ItemPricing - 单项计价结果
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ItemPricing {
    pub area: f64,
    pub chargeable_area: f64,
    pub total: f64,
}

// ==========================================
// DiscountPolicy - 折扣策略
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct DiscountPolicy {
    pub discount_type: DiscountType,
    pub discount_value: f64,
}

impl DiscountPolicy {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn percentage(value: f64) -> Self {
        Self {
            discount_type: DiscountType::Percentage,
            discount_value: value,
        }
    }

    pub fn fixed(amount: f64) -> Self {
        Self {
            discount_type: DiscountType::Fixed,
            discount_value: amount,
        }
    }
}

// ==========================================
// QuoteTotals - 报价汇总
// ==========================================
// total_chargeable_area 仅用于展示，不直接计费
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct QuoteTotals {
    pub subtotal: f64,
    pub total_chargeable_area: f64,
    pub discount: f64,
    pub vat_amount: f64,
    pub total: f64,
}

// ==========================================
// Quote - 报价单（持久化记录）
// ==========================================
// 用途: 导入/编辑器生成，一次性整体落库
// 对齐: quotes 表
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    // ===== 主键与关联 =====
    pub quote_id: String,     // 报价 ID（UUID）
    pub customer_id: String,  // 所属客户
    pub quote_number: String, // 报价编号（QT-YYYYMM-RRRR）

    // ===== 明细（有序）=====
    pub items: Vec<QuoteItem>,

    // ===== 金额 =====
    pub subtotal: f64,
    pub discount: f64,
    pub vat_amount: f64,
    pub total: f64,

    // ===== 计价策略 =====
    pub discount_type: DiscountType,
    pub discount_value: f64,
    pub shipping_amount: f64,
    pub minimum_chargeable_area: f64,

    // ===== 业务信息 =====
    pub remarks: Option<String>,
    pub status: QuoteStatus,
    pub valid_until: NaiveDate,

    // ===== 审计字段 =====
    pub created_at: DateTime<Utc>,
}

// ==========================================
// QuoteDraft - 报价编辑草稿
// ==========================================
// 不可变值：任何字段变更后由调用方执行 recompute(draft) 得到新草稿
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuoteDraft {
    // ===== 客户信息 =====
    pub customer_name: String,
    pub customer_phone: String,
    pub customer_email: Option<String>,

    // ===== 明细与策略 =====
    pub items: Vec<QuoteItem>,
    pub discount: DiscountPolicy,
    pub shipping_amount: f64,
    pub minimum_chargeable_area: f64, // 批次级参数，变更后全部明细重算

    // ===== 业务信息 =====
    pub remarks: Option<String>,
    pub valid_until: Option<NaiveDate>,
    pub status: QuoteStatus,

    // ===== 派生汇总 =====
    pub totals: QuoteTotals,
}

impl QuoteDraft {
    pub fn new(customer_name: impl Into<String>, customer_phone: impl Into<String>) -> Self {
        Self {
            customer_name: customer_name.into(),
            customer_phone: customer_phone.into(),
            customer_email: None,
            items: Vec::new(),
            discount: DiscountPolicy::none(),
            shipping_amount: 0.0,
            minimum_chargeable_area: 0.0,
            remarks: None,
            valid_until: None,
            status: QuoteStatus::Draft,
            totals: QuoteTotals::default(),
        }
    }

    pub fn with_item(mut self, item: QuoteItem) -> Self {
        self.items.push(item);
        self
    }

    pub fn with_discount(mut self, discount: DiscountPolicy) -> Self {
        self.discount = discount;
        self
    }

    pub fn with_shipping(mut self, shipping_amount: f64) -> Self {
        self.shipping_amount = shipping_amount;
        self
    }

    pub fn with_minimum_chargeable_area(mut self, minimum: f64) -> Self {
        self.minimum_chargeable_area = minimum;
        self
    }

    /// 由已重算草稿生成待落库报价（派生字段原样带入）
    pub fn to_quote(&self, customer_id: &str, quote_number: &str, valid_until: NaiveDate) -> Quote {
        Quote {
            quote_id: Uuid::new_v4().to_string(),
            customer_id: customer_id.to_string(),
            quote_number: quote_number.to_string(),
            items: self.items.clone(),
            subtotal: self.totals.subtotal,
            discount: self.totals.discount,
            vat_amount: self.totals.vat_amount,
            total: self.totals.total,
            discount_type: self.discount.discount_type,
            discount_value: self.discount.discount_value,
            shipping_amount: self.shipping_amount,
            minimum_chargeable_area: self.minimum_chargeable_area,
            remarks: self.remarks.clone(),
            status: self.status,
            valid_until,
            created_at: Utc::now(),
        }
    }
}
