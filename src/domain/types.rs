// ==========================================
// 加工安装报价系统 - 领域类型定义
// ==========================================
// 职责: 折扣类型、报价状态、客户状态等枚举
// 序列化格式: 与数据库存储值一致
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 折扣类型 (Discount Type)
// ==========================================
// 折扣只作用于小计，不与 VAT / 运费叠加
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiscountType {
    #[default]
    None,       // 无折扣
    Percentage, // 百分比（discount_value 为 0-100）
    Fixed,      // 固定金额
}

impl DiscountType {
    /// 数据库存储值
    pub fn as_str(&self) -> &'static str {
        match self {
            DiscountType::None => "none",
            DiscountType::Percentage => "percentage",
            DiscountType::Fixed => "fixed",
        }
    }

    /// 从存储值解析（未知值视为无折扣）
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "percentage" | "percent" | "%" => DiscountType::Percentage,
            "fixed" | "amount" => DiscountType::Fixed,
            _ => DiscountType::None,
        }
    }
}

impl fmt::Display for DiscountType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==========================================
// 报价状态 (Quote Status)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum QuoteStatus {
    #[default]
    Draft,    // 草稿（导入生成的报价默认状态）
    Sent,     // 已发送给客户
    Accepted, // 客户已接受
    Rejected, // 客户已拒绝
    Expired,  // 已过有效期
}

impl QuoteStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuoteStatus::Draft => "Draft",
            QuoteStatus::Sent => "Sent",
            QuoteStatus::Accepted => "Accepted",
            QuoteStatus::Rejected => "Rejected",
            QuoteStatus::Expired => "Expired",
        }
    }

    pub fn parse(raw: &str) -> Self {
        match raw.trim() {
            "Sent" => QuoteStatus::Sent,
            "Accepted" => QuoteStatus::Accepted,
            "Rejected" => QuoteStatus::Rejected,
            "Expired" => QuoteStatus::Expired,
            _ => QuoteStatus::Draft,
        }
    }
}

impl fmt::Display for QuoteStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==========================================
// 客户状态 (Customer Status)
// ==========================================
// 对账过程中隐式创建的客户一律为 Lead
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum CustomerStatus {
    #[default]
    Lead,     // 潜在客户
    Active,   // 成交客户
    Inactive, // 停用
}

impl CustomerStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CustomerStatus::Lead => "Lead",
            CustomerStatus::Active => "Active",
            CustomerStatus::Inactive => "Inactive",
        }
    }

    pub fn parse(raw: &str) -> Self {
        match raw.trim() {
            "Active" => CustomerStatus::Active,
            "Inactive" => CustomerStatus::Inactive,
            _ => CustomerStatus::Lead,
        }
    }
}

impl fmt::Display for CustomerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_discount_type_parse() {
        assert_eq!(DiscountType::parse("percentage"), DiscountType::Percentage);
        assert_eq!(DiscountType::parse(" Fixed "), DiscountType::Fixed);
        assert_eq!(DiscountType::parse(""), DiscountType::None);
        assert_eq!(DiscountType::parse("bogus"), DiscountType::None);
    }

    #[test]
    fn test_status_round_trip_through_storage_value() {
        for status in [
            QuoteStatus::Draft,
            QuoteStatus::Sent,
            QuoteStatus::Accepted,
            QuoteStatus::Rejected,
            QuoteStatus::Expired,
        ] {
            assert_eq!(QuoteStatus::parse(status.as_str()), status);
        }
        assert_eq!(CustomerStatus::parse("Lead"), CustomerStatus::Lead);
        assert_eq!(CustomerStatus::Lead.to_string(), "Lead");
    }
}
