// ==========================================
// 加工安装报价系统 - 客户领域模型
// ==========================================
// 自然键: phone（去除首尾空白）
// 本引擎只读取或创建客户，从不更新
// ==========================================

use crate::domain::types::CustomerStatus;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ==========================================
// Customer - 客户记录
// ==========================================
// 对齐: customers 表（phone 为非唯一索引）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Customer {
    pub customer_id: String,   // 客户 ID（UUID）
    pub name: String,          // 客户名称
    pub phone: String,         // 电话（已 TRIM）
    pub email: Option<String>, // 邮箱
    pub status: CustomerStatus,
    pub created_at: DateTime<Utc>,
}

// ==========================================
// NewCustomer - 待创建客户
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewCustomer {
    pub name: String,
    pub phone: String,
    pub email: Option<String>,
    pub status: CustomerStatus,
}

impl NewCustomer {
    /// 对账时隐式创建的客户（status = Lead）
    pub fn lead(name: &str, phone: &str, email: Option<&str>) -> Self {
        Self {
            name: name.trim().to_string(),
            phone: normalize_phone(phone),
            email: email
                .map(|e| e.trim().to_string())
                .filter(|e| !e.is_empty()),
            status: CustomerStatus::Lead,
        }
    }
}

/// 电话归一化：仅去除首尾空白，不改写号码本身
pub fn normalize_phone(raw: &str) -> String {
    raw.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lead_trims_fields() {
        let c = NewCustomer::lead(" Ahmed ", "+971501234567 ", Some("  "));
        assert_eq!(c.name, "Ahmed");
        assert_eq!(c.phone, "+971501234567");
        assert_eq!(c.email, None);
        assert_eq!(c.status, CustomerStatus::Lead);
    }
}
