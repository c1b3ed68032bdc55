// ==========================================
// 加工安装报价系统 - 客户对账器
// ==========================================
// 职责: 校验行按电话分组 + 客户幂等 lookup-or-create（阶段: Grouping / Reconciling）
// 规则:
// - 分组键: TRIM 后的电话；同号行合并，明细按行序追加
// - 首行决定客户名称/邮箱/备注/有效期
// - 同一批次内每个电话至多创建一次客户（状态 Lead）
// 已知限制: 与并发批次之间无事务隔离，可能重复建客户
// ==========================================

use crate::domain::customer::{normalize_phone, Customer, NewCustomer};
use crate::domain::import::{ImportFailure, QuoteGroup, QuoteRow};
use crate::repository::customer_repo::CustomerRepository;
use indexmap::IndexMap;
use std::collections::HashMap;
use tracing::{debug, info, warn};

/// 按电话分组（保持首次出现顺序）
pub fn group_rows(rows: Vec<QuoteRow>) -> IndexMap<String, QuoteGroup> {
    let mut groups: IndexMap<String, QuoteGroup> = IndexMap::new();

    for row in rows {
        let phone = normalize_phone(&row.customer_phone);
        match groups.get_mut(&phone) {
            Some(group) => group.rows.push(row),
            None => {
                let group = QuoteGroup {
                    phone: phone.clone(),
                    customer_name: row.customer_name.clone(),
                    customer_email: row.customer_email.clone(),
                    remarks: row.remarks.clone(),
                    valid_until: row.valid_until,
                    first_row: row.row_number,
                    rows: vec![row],
                };
                groups.insert(phone, group);
            }
        }
    }

    groups
}

// ==========================================
// CustomerReconciler - 单批次客户对账
// ==========================================
// 生命周期: 一个导入批次；缓存保证同号只创建一次
pub struct CustomerReconciler<'a, C: CustomerRepository> {
    customer_repo: &'a C,
    resolved: HashMap<String, Customer>,
    created_count: usize,
}

impl<'a, C: CustomerRepository> CustomerReconciler<'a, C> {
    pub fn new(customer_repo: &'a C) -> Self {
        Self {
            customer_repo,
            resolved: HashMap::new(),
            created_count: 0,
        }
    }

    /// 本批次新建客户数
    pub fn created_count(&self) -> usize {
        self.created_count
    }

    /// 查找或创建分组对应的客户
    ///
    /// # 参数
    /// - group_index: 分组序号（从 1 开始，用于错误报告）
    /// - group: 分组
    ///
    /// # 返回
    /// - Ok(Customer): 已存在或新建的客户
    /// - Err(ImportFailure::Reconciliation): 查询/创建失败
    pub async fn reconcile(
        &mut self,
        group_index: usize,
        group: &QuoteGroup,
    ) -> Result<Customer, ImportFailure> {
        if let Some(customer) = self.resolved.get(&group.phone) {
            return Ok(customer.clone());
        }

        let failure = |message: String| ImportFailure::Reconciliation {
            group: group_index,
            phone: group.phone.clone(),
            message,
        };

        let existing = self
            .customer_repo
            .find_by_phone(&group.phone)
            .await
            .map_err(|e| {
                warn!(phone = %group.phone, error = %e, "客户查询失败");
                failure(e.to_string())
            })?;

        let customer = match existing {
            Some(customer) => {
                debug!(phone = %group.phone, customer_id = %customer.customer_id, "复用已有客户");
                customer
            }
            None => {
                let new_customer = NewCustomer::lead(
                    &group.customer_name,
                    &group.phone,
                    group.customer_email.as_deref(),
                );
                let customer = self.customer_repo.create(new_customer).await.map_err(|e| {
                    warn!(phone = %group.phone, error = %e, "客户创建失败");
                    failure(e.to_string())
                })?;
                self.created_count += 1;
                info!(phone = %group.phone, customer_id = %customer.customer_id, "新建客户 (Lead)");
                customer
            }
        };

        self.resolved.insert(group.phone.clone(), customer.clone());
        Ok(customer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(row_number: usize, name: &str, phone: &str, location: &str) -> QuoteRow {
        QuoteRow {
            row_number,
            customer_name: name.to_string(),
            customer_phone: phone.to_string(),
            customer_email: Some(format!("{}@example.com", name.to_lowercase())),
            location: location.to_string(),
            item_type: "Glass".to_string(),
            height: 100.0,
            width: 100.0,
            qty: 1,
            unit_price: 10.0,
            remarks: Some(format!("remark {}", row_number)),
            valid_until: None,
        }
    }

    #[test]
    fn test_group_rows_preserves_first_appearance_order() {
        let groups = group_rows(vec![
            row(2, "Ali", "0501", "A"),
            row(3, "Sara", "0502", "B"),
            row(4, "Ali2", "0501", "C"),
            row(5, "Omar", "0503", "D"),
        ]);

        let phones: Vec<&str> = groups.keys().map(String::as_str).collect();
        assert_eq!(phones, vec!["0501", "0502", "0503"]);

        let ali = &groups["0501"];
        let locations: Vec<&str> = ali.rows.iter().map(|r| r.location.as_str()).collect();
        assert_eq!(locations, vec!["A", "C"]);
    }

    #[test]
    fn test_first_row_seeds_customer_fields() {
        let groups = group_rows(vec![row(2, "Ali", "0501", "A"), row(3, "Other", "0501", "B")]);

        let group = &groups["0501"];
        assert_eq!(group.customer_name, "Ali");
        assert_eq!(group.customer_email.as_deref(), Some("ali@example.com"));
        assert_eq!(group.remarks.as_deref(), Some("remark 2"));
        assert_eq!(group.first_row, 2);
    }

    #[test]
    fn test_trailing_space_phones_merge() {
        let groups = group_rows(vec![row(2, "Ali", "0501 ", "A"), row(3, "Ali", " 0501", "B")]);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups["0501"].rows.len(), 2);
    }
}
