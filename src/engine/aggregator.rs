// ==========================================
// 加工安装报价系统 - 报价汇总引擎
// ==========================================
// 职责: 明细金额 + 折扣/运费策略 → 小计 / 折扣 / VAT / 合计
// 红线: 计算顺序固定
//   1. 折扣只基于小计计算
//   2. VAT 基数 = 小计 - 折扣（不含运费）
//   3. 合计 = (小计 - 折扣) + VAT + 运费
// ==========================================

use crate::domain::quote::{DiscountPolicy, QuoteItem, QuoteTotals};
use crate::domain::types::DiscountType;

/// 默认增值税率
pub const VAT_RATE: f64 = 0.05;

// ==========================================
// QuoteAggregator - 报价汇总
// ==========================================
#[derive(Debug, Clone, Copy)]
pub struct QuoteAggregator {
    vat_rate: f64,
}

impl Default for QuoteAggregator {
    fn default() -> Self {
        Self { vat_rate: VAT_RATE }
    }
}

impl QuoteAggregator {
    pub fn new(vat_rate: f64) -> Self {
        Self { vat_rate }
    }

    pub fn vat_rate(&self) -> f64 {
        self.vat_rate
    }

    /// 汇总报价金额
    ///
    /// # 参数
    /// - items: 已计价明细
    /// - discount: 折扣策略
    /// - shipping_amount: 运费（不计入 VAT 基数）
    pub fn aggregate(
        &self,
        items: &[QuoteItem],
        discount: &DiscountPolicy,
        shipping_amount: f64,
    ) -> QuoteTotals {
        let subtotal: f64 = items.iter().map(|i| i.total).sum();
        let total_chargeable_area: f64 = items.iter().map(|i| i.chargeable_area).sum();

        let discount_amount = Self::discount_amount(subtotal, discount);
        let vat_base = subtotal - discount_amount;
        let vat_amount = vat_base * self.vat_rate;
        let total = vat_base + vat_amount + shipping_amount;

        QuoteTotals {
            subtotal,
            total_chargeable_area,
            discount: discount_amount,
            vat_amount,
            total,
        }
    }

    /// 折扣金额（仅由小计决定）
    pub fn discount_amount(subtotal: f64, discount: &DiscountPolicy) -> f64 {
        match discount.discount_type {
            DiscountType::None => 0.0,
            DiscountType::Percentage => subtotal * (discount.discount_value / 100.0),
            DiscountType::Fixed => discount.discount_value,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    fn priced(total: f64, chargeable_area: f64) -> QuoteItem {
        QuoteItem {
            chargeable_area,
            total,
            ..QuoteItem::new("L", "T", 0.0, 0.0, 1, 0.0)
        }
    }

    #[test]
    fn test_percentage_discount_vat_and_shipping() {
        let items = vec![priced(60.0, 3.0), priced(40.0, 2.0)];
        let totals =
            QuoteAggregator::default().aggregate(&items, &DiscountPolicy::percentage(10.0), 20.0);

        assert!((totals.subtotal - 100.0).abs() < EPS);
        assert!((totals.discount - 10.0).abs() < EPS);
        assert!((totals.vat_amount - 4.5).abs() < EPS);
        assert!((totals.total - 114.5).abs() < EPS);
        assert!((totals.total_chargeable_area - 5.0).abs() < EPS);
    }

    #[test]
    fn test_fixed_and_none_discount() {
        let items = vec![priced(200.0, 4.0)];
        let agg = QuoteAggregator::default();

        let fixed = agg.aggregate(&items, &DiscountPolicy::fixed(50.0), 0.0);
        assert!((fixed.discount - 50.0).abs() < EPS);
        assert!((fixed.vat_amount - 7.5).abs() < EPS);
        assert!((fixed.total - 157.5).abs() < EPS);

        let none = agg.aggregate(&items, &DiscountPolicy::none(), 0.0);
        assert_eq!(none.discount, 0.0);
        assert!((none.total - 210.0).abs() < EPS);
    }

    #[test]
    fn test_shipping_never_changes_vat() {
        let items = vec![priced(123.45, 2.0)];
        let agg = QuoteAggregator::default();
        let policy = DiscountPolicy::percentage(7.0);

        let base = agg.aggregate(&items, &policy, 0.0);
        for shipping in [1.0, 25.0, 999.99] {
            let t = agg.aggregate(&items, &policy, shipping);
            assert_eq!(t.vat_amount, base.vat_amount);
            assert_eq!(t.discount, base.discount);
            assert!((t.total - base.total - shipping).abs() < EPS);
        }
    }

    #[test]
    fn test_discount_changes_vat_but_not_chargeable_area() {
        let items = vec![priced(100.0, 2.5), priced(50.0, 1.0)];
        let agg = QuoteAggregator::default();

        let low = agg.aggregate(&items, &DiscountPolicy::percentage(5.0), 10.0);
        let high = agg.aggregate(&items, &DiscountPolicy::percentage(20.0), 10.0);

        assert_ne!(low.vat_amount, high.vat_amount);
        assert!(high.vat_amount < low.vat_amount);
        assert_eq!(low.total_chargeable_area, high.total_chargeable_area);
    }

    #[test]
    fn test_empty_items() {
        let totals = QuoteAggregator::default().aggregate(&[], &DiscountPolicy::none(), 15.0);
        assert_eq!(totals.subtotal, 0.0);
        assert_eq!(totals.vat_amount, 0.0);
        assert!((totals.total - 15.0).abs() < EPS);
    }
}
