// ==========================================
// 加工安装报价系统 - 报价草稿重算
// ==========================================
// 职责: 交互式编辑器的计价入口
// 规则: 任一尺寸/数量/单价/最低计费面积变更后，全部明细重新计价
//       （最低计费面积是批次级参数，不能只重算变更行）
// ==========================================

use crate::domain::quote::QuoteDraft;
use crate::engine::aggregator::QuoteAggregator;
use crate::engine::pricing::ItemPricingCalculator;

/// 使用默认 VAT 税率重算草稿
pub fn recompute(draft: &QuoteDraft) -> QuoteDraft {
    recompute_with(draft, &QuoteAggregator::default())
}

/// 使用指定汇总器重算草稿（返回新草稿）
pub fn recompute_with(draft: &QuoteDraft, aggregator: &QuoteAggregator) -> QuoteDraft {
    let items: Vec<_> = draft
        .items
        .iter()
        .map(|item| ItemPricingCalculator::reprice(item, draft.minimum_chargeable_area))
        .collect();

    let totals = aggregator.aggregate(&items, &draft.discount, draft.shipping_amount);

    QuoteDraft {
        items,
        totals,
        ..draft.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::quote::{DiscountPolicy, QuoteItem};

    const EPS: f64 = 1e-9;

    fn sample_draft() -> QuoteDraft {
        QuoteDraft::new("Ahmed", "+971501234567")
            .with_item(QuoteItem::new("Living", "Blind", 158.0, 158.0, 1, 8.0))
            .with_item(QuoteItem::new("Bath", "Blind", 50.0, 50.0, 1, 10.0))
            .with_minimum_chargeable_area(1.0)
    }

    #[test]
    fn test_recompute_prices_every_item() {
        let draft = recompute(&sample_draft());

        assert!((draft.items[0].total - 19.9712).abs() < EPS);
        assert!((draft.items[1].chargeable_area - 1.0).abs() < EPS);
        assert!((draft.totals.subtotal - 29.9712).abs() < EPS);
        assert!((draft.totals.total_chargeable_area - 3.4964).abs() < EPS);
    }

    #[test]
    fn test_minimum_area_change_reprices_untouched_items() {
        let first = recompute(&sample_draft());
        let raised = recompute(&first.clone().with_minimum_chargeable_area(3.0));

        // 两行都低于新下限，全部重新计价
        assert!((raised.items[0].chargeable_area - 3.0).abs() < EPS);
        assert!((raised.items[1].chargeable_area - 3.0).abs() < EPS);
        assert!((raised.totals.subtotal - 54.0).abs() < EPS);
    }

    #[test]
    fn test_recompute_does_not_mutate_input() {
        let draft = sample_draft();
        let _ = recompute(&draft);
        assert_eq!(draft.items[0].total, 0.0);
        assert_eq!(draft.totals.total, 0.0);
    }

    #[test]
    fn test_recompute_is_idempotent() {
        let once = recompute(&sample_draft().with_discount(DiscountPolicy::fixed(5.0)));
        let twice = recompute(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_custom_vat_rate() {
        let draft = sample_draft().with_minimum_chargeable_area(0.0);
        let draft = QuoteDraft {
            items: vec![QuoteItem::new("A", "B", 100.0, 100.0, 1, 100.0)],
            ..draft
        };
        let out = recompute_with(&draft, &QuoteAggregator::new(0.0));
        assert_eq!(out.totals.vat_amount, 0.0);
        assert!((out.totals.total - 100.0).abs() < EPS);
    }
}
