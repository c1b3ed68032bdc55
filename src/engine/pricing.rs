// ==========================================
// 加工安装报价系统 - 单项计价引擎
// ==========================================
// 职责: 原始尺寸 → 几何面积 / 计费面积 / 行金额
// 红线: 纯函数，无副作用，非数值输入按 0 处理（不报错）
// ==========================================
// 规则:
// - area = height * width * qty / 10000（三者均 > 0，否则 0）
// - chargeable_area = max(area, min_area_per_item * qty)
// - total = chargeable_area * unit_price（两者均 > 0，否则 0）
// ==========================================

use crate::domain::quote::{ItemPricing, QuoteItem};

/// 平方厘米 → 平方米
pub const CM2_PER_M2: f64 = 10_000.0;

// ==========================================
// ItemPricingCalculator - 单项计价
// ==========================================
pub struct ItemPricingCalculator;

impl ItemPricingCalculator {
    /// 计算单项面积与金额
    ///
    /// # 参数
    /// - height / width: 厘米
    /// - qty: 数量
    /// - unit_price: 每平方米单价
    /// - min_area_per_item: 每件最低计费面积（m²）
    pub fn price(
        height: f64,
        width: f64,
        qty: f64,
        unit_price: f64,
        min_area_per_item: f64,
    ) -> ItemPricing {
        let height = finite_or_zero(height);
        let width = finite_or_zero(width);
        let qty = finite_or_zero(qty);
        let unit_price = finite_or_zero(unit_price);
        let min_area_per_item = finite_or_zero(min_area_per_item);

        // 任一维度非正 → 整项面积为 0
        let area = if height > 0.0 && width > 0.0 && qty > 0.0 {
            height * width * qty / CM2_PER_M2
        } else {
            0.0
        };

        // 最低计费：即使几何面积为 0 也按每件下限计费
        let chargeable_area = area.max(min_area_per_item * qty);

        let total = if chargeable_area > 0.0 && unit_price > 0.0 {
            chargeable_area * unit_price
        } else {
            0.0
        };

        ItemPricing {
            area,
            chargeable_area,
            total,
        }
    }

    /// 文本输入计价（表格单元格/表单字段）
    pub fn price_raw(
        height: &str,
        width: &str,
        qty: &str,
        unit_price: &str,
        min_area_per_item: f64,
    ) -> ItemPricing {
        Self::price(
            coerce_number(height),
            coerce_number(width),
            coerce_number(qty),
            coerce_number(unit_price),
            min_area_per_item,
        )
    }

    /// 对明细重新计价（返回新值，原值不变）
    pub fn reprice(item: &QuoteItem, min_area_per_item: f64) -> QuoteItem {
        let pricing = Self::price(
            item.height,
            item.width,
            f64::from(item.qty),
            item.unit_price,
            min_area_per_item,
        );

        QuoteItem {
            area: pricing.area,
            chargeable_area: pricing.chargeable_area,
            total: pricing.total,
            ..item.clone()
        }
    }
}

/// 文本 → 数值；空值、非数值、非有限值一律为 0
pub fn coerce_number(raw: &str) -> f64 {
    let cleaned = raw.trim().replace(',', "");
    if cleaned.is_empty() {
        return 0.0;
    }
    cleaned.parse::<f64>().map(finite_or_zero).unwrap_or(0.0)
}

fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}
