use crate::models::{DocumentTotals, LineItem};
use bigdecimal::{BigDecimal, Zero};

/// 四舍五入到 `places` 位小数 (恰好 .5 时远离零), 结果固定保留 `places` 位
pub fn round_half_up(value: &BigDecimal, places: i64) -> BigDecimal {
    // with_scale 缩小精度时向零截断
    let truncated = value.with_scale(places);
    let remainder = (value - &truncated).abs();
    let half_unit = BigDecimal::new(5.into(), places + 1);

    if remainder >= half_unit {
        let unit = BigDecimal::new(1.into(), places);
        if value < &BigDecimal::zero() {
            truncated - unit
        } else {
            truncated + unit
        }
    } else {
        truncated
    }
}

/// 金额统一保留两位小数
pub fn round2(value: &BigDecimal) -> BigDecimal {
    round_half_up(value, 2)
}

/// 计算单据汇总
///
/// 每个派生字段各自取整, 不把精度留到最后:
/// - subtotal = round2(Σ item.total + labor_cost)
/// - tax_amount = round2(subtotal * tax_rate / 100)
/// - withholding_amount = round2(subtotal * withholding_rate / 100)
/// - total = round2(subtotal + tax_amount - withholding_amount)
///
/// 税额和预扣额都以税前 subtotal 为基数。费率不做区间校验。
pub fn compute_totals(
    items: &[LineItem],
    labor_cost: &BigDecimal,
    tax_rate: &BigDecimal,
    withholding_rate: &BigDecimal,
) -> DocumentTotals {
    let hundred = BigDecimal::from(100);

    let items_sum = items
        .iter()
        .fold(BigDecimal::zero(), |acc, item| acc + &item.total);
    let subtotal = round2(&(items_sum + labor_cost));
    let tax_amount = round2(&(&subtotal * tax_rate / &hundred));
    let withholding_amount = round2(&(&subtotal * withholding_rate / &hundred));
    let total = round2(&(&subtotal + &tax_amount - &withholding_amount));

    DocumentTotals {
        subtotal,
        labor_cost: labor_cost.clone(),
        tax_rate: tax_rate.clone(),
        tax_amount,
        withholding_rate: withholding_rate.clone(),
        withholding_amount,
        total,
    }
}
