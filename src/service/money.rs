//! 金额取整与 GST 反算
//!
//! 所有金额按 2 位小数 (分/paisa) 处理, 舍入规则固定为四舍五入 (half-up, 远离零),
//! 全部经由 [`round_money`], 不允许在别处自行取整.

use bigdecimal::{BigDecimal, One, Zero};
use serde::Serialize;

/// 四舍五入到 2 位小数
pub fn round_money(value: &BigDecimal) -> BigDecimal {
    if *value < BigDecimal::zero() {
        return -round_money(&-value);
    }

    let hundred = BigDecimal::from(100);
    let scaled = value * &hundred;
    let truncated = scaled.with_scale(0);
    let fraction = &scaled - &truncated;

    let cents = if &fraction * BigDecimal::from(2) >= BigDecimal::one() {
        truncated + BigDecimal::one()
    } else {
        truncated
    };
    (cents / hundred).with_scale(2)
}

/// 部分数量的金额: round(行金额 / 可用数量 × 选取数量, 2)
///
/// 单价由持久化的行金额推导, 每个数量独立取整, 而不是累加取整后的单价.
pub fn pick_total(line_total: &BigDecimal, available_quantity: i32, picked_quantity: i32) -> BigDecimal {
    if available_quantity <= 0 {
        return BigDecimal::zero().with_scale(2);
    }
    let numerator = line_total * BigDecimal::from(picked_quantity);
    round_money(&(numerator / BigDecimal::from(available_quantity)))
}

/// 一页发票的税额拆分 (从含税总额反算)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GstBreakdown {
    pub gst_percent: BigDecimal,
    pub total_with_gst: BigDecimal,
    pub amount_before_gst: BigDecimal,
    pub sgst: BigDecimal,
    pub cgst: BigDecimal,
    /// 税前/含税 比例, 用于把单价和行金额换算成税前值
    pub discount_factor: BigDecimal,
}

impl GstBreakdown {
    pub fn back_calculate(total_with_gst: &BigDecimal, gst_percent: &BigDecimal) -> Self {
        let hundred = BigDecimal::from(100);
        let total = round_money(total_with_gst);

        let amount_before_gst = if total.is_zero() {
            BigDecimal::zero().with_scale(2)
        } else {
            round_money(&(&total * &hundred / (&hundred + gst_percent)))
        };

        let discount_factor = if total.is_zero() {
            BigDecimal::one()
        } else {
            &amount_before_gst / &total
        };

        let half_tax = round_money(&(&amount_before_gst * gst_percent / BigDecimal::from(200)));

        Self {
            gst_percent: gst_percent.clone(),
            total_with_gst: total,
            amount_before_gst,
            sgst: half_tax.clone(),
            cgst: half_tax,
            discount_factor,
        }
    }

    /// SGST / CGST 各占一半税率
    pub fn half_percent(&self) -> BigDecimal {
        &self.gst_percent / BigDecimal::from(2)
    }

    /// 换算为税前金额
    pub fn pre_tax(&self, amount: &BigDecimal) -> BigDecimal {
        round_money(&(amount * &self.discount_factor))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> BigDecimal {
        BigDecimal::from_str(s).unwrap()
    }

    #[test]
    fn test_round_half_up() {
        assert_eq!(round_money(&dec("0.005")), dec("0.01"));
        assert_eq!(round_money(&dec("0.004999")), dec("0.00"));
        // half-even 会得到 0.12
        assert_eq!(round_money(&dec("0.125")), dec("0.13"));
        assert_eq!(round_money(&dec("2.675")), dec("2.68"));
        assert_eq!(round_money(&dec("7.5")), dec("7.50"));
    }

    #[test]
    fn test_round_negative_away_from_zero() {
        assert_eq!(round_money(&dec("-0.125")), dec("-0.13"));
        assert_eq!(round_money(&dec("-1.114")), dec("-1.11"));
    }

    #[test]
    fn test_round_keeps_two_places() {
        assert_eq!(round_money(&dec("15")).to_string(), "15.00");
        assert_eq!(round_money(&dec("3.1")).to_string(), "3.10");
    }

    #[test]
    fn test_pick_total_rounds_each_quantity() {
        let total = dec("10.00");
        assert_eq!(pick_total(&total, 3, 1), dec("3.33"));
        assert_eq!(pick_total(&total, 3, 2), dec("6.67"));
        assert_eq!(pick_total(&total, 3, 3), dec("10.00"));
    }

    #[test]
    fn test_pick_total_uses_stored_line_total() {
        // 持久化行金额与 单价×数量 不一致时以行金额为准
        assert_eq!(pick_total(&dec("29.99"), 2, 1), dec("15.00"));
    }

    #[test]
    fn test_gst_back_calculation() {
        let gst = GstBreakdown::back_calculate(&dec("118"), &dec("18"));
        assert_eq!(gst.amount_before_gst, dec("100.00"));
        assert_eq!(gst.sgst, dec("9.00"));
        assert_eq!(gst.cgst, dec("9.00"));
        assert_eq!(gst.half_percent(), dec("9"));
        assert_eq!(gst.pre_tax(&dec("59")), dec("50.00"));
    }

    #[test]
    fn test_gst_back_calculation_rounds() {
        let gst = GstBreakdown::back_calculate(&dec("100"), &dec("12"));
        // 100 / 1.12 = 89.2857...
        assert_eq!(gst.amount_before_gst, dec("89.29"));
        // 89.29 × 6% = 5.3574
        assert_eq!(gst.sgst, dec("5.36"));
    }

    #[test]
    fn test_zero_gst_keeps_total() {
        let gst = GstBreakdown::back_calculate(&dec("45.50"), &dec("0"));
        assert_eq!(gst.amount_before_gst, dec("45.50"));
        assert_eq!(gst.sgst, dec("0"));
        assert_eq!(gst.pre_tax(&dec("12.25")), dec("12.25"));
    }

    #[test]
    fn test_zero_total() {
        let gst = GstBreakdown::back_calculate(&dec("0"), &dec("18"));
        assert!(gst.amount_before_gst.is_zero());
        assert!(gst.sgst.is_zero());
        assert_eq!(gst.discount_factor, BigDecimal::one());
    }
}
