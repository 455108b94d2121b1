//! 匹配器与金额计算的性质测试

use bigdecimal::{BigDecimal, Zero};
use chrono::{TimeZone, Utc};
use gst_invoice_rust::models::LineItem;
use gst_invoice_rust::service::money::{pick_total, round_money, GstBreakdown};
use gst_invoice_rust::service::{find_selection, MatchOutcome};
use proptest::prelude::*;
use std::collections::HashSet;
use std::str::FromStr;
use uuid::Uuid;

fn cents(value: u32) -> BigDecimal {
    BigDecimal::from_str(&format!("{}.{:02}", value / 100, value % 100)).unwrap()
}

fn line_item(idx: usize, price_cents: u32, quantity: i32) -> LineItem {
    let price = cents(price_cents);
    LineItem {
        id: Uuid::new_v4(),
        product: format!("P{}", idx),
        total: round_money(&(&price * BigDecimal::from(quantity))),
        price,
        quantity,
        category_id: None,
        date: Utc.with_ymd_and_hms(2024, 4, 1, 9, 0, 0).unwrap() + chrono::Duration::days(idx as i64),
    }
}

/// (单价分, 可用数量, 计划选取数量; 0 表示不选)
fn arb_row() -> impl Strategy<Value = (u32, i32, i32)> {
    (1u32..5_000u32, 1i32..=4i32).prop_flat_map(|(price, qty)| (Just(price), Just(qty), 0..=qty))
}

/// 候选集 + 由其中某个子集构造出的可达目标金额
fn arb_reachable() -> impl Strategy<Value = (Vec<LineItem>, BigDecimal)> {
    prop::collection::vec(arb_row(), 1..=6).prop_map(|rows| {
        let mut target = BigDecimal::zero();
        let items: Vec<LineItem> = rows
            .iter()
            .enumerate()
            .map(|(idx, &(price, qty, planned))| {
                let item = line_item(idx, price, qty);
                if planned > 0 {
                    target += pick_total(&item.total, item.quantity, planned);
                }
                item
            })
            .collect();
        (items, target)
    })
}

proptest! {
    /// 可达目标一定能找到, 且选取满足数量与唯一性约束
    #[test]
    fn reachable_target_is_found((items, target) in arb_reachable()) {
        prop_assume!(target > BigDecimal::zero());

        let selection = match find_selection(&items, &target) {
            MatchOutcome::Found(selection) => selection,
            other => return Err(TestCaseError::fail(format!("expected a match, got {:?}", other))),
        };

        prop_assert_eq!(selection.total(), target);

        let mut seen = HashSet::new();
        let mut last_index = None;
        for pick in &selection.picks {
            prop_assert!(seen.insert(pick.line_item_id));

            let index = items.iter().position(|i| i.id == pick.line_item_id).unwrap();
            prop_assert!(last_index.map_or(true, |last| index > last));
            last_index = Some(index);

            let item = &items[index];
            prop_assert!(pick.quantity >= 1 && pick.quantity <= item.quantity);
            prop_assert_eq!(&pick.total, &pick_total(&item.total, item.quantity, pick.quantity));
        }
    }

    /// 相同输入得到相同结果, 候选集不被修改
    #[test]
    fn search_is_deterministic((items, target) in arb_reachable()) {
        let before: Vec<(Uuid, i32)> = items.iter().map(|i| (i.id, i.quantity)).collect();

        let first = find_selection(&items, &target);
        let second = find_selection(&items, &target);
        prop_assert_eq!(first, second);

        let after: Vec<(Uuid, i32)> = items.iter().map(|i| (i.id, i.quantity)).collect();
        prop_assert_eq!(before, after);
    }

    /// 全数量选取等于持久化的行金额
    #[test]
    fn full_quantity_pick_equals_line_total(price in 1u32..100_000u32, qty in 1i32..50i32) {
        let item = line_item(0, price, qty);
        prop_assert_eq!(pick_total(&item.total, qty, qty), item.total.clone());
    }

    /// 反算的税前金额不超过含税金额, 两项税额相等
    #[test]
    fn back_calculated_amount_does_not_exceed_total(total in 0u32..10_000_000u32, gst in 0u32..=28u32) {
        let breakdown = GstBreakdown::back_calculate(&cents(total), &BigDecimal::from(gst));
        prop_assert!(breakdown.amount_before_gst <= breakdown.total_with_gst);
        prop_assert_eq!(&breakdown.sgst, &breakdown.cgst);
        if gst == 0 {
            prop_assert_eq!(&breakdown.amount_before_gst, &breakdown.total_with_gst);
        }
    }
}
