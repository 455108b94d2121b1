use bigdecimal::{BigDecimal, Zero};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::service::money::round_money;

/// 采购流水行 (purchase_transactions), 匹配时的候选项
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct LineItem {
    pub id: Uuid,
    pub product: String,
    pub price: BigDecimal,          // 单价
    pub quantity: i32,              // 剩余可用数量
    pub total: BigDecimal,          // 满数量时的行金额 (持久化值)
    pub category_id: Option<Uuid>,
    pub date: DateTime<Utc>,
}

/// 新建采购流水请求
#[derive(Debug, Clone, Deserialize)]
pub struct NewLineItem {
    pub user_id: Uuid,
    pub category_id: Option<Uuid>,
    pub product: String,
    pub price: BigDecimal,
    pub quantity: i32,
    pub date: DateTime<Utc>,
}

impl NewLineItem {
    pub fn validate(&self) -> Result<(), String> {
        if self.product.trim().is_empty() {
            return Err("Product is required".to_string());
        }
        if self.quantity < 1 {
            return Err("Quantity must be at least 1".to_string());
        }
        if self.price < BigDecimal::zero() {
            return Err("Price must not be negative".to_string());
        }
        // 列类型为 NUMERIC(10,2), 多余的小数位会让存储的单价与行金额不一致
        if round_money(&self.price) != self.price {
            return Err("Price must not have more than two decimal places".to_string());
        }
        Ok(())
    }

    /// 行金额 = round(单价 × 数量, 2)
    pub fn line_total(&self) -> BigDecimal {
        round_money(&(&self.price * BigDecimal::from(self.quantity)))
    }
}

/// 批量新建: 整批校验, 任何一行不合法则整批拒绝
pub fn validate_batch(items: &[NewLineItem]) -> Result<(), String> {
    if items.is_empty() {
        return Err("At least one transaction is required".to_string());
    }
    for (idx, item) in items.iter().enumerate() {
        item.validate().map_err(|e| format!("Row {}: {}", idx + 1, e))?;
    }
    Ok(())
}

/// 列表展示用的流水 (附分类名)
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct LineItemView {
    pub id: Uuid,
    pub category: Option<String>,
    pub category_id: Option<Uuid>,
    pub date: DateTime<Utc>,
    pub product: String,
    pub price: BigDecimal,
    pub quantity: i32,
    pub total: BigDecimal,
}

/// 流水列表过滤条件, 日期为 yyyy-MM-dd
#[derive(Debug, Clone, Deserialize)]
pub struct LineItemFilter {
    pub user_id: Uuid,
    pub category_id: Option<Uuid>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

/// 默认查询最近 30 天
pub const DEFAULT_LOOKBACK_DAYS: i64 = 30;

impl LineItemFilter {
    /// 解析为 [start, end) 时间区间, `to` 当天整天包含在内
    pub fn date_range(&self, now: DateTime<Utc>) -> Result<(DateTime<Utc>, DateTime<Utc>), String> {
        let end = match self.to {
            Some(to) => start_of_day(to) + Duration::days(1),
            None => now,
        };
        let start = match self.from {
            Some(from) => start_of_day(from),
            None => end - Duration::days(DEFAULT_LOOKBACK_DAYS),
        };
        if start >= end {
            return Err("`from` must not be after `to`".to_string());
        }
        Ok((start, end))
    }
}

fn start_of_day(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(chrono::NaiveTime::MIN).and_utc()
}

/// 批量删除请求
#[derive(Debug, Clone, Deserialize)]
pub struct BulkDeleteRequest {
    pub user_id: Uuid,
    pub ids: Vec<Uuid>,
}

/// 一次选取: 某候选行的部分数量
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pick {
    pub line_item_id: Uuid,
    pub quantity: i32,
    pub total: BigDecimal,
}

/// 匹配结果, 按候选顺序排列, 每个候选行最多出现一次
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    pub picks: Vec<Pick>,
}

impl Selection {
    pub fn total(&self) -> BigDecimal {
        self.picks
            .iter()
            .fold(BigDecimal::zero(), |acc, pick| acc + &pick.total)
    }

    pub fn is_empty(&self) -> bool {
        self.picks.is_empty()
    }

    pub fn len(&self) -> usize {
        self.picks.len()
    }
}
