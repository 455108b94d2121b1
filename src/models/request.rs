use bigdecimal::{BigDecimal, Zero};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::InvoiceItem;
use crate::service::money::round_money;

/// 采购发票请求
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PurchaseInvoiceRequest {
    pub branch_id: Uuid,
    pub category_ids: Vec<Uuid>,
    pub total_amount: BigDecimal,
    pub gst_percent: BigDecimal,
    pub payment_type: String,
    pub date: DateTime<Utc>,
}

impl PurchaseInvoiceRequest {
    pub fn validate(&self) -> AppResult<()> {
        if self.total_amount <= BigDecimal::zero() {
            return Err(AppError::InvalidInput(
                "Total amount must be greater than zero".to_string(),
            ));
        }
        if round_money(&self.total_amount) != self.total_amount {
            return Err(AppError::InvalidInput(
                "Total amount must not have more than two decimal places".to_string(),
            ));
        }
        if self.category_ids.is_empty() {
            return Err(AppError::InvalidInput(
                "At least one category is required".to_string(),
            ));
        }
        validate_gst(&self.gst_percent)?;
        validate_payment_type(&self.payment_type)
    }
}

/// 客户 (销售) 发票的明细行, 由调用方直接给出
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomerLine {
    pub product: String,
    pub price: BigDecimal,
    pub quantity: i32,
    pub total: BigDecimal,
}

/// 客户发票请求: 不做匹配, 不扣减数量, 不占用发票号
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomerInvoiceRequest {
    pub branch_id: Uuid,
    pub customer_name: String,
    pub gst_percent: BigDecimal,
    pub payment_type: String,
    pub date: DateTime<Utc>,
    pub transactions: Vec<CustomerLine>,
}

impl CustomerInvoiceRequest {
    pub fn validate(&self) -> AppResult<()> {
        if self.customer_name.trim().is_empty() {
            return Err(AppError::InvalidInput(
                "Customer name is required".to_string(),
            ));
        }
        if self.transactions.is_empty() {
            return Err(AppError::InvalidInput(
                "At least one transaction is required".to_string(),
            ));
        }
        if self.transactions.iter().any(|line| line.quantity < 1) {
            return Err(AppError::InvalidInput(
                "Quantity must be at least 1".to_string(),
            ));
        }
        validate_gst(&self.gst_percent)?;
        validate_payment_type(&self.payment_type)
    }
}

fn validate_gst(gst_percent: &BigDecimal) -> AppResult<()> {
    if *gst_percent < BigDecimal::zero() || *gst_percent > BigDecimal::from(100) {
        return Err(AppError::InvalidInput(
            "GST must be between 0 and 100".to_string(),
        ));
    }
    Ok(())
}

fn validate_payment_type(payment_type: &str) -> AppResult<()> {
    if payment_type.trim().is_empty() {
        return Err(AppError::InvalidInput(
            "Payment Type is required".to_string(),
        ));
    }
    Ok(())
}

/// 开票后最终的一行: 选中的流水及其部分数量
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssuedLine {
    pub line_item_id: Uuid,
    pub product: String,
    pub unit_price: BigDecimal,
    pub quantity: i32,
    pub total: BigDecimal,
    pub remaining_quantity: i32,
}

/// 开票结果
#[derive(Debug, Clone)]
pub struct IssuedInvoice {
    pub invoice: InvoiceItem,
    pub lines: Vec<IssuedLine>,
    pub document: Vec<u8>,
    pub filename: String,
}

/// 渲染后的文档
#[derive(Debug, Clone)]
pub struct RenderedDocument {
    pub bytes: Vec<u8>,
    pub filename: String,
}
