use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// 分店发票号计数器 (invoices)
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct InvoiceCounter {
    pub id: Uuid,
    pub branch_id: Uuid,
    pub last_invoice_number: i32,
}

/// 已开具发票 (invoice_items)
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct InvoiceItem {
    pub id: Uuid,
    pub invoice_id: Uuid,
    pub branch_id: Uuid,
    pub user_id: Uuid,
    pub invoice_number: i32,
    pub date: DateTime<Utc>,
    pub total: BigDecimal,
}

#[derive(Debug, Clone)]
pub struct NewInvoiceItem {
    pub invoice_id: Uuid,
    pub branch_id: Uuid,
    pub user_id: Uuid,
    pub invoice_number: i32,
    pub date: DateTime<Utc>,
    pub total: BigDecimal,
}

/// 分店发票号计数器及其已开具发票, 发票号降序
#[derive(Debug, Clone, Serialize)]
pub struct InvoiceLedger {
    #[serde(flatten)]
    pub counter: InvoiceCounter,
    pub invoice_items: Vec<InvoiceItem>,
}
