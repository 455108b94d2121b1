pub mod layout;
pub mod pdf;

use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::Serialize;

pub use layout::{paginate, PageLayout, TableRow, ROWS_PER_PAGE};
pub use pdf::PdfRenderer;

/// 渲染失败
#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct RenderError(pub String);

impl From<RenderError> for crate::error::AppError {
    fn from(err: RenderError) -> Self {
        Self::Render(err.0)
    }
}

/// 待渲染的发票 (分店抬头 + 税率 + 明细)
#[derive(Debug, Clone, Serialize)]
pub struct InvoiceDocument {
    pub branch_name: String,
    pub address: String,
    pub phone: String,
    pub gst_number: Option<String>,
    pub payment_type: String,
    pub gst_percent: BigDecimal,
    pub date: DateTime<Utc>,
    pub invoice_number: Option<i32>,
    pub customer_name: Option<String>,
    pub lines: Vec<DocumentLine>,
}

/// 含税单价/金额, 渲染时按页换算成税前值
#[derive(Debug, Clone, Serialize)]
pub struct DocumentLine {
    pub product: String,
    pub unit_price: BigDecimal,
    pub quantity: i32,
    pub total: BigDecimal,
}

impl InvoiceDocument {
    /// invoice-{号}-{yyyyMMdd}.pdf, 无发票号时中间留空
    pub fn filename(&self) -> String {
        let number = self
            .invoice_number
            .map(|n| n.to_string())
            .unwrap_or_default();
        format!("invoice-{}-{}.pdf", number, self.date.format("%Y%m%d"))
    }

    pub fn display_date(&self) -> String {
        self.date.format("%d/%m/%Y").to_string()
    }
}

/// 文档渲染器
pub trait DocumentRenderer: Send + Sync {
    fn render(&self, document: &InvoiceDocument) -> Result<Vec<u8>, RenderError>;
}
