//! 发票分页: 每页最多 10 行, 每页独立计算税额.

use bigdecimal::{BigDecimal, Zero};

use crate::render::{DocumentLine, InvoiceDocument};
use crate::service::money::{round_money, GstBreakdown};

pub const ROWS_PER_PAGE: usize = 10;

/// 表格中的一行 (已格式化)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRow {
    pub serial: usize,
    pub product: String,
    pub rate: String,
    pub quantity: String,
    pub amount: String,
}

impl TableRow {
    fn blank(serial: usize) -> Self {
        Self {
            serial,
            product: String::new(),
            rate: "_".to_string(),
            quantity: "_".to_string(),
            amount: "_".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PageLayout {
    pub page_number: usize,
    pub rows: Vec<TableRow>,
    pub tax: GstBreakdown,
}

impl PageLayout {
    /// 表格底部的四行汇总 (标签, 税率列, 金额)
    pub fn summary_rows(&self) -> Vec<(String, String, String)> {
        let half = percent_label(&self.tax.half_percent());
        vec![
            (
                "Total Sale Value before adding GST".to_string(),
                String::new(),
                rupees(&self.tax.amount_before_gst),
            ),
            ("@SGST".to_string(), half.clone(), rupees(&self.tax.sgst)),
            ("@CGST".to_string(), half, rupees(&self.tax.cgst)),
            (
                "Total Sale Price with GST".to_string(),
                String::new(),
                rupees(&self.tax.total_with_gst),
            ),
        ]
    }
}

fn percent_label(value: &BigDecimal) -> String {
    let text = value.to_string();
    if text.contains('.') {
        format!("{}%", text.trim_end_matches('0').trim_end_matches('.'))
    } else {
        format!("{}%", text)
    }
}

pub fn rupees(amount: &BigDecimal) -> String {
    format!("Rs {}", round_money(amount))
}

fn layout_page(page_number: usize, lines: &[DocumentLine], gst_percent: &BigDecimal) -> PageLayout {
    let page_total = lines
        .iter()
        .fold(BigDecimal::zero(), |acc, line| acc + &line.total);
    let tax = GstBreakdown::back_calculate(&page_total, gst_percent);

    let mut rows: Vec<TableRow> = lines
        .iter()
        .enumerate()
        .map(|(idx, line)| TableRow {
            serial: idx + 1,
            product: if line.product.is_empty() {
                "N/A".to_string()
            } else {
                line.product.clone()
            },
            rate: rupees(&tax.pre_tax(&line.unit_price)),
            quantity: line.quantity.to_string(),
            amount: rupees(&tax.pre_tax(&line.total)),
        })
        .collect();

    for serial in rows.len() + 1..=ROWS_PER_PAGE {
        rows.push(TableRow::blank(serial));
    }

    PageLayout {
        page_number,
        rows,
        tax,
    }
}

/// 按 10 行一页切分; 没有明细时仍输出一页空表
pub fn paginate(document: &InvoiceDocument) -> Vec<PageLayout> {
    if document.lines.is_empty() {
        return vec![layout_page(1, &[], &document.gst_percent)];
    }

    document
        .lines
        .chunks(ROWS_PER_PAGE)
        .enumerate()
        .map(|(idx, chunk)| layout_page(idx + 1, chunk, &document.gst_percent))
        .collect()
}
