use printpdf::{
    BuiltinFont, IndirectFontRef, Line, Mm, PdfDocument, PdfDocumentReference,
    PdfLayerReference, Point,
};
use std::io::BufWriter;

use crate::render::layout::{paginate, PageLayout};
use crate::render::{DocumentRenderer, InvoiceDocument, RenderError};

const PAGE_W: f32 = 210.0;
const PAGE_H: f32 = 297.0;
const TABLE_TOP: f32 = 90.0;
const ROW_H: f32 = 8.0;
// 列起点: 序号, 品名, 单价, 数量, 金额
const COLUMNS: [f32; 5] = [12.0, 26.0, 118.0, 150.0, 170.0];

/// A4 税务发票 (builtin Helvetica, 无需嵌入字体)
#[derive(Debug, Default, Clone, Copy)]
pub struct PdfRenderer;

struct Fonts {
    regular: IndirectFontRef,
    bold: IndirectFontRef,
}

impl PdfRenderer {
    pub fn new() -> Self {
        Self
    }

    fn load_fonts(doc: &PdfDocumentReference) -> Result<Fonts, RenderError> {
        let regular = doc
            .add_builtin_font(BuiltinFont::Helvetica)
            .map_err(|e| RenderError(e.to_string()))?;
        let bold = doc
            .add_builtin_font(BuiltinFont::HelveticaBold)
            .map_err(|e| RenderError(e.to_string()))?;
        Ok(Fonts { regular, bold })
    }
}

impl DocumentRenderer for PdfRenderer {
    fn render(&self, document: &InvoiceDocument) -> Result<Vec<u8>, RenderError> {
        let pages = paginate(document);
        let title = match document.invoice_number {
            Some(n) => format!("Tax Invoice {}", n),
            None => "Tax Invoice".to_string(),
        };

        let (doc, first_page, first_layer) =
            PdfDocument::new(title, Mm(PAGE_W), Mm(PAGE_H), "Layer 1".to_string());
        let fonts = Self::load_fonts(&doc)?;

        for (idx, page) in pages.iter().enumerate() {
            let layer = if idx == 0 {
                doc.get_page(first_page).get_layer(first_layer)
            } else {
                let (page_idx, layer_idx) = doc.add_page(Mm(PAGE_W), Mm(PAGE_H), "Layer 1");
                doc.get_page(page_idx).get_layer(layer_idx)
            };
            draw_page(&layer, &fonts, document, page);
        }

        let mut writer = BufWriter::new(Vec::<u8>::new());
        doc.save(&mut writer).map_err(|e| RenderError(e.to_string()))?;
        writer.into_inner().map_err(|e| RenderError(e.to_string()))
    }
}

fn draw_page(layer: &PdfLayerReference, fonts: &Fonts, document: &InvoiceDocument, page: &PageLayout) {
    text_centered(layer, &fonts.regular, "Tax Invoice", 16.0, 105.0, 20.0);
    rule(layer, 94.0, 116.0, 20.7, 0.3);

    let gstin = document.gst_number.as_deref().unwrap_or("");
    text(layer, &fonts.regular, &format!("GSTIN: {}", gstin), 12.0, 10.0, 30.0);
    text(layer, &fonts.regular, &format!("Mobile: {}", document.phone), 12.0, 160.0, 30.0);

    text_centered(layer, &fonts.bold, &document.branch_name, 22.0, 105.0, 43.0);
    text_centered(layer, &fonts.regular, &document.address, 12.0, 105.0, 50.0);
    rule(layer, 10.0, 200.0, 55.0, 0.3);

    text(layer, &fonts.regular, &format!("M/s: {}", document.payment_type), 15.0, 10.0, 65.0);
    let customer = document.customer_name.as_deref().unwrap_or("");
    text(
        layer,
        &fonts.regular,
        &format!("GSTIN No.: ................{}................", customer),
        12.0,
        10.0,
        75.0,
    );
    let number = document
        .invoice_number
        .map(|n| n.to_string())
        .unwrap_or_default();
    text(layer, &fonts.regular, &format!("Invoice No.: {}", number), 12.0, 150.0, 65.0);
    text(layer, &fonts.regular, &format!("Date :{}", document.display_date()), 12.0, 150.0, 75.0);
    rule(layer, 10.0, 200.0, 83.0, 0.3);

    let mut y = TABLE_TOP;
    let header = ["Item", "Description of Goods", "Rate", "Quantity", "Amount"];
    for (col, label) in header.iter().enumerate() {
        text(layer, &fonts.bold, label, 11.0, COLUMNS[col], y);
    }
    rule(layer, 10.0, 200.0, y + 2.5, 0.2);

    for row in &page.rows {
        y += ROW_H;
        let cells = [
            row.serial.to_string(),
            row.product.clone(),
            row.rate.clone(),
            row.quantity.clone(),
            row.amount.clone(),
        ];
        for (col, cell) in cells.iter().enumerate() {
            text(layer, &fonts.regular, cell, 11.0, COLUMNS[col], y);
        }
        rule(layer, 10.0, 200.0, y + 2.5, 0.2);
    }

    for (idx, (label, rate, amount)) in page.summary_rows().into_iter().enumerate() {
        y += ROW_H;
        // 首尾两行的标签写在品名列, 税率行写在单价列
        if idx == 1 || idx == 2 {
            text(layer, &fonts.bold, &label, 11.0, COLUMNS[2], y);
            text(layer, &fonts.regular, &rate, 11.0, COLUMNS[3], y);
        } else {
            text(layer, &fonts.bold, &label, 11.0, COLUMNS[1], y);
        }
        text(layer, &fonts.regular, &amount, 11.0, COLUMNS[4], y);
        rule(layer, 10.0, 200.0, y + 2.5, 0.2);
    }

    text_right(layer, &fonts.regular, &document.branch_name, 12.0, PAGE_W - 15.0, PAGE_H - 20.0);
}

// 以下坐标均为自页面左上角起算的毫米数, printpdf 原点在左下角

fn text(layer: &PdfLayerReference, font: &IndirectFontRef, value: &str, size: f32, x: f32, y: f32) {
    layer.use_text(value, size, Mm(x), Mm(PAGE_H - y), font);
}

// printpdf 不提供字宽度量, 按字号估算
fn estimate_width(value: &str, size: f32) -> f32 {
    value.chars().count() as f32 * size * 0.18
}

fn text_centered(layer: &PdfLayerReference, font: &IndirectFontRef, value: &str, size: f32, x: f32, y: f32) {
    let x = (x - estimate_width(value, size) / 2.0).max(0.0);
    text(layer, font, value, size, x, y);
}

fn text_right(layer: &PdfLayerReference, font: &IndirectFontRef, value: &str, size: f32, x: f32, y: f32) {
    let x = (x - estimate_width(value, size)).max(0.0);
    text(layer, font, value, size, x, y);
}

fn rule(layer: &PdfLayerReference, x1: f32, x2: f32, y: f32, thickness: f32) {
    layer.set_outline_thickness(thickness);
    layer.add_line(Line {
        points: vec![
            (Point::new(Mm(x1), Mm(PAGE_H - y)), false),
            (Point::new(Mm(x2), Mm(PAGE_H - y)), false),
        ],
        is_closed: false,
    });
}
