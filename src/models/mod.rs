pub mod branch;
pub mod invoice;
pub mod line_item;
pub mod request;

pub use branch::{Branch, Category, NewBranch, NewCategory};
pub use invoice::{InvoiceCounter, InvoiceItem, InvoiceLedger, NewInvoiceItem};
pub use line_item::{
    validate_batch, BulkDeleteRequest, LineItem, LineItemFilter, LineItemView, NewLineItem, Pick,
    Selection,
};
pub use request::{
    CustomerInvoiceRequest, CustomerLine, IssuedInvoice, IssuedLine, PurchaseInvoiceRequest,
    RenderedDocument,
};
